//! Single-pass rule dispatch over one compilation unit.
//!
//! The tree is walked once in pre-order with an explicit stack. At each node
//! every rule registered for the node's kind runs in registration order:
//! matcher first, then handler. A rule that errors or panics yields one
//! internal-error finding for that node and the walk carries on.

use crate::catalog::{Catalog, RegisteredRule};
use crate::context::ScanContext;
use crate::diagnostics::{Finding, FindingKind};
use crate::error::{BugscanError, BugscanResult};
use crate::level::SeverityLevel;
use crate::log_event;
use crate::rule::{Description, RuleSettings};
use crate::tree::NodeRef;
use crate::unit::CompilationUnit;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};

enum RuleFailure {
    Error(anyhow::Error),
    Panic(String),
}

pub struct Scanner<'c> {
    catalog: &'c Catalog,
    settings: &'c RuleSettings,
}

impl<'c> Scanner<'c> {
    pub fn new(catalog: &'c Catalog, settings: &'c RuleSettings) -> Self {
        Self { catalog, settings }
    }

    pub fn scan(&self, unit: &CompilationUnit) -> Vec<Finding> {
        let never = AtomicBool::new(false);
        // cannot fail without a cancellation request
        self.scan_with_cancel(unit, &never).unwrap_or_default()
    }

    /// Scan `unit`, checking `cancel` before every node. When cancellation is
    /// observed the partial findings are discarded.
    pub fn scan_with_cancel(
        &self,
        unit: &CompilationUnit,
        cancel: &AtomicBool,
    ) -> BugscanResult<Vec<Finding>> {
        log_event!(debug, unit = %unit.display_name(), nodes = unit.tree.len(), "scan start");
        let ctx = ScanContext::new(unit);
        let mut findings = Vec::new();

        for node in unit.tree.root().preorder() {
            if cancel.load(Ordering::Relaxed) {
                log_event!(debug, unit = %unit.display_name(), "scan cancelled");
                return Err(BugscanError::Cancelled);
            }
            for rule in self.catalog.rules_for(node.kind()) {
                let severity = self.settings.severity_for(rule.descriptor);
                if !severity.is_enabled() {
                    continue;
                }
                match run_rule(rule, node, &ctx) {
                    Ok(None) => {}
                    Ok(Some(description)) => {
                        findings.push(finding_from(rule, description, severity));
                    }
                    Err(failure) => findings.push(internal_error(rule, node, failure)),
                }
            }
        }

        log_event!(
            debug,
            unit = %unit.display_name(),
            findings = findings.len(),
            "scan finished"
        );
        Ok(findings)
    }
}

fn run_rule(
    rule: &RegisteredRule,
    node: NodeRef<'_>,
    ctx: &ScanContext<'_>,
) -> Result<Option<Description>, RuleFailure> {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        if !rule.matcher.matches(node, ctx) {
            return Ok(None);
        }
        rule.run(node, ctx)
    }));
    match outcome {
        Ok(Ok(description)) => Ok(description),
        Ok(Err(err)) => Err(RuleFailure::Error(err)),
        Err(payload) => Err(RuleFailure::Panic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn finding_from(
    rule: &RegisteredRule,
    description: Description,
    configured: SeverityLevel,
) -> Finding {
    let (fix, fix_error) = match description.fix.map(|b| b.build()) {
        None => (None, None),
        Some(Ok(fix)) if fix.is_empty() => (None, None),
        Some(Ok(fix)) => (Some(fix), None),
        Some(Err(err)) => {
            log_event!(
                warn,
                rule = rule.descriptor.name,
                error = %err,
                "discarding invalid suggested fix"
            );
            (None, Some(err))
        }
    };
    Finding {
        rule: rule.descriptor,
        kind: FindingKind::Match,
        node: description.node,
        range: description.range,
        message: description.message,
        severity: description.severity.unwrap_or(configured),
        fix,
        fix_error,
        link: description.link,
    }
}

fn internal_error(rule: &RegisteredRule, node: NodeRef<'_>, failure: RuleFailure) -> Finding {
    let message = match failure {
        RuleFailure::Error(err) => format!("{} failed: {err:#}", rule.descriptor.name),
        RuleFailure::Panic(msg) => format!("{} panicked: {msg}", rule.descriptor.name),
    };
    log_event!(warn, rule = rule.descriptor.name, %message, "rule failed; continuing scan");
    Finding {
        rule: rule.descriptor,
        kind: FindingKind::InternalError,
        node: node.id(),
        range: node.range(),
        message,
        severity: SeverityLevel::Error,
        fix: None,
        fix_error: None,
        link: None,
    }
}
