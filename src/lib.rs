//! Core bugscan engine and rule catalog.
//!
//! A host turns source text into a [`unit::CompilationUnit`]; the
//! [`ScanEngine`] walks it once, running every catalog rule registered for each
//! node kind, and returns findings that may carry suggested fixes. Fixes are
//! merged and applied through a [`plan::PatchPlan`].

#![allow(clippy::should_implement_trait)] // from_str-style helpers return Option
#![allow(clippy::new_without_default)] // Catalog::new() reads better at call sites
#![allow(clippy::derivable_impls)] // Some Default impls are explicit for documentation

pub mod catalog;
pub mod cli;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod fix;
pub mod fixer;
pub mod host;
pub mod level;
pub mod matchers;
pub mod plan;
pub mod rule;
pub mod rules;
pub mod scanner;
pub mod source;
pub mod suppression;
pub mod telemetry;
pub mod tree;
pub mod types;
pub mod unit;

use rayon::prelude::*;
use std::sync::atomic::AtomicBool;

use crate::catalog::Catalog;
use crate::diagnostics::{Diagnostic, DiagnosticSink, Finding, Reporter, ReportSummary};
use crate::error::BugscanResult;
use crate::fix::SuggestedFix;
use crate::plan::{PatchError, PatchPlan};
use crate::rule::RuleSettings;
use crate::scanner::Scanner;
use crate::suppression::{SuppressWarningsOracle, SuppressionOracle};
use crate::unit::CompilationUnit;

/// Engine orchestrates scanning: it owns the catalog, the per-rule settings
/// and the suppression oracle used when reporting.
pub struct ScanEngine {
    catalog: Catalog,
    settings: RuleSettings,
    oracle: Box<dyn SuppressionOracle>,
}

impl ScanEngine {
    /// Create a new engine with default rule settings.
    pub fn new(catalog: Catalog) -> Self {
        Self::new_with_settings(catalog, RuleSettings::default())
    }

    /// Create a new engine with explicit rule settings (e.g. from config).
    pub fn new_with_settings(catalog: Catalog, settings: RuleSettings) -> Self {
        Self {
            catalog,
            settings,
            oracle: Box::new(SuppressWarningsOracle),
        }
    }

    #[must_use]
    pub fn with_oracle(mut self, oracle: impl SuppressionOracle + 'static) -> Self {
        self.oracle = Box::new(oracle);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn settings(&self) -> &RuleSettings {
        &self.settings
    }

    /// Scan one unit. Findings come back in document order, and for one node
    /// in rule registration order.
    pub fn scan(&self, unit: &CompilationUnit) -> Vec<Finding> {
        Scanner::new(&self.catalog, &self.settings).scan(unit)
    }

    pub fn scan_with_cancel(
        &self,
        unit: &CompilationUnit,
        cancel: &AtomicBool,
    ) -> BugscanResult<Vec<Finding>> {
        Scanner::new(&self.catalog, &self.settings).scan_with_cancel(unit, cancel)
    }

    /// Parse Java source in memory and scan it.
    pub fn scan_source(&self, source: &str) -> BugscanResult<(CompilationUnit, Vec<Finding>)> {
        let unit = host::parse_java(source)?;
        let findings = self.scan(&unit);
        Ok((unit, findings))
    }

    /// Scan many units in parallel. The result holds one entry per unit, in
    /// input order.
    pub fn scan_batch(&self, units: &[CompilationUnit]) -> Vec<Vec<Finding>> {
        crate::instrument_block!("scan_batch", {
            crate::log_event!(debug, units = units.len(), "batch scan start");
            units.par_iter().map(|unit| self.scan(unit)).collect()
        })
    }

    /// Apply the fixes of the unsuppressed `findings` to `unit`, or none of
    /// them if any two conflict.
    pub fn apply_fixes(
        &self,
        unit: &CompilationUnit,
        findings: &[Finding],
    ) -> Result<String, PatchError> {
        PatchPlan::from_findings_filtered(findings, |f| !self.oracle.is_suppressed(unit, f))
            .apply(unit)
    }

    /// Findings whose fixes may be applied: they carry a fix and the
    /// suppression oracle does not hide them.
    pub fn fixable(&self, unit: &CompilationUnit, findings: &[Finding]) -> Vec<Finding> {
        findings
            .iter()
            .filter(|f| f.fix.is_some() && !self.oracle.is_suppressed(unit, f))
            .cloned()
            .collect()
    }

    /// Forward unsuppressed findings to `sink`.
    pub fn report(
        &self,
        unit: &CompilationUnit,
        findings: &[Finding],
        sink: &mut dyn DiagnosticSink,
    ) -> ReportSummary {
        Reporter::new(self.oracle.as_ref()).report(unit, findings, sink)
    }

    /// [`Self::report`] into a fresh vector.
    pub fn diagnostics(&self, unit: &CompilationUnit, findings: &[Finding]) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        self.report(unit, findings, &mut out);
        out
    }
}

/// Apply `fixes` to `unit` in the given order, or none of them if any two
/// conflict.
pub fn apply_fixes(
    unit: &CompilationUnit,
    fixes: impl IntoIterator<Item = SuggestedFix>,
) -> Result<String, PatchError> {
    let mut plan = PatchPlan::new();
    for fix in fixes {
        plan.push(fix, "fix");
    }
    plan.apply(unit)
}

/// Construct a `ScanEngine` with every built-in rule enabled.
pub fn create_default_engine() -> BugscanResult<ScanEngine> {
    Ok(ScanEngine::new(Catalog::default_rules()?))
}
