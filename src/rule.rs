use crate::context::ScanContext;
use crate::fix::SuggestedFixBuilder;
use crate::level::SeverityLevel;
use crate::matchers::{Matcher, anything};
use crate::source::TextRange;
use crate::tree::{NodeId, NodeKind, NodeRef};
use serde::Serialize;
use std::collections::HashMap;

// ============================================================================
// Rule metadata
// ============================================================================

/// Safety classification for suggested fixes.
///
/// - `Safe` fixes preserve behavior
/// - `Unsafe` fixes may change behavior (e.g. null handling) and are only
///   applied when asked for explicitly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FixSafety {
    #[default]
    Safe,
    Unsafe,
}

impl FixSafety {
    pub fn as_str(&self) -> &'static str {
        match self {
            FixSafety::Safe => "safe",
            FixSafety::Unsafe => "unsafe",
        }
    }
}

/// Whether a rule offers a suggested fix, and of what kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixDescriptor {
    pub available: bool,
    pub safety: FixSafety,
    pub description: &'static str,
}

impl FixDescriptor {
    pub const fn safe(description: &'static str) -> Self {
        Self {
            available: true,
            safety: FixSafety::Safe,
            description,
        }
    }

    pub const fn unsafe_fix(description: &'static str) -> Self {
        Self {
            available: true,
            safety: FixSafety::Unsafe,
            description,
        }
    }

    pub const fn none() -> Self {
        Self {
            available: false,
            safety: FixSafety::Safe,
            description: "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    /// Code that is almost certainly wrong.
    Correctness,
    /// Code that is probably wrong or misleading.
    Suspicious,
    Simplification,
    Style,
}

impl RuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::Correctness => "correctness",
            RuleCategory::Suspicious => "suspicious",
            RuleCategory::Simplification => "simplification",
            RuleCategory::Style => "style",
        }
    }
}

/// Static metadata describing a rule.
#[derive(Debug, Serialize)]
pub struct RuleDescriptor {
    pub name: &'static str,
    pub summary: &'static str,
    /// Severity used unless configuration overrides it.
    pub severity: SeverityLevel,
    pub category: RuleCategory,
    pub fix: FixDescriptor,
    pub link: Option<&'static str>,
}

impl RuleDescriptor {
    /// Descriptor for a warning-level rule with no fix.
    pub const fn warning(name: &'static str, category: RuleCategory, summary: &'static str) -> Self {
        Self {
            name,
            summary,
            severity: SeverityLevel::Warning,
            category,
            fix: FixDescriptor::none(),
            link: None,
        }
    }

    /// Descriptor for a warning-level rule with a safe fix.
    pub const fn warning_with_fix(
        name: &'static str,
        category: RuleCategory,
        summary: &'static str,
        fix_description: &'static str,
    ) -> Self {
        Self {
            name,
            summary,
            severity: SeverityLevel::Warning,
            category,
            fix: FixDescriptor::safe(fix_description),
            link: None,
        }
    }
}

// ============================================================================
// Rule output
// ============================================================================

/// What a rule reports about one node. The scanner turns it into a
/// [`crate::diagnostics::Finding`].
#[derive(Debug, Clone)]
pub struct Description {
    pub node: NodeId,
    pub range: TextRange,
    pub message: String,
    /// Overrides the rule's configured severity.
    pub severity: Option<SeverityLevel>,
    /// Built (and validated) by the scanner.
    pub fix: Option<SuggestedFixBuilder>,
    pub link: Option<String>,
}

impl Description {
    pub fn new(node: NodeRef<'_>, message: impl Into<String>) -> Self {
        Self::builder(node).message(message).build()
    }

    pub fn builder(node: NodeRef<'_>) -> DescriptionBuilder {
        DescriptionBuilder {
            description: Description {
                node: node.id(),
                range: node.range(),
                message: String::new(),
                severity: None,
                fix: None,
                link: None,
            },
        }
    }

    #[must_use]
    pub fn with_fix(mut self, fix: SuggestedFixBuilder) -> Self {
        self.fix = Some(fix);
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: SeverityLevel) -> Self {
        self.severity = Some(severity);
        self
    }
}

#[derive(Debug, Clone)]
#[must_use]
pub struct DescriptionBuilder {
    description: Description,
}

impl DescriptionBuilder {
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.description.message = message.into();
        self
    }

    pub fn severity(mut self, severity: SeverityLevel) -> Self {
        self.description.severity = Some(severity);
        self
    }

    pub fn fix(mut self, fix: SuggestedFixBuilder) -> Self {
        self.description.fix = Some(fix);
        self
    }

    pub fn link(mut self, link: impl Into<String>) -> Self {
        self.description.link = Some(link.into());
        self
    }

    /// Report at `range` instead of the node's own range.
    pub fn at_range(mut self, range: TextRange) -> Self {
        self.description.range = range;
        self
    }

    pub fn build(self) -> Description {
        self.description
    }
}

// ============================================================================
// Rules
// ============================================================================

/// Outcome of running a rule's handler on one node.
pub type CheckResult = anyhow::Result<Option<Description>>;

/// A bug pattern implemented as a type.
///
/// The scanner calls [`BugChecker::check`] only for nodes whose kind is listed
/// in [`BugChecker::node_kinds`] and for which [`BugChecker::matcher`]
/// matches. Checkers are shared across threads and must not keep per-unit
/// state.
pub trait BugChecker: Send + Sync {
    fn descriptor(&self) -> &'static RuleDescriptor;

    fn node_kinds(&self) -> &'static [NodeKind];

    fn matcher(&self) -> Matcher {
        anything()
    }

    fn check(&self, node: NodeRef<'_>, ctx: &ScanContext<'_>) -> CheckResult;
}

/// Per-rule configuration derived from `bugscan.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSettings {
    levels: HashMap<String, SeverityLevel>,
}

impl RuleSettings {
    #[must_use]
    pub fn with_config_levels(mut self, levels: HashMap<String, SeverityLevel>) -> Self {
        self.levels.extend(levels);
        self
    }

    #[must_use]
    pub fn disable(mut self, disabled: impl IntoIterator<Item = String>) -> Self {
        for name in disabled {
            self.levels.insert(name, SeverityLevel::Off);
        }
        self
    }

    /// Configured severity for `rule`, falling back to its default.
    pub fn severity_for(&self, rule: &RuleDescriptor) -> SeverityLevel {
        self.levels.get(rule.name).copied().unwrap_or(rule.severity)
    }

    pub fn is_enabled(&self, rule: &RuleDescriptor) -> bool {
        self.severity_for(rule).is_enabled()
    }
}
