use crate::fix::{FixError, SuggestedFix};
use crate::level::SeverityLevel;
use crate::rule::RuleDescriptor;
use crate::source::{LineCol, TextRange};
use crate::suppression::SuppressionOracle;
use crate::tree::NodeId;
use crate::unit::CompilationUnit;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// The rule's pattern matched.
    Match,
    /// The rule failed (returned an error or panicked) on this node.
    InternalError,
}

/// A single result of one rule on one node.
#[derive(Debug, Clone)]
#[must_use]
pub struct Finding {
    pub rule: &'static RuleDescriptor,
    pub kind: FindingKind,
    pub node: NodeId,
    pub range: TextRange,
    pub message: String,
    pub severity: SeverityLevel,
    pub fix: Option<SuggestedFix>,
    /// Why the rule's fix was dropped, if it was invalid.
    pub fix_error: Option<FixError>,
    pub link: Option<String>,
}

impl Finding {
    pub fn is_internal_error(&self) -> bool {
        self.kind == FindingKind::InternalError
    }
}

/// 1-based line/column span of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: LineCol,
    pub end: LineCol,
}

impl Span {
    pub fn from_range(unit: &CompilationUnit, range: TextRange) -> Self {
        Self {
            start: unit.source.line_col(range.start()),
            end: unit.source.line_col(range.end()),
        }
    }
}

/// Host-facing form of a finding.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub rule: &'static str,
    pub severity: SeverityLevel,
    pub kind: FindingKind,
    pub file: Option<String>,
    pub span: Span,
    pub range: TextRange,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<SuggestedFix>,
}

impl Diagnostic {
    pub fn from_finding(unit: &CompilationUnit, finding: &Finding) -> Self {
        Self {
            rule: finding.rule.name,
            severity: finding.severity,
            kind: finding.kind,
            file: unit.path().map(|p| p.display().to_string()),
            span: Span::from_range(unit, finding.range),
            range: finding.range,
            message: finding.message.clone(),
            link: finding
                .link
                .clone()
                .or_else(|| finding.rule.link.map(str::to_string)),
            fix: finding.fix.clone(),
        }
    }

    /// `path:line:col: severity[rule]: message`
    pub fn render(&self) -> String {
        let file = self.file.as_deref().unwrap_or("<memory>");
        let mut out = format!(
            "{}:{}:{}: {}[{}]: {}",
            file, self.span.start.line, self.span.start.column, self.severity, self.rule, self.message
        );
        if let Some(description) = self.fix.as_ref().and_then(|f| f.short_description()) {
            out.push_str(&format!("\n  fix: {description}"));
        }
        if let Some(link) = &self.link {
            out.push_str(&format!("\n  see: {link}"));
        }
        out
    }
}

/// Destination for reported diagnostics.
pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub emitted: usize,
    pub suppressed: usize,
}

/// Turns findings into diagnostics, dropping those the oracle suppresses and
/// those whose severity is `Off`. Internal errors are never suppressed.
pub struct Reporter<'a> {
    oracle: &'a dyn SuppressionOracle,
}

impl<'a> Reporter<'a> {
    pub fn new(oracle: &'a dyn SuppressionOracle) -> Self {
        Self { oracle }
    }

    pub fn report(
        &self,
        unit: &CompilationUnit,
        findings: &[Finding],
        sink: &mut dyn DiagnosticSink,
    ) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for finding in findings {
            if !finding.severity.is_enabled() {
                continue;
            }
            if !finding.is_internal_error() && self.oracle.is_suppressed(unit, finding) {
                summary.suppressed += 1;
                continue;
            }
            sink.emit(Diagnostic::from_finding(unit, finding));
            summary.emitted += 1;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::java::parse_java;
    use crate::rule::RuleCategory;
    use crate::suppression::{NoSuppression, SuppressWarningsOracle};

    static RULE: RuleDescriptor = RuleDescriptor::warning("Demo", RuleCategory::Style, "demo");

    fn finding(unit: &CompilationUnit, needle: &str, kind: FindingKind) -> Finding {
        let start = unit.text().find(needle).unwrap();
        let node = unit
            .tree
            .root()
            .preorder()
            .filter(|n| n.range().start() == start)
            .last()
            .unwrap();
        Finding {
            rule: &RULE,
            kind,
            node: node.id(),
            range: node.range(),
            message: "demo finding".to_string(),
            severity: SeverityLevel::Warning,
            fix: None,
            fix_error: None,
            link: None,
        }
    }

    #[test]
    fn renders_one_based_positions() {
        let unit = parse_java("class A {\n  int x = y;\n}").unwrap().with_path("A.java");
        let findings = vec![finding(&unit, "y", FindingKind::Match)];
        let mut sink: Vec<Diagnostic> = Vec::new();
        let summary = Reporter::new(&NoSuppression).report(&unit, &findings, &mut sink);

        assert_eq!(summary.emitted, 1);
        assert_eq!(sink[0].render(), "A.java:2:11: warning[Demo]: demo finding");
    }

    #[test]
    fn suppression_skips_matches_but_not_internal_errors() {
        let src = "class A {\n  @SuppressWarnings(\"Demo\")\n  void m() { int x = y; }\n}";
        let unit = parse_java(src).unwrap();
        let findings = vec![
            finding(&unit, "y;", FindingKind::Match),
            finding(&unit, "y;", FindingKind::InternalError),
        ];
        let mut sink: Vec<Diagnostic> = Vec::new();
        let summary = Reporter::new(&SuppressWarningsOracle).report(&unit, &findings, &mut sink);

        assert_eq!(summary, ReportSummary { emitted: 1, suppressed: 1 });
        assert_eq!(sink[0].kind, FindingKind::InternalError);
    }

    #[test]
    fn off_findings_are_dropped() {
        let unit = parse_java("class A { int x = y; }").unwrap();
        let mut off = finding(&unit, "y", FindingKind::Match);
        off.severity = SeverityLevel::Off;
        let mut sink: Vec<Diagnostic> = Vec::new();
        let summary = Reporter::new(&NoSuppression).report(&unit, &[off], &mut sink);
        assert_eq!(summary.emitted, 0);
        assert!(sink.is_empty());
    }
}
