use crate::diagnostics::Finding;
use crate::tree::{Literal, NodeKind, NodeRef};
use crate::unit::CompilationUnit;

/// Decides whether a finding should be hidden from the diagnostic stream.
pub trait SuppressionOracle: Send + Sync {
    fn is_suppressed(&self, unit: &CompilationUnit, finding: &Finding) -> bool;
}

/// Suppresses nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSuppression;

impl SuppressionOracle for NoSuppression {
    fn is_suppressed(&self, _unit: &CompilationUnit, _finding: &Finding) -> bool {
        false
    }
}

/// Honors `@SuppressWarnings("RuleName")` (or `"all"`) on the node itself or
/// on any enclosing declaration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuppressWarningsOracle;

impl SuppressionOracle for SuppressWarningsOracle {
    fn is_suppressed(&self, unit: &CompilationUnit, finding: &Finding) -> bool {
        let Some(node) = unit.tree.get(finding.node) else {
            return false;
        };
        std::iter::once(node)
            .chain(node.ancestors())
            .any(|n| suppresses(n, finding.rule.name))
    }
}

fn suppresses(node: NodeRef<'_>, rule: &str) -> bool {
    node.children()
        .filter(|c| c.kind() == NodeKind::Annotation)
        .filter(|a| {
            a.name()
                .is_some_and(|n| n == "SuppressWarnings" || n == "java.lang.SuppressWarnings")
        })
        .flat_map(|a| a.descendants())
        .any(|v| match v.literal() {
            Some(Literal::String(s)) => s == rule || s == "all",
            _ => false,
        })
}
