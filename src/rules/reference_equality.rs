use crate::context::ScanContext;
use crate::fix::SuggestedFix;
use crate::level::SeverityLevel;
use crate::matchers::{Matcher, all_of, child, is_same_type};
use crate::rule::{
    BugChecker, CheckResult, Description, FixDescriptor, RuleCategory, RuleDescriptor,
};
use crate::tree::{NodeKind, NodeRef, Role};

// ============================================================================
// ReferenceEquality
// ============================================================================

pub struct ReferenceEquality;

static REFERENCE_EQUALITY: RuleDescriptor = RuleDescriptor {
    name: "ReferenceEquality",
    summary: "Strings compared with `==` or `!=` are compared by identity, not contents",
    severity: SeverityLevel::Warning,
    category: RuleCategory::Correctness,
    // changes the result for distinct but equal instances
    fix: FixDescriptor::unsafe_fix("Compare with `Objects.equals`"),
    link: Some("https://docs.oracle.com/javase/specs/jls/se17/html/jls-15.html#jls-15.21.3"),
};

const STRING: &str = "java.lang.String";

impl BugChecker for ReferenceEquality {
    fn descriptor(&self) -> &'static RuleDescriptor {
        &REFERENCE_EQUALITY
    }

    fn node_kinds(&self) -> &'static [NodeKind] {
        &[NodeKind::Binary]
    }

    fn matcher(&self) -> Matcher {
        all_of([
            Matcher::new(|node, _| matches!(node.operator(), Some("==" | "!="))),
            child(Role::Left, is_same_type(STRING)),
            child(Role::Right, is_same_type(STRING)),
        ])
    }

    fn check(&self, node: NodeRef<'_>, ctx: &ScanContext<'_>) -> CheckResult {
        let (Some(left), Some(right)) = (
            node.child_with_role(Role::Left),
            node.child_with_role(Role::Right),
        ) else {
            return Ok(None);
        };
        let negation = if node.operator() == Some("!=") { "!" } else { "" };
        let replacement = format!(
            "{negation}Objects.equals({}, {})",
            ctx.source_for(left),
            ctx.source_for(right)
        );
        let fix = SuggestedFix::builder()
            .replace_node(node, replacement.as_str())
            .add_import("java.util.Objects")
            .short_description(format!("use `{replacement}`"));

        Ok(Some(
            Description::builder(node)
                .message(format!(
                    "String comparison `{}` compares references",
                    ctx.source_for(node)
                ))
                .fix(fix)
                .build(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::rules::test_support::{fixed, scan_with};

    const RULE: &str = "ReferenceEquality";

    #[test]
    fn rewrites_string_identity_checks() {
        let src = "class A {\n    boolean m(String a, String b) {\n        return a == b || a != \"x\";\n    }\n}";
        let (_, findings) = scan_with(RULE, src);
        let messages: Vec<_> = findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "String comparison `a == b` compares references",
                "String comparison `a != \"x\"` compares references"
            ]
        );
        assert_eq!(
            fixed(RULE, src),
            "import java.util.Objects;\n\nclass A {\n    boolean m(String a, String b) {\n        return Objects.equals(a, b) || !Objects.equals(a, \"x\");\n    }\n}"
        );
    }

    #[test]
    fn ignores_null_checks_primitives_and_unknown_types() {
        let src = "class A {\n    boolean m(String a, int n, Widget w, Widget v) {\n        return a == null || n == 1 || w == v;\n    }\n}";
        let (_, findings) = scan_with(RULE, src);
        assert!(findings.is_empty());
    }
}
