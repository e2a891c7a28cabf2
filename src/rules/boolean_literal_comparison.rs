use crate::catalog::Catalog;
use crate::context::ScanContext;
use crate::error::BugscanResult;
use crate::fix::SuggestedFix;
use crate::matchers::{Matcher, all_of, any_of, boolean_literal, child, is_same_type};
use crate::rule::{CheckResult, Description, RuleCategory, RuleDescriptor};
use crate::tree::{Literal, NodeKind, NodeRef, Role};

// ============================================================================
// BooleanLiteralComparison
// ============================================================================

pub static BOOLEAN_LITERAL_COMPARISON: RuleDescriptor = RuleDescriptor::warning_with_fix(
    "BooleanLiteralComparison",
    RuleCategory::Simplification,
    "Comparing a boolean expression with `true` or `false` is redundant",
    "Use the boolean expression directly",
);

pub(super) fn register(catalog: &mut Catalog) -> BugscanResult<()> {
    let literal = any_of([boolean_literal(true), boolean_literal(false)]);
    // boxed `Boolean` operands are left alone: `b == true` throws on null
    let primitive = is_same_type("boolean");
    let matcher = all_of([
        Matcher::new(|node, _| matches!(node.operator(), Some("==" | "!="))),
        any_of([
            child(Role::Left, literal.clone()).and(child(Role::Right, primitive.clone())),
            child(Role::Right, literal).and(child(Role::Left, primitive)),
        ]),
    ]);
    catalog.register(
        &BOOLEAN_LITERAL_COMPARISON,
        [NodeKind::Binary],
        matcher,
        check,
    )?;
    Ok(())
}

fn check(node: NodeRef<'_>, ctx: &ScanContext<'_>) -> CheckResult {
    let (Some(left), Some(right)) = (
        node.child_with_role(Role::Left),
        node.child_with_role(Role::Right),
    ) else {
        return Ok(None);
    };
    let (value, operand) = match (left.literal(), right.literal()) {
        (Some(Literal::Boolean(v)), _) => (*v, right),
        (_, Some(Literal::Boolean(v))) => (*v, left),
        _ => return Ok(None),
    };

    let text = ctx.source_for(operand);
    let keep = value == (node.operator() == Some("=="));
    let replacement = if keep {
        text.to_string()
    } else if needs_parens(operand) {
        format!("!({text})")
    } else {
        format!("!{text}")
    };

    Ok(Some(
        Description::builder(node)
            .message(format!(
                "`{}` can be simplified to `{replacement}`",
                ctx.source_for(node)
            ))
            .fix(SuggestedFix::builder().replace_node(node, replacement))
            .build(),
    ))
}

fn needs_parens(node: NodeRef<'_>) -> bool {
    !matches!(
        node.kind(),
        NodeKind::Identifier
            | NodeKind::MethodInvocation
            | NodeKind::FieldAccess
            | NodeKind::Parenthesized
            | NodeKind::Literal
    )
}

#[cfg(test)]
mod tests {
    use crate::rules::test_support::{fixed, scan_with};

    const RULE: &str = "BooleanLiteralComparison";

    #[test]
    fn simplifies_comparisons_with_literals() {
        let src = "class A {\n    void m(boolean done, int n) {\n        if (done == true) {}\n        if (false != done) {}\n        if (n > 0 == false) {}\n    }\n}";
        assert_eq!(
            fixed(RULE, src),
            "class A {\n    void m(boolean done, int n) {\n        if (done) {}\n        if (done) {}\n        if (!(n > 0)) {}\n    }\n}"
        );
        let (_, findings) = scan_with(RULE, src);
        assert_eq!(findings[2].message, "`n > 0 == false` can be simplified to `!(n > 0)`");
    }

    #[test]
    fn leaves_boxed_booleans_alone() {
        let src = "class A {\n    void m(Boolean flag) {\n        if (flag == true) {}\n    }\n}";
        let (_, findings) = scan_with(RULE, src);
        assert!(findings.is_empty());
    }
}
