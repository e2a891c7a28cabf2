use crate::context::ScanContext;
use crate::fix::SuggestedFix;
use crate::matchers::{Matcher, all_of, kind_any_of, parent_node};
use crate::rule::{BugChecker, CheckResult, Description, RuleCategory, RuleDescriptor};
use crate::source::TextRange;
use crate::tree::{NodeKind, NodeRef, Role};
use itertools::Itertools;

// ============================================================================
// MultipleVariableDeclarations
// ============================================================================

pub struct MultipleVariableDeclarations;

static MULTIPLE_VARIABLE_DECLARATIONS: RuleDescriptor = RuleDescriptor::warning_with_fix(
    "MultipleVariableDeclarations",
    RuleCategory::Style,
    "Each variable should be declared in its own declaration statement",
    "Split into one declaration per variable",
);

impl BugChecker for MultipleVariableDeclarations {
    fn descriptor(&self) -> &'static RuleDescriptor {
        &MULTIPLE_VARIABLE_DECLARATIONS
    }

    fn node_kinds(&self) -> &'static [NodeKind] {
        &[NodeKind::VariableDecl, NodeKind::FieldDecl]
    }

    /// Only statements and members; splitting a `for` initializer would not
    /// compile.
    fn matcher(&self) -> Matcher {
        all_of([
            parent_node(kind_any_of([NodeKind::Block, NodeKind::ClassDecl])),
            Matcher::new(|node, _| node.children_with_role(Role::Declarator).nth(1).is_some()),
        ])
    }

    fn check(&self, node: NodeRef<'_>, ctx: &ScanContext<'_>) -> CheckResult {
        let Some(ty) = node.child_with_role(Role::Type) else {
            return Ok(None);
        };
        // modifiers and annotations are repeated on every declaration
        let prefix = ctx.slice(TextRange::new(node.range().start(), ty.range().end())?);
        let indent = ctx.source().indentation_at(node.range().start());

        let declarators: Vec<_> = node.children_with_role(Role::Declarator).collect();
        let mut fix = SuggestedFix::builder().short_description("split declarations");
        for (previous, declarator) in declarators.iter().copied().tuple_windows() {
            fix = fix
                .replace_range(previous.range().end(), declarator.range().end(), "")
                .postfix_with(
                    node,
                    format!("\n{indent}{prefix} {};", ctx.source_for(declarator)),
                );
        }

        let names = declarators.iter().filter_map(|d| d.name()).join(", ");
        Ok(Some(
            Description::builder(node)
                .message(format!("`{names}` should be declared separately"))
                .fix(fix)
                .build(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::rules::test_support::{fixed, scan_with};

    const RULE: &str = "MultipleVariableDeclarations";

    #[test]
    fn splits_local_declarations() {
        let src = "class A {\n    void m() {\n        int x = 1, y = 2;\n    }\n}";
        assert_eq!(
            fixed(RULE, src),
            "class A {\n    void m() {\n        int x = 1;\n        int y = 2;\n    }\n}"
        );
    }

    #[test]
    fn repeats_modifiers_on_fields() {
        let src = "class A {\n    private static int a, b, c;\n}";
        let (_, findings) = scan_with(RULE, src);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "`a, b, c` should be declared separately");
        assert_eq!(
            fixed(RULE, src),
            "class A {\n    private static int a;\n    private static int b;\n    private static int c;\n}"
        );
    }

    #[test]
    fn ignores_single_declarations_and_loop_initializers() {
        let src = "class A {\n    int a;\n    void m() {\n        for (int i = 0, j = 1; i < j; i++) {}\n    }\n}";
        let (_, findings) = scan_with(RULE, src);
        assert!(findings.is_empty());
    }
}
