//! Structural shape predicates: children, descendants, ancestors and siblings.

use super::Matcher;
use crate::tree::{NodeKind, NodeRef, Role};

/// Quantifier over a list of child nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildMatch {
    /// Every child matches; vacuously true when there are none.
    All,
    /// Some child matches; false when there are none.
    AtLeastOne,
    /// The last child matches; false when there are none.
    Last,
}

impl ChildMatch {
    fn test<'t>(
        self,
        mut nodes: impl DoubleEndedIterator<Item = NodeRef<'t>>,
        pred: impl Fn(NodeRef<'t>) -> bool,
    ) -> bool {
        match self {
            ChildMatch::All => nodes.all(pred),
            ChildMatch::AtLeastOne => nodes.any(pred),
            ChildMatch::Last => nodes.next_back().is_some_and(pred),
        }
    }
}

/// Quantified match over the direct children of a node.
pub fn children(policy: ChildMatch, inner: Matcher) -> Matcher {
    Matcher::new(move |node, ctx| policy.test(node.children(), |c| inner.matches(c, ctx)))
}

/// Quantified match over the direct children carrying `role`.
pub fn children_with_role(role: Role, policy: ChildMatch, inner: Matcher) -> Matcher {
    Matcher::new(move |node, ctx| {
        let with_role: Vec<_> = node.children_with_role(role).collect();
        policy.test(with_role.into_iter(), |c| inner.matches(c, ctx))
    })
}

/// The first child with `role` exists and matches.
pub fn child(role: Role, inner: Matcher) -> Matcher {
    Matcher::new(move |node, ctx| {
        node.child_with_role(role)
            .is_some_and(|c| inner.matches(c, ctx))
    })
}

/// Some strict descendant matches.
pub fn contains(inner: Matcher) -> Matcher {
    Matcher::new(move |node, ctx| node.descendants().any(|d| inner.matches(d, ctx)))
}

/// Every strict descendant matches; vacuously true for leaves.
pub fn all_descendants(inner: Matcher) -> Matcher {
    Matcher::new(move |node, ctx| node.descendants().all(|d| inner.matches(d, ctx)))
}

pub fn parent_node(inner: Matcher) -> Matcher {
    Matcher::new(move |node, ctx| node.parent().is_some_and(|p| inner.matches(p, ctx)))
}

/// Some strict ancestor matches.
pub fn enclosing(inner: Matcher) -> Matcher {
    Matcher::new(move |node, ctx| node.ancestors().any(|a| inner.matches(a, ctx)))
}

/// The nearest strict ancestor of `kind` exists and matches.
pub fn enclosing_kind(kind: NodeKind, inner: Matcher) -> Matcher {
    Matcher::new(move |node, ctx| {
        node.enclosing(kind)
            .is_some_and(|a| inner.matches(a, ctx))
    })
}

fn in_block(node: NodeRef<'_>) -> bool {
    node.parent().is_some_and(|p| p.kind() == NodeKind::Block)
}

/// The node is a statement inside a block and the statement right before it
/// matches.
pub fn previous_statement(inner: Matcher) -> Matcher {
    Matcher::new(move |node, ctx| {
        in_block(node)
            && node
                .previous_sibling()
                .is_some_and(|s| inner.matches(s, ctx))
    })
}

/// The node is a statement inside a block and the statement right after it
/// matches.
pub fn next_statement(inner: Matcher) -> Matcher {
    Matcher::new(move |node, ctx| {
        in_block(node) && node.next_sibling().is_some_and(|s| inner.matches(s, ctx))
    })
}

pub fn is_last_statement_in_block() -> Matcher {
    Matcher::new(|node, _| in_block(node) && node.next_sibling().is_none())
}

/// Match `inner` against the node with any enclosing parentheses stripped.
pub fn ignore_parens(inner: Matcher) -> Matcher {
    Matcher::new(move |node, ctx| {
        let mut current = node;
        while current.kind() == NodeKind::Parenthesized {
            match current.child_with_role(Role::Expression) {
                Some(next) => current = next,
                None => break,
            }
        }
        inner.matches(current, ctx)
    })
}

/// The node carries an annotation named `name`. Qualified and simple spellings
/// are compared by their last segment.
pub fn has_annotation(name: &str) -> Matcher {
    let simple = simple_name(name).to_string();
    Matcher::new(move |node, _| {
        node.children_with_role(Role::Annotation)
            .any(|a| a.name().is_some_and(|n| simple_name(n) == simple))
    })
}

pub fn has_modifier(modifier: &str) -> Matcher {
    let modifier = modifier.to_string();
    Matcher::new(move |node, _| node.has_modifier(&modifier))
}

fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ScanContext;
    use crate::host::java::parse_java;
    use crate::matchers::{anything, kind_is, nothing};
    use crate::unit::CompilationUnit;

    fn first<'t>(unit: &'t CompilationUnit, kind: NodeKind) -> NodeRef<'t> {
        unit.tree
            .root()
            .preorder()
            .find(|n| n.kind() == kind)
            .unwrap()
    }

    #[test]
    fn quantifiers_on_empty_children() {
        let unit = parse_java("class A { void m() {} }").unwrap();
        let ctx = ScanContext::new(&unit);
        let block = first(&unit, NodeKind::Block);
        assert_eq!(block.child_count(), 0);

        assert!(children(ChildMatch::All, nothing()).matches(block, &ctx));
        assert!(!children(ChildMatch::AtLeastOne, anything()).matches(block, &ctx));
        assert!(!children(ChildMatch::Last, anything()).matches(block, &ctx));
        assert!(all_descendants(nothing()).matches(block, &ctx));
        assert!(!contains(anything()).matches(block, &ctx));
    }

    #[test]
    fn last_only_looks_at_final_child() {
        let src = "class A { void m() { int a = 1; foo(); return; } }";
        let unit = parse_java(src).unwrap();
        let ctx = ScanContext::new(&unit);
        let block = first(&unit, NodeKind::Block);

        assert!(children(ChildMatch::Last, kind_is(NodeKind::Return)).matches(block, &ctx));
        assert!(!children(ChildMatch::All, kind_is(NodeKind::Return)).matches(block, &ctx));
        assert!(
            children(ChildMatch::AtLeastOne, kind_is(NodeKind::VariableDecl)).matches(block, &ctx)
        );
    }

    #[test]
    fn sibling_statements() {
        let src = "class A { void m() { int a = 1; foo(); return; } }";
        let unit = parse_java(src).unwrap();
        let ctx = ScanContext::new(&unit);
        let call = first(&unit, NodeKind::ExpressionStatement);
        let ret = first(&unit, NodeKind::Return);

        assert!(previous_statement(kind_is(NodeKind::VariableDecl)).matches(call, &ctx));
        assert!(next_statement(kind_is(NodeKind::Return)).matches(call, &ctx));
        assert!(is_last_statement_in_block().matches(ret, &ctx));
        assert!(!is_last_statement_in_block().matches(call, &ctx));

        // an expression is not itself a statement in the block
        let invocation = first(&unit, NodeKind::MethodInvocation);
        assert!(!previous_statement(anything()).matches(invocation, &ctx));
    }

    #[test]
    fn ancestors_and_parens() {
        let src = "class A { boolean m(int x) { return ((x)) > 0; } }";
        let unit = parse_java(src).unwrap();
        let ctx = ScanContext::new(&unit);
        let paren = first(&unit, NodeKind::Parenthesized);

        assert!(ignore_parens(kind_is(NodeKind::Identifier)).matches(paren, &ctx));
        assert!(!kind_is(NodeKind::Identifier).matches(paren, &ctx));
        assert!(enclosing_kind(NodeKind::MethodDecl, anything()).matches(paren, &ctx));
        assert!(parent_node(kind_is(NodeKind::Binary)).matches(paren, &ctx));
        assert!(enclosing(kind_is(NodeKind::ClassDecl)).matches(paren, &ctx));
        assert!(!enclosing(kind_is(NodeKind::Lambda)).matches(paren, &ctx));
    }

    #[test]
    fn annotations_and_modifiers() {
        let src = "class A { @java.lang.Deprecated public static void m() {} }";
        let unit = parse_java(src).unwrap();
        let ctx = ScanContext::new(&unit);
        let method = first(&unit, NodeKind::MethodDecl);

        assert!(has_annotation("Deprecated").matches(method, &ctx));
        assert!(has_annotation("java.lang.Deprecated").matches(method, &ctx));
        assert!(!has_annotation("Override").matches(method, &ctx));
        assert!(has_modifier("static").matches(method, &ctx));
        assert!(!has_modifier("final").matches(method, &ctx));
    }
}
