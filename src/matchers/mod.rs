//! Composable predicates over `(node, context)`.
//!
//! A [`Matcher`] is a cheap, cloneable, thread-safe closure. Base predicates
//! live in the submodules; the boolean combinators live here. Matchers never
//! mutate the tree or the context (the context's memo caches aside) and give
//! the same answer every time they are asked.

mod method;
mod names;
mod structure;
mod types;

pub use method::{MethodMatcher, argument, argument_count, receiver};
pub use names::{
    boolean_literal, has_name, int_literal, name_matches, null_literal, refers_to,
    string_literal,
};
pub use structure::{
    ChildMatch, all_descendants, child, children, children_with_role, contains, enclosing,
    enclosing_kind, has_annotation, has_modifier, ignore_parens, is_last_statement_in_block,
    next_statement, parent_node, previous_statement,
};
pub use types::{is_primitive_type, is_same_type, is_subtype_of};

use crate::context::ScanContext;
use crate::tree::{NodeKind, NodeRef};
use std::fmt;
use std::sync::Arc;

type MatchFn = dyn Fn(NodeRef<'_>, &ScanContext<'_>) -> bool + Send + Sync;

/// A pure predicate over a node and its scan context.
#[derive(Clone)]
pub struct Matcher {
    f: Arc<MatchFn>,
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Matcher(..)")
    }
}

impl Matcher {
    pub fn new(f: impl Fn(NodeRef<'_>, &ScanContext<'_>) -> bool + Send + Sync + 'static) -> Self {
        Self { f: Arc::new(f) }
    }

    pub fn matches(&self, node: NodeRef<'_>, ctx: &ScanContext<'_>) -> bool {
        (self.f)(node, ctx)
    }

    #[must_use]
    pub fn and(self, other: Matcher) -> Matcher {
        all_of([self, other])
    }

    #[must_use]
    pub fn or(self, other: Matcher) -> Matcher {
        any_of([self, other])
    }
}

pub fn anything() -> Matcher {
    Matcher::new(|_, _| true)
}

pub fn nothing() -> Matcher {
    Matcher::new(|_, _| false)
}

pub fn not(inner: Matcher) -> Matcher {
    Matcher::new(move |node, ctx| !inner.matches(node, ctx))
}

/// Conjunction, evaluated left to right and stopping at the first `false`.
/// The empty conjunction matches everything.
pub fn all_of(matchers: impl IntoIterator<Item = Matcher>) -> Matcher {
    let matchers: Vec<Matcher> = matchers.into_iter().collect();
    Matcher::new(move |node, ctx| matchers.iter().all(|m| m.matches(node, ctx)))
}

/// Disjunction, evaluated left to right and stopping at the first `true`.
/// The empty disjunction matches nothing.
pub fn any_of(matchers: impl IntoIterator<Item = Matcher>) -> Matcher {
    let matchers: Vec<Matcher> = matchers.into_iter().collect();
    Matcher::new(move |node, ctx| matchers.iter().any(|m| m.matches(node, ctx)))
}

pub fn kind_is(kind: NodeKind) -> Matcher {
    Matcher::new(move |node, _| node.kind() == kind)
}

pub fn kind_any_of(kinds: impl IntoIterator<Item = NodeKind>) -> Matcher {
    let kinds: Vec<NodeKind> = kinds.into_iter().collect();
    Matcher::new(move |node, _| kinds.contains(&node.kind()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::java::parse_java;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(result: bool, counter: &Arc<AtomicUsize>) -> Matcher {
        let counter = Arc::clone(counter);
        Matcher::new(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            result
        })
    }

    #[test]
    fn combinator_laws_hold_on_every_node() {
        let unit = parse_java("class A { int f(int x) { return x > 0 ? x : -x; } }").unwrap();
        let ctx = ScanContext::new(&unit);
        let a = kind_is(NodeKind::Identifier);
        let b = kind_any_of([NodeKind::Identifier, NodeKind::Literal]);

        for node in unit.tree.root().preorder() {
            let single = a.matches(node, &ctx);
            assert_eq!(not(not(a.clone())).matches(node, &ctx), single);
            assert_eq!(
                all_of([a.clone(), b.clone()]).matches(node, &ctx),
                single && b.matches(node, &ctx)
            );
            assert_eq!(
                any_of([a.clone(), b.clone()]).matches(node, &ctx),
                single || b.matches(node, &ctx)
            );
            assert!(all_of(Vec::new()).matches(node, &ctx));
            assert!(!any_of(Vec::new()).matches(node, &ctx));
            assert_eq!(a.matches(node, &ctx), single);
        }
    }

    #[test]
    fn all_of_short_circuits_on_first_false() {
        let unit = parse_java("class A {}").unwrap();
        let ctx = ScanContext::new(&unit);
        let calls = Arc::new(AtomicUsize::new(0));

        let m = all_of([nothing(), counting(true, &calls)]);
        assert!(!m.matches(unit.tree.root(), &ctx));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn any_of_short_circuits_on_first_true() {
        let unit = parse_java("class A {}").unwrap();
        let ctx = ScanContext::new(&unit);
        let calls = Arc::new(AtomicUsize::new(0));

        let m = any_of([anything(), counting(false, &calls)]);
        assert!(m.matches(unit.tree.root(), &ctx));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let m = counting(false, &calls).or(counting(true, &calls));
        assert!(m.matches(unit.tree.root(), &ctx));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
