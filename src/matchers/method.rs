//! Method invocation matchers.
//!
//! ```ignore
//! let m = MethodMatcher::instance()
//!     .on_descendant_of("java.lang.String")
//!     .named("equals")
//!     .with_arity(1)
//!     .matcher();
//! ```

use super::Matcher;
use crate::context::{ScanContext, SymbolKind};
use crate::tree::{NodeKind, NodeRef, Role};
use crate::types::TypeId;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatch {
    Any,
    Instance,
    Static,
}

#[derive(Debug, Clone)]
enum NameFilter {
    Any,
    Exact(Vec<String>),
    Pattern(Regex),
}

#[derive(Debug, Clone)]
enum Owner {
    Any,
    DescendantOf(String),
    Exact(String),
}

/// Builder for matchers over [`NodeKind::MethodInvocation`] nodes.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    dispatch: Dispatch,
    owner: Owner,
    names: NameFilter,
    arity: Option<usize>,
}

impl MethodMatcher {
    fn with_dispatch(dispatch: Dispatch) -> Self {
        Self {
            dispatch,
            owner: Owner::Any,
            names: NameFilter::Any,
            arity: None,
        }
    }

    /// Every method invocation.
    pub fn any() -> Self {
        Self::with_dispatch(Dispatch::Any)
    }

    /// Invocations on a receiver value (or on the implicit `this`).
    pub fn instance() -> Self {
        Self::with_dispatch(Dispatch::Instance)
    }

    /// Invocations qualified by the type `class`, e.g. `Objects.equals(..)`.
    pub fn static_on(class: &str) -> Self {
        let mut m = Self::with_dispatch(Dispatch::Static);
        m.owner = Owner::Exact(class.to_string());
        m
    }

    #[must_use]
    pub fn on_descendant_of(mut self, type_name: &str) -> Self {
        self.owner = Owner::DescendantOf(type_name.to_string());
        self
    }

    #[must_use]
    pub fn on_exact_class(mut self, type_name: &str) -> Self {
        self.owner = Owner::Exact(type_name.to_string());
        self
    }

    #[must_use]
    pub fn named(self, name: &str) -> Self {
        self.named_any_of([name])
    }

    #[must_use]
    pub fn named_any_of<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.names = NameFilter::Exact(names.into_iter().map(str::to_string).collect());
        self
    }

    pub fn named_matching(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.names = NameFilter::Pattern(Regex::new(pattern)?);
        Ok(self)
    }

    #[must_use]
    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }

    pub fn matcher(self) -> Matcher {
        Matcher::new(move |node, ctx| self.test(node, ctx))
    }

    fn test(&self, node: NodeRef<'_>, ctx: &ScanContext<'_>) -> bool {
        if node.kind() != NodeKind::MethodInvocation {
            return false;
        }
        let name_ok = match (&self.names, node.name()) {
            (NameFilter::Any, _) => true,
            (NameFilter::Exact(names), Some(name)) => names.iter().any(|n| n == name),
            (NameFilter::Pattern(re), Some(name)) => re.is_match(name),
            (_, None) => false,
        };
        if !name_ok {
            return false;
        }
        let arity = node.children_with_role(Role::Argument).count();
        if self.arity.is_some_and(|expected| expected != arity) {
            return false;
        }

        let receiver = node.child_with_role(Role::Receiver);
        let static_owner = receiver.and_then(|r| static_receiver_type(r, ctx));
        match self.dispatch {
            Dispatch::Any => {}
            Dispatch::Instance if static_owner.is_some() => return false,
            Dispatch::Instance => {}
            Dispatch::Static => {
                return match (&self.owner, static_owner) {
                    (Owner::Exact(class), Some(owner)) => ctx
                        .resolve_type(class)
                        .is_and(|&expected| expected == owner),
                    _ => false,
                };
            }
        }

        match &self.owner {
            Owner::Any => true,
            // implicit `this` receivers are typed by the enclosing class
            Owner::DescendantOf(ty) => match receiver {
                Some(r) => ctx.is_subtype_of(r, ty),
                None => enclosing_class_type(node, ctx)
                    .is_some_and(|this| {
                        ctx.resolve_type(ty).is_and(|&sup| ctx.is_subtype(this, sup))
                    }),
            },
            Owner::Exact(ty) => match receiver {
                Some(r) => ctx.is_same_type(r, ty),
                None => enclosing_class_type(node, ctx)
                    .is_some_and(|this| ctx.resolve_type(ty).is_and(|&t| t == this)),
            },
        }
    }
}

impl From<MethodMatcher> for Matcher {
    fn from(value: MethodMatcher) -> Self {
        value.matcher()
    }
}

/// The type a receiver names when it is a type rather than a value.
fn static_receiver_type(receiver: NodeRef<'_>, ctx: &ScanContext<'_>) -> Option<TypeId> {
    match receiver.kind() {
        NodeKind::Identifier => {
            let name = receiver.name()?;
            match ctx.resolve_symbol(receiver, name).resolved() {
                Some(symbol) if symbol.kind != SymbolKind::Class => None,
                _ => ctx.resolve_type(name).resolved(),
            }
        }
        NodeKind::FieldAccess => {
            // only a fully qualified name like `java.util.Objects`
            let text = ctx.source_for(receiver);
            ctx.resolve_type(text).resolved()
        }
        _ => None,
    }
}

fn enclosing_class_type(node: NodeRef<'_>, ctx: &ScanContext<'_>) -> Option<TypeId> {
    let class = node.enclosing(NodeKind::ClassDecl)?;
    ctx.resolve_type(class.name()?).resolved()
}

/// The `index`th argument of an invocation or constructor call matches.
pub fn argument(index: usize, inner: Matcher) -> Matcher {
    Matcher::new(move |node, ctx| {
        node.children_with_role(Role::Argument)
            .nth(index)
            .is_some_and(|arg| inner.matches(arg, ctx))
    })
}

pub fn argument_count(count: usize) -> Matcher {
    Matcher::new(move |node, _| {
        matches!(node.kind(), NodeKind::MethodInvocation | NodeKind::NewClass)
            && node.children_with_role(Role::Argument).count() == count
    })
}

pub fn receiver(inner: Matcher) -> Matcher {
    Matcher::new(move |node, ctx| {
        node.child_with_role(Role::Receiver)
            .is_some_and(|r| inner.matches(r, ctx))
    })
}
