use super::Matcher;
use crate::context::SymbolKind;
use crate::tree::{Literal, NodeKind};
use regex::Regex;

pub fn has_name(name: &str) -> Matcher {
    let name = name.to_string();
    Matcher::new(move |node, _| node.name() == Some(name.as_str()))
}

/// The node's name matches `pattern` (unanchored, like [`Regex::is_match`]).
pub fn name_matches(pattern: &str) -> Result<Matcher, regex::Error> {
    let re = Regex::new(pattern)?;
    Ok(Matcher::new(move |node, _| {
        node.name().is_some_and(|n| re.is_match(n))
    }))
}

fn literal_is(pred: impl Fn(&Literal) -> bool + Send + Sync + 'static) -> Matcher {
    Matcher::new(move |node, _| {
        node.kind() == NodeKind::Literal && node.literal().is_some_and(&pred)
    })
}

pub fn string_literal(value: &str) -> Matcher {
    let value = value.to_string();
    literal_is(move |lit| matches!(lit, Literal::String(s) if *s == value))
}

pub fn int_literal(value: i64) -> Matcher {
    literal_is(move |lit| *lit == Literal::Int(value))
}

pub fn boolean_literal(value: bool) -> Matcher {
    literal_is(move |lit| *lit == Literal::Boolean(value))
}

pub fn null_literal() -> Matcher {
    literal_is(|lit| *lit == Literal::Null)
}

/// An identifier whose name resolves to a symbol of `kind` in its scope.
pub fn refers_to(kind: SymbolKind) -> Matcher {
    Matcher::new(move |node, ctx| {
        if node.kind() != NodeKind::Identifier {
            return false;
        }
        let Some(name) = node.name() else {
            return false;
        };
        ctx.resolve_symbol(node, name).is_and(|s| s.kind == kind)
    })
}
