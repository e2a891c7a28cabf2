//! Type predicates. All of them fail closed on unresolved types.

use super::Matcher;
use crate::types::TypeKind;

/// The node's static type is `type_name` or one of its subtypes.
pub fn is_subtype_of(type_name: &str) -> Matcher {
    let type_name = type_name.to_string();
    Matcher::new(move |node, ctx| ctx.is_subtype_of(node, &type_name))
}

/// The node's static type is exactly `type_name`.
pub fn is_same_type(type_name: &str) -> Matcher {
    let type_name = type_name.to_string();
    Matcher::new(move |node, ctx| ctx.is_same_type(node, &type_name))
}

pub fn is_primitive_type() -> Matcher {
    Matcher::new(|node, ctx| {
        ctx.type_of(node)
            .is_and(|&ty| ctx.types().info(ty).kind == TypeKind::Primitive)
    })
}
