//! Per-unit lookup service shared by every matcher and rule during a scan.
//!
//! A [`ScanContext`] borrows one [`CompilationUnit`] and memoizes the
//! expensive lookups against it (type resolution, subtype walks, scope
//! resolution, expression typing). The caches live exactly as long as the
//! context, so nothing leaks from one unit into the next.
//!
//! Lookups that cannot be answered return [`Resolution::Unresolved`] instead of
//! failing; matchers built on them treat that as "no match".

use crate::source::{SourceFile, TextRange};
use crate::tree::{NodeId, NodeKind, NodeRef, Role, SyntaxTree};
use crate::types::{OBJECT, TypeId, TypeKind, TypeTable};
use crate::unit::CompilationUnit;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;

/// Outcome of a lookup that may fail under an incomplete symbol universe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    Resolved(T),
    Unresolved,
}

impl<T> Resolution<T> {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    pub fn resolved(self) -> Option<T> {
        match self {
            Resolution::Resolved(t) => Some(t),
            Resolution::Unresolved => None,
        }
    }

    /// Fail-closed predicate: `false` whenever the value is unresolved.
    pub fn is_and(&self, pred: impl FnOnce(&T) -> bool) -> bool {
        match self {
            Resolution::Resolved(t) => pred(t),
            Resolution::Unresolved => false,
        }
    }
}

impl<T> From<Option<T>> for Resolution<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(t) => Resolution::Resolved(t),
            None => Resolution::Unresolved,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Local,
    Parameter,
    Field,
    Class,
}

/// A named declaration visible from some node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub declaration: NodeId,
    /// Type as written at the declaration, if any.
    pub declared_type: Option<String>,
}

/// Which memo table a lookup went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    TypeByName,
    Subtype,
    Symbol,
    NodeType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupStats {
    pub hits: usize,
    /// Number of times the underlying resolution actually ran.
    pub misses: usize,
}

#[derive(Default)]
struct MemoCache {
    types_by_name: RefCell<HashMap<String, Resolution<TypeId>>>,
    subtypes: RefCell<HashMap<(TypeId, TypeId), bool>>,
    symbols: RefCell<HashMap<(NodeId, String), Resolution<Symbol>>>,
    node_types: RefCell<HashMap<NodeId, Resolution<TypeId>>>,
    stats: RefCell<HashMap<LookupKind, LookupStats>>,
}

impl MemoCache {
    fn record(&self, kind: LookupKind, hit: bool) {
        let mut stats = self.stats.borrow_mut();
        let entry = stats.entry(kind).or_default();
        if hit {
            entry.hits += 1;
        } else {
            entry.misses += 1;
        }
    }

    /// Look `key` up in `table`, computing and storing it on a miss. No borrow
    /// is held while `compute` runs, so computations may recurse into the
    /// cache.
    fn memoize<K, V>(
        &self,
        kind: LookupKind,
        table: &RefCell<HashMap<K, V>>,
        key: K,
        compute: impl FnOnce() -> V,
    ) -> V
    where
        K: Eq + Hash,
        V: Clone,
    {
        let cached = table.borrow().get(&key).cloned();
        if let Some(value) = cached {
            self.record(kind, true);
            return value;
        }
        self.record(kind, false);
        let value = compute();
        table.borrow_mut().insert(key, value.clone());
        value
    }
}

/// Read-only view of one compilation unit plus its lookup caches.
pub struct ScanContext<'u> {
    unit: &'u CompilationUnit,
    cache: MemoCache,
}

impl<'u> ScanContext<'u> {
    pub fn new(unit: &'u CompilationUnit) -> Self {
        Self {
            unit,
            cache: MemoCache::default(),
        }
    }

    pub fn unit(&self) -> &'u CompilationUnit {
        self.unit
    }

    pub fn source(&self) -> &'u SourceFile {
        &self.unit.source
    }

    pub fn tree(&self) -> &'u SyntaxTree {
        &self.unit.tree
    }

    pub fn types(&self) -> &'u TypeTable {
        &self.unit.types
    }

    pub fn node(&self, id: NodeId) -> Option<NodeRef<'u>> {
        self.unit.tree.get(id)
    }

    /// Source text of `node`.
    pub fn source_for(&self, node: NodeRef<'_>) -> &'u str {
        self.slice(node.range())
    }

    pub fn slice(&self, range: TextRange) -> &'u str {
        self.unit.source.slice(range).unwrap_or("")
    }

    pub fn stats(&self, kind: LookupKind) -> LookupStats {
        self.cache
            .stats
            .borrow()
            .get(&kind)
            .copied()
            .unwrap_or_default()
    }

    /// Resolve a type name as written in this unit.
    pub fn resolve_type(&self, name: &str) -> Resolution<TypeId> {
        self.cache.memoize(
            LookupKind::TypeByName,
            &self.cache.types_by_name,
            name.to_string(),
            || self.unit.types.resolve(name).into(),
        )
    }

    pub fn type_name(&self, id: TypeId) -> &'u str {
        self.unit.types.name(id)
    }

    /// Whether `sub` is `sup` or transitively extends/implements it. Supertypes
    /// that cannot be resolved end that branch of the walk.
    pub fn is_subtype(&self, sub: TypeId, sup: TypeId) -> bool {
        self.cache.memoize(
            LookupKind::Subtype,
            &self.cache.subtypes,
            (sub, sup),
            || self.walk_supertypes(sub, sup),
        )
    }

    fn walk_supertypes(&self, sub: TypeId, sup: TypeId) -> bool {
        if sub == sup {
            return true;
        }
        let types = &self.unit.types;
        let sub_kind = types.info(sub).kind;
        let sup_info = types.info(sup);
        if sub_kind == TypeKind::Null {
            return sup_info.kind.is_reference() && sup_info.kind != TypeKind::Null;
        }
        if sub_kind == TypeKind::Primitive || sup_info.kind == TypeKind::Primitive {
            return false;
        }
        if sup_info.name == OBJECT {
            return true;
        }

        let mut seen = HashSet::from([sub]);
        let mut queue = VecDeque::from([sub]);
        while let Some(current) = queue.pop_front() {
            for written in &types.info(current).supertypes {
                let Resolution::Resolved(next) = self.resolve_type(written) else {
                    continue;
                };
                if next == sup {
                    return true;
                }
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        false
    }

    /// Whether a value of type `sub` can be assigned to `sup`. Identical to
    /// [`Self::is_subtype`]; primitive widening and boxing are not modelled.
    pub fn is_assignable(&self, sub: TypeId, sup: TypeId) -> bool {
        self.is_subtype(sub, sup)
    }

    /// Resolve `name` as seen from `at`, walking outwards through blocks,
    /// methods, lambdas, classes and the unit.
    pub fn resolve_symbol(&self, at: NodeRef<'_>, name: &str) -> Resolution<Symbol> {
        let Some(at) = self.node(at.id()) else {
            return Resolution::Unresolved;
        };
        self.cache.memoize(
            LookupKind::Symbol,
            &self.cache.symbols,
            (at.id(), name.to_string()),
            || find_symbol(at, name).into(),
        )
    }

    /// Static type of an expression or declaration node.
    pub fn type_of(&self, node: NodeRef<'_>) -> Resolution<TypeId> {
        let Some(node) = self.node(node.id()) else {
            return Resolution::Unresolved;
        };
        self.cache.memoize(
            LookupKind::NodeType,
            &self.cache.node_types,
            node.id(),
            || self.attribute(node),
        )
    }

    fn attribute(&self, node: NodeRef<'u>) -> Resolution<TypeId> {
        match node.kind() {
            NodeKind::Identifier => match node.name() {
                Some("this") => node
                    .enclosing(NodeKind::ClassDecl)
                    .and_then(|class| class.name())
                    .map_or(Resolution::Unresolved, |n| self.resolve_type(n)),
                Some(name) => match self.resolve_symbol(node, name) {
                    Resolution::Resolved(Symbol {
                        kind: SymbolKind::Class,
                        ..
                    }) => Resolution::Unresolved,
                    Resolution::Resolved(Symbol {
                        declared_type: Some(ty),
                        ..
                    }) => self.resolve_type(&ty),
                    _ => Resolution::Unresolved,
                },
                None => Resolution::Unresolved,
            },
            NodeKind::Parenthesized => node
                .child_with_role(Role::Expression)
                .map_or(Resolution::Unresolved, |inner| self.type_of(inner)),
            NodeKind::Binary => self.attribute_binary(node),
            NodeKind::Assignment => node
                .child_with_role(Role::Left)
                .map_or(Resolution::Unresolved, |left| self.type_of(left)),
            _ => node
                .type_name()
                .map_or(Resolution::Unresolved, |ty| self.resolve_type(ty)),
        }
    }

    fn attribute_binary(&self, node: NodeRef<'u>) -> Resolution<TypeId> {
        match node.operator() {
            Some("==" | "!=" | "<" | ">" | "<=" | ">=" | "&&" | "||" | "instanceof") => {
                self.resolve_type("boolean")
            }
            Some("+") => self.attribute_concatenation(node),
            _ => Resolution::Unresolved,
        }
    }

    /// `a + b` is a `String` when either operand is. Chains of `+` lean left,
    /// so the left spine is collected with a loop and typed from the innermost
    /// operand outwards, caching every link on the way.
    fn attribute_concatenation(&self, node: NodeRef<'u>) -> Resolution<TypeId> {
        let string = self.resolve_type("java.lang.String");
        let is_string = |ty: &Resolution<TypeId>| string.is_resolved() && *ty == string;

        let mut spine = vec![node];
        let mut innermost = node.child_with_role(Role::Left);
        while let Some(left) = innermost {
            let uncached_link = left.kind() == NodeKind::Binary
                && left.operator() == Some("+")
                && !self.cache.node_types.borrow().contains_key(&left.id());
            if !uncached_link {
                break;
            }
            spine.push(left);
            innermost = left.child_with_role(Role::Left);
        }

        let mut ty = innermost.map_or(Resolution::Unresolved, |left| self.type_of(left));
        for link in spine.into_iter().rev() {
            if !is_string(&ty) {
                let right = link
                    .child_with_role(Role::Right)
                    .map_or(Resolution::Unresolved, |right| self.type_of(right));
                ty = if is_string(&right) {
                    string.clone()
                } else {
                    Resolution::Unresolved
                };
            }
            if link != node {
                self.cache.record(LookupKind::NodeType, false);
                self.cache.node_types.borrow_mut().insert(link.id(), ty.clone());
            }
        }
        ty
    }

    /// Convenience: is the static type of `node` a subtype of `type_name`?
    /// Fails closed when either side is unresolved.
    pub fn is_subtype_of(&self, node: NodeRef<'_>, type_name: &str) -> bool {
        let Resolution::Resolved(sup) = self.resolve_type(type_name) else {
            return false;
        };
        self.type_of(node).is_and(|&sub| self.is_subtype(sub, sup))
    }

    pub fn is_same_type(&self, node: NodeRef<'_>, type_name: &str) -> bool {
        let Resolution::Resolved(expected) = self.resolve_type(type_name) else {
            return false;
        };
        self.type_of(node).is_and(|&actual| actual == expected)
    }
}

fn symbol_from(node: NodeRef<'_>, kind: SymbolKind) -> Option<Symbol> {
    Some(Symbol {
        name: node.name()?.to_string(),
        kind,
        declaration: node.id(),
        declared_type: node.type_name().map(str::to_string),
    })
}

fn find_symbol(at: NodeRef<'_>, name: &str) -> Option<Symbol> {
    let position = at.range().start();
    let mut current = at;
    while let Some(scope) = current.parent() {
        let found = match scope.kind() {
            NodeKind::Block | NodeKind::Loop => scope
                .children()
                .filter(|s| s.kind() == NodeKind::VariableDecl)
                .flat_map(|s| s.children_with_role(Role::Declarator).collect::<Vec<_>>())
                .find(|d| d.name() == Some(name) && d.range().end() <= position)
                .and_then(|d| symbol_from(d, SymbolKind::Local)),
            NodeKind::MethodDecl | NodeKind::Lambda | NodeKind::Catch => scope
                .children_with_role(Role::Parameter)
                .find(|p| p.name() == Some(name))
                .and_then(|p| symbol_from(p, SymbolKind::Parameter)),
            NodeKind::EnhancedFor if scope.name() == Some(name) && current.role() == Role::Body => {
                symbol_from(scope, SymbolKind::Local)
            }
            NodeKind::ClassDecl => find_member(scope, name),
            NodeKind::CompilationUnit => scope
                .children()
                .find(|c| c.kind() == NodeKind::ClassDecl && c.name() == Some(name))
                .and_then(|c| class_symbol(c)),
            _ => None,
        };
        if found.is_some() {
            return found;
        }
        current = scope;
    }
    None
}

fn find_member(class: NodeRef<'_>, name: &str) -> Option<Symbol> {
    if class.name() == Some(name) {
        return class_symbol(class);
    }
    for member in class.children() {
        match member.kind() {
            NodeKind::FieldDecl => {
                if let Some(d) = member
                    .children_with_role(Role::Declarator)
                    .find(|d| d.name() == Some(name))
                {
                    return symbol_from(d, SymbolKind::Field);
                }
            }
            // record components
            NodeKind::Parameter if member.name() == Some(name) => {
                return symbol_from(member, SymbolKind::Field);
            }
            NodeKind::ClassDecl if member.name() == Some(name) => return class_symbol(member),
            _ => {}
        }
    }
    None
}

fn class_symbol(class: NodeRef<'_>) -> Option<Symbol> {
    let name = class.name()?;
    Some(Symbol {
        name: name.to_string(),
        kind: SymbolKind::Class,
        declaration: class.id(),
        declared_type: Some(name.to_string()),
    })
}
