//! Host-supplied type universe of one compilation unit.
//!
//! The table only knows what the host told it: primitive types, a handful of
//! `java.lang` classes, the types declared in the unit, and the names brought
//! in by imports (whose hierarchy is unknown). Anything else is unresolved,
//! which is how an incomplete classpath looks to the scanner.

use std::collections::HashMap;

/// Handle to a type known to a [`TypeTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Primitive,
    Null,
    Class,
    Interface,
    /// Known by name only (e.g. imported), supertypes unknown.
    Opaque,
}

impl TypeKind {
    pub fn is_reference(&self) -> bool {
        !matches!(self, TypeKind::Primitive)
    }
}

#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub name: String,
    pub kind: TypeKind,
    /// Supertype names as written; resolved lazily against this table.
    pub supertypes: Vec<String>,
}

const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "short", "int", "long", "char", "float", "double", "void",
];

const JAVA_LANG: &[(&str, TypeKind, &[&str])] = &[
    ("java.lang.Object", TypeKind::Class, &[]),
    (
        "java.lang.String",
        TypeKind::Class,
        &["java.lang.CharSequence", "java.lang.Comparable"],
    ),
    ("java.lang.CharSequence", TypeKind::Interface, &[]),
    ("java.lang.Comparable", TypeKind::Interface, &[]),
    ("java.lang.Number", TypeKind::Class, &[]),
    ("java.lang.Integer", TypeKind::Class, &["java.lang.Number", "java.lang.Comparable"]),
    ("java.lang.Long", TypeKind::Class, &["java.lang.Number", "java.lang.Comparable"]),
    ("java.lang.Double", TypeKind::Class, &["java.lang.Number", "java.lang.Comparable"]),
    ("java.lang.Boolean", TypeKind::Class, &["java.lang.Comparable"]),
    ("java.lang.Character", TypeKind::Class, &["java.lang.Comparable"]),
    ("java.lang.Iterable", TypeKind::Interface, &[]),
    ("java.lang.AutoCloseable", TypeKind::Interface, &[]),
    ("java.lang.Runnable", TypeKind::Interface, &[]),
    ("java.lang.Throwable", TypeKind::Class, &[]),
    ("java.lang.Exception", TypeKind::Class, &["java.lang.Throwable"]),
    ("java.lang.RuntimeException", TypeKind::Class, &["java.lang.Exception"]),
    ("java.lang.Error", TypeKind::Class, &["java.lang.Throwable"]),
];

pub const OBJECT: &str = "java.lang.Object";

/// Type universe for one compilation unit.
#[derive(Debug, Clone)]
pub struct TypeTable {
    types: Vec<TypeInfo>,
    by_name: HashMap<String, TypeId>,
    /// Simple name -> fully-qualified name, from single-type imports.
    imports: HashMap<String, String>,
    /// Simple name -> fully-qualified name, for types declared in the unit.
    local: HashMap<String, String>,
    package: Option<String>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    /// Table containing only primitive types and the null type.
    pub fn new() -> Self {
        let mut table = Self {
            types: Vec::new(),
            by_name: HashMap::new(),
            imports: HashMap::new(),
            local: HashMap::new(),
            package: None,
        };
        for p in PRIMITIVES {
            table.insert(p, TypeKind::Primitive, Vec::new());
        }
        table.insert("null", TypeKind::Null, Vec::new());
        table
    }

    /// Table preloaded with a small `java.lang` core.
    pub fn with_java_lang() -> Self {
        let mut table = Self::new();
        for (name, kind, supers) in JAVA_LANG {
            table.insert(name, *kind, supers.iter().map(|s| s.to_string()).collect());
        }
        table
    }

    fn insert(&mut self, name: &str, kind: TypeKind, supertypes: Vec<String>) -> TypeId {
        if let Some(&id) = self.by_name.get(name) {
            let existing = &mut self.types[id.0 as usize];
            // A real declaration upgrades an opaque placeholder.
            if existing.kind == TypeKind::Opaque && kind != TypeKind::Opaque {
                existing.kind = kind;
                existing.supertypes = supertypes;
            }
            return id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeInfo {
            name: name.to_string(),
            kind,
            supertypes,
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn set_package(&mut self, package: impl Into<String>) {
        self.package = Some(package.into());
    }

    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    /// Declare a type defined in this unit. `qualified` is the
    /// fully-qualified name; `simple` is how the unit refers to it.
    pub fn declare(
        &mut self,
        qualified: &str,
        simple: &str,
        kind: TypeKind,
        supertypes: Vec<String>,
    ) -> TypeId {
        self.local.insert(simple.to_string(), qualified.to_string());
        self.insert(qualified, kind, supertypes)
    }

    /// Record a single-type import. The imported type becomes known by name
    /// with an unknown hierarchy unless it is declared elsewhere.
    pub fn add_import(&mut self, qualified: &str) {
        let simple = qualified.rsplit('.').next().unwrap_or(qualified);
        self.imports
            .insert(simple.to_string(), qualified.to_string());
        self.insert(qualified, TypeKind::Opaque, Vec::new());
    }

    pub fn info(&self, id: TypeId) -> &TypeInfo {
        &self.types[id.0 as usize]
    }

    pub fn name(&self, id: TypeId) -> &str {
        &self.info(id).name
    }

    pub fn lookup_exact(&self, qualified: &str) -> Option<TypeId> {
        self.by_name.get(qualified).copied()
    }

    /// Resolve a type as written in source (`String`, `java.util.List<T>`,
    /// `int`). Array types and unknown names are unresolved.
    pub fn resolve(&self, written: &str) -> Option<TypeId> {
        let name = strip_type_arguments(written);
        if name.is_empty() || name.ends_with(']') || name.ends_with("...") {
            return None;
        }
        if let Some(id) = self.lookup_exact(&name) {
            return Some(id);
        }
        if name.contains('.') {
            // `Outer.Inner` written against a local or imported outer type.
            let (head, rest) = name.split_once('.')?;
            let outer = self.qualify_simple(head)?;
            return self.lookup_exact(&format!("{outer}.{rest}"));
        }
        let qualified = self.qualify_simple(&name)?;
        self.lookup_exact(&qualified)
    }

    fn qualify_simple(&self, simple: &str) -> Option<String> {
        if let Some(q) = self.local.get(simple) {
            return Some(q.clone());
        }
        if let Some(q) = self.imports.get(simple) {
            return Some(q.clone());
        }
        if let Some(pkg) = &self.package {
            let candidate = format!("{pkg}.{simple}");
            if self.by_name.contains_key(&candidate) {
                return Some(candidate);
            }
        }
        let lang = format!("java.lang.{simple}");
        self.by_name.contains_key(&lang).then_some(lang)
    }
}

/// Drop generic arguments and surrounding whitespace: `Map<K, V>` -> `Map`.
pub fn strip_type_arguments(written: &str) -> String {
    let mut out = String::with_capacity(written.len());
    let mut depth = 0usize;
    for c in written.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            c if depth == 0 && !c.is_whitespace() => out.push(c),
            _ => {}
        }
    }
    out
}
