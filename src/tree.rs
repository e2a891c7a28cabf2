//! Read-only typed syntax tree handed to the scanner by a host.
//!
//! The tree is an arena of [`NodeData`] addressed by [`NodeId`]. Hosts build it
//! once per compilation unit (see [`crate::host::java`]); the core only ever
//! navigates it through the copyable [`NodeRef`] handle.

use crate::source::TextRange;
use serde::Serialize;

/// Kind tag used for rule dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum NodeKind {
    CompilationUnit,
    Package,
    Import,
    ClassDecl,
    MethodDecl,
    FieldDecl,
    VariableDecl,
    Declarator,
    Parameter,
    Block,
    ExpressionStatement,
    Return,
    If,
    Loop,
    EnhancedFor,
    Try,
    Catch,
    Throw,
    MethodInvocation,
    NewClass,
    FieldAccess,
    Identifier,
    Literal,
    Binary,
    Unary,
    Assignment,
    Conditional,
    Parenthesized,
    Lambda,
    Annotation,
    TypeRef,
    Other,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::CompilationUnit => "compilation_unit",
            NodeKind::Package => "package",
            NodeKind::Import => "import",
            NodeKind::ClassDecl => "class_decl",
            NodeKind::MethodDecl => "method_decl",
            NodeKind::FieldDecl => "field_decl",
            NodeKind::VariableDecl => "variable_decl",
            NodeKind::Declarator => "declarator",
            NodeKind::Parameter => "parameter",
            NodeKind::Block => "block",
            NodeKind::ExpressionStatement => "expression_statement",
            NodeKind::Return => "return",
            NodeKind::If => "if",
            NodeKind::Loop => "loop",
            NodeKind::EnhancedFor => "enhanced_for",
            NodeKind::Try => "try",
            NodeKind::Catch => "catch",
            NodeKind::Throw => "throw",
            NodeKind::MethodInvocation => "method_invocation",
            NodeKind::NewClass => "new_class",
            NodeKind::FieldAccess => "field_access",
            NodeKind::Identifier => "identifier",
            NodeKind::Literal => "literal",
            NodeKind::Binary => "binary",
            NodeKind::Unary => "unary",
            NodeKind::Assignment => "assignment",
            NodeKind::Conditional => "conditional",
            NodeKind::Parenthesized => "parenthesized",
            NodeKind::Lambda => "lambda",
            NodeKind::Annotation => "annotation",
            NodeKind::TypeRef => "type_ref",
            NodeKind::Other => "other",
        }
    }

    /// Statement kinds, i.e. nodes that can appear directly inside a block.
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            NodeKind::VariableDecl
                | NodeKind::ExpressionStatement
                | NodeKind::Return
                | NodeKind::If
                | NodeKind::Loop
                | NodeKind::EnhancedFor
                | NodeKind::Try
                | NodeKind::Throw
                | NodeKind::Block
        )
    }
}

/// Position of a node inside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
    Root,
    Receiver,
    Argument,
    Left,
    Right,
    Operand,
    Condition,
    Then,
    Else,
    Body,
    Declarator,
    Initializer,
    Type,
    Parameter,
    Superclass,
    Interface,
    Member,
    Annotation,
    Statement,
    Expression,
    Other,
}

/// Literal value carried by [`NodeKind::Literal`] nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    String(String),
    Int(i64),
    Boolean(bool),
    Char(String),
    Null,
    Other(String),
}

/// Index of a node inside its [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Host-supplied payload of one node.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    pub range: TextRange,
    pub role: Role,
    /// Declared or referenced simple name (class, method, variable, invoked
    /// method, accessed field, annotation type).
    pub name: Option<String>,
    pub operator: Option<String>,
    pub literal: Option<Literal>,
    /// Type as written or attributed by the host, e.g. `int` on a declarator or
    /// `java.lang.String` on a string literal.
    pub type_name: Option<String>,
    pub modifiers: Vec<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    pub fn new(kind: NodeKind, range: TextRange) -> Self {
        Self {
            kind,
            range,
            role: Role::Other,
            name: None,
            operator: None,
            literal: None,
            type_name: None,
            modifiers: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    #[must_use]
    pub fn with_literal(mut self, literal: Literal) -> Self {
        self.literal = Some(literal);
        self
    }

    #[must_use]
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    #[must_use]
    pub fn with_modifier(mut self, modifier: impl Into<String>) -> Self {
        self.modifiers.push(modifier.into());
        self
    }
}

/// Arena holding every node of one compilation unit.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<NodeData>,
}

impl SyntaxTree {
    /// Create a tree consisting of only `root`.
    pub fn new(root: NodeData) -> Self {
        let mut root = root;
        root.role = Role::Root;
        root.parent = None;
        root.children.clear();
        Self { nodes: vec![root] }
    }

    /// Append `data` as the last child of `parent`. Children must be added in
    /// source order; traversal order follows insertion order.
    pub fn add_child(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let mut data = data;
        data.parent = Some(parent);
        data.children.clear();
        self.nodes.push(data);
        self.nodes[parent.index()].children.push(id);
        id
    }

    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            tree: self,
            id: NodeId(0),
        }
    }

    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_>> {
        (id.index() < self.nodes.len()).then_some(NodeRef { tree: self, id })
    }

    pub fn data_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Indented outline of the tree, one node per line.
    pub fn dump(&self, source: &str) -> String {
        let mut out = String::new();
        for (depth, node) in self.root().preorder_with_depth() {
            let mut text = source.get(node.range().as_std()).unwrap_or("").to_string();
            if text.len() > 48 {
                let cut = (0..=48).rev().find(|i| text.is_char_boundary(*i)).unwrap_or(0);
                text.truncate(cut);
                text.push_str("...");
            }
            let label = match node.name() {
                Some(name) => format!("{} `{}`", node.kind().as_str(), name),
                None => node.kind().as_str().to_string(),
            };
            out.push_str(&format!(
                "{}{} {:?} {} \"{}\"\n",
                "  ".repeat(depth),
                label,
                node.role(),
                node.range(),
                text.replace('\n', "\\n")
            ));
        }
        out
    }
}

/// Copyable handle to one node of a [`SyntaxTree`].
#[derive(Clone, Copy)]
pub struct NodeRef<'t> {
    tree: &'t SyntaxTree,
    id: NodeId,
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("range", &self.range())
            .finish()
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

impl<'t> NodeRef<'t> {
    fn data(&self) -> &'t NodeData {
        &self.tree.nodes[self.id.index()]
    }

    fn wrap(&self, id: NodeId) -> NodeRef<'t> {
        NodeRef {
            tree: self.tree,
            id,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    pub fn kind(&self) -> NodeKind {
        self.data().kind
    }

    pub fn range(&self) -> TextRange {
        self.data().range
    }

    pub fn role(&self) -> Role {
        self.data().role
    }

    pub fn name(&self) -> Option<&'t str> {
        self.data().name.as_deref()
    }

    pub fn operator(&self) -> Option<&'t str> {
        self.data().operator.as_deref()
    }

    pub fn literal(&self) -> Option<&'t Literal> {
        self.data().literal.as_ref()
    }

    pub fn type_name(&self) -> Option<&'t str> {
        self.data().type_name.as_deref()
    }

    pub fn modifiers(&self) -> &'t [String] {
        &self.data().modifiers
    }

    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.data().modifiers.iter().any(|m| m == modifier)
    }

    pub fn parent(&self) -> Option<NodeRef<'t>> {
        self.data().parent.map(|id| self.wrap(id))
    }

    pub fn children(&self) -> impl DoubleEndedIterator<Item = NodeRef<'t>> + ExactSizeIterator + use<'t> {
        let tree = self.tree;
        self.data()
            .children
            .iter()
            .map(move |&id| NodeRef { tree, id })
    }

    pub fn child_count(&self) -> usize {
        self.data().children.len()
    }

    pub fn children_with_role(&self, role: Role) -> impl Iterator<Item = NodeRef<'t>> + use<'t> {
        self.children().filter(move |c| c.role() == role)
    }

    pub fn child_with_role(&self, role: Role) -> Option<NodeRef<'t>> {
        self.children().find(|c| c.role() == role)
    }

    /// Strict ancestors, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = NodeRef<'t>> + use<'t> {
        std::iter::successors(self.parent(), |n| n.parent())
    }

    /// Strict descendants in pre-order.
    pub fn descendants(&self) -> impl Iterator<Item = NodeRef<'t>> + use<'t> {
        self.preorder().skip(1)
    }

    /// This node followed by its descendants, parent before children and
    /// children in source order.
    pub fn preorder(&self) -> impl Iterator<Item = NodeRef<'t>> + use<'t> {
        self.preorder_with_depth().map(|(_, n)| n)
    }

    fn preorder_with_depth(&self) -> impl Iterator<Item = (usize, NodeRef<'t>)> + use<'t> {
        let mut stack = vec![(0usize, *self)];
        std::iter::from_fn(move || {
            let (depth, node) = stack.pop()?;
            stack.extend(node.children().rev().map(|c| (depth + 1, c)));
            Some((depth, node))
        })
    }

    pub fn index_in_parent(&self) -> Option<usize> {
        let parent = self.parent()?;
        parent.data().children.iter().position(|&id| id == self.id)
    }

    pub fn previous_sibling(&self) -> Option<NodeRef<'t>> {
        let idx = self.index_in_parent()?;
        let parent = self.parent()?;
        idx.checked_sub(1)
            .map(|i| parent.wrap(parent.data().children[i]))
    }

    pub fn next_sibling(&self) -> Option<NodeRef<'t>> {
        let idx = self.index_in_parent()?;
        let parent = self.parent()?;
        parent.data().children.get(idx + 1).map(|&id| parent.wrap(id))
    }

    /// Nearest strict ancestor of `kind`.
    pub fn enclosing(&self, kind: NodeKind) -> Option<NodeRef<'t>> {
        self.ancestors().find(|n| n.kind() == kind)
    }

    /// Source text covered by this node.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.range().as_std()).unwrap_or("")
    }
}
