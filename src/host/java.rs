//! Java host built on `tree-sitter-java`.
//!
//! The concrete syntax tree is lowered into the crate's [`SyntaxTree`]:
//! punctuation is dropped, declared names and modifiers become node
//! attributes, and children carry a [`Role`] describing their slot. Type
//! declarations and imports populate the unit's [`TypeTable`]; nothing outside
//! the unit and a small `java.lang` core is known.

use super::HostError;
use crate::log_event;
use crate::source::{SourceFile, TextRange};
use crate::tree::{Literal, NodeData, NodeId, NodeKind, Role, SyntaxTree};
use crate::types::{TypeKind, TypeTable};
use crate::unit::CompilationUnit;
use std::path::Path;
use tree_sitter::{Node, Parser};

const TYPE_KINDS: &[&str] = &[
    "type_identifier",
    "generic_type",
    "scoped_type_identifier",
    "integral_type",
    "floating_point_type",
    "boolean_type",
    "void_type",
    "array_type",
    "annotated_type",
];

const LITERAL_KINDS: &[&str] = &[
    "decimal_integer_literal",
    "hex_integer_literal",
    "octal_integer_literal",
    "binary_integer_literal",
    "decimal_floating_point_literal",
    "hex_floating_point_literal",
    "true",
    "false",
    "character_literal",
    "string_literal",
    "text_block",
    "null_literal",
];

/// Parse and lower one Java compilation unit. Sources with syntax errors are
/// rejected.
pub fn parse_java(text: &str) -> Result<CompilationUnit, HostError> {
    let mut parser = Parser::new();
    parser
        .set_language(tree_sitter_java::language())
        .map_err(|err| HostError::Language(format!("{err:?}")))?;
    let parsed = parser.parse(text, None).ok_or(HostError::NoTree)?;
    let root = parsed.root_node();
    if root.has_error() {
        return Err(syntax_error(root, text));
    }

    let mut lowering = Lowering::new(text)?;
    lowering.lower_unit(root)?;
    log_event!(debug, nodes = lowering.tree.len(), "lowered java unit");
    Ok(CompilationUnit::new(
        SourceFile::new(text),
        lowering.tree,
        lowering.types,
    ))
}

pub fn parse_java_file(path: &Path) -> Result<CompilationUnit, HostError> {
    let text = std::fs::read_to_string(path).map_err(|source| HostError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_java(&text)?.with_path(path))
}

fn syntax_error(root: Node<'_>, text: &str) -> HostError {
    let node = first_error(root).unwrap_or(root);
    let position = node.start_position();
    let mut snippet: String = text
        .get(node.start_byte()..node.end_byte())
        .unwrap_or("")
        .chars()
        .take(24)
        .collect();
    if node.is_missing() {
        snippet = format!("missing {}", node.kind());
    }
    HostError::Syntax {
        line: position.row + 1,
        column: position.column + 1,
        snippet,
    }
}

fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    let mut node = root;
    loop {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        let mut cursor = node.walk();
        let next = node
            .children(&mut cursor)
            .find(|c| c.has_error() || c.is_missing());
        node = next?;
    }
}

/// Named, non-extra children in source order, with their field names.
fn named_children(node: Node<'_>) -> Vec<(Option<&'static str>, Node<'_>)> {
    let mut cursor = node.walk();
    let mut out = Vec::new();
    if cursor.goto_first_child() {
        loop {
            let child = cursor.node();
            if child.is_named() && !child.is_extra() {
                out.push((cursor.field_name(), child));
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    out
}

fn unparenthesize(node: Node<'_>) -> Node<'_> {
    if node.kind() == "parenthesized_expression" {
        if let Some((_, inner)) = named_children(node).into_iter().next() {
            return inner;
        }
    }
    node
}

/// Deferred lowering step. Children are queued instead of lowered in place so
/// nesting depth never turns into call depth.
enum Work<'s> {
    Node(Node<'s>, NodeId, Role),
    Declarator(Node<'s>, NodeId, Option<&'s str>),
    AnonymousClass(Node<'s>, NodeId),
    /// Closes the innermost named type declaration once its members are done.
    LeaveClass,
}

struct Lowering<'s> {
    text: &'s str,
    tree: SyntaxTree,
    types: TypeTable,
    /// Qualified names of the enclosing named type declarations.
    classes: Vec<String>,
    /// Work queued by the node being lowered, in source order.
    pending: Vec<Work<'s>>,
}

impl<'s> Lowering<'s> {
    fn new(text: &'s str) -> Result<Self, HostError> {
        let root = NodeData::new(NodeKind::CompilationUnit, TextRange::new(0, text.len())?);
        Ok(Self {
            text,
            tree: SyntaxTree::new(root),
            types: TypeTable::with_java_lang(),
            classes: Vec::new(),
            pending: Vec::new(),
        })
    }

    fn lower_unit(&mut self, root: Node<'s>) -> Result<(), HostError> {
        let unit = self.tree.root().id();
        for (_, child) in named_children(root) {
            self.defer(child, unit, Role::Member);
        }
        let mut stack = Vec::new();
        loop {
            // children of the last lowered node run before its later siblings
            stack.extend(self.pending.drain(..).rev());
            let Some(work) = stack.pop() else {
                return Ok(());
            };
            match work {
                Work::Node(node, parent, role) => self.lower(node, parent, role)?,
                Work::Declarator(node, parent, declared) => {
                    self.lower_declarator(node, parent, declared)?
                }
                Work::AnonymousClass(body, parent) => self.lower_anonymous_class(body, parent)?,
                Work::LeaveClass => {
                    self.classes.pop();
                }
            }
        }
    }

    fn defer(&mut self, node: Node<'s>, parent: NodeId, role: Role) {
        self.pending.push(Work::Node(node, parent, role));
    }

    fn text(&self, node: Node<'s>) -> &'s str {
        self.text.get(node.start_byte()..node.end_byte()).unwrap_or("")
    }

    fn field_text(&self, node: Node<'s>, field: &str) -> Option<&'s str> {
        node.child_by_field_name(field).map(|n| self.text(n))
    }

    fn data(&self, node: Node<'s>, kind: NodeKind, role: Role) -> Result<NodeData, HostError> {
        let range = TextRange::new(node.start_byte(), node.end_byte())?;
        Ok(NodeData::new(kind, range).with_role(role))
    }

    fn add(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        self.tree.add_child(parent, data)
    }

    fn lower(&mut self, node: Node<'s>, parent: NodeId, role: Role) -> Result<(), HostError> {
        match node.kind() {
            "line_comment" | "block_comment" | "comment" => Ok(()),
            "dimensions" | "type_parameters" | "type_arguments" => Ok(()),
            "package_declaration" => self.lower_package(node, parent),
            "import_declaration" => self.lower_import(node, parent),
            "class_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "record_declaration"
            | "annotation_type_declaration" => self.lower_class(node, parent, role),
            "method_declaration"
            | "constructor_declaration"
            | "compact_constructor_declaration"
            | "annotation_type_element_declaration" => self.lower_method(node, parent, role),
            "field_declaration" | "constant_declaration" => {
                self.lower_variables(node, parent, role, NodeKind::FieldDecl)
            }
            "local_variable_declaration" => {
                self.lower_variables(node, parent, role, NodeKind::VariableDecl)
            }
            "formal_parameter" | "spread_parameter" | "catch_formal_parameter"
            | "receiver_parameter" => self.lower_parameter(node, parent),
            "enum_constant" => self.lower_enum_constant(node, parent),
            "block" | "constructor_body" => self.lower_block(node, parent, role),
            "expression_statement" => {
                self.lower_wrapper(node, parent, role, NodeKind::ExpressionStatement)
            }
            "return_statement" => self.lower_wrapper(node, parent, role, NodeKind::Return),
            "throw_statement" => self.lower_wrapper(node, parent, role, NodeKind::Throw),
            "if_statement" => self.lower_if(node, parent, role),
            "while_statement" | "do_statement" | "for_statement" => {
                self.lower_loop(node, parent, role)
            }
            "enhanced_for_statement" => self.lower_enhanced_for(node, parent, role),
            "try_statement" | "try_with_resources_statement" => {
                self.lower_try(node, parent, role)
            }
            "catch_clause" => self.lower_catch(node, parent, role),
            "method_invocation" | "explicit_constructor_invocation" => {
                self.lower_invocation(node, parent, role)
            }
            "object_creation_expression" => self.lower_new(node, parent, role),
            "field_access" => self.lower_field_access(node, parent, role),
            "identifier" => {
                let data = self
                    .data(node, NodeKind::Identifier, role)?
                    .with_name(self.text(node));
                self.add(parent, data);
                Ok(())
            }
            "this" | "super" => {
                let data = self
                    .data(node, NodeKind::Identifier, role)?
                    .with_name(node.kind());
                self.add(parent, data);
                Ok(())
            }
            kind if LITERAL_KINDS.contains(&kind) => self.lower_literal(node, parent, role),
            "binary_expression" => self.lower_binary(node, parent, role),
            "instanceof_expression" => self.lower_instanceof(node, parent, role),
            "unary_expression" | "update_expression" => self.lower_unary(node, parent, role),
            "assignment_expression" => self.lower_assignment(node, parent, role),
            "ternary_expression" => self.lower_conditional(node, parent, role),
            "parenthesized_expression" => {
                self.lower_wrapper(node, parent, role, NodeKind::Parenthesized)
            }
            "lambda_expression" => self.lower_lambda(node, parent, role),
            "cast_expression" => self.lower_cast(node, parent, role),
            "annotation" | "marker_annotation" => self.lower_annotation(node, parent),
            "element_value_pair" => self.lower_element_value_pair(node, parent, role),
            "modifiers" => self.apply_modifiers(node, parent),
            kind if TYPE_KINDS.contains(&kind) => {
                let data = self
                    .data(node, NodeKind::TypeRef, role)?
                    .with_name(self.text(node));
                self.add(parent, data);
                Ok(())
            }
            "scoped_identifier" => {
                let data = self
                    .data(node, NodeKind::Other, role)?
                    .with_name(self.text(node));
                self.add(parent, data);
                Ok(())
            }
            _ => self.lower_generic(node, parent, role),
        }
    }

    fn lower_generic(&mut self, node: Node<'s>, parent: NodeId, role: Role) -> Result<(), HostError> {
        let data = self.data(node, NodeKind::Other, role)?;
        let id = self.add(parent, data);
        for (_, child) in named_children(node) {
            self.defer(child, id, Role::Other);
        }
        Ok(())
    }

    /// Keywords become modifiers of `owner`; annotations become its
    /// children.
    fn apply_modifiers(&mut self, node: Node<'s>, owner: NodeId) -> Result<(), HostError> {
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        for child in children {
            match child.kind() {
                "annotation" | "marker_annotation" => self.lower_annotation(child, owner)?,
                _ if !child.is_named() => {
                    let keyword = self.text(child).to_string();
                    if let Some(data) = self.tree.data_mut(owner) {
                        data.modifiers.push(keyword);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn lower_annotation(&mut self, node: Node<'s>, owner: NodeId) -> Result<(), HostError> {
        let mut data = self.data(node, NodeKind::Annotation, Role::Annotation)?;
        if let Some(name) = self.field_text(node, "name") {
            data = data.with_name(name);
        }
        let id = self.add(owner, data);
        if let Some(arguments) = node.child_by_field_name("arguments") {
            for (_, arg) in named_children(arguments) {
                self.defer(arg, id, Role::Argument);
            }
        }
        Ok(())
    }

    fn lower_element_value_pair(
        &mut self,
        node: Node<'s>,
        parent: NodeId,
        role: Role,
    ) -> Result<(), HostError> {
        let mut data = self.data(node, NodeKind::Other, role)?;
        if let Some(key) = self.field_text(node, "key") {
            data = data.with_name(key);
        }
        let id = self.add(parent, data);
        if let Some(value) = node.child_by_field_name("value") {
            self.defer(value, id, Role::Expression);
        }
        Ok(())
    }

    fn lower_package(&mut self, node: Node<'s>, parent: NodeId) -> Result<(), HostError> {
        let name = named_children(node)
            .into_iter()
            .map(|(_, c)| c)
            .find(|c| matches!(c.kind(), "identifier" | "scoped_identifier"))
            .map(|c| self.text(c));
        let mut data = self.data(node, NodeKind::Package, Role::Other)?;
        if let Some(name) = name {
            self.types.set_package(name);
            data = data.with_name(name);
        }
        self.add(parent, data);
        Ok(())
    }

    fn lower_import(&mut self, node: Node<'s>, parent: NodeId) -> Result<(), HostError> {
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        let is_static = children.iter().any(|c| c.kind() == "static");
        let wildcard = children.iter().any(|c| c.kind() == "asterisk");
        let Some(path) = children
            .iter()
            .find(|c| matches!(c.kind(), "identifier" | "scoped_identifier"))
            .map(|c| self.text(*c))
        else {
            return Ok(());
        };

        let name = if wildcard {
            format!("{path}.*")
        } else {
            path.to_string()
        };
        let mut data = self.data(node, NodeKind::Import, Role::Other)?.with_name(name);
        if is_static {
            data = data.with_modifier("static");
        } else if !wildcard {
            self.types.add_import(path);
        }
        self.add(parent, data);
        Ok(())
    }

    fn lower_class(&mut self, node: Node<'s>, parent: NodeId, role: Role) -> Result<(), HostError> {
        let name = self.field_text(node, "name");
        let children = named_children(node);

        let mut supertypes = Vec::new();
        for (_, child) in &children {
            if matches!(
                child.kind(),
                "superclass" | "super_interfaces" | "extends_interfaces"
            ) {
                supertypes.extend(supertype_nodes(*child).into_iter().map(|t| self.text(t).to_string()));
            }
        }

        let mut data = self.data(node, NodeKind::ClassDecl, role)?;
        if let Some(name) = name {
            data = data.with_name(name);
        }
        let id = self.add(parent, data);

        let qualified = name.map(|name| {
            let qualified = match (self.classes.last(), self.types.package()) {
                (Some(outer), _) => format!("{outer}.{name}"),
                (None, Some(package)) => format!("{package}.{name}"),
                (None, None) => name.to_string(),
            };
            let kind = match node.kind() {
                "interface_declaration" | "annotation_type_declaration" => TypeKind::Interface,
                _ => TypeKind::Class,
            };
            self.types.declare(&qualified, name, kind, supertypes);
            qualified
        });
        let named = qualified.is_some();
        self.classes.extend(qualified);
        self.lower_class_children(&children, id)?;
        if named {
            self.pending.push(Work::LeaveClass);
        }
        Ok(())
    }

    fn lower_class_children(
        &mut self,
        children: &[(Option<&'static str>, Node<'s>)],
        id: NodeId,
    ) -> Result<(), HostError> {
        for &(field, child) in children {
            match child.kind() {
                "modifiers" => self.apply_modifiers(child, id)?,
                "identifier" if field == Some("name") => {}
                "permits" => {}
                "superclass" => {
                    for ty in supertype_nodes(child) {
                        self.defer(ty, id, Role::Superclass);
                    }
                }
                "super_interfaces" | "extends_interfaces" => {
                    for ty in supertype_nodes(child) {
                        self.defer(ty, id, Role::Interface);
                    }
                }
                "formal_parameters" => self.lower_parameters(child, id)?,
                "class_body" | "interface_body" | "enum_body" | "annotation_type_body" => {
                    self.lower_members(child, id)?;
                }
                _ => self.defer(child, id, Role::Other),
            }
        }
        Ok(())
    }

    fn lower_members(&mut self, body: Node<'s>, class: NodeId) -> Result<(), HostError> {
        for (_, member) in named_children(body) {
            if member.kind() == "enum_body_declarations" {
                self.lower_members(member, class)?;
            } else {
                self.defer(member, class, Role::Member);
            }
        }
        Ok(())
    }

    fn lower_anonymous_class(
        &mut self,
        body: Node<'s>,
        parent: NodeId,
    ) -> Result<(), HostError> {
        let data = self.data(body, NodeKind::ClassDecl, Role::Member)?;
        let id = self.add(parent, data);
        self.lower_members(body, id)
    }

    fn lower_method(&mut self, node: Node<'s>, parent: NodeId, role: Role) -> Result<(), HostError> {
        let mut data = self.data(node, NodeKind::MethodDecl, role)?;
        if let Some(name) = self.field_text(node, "name") {
            data = data.with_name(name);
        }
        if let Some(ty) = self.field_text(node, "type") {
            data = data.with_type(ty);
        }
        let id = self.add(parent, data);
        for (field, child) in named_children(node) {
            match (field, child.kind()) {
                (_, "modifiers") => self.apply_modifiers(child, id)?,
                (Some("name"), _) => {}
                (Some("type"), _) => self.defer(child, id, Role::Type),
                (_, "formal_parameters") => self.lower_parameters(child, id)?,
                (Some("body"), _) => self.defer(child, id, Role::Body),
                _ => self.defer(child, id, Role::Other),
            }
        }
        Ok(())
    }

    fn lower_parameters(&mut self, params: Node<'s>, owner: NodeId) -> Result<(), HostError> {
        for (_, param) in named_children(params) {
            match param.kind() {
                "identifier" => {
                    let data = self
                        .data(param, NodeKind::Parameter, Role::Parameter)?
                        .with_name(self.text(param));
                    self.add(owner, data);
                }
                _ => self.defer(param, owner, Role::Parameter),
            }
        }
        Ok(())
    }

    fn lower_parameter(&mut self, node: Node<'s>, parent: NodeId) -> Result<(), HostError> {
        let children = named_children(node);
        let (name, declared) = match node.kind() {
            "spread_parameter" => {
                let name = children
                    .iter()
                    .find(|(_, c)| c.kind() == "variable_declarator")
                    .and_then(|(_, d)| self.field_text(*d, "name"));
                let ty = children
                    .iter()
                    .find(|(_, c)| TYPE_KINDS.contains(&c.kind()))
                    .map(|(_, t)| format!("{}...", self.text(*t)));
                (name, ty)
            }
            "catch_formal_parameter" => {
                let ty = children
                    .iter()
                    .find(|(_, c)| c.kind() == "catch_type")
                    .map(|(_, t)| self.text(*t).to_string());
                (self.field_text(node, "name"), ty)
            }
            "receiver_parameter" => (Some("this"), self.field_text(node, "type").map(str::to_string)),
            _ => {
                let ty = self.field_text(node, "type").map(|ty| {
                    match self.field_text(node, "dimensions") {
                        Some(dims) => format!("{ty}{dims}"),
                        None => ty.to_string(),
                    }
                });
                (self.field_text(node, "name"), ty)
            }
        };

        let mut data = self.data(node, NodeKind::Parameter, Role::Parameter)?;
        if let Some(name) = name {
            data = data.with_name(name);
        }
        if let Some(ty) = declared {
            data = data.with_type(ty);
        }
        let id = self.add(parent, data);
        for (_, child) in children {
            match child.kind() {
                "modifiers" => self.apply_modifiers(child, id)?,
                "catch_type" => {
                    for (_, ty) in named_children(child) {
                        self.defer(ty, id, Role::Type);
                    }
                }
                kind if TYPE_KINDS.contains(&kind) => self.defer(child, id, Role::Type),
                _ => {}
            }
        }
        Ok(())
    }

    fn lower_variables(
        &mut self,
        node: Node<'s>,
        parent: NodeId,
        role: Role,
        kind: NodeKind,
    ) -> Result<(), HostError> {
        let declared = self.field_text(node, "type");
        let data = self.data(node, kind, role)?;
        let id = self.add(parent, data);
        for (field, child) in named_children(node) {
            match (field, child.kind()) {
                (_, "modifiers") => self.apply_modifiers(child, id)?,
                (Some("type"), _) => self.defer(child, id, Role::Type),
                (_, "variable_declarator") => {
                    self.pending.push(Work::Declarator(child, id, declared))
                }
                _ => self.defer(child, id, Role::Other),
            }
        }
        Ok(())
    }

    fn lower_declarator(
        &mut self,
        node: Node<'s>,
        parent: NodeId,
        declared: Option<&str>,
    ) -> Result<(), HostError> {
        let mut data = self.data(node, NodeKind::Declarator, Role::Declarator)?;
        if let Some(name) = self.field_text(node, "name") {
            data = data.with_name(name);
        }
        if let Some(ty) = declared {
            data = match self.field_text(node, "dimensions") {
                Some(dims) => data.with_type(format!("{ty}{dims}")),
                None => data.with_type(ty),
            };
        }
        let id = self.add(parent, data);
        if let Some(value) = node.child_by_field_name("value") {
            self.defer(value, id, Role::Initializer);
        }
        Ok(())
    }

    fn lower_enum_constant(&mut self, node: Node<'s>, parent: NodeId) -> Result<(), HostError> {
        let field = self.data(node, NodeKind::FieldDecl, Role::Member)?;
        let field = self.add(parent, field);
        let mut data = self.data(node, NodeKind::Declarator, Role::Declarator)?;
        if let Some(name) = self.field_text(node, "name") {
            data = data.with_name(name);
        }
        if let Some(owner) = self.classes.last() {
            data = data.with_type(owner.clone());
        }
        let id = self.add(field, data);
        for (_, child) in named_children(node) {
            match child.kind() {
                "modifiers" => self.apply_modifiers(child, field)?,
                "argument_list" => self.lower_arguments(child, id)?,
                "class_body" => self.pending.push(Work::AnonymousClass(child, id)),
                _ => {}
            }
        }
        Ok(())
    }

    fn lower_block(&mut self, node: Node<'s>, parent: NodeId, role: Role) -> Result<(), HostError> {
        let data = self.data(node, NodeKind::Block, role)?;
        let id = self.add(parent, data);
        for (_, child) in named_children(node) {
            self.defer(child, id, Role::Statement);
        }
        Ok(())
    }

    fn lower_wrapper(
        &mut self,
        node: Node<'s>,
        parent: NodeId,
        role: Role,
        kind: NodeKind,
    ) -> Result<(), HostError> {
        let data = self.data(node, kind, role)?;
        let id = self.add(parent, data);
        for (_, child) in named_children(node) {
            self.defer(child, id, Role::Expression);
        }
        Ok(())
    }

    fn lower_if(&mut self, node: Node<'s>, parent: NodeId, role: Role) -> Result<(), HostError> {
        let data = self.data(node, NodeKind::If, role)?;
        let id = self.add(parent, data);
        for (field, child) in named_children(node) {
            match field {
                Some("condition") => self.defer(unparenthesize(child), id, Role::Condition),
                Some("consequence") => self.defer(child, id, Role::Then),
                Some("alternative") => self.defer(child, id, Role::Else),
                _ => self.defer(child, id, Role::Other),
            }
        }
        Ok(())
    }

    fn lower_loop(&mut self, node: Node<'s>, parent: NodeId, role: Role) -> Result<(), HostError> {
        let data = self.data(node, NodeKind::Loop, role)?;
        let id = self.add(parent, data);
        for (field, child) in named_children(node) {
            match field {
                Some("condition") => self.defer(unparenthesize(child), id, Role::Condition),
                Some("body") => self.defer(child, id, Role::Body),
                _ => self.defer(child, id, Role::Other),
            }
        }
        Ok(())
    }

    fn lower_enhanced_for(
        &mut self,
        node: Node<'s>,
        parent: NodeId,
        role: Role,
    ) -> Result<(), HostError> {
        let mut data = self.data(node, NodeKind::EnhancedFor, role)?;
        if let Some(name) = self.field_text(node, "name") {
            data = data.with_name(name);
        }
        if let Some(ty) = self.field_text(node, "type") {
            data = data.with_type(ty);
        }
        let id = self.add(parent, data);
        for (field, child) in named_children(node) {
            match (field, child.kind()) {
                (_, "modifiers") => self.apply_modifiers(child, id)?,
                (Some("name"), _) | (Some("dimensions"), _) => {}
                (Some("type"), _) => self.defer(child, id, Role::Type),
                (Some("value"), _) => self.defer(child, id, Role::Expression),
                (Some("body"), _) => self.defer(child, id, Role::Body),
                _ => self.defer(child, id, Role::Other),
            }
        }
        Ok(())
    }

    fn lower_try(&mut self, node: Node<'s>, parent: NodeId, role: Role) -> Result<(), HostError> {
        let data = self.data(node, NodeKind::Try, role)?;
        let id = self.add(parent, data);
        for (field, child) in named_children(node) {
            match field {
                Some("body") => self.defer(child, id, Role::Body),
                _ => self.defer(child, id, Role::Other),
            }
        }
        Ok(())
    }

    fn lower_catch(&mut self, node: Node<'s>, parent: NodeId, role: Role) -> Result<(), HostError> {
        let data = self.data(node, NodeKind::Catch, role)?;
        let id = self.add(parent, data);
        for (field, child) in named_children(node) {
            match (field, child.kind()) {
                (_, "catch_formal_parameter") => self.lower_parameter(child, id)?,
                (Some("body"), _) => self.defer(child, id, Role::Body),
                _ => self.defer(child, id, Role::Other),
            }
        }
        Ok(())
    }

    fn lower_arguments(&mut self, list: Node<'s>, owner: NodeId) -> Result<(), HostError> {
        for (_, arg) in named_children(list) {
            self.defer(arg, owner, Role::Argument);
        }
        Ok(())
    }

    fn lower_invocation(
        &mut self,
        node: Node<'s>,
        parent: NodeId,
        role: Role,
    ) -> Result<(), HostError> {
        let name = self
            .field_text(node, "name")
            .or_else(|| self.field_text(node, "constructor"));
        let mut data = self.data(node, NodeKind::MethodInvocation, role)?;
        if let Some(name) = name {
            data = data.with_name(name);
        }
        let id = self.add(parent, data);
        for (field, child) in named_children(node) {
            match (field, child.kind()) {
                (Some("name"), _) | (Some("constructor"), _) => {}
                (Some("object"), _) => self.defer(child, id, Role::Receiver),
                (_, "argument_list") => self.lower_arguments(child, id)?,
                _ => self.defer(child, id, Role::Other),
            }
        }
        Ok(())
    }

    fn lower_new(&mut self, node: Node<'s>, parent: NodeId, role: Role) -> Result<(), HostError> {
        let mut data = self.data(node, NodeKind::NewClass, role)?;
        if let Some(ty) = self.field_text(node, "type") {
            data = data.with_type(ty);
        }
        let id = self.add(parent, data);
        for (field, child) in named_children(node) {
            match (field, child.kind()) {
                (Some("type"), _) => self.defer(child, id, Role::Type),
                (_, "argument_list") => self.lower_arguments(child, id)?,
                (_, "class_body") => self.pending.push(Work::AnonymousClass(child, id)),
                (_, "type_arguments") => {}
                _ => self.defer(child, id, Role::Receiver),
            }
        }
        Ok(())
    }

    fn lower_field_access(
        &mut self,
        node: Node<'s>,
        parent: NodeId,
        role: Role,
    ) -> Result<(), HostError> {
        let mut data = self.data(node, NodeKind::FieldAccess, role)?;
        if let Some(name) = self.field_text(node, "field") {
            data = data.with_name(name);
        }
        let id = self.add(parent, data);
        for (field, child) in named_children(node) {
            match field {
                Some("object") => self.defer(child, id, Role::Receiver),
                Some("field") => {}
                _ => self.defer(child, id, Role::Other),
            }
        }
        Ok(())
    }

    fn lower_literal(&mut self, node: Node<'s>, parent: NodeId, role: Role) -> Result<(), HostError> {
        let (literal, ty) = literal_value(node.kind(), self.text(node));
        let data = self
            .data(node, NodeKind::Literal, role)?
            .with_literal(literal)
            .with_type(ty);
        self.add(parent, data);
        Ok(())
    }

    fn lower_binary(&mut self, node: Node<'s>, parent: NodeId, role: Role) -> Result<(), HostError> {
        let mut data = self.data(node, NodeKind::Binary, role)?;
        if let Some(op) = self.field_text(node, "operator") {
            data = data.with_operator(op);
        }
        let id = self.add(parent, data);
        for (field, child) in named_children(node) {
            match field {
                Some("left") => self.defer(child, id, Role::Left),
                Some("right") => self.defer(child, id, Role::Right),
                _ => self.defer(child, id, Role::Other),
            }
        }
        Ok(())
    }

    fn lower_instanceof(
        &mut self,
        node: Node<'s>,
        parent: NodeId,
        role: Role,
    ) -> Result<(), HostError> {
        let data = self
            .data(node, NodeKind::Binary, role)?
            .with_operator("instanceof");
        let id = self.add(parent, data);
        for (field, child) in named_children(node) {
            match field {
                Some("left") => self.defer(child, id, Role::Left),
                Some("right") => self.defer(child, id, Role::Right),
                _ => {}
            }
        }
        Ok(())
    }

    fn lower_unary(&mut self, node: Node<'s>, parent: NodeId, role: Role) -> Result<(), HostError> {
        let mut cursor = node.walk();
        let operator = node
            .children(&mut cursor)
            .find(|c| !c.is_named())
            .map(|c| self.text(c));
        let mut data = self.data(node, NodeKind::Unary, role)?;
        if let Some(op) = operator {
            data = data.with_operator(op);
        }
        let id = self.add(parent, data);
        for (_, child) in named_children(node) {
            self.defer(child, id, Role::Operand);
        }
        Ok(())
    }

    fn lower_assignment(
        &mut self,
        node: Node<'s>,
        parent: NodeId,
        role: Role,
    ) -> Result<(), HostError> {
        let mut data = self.data(node, NodeKind::Assignment, role)?;
        if let Some(op) = self.field_text(node, "operator") {
            data = data.with_operator(op);
        }
        let id = self.add(parent, data);
        for (field, child) in named_children(node) {
            match field {
                Some("left") => self.defer(child, id, Role::Left),
                Some("right") => self.defer(child, id, Role::Right),
                _ => self.defer(child, id, Role::Other),
            }
        }
        Ok(())
    }

    fn lower_conditional(
        &mut self,
        node: Node<'s>,
        parent: NodeId,
        role: Role,
    ) -> Result<(), HostError> {
        let data = self.data(node, NodeKind::Conditional, role)?;
        let id = self.add(parent, data);
        for (field, child) in named_children(node) {
            match field {
                Some("condition") => self.defer(child, id, Role::Condition),
                Some("consequence") => self.defer(child, id, Role::Then),
                Some("alternative") => self.defer(child, id, Role::Else),
                _ => self.defer(child, id, Role::Other),
            }
        }
        Ok(())
    }

    fn lower_lambda(&mut self, node: Node<'s>, parent: NodeId, role: Role) -> Result<(), HostError> {
        let data = self.data(node, NodeKind::Lambda, role)?;
        let id = self.add(parent, data);
        for (field, child) in named_children(node) {
            match (field, child.kind()) {
                (Some("parameters"), "identifier") => {
                    let data = self
                        .data(child, NodeKind::Parameter, Role::Parameter)?
                        .with_name(self.text(child));
                    self.add(id, data);
                }
                (Some("parameters"), _) => self.lower_parameters(child, id)?,
                (Some("body"), _) => self.defer(child, id, Role::Body),
                _ => self.defer(child, id, Role::Other),
            }
        }
        Ok(())
    }

    fn lower_cast(&mut self, node: Node<'s>, parent: NodeId, role: Role) -> Result<(), HostError> {
        let mut data = self.data(node, NodeKind::Other, role)?;
        if let Some(ty) = self.field_text(node, "type") {
            data = data.with_type(ty);
        }
        let id = self.add(parent, data);
        for (field, child) in named_children(node) {
            match field {
                Some("type") => self.defer(child, id, Role::Type),
                Some("value") => self.defer(child, id, Role::Operand),
                _ => self.defer(child, id, Role::Other),
            }
        }
        Ok(())
    }
}

/// Type nodes named by a `superclass`/`super_interfaces`/`extends_interfaces`
/// clause.
fn supertype_nodes(clause: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    for (_, child) in named_children(clause) {
        if child.kind() == "type_list" {
            out.extend(named_children(child).into_iter().map(|(_, t)| t));
        } else if TYPE_KINDS.contains(&child.kind()) {
            out.push(child);
        }
    }
    out
}

fn literal_value(kind: &str, text: &str) -> (Literal, &'static str) {
    match kind {
        "true" => (Literal::Boolean(true), "boolean"),
        "false" => (Literal::Boolean(false), "boolean"),
        "null_literal" => (Literal::Null, "null"),
        "character_literal" => {
            let inner = text
                .strip_prefix('\'')
                .and_then(|t| t.strip_suffix('\''))
                .unwrap_or(text);
            (Literal::Char(unescape(inner)), "char")
        }
        "string_literal" | "text_block" => (Literal::String(string_value(text)), "java.lang.String"),
        "decimal_floating_point_literal" | "hex_floating_point_literal" => {
            let ty = if text.ends_with(['f', 'F']) { "float" } else { "double" };
            (Literal::Other(text.to_string()), ty)
        }
        _ => integer_value(kind, text),
    }
}

fn integer_value(kind: &str, text: &str) -> (Literal, &'static str) {
    let long = text.ends_with(['l', 'L']);
    let ty = if long { "long" } else { "int" };
    let digits: String = text
        .trim_end_matches(['l', 'L'])
        .chars()
        .filter(|c| *c != '_')
        .collect();
    let radix_value = |prefixes: &[&str], radix: u32| {
        let body = prefixes
            .iter()
            .find_map(|p| digits.strip_prefix(p))
            .unwrap_or(&digits);
        if body.is_empty() {
            return Some(0);
        }
        let value = u64::from_str_radix(body, radix).ok()?;
        // non-decimal int literals wrap into the 32-bit range
        Some(if long { value as i64 } else { value as u32 as i32 as i64 })
    };
    let value = match kind {
        "hex_integer_literal" => radix_value(&["0x", "0X"], 16),
        "binary_integer_literal" => radix_value(&["0b", "0B"], 2),
        "octal_integer_literal" => radix_value(&["0o", "0O", "0"], 8),
        _ => digits.parse::<i64>().ok(),
    };
    match value {
        Some(v) => (Literal::Int(v), ty),
        None => (Literal::Other(text.to_string()), ty),
    }
}

fn string_value(text: &str) -> String {
    if let Some(body) = text.strip_prefix("\"\"\"").and_then(|t| t.strip_suffix("\"\"\"")) {
        // the content of a text block starts after the opening line
        let body = body.split_once('\n').map_or(body, |(_, rest)| rest);
        return unescape(body);
    }
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text);
    unescape(inner)
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('s') => out.push(' '),
            Some('u') => {
                while chars.peek() == Some(&'u') {
                    chars.next();
                }
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(d @ '0'..='7') => {
                let mut value = d.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(next) if value * 8 + next <= 0o377 => {
                            value = value * 8 + next;
                            chars.next();
                        }
                        _ => break,
                    }
                }
                out.extend(char::from_u32(value));
            }
            Some('\n') => {}
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeRef;

    fn nodes(unit: &CompilationUnit, kind: NodeKind) -> Vec<NodeRef<'_>> {
        unit.tree
            .root()
            .preorder()
            .filter(|n| n.kind() == kind)
            .collect()
    }

    #[test]
    fn declarations_carry_names_types_and_modifiers() {
        let src = r#"package com.example;

import java.util.List;
import static java.util.Objects.requireNonNull;

public final class Box<T> extends Base implements Comparable<Box<T>> {
    private final List<String> items = null, extra;
    int[] counts;

    @Override
    public int compareTo(Box<T> other, String... rest) {
        for (String item : items) { use(item); }
        return 0;
    }
}"#;
        let unit = parse_java(src).unwrap();

        let class = nodes(&unit, NodeKind::ClassDecl)[0];
        assert_eq!(class.name(), Some("Box"));
        assert_eq!(class.modifiers(), ["public", "final"]);
        assert_eq!(class.child_with_role(Role::Superclass).unwrap().name(), Some("Base"));

        let declarators: Vec<_> = nodes(&unit, NodeKind::Declarator)
            .into_iter()
            .map(|d| (d.name().unwrap(), d.type_name().unwrap()))
            .collect();
        assert_eq!(
            declarators,
            vec![("items", "List<String>"), ("extra", "List<String>"), ("counts", "int[]")]
        );

        let params: Vec<_> = nodes(&unit, NodeKind::Parameter)
            .into_iter()
            .map(|p| (p.name().unwrap(), p.type_name().unwrap()))
            .collect();
        assert_eq!(params, vec![("other", "Box<T>"), ("rest", "String...")]);

        let method = nodes(&unit, NodeKind::MethodDecl)[0];
        assert_eq!(method.type_name(), Some("int"));
        assert_eq!(
            method.child_with_role(Role::Annotation).unwrap().name(),
            Some("Override")
        );

        let each = nodes(&unit, NodeKind::EnhancedFor)[0];
        assert_eq!((each.name(), each.type_name()), (Some("item"), Some("String")));

        let imports: Vec<_> = nodes(&unit, NodeKind::Import)
            .into_iter()
            .map(|i| (i.name().unwrap(), i.has_modifier("static")))
            .collect();
        assert_eq!(
            imports,
            vec![
                ("java.util.List", false),
                ("java.util.Objects.requireNonNull", true)
            ]
        );

        let box_type = unit.types.resolve("Box").unwrap();
        assert_eq!(unit.types.name(box_type), "com.example.Box");
        assert!(unit.types.resolve("List").is_some());
        assert!(unit.types.resolve("Objects").is_none());
    }

    #[test]
    fn nested_types_are_qualified_by_their_outer_type() {
        let unit = parse_java("class Outer { interface Inner {} enum Mode { ON, OFF } }").unwrap();
        let inner = unit.types.resolve("Inner").unwrap();
        assert_eq!(unit.types.name(inner), "Outer.Inner");
        assert_eq!(unit.types.info(inner).kind, TypeKind::Interface);

        let constants: Vec<_> = nodes(&unit, NodeKind::Declarator)
            .into_iter()
            .map(|d| (d.name().unwrap(), d.type_name().unwrap()))
            .collect();
        assert_eq!(constants, vec![("ON", "Outer.Mode"), ("OFF", "Outer.Mode")]);
    }

    #[test]
    fn literals_are_decoded() {
        let src = r#"class A { void m() { f("a\tbA", 'x', 0x1F, 1_000L, 017, 2.5f, false, null); } }"#;
        let unit = parse_java(src).unwrap();
        let literals: Vec<_> = nodes(&unit, NodeKind::Literal)
            .into_iter()
            .map(|l| (l.literal().unwrap().clone(), l.type_name().unwrap()))
            .collect();
        assert_eq!(
            literals,
            vec![
                (Literal::String("a\tbA".into()), "java.lang.String"),
                (Literal::Char("x".into()), "char"),
                (Literal::Int(31), "int"),
                (Literal::Int(1000), "long"),
                (Literal::Int(15), "int"),
                (Literal::Other("2.5f".into()), "float"),
                (Literal::Boolean(false), "boolean"),
                (Literal::Null, "null"),
            ]
        );
    }

    #[test]
    fn expressions_have_roles_and_operators() {
        let src = "class A { void m(int x) { if ((x > 1)) { x += -x; } else { s.run(x); } } }";
        let unit = parse_java(src).unwrap();

        let branch = nodes(&unit, NodeKind::If)[0];
        let condition = branch.child_with_role(Role::Condition).unwrap();
        assert_eq!(condition.kind(), NodeKind::Parenthesized);
        assert_eq!(branch.child_with_role(Role::Else).unwrap().kind(), NodeKind::Block);

        let assignment = nodes(&unit, NodeKind::Assignment)[0];
        assert_eq!(assignment.operator(), Some("+="));
        let negation = assignment.child_with_role(Role::Right).unwrap();
        assert_eq!((negation.kind(), negation.operator()), (NodeKind::Unary, Some("-")));

        let call = nodes(&unit, NodeKind::MethodInvocation)[0];
        assert_eq!(call.name(), Some("run"));
        assert_eq!(call.child_with_role(Role::Receiver).unwrap().name(), Some("s"));
        assert_eq!(call.children_with_role(Role::Argument).count(), 1);
    }

    #[test]
    fn long_operator_chains_lower_and_scan() {
        let terms = vec!["s"; 10_000].join(" + ");
        let src = format!("class A {{ boolean m(String s) {{ return {terms} == s; }} }}");
        let unit = parse_java(&src).unwrap();
        assert_eq!(nodes(&unit, NodeKind::Binary).len(), 10_000);
        assert_eq!(nodes(&unit, NodeKind::Identifier).len(), 10_001);

        let engine = crate::create_default_engine().unwrap();
        let findings = engine.scan(&unit);
        let rules: Vec<_> = findings.iter().map(|f| f.rule.name).collect();
        assert_eq!(rules, vec!["ReferenceEquality"]);
    }

    #[test]
    fn nested_members_keep_source_order() {
        let src = "class A { int x = 1, y; Object o = new Object() { void run() {} }; class B {} int z; }";
        let unit = parse_java(src).unwrap();
        let class = nodes(&unit, NodeKind::ClassDecl)[0];
        let members: Vec<_> = class.children().map(|m| m.kind()).collect();
        assert_eq!(
            members,
            vec![NodeKind::FieldDecl, NodeKind::FieldDecl, NodeKind::ClassDecl, NodeKind::FieldDecl]
        );

        let first = nodes(&unit, NodeKind::FieldDecl)[0];
        let roles: Vec<_> = first.children().map(|c| c.role()).collect();
        assert_eq!(roles, vec![Role::Type, Role::Declarator, Role::Declarator]);

        let inner = unit.types.resolve("B").unwrap();
        assert_eq!(unit.types.name(inner), "A.B");
    }

    #[test]
    fn syntax_errors_are_reported_with_position() {
        let err = parse_java("class A {\n  void m( {\n}").unwrap_err();
        let HostError::Syntax { line, column, .. } = err else {
            panic!("expected a syntax error, got {err:?}");
        };
        assert!(line >= 1 && column >= 1);
    }

    #[test]
    fn files_keep_their_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A.java");
        std::fs::write(&path, "class A {}").unwrap();
        let unit = parse_java_file(&path).unwrap();
        assert_eq!(unit.path(), Some(path.as_path()));

        let missing = parse_java_file(&dir.path().join("Missing.java"));
        assert!(matches!(missing, Err(HostError::Read { .. })));
    }
}
