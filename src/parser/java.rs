//
//  java.rs
//  RouteLens
//

use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};
use tree_sitter::{Node, Parser};

use super::{LanguageAdapter, Marker, MemberDecl, TypeDecl};
use crate::cancel::CancelToken;
use crate::error::{Result, RouteError};
use crate::model::HttpMethod;
use crate::resolve::{DeclId, Declaration, PathExpr, Scope, SymbolLookup, SymbolRef};
use crate::source::{SourceTree, SupportedLanguage};

const TYPE_KINDS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
];

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    package: Option<String>,
    imports: Vec<Import>,
}

#[derive(Debug)]
struct Import {
    path: String,
    is_static: bool,
    wildcard: bool,
}

#[derive(Debug)]
struct FieldDecl {
    name: String,
    constant: bool,
    init: Option<PathExpr>,
    scope: Scope,
}

/// Declarations of every Java file in a source tree, parsed with
/// tree-sitter-java.
#[derive(Debug, Default)]
pub struct JavaModel {
    files: Vec<FileInfo>,
    types: Vec<TypeDecl>,
    fields: Vec<FieldDecl>,
}

impl JavaModel {
    /// Parse every `.java` file. Files that cannot be read or parsed are
    /// logged and skipped. The cancel token is polled once per file.
    pub fn build(tree: &SourceTree, cancel: &CancelToken) -> Result<Self> {
        let mut parser = SupportedLanguage::Java.parser()?;

        let mut model = Self::default();
        for path in tree.files_of(SupportedLanguage::Java) {
            if cancel.is_cancelled() {
                debug!(files = model.files.len(), "java model build cancelled");
                break;
            }
            let source = match tree.read(&path) {
                Ok(source) => source,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable java file");
                    continue;
                }
            };
            if let Err(e) = model.add_file(&mut parser, &path, &source) {
                warn!(error = %e, "skipping java file");
            }
        }
        debug!(
            files = model.files.len(),
            types = model.types.len(),
            constants = model.fields.iter().filter(|f| f.constant).count(),
            "java model built"
        );
        Ok(model)
    }

    fn add_file(&mut self, parser: &mut Parser, path: &Path, source: &str) -> Result<()> {
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| RouteError::TreeSitterParseFailed(path.to_path_buf()))?;
        let src = source.as_bytes();
        let root = tree.root_node();

        let mut info = FileInfo {
            path: path.to_path_buf(),
            package: None,
            imports: Vec::new(),
        };
        let mut cursor = root.walk();
        let top: Vec<Node> = root.named_children(&mut cursor).collect();
        for node in &top {
            match node.kind() {
                "package_declaration" => info.package = package_name(node, src),
                "import_declaration" => info.imports.push(parse_import(node, src)),
                _ => {}
            }
        }

        let file = self.files.len();
        self.files.push(info);

        let mut enclosing = Vec::new();
        for node in top {
            self.visit_type(node, src, file, &mut enclosing);
        }
        Ok(())
    }

    fn visit_type(&mut self, node: Node, src: &[u8], file: usize, enclosing: &mut Vec<String>) {
        if !TYPE_KINDS.contains(&node.kind()) {
            return;
        }
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = text(&name_node, src);
        let implicit_constants = matches!(
            node.kind(),
            "interface_declaration" | "annotation_type_declaration"
        );

        enclosing.push(name.clone());
        let scope = Scope {
            file,
            enclosing: enclosing.clone(),
        };
        let markers = self.markers(&node, src, file);

        // Reserve the slot so outer types precede nested ones.
        let idx = self.types.len();
        self.types.push(TypeDecl {
            name,
            scope: scope.clone(),
            markers,
            members: Vec::new(),
            line: name_node.start_position().row + 1,
        });

        let mut members = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_body(body, src, &scope, implicit_constants, enclosing, &mut members);
        }
        self.types[idx].members = members;
        enclosing.pop();
    }

    fn visit_body(
        &mut self,
        body: Node,
        src: &[u8],
        scope: &Scope,
        implicit_constants: bool,
        enclosing: &mut Vec<String>,
        members: &mut Vec<MemberDecl>,
    ) {
        let mut cursor = body.walk();
        let children: Vec<Node> = body.named_children(&mut cursor).collect();
        for child in children {
            match child.kind() {
                "method_declaration" => {
                    if let Some(name_node) = child.child_by_field_name("name") {
                        members.push(MemberDecl {
                            name: text(&name_node, src),
                            markers: self.markers(&child, src, scope.file),
                            line: name_node.start_position().row + 1,
                        });
                    }
                }
                "field_declaration" | "constant_declaration" => {
                    let constant = implicit_constants
                        || (has_modifier(&child, "static") && has_modifier(&child, "final"));
                    self.add_fields(&child, src, scope, constant);
                }
                "enum_body_declarations" => {
                    self.visit_body(child, src, scope, implicit_constants, enclosing, members);
                }
                kind if TYPE_KINDS.contains(&kind) => {
                    self.visit_type(child, src, scope.file, enclosing);
                }
                _ => {}
            }
        }
    }

    fn add_fields(&mut self, node: &Node, src: &[u8], scope: &Scope, constant: bool) {
        let mut cursor = node.walk();
        for declarator in node.children_by_field_name("declarator", &mut cursor) {
            let Some(name_node) = declarator.child_by_field_name("name") else {
                continue;
            };
            self.fields.push(FieldDecl {
                name: text(&name_node, src),
                constant,
                init: declarator
                    .child_by_field_name("value")
                    .map(|v| lower(&v, src)),
                scope: scope.clone(),
            });
        }
    }

    fn markers(&self, decl: &Node, src: &[u8], file: usize) -> Vec<Marker> {
        let Some(modifiers) = modifiers(decl) else {
            return Vec::new();
        };
        let mut cursor = modifiers.walk();
        let markers = modifiers
            .named_children(&mut cursor)
            .filter(|n| matches!(n.kind(), "marker_annotation" | "annotation"))
            .filter_map(|n| self.marker(&n, src, file))
            .collect();
        markers
    }

    fn marker(&self, node: &Node, src: &[u8], file: usize) -> Option<Marker> {
        let written = text(&node.child_by_field_name("name")?, src);
        let name = written.rsplit('.').next().unwrap_or(&written).to_string();

        let mut value = None;
        let mut path = None;
        let mut positional = None;
        let mut methods = Vec::new();
        if let Some(args) = node.child_by_field_name("arguments") {
            let mut cursor = args.walk();
            for arg in args.named_children(&mut cursor) {
                match arg.kind() {
                    "comment" => {}
                    "element_value_pair" => {
                        let key = arg.child_by_field_name("key").map(|k| text(&k, src));
                        let Some(val) = arg.child_by_field_name("value") else {
                            continue;
                        };
                        match key.as_deref() {
                            Some("value") => value = Some(lower(&val, src)),
                            Some("path") => path = Some(lower(&val, src)),
                            Some("method") => methods = parse_methods(&val, src),
                            _ => {}
                        }
                    }
                    _ if positional.is_none() => positional = Some(lower(&arg, src)),
                    _ => {}
                }
            }
        }

        Some(Marker {
            candidates: self.qualify(file, &written),
            name,
            path: value.or(path).or(positional),
            methods,
        })
    }

    /// Fully qualified names a written annotation name can stand for.
    fn qualify(&self, file: usize, written: &str) -> Vec<String> {
        if written.contains('.') {
            return vec![written.to_string()];
        }
        let Some(info) = self.files.get(file) else {
            return Vec::new();
        };
        let suffix = format!(".{written}");
        if let Some(explicit) = info
            .imports
            .iter()
            .find(|i| !i.is_static && !i.wildcard && i.path.ends_with(&suffix))
        {
            return vec![explicit.path.clone()];
        }
        info.imports
            .iter()
            .filter(|i| !i.is_static && i.wildcard)
            .map(|i| format!("{}{suffix}", i.path))
            .chain(info.package.iter().map(|p| format!("{p}{suffix}")))
            .collect()
    }

    fn find_in_owner(&self, owner: &str, name: &str, file: usize) -> Option<usize> {
        let mut fallback = None;
        for (idx, f) in self.fields.iter().enumerate() {
            if f.name != name || f.scope.enclosing.last().map(String::as_str) != Some(owner) {
                continue;
            }
            if f.scope.file == file {
                return Some(idx);
            }
            fallback.get_or_insert(idx);
        }
        fallback
    }

    fn find_unqualified(&self, name: &str, scope: &Scope) -> Option<usize> {
        // Innermost enclosing type first.
        for depth in (1..=scope.enclosing.len()).rev() {
            let chain = &scope.enclosing[..depth];
            if let Some(idx) = self.fields.iter().position(|f| {
                f.name == name && f.scope.file == scope.file && f.scope.enclosing == chain
            }) {
                return Some(idx);
            }
        }

        if let Some(info) = self.files.get(scope.file) {
            let suffix = format!(".{name}");
            for import in info.imports.iter().filter(|i| i.is_static) {
                let owner_path = if import.wildcard {
                    Some(import.path.as_str())
                } else {
                    import.path.strip_suffix(&suffix)
                };
                let Some(owner_path) = owner_path else {
                    continue;
                };
                let owner = owner_path.rsplit('.').next().unwrap_or(owner_path);
                if let Some(idx) = self.find_in_owner(owner, name, scope.file) {
                    return Some(idx);
                }
            }
        }

        if let Some(idx) = self
            .fields
            .iter()
            .position(|f| f.name == name && f.scope.file == scope.file)
        {
            return Some(idx);
        }
        self.find_inherited(name, scope.file)
    }

    /// Constant inherited from a supertype, which is not recorded. Taken
    /// only when it is the sole constant of that name in the tree or in
    /// the file's package; anything ambiguous stays unresolved.
    fn find_inherited(&self, name: &str, file: usize) -> Option<usize> {
        let candidates: Vec<usize> = (0..self.fields.len())
            .filter(|&idx| self.fields[idx].name == name && self.fields[idx].constant)
            .collect();
        if let [only] = candidates[..] {
            return Some(only);
        }
        let package = self.files.get(file).and_then(|f| f.package.as_deref());
        let same_package: Vec<usize> = candidates
            .into_iter()
            .filter(|&idx| {
                self.files
                    .get(self.fields[idx].scope.file)
                    .and_then(|f| f.package.as_deref())
                    == package
            })
            .collect();
        match same_package[..] {
            [only] => Some(only),
            _ => {
                trace!(
                    constant = name,
                    candidates = same_package.len(),
                    "ambiguous inherited constant"
                );
                None
            }
        }
    }
}

impl SymbolLookup for JavaModel {
    fn lookup(&self, symbol: &SymbolRef, scope: &Scope) -> Option<Declaration<'_>> {
        let idx = match &symbol.qualifier {
            Some(q) => {
                let owner = q.rsplit('.').next().unwrap_or(q);
                self.find_in_owner(owner, &symbol.name, scope.file)
            }
            None => self.find_unqualified(&symbol.name, scope),
        }?;
        let field = &self.fields[idx];
        Some(Declaration {
            id: DeclId(idx),
            constant: field.constant,
            initializer: field.init.as_ref(),
            scope: &field.scope,
        })
    }
}

impl LanguageAdapter for JavaModel {
    fn language(&self) -> SupportedLanguage {
        SupportedLanguage::Java
    }

    fn types(&self) -> &[TypeDecl] {
        &self.types
    }

    fn file_path(&self, file: usize) -> &Path {
        self.files
            .get(file)
            .map(|f| f.path.as_path())
            .unwrap_or_else(|| Path::new(""))
    }
}

fn text(node: &Node, src: &[u8]) -> String {
    node.utf8_text(src).unwrap_or("").to_string()
}

fn modifiers<'t>(decl: &Node<'t>) -> Option<Node<'t>> {
    let mut cursor = decl.walk();
    let found = decl.children(&mut cursor).find(|c| c.kind() == "modifiers");
    found
}

fn has_modifier(decl: &Node, keyword: &str) -> bool {
    modifiers(decl).is_some_and(|m| {
        let mut cursor = m.walk();
        let found = m.children(&mut cursor).any(|c| c.kind() == keyword);
        found
    })
}

fn package_name(node: &Node, src: &[u8]) -> Option<String> {
    let mut cursor = node.walk();
    let name = node
        .named_children(&mut cursor)
        .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"))
        .map(|c| text(&c, src));
    name
}

fn parse_import(node: &Node, src: &[u8]) -> Import {
    let raw = text(node, src);
    let body = raw
        .trim()
        .trim_start_matches("import")
        .trim_end_matches(';')
        .trim();
    let (is_static, body) = match body.strip_prefix("static") {
        Some(rest) if rest.starts_with(char::is_whitespace) => (true, rest.trim()),
        _ => (false, body),
    };
    let body: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    match body.strip_suffix(".*") {
        Some(pkg) => Import {
            path: pkg.to_string(),
            is_static,
            wildcard: true,
        },
        None => Import {
            path: body,
            is_static,
            wildcard: false,
        },
    }
}

/// Lower an annotation argument or initializer to a [`PathExpr`].
fn lower(node: &Node, src: &[u8]) -> PathExpr {
    match node.kind() {
        "string_literal" => PathExpr::Literal(unquote(&text(node, src))),
        "binary_expression" => {
            let op = node.child_by_field_name("operator").map(|o| text(&o, src));
            match (
                op.as_deref(),
                node.child_by_field_name("left"),
                node.child_by_field_name("right"),
            ) {
                (Some("+"), Some(left), Some(right)) => {
                    PathExpr::concat(lower(&left, src), lower(&right, src))
                }
                _ => PathExpr::Unsupported(text(node, src)),
            }
        }
        "identifier" => PathExpr::reference(None, &text(node, src)),
        "field_access" => {
            match (
                node.child_by_field_name("object"),
                node.child_by_field_name("field"),
            ) {
                (Some(object), Some(field)) => {
                    PathExpr::reference(Some(text(&object, src).as_str()), &text(&field, src))
                }
                _ => PathExpr::Unsupported(text(node, src)),
            }
        }
        "parenthesized_expression" | "element_value_array_initializer" => {
            let mut cursor = node.walk();
            let first = node
                .named_children(&mut cursor)
                .find(|c| c.kind() != "comment");
            match first {
                Some(inner) => lower(&inner, src),
                None if node.kind() == "element_value_array_initializer" => {
                    PathExpr::Literal(String::new())
                }
                None => PathExpr::Unsupported(text(node, src)),
            }
        }
        _ => PathExpr::Unsupported(text(node, src)),
    }
}

/// Verbs named by a `method = ...` attribute: `RequestMethod.GET`, `GET`,
/// or an array of either.
fn parse_methods(node: &Node, src: &[u8]) -> Vec<HttpMethod> {
    let values: Vec<Node> = if node.kind() == "element_value_array_initializer" {
        let mut cursor = node.walk();
        let values = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() != "comment")
            .collect();
        values
    } else {
        vec![*node]
    };
    let mut methods = Vec::new();
    for value in values {
        let raw = text(&value, src);
        let verb = raw.rsplit('.').next().unwrap_or(&raw);
        if let Some(m) = HttpMethod::parse(verb) {
            if !methods.contains(&m) {
                methods.push(m);
            }
        }
    }
    methods
}

fn unquote(raw: &str) -> String {
    let inner = if let Some(block) = raw.strip_prefix("\"\"\"") {
        block.strip_suffix("\"\"\"").unwrap_or(block).trim()
    } else {
        let s = raw.strip_prefix('"').unwrap_or(raw);
        s.strip_suffix('"').unwrap_or(s)
    };
    unescape(inner)
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
