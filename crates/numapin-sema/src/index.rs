// src/index.rs
//
// Run-wide declaration index: class definitions by qualified name, aliases,
// out-of-line member definitions, and existing explicit specializations.

use std::fmt;

use numapin_frontend::{
    ClassDecl, FunctionDef, Item, NameSegment, TemplateArg, TemplateHeader, TranslationUnit,
    TypeExpr, TypeName, parse_int_literal,
};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// Aliases are followed at most this deep (guards `typedef A B; typedef B A;`).
const MAX_ALIAS_DEPTH: usize = 16;

/// Position of a file in the run's input list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FileId(pub u32);

impl FileId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A successfully parsed input file
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub id: FileId,
    pub name: String,
    pub source: String,
    pub unit: TranslationUnit,
}

/// Enclosing namespaces, outermost first
pub type Scope = SmallVec<[String; 2]>;

/// Canonical spelling of a type identity: aliases resolved, cv and elaborated
/// keywords dropped, class names fully qualified, template arguments
/// canonicalized recursively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalType(String);

impl CanonicalType {
    pub fn new(spelling: impl Into<String>) -> Self {
        Self(spelling.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct ClassEntry<'a> {
    pub decl: &'a ClassDecl,
    pub file: FileId,
    /// `ds::Node`
    pub qualified: String,
    pub scope: Scope,
    /// Where namespace-scope companion declarations go: after the class, or
    /// after its outermost enclosing named namespace
    pub insertion_offset: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct MemberDefinition<'a> {
    pub def: &'a FunctionDef,
    pub file: FileId,
}

#[derive(Debug, Clone)]
struct AliasEntry<'a> {
    target: &'a TypeExpr,
    scope: Scope,
}

/// A `template<> class wrapper<T, N>` already present in the input.
#[derive(Debug, Clone)]
pub struct ExistingSpecialization<'a> {
    pub decl: &'a ClassDecl,
    pub file: FileId,
    pub scope: Scope,
}

/// A type with aliases substituted, and the scope its names resolve in.
#[derive(Debug, Clone)]
pub struct Expanded {
    pub ty: TypeExpr,
    pub scope: Scope,
}

#[derive(Debug, Default)]
pub struct DeclIndex<'a> {
    files: FxHashMap<FileId, &'a ParsedFile>,
    classes: FxHashMap<String, ClassEntry<'a>>,
    forward: FxHashSet<String>,
    by_last: FxHashMap<String, SmallVec<[String; 1]>>,
    aliases: FxHashMap<String, AliasEntry<'a>>,
    definitions: FxHashMap<String, Vec<MemberDefinition<'a>>>,
    specializations: Vec<ExistingSpecialization<'a>>,
}

impl<'a> DeclIndex<'a> {
    /// Index every file. Out-of-line definitions are attached in a second
    /// pass so their owners may be defined in a later file.
    pub fn build(files: impl IntoIterator<Item = &'a ParsedFile>) -> Self {
        let mut index = DeclIndex::default();
        let files: Vec<&'a ParsedFile> = files.into_iter().collect();
        for file in &files {
            index.files.insert(file.id, file);
            index.collect_declarations(&file.unit.items, file.id, &Scope::new(), None);
        }
        for file in &files {
            index.collect_definitions(&file.unit.items, file.id, &Scope::new());
        }
        tracing::debug!(
            classes = index.classes.len(),
            aliases = index.aliases.len(),
            definitions = index.definitions.values().map(Vec::len).sum::<usize>(),
            "declaration index built"
        );
        index
    }

    fn collect_declarations(
        &mut self,
        items: &'a [Item],
        file: FileId,
        scope: &Scope,
        outer_end: Option<usize>,
    ) {
        for item in items {
            match item {
                Item::Class(class) => {
                    let offset = outer_end.unwrap_or_else(|| class.end_offset());
                    self.add_class(class, file, scope, offset)
                }
                Item::Alias(alias) => {
                    let qualified = qualify(scope, &alias.name);
                    self.aliases.entry(qualified).or_insert(AliasEntry {
                        target: &alias.target,
                        scope: scope.clone(),
                    });
                }
                Item::Namespace(ns) => {
                    let inner = nested_scope(scope, ns.name.as_deref());
                    let outer_end = match (outer_end, &ns.name) {
                        (Some(end), _) => Some(end),
                        (None, Some(_)) => Some(ns.span.end),
                        (None, None) => None,
                    };
                    self.collect_declarations(&ns.items, file, &inner, outer_end);
                }
                Item::Function(_) | Item::Variable(_) | Item::Other(_) => {}
            }
        }
    }

    fn add_class(
        &mut self,
        class: &'a ClassDecl,
        file: FileId,
        scope: &Scope,
        insertion_offset: usize,
    ) {
        if class.template == TemplateHeader::Specialization {
            self.specializations.push(ExistingSpecialization {
                decl: class,
                file,
                scope: scope.clone(),
            });
            return;
        }
        let qualified = qualify(scope, &class.name);
        if class.is_forward {
            self.forward.insert(qualified);
            return;
        }
        if self.classes.contains_key(&qualified) {
            tracing::debug!(class = %qualified, "duplicate class definition ignored");
            return;
        }
        self.by_last
            .entry(class.name.clone())
            .or_default()
            .push(qualified.clone());
        self.classes.insert(
            qualified.clone(),
            ClassEntry {
                decl: class,
                file,
                qualified,
                scope: scope.clone(),
                insertion_offset,
            },
        );
    }

    fn collect_definitions(&mut self, items: &'a [Item], file: FileId, scope: &Scope) {
        for item in items {
            match item {
                Item::Function(def) => {
                    let Some(owner) = &def.owner else { continue };
                    match self.resolve_class_name(owner, scope) {
                        Some(entry) => {
                            let qualified = entry.qualified.clone();
                            self.definitions
                                .entry(qualified)
                                .or_default()
                                .push(MemberDefinition { def, file });
                        }
                        None => {
                            tracing::trace!(owner = %owner, member = %def.decl.name, "definition for unknown class");
                        }
                    }
                }
                Item::Namespace(ns) => {
                    let inner = nested_scope(scope, ns.name.as_deref());
                    self.collect_definitions(&ns.items, file, &inner);
                }
                _ => {}
            }
        }
    }

    pub fn file(&self, id: FileId) -> Option<&'a ParsedFile> {
        self.files.get(&id).copied()
    }

    pub fn class(&self, qualified: &str) -> Option<&ClassEntry<'a>> {
        self.classes.get(qualified)
    }

    /// True when only a forward declaration of the name was seen.
    pub fn is_forward_only(&self, qualified: &str) -> bool {
        self.forward.contains(qualified) && !self.classes.contains_key(qualified)
    }

    pub fn definitions_of(&self, qualified: &str) -> &[MemberDefinition<'a>] {
        self.definitions
            .get(qualified)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn existing_specializations(&self) -> &[ExistingSpecialization<'a>] {
        &self.specializations
    }

    /// Find the class a (possibly qualified) name refers to from `scope`:
    /// innermost enclosing namespace first, then a unique class with that
    /// unqualified name anywhere.
    pub fn resolve_class_name(&self, name: &TypeName, scope: &[String]) -> Option<&ClassEntry<'a>> {
        let written = plain_name(name);
        if name.global {
            return self.classes.get(&written);
        }
        for depth in (0..=scope.len()).rev() {
            let candidate = if depth == 0 {
                written.clone()
            } else {
                format!("{}::{}", scope[..depth].join("::"), written)
            };
            if let Some(entry) = self.classes.get(&candidate) {
                return Some(entry);
            }
        }
        let last = name.last()?;
        match self.by_last.get(&last.ident).map(SmallVec::as_slice) {
            Some([only]) if name.segments.len() == 1 => self.classes.get(only),
            _ => None,
        }
    }

    fn resolve_alias(&self, name: &TypeName, scope: &[String]) -> Option<&AliasEntry<'a>> {
        if name.last().is_none_or(|s| s.args.is_some()) {
            return None;
        }
        let written = plain_name(name);
        if name.global {
            return self.aliases.get(&written);
        }
        (0..=scope.len()).rev().find_map(|depth| {
            let candidate = if depth == 0 {
                written.clone()
            } else {
                format!("{}::{}", scope[..depth].join("::"), written)
            };
            self.aliases.get(&candidate)
        })
    }

    /// Substitute aliases in the outermost name of `ty`; pointer levels and
    /// cv-qualifiers written on the alias use are added to the target's.
    pub fn expand(&self, ty: &TypeExpr, scope: &[String]) -> Expanded {
        let mut current = Expanded {
            ty: ty.clone(),
            scope: scope.iter().cloned().collect(),
        };
        for _ in 0..MAX_ALIAS_DEPTH {
            let Some(alias) = self.resolve_alias(&current.ty.name, &current.scope) else {
                break;
            };
            let mut target = alias.target.clone();
            target.is_const |= current.ty.is_const;
            target.is_volatile |= current.ty.is_volatile;
            target.pointers.extend(current.ty.pointers.iter().copied());
            if current.ty.reference.is_some() {
                target.reference = current.ty.reference;
            }
            target.span = current.ty.span;
            current = Expanded {
                ty: target,
                scope: alias.scope.clone(),
            };
        }
        current
    }

    /// The class definition a value type (no pointers) refers to, through aliases.
    pub fn resolve_class(&self, ty: &TypeExpr, scope: &[String]) -> Option<&ClassEntry<'a>> {
        let expanded = self.expand(ty, scope);
        if expanded.ty.is_pointer() || expanded.ty.reference.is_some() {
            return None;
        }
        self.resolve_class_name(&expanded.ty.name, &expanded.scope)
    }

    pub fn canonical(&self, ty: &TypeExpr, scope: &[String]) -> CanonicalType {
        CanonicalType(self.canonical_spelling(ty, scope))
    }

    fn canonical_spelling(&self, ty: &TypeExpr, scope: &[String]) -> String {
        let expanded = self.expand(ty, scope);
        let ty = &expanded.ty;
        let mut out = if ty.name.is_fundamental() {
            ty.name.to_string()
        } else if let Some(entry) = self.resolve_class_name(&ty.name, &expanded.scope) {
            let mut name = entry.qualified.clone();
            if let Some(args) = ty.name.last().and_then(|s| s.args.as_ref()) {
                name.push_str(&self.canonical_args(args, &expanded.scope));
            }
            name
        } else {
            let segments: Vec<String> = ty
                .name
                .segments
                .iter()
                .map(|segment| self.canonical_segment(segment, &expanded.scope))
                .collect();
            segments.join("::")
        };
        for _ in &ty.pointers {
            out.push('*');
        }
        match ty.reference {
            Some(numapin_frontend::RefKind::LValue) => out.push('&'),
            Some(numapin_frontend::RefKind::RValue) => out.push_str("&&"),
            None => {}
        }
        out
    }

    fn canonical_segment(&self, segment: &NameSegment, scope: &[String]) -> String {
        match &segment.args {
            Some(args) => format!("{}{}", segment.ident, self.canonical_args(args, scope)),
            None => segment.ident.clone(),
        }
    }

    fn canonical_args(&self, args: &[TemplateArg], scope: &[String]) -> String {
        let parts: Vec<String> = args
            .iter()
            .map(|arg| match arg {
                TemplateArg::Type(ty) => self.canonical_spelling(ty, scope),
                TemplateArg::Value(text) => canonical_value(text),
            })
            .collect();
        format!("<{}>", parts.join(", "))
    }
}

/// Integer literals in any radix compare equal by value; other constant
/// expressions by their whitespace-free spelling.
fn canonical_value(text: &str) -> String {
    match parse_int_literal(text) {
        Some(value) => value.to_string(),
        None => text.chars().filter(|c| !c.is_whitespace()).collect(),
    }
}

fn plain_name(name: &TypeName) -> String {
    let parts: Vec<&str> = name.segments.iter().map(|s| s.ident.as_str()).collect();
    parts.join("::")
}

fn qualify(scope: &[String], name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}::{}", scope.join("::"), name)
    }
}

fn nested_scope(scope: &Scope, name: Option<&str>) -> Scope {
    let mut inner = scope.clone();
    if let Some(name) = name {
        inner.extend(name.split("::").map(str::to_string));
    }
    inner
}

#[cfg(test)]
mod tests {
    use super::*;
    use numapin_frontend::Parser;

    fn parsed(id: u32, source: &str) -> ParsedFile {
        let unit = Parser::new(source).parse_translation_unit().unwrap();
        ParsedFile {
            id: FileId(id),
            name: format!("file{}.hpp", id),
            source: source.to_string(),
            unit,
        }
    }

    fn type_of(source: &str) -> TypeExpr {
        let unit = Parser::new(source).parse_translation_unit().unwrap();
        match &unit.items[0] {
            Item::Variable(decl) => decl.declarators[0].ty.clone(),
            other => panic!("expected variable, got {:?}", other),
        }
    }

    #[test]
    fn classes_are_qualified_by_namespace() {
        let file = parsed(0, "namespace ds { class Node { int v; }; }");
        let index = DeclIndex::build([&file]);
        assert!(index.class("ds::Node").is_some());
        let entry = index
            .resolve_class_name(&TypeName::simple("Node"), &[])
            .unwrap();
        assert_eq!(entry.qualified, "ds::Node");
        assert_eq!(entry.insertion_offset, file.source.len());
    }

    #[test]
    fn canonical_resolves_aliases_and_strips_cv() {
        let file = parsed(
            0,
            "namespace ds { struct Node { int v; }; typedef Node Elem; } using Handle = ds::Elem;",
        );
        let index = DeclIndex::build([&file]);
        let a = index.canonical(&type_of("const struct Handle x;"), &[]);
        let b = index.canonical(&type_of("::ds::Node y;"), &[]);
        assert_eq!(a.as_str(), "ds::Node");
        assert_eq!(a, b);
    }

    #[test]
    fn canonical_normalizes_integer_arguments() {
        let index = DeclIndex::default();
        let a = index.canonical(&type_of("numa<int, 0x1> a;"), &[]);
        let b = index.canonical(&type_of("numa<int,1u> b;"), &[]);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "numa<int, 1>");
    }

    #[test]
    fn alias_to_pointer_expands() {
        let file = parsed(0, "class Node { int v; }; typedef Node* NodePtr;");
        let index = DeclIndex::build([&file]);
        let expanded = index.expand(&type_of("NodePtr p;"), &[]);
        assert!(expanded.ty.is_single_pointer());
        assert_eq!(index.canonical(&type_of("NodePtr p;"), &[]).as_str(), "Node*");
    }

    #[test]
    fn out_of_line_definitions_attach_across_files() {
        let source = parsed(0, "int Node::get() { return v; }");
        let header = parsed(1, "class Node { int v; int get(); };");
        let index = DeclIndex::build([&source, &header]);
        let defs = index.definitions_of("Node");
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].def.decl.name, "get");
        assert_eq!(defs[0].file, FileId(0));
    }

    #[test]
    fn forward_only_declarations_are_tracked() {
        let file = parsed(0, "class Node;");
        let index = DeclIndex::build([&file]);
        assert!(index.is_forward_only("Node"));
        assert!(index.class("Node").is_none());
    }

    #[test]
    fn existing_specializations_are_collected() {
        let file = parsed(
            0,
            "class Node { int v; }; template<> class numa<Node, 1> { int v; };",
        );
        let index = DeclIndex::build([&file]);
        assert_eq!(index.existing_specializations().len(), 1);
        assert!(index.class("numa").is_none());
    }
}
