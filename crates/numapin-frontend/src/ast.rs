// src/ast.rs
//
// Skeleton AST for the C++ subset numapin reads. Declarations that matter for
// pinning (classes, members, aliases, function bodies, variable declarations
// and `new` expressions) are structured; everything else is kept as spans.

use std::fmt;

use smallvec::SmallVec;

use crate::Span;

/// A parsed source file
#[derive(Debug, Clone, Default)]
pub struct TranslationUnit {
    pub items: Vec<Item>,
}

/// Namespace-scope declarations
#[derive(Debug, Clone)]
pub enum Item {
    Class(ClassDecl),
    Function(FunctionDef),
    Alias(AliasDecl),
    Variable(VarDecl),
    Namespace(NamespaceDecl),
    /// Anything the tool does not need to understand (directives, enums,
    /// prototypes, `using namespace`, ...)
    Other(Span),
}

/// `namespace name { items }`; `extern "C" { ... }` is recorded without a name.
#[derive(Debug, Clone)]
pub struct NamespaceDecl {
    pub name: Option<String>,
    pub items: Vec<Item>,
    pub span: Span,
}

/// `typedef Target Name;` or `using Name = Target;`
#[derive(Debug, Clone)]
pub struct AliasDecl {
    pub name: String,
    pub target: TypeExpr,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKey {
    Class,
    Struct,
    Union,
}

impl ClassKey {
    /// Access level in effect before the first access label.
    pub fn default_access(self) -> Access {
        match self {
            ClassKey::Class => Access::Private,
            ClassKey::Struct | ClassKey::Union => Access::Public,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClassKey::Class => "class",
            ClassKey::Struct => "struct",
            ClassKey::Union => "union",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Public,
    Protected,
    Private,
}

impl Access {
    pub fn as_str(self) -> &'static str {
        match self {
            Access::Public => "public",
            Access::Protected => "protected",
            Access::Private => "private",
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a class declaration was introduced by a template header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TemplateHeader {
    #[default]
    None,
    /// `template<class T, ...>`: a class template
    Primary,
    /// `template<>`: an explicit specialization
    Specialization,
}

/// Base class specifier: `public Base`
#[derive(Debug, Clone)]
pub struct BaseSpec {
    pub access: Option<Access>,
    pub is_virtual: bool,
    pub ty: TypeExpr,
    pub span: Span,
}

/// A class, struct or union declaration
#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub key: ClassKey,
    pub name: String,
    /// Template arguments of an explicit specialization: `numa<Node, 1>`
    pub specialization_args: Option<Vec<TemplateArg>>,
    pub template: TemplateHeader,
    pub bases: Vec<BaseSpec>,
    pub members: Vec<Member>,
    /// `class Node;`
    pub is_forward: bool,
    /// From the class key (or template header) through the terminating ';'
    pub span: Span,
    pub name_span: Span,
}

impl ClassDecl {
    /// Byte offset just past the terminating ';' (where companion text goes).
    pub fn end_offset(&self) -> usize {
        self.span.end
    }
}

/// One entry of a class member list
#[derive(Debug, Clone)]
pub enum Member {
    AccessLabel { access: Access, span: Span },
    Field(FieldDecl),
    Constructor(FunctionDecl),
    Destructor(FunctionDecl),
    Method(FunctionDecl),
    /// Nested declarations copied verbatim into a companion type
    Passthrough { kind: PassthroughKind, span: Span },
    /// A member the parser could not classify
    Unrecognized(Span),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughKind {
    Enum,
    Typedef,
    Using,
    Friend,
    StaticAssert,
    NestedClass,
    MemberTemplate,
}

/// A data member declarator. `int a, *b;` yields two fields.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub ty: TypeExpr,
    pub name: String,
    pub name_span: Span,
    /// `[16]`
    pub array_suffix: Option<Span>,
    /// `: 3`
    pub bit_width: Option<Span>,
    /// `= expr` or `{ expr }`
    pub default_init: Option<Span>,
    pub is_static: bool,
    pub is_constexpr: bool,
    pub is_mutable: bool,
    /// Whole declaration statement through ';'
    pub decl_span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Constructor,
    Destructor,
    Method,
    /// `operator bool()`: no declared return type
    Conversion,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Specifiers {
    pub is_virtual: bool,
    pub is_static: bool,
    pub is_inline: bool,
    pub is_explicit: bool,
    pub is_constexpr: bool,
    pub is_friend: bool,
    pub is_mutable: bool,
}

/// Everything between the parameter list and the body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Qualifiers {
    pub is_const: bool,
    pub is_volatile: bool,
    pub is_override: bool,
    pub is_final: bool,
    /// `= 0`
    pub is_pure: bool,
    /// `= default`
    pub is_defaulted: bool,
    /// `= delete`
    pub is_deleted: bool,
    /// `noexcept` or `noexcept(expr)`
    pub noexcept: Option<Span>,
    /// `&` or `&&`
    pub ref_qualifier: Option<Span>,
}

/// A function parameter. Unparseable parameters (function pointers, `...`)
/// keep only their span.
#[derive(Debug, Clone)]
pub struct Param {
    pub ty: Option<TypeExpr>,
    pub name: Option<String>,
    pub default_value: Option<Span>,
    pub span: Span,
}

/// Constructor member initializer: `data(d)` or `link{nullptr}`
#[derive(Debug, Clone)]
pub struct MemInit {
    pub name: String,
    pub name_span: Span,
    pub args: Vec<Expr>,
    /// Including the surrounding parens or braces
    pub args_span: Span,
}

/// A member function declaration, or a function definition's signature
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub kind: FunctionKind,
    /// `Node`, `~Node`, `getLink`, `operator==`, `operator bool`
    pub name: String,
    pub name_span: Span,
    pub return_type: Option<TypeExpr>,
    pub params: Vec<Param>,
    /// Including the parentheses
    pub params_span: Span,
    pub specifiers: Specifiers,
    pub qualifiers: Qualifiers,
    pub mem_inits: Vec<MemInit>,
    pub body: Option<Body>,
    /// Offset of the first token of the declaration (after any template header)
    pub decl_start: usize,
    pub span: Span,
}

impl FunctionDecl {
    pub fn is_constructor(&self) -> bool {
        self.kind == FunctionKind::Constructor
    }

    pub fn is_destructor(&self) -> bool {
        self.kind == FunctionKind::Destructor
    }
}

/// A namespace-scope function definition, possibly out-of-line: `Node::getLink() { ... }`
#[derive(Debug, Clone)]
pub struct FunctionDef {
    /// Qualifier naming the owning class, if any
    pub owner: Option<TypeName>,
    pub decl: FunctionDecl,
    pub is_template: bool,
}

/// A braced function body
#[derive(Debug, Clone)]
pub struct Body {
    pub stmts: Vec<Stmt>,
    /// Including the braces
    pub span: Span,
}

/// Block statement
#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Block(Block),
    VarDecl(VarDecl),
    /// if/else, loops, switch, try/catch: header clauses and nested statements
    Control(ControlStmt),
    Expr(Expr),
    Empty(Span),
}

#[derive(Debug, Clone)]
pub struct ControlStmt {
    pub header: Vec<Stmt>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// `Type a = init, *b(args);`
#[derive(Debug, Clone)]
pub struct VarDecl {
    pub declarators: Vec<Declarator>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Declarator {
    /// The declared type of this declarator (base type plus its own `*`/`&`)
    pub ty: TypeExpr,
    pub name: String,
    pub name_span: Span,
    pub init: Option<Initializer>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStyle {
    /// `= expr`
    Assign,
    /// `(args)`
    Paren,
    /// `{args}`
    Brace,
}

#[derive(Debug, Clone)]
pub struct Initializer {
    pub style: InitStyle,
    pub exprs: Vec<Expr>,
    pub span: Span,
}

impl Initializer {
    /// The single `new` expression this initializer consists of, if any.
    pub fn as_new(&self) -> Option<&NewExpr> {
        match self.exprs.as_slice() {
            [Expr {
                kind: ExprKind::New(new),
                ..
            }] => Some(new),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// The whole expression is one `new` expression
    New(Box<NewExpr>),
    /// Any other expression; records the `new` expressions it contains
    Opaque(Vec<NewExpr>),
}

impl Expr {
    /// Visit every `new` expression in this expression, outermost first.
    pub fn for_each_new<'a>(&'a self, f: &mut dyn FnMut(&'a NewExpr)) {
        match &self.kind {
            ExprKind::New(new) => new.for_each_new(f),
            ExprKind::Opaque(news) => {
                for new in news {
                    new.for_each_new(f);
                }
            }
        }
    }
}

/// `new T`, `new T(args)`, `new T{args}`, `new T[n]`
#[derive(Debug, Clone)]
pub struct NewExpr {
    pub ty: TypeExpr,
    pub placement: Option<Span>,
    pub array_len: Option<Box<Expr>>,
    pub init: Option<Initializer>,
    pub span: Span,
}

impl NewExpr {
    pub fn for_each_new<'a>(&'a self, f: &mut dyn FnMut(&'a NewExpr)) {
        f(self);
        if let Some(len) = &self.array_len {
            len.for_each_new(f);
        }
        if let Some(init) = &self.init {
            for arg in &init.exprs {
                arg.for_each_new(f);
            }
        }
    }
}

impl Stmt {
    /// Visit this statement and every statement nested in it.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Stmt)) {
        f(self);
        match self {
            Stmt::Block(block) => {
                for stmt in &block.stmts {
                    stmt.walk(f);
                }
            }
            Stmt::Control(control) => {
                for stmt in control.header.iter().chain(&control.body) {
                    stmt.walk(f);
                }
            }
            Stmt::VarDecl(_) | Stmt::Expr(_) | Stmt::Empty(_) => {}
        }
    }

    /// Visit every `new` expression directly owned by this statement
    /// (not those of nested statements).
    pub fn for_each_new<'a>(&'a self, f: &mut dyn FnMut(&'a NewExpr)) {
        match self {
            Stmt::VarDecl(decl) => {
                for declarator in &decl.declarators {
                    if let Some(init) = &declarator.init {
                        for expr in &init.exprs {
                            expr.for_each_new(f);
                        }
                    }
                }
            }
            Stmt::Expr(expr) => expr.for_each_new(f),
            Stmt::Block(_) | Stmt::Control(_) | Stmt::Empty(_) => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    LValue,
    RValue,
}

/// One `*` of a declarator, with its own cv-qualification (`* const`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerLevel {
    pub is_const: bool,
    pub is_volatile: bool,
}

/// A type as written: cv-qualifiers, a possibly qualified name with template
/// arguments, pointer levels and an optional reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeExpr {
    pub is_const: bool,
    pub is_volatile: bool,
    /// Written with `class`/`struct`/`union`/`enum`/`typename`
    pub elaborated: bool,
    pub name: TypeName,
    pub pointers: SmallVec<[PointerLevel; 2]>,
    pub reference: Option<RefKind>,
    pub span: Span,
}

impl TypeExpr {
    pub fn named(name: TypeName) -> Self {
        Self {
            is_const: false,
            is_volatile: false,
            elaborated: false,
            name,
            pointers: SmallVec::new(),
            reference: None,
            span: Span::default(),
        }
    }

    /// Exactly one level of raw pointer and no reference: `U*`
    pub fn is_single_pointer(&self) -> bool {
        self.pointers.len() == 1 && self.reference.is_none()
    }

    pub fn is_pointer(&self) -> bool {
        !self.pointers.is_empty()
    }

    /// The type with pointer levels and reference removed (cv of the base kept).
    pub fn pointee(&self) -> TypeExpr {
        TypeExpr {
            pointers: SmallVec::new(),
            reference: None,
            ..self.clone()
        }
    }

    /// The type with top-level cv-qualifiers removed: the outermost pointer
    /// level's, or the base's when there is no pointer.
    pub fn strip_top_level_cv(&self) -> TypeExpr {
        let mut ty = self.clone();
        if self.reference.is_some() {
            return ty;
        }
        match ty.pointers.last_mut() {
            Some(level) => *level = PointerLevel::default(),
            None => {
                ty.is_const = false;
                ty.is_volatile = false;
            }
        }
        ty
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_const {
            f.write_str("const ")?;
        }
        if self.is_volatile {
            f.write_str("volatile ")?;
        }
        write!(f, "{}", self.name)?;
        for level in &self.pointers {
            f.write_str("*")?;
            if level.is_const {
                f.write_str(" const")?;
            }
            if level.is_volatile {
                f.write_str(" volatile")?;
            }
        }
        match self.reference {
            Some(RefKind::LValue) => f.write_str("&"),
            Some(RefKind::RValue) => f.write_str("&&"),
            None => Ok(()),
        }
    }
}

/// A possibly qualified name: `::ns::Vec<int>::iterator`, or a fundamental
/// type spelled as one segment (`unsigned long`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TypeName {
    pub global: bool,
    pub segments: SmallVec<[NameSegment; 2]>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameSegment {
    pub ident: String,
    pub args: Option<Vec<TemplateArg>>,
}

impl TypeName {
    pub fn simple(ident: impl Into<String>) -> Self {
        let mut segments = SmallVec::new();
        segments.push(NameSegment {
            ident: ident.into(),
            args: None,
        });
        Self {
            global: false,
            segments,
        }
    }

    pub fn last(&self) -> Option<&NameSegment> {
        self.segments.last()
    }

    /// Everything but the last segment, or `None` for an unqualified name.
    pub fn qualifier(&self) -> Option<TypeName> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(TypeName {
            global: self.global,
            segments: self.segments[..self.segments.len() - 1].iter().cloned().collect(),
        })
    }

    /// The template arguments of `self` when it names `template<...>`
    /// (unqualified, with exactly the given name).
    pub fn template_args_of(&self, template: &str) -> Option<&[TemplateArg]> {
        match self.segments.as_slice() {
            [segment] if segment.ident == template => segment.args.as_deref(),
            _ => None,
        }
    }

    pub fn is_fundamental(&self) -> bool {
        match self.segments.as_slice() {
            [segment] if !self.global && segment.args.is_none() => segment
                .ident
                .split(' ')
                .all(|word| FUNDAMENTAL_WORDS.contains(&word)),
            _ => false,
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.global {
            f.write_str("::")?;
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("::")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl fmt::Display for NameSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ident)?;
        if let Some(args) = &self.args {
            f.write_str("<")?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", arg)?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

/// A template argument: a type, or a constant expression kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplateArg {
    Type(TypeExpr),
    Value(String),
}

impl fmt::Display for TemplateArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateArg::Type(ty) => write!(f, "{}", ty),
            TemplateArg::Value(text) => f.write_str(text),
        }
    }
}

impl std::hash::Hash for TypeExpr {
    // Spans are positions, not identity.
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.is_const.hash(state);
        self.is_volatile.hash(state);
        self.name.hash(state);
        self.pointers.len().hash(state);
        self.reference.map(|r| r == RefKind::LValue).hash(state);
    }
}

/// Words that make up fundamental type names.
pub const FUNDAMENTAL_WORDS: &[&str] = &[
    "void", "bool", "char", "wchar_t", "char8_t", "char16_t", "char32_t", "short", "int", "long",
    "float", "double", "signed", "unsigned", "auto",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn node_ptr() -> TypeExpr {
        let mut ty = TypeExpr::named(TypeName::simple("Node"));
        ty.pointers.push(PointerLevel::default());
        ty
    }

    #[test]
    fn display_pointer_and_template() {
        let mut name = TypeName::simple("numa");
        name.segments[0].args = Some(vec![
            TemplateArg::Type(TypeExpr::named(TypeName::simple("Node"))),
            TemplateArg::Value("1".to_string()),
        ]);
        let mut ty = TypeExpr::named(name);
        ty.pointers.push(PointerLevel::default());
        assert_eq!(ty.to_string(), "numa<Node, 1>*");
    }

    #[test]
    fn single_pointer_detection() {
        let ty = node_ptr();
        assert!(ty.is_single_pointer());
        let mut double = ty.clone();
        double.pointers.push(PointerLevel::default());
        assert!(!double.is_single_pointer());
        assert_eq!(ty.pointee().to_string(), "Node");
    }

    #[test]
    fn strip_top_level_cv_keeps_pointee_const() {
        let mut ty = node_ptr();
        ty.is_const = true;
        ty.pointers[0].is_const = true;
        assert_eq!(ty.to_string(), "const Node* const");
        assert_eq!(ty.strip_top_level_cv().to_string(), "const Node*");
    }

    #[test]
    fn fundamental_names() {
        assert!(TypeName::simple("unsigned long").is_fundamental());
        assert!(!TypeName::simple("Node").is_fundamental());
    }
}
