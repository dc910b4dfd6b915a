// src/profile.rs
//
// Declaration profiler: turns a class definition (plus any out-of-line member
// definitions) into the structural description the synthesizer works from.

use std::rc::Rc;

use numapin_frontend::{
    Access, Body, ClassKey, Expr, FieldDecl, FunctionDecl, FunctionKind, Member, NewExpr,
    Param, Span, TemplateHeader, TypeExpr,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::errors::{Located, ProfileError};
use crate::index::{CanonicalType, ClassEntry, DeclIndex, FileId, MemberDefinition, Scope};

/// A slice of source (a body or initializer) with the `new` expressions it
/// contains, positioned relative to the start of `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub text: String,
    pub news: Vec<NewRef>,
}

/// The allocated type of one `new` expression inside a [`SourceText`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRef {
    /// Offset of the type name relative to the text start
    pub offset: usize,
    pub len: usize,
    pub canonical: CanonicalType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDescriptor {
    /// Declaration without default: `const Node& other`
    pub decl_text: String,
    pub default: Option<String>,
    /// Type with aliases resolved and top-level cv stripped; `None` for
    /// parameters kept as text (function pointers, `...`)
    pub canonical: Option<CanonicalType>,
}

impl ParamDescriptor {
    pub fn render(&self) -> String {
        match &self.default {
            Some(default) => format!("{} = {}", self.decl_text, default),
            None => self.decl_text.clone(),
        }
    }
}

/// `= default` / `= delete`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Special {
    Defaulted,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Static,
    Dynamic,
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub declared_type: TypeExpr,
    /// Exactly one level of raw pointer: `U*`
    pub is_pointer: bool,
    /// For pointer fields whose pointee is a class defined in the input
    pub pointee: Option<CanonicalType>,
    pub access: Access,
    /// `= 4` or `{nullptr}`
    pub default_init: Option<String>,
    pub array_suffix: Option<String>,
    pub bit_width: Option<String>,
    pub is_mutable: bool,
    pub name_span: Span,
}

#[derive(Debug, Clone)]
pub struct MemInitDescriptor {
    pub name: String,
    /// Arguments including the surrounding parens or braces
    pub args: SourceText,
}

#[derive(Debug, Clone)]
pub struct ConstructorDescriptor {
    pub params: Vec<ParamDescriptor>,
    pub mem_inits: Vec<MemInitDescriptor>,
    pub body: Option<SourceText>,
    pub access: Access,
    pub is_explicit: bool,
    pub is_constexpr: bool,
    pub noexcept: Option<String>,
    pub special: Option<Special>,
    pub name_span: Span,
}

#[derive(Debug, Clone)]
pub enum Constructors {
    /// No user-declared constructor
    ImplicitDefault,
    Declared(Vec<ConstructorDescriptor>),
}

#[derive(Debug, Clone)]
pub struct DestructorDescriptor {
    pub body: Option<SourceText>,
    pub access: Access,
    pub dispatch: Dispatch,
    pub noexcept: Option<String>,
    pub special: Option<Special>,
    pub decl_offset: usize,
    pub name_span: Span,
}

#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub name: String,
    pub kind: FunctionKind,
    /// `None` for conversion operators
    pub return_type: Option<String>,
    pub params: Vec<ParamDescriptor>,
    /// Rendered qualifiers after the parameter list: ` const &&`, ` noexcept`
    pub qualifiers: String,
    pub is_static: bool,
    pub is_constexpr: bool,
    pub is_virtual: bool,
    pub is_override: bool,
    pub is_final: bool,
    pub is_pure: bool,
    pub special: Option<Special>,
    pub dispatch: Dispatch,
    pub access: Access,
    pub body: Option<SourceText>,
    /// Start of the declaration in the class's file
    pub decl_offset: usize,
    pub name_span: Span,
}

/// Position of a member in the class body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRef {
    Field(usize),
    Constructor(usize),
    Destructor,
    Method(usize),
    Passthrough(usize),
}

#[derive(Debug, Clone)]
pub struct ClassProfile {
    /// Name as declared: `Node`
    pub type_name: String,
    /// Qualified: `ds::Node`
    pub canonical: CanonicalType,
    pub key: ClassKey,
    /// Base specifiers as written: `public Base`
    pub bases: Vec<String>,
    pub fields: Vec<FieldDescriptor>,
    pub constructors: Constructors,
    pub destructor: Option<DestructorDescriptor>,
    pub methods: Vec<MethodDescriptor>,
    /// Nested enums, typedefs and static constants, verbatim
    pub passthrough: Vec<String>,
    /// Members in declaration order with their access level
    pub layout: Vec<(Access, MemberRef)>,
    pub file: FileId,
    pub insertion_offset: usize,
    /// Offset of the class body's closing brace
    pub body_end: usize,
    pub scope: Scope,
    pub name_span: Span,
}

impl ClassProfile {
    pub fn has_explicit_destructor(&self) -> bool {
        self.destructor.is_some()
    }

    pub fn pinned_pointer_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.pointee.is_some())
    }
}

type ProfileResult = Result<Rc<ClassProfile>, Located<ProfileError>>;

/// Builds class profiles on demand and caches them for the run.
#[derive(Debug, Default)]
pub struct Profiler {
    cache: FxHashMap<String, ProfileResult>,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile the class `ty` names from `scope`. `requested_at` locates the
    /// diagnostic when no definition is visible.
    pub fn profile(
        &mut self,
        index: &DeclIndex<'_>,
        ty: &TypeExpr,
        scope: &[String],
        requested_at: (FileId, Span),
    ) -> ProfileResult {
        let Some(entry) = index.resolve_class(ty, scope) else {
            let name = ty.pointee().to_string();
            let (file, span) = requested_at;
            if index.is_forward_only(&name) {
                tracing::debug!(class = %name, "only a forward declaration is visible");
            }
            return Err(Located::new(
                file,
                ProfileError::UnresolvedDeclaration {
                    name,
                    span: span.into(),
                },
            ));
        };

        if let Some(cached) = self.cache.get(&entry.qualified) {
            return cached.clone();
        }
        let result = build_profile(index, entry).map(Rc::new);
        if let Err(err) = &result {
            tracing::warn!(class = %entry.qualified, error = %err.error, "class cannot be profiled");
        }
        self.cache.insert(entry.qualified.clone(), result.clone());
        result
    }
}

fn build_profile<'a>(
    index: &DeclIndex<'a>,
    entry: &ClassEntry<'a>,
) -> Result<ClassProfile, Located<ProfileError>> {
    let _span = tracing::debug_span!("profile", class = %entry.qualified).entered();
    let class = entry.decl;
    let file = entry.file;
    let source = index.file(file).map(|f| f.source.as_str()).unwrap_or_default();
    let unsupported = |span: Span, reason: &str| {
        Located::new(
            file,
            ProfileError::UnsupportedDeclaration {
                name: entry.qualified.clone(),
                reason: reason.to_string(),
                span: span.into(),
            },
        )
    };

    if class.template == TemplateHeader::Primary {
        return Err(unsupported(class.name_span, "class templates are not supported"));
    }

    let builder = ProfileBuilder {
        index,
        entry,
        source,
        definitions: index.definitions_of(&entry.qualified),
    };

    let mut profile = ClassProfile {
        type_name: class.name.clone(),
        canonical: CanonicalType::new(entry.qualified.clone()),
        key: class.key,
        bases: class
            .bases
            .iter()
            .map(|base| base.span.text(source).trim().to_string())
            .collect(),
        fields: Vec::new(),
        constructors: Constructors::ImplicitDefault,
        destructor: None,
        methods: Vec::new(),
        passthrough: Vec::new(),
        layout: Vec::new(),
        file,
        insertion_offset: entry.insertion_offset,
        body_end: class
            .span
            .text(source)
            .rfind('}')
            .map_or(class.span.end, |at| class.span.start + at),
        scope: entry.scope.clone(),
        name_span: class.name_span,
    };

    let mut constructors = Vec::new();
    let mut passthrough_spans = FxHashSet::default();
    let mut access = class.key.default_access();

    for member in &class.members {
        match member {
            Member::AccessLabel { access: label, .. } => access = *label,
            Member::Field(field) if field.is_static => {
                let is_constant = field.ty.is_const || field.is_constexpr;
                if !is_constant || field.default_init.is_none() {
                    return Err(unsupported(
                        field.name_span,
                        "static data members other than initialized constants are not supported",
                    ));
                }
                if passthrough_spans.insert(field.decl_span.start) {
                    profile.layout.push((access, MemberRef::Passthrough(profile.passthrough.len())));
                    profile
                        .passthrough
                        .push(field.decl_span.text(source).trim().to_string());
                }
            }
            Member::Field(field) => {
                profile.layout.push((access, MemberRef::Field(profile.fields.len())));
                profile.fields.push(builder.field(field, access));
            }
            Member::Constructor(decl) => {
                profile.layout.push((access, MemberRef::Constructor(constructors.len())));
                constructors.push(builder.constructor(decl, access));
            }
            Member::Destructor(decl) => {
                profile.layout.push((access, MemberRef::Destructor));
                profile.destructor = Some(builder.destructor(decl, access));
            }
            Member::Method(decl) => {
                profile.layout.push((access, MemberRef::Method(profile.methods.len())));
                profile.methods.push(builder.method(decl, access));
            }
            Member::Passthrough { span, .. } => {
                profile.layout.push((access, MemberRef::Passthrough(profile.passthrough.len())));
                profile.passthrough.push(span.text(source).trim().to_string());
            }
            Member::Unrecognized(span) => {
                return Err(unsupported(*span, "member declaration is not understood"));
            }
        }
    }

    if !constructors.is_empty() {
        profile.constructors = Constructors::Declared(constructors);
    }
    tracing::debug!(
        fields = profile.fields.len(),
        methods = profile.methods.len(),
        pinned = profile.pinned_pointer_fields().count(),
        "class profiled"
    );
    Ok(profile)
}

struct ProfileBuilder<'p, 'a> {
    index: &'p DeclIndex<'a>,
    entry: &'p ClassEntry<'a>,
    source: &'p str,
    definitions: &'p [MemberDefinition<'a>],
}

/// Where a member's implementation lives: inline or out-of-line.
struct Implementation<'d> {
    decl: &'d FunctionDecl,
    source: &'d str,
}

impl<'a> ProfileBuilder<'_, 'a> {
    fn scope(&self) -> &[String] {
        &self.entry.scope
    }

    fn field(&self, field: &FieldDecl, access: Access) -> FieldDescriptor {
        let is_pointer = field.ty.is_single_pointer();
        let pointee = if is_pointer {
            let pointee = field.ty.pointee();
            self.index
                .resolve_class(&pointee, self.scope())
                .map(|entry| CanonicalType::new(entry.qualified.clone()))
        } else {
            None
        };
        let text = |span: &Option<Span>| span.map(|s| s.text(self.source).trim().to_string());
        FieldDescriptor {
            name: field.name.clone(),
            declared_type: field.ty.clone(),
            is_pointer,
            pointee,
            access,
            default_init: text(&field.default_init),
            array_suffix: text(&field.array_suffix),
            bit_width: text(&field.bit_width),
            is_mutable: field.is_mutable,
            name_span: field.name_span,
        }
    }

    fn constructor(&self, decl: &FunctionDecl, access: Access) -> ConstructorDescriptor {
        let implementation = self.implementation(decl);
        ConstructorDescriptor {
            params: self.params(decl, &implementation),
            mem_inits: implementation
                .decl
                .mem_inits
                .iter()
                .map(|init| MemInitDescriptor {
                    name: init.name.clone(),
                    args: self.source_text(
                        implementation.source,
                        init.args_span,
                        init.args.iter().flat_map(collect_news),
                    ),
                })
                .collect(),
            body: self.body(&implementation),
            access,
            is_explicit: decl.specifiers.is_explicit,
            is_constexpr: decl.specifiers.is_constexpr,
            noexcept: decl.qualifiers.noexcept.map(|s| s.text(self.source).to_string()),
            special: special(decl),
            name_span: decl.name_span,
        }
    }

    fn destructor(&self, decl: &FunctionDecl, access: Access) -> DestructorDescriptor {
        let implementation = self.implementation(decl);
        DestructorDescriptor {
            body: self.body(&implementation),
            access,
            dispatch: dispatch(decl),
            noexcept: decl.qualifiers.noexcept.map(|s| s.text(self.source).to_string()),
            special: special(decl),
            decl_offset: decl.decl_start,
            name_span: decl.name_span,
        }
    }

    fn method(&self, decl: &FunctionDecl, access: Access) -> MethodDescriptor {
        let implementation = self.implementation(decl);
        let q = &decl.qualifiers;
        let mut qualifiers = String::new();
        if q.is_const {
            qualifiers.push_str(" const");
        }
        if q.is_volatile {
            qualifiers.push_str(" volatile");
        }
        if let Some(span) = q.ref_qualifier {
            qualifiers.push(' ');
            qualifiers.push_str(span.text(self.source));
        }
        if let Some(span) = q.noexcept {
            qualifiers.push(' ');
            qualifiers.push_str(span.text(self.source));
        }
        MethodDescriptor {
            name: decl.name.clone(),
            kind: decl.kind,
            return_type: decl.return_type.as_ref().map(|ty| ty.to_string()),
            params: self.params(decl, &implementation),
            qualifiers,
            is_static: decl.specifiers.is_static,
            is_constexpr: decl.specifiers.is_constexpr,
            is_virtual: decl.specifiers.is_virtual,
            is_override: q.is_override,
            is_final: q.is_final,
            is_pure: q.is_pure,
            special: special(decl),
            dispatch: dispatch(decl),
            access,
            body: self.body(&implementation),
            decl_offset: decl.decl_start,
            name_span: decl.name_span,
        }
    }

    /// The inline definition, or the matching out-of-line one.
    fn implementation<'d>(&'d self, decl: &'d FunctionDecl) -> Implementation<'d> {
        let inline = Implementation {
            decl,
            source: self.source,
        };
        if decl.body.is_some() {
            return inline;
        }
        match self.find_definition(decl) {
            Some(def) => Implementation {
                decl: &def.def.decl,
                source: self
                    .index
                    .file(def.file)
                    .map(|f| f.source.as_str())
                    .unwrap_or_default(),
            },
            None => inline,
        }
    }

    fn find_definition(&self, decl: &FunctionDecl) -> Option<&MemberDefinition<'a>> {
        let candidates: Vec<&MemberDefinition<'a>> = self
            .definitions
            .iter()
            .filter(|d| {
                d.def.decl.kind == decl.kind
                    && d.def.decl.name == decl.name
                    && d.def.decl.qualifiers.is_const == decl.qualifiers.is_const
                    && d.def.decl.params.len() == decl.params.len()
                    && d.def.decl.body.is_some()
            })
            .collect();
        let wanted = self.param_types(&decl.params);
        candidates
            .iter()
            .find(|d| self.param_types(&d.def.decl.params) == wanted)
            .or(match candidates.as_slice() {
                [only] => Some(only),
                _ => None,
            })
            .copied()
    }

    fn param_types(&self, params: &[Param]) -> Vec<Option<CanonicalType>> {
        params
            .iter()
            .map(|p| {
                p.ty
                    .as_ref()
                    .map(|ty| self.index.canonical(&ty.strip_top_level_cv(), self.scope()))
            })
            .collect()
    }

    /// Parameter spellings come from whichever declaration supplies the body
    /// (so names match it); defaults only ever appear in the class.
    fn params(&self, decl: &FunctionDecl, implementation: &Implementation<'_>) -> Vec<ParamDescriptor> {
        let canonical = self.param_types(&decl.params);
        decl.params
            .iter()
            .zip(canonical)
            .enumerate()
            .map(|(i, (param, canonical))| {
                let (spelled, source) = match implementation.decl.params.get(i) {
                    Some(p) => (p, implementation.source),
                    None => (param, self.source),
                };
                ParamDescriptor {
                    decl_text: param_decl_text(spelled, source),
                    default: param
                        .default_value
                        .map(|span| span.text(self.source).trim().to_string()),
                    canonical,
                }
            })
            .collect()
    }

    fn body(&self, implementation: &Implementation<'_>) -> Option<SourceText> {
        let body: &Body = implementation.decl.body.as_ref()?;
        let mut news = Vec::new();
        for stmt in &body.stmts {
            stmt.walk(&mut |s| s.for_each_new(&mut |n| news.push(n)));
        }
        Some(self.source_text(implementation.source, body.span, news))
    }

    fn source_text<'n>(
        &self,
        source: &str,
        span: Span,
        news: impl IntoIterator<Item = &'n NewExpr>,
    ) -> SourceText {
        let mut refs: Vec<NewRef> = news
            .into_iter()
            .filter(|new| new.placement.is_none() && new.ty.span.start >= span.start)
            .map(|new| NewRef {
                offset: new.ty.span.start - span.start,
                len: new.ty.span.len(),
                canonical: self.index.canonical(&new.ty, self.scope()),
            })
            .collect();
        refs.sort_by_key(|r| r.offset);
        SourceText {
            text: span.text(source).to_string(),
            news: refs,
        }
    }
}

fn collect_news(expr: &Expr) -> Vec<&NewExpr> {
    let mut news = Vec::new();
    expr.for_each_new(&mut |n| news.push(n));
    news
}

/// `int d = 4` without ` = 4`
fn param_decl_text(param: &Param, source: &str) -> String {
    let end = param.default_value.map(|d| d.start).unwrap_or(param.span.end);
    let text = source[param.span.start..end].trim_end();
    text.strip_suffix('=').unwrap_or(text).trim().to_string()
}

fn special(decl: &FunctionDecl) -> Option<Special> {
    if decl.qualifiers.is_defaulted {
        Some(Special::Defaulted)
    } else if decl.qualifiers.is_deleted {
        Some(Special::Deleted)
    } else {
        None
    }
}

fn dispatch(decl: &FunctionDecl) -> Dispatch {
    let q = &decl.qualifiers;
    if decl.specifiers.is_virtual || q.is_override || q.is_final {
        Dispatch::Dynamic
    } else {
        Dispatch::Static
    }
}
