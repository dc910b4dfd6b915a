// src/synth.rs
//
// Specialization synthesizer: renders `template<> class numa<T, N>` from a
// class profile, pinning pointer fields transitively. A key that fails takes
// every specialization and edit queued on its behalf down with it.

use std::fmt::Write as _;
use std::rc::Rc;

use numapin_frontend::{Access, FunctionKind, Lexer, Span, TokenType, TypeExpr, TypeName};
use numapin_sema::{
    Begin, CanonicalType, ClassProfile, Constructors, DeclIndex, Dispatch, FieldDescriptor, FileId,
    Located, MemberRef, MethodDescriptor, NewRef, NodeId, ParamDescriptor, ProfileError, Profiler,
    RegistryMark, SourceText, Special, SpecializationKey, SpecializationRecord,
    SpecializationRegistry,
};
use rustc_hash::FxHashSet;

use crate::errors::{SynthError, SynthWarning};
use crate::rewrite::{RewriteMark, RewriteSet};

const INDENT: &str = "    ";

/// How the specialization relates to the original type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Self-contained replica; the original declaration is never edited.
    #[default]
    Standalone,
    /// Derives from the original type and reuses its state and constructors;
    /// the original gains a friend declaration, and types reached through
    /// plain handles get their methods promoted to `virtual`.
    Inherit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthOptions {
    pub wrapper: String,
    pub allocate_fn: String,
    pub deallocate_fn: String,
    pub mode: Mode,
}

impl Default for SynthOptions {
    fn default() -> Self {
        Self {
            wrapper: "numa".to_string(),
            allocate_fn: "numa_alloc_onnode".to_string(),
            deallocate_fn: "numa_free".to_string(),
            mode: Mode::Standalone,
        }
    }
}

/// A diagnostic raised while synthesizing, with the file it points into
#[derive(Debug, Clone)]
pub enum SynthDiagnostic {
    Profile(Located<ProfileError>),
    Synth(Located<SynthError>),
    Warning(Located<SynthWarning>),
}

impl SynthDiagnostic {
    pub fn file(&self) -> FileId {
        match self {
            SynthDiagnostic::Profile(located) => located.file,
            SynthDiagnostic::Synth(located) => located.file,
            SynthDiagnostic::Warning(located) => located.file,
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, SynthDiagnostic::Warning(_))
    }

    /// The one-line message, without source context
    pub fn message(&self) -> String {
        match self {
            SynthDiagnostic::Profile(located) => located.error.to_string(),
            SynthDiagnostic::Synth(located) => located.error.to_string(),
            SynthDiagnostic::Warning(located) => located.error.to_string(),
        }
    }
}

/// Result of requesting one `(T, N)` specialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Synthesized,
    /// Emitted earlier in the run or present in the input
    Present,
    /// Being synthesized further up the stack (pointer cycle)
    Underway,
    Failed,
}

/// Pointer-field element types that ended up pinned
#[derive(Debug, Default)]
struct Pins {
    /// In field order
    elements: Vec<CanonicalType>,
    /// Pinned elements other than the class itself whose specialization is
    /// still being synthesized further up the stack
    underway: Vec<SpecializationKey>,
}

impl Pins {
    fn contains(&self, element: &CanonicalType) -> bool {
        self.elements.contains(element)
    }
}

/// An out-of-line destructor definition waiting for a key to complete
#[derive(Debug)]
struct DeferredDestructor {
    waits_on: SpecializationKey,
    file: FileId,
    /// The definition goes after every one of these specializations that
    /// lives in `file`
    after: Vec<SpecializationKey>,
    text: String,
}

/// Run state a failed key rolls back to
struct Checkpoint {
    registry: RegistryMark,
    rewrites: RewriteMark,
    deferred: usize,
    diagnostics: usize,
}

pub struct Synthesizer<'s, 'a> {
    index: &'s DeclIndex<'a>,
    profiler: &'s mut Profiler,
    registry: &'s mut SpecializationRegistry,
    rewrites: &'s mut RewriteSet<'a>,
    options: &'s SynthOptions,
    /// Types reached through plain handles somewhere in the run
    bare_types: &'s FxHashSet<CanonicalType>,
    /// Keys being synthesized, outermost first
    active: Vec<SpecializationKey>,
    deferred: Vec<DeferredDestructor>,
    diagnostics: Vec<SynthDiagnostic>,
}

impl<'s, 'a> Synthesizer<'s, 'a> {
    pub fn new(
        index: &'s DeclIndex<'a>,
        profiler: &'s mut Profiler,
        registry: &'s mut SpecializationRegistry,
        rewrites: &'s mut RewriteSet<'a>,
        options: &'s SynthOptions,
        bare_types: &'s FxHashSet<CanonicalType>,
    ) -> Self {
        Self {
            index,
            profiler,
            registry,
            rewrites,
            options,
            bare_types,
            active: Vec::new(),
            deferred: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn take_diagnostics(&mut self) -> Vec<SynthDiagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Ensure `(ty, node)` has a specialization, synthesizing it and the
    /// specializations of its pinned pointer fields as needed.
    pub fn request(
        &mut self,
        ty: &TypeExpr,
        scope: &[String],
        node: NodeId,
        requested_at: (FileId, Span),
    ) -> Outcome {
        match self.synthesize(ty, scope, node, requested_at) {
            Ok(outcome) => outcome,
            Err(diagnostic) => {
                self.diagnostics.push(diagnostic);
                Outcome::Failed
            }
        }
    }

    fn synthesize(
        &mut self,
        ty: &TypeExpr,
        scope: &[String],
        node: NodeId,
        requested_at: (FileId, Span),
    ) -> Result<Outcome, SynthDiagnostic> {
        let profile = self
            .profiler
            .profile(self.index, ty, scope, requested_at)
            .map_err(SynthDiagnostic::Profile)?;
        let key = SpecializationKey::new(profile.canonical.clone(), node);
        match self.registry.begin(&key) {
            Begin::AlreadyPresent => return Ok(Outcome::Present),
            Begin::InProgress => return Ok(Outcome::Underway),
            Begin::Started => {}
        }

        let _span = tracing::debug_span!("synthesize", %key).entered();
        let checkpoint = self.checkpoint();
        self.active.push(key.clone());
        let emitted = self.emit(&profile, &key);
        self.active.pop();
        match emitted {
            Ok(record) => {
                self.registry.complete(record);
                self.place_deferred(&key);
                Ok(Outcome::Synthesized)
            }
            Err(err) => {
                tracing::warn!(%key, error = %err.message(), "specialization abandoned");
                self.rollback(checkpoint);
                self.registry.abandon(&key);
                Err(err)
            }
        }
    }

    fn emit(
        &mut self,
        profile: &Rc<ClassProfile>,
        key: &SpecializationKey,
    ) -> Result<SpecializationRecord, SynthDiagnostic> {
        let Some(source) = self.index.file(profile.file).map(|f| f.source.as_str()) else {
            return Err(placement_error(profile, "its file is not part of the run".to_string()));
        };
        let pins = self.pin_pointer_fields(profile, key.node);
        let inherit = self.options.mode == Mode::Inherit;
        if inherit && self.bare_types.contains(&profile.canonical) {
            self.promote(profile);
        }
        let promoted = self.registry.is_promoted(&profile.canonical);
        let rendered = Renderer::new(profile, key.node, &pins, self.options, promoted)
            .render()
            .map_err(|err| SynthDiagnostic::Synth(Located::new(profile.file, err)))?;

        let offset = self.placement(profile, &pins, key.node);
        self.rewrites
            .insert(profile.file, source, offset, format!("\n\n{}", rendered.text))
            .map_err(|err| placement_error(profile, err.to_string()))?;
        if inherit {
            let friend = format!("friend class {};", pinned_name(&self.options.wrapper, &key.element, key.node));
            let (at, text) = closing_members(source, profile.body_end, &[(friend.as_str(), false)]);
            self.rewrites
                .insert(profile.file, source, at, text)
                .map_err(|err| placement_error(profile, err.to_string()))?;
        }
        if let Some(text) = rendered.out_of_line_destructor {
            let mut after = pins.underway.clone();
            after.push(key.clone());
            let waits_on = self
                .active
                .iter()
                .find(|active| pins.underway.contains(*active))
                .unwrap_or(key)
                .clone();
            tracing::debug!(%key, %waits_on, "destructor defined out of line");
            self.deferred.push(DeferredDestructor {
                waits_on,
                file: profile.file,
                after,
                text,
            });
        }
        Ok(SpecializationRecord {
            key: key.clone(),
            emitted_text: rendered.text,
            file: profile.file,
            offset,
        })
    }

    /// Synthesize `(U, N)` for every pointer field `U*` whose class is known.
    /// A field whose element cannot be specialized keeps its plain type and
    /// yields a warning.
    fn pin_pointer_fields(&mut self, profile: &Rc<ClassProfile>, node: NodeId) -> Pins {
        let mut pins = Pins::default();
        for field in profile.pinned_pointer_fields() {
            let Some(pointee) = &field.pointee else { continue };
            if pins.contains(pointee) {
                continue;
            }
            let ty = qualified_type(pointee);
            let at = (profile.file, field.name_span);
            match self.synthesize(&ty, &[], node, at) {
                Ok(outcome) => {
                    if outcome == Outcome::Underway && *pointee != profile.canonical {
                        pins.underway.push(SpecializationKey::new(pointee.clone(), node));
                    }
                    // The base class holds it through a plain `U*` field.
                    if self.options.mode == Mode::Inherit
                        && let Ok(element) = self.profiler.profile(self.index, &ty, &[], at)
                    {
                        self.promote(&element);
                    }
                    pins.elements.push(pointee.clone());
                }
                Err(cause) => {
                    tracing::warn!(field = %field.name, element = %pointee, "pointer field left unpinned");
                    self.diagnostics.push(SynthDiagnostic::Warning(Located::new(
                        profile.file,
                        SynthWarning::FieldLeftUnpinned {
                            class: profile.canonical.to_string(),
                            field: field.name.clone(),
                            element: pointee.to_string(),
                            node: node.0,
                            reason: cause.message(),
                            span: field.name_span.into(),
                        },
                    )));
                }
            }
        }
        pins
    }

    /// After `T`, and after every pinned element's specialization already
    /// placed in the same file.
    fn placement(&self, profile: &ClassProfile, pins: &Pins, node: NodeId) -> usize {
        pins.elements
            .iter()
            .filter_map(|element| self.registry.get(&SpecializationKey::new(element.clone(), node)))
            .filter(|record| record.file == profile.file)
            .map(|record| record.offset)
            .fold(profile.insertion_offset, usize::max)
    }

    /// Place the out-of-line destructors that were waiting for `completed`.
    fn place_deferred(&mut self, completed: &SpecializationKey) {
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.deferred)
            .into_iter()
            .partition(|d| d.waits_on == *completed);
        self.deferred = waiting;
        for destructor in ready {
            let offset = destructor
                .after
                .iter()
                .filter_map(|key| self.registry.get(key))
                .filter(|record| record.file == destructor.file)
                .map(|record| record.offset)
                .max();
            let source = self.index.file(destructor.file).map(|f| f.source.as_str());
            let (Some(offset), Some(source)) = (offset, source) else {
                tracing::error!(waits_on = %destructor.waits_on, "no place for out-of-line destructor");
                continue;
            };
            let text = format!("\n\n{}", destructor.text);
            if let Err(err) = self.rewrites.insert(destructor.file, source, offset, text) {
                tracing::error!(error = %err, "destructor insertion rejected");
            }
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            registry: self.registry.mark(),
            rewrites: self.rewrites.mark(),
            deferred: self.deferred.len(),
            diagnostics: self.diagnostics.len(),
        }
    }

    fn rollback(&mut self, checkpoint: Checkpoint) {
        self.registry.rollback(checkpoint.registry);
        self.rewrites.rollback(&checkpoint.rewrites);
        self.deferred.truncate(checkpoint.deferred);
        self.diagnostics.truncate(checkpoint.diagnostics);
    }

    /// Mark public non-static methods and the destructor `virtual` in the
    /// original declaration, declaring a virtual destructor when there is
    /// none. Happens once per type per run.
    fn promote(&mut self, profile: &ClassProfile) {
        if !self.registry.mark_promoted(&profile.canonical) {
            return;
        }
        let Some(source) = self.index.file(profile.file).map(|f| f.source.as_str()) else {
            return;
        };
        let mut edits: Vec<(usize, String)> = profile
            .methods
            .iter()
            .filter(|m| is_promotable(m))
            .map(|m| (m.decl_offset, "virtual ".to_string()))
            .collect();
        match &profile.destructor {
            Some(dtor) if dtor.dispatch == Dispatch::Static => {
                edits.push((dtor.decl_offset, "virtual ".to_string()));
            }
            Some(_) => {}
            None => {
                let dtor = format!("virtual ~{}() = default;", profile.type_name);
                edits.push(closing_members(
                    source,
                    profile.body_end,
                    &[("public:", true), (dtor.as_str(), false)],
                ));
            }
        }
        tracing::debug!(class = %profile.canonical, edits = edits.len(), "promoting to dynamic dispatch");
        for (offset, text) in edits {
            if let Err(err) = self.rewrites.insert(profile.file, source, offset, text) {
                tracing::error!(error = %err, "promotion edit rejected");
            }
        }
    }
}

fn placement_error(profile: &ClassProfile, reason: String) -> SynthDiagnostic {
    SynthDiagnostic::Synth(Located::new(
        profile.file,
        SynthError::Placement {
            class: profile.canonical.to_string(),
            reason,
            span: profile.name_span.into(),
        },
    ))
}

fn is_promotable(method: &MethodDescriptor) -> bool {
    method.access == Access::Public
        && !method.is_static
        && method.dispatch == Dispatch::Static
        && method.special != Some(Special::Deleted)
}

/// A type naming a fully qualified class: `::ds::Node`
fn qualified_type(canonical: &CanonicalType) -> TypeExpr {
    let mut name = TypeName::simple("");
    name.global = true;
    name.segments = canonical
        .as_str()
        .split("::")
        .map(|ident| numapin_frontend::NameSegment {
            ident: ident.to_string(),
            args: None,
        })
        .collect();
    TypeExpr::named(name)
}

fn pinned_name(wrapper: &str, element: &CanonicalType, node: NodeId) -> String {
    format!("{}<{}, {}>", wrapper, element, node)
}

/// Members inserted just before the closing brace at `body_end`: on lines of
/// their own when the brace starts a line, inline otherwise. Each entry is
/// the member text and whether it is an access label.
fn closing_members(source: &str, body_end: usize, members: &[(&str, bool)]) -> (usize, String) {
    let before = &source[..body_end];
    let line_start = before.trim_end_matches([' ', '\t']);
    if !line_start.ends_with('\n') {
        let text = members.iter().map(|(member, _)| format!("{member} ")).collect();
        return (body_end, text);
    }
    let brace_indent = &before[line_start.len()..];
    let mut text = String::new();
    for (member, is_label) in members {
        text.push_str(brace_indent);
        if !is_label {
            text.push_str(INDENT);
        }
        text.push_str(member);
        text.push('\n');
    }
    (line_start.len(), text)
}

/// `canonical` spelled as `name`, qualified or from an enclosing scope
fn names_type(canonical: &CanonicalType, name: &str) -> bool {
    let text = canonical.as_str();
    text == name
        || text
            .strip_suffix(name)
            .is_some_and(|scope| scope.ends_with("::"))
}

/// Release each field (in the order given) and then run `body`.
fn release_block(indent: &str, releases: &[&str], body: Option<&str>) -> String {
    let mut text = String::new();
    for name in releases {
        let _ = write!(
            text,
            "{indent}if ({name} != nullptr) {{\n\
             {indent}{INDENT}delete {name};\n\
             {indent}{INDENT}{name} = nullptr;\n\
             {indent}}}\n"
        );
    }
    if let Some(body) = body {
        let _ = writeln!(text, "{indent}{body}");
    }
    text
}

/// One specialization's text
struct Rendered {
    text: String,
    /// `inline numa<T, N>::~numa() {...}`, placed once the specializations
    /// it releases are complete
    out_of_line_destructor: Option<String>,
}

/// Renders one specialization
struct Renderer<'r> {
    profile: &'r ClassProfile,
    node: NodeId,
    pins: &'r Pins,
    options: &'r SynthOptions,
    promoted: bool,
    out: String,
    access: Access,
    out_of_line_destructor: Option<String>,
}

impl<'r> Renderer<'r> {
    fn new(
        profile: &'r ClassProfile,
        node: NodeId,
        pins: &'r Pins,
        options: &'r SynthOptions,
        promoted: bool,
    ) -> Self {
        Self {
            profile,
            node,
            pins,
            options,
            promoted,
            out: String::new(),
            access: Access::Public,
            out_of_line_destructor: None,
        }
    }

    fn wrapper(&self) -> &str {
        &self.options.wrapper
    }

    fn inherits(&self) -> bool {
        self.options.mode == Mode::Inherit
    }

    fn pinned_name(&self, element: &CanonicalType) -> String {
        pinned_name(self.wrapper(), element, self.node)
    }

    fn render(mut self) -> Result<Rendered, SynthError> {
        let inherit = self.inherits();
        if !inherit {
            self.check_constructors()?;
            self.forward_declarations();
        }
        self.header();
        self.allocation_operators();

        let profile = self.profile;
        match &profile.constructors {
            Constructors::Declared(_) if inherit => {
                let line = format!("using {}::{};", profile.canonical, profile.type_name);
                self.line(&line);
            }
            Constructors::ImplicitDefault if !inherit => {
                let line = format!("{}() {{}}", self.wrapper());
                self.line(&line);
            }
            _ => {}
        }
        let needs_destructor = profile.pinned_pointer_fields().any(|f| self.is_pinned_field(f));
        for &(access, member) in &profile.layout {
            match member {
                MemberRef::Method(i) => {
                    self.switch_access(access);
                    self.method(i)?;
                }
                // The base class keeps its own state, constructors and destructor.
                _ if inherit => {}
                MemberRef::Field(i) => {
                    self.switch_access(access);
                    self.field(i);
                }
                MemberRef::Constructor(i) => {
                    self.switch_access(access);
                    self.constructor(i)?;
                }
                MemberRef::Destructor => {
                    self.switch_access(access);
                    self.destructor()?;
                }
                MemberRef::Passthrough(i) => {
                    self.switch_access(access);
                    self.line(&profile.passthrough[i]);
                }
            }
        }
        if !inherit && profile.destructor.is_none() && needs_destructor {
            self.switch_access(Access::Public);
            self.destructor()?;
        }
        self.out.push_str("};");
        Ok(Rendered {
            text: self.out,
            out_of_line_destructor: self.out_of_line_destructor,
        })
    }

    /// Pinned elements may be specialized further down, or not yet at all.
    fn forward_declarations(&mut self) {
        let pins = self.pins;
        let mut any = false;
        for element in &pins.elements {
            if *element == self.profile.canonical {
                continue;
            }
            let name = self.pinned_name(element);
            let _ = writeln!(self.out, "template<> class {};", name);
            any = true;
        }
        if any {
            self.out.push('\n');
        }
    }

    fn header(&mut self) {
        let mut header = format!(
            "template<>\nclass {}",
            self.pinned_name(&self.profile.canonical)
        );
        let bases: Vec<String> = match self.options.mode {
            Mode::Inherit => vec![format!("public {}", self.profile.canonical)],
            Mode::Standalone => self.profile.bases.clone(),
        };
        if !bases.is_empty() {
            let _ = write!(header, " : {}", bases.join(", "));
        }
        header.push_str(" {\npublic:\n");
        self.out.push_str(&header);
    }

    fn allocation_operators(&mut self) {
        let alloc = &self.options.allocate_fn;
        let free = &self.options.deallocate_fn;
        let node = self.node;
        for suffix in ["", "[]"] {
            let _ = write!(
                self.out,
                "{INDENT}static void* operator new{suffix}(std::size_t size) {{\n\
                 {INDENT}{INDENT}void* ptr = {alloc}(size, {node});\n\
                 {INDENT}{INDENT}if (ptr == nullptr) {{\n\
                 {INDENT}{INDENT}{INDENT}throw std::bad_alloc();\n\
                 {INDENT}{INDENT}}}\n\
                 {INDENT}{INDENT}return ptr;\n\
                 {INDENT}}}\n"
            );
        }
        for suffix in ["", "[]"] {
            let _ = write!(
                self.out,
                "{INDENT}static void operator delete{suffix}(void* ptr, std::size_t size) {{\n\
                 {INDENT}{INDENT}{free}(ptr, size);\n\
                 {INDENT}}}\n"
            );
        }
    }

    fn line(&mut self, text: &str) {
        self.out.push_str(INDENT);
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn switch_access(&mut self, access: Access) {
        if access != self.access {
            let _ = writeln!(self.out, "{}:", access);
            self.access = access;
        }
    }

    fn is_pinned_field(&self, field: &FieldDescriptor) -> bool {
        field.pointee.as_ref().is_some_and(|p| self.pins.contains(p))
    }

    fn field(&mut self, index: usize) {
        let profile = self.profile;
        let field = &profile.fields[index];
        let mut text = String::new();
        if field.is_mutable {
            text.push_str("mutable ");
        }
        match &field.pointee {
            Some(pointee) if self.pins.contains(pointee) => {
                if field.declared_type.is_const {
                    text.push_str("const ");
                }
                let _ = write!(text, "{}* {}", self.pinned_name(pointee), field.name);
                match &field.default_init {
                    Some(init) => {
                        let _ = write!(text, " {}", init);
                    }
                    None => text.push_str(" = nullptr"),
                }
            }
            _ => {
                let _ = write!(text, "{} {}", field.declared_type, field.name);
                if let Some(suffix) = &field.array_suffix {
                    text.push_str(suffix);
                }
                if let Some(width) = &field.bit_width {
                    let _ = write!(text, " : {}", width);
                }
                if let Some(init) = &field.default_init {
                    let _ = write!(text, " {}", init);
                }
            }
        }
        text.push(';');
        self.line(&text);
    }

    /// Parameter lists must stay distinct once pinned types replace raw ones.
    fn check_constructors(&self) -> Result<(), SynthError> {
        let Constructors::Declared(ctors) = &self.profile.constructors else {
            return Ok(());
        };
        let shapes: Vec<Vec<String>> = ctors
            .iter()
            .map(|ctor| {
                ctor.params
                    .iter()
                    .map(|p| match &p.canonical {
                        Some(canonical) => self.retype(canonical.as_str(), &[]),
                        None => p.decl_text.clone(),
                    })
                    .collect()
            })
            .collect();
        for (i, shape) in shapes.iter().enumerate() {
            if let Some(j) = shapes[..i].iter().position(|earlier| earlier == shape) {
                return Err(SynthError::AmbiguousConstructor {
                    class: self.profile.canonical.to_string(),
                    node: self.node.0,
                    span: ctors[i].name_span.into(),
                    previous: ctors[j].name_span.into(),
                });
            }
        }
        Ok(())
    }

    fn missing(&self, member: &str, span: Span) -> SynthError {
        SynthError::MissingDefinition {
            class: self.profile.canonical.to_string(),
            member: member.to_string(),
            span: span.into(),
        }
    }

    fn params(&self, params: &[ParamDescriptor]) -> String {
        let rendered: Vec<String> = params
            .iter()
            .map(|p| {
                let decl = self.retype(&p.decl_text, &[]);
                match &p.default {
                    Some(default) => format!("{} = {}", decl, self.retype(default, &[])),
                    None => decl,
                }
            })
            .collect();
        rendered.join(", ")
    }

    fn constructor(&mut self, index: usize) -> Result<(), SynthError> {
        let profile = self.profile;
        let Constructors::Declared(ctors) = &profile.constructors else {
            return Ok(());
        };
        let ctor = &ctors[index];
        let mut text = String::new();
        if ctor.is_explicit {
            text.push_str("explicit ");
        }
        if ctor.is_constexpr {
            text.push_str("constexpr ");
        }
        let _ = write!(text, "{}({})", self.wrapper(), self.params(&ctor.params));
        if let Some(noexcept) = &ctor.noexcept {
            let _ = write!(text, " {}", noexcept);
        }
        match (ctor.special, &ctor.body) {
            (Some(Special::Defaulted), _) => text.push_str(" = default;"),
            (Some(Special::Deleted), _) => text.push_str(" = delete;"),
            (None, None) => return Err(self.missing(&profile.type_name, ctor.name_span)),
            (None, Some(body)) => {
                if !ctor.mem_inits.is_empty() {
                    let inits: Vec<String> = ctor
                        .mem_inits
                        .iter()
                        .map(|init| {
                            let name = if init.name == profile.type_name
                                || init.name == profile.canonical.as_str()
                            {
                                self.wrapper()
                            } else {
                                init.name.as_str()
                            };
                            format!("{}{}", name, self.retype_source(&init.args))
                        })
                        .collect();
                    let _ = write!(text, " : {}", inits.join(", "));
                }
                let _ = write!(text, " {}", self.retype_source(body));
            }
        }
        self.line(&text);
        Ok(())
    }

    fn destructor(&mut self) -> Result<(), SynthError> {
        let profile = self.profile;
        let releases: Vec<&str> = profile
            .fields
            .iter()
            .rev()
            .filter(|f| self.is_pinned_field(f))
            .map(|f| f.name.as_str())
            .collect();

        let dtor = profile.destructor.as_ref();
        let noexcept = dtor.and_then(|d| d.noexcept.as_ref());
        let mut decl = String::new();
        if dtor.is_some_and(|d| d.dispatch == Dispatch::Dynamic) || self.promoted {
            decl.push_str("virtual ");
        }
        let _ = write!(decl, "~{}()", self.wrapper());
        if let Some(noexcept) = noexcept {
            let _ = write!(decl, " {}", noexcept);
        }

        let body = match dtor {
            Some(d) if d.special == Some(Special::Deleted) => {
                decl.push_str(" = delete;");
                self.line(&decl);
                return Ok(());
            }
            Some(d) if d.special == Some(Special::Defaulted) => None,
            Some(d) => match &d.body {
                Some(body) => Some(self.retype_source(body)),
                None => {
                    let name = format!("~{}", profile.type_name);
                    return Err(self.missing(&name, d.name_span));
                }
            },
            None => None,
        };

        if releases.is_empty() && body.is_none() {
            decl.push_str(" = default;");
            self.line(&decl);
            return Ok(());
        }
        if self.pins.underway.is_empty() {
            let block = release_block(&format!("{INDENT}{INDENT}"), &releases, body.as_deref());
            self.line(&format!("{decl} {{\n{block}{INDENT}}}"));
            return Ok(());
        }

        // Some released element is still incomplete at this point.
        self.line(&format!("{decl};"));
        let mut definition = format!(
            "inline {}::~{}()",
            self.pinned_name(&profile.canonical),
            self.wrapper()
        );
        if let Some(noexcept) = noexcept {
            let _ = write!(definition, " {}", noexcept);
        }
        definition.push_str(" {\n");
        definition.push_str(&release_block(INDENT, &releases, body.as_deref()));
        definition.push('}');
        self.out_of_line_destructor = Some(definition);
        Ok(())
    }

    fn method(&mut self, index: usize) -> Result<(), SynthError> {
        let profile = self.profile;
        let method = &profile.methods[index];
        if method.special == Some(Special::Defaulted) {
            // Defaulted operators refer to the original type's signature.
            tracing::trace!(method = %method.name, "defaulted member not replicated");
            return Ok(());
        }
        let body = match (&method.body, method.special) {
            (_, Some(Special::Deleted)) => None,
            (Some(body), _) if !method.is_pure => Some(self.retype_source(body)),
            _ => return Err(self.missing(&method.name, method.name_span)),
        };

        let mut text = String::new();
        if method.is_static {
            text.push_str("static ");
        }
        if method.is_virtual {
            text.push_str("virtual ");
        }
        if method.is_constexpr {
            text.push_str("constexpr ");
        }
        if let Some(ret) = &method.return_type {
            let _ = write!(text, "{} ", self.retype(ret, &[]));
        }
        let _ = write!(
            text,
            "{}({}){}",
            method.name,
            self.params(&method.params),
            method.qualifiers
        );

        let overrides = method.is_override
            || (self.inherits()
                && !method.is_static
                && method.kind != FunctionKind::Constructor
                && (method.dispatch == Dispatch::Dynamic || (self.promoted && is_promotable(method))));
        if overrides {
            text.push_str(" override");
        }
        if method.is_final {
            text.push_str(" final");
        }
        match body {
            Some(body) => {
                let _ = write!(text, " {}", body);
            }
            None => text.push_str(" = delete;"),
        }
        self.line(&text);
        Ok(())
    }

    fn retype_source(&self, source: &SourceText) -> String {
        self.retype(&source.text, &source.news)
    }

    /// Copy `text`, spelling every `new U` of a pinned `U` (or of the class
    /// itself) as `new numa<U, N>`. A standalone specialization also spells
    /// those `U*` and the class's own `T&`/`T&&` as specializations.
    fn retype(&self, text: &str, news: &[NewRef]) -> String {
        let mut edits: Vec<(usize, usize, String)> = news
            .iter()
            .filter(|new| new.canonical == self.profile.canonical || self.pins.contains(&new.canonical))
            .map(|new| (new.offset, new.offset + new.len, self.pinned_name(&new.canonical)))
            .collect();
        if !self.inherits() {
            edits.extend(self.type_mentions(text));
        }
        edits.sort_by_key(|&(start, _, _)| start);

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for (start, end, replacement) in edits {
            if start < cursor {
                continue;
            }
            out.push_str(&text[cursor..start]);
            out.push_str(&replacement);
            cursor = end;
        }
        out.push_str(&text[cursor..]);
        out
    }

    /// The class itself or a pinned element, by the name `text` uses for it
    fn retype_target(&self, name: &str) -> Option<&'r CanonicalType> {
        let profile = self.profile;
        let pins = self.pins;
        let targets = || std::iter::once(&profile.canonical).chain(pins.elements.iter());
        let mut matching = targets().filter(|c| names_type(c, name));
        let first = matching.next()?;
        if matching.next().is_none() {
            return Some(first);
        }
        targets().find(|c| c.as_str() == name)
    }

    /// `(start, end, replacement)` for every single-level `U*` naming a
    /// retype target, and every `T&`/`T&&` naming the class itself
    fn type_mentions(&self, text: &str) -> Vec<(usize, usize, String)> {
        let (tokens, _) = Lexer::new(text).tokenize();
        let ty = |i: usize| tokens.get(i).map(|t| t.ty);
        let mut found = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            let start = i;
            let mut end = i;
            if ty(end) == Some(TokenType::ColonColon) {
                end += 1;
            }
            if ty(end) != Some(TokenType::Identifier) {
                i += 1;
                continue;
            }
            let mut name = tokens[end].lexeme.to_string();
            end += 1;
            while ty(end) == Some(TokenType::ColonColon) && ty(end + 1) == Some(TokenType::Identifier) {
                name.push_str("::");
                name.push_str(&tokens[end + 1].lexeme);
                end += 2;
            }
            i = end;

            // `p->Node`, `x.Node` and `Outer<T>::Node` name something else.
            let prev = start.checked_sub(1).and_then(ty);
            let elsewhere = matches!(prev, Some(TokenType::Dot | TokenType::Arrow))
                || (ty(start) == Some(TokenType::ColonColon) && prev == Some(TokenType::Gt));
            if elsewhere {
                continue;
            }
            let Some(element) = self.retype_target(&name) else {
                continue;
            };
            let mut declarator = end;
            while matches!(ty(declarator), Some(TokenType::KwConst | TokenType::KwVolatile)) {
                declarator += 1;
            }
            let pinned = match ty(declarator) {
                Some(TokenType::Star) => ty(declarator + 1) != Some(TokenType::Star),
                Some(TokenType::Ampersand | TokenType::AmpAmp) => *element == self.profile.canonical,
                _ => false,
            };
            if pinned {
                found.push((
                    tokens[start].span.start,
                    tokens[end - 1].span.end,
                    self.pinned_name(element),
                ));
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use numapin_frontend::Parser;
    use numapin_sema::ParsedFile;

    struct Run {
        texts: Vec<String>,
        outputs: std::collections::BTreeMap<FileId, String>,
        diagnostics: Vec<SynthDiagnostic>,
    }

    impl Run {
        fn text_of(&self, class: &str) -> &str {
            let header = format!("class {} {{", class);
            self.texts
                .iter()
                .find(|t| t.contains(&header))
                .unwrap_or_else(|| panic!("no specialization {class}"))
        }
    }

    fn parsed(id: u32, source: &str) -> ParsedFile {
        ParsedFile {
            id: FileId(id),
            name: format!("f{}.hpp", id),
            source: source.to_string(),
            unit: Parser::new(source).parse_translation_unit().unwrap(),
        }
    }

    fn run(files: &[ParsedFile], requests: &[(&str, u32)], options: SynthOptions, bare: &[&str]) -> Run {
        let index = DeclIndex::build(files);
        let mut profiler = Profiler::new();
        let mut registry = SpecializationRegistry::new();
        let mut rewrites = RewriteSet::new();
        let bare_types: FxHashSet<CanonicalType> = bare.iter().map(|b| CanonicalType::new(*b)).collect();
        let diagnostics = {
            let mut synth = Synthesizer::new(
                &index,
                &mut profiler,
                &mut registry,
                &mut rewrites,
                &options,
                &bare_types,
            );
            for (name, node) in requests {
                let ty = TypeExpr::named(TypeName::simple(*name));
                synth.request(&ty, &[], NodeId(*node), (FileId(0), Span::default()));
            }
            synth.take_diagnostics()
        };
        Run {
            texts: registry.records().iter().map(|r| r.emitted_text.clone()).collect(),
            outputs: rewrites.flush(),
            diagnostics,
        }
    }

    fn inherit() -> SynthOptions {
        SynthOptions {
            mode: Mode::Inherit,
            ..SynthOptions::default()
        }
    }

    const NODE: &str = r#"class Node {
    int data;
    Node* link;
public:
    Node(int d) : data(d), link(nullptr) {}
    ~Node() { }
    Node* getLink() const { return link; }
    void push(int d) { link = new Node(d); }
};
"#;

    #[test]
    fn synthesizes_node_specialization() {
        let files = [parsed(0, NODE)];
        let result = run(&files, &[("Node", 1)], SynthOptions::default(), &[]);
        assert!(result.diagnostics.is_empty());
        assert_eq!(result.texts.len(), 1);
        let text = &result.texts[0];
        assert!(text.starts_with("template<>\nclass numa<Node, 1> {\npublic:\n"));
        assert!(text.contains("void* ptr = numa_alloc_onnode(size, 1);"));
        assert!(text.contains("static void operator delete[](void* ptr, std::size_t size)"));
        assert!(text.contains("private:\n    int data;\n    numa<Node, 1>* link = nullptr;\n"));
        assert!(text.contains("    numa(int d) : data(d), link(nullptr) {}\n"));
        assert!(text.contains("if (link != nullptr) {\n            delete link;\n            link = nullptr;\n        }"));
        assert!(text.contains("    numa<Node, 1>* getLink() const { return link; }\n"));
        assert!(text.contains("void push(int d) { link = new numa<Node, 1>(d); }"));
        assert!(text.ends_with("};"));

        let output = &result.outputs[&FileId(0)];
        assert!(output.starts_with(NODE.trim_end()));
        assert!(output.contains("};\n\ntemplate<>\nclass numa<Node, 1>"));
    }

    #[test]
    fn signatures_and_bodies_use_pinned_types() {
        let source = r#"class Node {
    int data;
    Node* next;
public:
    Node(int d, Node* n = nullptr) : data(d), next(n) {}
    Node(const Node& other) : data(other.data), next(nullptr) {}
    Node* getNext() const { return next; }
    void setNext(Node* n) { next = n; }
    int sum() const { int s = 0; for (const Node* cur = this; cur != nullptr; cur = cur->next) { s += cur->data; } return s; }
    Node** slot(Node** p) { return p; }
};
"#;
        let files = [parsed(0, source)];
        let result = run(&files, &[("Node", 2)], SynthOptions::default(), &[]);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let text = &result.texts[0];
        assert!(text.contains("    numa(int d, numa<Node, 2>* n = nullptr) : data(d), next(n) {}\n"));
        assert!(text.contains("    numa(const numa<Node, 2>& other) : data(other.data), next(nullptr) {}\n"));
        assert!(text.contains("    numa<Node, 2>* getNext() const { return next; }\n"));
        assert!(text.contains("    void setNext(numa<Node, 2>* n) { next = n; }\n"));
        assert!(text.contains("for (const numa<Node, 2>* cur = this; cur != nullptr; cur = cur->next)"));
        // Only single-level pointers are pinned.
        assert!(text.contains("    Node** slot(Node** p) { return p; }\n"));
        assert!(!text.contains("Node* "));
    }

    #[test]
    fn pinned_element_types_are_retyped_but_others_are_not() {
        let source = r#"struct Leaf { int v; };
struct Other { int w; };
struct Tree {
    Leaf* left;
    Tree(Leaf* l, Other* o) : left(l) { (void)o; }
    Leaf* first() { Leaf* found = left; return found; }
};
"#;
        let files = [parsed(0, source)];
        let result = run(&files, &[("Tree", 1)], SynthOptions::default(), &[]);
        let tree = result.text_of("numa<Tree, 1>");
        assert!(tree.contains("    numa(numa<Leaf, 1>* l, Other* o) : left(l) { (void)o; }\n"));
        assert!(tree.contains("    numa<Leaf, 1>* first() { numa<Leaf, 1>* found = left; return found; }\n"));
    }

    #[test]
    fn repeated_requests_emit_once() {
        let files = [parsed(0, NODE)];
        let result = run(&files, &[("Node", 1), ("Node", 1)], SynthOptions::default(), &[]);
        assert_eq!(result.texts.len(), 1);
    }

    #[test]
    fn nodes_differ_only_in_literal() {
        let files = [parsed(0, NODE)];
        let result = run(&files, &[("Node", 0), ("Node", 1)], SynthOptions::default(), &[]);
        assert_eq!(result.texts.len(), 2);
        assert_eq!(
            result.texts[0].replace("Node, 0>", "Node, 1>").replace("(size, 0)", "(size, 1)"),
            result.texts[1]
        );
    }

    #[test]
    fn pointer_fields_pin_transitively() {
        let source = r#"struct Leaf { int v; };
struct Tree {
    Leaf* left;
    int* counts;
    Tree** children;
};
"#;
        let files = [parsed(0, source)];
        let result = run(&files, &[("Tree", 2)], SynthOptions::default(), &[]);
        assert_eq!(result.texts.len(), 2);
        let tree = result.text_of("numa<Tree, 2>");
        assert!(tree.starts_with("template<> class numa<Leaf, 2>;\n\ntemplate<>\nclass numa<Tree, 2> {"));
        assert!(tree.contains("    numa<Leaf, 2>* left = nullptr;"));
        assert!(tree.contains("    int* counts;"));
        assert!(tree.contains("    Tree** children;"));
        assert!(tree.contains("~numa() {"));
        assert!(tree.contains("numa() {}"));
        // Leaf's specialization goes after Leaf, Tree's after Tree.
        let output = &result.outputs[&FileId(0)];
        let leaf_at = output.find("class numa<Leaf, 2> {").unwrap();
        let tree_decl_at = output.find("struct Tree").unwrap();
        assert!(leaf_at < tree_decl_at);
    }

    #[test]
    fn pinned_fields_are_released_in_reverse_declaration_order() {
        let source = r#"struct Leaf { int v; };
struct Tree {
    Leaf* left;
    Leaf* right;
    ~Tree() { count = 0; }
    int count;
};
"#;
        let files = [parsed(0, source)];
        let result = run(&files, &[("Tree", 1)], SynthOptions::default(), &[]);
        let tree = result.text_of("numa<Tree, 1>");
        let right = tree.find("delete right;").unwrap();
        let left = tree.find("delete left;").unwrap();
        let body = tree.find("{ count = 0; }").unwrap();
        assert!(right < left);
        assert!(left < body);
    }

    #[test]
    fn dependency_declared_later_is_specialized_first() {
        let source = r#"struct Leaf;
struct Tree {
    Leaf* l;
    ~Tree() { }
};
struct Leaf {
    int v;
};
"#;
        let files = [parsed(0, source)];
        let result = run(&files, &[("Tree", 2)], SynthOptions::default(), &[]);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let output = &result.outputs[&FileId(0)];
        let leaf_at = output.find("class numa<Leaf, 2> {").unwrap();
        let tree_at = output.find("class numa<Tree, 2> {").unwrap();
        assert!(output.find("struct Leaf {").unwrap() < leaf_at);
        assert!(leaf_at < tree_at);
        assert!(result.text_of("numa<Tree, 2>").contains("template<> class numa<Leaf, 2>;"));
    }

    #[test]
    fn pointer_cycle_defines_destructor_after_both_specializations() {
        let source = r#"struct A;
struct B {
    A* a;
};
struct A {
    B* b;
};
"#;
        let files = [parsed(0, source)];
        let result = run(&files, &[("A", 1)], SynthOptions::default(), &[]);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        assert_eq!(result.texts.len(), 2);

        let b = result.text_of("numa<B, 1>");
        assert!(b.starts_with("template<> class numa<A, 1>;\n"));
        assert!(b.contains("    numa<A, 1>* a = nullptr;\n"));
        assert!(b.contains("    ~numa();\n"));
        assert!(!b.contains("delete a;"));
        let a = result.text_of("numa<A, 1>");
        assert!(a.contains("    ~numa() {\n        if (b != nullptr) {"));

        let output = &result.outputs[&FileId(0)];
        let a_at = output.find("class numa<A, 1> {").unwrap();
        let b_dtor_at = output
            .find("inline numa<B, 1>::~numa() {\n    if (a != nullptr) {\n        delete a;\n        a = nullptr;\n    }\n}")
            .unwrap();
        assert!(output.find("class numa<B, 1> {").unwrap() < a_at);
        assert!(a_at < b_dtor_at);
    }

    #[test]
    fn failed_key_rolls_back_the_specializations_it_pulled_in() {
        let source = r#"struct A;
struct B { A* a; int get() { return 1; } };
struct A { B* b; void missing(); };
"#;
        let files = [parsed(0, source)];
        let result = run(&files, &[("A", 1)], SynthOptions::default(), &[]);
        assert!(result.texts.is_empty());
        assert!(result.outputs.is_empty());
        assert_eq!(result.diagnostics.len(), 1);
        assert!(matches!(
            &result.diagnostics[0],
            SynthDiagnostic::Synth(Located {
                error: SynthError::MissingDefinition { member, .. },
                ..
            }) if member == "missing"
        ));
    }

    #[test]
    fn unpinnable_field_keeps_plain_type_with_warning() {
        let source = r#"struct A;
struct B { A* a; int get() { return 1; } };
struct A { B* b; void missing(); };
"#;
        let files = [parsed(0, source)];
        let result = run(&files, &[("B", 1)], SynthOptions::default(), &[]);
        assert_eq!(result.texts.len(), 1);
        let b = result.text_of("numa<B, 1>");
        assert!(b.contains("    A* a;\n"));
        assert!(!b.contains("~numa"));
        assert_eq!(result.diagnostics.len(), 1);
        let warning = &result.diagnostics[0];
        assert!(!warning.is_error());
        assert!(matches!(
            warning,
            SynthDiagnostic::Warning(Located {
                error: SynthWarning::FieldLeftUnpinned { field, element, node: 1, .. },
                ..
            }) if field == "a" && element == "A"
        ));
        assert!(warning.message().contains("B::a"));
    }

    #[test]
    fn ambiguous_constructors_abort_the_key() {
        let source = r#"struct Leaf { int v; };
struct Pair {
    Leaf* a;
    Pair(Leaf* x) : a(x) {}
    Pair(numa<Leaf, 1>* x) : a(x) {}
};
"#;
        let files = [parsed(0, source)];
        let result = run(&files, &[("Pair", 1)], SynthOptions::default(), &[]);
        assert!(result.texts.is_empty());
        assert!(result.outputs.is_empty());
        assert!(result.diagnostics.iter().any(|d| matches!(
            d,
            SynthDiagnostic::Synth(Located {
                error: SynthError::AmbiguousConstructor { .. },
                ..
            })
        )));
    }

    #[test]
    fn missing_definitions_abort_the_key() {
        let files = [parsed(0, "class A { public: void run(); virtual int size() = 0; };")];
        let result = run(&files, &[("A", 0)], SynthOptions::default(), &[]);
        assert!(result.texts.is_empty());
        assert!(result.outputs.is_empty());
        assert!(matches!(
            result.diagnostics[0],
            SynthDiagnostic::Synth(Located {
                error: SynthError::MissingDefinition { .. },
                ..
            })
        ));
    }

    #[test]
    fn inherit_mode_promotes_and_overrides() {
        let source = "class Shape { public: int area() { return 0; } ~Shape() {} };\n";
        let files = [parsed(0, source)];
        let result = run(&files, &[("Shape", 0)], inherit(), &["Shape"]);
        let text = &result.texts[0];
        assert!(text.contains("class numa<Shape, 0> : public Shape {"));
        assert!(text.contains("int area() override { return 0; }"));
        assert!(!text.contains("~numa"));
        let output = &result.outputs[&FileId(0)];
        assert!(output.starts_with(
            "class Shape { public: virtual int area() { return 0; } virtual ~Shape() {} friend class numa<Shape, 0>; };"
        ));
    }

    #[test]
    fn inherit_mode_reuses_base_state_and_constructors() {
        let files = [parsed(0, NODE)];
        let result = run(&files, &[("Node", 1)], inherit(), &[]);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let text = &result.texts[0];
        assert!(text.contains("class numa<Node, 1> : public Node {"));
        assert!(text.contains("    using Node::Node;\n"));
        assert!(!text.contains("int data;"));
        assert!(!text.contains("link = nullptr;"));
        assert!(!text.contains("numa(int d)"));
        assert!(!text.contains("~numa"));
        assert!(text.contains("    Node* getLink() const override { return link; }\n"));
        assert!(text.contains("    void push(int d) override { link = new numa<Node, 1>(d); }\n"));

        // Node is held through its own plain `Node*` field, so it is promoted.
        let output = &result.outputs[&FileId(0)];
        assert!(output.contains("    virtual ~Node() { }\n"));
        assert!(output.contains("    virtual Node* getLink() const"));
        assert!(output.contains("    friend class numa<Node, 1>;\n};\n"));
    }

    #[test]
    fn inherit_mode_declares_missing_virtual_destructor() {
        let source = "class Shape { public: int area() { return 0; } };\n";
        let files = [parsed(0, source)];
        let result = run(&files, &[("Shape", 0)], inherit(), &["Shape"]);
        let output = &result.outputs[&FileId(0)];
        assert!(output.starts_with(
            "class Shape { public: virtual int area() { return 0; } public: virtual ~Shape() = default; friend class numa<Shape, 0>; };"
        ));
    }

    #[test]
    fn inherit_mode_without_plain_handles_leaves_methods_alone() {
        let source = "class Shape {\npublic:\n    int area() { return 0; }\n};\n";
        let files = [parsed(0, source)];
        let result = run(&files, &[("Shape", 0)], inherit(), &[]);
        assert!(result.texts[0].contains("    int area() { return 0; }\n"));
        let output = &result.outputs[&FileId(0)];
        assert!(output.starts_with(
            "class Shape {\npublic:\n    int area() { return 0; }\n    friend class numa<Shape, 0>;\n};\n"
        ));
    }

    #[test]
    fn standalone_mode_keeps_bases_and_original_text() {
        let source = "struct Base { int b; };\nstruct D : public Base { int d; };\n";
        let files = [parsed(0, source)];
        let result = run(&files, &[("D", 3)], SynthOptions::default(), &["D"]);
        assert!(result.texts[0].contains("class numa<D, 3> : public Base {"));
        assert!(result.outputs[&FileId(0)].starts_with(source));
    }

    #[test]
    fn configured_names_are_used() {
        let files = [parsed(0, NODE)];
        let options = SynthOptions {
            wrapper: "pinned".to_string(),
            allocate_fn: "node_alloc".to_string(),
            deallocate_fn: "node_free".to_string(),
            mode: Mode::Standalone,
        };
        let result = run(&files, &[("Node", 1)], options, &[]);
        let text = &result.texts[0];
        assert!(text.contains("class pinned<Node, 1>"));
        assert!(text.contains("pinned<Node, 1>* link = nullptr;"));
        assert!(text.contains("    pinned(int d) : data(d), link(nullptr) {}"));
        assert!(text.contains("pinned<Node, 1>* getLink() const"));
        assert!(text.contains("~pinned()"));
        assert!(text.contains("node_alloc(size, 1)"));
        assert!(text.contains("node_free(ptr, size);"));
    }
}
