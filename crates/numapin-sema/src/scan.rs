// src/scan.rs
//
// Allocation-site scanner: finds pinning-aware handles initialized by a
// node-pinned `new`, and pinned `new`s that end up behind plain handles.

use numapin_frontend::{
    Body, Declarator, FunctionDecl, Item, Member, NewExpr, Span, Stmt, TemplateArg,
    TranslationUnit, TypeExpr, parse_int_literal,
};
use rustc_hash::FxHashSet;

use crate::index::{CanonicalType, DeclIndex, Scope};
use crate::registry::NodeId;

/// Names that identify pinning in source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinningConfig {
    /// The wrapper template: `numa` in `numa<T, N>`
    pub wrapper: String,
    /// Single-argument handle templates that accept a pinned object: `pinned_ptr<T>`
    pub handle_aliases: Vec<String>,
}

impl Default for PinningConfig {
    fn default() -> Self {
        Self {
            wrapper: "numa".to_string(),
            handle_aliases: Vec::new(),
        }
    }
}

/// `numa<Node*, 1> p = new numa<Node, 1>(5);`
#[derive(Debug, Clone)]
pub struct AllocationSite {
    pub variable: String,
    pub variable_span: Span,
    /// Element type as written in the `new`
    pub element: TypeExpr,
    pub canonical: CanonicalType,
    pub node: NodeId,
    /// Constructor arguments as source text
    pub args: Vec<String>,
    pub array_len: Option<String>,
    /// The whole declarator
    pub span: Span,
    pub scope: Scope,
}

/// A pinned `new` whose result is not held by a pinning-aware handle.
#[derive(Debug, Clone)]
pub struct BareAllocation {
    pub element: TypeExpr,
    pub canonical: CanonicalType,
    pub node: NodeId,
    pub span: Span,
    pub scope: Scope,
}

#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub sites: Vec<AllocationSite>,
    pub bare_allocations: Vec<BareAllocation>,
}

/// Scan one translation unit. Results are ordered by source position.
pub fn scan_unit(
    unit: &TranslationUnit,
    source: &str,
    config: &PinningConfig,
    index: &DeclIndex<'_>,
) -> ScanResult {
    let mut scanner = Scanner {
        config,
        index,
        source,
        result: ScanResult::default(),
        consumed: FxHashSet::default(),
    };
    scanner.items(&unit.items, &Scope::new());
    let mut result = scanner.result;
    result.sites.sort_by_key(|site| site.span.start);
    result.bare_allocations.sort_by_key(|bare| bare.span.start);
    tracing::debug!(
        sites = result.sites.len(),
        bare = result.bare_allocations.len(),
        "scanned translation unit"
    );
    result
}

/// Shape of a pinning-aware handle type
enum Handle {
    /// `numa<T*, N>` or `numa<T, N>*`
    Wrapper { element: TypeExpr, node: NodeId },
    /// `pinned_ptr<T>`: node comes from the allocation
    Alias { element: TypeExpr },
}

struct Scanner<'s, 'a> {
    config: &'s PinningConfig,
    index: &'s DeclIndex<'a>,
    source: &'s str,
    result: ScanResult,
    /// Start offsets of `new` expressions already claimed by a site
    consumed: FxHashSet<usize>,
}

impl Scanner<'_, '_> {
    fn items(&mut self, items: &[Item], scope: &Scope) {
        for item in items {
            match item {
                Item::Class(class) => {
                    for member in &class.members {
                        match member {
                            Member::Constructor(decl)
                            | Member::Destructor(decl)
                            | Member::Method(decl) => self.function(decl, scope),
                            _ => {}
                        }
                    }
                }
                Item::Function(def) => {
                    // Out-of-line members resolve names in their class's namespace.
                    let scope = def
                        .owner
                        .as_ref()
                        .and_then(|owner| self.index.resolve_class_name(owner, scope))
                        .map(|entry| entry.scope.clone())
                        .unwrap_or_else(|| scope.clone());
                    self.function(&def.decl, &scope);
                }
                Item::Variable(decl) => {
                    let stmt = Stmt::VarDecl(decl.clone());
                    self.statement(&stmt, scope);
                }
                Item::Namespace(ns) => {
                    let mut inner = scope.clone();
                    if let Some(name) = &ns.name {
                        inner.extend(name.split("::").map(str::to_string));
                    }
                    self.items(&ns.items, &inner);
                }
                Item::Alias(_) | Item::Other(_) => {}
            }
        }
    }

    fn function(&mut self, decl: &FunctionDecl, scope: &Scope) {
        for init in &decl.mem_inits {
            for arg in &init.args {
                let mut news = Vec::new();
                arg.for_each_new(&mut |new| news.push(new));
                for new in news {
                    self.bare_candidate(new, scope);
                }
            }
        }
        if let Some(body) = &decl.body {
            self.body(body, scope);
        }
    }

    fn body(&mut self, body: &Body, scope: &Scope) {
        for stmt in &body.stmts {
            self.statement(stmt, scope);
        }
    }

    fn statement(&mut self, stmt: &Stmt, scope: &Scope) {
        let mut all = Vec::new();
        stmt.walk(&mut |s| all.push(s));
        for s in all {
            if let Stmt::VarDecl(decl) = s {
                for declarator in &decl.declarators {
                    if let Some(site) = self.match_site(declarator, scope) {
                        tracing::trace!(variable = %site.variable, element = %site.canonical, node = %site.node, "allocation site");
                        self.result.sites.push(site);
                    }
                }
            }
            let mut news = Vec::new();
            s.for_each_new(&mut |new| news.push(new));
            for new in news {
                self.bare_candidate(new, scope);
            }
        }
    }

    fn bare_candidate(&mut self, new: &NewExpr, scope: &Scope) {
        if self.consumed.contains(&new.span.start) {
            return;
        }
        let Some((element, node)) = self.pinned_target(&new.ty) else {
            return;
        };
        let canonical = self.index.canonical(&element, scope);
        tracing::trace!(element = %canonical, %node, "pinned allocation behind a plain handle");
        self.result.bare_allocations.push(BareAllocation {
            element,
            canonical,
            node,
            span: new.span,
            scope: scope.clone(),
        });
    }

    fn match_site(&mut self, declarator: &Declarator, scope: &Scope) -> Option<AllocationSite> {
        let init = declarator.init.as_ref()?;
        let new = init.as_new()?;
        let (element, node) = self.pinned_target(&new.ty)?;
        let canonical = self.index.canonical(&element, scope);

        let handle = self.handle_shape(&declarator.ty, scope)?;
        let handle_element = match handle {
            Handle::Wrapper {
                element: handle_element,
                node: handle_node,
            } => {
                if handle_node != node {
                    tracing::trace!(variable = %declarator.name, "handle and allocation nodes differ");
                    return None;
                }
                handle_element
            }
            Handle::Alias {
                element: handle_element,
            } => handle_element,
        };
        if self.index.canonical(&handle_element, scope) != canonical {
            tracing::trace!(variable = %declarator.name, "handle and allocation element types differ");
            return None;
        }

        self.consumed.insert(new.span.start);
        let args = new
            .init
            .as_ref()
            .map(|init| {
                init.exprs
                    .iter()
                    .map(|expr| expr.span.text(self.source).trim().to_string())
                    .collect()
            })
            .unwrap_or_default();
        let array_len = new
            .array_len
            .as_ref()
            .map(|len| len.span.text(self.source).trim().to_string());

        Some(AllocationSite {
            variable: declarator.name.clone(),
            variable_span: declarator.name_span,
            element,
            canonical,
            node,
            args,
            array_len,
            span: declarator.span,
            scope: scope.clone(),
        })
    }

    /// `numa<T, N>` with a literal node: the type a pinned `new` allocates.
    fn pinned_target(&self, ty: &TypeExpr) -> Option<(TypeExpr, NodeId)> {
        if ty.is_pointer() || ty.reference.is_some() {
            return None;
        }
        match ty.name.template_args_of(&self.config.wrapper)? {
            [TemplateArg::Type(element), TemplateArg::Value(node)] if !element.is_pointer() => {
                Some((element.clone(), literal_node(node)?))
            }
            _ => None,
        }
    }

    fn handle_shape(&self, ty: &TypeExpr, scope: &Scope) -> Option<Handle> {
        let expanded = self.index.expand(ty, scope).ty;
        if expanded.reference.is_some() {
            return None;
        }
        if let Some(args) = expanded.name.template_args_of(&self.config.wrapper) {
            let [TemplateArg::Type(element), TemplateArg::Value(node)] = args else {
                return None;
            };
            let node = literal_node(node)?;
            return match (expanded.pointers.len(), element.pointers.len()) {
                (0, 1) if element.reference.is_none() => Some(Handle::Wrapper {
                    element: element.pointee(),
                    node,
                }),
                (1, 0) => Some(Handle::Wrapper {
                    element: element.clone(),
                    node,
                }),
                _ => None,
            };
        }
        if expanded.is_pointer() {
            return None;
        }
        self.config.handle_aliases.iter().find_map(|alias| {
            match expanded.name.template_args_of(alias)? {
                [TemplateArg::Type(element)] if !element.is_pointer() => Some(Handle::Alias {
                    element: element.clone(),
                }),
                _ => None,
            }
        })
    }
}

fn literal_node(text: &str) -> Option<NodeId> {
    let value = parse_int_literal(text)?;
    u32::try_from(value).ok().map(NodeId)
}
