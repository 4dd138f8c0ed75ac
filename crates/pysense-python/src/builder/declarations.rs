//! The declaration resolver: one pass of building a file into the model.
//!
//! Each identifier-defining occurrence either reuses ("reopens") an existing
//! declaration or creates a fresh one. Reopening is what keeps declaration
//! identity stable across rebuilds: a candidate must fit the required shape,
//! must not have been encountered earlier in the same pass, and must belong
//! to the file being built — declarations from other files are never
//! touched by this file's reopen search.
//!
//! Per-pass bookkeeping (the encountered set, the removal schedule) lives
//! here, not in the shared model, so concurrent readers never observe
//! transient pass state.

use crate::ast::{
    ClassDef, Comprehension, Expr, ExprContext, ExprKind, FunctionDef, Ident, ImportAlias, Number,
    Parameters, Slice, Stmt, StmtKind,
};
use crate::builder::context::{comprehension_span, ScopeTracker};
use crate::builder::BuildPhase;
use crate::imports::{resolve_module, ResolvedImport};
use crate::inference::{ExpressionVisitor, Inferred};
use crate::model::{
    DeclKind, Declaration, DeclarationId, Decorator, ScopeId, ScopeKind, SharedModel, SymbolModel,
};
use crate::scheduler::{BuildPriority, BuildScheduler, SearchPaths};
use crate::types::{ContainerKind, Type};
use pysense_core::diag::Diagnostic;
use pysense_core::source::{FileId, Revision, Span};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

// ============================================================================
// Declaration Fits
// ============================================================================

/// The shape an existing declaration must have to be reopened for a given
/// defining occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fit {
    /// Must be a function declaration.
    Function,
    /// Must be an alias declaration.
    Alias,
    /// Must be neither a function nor an alias.
    Instance,
    /// No constraint.
    Any,
}

fn matches_fit(d: &Declaration, fit: Fit) -> bool {
    match fit {
        Fit::Any => true,
        Fit::Function => d.kind == DeclKind::Function,
        Fit::Alias => d.kind == DeclKind::Alias,
        Fit::Instance => !matches!(d.kind, DeclKind::Function | DeclKind::Alias),
    }
}

/// The type a rebound name ends up with: a first binding overwrites the
/// placeholder outright, rebinding with the same type is a no-op, rebinding
/// with a different type widens into a union.
fn apply_assignment_type(current: Type, observed: Option<Type>) -> Type {
    match observed {
        None => current,
        Some(observed) => {
            if current.is_mixed() {
                observed
            } else if current == observed {
                current
            } else {
                Type::merge(current, observed)
            }
        }
    }
}

/// Content type a `for` loop hands to its target when iterating a value of
/// the given type.
fn iterated_content(ty: &Type) -> Type {
    match ty {
        Type::VariableLength { content, .. } => (**content).clone(),
        Type::Unsure(members) => {
            let mut merged: Option<Type> = None;
            for member in members {
                if let Type::VariableLength { content, .. } = member {
                    let c = (**content).clone();
                    merged = Some(match merged {
                        None => c,
                        Some(acc) => Type::merge(acc, c),
                    });
                }
            }
            merged.unwrap_or_else(Type::mixed)
        }
        _ => Type::mixed(),
    }
}

/// The leading string-literal statement of a class or function body.
fn extract_docstring(body: &[Stmt]) -> Option<String> {
    match body.first().map(|s| &s.kind) {
        Some(StmtKind::Expr { value }) => match &value.kind {
            ExprKind::Str(text) => Some(text.trim().to_string()),
            _ => None,
        },
        _ => None,
    }
}

/// Decorator names plus their first literal argument, which is all the
/// inference rules consume.
fn extract_decorators(decorators: &[Expr]) -> Vec<Decorator> {
    let mut result = Vec::new();
    for d in decorators {
        match &d.kind {
            ExprKind::Name { id, .. } => result.push(Decorator::new(id.clone())),
            ExprKind::Call { func, args } => {
                let ExprKind::Name { id, .. } = &func.kind else {
                    continue;
                };
                let argument = args.first().and_then(|a| match &a.kind {
                    ExprKind::Num(Number::Int(n)) => Some(n.to_string()),
                    ExprKind::Str(s) => Some(s.clone()),
                    _ => None,
                });
                result.push(match argument {
                    Some(arg) => Decorator::with_argument(id.clone(), arg),
                    None => Decorator::new(id.clone()),
                });
            }
            _ => {}
        }
    }
    result
}

// ============================================================================
// Builder
// ============================================================================

struct FunctionFrame {
    returns: Type,
    saw_return: bool,
}

/// One pass (prebuild or build) of the declaration resolver over one file.
pub(crate) struct DeclarationBuilder<'a> {
    model: &'a SharedModel,
    scheduler: &'a dyn BuildScheduler,
    paths: &'a dyn SearchPaths,
    phase: BuildPhase,
    file: FileId,
    path: PathBuf,
    revision: Revision,
    source_len: usize,
    scopes: ScopeTracker,
    encountered: HashSet<DeclarationId>,
    scheduled_removal: HashSet<DeclarationId>,
    class_stack: Vec<DeclarationId>,
    function_stack: Vec<FunctionFrame>,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) unresolved_imports: Vec<PathBuf>,
}

impl<'a> DeclarationBuilder<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        model: &'a SharedModel,
        scheduler: &'a dyn BuildScheduler,
        paths: &'a dyn SearchPaths,
        phase: BuildPhase,
        file: FileId,
        path: &Path,
        revision: Revision,
        source_len: usize,
    ) -> Self {
        DeclarationBuilder {
            model,
            scheduler,
            paths,
            phase,
            file,
            path: path.to_path_buf(),
            revision,
            source_len,
            scopes: ScopeTracker::new(file),
            encountered: HashSet::new(),
            scheduled_removal: HashSet::new(),
            class_stack: Vec::new(),
            function_stack: Vec::new(),
            diagnostics: Vec::new(),
            unresolved_imports: Vec::new(),
        }
    }

    /// Declarations this pass created or reopened, minus those still
    /// scheduled for removal when the pass ended.
    pub(crate) fn into_encountered(self) -> (HashSet<DeclarationId>, Vec<Diagnostic>, Vec<PathBuf>) {
        let kept = self
            .encountered
            .difference(&self.scheduled_removal)
            .copied()
            .collect();
        (kept, self.diagnostics, self.unresolved_imports)
    }

    /// Run the pass. Model mutations are funneled through the shared lock a
    /// top-level statement at a time, so concurrent builds of other files
    /// interleave at fine grain.
    pub(crate) fn run(&mut self, module: &crate::ast::Module) {
        debug!(file = %self.file, phase = ?self.phase, "building declarations");
        self.scopes.begin_pass();
        {
            let mut m = self.model.write();
            let span = Span::new(0, self.source_len.max(1));
            let module_scope = self.scopes.open_module_scope(&mut m, span);
            m.file_mut(self.file).module_scope = Some(module_scope);
            // every file implicitly imports the builtin stub, except the
            // stub itself
            if !m.is_stub_file(self.file) {
                match m.stub_file().and_then(|s| m.module_scope(s)) {
                    Some(stub_scope) => m.add_scope_import(module_scope, stub_scope),
                    None => {
                        let stub = crate::stubs::stub_path().to_path_buf();
                        if !self.unresolved_imports.contains(&stub) {
                            self.unresolved_imports.push(stub.clone());
                            self.scheduler.enqueue(&stub, BuildPriority::Dependency);
                        }
                    }
                }
            }
        }
        for stmt in &module.body {
            let mut m = self.model.write();
            self.visit_stmt(&mut m, stmt);
        }
        self.scopes.close_scope();
    }

    fn infer(&self, m: &SymbolModel, expr: &Expr) -> Inferred {
        let mut v = ExpressionVisitor::new(m, self.scopes.current());
        v.infer(expr)
    }

    // ------------------------------------------------------------------
    // Reopening
    // ------------------------------------------------------------------

    fn candidates_in(&self, m: &SymbolModel, scope: ScopeId, name: &str) -> Vec<DeclarationId> {
        m.find_in_scope(scope, name, None)
            .into_iter()
            .filter(|id| m.declaration(*id).file == self.file)
            .collect()
    }

    /// Try to reuse a fitting declaration not yet encountered this pass.
    /// Returns the reopened declaration (if any) and the fitting candidates
    /// that were skipped because they were already encountered.
    fn try_reopen(
        &mut self,
        m: &mut SymbolModel,
        candidates: &[DeclarationId],
        fit: Fit,
        span: Span,
    ) -> (Option<DeclarationId>, Vec<DeclarationId>) {
        let mut reopened = None;
        let mut remaining = Vec::new();
        for id in candidates {
            let d = m.declaration(*id);
            if !matches_fit(d, fit) {
                trace!(declaration = %id, "skipping candidate of the wrong shape");
                continue;
            }
            let really_encountered =
                self.encountered.contains(id) && !self.scheduled_removal.contains(id);
            if !really_encountered && reopened.is_none() {
                trace!(declaration = %id, "reopening existing declaration");
                let d = m.declaration_mut(*id);
                d.span = span;
                d.revision = self.revision;
                self.encountered.insert(*id);
                self.scheduled_removal.remove(id);
                reopened = Some(*id);
            } else if really_encountered {
                remaining.push(*id);
            }
        }
        (reopened, remaining)
    }

    /// Reopen or create a class/function declaration in the current scope.
    fn reopen_or_create(
        &mut self,
        m: &mut SymbolModel,
        name: &Ident,
        fit: Fit,
        kind: DeclKind,
    ) -> DeclarationId {
        let scope = self.scopes.current();
        let candidates = self.candidates_in(m, scope, &name.name);
        let (reopened, _) = self.try_reopen(m, &candidates, fit, name.span);
        match reopened {
            Some(id) => {
                m.declaration_mut(id).kind = kind;
                id
            }
            None => {
                let id = m.new_declaration(
                    &name.name,
                    kind,
                    Type::mixed(),
                    self.file,
                    name.span,
                    self.revision,
                    scope,
                );
                self.encountered.insert(id);
                id
            }
        }
    }

    /// The reopen-or-create-or-merge algorithm for variable-like defining
    /// occurrences, in an explicit target scope.
    fn declare_in(
        &mut self,
        m: &mut SymbolModel,
        scope: ScopeId,
        name: &str,
        span: Span,
        ty: Option<Type>,
        fit: Fit,
    ) -> DeclarationId {
        let candidates = self.candidates_in(m, scope, name);
        let (reopened, remaining) = self.try_reopen(m, &candidates, fit, span);

        if let Some(existing) = remaining.last().copied() {
            // the same name was already bound earlier in this pass: apply
            // the rebinding rule instead of creating a duplicate
            let current = m.declaration(existing).ty.clone();
            m.declaration_mut(existing).ty = apply_assignment_type(current, ty);
            return existing;
        }

        if m.scope(scope).kind == ScopeKind::Class {
            // bindings directly inside a class body are members of the class
            let id = reopened.unwrap_or_else(|| {
                m.new_declaration(
                    name,
                    DeclKind::ClassMember,
                    Type::mixed(),
                    self.file,
                    span,
                    self.revision,
                    scope,
                )
            });
            self.encountered.insert(id);
            let d = m.declaration_mut(id);
            d.kind = DeclKind::ClassMember;
            if let Some(ty) = ty {
                d.ty = ty;
            }
            return id;
        }

        let kind = match fit {
            Fit::Function => DeclKind::Function,
            Fit::Alias => DeclKind::Alias,
            _ => DeclKind::Instance,
        };
        let id = reopened.unwrap_or_else(|| {
            m.new_declaration(name, kind, Type::mixed(), self.file, span, self.revision, scope)
        });
        self.encountered.insert(id);
        let current = m.declaration(id).ty.clone();
        m.declaration_mut(id).ty = apply_assignment_type(current, ty);
        id
    }

    fn declare(
        &mut self,
        m: &mut SymbolModel,
        name: &str,
        span: Span,
        ty: Option<Type>,
        fit: Fit,
    ) -> DeclarationId {
        self.declare_in(m, self.scopes.current(), name, span, ty, fit)
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn visit_body(&mut self, m: &mut SymbolModel, body: &[Stmt]) {
        for stmt in body {
            self.visit_stmt(m, stmt);
        }
    }

    fn visit_stmt(&mut self, m: &mut SymbolModel, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::ClassDef(node) => self.visit_class(m, stmt, node),
            StmtKind::FunctionDef(node) => self.visit_function(m, stmt, node),
            StmtKind::Assign { targets, value } => self.visit_assign(m, targets, value),
            StmtKind::Return { value } => self.visit_return(m, stmt, value.as_ref()),
            StmtKind::Import { names } => self.visit_import(m, names),
            StmtKind::ImportFrom { module, names } => self.visit_import_from(m, module, names),
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            } => {
                self.visit_expr(m, iter);
                let iterated = self.infer(m, iter);
                self.declare_for_targets(m, target, &iterated.ty);
                self.visit_body(m, body);
                self.visit_body(m, orelse);
            }
            StmtKind::While { test, body, orelse } => {
                self.visit_expr(m, test);
                self.visit_body(m, body);
                self.visit_body(m, orelse);
            }
            StmtKind::If { test, body, orelse } => {
                self.visit_expr(m, test);
                self.visit_body(m, body);
                self.visit_body(m, orelse);
            }
            StmtKind::With {
                context,
                target,
                body,
            } => {
                self.visit_expr(m, context);
                if let Some(target) = target {
                    if let ExprKind::Name { id, .. } = &target.kind {
                        let ty = self.infer(m, context).ty;
                        self.declare(m, id, target.span, Some(ty), Fit::Instance);
                    }
                }
                self.visit_body(m, body);
            }
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                self.visit_body(m, body);
                for handler in handlers {
                    if let Some(ty_expr) = &handler.ty {
                        self.visit_expr(m, ty_expr);
                        if let Some(name) = &handler.name {
                            let ty = self.infer(m, ty_expr).ty;
                            self.declare(m, &name.name, name.span, Some(ty), Fit::Instance);
                        }
                    }
                    self.visit_body(m, &handler.body);
                }
                self.visit_body(m, orelse);
                self.visit_body(m, finalbody);
            }
            StmtKind::Raise { exc } => {
                if let Some(exc) = exc {
                    self.visit_expr(m, exc);
                }
            }
            StmtKind::Expr { value } => self.visit_expr(m, value),
            StmtKind::Pass => {}
        }
    }

    // ------------------------------------------------------------------
    // Classes
    // ------------------------------------------------------------------

    fn visit_class(&mut self, m: &mut SymbolModel, stmt: &Stmt, node: &ClassDef) {
        let decorators = extract_decorators(&node.decorators);
        let class_id = self.reopen_or_create(m, &node.name, Fit::Any, DeclKind::Class);
        m.declaration_mut(class_id).decorators = decorators;
        m.declaration_mut(class_id).docstring = extract_docstring(&node.body);

        // base expressions are evaluated in the enclosing scope
        let mut base_scopes = Vec::new();
        for base in &node.bases {
            self.visit_expr(m, base);
            for alt in self.infer(m, base).ty.alternatives() {
                if let Type::Structure { scope, .. } = alt {
                    base_scopes.push(*scope);
                }
            }
        }

        let scope = self
            .scopes
            .open_scope(m, ScopeKind::Class, stmt.span, Some(&node.name.name));
        m.declaration_mut(class_id).ty = Type::Structure {
            declaration: class_id,
            scope,
        };
        for base in &base_scopes {
            m.add_scope_import(scope, *base);
        }
        // everything without explicit bases inherits the builtin object
        if base_scopes.is_empty() {
            if let Some(object_scope) = m.stub_class_scope("object") {
                if object_scope != scope {
                    m.add_scope_import(scope, object_scope);
                }
            }
        }

        self.class_stack.push(class_id);
        self.visit_body(m, &node.body);
        self.class_stack.pop();
        self.scopes.close_scope();
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    fn visit_function(&mut self, m: &mut SymbolModel, stmt: &Stmt, node: &FunctionDef) {
        let in_class = self.scopes.current_kind(m) == ScopeKind::Class;
        let owner = self.class_stack.last().copied();

        let decorators = extract_decorators(&node.decorators);
        let is_static = decorators.iter().any(|d| d.name == "staticmethod");
        let func_id = self.reopen_or_create(m, &node.name, Fit::Function, DeclKind::Function);
        {
            let d = m.declaration_mut(func_id);
            d.decorators = decorators;
            d.is_static = is_static;
            d.docstring = extract_docstring(&node.body);
            d.default_parameters = node.parameters.defaults.len() as u32;
        }

        // the parameter scope opens before the body scope so parameter
        // declarations are visible while default values are built
        let param_span = parameters_span(&node.parameters, stmt.span);
        let param_scope = self
            .scopes
            .open_scope(m, ScopeKind::Other, param_span, None);
        let mut signature = Vec::new();
        let mut param_decls = Vec::new();
        let args = &node.parameters.args;
        let first_default = args.len().saturating_sub(node.parameters.defaults.len());
        for (i, arg) in args.iter().enumerate() {
            let default_ty = match node.parameters.defaults.get(i.wrapping_sub(first_default)) {
                Some(default) if i >= first_default => {
                    self.visit_expr(m, default);
                    Some(self.infer(m, default).ty)
                }
                _ => None,
            };
            let declared =
                self.declare(m, &arg.name, arg.span, default_ty.clone(), Fit::Instance);
            signature.push(m.declaration(declared).ty.clone());
            param_decls.push(declared);
        }
        if let Some(vararg) = &node.parameters.vararg {
            let ty = Type::container(ContainerKind::List);
            self.declare(m, &vararg.name, vararg.span, Some(ty.clone()), Fit::Instance);
            signature.push(ty);
        }
        if let Some(kwarg) = &node.parameters.kwarg {
            let ty = Type::container(ContainerKind::Dict);
            self.declare(m, &kwarg.name, kwarg.span, Some(ty.clone()), Fit::Instance);
            signature.push(ty);
        }
        self.scopes.close_scope();

        // the first parameter of a non-static method denotes an instance of
        // the owning class
        if in_class && !is_static {
            match param_decls.first() {
                Some(first) => {
                    if let Some(owner) = owner {
                        let owner_ty = m.declaration(owner).ty.clone();
                        if matches!(owner_ty, Type::Structure { .. }) {
                            m.declaration_mut(*first).ty = owner_ty;
                        }
                    }
                    if !signature.is_empty() {
                        signature.remove(0);
                    }
                    if m.declaration(*first).name != "self" {
                        self.diagnostics.push(Diagnostic::warning(
                            self.file,
                            stmt.span,
                            "first parameter of a method is not called self",
                        ));
                    }
                }
                None => {
                    self.diagnostics.push(Diagnostic::warning(
                        self.file,
                        stmt.span,
                        "non-static method has no parameters, expected at least self",
                    ));
                }
            }
        }

        let body_span = Span::new(param_span.end.min(stmt.span.end), stmt.span.end);
        let body_scope =
            self.scopes
                .open_scope(m, ScopeKind::Function, body_span, Some(&node.name.name));
        m.add_scope_import(body_scope, param_scope);
        self.function_stack.push(FunctionFrame {
            returns: Type::mixed(),
            saw_return: false,
        });
        self.visit_body(m, &node.body);
        let frame = self.function_stack.pop().expect("frame pushed above");
        self.scopes.close_scope();

        let returns = if frame.saw_return {
            frame.returns
        } else {
            Type::void()
        };
        let d = m.declaration_mut(func_id);
        d.ty = Type::Function {
            parameters: signature,
            returns: Box::new(returns),
        };
        d.parameter_scope = Some(param_scope);
    }

    fn visit_return(&mut self, m: &mut SymbolModel, stmt: &Stmt, value: Option<&Expr>) {
        if self.function_stack.is_empty() {
            if value.is_some() {
                self.diagnostics.push(Diagnostic::error(
                    self.file,
                    stmt.span,
                    "return statement not within a function",
                ));
            }
            return;
        }
        if let Some(value) = value {
            self.visit_expr(m, value);
            let observed = self.infer(m, value).ty;
            let frame = self.function_stack.last_mut().expect("checked non-empty");
            let current = std::mem::replace(&mut frame.returns, Type::mixed());
            frame.returns = Type::merge(current, observed);
            frame.saw_return = true;
        }
    }

    fn handle_yield(&mut self, m: &mut SymbolModel, value: Option<&Expr>) {
        let observed = value
            .map(|v| self.infer(m, v).ty)
            .unwrap_or_else(Type::mixed);
        let Some(frame) = self.function_stack.last_mut() else {
            return;
        };
        // a generator's observed return value is a list of the yielded types
        if matches!(frame.returns, Type::VariableLength { .. }) {
            let current = std::mem::replace(&mut frame.returns, Type::mixed());
            frame.returns = current.with_content(observed);
        } else {
            let as_list = Type::container(ContainerKind::List).with_content(observed);
            let current = std::mem::replace(&mut frame.returns, Type::mixed());
            frame.returns = if current.is_mixed() {
                as_list
            } else {
                Type::merge(current, as_list)
            };
        }
        frame.saw_return = true;
    }

    // ------------------------------------------------------------------
    // Assignments
    // ------------------------------------------------------------------

    fn visit_assign(&mut self, m: &mut SymbolModel, targets: &[Expr], value: &Expr) {
        self.visit_expr(m, value);
        for target in targets {
            self.visit_expr(m, target);
        }

        let mut real_targets: Vec<&Expr> = Vec::new();
        for target in targets {
            match &target.kind {
                ExprKind::Tuple { elements, .. } => real_targets.extend(elements.iter()),
                _ => real_targets.push(target),
            }
        }

        let element_results: Vec<Inferred> = match &value.kind {
            ExprKind::Tuple { elements, .. } => {
                elements.iter().map(|e| self.infer(m, e)).collect()
            }
            _ => vec![self.infer(m, value)],
        };

        if matches!(value.kind, ExprKind::Call { .. }) && !targets.is_empty() {
            if let Some(first) = element_results.first() {
                if first.ty.is_void() {
                    self.diagnostics.push(Diagnostic::hint(
                        self.file,
                        targets[0].span,
                        "assignment to a call returning nothing",
                    ));
                }
            }
        }

        let can_unpack = real_targets.len() == element_results.len();
        let whole = (!can_unpack && real_targets.len() == 1).then(|| self.infer(m, value));

        for (i, target) in real_targets.iter().enumerate() {
            let inferred = if can_unpack {
                element_results[i].clone()
            } else if let Some(whole) = &whole {
                whole.clone()
            } else {
                // unpacking arity mismatch: every target degrades to unknown
                Inferred::unknown()
            };
            self.assign_target(m, target, inferred);
        }
    }

    fn assign_target(&mut self, m: &mut SymbolModel, target: &Expr, inferred: Inferred) {
        match &target.kind {
            ExprKind::Name { id, ctx } => {
                if *ctx == ExprContext::Load {
                    return;
                }
                if inferred.is_alias {
                    if let Some(aliased) = inferred.declaration() {
                        let aliased = m.resolve_alias(aliased);
                        let decl =
                            self.declare(m, id, target.span, None, Fit::Alias);
                        m.declaration_mut(decl).alias_of = Some(aliased);
                        return;
                    }
                }
                let fit = if matches!(inferred.ty, Type::Function { .. }) {
                    Fit::Function
                } else {
                    Fit::Instance
                };
                self.declare(m, id, target.span, Some(inferred.ty), fit);
            }
            // a[k] = v feeds v into the container's content type and k into
            // its key type
            ExprKind::Subscript { value: base, slice } => {
                let base_inf = self.infer(m, base);
                if !matches!(base_inf.ty, Type::VariableLength { .. }) {
                    return;
                }
                let mut widened = base_inf.ty.clone().with_content(inferred.ty);
                if widened.key_type().is_some() {
                    if let Slice::Index(key) = slice {
                        let key_ty = self.infer(m, key).ty;
                        widened = widened.with_key(key_ty);
                    }
                }
                if let Some(decl) = base_inf.declaration() {
                    m.declaration_mut(decl).ty = widened;
                }
            }
            // x.y = v declares/updates a member in the owning class scope
            ExprKind::Attribute { value: base, attr, .. } => {
                let Some(parent) = self.infer(m, base).declaration() else {
                    trace!("no declaration for attribute base, not creating a member");
                    return;
                };
                let parent = m.resolve_alias(parent);
                let class_scope = m
                    .declaration(parent)
                    .ty
                    .alternatives()
                    .iter()
                    .find_map(|alt| match alt {
                        Type::Structure { scope, .. } => Some(*scope),
                        _ => None,
                    });
                let Some(class_scope) = class_scope else {
                    return;
                };
                // never grow members onto builtin stub classes
                if m.is_stub_file(m.scope(class_scope).file) && !m.is_stub_file(self.file) {
                    return;
                }
                self.declare_in(
                    m,
                    class_scope,
                    &attr.name,
                    target.span,
                    Some(inferred.ty),
                    Fit::Instance,
                );
            }
            _ => {}
        }
    }

    fn declare_for_targets(&mut self, m: &mut SymbolModel, target: &Expr, iterated: &Type) {
        match &target.kind {
            ExprKind::Name { id, .. } => {
                let content = iterated_content(iterated);
                self.declare(m, id, target.span, Some(content), Fit::Instance);
            }
            ExprKind::Tuple { elements, .. } => {
                for (i, element) in elements.iter().enumerate() {
                    let ExprKind::Name { id, .. } = &element.kind else {
                        continue;
                    };
                    let ty = if i == 0 && iterated.key_type().is_some() {
                        iterated.key_type().cloned().unwrap_or_else(Type::mixed)
                    } else if i == 1 && iterated.content_type().is_some() {
                        iterated.content_type().cloned().unwrap_or_else(Type::mixed)
                    } else {
                        Type::mixed()
                    };
                    self.declare(m, id, element.span, Some(ty), Fit::Instance);
                }
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Expressions With Side Effects
    // ------------------------------------------------------------------

    /// Walk an expression for its structural side effects: comprehension and
    /// lambda scopes, call-site feedback, yields. Pure reads happen in the
    /// inferencer; this walker is what keeps it read-only.
    fn visit_expr(&mut self, m: &mut SymbolModel, expr: &Expr) {
        match &expr.kind {
            ExprKind::Name { .. } | ExprKind::Num(_) | ExprKind::Str(_) => {}
            ExprKind::Attribute { value, .. } => self.visit_expr(m, value),
            ExprKind::Call { func, args } => {
                self.visit_expr(m, func);
                for arg in args {
                    self.visit_expr(m, arg);
                }
                self.handle_call(m, func, args);
            }
            ExprKind::Subscript { value, slice } => {
                self.visit_expr(m, value);
                if let Slice::Index(index) = slice {
                    self.visit_expr(m, index);
                }
            }
            ExprKind::Tuple { elements, .. }
            | ExprKind::List { elements }
            | ExprKind::Set { elements } => {
                for e in elements {
                    self.visit_expr(m, e);
                }
            }
            ExprKind::Dict { keys, values } => {
                for e in keys.iter().chain(values) {
                    self.visit_expr(m, e);
                }
            }
            ExprKind::ListComp {
                element,
                generators,
            }
            | ExprKind::SetComp {
                element,
                generators,
            }
            | ExprKind::GeneratorExp {
                element,
                generators,
            } => self.visit_comprehension(m, element, None, generators),
            ExprKind::DictComp {
                key,
                value,
                generators,
            } => self.visit_comprehension(m, value, Some(key), generators),
            ExprKind::Lambda { parameters, body } => {
                self.scopes
                    .open_scope(m, ScopeKind::Other, expr.span, None);
                for arg in &parameters.args {
                    self.declare(m, &arg.name, arg.span, None, Fit::Instance);
                }
                self.visit_expr(m, body);
                self.scopes.close_scope();
            }
            ExprKind::BinOp { left, right } => {
                self.visit_expr(m, left);
                self.visit_expr(m, right);
            }
            ExprKind::BoolOp { values } => {
                for v in values {
                    self.visit_expr(m, v);
                }
            }
            ExprKind::UnaryOp { operand } => self.visit_expr(m, operand),
            ExprKind::Compare { left, comparators } => {
                self.visit_expr(m, left);
                for c in comparators {
                    self.visit_expr(m, c);
                }
            }
            ExprKind::IfExp { test, body, orelse } => {
                self.visit_expr(m, test);
                self.visit_expr(m, body);
                self.visit_expr(m, orelse);
            }
            ExprKind::Yield { value } => {
                if let Some(value) = value {
                    self.visit_expr(m, value);
                }
                self.handle_yield(m, value.as_deref());
            }
        }
    }

    /// The comprehension body gets its own scope layered between the
    /// containing scope and its parent; targets take the iterated content
    /// type.
    fn visit_comprehension(
        &mut self,
        m: &mut SymbolModel,
        element: &Expr,
        key: Option<&Expr>,
        generators: &[Comprehension],
    ) {
        let iterated: Vec<Type> = generators
            .iter()
            .map(|g| {
                self.visit_expr(m, &g.iter);
                self.infer(m, &g.iter).ty
            })
            .collect();

        let anchor = key.map(|k| k.span).unwrap_or(element.span);
        let span = comprehension_span(anchor, generators);
        self.scopes
            .open_scope(m, ScopeKind::Comprehension, span, None);
        for (g, ty) in generators.iter().zip(iterated.iter()) {
            match &g.target.kind {
                ExprKind::Name { id, .. } => {
                    let content = iterated_content(ty);
                    self.declare(m, id, g.target.span, Some(content), Fit::Instance);
                }
                ExprKind::Tuple { elements, .. } => {
                    for element in elements {
                        if let ExprKind::Name { id, .. } = &element.kind {
                            self.declare(m, id, element.span, None, Fit::Instance);
                        }
                    }
                }
                _ => {}
            }
            for cond in &g.ifs {
                self.visit_expr(m, cond);
            }
        }
        self.visit_expr(m, element);
        if let Some(key) = key {
            self.visit_expr(m, key);
        }
        self.scopes.close_scope();
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    fn handle_call(&mut self, m: &mut SymbolModel, func: &Expr, args: &[Expr]) {
        self.apply_container_feedback(m, func, args);
        // argument types flow back into the callee only while building for
        // real; a prebuild pass and completion-time inference leave the
        // callee untouched
        if self.phase == BuildPhase::Build {
            self.propagate_call_arguments(m, func, args);
        }
    }

    /// `addsTypeOfArg` / `addsTypeOfArgContent`: stub container methods feed
    /// an argument's type (or its content type) into the container they were
    /// called on.
    fn apply_container_feedback(&mut self, m: &mut SymbolModel, func: &Expr, args: &[Expr]) {
        let ExprKind::Attribute { value: base_expr, .. } = &func.kind else {
            return;
        };
        let Some(callee) = self.infer(m, func).declaration() else {
            return;
        };
        let callee = m.resolve_alias(callee);
        let method = m.declaration(callee);
        if method.kind != DeclKind::Function || !m.is_stub_file(method.file) {
            return;
        }
        let decorators = method.decorators.clone();
        let base = self.infer(m, base_expr);
        let Some(base_decl) = base.declaration() else {
            return;
        };
        if !matches!(base.ty, Type::VariableLength { .. }) {
            return;
        }
        if m.is_stub_file(m.declaration(base_decl).file) {
            return;
        }

        for decorator in &decorators {
            let index = decorator.argument_index().unwrap_or(0);
            let Some(arg) = args.get(index) else {
                continue;
            };
            match decorator.name.as_str() {
                "addsTypeOfArg" => {
                    let observed = self.infer(m, arg).ty;
                    if observed.is_useful() {
                        let widened = m.declaration(base_decl).ty.clone().with_content(observed);
                        m.declaration_mut(base_decl).ty = widened;
                    }
                }
                "addsTypeOfArgContent" => {
                    let source = self.infer(m, arg).ty;
                    for alt in source.alternatives() {
                        if let Some(content) = alt.content_type() {
                            let widened = m
                                .declaration(base_decl)
                                .ty
                                .clone()
                                .with_content(content.clone());
                            m.declaration_mut(base_decl).ty = widened;
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Improve the callee's parameter types from a call site, when the
    /// argument count is compatible with the declared (required + default)
    /// parameter count.
    fn propagate_call_arguments(&mut self, m: &mut SymbolModel, func: &Expr, args: &[Expr]) {
        if args.is_empty() {
            return;
        }
        let Some(callee) = self.infer(m, func).declaration() else {
            return;
        };
        let callee = m.resolve_alias(callee);
        let (func_decl, is_constructor) = match m.declaration(callee).kind {
            DeclKind::Function => (callee, false),
            DeclKind::Class => {
                let Type::Structure { scope, .. } = &m.declaration(callee).ty else {
                    return;
                };
                let Some(init) = m
                    .find_in_scope(*scope, "__init__", None)
                    .into_iter()
                    .next_back()
                else {
                    return;
                };
                (m.resolve_alias(init), true)
            }
            _ => return,
        };

        let fd = m.declaration(func_decl);
        // stub signatures are documentation, not inference targets
        if m.is_stub_file(fd.file) {
            return;
        }
        let Some(param_scope) = fd.parameter_scope else {
            return;
        };
        let Type::Function { parameters, .. } = fd.ty.clone() else {
            return;
        };
        let defaults = fd.default_parameters as usize;
        let is_method = m.scope(fd.scope).kind == ScopeKind::Class;

        let mut params = m.local_declarations(param_scope);
        if (is_method || is_constructor) && !params.is_empty() {
            params.remove(0);
        }
        if params.len() < args.len() || parameters.len() + defaults < args.len() {
            debug!(callee = %func_decl, "argument count mismatch, not updating parameter types");
            return;
        }

        let mut updated = parameters;
        for (i, arg) in args.iter().enumerate() {
            if i >= params.len() {
                break;
            }
            let observed = self.infer(m, arg).ty;
            if !observed.is_useful() {
                continue;
            }
            let merged = Type::merge(m.declaration(params[i]).ty.clone(), observed);
            m.declaration_mut(params[i]).ty = merged.clone();
            if i < updated.len() {
                updated[i] = merged;
            }
        }
        if let Type::Function { parameters, .. } = &mut m.declaration_mut(func_decl).ty {
            *parameters = updated;
        }
    }

    // ------------------------------------------------------------------
    // Imports
    // ------------------------------------------------------------------

    fn visit_import(&mut self, m: &mut SymbolModel, names: &[ImportAlias]) {
        for alias in names {
            let components: Vec<String> = match &alias.as_name {
                Some(as_name) => vec![as_name.name.clone()],
                None => alias.name.split('.').map(String::from).collect(),
            };
            self.create_module_import(m, &alias.name, &components, alias.span, true);
        }
    }

    fn visit_import_from(&mut self, m: &mut SymbolModel, module: &str, names: &[ImportAlias]) {
        for alias in names {
            let full = if module.is_empty() || module == "." {
                format!(".{}", alias.name)
            } else {
                format!("{}.{}", module, alias.name)
            };
            if alias.name == "*" {
                self.import_star(m, module, alias.span);
                continue;
            }
            let components = vec![alias
                .as_name
                .as_ref()
                .map(|a| a.name.clone())
                .unwrap_or_else(|| alias.name.clone())];
            let imported = self.create_module_import(m, &full, &components, alias.span, false);
            if imported.is_none() && !module.is_empty() && module != "." {
                let retry = format!("{}.__init__.{}", module, alias.name);
                self.create_module_import(m, &retry, &components, alias.span, true);
            }
        }
    }

    fn import_star(&mut self, m: &mut SymbolModel, module: &str, span: Span) {
        let full = if module.is_empty() || module == "." {
            ".*".to_string()
        } else {
            format!("{module}.*")
        };
        match resolve_module(&full, &self.path, self.paths) {
            ResolvedImport::Found { path, .. } => {
                let target = m.intern_file(&path);
                match m.module_scope(target) {
                    Some(scope) => {
                        let current = self.scopes.current();
                        m.add_scope_import(current, scope);
                    }
                    None => self.defer_import(&path),
                }
            }
            ResolvedImport::NotFound => {
                self.diagnostics.push(Diagnostic::warning(
                    self.file,
                    span,
                    format!("module \"{module}\" not found"),
                ));
            }
        }
    }

    /// Resolve a dotted module name and materialize declarations for it.
    ///
    /// Returns None when the module is missing, the named declaration is
    /// missing, or the dependency is not modeled yet (in which case it has
    /// been handed to the scheduler).
    fn create_module_import(
        &mut self,
        m: &mut SymbolModel,
        module_name: &str,
        components: &[String],
        span: Span,
        create_problems: bool,
    ) -> Option<DeclarationId> {
        match resolve_module(module_name, &self.path, self.paths) {
            ResolvedImport::NotFound => {
                if create_problems {
                    self.diagnostics.push(Diagnostic::warning(
                        self.file,
                        span,
                        format!("module \"{module_name}\" not found"),
                    ));
                }
                None
            }
            ResolvedImport::Found { path, remaining } => {
                let target = m.intern_file(&path);
                let Some(target_scope) = m.module_scope(target) else {
                    self.defer_import(&path);
                    return None;
                };
                if remaining.is_empty() {
                    return self.create_import_tree(
                        m,
                        components,
                        ImportTarget::Module(target_scope),
                        span,
                    );
                }
                // import a specific declaration from deep inside the module
                match find_declaration_dotted(m, target_scope, &remaining) {
                    Some(original) => self.create_import_tree(
                        m,
                        components,
                        ImportTarget::Declaration(original),
                        span,
                    ),
                    None => {
                        if create_problems {
                            self.diagnostics.push(Diagnostic::warning(
                                self.file,
                                span,
                                format!(
                                    "declaration \"{}\" not found in module \"{}\"",
                                    remaining.join("."),
                                    path.display()
                                ),
                            ));
                        }
                        None
                    }
                }
            }
        }
    }

    fn defer_import(&mut self, path: &Path) {
        // deduplicated by file identity; the scheduler revisits us after the
        // dependency has been built
        if !self.unresolved_imports.iter().any(|p| p == path) {
            debug!(dependency = %path.display(), "import target not modeled yet, deferring");
            self.unresolved_imports.push(path.to_path_buf());
        }
        if self.scheduler.is_queued(path) {
            self.scheduler.dequeue(path);
        }
        self.scheduler.enqueue(path, BuildPriority::Dependency);
    }

    /// Synthesize the declaration chain for a dotted import: `import a.b.c`
    /// creates `a` holding a helper scope holding `b`, and so on; the last
    /// level either imports the target module's scope or aliases a specific
    /// declaration.
    fn create_import_tree(
        &mut self,
        m: &mut SymbolModel,
        components: &[String],
        target: ImportTarget,
        span: Span,
    ) -> Option<DeclarationId> {
        let mut scope = self.scopes.current();
        let mut last = None;
        for (i, component) in components.iter().enumerate() {
            let is_last = i + 1 == components.len();
            if is_last {
                if let ImportTarget::Declaration(original) = target {
                    let resolved = m.resolve_alias(original);
                    let rd = m.declaration(resolved);
                    let id = if rd.is_alias_like() {
                        let alias =
                            self.declare_in(m, scope, component, span, None, Fit::Alias);
                        m.declaration_mut(alias).alias_of = Some(resolved);
                        alias
                    } else {
                        let ty = rd.ty.clone();
                        self.declare_in(m, scope, component, span, Some(ty), Fit::Instance)
                    };
                    return Some(id);
                }
            }

            // a level entry: a declaration with a helper scope holding the
            // next level. import statements sharing a prefix share entries.
            let already = self
                .candidates_in(m, scope, component)
                .into_iter()
                .rev()
                .find(|id| {
                    self.encountered.contains(id)
                        && matches!(m.declaration(*id).ty, Type::Structure { .. })
                });
            let decl = match already {
                Some(id) => id,
                None => self.declare_in(m, scope, component, span, None, Fit::Instance),
            };
            let existing_helper = match &m.declaration(decl).ty {
                Type::Structure { scope, .. } => Some(*scope),
                _ => None,
            };
            let helper_scope = match existing_helper {
                Some(helper) => helper,
                None => {
                    let helper = m.new_scope(
                        ScopeKind::Other,
                        self.file,
                        span,
                        Some(scope),
                        Some(component.clone()),
                    );
                    m.declaration_mut(decl).ty = Type::Structure {
                        declaration: decl,
                        scope: helper,
                    };
                    helper
                }
            };
            if is_last {
                if let ImportTarget::Module(module_scope) = target {
                    m.add_scope_import(helper_scope, module_scope);
                }
            }
            // declarations lingering in a reused helper scope are kept out
            // of the reopen search but dropped at sweep time unless a later
            // level re-encounters them
            for lingering in m.local_declarations(helper_scope) {
                if !self.encountered.contains(&lingering) {
                    self.encountered.insert(lingering);
                    self.scheduled_removal.insert(lingering);
                }
            }
            scope = helper_scope;
            last = Some(decl);
        }
        last
    }
}

#[derive(Debug, Clone, Copy)]
enum ImportTarget {
    /// Import a whole module: the last level's helper scope imports the
    /// module's scope.
    Module(ScopeId),
    /// Import one declaration: the last level aliases it.
    Declaration(DeclarationId),
}

/// Walk a dotted name through nested declaration scopes.
fn find_declaration_dotted(
    m: &SymbolModel,
    scope: ScopeId,
    segments: &[String],
) -> Option<DeclarationId> {
    let mut current_scope = scope;
    let mut found = None;
    for (i, segment) in segments.iter().enumerate() {
        let decl = m
            .find_in_scope(current_scope, segment, None)
            .into_iter()
            .next_back()?;
        found = Some(decl);
        if i + 1 < segments.len() {
            let resolved = m.resolve_alias(decl);
            match &m.declaration(resolved).ty {
                Type::Structure { scope, .. } => current_scope = *scope,
                _ => return None,
            }
        }
    }
    found
}

/// The span of a parameter list, for the scope opened around it.
fn parameters_span(parameters: &Parameters, fallback: Span) -> Span {
    let mut spans: Vec<Span> = parameters.args.iter().map(|a| a.span).collect();
    spans.extend(parameters.defaults.iter().map(|d| d.span));
    if let Some(v) = &parameters.vararg {
        spans.push(v.span);
    }
    if let Some(k) = &parameters.kwarg {
        spans.push(k.span);
    }
    let start = spans.iter().map(|s| s.start).min();
    let end = spans.iter().map(|s| s.end).max();
    match (start, end) {
        (Some(start), Some(end)) if start <= end => Span::new(start, end),
        _ => Span::new(fallback.start, fallback.start),
    }
}
