//! Expression type inference: recursive abstract interpretation of
//! expression subtrees.
//!
//! The visitor is read-mostly: it walks an expression against the symbol
//! model and produces, per sub-expression, an [`Inferred`] value carrying the
//! approximate type, the declarations the expression denotes (when nameable)
//! and whether the expression is alias-like (denotes a class/function itself
//! rather than an instance).
//!
//! Inability to resolve is data, not failure: every node kind falls back to
//! the mixed type plus no declaration, and nothing here ever errors or
//! mutates the model.

use crate::ast::{Comprehension, Expr, ExprKind, Number, Slice};
use crate::model::{DeclKind, DeclarationId, PositionBound, ScopeId, SymbolModel};
use crate::types::{ContainerKind, IntegralKind, Type};
use pysense_core::source::FileId;
use tracing::trace;

// ============================================================================
// Result Value
// ============================================================================

/// What a sub-expression was inferred to be.
#[derive(Debug, Clone)]
pub struct Inferred {
    pub ty: Type,
    /// The declarations the expression denotes, candidate order; the last
    /// entry is the preferred one.
    pub declarations: Vec<DeclarationId>,
    /// True when the expression names a class, function or alias itself.
    pub is_alias: bool,
}

impl Inferred {
    pub fn unknown() -> Self {
        Inferred {
            ty: Type::mixed(),
            declarations: Vec::new(),
            is_alias: false,
        }
    }

    pub fn of_type(ty: Type) -> Self {
        Inferred {
            ty,
            declarations: Vec::new(),
            is_alias: false,
        }
    }

    /// The preferred declaration, if any.
    pub fn declaration(&self) -> Option<DeclarationId> {
        self.declarations.last().copied()
    }
}

// ============================================================================
// Visitor
// ============================================================================

/// A read-only inference pass over one expression tree.
///
/// Recursive calls share the search options and the unknown-name sink, so a
/// fragment scanned for completion reports every unresolved name it touches.
pub struct ExpressionVisitor<'a> {
    model: &'a SymbolModel,
    scope: ScopeId,
    file: FileId,
    force_global_search: bool,
    report_unknown_names: bool,
    scan_until: Option<usize>,
    /// Names that failed to resolve, in first-seen order, deduplicated.
    pub unknown_names: Vec<String>,
    /// Cleared when an attribute/call lookup failed on a base that itself
    /// carried no meaningful type, to avoid cascading false positives.
    pub should_be_known: bool,
}

impl<'a> ExpressionVisitor<'a> {
    pub fn new(model: &'a SymbolModel, scope: ScopeId) -> Self {
        let file = model.scope(scope).file;
        ExpressionVisitor {
            model,
            scope,
            file,
            force_global_search: false,
            report_unknown_names: false,
            scan_until: None,
            unknown_names: Vec::new(),
            should_be_known: true,
        }
    }

    /// Search the whole file instead of only positions before the query
    /// point. Used by completion, where the cursor sits past declarations
    /// the model has not positioned yet.
    pub fn with_global_search(mut self) -> Self {
        self.force_global_search = true;
        self
    }

    /// Record names that fail to resolve (generator-variable recovery).
    pub fn with_unknown_name_reporting(mut self) -> Self {
        self.report_unknown_names = true;
        self
    }

    /// Only see declarations before the given byte offset.
    pub fn with_scan_until(mut self, offset: usize) -> Self {
        self.scan_until = Some(offset);
        self
    }

    fn child(&self, scope: ScopeId) -> ExpressionVisitor<'a> {
        ExpressionVisitor {
            model: self.model,
            scope,
            file: self.file,
            force_global_search: self.force_global_search,
            report_unknown_names: self.report_unknown_names,
            scan_until: self.scan_until,
            unknown_names: Vec::new(),
            should_be_known: true,
        }
    }

    fn absorb(&mut self, child: ExpressionVisitor<'_>) {
        for name in child.unknown_names {
            self.add_unknown_name(name);
        }
        self.should_be_known &= child.should_be_known;
    }

    fn add_unknown_name(&mut self, name: String) {
        if !self.unknown_names.contains(&name) {
            self.unknown_names.push(name);
        }
    }

    fn bound_for(&self, expr: &Expr) -> Option<PositionBound> {
        if self.force_global_search {
            return None;
        }
        Some(PositionBound {
            file: self.file,
            offset: self.scan_until.unwrap_or(expr.span.end),
        })
    }

    // ------------------------------------------------------------------
    // Entry
    // ------------------------------------------------------------------

    /// Infer the type of one expression.
    pub fn infer(&mut self, expr: &Expr) -> Inferred {
        match &expr.kind {
            ExprKind::Name { id, .. } => self.infer_name(expr, id),
            ExprKind::Attribute { value, attr, .. } => self.infer_attribute(value, &attr.name),
            ExprKind::Call { func, args } => self.infer_call(func, args),
            ExprKind::Subscript { value, slice } => self.infer_subscript(value, slice),
            ExprKind::Num(Number::Int(_)) => {
                Inferred::of_type(Type::Integral(IntegralKind::Int))
            }
            ExprKind::Num(Number::Float(_)) => {
                Inferred::of_type(Type::Integral(IntegralKind::Float))
            }
            ExprKind::Str(_) => Inferred::of_type(Type::Integral(IntegralKind::Str)),
            ExprKind::Tuple { elements, .. } => {
                let entries = elements.iter().map(|e| self.infer(e).ty).collect();
                Inferred::of_type(Type::Indexed { entries })
            }
            ExprKind::List { elements } => {
                self.infer_elements(ContainerKind::List, elements)
            }
            ExprKind::Set { elements } => self.infer_elements(ContainerKind::Set, elements),
            ExprKind::Dict { keys, values } => {
                let mut ty = Type::container(ContainerKind::Dict);
                for value in values {
                    let observed = self.infer(value).ty;
                    ty = ty.with_content(observed);
                }
                for key in keys {
                    let observed = self.infer(key).ty;
                    ty = ty.with_key(observed);
                }
                Inferred::of_type(ty)
            }
            ExprKind::ListComp {
                element,
                generators,
            } => self.infer_comprehension(ContainerKind::List, element, None, generators),
            ExprKind::GeneratorExp {
                element,
                generators,
            } => self.infer_comprehension(ContainerKind::List, element, None, generators),
            ExprKind::SetComp {
                element,
                generators,
            } => self.infer_comprehension(ContainerKind::Set, element, None, generators),
            ExprKind::DictComp {
                key,
                value,
                generators,
            } => self.infer_comprehension(ContainerKind::Dict, value, Some(key), generators),
            ExprKind::Lambda { parameters, body } => {
                let scope = self
                    .model
                    .scope_at(self.file, body.span.start)
                    .unwrap_or(self.scope);
                let mut sub = self.child(scope);
                let returns = sub.infer(body).ty;
                self.absorb(sub);
                Inferred::of_type(Type::Function {
                    parameters: vec![Type::mixed(); parameters.args.len()],
                    returns: Box::new(returns),
                })
            }
            ExprKind::BinOp { left, right } => {
                let l = self.infer(left);
                let r = self.infer(right);
                // approximated as the left operand's type when both operands
                // carry the same type; a deliberate simplification
                if l.ty == r.ty {
                    Inferred::of_type(l.ty)
                } else {
                    Inferred::unknown()
                }
            }
            ExprKind::BoolOp { values } => {
                for value in values {
                    let _ = self.infer(value);
                }
                Inferred::of_type(Type::Integral(IntegralKind::Bool))
            }
            ExprKind::Compare { left, comparators } => {
                let _ = self.infer(left);
                for c in comparators {
                    let _ = self.infer(c);
                }
                Inferred::of_type(Type::Integral(IntegralKind::Bool))
            }
            ExprKind::UnaryOp { operand } => {
                let inner = self.infer(operand);
                Inferred::of_type(inner.ty)
            }
            ExprKind::IfExp { test, body, orelse } => {
                let _ = self.infer(test);
                let b = self.infer(body);
                let o = self.infer(orelse);
                let mut declarations = b.declarations;
                declarations.extend(o.declarations);
                Inferred {
                    ty: Type::merge(b.ty, o.ty),
                    declarations,
                    is_alias: false,
                }
            }
            ExprKind::Yield { value } => {
                if let Some(value) = value {
                    let _ = self.infer(value);
                }
                Inferred::unknown()
            }
        }
    }

    // ------------------------------------------------------------------
    // Names
    // ------------------------------------------------------------------

    fn infer_name(&mut self, expr: &Expr, id: &str) -> Inferred {
        match id {
            "True" | "False" => return Inferred::of_type(Type::Integral(IntegralKind::Bool)),
            "None" => return Inferred::of_type(Type::void()),
            _ => {}
        }

        let bound = self.bound_for(expr);
        let found = self.model.find_visible(self.scope, id, bound);
        match found.last() {
            Some(decl) => {
                let d = self.model.declaration(*decl);
                let resolved = self.model.resolve_alias(*decl);
                trace!(name = id, declaration = %d.id, "name resolved");
                Inferred {
                    ty: self.model.declaration(resolved).ty.clone(),
                    declarations: vec![*decl],
                    is_alias: d.is_alias_like(),
                }
            }
            None => {
                trace!(name = id, "name did not resolve");
                if self.report_unknown_names {
                    self.add_unknown_name(id.to_string());
                }
                Inferred::unknown()
            }
        }
    }

    // ------------------------------------------------------------------
    // Attribute Access
    // ------------------------------------------------------------------

    /// The scopes holding members of values of the given type.
    pub fn member_scopes(model: &SymbolModel, ty: &Type) -> Vec<ScopeId> {
        let mut scopes = Vec::new();
        for alt in ty.alternatives() {
            match alt {
                Type::Structure { scope, .. } => scopes.push(*scope),
                Type::VariableLength { kind, .. } => {
                    if let Some(s) = model.stub_class_scope(kind.stub_class()) {
                        scopes.push(s);
                    }
                }
                Type::Indexed { .. } => {
                    if let Some(s) = model.stub_class_scope("tuple") {
                        scopes.push(s);
                    }
                }
                Type::Integral(kind) => {
                    if let Some(name) = kind.stub_class() {
                        if let Some(s) = model.stub_class_scope(name) {
                            scopes.push(s);
                        }
                    }
                }
                Type::Function { .. } | Type::Unsure(_) => {}
            }
        }
        scopes
    }

    fn infer_attribute(&mut self, value: &Expr, attr: &str) -> Inferred {
        let base = self.infer(value);

        let mut have_useful_base = false;
        let mut found: Vec<DeclarationId> = Vec::new();
        for alt in base.ty.alternatives() {
            if alt.is_useful() {
                have_useful_base = true;
            }
        }
        for scope in Self::member_scopes(self.model, &base.ty) {
            found.extend(self.model.find_in_scope(scope, attr, None));
        }

        if found.is_empty() {
            if !have_useful_base {
                self.should_be_known = false;
            }
            return Inferred::unknown();
        }

        let member_types: Vec<Type> = found
            .iter()
            .map(|d| self.model.declaration(self.model.resolve_alias(*d)).ty.clone())
            .collect();
        let last = *found.last().expect("non-empty checked");
        let is_alias = self.model.declaration(last).is_alias_like()
            || self
                .model
                .declaration(self.model.resolve_alias(last))
                .is_alias_like();
        Inferred {
            ty: Type::unsure_of(member_types),
            declarations: found,
            is_alias,
        }
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    fn infer_call(&mut self, func: &Expr, args: &[Expr]) -> Inferred {
        for arg in args {
            let _ = self.infer(arg);
        }

        let callee = self.infer(func);
        if !callee.is_alias {
            // a call on something that is not a known class/function
            self.should_be_known = false;
            return Inferred::unknown();
        }
        let Some(decl) = callee.declaration() else {
            self.should_be_known = false;
            return Inferred::unknown();
        };

        let resolved = self.model.resolve_alias(decl);
        let rd = self.model.declaration(resolved);
        let from_stub = self.model.is_stub_file(rd.file);

        match rd.kind {
            DeclKind::Class => {
                // the stub marks container-backing classes; calling those
                // constructs a container value, not a plain instance
                if from_stub && rd.decorator("TypeContainer").is_some() {
                    let kind =
                        ContainerKind::from_stub_class(&rd.name).unwrap_or(ContainerKind::List);
                    let keyed = kind.has_keys() || rd.decorator("hasTypedKeys").is_some();
                    return Inferred {
                        ty: Type::VariableLength {
                            kind,
                            key: keyed.then(|| Box::new(Type::mixed())),
                            content: Box::new(Type::mixed()),
                        },
                        declarations: vec![resolved],
                        is_alias: false,
                    };
                }
                // constructor call: an instance of the class
                Inferred {
                    ty: rd.ty.clone(),
                    declarations: vec![resolved],
                    is_alias: false,
                }
            }
            DeclKind::Function => {
                let Type::Function { returns, .. } = &rd.ty else {
                    return Inferred::unknown();
                };
                if from_stub && !rd.decorators.is_empty() {
                    if let Some(result) = self.apply_call_decorators(rd.id, func, args) {
                        return result;
                    }
                }
                Inferred {
                    ty: (**returns).clone(),
                    declarations: vec![resolved],
                    is_alias: false,
                }
            }
            _ => Inferred::unknown(),
        }
    }

    /// The declarative decorator rules the builtin stub uses to model
    /// container semantics. Returns None when no decorator applies, letting
    /// the caller fall back to the plain return type.
    fn apply_call_decorators(
        &mut self,
        func_decl: DeclarationId,
        func: &Expr,
        args: &[Expr],
    ) -> Option<Inferred> {
        let rd = self.model.declaration(func_decl);
        let base_of_method = |this: &mut Self| -> Option<Type> {
            match &func.kind {
                ExprKind::Attribute { value, .. } => Some(this.infer(value).ty),
                _ => None,
            }
        };

        if rd.decorator("getsType").is_some() {
            let base = base_of_method(self)?;
            let content = base.content_type()?.clone();
            return Some(Inferred::of_type(content));
        }
        let gets_list = rd.decorator("getsList").is_some();
        let gets_keys = rd.decorator("getsListOfKeys").is_some();
        if gets_list || gets_keys {
            let base = base_of_method(self)?;
            let source = if gets_keys {
                base.key_type()?.clone()
            } else {
                base.content_type()?.clone()
            };
            let ty = Type::container(ContainerKind::List).with_content(source);
            return Some(Inferred::of_type(ty));
        }
        if let Some(d) = rd.decorator("returnContentEqualsContentOf") {
            let index = d.argument_index().unwrap_or(0);
            let returns = match &rd.ty {
                Type::Function { returns, .. } => (**returns).clone(),
                _ => Type::mixed(),
            };
            let Some(arg) = args.get(index) else {
                return returns.is_useful().then(|| Inferred::of_type(returns));
            };
            let source = self.infer(arg).ty;
            for alt in source.alternatives() {
                if let Some(content) = alt.content_type() {
                    // the function's forced return container, or failing
                    // that the source container itself (as for reversed())
                    let target = if returns.content_type().is_some() {
                        returns.clone()
                    } else {
                        alt.clone()
                    };
                    return Some(Inferred::of_type(target.with_content(content.clone())));
                }
            }
            return returns.is_useful().then(|| Inferred::of_type(returns));
        }
        None
    }

    // ------------------------------------------------------------------
    // Subscripts
    // ------------------------------------------------------------------

    fn infer_subscript(&mut self, value: &Expr, slice: &Slice) -> Inferred {
        let base = self.infer(value);
        match slice {
            // a slice yields the container's own type unchanged
            Slice::Slice => Inferred::of_type(base.ty),
            Slice::Index(index) => {
                let _ = self.infer(index);
                match &base.ty {
                    Type::Indexed { entries } => {
                        if let ExprKind::Num(Number::Int(n)) = index.kind {
                            let len = entries.len() as i64;
                            let position = if n < 0 { n + len } else { n };
                            if (0..len).contains(&position) {
                                return Inferred::of_type(
                                    entries[position as usize].clone(),
                                );
                            }
                        }
                        // index not statically known: any position
                        Inferred::of_type(Type::unsure_of(entries.clone()))
                    }
                    Type::VariableLength { content, .. } => {
                        Inferred::of_type((**content).clone())
                    }
                    _ => Inferred::unknown(),
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Collections
    // ------------------------------------------------------------------

    fn infer_elements(&mut self, kind: ContainerKind, elements: &[Expr]) -> Inferred {
        let mut ty = Type::container(kind);
        for element in elements {
            let observed = self.infer(element).ty;
            ty = ty.with_content(observed);
        }
        Inferred::of_type(ty)
    }

    fn infer_comprehension(
        &mut self,
        kind: ContainerKind,
        element: &Expr,
        key: Option<&Expr>,
        generators: &[Comprehension],
    ) -> Inferred {
        // generator iterables live in the enclosing scope
        for g in generators {
            let _ = self.infer(&g.iter);
        }
        // the element/key expressions see the comprehension's own scope
        let scope = if self.force_global_search {
            self.scope
        } else {
            self.model
                .scope_at(self.file, element.span.start)
                .unwrap_or(self.scope)
        };
        let mut sub = self.child(scope);
        let mut ty = Type::container(kind);
        let content = sub.infer(element).ty;
        ty = ty.with_content(content);
        if let Some(key) = key {
            let observed = sub.infer(key).ty;
            ty = ty.with_key(observed);
        }
        for g in generators {
            for cond in &g.ifs {
                let _ = sub.infer(cond);
            }
        }
        self.absorb(sub);
        Inferred::of_type(ty)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build;
    use crate::model::{DeclKind, ScopeKind, SymbolModel};
    use pysense_core::source::{Revision, Span};
    use std::path::Path;

    fn int() -> Type {
        Type::Integral(IntegralKind::Int)
    }

    fn setup() -> (SymbolModel, ScopeId) {
        let mut m = SymbolModel::new();
        let file = m.intern_file(Path::new("main.py"));
        let module = m.new_scope(ScopeKind::Module, file, Span::new(0, 1000), None, None);
        m.file_mut(file).module_scope = Some(module);
        (m, module)
    }

    #[test]
    fn test_constants_resolve_immediately() {
        let (m, scope) = setup();
        let mut v = ExpressionVisitor::new(&m, scope);
        assert_eq!(
            v.infer(&build::name("True")).ty,
            Type::Integral(IntegralKind::Bool)
        );
        assert_eq!(v.infer(&build::name("None")).ty, Type::void());
    }

    #[test]
    fn test_literals() {
        let (m, scope) = setup();
        let mut v = ExpressionVisitor::new(&m, scope);
        assert_eq!(v.infer(&build::int(1)).ty, int());
        assert_eq!(
            v.infer(&build::str_lit("x")).ty,
            Type::Integral(IntegralKind::Str)
        );
        let list = v.infer(&build::list(vec![build::int(1), build::int(2)]));
        assert_eq!(list.ty.content_type(), Some(&int()));
    }

    #[test]
    fn test_unresolved_name_degrades_and_reports() {
        let (m, scope) = setup();
        let mut v = ExpressionVisitor::new(&m, scope).with_unknown_name_reporting();
        let result = v.infer(&build::name("ghost"));
        assert!(result.ty.is_mixed());
        assert!(result.declaration().is_none());
        assert_eq!(v.unknown_names, vec!["ghost".to_string()]);
        // duplicates collapse
        let _ = v.infer(&build::name("ghost"));
        assert_eq!(v.unknown_names.len(), 1);
    }

    #[test]
    fn test_name_lookup_honors_position_bound() {
        let (mut m, scope) = setup();
        let file = m.scope(scope).file;
        m.new_declaration(
            "late",
            DeclKind::Instance,
            int(),
            file,
            Span::new(500, 504),
            Revision(1),
            scope,
        );
        let mut v = ExpressionVisitor::new(&m, scope);
        // reference before the declaration: invisible
        let early = v.infer(&build::at(build::name("late"), 10, 14));
        assert!(early.ty.is_mixed());
        // reference after: visible
        let after = v.infer(&build::at(build::name("late"), 600, 604));
        assert_eq!(after.ty, int());
        // global search sees it regardless of position
        let mut g = ExpressionVisitor::new(&m, scope).with_global_search();
        assert_eq!(g.infer(&build::at(build::name("late"), 10, 14)).ty, int());
    }

    #[test]
    fn test_tuple_subscript_precision() {
        let (mut m, scope) = setup();
        let file = m.scope(scope).file;
        m.new_declaration(
            "t",
            DeclKind::Instance,
            Type::Indexed {
                entries: vec![int(), Type::Integral(IntegralKind::Str)],
            },
            file,
            Span::new(0, 1),
            Revision(1),
            scope,
        );
        let mut v = ExpressionVisitor::new(&m, scope);
        assert_eq!(v.infer(&build::subscript(build::name("t"), build::int(0))).ty, int());
        assert_eq!(
            v.infer(&build::subscript(build::name("t"), build::int(-1))).ty,
            Type::Integral(IntegralKind::Str)
        );
        // an unknown index yields the union of all positions
        let any = v.infer(&build::subscript(build::name("t"), build::name("i")));
        assert!(matches!(any.ty, Type::Unsure(_)));
        // a slice yields the container itself
        let sliced = v.infer(&build::slice(build::name("t")));
        assert!(matches!(sliced.ty, Type::Indexed { .. }));
    }

    #[test]
    fn test_operators() {
        let (m, scope) = setup();
        let mut v = ExpressionVisitor::new(&m, scope);
        // same operand types: left type wins
        assert_eq!(v.infer(&build::binop(build::int(1), build::int(2))).ty, int());
        // different operand types: unknown
        assert!(v
            .infer(&build::binop(build::int(1), build::str_lit("s")))
            .ty
            .is_mixed());
        // comparisons and boolean operators always yield bool
        assert_eq!(
            v.infer(&build::compare(build::int(1), vec![build::int(2)])).ty,
            Type::Integral(IntegralKind::Bool)
        );
    }

    #[test]
    fn test_conditional_expression_merges_branches() {
        let (m, scope) = setup();
        let mut v = ExpressionVisitor::new(&m, scope);
        let e = build::if_exp(build::name("c"), build::int(1), build::str_lit("s"));
        let result = v.infer(&e);
        assert_eq!(
            result.ty,
            Type::merge(int(), Type::Integral(IntegralKind::Str))
        );
    }

    #[test]
    fn test_attribute_on_structure() {
        let (mut m, scope) = setup();
        let file = m.scope(scope).file;
        let class_scope = m.new_scope(
            ScopeKind::Class,
            file,
            Span::new(0, 50),
            Some(scope),
            Some("C".into()),
        );
        let class_decl = m.new_declaration(
            "C",
            DeclKind::Class,
            Type::mixed(),
            file,
            Span::new(0, 1),
            Revision(1),
            scope,
        );
        m.declaration_mut(class_decl).ty = Type::Structure {
            declaration: class_decl,
            scope: class_scope,
        };
        m.new_declaration(
            "member",
            DeclKind::ClassMember,
            int(),
            file,
            Span::new(10, 16),
            Revision(1),
            class_scope,
        );
        m.new_declaration(
            "c",
            DeclKind::Instance,
            Type::Structure {
                declaration: class_decl,
                scope: class_scope,
            },
            file,
            Span::new(60, 61),
            Revision(1),
            scope,
        );
        let mut v = ExpressionVisitor::new(&m, scope);
        let base = || build::at(build::name("c"), 900, 901);
        let got = v.infer(&build::attribute(base(), "member"));
        assert_eq!(got.ty, int());
        assert!(got.declaration().is_some());
        // a missing member on a useful base keeps should_be_known set
        let missing = v.infer(&build::attribute(base(), "ghost"));
        assert!(missing.ty.is_mixed());
        assert!(v.should_be_known);
        // a missing member on a meaningless base clears it
        let _ = v.infer(&build::attribute(build::name("nothing"), "attr"));
        assert!(!v.should_be_known);
    }

    #[test]
    fn test_constructor_call_yields_instance() {
        let (mut m, scope) = setup();
        let file = m.scope(scope).file;
        let class_scope = m.new_scope(
            ScopeKind::Class,
            file,
            Span::new(0, 50),
            Some(scope),
            Some("C".into()),
        );
        let class_decl = m.new_declaration(
            "C",
            DeclKind::Class,
            Type::mixed(),
            file,
            Span::new(0, 1),
            Revision(1),
            scope,
        );
        let structure = Type::Structure {
            declaration: class_decl,
            scope: class_scope,
        };
        m.declaration_mut(class_decl).ty = structure.clone();
        let mut v = ExpressionVisitor::new(&m, scope);
        let got = v.infer(&build::at(build::call(build::name("C"), vec![]), 100, 103));
        assert_eq!(got.ty, structure);
        assert!(!got.is_alias);
        // calling an unknown name yields unknown, never an error
        let unknown = v.infer(&build::call(build::name("nope"), vec![]));
        assert!(unknown.ty.is_mixed());
    }

    #[test]
    fn test_function_call_yields_return_type() {
        let (mut m, scope) = setup();
        let file = m.scope(scope).file;
        let f = m.new_declaration(
            "f",
            DeclKind::Function,
            Type::Function {
                parameters: vec![Type::mixed()],
                returns: Box::new(int()),
            },
            file,
            Span::new(0, 1),
            Revision(1),
            scope,
        );
        let _ = f;
        let mut v = ExpressionVisitor::new(&m, scope);
        let got = v.infer(&build::at(
            build::call(build::name("f"), vec![build::int(5)]),
            100,
            108,
        ));
        assert_eq!(got.ty, int());
    }
}
