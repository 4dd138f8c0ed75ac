//! Scope tracking for builds: opening, reusing and closing lexical scopes.
//!
//! Like declarations, scopes survive rebuilds: opening a scope first looks
//! for an equivalent scope from an earlier generation under the same parent
//! and reuses it in place, so structural types pointing at class scopes stay
//! valid across builds. A reused scope keeps its declaration list (the
//! declaration resolver reopens into it) but has its span refreshed and its
//! imported-scope list recomputed.

use crate::ast::Comprehension;
use crate::model::{ScopeId, ScopeKind, SymbolModel};
use pysense_core::source::{FileId, Span};
use std::collections::HashSet;
use tracing::debug;

/// The stack of open scopes for one build pass over one file.
#[derive(Debug)]
pub struct ScopeTracker {
    pub file: FileId,
    stack: Vec<ScopeId>,
    /// Scopes already reused in this pass; a second `class C` in one file
    /// must not fold into the first one's scope.
    used: HashSet<ScopeId>,
}

impl ScopeTracker {
    pub fn new(file: FileId) -> Self {
        ScopeTracker {
            file,
            stack: Vec::new(),
            used: HashSet::new(),
        }
    }

    /// Reset per-pass state between the prebuild and build passes.
    pub fn begin_pass(&mut self) {
        self.stack.clear();
        self.used.clear();
    }

    /// The innermost open scope.
    ///
    /// Only meaningful while a pass is running; the module scope is opened
    /// before any statement is visited.
    pub fn current(&self) -> ScopeId {
        *self
            .stack
            .last()
            .expect("scope stack is empty outside a build pass")
    }

    pub fn current_kind(&self, model: &SymbolModel) -> ScopeKind {
        model.scope(self.current()).kind
    }

    /// Open (or reuse) the module scope of the file being built.
    pub fn open_module_scope(&mut self, model: &mut SymbolModel, span: Span) -> ScopeId {
        let id = match model.file(self.file).module_scope {
            Some(existing) => {
                let scope = model.scope_mut(existing);
                scope.span = span;
                scope.imports.clear();
                existing
            }
            None => model.new_scope(ScopeKind::Module, self.file, span, None, None),
        };
        self.used.insert(id);
        self.stack.push(id);
        id
    }

    /// Open a scope under the current one, reusing an equivalent scope from
    /// an earlier generation when one exists.
    pub fn open_scope(
        &mut self,
        model: &mut SymbolModel,
        kind: ScopeKind,
        span: Span,
        name: Option<&str>,
    ) -> ScopeId {
        let parent = self.current();
        let reusable = model
            .child_scopes(parent)
            .find(|s| {
                s.kind == kind && s.name.as_deref() == name && !self.used.contains(&s.id)
            })
            .map(|s| s.id);
        let id = match reusable {
            Some(existing) => {
                debug!(scope = %existing, ?kind, "reusing scope");
                let scope = model.scope_mut(existing);
                scope.span = span;
                scope.imports.clear();
                existing
            }
            None => {
                let created =
                    model.new_scope(kind, self.file, span, Some(parent), name.map(String::from));
                debug!(scope = %created, ?kind, "opened scope");
                created
            }
        };
        self.used.insert(id);
        self.stack.push(id);
        id
    }

    pub fn close_scope(&mut self) {
        let closed = self.stack.pop();
        debug_assert!(closed.is_some(), "closed more scopes than were opened");
    }
}

/// The source range of a comprehension scope: from the element (or key)
/// expression through the last generator clause, recursing into nested
/// comprehension iterators. Completion must work inside partially-typed
/// comprehensions whose trailing lines are still blank, so the range leans
/// long rather than short.
pub fn comprehension_span(element: Span, generators: &[Comprehension]) -> Span {
    let mut end = element.end;
    for g in generators {
        end = end.max(g.iter.span.end).max(g.target.span.end);
        for cond in &g.ifs {
            end = end.max(cond.span.end);
        }
    }
    let start = element.start.min(
        generators
            .first()
            .map(|g| g.target.span.start)
            .unwrap_or(element.start),
    );
    Span::new(start.min(end), end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build;
    use std::path::Path;

    fn setup() -> (SymbolModel, ScopeTracker) {
        let mut m = SymbolModel::new();
        let file = m.intern_file(Path::new("main.py"));
        (m, ScopeTracker::new(file))
    }

    #[test]
    fn test_scopes_reused_across_passes() {
        let (mut m, mut t) = setup();
        t.open_module_scope(&mut m, Span::new(0, 100));
        let class_a = t.open_scope(&mut m, ScopeKind::Class, Span::new(0, 40), Some("A"));
        t.close_scope();
        let func = t.open_scope(&mut m, ScopeKind::Function, Span::new(50, 90), Some("f"));
        t.close_scope();
        t.close_scope();

        t.begin_pass();
        t.open_module_scope(&mut m, Span::new(0, 120));
        let class_a2 = t.open_scope(&mut m, ScopeKind::Class, Span::new(0, 45), Some("A"));
        t.close_scope();
        let func2 = t.open_scope(&mut m, ScopeKind::Function, Span::new(55, 110), Some("f"));
        assert_eq!(class_a, class_a2);
        assert_eq!(func, func2);
        assert_eq!(m.scope(class_a).span, Span::new(0, 45));
    }

    #[test]
    fn test_same_name_scopes_not_folded_within_pass() {
        let (mut m, mut t) = setup();
        t.open_module_scope(&mut m, Span::new(0, 100));
        let first = t.open_scope(&mut m, ScopeKind::Class, Span::new(0, 40), Some("A"));
        t.close_scope();
        let second = t.open_scope(&mut m, ScopeKind::Class, Span::new(50, 90), Some("A"));
        assert_ne!(first, second);
    }

    #[test]
    fn test_comprehension_span_covers_generators() {
        // [x  for x in items] with the iterator ending at byte 30
        let element = Span::new(1, 2);
        let generators = vec![build::generator(
            build::at(build::store("x"), 8, 9),
            build::at(build::name("items"), 25, 30),
        )];
        let span = comprehension_span(element, &generators);
        assert_eq!(span, Span::new(1, 30));
        // no generators yet: just the element
        assert_eq!(comprehension_span(element, &[]), Span::new(1, 2));
    }
}
