//! The shared symbol model: files, scopes and declarations.
//!
//! Scopes and declarations live in append-only arenas indexed by [`ScopeId`]
//! and [`DeclarationId`]. Rebuilding a file reuses ("reopens") records in
//! place rather than replacing them, so identities stay stable across builds;
//! records that a rebuild does not re-encounter are detached and marked dead,
//! their slots never reused.
//!
//! All access goes through [`SharedModel`], a reader/writer lock passed by
//! reference into every reading or mutating call. Per-build bookkeeping
//! (encountered flags, removal schedules) lives in the builder, never in
//! these shared records, so readers cannot observe transient pass state.

use crate::types::Type;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use pysense_core::diag::Diagnostic;
use pysense_core::source::{ContentHash, FileId, Revision, Span};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors for model queries with a definite answer expected.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The file has never been interned into the model.
    #[error("file not modeled: {path}")]
    FileNotModeled { path: String },
}

/// Result type for model queries.
pub type ModelResult<T> = Result<T, ModelError>;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope_{}", self.0)
    }
}

/// Unique identifier for a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclarationId(pub u32);

impl fmt::Display for DeclarationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decl_{}", self.0)
    }
}

// ============================================================================
// Scope
// ============================================================================

/// Kind of a lexical scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Module,
    Class,
    Function,
    Comprehension,
    /// Parameter lists, lambda bodies, import helper scopes.
    Other,
}

/// A lexical scope owning an ordered set of declarations.
#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub file: FileId,
    pub span: Span,
    pub parent: Option<ScopeId>,
    /// Display name (class/function name), None for module and comprehension
    /// scopes.
    pub name: Option<String>,
    /// Scopes whose declarations are visible here without being local: star
    /// imports, base classes, parameter lists, the implicit builtin import.
    pub imports: Vec<ScopeId>,
    /// Local declarations in creation order.
    pub declarations: Vec<DeclarationId>,
}

// ============================================================================
// Declaration
// ============================================================================

/// Kind of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    /// A plain variable binding (everything is an object).
    Instance,
    Function,
    Class,
    /// Stands for another declaration (`import x as y`, re-exports).
    Alias,
    /// A member living directly in a class scope.
    ClassMember,
}

/// A decorator observed on a class or function definition.
///
/// Only the name and the first literal argument are kept; that is all the
/// inference rules consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decorator {
    pub name: String,
    pub argument: Option<String>,
}

impl Decorator {
    pub fn new(name: impl Into<String>) -> Self {
        Decorator {
            name: name.into(),
            argument: None,
        }
    }

    pub fn with_argument(name: impl Into<String>, argument: impl Into<String>) -> Self {
        Decorator {
            name: name.into(),
            argument: Some(argument.into()),
        }
    }

    /// The decorator's argument parsed as a parameter index.
    pub fn argument_index(&self) -> Option<usize> {
        self.argument.as_deref().and_then(|a| a.parse().ok())
    }
}

/// A named symbol with a kind, range, owning scope and inferred type.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub id: DeclarationId,
    pub name: String,
    /// Scope path from the module root down to (and including) this name.
    pub qualified: Vec<String>,
    pub kind: DeclKind,
    pub ty: Type,
    pub file: FileId,
    /// Source range; only comparable within `revision` of `file`.
    pub span: Span,
    /// Build generation that last (re)encountered this declaration.
    pub revision: Revision,
    pub scope: ScopeId,
    /// For aliases: the declaration this one stands for.
    pub alias_of: Option<DeclarationId>,
    pub decorators: Vec<Decorator>,
    /// Functions: `@staticmethod` was present.
    pub is_static: bool,
    /// Functions: number of parameters carrying defaults.
    pub default_parameters: u32,
    /// Functions: the scope holding the parameter declarations.
    pub parameter_scope: Option<ScopeId>,
    pub docstring: Option<String>,
    /// Cleared when a rebuild fails to re-encounter this declaration.
    pub alive: bool,
}

impl Declaration {
    /// Whether using this name denotes the declared thing itself rather than
    /// an instance of its type (classes, functions, aliases).
    pub fn is_alias_like(&self) -> bool {
        matches!(self.kind, DeclKind::Class | DeclKind::Function | DeclKind::Alias)
    }

    /// Find a decorator by name.
    pub fn decorator(&self, name: &str) -> Option<&Decorator> {
        self.decorators.iter().find(|d| d.name == name)
    }

    /// Dotted display form of the qualified name.
    pub fn qualified_name(&self) -> String {
        self.qualified.join(".")
    }
}

// ============================================================================
// Files
// ============================================================================

/// Per-file bookkeeping in the model.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub id: FileId,
    pub path: PathBuf,
    /// The module scope, present once the file has been built at least once.
    pub module_scope: Option<ScopeId>,
    /// Current build generation.
    pub revision: Revision,
    /// Hash of the source text the current generation was built from.
    pub hash: Option<ContentHash>,
    /// Diagnostics produced by the current generation.
    pub diagnostics: Vec<Diagnostic>,
}

// ============================================================================
// Position Bound
// ============================================================================

/// Restricts name lookup to declarations textually before a position.
///
/// The bound only constrains declarations of `file`; declarations imported
/// from other files have ranges in a different coordinate space and are
/// always visible.
#[derive(Debug, Clone, Copy)]
pub struct PositionBound {
    pub file: FileId,
    pub offset: usize,
}

// ============================================================================
// Symbol Model
// ============================================================================

/// The whole symbol model: arenas plus file bookkeeping.
#[derive(Debug, Default)]
pub struct SymbolModel {
    scopes: Vec<Scope>,
    declarations: Vec<Declaration>,
    files: Vec<FileEntry>,
    by_path: HashMap<PathBuf, FileId>,
    stub_file: Option<FileId>,
}

impl SymbolModel {
    pub fn new() -> Self {
        SymbolModel::default()
    }

    // ------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------

    /// Get or create the [`FileId`] for a path.
    pub fn intern_file(&mut self, path: &Path) -> FileId {
        if let Some(id) = self.by_path.get(path) {
            return *id;
        }
        let id = FileId::new(self.files.len() as u32);
        self.files.push(FileEntry {
            id,
            path: path.to_path_buf(),
            module_scope: None,
            revision: Revision::INITIAL,
            hash: None,
            diagnostics: Vec::new(),
        });
        self.by_path.insert(path.to_path_buf(), id);
        id
    }

    /// Look up an already-interned file.
    pub fn find_file(&self, path: &Path) -> ModelResult<FileId> {
        self.by_path
            .get(path)
            .copied()
            .ok_or_else(|| ModelError::FileNotModeled {
                path: path.display().to_string(),
            })
    }

    pub fn file(&self, id: FileId) -> &FileEntry {
        &self.files[id.0 as usize]
    }

    pub fn file_mut(&mut self, id: FileId) -> &mut FileEntry {
        &mut self.files[id.0 as usize]
    }

    /// The module scope of a file, if it has been built.
    pub fn module_scope(&self, id: FileId) -> Option<ScopeId> {
        self.file(id).module_scope
    }

    // ------------------------------------------------------------------
    // Builtin stub
    // ------------------------------------------------------------------

    /// Mark a file as the builtin stub.
    pub fn set_stub_file(&mut self, id: FileId) {
        self.stub_file = Some(id);
    }

    pub fn stub_file(&self) -> Option<FileId> {
        self.stub_file
    }

    pub fn is_stub_file(&self, id: FileId) -> bool {
        self.stub_file == Some(id)
    }

    /// The member scope of a builtin stub class, by name.
    pub fn stub_class_scope(&self, name: &str) -> Option<ScopeId> {
        let stub = self.stub_file?;
        let module = self.module_scope(stub)?;
        let decl = self
            .find_in_scope(module, name, None)
            .into_iter()
            .next_back()?;
        match &self.declaration(decl).ty {
            Type::Structure { scope, .. } => Some(*scope),
            _ => None,
        }
    }

    /// The builtin stub class declaration by name.
    pub fn stub_class(&self, name: &str) -> Option<DeclarationId> {
        let stub = self.stub_file?;
        let module = self.module_scope(stub)?;
        self.find_in_scope(module, name, None).into_iter().next_back()
    }

    // ------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------

    pub fn new_scope(
        &mut self,
        kind: ScopeKind,
        file: FileId,
        span: Span,
        parent: Option<ScopeId>,
        name: Option<String>,
    ) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            id,
            kind,
            file,
            span,
            parent,
            name,
            imports: Vec::new(),
            declarations: Vec::new(),
        });
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }

    /// Add an imported scope, deduplicated.
    pub fn add_scope_import(&mut self, scope: ScopeId, imported: ScopeId) {
        let s = self.scope_mut(scope);
        if !s.imports.contains(&imported) {
            s.imports.push(imported);
        }
    }

    /// Child scopes of `parent`, in creation order.
    pub fn child_scopes(&self, parent: ScopeId) -> impl Iterator<Item = &Scope> {
        self.scopes
            .iter()
            .filter(move |s| s.parent == Some(parent))
    }

    /// All scopes belonging to a file.
    pub fn scopes_of_file(&self, file: FileId) -> impl Iterator<Item = &Scope> {
        self.scopes.iter().filter(move |s| s.file == file)
    }

    /// The innermost scope of `file` containing `offset`, falling back to the
    /// module scope.
    pub fn scope_at(&self, file: FileId, offset: usize) -> Option<ScopeId> {
        let mut best: Option<&Scope> = None;
        for scope in self.scopes_of_file(file) {
            if !scope.span.contains_offset(offset) {
                continue;
            }
            let better = match best {
                Some(b) => scope.span.len() < b.span.len(),
                None => true,
            };
            if better {
                best = Some(scope);
            }
        }
        best.map(|s| s.id).or_else(|| self.module_scope(file))
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn new_declaration(
        &mut self,
        name: &str,
        kind: DeclKind,
        ty: Type,
        file: FileId,
        span: Span,
        revision: Revision,
        scope: ScopeId,
    ) -> DeclarationId {
        let id = DeclarationId(self.declarations.len() as u32);
        let mut qualified = self.scope_path(scope);
        qualified.push(name.to_string());
        self.declarations.push(Declaration {
            id,
            name: name.to_string(),
            qualified,
            kind,
            ty,
            file,
            span,
            revision,
            scope,
            alias_of: None,
            decorators: Vec::new(),
            is_static: false,
            default_parameters: 0,
            parameter_scope: None,
            docstring: None,
            alive: true,
        });
        self.scope_mut(scope).declarations.push(id);
        id
    }

    pub fn declaration(&self, id: DeclarationId) -> &Declaration {
        &self.declarations[id.0 as usize]
    }

    pub fn declaration_mut(&mut self, id: DeclarationId) -> &mut Declaration {
        &mut self.declarations[id.0 as usize]
    }

    /// A declaration's current type.
    pub fn type_of(&self, id: DeclarationId) -> &Type {
        &self.declaration(id).ty
    }

    /// Follow alias links to the declaration actually denoted.
    ///
    /// Bounded by the alias chain length seen so far, so alias cycles (which
    /// only a defective build could produce) cannot hang a reader.
    pub fn resolve_alias(&self, id: DeclarationId) -> DeclarationId {
        let mut current = id;
        for _ in 0..self.declarations.len() {
            match self.declaration(current).alias_of {
                Some(next) if next != current => current = next,
                _ => break,
            }
        }
        current
    }

    /// Detach a declaration from its scope and mark it dead.
    pub fn remove_declaration(&mut self, id: DeclarationId) {
        let scope = self.declaration(id).scope;
        self.scope_mut(scope).declarations.retain(|d| *d != id);
        self.declaration_mut(id).alive = false;
    }

    /// Remove declarations of `file` that a finished build did not
    /// re-encounter. Returns how many were removed.
    pub fn sweep_not_encountered(
        &mut self,
        file: FileId,
        encountered: &HashSet<DeclarationId>,
    ) -> usize {
        let stale: Vec<DeclarationId> = self
            .declarations
            .iter()
            .filter(|d| d.alive && d.file == file && !encountered.contains(&d.id))
            .map(|d| d.id)
            .collect();
        let count = stale.len();
        for id in stale {
            self.remove_declaration(id);
        }
        count
    }

    /// Remove declarations of `file` stamped with an older revision than
    /// `current`. Returns how many were removed.
    pub fn sweep_stale(&mut self, file: FileId, current: Revision) -> usize {
        let stale: Vec<DeclarationId> = self
            .declarations
            .iter()
            .filter(|d| d.alive && d.file == file && d.revision < current)
            .map(|d| d.id)
            .collect();
        let count = stale.len();
        for id in stale {
            self.remove_declaration(id);
        }
        count
    }

    /// The names of the scopes enclosing `scope`, outermost first, skipping
    /// anonymous scopes.
    pub fn scope_path(&self, scope: ScopeId) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.scope(id);
            if let Some(name) = &s.name {
                path.push(name.clone());
            }
            current = s.parent;
        }
        path.reverse();
        path
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    fn bound_allows(&self, decl: &Declaration, bound: Option<PositionBound>) -> bool {
        match bound {
            Some(b) if decl.file == b.file => decl.span.start <= b.offset,
            _ => true,
        }
    }

    /// Find declarations named `name` in `scope` and its imported scopes,
    /// without searching parents. Results are in declaration order; the last
    /// entry is the most recent.
    pub fn find_in_scope(
        &self,
        scope: ScopeId,
        name: &str,
        bound: Option<PositionBound>,
    ) -> Vec<DeclarationId> {
        let mut found = Vec::new();
        let mut visited = Vec::new();
        self.find_in_scope_inner(scope, name, bound, &mut visited, &mut found);
        found
    }

    fn find_in_scope_inner(
        &self,
        scope: ScopeId,
        name: &str,
        bound: Option<PositionBound>,
        visited: &mut Vec<ScopeId>,
        found: &mut Vec<DeclarationId>,
    ) {
        if visited.contains(&scope) {
            return;
        }
        visited.push(scope);
        let s = self.scope(scope);
        for id in &s.declarations {
            let d = self.declaration(*id);
            if d.alive && d.name == name && self.bound_allows(d, bound) {
                found.push(*id);
            }
        }
        for imported in s.imports.clone() {
            self.find_in_scope_inner(imported, name, bound, visited, found);
        }
    }

    /// Find declarations named `name` visible from `scope`: the scope itself,
    /// its imported scopes, then the parent chain.
    pub fn find_visible(
        &self,
        scope: ScopeId,
        name: &str,
        bound: Option<PositionBound>,
    ) -> Vec<DeclarationId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let found = self.find_in_scope(id, name, bound);
            if !found.is_empty() {
                return found;
            }
            current = self.scope(id).parent;
        }
        Vec::new()
    }

    /// A scope's own live declarations, in creation order.
    pub fn local_declarations(&self, scope: ScopeId) -> Vec<DeclarationId> {
        self.scope(scope)
            .declarations
            .iter()
            .filter(|id| self.declaration(**id).alive)
            .copied()
            .collect()
    }

    /// A scope's declarations plus those of its imported scopes (base
    /// classes, star imports), without walking parents. This backs member
    /// listing.
    pub fn scope_declarations(
        &self,
        scope: ScopeId,
        bound: Option<PositionBound>,
    ) -> Vec<DeclarationId> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut result = Vec::new();
        let mut visited = Vec::new();
        self.collect_scope_declarations(scope, bound, &mut visited, &mut seen, &mut result);
        result
    }

    /// Every declaration visible from `scope` at `bound`, innermost binding
    /// winning per name. This backs plain-name completion.
    pub fn visible_declarations(
        &self,
        scope: ScopeId,
        bound: Option<PositionBound>,
    ) -> Vec<DeclarationId> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut result = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            let mut visited = Vec::new();
            self.collect_scope_declarations(id, bound, &mut visited, &mut seen, &mut result);
            current = self.scope(id).parent;
        }
        result
    }

    fn collect_scope_declarations(
        &self,
        scope: ScopeId,
        bound: Option<PositionBound>,
        visited: &mut Vec<ScopeId>,
        seen: &mut HashSet<String>,
        result: &mut Vec<DeclarationId>,
    ) {
        if visited.contains(&scope) {
            return;
        }
        visited.push(scope);
        let s = self.scope(scope);
        for id in &s.declarations {
            let d = self.declaration(*id);
            if d.alive && self.bound_allows(d, bound) && !seen.contains(d.name.as_str()) {
                seen.insert(d.name.clone());
                result.push(*id);
            }
        }
        for imported in s.imports.clone() {
            self.collect_scope_declarations(imported, bound, visited, seen, result);
        }
    }
}

// ============================================================================
// Shared Model
// ============================================================================

/// The symbol model behind its reader/writer lock.
///
/// Any number of readers (inference, completion, navigation) may hold the
/// model concurrently; exactly one writer (a build pass) excludes them all.
/// The guards release on every exit path, including early returns.
#[derive(Debug, Default)]
pub struct SharedModel {
    inner: RwLock<SymbolModel>,
}

impl SharedModel {
    pub fn new() -> Self {
        SharedModel {
            inner: RwLock::new(SymbolModel::new()),
        }
    }

    /// Acquire shared read access.
    pub fn read(&self) -> RwLockReadGuard<'_, SymbolModel> {
        self.inner.read()
    }

    /// Acquire exclusive write access.
    pub fn write(&self) -> RwLockWriteGuard<'_, SymbolModel> {
        self.inner.write()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IntegralKind;

    fn int() -> Type {
        Type::Integral(IntegralKind::Int)
    }

    fn setup() -> (SymbolModel, FileId, ScopeId) {
        let mut m = SymbolModel::new();
        let file = m.intern_file(Path::new("main.py"));
        let module = m.new_scope(ScopeKind::Module, file, Span::new(0, 100), None, None);
        m.file_mut(file).module_scope = Some(module);
        (m, file, module)
    }

    #[test]
    fn test_intern_file_is_stable() {
        let mut m = SymbolModel::new();
        let a = m.intern_file(Path::new("a.py"));
        let b = m.intern_file(Path::new("b.py"));
        assert_ne!(a, b);
        assert_eq!(m.intern_file(Path::new("a.py")), a);
        assert!(m.find_file(Path::new("c.py")).is_err());
    }

    #[test]
    fn test_find_visible_walks_parents_and_imports() {
        let (mut m, file, module) = setup();
        let class_scope = m.new_scope(
            ScopeKind::Class,
            file,
            Span::new(10, 60),
            Some(module),
            Some("C".into()),
        );
        let d_outer = m.new_declaration(
            "x",
            DeclKind::Instance,
            int(),
            file,
            Span::new(0, 1),
            Revision(1),
            module,
        );
        // visible from the class scope through the parent chain
        assert_eq!(m.find_visible(class_scope, "x", None), vec![d_outer]);

        // an imported scope supplies names not found locally
        let other_file = m.intern_file(Path::new("other.py"));
        let other_module =
            m.new_scope(ScopeKind::Module, other_file, Span::new(0, 10), None, None);
        let d_imported = m.new_declaration(
            "helper",
            DeclKind::Function,
            Type::mixed(),
            other_file,
            Span::new(0, 6),
            Revision(1),
            other_module,
        );
        m.add_scope_import(module, other_module);
        assert_eq!(m.find_visible(class_scope, "helper", None), vec![d_imported]);
    }

    #[test]
    fn test_position_bound_only_constrains_own_file() {
        let (mut m, file, module) = setup();
        let late = m.new_declaration(
            "x",
            DeclKind::Instance,
            int(),
            file,
            Span::new(50, 51),
            Revision(1),
            module,
        );
        let bound = Some(PositionBound { file, offset: 10 });
        assert!(m.find_visible(module, "x", bound).is_empty());
        assert_eq!(m.find_visible(module, "x", None), vec![late]);

        // imported declarations live in another coordinate space
        let other_file = m.intern_file(Path::new("other.py"));
        let other_module =
            m.new_scope(ScopeKind::Module, other_file, Span::new(0, 10), None, None);
        let imported = m.new_declaration(
            "y",
            DeclKind::Instance,
            int(),
            other_file,
            Span::new(90, 91),
            Revision(1),
            other_module,
        );
        m.add_scope_import(module, other_module);
        assert_eq!(m.find_visible(module, "y", bound), vec![imported]);
    }

    #[test]
    fn test_scope_at_picks_innermost() {
        let (mut m, file, module) = setup();
        let outer = m.new_scope(
            ScopeKind::Function,
            file,
            Span::new(10, 80),
            Some(module),
            Some("f".into()),
        );
        let inner = m.new_scope(
            ScopeKind::Comprehension,
            file,
            Span::new(30, 50),
            Some(outer),
            None,
        );
        assert_eq!(m.scope_at(file, 40), Some(inner));
        assert_eq!(m.scope_at(file, 20), Some(outer));
        assert_eq!(m.scope_at(file, 5), Some(module));
        // past every scope falls back to the module scope
        assert_eq!(m.scope_at(file, 99999), Some(module));
    }

    #[test]
    fn test_sweep_removes_stale_only() {
        let (mut m, file, module) = setup();
        let old = m.new_declaration(
            "old",
            DeclKind::Instance,
            int(),
            file,
            Span::new(0, 3),
            Revision(1),
            module,
        );
        let fresh = m.new_declaration(
            "fresh",
            DeclKind::Instance,
            int(),
            file,
            Span::new(4, 9),
            Revision(2),
            module,
        );
        assert_eq!(m.sweep_stale(file, Revision(2)), 1);
        assert!(!m.declaration(old).alive);
        assert!(m.declaration(fresh).alive);
        assert_eq!(m.local_declarations(module), vec![fresh]);
    }

    #[test]
    fn test_resolve_alias_is_cycle_safe() {
        let (mut m, file, module) = setup();
        let a = m.new_declaration(
            "a",
            DeclKind::Alias,
            Type::mixed(),
            file,
            Span::new(0, 1),
            Revision(1),
            module,
        );
        let b = m.new_declaration(
            "b",
            DeclKind::Alias,
            Type::mixed(),
            file,
            Span::new(2, 3),
            Revision(1),
            module,
        );
        m.declaration_mut(a).alias_of = Some(b);
        m.declaration_mut(b).alias_of = Some(a);
        // terminates; the exact endpoint of a defective cycle is unspecified
        let _ = m.resolve_alias(a);

        m.declaration_mut(b).alias_of = None;
        assert_eq!(m.resolve_alias(a), b);
    }

    #[test]
    fn test_shared_model_concurrent_readers() {
        let shared = SharedModel::new();
        {
            let mut w = shared.write();
            w.intern_file(Path::new("a.py"));
        }
        let r1 = shared.read();
        let r2 = shared.read();
        assert!(r1.find_file(Path::new("a.py")).is_ok());
        assert!(r2.find_file(Path::new("a.py")).is_ok());
    }

    #[test]
    fn test_qualified_names_follow_scope_path() {
        let (mut m, file, module) = setup();
        let class_scope = m.new_scope(
            ScopeKind::Class,
            file,
            Span::new(10, 60),
            Some(module),
            Some("C".into()),
        );
        let member = m.new_declaration(
            "v",
            DeclKind::ClassMember,
            int(),
            file,
            Span::new(20, 21),
            Revision(1),
            class_scope,
        );
        assert_eq!(m.declaration(member).qualified_name(), "C.v");
    }
}
