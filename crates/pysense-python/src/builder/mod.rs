//! Building files into the symbol model.
//!
//! A build runs the declaration resolver twice over the same AST: an
//! internal "prebuild" pass makes every declaration in the file available
//! (forward references, self-referential types), then the real pass visits
//! expressions with that knowledge. The two passes are the same algorithm
//! parameterized by [`BuildPhase`]; the phase suppresses only the semantic
//! side effects that would be unsafe to run twice (call-site argument
//! feedback).
//!
//! Declarations the build pass does not re-encounter are removed afterwards;
//! everything else keeps its identity across builds.

mod context;
mod declarations;

pub use context::comprehension_span;

use crate::ast::Module;
use crate::model::SharedModel;
use crate::scheduler::{BuildScheduler, SearchPaths};
use declarations::DeclarationBuilder;
use pysense_core::diag::Diagnostic;
use pysense_core::source::{ContentHash, FileId, Revision};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Which of the two passes over a file is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    /// The first pass: declarations only, no irreversible side effects.
    Prebuild,
    /// The real pass.
    Build,
}

/// What one build of one file produced.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub file: FileId,
    pub revision: Revision,
    pub diagnostics: Vec<Diagnostic>,
    /// Files this build depends on that are not modeled yet; they have been
    /// handed to the scheduler, which is expected to revisit this file.
    pub unresolved_imports: Vec<PathBuf>,
}

/// Build (or rebuild) one file's AST into the model.
///
/// Bootstraps the builtin stub on first use. Writes are funneled through the
/// model's lock at statement granularity; the build never blocks on another
/// file being available.
pub fn build_file(
    model: &SharedModel,
    scheduler: &dyn BuildScheduler,
    paths: &dyn SearchPaths,
    path: &Path,
    module: &Module,
    source: &str,
) -> BuildOutcome {
    if path != crate::stubs::stub_path() {
        crate::stubs::ensure_builtins(model, scheduler, paths);
    }

    let (file, revision) = {
        let mut m = model.write();
        let file = m.intern_file(path);
        let revision = m.file(file).revision.next();
        let entry = m.file_mut(file);
        entry.revision = revision;
        entry.hash = Some(ContentHash::compute(source.as_bytes()));
        (file, revision)
    };
    debug!(file = %file, revision = %revision, path = %path.display(), "building file");

    let mut prebuilder = DeclarationBuilder::new(
        model,
        scheduler,
        paths,
        BuildPhase::Prebuild,
        file,
        path,
        revision,
        source.len(),
    );
    prebuilder.run(module);

    let mut builder = DeclarationBuilder::new(
        model,
        scheduler,
        paths,
        BuildPhase::Build,
        file,
        path,
        revision,
        source.len(),
    );
    builder.run(module);
    let (encountered, diagnostics, unresolved_imports) = builder.into_encountered();

    let mut m = model.write();
    let removed = m.sweep_not_encountered(file, &encountered);
    if removed > 0 {
        debug!(removed, file = %file, "removed declarations not re-encountered");
    }
    m.file_mut(file).diagnostics = diagnostics.clone();

    BuildOutcome {
        file,
        revision,
        diagnostics,
        unresolved_imports,
    }
}
