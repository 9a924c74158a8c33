//! Per-unit artifact production: compile, assemble, archive, install, and
//! for entry units, link.
//!
//! Outputs that other runs trust (installed artifacts and binaries) are always
//! written to a temporary file beside their destination and renamed into
//! place, so a crash never leaves a truncated file with a fresh mtime.

use crate::error::{BuildError, Stage, StageContext};
use crate::fs;
use crate::graph::Node;
use crate::unit::Unit;
use std::path::{Path, PathBuf};

/// How the compile stage should treat its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileMode {
    /// The primary sources are the whole unit.
    Complete,
    /// Low-level objects will be archived with the output; `header` is where
    /// the compiler writes the definitions they need.
    Merge { header: PathBuf },
}

/// The external tools that turn sources into artifacts.  Each call blocks
/// until the tool finishes.
pub trait Toolchain {
    fn compile(
        &self,
        unit: &Unit,
        sources: &[PathBuf],
        search_paths: &[PathBuf],
        out: &Path,
        mode: &CompileMode,
    ) -> anyhow::Result<()>;

    fn assemble(&self, source: &Path, out: &Path) -> anyhow::Result<()>;

    /// Merges objects into one artifact, returning its path.
    fn archive(&self, objects: &[PathBuf]) -> anyhow::Result<PathBuf>;

    fn link(&self, input: &Path, search_paths: &[PathBuf], out: &Path) -> anyhow::Result<()>;
}

/// Name of the header the compiler emits for a unit's low-level sources.
const ASM_HEADER: &str = "asm_defs.h";

/// Builds `node`'s artifact and installs it into the cache.  Returns the
/// path of the usable artifact: the installed one, or in test scope the one
/// left in the work directory.
pub fn compile(node: &Node, toolchain: &dyn Toolchain) -> Result<PathBuf, BuildError> {
    let unit = node.unit();
    let ctx = node.ctx();
    let id = node.identity();

    if unit.srcs.is_empty() {
        return Err(BuildError::new(
            id,
            Stage::Compile,
            anyhow::anyhow!("no source files supplied"),
        ));
    }

    let obj_dir = ctx.unit_work_dir(unit);
    fs::mkdir(&obj_dir).stage(id, Stage::Compile)?;
    let installed = ctx.artifact_path(unit);
    if !ctx.test_scope {
        if let Some(parent) = installed.parent() {
            fs::mkdir(parent).stage(id, Stage::Install)?;
        }
    }

    let compiled = ctx.object_path(unit);
    let mode = if unit.asm_srcs.is_empty() {
        CompileMode::Complete
    } else {
        CompileMode::Merge {
            header: obj_dir.join(ASM_HEADER),
        }
    };
    let sources: Vec<PathBuf> = unit.srcs.iter().map(|s| unit.dir.join(s)).collect();
    ctx.progress.task_started(id, Stage::Compile);
    toolchain
        .compile(unit, &sources, &ctx.search_paths(), &compiled, &mode)
        .stage(id, Stage::Compile)?;

    // The assembler includes the header the compile stage just wrote.
    let mut objects = Vec::with_capacity(1 + unit.asm_srcs.len());
    objects.push(compiled.clone());
    for src in &unit.asm_srcs {
        let stem = Path::new(src)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| src.clone());
        let out = obj_dir.join(format!("{}.o", stem));
        ctx.progress.task_started(id, Stage::Assemble);
        toolchain
            .assemble(&unit.dir.join(src), &out)
            .stage(id, Stage::Assemble)?;
        objects.push(out);
    }

    let artifact = if objects.len() > 1 {
        ctx.progress.task_started(id, Stage::Archive);
        toolchain.archive(&objects).stage(id, Stage::Archive)?
    } else {
        compiled
    };

    if ctx.test_scope {
        return Ok(artifact);
    }
    fs::install(&installed, &artifact).stage(id, Stage::Install)?;
    Ok(installed)
}

/// Links an entry unit's binary from `artifact`.  The binary appears at its
/// destination fully written or not at all.
pub fn link(
    node: &Node,
    artifact: &Path,
    toolchain: &dyn Toolchain,
) -> Result<PathBuf, BuildError> {
    let ctx = node.ctx();
    let id = node.identity();
    let dst = node.binary_path();

    ctx.progress.task_started(id, Stage::Link);
    let tmp = fs::stage(&dst).stage(id, Stage::Link)?;
    // On failure the temp file is removed when `tmp` drops.
    toolchain
        .link(artifact, &ctx.search_paths(), &tmp)
        .stage(id, Stage::Link)?;
    fs::publish(tmp, &dst).stage(id, Stage::Link)?;
    Ok(dst)
}
