//! Compilation units and the context they are built in.

use crate::progress::{ConsoleProgress, Progress};
use std::fmt;
use std::path::{Path, PathBuf};

/// Extension given to compiled library artifacts, both in the work directory
/// and in the artifact cache.
pub const ARTIFACT_EXT: &str = "a";

/// A compilation unit as supplied by discovery.  Immutable once handed to the
/// graph builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unit {
    /// Globally unique key, `/`-separated like an import path.
    pub identity: String,
    /// Directory holding the unit's sources.
    pub dir: PathBuf,
    /// Primary sources, passed to the compile stage in order.
    pub srcs: Vec<String>,
    /// Low-level sources, each assembled separately before archiving.
    pub asm_srcs: Vec<String>,
    /// Whether the unit produces a linked binary.
    pub entry: bool,
    /// Built-in unit with no real source; never stale, never built.
    pub synthetic: bool,
    /// Identities this unit depends on.
    pub imports: Vec<String>,
}

impl Unit {
    pub fn new(identity: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Unit {
            identity: identity.into(),
            dir: dir.into(),
            ..Default::default()
        }
    }

    pub fn synthetic(identity: impl Into<String>) -> Self {
        Unit {
            identity: identity.into(),
            synthetic: true,
            ..Default::default()
        }
    }

    pub fn srcs<S: Into<String>>(mut self, srcs: impl IntoIterator<Item = S>) -> Self {
        self.srcs = srcs.into_iter().map(Into::into).collect();
        self
    }

    pub fn asm_srcs<S: Into<String>>(mut self, srcs: impl IntoIterator<Item = S>) -> Self {
        self.asm_srcs = srcs.into_iter().map(Into::into).collect();
        self
    }

    pub fn imports<S: Into<String>>(mut self, imports: impl IntoIterator<Item = S>) -> Self {
        self.imports = imports.into_iter().map(Into::into).collect();
        self
    }

    pub fn entry(mut self) -> Self {
        self.entry = true;
        self
    }

    /// All declared source paths, primary first.
    pub fn source_paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.srcs
            .iter()
            .chain(self.asm_srcs.iter())
            .map(|name| self.dir.join(name))
    }

    /// The last path segment of the identity, used to name binaries.
    pub fn base_name(&self) -> &str {
        self.identity.rsplit('/').next().unwrap_or(&self.identity)
    }

    /// The identity as a relative filesystem path.
    pub fn rel_path(&self) -> PathBuf {
        identity_path(&self.identity)
    }
}

/// Converts a `/`-separated identity into a relative path using the
/// platform's separator.
pub fn identity_path(identity: &str) -> PathBuf {
    identity.split('/').collect()
}

/// Checks that an identity can safely be used as a relative path.
pub fn valid_identity(identity: &str) -> bool {
    !identity.is_empty()
        && identity
            .split('/')
            .all(|seg| !seg.is_empty() && seg != "." && seg != ".." && !seg.contains('\\'))
}

fn with_ext(mut path: PathBuf, ext: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(ext);
    path.set_file_name(name);
    path
}

/// Build configuration shared by every unit of one invocation.
pub struct Context {
    /// Target platform.
    pub os: String,
    pub arch: String,
    /// Platform the build runs on; a build is a cross compile when the
    /// target differs from it.
    pub host_os: String,
    pub host_arch: String,
    /// Scratch space for intermediate objects.
    pub work_dir: PathBuf,
    /// Persistent artifact cache.
    pub cache_dir: PathBuf,
    /// Where entry units' binaries land.
    pub bin_dir: PathBuf,
    pub force: bool,
    pub race: bool,
    pub compile_flags: Vec<String>,
    pub link_flags: Vec<String>,
    pub tags: Vec<String>,
    /// Building test binaries: nothing is installed and nothing is fresh.
    pub test_scope: bool,
    /// Observer for everything the build wants to say.
    pub progress: Box<dyn Progress>,
}

impl Context {
    /// A context targeting the host platform.
    pub fn new(
        work_dir: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
        bin_dir: impl Into<PathBuf>,
    ) -> Self {
        let os = std::env::consts::OS.to_string();
        let arch = std::env::consts::ARCH.to_string();
        Context {
            host_os: os.clone(),
            host_arch: arch.clone(),
            os,
            arch,
            work_dir: work_dir.into(),
            cache_dir: cache_dir.into(),
            bin_dir: bin_dir.into(),
            force: false,
            race: false,
            compile_flags: Vec::new(),
            link_flags: Vec::new(),
            tags: Vec::new(),
            test_scope: false,
            progress: Box::new(ConsoleProgress::new(false, false)),
        }
    }

    pub fn with_progress(mut self, progress: impl Progress + 'static) -> Self {
        self.progress = Box::new(progress);
        self
    }

    pub fn is_cross_compile(&self) -> bool {
        self.os != self.host_os || self.arch != self.host_arch
    }

    /// A string naming the properties that make this context's outputs
    /// distinct: platform, then build tags.
    pub fn signature(&self) -> String {
        let mut parts = vec![self.os.as_str(), self.arch.as_str()];
        parts.extend(self.tags.iter().map(String::as_str));
        parts.join("-")
    }

    /// Root of the artifact cache for this context.  Race-enabled artifacts
    /// are kept apart from normal ones.
    pub fn artifact_root(&self) -> PathBuf {
        if self.race {
            self.cache_dir.join(format!("{}_{}_race", self.os, self.arch))
        } else {
            self.cache_dir.clone()
        }
    }

    /// Directories the compiler and linker search for dependency artifacts.
    pub fn search_paths(&self) -> Vec<PathBuf> {
        vec![self.work_dir.clone(), self.artifact_root()]
    }

    /// Where the installed artifact for `unit` lives.
    pub fn artifact_path(&self, unit: &Unit) -> PathBuf {
        with_ext(self.artifact_root().join(unit.rel_path()), ARTIFACT_EXT)
    }

    /// Where the compile stage writes `unit`'s object, inside the work dir.
    /// Mirrors the cache layout so the work dir works as a search path.
    pub fn object_path(&self, unit: &Unit) -> PathBuf {
        with_ext(self.work_dir.join(unit.rel_path()), ARTIFACT_EXT)
    }

    /// Per-unit scratch directory for low-level objects and headers.
    pub fn unit_work_dir(&self, unit: &Unit) -> PathBuf {
        self.work_dir.join(unit.rel_path()).join("_obj")
    }

    /// Where the linked binary for `unit` lands.
    pub fn binary_path(&self, unit: &Unit) -> PathBuf {
        let mut name = if self.test_scope {
            format!("{}.test", unit.base_name())
        } else {
            unit.base_name().to_string()
        };
        if self.is_cross_compile() {
            name.push('-');
            name.push_str(&self.signature());
        } else if !self.tags.is_empty() {
            name.push('-');
            name.push_str(&self.tags.join("-"));
        }
        if self.os == "windows" {
            name.push_str(".exe");
        }
        let dir = if self.test_scope {
            self.work_dir.join(unit.rel_path()).join("_test")
        } else {
            self.bin_dir.clone()
        };
        dir.join(name)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("signature", &self.signature())
            .field("cache_dir", &self.cache_dir)
            .finish_non_exhaustive()
    }
}

/// Joins `path` under `dir` unless it is already absolute.
pub fn resolve_dir(dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        dir.join(p)
    }
}
