//! Filesystem access: mtimes for staleness checks, plus the directory,
//! rename and copy primitives used when publishing outputs.

use std::io::Write;
use std::path::Path;
use std::time::SystemTime;

/// MTime info gathered for a file.  This also models "file is absent".
/// It's not using an Option<> just because it makes the code using it easier
/// to follow.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum MTime {
    Missing,
    Stamp(SystemTime),
}

impl MTime {
    pub fn is_missing(&self) -> bool {
        *self == MTime::Missing
    }

    /// True if this file exists and was modified strictly after `other`.
    pub fn newer_than(&self, other: MTime) -> bool {
        match (self, other) {
            (MTime::Stamp(a), MTime::Stamp(b)) => *a > b,
            _ => false,
        }
    }
}

/// Read-only view of the disk used by the staleness analyzer, indirected so
/// tests can substitute an in-memory filesystem.
pub trait FileSystem {
    /// stat() an on-disk path, producing its MTime.
    fn stat(&self, path: &Path) -> std::io::Result<MTime>;
}

#[derive(Default)]
pub struct RealFileSystem {}

impl RealFileSystem {
    pub fn new() -> Self {
        RealFileSystem {}
    }
}

impl FileSystem for RealFileSystem {
    fn stat(&self, path: &Path) -> std::io::Result<MTime> {
        Ok(match std::fs::metadata(path) {
            Ok(meta) => MTime::Stamp(meta.modified()?),
            Err(err) => {
                if err.kind() == std::io::ErrorKind::NotFound {
                    MTime::Missing
                } else {
                    return Err(err);
                }
            }
        })
    }
}

/// Create `path` and any missing parents.
pub fn mkdir(path: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(path)
        .map_err(|err| anyhow::anyhow!("mkdir {}: {}", path.display(), err))
}

pub fn rename(from: &Path, to: &Path) -> anyhow::Result<()> {
    std::fs::rename(from, to)
        .map_err(|err| anyhow::anyhow!("mv {} {}: {}", from.display(), to.display(), err))
}

/// Creates an empty temporary file next to `dst`, so that renaming it onto
/// `dst` never crosses a filesystem.  The file is deleted when the returned
/// path is dropped without being persisted.
pub fn stage(dst: &Path) -> anyhow::Result<tempfile::TempPath> {
    let dir = match dst.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    mkdir(dir)?;
    let tmp = tempfile::Builder::new()
        .prefix(".plinth-")
        .tempfile_in(dir)
        .map_err(|err| anyhow::anyhow!("create temp file in {}: {}", dir.display(), err))?;
    Ok(tmp.into_temp_path())
}

/// Atomically moves a staged temporary file onto `dst`.
pub fn publish(tmp: tempfile::TempPath, dst: &Path) -> anyhow::Result<()> {
    if let Some(parent) = dst.parent() {
        mkdir(parent)?;
    }
    let path = tmp
        .keep()
        .map_err(|err| anyhow::anyhow!("keep {}: {}", err.path.display(), err.error))?;
    if let Err(err) = rename(&path, dst) {
        let _ = std::fs::remove_file(&path);
        return Err(err);
    }
    Ok(())
}

/// Copies `src` to `dst` such that `dst` is either absent, the previous
/// version, or the complete new contents; never a partial write.
pub fn install(dst: &Path, src: &Path) -> anyhow::Result<()> {
    let tmp = stage(dst)?;
    {
        let mut r = std::fs::File::open(src)
            .map_err(|err| anyhow::anyhow!("open {}: {}", src.display(), err))?;
        let mut w = std::fs::File::create(&tmp)?;
        std::io::copy(&mut r, &mut w)
            .map_err(|err| anyhow::anyhow!("cp {} {}: {}", src.display(), dst.display(), err))?;
        w.flush()?;
        w.sync_all()?;
    }
    publish(tmp, dst)
}
