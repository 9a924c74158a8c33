//! Error types returned by the build core.
//!
//! Graph errors describe a broken build description and are detected before
//! any tool runs.  Build errors come from running a stage of one unit.

use std::fmt;
use thiserror::Error;

/// The build description is inconsistent.  Always fatal for the invocation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("unit {identity:?} is described twice")]
    DuplicateIdentity { identity: String },

    #[error("unit {required_by:?} imports {identity:?}, which is not loaded")]
    MissingDependency {
        identity: String,
        required_by: String,
    },

    #[error("unknown unit requested: {identity:?}")]
    UnknownRoot { identity: String },

    #[error("import cycle: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("unit {identity:?} has no source files")]
    NoSources { identity: String },

    #[error("invalid unit identity {identity:?}")]
    InvalidIdentity { identity: String },

    #[error("unit {identity:?} present twice in graph")]
    Divergent { identity: String },
}

/// The step of the pipeline that failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stage {
    Assemble,
    Compile,
    Archive,
    Install,
    Link,
    /// Not run because a dependency failed.
    Dependency,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Assemble => "assemble",
            Stage::Compile => "compile",
            Stage::Archive => "archive",
            Stage::Install => "install",
            Stage::Link => "link",
            Stage::Dependency => "dependency",
        })
    }
}

/// A unit failed to build.
#[derive(Debug, Error)]
#[error("{stage} {identity}: {error:#}")]
pub struct BuildError {
    pub identity: String,
    pub stage: Stage,
    pub error: anyhow::Error,
}

impl BuildError {
    pub fn new(
        identity: impl Into<String>,
        stage: Stage,
        error: impl Into<anyhow::Error>,
    ) -> Self {
        BuildError {
            identity: identity.into(),
            stage,
            error: error.into(),
        }
    }

    /// `identity` was skipped because `failed`, one of its dependencies,
    /// did not build.
    pub fn dependency(identity: &str, failed: &str) -> Self {
        BuildError::new(
            identity,
            Stage::Dependency,
            anyhow::anyhow!("dependency {} failed", failed),
        )
    }
}

/// Adds unit and stage context to a fallible step.
pub trait StageContext<T> {
    fn stage(self, identity: &str, stage: Stage) -> Result<T, BuildError>;
}

impl<T, E: Into<anyhow::Error>> StageContext<T> for Result<T, E> {
    fn stage(self, identity: &str, stage: Stage) -> Result<T, BuildError> {
        self.map_err(|err| BuildError::new(identity, stage, err))
    }
}
