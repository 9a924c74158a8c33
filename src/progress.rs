//! Build progress tracking and reporting, for the purpose of display to the
//! user.
//!
//! The build core never prints directly; everything goes through a Progress
//! carried on the Context, so tests can capture or silence it.

use crate::error::{BuildError, Stage};
use crate::stale::Reason;

/// Trait for build progress notifications.
pub trait Progress {
    /// Called once per unit the staleness analyzer finds stale.
    fn explain(&self, identity: &str, reason: &Reason);

    /// Called when a planned unit needs no work.
    fn up_to_date(&self, identity: &str);

    /// Called when a pipeline stage starts for a unit.
    fn task_started(&self, identity: &str, stage: Stage);

    /// Called with the command line of each external tool invocation.
    fn command(&self, cmdline: &str);

    /// Called when a unit fails to build.
    fn failed(&self, err: &BuildError);

    /// Log a line of output.
    fn log(&self, msg: &str);
}

/// Progress implementation for a plain console, one line per event.
#[derive(Default)]
pub struct ConsoleProgress {
    /// Whether to print command lines of started programs.
    verbose: bool,

    /// Whether to print why each unit is stale ("-d explain").
    explain: bool,
}

impl ConsoleProgress {
    pub fn new(verbose: bool, explain: bool) -> Self {
        ConsoleProgress { verbose, explain }
    }
}

impl Progress for ConsoleProgress {
    fn explain(&self, identity: &str, reason: &Reason) {
        if self.explain {
            self.log(&format!("explain: {} is stale: {}", identity, reason));
        }
    }

    fn up_to_date(&self, identity: &str) {
        if self.verbose {
            self.log(&format!("{} is up to date", identity));
        }
    }

    fn task_started(&self, identity: &str, stage: Stage) {
        if !self.verbose {
            self.log(&format!("{} {}", stage, identity));
        }
    }

    fn command(&self, cmdline: &str) {
        if self.verbose {
            self.log(&format!("+ {}", cmdline));
        }
    }

    fn failed(&self, err: &BuildError) {
        self.log(&format!("failed: {}", err));
    }

    fn log(&self, msg: &str) {
        println!("{}", msg);
    }
}
