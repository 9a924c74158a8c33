//! A Toolchain that runs external tool programs.
//!
//! The tools are found by name in one directory: `compile`, `asm`, `pack`
//! and `link`, plus the platform's executable suffix.

use crate::pipeline::{CompileMode, Toolchain};
use crate::process::{self, Termination};
use crate::unit::{Context, Unit};
use anyhow::bail;
use std::path::{Path, PathBuf};

pub struct CommandToolchain<'a> {
    tool_dir: PathBuf,
    ctx: &'a Context,
}

fn arg(path: &Path) -> String {
    path.display().to_string()
}

impl<'a> CommandToolchain<'a> {
    pub fn new(tool_dir: impl Into<PathBuf>, ctx: &'a Context) -> Self {
        CommandToolchain {
            tool_dir: tool_dir.into(),
            ctx,
        }
    }

    fn tool(&self, name: &str) -> PathBuf {
        self.tool_dir
            .join(format!("{}{}", name, std::env::consts::EXE_SUFFIX))
    }

    fn run(&self, name: &str, args: Vec<String>) -> anyhow::Result<()> {
        let program = self.tool(name);
        let mut cmdline = arg(&program);
        for a in &args {
            cmdline.push(' ');
            cmdline.push_str(a);
        }
        self.ctx.progress.command(&cmdline);

        let (termination, output) = process::run_command(&program, &args)?;
        let output = String::from_utf8_lossy(&output);
        match termination {
            Termination::Success => {
                if !output.is_empty() {
                    self.ctx.progress.log(output.trim_end());
                }
                Ok(())
            }
            Termination::Interrupted => bail!("{} interrupted", name),
            Termination::Failure => bail!("{} failed:\n{}", name, output.trim_end()),
        }
    }

    fn search_args<'d>(
        flag: &'static str,
        dirs: &'d [PathBuf],
    ) -> impl Iterator<Item = String> + 'd {
        dirs.iter().flat_map(move |dir| [flag.to_string(), arg(dir)])
    }
}

impl<'a> Toolchain for CommandToolchain<'a> {
    fn compile(
        &self,
        unit: &Unit,
        sources: &[PathBuf],
        search_paths: &[PathBuf],
        out: &Path,
        mode: &CompileMode,
    ) -> anyhow::Result<()> {
        let mut args = vec![
            "-p".to_string(),
            unit.identity.clone(),
            "-o".to_string(),
            arg(out),
        ];
        args.extend(Self::search_args("-I", search_paths));
        match mode {
            CompileMode::Complete => args.push("-complete".to_string()),
            CompileMode::Merge { header } => {
                args.push("-asmhdr".to_string());
                args.push(arg(header));
            }
        }
        if self.ctx.race {
            args.push("-race".to_string());
        }
        args.extend(self.ctx.compile_flags.iter().cloned());
        args.push("-pack".to_string());
        args.extend(sources.iter().map(|s| arg(s)));
        self.run("compile", args)
    }

    fn assemble(&self, source: &Path, out: &Path) -> anyhow::Result<()> {
        // The header written by the compile stage lives beside the objects.
        let include = out.parent().unwrap_or_else(|| Path::new("."));
        let args = vec![
            "-o".to_string(),
            arg(out),
            "-I".to_string(),
            arg(include),
            arg(source),
        ];
        self.run("asm", args)
    }

    fn archive(&self, objects: &[PathBuf]) -> anyhow::Result<PathBuf> {
        let (first, rest) = match objects.split_first() {
            Some(split) => split,
            None => bail!("nothing to archive"),
        };
        let mut args = vec!["r".to_string(), arg(first)];
        args.extend(rest.iter().map(|o| arg(o)));
        self.run("pack", args)?;
        Ok(first.clone())
    }

    fn link(&self, input: &Path, search_paths: &[PathBuf], out: &Path) -> anyhow::Result<()> {
        let mut args = vec!["-o".to_string(), arg(out)];
        args.extend(Self::search_args("-L", search_paths));
        if self.ctx.race {
            args.push("-race".to_string());
        }
        args.extend(self.ctx.link_flags.iter().cloned());
        args.push("-buildmode".to_string());
        args.push("exe".to_string());
        args.push(arg(input));
        self.run("link", args)
    }
}
