//! Support code for e2e tests, which run plinth as a binary against a
//! scratch project with shell-script tools.

#![cfg(unix)]

mod basic;
mod failures;

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::{Duration, SystemTime};

pub fn plinth_binary() -> std::path::PathBuf {
    std::env::current_exe()
        .expect("test binary path")
        .parent()
        .expect("test binary directory")
        .parent()
        .expect("binary directory")
        .join("plinth")
}

pub fn plinth_command(args: Vec<&str>) -> std::process::Command {
    let mut cmd = std::process::Command::new(plinth_binary());
    cmd.args(args);
    cmd
}

fn print_output(out: &std::process::Output) {
    // Gross: use print! instead of writing to stdout so Rust test
    // framework can capture it.
    print!("{}", String::from_utf8_lossy(&out.stdout));
    print!("{}", String::from_utf8_lossy(&out.stderr));
}

pub fn assert_output_contains(out: &std::process::Output, text: &str) {
    let out = String::from_utf8_lossy(&out.stdout);
    if !out.contains(text) {
        panic!(
            "assertion failed; expected output to contain {:?} but got:\n{}",
            text, out
        );
    }
}

pub fn assert_output_not_contains(out: &std::process::Output, text: &str) {
    let out = String::from_utf8_lossy(&out.stdout);
    if out.contains(text) {
        panic!(
            "assertion failed; expected output to not contain {:?} but got:\n{}",
            text, out
        );
    }
}

/// The compiler concatenates its sources; one containing ERROR fails.
const COMPILE_TOOL: &str = r##"#!/bin/sh
out=
hdr=
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    -asmhdr) hdr="$2"; shift 2 ;;
    -pack) shift; break ;;
    *) shift ;;
  esac
done
if grep -q ERROR "$@"; then
  echo "syntax error" >&2
  exit 1
fi
mkdir -p "$(dirname "$out")"
cat "$@" > "$out"
if [ -n "$hdr" ]; then
  echo "#define FAST 1" > "$hdr"
fi
"##;

/// The assembler needs the header the compiler wrote into its include dir.
const ASM_TOOL: &str = r#"#!/bin/sh
out="$2"
inc="$4"
for src; do :; done
if [ ! -f "$inc/asm_defs.h" ]; then
  echo "$inc/asm_defs.h: no such file" >&2
  exit 1
fi
cat "$src" > "$out"
"#;

const PACK_TOOL: &str = r#"#!/bin/sh
shift
out="$1"
shift
cat "$@" >> "$out"
"#;

/// The linker prefixes its input so tests can tell binaries from archives.
const LINK_TOOL: &str = r#"#!/bin/sh
out="$2"
for input; do :; done
{ echo "binary"; cat "$input"; } > "$out"
"#;

/// Manages a temporary directory for invoking plinth.
pub struct TestSpace {
    dir: tempfile::TempDir,
}

impl TestSpace {
    /// A new space with the fake tools installed under `tools/`.
    pub fn new() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let space = TestSpace { dir };
        for (name, script) in [
            ("compile", COMPILE_TOOL),
            ("asm", ASM_TOOL),
            ("pack", PACK_TOOL),
            ("link", LINK_TOOL),
        ] {
            let path = space.path(&format!("tools/{}", name));
            space.write_raw(&path, script)?;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
        }
        Ok(space)
    }

    pub fn path(&self, rel: &str) -> std::path::PathBuf {
        self.dir.path().join(rel)
    }

    fn write_raw(&self, path: &Path, content: &str) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
    }

    /// Write a file into the working space.  Its mtime is set a minute in
    /// the past, so outputs built from it right away are strictly newer.
    pub fn write(&self, path: &str, content: &str) -> std::io::Result<()> {
        let path = self.path(path);
        self.write_raw(&path, content)?;
        let past = SystemTime::now() - Duration::from_secs(60);
        filetime::set_file_mtime(&path, filetime::FileTime::from_system_time(past))
    }

    /// Mark a file as modified after anything built so far.
    pub fn touch(&self, path: &str) -> std::io::Result<()> {
        let future = SystemTime::now() + Duration::from_secs(60);
        filetime::set_file_mtime(
            self.path(path),
            filetime::FileTime::from_system_time(future),
        )
    }

    /// Read a file from the working space.
    pub fn read(&self, path: &str) -> std::io::Result<String> {
        std::fs::read_to_string(self.path(path))
    }

    /// Invoke plinth, returning process output.
    pub fn run(&self, cmd: &mut std::process::Command) -> std::io::Result<std::process::Output> {
        cmd.current_dir(self.dir.path()).output()
    }

    /// Like run, but also print output if the build failed.
    pub fn run_expect(
        &self,
        cmd: &mut std::process::Command,
    ) -> anyhow::Result<std::process::Output> {
        let out = self.run(cmd)?;
        if !out.status.success() {
            print_output(&out);
            anyhow::bail!("build failed, status {}", out.status);
        }
        Ok(out)
    }

    /// Persist the temp dir locally and abort the test.  Debugging helper.
    #[allow(dead_code)]
    pub fn eject(self) -> ! {
        panic!("ejected at {:?}", self.dir.into_path());
    }
}

/// An entry unit importing a library with one low-level source.
pub const APP_MANIFEST: &str = "
unit example.com/lib
  dir = lib
  srcs = lib.go
  asm = fast.s
  imports = unsafe

unit example.com/cmd/app
  dir = cmd/app
  srcs = main.go
  imports = example.com/lib
  entry = true

unit unsafe
  synthetic = true
";

pub fn write_app(space: &TestSpace) -> anyhow::Result<()> {
    space.write("units.plinth", APP_MANIFEST)?;
    space.write("lib/lib.go", "lib\n")?;
    space.write("lib/fast.s", "fast\n")?;
    space.write("cmd/app/main.go", "main\n")?;
    Ok(())
}
