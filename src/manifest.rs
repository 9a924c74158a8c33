//! Unit manifest loading: parses a units file and produces the unit list the
//! graph builder consumes.
//!
//! ```text
//! # comment
//! pin example.com/vendored tag=v1.2.0
//! unit example.com/app
//!   dir = cmd/app
//!   srcs = main.go
//!   imports = example.com/lib unsafe
//!   entry = true
//! ```

use crate::depcache::{Pin, Registry};
use crate::scanner::{ParseResult, Scanner};
use crate::trace;
use crate::unit::{resolve_dir, Unit};
use anyhow::{anyhow, bail};
use std::path::{Path, PathBuf};

/// Default manifest file name.
pub const DEFAULT_FILENAME: &str = "units.plinth";

/// A loaded manifest.
#[derive(Debug)]
pub struct Manifest {
    pub units: Vec<Unit>,
    pub registry: Registry,
}

/// A unit as written, before its directory is resolved.
struct Decl {
    unit: Unit,
    dir: Option<String>,
    line: usize,
}

struct Parser<'a> {
    scanner: Scanner<'a>,
    decls: Vec<Decl>,
    pins: Vec<Pin>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Parser {
            scanner: Scanner::new(text),
            decls: Vec::new(),
            pins: Vec::new(),
        }
    }

    fn parse(&mut self) -> ParseResult<()> {
        loop {
            let indent = self.scanner.skip_spaces();
            if self.scanner.at_end() {
                return Ok(());
            }
            if self.scanner.peek_newline() || self.scanner.peek() == '#' {
                self.scanner.skip_line();
                continue;
            }
            if indent > 0 {
                self.read_property()?;
                continue;
            }
            let start = self.scanner.ofs;
            match self.scanner.read_word() {
                "unit" => self.read_unit()?,
                "pin" => self.read_pin()?,
                "" => return self.scanner.parse_error("expected keyword"),
                word => {
                    return self
                        .scanner
                        .parse_error_at(start, format!("unknown keyword {:?}", word))
                }
            }
        }
    }

    fn read_ident(&mut self, what: &str) -> ParseResult<&'a str> {
        self.scanner.skip_spaces();
        let word = self.scanner.read_word();
        if word.is_empty() {
            return self.scanner.parse_error(format!("expected {}", what));
        }
        Ok(word)
    }

    fn expect_eol(&mut self) -> ParseResult<()> {
        self.scanner.skip_spaces();
        let ofs = self.scanner.ofs;
        if !self.scanner.read_eol().is_empty() {
            return self.scanner.parse_error_at(ofs, "expected end of line");
        }
        Ok(())
    }

    fn read_unit(&mut self) -> ParseResult<()> {
        let line = self.scanner.line;
        let identity = self.read_ident("unit identity")?;
        self.expect_eol()?;
        self.decls.push(Decl {
            unit: Unit {
                identity: identity.to_string(),
                ..Default::default()
            },
            dir: None,
            line,
        });
        Ok(())
    }

    fn read_pin(&mut self) -> ParseResult<()> {
        let prefix = self.read_ident("pin prefix")?;
        let kind = self.read_ident("pin kind")?;
        self.scanner.expect('=')?;
        let value = self.scanner.read_word();
        if value.is_empty() {
            return self.scanner.parse_error("expected pin value");
        }
        self.expect_eol()?;
        self.pins.push(Pin::new(prefix, kind, value));
        Ok(())
    }

    fn read_property(&mut self) -> ParseResult<()> {
        let start = self.scanner.ofs;
        let key = self.scanner.read_word();
        let decl = match self.decls.last_mut() {
            Some(decl) => decl,
            None => {
                return self
                    .scanner
                    .parse_error_at(start, "property outside of a unit")
            }
        };
        self.scanner.skip_spaces();
        self.scanner.expect('=')?;
        self.scanner.skip_spaces();
        let value_ofs = self.scanner.ofs;
        let value = self.scanner.read_eol();
        let list = || value.split_whitespace().map(str::to_string).collect();
        let flag = |scanner: &Scanner| match value {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => scanner.parse_error_at(
                value_ofs,
                format!("expected true or false, got {:?}", value),
            ),
        };
        match key {
            "dir" => decl.dir = Some(value.to_string()),
            "srcs" => decl.unit.srcs = list(),
            "asm" => decl.unit.asm_srcs = list(),
            "imports" => decl.unit.imports = list(),
            "entry" => decl.unit.entry = flag(&self.scanner)?,
            "synthetic" => decl.unit.synthetic = flag(&self.scanner)?,
            _ => {
                return self
                    .scanner
                    .parse_error_at(start, format!("unknown property {:?}", key))
            }
        }
        Ok(())
    }
}

/// Parses manifest `text` read from `path`.  Relative unit directories are
/// resolved against the manifest's directory; a unit without one is looked
/// up in the pins, whose trees live under `deps_root`.
pub fn parse(path: &Path, text: &str, deps_root: &Path) -> anyhow::Result<Manifest> {
    let mut parser = Parser::new(text);
    if let Err(err) = parser.parse() {
        bail!(parser.scanner.format_parse_error(path, err));
    }

    let mut registry = Registry::new(deps_root);
    for pin in parser.pins {
        registry.register(pin);
    }

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let mut units = Vec::with_capacity(parser.decls.len());
    for Decl {
        mut unit,
        dir,
        line,
    } in parser.decls
    {
        unit.dir = match dir {
            Some(dir) => resolve_dir(base, &dir),
            None if unit.synthetic => PathBuf::new(),
            None => registry.resolve(&unit.identity).ok_or_else(|| {
                anyhow!(
                    "{}:{}: unit {:?} has no dir and no pin covers it",
                    path.display(),
                    line,
                    unit.identity
                )
            })?,
        };
        units.push(unit);
    }
    Ok(Manifest { units, registry })
}

/// Reads and parses the manifest at `path`.
pub fn load(path: &Path, deps_root: &Path) -> anyhow::Result<Manifest> {
    let text = trace::scope("fs::read", || std::fs::read_to_string(path))
        .map_err(|err| anyhow!("read {}: {}", path.display(), err))?;
    trace::scope("manifest::parse", || parse(path, &text, deps_root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depcache::cache_dir;

    fn parse_ok(text: &str) -> Manifest {
        match parse(Path::new("proj/units.plinth"), text, Path::new("/deps")) {
            Ok(m) => m,
            Err(err) => panic!("{}", err),
        }
    }

    fn parse_err(text: &str) -> String {
        parse(Path::new("units.plinth"), text, Path::new("/deps"))
            .unwrap_err()
            .to_string()
    }

    #[test]
    fn units_and_properties() {
        let m = parse_ok(
            "# top comment\n\
             unit example.com/app  # trailing\n\
             \x20 dir = cmd/app\n\
             \x20 srcs = main.go util.go\n\
             \x20 asm = sys_amd64.s\n\
             \n\
             \x20 imports = example.com/lib unsafe\n\
             \x20 entry = true\n\
             unit example.com/lib\n\
             \x20 dir = /abs/lib\n\
             \x20 srcs = lib.go\n\
             unit unsafe\n\
             \x20 synthetic = true\n",
        );
        assert_eq!(m.units.len(), 3);
        let app = &m.units[0];
        assert_eq!(
            app,
            &Unit::new("example.com/app", "proj/cmd/app")
                .srcs(["main.go", "util.go"])
                .asm_srcs(["sys_amd64.s"])
                .imports(["example.com/lib", "unsafe"])
                .entry()
        );
        assert_eq!(m.units[1].dir, Path::new("/abs/lib"));
        assert!(m.units[2].synthetic);
        assert!(m.units[2].srcs.is_empty());
    }

    #[test]
    fn pinned_dirs() {
        let m = parse_ok(
            "pin example.com/vendored tag=v1.2.0\n\
             unit example.com/vendored/strs\n\
             \x20 srcs = strs.go\n",
        );
        assert_eq!(
            m.registry.pins(),
            &[Pin::new("example.com/vendored", "tag", "v1.2.0")]
        );
        assert_eq!(
            m.units[0].dir,
            cache_dir(Path::new("/deps"), "example.com/vendored", "tag", "v1.2.0")
                .join("example.com/vendored/strs")
        );
    }

    #[test]
    fn unpinned_unit_without_dir() {
        let err = parse_err("unit a\n  srcs = a.go\n");
        assert_eq!(
            err,
            "units.plinth:1: unit \"a\" has no dir and no pin covers it"
        );
    }

    #[test]
    fn syntax_errors() {
        assert!(parse_err("  dir = x\n").contains("property outside of a unit"));
        assert!(parse_err("unit a\n  color = red\n").contains("unknown property \"color\""));
        assert!(parse_err("unit a\n  entry = yes\n").contains("expected true or false"));
        assert!(parse_err("build a\n").contains("unknown keyword \"build\""));
        assert!(parse_err("unit\n").contains("expected unit identity"));
        assert!(parse_err("unit a b\n").contains("expected end of line"));
        assert!(parse_err("pin a tag\n").contains("expected '='"));

        let err = parse_err("unit a\n  srcs a.go\n");
        assert!(err.contains("units.plinth:2:"), "{}", err);
    }
}
