//! Tests for how failing builds and bad inputs are reported.

use crate::*;

#[test]
fn compile_error() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    write_app(&space)?;
    space.write("lib/lib.go", "ERROR\n")?;

    let out = space.run(&mut plinth_command(vec![]))?;
    assert!(!out.status.success());
    assert_output_contains(&out, "failed: compile example.com/lib: compile failed:");
    assert_output_contains(&out, "syntax error");
    assert_output_not_contains(&out, "compile example.com/cmd/app");
    assert_output_not_contains(&out, "plinth: compiled");
    assert!(space.read("bin/app").is_err());
    Ok(())
}

#[test]
fn keep_going() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write(
        "units.plinth",
        "
unit bad
  dir = bad
  srcs = bad.go
  entry = true
unit good
  dir = good
  srcs = good.go
  entry = true
",
    )?;
    space.write("bad/bad.go", "ERROR\n")?;
    space.write("good/good.go", "good\n")?;

    let out = space.run(&mut plinth_command(vec![]))?;
    assert!(!out.status.success());
    assert!(space.read("bin/good").is_err());

    let out = space.run(&mut plinth_command(vec!["-k", "0"]))?;
    assert!(!out.status.success());
    assert_output_contains(&out, "failed: compile bad");
    assert_eq!(space.read("bin/good")?, "binary\ngood\n");
    Ok(())
}

#[test]
fn manifest_errors() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("units.plinth", "unit a\n  colour = red\n")?;
    let out = space.run(&mut plinth_command(vec![]))?;
    assert!(!out.status.success());
    assert_output_contains(&out, "plinth: error: parse error: unknown property \"colour\"");
    assert_output_contains(&out, "units.plinth:2:");

    space.write(
        "units.plinth",
        "unit a\n  dir = a\n  srcs = a.go\n  imports = b\n",
    )?;
    let out = space.run(&mut plinth_command(vec![]))?;
    assert_output_contains(&out, "unit \"a\" imports \"b\", which is not loaded");

    let out = space.run(&mut plinth_command(vec!["nope"]))?;
    assert_output_contains(&out, "unknown unit requested: \"nope\"");
    Ok(())
}

#[test]
fn missing_manifest() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    let out = space.run(&mut plinth_command(vec![]))?;
    assert!(!out.status.success());
    assert_output_contains(&out, "plinth: error: read units.plinth:");
    Ok(())
}
