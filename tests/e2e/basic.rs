use crate::*;

#[test]
fn empty_manifest() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("units.plinth", "# nothing here\n")?;
    let out = space.run_expect(&mut plinth_command(vec![]))?;
    assert_eq!(std::str::from_utf8(&out.stdout)?, "plinth: no work to do\n");
    Ok(())
}

#[test]
fn basic_build() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    write_app(&space)?;

    let out = space.run_expect(&mut plinth_command(vec![]))?;
    assert_output_contains(&out, "assemble example.com/lib");
    assert_output_contains(&out, "link example.com/cmd/app");
    assert_output_contains(&out, "plinth: compiled 2 units, linked 1 binaries");

    assert_eq!(space.read("bin/app")?, "binary\nmain\n");
    assert_eq!(space.read(".plinth/pkg/example.com/lib.a")?, "lib\nfast\n");
    assert_eq!(space.read(".plinth/pkg/example.com/cmd/app.a")?, "main\n");

    let out = space.run_expect(&mut plinth_command(vec![]))?;
    assert_eq!(std::str::from_utf8(&out.stdout)?, "plinth: no work to do\n");
    Ok(())
}

#[test]
fn touched_dependency_rebuilds_dependents() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    write_app(&space)?;
    space.run_expect(&mut plinth_command(vec![]))?;

    space.touch("cmd/app/main.go")?;
    let out = space.run_expect(&mut plinth_command(vec![]))?;
    assert_output_contains(&out, "plinth: compiled 1 units, linked 1 binaries");
    assert_output_not_contains(&out, "example.com/lib");

    space.write("lib/lib.go", "lib v2\n")?;
    space.touch("lib/lib.go")?;
    let out = space.run_expect(&mut plinth_command(vec![]))?;
    assert_output_contains(&out, "plinth: compiled 2 units, linked 1 binaries");
    assert_eq!(space.read(".plinth/pkg/example.com/lib.a")?, "lib v2\nfast\n");
    Ok(())
}

#[test]
fn explain_and_verbose() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    write_app(&space)?;

    let out = space.run_expect(&mut plinth_command(vec!["-d", "explain", "-v"]))?;
    assert_output_contains(&out, "explain: example.com/lib is stale: ");
    assert_output_contains(&out, "lib.a is missing");
    assert_output_contains(&out, "explain: example.com/cmd/app is stale: ");
    assert_output_contains(&out, "/tools/compile -p example.com/lib -o ");
    assert_output_contains(&out, "-buildmode exe");

    let out = space.run_expect(&mut plinth_command(vec!["-d", "explain", "--force"]))?;
    assert_output_contains(&out, "explain: example.com/lib is stale: build forced");
    Ok(())
}

#[test]
fn named_target() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    write_app(&space)?;

    let out = space.run_expect(&mut plinth_command(vec!["example.com/lib"]))?;
    assert_output_contains(&out, "plinth: compiled 1 units, linked 0 binaries");
    assert!(space.read("bin/app").is_err());
    Ok(())
}

#[test]
fn tags_and_race() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    write_app(&space)?;

    space.run_expect(&mut plinth_command(vec!["--race", "--tag", "netgo"]))?;
    assert_eq!(space.read("bin/app-netgo")?, "binary\nmain\n");
    let race_root = format!(
        ".plinth/pkg/{}_{}_race",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    assert!(space
        .path(&format!("{}/example.com/lib.a", race_root))
        .exists());
    assert!(!space.path(".plinth/pkg/example.com/lib.a").exists());
    Ok(())
}

#[test]
fn chdir_and_manifest_name() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write(
        "proj/other.plinth",
        "unit hello\n  dir = src\n  srcs = hello.go\n  entry = true\n",
    )?;
    space.write("proj/src/hello.go", "hi\n")?;

    space.run_expect(&mut plinth_command(vec![
        "-C",
        "proj",
        "-f",
        "other.plinth",
        "--tooldir",
        "../tools",
    ]))?;
    assert_eq!(space.read("proj/bin/hello")?, "binary\nhi\n");
    Ok(())
}

#[test]
fn binary_beside_same_named_dir() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write(
        "units.plinth",
        "unit tool\n  dir = tool\n  srcs = tool.go\n  entry = true\n",
    )?;
    space.write("tool/tool.go", "tool\n")?;

    space.run_expect(&mut plinth_command(vec![]))?;
    assert_eq!(space.read("bin/tool")?, "binary\ntool\n");
    assert_eq!(space.read("tool/tool.go")?, "tool\n");
    Ok(())
}
