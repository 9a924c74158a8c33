use anyhow::{anyhow, bail};
use argh::FromArgs;
use std::path::{Path, PathBuf};

use crate::fs::RealFileSystem;
use crate::graph::Graph;
use crate::plan::Plan;
use crate::progress::ConsoleProgress;
use crate::toolchain::CommandToolchain;
use crate::unit::Context;
use crate::{manifest, stale, trace};

/// plinth, an incremental build orchestrator.
#[derive(FromArgs)]
struct Opts {
    /// chdir before running
    #[argh(option, short = 'C')]
    chdir: Option<String>,

    /// input unit manifest [default=units.plinth]
    #[argh(option, short = 'f', default = "manifest::DEFAULT_FILENAME.to_string()")]
    file: String,

    /// keep going until at least N failures (0 means infinity) [default=1]
    #[argh(option, short = 'k', default = "1")]
    keep_going: usize,

    /// print executed command lines
    #[argh(switch, short = 'v')]
    verbose: bool,

    /// debugging tools, use -d list to list
    #[argh(option, short = 'd')]
    debug: Vec<String>,

    /// rebuild everything regardless of staleness
    #[argh(switch)]
    force: bool,

    /// build with the race detector
    #[argh(switch)]
    race: bool,

    /// build test binaries; nothing is installed
    #[argh(switch)]
    test: bool,

    /// build tag, may be repeated
    #[argh(option)]
    tag: Vec<String>,

    /// target operating system [default=host]
    #[argh(option)]
    os: Option<String>,

    /// target architecture [default=host]
    #[argh(option)]
    arch: Option<String>,

    /// directory holding the compile, asm, pack and link tools [default=tools]
    #[argh(option, default = "String::from(\"tools\")")]
    tooldir: String,

    /// extra flags for every compile, space separated
    #[argh(option, default = "String::new()")]
    gcflags: String,

    /// extra flags for every link, space separated
    #[argh(option, default = "String::new()")]
    ldflags: String,

    /// use DIR for intermediate objects and keep it afterwards
    #[argh(option)]
    work: Option<String>,

    /// units to build [default=all]
    #[argh(positional)]
    targets: Vec<String>,
}

fn split_flags(flags: &str) -> Vec<String> {
    flags.split_whitespace().map(str::to_string).collect()
}

/// Where intermediate objects go: a private temporary directory, removed
/// when the build ends, unless the user asked to keep one.
enum WorkDir {
    Temp(tempfile::TempDir),
    Kept(PathBuf),
}

impl WorkDir {
    fn path(&self) -> &Path {
        match self {
            WorkDir::Temp(dir) => dir.path(),
            WorkDir::Kept(path) => path,
        }
    }
}

fn run_impl() -> anyhow::Result<i32> {
    let opts: Opts = argh::from_env();

    let mut explain = false;
    for debug in &opts.debug {
        match debug.as_str() {
            "list" => {
                println!("debug tools:");
                println!("  explain  print why each unit is rebuilt");
                println!("  trace    generate json performance trace");
                return Ok(1);
            }
            "explain" => explain = true,
            "trace" => trace::open("trace.json")?,
            _ => bail!("unknown -d {:?}, use -d list to list", debug),
        }
    }

    if let Some(dir) = &opts.chdir {
        let dir = Path::new(dir);
        std::env::set_current_dir(dir).map_err(|err| anyhow!("chdir {:?}: {}", dir, err))?;
    }
    let root = std::env::current_dir()?;
    let state_dir = root.join(".plinth");

    let manifest = manifest::load(Path::new(&opts.file), &state_dir.join("deps"))?;

    let work = match &opts.work {
        Some(dir) => {
            let dir = root.join(dir);
            crate::fs::mkdir(&dir)?;
            WorkDir::Kept(dir)
        }
        None => WorkDir::Temp(
            tempfile::Builder::new()
                .prefix("plinth-work-")
                .tempdir()
                .map_err(|err| anyhow!("create work dir: {}", err))?,
        ),
    };

    let mut ctx = Context::new(work.path(), state_dir.join("pkg"), root.join("bin"))
        .with_progress(ConsoleProgress::new(opts.verbose, explain));
    if let Some(os) = &opts.os {
        ctx.os = os.clone();
    }
    if let Some(arch) = &opts.arch {
        ctx.arch = arch.clone();
    }
    ctx.force = opts.force;
    ctx.race = opts.race;
    ctx.test_scope = opts.test;
    ctx.tags = opts.tag.clone();
    ctx.compile_flags = split_flags(&opts.gcflags);
    ctx.link_flags = split_flags(&opts.ldflags);
    let ctx = ctx;

    let mut graph = trace::scope("graph::build", || {
        if opts.targets.is_empty() {
            Graph::build(&ctx, &manifest.units)
        } else {
            let names: Vec<&str> = opts.targets.iter().map(String::as_str).collect();
            Graph::build_roots(&ctx, &manifest.units, &names)
        }
    })?;
    trace::scope("stale::compute", || {
        stale::compute(&mut graph, &RealFileSystem::new())
    })?;
    let plan = trace::scope("Plan::new", || Plan::new(&graph));

    let toolchain = CommandToolchain::new(root.join(&opts.tooldir), &ctx);
    let report = match trace::scope("plan.run", || {
        plan.run(&graph, &toolchain, opts.keep_going)
    }) {
        Ok(report) => report,
        // Don't print any summary, the failing unit is enough info.
        Err(_) => return Ok(1),
    };

    if report.is_noop() {
        println!("plinth: no work to do");
    } else {
        println!(
            "plinth: compiled {} units, linked {} binaries",
            report.compiled, report.linked
        );
    }
    Ok(0)
}

pub fn run() -> anyhow::Result<i32> {
    let res = run_impl();
    trace::close()?;
    res
}
