mod densemap;
pub mod depcache;
pub mod error;
pub mod fs;
pub mod graph;
pub mod manifest;
pub mod pipeline;
pub mod plan;
mod process;
pub mod progress;
pub mod run;
pub mod scanner;
pub mod stale;
pub mod toolchain;
pub mod trace;
pub mod unit;

#[cfg(not(any(windows, target_arch = "wasm32")))]
use jemallocator::Jemalloc;

#[cfg(not(any(windows, target_arch = "wasm32")))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;
