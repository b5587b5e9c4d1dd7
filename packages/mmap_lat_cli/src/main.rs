//! Binary entry point for the map/unmap latency benchmark.
//!
//! This module is excluded from mutation testing because testing process entry/exit behavior
//! is impractical - it requires spawning subprocesses and checking exit codes.

use std::num::NonZero;
use std::process::ExitCode;

use argh::FromArgs;
use mmap_lat::{MapOptions, RunConfig, execute};

/// Measures the latency of mapping and unmapping anonymous memory, in processor cycles.
#[derive(FromArgs)]
struct Args {
    /// total amount of memory to map, in GiB
    #[argh(positional)]
    size_gib: Option<u64>,

    /// total amount of memory to map, in bytes (overrides the positional GiB size)
    #[argh(option)]
    size_bytes: Option<u64>,

    /// number of worker threads per phase (default 1)
    #[argh(option, default = "1")]
    threads: usize,

    /// number of map operations each thread performs (default 1)
    #[argh(option, default = "1")]
    ops: usize,

    /// request huge-page backing for every region
    #[argh(switch)]
    huge: bool,

    /// do not pre-populate page tables when mapping
    #[argh(switch)]
    no_populate: bool,
}

// Binary entry point - mutations would require subprocess testing which is impractical.
#[cfg_attr(test, mutants::skip)]
fn main() -> ExitCode {
    let args: Args = argh::from_env();

    let config = match config_from_args(&args) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    match execute(&config) {
        Ok(report) => {
            println!("Allocation done in {} cycles", report.map.total_cycles);

            if report.map.ops_failed > 0 {
                println!("WARNING: {} map operations failed", report.map.ops_failed);
            }

            println!("Unmap done in {} cycles", report.unmap.total_cycles);

            if report.unmap.ops_failed > 0 {
                println!(
                    "WARNING: {} unmap operations failed",
                    report.unmap.ops_failed
                );
            }

            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

/// Translates the raw command-line arguments into a validated run
/// configuration, with a printable message for every way they can be wrong.
fn config_from_args(args: &Args) -> Result<RunConfig, String> {
    let total_bytes = match (args.size_bytes, args.size_gib) {
        (Some(bytes), _) => bytes,
        (None, Some(gib)) => gib
            .checked_mul(1 << 30)
            .ok_or_else(|| format!("Size of {gib} GiB does not fit into the address space."))?,
        (None, None) => return Err("Missing size in GiB.".to_string()),
    };

    let total_bytes = usize::try_from(total_bytes)
        .ok()
        .and_then(NonZero::new)
        .ok_or_else(|| format!("Total size of {total_bytes} bytes is not usable."))?;

    let thread_count = NonZero::new(args.threads)
        .ok_or_else(|| "Thread count must be at least 1.".to_string())?;

    let ops_per_thread = NonZero::new(args.ops)
        .ok_or_else(|| "Operation count must be at least 1.".to_string())?;

    Ok(RunConfig {
        total_bytes,
        ops_per_thread,
        thread_count,
        map_options: MapOptions {
            populate: !args.no_populate,
            huge_pages: args.huge,
        },
    })
}
