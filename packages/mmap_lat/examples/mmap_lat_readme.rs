//! Example code for the `README.md` file.
//!
//! This contains the same code that appears in the `mmap_lat` package `README.md`.

use mmap_lat::{MapOptions, RunConfig, execute};
use new_zealand::nz;

fn main() -> Result<(), mmap_lat::Error> {
    // Map 64 MiB in total: four threads, four operations each, 4 MiB per map.
    let config = RunConfig {
        total_bytes: nz!(64 * 1024 * 1024),
        ops_per_thread: nz!(4),
        thread_count: nz!(4),
        map_options: MapOptions::default(),
    };

    let report = execute(&config)?;

    println!("region size per operation: {} bytes", report.bytes_per_op);
    println!(
        "map phase:   {} cycles over {} operations",
        report.map.total_cycles, report.map.ops_attempted
    );
    println!(
        "unmap phase: {} cycles over {} operations",
        report.unmap.total_cycles, report.unmap.ops_attempted
    );

    Ok(())
}
