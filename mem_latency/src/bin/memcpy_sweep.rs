use mem_latency::sweep::{sweep_configurations, SizeSweepProfiler};
use std::env;
use std::process;
use timing_utils::alloc::lock_process_memory;
use timing_utils::source::HardwareTiming;

fn main() {
    // A first argument matching one of the predefined exponents restricts
    // the sweep to that size; anything else runs the full sweep.
    let selector = env::args().nth(1).and_then(|arg| arg.parse::<u32>().ok());

    match lock_process_memory() {
        Ok(()) => println!("mlockall OK"),
        Err(errno) => eprintln!(
            "warning: mlockall failed: {} (results may carry paging noise)",
            errno
        ),
    }

    let configurations = sweep_configurations(selector);
    let mut source = HardwareTiming;
    let mut profiler = SizeSweepProfiler::new(&mut source, ".");
    match profiler.run(&configurations) {
        Ok(outcomes) => {
            for outcome in &outcomes {
                println!("Wrote per-trial CSV: {}", outcome.artifact.display());
            }
        }
        Err(error) => {
            eprintln!("size sweep aborted: {}", error);
            process::exit(1);
        }
    }
}
