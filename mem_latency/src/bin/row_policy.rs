use mem_latency::row_policy::{RowPolicyConfig, RowPolicyProbe};
use std::env;
use std::process;
use timing_utils::alloc::lock_process_memory;
use timing_utils::source::HardwareTiming;

fn main() {
    // Optional first argument overrides the open-row classification
    // threshold, a calibration constant rather than a law.
    let threshold = env::args().nth(1).and_then(|arg| arg.parse::<f64>().ok());

    let config = RowPolicyConfig {
        open_row_threshold: threshold.unwrap_or(RowPolicyConfig::default().open_row_threshold),
        ..RowPolicyConfig::default()
    };

    println!(
        "Testing DRAM row buffer policy (row size: {} bytes)",
        config.row_size
    );

    match lock_process_memory() {
        Ok(()) => println!("mlockall OK"),
        Err(errno) => eprintln!(
            "warning: mlockall failed: {} (results may carry paging noise)",
            errno
        ),
    }

    println!("Performing {} test iterations...", config.iterations);

    let mut source = HardwareTiming;
    match RowPolicyProbe::new(&mut source, config).run() {
        Ok(report) => {
            println!("\n=== RESULTS ===");
            println!("{}", report);
        }
        Err(error) => {
            eprintln!("row policy probe aborted: {}", error);
            process::exit(1);
        }
    }
}
