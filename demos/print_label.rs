//! Print a pre-rendered raster file on the nearest TEPRA Lite printer
//!
//! Run with: cargo run --example print_label -- <raster.bin> [depth]
//!
//! The file must already be in the printer's 1-bit column format and its
//! length a multiple of 16 bytes.

use std::time::Duration;
use tepra_lite_ble::{PrinterConfig, Result, TepraPrinter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tepra_lite_ble=debug".parse().unwrap()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        usage();
    };
    let depth: i32 = match args.next() {
        Some(d) => d.parse().unwrap_or_else(|_| usage()),
        None => 0,
    };

    let raster = std::fs::read(&path).unwrap_or_else(|e| {
        eprintln!("failed to read {}: {}", path, e);
        std::process::exit(1);
    });

    println!("Printing {} ({} bytes) at depth {}", path, raster.len(), depth);
    println!("Make sure the printer is switched on!\n");

    let config = PrinterConfig::default().with_scan_window(Duration::from_secs(30));
    let printer = TepraPrinter::with_config(config);

    let outcome = printer.print_outcome(depth, &raster).await;
    if outcome.success {
        println!("Done!");
    } else {
        println!("Failed to print: {}", outcome.reason);
        std::process::exit(1);
    }

    Ok(())
}

fn usage() -> ! {
    eprintln!("usage: print_label <raster.bin> [depth -3..=3]");
    std::process::exit(2);
}
