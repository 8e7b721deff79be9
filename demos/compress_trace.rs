use std::env;
use std::fs;
use std::time::Duration;
use tracefold::{Compressor, Config, Sequence};
use tracing_subscriber::{fmt, EnvFilter};

/// Compresses a trace given inline or read from a file.
///
/// Usage: cargo run --example compress_trace <trace | @file> [k] [budget_secs]
///
/// Each character of the trace is one call. Set `RUST_LOG=tracefold=debug`
/// to follow the search.
fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tracefold=info"));
    fmt().with_env_filter(filter).with_target(false).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <trace | @file> [k] [budget_secs]", args[0]);
        std::process::exit(1);
    }

    let trace = match args[1].strip_prefix('@') {
        Some(path) => fs::read_to_string(path).unwrap_or_else(|_| {
            eprintln!("File \"{}\" not found.", path);
            std::process::exit(1);
        }),
        None => args[1].clone(),
    };
    let trace: String = trace.chars().filter(|c| !c.is_whitespace()).collect();

    let k = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(10);
    let budget = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(20);
    let config = match Config::new(k, 0.5, 0.5, 0.5) {
        Ok(config) => config.with_time_budget(Duration::from_secs(budget)),
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let mut compressor = Compressor::new(&config).unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(1);
    });
    let results = compressor
        .compress_sequence(&Sequence::from_trace(&trace))
        .unwrap_or_else(|e| {
            eprintln!("Compression failed: {e}");
            std::process::exit(1);
        });

    println!("=== Input ===");
    println!("{} ({} calls)\n", trace, trace.len());

    println!("=== Compressions ===");
    if results.is_empty() {
        println!("(none)");
    }
    for compression in results.compressions() {
        println!(
            "{:<40} tokens={} optional={} alignments={} merges={}",
            compression.text,
            compression.token_count,
            compression.optional_count,
            compression.alignment_count,
            compression.merge_count
        );
    }
    if results.timed_out() {
        println!("(time budget exhausted, results are partial)");
    }

    println!("\n=== Summary ===");
    println!("Candidate roots explored: {}", results.explored());
    println!("Elapsed: {:.2?}", results.elapsed());
    if let Some(best) = results.best() {
        let ratio = best.token_count as f64 / trace.len().max(1) as f64 * 100.0;
        println!("Best: {} ({:.1}% of input length)", best.text, ratio);
    }
}
