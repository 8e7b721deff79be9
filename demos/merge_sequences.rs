use std::env;
use tracefold::linear::{parse, render};
use tracefold::{merge, CostMatrix};
use tracing_subscriber::{fmt, EnvFilter};

/// Aligns and merges two sequences written in bracket notation.
///
/// Usage: cargo run --example merge_sequences <left> <right>
///
/// Without arguments a few sample pairs are merged.
fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tracefold=info"));
    fmt().with_env_filter(filter).with_target(false).init();

    let args: Vec<String> = env::args().collect();
    let pairs: Vec<(String, String)> = match args.len() {
        3 => vec![(args[1].clone(), args[2].clone())],
        1 => [("[AB[C]]", "[[A]BC]"), ("A[C]", "AB"), ("A[B]", "[AB]"), ("[ABC]", "[AXC]")]
            .iter()
            .map(|(l, r)| (l.to_string(), r.to_string()))
            .collect(),
        _ => {
            eprintln!("Usage: {} <left> <right>", args[0]);
            std::process::exit(1);
        }
    };

    for (left, right) in pairs {
        let (left_seq, right_seq) = match (parse(&left), parse(&right)) {
            (Ok(l), Ok(r)) => (l, r),
            (Err(e), _) | (_, Err(e)) => {
                eprintln!("Cannot parse input: {e}");
                std::process::exit(1);
            }
        };

        let distance = CostMatrix::compute(&left_seq, &right_seq).distance();
        match merge(&left_seq, &right_seq) {
            Ok(outcome) => {
                println!("{} + {}", render(&left_seq), render(&right_seq));
                println!("  merged:        {}", outcome.render());
                println!("  distance:      {}", distance);
                println!("  alignments:    {}", outcome.alignments);
                println!("  new optionals: {}\n", outcome.new_optionals);
            }
            Err(e) => eprintln!("{} + {}: {e}", left, right),
        }
    }
}
