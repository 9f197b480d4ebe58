use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use aigsym::scenarios::{self, ADDRESS_BITS, TABLE_BASE, TRANSLATE};
use aigsym::validation::{self, CheckConfig, RandomOperandConfig};

// --- Command Line Arguments ---

#[derive(Parser)]
#[command(name = "aigsym")]
#[command(about = "aigsym - bit-precise symbolic execution over AIGs")]
#[command(version)]
#[command(subcommand_required = true)]
#[command(arg_required_else_help = true)]
struct Args {
    /// Verbose output (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run Euclid's algorithm on two bytes
    Gcd {
        #[arg(long, default_value_t = 12)]
        a: u8,
        #[arg(long, default_value_t = 8)]
        b: u8,
        /// Treat both operands as circuit inputs and evaluate at a and b
        #[arg(long)]
        symbolic: bool,
        /// Write the result circuit as binary AIGER
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Look a byte up in a substitution table held in symbolic memory
    Sbox {
        #[arg(long, default_value_t = 0)]
        index: u8,
        /// Treat the index as a circuit input and evaluate at the given value
        #[arg(long)]
        symbolic_index: bool,
    },
    /// Cross-check concrete and symbolic operations against a reference model
    Check {
        #[arg(long)]
        seed: Option<u64>,
        /// Random operand pairs per width
        #[arg(long)]
        samples: Option<usize>,
        /// Bit widths to check (default 1, 8, 32, 64, 128)
        #[arg(long = "width")]
        widths: Vec<usize>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn byte_assignment(values: &[u8]) -> Vec<bool> {
    values
        .iter()
        .flat_map(|&v| (0..8).map(move |i| (v >> i) & 1 == 1))
        .collect()
}

/// Value of `v`, evaluating the circuit only when it is not already constant
fn value_of(ms: &aigsym::MachineState, v: &aigsym::Vector, inputs: &[u8]) -> u128 {
    match v.to_u128() {
        Some(value) => value,
        None => ms.evaluate(v, &byte_assignment(inputs)),
    }
}

fn run_gcd(a: u8, b: u8, symbolic: bool, export: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let mut ms = scenarios::gcd_machine("gcd");
    let (va, vb) = if symbolic {
        (ms.new_symbolic("a", 8), ms.new_symbolic("b", 8))
    } else {
        (ms.constant(8, a as u64), ms.constant(8, b as u64))
    };
    let out = scenarios::gcd(&mut ms, &va, &vb);

    let value = value_of(&ms, &out, &[a, b]);
    println!("gcd({}, {}) = {}", a, b, value);
    if symbolic {
        println!("Circuit: {} nodes after {} collections", ms.node_count(), ms.gc_runs());
    }
    if let Some(path) = export {
        ms.mark_output(&out, "gcd");
        ms.export_aiger(&path)?;
        println!("Wrote {}", path.display());
    }

    for v in [out, vb, va] {
        ms.release(v);
    }
    let (leaks, diagnostics) = ms.destroy();
    if !leaks.is_clean() {
        tracing::warn!("leaked resources: {:?}", leaks);
    }
    if !diagnostics.events().is_empty() {
        println!("{} diagnostics", diagnostics.events().len());
    }
    Ok(())
}

fn run_sbox(index: u8, symbolic_index: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut ms = scenarios::table_machine("sbox");
    let base = ms.constant(ADDRESS_BITS, TABLE_BASE);
    scenarios::store_table(&mut ms, &base);
    let vi = if symbolic_index {
        ms.new_symbolic("index", 8)
    } else {
        ms.constant(8, index as u64)
    };
    let value = scenarios::table_lookup(&mut ms, &base, &vi);
    let got = value_of(&ms, &value, &[index]);
    println!("table[{}] = {} (expected {})", index, got, TRANSLATE[index as usize]);
    if symbolic_index {
        println!("Circuit: {} nodes", ms.node_count());
    }
    for v in [value, vi, base] {
        ms.release(v);
    }
    let (leaks, _) = ms.destroy();
    if !leaks.is_clean() {
        tracing::warn!("leaked resources: {:?}", leaks);
    }
    if got != TRANSLATE[index as usize] as u128 {
        return Err("table lookup returned the wrong entry".into());
    }
    Ok(())
}

fn run_check(seed: Option<u64>, samples: Option<usize>, widths: Vec<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CheckConfig::default();
    let defaults = RandomOperandConfig::default();
    config.operands = RandomOperandConfig {
        count: samples.unwrap_or(defaults.count),
        seed: seed.unwrap_or(defaults.seed),
    };
    if !widths.is_empty() {
        if let Some(&bad) = widths.iter().find(|&&w| w == 0 || w > 128) {
            return Err(format!("width {} outside 1..=128", bad).into());
        }
        config.widths = widths;
    }

    let report = validation::check(&config);
    println!("Checked {} results across widths {:?}", report.checks, config.widths);
    if report.passed() {
        println!("All operations agree");
        Ok(())
    } else {
        for mismatch in &report.mismatches {
            println!("  {}", mismatch);
        }
        Err(format!("{} mismatches", report.mismatches.len()).into())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Commands::Gcd {
            a,
            b,
            symbolic,
            export,
        } => run_gcd(a, b, symbolic, export),
        Commands::Sbox {
            index,
            symbolic_index,
        } => run_sbox(index, symbolic_index),
        Commands::Check {
            seed,
            samples,
            widths,
        } => run_check(seed, samples, widths),
    }
}
