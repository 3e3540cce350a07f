//! Time label evaluation on a synthetic LGR.
//!
//! Usage:
//!   cargo run --release --bin bench_lgr                      # default sizes
//!   cargo run --release --bin bench_lgr -- --letters 12 --label-len 5
//!   cargo run --release --bin bench_lgr -- --labels 5000 --mixed-script

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;

use lgrcore::{AddOptions, EntryInput, Lgr, LgrConfig, TableDatabase, VariantInput};

#[derive(Parser)]
#[command(about = "Benchmark eligibility, enumeration and dispositions on a synthetic LGR.")]
struct Args {
    /// Letters in the repertoire, starting at U+0061
    #[arg(long, default_value_t = 6)]
    letters: u32,

    /// Size of each variant set (letters are grouped in sets of this size)
    #[arg(long, default_value_t = 3)]
    set_size: u32,

    /// Code points per label
    #[arg(long, default_value_t = 6)]
    label_len: usize,

    /// Labels for the batch disposition run
    #[arg(long, default_value_t = 1000)]
    labels: usize,

    /// Enable the mixed-script filter
    #[arg(long)]
    mixed_script: bool,

    /// Raise the enumeration cap
    #[arg(long, default_value_t = 1_000_000)]
    max_variants: u64,

    /// Print the LGR metadata and the disposition summary of the first label
    /// as JSON
    #[arg(long)]
    json: bool,
}

fn build_lgr(args: &Args) -> lgrcore::Result<Lgr> {
    let config = LgrConfig {
        max_variants: args.max_variants,
        ..LgrConfig::default()
    };
    let mut lgr = Lgr::with_config(Arc::new(TableDatabase::new()), config);
    let opts = AddOptions::default();
    let letters: Vec<u32> = (0x61..0x61 + args.letters.min(26)).collect();
    for &cp in &letters {
        lgr.add_cp(EntryInput::new(&[cp]), &opts)?;
    }
    for group in letters.chunks(args.set_size.max(1) as usize) {
        for &a in group {
            for &b in group {
                if a != b {
                    lgr.add_variant(&[a], VariantInput::new(&[b], Some("blocked")), &opts)?;
                }
            }
        }
    }
    Ok(lgr)
}

/// Deterministic labels cycling through the repertoire.
fn make_labels(args: &Args) -> Vec<Vec<u32>> {
    let letters = args.letters.clamp(1, 26);
    (0..args.labels)
        .map(|i| {
            (0..args.label_len)
                .map(|j| 0x61 + ((i * 7 + j * 3) as u32 % letters))
                .collect()
        })
        .collect()
}

fn run(args: &Args) -> lgrcore::Result<()> {
    let start = Instant::now();
    let lgr = build_lgr(args)?;
    println!(
        "build:        {:>8.1?}  ({} entries)",
        start.elapsed(),
        lgr.repertoire().len()
    );

    let labels = make_labels(args);
    let Some(sample) = labels.first() else {
        return Ok(());
    };

    let start = Instant::now();
    let estimate = lgr.estimate_variant_number(sample, args.mixed_script)?;
    let mut count = 0usize;
    for variant in lgr.generate_label_variants(sample, args.mixed_script) {
        variant?;
        count += 1;
    }
    println!(
        "enumerate:    {:>8.1?}  ({count} variants, estimate {estimate})",
        start.elapsed()
    );

    let start = Instant::now();
    for label in &labels {
        lgr.test_label_eligible(label)?;
    }
    println!("eligibility:  {:>8.1?}  ({} labels)", start.elapsed(), labels.len());

    let start = Instant::now();
    let results = lgr.compute_label_dispositions(&labels, false, args.mixed_script);
    let failed = results.iter().filter(|r| r.is_err()).count();
    let ok = || results.iter().filter_map(|r| r.as_ref().ok());
    let total: usize = ok().map(Vec::len).sum();
    let capped = ok().filter(|all| all.last().is_some_and(|d| d.capped)).count();
    println!(
        "dispositions: {:>8.1?}  ({total} dispositions, {failed} failed, {capped} capped)",
        start.elapsed()
    );

    let start = Instant::now();
    for label in &labels {
        lgr.generate_index_label(label)?;
    }
    println!("index label:  {:>8.1?}", start.elapsed());

    if args.json {
        let summary = lgr.compute_label_disposition_summary(sample, false, args.mixed_script)?;
        let report = serde_json::json!({
            "metadata": lgr.metadata().summary(),
            "disposition": summary,
        });
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(err) => eprintln!("error: {err}"),
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
