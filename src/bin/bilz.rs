//! bilz CLI - bicriteria LZ77 compression tool
//!
//! Compresses files under a decompression-time (or size) budget,
//! decompresses them, and exposes the plain bit-optimal compressor.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};

use bilz::bicriteria::{parse_bounds, parse_levels, Bound};
use bilz::encoders::{lookup, names};
use bilz::error::Error;
use bilz::fsg::{self, get_kind, suggest_gen, BucketFsg, GENERATORS};
use bilz::meter::{Progress, Silent, StderrMeter};
use bilz::model::{get_weight_model, read_model, CostModel};
use bilz::parsing::{check_correctness, parsing_length, write_parsing_sized};
use bilz::text::Text;

/// Bicriteria LZ77 compression: smallest output under a
/// decompression-time budget.
#[derive(Parser, Debug)]
#[command(name = "bilz")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bicriteria compression against a target machine model.
    Compress {
        /// File to be compressed.
        #[arg(short, long, value_name = "INPUT")]
        input: PathBuf,

        /// Encoder name (see `encoders`).
        #[arg(short, long)]
        encoder: String,

        /// Target machine model (reads `<target>.tgt`).
        #[arg(short, long)]
        target: String,

        /// Comma-separated bounds, unit-suffixed: m(ms), s(sec),
        /// K(KiB), M(MiB).
        #[arg(short, long)]
        bound: Option<String>,

        /// Comma-separated relative levels in [0,1], suffixed s or t.
        #[arg(short, long)]
        level: Option<String>,

        /// Check that the parsing reproduces the input.
        #[arg(short, long)]
        check: bool,

        /// Print a progress meter to stderr.
        #[arg(short = 'z', long)]
        progress: bool,
    },

    /// Plain bit-optimal compression (no time bound).
    BitOptimal {
        /// File to be compressed.
        #[arg(short, long, value_name = "INPUT")]
        input: PathBuf,

        /// Output file.
        #[arg(short, long, value_name = "OUTPUT")]
        output: PathBuf,

        /// Encoder name (see `encoders`).
        #[arg(short, long, conflicts_with = "model")]
        encoder: Option<String>,

        /// Cost model file (alternative to an encoder's model).
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Generator name (see `gens`); picked automatically when
        /// absent.
        #[arg(short, long)]
        generator: Option<String>,

        /// Parse in buckets of this many MiB.
        #[arg(short, long, default_value = "0")]
        bucket: usize,

        /// Check that the parsing reproduces the input.
        #[arg(short, long)]
        check: bool,

        /// Print the parsing to stdout.
        #[arg(short, long)]
        print_sol: bool,

        /// Print a progress meter to stderr.
        #[arg(short = 'z', long)]
        progress: bool,
    },

    /// Decompress a compressed file.
    Decompress {
        /// Compressed input file.
        input: PathBuf,
        /// Decompressed output file.
        output: PathBuf,
    },

    /// List the available encoders.
    Encoders,

    /// List the available generators.
    Gens,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    match args.command {
        Command::Compress {
            input,
            encoder,
            target,
            bound,
            level,
            check,
            progress,
        } => cmd_compress(input, encoder, target, bound, level, check, progress),
        Command::BitOptimal {
            input,
            output,
            encoder,
            model,
            generator,
            bucket,
            check,
            print_sol,
            progress,
        } => cmd_bit_optimal(
            input, output, encoder, model, generator, bucket, check, print_sol, progress,
        ),
        Command::Decompress { input, output } => cmd_decompress(input, output),
        Command::Encoders => {
            for name in names() {
                println!("{}", name);
            }
            Ok(())
        }
        Command::Gens => {
            for name in GENERATORS {
                println!("{}", name);
            }
            Ok(())
        }
    }
}

fn read_input(path: &PathBuf) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let data = fs::read(path)?;
    if data.is_empty() {
        return Err(Box::new(Error::InvalidInput(
            "cowardly refusing to run on an empty file".into(),
        )));
    }
    Ok(data)
}

fn cmd_compress(
    input: PathBuf,
    encoder: String,
    target: String,
    bound: Option<String>,
    level: Option<String>,
    check: bool,
    progress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut bounds: Vec<Bound> = Vec::new();
    if let Some(spec) = bound {
        bounds.extend(parse_bounds(&spec)?);
    }
    if let Some(spec) = level {
        bounds.extend(parse_levels(&spec)?);
    }
    if bounds.is_empty() {
        return Err(Box::new(Error::InvalidInput(
            "no bounds specified".into(),
        )));
    }

    let data = read_input(&input)?;
    let time_cm = get_weight_model(&target, &encoder)?;

    for bound in &bounds {
        let start = Instant::now();
        let out = bilz::api::bicriteria_compress(&encoder, &data, &time_cm, bound, check, progress)?;
        let elapsed = start.elapsed();

        let file_name = format!(
            "{}#{}#{}.lzo",
            input.display(),
            encoder,
            out.bound_label
        );
        fs::write(&file_name, &out.file.data[..out.file.total_size])?;

        println!("Length = {} bits", out.space as u64);
        println!("Time = {} msec", (out.time / 1e6) as u64);
        println!("Compression time = {:.2?}", elapsed);
        println!(
            "Compressed size = {} ({:.1}% of input)",
            format_size(out.file.parsing_size as u64),
            100.0 * out.file.parsing_size as f64 / data.len() as f64
        );
        println!("Output: {}", file_name);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_bit_optimal(
    input: PathBuf,
    output: PathBuf,
    encoder: Option<String>,
    model: Option<PathBuf>,
    generator: Option<String>,
    bucket: usize,
    check: bool,
    print_sol: bool,
    progress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = read_input(&input)?;

    let (enc_name, cm, lit_win) = match (&encoder, &model) {
        (Some(name), None) => {
            let enc = lookup(name)?;
            (name.clone(), enc.cost_model(), enc.literal_window() as usize)
        }
        (None, Some(path)) => {
            // The widest literal window among the registered encoders,
            // so any model-file window fits.
            let (cm, win) = read_model(path)?;
            ("hybrid-32".to_string(), cm, win as usize)
        }
        _ => {
            return Err(Box::new(Error::InvalidInput(
                "exactly one of --encoder and --model is required".into(),
            )))
        }
    };
    let lit_win = lit_win.min(1 << 24).max(1);

    let gen_name: &'static str = match &generator {
        Some(name) => GENERATORS
            .iter()
            .find(|&&g| g == name.as_str())
            .copied()
            .ok_or_else(|| Error::InvalidInput(format!("no generator named \"{}\"", name)))?,
        None => suggest_gen(get_kind(cm.dst())?),
    };

    println!("Encoder: {}", enc_name);
    println!("Generator: {}", gen_name);

    let text = Text::new(data.clone());
    let start = Instant::now();
    let (solution, cost) = parse_once(&text, &cm, gen_name, bucket, lit_win, progress)?;
    let elapsed = start.elapsed();
    println!("Compression time: {:.2?}", elapsed);

    if check {
        check_correctness(&solution, &data)?;
    }
    println!("Cost: {}", cost as u64);
    if print_sol {
        print_solution(&solution, &cm);
    }

    let enc = lookup(&enc_name)?;
    let bits = parsing_length(&solution, &enc.cost_model()).ceil() as usize;
    let file = write_parsing_sized(&solution, &text, &enc, bits);
    fs::write(&output, &file.data[..file.total_size])?;
    println!(
        "Compressed size = {}",
        format_size(file.parsing_size as u64)
    );
    Ok(())
}

/// Parse with the chosen generator; a ladder mismatch is retried once
/// with the suggested generator.
fn parse_once(
    text: &Text,
    cm: &CostModel,
    gen_name: &'static str,
    bucket_mib: usize,
    lit_win: usize,
    progress: bool,
) -> Result<(Vec<bilz::Edge>, f64), Box<dyn std::error::Error>> {
    let mut meter: Box<dyn Progress> = if progress {
        Box::new(StderrMeter::new(text.len()))
    } else {
        Box::new(Silent)
    };

    let attempt = |name: &'static str,
                   meter: &mut dyn Progress|
     -> Result<(Vec<bilz::Edge>, f64), Error> {
        if bucket_mib > 0 {
            let mut fsg = BucketFsg::new(text.clone(), bucket_mib << 20, cm, name)?;
            Ok(bilz::parser::parse(&mut fsg, lit_win, cm, meter))
        } else {
            let mut fsg = fsg::instantiate(name, text, cm)?;
            Ok(bilz::parser::parse(fsg.as_mut(), lit_win, cm, meter))
        }
    };

    match attempt(gen_name, meter.as_mut()) {
        Ok(res) => Ok(res),
        Err(Error::GeneratorMismatch { suggested, .. }) => {
            eprintln!(
                "generator \"{}\" cannot serve this ladder, retrying with \"{}\"",
                gen_name, suggested
            );
            Ok(attempt(suggested, meter.as_mut())?)
        }
        Err(e) => Err(Box::new(e)),
    }
}

fn print_solution(sol: &[bilz::Edge], cm: &CostModel) {
    println!("Distance\tLength\tEnding Cost\tEnding Position");
    let mut pos = 0usize;
    let mut cost = 0.0f64;
    while pos + 1 < sol.len() {
        let e = sol[pos];
        cost += cm.edge_cost(&e);
        if e.is_literal() {
            println!("L\t{}\t{}\t{}", e.ell, cost as u64, pos + e.ell as usize);
        } else {
            println!(
                "{}\t{}\t{}\t{}",
                e.d,
                e.ell,
                cost as u64,
                pos + e.ell as usize
            );
        }
        pos += e.ell as usize;
    }
}

fn cmd_decompress(input: PathBuf, output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(&input)?;
    let start = Instant::now();
    let out = bilz::decompress(&data)?;
    let elapsed = start.elapsed();
    fs::write(&output, &out)?;
    println!(
        "{} -> {} in {:.2?}",
        format_size(data.len() as u64),
        format_size(out.len() as u64),
        elapsed
    );
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
