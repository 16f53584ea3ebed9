use clap::Parser;
use std::path::PathBuf;

use flowck::checker::{CheckError, CheckOptions};
use flowck::diag::{line_col, DiagnosticReport};
use flowck::pass::{descriptor, ALL_PASSES};
use flowck::types::StandardTypeRules;

#[derive(Debug, Clone, clap::ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Clone, clap::ValueEnum)]
enum EmitStage {
    /// Run the sanity checker
    Check,
    /// Print the parsed program and stop
    Dump,
}

#[derive(Parser, Debug)]
#[command(
    name = "flowck",
    version,
    about = "flowck: semantic sanity checker for streaming dataflow IR (.fir) programs"
)]
struct Cli {
    /// Input .fir source file
    #[arg(required_unless_present = "list_passes")]
    source: Option<PathBuf>,

    /// Diagnostic output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Check)]
    emit: EmitStage,

    /// Print, re-parse and compare the program before checking it
    #[arg(long)]
    self_test: bool,

    /// List the checker passes in execution order and exit
    #[arg(long)]
    list_passes: bool,

    /// Log each pass to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn list_passes(format: &Format) {
    match format {
        Format::Text => {
            for (i, pass) in ALL_PASSES.iter().enumerate() {
                let desc = descriptor(*pass);
                let codes: Vec<String> = desc.codes.iter().map(|c| c.to_string()).collect();
                println!(
                    "{}. {:<20} {} [{}]",
                    i + 1,
                    desc.name,
                    desc.scope,
                    codes.join(", ")
                );
            }
        }
        Format::Json => {
            let descriptors: Vec<_> = ALL_PASSES.iter().map(|&p| descriptor(p)).collect();
            match serde_json::to_string_pretty(&descriptors) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("flowck: error: {}", e);
                    std::process::exit(2);
                }
            }
        }
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("flowck: error: {}", e);
            std::process::exit(2);
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    if cli.list_passes {
        list_passes(&cli.format);
        return;
    }

    let Some(path) = cli.source.as_ref() else {
        eprintln!("flowck: error: no input file");
        std::process::exit(2);
    };
    let file = path.display().to_string();

    // ── Read and parse source ──
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("flowck: error: {}: {}", file, e);
            std::process::exit(2);
        }
    };

    let parse_result = flowck::parser::parse(&source);
    if !parse_result.errors.is_empty() {
        for err in &parse_result.errors {
            let (line, col) = line_col(&source, err.span().start);
            eprintln!("{}:{}:{}: parse error: {}", file, line, col, err);
        }
        std::process::exit(1);
    }
    let program = match parse_result.program {
        Some(p) => p,
        None => {
            eprintln!("flowck: parse failed with no output");
            std::process::exit(1);
        }
    };

    log::debug!(
        "parsed {} modules, {} functions",
        program.modules.len(),
        program.functions().count()
    );

    if let EmitStage::Dump = cli.emit {
        print!("{}", program);
        return;
    }

    // ── Check ──
    let options = CheckOptions {
        round_trip: cli.self_test,
    };
    match flowck::checker::check(&program, &StandardTypeRules, &options) {
        Ok(()) => match cli.format {
            Format::Text => eprintln!("flowck: {}: ok", file),
            Format::Json => print_json(&serde_json::json!({ "file": file, "accepted": true })),
        },
        Err(CheckError::Rejected(diag)) => {
            match cli.format {
                Format::Text => eprintln!("{}", diag.render(&file, &source)),
                Format::Json => print_json(&serde_json::json!({
                    "file": file,
                    "accepted": false,
                    "diagnostic": DiagnosticReport::new(&diag, &source),
                })),
            }
            std::process::exit(1);
        }
        Err(err @ CheckError::RoundTrip(_)) => {
            eprintln!("flowck: {}: {}", file, err);
            std::process::exit(1);
        }
    }
}
