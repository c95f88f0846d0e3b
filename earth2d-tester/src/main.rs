mod logic;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use earth2d_sim::{ReplayLog, SimConfig};
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use logic::{
    BatchConfig, EpisodeMetrics, Strategy, StrategyAggregate, aggregate, resolve_seed_inputs,
    run_batch, split_csv,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Markdown,
    Csv,
}

#[derive(Debug, Parser)]
#[command(name = "earth2d-tester", version)]
#[command(about = "Headless episode runner, strategy benchmark and replay verifier for Earth2D")]
struct Args {
    /// Simulation config (JSON); defaults apply to every omitted key
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seeds to run: comma-separated integers and ranges (`1..10`, `1..=10`)
    #[arg(long, default_value = "42")]
    seeds: String,

    /// Strategies to run (comma-separated: random, heuristic, rest, or all)
    #[arg(long, default_value = "heuristic")]
    strategy: String,

    /// Override `sim.max_steps` from the config
    #[arg(long)]
    max_steps: Option<u32>,

    /// Write one replay file per episode into this directory
    #[arg(long)]
    replay_dir: Option<PathBuf>,

    /// Re-simulate a saved replay and report the first divergence, then exit
    #[arg(long, value_name = "REPLAY")]
    verify: Option<PathBuf>,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Some(path) = &args.verify {
        return verify_replay(&args, path);
    }

    if args.report == ReportFormat::Console {
        announce_banner();
    }

    let start_time = Instant::now();
    let config = load_config(args.config.as_deref())?;
    let strategies = expand_strategies(&args.strategy)?;
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;

    let mut records: Vec<EpisodeMetrics> = Vec::new();
    for strategy in strategies {
        let batch = BatchConfig::new(config.clone(), strategy)
            .with_max_steps(args.max_steps)
            .with_replay_dir(args.replay_dir.clone());
        if args.verbose {
            println!(
                "▶ {} over {} seed(s)",
                strategy.label().bright_white().bold(),
                seeds.len()
            );
        }
        records.extend(run_batch(&batch, &seeds)?);
    }

    let aggregates = aggregate(&records);
    write_reports(&args, &records, &aggregates, start_time)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn announce_banner() {
    println!("{}", "🌍 Earth2D Episode Runner".bright_cyan().bold());
    println!("{}", "=========================".cyan());
}

fn load_config(path: Option<&Path>) -> Result<SimConfig> {
    match path {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(SimConfig::default()),
    }
}

fn expand_strategies(raw: &str) -> Result<Vec<Strategy>> {
    let mut strategies = Vec::new();
    for token in split_csv(raw) {
        let selected = if token.eq_ignore_ascii_case("all") {
            Strategy::ALL.to_vec()
        } else {
            match token.parse::<Strategy>() {
                Ok(strategy) => vec![strategy],
                Err(err) => bail!(err),
            }
        };
        for strategy in selected {
            if !strategies.contains(&strategy) {
                strategies.push(strategy);
            }
        }
    }
    if strategies.is_empty() {
        bail!("no strategy selected");
    }
    Ok(strategies)
}

fn verify_replay(args: &Args, path: &Path) -> Result<()> {
    let log = ReplayLog::load(path)
        .with_context(|| format!("failed to load replay {}", path.display()))?;
    let verified = log
        .verify()
        .with_context(|| format!("replay {} diverged", path.display()))?;
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(
        output_target,
        "{} {} ({} steps, seed {}, final status {})",
        "✅ Replay verified:".green().bold(),
        path.display(),
        verified.steps,
        log.header().seed,
        verified.status.label()
    )?;
    output_target.flush_inner()?;
    Ok(())
}

fn write_reports(
    args: &Args,
    records: &[EpisodeMetrics],
    aggregates: &[StrategyAggregate],
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;
    match args.report {
        ReportFormat::Json => {
            logic::reports::generate_json_report(output_target.writer(), records, aggregates)?;
        }
        ReportFormat::Markdown => {
            logic::reports::generate_markdown_report(output_target.writer(), records, aggregates)?;
        }
        ReportFormat::Csv => logic::reports::generate_csv_report(output_target.writer(), records)?,
        ReportFormat::Console => logic::reports::generate_console_report(
            output_target.writer(),
            records,
            aggregates,
            start_time.elapsed(),
        )?,
    }
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_expands_to_every_strategy() {
        assert_eq!(expand_strategies("all").unwrap(), Strategy::ALL.to_vec());
        assert_eq!(
            expand_strategies("rest, random").unwrap(),
            vec![Strategy::Rest, Strategy::Random]
        );
        assert!(expand_strategies("swarm").is_err());
        assert!(expand_strategies("").is_err());
    }

    #[test]
    fn args_parse_report_formats() {
        let args = Args::parse_from(["earth2d-tester", "--report", "csv", "--seeds", "1..3"]);
        assert_eq!(args.report, ReportFormat::Csv);
        assert_eq!(args.seeds, "1..3");
        assert!(Args::try_parse_from(["earth2d-tester", "--report", "xml"]).is_err());
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let missing = PathBuf::from("/no/such/earth2d.json");
        assert!(load_config(Some(missing.as_path())).is_err());
        assert_eq!(load_config(None).unwrap(), SimConfig::default());
    }
}
