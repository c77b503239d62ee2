use anyhow::{Context, bail};
use benchlog::log::{self as logs, ParsedLog, RunRecord};
use benchlog::model::{self, BaselinePolicy, BestBy};
use benchlog::config::SizeSpec;
use benchlog::render::{self, OutputColumns, json::ThroughputReport};
use benchlog::{AnalysisConfig, Result, ValidatedConfig};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use std::io::Write;

#[derive(Parser)]
#[command(name = "benchlog")]
#[command(about = "Benchmark log parser and speedup calculator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse logs and export the raw run records.
    Records {
        #[command(flatten)]
        common: Common,
    },
    /// Derive speedup, efficiency and serial fraction per configuration.
    Derive {
        #[command(flatten)]
        common: Common,

        #[command(flatten)]
        baseline: BaselineArgs,
    },
    /// Pick the fastest configuration per group.
    Best {
        #[command(flatten)]
        common: Common,

        #[command(flatten)]
        baseline: BaselineArgs,

        #[arg(long, value_enum, default_value_t = ByArg::Policy)]
        by: ByArg,

        /// Tie-break order for policies, comma separated.
        #[arg(long, value_delimiter = ',')]
        policy_order: Vec<String>,
    },
    /// Parse a point-to-point throughput log.
    Throughput {
        #[arg(long)]
        log: String,

        #[arg(long)]
        config: Option<String>,

        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,

        #[arg(short = 'o', long)]
        out: Option<String>,
    },
}

#[derive(Args)]
struct Common {
    /// Benchmark log file; repeat for several.
    #[arg(long = "log", required = true)]
    logs: Vec<String>,

    /// Problem size of each log without a size column, one per --log, in order.
    #[arg(long = "size")]
    sizes: Vec<String>,

    /// Policy label for logs that carry no policy header.
    #[arg(long)]
    policy: Option<String>,

    #[arg(long)]
    config: Option<String>,

    #[arg(long, value_enum, default_value_t = Format::Csv)]
    format: Format,

    #[arg(short = 'o', long)]
    out: Option<String>,
}

#[derive(Args)]
struct BaselineArgs {
    /// same-policy or fixed-policy:<name>
    #[arg(long)]
    baseline: Option<BaselinePolicy>,

    #[arg(long)]
    baseline_threads: Option<u32>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum ByArg {
    Policy,
    Size,
}

impl From<ByArg> for BestBy {
    fn from(by: ByArg) -> Self {
        match by {
            ByArg::Policy => BestBy::Policy,
            ByArg::Size => BestBy::ProblemSize,
        }
    }
}

fn load_config(
    path: Option<&str>,
    policy: Option<&str>,
    baseline: Option<&BaselineArgs>,
) -> Result<ValidatedConfig> {
    let mut raw = match path {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    // Command-line flags win over the config file.
    if let Some(policy) = policy {
        raw.initial_policy = Some(policy.to_string());
    }
    if let Some(args) = baseline {
        if let Some(policy) = &args.baseline {
            raw.baseline = Some(policy.clone());
        }
        if let Some(threads) = args.baseline_threads {
            raw.baseline_threads = Some(threads);
        }
    }
    raw.validate_and_build()
}

/// Each log is parsed on its own so context never leaks between files.
fn parse_all(paths: &[String], sizes: &[String], cfg: &ValidatedConfig) -> Result<Vec<RunRecord>> {
    if !sizes.is_empty() && sizes.len() != paths.len() {
        bail!(
            "{} --size value(s) given for {} log(s); give one per log or none",
            sizes.len(),
            paths.len()
        );
    }
    let categories = cfg.parser.size_categories.as_deref();
    let mut records = Vec::new();
    for (i, path) in paths.iter().enumerate() {
        let mut parser = cfg.parser.clone();
        if let Some(size) = sizes.get(i) {
            let size = SizeSpec::Label(size.clone())
                .resolve(categories)
                .with_context(|| format!("--size for {}", path))?;
            parser.initial_size = Some(size);
        }
        let ParsedLog {
            records: parsed, ..
        } = logs::parse_log_file(path, &parser)?;
        info!("{}: {} record(s)", path, parsed.len());
        records.extend(parsed);
    }
    Ok(records)
}

fn emit(
    out: Option<&str>,
    format: Format,
    csv: impl FnOnce(&mut dyn Write) -> Result<()>,
    json: impl FnOnce() -> Result<String>,
) -> Result<()> {
    let buf = match format {
        Format::Csv => {
            let mut buf: Vec<u8> = Vec::new();
            csv(&mut buf as &mut dyn Write)?;
            buf
        }
        Format::Json => json()?.into_bytes(),
    };
    match out {
        Some(path) => {
            std::fs::write(path, buf).with_context(|| format!("write {}", path))?;
            println!("Wrote {}", path);
        }
        None => std::io::stdout().write_all(&buf)?,
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Records { common } => {
            let cfg = load_config(common.config.as_deref(), common.policy.as_deref(), None)?;
            let records = parse_all(&common.logs, &common.sizes, &cfg)?;
            emit(
                common.out.as_deref(),
                common.format,
                |w| render::write_run_records(w, &records, &cfg.output),
                || render::render_json(&records),
            )?;
        }
        Commands::Derive { common, baseline } => {
            let cfg = load_config(common.config.as_deref(), common.policy.as_deref(), Some(&baseline))?;
            let records = parse_all(&common.logs, &common.sizes, &cfg)?;
            let derived = model::derive(&records, &cfg.derive);
            info!(
                "derived {} configuration(s) against baseline {} at {} thread(s)",
                derived.len(),
                cfg.derive.baseline_policy,
                cfg.derive.baseline_threads
            );
            emit(
                common.out.as_deref(),
                common.format,
                |w| render::write_derived(w, &derived, &cfg.output),
                || render::render_json(&derived),
            )?;
        }
        Commands::Best {
            common,
            baseline,
            by,
            policy_order,
        } => {
            let mut cfg = load_config(common.config.as_deref(), common.policy.as_deref(), Some(&baseline))?;
            if !policy_order.is_empty() {
                cfg.policy_order = policy_order;
            }
            let records = parse_all(&common.logs, &common.sizes, &cfg)?;
            let derived = model::derive(&records, &cfg.derive);
            let picks = model::select_best(&derived, by.into(), &cfg.policy_order);
            emit(
                common.out.as_deref(),
                common.format,
                |w| render::write_best(w, &picks, &cfg.output),
                || render::render_json(&picks),
            )?;
        }
        Commands::Throughput {
            log,
            config,
            format,
            out,
        } => {
            let output = match config.as_deref() {
                Some(path) => load_config(Some(path), None, None)?.output,
                None => OutputColumns::default(),
            };
            let parsed = logs::parse_throughput_file(&log)?;
            match parsed.delay_ms {
                Some(delay) => info!("{}: delay for 1 byte {} ms", log, delay),
                None => info!("{}: no delay line", log),
            }
            emit(
                out.as_deref(),
                format,
                |w| render::write_throughput(w, &parsed, &output),
                || render::render_json(&ThroughputReport::from(&parsed)),
            )?;
        }
    }

    Ok(())
}
