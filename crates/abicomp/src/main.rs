use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use abicomp_core::comparison::{compute_diff, DiffContext, DiffOptions};
use abicomp_core::ir::{Corpus, ReadContext};
use abicomp_core::report::{render_report, write_report, DiffStatus};
use abicomp_core::suppression::{load_suppression_file, Suppression};
use abicomp_core::symtab::SymtabFilterBuilder;
use abicomp_core::workers::run_jobs;
use abicomp_core::{AbiError, Result};
use abicomp_utils::{default_suppression_file, error, info, LogFormat, LogLevel, LoggingConfig};
use clap::{Args, Parser, Subcommand};

/// Compare the ABI of ELF binaries.
#[derive(Parser, Debug)]
#[command(name = "abicomp")]
#[command(version)]
#[command(about = "Compare the ABI of ELF binaries, filtering noise with suppression rules", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format: pretty or json (overrides ABICOMP_LOG_FORMAT)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

/// Which suppressions apply to a comparison.
#[derive(Args, Debug, Clone)]
struct SuppressionArgs
{
    /// Suppression file (TOML); may be given several times
    #[arg(short, long = "suppressions", value_name = "FILE")]
    suppressions: Vec<PathBuf>,

    /// Do not load the default suppression file
    #[arg(long, default_value_t = false)]
    no_default_suppression: bool,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Compare two binaries and report ABI changes
    Diff
    {
        /// The reference binary
        old: PathBuf,
        /// The binary to check against the reference
        new: PathBuf,
        #[command(flatten)]
        suppressions: SuppressionArgs,
        /// List suppressed changes too
        #[arg(long, default_value_t = false)]
        show_suppressed: bool,
        /// Do not compare symbols that no declaration refers to
        #[arg(long, default_value_t = false)]
        no_unreferenced_symbols: bool,
        /// Do not print declaration sites
        #[arg(long, default_value_t = false)]
        no_show_locs: bool,
    },
    /// List the symbols of a binary that take part in comparisons
    Symbols
    {
        /// Path to the ELF binary
        binary: PathBuf,
        /// Only function symbols
        #[arg(long, conflicts_with = "variables")]
        functions: bool,
        /// Only variable symbols
        #[arg(long)]
        variables: bool,
        /// Undefined symbols instead of exported ones
        #[arg(long, conflicts_with = "all")]
        undefined: bool,
        /// Every symbol, exported or not
        #[arg(long)]
        all: bool,
    },
    /// Compare several pairs of binaries in parallel
    Batch
    {
        /// Pairs to compare, as OLD:NEW
        #[arg(required = true, value_name = "OLD:NEW")]
        pairs: Vec<String>,
        #[command(flatten)]
        suppressions: SuppressionArgs,
    },
}

fn main()
{
    let cli = Cli::parse();

    let config = match LoggingConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(DiffStatus::USAGE_ERROR.exit_code());
        }
    };
    let config = match cli.log_format {
        Some(format) => config.with_format(format),
        None => config,
    };
    let _guard = match config.with_level(cli.log_level).init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(DiffStatus::ERROR.exit_code());
        }
    };

    let status = match run_command(cli.command) {
        Ok(status) => status,
        Err(AbiError::InvalidArgument(message)) => {
            eprintln!("Error: {message}");
            DiffStatus::USAGE_ERROR
        }
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            DiffStatus::ERROR
        }
    };
    process::exit(status.exit_code());
}

fn run_command(command: Commands) -> Result<DiffStatus>
{
    match command {
        Commands::Diff {
            old,
            new,
            suppressions,
            show_suppressed,
            no_unreferenced_symbols,
            no_show_locs,
        } => {
            let suppressions = load_suppressions(&suppressions)?;
            let options = DiffOptions {
                show_locations: !no_show_locs,
                show_unreferenced_symbols: !no_unreferenced_symbols,
                show_suppressed,
            };
            let ctx = DiffContext::new(suppressions).with_options(options);
            diff_pair(&old, &new, &ctx, &mut io::stdout().lock())
        }
        Commands::Symbols {
            binary,
            functions,
            variables,
            undefined,
            all,
        } => list_symbols(&binary, functions, variables, undefined, all),
        Commands::Batch { pairs, suppressions } => {
            let pairs = pairs.iter().map(|pair| parse_pair(pair)).collect::<Result<Vec<_>>>()?;
            let ctx = DiffContext::new(load_suppressions(&suppressions)?);
            run_batch(pairs, &ctx)
        }
    }
}

/// Explicit files first, then the default file unless disabled.
fn load_suppressions(args: &SuppressionArgs) -> Result<Vec<Suppression>>
{
    let mut files = args.suppressions.clone();
    if !args.no_default_suppression {
        if let Some(default) = default_suppression_file() {
            files.push(default);
        }
    }

    let mut suppressions = Vec::new();
    for file in &files {
        let loaded = load_suppression_file(file)?;
        info!(path = %file.display(), count = loaded.len(), "loaded suppressions");
        suppressions.extend(loaded);
    }
    Ok(suppressions)
}

fn read_pair(old: &Path, new: &Path, suppressions: &Arc<[Suppression]>) -> Result<(Corpus, Corpus)>
{
    let first = ReadContext::new(old.to_string_lossy())
        .with_suppressions(suppressions.to_vec())
        .read_corpus()?;
    let second = ReadContext::new(new.to_string_lossy())
        .with_suppressions(suppressions.to_vec())
        .read_corpus()?;
    Ok((first, second))
}

fn diff_pair(old: &Path, new: &Path, ctx: &DiffContext, out: &mut impl Write) -> Result<DiffStatus>
{
    let (first, second) = read_pair(old, new, &ctx.shared_suppressions())?;
    let diff = compute_diff(&first, &second, ctx);
    write_report(&diff, ctx.options(), out)?;
    Ok(diff.status())
}

fn parse_pair(pair: &str) -> Result<(PathBuf, PathBuf)>
{
    match pair.split_once(':') {
        Some((old, new)) if !old.is_empty() && !new.is_empty() => Ok((PathBuf::from(old), PathBuf::from(new))),
        _ => Err(AbiError::InvalidArgument(format!("expected OLD:NEW, got '{pair}'"))),
    }
}

fn run_batch(pairs: Vec<(PathBuf, PathBuf)>, ctx: &DiffContext) -> Result<DiffStatus>
{
    info!(pairs = pairs.len(), "starting batch comparison");
    let results = run_jobs(pairs, |(old, new)| {
        let outcome = read_pair(&old, &new, &ctx.shared_suppressions()).map(|(first, second)| {
            let diff = compute_diff(&first, &second, ctx);
            (render_report(&diff, ctx.options()), diff.status())
        });
        (old, new, outcome)
    })?;

    let mut status = DiffStatus::OK;
    let mut out = io::stdout().lock();
    for (old, new, outcome) in results {
        writeln!(out, "==== {} vs {} ====", old.display(), new.display())?;
        match outcome {
            Ok((report, pair_status)) => {
                out.write_all(report.as_bytes())?;
                status |= pair_status;
            }
            Err(e) => {
                error!(old = %old.display(), new = %new.display(), "{e}");
                writeln!(out, "error: {e}")?;
                status |= DiffStatus::ERROR;
            }
        }
    }
    Ok(status)
}

fn list_symbols(binary: &Path, functions: bool, variables: bool, undefined: bool, all: bool) -> Result<DiffStatus>
{
    let corpus = ReadContext::new(binary.to_string_lossy()).read_corpus()?;
    let symtab = corpus.symtab();

    let mut filter = if all {
        SymtabFilterBuilder::new()
    } else if undefined {
        SymtabFilterBuilder::new().undefined_symbols(true)
    } else {
        symtab.make_filter()
    };
    if functions {
        filter = filter.functions(true);
    }
    if variables {
        filter = filter.variables(true);
    }

    let mut out = io::stdout().lock();
    for symbol in symtab.filtered(filter) {
        let demangled = symbol.symbol_name().demangled().unwrap_or_default();
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{demangled}",
            symbol.id_string(),
            symbol.symbol_type(),
            symbol.binding(),
            symbol.size()
        )?;
    }
    Ok(DiffStatus::OK)
}
