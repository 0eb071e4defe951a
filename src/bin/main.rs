use anyhow::{Context, Result};
use cipher_core::persistence::{cache_is_fresh, load_index, save_index};
use cipher_core::{load_dictionary, CryptogramModel, KeyMap, RankOutcome, Solver, SolverConfig, WordIndex};
use clap::Parser;
use crossterm::style::{style, Stylize};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Solves substitution cryptograms, one per input line.
#[derive(Parser, Debug)]
#[command(name = "cryptosolve", version, about)]
struct Cli {
    /// File of cryptograms; reads stdin when omitted.
    input: Option<PathBuf>,

    /// Word frequency list, one `WORD FREQUENCY` record per line.
    #[arg(short = 'f', long = "freqfile", default_value = "freqc.txt")]
    freqfile: PathBuf,

    /// Compiled dictionary cache, rebuilt when older than the frequency list.
    #[arg(long)]
    cache: Option<PathBuf>,

    /// JSON solver settings; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Partial key applied to every line, e.g. "QWE=THE X=A".
    #[arg(short = 'k', long)]
    key: Option<String>,

    #[arg(short = 'u', long)]
    max_unsolved: Option<usize>,

    #[arg(long)]
    allow_self_mapping: bool,

    /// Report branches abandoned for exceeding the unsolved budget.
    #[arg(long)]
    partials: bool,

    #[arg(short = 'n', long)]
    top: Option<usize>,

    /// Stop each search after this many accepted solutions.
    #[arg(long)]
    max_solutions: Option<usize>,

    /// Seconds allowed per cryptogram.
    #[arg(short = 't', long)]
    timeout: Option<u64>,

    /// Concurrent branch tasks (0 = one per core).
    #[arg(short = 'j', long)]
    parallelism: Option<usize>,

    /// Print solutions as JSON lines.
    #[arg(long)]
    json: bool,

    /// Print the full key of each solution.
    #[arg(long)]
    show_key: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn build_config(cli: &Cli) -> Result<SolverConfig> {
    let mut config = match &cli.config {
        Some(path) => SolverConfig::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => SolverConfig::default(),
    };
    if let Some(n) = cli.max_unsolved {
        config.max_unsolved = n;
    }
    config.allow_self_mapping |= cli.allow_self_mapping;
    config.evaluate_partials |= cli.partials;
    if let Some(n) = cli.top {
        config.top_n = n;
    }
    if cli.max_solutions.is_some() {
        config.max_solutions = cli.max_solutions;
    }
    if cli.timeout.is_some() {
        config.timeout_secs = cli.timeout;
    }
    if let Some(n) = cli.parallelism {
        config.parallelism = n;
    }
    Ok(config)
}

fn load_words(freqfile: &Path, cache: Option<&Path>) -> Result<WordIndex> {
    if let Some(cache) = cache {
        if cache_is_fresh(cache, freqfile) {
            match load_index(cache) {
                Ok(index) => {
                    info!(cache = %cache.display(), words = index.len(), "dictionary cache loaded");
                    return Ok(index);
                }
                Err(e) => warn!("ignoring dictionary cache {}: {}", cache.display(), e),
            }
        }
    }

    let (index, _report) = load_dictionary(freqfile)?;
    if let Some(cache) = cache {
        match save_index(&index, cache) {
            Ok(()) => debug!(cache = %cache.display(), "dictionary cache written"),
            Err(e) => warn!("could not write dictionary cache {}: {}", cache.display(), e),
        }
    }
    Ok(index)
}

fn print_outcome(out: &mut impl Write, line_no: usize, outcome: &RankOutcome, json: bool, show_key: bool) -> io::Result<()> {
    if json {
        for row in outcome.set.reports() {
            let record = serde_json::json!({ "line": line_no, "solution": row });
            writeln!(out, "{}", record)?;
        }
        return Ok(());
    }

    writeln!(out, "{}", style(format!("#{} {}", line_no, outcome.set.model().text())).bold())?;
    if outcome.set.is_empty() {
        writeln!(out, "  {}", "no solution".red())?;
    }
    for row in outcome.set.reports() {
        writeln!(
            out,
            "  {} {}  {}",
            style(format!("{}.", row.rank)).dark_grey(),
            style(&row.text).green(),
            style(format!("word {:.4} letter {:.4} unsolved {}", row.word_score, row.letter_score, row.unsolved)).dark_grey()
        )?;
        if show_key {
            writeln!(out, "     {}", style(&row.key).cyan())?;
        }
    }
    if outcome.report.cancelled {
        writeln!(out, "  {}", "search stopped early".yellow())?;
    }
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = build_config(&cli)?;

    let index = load_words(&cli.freqfile, cli.cache.as_deref())?;
    for (letter, count, pct) in index.letter_table() {
        debug!("{} {:>10} {:6.3}%", letter, count, pct);
    }

    let initial_key = match cli.key.as_deref().map(KeyMap::parse_partial) {
        Some(Ok(key)) => key,
        Some(Err(e)) => {
            warn!("ignoring --key: {}", e);
            KeyMap::new()
        }
        None => KeyMap::new(),
    };

    let reader: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let solver = Solver::new(Arc::new(index), config);
    info!(words = solver.index().len(), slots = solver.config().admission_slots(), "solver ready");
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("line {}: unreadable input: {}", line_no, e);
                continue;
            }
        };
        let model = CryptogramModel::parse(&line);
        if model.is_empty() {
            debug!("line {}: no code words, skipped", line_no);
            continue;
        }

        info!(line = line_no, words = model.word_count(), unique = model.unique_count(), "solving");
        let model = Arc::new(model.with_initial_key(initial_key));
        let outcome = solver.rank_with(model, solver.config().cancel_token(), |set| {
            debug!(line = line_no, kept = set.len(), "solution accepted");
        });
        debug!(
            line = line_no,
            branches = outcome.report.branches,
            accepted = outcome.accepted,
            "line done"
        );

        print_outcome(&mut out, line_no, &outcome, cli.json, cli.show_key)?;
        out.flush()?;
    }
    Ok(())
}
