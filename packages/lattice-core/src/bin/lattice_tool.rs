//! Lattice Tool CLI
//!
//! Reads a PFSG lattice and runs the processing pipeline:
//! null removal → pause collapse → LM expansion → pruning → minimization →
//! pause recovery, then writes the requested outputs.
//!
//! # Usage
//!
//! ```bash
//! # Minimize with the thorough preset and write a compact lattice
//! cargo run --bin lattice-tool --release -- in.pfsg --preset thorough --out out.pfsg --compact
//!
//! # Expand with a trigram model, prune and score against a reference
//! cargo run --bin lattice-tool --release -- in.pfsg --lm lm.arpa --order 3 --prune 0.01 --ref "a b c"
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lattice_core::config::{AdjacencyBackend, LatticeConfig, Preset};
use lattice_core::features::algebra::{concatenate, union};
use lattice_core::features::alignment::{lattice_errors, WordErrors};
use lattice_core::features::context_expansion::{expand_context, ExpandOutcome};
use lattice_core::features::lattice::{Lattice, LatticeStats};
use lattice_core::features::minimization::{minimize, MergeSummary};
use lattice_core::features::ngram_lm::ArpaModel;
use lattice_core::features::null_collapse::{collapse_pauses, recover_pauses, remove_null_nodes, PauseRecovery};
use lattice_core::features::pfsg::{read_pfsg_file, write_pfsg_file, write_posteriors};
use lattice_core::features::posterior::{best_path, prune_lattice, PruneOutcome};
use lattice_core::shared::constants::pause::DEFAULT_PAUSE_WORD;
use lattice_core::shared::ports::{SymbolTable, Vocabulary};
use lattice_core::shared::utils::log_prob::prob_to_log_p;

#[derive(Parser)]
#[command(name = "lattice-tool")]
#[command(about = "Word lattice processing: expansion, pruning, minimization, scoring", long_about = None)]
struct Cli {
    /// Input lattice (PFSG)
    input: PathBuf,

    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Configuration preset (fast, balanced, thorough)
    #[arg(long, conflicts_with = "config")]
    preset: Option<String>,

    /// ARPA language model for context expansion
    #[arg(long)]
    lm: Option<PathBuf>,

    /// Expansion order (overrides the configuration)
    #[arg(long, requires = "lm")]
    order: Option<usize>,

    /// Posterior pruning threshold (overrides the configuration)
    #[arg(long)]
    prune: Option<f64>,

    /// Pause word to collapse and recover (overrides the configuration)
    #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_PAUSE_WORD)]
    pause: Option<String>,

    /// Append this lattice after the input
    #[arg(long, conflicts_with = "union")]
    concat: Option<PathBuf>,

    /// Offer this lattice as an alternative to the input
    #[arg(long)]
    union: Option<PathBuf>,

    /// Output lattice (PFSG)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Renumber reachable nodes when writing
    #[arg(long)]
    compact: bool,

    /// Write node and transition posteriors
    #[arg(long)]
    write_posteriors: Option<PathBuf>,

    /// Print the best path
    #[arg(long)]
    viterbi: bool,

    /// Print a JSON report (statistics, merge counts, word errors)
    #[arg(long)]
    stats: bool,

    /// Reference word string for lattice word error
    #[arg(long = "ref")]
    reference: Option<String>,

    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct Report {
    stats: LatticeStats,
    merged: MergeSummary,
    pruned: usize,
    expanded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    word_errors: Option<WordErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    word_error_rate: Option<f64>,
}

fn load_config(cli: &Cli) -> Result<LatticeConfig> {
    let mut config = match (&cli.config, &cli.preset) {
        (Some(path), _) => LatticeConfig::from_yaml(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        (None, Some(name)) => LatticeConfig::from_preset(Preset::from_str(name).map_err(anyhow::Error::msg)?),
        (None, None) => LatticeConfig::default(),
    };
    if let Some(order) = cli.order {
        config.expand.order = order;
    }
    if let Some(threshold) = cli.prune {
        config.prune.threshold = threshold;
    }
    if let Some(pause) = &cli.pause {
        config.collapse.pause_word = Some(pause.clone());
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn read_lattice(path: &Path, vocab: &mut SymbolTable, backend: AdjacencyBackend) -> Result<Lattice> {
    read_pfsg_file(path, vocab, backend).with_context(|| format!("failed to read lattice {}", path.display()))
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let mut vocab = SymbolTable::new();
    let pause = config.collapse.pause_word.as_deref().map(|word| vocab.add_non_event(word));

    let mut lattice = read_lattice(&cli.input, &mut vocab, config.adjacency)?;
    if let Some(path) = &cli.concat {
        let other = read_lattice(path, &mut vocab, config.adjacency)?;
        lattice = concatenate(&lattice, &other)?;
    }
    if let Some(path) = &cli.union {
        let other = read_lattice(path, &mut vocab, config.adjacency)?;
        lattice = union(&lattice, &other)?;
    }
    lattice.check_consistency().context("input lattice is inconsistent")?;
    info!(lattice = lattice.name(), nodes = lattice.num_nodes(), "read lattice");

    remove_null_nodes(&mut lattice)?;
    if let Some(pause) = pause {
        collapse_pauses(&mut lattice, pause)?;
    }

    let mut expanded = false;
    if let Some(path) = &cli.lm {
        let lm = ArpaModel::from_file(path, &mut vocab)
            .with_context(|| format!("failed to read language model {}", path.display()))?;
        match expand_context(&mut lattice, &lm, &vocab, &config.expand)? {
            ExpandOutcome::Completed { .. } => expanded = true,
            ExpandOutcome::BudgetExceeded { limit } => {
                warn!(limit, "expansion exceeded the node budget, keeping the unexpanded lattice")
            }
        }
    }

    let mut pruned = 0;
    if config.prune.threshold > 0.0 {
        match prune_lattice(&mut lattice, &config.prune, &config.posterior)? {
            PruneOutcome::Pruned { removed, .. } => pruned = removed,
            PruneOutcome::NoPaths => warn!(lattice = lattice.name(), "no complete path, pruning skipped"),
        }
    }

    let merged = minimize(&mut lattice, &config.merge)?;

    if let Some(pause) = pause {
        let recovery = PauseRecovery {
            self_loop: config
                .collapse
                .loop_pauses
                .then(|| prob_to_log_p(config.collapse.pause_loop_prob)),
            compact: config.collapse.compact_pauses,
            ..PauseRecovery::new(pause)
        };
        recover_pauses(&mut lattice, &recovery)?;
    }

    if let Some(path) = &cli.out {
        write_pfsg_file(&lattice, &vocab, path, cli.compact)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    if let Some(path) = &cli.write_posteriors {
        let file = std::fs::File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        let mut out = std::io::BufWriter::new(file);
        write_posteriors(&mut lattice, &vocab, config.posterior.posterior_scale, &mut out)?;
        out.flush()?;
    }

    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();
    if cli.viterbi {
        match best_path(&lattice) {
            Some(path) => {
                let words: Vec<String> = path
                    .nodes
                    .iter()
                    .filter_map(|&node| lattice.word(node).flatten())
                    .filter(|&word| !vocab.is_non_event(word))
                    .map(|word| vocab.label_to_string(Some(word)))
                    .collect();
                writeln!(stdout, "{}\t{}", lattice.name(), words.join(" "))?;
            }
            None => bail!("lattice '{}' has no path from initial to final", lattice.name()),
        }
    }

    let word_errors = cli.reference.as_deref().map(|text| {
        let reference = vocab.encode(text);
        let errors = lattice_errors(&lattice, &vocab, &reference, &config.alignment);
        (errors, errors.rate(reference.len()))
    });
    if let (Some((errors, _)), false) = (&word_errors, cli.stats) {
        writeln!(
            stdout,
            "{}\tsub {} ins {} del {}",
            lattice.name(),
            errors.substitutions,
            errors.insertions,
            errors.deletions
        )?;
    }

    if cli.stats {
        let report = Report {
            stats: LatticeStats::compute(&lattice),
            merged,
            pruned,
            expanded,
            word_errors: word_errors.map(|(errors, _)| errors),
            word_error_rate: word_errors.map(|(_, rate)| rate),
        };
        writeln!(stdout, "{}", serde_json::to_string_pretty(&report)?)?;
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(&cli) {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
