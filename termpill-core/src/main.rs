//! src/main.rs
//! twfill: resolve a JSON list of raw term wrappers against a dictionary
//!
//! ```text
//! twfill <DICTIONARY> <WRAPPERS> [--config <PATH>] [--unique]
//! ```
//!
//! Prints one JSON array to stdout: each element is either the resolved
//! wrapper (with `$id`) or `{"error": "..."}` for an item that failed.

use std::panic::PanicHookInfo;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{Value, json};
use tokio::fs as TokioFs;
use tracing::{error, info, warn};

use termpill_core::{
    cache::CachedVocab,
    config::Config,
    controller::{HandlerRegistry, TermWrapperResolver},
    logging,
    model::RawTermWrapper,
    vocab::DictionaryVocab,
};

#[derive(Parser, Debug)]
#[command(name = "twfill", version, about = "Resolve raw term wrappers against a dictionary")]
struct Args {
    /// Dictionary JSON document (terms, values, SNPs)
    #[arg(value_name = "DICTIONARY")]
    dictionary: PathBuf,

    /// JSON array of raw term wrappers
    #[arg(value_name = "WRAPPERS")]
    wrappers: PathBuf,

    /// Config file to use instead of the per-user one
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Give every resolved wrapper its own `$id`, even for equal content
    #[arg(short, long)]
    unique: bool,
}

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> Result<()> {
    setup_panic_handler();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load().await.unwrap_or_else(|e| {
            eprintln!("Failed to load config, using defaults: {e}");
            Config::default()
        }),
    };

    let _guard = logging::init(&config.logging).context("Failed to initialize logging")?;
    info!("Starting twfill");

    let dictionary = DictionaryVocab::load(&args.dictionary)
        .await
        .context("Failed to load dictionary")?;
    let vocab = CachedVocab::with_config(dictionary, &config.vocab_cache);

    let text = TokioFs::read_to_string(&args.wrappers)
        .await
        .with_context(|| format!("Failed to read {}", args.wrappers.display()))?;
    let raws: Vec<RawTermWrapper> =
        serde_json::from_str(&text).context("Wrappers file must be a JSON array")?;

    let resolver = TermWrapperResolver::new(
        Arc::new(HandlerRegistry::new()),
        Arc::new(twid::IdentityHasher::new(config.hasher.clone())),
    );
    let default_q = config.default_q_table()?;

    let results = resolver
        .fill_tw_lst(raws, &vocab, &default_q)
        .await
        .context("Failed to hydrate terms")?;

    let mut failures = 0usize;
    let output: Vec<Value> = results
        .into_iter()
        .map(|item| match item {
            Ok(mut tw) => {
                if args.unique {
                    if let Err(e) = resolver.mark_occurrence(&mut tw) {
                        warn!(error = %e, "Keeping content id");
                    }
                }
                serde_json::to_value(tw).unwrap_or_else(|e| json!({"error": e.to_string()}))
            }
            Err(e) => {
                failures += 1;
                warn!(error = %e, "Wrapper failed to resolve");
                json!({"error": e.to_string()})
            }
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&output)?);

    let stats = vocab.stats();
    info!(
        resolved = output.len() - failures,
        failures,
        cache_hits = stats.hits,
        cache_misses = stats.misses,
        handlers = ?resolver.registry().loaded_kinds(),
        "twfill finished"
    );
    Ok(())
}

fn setup_panic_handler() {
    let original_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info: &PanicHookInfo<'_>| {
        error!("twfill panicked: {}", panic_info);
        original_hook(panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_positional_paths_and_config_flag() {
        let args = Args::try_parse_from(["twfill", "dict.json", "tws.json", "-c", "pill.toml"]).unwrap();
        assert_eq!(args.dictionary, PathBuf::from("dict.json"));
        assert_eq!(args.wrappers, PathBuf::from("tws.json"));
        assert_eq!(args.config, Some(PathBuf::from("pill.toml")));

        let args = Args::try_parse_from(["twfill", "dict.json", "tws.json"]).unwrap();
        assert!(args.config.is_none());
        assert!(!args.unique);

        let args = Args::try_parse_from(["twfill", "--unique", "dict.json", "tws.json"]).unwrap();
        assert!(args.unique);
    }

    #[test]
    fn test_missing_wrappers_is_usage_error() {
        let err = Args::try_parse_from(["twfill", "dict.json"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let help = Args::try_parse_from(["twfill", "--help"]).unwrap_err();
        assert_eq!(help.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
