//! Find the place whose sightings mention the target person, then report it.

use anyhow::Result;
use clap::Parser;
use relsearch::cache::CachedLookup;
use relsearch::client::{CentralClient, HttpLookup, SeedExtractor};
use relsearch::{ClosureOutcome, ClosureSearch, Config, SearchOptions, SearchReport, Seeds};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "find-place")]
#[command(about = "Expand people <-> places sightings until the target person turns up")]
struct Args {
    /// Config file (defaults to RELSEARCH_CONFIG or ./config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override closure.max_rounds
    #[arg(long)]
    max_rounds: Option<usize>,

    /// Seed place; skips fetching the note and the model extraction. Repeatable.
    #[arg(long = "seed-place")]
    seed_places: Vec<String>,

    /// Print the answer without submitting it
    #[arg(long)]
    dry_run: bool,

    /// Print the full search report (rounds, discovered sets) as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", &config.service.log_level),
    )
    .init();

    let client = CentralClient::new(
        config.service_api_key()?,
        Duration::from_secs(config.service.timeout_secs),
    )?;

    let seeds = if args.seed_places.is_empty() {
        extract_seeds(&config, &client).await?
    } else {
        Seeds::from_places(args.seed_places.clone())
    };
    log::info!("Seed people: {:?}", seeds.people);
    log::info!("Seed places: {:?}", seeds.places);

    let mut options = SearchOptions::from(&config.closure);
    if let Some(max_rounds) = args.max_rounds {
        options = options.with_max_rounds(max_rounds);
    }

    let lookup = HttpLookup::new(
        client.clone(),
        config.closure.people_url.clone(),
        config.closure.places_url.clone(),
    );

    let report: SearchReport = if config.closure.cache_capacity > 0 {
        let cached = CachedLookup::new(lookup, config.closure.cache_capacity);
        let report = ClosureSearch::new(&cached, options).run(&seeds).await;
        log::debug!("Lookup cache holds {} replies", cached.cache().len());
        report
    } else {
        ClosureSearch::new(&lookup, options).run(&seeds).await
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    let place = match report.outcome {
        ClosureOutcome::Found { token, round } => {
            println!("Found {:?} in {} after {} round(s)", config.closure.target_marker, token, round);
            token
        }
        ClosureOutcome::Exhausted { reason } => {
            anyhow::bail!(
                "Search exhausted ({:?}) after {} round(s): {} people, {} places discovered",
                reason,
                report.rounds.len(),
                report.people.len(),
                report.places.len()
            );
        }
    };

    if args.dry_run {
        log::info!("Dry run, not submitting");
        return Ok(());
    }

    let verdict = client
        .submit_answer(
            &config.service.report_url,
            &config.closure.task_name,
            &serde_json::Value::String(place),
        )
        .await?;
    println!("{}", verdict);

    Ok(())
}

/// Fetch the note and let the model pull seed people and places out of it.
async fn extract_seeds(config: &Config, client: &CentralClient) -> Result<Seeds> {
    let note = client.fetch_note(&config.closure.note_url).await?;
    log::debug!("Note:\n{}", note);

    let api_key = std::env::var(&config.openai.api_key_env).map_err(|_| {
        anyhow::anyhow!(
            "Environment variable {} not set. Set it in your .env file or pass --seed-place.",
            config.openai.api_key_env
        )
    })?;
    let extractor = SeedExtractor::new(api_key, config.openai.model.clone(), config.openai.temperature)?;
    Ok(extractor.extract(&note).await?)
}
