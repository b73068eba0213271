//! Shortest chain of connections between two users, then report it.

use anyhow::{Context, Result};
use clap::Parser;
use relsearch::client::CentralClient;
use relsearch::{build_graph, Config};
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "connections")]
#[command(about = "Find the shortest connection path between two users")]
struct Args {
    /// Config file (defaults to RELSEARCH_CONFIG or ./config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override connections.source
    #[arg(long)]
    source: Option<String>,

    /// Override connections.target
    #[arg(long)]
    target: Option<String>,

    /// Print the answer without submitting it
    #[arg(long)]
    dry_run: bool,
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

    let conn_cfg = &config.connections;
    let source = args.source.as_deref().unwrap_or(&conn_cfg.source);
    let target = args.target.as_deref().unwrap_or(&conn_cfg.target);

    let client = CentralClient::new(
        config.service_api_key()?,
        Duration::from_secs(config.service.timeout_secs),
    )?;

    let users = client
        .fetch_records(&conn_cfg.database_url, &conn_cfg.database_task, &conn_cfg.users_query)
        .await
        .context("Failed to fetch users")?;
    let connections = client
        .fetch_records(
            &conn_cfg.database_url,
            &conn_cfg.database_task,
            &conn_cfg.connections_query,
        )
        .await
        .context("Failed to fetch connections")?;
    log::info!("Users: {}, connections: {}", users.len(), connections.len());

    let graph = build_graph(&users, &connections)?;

    let start = Instant::now();
    let path = graph.path_between_names(source, target)?;
    log::debug!("BFS took {:?}", start.elapsed());

    if path.is_empty() {
        anyhow::bail!("No path found between {} and {}", source, target);
    }

    let answer = path.join(", ");
    println!("Shortest path ({} hops): {}", path.len() - 1, answer);

    if args.dry_run {
        log::info!("Dry run, not submitting");
        return Ok(());
    }

    let verdict = client
        .submit_answer(
            &config.service.report_url,
            &conn_cfg.task_name,
            &serde_json::Value::String(answer),
        )
        .await?;
    println!("{}", verdict);

    Ok(())
}
