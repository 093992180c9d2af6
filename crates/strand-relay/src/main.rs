mod config;

use anyhow::Context;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use strand_graph::queue::is_abort;
use strand_graph::{LiveObserver, Relay, RouteMeta, Topology, TopologySnapshot, Who};
use strand_llm::ReplyResult;

/// Prints finished replies to stdout
struct ConsoleObserver;

impl LiveObserver for ConsoleObserver {
    fn on_delta(&self, owner_id: &str, _delta: &str, accumulated: &str) {
        tracing::trace!(owner = %owner_id, chars = accumulated.len(), "streaming");
    }

    fn on_reply(&self, owner_id: &str, reply: &ReplyResult) {
        println!("[{}] {}", owner_id, reply.text);
        for citation in &reply.citations {
            println!("  - {} <{}>", citation.title, citation.url);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!("Starting Strand relay");
    tracing::info!("Backend: {}", config.backend.base_url);

    let topology = load_topology(&config).await?;
    let source = config.session.source.clone();
    if !topology.contains(&source) {
        anyhow::bail!("source node '{}' is not in the topology", source);
    }

    let relay = Relay::builder()
        .config(config.relay_config())
        .topology(Arc::new(topology))
        .observer(Arc::new(ConsoleObserver))
        .build()?;

    match relay.key_status().await {
        Ok(true) => tracing::info!("Backend has an API key configured"),
        Ok(false) => tracing::warn!("Backend reports no API key; replies need a per-node key"),
        Err(e) => tracing::warn!("Backend key status unavailable: {}", e),
    }

    tracing::info!("Relaying stdin lines from '{}'", source);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let meta = RouteMeta::new().author("You").who(Who::User);
        for handle in relay.route(&source, &line, meta) {
            let dest = handle.dest_id().to_string();
            if let Err(e) = handle.join().await {
                if !is_abort(&e) {
                    tracing::warn!("Delivery to {} failed: {}", dest, e);
                }
            }
        }
    }

    tracing::info!("Input closed, shutting down");
    Ok(())
}

async fn load_topology(config: &Config) -> anyhow::Result<Topology> {
    let path = &config.session.topology_path;
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read topology file {}", path.display()))?;
    let snapshot: TopologySnapshot = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid topology file {}", path.display()))?;

    tracing::info!(
        "Topology loaded: {} nodes, {} edges",
        snapshot.nodes.len(),
        snapshot.edges.len()
    );
    Ok(Topology::from_snapshot(snapshot))
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Logs go to stderr so stdout stays the conversation
    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}
