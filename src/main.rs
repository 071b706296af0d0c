//! Command-line interface for topic-gateway
//!
//! # Usage Examples
//!
//! ```bash
//! # Show the resolved broker list
//! topic-gateway --brokers 127.0.0.1:9092 --hosts 127.0.0.2 --port 9093 brokers
//!
//! # Publish two values with key 0
//! topic-gateway --client-id admin publish --topic scholars --key 0 Matthew Mark
//!
//! # Fetch two tuples from partition 0 starting at offset 1
//! topic-gateway --client-id admin fetch --topic scholars --offset 1 --limit 2
//!
//! # Keep fetching until Ctrl+C
//! topic-gateway --config gateway.toml fetch --topic scholars --follow
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use kafka_session::{Connector, KafkaConnector, MemoryBroker, Tuple};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use topic_gateway::{Create, Dataset, Gateway, GatewayConfig, Relation};
use tracing::info;

#[derive(Parser)]
#[command(name = "topic-gateway")]
#[command(about = "Publish to and fetch from Kafka topics as tuples")]
#[command(long_about = None)]
struct Cli {
    /// Broker addresses (host[:port], comma-separated)
    #[arg(long, env = "KAFKA_BROKERS", value_delimiter = ',')]
    brokers: Vec<String>,

    /// Extra broker hosts, resolved after --brokers
    #[arg(long, value_delimiter = ',')]
    hosts: Vec<String>,

    /// Port for entries without one
    #[arg(long)]
    port: Option<u16>,

    /// Client id sent to the brokers
    #[arg(long, env = "KAFKA_CLIENT_ID")]
    client_id: Option<String>,

    /// Gateway configuration file (TOML)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Use an in-process broker instead of a Kafka cluster
    #[arg(long)]
    memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved broker endpoints
    Brokers,

    /// Publish values and print the tuples as sent
    Publish {
        #[arg(long)]
        topic: String,

        /// Key stamped on every value
        #[arg(long)]
        key: Option<String>,

        /// Values to publish
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Fetch tuples from one topic partition
    Fetch {
        #[arg(long)]
        topic: String,

        #[arg(long, default_value_t = 0)]
        partition: i32,

        /// Offset to start from
        #[arg(long, default_value_t = 0)]
        offset: i64,

        /// Stop after this many tuples
        #[arg(long)]
        limit: Option<usize>,

        /// Keep polling until interrupted
        #[arg(long)]
        follow: bool,

        /// Pause between polls when following
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    if let Commands::Brokers = cli.command {
        let spec = broker_address::BrokerAddressSpec::from_options(
            config.addresses.iter().cloned(),
            &config.options,
        )?;
        for endpoint in spec.resolve()? {
            println!("{endpoint}");
        }
        return Ok(());
    }

    let connector: Arc<dyn Connector> = if cli.memory {
        info!("Using an in-process broker");
        Arc::new(MemoryBroker::new().connector())
    } else {
        Arc::new(KafkaConnector::new())
    };
    let mut gateway = config.build(connector)?;

    let result = match cli.command {
        Commands::Brokers => Ok(()),
        Commands::Publish { topic, key, values } => publish(&gateway, &topic, key, values),
        Commands::Fetch {
            topic,
            partition,
            offset,
            limit,
            follow,
            interval_ms,
        } => {
            let relation = open_relation(&gateway, &topic, partition, offset, limit)?;
            if follow {
                follow_relation(&relation, Duration::from_millis(interval_ms)).await
            } else {
                print_tuples(&relation.to_vec()?)
            }
        }
    };

    gateway.close().context("Failed to close gateway")?;
    result
}

fn load_config(cli: &Cli) -> anyhow::Result<GatewayConfig> {
    let mut config = match &cli.config {
        Some(path) => GatewayConfig::from_file(path)?,
        None => GatewayConfig::default(),
    };
    if !cli.brokers.is_empty() {
        config.addresses = cli.brokers.clone();
    }
    if !cli.hosts.is_empty() {
        config.set_option("hosts", json!(cli.hosts));
    }
    if let Some(port) = cli.port {
        config.set_option("port", port);
    }
    if let Some(client_id) = &cli.client_id {
        config.set_option("client_id", client_id.as_str());
    }
    Ok(config)
}

fn publish(
    gateway: &Gateway,
    topic: &str,
    key: Option<String>,
    values: Vec<String>,
) -> anyhow::Result<()> {
    let mut options = dataset_attributes::AttributeMap::new();
    if let Some(key) = key {
        options.insert("key".to_string(), json!(key));
    }
    let command = Create::new(Dataset::producer(gateway.cluster().clone(), topic, &options))?;
    let sent = command
        .call(values)
        .with_context(|| format!("Failed to publish to {topic}"))?;
    print_tuples(&sent)
}

fn open_relation(
    gateway: &Gateway,
    topic: &str,
    partition: i32,
    offset: i64,
    limit: Option<usize>,
) -> anyhow::Result<Relation> {
    let mut options = dataset_attributes::AttributeMap::new();
    options.insert("partition".to_string(), json!(partition));
    options.insert("offset".to_string(), json!(offset));
    if let Some(limit) = limit {
        options.insert("limit".to_string(), json!(limit));
    }
    Ok(Relation::open(gateway.cluster().clone(), topic, &options)?)
}

async fn follow_relation(relation: &Relation, interval: Duration) -> anyhow::Result<()> {
    info!("Following {} (Ctrl+C to stop)", relation.dataset().topic());
    loop {
        print_tuples(&relation.to_vec()?)?;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                return Ok(());
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

fn print_tuples(tuples: &[Tuple]) -> anyhow::Result<()> {
    for tuple in tuples {
        println!("{}", serde_json::to_string(tuple)?);
    }
    Ok(())
}
