use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use timeline_aggregator::{
    AccountRegistry, FailurePolicy, GatewayClient, TimelineAggregator, TimelineConfig,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Assemble one timeline from the tracked accounts and print it as JSON.
#[derive(Parser, Debug)]
#[command(name = "timeline-aggregator", version)]
struct Cli {
    /// Identifier of the source to show; defaults to the first registered one
    #[arg(short, long)]
    account: Option<String>,

    /// Gateway base URL (overrides FEED_GATEWAY_URL)
    #[arg(long)]
    gateway_url: Option<String>,

    /// Comma-separated usernames to track in addition to the static list
    #[arg(long)]
    extra_accounts: Option<String>,

    /// Bound on simultaneous gateway requests
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Keep sources that loaded when others fail
    #[arg(long)]
    isolate_failures: bool,

    /// Rewrite thumbnail avatars to full-size images
    #[arg(long)]
    full_size_avatars: bool,

    /// Print the registered sources and exit without fetching
    #[arg(long)]
    list_accounts: bool,

    #[arg(long)]
    pretty: bool,
}

impl Cli {
    fn apply(&self, config: &mut TimelineConfig) {
        if let Some(url) = &self.gateway_url {
            config.gateway.base_url = url.clone();
        }
        if let Some(extra) = &self.extra_accounts {
            config.extra_accounts = Some(extra.clone());
        }
        if let Some(limit) = self.max_concurrent {
            config.max_concurrent_fetches = Some(limit);
        }
        if self.isolate_failures {
            config.failure_policy = FailurePolicy::Isolate;
        }
        if self.full_size_avatars {
            config.full_size_avatars = true;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = TimelineConfig::from_env();
    cli.apply(&mut config);

    // Listing needs no gateway, so a bad gateway URL must not block it.
    let registry = AccountRegistry::for_config(&config);
    if let Some(fallback) = registry.fallback() {
        warn!("Extra accounts ignored: {}", fallback);
    }

    let output = if cli.list_accounts {
        to_json(registry.list(), cli.pretty)?
    } else {
        info!("Using gateway at {}", config.gateway.base_url);
        let gateway = Arc::new(
            GatewayClient::new(&config.gateway).context("failed to set up the gateway client")?,
        );
        let aggregator = TimelineAggregator::new(registry, gateway, &config);

        let timeline = aggregator
            .aggregate(cli.account.as_deref())
            .await
            .map_err(|e| {
                error!("Unable to load timeline: {}", e);
                e
            })?;
        info!(
            "Timeline for {}: {} items, {} sources",
            timeline.selected,
            timeline.active.len(),
            timeline.sidebar.len()
        );
        to_json(&timeline, cli.pretty)?
    };

    println!("{}", output);
    Ok(())
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T, pretty: bool) -> anyhow::Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}
