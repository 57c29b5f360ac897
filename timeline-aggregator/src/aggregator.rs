use crate::fetcher::GatewayClient;
use crate::parser::{FeedNormalizer, ReplyMarkerFilter};
use crate::registry::AccountRegistry;
use crate::traits::FeedGateway;
use crate::types::{
    AccountInfo, AggregatedResult, AggregatorError, FailurePolicy, NormalizedItem, Result, Source,
    Timeline, TimelineConfig,
};
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Composition root: fans out one fetch+normalize per registered source,
/// then picks the selected source's items.
pub struct TimelineAggregator {
    registry: Arc<AccountRegistry>,
    gateway: Arc<dyn FeedGateway>,
    normalizer: FeedNormalizer,
    max_concurrent_fetches: Option<usize>,
    failure_policy: FailurePolicy,
}

impl TimelineAggregator {
    pub fn new(
        registry: AccountRegistry,
        gateway: Arc<dyn FeedGateway>,
        config: &TimelineConfig,
    ) -> Self {
        let normalizer = FeedNormalizer::new(Box::new(ReplyMarkerFilter::new(
            config.reply_marker.clone(),
        )))
        .with_full_size_avatars(config.full_size_avatars);

        Self {
            registry: Arc::new(registry),
            gateway,
            normalizer,
            max_concurrent_fetches: config.max_concurrent_fetches.filter(|limit| *limit > 0),
            failure_policy: config.failure_policy,
        }
    }

    /// Registry from `extra_accounts`, gateway client from `gateway`.
    pub fn from_config(config: &TimelineConfig) -> Result<Self> {
        let registry = AccountRegistry::for_config(config);
        let gateway = Arc::new(GatewayClient::new(&config.gateway)?);
        Ok(Self::new(registry, gateway, config))
    }

    pub fn with_normalizer(mut self, normalizer: FeedNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn registry(&self) -> &AccountRegistry {
        &self.registry
    }

    /// One aggregation pass. `selection` names the source whose items become
    /// `active`; absent or unknown keys select the first registered source.
    pub async fn aggregate(&self, selection: Option<&str>) -> Result<Timeline> {
        let sources = self.registry.list();
        if sources.is_empty() {
            return Err(AggregatorError::EmptyRegistry);
        }

        info!("Aggregating {} sources", sources.len());
        let outcomes = self.fetch_all(sources).await;

        let results = match self.failure_policy {
            FailurePolicy::AllOrNothing => {
                let failures = outcomes.iter().filter(|outcome| outcome.is_err()).count();
                if failures > 0 {
                    error!("{}/{} sources failed, aborting pass", failures, sources.len());
                }
                outcomes.into_iter().collect::<Result<Vec<_>>>()?
            }
            FailurePolicy::Isolate => sources
                .iter()
                .zip(outcomes)
                .map(|(source, outcome)| {
                    outcome.unwrap_or_else(|e| {
                        warn!("Source {} degraded: {}", source.identifier(), e);
                        AggregatedResult {
                            account_info: AccountInfo::failed(source, e.to_string()),
                            items: Vec::new(),
                        }
                    })
                })
                .collect(),
        };

        Ok(build_timeline(results, selection))
    }

    /// Results in registry order, whatever order the fetches finish in.
    async fn fetch_all(&self, sources: &[Source]) -> Vec<Result<AggregatedResult>> {
        let tasks = sources.iter().map(|source| self.fetch_one(source));
        match self.max_concurrent_fetches {
            Some(limit) => stream::iter(tasks).buffered(limit).collect::<Vec<_>>().await,
            None => join_all(tasks).await,
        }
    }

    async fn fetch_one(&self, source: &Source) -> Result<AggregatedResult> {
        let payload = self.gateway.fetch(source).await?;
        Ok(self.normalizer.normalize(source, payload))
    }
}

/// Assemble the sidebar and pick the active item list. `results` must be
/// non-empty and in registry order.
pub fn build_timeline(results: Vec<AggregatedResult>, selection: Option<&str>) -> Timeline {
    let sidebar: Vec<AccountInfo> = results
        .iter()
        .map(|result| result.account_info.clone())
        .collect();

    let index = selection
        .and_then(|key| {
            sidebar
                .iter()
                .position(|account| account.identifier == key)
        })
        .unwrap_or(0);

    let (selected, active): (String, Vec<NormalizedItem>) = results
        .into_iter()
        .nth(index)
        .map(|result| (result.account_info.identifier, result.items))
        .unwrap_or_default();

    Timeline {
        selected,
        sidebar,
        active,
    }
}
