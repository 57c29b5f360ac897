use crate::traits::FeedGateway;
use crate::types::{
    AggregatorError, GatewayConfig, GatewayFailure, RawFeedPayload, Result, Source,
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Gateway route options: readable text, no retweets, no replies, emoji
/// markers for retweet/reply context, links for pictures, quoted avatars.
pub const ROUTE_PARAMS: &str = "readable=1&includeRts=0&excludeReplies=1&showEmojiForRetweetAndReply=1&addLinkForPics=1&showQuotedAuthorAvatarInDesc=1";

pub struct GatewayClient {
    client: Client,
    base_url: Url,
}

impl GatewayClient {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(AggregatorError::UnsupportedGatewayUrl(config.base_url.clone()));
        }

        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .gzip(true)
            .deflate(true)
            .brotli(true);
        if let Some(seconds) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
        })
    }

    /// The JSON feed URL for a source. Depends only on the source.
    pub fn feed_url(&self, source: &Source) -> Result<Url> {
        let (route, id) = match source {
            Source::List { list_id, .. } => ("list", list_id.as_str()),
            Source::User { username } => ("user", username.as_str()),
        };

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AggregatorError::UnsupportedGatewayUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["twitter", route, id, ROUTE_PARAMS]);
        url.set_query(Some("format=json"));
        Ok(url)
    }
}

#[async_trait]
impl FeedGateway for GatewayClient {
    async fn fetch(&self, source: &Source) -> Result<RawFeedPayload> {
        let identifier = source.identifier();
        let url = self.feed_url(source)?;
        let start_time = Instant::now();

        debug!("Fetching {} feed {}: {}", source.kind(), identifier, url);

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!("Transport failure for {}: {}", identifier, e);
            AggregatorError::gateway(identifier, GatewayFailure::Transport(e.to_string()))
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                "Gateway returned HTTP {} for {}: {}",
                status.as_u16(),
                identifier,
                status.canonical_reason().unwrap_or("Unknown")
            );
            return Err(AggregatorError::gateway(
                identifier,
                GatewayFailure::Status(status.as_u16()),
            ));
        }

        let body = response.bytes().await.map_err(|e| {
            AggregatorError::gateway(identifier, GatewayFailure::Transport(e.to_string()))
        })?;

        let payload: RawFeedPayload = serde_json::from_slice(&body).map_err(|e| {
            warn!("Undecodable feed body for {}: {}", identifier, e);
            AggregatorError::gateway(identifier, GatewayFailure::Decode(e.to_string()))
        })?;

        info!(
            "Fetched {} items for {} ({} bytes, {}ms)",
            payload.items.len(),
            identifier,
            body.len(),
            start_time.elapsed().as_millis()
        );
        Ok(payload)
    }
}
