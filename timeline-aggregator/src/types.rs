use std::env;
use tracing::warn;

// Use the interfaces crate for core types
pub use interfaces::defs::{
    AccountInfo, AggregatedResult, Author, NormalizedItem, RawFeedItem, RawFeedPayload, Source,
    SourceKind, SourceStatus, Timeline,
};

pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:1200";
pub const DEFAULT_REPLY_MARKER: &str = "Re @";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub user_agent: String,
    /// `None` leaves the transport default in place.
    pub timeout_seconds: Option<u64>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GATEWAY_URL.to_string(),
            user_agent: "Timeline-Aggregator/1.0".to_string(),
            timeout_seconds: None,
        }
    }
}

/// What an aggregation pass does when one source's fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Any failure fails the whole pass.
    #[default]
    AllOrNothing,
    /// Failed sources stay in the sidebar, marked failed and without items.
    Isolate,
}

#[derive(Debug, Clone)]
pub struct TimelineConfig {
    pub gateway: GatewayConfig,
    /// Comma-separated usernames appended to the static registry.
    pub extra_accounts: Option<String>,
    pub reply_marker: String,
    pub full_size_avatars: bool,
    pub max_concurrent_fetches: Option<usize>,
    pub failure_policy: FailurePolicy,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            extra_accounts: None,
            reply_marker: DEFAULT_REPLY_MARKER.to_string(),
            full_size_avatars: false,
            max_concurrent_fetches: None,
            failure_policy: FailurePolicy::AllOrNothing,
        }
    }
}

impl TimelineConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let gateway = GatewayConfig {
            base_url: env::var("FEED_GATEWAY_URL").unwrap_or(defaults.gateway.base_url),
            user_agent: env::var("FEED_GATEWAY_USER_AGENT").unwrap_or(defaults.gateway.user_agent),
            timeout_seconds: env::var("FEED_GATEWAY_TIMEOUT_SECONDS")
                .ok()
                .and_then(|raw| parse_positive("FEED_GATEWAY_TIMEOUT_SECONDS", &raw)),
        };

        Self {
            gateway,
            extra_accounts: env::var("TIMELINE_EXTRA_ACCOUNTS").ok(),
            reply_marker: env::var("TIMELINE_REPLY_MARKER").unwrap_or(defaults.reply_marker),
            full_size_avatars: env::var("TIMELINE_FULL_SIZE_AVATARS")
                .map(|raw| parse_flag(&raw))
                .unwrap_or(defaults.full_size_avatars),
            max_concurrent_fetches: env::var("TIMELINE_MAX_CONCURRENT_FETCHES")
                .ok()
                .and_then(|raw| parse_positive("TIMELINE_MAX_CONCURRENT_FETCHES", &raw)),
            failure_policy: match env::var("TIMELINE_ISOLATE_FAILURES") {
                Ok(raw) if parse_flag(&raw) => FailurePolicy::Isolate,
                _ => FailurePolicy::AllOrNothing,
            },
        }
    }
}

pub fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_positive<T>(name: &str, raw: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Some(value),
        _ => {
            warn!("Ignoring {}={:?}: expected a positive integer", name, raw);
            None
        }
    }
}

/// Why a configured set of extra accounts was ignored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationFallback {
    #[error("invalid account handle {0:?}")]
    InvalidHandle(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayFailure {
    #[error("HTTP {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed feed body: {0}")]
    Decode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("Gateway error for {identifier}: {cause}")]
    Gateway {
        identifier: String,
        #[source]
        cause: GatewayFailure,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Gateway URL cannot carry a path: {0}")]
    UnsupportedGatewayUrl(String),

    #[error("No sources registered")]
    EmptyRegistry,
}

impl AggregatorError {
    pub fn gateway(identifier: &str, cause: GatewayFailure) -> Self {
        AggregatorError::Gateway {
            identifier: identifier.to_string(),
            cause,
        }
    }
}

pub type Result<T> = std::result::Result<T, AggregatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_truthy_spellings() {
        for raw in ["1", "true", "TRUE", " yes ", "on"] {
            assert!(parse_flag(raw), "{raw:?} should be truthy");
        }
        for raw in ["0", "false", "", "nope"] {
            assert!(!parse_flag(raw), "{raw:?} should be falsy");
        }
    }

    #[test]
    fn positive_rejects_zero_and_garbage() {
        assert_eq!(parse_positive::<usize>("N", "4"), Some(4));
        assert_eq!(parse_positive::<usize>("N", "0"), None);
        assert_eq!(parse_positive::<usize>("N", "four"), None);
    }

    #[test]
    fn gateway_error_names_the_source() {
        let err = AggregatorError::gateway("alice", GatewayFailure::Status(502));
        assert_eq!(err.to_string(), "Gateway error for alice: HTTP 502");
    }

    #[test]
    fn defaults_match_the_local_gateway() {
        let config = TimelineConfig::default();
        assert_eq!(config.gateway.base_url, "http://localhost:1200");
        assert_eq!(config.reply_marker, "Re @");
        assert_eq!(config.failure_policy, FailurePolicy::AllOrNothing);
        assert!(config.max_concurrent_fetches.is_none());
    }
}
