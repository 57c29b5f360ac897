pub mod types;
pub mod traits;
pub mod feed_utils;
pub mod registry;
pub mod fetcher;
pub mod parser;
pub mod aggregator;

pub use types::*;
pub use traits::{FeedGateway, ItemFilter};
pub use registry::AccountRegistry;
pub use fetcher::GatewayClient;
pub use parser::{FeedNormalizer, ReplyMarkerFilter};
pub use aggregator::TimelineAggregator;
