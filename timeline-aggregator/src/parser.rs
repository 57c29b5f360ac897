use crate::feed_utils::avatar;
use crate::traits::ItemFilter;
use crate::types::{
    AccountInfo, AggregatedResult, Author, NormalizedItem, RawFeedItem, RawFeedPayload, Source,
    SourceStatus, DEFAULT_REPLY_MARKER,
};
use tracing::{debug, info};

/// Drops items whose rendered content carries the gateway's reply marker.
///
/// The marker is an undocumented rendering convention of the gateway, so it
/// is configurable rather than baked in.
pub struct ReplyMarkerFilter {
    marker: String,
}

impl ReplyMarkerFilter {
    pub fn new(marker: impl Into<String>) -> Self {
        Self { marker: marker.into() }
    }
}

impl Default for ReplyMarkerFilter {
    fn default() -> Self {
        Self::new(DEFAULT_REPLY_MARKER)
    }
}

impl ItemFilter for ReplyMarkerFilter {
    fn keep(&self, item: &RawFeedItem) -> bool {
        !item.content_markup.contains(&self.marker)
    }

    fn filter_name(&self) -> String {
        format!("reply marker {:?}", self.marker)
    }
}

pub struct FeedNormalizer {
    filter: Box<dyn ItemFilter>,
    full_size_avatars: bool,
}

impl FeedNormalizer {
    pub fn new(filter: Box<dyn ItemFilter>) -> Self {
        Self {
            filter,
            full_size_avatars: false,
        }
    }

    pub fn with_full_size_avatars(mut self, enabled: bool) -> Self {
        self.full_size_avatars = enabled;
        self
    }

    /// Turn one source's payload into its sidebar entry and timeline items.
    /// Item order is the gateway's order.
    pub fn normalize(&self, source: &Source, payload: RawFeedPayload) -> AggregatedResult {
        let identifier = source.identifier();
        let total = payload.items.len();

        // Used when every item is filtered out.
        let first_author = payload
            .items
            .iter()
            .find_map(|item| item.authors.first())
            .cloned();

        let kept: Vec<RawFeedItem> = payload
            .items
            .into_iter()
            .filter(|item| {
                let keep = self.filter.keep(item);
                if !keep {
                    debug!("Dropping {} from {}: {}", item.id, identifier, self.filter.filter_name());
                }
                keep
            })
            .collect();

        let account_author = kept
            .iter()
            .find_map(|item| item.authors.first())
            .cloned()
            .or(first_author)
            .map(|author| self.shape_author(author));

        let items: Vec<NormalizedItem> = kept
            .into_iter()
            .map(|item| self.shape_item(identifier, item))
            .collect();

        info!("Normalized {}: kept {}/{} items", identifier, items.len(), total);

        let account_info = match source {
            Source::List {
                key,
                display_name,
                avatar,
                ..
            } => AccountInfo {
                identifier: key.clone(),
                kind: source.kind(),
                display_name: display_name.clone(),
                avatar_url: avatar.clone(),
                status: SourceStatus::Loaded,
            },
            Source::User { username } => {
                AccountInfo {
                    identifier: username.clone(),
                    kind: source.kind(),
                    display_name: account_author.as_ref().map(|author| author.name.clone()),
                    avatar_url: account_author.map(|author| author.avatar_url),
                    status: SourceStatus::Loaded,
                }
            }
        };

        AggregatedResult { account_info, items }
    }

    // Secondary authors are discarded; feeds are single-author per item.
    // Authorless items keep an empty author.
    fn shape_item(&self, identifier: &str, item: RawFeedItem) -> NormalizedItem {
        let author = item.authors.into_iter().next().unwrap_or_else(|| {
            debug!("Item {} from {} has no author", item.id, identifier);
            Author::default()
        });

        NormalizedItem {
            id: item.id,
            url: item.url,
            published_at: item.published_at,
            content_markup: item.content_markup,
            author: self.shape_author(author),
        }
    }

    fn shape_author(&self, mut author: Author) -> Author {
        if self.full_size_avatars {
            author.avatar_url = avatar::full_size(&author.avatar_url);
        }
        author
    }
}

impl Default for FeedNormalizer {
    fn default() -> Self {
        Self::new(Box::new(ReplyMarkerFilter::default()))
    }
}
