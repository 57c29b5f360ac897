use crate::feed_utils::handle::{is_valid_handle, normalize_handle};
use crate::types::{ConfigurationFallback, Source, SourceKind, TimelineConfig};
use std::collections::HashSet;
use tracing::{debug, info, warn};

pub const HOME_LIST_KEY: &str = "mylist";
pub const HOME_LIST_ID: &str = "1863684093000749519";
pub const HOME_LIST_AVATAR: &str = "/home.svg";

const BASELINE_USERS: &[&str] = &[
    "otono_f",
    "fffff3434",
    "cursor_ai",
    "vercel",
    "micro_cms",
    "uhyo_",
    "catnose99",
];

/// The tracked sources, fixed for the life of the process.
///
/// `list()` always yields list sources first, then users, each group in the
/// order it was declared. Identifiers are assumed unique.
#[derive(Debug, Clone)]
pub struct AccountRegistry {
    sources: Vec<Source>,
    fallback: Option<ConfigurationFallback>,
}

impl AccountRegistry {
    pub fn new(sources: Vec<Source>) -> Self {
        let (mut ordered, users): (Vec<Source>, Vec<Source>) = sources
            .into_iter()
            .partition(|source| source.kind() == SourceKind::List);
        ordered.extend(users);

        Self {
            sources: ordered,
            fallback: None,
        }
    }

    /// The static registry with no extra accounts.
    pub fn baseline() -> Self {
        let mut sources = vec![Source::list(HOME_LIST_KEY, HOME_LIST_ID)
            .with_display(None, Some(HOME_LIST_AVATAR))];
        sources.extend(BASELINE_USERS.iter().map(|username| Source::user(*username)));
        Self::new(sources)
    }

    /// The static registry extended by a comma-separated username list.
    pub fn from_config(extra_accounts: Option<&str>) -> Self {
        Self::baseline().extend_from_config(extra_accounts)
    }

    /// Registry for a full configuration. Only `extra_accounts` is read;
    /// nothing here touches the gateway settings.
    pub fn for_config(config: &TimelineConfig) -> Self {
        Self::from_config(config.extra_accounts.as_deref())
    }

    /// Append users from a comma-separated list. A malformed list is
    /// ignored as a whole and recorded in `fallback()`.
    pub fn extend_from_config(mut self, extra_accounts: Option<&str>) -> Self {
        let Some(raw) = extra_accounts else {
            return self;
        };

        let usernames = match parse_extra_accounts(raw) {
            Ok(usernames) => usernames,
            Err(fallback) => {
                warn!("Ignoring extra accounts ({}), using the static registry", fallback);
                self.fallback = Some(fallback);
                return self;
            }
        };

        let mut seen: HashSet<String> = self
            .sources
            .iter()
            .map(|source| source.identifier().to_string())
            .collect();

        for username in usernames {
            if !seen.insert(username.clone()) {
                warn!("Skipping duplicate account {}", username);
                continue;
            }
            debug!("Registered extra account {}", username);
            self.sources.push(Source::user(username));
        }

        info!("Account registry holds {} sources", self.sources.len());
        self
    }

    pub fn list(&self) -> &[Source] {
        &self.sources
    }

    pub fn get(&self, identifier: &str) -> Option<&Source> {
        self.sources
            .iter()
            .find(|source| source.identifier() == identifier)
    }

    /// Why configured extra accounts were dropped, if they were.
    pub fn fallback(&self) -> Option<&ConfigurationFallback> {
        self.fallback.as_ref()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Default for AccountRegistry {
    fn default() -> Self {
        Self::baseline()
    }
}

/// Split a comma-separated username list, trimming entries and skipping
/// empty ones. Any invalid handle rejects the whole list.
pub fn parse_extra_accounts(
    raw: &str,
) -> std::result::Result<Vec<String>, ConfigurationFallback> {
    raw.split(',')
        .map(normalize_handle)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            if is_valid_handle(entry) {
                Ok(entry.to_string())
            } else {
                Err(ConfigurationFallback::InvalidHandle(entry.to_string()))
            }
        })
        .collect()
}
