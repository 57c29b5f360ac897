use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    User,
    List,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::User => f.write_str("user"),
            SourceKind::List => f.write_str("list"),
        }
    }
}

/// A tracked feed origin.
///
/// Lists have no natural author avatar, so their sidebar name and avatar are
/// carried here. Users only need a handle; everything else comes from the feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Source {
    List {
        key: String,
        list_id: String,
        display_name: Option<String>,
        avatar: Option<String>,
    },
    User {
        username: String,
    },
}

impl Source {
    pub fn user(username: impl Into<String>) -> Self {
        Source::User { username: username.into() }
    }

    pub fn list(key: impl Into<String>, list_id: impl Into<String>) -> Self {
        Source::List {
            key: key.into(),
            list_id: list_id.into(),
            display_name: None,
            avatar: None,
        }
    }

    pub fn with_display(self, name: Option<&str>, avatar: Option<&str>) -> Self {
        match self {
            Source::List { key, list_id, .. } => Source::List {
                key,
                list_id,
                display_name: name.map(str::to_owned),
                avatar: avatar.map(str::to_owned),
            },
            user @ Source::User { .. } => user,
        }
    }

    /// The selection key. Unique across a registry.
    pub fn identifier(&self) -> &str {
        match self {
            Source::List { key, .. } => key,
            Source::User { username } => username,
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Source::List { .. } => SourceKind::List,
            Source::User { .. } => SourceKind::User,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, rename = "url", deserialize_with = "null_as_default")]
    pub profile_url: String,
    #[serde(default, rename = "avatar", deserialize_with = "null_as_default")]
    pub avatar_url: String,
}

// Field names follow the gateway's JSON Feed output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFeedItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, rename = "content_html", deserialize_with = "null_as_default")]
    pub content_markup: String,
    #[serde(default, rename = "date_published", deserialize_with = "null_as_default")]
    pub published_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub authors: Vec<Author>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFeedPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<RawFeedItem>,
}

/// A feed item that survived filtering. Never a reply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedItem {
    pub id: String,
    pub url: String,
    pub published_at: String,
    pub content_markup: String,
    pub author: Author,
}

impl NormalizedItem {
    pub fn published(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.published_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SourceStatus {
    #[default]
    Loaded,
    Failed {
        reason: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub identifier: String,
    pub kind: SourceKind,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub status: SourceStatus,
}

impl AccountInfo {
    /// Sidebar entry for a source whose feed never arrived.
    pub fn failed(source: &Source, reason: impl Into<String>) -> Self {
        let (display_name, avatar_url) = match source {
            Source::List { display_name, avatar, .. } => (display_name.clone(), avatar.clone()),
            Source::User { .. } => (None, None),
        };
        Self {
            identifier: source.identifier().to_owned(),
            kind: source.kind(),
            display_name,
            avatar_url,
            status: SourceStatus::Failed { reason: reason.into() },
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.status == SourceStatus::Loaded
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub account_info: AccountInfo,
    pub items: Vec<NormalizedItem>,
}

/// What the rendering side receives for one request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    pub selected: String,
    pub sidebar: Vec<AccountInfo>,
    pub active: Vec<NormalizedItem>,
}

// Object style note:
// Everything except `Source` is request-scoped. A registry of sources is
// built once at startup and shared read-only; the rest is produced fresh on
// each aggregation pass and dropped once the response has been written.
