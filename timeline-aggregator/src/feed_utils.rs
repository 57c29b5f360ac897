/// Feed-specific utility functions for the aggregator

/// Account handle utilities
pub mod handle {
    /// Longest handle the platform accepts
    pub const MAX_HANDLE_LEN: usize = 15;

    /// Strip surrounding whitespace and a leading `@`
    pub fn normalize_handle(raw: &str) -> &str {
        let trimmed = raw.trim();
        trimmed.strip_prefix('@').unwrap_or(trimmed)
    }

    /// Check handle format: 1-15 ASCII letters, digits or underscores
    pub fn is_valid_handle(handle: &str) -> bool {
        !handle.is_empty()
            && handle.len() <= MAX_HANDLE_LEN
            && handle.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

/// Avatar URL utilities
pub mod avatar {
    const THUMBNAIL_SUFFIX: &str = "_normal";

    /// Turn a gateway thumbnail avatar URL into the full-size image URL
    pub fn full_size(url: &str) -> String {
        url.replacen(THUMBNAIL_SUFFIX, "", 1)
    }
}
