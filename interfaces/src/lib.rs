pub mod defs;

pub use defs::{
    AccountInfo, AggregatedResult, Author, NormalizedItem, RawFeedItem, RawFeedPayload, Source,
    SourceKind, SourceStatus, Timeline,
};
