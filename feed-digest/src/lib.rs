pub mod types;
pub mod parser;
pub mod traits;
pub mod duration;
pub mod fetcher;
pub mod aggregator;
pub mod ranker;
pub mod registry;
pub mod render;

pub use types::*;
pub use parser::FeedParser;
pub use traits::{DurationLookup, NoopDurationLookup};
pub use duration::VideoInfoLookup;
pub use fetcher::{FetchJob, Fetcher};
pub use aggregator::{AggregateReport, Aggregator};
pub use registry::{GroupSelector, SourceRegistry};
