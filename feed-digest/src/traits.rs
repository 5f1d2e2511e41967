use crate::types::Result;
use async_trait::async_trait;

/// Secondary per-item lookup that yields a human-readable duration.
///
/// Implementations may fail freely; callers treat any error as "duration
/// unknown" and still emit the item.
#[async_trait]
pub trait DurationLookup: Send + Sync {
    async fn duration(&self, item_id: &str) -> Result<String>;
}

/// Lookup used when enrichment is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDurationLookup;

#[async_trait]
impl DurationLookup for NoopDurationLookup {
    async fn duration(&self, _item_id: &str) -> Result<String> {
        Ok(String::new())
    }
}
