use async_trait::async_trait;

use crate::{domain::Cursor, Result};

/// Hexagonal port for the homework review API.
///
/// Implementations perform exactly one request per call and never retry; the
/// poll loop owns the retry cadence. The decoded body is returned untouched so
/// the shape checks in [`crate::validate`] run on exactly what the server sent.
#[async_trait]
pub trait HomeworkSource: Send + Sync {
    async fn fetch(&self, from_date: Cursor) -> Result<serde_json::Value>;
}
