use serde::{Deserialize, Deserializer};
use utoipa::{IntoParams, ToSchema};

use crate::store::PageRequest;

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Default, Clone, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    /// Page size, default 10, at most 100.
    #[serde(default, deserialize_with = "lenient_number")]
    pub limit: Option<i64>,
    /// Rows to skip, default 0.
    #[serde(default, deserialize_with = "lenient_number")]
    pub offset: Option<i64>,
}

// Values that are not integers count as absent and fall back to the defaults.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.trim().parse().ok()))
}

impl Pagination {
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self { limit, offset }
    }

    /// A missing or non-positive limit falls back to the default; larger
    /// values are clamped to the maximum. Negative offsets become 0.
    pub fn normalize(&self) -> (i64, i64) {
        let limit = match self.limit {
            Some(l) if l > 0 => l.min(MAX_LIMIT),
            _ => DEFAULT_LIMIT,
        };
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }

    pub fn page_request(&self) -> PageRequest {
        let (limit, offset) = self.normalize();
        PageRequest::new(limit as u64, offset as u64)
    }
}
