//! Shared query parameter types for API handlers.

use serde::Deserialize;

use schoolnet_core::types::DbId;

/// Largest page any list endpoint returns.
pub const MAX_LIMIT: i64 = 100;
const DEFAULT_LIMIT: i64 = 25;

/// Generic pagination parameters (`?limit=&offset=`).
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PaginationParams {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Query parameters for `GET /notifications`.
#[derive(Debug, Deserialize)]
pub struct NotificationListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub unread_only: bool,
}

impl NotificationListParams {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// Optional `?counselor_id=` filter.
#[derive(Debug, Deserialize)]
pub struct CounselorFilter {
    pub counselor_id: Option<DbId>,
}
