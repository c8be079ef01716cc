use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct Meta {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub total: Option<i64>,
}

impl Meta {
    pub fn new(limit: i64, offset: i64, total: i64) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
            total: Some(total),
        }
    }

    pub fn empty() -> Self {
        Self {
            limit: None,
            offset: None,
            total: None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}
