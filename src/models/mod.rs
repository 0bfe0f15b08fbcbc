//! Response envelopes and paging shared by every API

use serde::{Deserialize, Serialize};

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Pagination parameters
#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub struct PaginationParams {
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

impl PaginationParams {
    /// Page is 1-based, limit clamped to 1..=100 (default 20)
    pub fn resolve(&self) -> (i32, i32) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(20).clamp(1, 100);
        (page, limit)
    }

    pub fn offset(&self) -> i64 {
        let (page, limit) = self.resolve();
        ((page - 1) as i64) * limit as i64
    }
}

/// Paginated response
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i32,
    pub limit: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults_and_clamping() {
        let params = PaginationParams::default();
        assert_eq!(params.resolve(), (1, 20));
        assert_eq!(params.offset(), 0);

        let params = PaginationParams {
            page: Some(3),
            limit: Some(500),
        };
        assert_eq!(params.resolve(), (3, 100));
        assert_eq!(params.offset(), 200);

        let params = PaginationParams {
            page: Some(-2),
            limit: Some(0),
        };
        assert_eq!(params.resolve(), (1, 1));
    }
}
