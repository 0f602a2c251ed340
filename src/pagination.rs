use serde::{Deserialize, Serialize};

const MAX_LIMIT: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    /// `(limit, offset)` with the limit clamped to `1..=100`.
    pub fn resolve(&self, default_limit: i64) -> (i64, i64) {
        let limit = self.limit.unwrap_or(default_limit).clamp(1, MAX_LIMIT);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

impl PageInfo {
    pub fn new(limit: i64, offset: i64, returned: usize) -> Self {
        Self {
            limit,
            offset,
            has_more: returned as i64 == limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        assert_eq!(Pagination::default().resolve(20), (20, 0));
        let p = Pagination { limit: Some(1000), offset: Some(-5) };
        assert_eq!(p.resolve(20), (100, 0));
        let p = Pagination { limit: Some(0), offset: Some(40) };
        assert_eq!(p.resolve(20), (1, 40));
    }

    #[test]
    fn has_more_when_page_is_full() {
        assert!(PageInfo::new(20, 0, 20).has_more);
        assert!(!PageInfo::new(20, 0, 7).has_more);
        let json = serde_json::to_value(PageInfo::new(5, 10, 5)).unwrap();
        assert_eq!(json["hasMore"], true);
    }
}
