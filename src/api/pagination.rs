use serde::Deserialize;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Raw `page`/`limit` query parameters
///
/// Kept as strings so malformed values fall back to defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    page: Option<String>,
    limit: Option<String>,
}

impl PageParams {
    /// 1-based page number; anything unparsable or below 1 is page 1
    pub fn page(&self) -> i64 {
        page_number(self.page.as_deref()) as i64
    }

    pub fn limit(&self) -> i64 {
        bounded_limit(self.limit.as_deref(), DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }
}

/// Raw `limit` query parameter for unpaginated lists
#[derive(Debug, Default, Deserialize)]
pub struct LimitParam {
    limit: Option<String>,
}

impl LimitParam {
    pub fn resolve(&self, default: i64, max: i64) -> i64 {
        bounded_limit(self.limit.as_deref(), default, max)
    }
}

pub fn page_number(raw: Option<&str>) -> u32 {
    raw.and_then(|p| p.trim().parse::<u32>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1)
}

fn bounded_limit(raw: Option<&str>, default: i64, max: i64) -> i64 {
    raw.and_then(|l| l.trim().parse::<i64>().ok())
        .filter(|l| *l >= 1)
        .map(|l| l.min(max))
        .unwrap_or(default)
}
