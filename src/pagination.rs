//! This modules defines the common functionality for paging data.

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The number of items per page when not specified in a request.
    pub default_page_size: u64,
    /// The largest page size a client may request.
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 5,
            max_page_size: 100,
        }
    }
}

/// A validated page number and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// The 1-based page number.
    pub number: u64,
    /// The maximum number of items on the page.
    pub size: u64,
}

impl Page {
    /// Resolve the raw `page` and `limit` query values into a [Page].
    ///
    /// Missing, non-numeric, and non-positive values fall back to the defaults
    /// in `config`. The page size is capped at `config.max_page_size`.
    pub fn from_query(page: Option<&str>, limit: Option<&str>, config: &PaginationConfig) -> Self {
        let number = parse_positive(page).unwrap_or(config.default_page);
        let size = parse_positive(limit)
            .unwrap_or(config.default_page_size)
            .min(config.max_page_size);

        Self { number, size }
    }

    /// The number of items that come before this page.
    pub fn offset(&self) -> u64 {
        (self.number - 1).saturating_mul(self.size)
    }

    /// The number of pages needed to show `item_count` items.
    pub fn page_count(&self, item_count: u64) -> u64 {
        item_count.div_ceil(self.size)
    }
}

fn parse_positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|&value| value > 0)
}
