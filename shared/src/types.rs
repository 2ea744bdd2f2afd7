//! Common types used across the ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefixes for human-readable identifiers
pub const LOT_CODE_PREFIX: &str = "LOT";
pub const MOVEMENT_CODE_PREFIX: &str = "MOV";
pub const REQUEST_CODE_PREFIX: &str = "REQ";

/// Generate a human-readable identifier, e.g. `LOT-1718000000-3F9A1C`.
///
/// The suffix is random so two codes minted in the same second differ.
pub fn generate_reference_code(prefix: &str, now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        prefix,
        now.timestamp(),
        suffix[..6].to_ascii_uppercase()
    )
}

/// Page window for list operations
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number
    pub page: u32,
    pub limit: u32,
}

impl Page {
    /// Build a page from raw query values.
    ///
    /// A page below 1 becomes 1. A missing or non-positive limit falls back
    /// to `default_limit`; a limit above `max_limit` is clamped to it.
    pub fn from_query(
        page: Option<i64>,
        limit: Option<i64>,
        default_limit: u32,
        max_limit: u32,
    ) -> Self {
        let page = page
            .filter(|p| *p >= 1)
            .and_then(|p| u32::try_from(p).ok())
            .unwrap_or(1);
        let limit = limit
            .filter(|l| *l >= 1)
            .map(|l| l.min(i64::from(max_limit)))
            .and_then(|l| u32::try_from(l).ok())
            .unwrap_or(default_limit);
        Self { page, limit }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    /// Apply the window to an already ordered sequence
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        items
            .into_iter()
            .skip(offset)
            .take(self.limit as usize)
            .collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_code_format() {
        let now = chrono::TimeZone::timestamp_opt(&Utc, 1_718_000_000, 0).unwrap();
        let code = generate_reference_code(LOT_CODE_PREFIX, now);
        let parts: Vec<&str> = code.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "LOT");
        assert_eq!(parts[1], "1718000000");
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_reference_codes_differ_within_a_second() {
        let now = Utc::now();
        let a = generate_reference_code(REQUEST_CODE_PREFIX, now);
        let b = generate_reference_code(REQUEST_CODE_PREFIX, now);
        assert_ne!(a, b);
    }

    #[test]
    fn test_page_from_query_clamps() {
        assert_eq!(Page::from_query(None, None, 100, 100), Page { page: 1, limit: 100 });
        assert_eq!(Page::from_query(Some(0), Some(0), 50, 100), Page { page: 1, limit: 50 });
        assert_eq!(Page::from_query(Some(3), Some(101), 50, 100), Page { page: 3, limit: 100 });
        assert_eq!(Page::from_query(None, Some(i64::MAX), 50, 100), Page { page: 1, limit: 100 });
        assert_eq!(Page::from_query(Some(-2), Some(20), 50, 100), Page { page: 1, limit: 20 });
    }

    #[test]
    fn test_page_slice() {
        let page = Page { page: 2, limit: 3 };
        assert_eq!(page.offset(), 3);
        assert_eq!(page.slice((1..=8).collect()), vec![4, 5, 6]);
        assert!(Page { page: 4, limit: 3 }.slice((1..=8).collect::<Vec<i32>>()).is_empty());
    }
}
