use std::str::FromStr;

use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::error::ApiError;

pub mod attendance;
pub mod certificate;
pub mod contract;
pub mod dashboard;
pub mod document_request;
pub mod employee;
pub mod leave_request;
pub mod message;

pub const DEFAULT_PER_PAGE: u64 = 10;
pub const MAX_PER_PAGE: u64 = 100;

/// One page of an in-memory list.
pub struct Paged<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Slices `items` to the requested page (1-based, clamped).
pub fn paginate<T>(items: Vec<T>, page: Option<u64>, per_page: Option<u64>) -> Paged<T> {
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    let page = page.unwrap_or(1).max(1);
    let total = items.len();
    let offset = usize::try_from((page - 1).saturating_mul(per_page)).unwrap_or(usize::MAX);

    let data = items
        .into_iter()
        .skip(offset)
        .take(per_page as usize)
        .collect();

    Paged {
        data,
        page: u32::try_from(page).unwrap_or(u32::MAX),
        per_page: per_page as u32,
        total: total as i64,
    }
}

/// Parses an optional query-string enum, answering 400 on junk.
pub fn parse_filter<T: FromStr>(field: &str, raw: Option<&str>) -> Result<Option<T>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse::<T>()
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("Invalid {field}: {s}"))),
    }
}

/// Office-local wall clock.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn today() -> NaiveDate {
    local_now().date()
}

pub fn require_text(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{field} must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::leave_request::LeaveStatus;

    #[test]
    fn paginate_clamps_and_counts() {
        let items: Vec<u32> = (1..=25).collect();

        let p = paginate(items.clone(), Some(3), Some(10));
        assert_eq!(p.data, vec![21, 22, 23, 24, 25]);
        assert_eq!((p.page, p.per_page, p.total), (3, 10, 25));

        let p = paginate(items.clone(), Some(0), Some(0));
        assert_eq!((p.page, p.per_page), (1, 1));
        assert_eq!(p.data, vec![1]);

        let p = paginate(items.clone(), None, Some(1000));
        assert_eq!(p.per_page, 100);
        assert_eq!(p.data.len(), 25);

        let p = paginate(items, Some(99), None);
        assert!(p.data.is_empty());
        assert_eq!(p.total, 25);
    }

    #[test]
    fn parse_filter_treats_blank_as_absent() {
        let none: Option<LeaveStatus> = parse_filter("status", Some("  ")).unwrap();
        assert!(none.is_none());
        let some: Option<LeaveStatus> = parse_filter("status", Some("approved")).unwrap();
        assert_eq!(some, Some(LeaveStatus::Approved));
        assert!(parse_filter::<LeaveStatus>("status", Some("maybe")).is_err());
    }
}
