//! Offset pagination for listings.

use thiserror::Error;

/// A requested page number, as given in `?page=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    Number(u64),
    Last,
}

impl PageRequest {
    /// Parse the raw `page` query value. A missing or empty value means page 1.
    pub fn parse(raw: Option<&str>) -> Result<Self, PageError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(PageRequest::Number(1)),
            Some("last") => Ok(PageRequest::Last),
            Some(value) => value
                .parse::<u64>()
                .map(PageRequest::Number)
                .map_err(|_| PageError::NotANumber(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("Page `{0}` is not \"last\", nor can it be converted to a number.")]
    NotANumber(String),
    #[error("Invalid page ({0}): That page contains no results")]
    OutOfRange(u64),
}

/// Position of one page within a listing of `total` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub num_pages: u64,
    pub per_page: u64,
    pub total: u64,
}

impl PageWindow {
    /// Resolve `request` against a listing of `total` items. The first page
    /// always exists, even when the listing is empty.
    pub fn resolve(request: PageRequest, total: u64, per_page: u64) -> Result<Self, PageError> {
        let num_pages = total.div_ceil(per_page).max(1);
        let number = match request {
            PageRequest::Last => num_pages,
            PageRequest::Number(n) if n >= 1 && n <= num_pages => n,
            PageRequest::Number(n) => return Err(PageError::OutOfRange(n)),
        };
        Ok(Self {
            number,
            num_pages,
            per_page,
            total,
        })
    }

    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.per_page
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn previous_number(&self) -> u64 {
        self.number.saturating_sub(1).max(1)
    }

    pub fn next_number(&self) -> u64 {
        (self.number + 1).min(self.num_pages)
    }
}

/// One page of items plus where it sits in the listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub window: PageWindow,
}
