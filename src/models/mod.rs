//! Data models for ShareIt

pub mod booking;
pub mod comment;
pub mod item;
pub mod user;

use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::{AppError, AppResult};

// Re-export commonly used types
pub use booking::{Booking, BookingDetails, BookingShort, BookingState, BookingStatus};
pub use comment::Comment;
pub use item::{Item, ItemDetails, ItemShort};
pub use user::{User, UserShort};

const DEFAULT_PAGE_SIZE: i64 = 10;

/// Offset pagination query (`from` is an element offset, not a page number)
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Index of the first element to return (default: 0)
    pub from: Option<i64>,
    /// Maximum number of elements to return (default: 10)
    pub size: Option<i64>,
}

/// Validated pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: i64,
    pub limit: i64,
}

impl Page {
    pub fn new(from: i64, size: i64) -> AppResult<Self> {
        if from < 0 || size <= 0 {
            return Err(AppError::BadRequest(
                "from must not be negative and size must be positive".to_string(),
            ));
        }
        Ok(Self { offset: from, limit: size })
    }

    /// Apply this window to an already ordered sequence
    pub fn slice<T>(&self, elements: impl IntoIterator<Item = T>) -> Vec<T> {
        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
        elements.into_iter().skip(offset).take(limit).collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { offset: 0, limit: DEFAULT_PAGE_SIZE }
    }
}

impl TryFrom<PageQuery> for Page {
    type Error = AppError;

    fn try_from(query: PageQuery) -> AppResult<Self> {
        Page::new(query.from.unwrap_or(0), query.size.unwrap_or(DEFAULT_PAGE_SIZE))
    }
}
