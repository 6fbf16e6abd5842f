//! Item model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{booking::BookingShort, comment::Comment};

/// Item record as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: String,
    /// Only available items can be booked or found by search
    pub available: bool,
    /// Item request this item was listed in answer to
    #[serde(rename = "request")]
    pub request_id: Option<i64>,
}

/// Minimal item reference embedded in booking views
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ItemShort {
    pub id: i64,
    pub name: String,
}

/// Item view returned by read endpoints
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetails {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub available: bool,
    #[serde(rename = "request")]
    pub request_id: Option<i64>,
    /// Latest approved booking that has started (owner only)
    pub last_booking: Option<BookingShort>,
    /// Earliest approved booking that has not started yet (owner only)
    pub next_booking: Option<BookingShort>,
    pub comments: Vec<Comment>,
}

impl From<Item> for ItemDetails {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            name: item.name,
            description: item.description,
            available: item.available,
            request_id: item.request_id,
            last_booking: None,
            next_booking: None,
            comments: Vec::new(),
        }
    }
}

/// Create item request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateItem {
    #[validate(length(min = 1, max = 255, message = "Name must not be empty"))]
    pub name: String,
    #[validate(length(min = 1, max = 1000, message = "Description must not be empty"))]
    pub description: String,
    #[validate(required(message = "Availability must be specified"))]
    pub available: Option<bool>,
    #[serde(rename = "request", alias = "requestId")]
    pub request_id: Option<i64>,
}

/// Item to insert, after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub owner_id: i64,
    pub name: String,
    pub description: String,
    pub available: bool,
    pub request_id: Option<i64>,
}

/// Partial item update; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate, ToSchema)]
pub struct UpdateItem {
    #[validate(length(max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub available: Option<bool>,
}

impl UpdateItem {
    /// Trims name and description; blank means "keep the current value"
    pub fn without_blanks(self) -> Self {
        fn trimmed(value: Option<String>) -> Option<String> {
            value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }

        Self {
            name: trimmed(self.name),
            description: trimmed(self.description),
            available: self.available,
        }
    }
}

/// Free-text search query
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ItemSearchQuery {
    /// Text matched against name and description, case-insensitively
    #[serde(default)]
    pub text: String,
    pub from: Option<i64>,
    pub size: Option<i64>,
}
