//! Booking model, status machine and state filters

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{item::ItemShort, user::UserShort};
use crate::error::AppError;

/// Booking status. `Waiting` is initial, every other status is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "booking_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Waiting,
    Approved,
    Rejected,
    Canceled,
}

impl BookingStatus {
    /// Status an owner's decision moves a booking to
    pub fn from_decision(approved: bool) -> Self {
        if approved {
            BookingStatus::Approved
        } else {
            BookingStatus::Rejected
        }
    }

    /// Only `Waiting -> Approved` and `Waiting -> Rejected` are defined.
    pub fn can_transition_to(self, target: BookingStatus) -> bool {
        self == BookingStatus::Waiting
            && matches!(target, BookingStatus::Approved | BookingStatus::Rejected)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BookingStatus::Waiting => "WAITING",
            BookingStatus::Approved => "APPROVED",
            BookingStatus::Rejected => "REJECTED",
            BookingStatus::Canceled => "CANCELED",
        };
        f.write_str(label)
    }
}

/// Client-selected bucket applied to a booking list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookingState {
    #[default]
    All,
    Current,
    Past,
    Future,
    Waiting,
    Rejected,
}

impl FromStr for BookingState {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALL" => Ok(BookingState::All),
            "CURRENT" => Ok(BookingState::Current),
            "PAST" => Ok(BookingState::Past),
            "FUTURE" => Ok(BookingState::Future),
            "WAITING" => Ok(BookingState::Waiting),
            "REJECTED" => Ok(BookingState::Rejected),
            other => Err(AppError::UnknownState(other.to_string())),
        }
    }
}

impl BookingState {
    /// Parse an optional filter name; absent means `All`
    pub fn parse_or_default(raw: Option<&str>) -> Result<Self, AppError> {
        raw.map(str::parse::<Self>).transpose().map(Option::unwrap_or_default)
    }

    pub fn matches(self, booking: &Booking, now: DateTime<Utc>) -> bool {
        match self {
            BookingState::All => true,
            BookingState::Current => booking.start_date <= now && now <= booking.end_date,
            BookingState::Past => now > booking.end_date,
            BookingState::Future => now < booking.start_date,
            BookingState::Waiting => booking.status == BookingStatus::Waiting,
            BookingState::Rejected => booking.status == BookingStatus::Rejected,
        }
    }

    /// Keep the bookings in this bucket, preserving order
    pub fn filter(self, bookings: Vec<Booking>, now: DateTime<Utc>) -> Vec<Booking> {
        bookings.into_iter().filter(|b| self.matches(b, now)).collect()
    }
}

/// Booking joined with the item and booker it references
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Booking {
    pub id: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: BookingStatus,
    pub item_id: i64,
    pub item_name: String,
    pub item_owner_id: i64,
    pub booker_id: i64,
    pub booker_name: String,
}

impl Booking {
    /// Only the booker and the item's owner may see a booking
    pub fn is_visible_to(&self, user_id: i64) -> bool {
        self.booker_id == user_id || self.item_owner_id == user_id
    }
}

/// Booking to insert; always starts out `Waiting`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub item_id: i64,
    pub booker_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Parse an RFC 3339 timestamp, or a local date-time without offset read as UTC
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.and_utc()))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| parse_timestamp(&raw).map_err(serde::de::Error::custom))
        .transpose()
}

/// Create booking request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBooking {
    #[validate(required(message = "itemId is required"))]
    pub item_id: Option<i64>,
    /// UTC; an offset-less value such as `2030-01-01T10:00:00` is read as UTC
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    #[validate(required(message = "start is required"))]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    #[validate(required(message = "end is required"))]
    pub end: Option<DateTime<Utc>>,
}

/// Booking view returned by the booking endpoints
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingDetails {
    pub id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: BookingStatus,
    pub booker: UserShort,
    pub item: ItemShort,
}

impl From<Booking> for BookingDetails {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            start: booking.start_date,
            end: booking.end_date,
            status: booking.status,
            booker: UserShort {
                id: booking.booker_id,
                name: booking.booker_name,
            },
            item: ItemShort {
                id: booking.item_id,
                name: booking.item_name,
            },
        }
    }
}

/// Booking reference shown on an item as last/next booking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingShort {
    pub id: i64,
    pub booker_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl From<Booking> for BookingShort {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            booker_id: booking.booker_id,
            start: booking.start_date,
            end: booking.end_date,
        }
    }
}

/// Booking list query
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookingListQuery {
    /// ALL, CURRENT, PAST, FUTURE, WAITING or REJECTED (default: ALL)
    pub state: Option<String>,
}

/// Owner's decision on a waiting booking
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ApproveQuery {
    pub approved: bool,
}
