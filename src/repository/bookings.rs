//! Bookings repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use super::BookingsStore;
use crate::{
    error::{AppError, AppResult},
    models::booking::{Booking, BookingStatus, NewBooking},
};

const BOOKING_SELECT: &str = r#"
    SELECT b.id, b.start_date, b.end_date, b.status,
           b.item_id, i.name AS item_name, i.owner_id AS item_owner_id,
           b.booker_id, u.name AS booker_name
    FROM bookings b
    JOIN items i ON i.id = b.item_id
    JOIN users u ON u.id = b.booker_id
"#;

#[derive(Clone)]
pub struct BookingsRepository {
    pool: Pool<Postgres>,
}

impl BookingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Approved booking of an item nearest to `now` on one side
    async fn nearest_approved(&self, item_id: i64, now: DateTime<Utc>, before: bool) -> AppResult<Option<Booking>> {
        let condition = if before {
            "b.start_date < $2 ORDER BY b.start_date DESC"
        } else {
            "b.start_date > $2 ORDER BY b.start_date ASC"
        };
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "{} WHERE b.item_id = $1 AND b.status = $3 AND {} LIMIT 1",
            BOOKING_SELECT, condition
        ))
        .bind(item_id)
        .bind(now)
        .bind(BookingStatus::Approved)
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }
}

#[async_trait]
impl BookingsStore for BookingsRepository {
    /// Get booking by ID
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(&format!("{} WHERE b.id = $1", BOOKING_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(booking)
    }

    async fn list_by_booker(&self, booker_id: i64) -> AppResult<Vec<Booking>> {
        let bookings = sqlx::query_as::<_, Booking>(&format!(
            "{} WHERE b.booker_id = $1 ORDER BY b.start_date DESC, b.id DESC",
            BOOKING_SELECT
        ))
        .bind(booker_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(bookings)
    }

    async fn list_by_owner(&self, owner_id: i64) -> AppResult<Vec<Booking>> {
        let bookings = sqlx::query_as::<_, Booking>(&format!(
            "{} WHERE i.owner_id = $1 ORDER BY b.start_date DESC, b.id DESC",
            BOOKING_SELECT
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(bookings)
    }

    /// Create a booking while holding a lock on the item row
    async fn create(&self, booking: &NewBooking) -> AppResult<Booking> {
        let mut tx = self.pool.begin().await?;

        let available: bool = sqlx::query_scalar("SELECT available FROM items WHERE id = $1 FOR SHARE")
            .bind(booking.item_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item #{} not found", booking.item_id)))?;

        if !available {
            return Err(AppError::Validation(format!("Item #{} is unavailable", booking.item_id)));
        }

        let booking_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO bookings (start_date, end_date, item_id, booker_id, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(booking.start)
        .bind(booking.end)
        .bind(booking.item_id)
        .bind(booking.booker_id)
        .bind(BookingStatus::Waiting)
        .fetch_one(&mut *tx)
        .await?;

        let created = sqlx::query_as::<_, Booking>(&format!("{} WHERE b.id = $1", BOOKING_SELECT))
            .bind(booking_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn transition(&self, id: i64, from: BookingStatus, to: BookingStatus) -> AppResult<Option<Booking>> {
        let updated: Option<i64> = sqlx::query_scalar(
            "UPDATE bookings SET status = $3 WHERE id = $1 AND status = $2 RETURNING id",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(id) => self.find_by_id(id).await,
            None => Ok(None),
        }
    }

    async fn last_approved(&self, item_id: i64, now: DateTime<Utc>) -> AppResult<Option<Booking>> {
        self.nearest_approved(item_id, now, true).await
    }

    async fn next_approved(&self, item_id: i64, now: DateTime<Utc>) -> AppResult<Option<Booking>> {
        self.nearest_approved(item_id, now, false).await
    }

    async fn has_finished(&self, booker_id: i64, item_id: i64, now: DateTime<Utc>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM bookings WHERE booker_id = $1 AND item_id = $2 AND end_date < $3)",
        )
        .bind(booker_id)
        .bind(item_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
