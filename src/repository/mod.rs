//! Repository layer for database operations
//!
//! Each entity has a store trait. [`Repository`] bundles one implementation of
//! each: PostgreSQL for production, or [`memory::MemoryStore`] for tests and
//! database-less runs. Every mutating method is atomic on its own.

pub mod bookings;
pub mod comments;
pub mod items;
pub mod memory;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        booking::{Booking, BookingStatus, NewBooking},
        comment::{Comment, NewComment},
        item::{Item, NewItem, UpdateItem},
        user::{CreateUser, UpdateUser, User},
        Page,
    },
};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait UsersStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>>;

    /// All users ordered by id
    async fn list(&self) -> AppResult<Vec<User>>;

    /// Case-insensitive email lookup, optionally ignoring one user
    async fn email_exists(&self, email: &str, exclude_id: Option<i64>) -> AppResult<bool>;

    /// Fails with `Conflict` when the email is taken
    async fn create(&self, user: &CreateUser) -> AppResult<User>;

    /// `None` when no user has this id
    async fn update(&self, id: i64, changes: &UpdateUser) -> AppResult<Option<User>>;

    /// Deletes the user with their items, bookings and comments
    async fn delete(&self, id: i64) -> AppResult<bool>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ItemsStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Item>>;

    /// Items of one owner ordered by id
    async fn list_by_owner(&self, owner_id: i64, page: Page) -> AppResult<Vec<Item>>;

    /// Available items whose name or description contains `text`, ignoring case
    async fn search(&self, text: &str, page: Page) -> AppResult<Vec<Item>>;

    async fn create(&self, item: &NewItem) -> AppResult<Item>;

    /// Applies `changes` only if `owner_id` owns the item
    async fn update(&self, id: i64, owner_id: i64, changes: &UpdateItem) -> AppResult<Option<Item>>;

    /// Deletes only if `owner_id` owns the item
    async fn delete(&self, id: i64, owner_id: i64) -> AppResult<bool>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait BookingsStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Booking>>;

    /// Bookings made by `booker_id`, latest start first
    async fn list_by_booker(&self, booker_id: i64) -> AppResult<Vec<Booking>>;

    /// Bookings of items owned by `owner_id`, latest start first
    async fn list_by_owner(&self, owner_id: i64) -> AppResult<Vec<Booking>>;

    /// Inserts a `Waiting` booking. Fails with `Validation` if the item is no
    /// longer available when the insert runs.
    async fn create(&self, booking: &NewBooking) -> AppResult<Booking>;

    /// Compare-and-set on the status. `None` when the booking is not in `from`.
    async fn transition(&self, id: i64, from: BookingStatus, to: BookingStatus) -> AppResult<Option<Booking>>;

    /// Approved booking of the item with the latest start before `now`
    async fn last_approved(&self, item_id: i64, now: DateTime<Utc>) -> AppResult<Option<Booking>>;

    /// Approved booking of the item with the earliest start after `now`
    async fn next_approved(&self, item_id: i64, now: DateTime<Utc>) -> AppResult<Option<Booking>>;

    /// Whether `booker_id` has a booking of the item that ended before `now`
    async fn has_finished(&self, booker_id: i64, item_id: i64, now: DateTime<Utc>) -> AppResult<bool>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait CommentsStore: Send + Sync {
    /// Comments on an item, oldest first
    async fn list_by_item(&self, item_id: i64) -> AppResult<Vec<Comment>>;

    async fn create(&self, comment: &NewComment) -> AppResult<Comment>;
}

/// Main repository struct holding one store per entity
#[derive(Clone)]
pub struct Repository {
    pub users: Arc<dyn UsersStore>,
    pub items: Arc<dyn ItemsStore>,
    pub bookings: Arc<dyn BookingsStore>,
    pub comments: Arc<dyn CommentsStore>,
}

impl Repository {
    /// Create a PostgreSQL-backed repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: Arc::new(users::UsersRepository::new(pool.clone())),
            items: Arc::new(items::ItemsRepository::new(pool.clone())),
            bookings: Arc::new(bookings::BookingsRepository::new(pool.clone())),
            comments: Arc::new(comments::CommentsRepository::new(pool)),
        }
    }

    /// Create a repository backed by a fresh in-memory store
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::default());
        Self {
            users: store.clone(),
            items: store.clone(),
            bookings: store.clone(),
            comments: store,
        }
    }
}
