//! In-memory implementation of the store traits
//!
//! All entities live behind one mutex, so each trait method is atomic and
//! cross-entity reads (joins, cascades) see a consistent snapshot.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{BookingsStore, CommentsStore, ItemsStore, UsersStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{Booking, BookingStatus, NewBooking},
        comment::{Comment, NewComment},
        item::{Item, NewItem, UpdateItem},
        user::{CreateUser, UpdateUser, User},
        Page,
    },
};

#[derive(Debug, Clone)]
struct StoredBooking {
    id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    item_id: i64,
    booker_id: i64,
    status: BookingStatus,
}

#[derive(Debug, Clone)]
struct StoredComment {
    id: i64,
    text: String,
    item_id: i64,
    author_id: i64,
    created: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    items: BTreeMap<i64, Item>,
    bookings: BTreeMap<i64, StoredBooking>,
    comments: BTreeMap<i64, StoredComment>,
    last_user_id: i64,
    last_item_id: i64,
    last_booking_id: i64,
    last_comment_id: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl Tables {
    fn email_taken(&self, email: &str, exclude_id: Option<i64>) -> bool {
        let email = email.to_lowercase();
        self.users
            .values()
            .any(|u| Some(u.id) != exclude_id && u.email.to_lowercase() == email)
    }

    fn join_booking(&self, stored: &StoredBooking) -> AppResult<Booking> {
        let item = self.items.get(&stored.item_id).ok_or_else(|| {
            AppError::Internal(format!("Booking #{} references missing item #{}", stored.id, stored.item_id))
        })?;
        let booker = self.users.get(&stored.booker_id).ok_or_else(|| {
            AppError::Internal(format!("Booking #{} references missing user #{}", stored.id, stored.booker_id))
        })?;
        Ok(Booking {
            id: stored.id,
            start_date: stored.start,
            end_date: stored.end,
            status: stored.status,
            item_id: item.id,
            item_name: item.name.clone(),
            item_owner_id: item.owner_id,
            booker_id: booker.id,
            booker_name: booker.name.clone(),
        })
    }

    fn join_comment(&self, stored: &StoredComment) -> AppResult<Comment> {
        let author = self.users.get(&stored.author_id).ok_or_else(|| {
            AppError::Internal(format!("Comment #{} references missing user #{}", stored.id, stored.author_id))
        })?;
        Ok(Comment {
            id: stored.id,
            text: stored.text.clone(),
            item_id: stored.item_id,
            author_id: author.id,
            author_name: author.name.clone(),
            created: stored.created,
        })
    }

    /// Joined bookings matching `filter`, latest start first
    fn bookings_where(&self, filter: impl Fn(&StoredBooking, &Item) -> bool) -> AppResult<Vec<Booking>> {
        let mut bookings = self
            .bookings
            .values()
            .filter(|b| self.items.get(&b.item_id).map(|item| filter(b, item)).unwrap_or(false))
            .map(|b| self.join_booking(b))
            .collect::<AppResult<Vec<_>>>()?;
        bookings.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(b.id.cmp(&a.id)));
        Ok(bookings)
    }

    fn delete_item_cascade(&mut self, item_id: i64) {
        self.items.remove(&item_id);
        self.bookings.retain(|_, b| b.item_id != item_id);
        self.comments.retain(|_, c| c.item_id != item_id);
    }
}

/// Keyed in-memory storage with monotonic ids
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[async_trait]
impl UsersStore for MemoryStore {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        Ok(self.tables.lock().await.users.values().cloned().collect())
    }

    async fn email_exists(&self, email: &str, exclude_id: Option<i64>) -> AppResult<bool> {
        Ok(self.tables.lock().await.email_taken(email, exclude_id))
    }

    async fn create(&self, user: &CreateUser) -> AppResult<User> {
        let mut tables = self.tables.lock().await;
        if tables.email_taken(&user.email, None) {
            return Err(AppError::Conflict(format!("Email {} is already registered", user.email)));
        }
        let id = next_id(&mut tables.last_user_id);
        let created = User {
            id,
            name: user.name.clone(),
            email: user.email.clone(),
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i64, changes: &UpdateUser) -> AppResult<Option<User>> {
        let mut tables = self.tables.lock().await;
        if let Some(ref email) = changes.email {
            if tables.email_taken(email, Some(id)) {
                return Err(AppError::Conflict(format!("Email {} is already registered", email)));
            }
        }
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(ref name) = changes.name {
            user.name = name.clone();
        }
        if let Some(ref email) = changes.email {
            user.email = email.clone();
        }
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        let mut tables = self.tables.lock().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        let owned: Vec<i64> = tables.items.values().filter(|i| i.owner_id == id).map(|i| i.id).collect();
        for item_id in owned {
            tables.delete_item_cascade(item_id);
        }
        tables.bookings.retain(|_, b| b.booker_id != id);
        tables.comments.retain(|_, c| c.author_id != id);
        Ok(true)
    }
}

#[async_trait]
impl ItemsStore for MemoryStore {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Item>> {
        Ok(self.tables.lock().await.items.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner_id: i64, page: Page) -> AppResult<Vec<Item>> {
        let tables = self.tables.lock().await;
        Ok(page.slice(tables.items.values().filter(|i| i.owner_id == owner_id).cloned()))
    }

    async fn search(&self, text: &str, page: Page) -> AppResult<Vec<Item>> {
        let needle = text.to_lowercase();
        let tables = self.tables.lock().await;
        Ok(page.slice(
            tables
                .items
                .values()
                .filter(|i| i.available)
                .filter(|i| i.name.to_lowercase().contains(&needle) || i.description.to_lowercase().contains(&needle))
                .cloned(),
        ))
    }

    async fn create(&self, item: &NewItem) -> AppResult<Item> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&item.owner_id) {
            return Err(AppError::NotFound(format!("User #{} not found", item.owner_id)));
        }
        let id = next_id(&mut tables.last_item_id);
        let created = Item {
            id,
            owner_id: item.owner_id,
            name: item.name.clone(),
            description: item.description.clone(),
            available: item.available,
            request_id: item.request_id,
        };
        tables.items.insert(id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i64, owner_id: i64, changes: &UpdateItem) -> AppResult<Option<Item>> {
        let mut tables = self.tables.lock().await;
        let Some(item) = tables.items.get_mut(&id).filter(|i| i.owner_id == owner_id) else {
            return Ok(None);
        };
        if let Some(ref name) = changes.name {
            item.name = name.clone();
        }
        if let Some(ref description) = changes.description {
            item.description = description.clone();
        }
        if let Some(available) = changes.available {
            item.available = available;
        }
        Ok(Some(item.clone()))
    }

    async fn delete(&self, id: i64, owner_id: i64) -> AppResult<bool> {
        let mut tables = self.tables.lock().await;
        let owned = tables.items.get(&id).is_some_and(|i| i.owner_id == owner_id);
        if owned {
            tables.delete_item_cascade(id);
        }
        Ok(owned)
    }
}

#[async_trait]
impl BookingsStore for MemoryStore {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Booking>> {
        let tables = self.tables.lock().await;
        tables.bookings.get(&id).map(|b| tables.join_booking(b)).transpose()
    }

    async fn list_by_booker(&self, booker_id: i64) -> AppResult<Vec<Booking>> {
        self.tables.lock().await.bookings_where(|b, _| b.booker_id == booker_id)
    }

    async fn list_by_owner(&self, owner_id: i64) -> AppResult<Vec<Booking>> {
        self.tables.lock().await.bookings_where(|_, item| item.owner_id == owner_id)
    }

    async fn create(&self, booking: &NewBooking) -> AppResult<Booking> {
        let mut tables = self.tables.lock().await;
        let item = tables
            .items
            .get(&booking.item_id)
            .ok_or_else(|| AppError::NotFound(format!("Item #{} not found", booking.item_id)))?;
        if !item.available {
            return Err(AppError::Validation(format!("Item #{} is unavailable", booking.item_id)));
        }
        if !tables.users.contains_key(&booking.booker_id) {
            return Err(AppError::NotFound(format!("User #{} not found", booking.booker_id)));
        }
        let id = next_id(&mut tables.last_booking_id);
        let stored = StoredBooking {
            id,
            start: booking.start,
            end: booking.end,
            item_id: booking.item_id,
            booker_id: booking.booker_id,
            status: BookingStatus::Waiting,
        };
        let created = tables.join_booking(&stored)?;
        tables.bookings.insert(id, stored);
        Ok(created)
    }

    async fn transition(&self, id: i64, from: BookingStatus, to: BookingStatus) -> AppResult<Option<Booking>> {
        let mut tables = self.tables.lock().await;
        let Some(stored) = tables.bookings.get_mut(&id).filter(|b| b.status == from) else {
            return Ok(None);
        };
        stored.status = to;
        let stored = stored.clone();
        tables.join_booking(&stored).map(Some)
    }

    async fn last_approved(&self, item_id: i64, now: DateTime<Utc>) -> AppResult<Option<Booking>> {
        let tables = self.tables.lock().await;
        tables
            .bookings
            .values()
            .filter(|b| b.item_id == item_id && b.status == BookingStatus::Approved && b.start < now)
            .max_by_key(|b| b.start)
            .map(|b| tables.join_booking(b))
            .transpose()
    }

    async fn next_approved(&self, item_id: i64, now: DateTime<Utc>) -> AppResult<Option<Booking>> {
        let tables = self.tables.lock().await;
        tables
            .bookings
            .values()
            .filter(|b| b.item_id == item_id && b.status == BookingStatus::Approved && b.start > now)
            .min_by_key(|b| b.start)
            .map(|b| tables.join_booking(b))
            .transpose()
    }

    async fn has_finished(&self, booker_id: i64, item_id: i64, now: DateTime<Utc>) -> AppResult<bool> {
        let tables = self.tables.lock().await;
        Ok(tables
            .bookings
            .values()
            .any(|b| b.booker_id == booker_id && b.item_id == item_id && b.end < now))
    }
}

#[async_trait]
impl CommentsStore for MemoryStore {
    async fn list_by_item(&self, item_id: i64) -> AppResult<Vec<Comment>> {
        let tables = self.tables.lock().await;
        let mut comments = tables
            .comments
            .values()
            .filter(|c| c.item_id == item_id)
            .map(|c| tables.join_comment(c))
            .collect::<AppResult<Vec<_>>>()?;
        comments.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn create(&self, comment: &NewComment) -> AppResult<Comment> {
        let mut tables = self.tables.lock().await;
        if !tables.items.contains_key(&comment.item_id) {
            return Err(AppError::NotFound(format!("Item #{} not found", comment.item_id)));
        }
        let id = next_id(&mut tables.last_comment_id);
        let stored = StoredComment {
            id,
            text: comment.text.clone(),
            item_id: comment.item_id,
            author_id: comment.author_id,
            created: comment.created,
        };
        let created = tables.join_comment(&stored)?;
        tables.comments.insert(id, stored);
        Ok(created)
    }
}
