//! Booking lifecycle service

use chrono::{DateTime, Utc};

use crate::{
    config::PolicyConfig,
    error::{AppError, AppResult},
    models::booking::{Booking, BookingState, BookingStatus, CreateBooking, NewBooking},
    repository::Repository,
};

/// Check a requested booking period against `now`
pub fn validate_period(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
    require_future: bool,
) -> AppResult<()> {
    if end <= start {
        return Err(AppError::Validation("Booking end must be after its start".to_string()));
    }
    if require_future && (start <= now || end <= now) {
        return Err(AppError::Validation("Booking period must be in the future".to_string()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct BookingsService {
    repository: Repository,
    policy: PolicyConfig,
}

impl BookingsService {
    pub fn new(repository: Repository, policy: PolicyConfig) -> Self {
        Self { repository, policy }
    }

    /// Request a booking of someone else's item
    pub async fn create(&self, request: CreateBooking, booker_id: i64) -> AppResult<Booking> {
        let (Some(item_id), Some(start), Some(end)) = (request.item_id, request.start, request.end) else {
            return Err(AppError::Validation("itemId, start and end are required".to_string()));
        };
        validate_period(start, end, Utc::now(), self.policy.require_future_booking_dates)?;

        let item = self
            .repository
            .items
            .find_by_id(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item #{} not found", item_id)))?;
        self.ensure_user(booker_id).await?;

        if item.owner_id == booker_id {
            return Err(AppError::NotFound("Owner can't book own item".to_string()));
        }
        if !item.available {
            return Err(AppError::Validation(format!("Item #{} is unavailable", item_id)));
        }

        let booking = self
            .repository
            .bookings
            .create(&NewBooking { item_id, booker_id, start, end })
            .await?;

        tracing::info!(booking_id = booking.id, item_id, booker_id, "Booking requested");
        Ok(booking)
    }

    /// Owner's decision on a waiting booking
    pub async fn approve(&self, booking_id: i64, user_id: i64, approved: bool) -> AppResult<Booking> {
        let booking = self.find(booking_id).await?;
        self.ensure_user(user_id).await?;

        if booking.item_owner_id != user_id {
            return Err(self
                .policy
                .ownership_violation
                .deny(format!("Booking #{} not found", booking_id)));
        }

        let target = BookingStatus::from_decision(approved);
        if booking.status == target {
            tracing::warn!(booking_id, status = %target, "Repeated booking decision");
            return Err(AppError::Validation(format!(
                "Booking #{} already has status {}",
                booking_id, target
            )));
        }
        if !booking.status.can_transition_to(target) {
            tracing::warn!(booking_id, from = %booking.status, to = %target, "Illegal booking transition");
            return Err(AppError::Validation(format!(
                "Booking #{} is {} and can no longer change",
                booking_id, booking.status
            )));
        }

        let updated = self
            .repository
            .bookings
            .transition(booking_id, BookingStatus::Waiting, target)
            .await?
            .ok_or_else(|| {
                tracing::warn!(booking_id, "Booking decided concurrently");
                AppError::Validation(format!("Booking #{} has already been decided", booking_id))
            })?;

        tracing::info!(booking_id, status = %updated.status, "Booking decided");
        Ok(updated)
    }

    /// Booking as seen by its booker or the item's owner
    pub async fn get_by_id(&self, booking_id: i64, user_id: i64) -> AppResult<Booking> {
        let booking = self.find(booking_id).await?;
        self.ensure_user(user_id).await?;

        if !booking.is_visible_to(user_id) {
            return Err(self
                .policy
                .ownership_violation
                .deny(format!("Booking #{} not found", booking_id)));
        }
        Ok(booking)
    }

    /// Absent `state` lists all bookings
    pub async fn list_by_booker(&self, user_id: i64, state: Option<&str>) -> AppResult<Vec<Booking>> {
        let state = BookingState::parse_or_default(state)?;
        self.ensure_user(user_id).await?;

        let bookings = self.repository.bookings.list_by_booker(user_id).await?;
        let total = bookings.len();
        let filtered = state.filter(bookings, Utc::now());
        tracing::debug!(user_id, ?state, total, kept = filtered.len(), "Filtered bookings by booker");
        Ok(filtered)
    }

    /// Absent `state` lists all bookings
    pub async fn list_by_owner(&self, user_id: i64, state: Option<&str>) -> AppResult<Vec<Booking>> {
        let state = BookingState::parse_or_default(state)?;
        self.ensure_user(user_id).await?;

        let bookings = self.repository.bookings.list_by_owner(user_id).await?;
        let total = bookings.len();
        let filtered = state.filter(bookings, Utc::now());
        tracing::debug!(user_id, ?state, total, kept = filtered.len(), "Filtered bookings by owner");
        Ok(filtered)
    }

    async fn find(&self, booking_id: i64) -> AppResult<Booking> {
        self.repository
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking #{} not found", booking_id)))
    }

    async fn ensure_user(&self, user_id: i64) -> AppResult<()> {
        self.repository
            .users
            .find_by_id(user_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("User #{} not found", user_id)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::{
        config::OwnershipViolation,
        models::{
            item::{Item, NewItem},
            user::{CreateUser, User},
        },
        repository::MockBookingsStore,
    };

    struct Fixture {
        service: BookingsService,
        repository: Repository,
        owner: User,
        booker: User,
        stranger: User,
        item: Item,
    }

    async fn fixture(policy: PolicyConfig) -> Fixture {
        let repository = Repository::in_memory();
        let mut users = Vec::new();
        for (name, email) in [("Ann", "ann@example.com"), ("Bob", "bob@example.com"), ("Cid", "cid@example.com")] {
            users.push(
                repository
                    .users
                    .create(&CreateUser { name: name.into(), email: email.into() })
                    .await
                    .unwrap(),
            );
        }
        let stranger = users.pop().unwrap();
        let booker = users.pop().unwrap();
        let owner = users.pop().unwrap();
        let item = repository
            .items
            .create(&NewItem {
                owner_id: owner.id,
                name: "Drill".into(),
                description: "Cordless drill".into(),
                available: true,
                request_id: None,
            })
            .await
            .unwrap();
        Fixture {
            service: BookingsService::new(repository.clone(), policy),
            repository,
            owner,
            booker,
            stranger,
            item,
        }
    }

    fn request(item_id: i64, start_hours: i64, end_hours: i64) -> CreateBooking {
        let now = Utc::now();
        CreateBooking {
            item_id: Some(item_id),
            start: Some(now + Duration::hours(start_hours)),
            end: Some(now + Duration::hours(end_hours)),
        }
    }

    #[test]
    fn test_validate_period() {
        let now = Utc::now();
        let hour = Duration::hours(1);
        assert_ok!(validate_period(now + hour, now + hour * 2, now, true));
        assert_err!(validate_period(now + hour, now + hour, now, false));
        assert_err!(validate_period(now + hour * 2, now + hour, now, false));
        assert_ok!(validate_period(now - hour * 2, now - hour, now, false));
        assert_err!(validate_period(now - hour * 2, now - hour, now, true));
    }

    #[tokio::test]
    async fn test_create_waiting_booking() {
        let f = fixture(PolicyConfig::default()).await;
        let booking = assert_ok!(f.service.create(request(f.item.id, 1, 2), f.booker.id).await);
        assert_eq!(booking.status, BookingStatus::Waiting);
        assert_eq!(booking.booker_name, "Bob");
        assert_eq!(booking.item_name, "Drill");
    }

    #[tokio::test]
    async fn test_create_rejects_inverted_period() {
        let f = fixture(PolicyConfig::default()).await;
        let result = f.service.create(request(f.item.id, 2, 1), f.booker.id).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        let result = f.service.create(request(f.item.id, 1, 1), f.booker.id).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_requires_all_fields() {
        let f = fixture(PolicyConfig::default()).await;
        let mut missing_end = request(f.item.id, 1, 2);
        missing_end.end = None;
        assert!(matches!(
            f.service.create(missing_end, f.booker.id).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_owner_and_unavailable_item() {
        let f = fixture(PolicyConfig::default()).await;
        let own = f.service.create(request(f.item.id, 1, 2), f.owner.id).await;
        assert!(matches!(own, Err(AppError::NotFound(_))));

        f.repository
            .items
            .update(f.item.id, f.owner.id, &crate::models::item::UpdateItem {
                available: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        let unavailable = f.service.create(request(f.item.id, 1, 2), f.booker.id).await;
        assert!(matches!(unavailable, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_unknown_item_or_user() {
        let f = fixture(PolicyConfig::default()).await;
        assert!(matches!(
            f.service.create(request(999, 1, 2), f.booker.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.service.create(request(f.item.id, 1, 2), 999).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_past_booking_with_future_policy() {
        let policy = PolicyConfig { require_future_booking_dates: true, ..Default::default() };
        let f = fixture(policy).await;
        assert_err!(f.service.create(request(f.item.id, -2, -1), f.booker.id).await);
        assert_ok!(f.service.create(request(f.item.id, 1, 2), f.booker.id).await);
    }

    #[tokio::test]
    async fn test_approve_then_repeat_fails() {
        let f = fixture(PolicyConfig::default()).await;
        let booking = f.service.create(request(f.item.id, 1, 2), f.booker.id).await.unwrap();

        let approved = assert_ok!(f.service.approve(booking.id, f.owner.id, true).await);
        assert_eq!(approved.status, BookingStatus::Approved);

        let repeated = f.service.approve(booking.id, f.owner.id, true).await;
        assert!(matches!(repeated, Err(AppError::Validation(_))));
        let flipped = f.service.approve(booking.id, f.owner.id, false).await;
        assert!(matches!(flipped, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_reject_booking() {
        let f = fixture(PolicyConfig::default()).await;
        let booking = f.service.create(request(f.item.id, 1, 2), f.booker.id).await.unwrap();
        let rejected = assert_ok!(f.service.approve(booking.id, f.owner.id, false).await);
        assert_eq!(rejected.status, BookingStatus::Rejected);
    }

    #[tokio::test]
    async fn test_only_owner_approves() {
        let f = fixture(PolicyConfig::default()).await;
        let booking = f.service.create(request(f.item.id, 1, 2), f.booker.id).await.unwrap();
        let by_booker = f.service.approve(booking.id, f.booker.id, true).await;
        assert!(matches!(by_booker, Err(AppError::NotFound(_))));

        let strict = BookingsService::new(
            f.repository.clone(),
            PolicyConfig { ownership_violation: OwnershipViolation::Forbidden, ..Default::default() },
        );
        let by_stranger = strict.approve(booking.id, f.stranger.id, true).await;
        assert!(matches!(by_stranger, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_get_by_id_visibility() {
        let f = fixture(PolicyConfig::default()).await;
        let booking = f.service.create(request(f.item.id, 1, 2), f.booker.id).await.unwrap();
        assert_ok!(f.service.get_by_id(booking.id, f.owner.id).await);
        assert_ok!(f.service.get_by_id(booking.id, f.booker.id).await);
        assert!(matches!(
            f.service.get_by_id(booking.id, f.stranger.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_by_state() {
        let f = fixture(PolicyConfig::default()).await;
        let past = f.service.create(request(f.item.id, -3, -2), f.booker.id).await.unwrap();
        let current = f.service.create(request(f.item.id, -1, 1), f.booker.id).await.unwrap();
        let future = f.service.create(request(f.item.id, 2, 3), f.booker.id).await.unwrap();
        f.service.approve(past.id, f.owner.id, false).await.unwrap();

        let ids = |bookings: Vec<Booking>| bookings.into_iter().map(|b| b.id).collect::<Vec<_>>();

        assert_eq!(ids(f.service.list_by_booker(f.booker.id, Some("ALL")).await.unwrap()), vec![future.id, current.id, past.id]);
        assert_eq!(ids(f.service.list_by_owner(f.owner.id, None).await.unwrap()), vec![future.id, current.id, past.id]);
        assert_eq!(ids(f.service.list_by_booker(f.booker.id, Some("CURRENT")).await.unwrap()), vec![current.id]);
        assert_eq!(ids(f.service.list_by_booker(f.booker.id, Some("FUTURE")).await.unwrap()), vec![future.id]);
        assert_eq!(ids(f.service.list_by_booker(f.booker.id, Some("PAST")).await.unwrap()), vec![past.id]);
        assert_eq!(ids(f.service.list_by_owner(f.owner.id, Some("REJECTED")).await.unwrap()), vec![past.id]);
        assert_eq!(ids(f.service.list_by_owner(f.owner.id, Some("WAITING")).await.unwrap()), vec![future.id, current.id]);
        assert!(f.service.list_by_owner(f.booker.id, Some("ALL")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_unknown_state_or_user() {
        let f = fixture(PolicyConfig::default()).await;
        assert!(matches!(
            f.service.list_by_booker(f.booker.id, Some("UNSUPPORTED_STATUS")).await,
            Err(AppError::UnknownState(_))
        ));
        assert!(matches!(
            f.service.list_by_owner(999, Some("ALL")).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_lost_transition_race_is_validation_error() {
        let f = fixture(PolicyConfig::default()).await;
        let booking = f.service.create(request(f.item.id, 1, 2), f.booker.id).await.unwrap();

        let mut bookings = MockBookingsStore::new();
        let snapshot = booking.clone();
        bookings
            .expect_find_by_id()
            .returning(move |_| Ok(Some(snapshot.clone())));
        bookings.expect_transition().returning(|_, _, _| Ok(None));

        let repository = Repository { bookings: Arc::new(bookings), ..f.repository.clone() };
        let service = BookingsService::new(repository, PolicyConfig::default());
        let result = service.approve(booking.id, f.owner.id, true).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let f = fixture(PolicyConfig::default()).await;
        let mut bookings = MockBookingsStore::new();
        bookings
            .expect_list_by_booker()
            .returning(|_| Err(AppError::Internal("connection reset".to_string())));

        let repository = Repository { bookings: Arc::new(bookings), ..f.repository.clone() };
        let service = BookingsService::new(repository, PolicyConfig::default());
        assert!(matches!(
            service.list_by_booker(f.booker.id, Some("ALL")).await,
            Err(AppError::Internal(_))
        ));
    }
}
