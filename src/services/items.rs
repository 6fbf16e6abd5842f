//! Items, availability and comments service

use chrono::{DateTime, Utc};

use crate::{
    config::PolicyConfig,
    error::{AppError, AppResult},
    models::{
        comment::{Comment, CreateComment, NewComment},
        item::{CreateItem, Item, ItemDetails, NewItem, UpdateItem},
        Page,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct ItemsService {
    repository: Repository,
    policy: PolicyConfig,
}

impl ItemsService {
    pub fn new(repository: Repository, policy: PolicyConfig) -> Self {
        Self { repository, policy }
    }

    pub async fn create(&self, owner_id: i64, item: CreateItem) -> AppResult<Item> {
        self.ensure_user(owner_id).await?;

        let name = item.name.trim();
        let description = item.description.trim();
        if name.is_empty() || description.is_empty() {
            return Err(AppError::Validation("Name and description must not be blank".to_string()));
        }
        let available = item
            .available
            .ok_or_else(|| AppError::Validation("Availability must be specified".to_string()))?;

        let created = self
            .repository
            .items
            .create(&NewItem {
                owner_id,
                name: name.to_string(),
                description: description.to_string(),
                available,
                request_id: item.request_id,
            })
            .await?;

        tracing::info!(item_id = created.id, owner_id, "Item created");
        Ok(created)
    }

    /// Partial update by the item's owner
    pub async fn update(&self, item_id: i64, owner_id: i64, changes: UpdateItem) -> AppResult<Item> {
        let item = self.find(item_id).await?;
        self.ensure_user(owner_id).await?;
        if item.owner_id != owner_id {
            return Err(self.deny(item_id));
        }

        let updated = self
            .repository
            .items
            .update(item_id, owner_id, &changes.without_blanks())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item #{} not found", item_id)))?;

        tracing::info!(item_id, owner_id, available = updated.available, "Item updated");
        Ok(updated)
    }

    pub async fn delete(&self, item_id: i64, owner_id: i64) -> AppResult<()> {
        let item = self.find(item_id).await?;
        if item.owner_id != owner_id {
            return Err(self.deny(item_id));
        }

        if !self.repository.items.delete(item_id, owner_id).await? {
            return Err(AppError::NotFound(format!("Item #{} not found", item_id)));
        }

        tracing::info!(item_id, owner_id, "Item deleted");
        Ok(())
    }

    /// Item view; booking windows are shown to the owner only
    pub async fn get(&self, item_id: i64, requester_id: i64) -> AppResult<ItemDetails> {
        let item = self.find(item_id).await?;
        self.ensure_user(requester_id).await?;

        let is_owner = item.owner_id == requester_id;
        self.details(item, is_owner, Utc::now()).await
    }

    pub async fn list_by_owner(&self, owner_id: i64, page: Page) -> AppResult<Vec<ItemDetails>> {
        self.ensure_user(owner_id).await?;

        let items = self.repository.items.list_by_owner(owner_id, page).await?;
        let now = Utc::now();
        let mut views = Vec::with_capacity(items.len());
        for item in items {
            views.push(self.details(item, true, now).await?);
        }
        Ok(views)
    }

    /// Available items matching `text`; blank text matches nothing
    pub async fn search(&self, text: &str, page: Page) -> AppResult<Vec<ItemDetails>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let items = self.repository.items.search(text, page).await?;
        tracing::debug!(query = text, found = items.len(), "Item search");
        Ok(items.into_iter().map(ItemDetails::from).collect())
    }

    /// Comment on an item the author has finished a booking of
    pub async fn create_comment(&self, item_id: i64, author_id: i64, comment: CreateComment) -> AppResult<Comment> {
        let text = comment.text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("Comment text must not be empty".to_string()));
        }
        self.find(item_id).await?;
        self.ensure_user(author_id).await?;

        let now = Utc::now();
        if !self.repository.bookings.has_finished(author_id, item_id, now).await? {
            return Err(AppError::BadRequest(format!(
                "User #{} has no finished booking of item #{}",
                author_id, item_id
            )));
        }

        let created = self
            .repository
            .comments
            .create(&NewComment {
                text: text.to_string(),
                item_id,
                author_id,
                created: now,
            })
            .await?;

        tracing::info!(comment_id = created.id, item_id, author_id, "Comment added");
        Ok(created)
    }

    async fn details(&self, item: Item, with_bookings: bool, now: DateTime<Utc>) -> AppResult<ItemDetails> {
        let item_id = item.id;
        let mut view = ItemDetails::from(item);
        if with_bookings {
            view.last_booking = self.repository.bookings.last_approved(item_id, now).await?.map(Into::into);
            view.next_booking = self.repository.bookings.next_approved(item_id, now).await?.map(Into::into);
        }
        view.comments = self.repository.comments.list_by_item(item_id).await?;
        Ok(view)
    }

    fn deny(&self, item_id: i64) -> AppError {
        self.policy
            .ownership_violation
            .deny(format!("Item #{} not found", item_id))
    }

    async fn find(&self, item_id: i64) -> AppResult<Item> {
        self.repository
            .items
            .find_by_id(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item #{} not found", item_id)))
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
    use tokio_test::assert_ok;

    use super::*;
    use crate::{
        config::OwnershipViolation,
        models::{
            booking::{BookingStatus, NewBooking},
            user::{CreateUser, User},
        },
        repository::MockItemsStore,
    };

    async fn user(repository: &Repository, name: &str) -> User {
        repository
            .users
            .create(&CreateUser {
                name: name.into(),
                email: format!("{}@example.com", name.to_lowercase()),
            })
            .await
            .unwrap()
    }

    fn new_item(name: &str, description: &str, available: bool) -> CreateItem {
        CreateItem {
            name: name.into(),
            description: description.into(),
            available: Some(available),
            request_id: None,
        }
    }

    async fn book(repository: &Repository, item_id: i64, booker_id: i64, start_hours: i64, end_hours: i64) -> i64 {
        let now = Utc::now();
        repository
            .bookings
            .create(&NewBooking {
                item_id,
                booker_id,
                start: now + Duration::hours(start_hours),
                end: now + Duration::hours(end_hours),
            })
            .await
            .unwrap()
            .id
    }

    async fn approve(repository: &Repository, booking_id: i64) {
        repository
            .bookings
            .transition(booking_id, BookingStatus::Waiting, BookingStatus::Approved)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_item() {
        let repository = Repository::in_memory();
        let service = ItemsService::new(repository.clone(), PolicyConfig::default());
        let ann = user(&repository, "Ann").await;

        let item = assert_ok!(service.create(ann.id, new_item(" Drill ", "Cordless", true)).await);
        assert_eq!(item.name, "Drill");
        assert_eq!(item.owner_id, ann.id);

        assert!(matches!(
            service.create(ann.id, new_item("   ", "Cordless", true)).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.create(999, new_item("Drill", "Cordless", true)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_by_owner_only() {
        let repository = Repository::in_memory();
        let service = ItemsService::new(repository.clone(), PolicyConfig::default());
        let ann = user(&repository, "Ann").await;
        let bob = user(&repository, "Bob").await;
        let item = service.create(ann.id, new_item("Drill", "Cordless", true)).await.unwrap();

        let changes = UpdateItem { name: Some("".into()), description: None, available: Some(false) };
        let updated = assert_ok!(service.update(item.id, ann.id, changes.clone()).await);
        assert_eq!(updated.name, "Drill");
        assert!(!updated.available);

        let padded = UpdateItem { name: Some(" Hammer drill ".into()), description: Some("\tCorded ".into()), available: None };
        let updated = assert_ok!(service.update(item.id, ann.id, padded).await);
        assert_eq!(updated.name, "Hammer drill");
        assert_eq!(updated.description, "Corded");

        assert!(matches!(
            service.update(item.id, bob.id, changes.clone()).await,
            Err(AppError::NotFound(_))
        ));
        let strict = ItemsService::new(
            repository.clone(),
            PolicyConfig { ownership_violation: OwnershipViolation::Forbidden, ..Default::default() },
        );
        assert!(matches!(
            strict.update(item.id, bob.id, changes).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(strict.delete(item.id, bob.id).await, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_delete_item() {
        let repository = Repository::in_memory();
        let service = ItemsService::new(repository.clone(), PolicyConfig::default());
        let ann = user(&repository, "Ann").await;
        let item = service.create(ann.id, new_item("Drill", "Cordless", true)).await.unwrap();

        assert_ok!(service.delete(item.id, ann.id).await);
        assert!(matches!(service.get(item.id, ann.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(service.delete(item.id, ann.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_owner_sees_last_and_next_booking() {
        let repository = Repository::in_memory();
        let service = ItemsService::new(repository.clone(), PolicyConfig::default());
        let ann = user(&repository, "Ann").await;
        let bob = user(&repository, "Bob").await;
        let item = service.create(ann.id, new_item("Drill", "Cordless", true)).await.unwrap();

        let last = book(&repository, item.id, bob.id, -3, -2).await;
        let next = book(&repository, item.id, bob.id, 2, 3).await;
        book(&repository, item.id, bob.id, 1, 2).await;
        approve(&repository, last).await;
        approve(&repository, next).await;

        let owner_view = service.get(item.id, ann.id).await.unwrap();
        assert_eq!(owner_view.last_booking.map(|b| b.id), Some(last));
        assert_eq!(owner_view.next_booking.map(|b| b.id), Some(next));

        let booker_view = service.get(item.id, bob.id).await.unwrap();
        assert!(booker_view.last_booking.is_none());
        assert!(booker_view.next_booking.is_none());

        let listed = service.list_by_owner(ann.id, Page::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].next_booking.as_ref().map(|b| b.booker_id), Some(bob.id));
    }

    #[tokio::test]
    async fn test_list_by_owner_paginates() {
        let repository = Repository::in_memory();
        let service = ItemsService::new(repository.clone(), PolicyConfig::default());
        let ann = user(&repository, "Ann").await;
        for name in ["Drill", "Ladder", "Saw"] {
            service.create(ann.id, new_item(name, "Tool", true)).await.unwrap();
        }

        let page = service.list_by_owner(ann.id, Page::new(1, 1).unwrap()).await.unwrap();
        assert_eq!(page.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(), vec!["Ladder"]);
        assert!(matches!(
            service.list_by_owner(999, Page::default()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_search() {
        let repository = Repository::in_memory();
        let service = ItemsService::new(repository.clone(), PolicyConfig::default());
        let ann = user(&repository, "Ann").await;
        service.create(ann.id, new_item("Power drill", "Cordless", true)).await.unwrap();
        service.create(ann.id, new_item("Hammer", "Pairs with a DRILL", true)).await.unwrap();
        service.create(ann.id, new_item("Old drill", "Broken", false)).await.unwrap();

        assert!(service.search("", Page::default()).await.unwrap().is_empty());
        assert!(service.search("   ", Page::default()).await.unwrap().is_empty());
        let found = service.search("dRiLl", Page::default()).await.unwrap();
        assert_eq!(found.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(), vec!["Power drill", "Hammer"]);
    }

    #[tokio::test]
    async fn test_blank_search_skips_storage() {
        let mut items = MockItemsStore::new();
        items.expect_search().never();
        let repository = Repository { items: Arc::new(items), ..Repository::in_memory() };
        let service = ItemsService::new(repository, PolicyConfig::default());
        assert!(service.search("  ", Page::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_comment_requires_finished_booking() {
        let repository = Repository::in_memory();
        let service = ItemsService::new(repository.clone(), PolicyConfig::default());
        let ann = user(&repository, "Ann").await;
        let bob = user(&repository, "Bob").await;
        let item = service.create(ann.id, new_item("Drill", "Cordless", true)).await.unwrap();
        let text = || CreateComment { text: "Works great".into() };

        assert!(matches!(
            service.create_comment(item.id, bob.id, text()).await,
            Err(AppError::BadRequest(_))
        ));
        book(&repository, item.id, bob.id, 1, 2).await;
        assert!(matches!(
            service.create_comment(item.id, bob.id, text()).await,
            Err(AppError::BadRequest(_))
        ));

        book(&repository, item.id, bob.id, -2, -1).await;
        let comment = assert_ok!(service.create_comment(item.id, bob.id, text()).await);
        assert_eq!(comment.author_name, "Bob");

        let view = service.get(item.id, ann.id).await.unwrap();
        assert_eq!(view.comments, vec![comment]);

        assert!(matches!(
            service.create_comment(item.id, bob.id, CreateComment { text: "  ".into() }).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.create_comment(999, bob.id, text()).await,
            Err(AppError::NotFound(_))
        ));
    }
}
