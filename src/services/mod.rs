//! Business logic services

pub mod bookings;
pub mod items;
pub mod users;

use crate::{config::PolicyConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub items: items::ItemsService,
    pub bookings: bookings::BookingsService,
}

impl Services {
    /// Create all services over one repository
    pub fn new(repository: Repository, policy: PolicyConfig) -> Self {
        Self {
            users: users::UsersService::new(repository.clone()),
            items: items::ItemsService::new(repository.clone(), policy),
            bookings: bookings::BookingsService::new(repository, policy),
        }
    }
}
