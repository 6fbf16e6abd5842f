//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    api::{bookings, health, items, users},
    config::StorageBackend,
    error::ErrorResponse,
    models::{
        booking::{BookingDetails, BookingShort, BookingStatus, CreateBooking},
        comment::{Comment, CreateComment},
        item::{CreateItem, Item, ItemDetails, ItemShort, UpdateItem},
        user::{CreateUser, UpdateUser, User, UserShort},
    },
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ShareIt API",
        version = "1.0.0",
        description = "Item sharing service: list items, book them from their owners, comment after use"
    ),
    paths(
        // Health
        health::health_check,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        // Items
        items::list_items,
        items::search_items,
        items::get_item,
        items::create_item,
        items::update_item,
        items::delete_item,
        items::create_comment,
        // Bookings
        bookings::create_booking,
        bookings::approve_booking,
        bookings::get_booking,
        bookings::list_bookings,
        bookings::list_owner_bookings,
    ),
    components(
        schemas(
            health::HealthResponse,
            StorageBackend,
            ErrorResponse,
            User,
            UserShort,
            CreateUser,
            UpdateUser,
            Item,
            ItemShort,
            ItemDetails,
            CreateItem,
            UpdateItem,
            Comment,
            CreateComment,
            BookingStatus,
            BookingDetails,
            BookingShort,
            CreateBooking,
        )
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "users", description = "User registration and management"),
        (name = "items", description = "Items, search and comments"),
        (name = "bookings", description = "Booking requests and approvals")
    )
)]
pub struct ApiDoc;

/// Create OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
