//! Booking endpoints

use axum::{extract::State, Json};
use validator::Validate;

use crate::{
    error::{AppResult, ErrorResponse},
    models::booking::{ApproveQuery, BookingDetails, BookingListQuery, CreateBooking},
};

use super::{AppJson, AppPath, AppQuery, SharerUserId};

/// Request a booking
#[utoipa::path(
    post,
    path = "/bookings",
    tag = "bookings",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Booker's user ID")
    ),
    request_body = CreateBooking,
    responses(
        (status = 200, description = "Booking created in WAITING status", body = BookingDetails),
        (status = 400, description = "Invalid period or unavailable item", body = ErrorResponse),
        (status = 404, description = "Item or user not found, or booking own item", body = ErrorResponse)
    )
)]
pub async fn create_booking(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
    AppJson(data): AppJson<CreateBooking>,
) -> AppResult<Json<BookingDetails>> {
    data.validate()?;

    let booking = state.services.bookings.create(data, user_id).await?;
    Ok(Json(booking.into()))
}

/// Approve or reject a waiting booking
#[utoipa::path(
    patch,
    path = "/bookings/{id}",
    tag = "bookings",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Item owner's user ID"),
        ("id" = i64, Path, description = "Booking ID"),
        ApproveQuery
    ),
    responses(
        (status = 200, description = "Booking approved or rejected", body = BookingDetails),
        (status = 400, description = "Booking already decided", body = ErrorResponse),
        (status = 403, description = "Caller is not the owner (forbidden policy)", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse)
    )
)]
pub async fn approve_booking(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
    AppPath(id): AppPath<i64>,
    AppQuery(query): AppQuery<ApproveQuery>,
) -> AppResult<Json<BookingDetails>> {
    let booking = state.services.bookings.approve(id, user_id, query.approved).await?;
    Ok(Json(booking.into()))
}

/// Get a booking as its booker or the item's owner
#[utoipa::path(
    get,
    path = "/bookings/{id}",
    tag = "bookings",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Caller's user ID"),
        ("id" = i64, Path, description = "Booking ID")
    ),
    responses(
        (status = 200, description = "Booking details", body = BookingDetails),
        (status = 404, description = "Booking not found", body = ErrorResponse)
    )
)]
pub async fn get_booking(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<BookingDetails>> {
    let booking = state.services.bookings.get_by_id(id, user_id).await?;
    Ok(Json(booking.into()))
}

/// List the caller's bookings
#[utoipa::path(
    get,
    path = "/bookings",
    tag = "bookings",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Booker's user ID"),
        BookingListQuery
    ),
    responses(
        (status = 200, description = "Bookings made by the caller, latest start first", body = Vec<BookingDetails>),
        (status = 400, description = "Unknown state", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
pub async fn list_bookings(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
    AppQuery(query): AppQuery<BookingListQuery>,
) -> AppResult<Json<Vec<BookingDetails>>> {
    let bookings = state.services.bookings.list_by_booker(user_id, query.state.as_deref()).await?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

/// List bookings of the caller's items
#[utoipa::path(
    get,
    path = "/bookings/owner",
    tag = "bookings",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Owner's user ID"),
        BookingListQuery
    ),
    responses(
        (status = 200, description = "Bookings of the caller's items, latest start first", body = Vec<BookingDetails>),
        (status = 400, description = "Unknown state", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
pub async fn list_owner_bookings(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
    AppQuery(query): AppQuery<BookingListQuery>,
) -> AppResult<Json<Vec<BookingDetails>>> {
    let bookings = state.services.bookings.list_by_owner(user_id, query.state.as_deref()).await?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}
