//! Item, search and comment endpoints

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::{
    error::{AppResult, ErrorResponse},
    models::{
        comment::{Comment, CreateComment},
        item::{CreateItem, Item, ItemDetails, ItemSearchQuery, UpdateItem},
        Page, PageQuery,
    },
};

use super::{AppJson, AppPath, AppQuery, SharerUserId};

/// List the caller's items with booking windows and comments
#[utoipa::path(
    get,
    path = "/items",
    tag = "items",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Caller's user ID"),
        PageQuery
    ),
    responses(
        (status = 200, description = "Items owned by the caller", body = Vec<ItemDetails>),
        (status = 400, description = "Invalid pagination", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
pub async fn list_items(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
    AppQuery(query): AppQuery<PageQuery>,
) -> AppResult<Json<Vec<ItemDetails>>> {
    let page = Page::try_from(query)?;
    let items = state.services.items.list_by_owner(user_id, page).await?;
    Ok(Json(items))
}

/// Search available items by text
#[utoipa::path(
    get,
    path = "/items/search",
    tag = "items",
    params(ItemSearchQuery),
    responses(
        (status = 200, description = "Matching available items", body = Vec<ItemDetails>),
        (status = 400, description = "Invalid pagination", body = ErrorResponse)
    )
)]
pub async fn search_items(
    State(state): State<crate::AppState>,
    AppQuery(query): AppQuery<ItemSearchQuery>,
) -> AppResult<Json<Vec<ItemDetails>>> {
    let page = Page::try_from(PageQuery { from: query.from, size: query.size })?;
    let items = state.services.items.search(&query.text, page).await?;
    Ok(Json(items))
}

/// Get item details
#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "items",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Caller's user ID"),
        ("id" = i64, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item details; booking windows only for the owner", body = ItemDetails),
        (status = 404, description = "Item or user not found", body = ErrorResponse)
    )
)]
pub async fn get_item(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<ItemDetails>> {
    let item = state.services.items.get(id, user_id).await?;
    Ok(Json(item))
}

/// List a new item
#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Owner's user ID")
    ),
    request_body = CreateItem,
    responses(
        (status = 200, description = "Item created", body = Item),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Owner not found", body = ErrorResponse)
    )
)]
pub async fn create_item(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
    AppJson(data): AppJson<CreateItem>,
) -> AppResult<Json<Item>> {
    data.validate()?;

    let item = state.services.items.create(user_id, data).await?;
    Ok(Json(item))
}

/// Partially update an item
#[utoipa::path(
    patch,
    path = "/items/{id}",
    tag = "items",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Owner's user ID"),
        ("id" = i64, Path, description = "Item ID")
    ),
    request_body = UpdateItem,
    responses(
        (status = 200, description = "Item updated", body = Item),
        (status = 403, description = "Caller is not the owner (forbidden policy)", body = ErrorResponse),
        (status = 404, description = "Item not found", body = ErrorResponse)
    )
)]
pub async fn update_item(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
    AppPath(id): AppPath<i64>,
    AppJson(data): AppJson<UpdateItem>,
) -> AppResult<Json<Item>> {
    data.validate()?;

    let item = state.services.items.update(id, user_id, data).await?;
    Ok(Json(item))
}

/// Delete an item
#[utoipa::path(
    delete,
    path = "/items/{id}",
    tag = "items",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Owner's user ID"),
        ("id" = i64, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item deleted"),
        (status = 403, description = "Caller is not the owner (forbidden policy)", body = ErrorResponse),
        (status = 404, description = "Item not found", body = ErrorResponse)
    )
)]
pub async fn delete_item(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
    AppPath(id): AppPath<i64>,
) -> AppResult<StatusCode> {
    state.services.items.delete(id, user_id).await?;
    Ok(StatusCode::OK)
}

/// Comment on an item after a finished booking
#[utoipa::path(
    post,
    path = "/items/{id}/comment",
    tag = "items",
    params(
        ("X-Sharer-User-Id" = i64, Header, description = "Author's user ID"),
        ("id" = i64, Path, description = "Item ID")
    ),
    request_body = CreateComment,
    responses(
        (status = 200, description = "Comment created", body = Comment),
        (status = 400, description = "Blank text or no finished booking", body = ErrorResponse),
        (status = 404, description = "Item or user not found", body = ErrorResponse)
    )
)]
pub async fn create_comment(
    State(state): State<crate::AppState>,
    SharerUserId(user_id): SharerUserId,
    AppPath(id): AppPath<i64>,
    AppJson(data): AppJson<CreateComment>,
) -> AppResult<Json<Comment>> {
    data.validate()?;

    let comment = state.services.items.create_comment(id, user_id, data).await?;
    Ok(Json(comment))
}
