//! Drinks catalog handlers.
//!
//! | route | permission | body |
//! |---|---|---|
//! | `GET /drinks` | public | short representations |
//! | `GET /drinks-detail` | `get:drinks-detail` | long representations |
//! | `POST /drinks` | `post:drinks` | the created drink |
//! | `PATCH /drinks/:id` | `patch:drinks` | the updated drink |
//! | `DELETE /drinks/:id` | `delete:drinks` | the deleted id |
//!
//! Permissions are enforced by the route layer before these handlers run.

use crate::auth::Claims;
use crate::errors::ApiError;
use crate::models::{
    CreateDrinkRequest, DeleteResponse, DrinkLong, DrinkShort, DrinksResponse,
    UpdateDrinkRequest,
};
use crate::routes::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    Extension, Json,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::instrument;

/// Deserialize a JSON body, returning 400 (not axum's default 422) on failure.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(target: "drinks.handlers.drinks", error = %e, "Invalid request body");
        ApiError::BadRequest("Invalid request body".to_string())
    })
}

/// Parse a drink id path segment. Non-numeric ids cannot exist.
fn parse_id(raw: &str) -> Result<i32, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound(format!("Drink {raw} not found")))
}

/// Handler for GET /drinks
#[instrument(skip_all, name = "drinks.handlers.get_drinks")]
pub async fn get_drinks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DrinksResponse<DrinkShort>>, ApiError> {
    let drinks = state.repository.list().await?;
    Ok(Json(DrinksResponse::new(
        drinks.iter().map(|drink| drink.short()).collect(),
    )))
}

/// Handler for GET /drinks-detail
#[instrument(skip_all, name = "drinks.handlers.get_drinks_detail")]
pub async fn get_drinks_detail(
    State(state): State<Arc<AppState>>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<DrinksResponse<DrinkLong>>, ApiError> {
    let drinks = state.repository.list().await?;
    Ok(Json(DrinksResponse::new(
        drinks.iter().map(|drink| drink.long()).collect(),
    )))
}

/// Handler for POST /drinks
///
/// Body: `{"title": "...", "recipe": <ingredient or [ingredients]>}`.
/// A duplicate title is rejected with 422.
#[instrument(skip_all, name = "drinks.handlers.create_drink")]
pub async fn create_drink(
    State(state): State<Arc<AppState>>,
    Extension(_claims): Extension<Claims>,
    body: Bytes,
) -> Result<Json<DrinksResponse<DrinkLong>>, ApiError> {
    let request: CreateDrinkRequest = parse_body(&body)?;
    let new_drink = request.validate()?;

    let drink = state.repository.insert(new_drink).await?;

    tracing::info!(target: "drinks.handlers.drinks", id = drink.id, "Drink created");
    Ok(Json(DrinksResponse::new(vec![drink.long()])))
}

/// Handler for PATCH /drinks/:id
///
/// Body carries `title` and/or `recipe`; absent fields keep their value.
#[instrument(skip_all, name = "drinks.handlers.update_drink", fields(id = %id))]
pub async fn update_drink(
    State(state): State<Arc<AppState>>,
    Extension(_claims): Extension<Claims>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<DrinksResponse<DrinkLong>>, ApiError> {
    let id = parse_id(&id)?;
    let request: UpdateDrinkRequest = parse_body(&body)?;
    let update = request.validate()?;

    let drink = state.repository.update(id, update).await?;

    tracing::info!(target: "drinks.handlers.drinks", id = drink.id, "Drink updated");
    Ok(Json(DrinksResponse::new(vec![drink.long()])))
}

/// Handler for DELETE /drinks/:id
#[instrument(skip_all, name = "drinks.handlers.delete_drink", fields(id = %id))]
pub async fn delete_drink(
    State(state): State<Arc<AppState>>,
    Extension(_claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = parse_id(&id)?;

    state.repository.delete(id).await?;

    tracing::info!(target: "drinks.handlers.drinks", id, "Drink deleted");
    Ok(Json(DeleteResponse {
        success: true,
        delete: id,
    }))
}
