// HTTP handlers for the box catalog and search

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use validator::Validate;

use crate::auth::AdminUser;
use crate::db::{self, BOX_COLUMNS};
use crate::error::ApiError;
use crate::models::{CreateBox, MysteryBox, UpdateBox, DEFAULT_LOW_STOCK_THRESHOLD, DEFAULT_OVERSTOCK_THRESHOLD};
use crate::query::{QueryValidator, SearchParam, SearchParams};
use crate::AppState;

fn box_not_found(id: i32) -> ApiError {
    ApiError::NotFound {
        resource: "Box".to_string(),
        id: id.to_string(),
    }
}

/// Handler for POST /api/admin/boxes
#[utoipa::path(
    post,
    path = "/api/admin/boxes",
    request_body = CreateBox,
    responses(
        (status = 201, description = "Box created", body = MysteryBox),
        (status = 400, description = "Invalid input data"),
        (status = 409, description = "Box name already exists")
    ),
    tag = "boxes"
)]
pub async fn create_box(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CreateBox>,
) -> Result<(StatusCode, Json<MysteryBox>), ApiError> {
    tracing::debug!("Admin {} creating box: {}", admin.user_id, payload.name);

    payload.validate()?;

    if db::check_duplicate_box(&state.db, &payload.name).await? {
        return Err(ApiError::Conflict {
            message: format!("Box with name '{}' already exists", payload.name),
        });
    }

    let created = sqlx::query_as::<_, MysteryBox>(&format!(
        r#"
        INSERT INTO boxes (name, description, category, price, image_url, low_stock_threshold, overstock_threshold)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {}
        "#,
        BOX_COLUMNS
    ))
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(&payload.category)
    .bind(payload.price)
    .bind(&payload.image_url)
    .bind(payload.low_stock_threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD))
    .bind(payload.overstock_threshold.unwrap_or(DEFAULT_OVERSTOCK_THRESHOLD))
    .fetch_one(&state.db)
    .await?;

    tracing::info!("Created box {} ({})", created.id, created.name);
    Ok((StatusCode::CREATED, Json(created)))
}

/// Handler for GET /api/boxes and GET /api/search
///
/// Only active boxes are listed.
#[utoipa::path(
    get,
    path = "/api/search",
    params(
        ("q" = Option<String>, Query, description = "Search in name and description"),
        ("category" = Option<String>, Query, description = "Category filter"),
        ("min_price" = Option<String>, Query, description = "Minimum price, inclusive"),
        ("max_price" = Option<String>, Query, description = "Maximum price, inclusive"),
        ("sort" = Option<String>, Query, description = "price, rating or newest"),
        ("order" = Option<String>, Query, description = "asc or desc"),
        ("page" = Option<u32>, Query, description = "Page number, 1-indexed"),
        ("limit" = Option<u32>, Query, description = "Page size, at most 100")
    ),
    responses(
        (status = 200, description = "Matching boxes", body = Vec<MysteryBox>),
        (status = 400, description = "Invalid query parameters")
    ),
    tag = "boxes"
)]
pub async fn search_boxes(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<MysteryBox>>, ApiError> {
    tracing::debug!("Searching boxes with {:?}", params);

    let validated = QueryValidator::validate(params).map_err(|e| ApiError::BadRequest(e.message))?;
    let (query_str, params) = validated.into_builder().build();

    let mut query = sqlx::query_as::<_, MysteryBox>(&query_str);
    for param in params {
        query = match param {
            SearchParam::Text(text) => query.bind(text),
            SearchParam::Amount(amount) => query.bind(amount),
        };
    }

    let boxes = query.fetch_all(&state.db).await?;
    tracing::debug!("Search returned {} boxes", boxes.len());
    Ok(Json(boxes))
}

/// Handler for GET /api/boxes/{id}
#[utoipa::path(
    get,
    path = "/api/boxes/{id}",
    params(("id" = i32, Path, description = "Box ID")),
    responses(
        (status = 200, description = "Box found", body = MysteryBox),
        (status = 404, description = "Box not found")
    ),
    tag = "boxes"
)]
pub async fn get_box(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MysteryBox>, ApiError> {
    let found = db::find_box(&state.db, id)
        .await?
        .filter(|b| b.is_active)
        .ok_or_else(|| box_not_found(id))?;

    Ok(Json(found))
}

/// Handler for PUT /api/admin/boxes/{id}
#[utoipa::path(
    put,
    path = "/api/admin/boxes/{id}",
    params(("id" = i32, Path, description = "Box ID")),
    request_body = UpdateBox,
    responses(
        (status = 200, description = "Box updated", body = MysteryBox),
        (status = 400, description = "Invalid input data"),
        (status = 404, description = "Box not found"),
        (status = 409, description = "Box name already exists")
    ),
    tag = "boxes"
)]
pub async fn update_box(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateBox>,
) -> Result<Json<MysteryBox>, ApiError> {
    tracing::debug!("Admin {} updating box {}", admin.user_id, id);

    payload.validate()?;

    // Duplicate check and update must see the same snapshot
    let mut tx = state.db.begin().await?;

    let existing = sqlx::query_as::<_, MysteryBox>(&format!(
        "SELECT {} FROM boxes WHERE id = $1 FOR UPDATE",
        BOX_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| box_not_found(id))?;

    if let Some(ref new_name) = payload.name {
        if !new_name.eq_ignore_ascii_case(&existing.name) {
            let duplicate_exists: Option<bool> = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM boxes WHERE LOWER(name) = LOWER($1) AND id != $2)",
            )
            .bind(new_name)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

            if duplicate_exists.unwrap_or(false) {
                return Err(ApiError::Conflict {
                    message: format!("Box with name '{}' already exists", new_name),
                });
            }
        }
    }

    let updated = sqlx::query_as::<_, MysteryBox>(&format!(
        r#"
        UPDATE boxes
        SET name = $1,
            description = $2,
            category = $3,
            price = $4,
            image_url = $5,
            low_stock_threshold = $6,
            overstock_threshold = $7,
            is_active = $8,
            updated_at = NOW()
        WHERE id = $9
        RETURNING {}
        "#,
        BOX_COLUMNS
    ))
    .bind(payload.name.unwrap_or(existing.name))
    .bind(payload.description.unwrap_or(existing.description))
    .bind(payload.category.unwrap_or(existing.category))
    .bind(payload.price.unwrap_or(existing.price))
    .bind(payload.image_url.or(existing.image_url))
    .bind(payload.low_stock_threshold.unwrap_or(existing.low_stock_threshold))
    .bind(payload.overstock_threshold.unwrap_or(existing.overstock_threshold))
    .bind(payload.is_active.unwrap_or(existing.is_active))
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!("Updated box {}", id);
    Ok(Json(updated))
}

/// Handler for DELETE /api/admin/boxes/{id}
///
/// Boxes are referenced by orders and ledger entries, so they are deactivated instead of removed.
#[utoipa::path(
    delete,
    path = "/api/admin/boxes/{id}",
    params(("id" = i32, Path, description = "Box ID")),
    responses(
        (status = 204, description = "Box deactivated"),
        (status = 404, description = "Box not found")
    ),
    tag = "boxes"
)]
pub async fn deactivate_box(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let result = sqlx::query("UPDATE boxes SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(box_not_found(id));
    }

    tracing::info!("Admin {} deactivated box {}", admin.user_id, id);
    Ok(StatusCode::NO_CONTENT)
}
