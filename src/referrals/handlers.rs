// HTTP handlers for referral endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AdminUser, AuthenticatedUser};
use crate::referrals::{
    CreateOwnReferralRequest, CreateReferralRequest, MyReferralsResponse, Referral, ReferralError,
    ReferralQuoteResponse, ReferralUsage, UpdateReferralRequest, UpdateUsageStatusRequest,
    ValidateReferralRequest,
};

/// Handler for GET /api/referrals
/// Lists the caller's referral codes with usage totals
pub async fn list_my_referrals_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
) -> Result<Json<MyReferralsResponse>, ReferralError> {
    let response = state.referral_service.list_user_referrals(user.user_id).await?;
    Ok(Json(response))
}

/// Handler for POST /api/referrals
/// Creates the caller's referral code, or returns the one they already have
pub async fn create_my_referral_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    payload: Option<Json<CreateOwnReferralRequest>>,
) -> Result<(StatusCode, Json<Referral>), ReferralError> {
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    request
        .validate()
        .map_err(|e| ReferralError::ValidationError(e.to_string()))?;

    let referral = state
        .referral_service
        .create_for_user(user.user_id, request.base.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(referral)))
}

/// Handler for POST /api/referrals/validate
/// Quotes the discount a code would give on an order value without redeeming it
pub async fn validate_referral_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Json(request): Json<ValidateReferralRequest>,
) -> Result<Json<ReferralQuoteResponse>, ReferralError> {
    request
        .validate()
        .map_err(|e| ReferralError::ValidationError(e.to_string()))?;

    let quote = state
        .referral_service
        .validate_and_apply(&request.code, user.user_id, request.order_value)
        .await?;

    Ok(Json(quote.into()))
}

/// Handler for GET /api/admin/referrals
pub async fn list_referrals_handler(
    State(state): State<crate::AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<Referral>>, ReferralError> {
    Ok(Json(state.referral_service.list_all().await?))
}

/// Handler for POST /api/admin/referrals
pub async fn create_referral_handler(
    State(state): State<crate::AppState>,
    AdminUser(admin): AdminUser,
    Json(request): Json<CreateReferralRequest>,
) -> Result<(StatusCode, Json<Referral>), ReferralError> {
    let referral = state
        .referral_service
        .create_by_admin(admin.user_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(referral)))
}

/// Handler for GET /api/admin/referrals/{id}
pub async fn get_referral_handler(
    State(state): State<crate::AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Referral>, ReferralError> {
    Ok(Json(state.referral_service.get(id).await?))
}

/// Handler for PUT /api/admin/referrals/{id}
/// Codes are deactivated through `is_active`, never deleted
pub async fn update_referral_handler(
    State(state): State<crate::AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateReferralRequest>,
) -> Result<Json<Referral>, ReferralError> {
    tracing::debug!("Admin {} updating referral {}", admin.user_id, id);
    let referral = state.referral_service.update_by_admin(id, request).await?;
    Ok(Json(referral))
}

/// Handler for GET /api/admin/referrals/{id}/usages
pub async fn list_referral_usages_handler(
    State(state): State<crate::AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ReferralUsage>>, ReferralError> {
    Ok(Json(state.referral_service.list_usages(id).await?))
}

/// Handler for PUT /api/admin/referral-usages/{id}
/// Advances a usage's payout status
pub async fn update_usage_status_handler(
    State(state): State<crate::AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUsageStatusRequest>,
) -> Result<Json<ReferralUsage>, ReferralError> {
    tracing::debug!("Admin {} setting usage {} to {}", admin.user_id, id, request.status);
    let usage = state
        .referral_service
        .update_usage_status(id, request.status)
        .await?;

    Ok(Json(usage))
}
