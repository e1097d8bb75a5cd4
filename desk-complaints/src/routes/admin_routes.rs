use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use desk_shared::errors::{AppError, AppResult, ErrorCode};
use desk_shared::middleware::AdminUser;
use desk_shared::types::api::ApiResponse;
use desk_shared::types::auth::AuthUser;

use crate::models::{Complaint, ComplaintStatus};
use crate::routes::views::{attach_users, ComplaintView};
use crate::schema::complaints;
use crate::services::{lifecycle, time_rules};
use crate::AppState;

// --- Request types ---

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub remarks: Option<String>,
}

// --- Unclaimed pool (admins; others get an empty list) ---

pub async fn list_unclaimed(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<ComplaintView>>>> {
    if !auth.is_admin() {
        return Ok(Json(ApiResponse::ok(Vec::new())));
    }

    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let open = complaints::table
        .filter(complaints::status.eq(ComplaintStatus::Submitted.as_str()))
        .filter(complaints::claimed_by_id.is_null())
        .order(complaints::created_at.desc())
        .load::<Complaint>(&mut conn)?;

    let ids: Vec<Uuid> = open.iter().map(|c| c.id).collect();
    time_rules::apply_bulk(&mut conn, &ids, Utc::now())?;

    let current = complaints::table
        .filter(complaints::status.eq(ComplaintStatus::Submitted.as_str()))
        .filter(complaints::claimed_by_id.is_null())
        .order(complaints::created_at.desc())
        .load::<Complaint>(&mut conn)?;

    let views = attach_users(&mut conn, current, true, false)?;
    Ok(Json(ApiResponse::ok(views)))
}

// --- My current claim (admins; others get null) ---

pub async fn get_claimed(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> AppResult<Json<ApiResponse<Option<ComplaintView>>>> {
    if !auth.is_admin() {
        return Ok(Json(ApiResponse::ok(None)));
    }

    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let claimed = complaints::table
        .filter(complaints::claimed_by_id.eq(auth.id))
        .filter(complaints::status.eq_any([
            ComplaintStatus::Claimed.as_str(),
            ComplaintStatus::InProgress.as_str(),
        ]))
        .order(complaints::updated_at.desc())
        .first::<Complaint>(&mut conn)
        .optional()?;

    let Some(claimed) = claimed else {
        return Ok(Json(ApiResponse::ok(None)));
    };

    time_rules::apply(&mut conn, claimed.id, Utc::now())?;

    let current = complaints::table
        .find(claimed.id)
        .first::<Complaint>(&mut conn)?;

    let view = attach_users(&mut conn, vec![current], true, false)?
        .into_iter()
        .next();
    Ok(Json(ApiResponse::ok(view)))
}

// --- Claim a complaint ---

pub async fn claim_complaint(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(complaint_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Complaint>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let complaint = lifecycle::claim_complaint(&mut conn, admin.id, complaint_id)?;

    tracing::info!(complaint_id = %complaint.id, admin_id = %admin.id, "complaint claimed");
    Ok(Json(ApiResponse::ok(complaint)))
}

// --- Advance a claimed complaint one step ---

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(complaint_id): Path<Uuid>,
    Json(body): Json<UpdateStatusRequest>,
) -> AppResult<Json<ApiResponse<Complaint>>> {
    let requested: ComplaintStatus = body
        .status
        .parse()
        .map_err(|e: String| AppError::new(ErrorCode::ValidationError, e))?;

    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let complaint = lifecycle::advance_status(
        &mut conn,
        admin.id,
        complaint_id,
        requested,
        body.remarks.as_deref(),
    )?;

    tracing::info!(
        complaint_id = %complaint.id,
        status = %complaint.status,
        "complaint status advanced"
    );
    Ok(Json(ApiResponse::ok(complaint)))
}
