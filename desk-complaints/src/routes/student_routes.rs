use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use desk_shared::errors::{AppError, AppResult, ErrorCode};
use desk_shared::middleware::StudentUser;
use desk_shared::types::api::ApiResponse;
use desk_shared::types::auth::AuthUser;

use crate::models::{Category, Complaint, ComplaintHistoryRecord, User};
use crate::routes::views::{attach_users, ComplaintView};
use crate::schema::{complaint_history, complaints, users};
use crate::services::{lifecycle, time_rules};
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize, Validate)]
pub struct CreateComplaintRequest {
    #[validate(custom = "not_blank")]
    pub title: String,
    #[validate(custom = "not_blank")]
    pub description: String,
    pub category: Category,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct ActorRef {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryView {
    #[serde(flatten)]
    pub record: ComplaintHistoryRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<ActorRef>,
}

// --- File a complaint ---

pub async fn create_complaint(
    State(state): State<Arc<AppState>>,
    StudentUser(student): StudentUser,
    Json(body): Json<CreateComplaintRequest>,
) -> AppResult<Json<ApiResponse<Uuid>>> {
    body.validate()
        .map_err(|_| AppError::new(ErrorCode::ValidationError, "title and description are required"))?;

    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let complaint =
        lifecycle::create_complaint(&mut conn, student.id, &body.title, &body.description, body.category)?;

    tracing::info!(complaint_id = %complaint.id, category = %body.category, "complaint filed");
    Ok(Json(ApiResponse::ok(complaint.id)))
}

// --- My complaints (students; others get an empty list) ---

pub async fn list_my_complaints(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<ComplaintView>>>> {
    if !auth.is_student() {
        return Ok(Json(ApiResponse::ok(Vec::new())));
    }

    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let mine = complaints::table
        .filter(complaints::raised_by_id.eq(auth.id))
        .order(complaints::created_at.desc())
        .load::<Complaint>(&mut conn)?;

    let ids: Vec<Uuid> = mine.iter().map(|c| c.id).collect();
    time_rules::apply_bulk(&mut conn, &ids, Utc::now())?;

    let current = complaints::table
        .filter(complaints::raised_by_id.eq(auth.id))
        .order(complaints::created_at.desc())
        .load::<Complaint>(&mut conn)?;

    let views = attach_users(&mut conn, current, false, true)?;
    Ok(Json(ApiResponse::ok(views)))
}

// --- Audit trail (raiser, claiming admin, or super admin; others get empty) ---

pub async fn get_complaint_history(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(complaint_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<HistoryView>>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let complaint = complaints::table
        .find(complaint_id)
        .select((complaints::raised_by_id, complaints::claimed_by_id))
        .first::<(Uuid, Option<Uuid>)>(&mut conn)
        .optional()?;

    let Some((raised_by_id, claimed_by_id)) = complaint else {
        return Ok(Json(ApiResponse::ok(Vec::new())));
    };

    let can_view = auth.is_super_admin()
        || raised_by_id == auth.id
        || claimed_by_id == Some(auth.id);
    if !can_view {
        return Ok(Json(ApiResponse::ok(Vec::new())));
    }

    let records = complaint_history::table
        .filter(complaint_history::complaint_id.eq(complaint_id))
        .order(complaint_history::created_at.asc())
        .load::<ComplaintHistoryRecord>(&mut conn)?;

    let mut actor_ids: Vec<Uuid> = records.iter().map(|r| r.user_id).collect();
    actor_ids.sort_unstable();
    actor_ids.dedup();

    let actors: std::collections::HashMap<Uuid, String> = users::table
        .filter(users::id.eq_any(&actor_ids))
        .load::<User>(&mut conn)?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect();

    let views = records
        .into_iter()
        .map(|record| {
            let user = actors.get(&record.user_id).map(|name| ActorRef { name: name.clone() });
            HistoryView { record, user }
        })
        .collect();

    Ok(Json(ApiResponse::ok(views)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_title_or_description_fails_validation() {
        let req = CreateComplaintRequest {
            title: "   ".to_string(),
            description: "No water on the third floor".to_string(),
            category: Category::Hostel,
        };
        assert!(req.validate().is_err());

        let req = CreateComplaintRequest {
            title: "No water".to_string(),
            description: "".to_string(),
            category: Category::Hostel,
        };
        assert!(req.validate().is_err());

        let req = CreateComplaintRequest {
            title: "No water".to_string(),
            description: "No water on the third floor".to_string(),
            category: Category::Hostel,
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn create_request_parses_category_from_wire_form() {
        let req: CreateComplaintRequest = serde_json::from_str(
            r#"{"title":"Wifi down","description":"No connectivity in block B","category":"INTERNET_NETWORK"}"#,
        )
        .unwrap();
        assert_eq!(req.category, Category::InternetNetwork);
        assert!(serde_json::from_str::<CreateComplaintRequest>(
            r#"{"title":"x","description":"y","category":"PARKING"}"#
        )
        .is_err());
    }
}
