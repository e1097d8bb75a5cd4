use axum::extract::State;
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use desk_shared::errors::{AppError, AppResult};
use desk_shared::types::api::ApiResponse;
use desk_shared::types::auth::AuthUser;

use crate::models::{Complaint, ACTIVE_STATUSES};
use crate::routes::views::{attach_users, ComplaintView};
use crate::schema::complaints;
use crate::services::time_rules;
use crate::AppState;

// --- Response types ---

#[derive(Debug, Default, Serialize)]
pub struct ComplaintCounts {
    pub total: i64,
    pub unresolved: i64,
    pub escalated: i64,
    pub by_status: BTreeMap<String, i64>,
}

#[derive(Debug, Default, Serialize)]
pub struct OverviewResponse {
    pub list: Vec<ComplaintView>,
    pub counts: ComplaintCounts,
}

fn compute_counts(rows: &[Complaint]) -> ComplaintCounts {
    let mut counts = ComplaintCounts {
        total: rows.len() as i64,
        ..Default::default()
    };
    for c in rows {
        if ACTIVE_STATUSES.contains(&c.status.as_str()) {
            counts.unresolved += 1;
        }
        if c.escalated {
            counts.escalated += 1;
        }
        *counts.by_status.entry(c.status.clone()).or_insert(0) += 1;
    }
    counts
}

// --- Whole pool with aggregates (super admins; others get the empty shape) ---

pub async fn list_all(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> AppResult<Json<ApiResponse<OverviewResponse>>> {
    if !auth.is_super_admin() {
        return Ok(Json(ApiResponse::ok(OverviewResponse::default())));
    }

    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let all = complaints::table
        .order(complaints::created_at.desc())
        .load::<Complaint>(&mut conn)?;

    let ids: Vec<Uuid> = all.iter().map(|c| c.id).collect();
    time_rules::apply_bulk(&mut conn, &ids, Utc::now())?;

    let current = complaints::table
        .order(complaints::created_at.desc())
        .load::<Complaint>(&mut conn)?;

    let counts = compute_counts(&current);
    let list = attach_users(&mut conn, current, true, true)?;

    Ok(Json(ApiResponse::ok(OverviewResponse { list, counts })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn complaint(status: &str, escalated: bool) -> Complaint {
        let now = Utc::now();
        Complaint {
            id: Uuid::new_v4(),
            title: "t".to_string(),
            description: "d".to_string(),
            category: "OTHERS".to_string(),
            status: status.to_string(),
            priority: "NORMAL".to_string(),
            escalated,
            raised_by_id: Uuid::new_v4(),
            claimed_by_id: None,
            created_at: now,
            claimed_at: None,
            resolved_at: None,
            updated_at: now,
        }
    }

    #[test]
    fn counts_cover_total_unresolved_escalated_and_per_status() {
        let rows = vec![
            complaint("SUBMITTED", false),
            complaint("SUBMITTED", true),
            complaint("CLAIMED", false),
            complaint("IN_PROGRESS", true),
            complaint("RESOLVED", true),
            complaint("CLOSED", false),
        ];

        let counts = compute_counts(&rows);
        assert_eq!(counts.total, 6);
        assert_eq!(counts.unresolved, 4);
        assert_eq!(counts.escalated, 3);
        assert_eq!(counts.by_status.get("SUBMITTED"), Some(&2));
        assert_eq!(counts.by_status.get("CLAIMED"), Some(&1));
        assert_eq!(counts.by_status.get("RESOLVED"), Some(&1));
        assert_eq!(counts.by_status.get("CLOSED"), Some(&1));
    }

    #[test]
    fn empty_pool_yields_the_zero_shape() {
        let counts = compute_counts(&[]);
        assert_eq!(counts.total, 0);
        assert_eq!(counts.unresolved, 0);
        assert_eq!(counts.escalated, 0);
        assert!(counts.by_status.is_empty());

        let json = serde_json::to_string(&OverviewResponse::default()).unwrap();
        assert!(json.contains("\"list\":[]"));
        assert!(json.contains("\"by_status\":{}"));
    }
}
