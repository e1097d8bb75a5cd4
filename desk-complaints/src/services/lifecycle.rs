use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use uuid::Uuid;

use desk_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{
    Category, Complaint, ComplaintStatus, NewComplaint, NewComplaintHistory, Priority,
    ACTIVE_STATUSES,
};
use crate::schema::{complaint_history, complaints};

const SUBMITTED_REMARK: &str = "Complaint submitted";
const CLAIMED_REMARK: &str = "Claimed by admin";

/// File a new complaint for `student_id`.
///
/// Runs under a serializable transaction: the no-other-active-complaint
/// check and the insert commit together or not at all, so two concurrent
/// creates by the same student cannot both pass the check.
pub fn create_complaint(
    conn: &mut PgConnection,
    student_id: Uuid,
    title: &str,
    description: &str,
    category: Category,
) -> AppResult<Complaint> {
    let result = conn.build_transaction().serializable().run(|conn| {
        let active: i64 = complaints::table
            .filter(complaints::raised_by_id.eq(student_id))
            .filter(complaints::status.eq_any(ACTIVE_STATUSES))
            .count()
            .get_result(conn)?;

        if active > 0 {
            return Err(AppError::new(
                ErrorCode::ActiveComplaintExists,
                "you already have an active complaint, only one at a time is allowed",
            ));
        }

        let complaint: Complaint = diesel::insert_into(complaints::table)
            .values(&NewComplaint {
                title: title.trim().to_string(),
                description: description.trim().to_string(),
                category: category.as_str().to_string(),
                status: ComplaintStatus::Submitted.as_str().to_string(),
                priority: Priority::Normal.as_str().to_string(),
                escalated: false,
                raised_by_id: student_id,
            })
            .get_result(conn)?;

        diesel::insert_into(complaint_history::table)
            .values(&NewComplaintHistory {
                complaint_id: complaint.id,
                user_id: student_id,
                from_status: None,
                to_status: ComplaintStatus::Submitted.as_str().to_string(),
                remarks: Some(SUBMITTED_REMARK.to_string()),
            })
            .execute(conn)?;

        Ok(complaint)
    });

    result.map_err(|e| {
        retry_conflict(
            e,
            ErrorCode::ActiveComplaintExists,
            "you already have an active complaint, only one at a time is allowed",
        )
    })
}

/// Claim a SUBMITTED complaint for `admin_id`.
///
/// The decision point is atomic: the state checks, the guarded update
/// (which requires the row to still be SUBMITTED and unclaimed when the
/// write lands) and the history append share one serializable
/// transaction. Two admins racing for the same complaint get exactly one
/// success; the loser surfaces as an already-claimed conflict whether the
/// guard or the isolation level catches it.
pub fn claim_complaint(
    conn: &mut PgConnection,
    admin_id: Uuid,
    complaint_id: Uuid,
) -> AppResult<Complaint> {
    let result = conn.build_transaction().serializable().run(|conn| {
        let complaint = complaints::table
            .find(complaint_id)
            .first::<Complaint>(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::ComplaintNotFound, "complaint not found"))?;

        if complaint.status != ComplaintStatus::Submitted.as_str() {
            return Err(AppError::new(
                ErrorCode::AlreadyClaimed,
                "complaint is not open for claiming",
            ));
        }
        if complaint.claimed_by_id.is_some() {
            return Err(AppError::new(
                ErrorCode::AlreadyClaimed,
                "already claimed by another admin",
            ));
        }

        let my_claims: i64 = complaints::table
            .filter(complaints::claimed_by_id.eq(admin_id))
            .filter(complaints::status.eq_any(ACTIVE_STATUSES))
            .count()
            .get_result(conn)?;

        if my_claims > 0 {
            return Err(AppError::new(
                ErrorCode::ClaimLimitReached,
                "you can only hold one claimed complaint at a time",
            ));
        }

        let now = Utc::now();
        let claimed: Option<Complaint> = diesel::update(
            complaints::table
                .find(complaint_id)
                .filter(complaints::status.eq(ComplaintStatus::Submitted.as_str()))
                .filter(complaints::claimed_by_id.is_null()),
        )
        .set((
            complaints::status.eq(ComplaintStatus::Claimed.as_str()),
            complaints::claimed_by_id.eq(admin_id),
            complaints::claimed_at.eq(now),
            complaints::updated_at.eq(now),
        ))
        .get_result(conn)
        .optional()?;

        let complaint = claimed.ok_or_else(|| {
            AppError::new(ErrorCode::AlreadyClaimed, "already claimed by another admin")
        })?;

        diesel::insert_into(complaint_history::table)
            .values(&NewComplaintHistory {
                complaint_id: complaint.id,
                user_id: admin_id,
                from_status: Some(ComplaintStatus::Submitted.as_str().to_string()),
                to_status: ComplaintStatus::Claimed.as_str().to_string(),
                remarks: Some(CLAIMED_REMARK.to_string()),
            })
            .execute(conn)?;

        Ok(complaint)
    });

    result.map_err(|e| {
        retry_conflict(e, ErrorCode::AlreadyClaimed, "already claimed by another admin")
    })
}

/// Advance a claimed complaint to `requested`.
///
/// Only the claiming admin may advance, and only to the single legal next
/// status. The status write and its history record share the transaction,
/// so the audit trail always agrees with the entity. `resolved_at` is
/// stamped on the first terminal transition and never overwritten.
pub fn advance_status(
    conn: &mut PgConnection,
    admin_id: Uuid,
    complaint_id: Uuid,
    requested: ComplaintStatus,
    remarks: Option<&str>,
) -> AppResult<Complaint> {
    conn.transaction(|conn| {
        let complaint = complaints::table
            .find(complaint_id)
            .first::<Complaint>(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::ComplaintNotFound, "complaint not found"))?;

        if complaint.claimed_by_id != Some(admin_id) {
            return Err(AppError::new(
                ErrorCode::NotClaimOwner,
                "you can only update complaints you claimed",
            ));
        }

        let current: ComplaintStatus = complaint
            .status
            .parse()
            .map_err(|e: String| AppError::internal(e))?;

        match current.next() {
            Some(expected) if expected == requested => {}
            Some(expected) => {
                return Err(AppError::new(
                    ErrorCode::InvalidTransition,
                    format!("invalid transition, next allowed status is {expected}"),
                ));
            }
            None => {
                return Err(AppError::new(
                    ErrorCode::InvalidTransition,
                    format!("complaint is already {current}, no further transitions"),
                ));
            }
        }

        let now = Utc::now();
        let target = complaints::table.find(complaint_id);
        let updated: Complaint = if requested.is_terminal() && complaint.resolved_at.is_none() {
            diesel::update(target)
                .set((
                    complaints::status.eq(requested.as_str()),
                    complaints::resolved_at.eq(now),
                    complaints::updated_at.eq(now),
                ))
                .get_result(conn)?
        } else {
            diesel::update(target)
                .set((
                    complaints::status.eq(requested.as_str()),
                    complaints::updated_at.eq(now),
                ))
                .get_result(conn)?
        };

        diesel::insert_into(complaint_history::table)
            .values(&NewComplaintHistory {
                complaint_id: complaint.id,
                user_id: admin_id,
                from_status: Some(current.as_str().to_string()),
                to_status: requested.as_str().to_string(),
                remarks: normalize_remarks(remarks),
            })
            .execute(conn)?;

        Ok(updated)
    })
}

/// Trim remarks; empty or whitespace-only remarks are stored as NULL.
fn normalize_remarks(remarks: Option<&str>) -> Option<String> {
    remarks
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(String::from)
}

/// Serializable transactions abort with a serialization failure when the
/// check-then-act raced another writer. That is a conflict outcome, not a
/// server fault.
fn retry_conflict(err: AppError, code: ErrorCode, message: &str) -> AppError {
    match err {
        AppError::Database(diesel::result::Error::DatabaseError(
            DatabaseErrorKind::SerializationFailure,
            _,
        )) => AppError::new(code, message),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remarks_are_trimmed_and_emptiness_is_null() {
        assert_eq!(normalize_remarks(Some("  fixed the router  ")), Some("fixed the router".to_string()));
        assert_eq!(normalize_remarks(Some("   ")), None);
        assert_eq!(normalize_remarks(Some("")), None);
        assert_eq!(normalize_remarks(None), None);
    }

    #[test]
    fn serialization_failures_become_conflicts() {
        let db_err = AppError::Database(diesel::result::Error::DatabaseError(
            DatabaseErrorKind::SerializationFailure,
            Box::new("could not serialize access".to_string()),
        ));
        let mapped = retry_conflict(db_err, ErrorCode::AlreadyClaimed, "already claimed");
        assert_eq!(mapped.error_code(), Some(ErrorCode::AlreadyClaimed));
    }

    #[test]
    fn other_errors_pass_through_unchanged() {
        let not_found = AppError::new(ErrorCode::ComplaintNotFound, "complaint not found");
        let mapped = retry_conflict(not_found, ErrorCode::AlreadyClaimed, "already claimed");
        assert_eq!(mapped.error_code(), Some(ErrorCode::ComplaintNotFound));

        let db_err = AppError::Database(diesel::result::Error::NotFound);
        let mapped = retry_conflict(db_err, ErrorCode::AlreadyClaimed, "already claimed");
        assert!(matches!(mapped, AppError::Database(diesel::result::Error::NotFound)));
    }
}
