use chrono::{DateTime, Duration, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use desk_shared::errors::{AppError, AppResult};

use crate::models::{Complaint, ComplaintStatus, Priority};
use crate::schema::complaints;

const PRIORITY_BUMP_AFTER_MINUTES: i64 = 30;
const ESCALATE_AFTER_HOURS: i64 = 24;

/// Field updates produced by the age rules. Both fields are one-way:
/// priority only moves NORMAL -> HIGH, escalated only false -> true, so
/// redundant concurrent application is harmless.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RuleUpdates {
    pub priority: Option<Priority>,
    pub escalated: Option<bool>,
}

impl RuleUpdates {
    pub fn is_empty(&self) -> bool {
        self.priority.is_none() && self.escalated.is_none()
    }
}

/// Evaluate the age rules for one complaint at instant `now`.
///
/// Rule 1: still SUBMITTED at NORMAL priority after 30 minutes -> HIGH.
/// Rule 2: still unresolved and not escalated after 24 hours -> escalated.
///
/// Pure and idempotent: once a rule has fired its precondition is false,
/// so re-evaluating yields no further update.
pub fn evaluate(
    status: ComplaintStatus,
    priority: Priority,
    escalated: bool,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> RuleUpdates {
    let age = now - created_at;
    let mut updates = RuleUpdates::default();

    if status == ComplaintStatus::Submitted
        && priority == Priority::Normal
        && age >= Duration::minutes(PRIORITY_BUMP_AFTER_MINUTES)
    {
        updates.priority = Some(Priority::High);
    }

    if status.is_active() && !escalated && age >= Duration::hours(ESCALATE_AFTER_HOURS) {
        updates.escalated = Some(true);
    }

    updates
}

/// Evaluate and persist the age rules for one complaint. Missing rows are
/// ignored; rows whose status or priority column fails to parse are left
/// untouched.
pub fn apply(conn: &mut PgConnection, complaint_id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
    let Some(complaint) = complaints::table
        .find(complaint_id)
        .first::<Complaint>(conn)
        .optional()?
    else {
        return Ok(());
    };

    let status: ComplaintStatus = complaint
        .status
        .parse()
        .map_err(|e: String| AppError::internal(e))?;
    let priority: Priority = complaint
        .priority
        .parse()
        .map_err(|e: String| AppError::internal(e))?;

    let updates = evaluate(status, priority, complaint.escalated, complaint.created_at, now);
    if updates.is_empty() {
        return Ok(());
    }

    let target = complaints::table.find(complaint_id);
    match (updates.priority, updates.escalated) {
        (Some(p), Some(e)) => {
            diesel::update(target)
                .set((
                    complaints::priority.eq(p.as_str()),
                    complaints::escalated.eq(e),
                    complaints::updated_at.eq(now),
                ))
                .execute(conn)?;
        }
        (Some(p), None) => {
            diesel::update(target)
                .set((
                    complaints::priority.eq(p.as_str()),
                    complaints::updated_at.eq(now),
                ))
                .execute(conn)?;
        }
        (None, Some(e)) => {
            diesel::update(target)
                .set((
                    complaints::escalated.eq(e),
                    complaints::updated_at.eq(now),
                ))
                .execute(conn)?;
        }
        (None, None) => {}
    }

    tracing::debug!(
        complaint_id = %complaint_id,
        priority = ?updates.priority,
        escalated = ?updates.escalated,
        "time rules applied"
    );

    Ok(())
}

/// Apply the age rules to a batch of complaints at one shared instant.
/// List reads call this before answering, so escalation becomes visible
/// without a background job.
pub fn apply_bulk(conn: &mut PgConnection, complaint_ids: &[Uuid], now: DateTime<Utc>) -> AppResult<()> {
    for id in complaint_ids {
        apply(conn, *id, now)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(now: DateTime<Utc>, minutes_ago: i64) -> DateTime<Utc> {
        now - Duration::minutes(minutes_ago)
    }

    #[test]
    fn fresh_complaint_gets_no_updates() {
        let now = Utc::now();
        let updates = evaluate(
            ComplaintStatus::Submitted,
            Priority::Normal,
            false,
            at(now, 5),
            now,
        );
        assert!(updates.is_empty());
    }

    #[test]
    fn submitted_for_31_minutes_becomes_high_priority() {
        let now = Utc::now();
        let updates = evaluate(
            ComplaintStatus::Submitted,
            Priority::Normal,
            false,
            at(now, 31),
            now,
        );
        assert_eq!(updates.priority, Some(Priority::High));
        assert_eq!(updates.escalated, None);
    }

    #[test]
    fn priority_bump_requires_submitted_status() {
        let now = Utc::now();
        let updates = evaluate(
            ComplaintStatus::Claimed,
            Priority::Normal,
            false,
            at(now, 31),
            now,
        );
        assert_eq!(updates.priority, None);
    }

    #[test]
    fn unresolved_for_25_hours_escalates() {
        let now = Utc::now();
        for status in [
            ComplaintStatus::Submitted,
            ComplaintStatus::Claimed,
            ComplaintStatus::InProgress,
        ] {
            let updates = evaluate(status, Priority::High, false, at(now, 25 * 60), now);
            assert_eq!(updates.escalated, Some(true), "{status}");
        }
    }

    #[test]
    fn resolved_and_closed_never_escalate() {
        let now = Utc::now();
        for status in [ComplaintStatus::Resolved, ComplaintStatus::Closed] {
            let updates = evaluate(status, Priority::High, false, at(now, 48 * 60), now);
            assert!(updates.is_empty(), "{status}");
        }
    }

    #[test]
    fn both_rules_fire_together_on_old_submitted_complaint() {
        let now = Utc::now();
        let updates = evaluate(
            ComplaintStatus::Submitted,
            Priority::Normal,
            false,
            at(now, 25 * 60),
            now,
        );
        assert_eq!(updates.priority, Some(Priority::High));
        assert_eq!(updates.escalated, Some(true));
    }

    #[test]
    fn evaluation_is_idempotent() {
        let now = Utc::now();
        let created = at(now, 25 * 60);
        let first = evaluate(ComplaintStatus::Submitted, Priority::Normal, false, created, now);
        assert!(!first.is_empty());

        // Re-evaluate with the first round's updates applied and no time passing.
        let second = evaluate(
            ComplaintStatus::Submitted,
            first.priority.unwrap(),
            first.escalated.unwrap(),
            created,
            now,
        );
        assert!(second.is_empty());
    }

    #[test]
    fn high_priority_and_escalated_are_monotonic() {
        let now = Utc::now();
        // Already HIGH and escalated: nothing ever reverts, whatever the age.
        for minutes in [0, 31, 24 * 60, 7 * 24 * 60] {
            let updates = evaluate(
                ComplaintStatus::Submitted,
                Priority::High,
                true,
                at(now, minutes),
                now,
            );
            assert!(updates.is_empty());
        }
    }

    #[test]
    fn thresholds_are_inclusive() {
        let now = Utc::now();
        let updates = evaluate(
            ComplaintStatus::Submitted,
            Priority::Normal,
            false,
            now - Duration::minutes(PRIORITY_BUMP_AFTER_MINUTES),
            now,
        );
        assert_eq!(updates.priority, Some(Priority::High));

        let updates = evaluate(
            ComplaintStatus::InProgress,
            Priority::High,
            false,
            now - Duration::hours(ESCALATE_AFTER_HOURS),
            now,
        );
        assert_eq!(updates.escalated, Some(true));
    }
}
