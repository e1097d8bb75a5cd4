use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{complaint_history, complaints, users};

// --- Status flow ---

/// Complaint statuses, in lifecycle order. The flow is strictly linear:
/// every advance moves exactly one step forward and CLOSED is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplaintStatus {
    Submitted,
    Claimed,
    InProgress,
    Resolved,
    Closed,
}

/// Statuses that count as "active" for the one-active-complaint and
/// one-active-claim rules. Stored as the raw column values so queries can
/// filter with `eq_any`.
pub const ACTIVE_STATUSES: [&str; 3] = ["SUBMITTED", "CLAIMED", "IN_PROGRESS"];

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Submitted => "SUBMITTED",
            ComplaintStatus::Claimed => "CLAIMED",
            ComplaintStatus::InProgress => "IN_PROGRESS",
            ComplaintStatus::Resolved => "RESOLVED",
            ComplaintStatus::Closed => "CLOSED",
        }
    }

    /// The single legal next status, or None once terminal.
    pub fn next(&self) -> Option<ComplaintStatus> {
        match self {
            ComplaintStatus::Submitted => Some(ComplaintStatus::Claimed),
            ComplaintStatus::Claimed => Some(ComplaintStatus::InProgress),
            ComplaintStatus::InProgress => Some(ComplaintStatus::Resolved),
            ComplaintStatus::Resolved => Some(ComplaintStatus::Closed),
            ComplaintStatus::Closed => None,
        }
    }

    /// Not yet resolved or closed.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ComplaintStatus::Submitted | ComplaintStatus::Claimed | ComplaintStatus::InProgress
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ComplaintStatus::Resolved | ComplaintStatus::Closed)
    }
}

impl std::fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ComplaintStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUBMITTED" => Ok(ComplaintStatus::Submitted),
            "CLAIMED" => Ok(ComplaintStatus::Claimed),
            "IN_PROGRESS" => Ok(ComplaintStatus::InProgress),
            "RESOLVED" => Ok(ComplaintStatus::Resolved),
            "CLOSED" => Ok(ComplaintStatus::Closed),
            _ => Err(format!("unknown complaint status: {s}")),
        }
    }
}

// --- Priority ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Normal,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Normal => "NORMAL",
            Priority::High => "HIGH",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NORMAL" => Ok(Priority::Normal),
            "HIGH" => Ok(Priority::High),
            _ => Err(format!("unknown priority: {s}")),
        }
    }
}

// --- Category ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Hostel,
    Mess,
    Academic,
    InternetNetwork,
    Infrastructure,
    Others,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Hostel => "HOSTEL",
            Category::Mess => "MESS",
            Category::Academic => "ACADEMIC",
            Category::InternetNetwork => "INTERNET_NETWORK",
            Category::Infrastructure => "INFRASTRUCTURE",
            Category::Others => "OTHERS",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HOSTEL" => Ok(Category::Hostel),
            "MESS" => Ok(Category::Mess),
            "ACADEMIC" => Ok(Category::Academic),
            "INTERNET_NETWORK" => Ok(Category::InternetNetwork),
            "INFRASTRUCTURE" => Ok(Category::Infrastructure),
            "OTHERS" => Ok(Category::Others),
            _ => Err(format!("unknown category: {s}")),
        }
    }
}

// --- User ---

#[derive(Debug, Queryable, Identifiable, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

// --- Complaint ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = complaints)]
pub struct Complaint {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: String,
    pub priority: String,
    pub escalated: bool,
    pub raised_by_id: Uuid,
    pub claimed_by_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = complaints)]
pub struct NewComplaint {
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: String,
    pub priority: String,
    pub escalated: bool,
    pub raised_by_id: Uuid,
}

// --- ComplaintHistory ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = complaint_history)]
pub struct ComplaintHistoryRecord {
    pub id: Uuid,
    pub complaint_id: Uuid,
    pub user_id: Uuid,
    pub from_status: Option<String>,
    pub to_status: String,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = complaint_history)]
pub struct NewComplaintHistory {
    pub complaint_id: Uuid,
    pub user_id: Uuid,
    pub from_status: Option<String>,
    pub to_status: String,
    pub remarks: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_flow_is_linear_and_terminates() {
        let mut visited = vec![ComplaintStatus::Submitted];
        let mut current = ComplaintStatus::Submitted;
        while let Some(next) = current.next() {
            visited.push(next);
            current = next;
        }

        assert_eq!(
            visited,
            vec![
                ComplaintStatus::Submitted,
                ComplaintStatus::Claimed,
                ComplaintStatus::InProgress,
                ComplaintStatus::Resolved,
                ComplaintStatus::Closed,
            ]
        );
        assert_eq!(ComplaintStatus::Closed.next(), None);
    }

    #[test]
    fn active_set_matches_is_active() {
        for s in [
            ComplaintStatus::Submitted,
            ComplaintStatus::Claimed,
            ComplaintStatus::InProgress,
            ComplaintStatus::Resolved,
            ComplaintStatus::Closed,
        ] {
            assert_eq!(s.is_active(), ACTIVE_STATUSES.contains(&s.as_str()), "{s}");
            assert_eq!(s.is_terminal(), !s.is_active(), "{s}");
        }
    }

    #[test]
    fn status_round_trips_through_strings() {
        for s in [
            ComplaintStatus::Submitted,
            ComplaintStatus::Claimed,
            ComplaintStatus::InProgress,
            ComplaintStatus::Resolved,
            ComplaintStatus::Closed,
        ] {
            let parsed: ComplaintStatus = s.as_str().parse().unwrap();
            assert_eq!(parsed, s);
        }
        assert!("REOPENED".parse::<ComplaintStatus>().is_err());
    }

    #[test]
    fn status_serde_uses_column_values() {
        let json = serde_json::to_string(&ComplaintStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        let parsed: ComplaintStatus = serde_json::from_str("\"RESOLVED\"").unwrap();
        assert_eq!(parsed, ComplaintStatus::Resolved);
    }

    #[test]
    fn category_and_priority_round_trip() {
        for c in [
            Category::Hostel,
            Category::Mess,
            Category::Academic,
            Category::InternetNetwork,
            Category::Infrastructure,
            Category::Others,
        ] {
            let parsed: Category = c.as_str().parse().unwrap();
            assert_eq!(parsed, c);
        }
        assert_eq!(Category::InternetNetwork.as_str(), "INTERNET_NETWORK");

        for p in [Priority::Normal, Priority::High] {
            let parsed: Priority = p.as_str().parse().unwrap();
            assert_eq!(parsed, p);
        }
    }
}
