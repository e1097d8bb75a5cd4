use std::collections::HashMap;

use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use desk_shared::errors::AppResult;

use crate::models::{Complaint, User};
use crate::schema::users;

#[derive(Debug, Serialize)]
pub struct RaisedByRef {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ClaimedByRef {
    pub name: String,
}

/// A complaint row decorated with the people around it, as listings
/// return it.
#[derive(Debug, Serialize)]
pub struct ComplaintView {
    #[serde(flatten)]
    pub complaint: Complaint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raised_by: Option<RaisedByRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<ClaimedByRef>,
}

/// Decorate complaints with raiser and/or claimer identities using one
/// batched user lookup.
pub fn attach_users(
    conn: &mut PgConnection,
    complaints: Vec<Complaint>,
    include_raiser: bool,
    include_claimer: bool,
) -> AppResult<Vec<ComplaintView>> {
    let mut ids: Vec<Uuid> = Vec::new();
    for c in &complaints {
        if include_raiser {
            ids.push(c.raised_by_id);
        }
        if include_claimer {
            if let Some(id) = c.claimed_by_id {
                ids.push(id);
            }
        }
    }
    ids.sort_unstable();
    ids.dedup();

    let by_id: HashMap<Uuid, User> = if ids.is_empty() {
        HashMap::new()
    } else {
        users::table
            .filter(users::id.eq_any(&ids))
            .load::<User>(conn)?
            .into_iter()
            .map(|u| (u.id, u))
            .collect()
    };

    Ok(complaints
        .into_iter()
        .map(|c| {
            let raised_by = if include_raiser {
                by_id.get(&c.raised_by_id).map(|u| RaisedByRef {
                    name: u.name.clone(),
                    email: u.email.clone(),
                })
            } else {
                None
            };
            let claimed_by = if include_claimer {
                c.claimed_by_id
                    .and_then(|id| by_id.get(&id))
                    .map(|u| ClaimedByRef { name: u.name.clone() })
            } else {
                None
            };
            ComplaintView {
                complaint: c,
                raised_by,
                claimed_by,
            }
        })
        .collect())
}
