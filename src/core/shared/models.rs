use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::enums::{
    AssignedRole, HistoryAction, Role, TicketCategory, TicketStatus, TicketUrgency,
};

/// Id of the company that must never disappear without a successor.
pub const ROOT_COMPANY_ID: i32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Company {
    pub fn is_root(&self) -> bool {
        self.id == ROOT_COMPANY_ID
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub company_id: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub category: TicketCategory,
    pub urgency: TicketUrgency,
    pub status: TicketStatus,
    pub assigned_role: Option<AssignedRole>,
    pub company_id: i32,
    pub created_by: i32,
    pub updated_by: Option<i32>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn is_hidden(&self) -> bool {
        self.status == TicketStatus::Hidden
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketHistory {
    pub id: i32,
    pub ticket_id: i32,
    pub user_id: i32,
    pub action_type: HistoryAction,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketComment {
    pub id: i32,
    pub ticket_id: i32,
    pub user_id: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// WRITE MODELS
// ============================================================================

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub company_id: i32,
    pub is_active: bool,
}

/// Partial user update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub company_id: Option<i32>,
    pub is_active: Option<bool>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub category: TicketCategory,
    pub urgency: TicketUrgency,
    pub assigned_role: Option<AssignedRole>,
    pub company_id: i32,
    pub created_by: i32,
}

/// Partial ticket update stamped with the acting user and time.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<TicketCategory>,
    pub urgency: Option<TicketUrgency>,
    pub assigned_role: Option<Option<AssignedRole>>,
    pub status: Option<TicketStatus>,
    pub comment: Option<String>,
    pub updated_by: i32,
    pub updated_at: DateTime<Utc>,
}

impl TicketChanges {
    pub fn stamped(updated_by: i32, updated_at: DateTime<Utc>) -> Self {
        Self {
            title: None,
            description: None,
            category: None,
            urgency: None,
            assigned_role: None,
            status: None,
            comment: None,
            updated_by,
            updated_at,
        }
    }

    pub fn apply_to(&self, ticket: &mut Ticket) {
        if let Some(title) = &self.title {
            ticket.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            ticket.description.clone_from(description);
        }
        if let Some(category) = self.category {
            ticket.category = category;
        }
        if let Some(urgency) = self.urgency {
            ticket.urgency = urgency;
        }
        if let Some(assigned_role) = self.assigned_role {
            ticket.assigned_role = assigned_role;
        }
        if let Some(status) = self.status {
            ticket.status = status;
        }
        if let Some(comment) = &self.comment {
            ticket.comment = Some(comment.clone());
        }
        ticket.updated_by = Some(self.updated_by);
        ticket.updated_at = self.updated_at;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTicketHistory {
    pub ticket_id: i32,
    pub user_id: i32,
    pub action_type: HistoryAction,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTicketComment {
    pub ticket_id: i32,
    pub user_id: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// QUERIES
// ============================================================================

/// Scoped ticket query. Scope fields come from the policy, filters from the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketQuery {
    pub company_id: Option<i32>,
    pub created_by: Option<i32>,
    pub include_hidden: bool,
    pub status: Option<TicketStatus>,
    pub category: Option<TicketCategory>,
    pub urgency: Option<TicketUrgency>,
    pub assigned_role: Option<AssignedRole>,
    pub limit: Option<i64>,
}

impl TicketQuery {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.company_id.map_or(true, |c| ticket.company_id == c)
            && self.created_by.map_or(true, |u| ticket.created_by == u)
            && (self.include_hidden || !ticket.is_hidden())
            && self.status.map_or(true, |s| ticket.status == s)
            && self.category.map_or(true, |c| ticket.category == c)
            && self.urgency.map_or(true, |u| ticket.urgency == u)
            && self
                .assigned_role
                .map_or(true, |r| ticket.assigned_role == Some(r))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketStats {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
    pub by_category: BTreeMap<String, i64>,
    pub by_urgency: BTreeMap<String, i64>,
}

impl TicketStats {
    /// Empty stats with a zero bucket for every visible value.
    pub fn zeroed(include_hidden: bool) -> Self {
        let mut stats = Self::default();
        for status in TicketStatus::ALL {
            if include_hidden || status != TicketStatus::Hidden {
                stats.by_status.insert(status.to_string(), 0);
            }
        }
        for category in TicketCategory::ALL {
            stats.by_category.insert(category.to_string(), 0);
        }
        for urgency in TicketUrgency::ALL {
            stats.by_urgency.insert(urgency.to_string(), 0);
        }
        stats
    }

    pub fn record(&mut self, status: &str, category: &str, urgency: &str) {
        self.total += 1;
        *self.by_status.entry(status.to_string()).or_insert(0) += 1;
        *self.by_category.entry(category.to_string()).or_insert(0) += 1;
        *self.by_urgency.entry(urgency.to_string()).or_insert(0) += 1;
    }
}
