use serde::{Deserialize, Deserializer};

use crate::core::error::{HelpdeskError, HelpdeskResult};
use crate::core::shared::utils::non_blank;
use crate::core::shared::{AssignedRole, TicketCategory, TicketStatus, TicketUrgency};

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_DESCRIPTION_LENGTH: usize = 10_000;
pub const MAX_COMMENT_LENGTH: usize = 2_000;
pub const DEFAULT_RECENT_LIMIT: usize = 10;
pub const MAX_LIST_LIMIT: i64 = 500;

/// Distinguishes an absent field from an explicit `null`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn parse_enum<T>(field: &str, value: &str) -> HelpdeskResult<T>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .parse::<T>()
        .map_err(|e| HelpdeskError::Validation(format!("Invalid {field}: {e}")))
}

fn required_text(field: &str, value: &str, max: usize) -> HelpdeskResult<String> {
    let text = non_blank(value)
        .ok_or_else(|| HelpdeskError::Validation(format!("{field} cannot be empty")))?;
    if text.chars().count() > max {
        return Err(HelpdeskError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(text)
}

fn bounded_text(field: &str, value: &str, max: usize) -> HelpdeskResult<String> {
    let text = value.trim();
    if text.chars().count() > max {
        return Err(HelpdeskError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(text.to_string())
}

/// Comment text attached to a transition or posted on a ticket.
pub fn comment_text(value: &str) -> HelpdeskResult<String> {
    required_text("Comment", value, MAX_COMMENT_LENGTH)
}

// ============================================================================
// REQUESTS
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTicketRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub urgency: String,
    pub assigned_role: Option<String>,
    /// Only meaningful for owners; everyone else files into their own company.
    pub company_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTicketRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub urgency: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_role: Option<Option<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: String,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListTicketsQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub urgency: Option<String>,
    pub assigned_role: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentTicketsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteTicketQuery {
    #[serde(default)]
    pub hard: bool,
    pub comment: Option<String>,
}

// ============================================================================
// VALIDATED INPUTS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct TicketInput {
    pub title: String,
    pub description: String,
    pub category: TicketCategory,
    pub urgency: TicketUrgency,
    pub assigned_role: Option<AssignedRole>,
    pub company_id: Option<i32>,
}

impl CreateTicketRequest {
    pub fn validate(self) -> HelpdeskResult<TicketInput> {
        let description =
            bounded_text("Description", &self.description, MAX_DESCRIPTION_LENGTH)?;
        Ok(TicketInput {
            title: required_text("Title", &self.title, MAX_TITLE_LENGTH)?,
            description,
            category: parse_enum("category", &self.category)?,
            urgency: parse_enum("urgency", &self.urgency)?,
            assigned_role: self
                .assigned_role
                .as_deref()
                .map(|role| parse_enum("assigned_role", role))
                .transpose()?,
            company_id: self.company_id,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<TicketCategory>,
    pub urgency: Option<TicketUrgency>,
    pub assigned_role: Option<Option<AssignedRole>>,
}

impl UpdateTicketRequest {
    pub fn validate(self) -> HelpdeskResult<TicketEdit> {
        Ok(TicketEdit {
            title: self
                .title
                .map(|t| required_text("Title", &t, MAX_TITLE_LENGTH))
                .transpose()?,
            description: self
                .description
                .map(|d| bounded_text("Description", &d, MAX_DESCRIPTION_LENGTH))
                .transpose()?,
            category: self
                .category
                .map(|c| parse_enum("category", &c))
                .transpose()?,
            urgency: self
                .urgency
                .map(|u| parse_enum("urgency", &u))
                .transpose()?,
            assigned_role: self
                .assigned_role
                .map(|role| role.map(|r| parse_enum("assigned_role", &r)).transpose())
                .transpose()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub status: TicketStatus,
    pub comment: String,
}

impl StatusChange {
    /// Validates a raw transition request; no ticket is looked up here.
    pub fn parse(status: &str, comment: &str) -> HelpdeskResult<Self> {
        Ok(Self {
            status: parse_enum("status", status)?,
            comment: comment_text(comment)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketFilters {
    pub status: Option<TicketStatus>,
    pub category: Option<TicketCategory>,
    pub urgency: Option<TicketUrgency>,
    pub assigned_role: Option<AssignedRole>,
    pub limit: Option<i64>,
}

impl ListTicketsQuery {
    pub fn validate(self) -> HelpdeskResult<TicketFilters> {
        if let Some(limit) = self.limit {
            if !(1..=MAX_LIST_LIMIT).contains(&limit) {
                return Err(HelpdeskError::Validation(format!(
                    "limit must be between 1 and {MAX_LIST_LIMIT}"
                )));
            }
        }
        Ok(TicketFilters {
            status: self
                .status
                .map(|s| parse_enum("status", &s))
                .transpose()?,
            category: self
                .category
                .map(|c| parse_enum("category", &c))
                .transpose()?,
            urgency: self
                .urgency
                .map(|u| parse_enum("urgency", &u))
                .transpose()?,
            assigned_role: self
                .assigned_role
                .map(|r| parse_enum("assigned_role", &r))
                .transpose()?,
            limit: self.limit,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteMode {
    Hard,
    /// Moves the ticket to `hidden` with the given comment.
    Soft { comment: String },
}

impl DeleteTicketQuery {
    pub fn validate(self) -> HelpdeskResult<DeleteMode> {
        if self.hard {
            return Ok(DeleteMode::Hard);
        }
        let comment = self.comment.unwrap_or_default();
        Ok(DeleteMode::Soft {
            comment: comment_text(&comment)?,
        })
    }
}
