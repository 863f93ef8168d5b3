//! Enumerations shared by the helpdesk tables.
//!
//! Columns store these as lowercase snake_case strings; conversion happens at
//! the store boundary through `Display` and `FromStr`.

use serde::{Deserialize, Serialize};

// ============================================================================
// USER ROLES
// ============================================================================

/// Role of a user inside their company, ordered by capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Admin,
    TechAdmin,
    User,
}

impl Role {
    pub const ALL: [Role; 4] = [Self::Owner, Self::Admin, Self::TechAdmin, Self::User];

    pub fn hierarchy_level(&self) -> u8 {
        match self {
            Self::Owner => 3,
            Self::Admin => 2,
            Self::TechAdmin => 1,
            Self::User => 0,
        }
    }

    pub fn is_at_least(&self, other: &Role) -> bool {
        self.hierarchy_level() >= other.hierarchy_level()
    }

    /// Every role except plain `user` works tickets on behalf of the company.
    pub fn is_staff(&self) -> bool {
        !matches!(self, Self::User)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Owner => write!(f, "owner"),
            Self::Admin => write!(f, "admin"),
            Self::TechAdmin => write!(f, "tech_admin"),
            Self::User => write!(f, "user"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "tech_admin" => Ok(Self::TechAdmin),
            "user" => Ok(Self::User),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

// ============================================================================
// TICKET ENUMS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Closed,
    Hidden,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 4] = [Self::Open, Self::InProgress, Self::Closed, Self::Hidden];
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Closed => write!(f, "closed"),
            Self::Hidden => write!(f, "hidden"),
        }
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "closed" => Ok(Self::Closed),
            "hidden" => Ok(Self::Hidden),
            _ => Err(format!("Unknown ticket status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketCategory {
    Bug,
    Feature,
    Task,
    Other,
}

impl TicketCategory {
    pub const ALL: [TicketCategory; 4] = [Self::Bug, Self::Feature, Self::Task, Self::Other];
}

impl std::fmt::Display for TicketCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bug => write!(f, "bug"),
            Self::Feature => write!(f, "feature"),
            Self::Task => write!(f, "task"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for TicketCategory {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bug" => Ok(Self::Bug),
            "feature" => Ok(Self::Feature),
            "task" => Ok(Self::Task),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown ticket category: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketUrgency {
    Low,
    Medium,
    High,
}

impl TicketUrgency {
    pub const ALL: [TicketUrgency; 3] = [Self::Low, Self::Medium, Self::High];
}

impl std::fmt::Display for TicketUrgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for TicketUrgency {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("Unknown ticket urgency: {}", s)),
        }
    }
}

/// Staff role a ticket is routed to. Only `admin` and `tech_admin` qualify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignedRole {
    Admin,
    TechAdmin,
}

impl From<AssignedRole> for Role {
    fn from(value: AssignedRole) -> Self {
        match value {
            AssignedRole::Admin => Role::Admin,
            AssignedRole::TechAdmin => Role::TechAdmin,
        }
    }
}

impl std::fmt::Display for AssignedRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Role::from(*self).fmt(f)
    }
}

impl std::str::FromStr for AssignedRole {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "tech_admin" => Ok(Self::TechAdmin),
            _ => Err(format!(
                "Assigned role must be admin or tech_admin, got: {}",
                s
            )),
        }
    }
}

// ============================================================================
// HISTORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    TitleChange,
    CategoryChange,
    UrgencyChange,
    RoleChange,
    CommentAdded,
    StatusChange,
}

impl std::fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TitleChange => write!(f, "title_change"),
            Self::CategoryChange => write!(f, "category_change"),
            Self::UrgencyChange => write!(f, "urgency_change"),
            Self::RoleChange => write!(f, "role_change"),
            Self::CommentAdded => write!(f, "comment_added"),
            Self::StatusChange => write!(f, "status_change"),
        }
    }
}

impl std::str::FromStr for HistoryAction {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "title_change" => Ok(Self::TitleChange),
            "category_change" => Ok(Self::CategoryChange),
            "urgency_change" => Ok(Self::UrgencyChange),
            "role_change" => Ok(Self::RoleChange),
            "comment_added" => Ok(Self::CommentAdded),
            "status_change" => Ok(Self::StatusChange),
            _ => Err(format!("Unknown history action: {}", s)),
        }
    }
}
