//! Entity store collaborator.
//!
//! Services never talk SQL; they read through [`HelpdeskStore`] and write
//! through ordered [`WriteBatch`]es that the store applies atomically.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgHelpdeskStore;

use crate::core::shared::models::{
    Company, NewTicket, NewTicketComment, NewTicketHistory, NewUser, Ticket, TicketChanges,
    TicketComment, TicketHistory, TicketQuery, TicketStats, User, UserChanges,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("history append failed: {0}")]
    HistoryAppend(String),
    #[error("rollback failed: {0}")]
    RollbackFailed(String),
    #[error("row not found: {0}")]
    MissingRow(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("database error: {0}")]
    Database(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One step of an atomic write. Steps run in the order they were pushed.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    UpdateTicket {
        ticket_id: i32,
        changes: TicketChanges,
    },
    AppendHistory(NewTicketHistory),
    InsertComment(NewTicketComment),
    DeleteTicketHistory {
        ticket_id: i32,
    },
    DeleteTicketComments {
        ticket_id: i32,
    },
    DeleteTicket {
        ticket_id: i32,
    },
    ReassignUsers {
        from_company: i32,
        to_company: i32,
    },
    ReassignTickets {
        from_company: i32,
        to_company: i32,
    },
    DeleteCompanyUsers {
        company_id: i32,
    },
    DeleteCompany {
        company_id: i32,
    },
}

impl WriteOp {
    pub fn name(&self) -> &'static str {
        match self {
            Self::UpdateTicket { .. } => "update_ticket",
            Self::AppendHistory(_) => "append_history",
            Self::InsertComment(_) => "insert_comment",
            Self::DeleteTicketHistory { .. } => "delete_ticket_history",
            Self::DeleteTicketComments { .. } => "delete_ticket_comments",
            Self::DeleteTicket { .. } => "delete_ticket",
            Self::ReassignUsers { .. } => "reassign_users",
            Self::ReassignTickets { .. } => "reassign_tickets",
            Self::DeleteCompanyUsers { .. } => "delete_company_users",
            Self::DeleteCompany { .. } => "delete_company",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn op_names(&self) -> Vec<&'static str> {
        self.ops.iter().map(WriteOp::name).collect()
    }
}

/// Rows inserted by a committed batch, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitReceipt {
    pub history: Vec<TicketHistory>,
    pub comments: Vec<TicketComment>,
}

pub trait HelpdeskStore: Send + Sync {
    fn ping(&self) -> bool {
        true
    }

    fn get_company(&self, id: i32) -> StoreResult<Option<Company>>;
    fn list_companies(&self) -> StoreResult<Vec<Company>>;
    fn create_company(&self, name: &str) -> StoreResult<Company>;
    fn rename_company(&self, id: i32, name: &str) -> StoreResult<Company>;

    fn get_user(&self, id: i32) -> StoreResult<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    fn list_users(&self, company_id: Option<i32>) -> StoreResult<Vec<User>>;
    fn create_user(&self, user: NewUser) -> StoreResult<User>;
    fn update_user(&self, id: i32, changes: &UserChanges) -> StoreResult<User>;
    fn delete_user(&self, id: i32) -> StoreResult<()>;
    /// Tickets, history rows and comments that point at this user.
    fn count_user_references(&self, id: i32) -> StoreResult<i64>;
    /// Users of `company_id` that tickets, history or comments of other companies point at.
    fn users_referenced_outside(&self, company_id: i32) -> StoreResult<Vec<i32>>;

    fn get_ticket(&self, id: i32) -> StoreResult<Option<Ticket>>;
    fn list_tickets(&self, query: &TicketQuery) -> StoreResult<Vec<Ticket>>;
    fn create_ticket(&self, ticket: NewTicket) -> StoreResult<Ticket>;
    fn ticket_ids_for_company(&self, company_id: i32) -> StoreResult<Vec<i32>>;
    fn ticket_history(&self, ticket_id: i32) -> StoreResult<Vec<TicketHistory>>;
    fn ticket_comments(&self, ticket_id: i32) -> StoreResult<Vec<TicketComment>>;
    fn ticket_stats(&self, query: &TicketQuery) -> StoreResult<TicketStats>;

    /// Applies every op of `batch` or none of them.
    fn commit(&self, batch: WriteBatch) -> StoreResult<CommitReceipt>;
}
