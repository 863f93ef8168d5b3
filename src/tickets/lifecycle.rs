//! Ticket lifecycle engine.
//!
//! Each accepted mutation becomes one [`WriteBatch`] holding the primary
//! change and the history rows describing it, so the store applies both or
//! neither.

use chrono::{DateTime, Utc};
use log::{info, warn};
use std::sync::Arc;

use super::types::{DeleteMode, StatusChange, TicketEdit, TicketFilters, TicketInput};
use crate::core::error::{HelpdeskError, HelpdeskResult};
use crate::core::shared::models::{
    NewTicket, NewTicketComment, NewTicketHistory, Ticket, TicketChanges, TicketComment,
    TicketHistory, TicketStats,
};
use crate::core::shared::{HistoryAction, TicketStatus};
use crate::core::store::{CommitReceipt, HelpdeskStore, WriteBatch, WriteOp};
use crate::security::{ensure, ticket_scope, Action, Actor, ProposedChanges, Resource};

#[derive(Clone)]
pub struct TicketEngine {
    store: Arc<dyn HelpdeskStore>,
}

fn history_row(
    ticket_id: i32,
    actor: &Actor,
    action_type: HistoryAction,
    old_value: Option<String>,
    new_value: Option<String>,
    comment: Option<String>,
    at: DateTime<Utc>,
) -> NewTicketHistory {
    NewTicketHistory {
        ticket_id,
        user_id: actor.id,
        action_type,
        old_value,
        new_value,
        comment,
        created_at: at,
    }
}

fn not_found(ticket_id: i32) -> HelpdeskError {
    HelpdeskError::NotFound(format!("Ticket {ticket_id} not found"))
}

impl TicketEngine {
    pub fn new(store: Arc<dyn HelpdeskStore>) -> Self {
        Self { store }
    }

    fn load(&self, ticket_id: i32) -> HelpdeskResult<Ticket> {
        self.store
            .get_ticket(ticket_id)?
            .ok_or_else(|| not_found(ticket_id))
    }

    /// Loads a ticket, reporting hidden tickets as missing to everyone but the owner.
    fn load_visible(&self, actor: &Actor, ticket_id: i32) -> HelpdeskResult<Ticket> {
        let ticket = self.load(ticket_id)?;
        if ticket.is_hidden() && !actor.is_owner() {
            return Err(not_found(ticket_id));
        }
        Ok(ticket)
    }

    fn commit(&self, batch: WriteBatch, ticket_id: i32) -> HelpdeskResult<CommitReceipt> {
        let ops = batch.op_names().join(", ");
        self.store.commit(batch).map_err(|e| {
            warn!("Batch [{ops}] for ticket {ticket_id} failed: {e}");
            HelpdeskError::from(e)
        })
    }

    pub fn create_ticket(&self, actor: &Actor, input: TicketInput) -> HelpdeskResult<Ticket> {
        let company_id = input.company_id.unwrap_or(actor.company_id);
        ensure(
            actor,
            Action::TicketCreate,
            Resource::None,
            ProposedChanges::NewTicket { company_id },
        )?;

        if self.store.get_company(company_id)?.is_none() {
            return Err(HelpdeskError::NotFound(format!(
                "Company {company_id} not found"
            )));
        }

        let ticket = self.store.create_ticket(NewTicket {
            title: input.title,
            description: input.description,
            category: input.category,
            urgency: input.urgency,
            assigned_role: input.assigned_role,
            company_id,
            created_by: actor.id,
        })?;

        info!(
            "Ticket {} created by user {} in company {}",
            ticket.id, actor.id, company_id
        );
        Ok(ticket)
    }

    pub fn get_ticket(&self, actor: &Actor, ticket_id: i32) -> HelpdeskResult<Ticket> {
        let ticket = self.load_visible(actor, ticket_id)?;
        ensure(actor, Action::TicketRead, Resource::Ticket(&ticket), ProposedChanges::None)?;
        Ok(ticket)
    }

    /// Applies field edits. Unchanged fields are skipped; if nothing changes
    /// nothing is written and the current ticket is returned.
    pub fn update_ticket(
        &self,
        actor: &Actor,
        ticket_id: i32,
        edit: TicketEdit,
    ) -> HelpdeskResult<Ticket> {
        let mut ticket = self.load_visible(actor, ticket_id)?;
        ensure(actor, Action::TicketUpdate, Resource::Ticket(&ticket), ProposedChanges::None)?;

        let now = Utc::now();
        let mut changes = TicketChanges::stamped(actor.id, now);
        let mut history = Vec::new();
        let mut record = |action, old: String, new: String| {
            history.push(history_row(ticket_id, actor, action, Some(old), Some(new), None, now));
        };

        if let Some(title) = edit.title.filter(|t| *t != ticket.title) {
            record(HistoryAction::TitleChange, ticket.title.clone(), title.clone());
            changes.title = Some(title);
        }
        if let Some(category) = edit.category.filter(|c| *c != ticket.category) {
            record(
                HistoryAction::CategoryChange,
                ticket.category.to_string(),
                category.to_string(),
            );
            changes.category = Some(category);
        }
        if let Some(urgency) = edit.urgency.filter(|u| *u != ticket.urgency) {
            record(
                HistoryAction::UrgencyChange,
                ticket.urgency.to_string(),
                urgency.to_string(),
            );
            changes.urgency = Some(urgency);
        }
        if let Some(assigned_role) = edit.assigned_role.filter(|r| *r != ticket.assigned_role) {
            history.push(history_row(
                ticket_id,
                actor,
                HistoryAction::RoleChange,
                ticket.assigned_role.map(|r| r.to_string()),
                assigned_role.map(|r| r.to_string()),
                None,
                now,
            ));
            changes.assigned_role = Some(assigned_role);
        }
        let mut description_changed = false;
        if let Some(description) = edit.description.filter(|d| *d != ticket.description) {
            changes.description = Some(description);
            description_changed = true;
        }

        if history.is_empty() && !description_changed {
            return Ok(ticket);
        }

        let mut batch = WriteBatch::new();
        batch.push(WriteOp::UpdateTicket {
            ticket_id,
            changes: changes.clone(),
        });
        let history_count = history.len();
        for row in history {
            batch.push(WriteOp::AppendHistory(row));
        }
        self.commit(batch, ticket_id)?;

        changes.apply_to(&mut ticket);
        info!(
            "Ticket {} updated by user {} ({} history rows)",
            ticket_id, actor.id, history_count
        );
        Ok(ticket)
    }

    /// Moves a ticket to `new_status`. Input is validated before the ticket is loaded.
    pub fn transition_status(
        &self,
        actor: &Actor,
        ticket_id: i32,
        new_status: &str,
        comment: &str,
    ) -> HelpdeskResult<Ticket> {
        let change = StatusChange::parse(new_status, comment)?;
        let ticket = self.load(ticket_id)?;
        self.apply_transition(actor, ticket, change)
    }

    fn apply_transition(
        &self,
        actor: &Actor,
        mut ticket: Ticket,
        change: StatusChange,
    ) -> HelpdeskResult<Ticket> {
        let StatusChange { status, comment } = change;
        if ticket.status == status {
            return Err(HelpdeskError::Validation(format!(
                "Ticket is already {status}"
            )));
        }
        ensure(
            actor,
            Action::TicketChangeStatus,
            Resource::Ticket(&ticket),
            ProposedChanges::Status(status),
        )?;

        let now = Utc::now();
        let old_status = ticket.status;
        let mut changes = TicketChanges::stamped(actor.id, now);
        changes.status = Some(status);
        changes.comment = Some(comment.clone());

        let mut batch = WriteBatch::new();
        batch
            .push(WriteOp::UpdateTicket {
                ticket_id: ticket.id,
                changes: changes.clone(),
            })
            .push(WriteOp::AppendHistory(history_row(
                ticket.id,
                actor,
                HistoryAction::StatusChange,
                Some(old_status.to_string()),
                Some(status.to_string()),
                Some(comment),
                now,
            )));
        self.commit(batch, ticket.id)?;

        changes.apply_to(&mut ticket);
        info!(
            "Ticket {} moved {} -> {} by user {}",
            ticket.id, old_status, status, actor.id
        );
        Ok(ticket)
    }

    pub fn add_comment(
        &self,
        actor: &Actor,
        ticket_id: i32,
        text: &str,
    ) -> HelpdeskResult<TicketComment> {
        let text = super::types::comment_text(text)?;
        let ticket = self.load_visible(actor, ticket_id)?;
        ensure(actor, Action::TicketComment, Resource::Ticket(&ticket), ProposedChanges::None)?;

        let now = Utc::now();
        let mut batch = WriteBatch::new();
        batch
            .push(WriteOp::InsertComment(NewTicketComment {
                ticket_id,
                user_id: actor.id,
                comment: text.clone(),
                created_at: now,
            }))
            .push(WriteOp::AppendHistory(history_row(
                ticket_id,
                actor,
                HistoryAction::CommentAdded,
                None,
                Some(text),
                None,
                now,
            )));

        let receipt = self.commit(batch, ticket_id)?;
        let comment = receipt.comments.into_iter().next().ok_or_else(|| {
            HelpdeskError::Internal("Comment insert returned no row".to_string())
        })?;
        info!("Comment {} added to ticket {} by user {}", comment.id, ticket_id, actor.id);
        Ok(comment)
    }

    pub fn delete_ticket(
        &self,
        actor: &Actor,
        ticket_id: i32,
        mode: DeleteMode,
    ) -> HelpdeskResult<()> {
        let ticket = self.load_visible(actor, ticket_id)?;
        match mode {
            DeleteMode::Hard => {
                ensure(
                    actor,
                    Action::TicketHardDelete,
                    Resource::Ticket(&ticket),
                    ProposedChanges::None,
                )?;
                let mut batch = WriteBatch::new();
                batch
                    .push(WriteOp::DeleteTicketHistory { ticket_id })
                    .push(WriteOp::DeleteTicketComments { ticket_id })
                    .push(WriteOp::DeleteTicket { ticket_id });
                self.commit(batch, ticket_id)?;
                info!("Ticket {} permanently deleted by user {}", ticket_id, actor.id);
            }
            DeleteMode::Soft { comment } => {
                ensure(
                    actor,
                    Action::TicketSoftDelete,
                    Resource::Ticket(&ticket),
                    ProposedChanges::None,
                )?;
                self.apply_transition(
                    actor,
                    ticket,
                    StatusChange {
                        status: TicketStatus::Hidden,
                        comment,
                    },
                )?;
            }
        }
        Ok(())
    }

    pub fn list_tickets(&self, actor: &Actor, filters: TicketFilters) -> HelpdeskResult<Vec<Ticket>> {
        ensure(actor, Action::TicketList, Resource::None, ProposedChanges::None)?;
        let mut query = ticket_scope(actor);
        query.status = filters.status;
        query.category = filters.category;
        query.urgency = filters.urgency;
        query.assigned_role = filters.assigned_role;
        query.limit = filters.limit;
        Ok(self.store.list_tickets(&query)?)
    }

    /// Latest `limit` tickets the actor can see, newest first.
    pub fn recent_tickets(&self, actor: &Actor, limit: usize) -> HelpdeskResult<Vec<Ticket>> {
        ensure(actor, Action::TicketList, Resource::None, ProposedChanges::None)?;
        let mut query = ticket_scope(actor);
        query.limit = Some(i64::try_from(limit).unwrap_or(i64::MAX));
        Ok(self.store.list_tickets(&query)?)
    }

    pub fn get_history(&self, actor: &Actor, ticket_id: i32) -> HelpdeskResult<Vec<TicketHistory>> {
        let ticket = self.load_visible(actor, ticket_id)?;
        ensure(
            actor,
            Action::TicketReadHistory,
            Resource::Ticket(&ticket),
            ProposedChanges::None,
        )?;
        Ok(self.store.ticket_history(ticket_id)?)
    }

    pub fn get_comments(&self, actor: &Actor, ticket_id: i32) -> HelpdeskResult<Vec<TicketComment>> {
        let ticket = self.load_visible(actor, ticket_id)?;
        ensure(
            actor,
            Action::TicketReadComments,
            Resource::Ticket(&ticket),
            ProposedChanges::None,
        )?;
        Ok(self.store.ticket_comments(ticket_id)?)
    }

    pub fn ticket_stats(&self, actor: &Actor) -> HelpdeskResult<TicketStats> {
        ensure(actor, Action::TicketStats, Resource::None, ProposedChanges::None)?;
        Ok(self.store.ticket_stats(&ticket_scope(actor))?)
    }
}
