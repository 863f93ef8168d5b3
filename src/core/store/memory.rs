//! In-process store used by tests and `HELPDESK_STORE=memory` runs.
//!
//! Foreign keys are checked the way Postgres would check them so that a batch
//! with the wrong step order fails here too.

use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::{CommitReceipt, HelpdeskStore, StoreError, StoreResult, WriteBatch, WriteOp};
use crate::core::shared::models::{
    Company, NewTicket, NewTicketComment, NewTicketHistory, NewUser, Ticket, TicketComment,
    TicketHistory, TicketQuery, TicketStats, User, UserChanges,
};
use crate::core::shared::TicketStatus;

#[derive(Debug, Clone, Default)]
struct Tables {
    companies: BTreeMap<i32, Company>,
    users: BTreeMap<i32, User>,
    tickets: BTreeMap<i32, Ticket>,
    history: BTreeMap<i32, TicketHistory>,
    comments: BTreeMap<i32, TicketComment>,
    company_seq: i32,
    user_seq: i32,
    ticket_seq: i32,
    history_seq: i32,
    comment_seq: i32,
}

fn next(seq: &mut i32) -> i32 {
    *seq += 1;
    *seq
}

impl Tables {
    fn user_references(&self, user_id: i32) -> i64 {
        let tickets = self
            .tickets
            .values()
            .filter(|t| t.created_by == user_id || t.updated_by == Some(user_id))
            .count();
        let history = self.history.values().filter(|h| h.user_id == user_id).count();
        let comments = self.comments.values().filter(|c| c.user_id == user_id).count();
        (tickets + history + comments) as i64
    }

    fn users_referenced_outside(&self, company_id: i32) -> Vec<i32> {
        let members: BTreeSet<i32> = self
            .users
            .values()
            .filter(|u| u.company_id == company_id)
            .map(|u| u.id)
            .collect();
        let foreign_ticket = |ticket_id: i32| {
            self.tickets
                .get(&ticket_id)
                .is_some_and(|t| t.company_id != company_id)
        };

        let mut referenced = BTreeSet::new();
        for ticket in self.tickets.values().filter(|t| t.company_id != company_id) {
            referenced.insert(ticket.created_by);
            referenced.extend(ticket.updated_by);
        }
        for row in self.history.values().filter(|h| foreign_ticket(h.ticket_id)) {
            referenced.insert(row.user_id);
        }
        for row in self.comments.values().filter(|c| foreign_ticket(c.ticket_id)) {
            referenced.insert(row.user_id);
        }
        referenced.intersection(&members).copied().collect()
    }

    fn insert_history(&mut self, row: NewTicketHistory) -> StoreResult<TicketHistory> {
        if !self.tickets.contains_key(&row.ticket_id) {
            return Err(StoreError::HistoryAppend(format!(
                "ticket {} does not exist",
                row.ticket_id
            )));
        }
        let id = next(&mut self.history_seq);
        let history = TicketHistory {
            id,
            ticket_id: row.ticket_id,
            user_id: row.user_id,
            action_type: row.action_type,
            old_value: row.old_value,
            new_value: row.new_value,
            comment: row.comment,
            created_at: row.created_at,
        };
        self.history.insert(id, history.clone());
        Ok(history)
    }

    fn insert_comment(&mut self, row: NewTicketComment) -> StoreResult<TicketComment> {
        if !self.tickets.contains_key(&row.ticket_id) {
            return Err(StoreError::MissingRow(format!("ticket {}", row.ticket_id)));
        }
        let id = next(&mut self.comment_seq);
        let comment = TicketComment {
            id,
            ticket_id: row.ticket_id,
            user_id: row.user_id,
            comment: row.comment,
            created_at: row.created_at,
        };
        self.comments.insert(id, comment.clone());
        Ok(comment)
    }

    fn apply(&mut self, op: WriteOp, receipt: &mut CommitReceipt) -> StoreResult<()> {
        match op {
            WriteOp::UpdateTicket { ticket_id, changes } => {
                let ticket = self
                    .tickets
                    .get_mut(&ticket_id)
                    .ok_or_else(|| StoreError::MissingRow(format!("ticket {ticket_id}")))?;
                changes.apply_to(ticket);
            }
            WriteOp::AppendHistory(row) => {
                receipt.history.push(self.insert_history(row)?);
            }
            WriteOp::InsertComment(row) => {
                receipt.comments.push(self.insert_comment(row)?);
            }
            WriteOp::DeleteTicketHistory { ticket_id } => {
                self.history.retain(|_, h| h.ticket_id != ticket_id);
            }
            WriteOp::DeleteTicketComments { ticket_id } => {
                self.comments.retain(|_, c| c.ticket_id != ticket_id);
            }
            WriteOp::DeleteTicket { ticket_id } => {
                let referenced = self.history.values().any(|h| h.ticket_id == ticket_id)
                    || self.comments.values().any(|c| c.ticket_id == ticket_id);
                if referenced {
                    return Err(StoreError::Database(format!(
                        "ticket {ticket_id} is still referenced by history or comments"
                    )));
                }
                self.tickets
                    .remove(&ticket_id)
                    .ok_or_else(|| StoreError::MissingRow(format!("ticket {ticket_id}")))?;
            }
            WriteOp::ReassignUsers {
                from_company,
                to_company,
            } => {
                self.require_company(to_company)?;
                for user in self.users.values_mut() {
                    if user.company_id == from_company {
                        user.company_id = to_company;
                    }
                }
            }
            WriteOp::ReassignTickets {
                from_company,
                to_company,
            } => {
                self.require_company(to_company)?;
                for ticket in self.tickets.values_mut() {
                    if ticket.company_id == from_company {
                        ticket.company_id = to_company;
                    }
                }
            }
            WriteOp::DeleteCompanyUsers { company_id } => {
                let doomed: Vec<i32> = self
                    .users
                    .values()
                    .filter(|u| u.company_id == company_id)
                    .map(|u| u.id)
                    .collect();
                for user_id in doomed {
                    if self.user_references(user_id) > 0 {
                        return Err(StoreError::Database(format!(
                            "user {user_id} is still referenced by tickets"
                        )));
                    }
                    self.users.remove(&user_id);
                }
            }
            WriteOp::DeleteCompany { company_id } => {
                let referenced = self.users.values().any(|u| u.company_id == company_id)
                    || self.tickets.values().any(|t| t.company_id == company_id);
                if referenced {
                    return Err(StoreError::Database(format!(
                        "company {company_id} still owns users or tickets"
                    )));
                }
                self.companies
                    .remove(&company_id)
                    .ok_or_else(|| StoreError::MissingRow(format!("company {company_id}")))?;
            }
        }
        Ok(())
    }

    fn require_company(&self, id: i32) -> StoreResult<()> {
        if self.companies.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::Database(format!("company {id} does not exist")))
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_history_appends: AtomicBool,
    fail_rollbacks: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following history append fail, for exercising rollback.
    pub fn fail_history_appends(&self, fail: bool) {
        self.fail_history_appends.store(fail, Ordering::SeqCst);
    }

    /// Makes a failing batch keep its partial writes and report a broken
    /// rollback instead of the step error.
    pub fn fail_rollbacks(&self, fail: bool) {
        self.fail_rollbacks.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Database("memory store lock poisoned".to_string()))
    }
}

impl HelpdeskStore for MemoryStore {
    fn get_company(&self, id: i32) -> StoreResult<Option<Company>> {
        Ok(self.lock()?.companies.get(&id).cloned())
    }

    fn list_companies(&self) -> StoreResult<Vec<Company>> {
        Ok(self.lock()?.companies.values().cloned().collect())
    }

    fn create_company(&self, name: &str) -> StoreResult<Company> {
        let mut tables = self.lock()?;
        let id = next(&mut tables.company_seq);
        let company = Company {
            id,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        tables.companies.insert(id, company.clone());
        Ok(company)
    }

    fn rename_company(&self, id: i32, name: &str) -> StoreResult<Company> {
        let mut tables = self.lock()?;
        let company = tables
            .companies
            .get_mut(&id)
            .ok_or_else(|| StoreError::MissingRow(format!("company {id}")))?;
        company.name = name.to_string();
        Ok(company.clone())
    }

    fn get_user(&self, id: i32) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    fn list_users(&self, company_id: Option<i32>) -> StoreResult<Vec<User>> {
        Ok(self
            .lock()?
            .users
            .values()
            .filter(|u| company_id.map_or(true, |c| u.company_id == c))
            .cloned()
            .collect())
    }

    fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.lock()?;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation(format!(
                "email {} is already registered",
                user.email
            )));
        }
        tables.require_company(user.company_id)?;
        let id = next(&mut tables.user_seq);
        let created = User {
            id,
            email: user.email,
            password_hash: user.password_hash,
            full_name: user.full_name,
            role: user.role,
            company_id: user.company_id,
            is_active: user.is_active,
            created_at: Utc::now(),
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }

    fn update_user(&self, id: i32, changes: &UserChanges) -> StoreResult<User> {
        let mut tables = self.lock()?;
        if let Some(email) = &changes.email {
            if tables.users.values().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::UniqueViolation(format!(
                    "email {email} is already registered"
                )));
            }
        }
        if let Some(company_id) = changes.company_id {
            tables.require_company(company_id)?;
        }
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::MissingRow(format!("user {id}")))?;
        if let Some(email) = &changes.email {
            user.email.clone_from(email);
        }
        if let Some(hash) = &changes.password_hash {
            user.password_hash.clone_from(hash);
        }
        if let Some(full_name) = &changes.full_name {
            user.full_name.clone_from(full_name);
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(company_id) = changes.company_id {
            user.company_id = company_id;
        }
        if let Some(is_active) = changes.is_active {
            user.is_active = is_active;
        }
        Ok(user.clone())
    }

    fn delete_user(&self, id: i32) -> StoreResult<()> {
        let mut tables = self.lock()?;
        if tables.user_references(id) > 0 {
            return Err(StoreError::Database(format!(
                "user {id} is still referenced by tickets"
            )));
        }
        tables
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::MissingRow(format!("user {id}")))
    }

    fn count_user_references(&self, id: i32) -> StoreResult<i64> {
        Ok(self.lock()?.user_references(id))
    }

    fn users_referenced_outside(&self, company_id: i32) -> StoreResult<Vec<i32>> {
        Ok(self.lock()?.users_referenced_outside(company_id))
    }

    fn get_ticket(&self, id: i32) -> StoreResult<Option<Ticket>> {
        Ok(self.lock()?.tickets.get(&id).cloned())
    }

    fn list_tickets(&self, query: &TicketQuery) -> StoreResult<Vec<Ticket>> {
        let tables = self.lock()?;
        let mut tickets: Vec<Ticket> = tables
            .tickets
            .values()
            .filter(|t| query.matches(t))
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        if let Some(limit) = query.limit {
            tickets.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(tickets)
    }

    fn create_ticket(&self, ticket: NewTicket) -> StoreResult<Ticket> {
        let mut tables = self.lock()?;
        tables.require_company(ticket.company_id)?;
        if !tables.users.contains_key(&ticket.created_by) {
            return Err(StoreError::Database(format!(
                "user {} does not exist",
                ticket.created_by
            )));
        }
        let id = next(&mut tables.ticket_seq);
        let now = Utc::now();
        let created = Ticket {
            id,
            title: ticket.title,
            description: ticket.description,
            category: ticket.category,
            urgency: ticket.urgency,
            status: TicketStatus::Open,
            assigned_role: ticket.assigned_role,
            company_id: ticket.company_id,
            created_by: ticket.created_by,
            updated_by: None,
            comment: None,
            created_at: now,
            updated_at: now,
        };
        tables.tickets.insert(id, created.clone());
        Ok(created)
    }

    fn ticket_ids_for_company(&self, company_id: i32) -> StoreResult<Vec<i32>> {
        Ok(self
            .lock()?
            .tickets
            .values()
            .filter(|t| t.company_id == company_id)
            .map(|t| t.id)
            .collect())
    }

    fn ticket_history(&self, ticket_id: i32) -> StoreResult<Vec<TicketHistory>> {
        Ok(self
            .lock()?
            .history
            .values()
            .filter(|h| h.ticket_id == ticket_id)
            .cloned()
            .collect())
    }

    fn ticket_comments(&self, ticket_id: i32) -> StoreResult<Vec<TicketComment>> {
        Ok(self
            .lock()?
            .comments
            .values()
            .filter(|c| c.ticket_id == ticket_id)
            .cloned()
            .collect())
    }

    fn ticket_stats(&self, query: &TicketQuery) -> StoreResult<TicketStats> {
        let tables = self.lock()?;
        let mut stats = TicketStats::zeroed(query.include_hidden);
        for ticket in tables.tickets.values().filter(|t| query.matches(t)) {
            stats.record(
                &ticket.status.to_string(),
                &ticket.category.to_string(),
                &ticket.urgency.to_string(),
            );
        }
        Ok(stats)
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<CommitReceipt> {
        if batch.is_empty() {
            return Ok(CommitReceipt::default());
        }
        let mut tables = self.lock()?;
        let mut staged = tables.clone();
        let mut receipt = CommitReceipt::default();
        let fail_history = self.fail_history_appends.load(Ordering::SeqCst);

        for op in batch.into_ops() {
            let step = if fail_history && matches!(op, WriteOp::AppendHistory(_)) {
                Err(StoreError::HistoryAppend(
                    "history table rejected the row".to_string(),
                ))
            } else {
                staged.apply(op, &mut receipt)
            };
            if let Err(err) = step {
                if self.fail_rollbacks.load(Ordering::SeqCst) {
                    *tables = staged;
                    return Err(StoreError::RollbackFailed(format!(
                        "rollback after '{err}' did not complete"
                    )));
                }
                return Err(err);
            }
        }

        *tables = staged;
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::models::TicketChanges;
    use crate::core::shared::{HistoryAction, Role, TicketCategory, TicketUrgency};

    fn seeded() -> (MemoryStore, Ticket) {
        let store = MemoryStore::new();
        let company = store.create_company("Acme").unwrap();
        let user = store
            .create_user(NewUser {
                email: "u@acme.test".into(),
                password_hash: String::new(),
                full_name: "U".into(),
                role: Role::User,
                company_id: company.id,
                is_active: true,
            })
            .unwrap();
        let ticket = store
            .create_ticket(NewTicket {
                title: "Printer".into(),
                description: "jammed".into(),
                category: TicketCategory::Bug,
                urgency: TicketUrgency::Low,
                assigned_role: None,
                company_id: company.id,
                created_by: user.id,
            })
            .unwrap();
        (store, ticket)
    }

    fn status_update(ticket: &Ticket) -> WriteBatch {
        let mut changes = TicketChanges::stamped(ticket.created_by, Utc::now());
        changes.status = Some(TicketStatus::Closed);
        let mut batch = WriteBatch::new();
        batch
            .push(WriteOp::UpdateTicket {
                ticket_id: ticket.id,
                changes,
            })
            .push(WriteOp::AppendHistory(NewTicketHistory {
                ticket_id: ticket.id,
                user_id: ticket.created_by,
                action_type: HistoryAction::StatusChange,
                old_value: Some("open".into()),
                new_value: Some("closed".into()),
                comment: Some("done".into()),
                created_at: Utc::now(),
            }));
        batch
    }

    #[test]
    fn test_commit_applies_all_ops() {
        let (store, ticket) = seeded();
        let receipt = store.commit(status_update(&ticket)).unwrap();
        assert_eq!(receipt.history.len(), 1);
        let stored = store.get_ticket(ticket.id).unwrap().unwrap();
        assert_eq!(stored.status, TicketStatus::Closed);
    }

    #[test]
    fn test_failed_history_append_rolls_back_update() {
        let (store, ticket) = seeded();
        store.fail_history_appends(true);
        let err = store.commit(status_update(&ticket)).unwrap_err();
        assert!(matches!(err, StoreError::HistoryAppend(_)));
        let stored = store.get_ticket(ticket.id).unwrap().unwrap();
        assert_eq!(stored.status, TicketStatus::Open);
        assert!(store.ticket_history(ticket.id).unwrap().is_empty());
    }

    #[test]
    fn test_broken_rollback_keeps_partial_writes() {
        let (store, ticket) = seeded();
        store.fail_history_appends(true);
        store.fail_rollbacks(true);
        let err = store.commit(status_update(&ticket)).unwrap_err();
        assert!(matches!(err, StoreError::RollbackFailed(_)), "{err}");
        // The partial update stays behind.
        let stored = store.get_ticket(ticket.id).unwrap().unwrap();
        assert_eq!(stored.status, TicketStatus::Closed);
    }

    #[test]
    fn test_empty_batch_commits_nothing() {
        let (store, ticket) = seeded();
        let receipt = store.commit(WriteBatch::new()).unwrap();
        assert!(receipt.history.is_empty());
        assert!(store.ticket_history(ticket.id).unwrap().is_empty());
    }

    #[test]
    fn test_ticket_delete_requires_history_removed_first() {
        let (store, ticket) = seeded();
        store.commit(status_update(&ticket)).unwrap();

        let mut wrong_order = WriteBatch::new();
        wrong_order.push(WriteOp::DeleteTicket {
            ticket_id: ticket.id,
        });
        assert!(store.commit(wrong_order).is_err());
        assert!(store.get_ticket(ticket.id).unwrap().is_some());

        let mut right_order = WriteBatch::new();
        right_order
            .push(WriteOp::DeleteTicketHistory {
                ticket_id: ticket.id,
            })
            .push(WriteOp::DeleteTicketComments {
                ticket_id: ticket.id,
            })
            .push(WriteOp::DeleteTicket {
                ticket_id: ticket.id,
            });
        store.commit(right_order).unwrap();
        assert!(store.get_ticket(ticket.id).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_is_unique_violation() {
        let (store, ticket) = seeded();
        let err = store
            .create_user(NewUser {
                email: "u@acme.test".into(),
                password_hash: String::new(),
                full_name: "Other".into(),
                role: Role::User,
                company_id: ticket.company_id,
                is_active: true,
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }
}
