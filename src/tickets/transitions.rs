//! Ticket status state machine.
//!
//! The table below is the single source of truth for which role may move a
//! ticket between two statuses. `owner` passes every rule; `tech_admin` can
//! never hide a ticket and a plain `user` can never claim one.

use serde::Serialize;

use crate::core::shared::models::Ticket;
use crate::core::shared::{Role, TicketStatus};
use crate::security::Actor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionRule {
    /// Owner, or admin/tech_admin of the ticket's company.
    Staff,
    /// Staff, or the `user` who filed the ticket.
    StaffOrCreator,
    /// Owner, or admin of the ticket's company.
    Moderator,
    OwnerOnly,
}

use TransitionRule::{Moderator, OwnerOnly, Staff, StaffOrCreator};

/// Rows are the current status, columns the target, both in `TicketStatus::ALL` order.
const TRANSITIONS: [[Option<TransitionRule>; 4]; 4] = [
    // open
    [None, Some(Staff), Some(StaffOrCreator), Some(Moderator)],
    // in_progress
    [Some(Staff), None, Some(StaffOrCreator), Some(Moderator)],
    // closed
    [Some(Staff), Some(Staff), None, Some(Moderator)],
    // hidden
    [Some(OwnerOnly), Some(OwnerOnly), Some(OwnerOnly), None],
];

fn index(status: TicketStatus) -> usize {
    match status {
        TicketStatus::Open => 0,
        TicketStatus::InProgress => 1,
        TicketStatus::Closed => 2,
        TicketStatus::Hidden => 3,
    }
}

/// Rule guarding `from -> to`, or `None` when the two are the same status.
pub fn transition_rule(from: TicketStatus, to: TicketStatus) -> Option<TransitionRule> {
    TRANSITIONS[index(from)][index(to)]
}

/// Checks whether `actor` may move `ticket` to `to`. The error is the denial reason.
pub fn check_transition(actor: &Actor, ticket: &Ticket, to: TicketStatus) -> Result<(), String> {
    let Some(rule) = transition_rule(ticket.status, to) else {
        return Err(format!("Ticket is already {to}"));
    };

    if to == TicketStatus::Hidden && actor.role == Role::TechAdmin {
        return Err("Tech admins cannot hide tickets".to_string());
    }
    if to == TicketStatus::InProgress && actor.role == Role::User {
        return Err("Users cannot move tickets to in_progress".to_string());
    }
    if actor.is_owner() {
        return Ok(());
    }
    if rule == OwnerOnly {
        return Err(format!(
            "Only the owner can move a {} ticket to {to}",
            ticket.status
        ));
    }
    if actor.company_id != ticket.company_id {
        return Err("Ticket belongs to another company".to_string());
    }

    let permitted = match rule {
        Staff => actor.role.is_staff(),
        StaffOrCreator => actor.role.is_staff() || ticket.created_by == actor.id,
        Moderator => actor.role == Role::Admin,
        OwnerOnly => false,
    };

    if permitted {
        Ok(())
    } else {
        Err(match rule {
            StaffOrCreator => "Users can only close tickets they created".to_string(),
            Moderator => "Only owners and admins can hide tickets".to_string(),
            _ => format!(
                "Role {} cannot move a ticket from {} to {to}",
                actor.role, ticket.status
            ),
        })
    }
}
