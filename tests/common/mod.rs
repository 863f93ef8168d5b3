#![allow(dead_code)]

use std::sync::Arc;

use helpdesk::core::config::AppConfig;
use helpdesk::core::shared::models::NewUser;
use helpdesk::core::shared::{
    Company, HistoryAction, Role, TicketCategory, TicketStatus, TicketUrgency, User,
};
use helpdesk::core::store::{HelpdeskStore, MemoryStore};
use helpdesk::security::Actor;
use helpdesk::tickets::TicketInput;
use helpdesk::AppState;

pub struct World {
    pub store: Arc<MemoryStore>,
    pub state: Arc<AppState>,
    pub hq: Company,
    pub branch: Company,
    pub owner: User,
    pub hq_admin: User,
    pub branch_admin: User,
    pub branch_tech: User,
    pub branch_user: User,
}

impl World {
    pub fn actor(&self, user: &User) -> Actor {
        Actor::from(user)
    }

    pub fn open_ticket(&self, creator: &User, title: &str) -> i32 {
        let input = TicketInput {
            title: title.to_string(),
            description: "Reported from the front desk".to_string(),
            category: TicketCategory::Bug,
            urgency: TicketUrgency::Medium,
            assigned_role: None,
            company_id: None,
        };
        self.state
            .tickets
            .create_ticket(&self.actor(creator), input)
            .unwrap()
            .id
    }

    pub fn status_changes(&self, ticket_id: i32) -> usize {
        self.store
            .ticket_history(ticket_id)
            .unwrap()
            .iter()
            .filter(|row| row.action_type == HistoryAction::StatusChange)
            .count()
    }

    pub fn history_len(&self, ticket_id: i32) -> usize {
        self.store.ticket_history(ticket_id).unwrap().len()
    }

    pub fn move_to(&self, user: &User, ticket_id: i32, status: TicketStatus) {
        self.state
            .tickets
            .transition_status(
                &self.actor(user),
                ticket_id,
                &status.to_string(),
                &format!("moving to {status}"),
            )
            .unwrap();
    }
}

fn add_user(store: &MemoryStore, email: &str, role: Role, company_id: i32) -> User {
    store
        .create_user(NewUser {
            email: email.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            full_name: email.split('@').next().unwrap_or(email).to_string(),
            role,
            company_id,
            is_active: true,
        })
        .unwrap()
}

pub fn memory_config() -> AppConfig {
    AppConfig::from_lookup(|key| match key {
        "HELPDESK_STORE" => Some("memory".to_string()),
        "SERVER_PORT" => Some("0".to_string()),
        _ => None,
    })
    .unwrap()
}

/// Two companies: `hq` (the root, id 1) holding the owner and an admin, and
/// `branch` with one user of every other role.
pub fn world() -> World {
    let store = Arc::new(MemoryStore::new());
    let hq = store.create_company("Headquarters").unwrap();
    let branch = store.create_company("Branch Office").unwrap();
    assert_eq!(hq.id, 1);

    let owner = add_user(&store, "owner@hq.test", Role::Owner, hq.id);
    let hq_admin = add_user(&store, "admin@hq.test", Role::Admin, hq.id);
    let branch_admin = add_user(&store, "admin@branch.test", Role::Admin, branch.id);
    let branch_tech = add_user(&store, "tech@branch.test", Role::TechAdmin, branch.id);
    let branch_user = add_user(&store, "user@branch.test", Role::User, branch.id);

    let dyn_store: Arc<dyn HelpdeskStore> = store.clone();
    let state = Arc::new(AppState::new(memory_config(), dyn_store));

    World {
        store,
        state,
        hq,
        branch,
        owner,
        hq_admin,
        branch_admin,
        branch_tech,
        branch_user,
    }
}
