use chrono::Utc;
use std::sync::Arc;

use crate::core::shared::models::{Company, NewTicket, NewUser, Ticket, User};
use crate::core::shared::{Role, TicketCategory, TicketStatus, TicketUrgency};
use crate::core::store::{HelpdeskStore, MemoryStore};
use crate::security::Actor;

pub fn actor(id: i32, role: Role, company_id: i32) -> Actor {
    Actor::new(id, role, company_id)
}

pub fn company(id: i32) -> Company {
    Company {
        id,
        name: format!("Company {id}"),
        created_at: Utc::now(),
    }
}

pub fn user_in(id: i32, role: Role, company_id: i32) -> User {
    User {
        id,
        email: format!("user{id}@test.local"),
        password_hash: String::new(),
        full_name: format!("User {id}"),
        role,
        company_id,
        is_active: true,
        created_at: Utc::now(),
    }
}

pub fn ticket_in(company_id: i32, created_by: i32, status: TicketStatus) -> Ticket {
    let now = Utc::now();
    Ticket {
        id: 100,
        title: "VPN drops every hour".to_string(),
        description: "Since Monday".to_string(),
        category: TicketCategory::Bug,
        urgency: TicketUrgency::Medium,
        status,
        assigned_role: None,
        company_id,
        created_by,
        updated_by: None,
        comment: None,
        created_at: now,
        updated_at: now,
    }
}

pub struct Seed {
    pub store: Arc<MemoryStore>,
    pub root: Company,
    pub acme: Company,
    pub globex: Company,
    pub owner: User,
    pub acme_admin: User,
    pub acme_tech: User,
    pub acme_user: User,
    pub acme_other_user: User,
    pub globex_admin: User,
}

impl Seed {
    pub fn actor(&self, user: &User) -> Actor {
        Actor::from(user)
    }

    pub fn ticket_by(&self, creator: &User) -> Ticket {
        self.store
            .create_ticket(NewTicket {
                title: format!("Issue from {}", creator.full_name),
                description: "Something is broken".to_string(),
                category: TicketCategory::Bug,
                urgency: TicketUrgency::High,
                assigned_role: None,
                company_id: creator.company_id,
                created_by: creator.id,
            })
            .unwrap()
    }
}

fn add_user(store: &MemoryStore, email: &str, role: Role, company_id: i32) -> User {
    store
        .create_user(NewUser {
            email: email.to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            full_name: email.split('@').next().unwrap_or(email).to_string(),
            role,
            company_id,
            is_active: true,
        })
        .unwrap()
}

/// Root company with the owner, plus two tenants with their staff.
pub fn seed() -> Seed {
    let store = Arc::new(MemoryStore::new());
    let root = store.create_company("Helpdesk HQ").unwrap();
    let acme = store.create_company("Acme").unwrap();
    let globex = store.create_company("Globex").unwrap();

    let owner = add_user(&store, "owner@hq.test", Role::Owner, root.id);
    let acme_admin = add_user(&store, "admin@acme.test", Role::Admin, acme.id);
    let acme_tech = add_user(&store, "tech@acme.test", Role::TechAdmin, acme.id);
    let acme_user = add_user(&store, "user@acme.test", Role::User, acme.id);
    let acme_other_user = add_user(&store, "other@acme.test", Role::User, acme.id);
    let globex_admin = add_user(&store, "admin@globex.test", Role::Admin, globex.id);

    Seed {
        store,
        root,
        acme,
        globex,
        owner,
        acme_admin,
        acme_tech,
        acme_user,
        acme_other_user,
        globex_admin,
    }
}
