//! Policy evaluator.
//!
//! Every authorization question in the helpdesk goes through [`authorize`].
//! The coarse answer comes from [`ROLE_MATRIX`]; a handful of action-specific
//! constraints (role ceilings, hidden tickets, self-service limits) are layered
//! on top. Expected denials are returned as a [`PolicyDecision`], never as an
//! error; only a request whose shape does not fit the action is an error.

use log::debug;
use serde::{Deserialize, Serialize};

use super::Actor;
use crate::core::error::{HelpdeskError, HelpdeskResult};
use crate::core::shared::models::{Company, Ticket, TicketQuery, User};
use crate::core::shared::{Role, TicketStatus};
use crate::tickets::transitions::check_transition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CompanyReadAll,
    CompanyCreate,
    CompanyUpdate,
    CompanyDelete,
    CompanyRead,
    CompanyListUsers,
    UserList,
    UserRead,
    UserCreate,
    UserUpdate,
    UserUpdateProfile,
    UserDelete,
    UserSetActive,
    TicketCreate,
    TicketRead,
    TicketList,
    TicketUpdate,
    TicketComment,
    TicketReadComments,
    TicketReadHistory,
    TicketStats,
    TicketChangeStatus,
    TicketHardDelete,
    TicketSoftDelete,
}

impl Action {
    fn describe(&self) -> &'static str {
        match self {
            Self::CompanyReadAll => "list all companies",
            Self::CompanyCreate => "create companies",
            Self::CompanyUpdate => "update companies",
            Self::CompanyDelete => "delete companies",
            Self::CompanyRead => "view this company",
            Self::CompanyListUsers => "list users of this company",
            Self::UserList => "list users",
            Self::UserRead => "view this user",
            Self::UserCreate => "create users",
            Self::UserUpdate => "update users",
            Self::UserUpdateProfile => "update this profile",
            Self::UserDelete => "delete users",
            Self::UserSetActive => "activate or deactivate users",
            Self::TicketCreate => "create tickets",
            Self::TicketRead => "view this ticket",
            Self::TicketList => "list tickets",
            Self::TicketUpdate => "update this ticket",
            Self::TicketComment => "comment on this ticket",
            Self::TicketReadComments => "read comments of this ticket",
            Self::TicketReadHistory => "read history of this ticket",
            Self::TicketStats => "view ticket statistics",
            Self::TicketChangeStatus => "change the status of this ticket",
            Self::TicketHardDelete => "permanently delete tickets",
            Self::TicketSoftDelete => "delete tickets",
        }
    }

    fn is_ticket_read(&self) -> bool {
        matches!(
            self,
            Self::TicketRead
                | Self::TicketUpdate
                | Self::TicketComment
                | Self::TicketReadComments
                | Self::TicketReadHistory
                | Self::TicketSoftDelete
        )
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = serde_json::to_value(self).map_err(|_| std::fmt::Error)?;
        write!(f, "{}", value.as_str().unwrap_or_default())
    }
}

/// How far a role's permission for an action reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    Deny,
    Any,
    /// Target belongs to the actor's company.
    OwnCompany,
    /// Ticket in the actor's company that the actor filed.
    Creator,
    /// Target user is the actor.
    SelfOnly,
    /// Delegated to the ticket transition table.
    Transition,
}

use Grant::{Any, Creator, Deny, OwnCompany, SelfOnly, Transition};

/// Columns are owner, admin, tech_admin, user.
pub const ROLE_MATRIX: [(Action, [Grant; 4]); 24] = [
    (Action::CompanyReadAll, [Any, Deny, Deny, Deny]),
    (Action::CompanyCreate, [Any, Deny, Deny, Deny]),
    (Action::CompanyUpdate, [Any, Deny, Deny, Deny]),
    (Action::CompanyDelete, [Any, Deny, Deny, Deny]),
    (Action::CompanyRead, [Any, OwnCompany, OwnCompany, OwnCompany]),
    (Action::CompanyListUsers, [Any, OwnCompany, OwnCompany, OwnCompany]),
    (Action::UserList, [Any, OwnCompany, OwnCompany, OwnCompany]),
    (Action::UserRead, [Any, OwnCompany, OwnCompany, OwnCompany]),
    (Action::UserCreate, [Any, OwnCompany, OwnCompany, Deny]),
    (Action::UserUpdate, [Any, OwnCompany, Deny, Deny]),
    (Action::UserUpdateProfile, [SelfOnly, SelfOnly, SelfOnly, SelfOnly]),
    (Action::UserDelete, [Any, OwnCompany, OwnCompany, Deny]),
    (Action::UserSetActive, [Any, OwnCompany, Deny, Deny]),
    (Action::TicketCreate, [Any, OwnCompany, OwnCompany, OwnCompany]),
    (Action::TicketRead, [Any, OwnCompany, OwnCompany, Creator]),
    (Action::TicketList, [Any, OwnCompany, OwnCompany, Creator]),
    (Action::TicketUpdate, [Any, OwnCompany, OwnCompany, Creator]),
    (Action::TicketComment, [Any, OwnCompany, OwnCompany, Creator]),
    (Action::TicketReadComments, [Any, OwnCompany, OwnCompany, Creator]),
    (Action::TicketReadHistory, [Any, OwnCompany, OwnCompany, Creator]),
    (Action::TicketStats, [Any, OwnCompany, OwnCompany, Creator]),
    (Action::TicketChangeStatus, [Transition, Transition, Transition, Transition]),
    (Action::TicketHardDelete, [Any, Deny, Deny, Deny]),
    (Action::TicketSoftDelete, [Any, OwnCompany, Deny, Deny]),
];

pub fn grant_for(action: Action, role: Role) -> Grant {
    let column = match role {
        Role::Owner => 0,
        Role::Admin => 1,
        Role::TechAdmin => 2,
        Role::User => 3,
    };
    ROLE_MATRIX
        .iter()
        .find(|(entry, _)| *entry == action)
        .map_or(Deny, |(_, grants)| grants[column])
}

#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    None,
    Company(&'a Company),
    User(&'a User),
    Ticket(&'a Ticket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserField {
    Email,
    Password,
    FullName,
    Role,
    Company,
    IsActive,
}

#[derive(Debug, Clone, Copy)]
pub enum ProposedChanges<'a> {
    None,
    NewUser {
        role: Role,
        company_id: i32,
    },
    UserUpdate {
        fields: &'a [UserField],
        role: Option<Role>,
    },
    NewTicket {
        company_id: i32,
    },
    Status(TicketStatus),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyDecision {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl PolicyDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }

    /// Turns a denial into `HelpdeskError::Forbidden` carrying the reason verbatim.
    pub fn into_result(self) -> HelpdeskResult<()> {
        if self.allowed {
            Ok(())
        } else {
            Err(HelpdeskError::Forbidden(
                self.reason.unwrap_or_else(|| "Access denied".to_string()),
            ))
        }
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::Owner => "Owner",
        Role::Admin => "Admin",
        Role::TechAdmin => "Tech admin",
        Role::User => "User",
    }
}

fn malformed(action: Action, detail: &str) -> HelpdeskError {
    HelpdeskError::Internal(format!("Malformed policy request for {action}: {detail}"))
}

fn check_shape(
    action: Action,
    resource: &Resource<'_>,
    changes: &ProposedChanges<'_>,
) -> HelpdeskResult<()> {
    use Action as A;
    let fits = match action {
        A::CompanyReadAll | A::CompanyCreate | A::TicketList | A::TicketStats => {
            matches!(resource, Resource::None)
        }
        A::CompanyUpdate | A::CompanyDelete | A::CompanyRead | A::CompanyListUsers => {
            matches!(resource, Resource::Company(_))
        }
        A::UserList => matches!(resource, Resource::None | Resource::Company(_)),
        A::UserRead | A::UserDelete | A::UserSetActive => matches!(resource, Resource::User(_)),
        A::UserUpdate => {
            if !matches!(changes, ProposedChanges::UserUpdate { .. }) {
                return Err(malformed(action, "missing proposed user changes"));
            }
            matches!(resource, Resource::User(_))
        }
        A::UserUpdateProfile => {
            matches!(resource, Resource::User(_))
                && matches!(
                    changes,
                    ProposedChanges::None | ProposedChanges::UserUpdate { .. }
                )
        }
        A::UserCreate => {
            if !matches!(changes, ProposedChanges::NewUser { .. }) {
                return Err(malformed(action, "missing proposed user"));
            }
            matches!(resource, Resource::None)
        }
        A::TicketCreate => {
            if !matches!(changes, ProposedChanges::NewTicket { .. }) {
                return Err(malformed(action, "missing proposed ticket"));
            }
            matches!(resource, Resource::None)
        }
        A::TicketChangeStatus => {
            if !matches!(changes, ProposedChanges::Status(_)) {
                return Err(malformed(action, "missing target status"));
            }
            matches!(resource, Resource::Ticket(_))
        }
        A::TicketRead
        | A::TicketUpdate
        | A::TicketComment
        | A::TicketReadComments
        | A::TicketReadHistory
        | A::TicketHardDelete
        | A::TicketSoftDelete => matches!(resource, Resource::Ticket(_)),
    };

    if fits {
        Ok(())
    } else {
        Err(malformed(action, "resource kind does not match"))
    }
}

fn target_company(resource: &Resource<'_>, changes: &ProposedChanges<'_>) -> Option<i32> {
    match resource {
        Resource::Company(company) => Some(company.id),
        Resource::User(user) => Some(user.company_id),
        Resource::Ticket(ticket) => Some(ticket.company_id),
        Resource::None => match changes {
            ProposedChanges::NewUser { company_id, .. }
            | ProposedChanges::NewTicket { company_id } => Some(*company_id),
            _ => None,
        },
    }
}

fn scope_denial(
    actor: &Actor,
    action: Action,
    resource: &Resource<'_>,
    changes: &ProposedChanges<'_>,
) -> HelpdeskResult<Option<String>> {
    let denial = match grant_for(action, actor.role) {
        Deny => Some(format!(
            "Role {} is not allowed to {}",
            actor.role,
            action.describe()
        )),
        Any => None,
        OwnCompany => target_company(resource, changes)
            .filter(|company_id| !actor.same_company(*company_id))
            .map(|_| format!("You can only {} within your own company", action.describe())),
        Creator => match resource {
            Resource::Ticket(ticket)
                if !actor.same_company(ticket.company_id) || ticket.created_by != actor.id =>
            {
                Some("You can only access tickets you created".to_string())
            }
            _ => None,
        },
        SelfOnly => match resource {
            Resource::User(user) if user.id != actor.id => {
                Some("You can only update your own profile".to_string())
            }
            _ => None,
        },
        Transition => match (resource, changes) {
            (Resource::Ticket(ticket), ProposedChanges::Status(to)) => {
                check_transition(actor, ticket, *to).err()
            }
            _ => return Err(malformed(action, "missing ticket or target status")),
        },
    };
    Ok(denial)
}

fn constraint_denial(
    actor: &Actor,
    action: Action,
    resource: &Resource<'_>,
    changes: &ProposedChanges<'_>,
) -> Option<String> {
    if action.is_ticket_read() {
        if let Resource::Ticket(ticket) = resource {
            if ticket.is_hidden() && !actor.is_owner() {
                return Some("Ticket is hidden".to_string());
            }
        }
    }

    match (action, resource, changes) {
        (Action::UserCreate, _, ProposedChanges::NewUser { role, .. }) => {
            let permitted = match actor.role {
                Role::Owner => true,
                Role::Admin => *role != Role::Owner,
                Role::TechAdmin => *role == Role::User,
                Role::User => false,
            };
            (!permitted).then(|| {
                format!(
                    "{} cannot create users with role {}",
                    role_label(actor.role),
                    role
                )
            })
        }
        (Action::UserUpdate, Resource::User(target), ProposedChanges::UserUpdate { fields, role }) => {
            if target.id == actor.id && fields.contains(&UserField::IsActive) {
                return Some("You cannot change your own active status".to_string());
            }
            if actor.is_owner() {
                return None;
            }
            if target.role == Role::Owner {
                return Some(format!(
                    "{} cannot modify owner accounts",
                    role_label(actor.role)
                ));
            }
            if *role == Some(Role::Owner) {
                return Some(format!(
                    "{} cannot assign role owner",
                    role_label(actor.role)
                ));
            }
            fields
                .iter()
                .find(|field| {
                    !matches!(
                        field,
                        UserField::FullName | UserField::Role | UserField::IsActive
                    )
                })
                .map(|field| {
                    format!(
                        "{} can only change name, role and active status (not {:?})",
                        role_label(actor.role),
                        field
                    )
                })
        }
        (Action::UserUpdateProfile, _, ProposedChanges::UserUpdate { fields, .. }) => fields
            .iter()
            .find(|field| {
                !matches!(
                    field,
                    UserField::FullName | UserField::Email | UserField::Password
                )
            })
            .map(|_| "Profile updates may only change name, email and password".to_string()),
        (Action::UserDelete, Resource::User(target), _) => {
            let permitted = match actor.role {
                Role::Owner => true,
                Role::Admin => target.role != Role::Owner,
                Role::TechAdmin => target.role == Role::User,
                Role::User => false,
            };
            (!permitted).then(|| {
                format!(
                    "{} cannot delete users with role {}",
                    role_label(actor.role),
                    target.role
                )
            })
        }
        (Action::UserSetActive, Resource::User(target), _) => {
            if target.id == actor.id {
                Some("You cannot change your own active status".to_string())
            } else if !actor.is_owner() && target.role == Role::Owner {
                Some(format!(
                    "{} cannot change the active status of owner accounts",
                    role_label(actor.role)
                ))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Decides whether `actor` may perform `action` on `resource`.
pub fn authorize(
    actor: &Actor,
    action: Action,
    resource: Resource<'_>,
    changes: ProposedChanges<'_>,
) -> HelpdeskResult<PolicyDecision> {
    check_shape(action, &resource, &changes)?;

    let denial = match scope_denial(actor, action, &resource, &changes)? {
        Some(reason) => Some(reason),
        None => constraint_denial(actor, action, &resource, &changes),
    };

    Ok(match denial {
        Some(reason) => {
            debug!(
                "Policy denied {} for user {} ({}): {}",
                action, actor.id, actor.role, reason
            );
            PolicyDecision::deny(reason)
        }
        None => PolicyDecision::allow(),
    })
}

/// Shorthand for `authorize(..)?.into_result()`.
pub fn ensure(
    actor: &Actor,
    action: Action,
    resource: Resource<'_>,
    changes: ProposedChanges<'_>,
) -> HelpdeskResult<()> {
    authorize(actor, action, resource, changes)?.into_result()
}

/// The ticket list scoping as a query: company and creator filters plus hidden exclusion.
pub fn ticket_scope(actor: &Actor) -> TicketQuery {
    let mut query = TicketQuery {
        include_hidden: actor.is_owner(),
        ..TicketQuery::default()
    };
    match grant_for(Action::TicketList, actor.role) {
        Any => {}
        Creator => {
            query.company_id = Some(actor.company_id);
            query.created_by = Some(actor.id);
        }
        _ => query.company_id = Some(actor.company_id),
    }
    query
}

/// Company filter for user listings, `None` meaning every company.
pub fn user_scope(actor: &Actor) -> Option<i32> {
    match grant_for(Action::UserList, actor.role) {
        Any => None,
        _ => Some(actor.company_id),
    }
}
