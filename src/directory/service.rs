//! Companies and their users.

use log::{info, warn};
use std::sync::Arc;

use super::types::{UserInput, UserUpdate};
use crate::core::error::{HelpdeskError, HelpdeskResult};
use crate::core::shared::models::{Company, NewUser, User, UserChanges, ROOT_COMPANY_ID};
use crate::core::store::{HelpdeskStore, WriteBatch, WriteOp};
use crate::security::{
    ensure, hash_password, user_scope, Action, Actor, ProposedChanges, Resource,
};

#[derive(Clone)]
pub struct DirectoryService {
    store: Arc<dyn HelpdeskStore>,
}

fn hash(password: &str) -> HelpdeskResult<String> {
    hash_password(password).map_err(|e| HelpdeskError::Internal(e.to_string()))
}

impl DirectoryService {
    pub fn new(store: Arc<dyn HelpdeskStore>) -> Self {
        Self { store }
    }

    fn load_company(&self, company_id: i32) -> HelpdeskResult<Company> {
        self.store
            .get_company(company_id)?
            .ok_or_else(|| HelpdeskError::NotFound(format!("Company {company_id} not found")))
    }

    fn load_user(&self, user_id: i32) -> HelpdeskResult<User> {
        self.store
            .get_user(user_id)?
            .ok_or_else(|| HelpdeskError::NotFound(format!("User {user_id} not found")))
    }

    fn ensure_email_free(&self, email: &str, except: Option<i32>) -> HelpdeskResult<()> {
        match self.store.get_user_by_email(email)? {
            Some(existing) if Some(existing.id) != except => Err(HelpdeskError::Conflict(
                format!("Email {email} is already registered"),
            )),
            _ => Ok(()),
        }
    }

    // ========================================================================
    // COMPANIES
    // ========================================================================

    pub fn list_companies(&self, actor: &Actor) -> HelpdeskResult<Vec<Company>> {
        ensure(actor, Action::CompanyReadAll, Resource::None, ProposedChanges::None)?;
        let mut companies = self.store.list_companies()?;
        companies.sort_by_key(|c| c.id);
        Ok(companies)
    }

    pub fn get_company(&self, actor: &Actor, company_id: i32) -> HelpdeskResult<Company> {
        let company = self.load_company(company_id)?;
        ensure(actor, Action::CompanyRead, Resource::Company(&company), ProposedChanges::None)?;
        Ok(company)
    }

    pub fn create_company(&self, actor: &Actor, name: String) -> HelpdeskResult<Company> {
        ensure(actor, Action::CompanyCreate, Resource::None, ProposedChanges::None)?;
        let company = self.store.create_company(&name)?;
        info!("Company {} ({}) created by user {}", company.id, company.name, actor.id);
        Ok(company)
    }

    pub fn update_company(
        &self,
        actor: &Actor,
        company_id: i32,
        name: String,
    ) -> HelpdeskResult<Company> {
        let company = self.load_company(company_id)?;
        ensure(actor, Action::CompanyUpdate, Resource::Company(&company), ProposedChanges::None)?;
        if company.name == name {
            return Ok(company);
        }
        let renamed = self.store.rename_company(company_id, &name)?;
        info!("Company {} renamed to {} by user {}", company_id, name, actor.id);
        Ok(renamed)
    }

    /// Deletes a company.
    ///
    /// The root company is only removed when another company can take over its
    /// users and tickets; the lowest remaining id inherits them. Any other
    /// company is removed together with its tickets (history, comments, ticket,
    /// in that order) and its users.
    pub fn delete_company(&self, actor: &Actor, company_id: i32) -> HelpdeskResult<()> {
        let company = self.load_company(company_id)?;
        ensure(actor, Action::CompanyDelete, Resource::Company(&company), ProposedChanges::None)?;

        let mut batch = WriteBatch::new();
        if company.is_root() {
            let successor = self
                .store
                .list_companies()?
                .into_iter()
                .map(|c| c.id)
                .filter(|id| *id != ROOT_COMPANY_ID)
                .min()
                .ok_or_else(|| {
                    warn!("Refused to delete root company {company_id}: no other company exists");
                    HelpdeskError::Conflict(
                        "Cannot delete the root company while it is the only company".to_string(),
                    )
                })?;

            batch
                .push(WriteOp::ReassignUsers {
                    from_company: company_id,
                    to_company: successor,
                })
                .push(WriteOp::ReassignTickets {
                    from_company: company_id,
                    to_company: successor,
                });
            info!(
                "Root company {} hands its users and tickets to company {}",
                company_id, successor
            );
        } else {
            if actor.same_company(company_id) {
                return Err(HelpdeskError::Conflict(
                    "You cannot delete your own company".to_string(),
                ));
            }
            let blocking = self.store.users_referenced_outside(company_id)?;
            if !blocking.is_empty() {
                let ids: Vec<String> = blocking.iter().map(i32::to_string).collect();
                warn!(
                    "Refused to delete company {company_id}: users {} have activity in other companies",
                    ids.join(", ")
                );
                return Err(HelpdeskError::Conflict(format!(
                    "Company {company_id} cannot be deleted: users {} are referenced by tickets of other companies; move or deactivate them first",
                    ids.join(", ")
                )));
            }
            for ticket_id in self.store.ticket_ids_for_company(company_id)? {
                batch
                    .push(WriteOp::DeleteTicketHistory { ticket_id })
                    .push(WriteOp::DeleteTicketComments { ticket_id })
                    .push(WriteOp::DeleteTicket { ticket_id });
            }
            batch.push(WriteOp::DeleteCompanyUsers { company_id });
        }
        batch.push(WriteOp::DeleteCompany { company_id });

        let steps = batch.len();
        self.store.commit(batch)?;
        info!(
            "Company {} deleted by user {} in {} steps",
            company_id, actor.id, steps
        );
        Ok(())
    }

    pub fn list_company_users(&self, actor: &Actor, company_id: i32) -> HelpdeskResult<Vec<User>> {
        let company = self.load_company(company_id)?;
        ensure(
            actor,
            Action::CompanyListUsers,
            Resource::Company(&company),
            ProposedChanges::None,
        )?;
        Ok(self.store.list_users(Some(company_id))?)
    }

    // ========================================================================
    // USERS
    // ========================================================================

    pub fn list_users(&self, actor: &Actor, company_id: Option<i32>) -> HelpdeskResult<Vec<User>> {
        let scope = match company_id {
            Some(company_id) => {
                let company = self.load_company(company_id)?;
                ensure(actor, Action::UserList, Resource::Company(&company), ProposedChanges::None)?;
                Some(company_id)
            }
            None => {
                ensure(actor, Action::UserList, Resource::None, ProposedChanges::None)?;
                user_scope(actor)
            }
        };
        let mut users = self.store.list_users(scope)?;
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    pub fn get_user(&self, actor: &Actor, user_id: i32) -> HelpdeskResult<User> {
        let user = self.load_user(user_id)?;
        ensure(actor, Action::UserRead, Resource::User(&user), ProposedChanges::None)?;
        Ok(user)
    }

    pub fn create_user(&self, actor: &Actor, input: UserInput) -> HelpdeskResult<User> {
        let company_id = input.company_id.unwrap_or(actor.company_id);
        ensure(
            actor,
            Action::UserCreate,
            Resource::None,
            ProposedChanges::NewUser {
                role: input.role,
                company_id,
            },
        )?;
        self.load_company(company_id)?;
        self.ensure_email_free(&input.email, None)?;

        let user = self.store.create_user(NewUser {
            email: input.email,
            password_hash: hash(&input.password)?,
            full_name: input.full_name,
            role: input.role,
            company_id,
            is_active: true,
        })?;
        info!(
            "User {} ({}) created in company {} by user {}",
            user.id, user.role, company_id, actor.id
        );
        Ok(user)
    }

    fn apply_update(&self, target: User, update: UserUpdate) -> HelpdeskResult<User> {
        if update.is_empty() {
            return Ok(target);
        }
        if let Some(email) = &update.email {
            self.ensure_email_free(email, Some(target.id))?;
        }
        if let Some(company_id) = update.company_id {
            self.load_company(company_id)?;
        }
        let changes = UserChanges {
            password_hash: update.password.as_deref().map(hash).transpose()?,
            email: update.email,
            full_name: update.full_name,
            role: update.role,
            company_id: update.company_id,
            is_active: update.is_active,
        };
        Ok(self.store.update_user(target.id, &changes)?)
    }

    pub fn update_user(
        &self,
        actor: &Actor,
        user_id: i32,
        update: UserUpdate,
    ) -> HelpdeskResult<User> {
        let target = self.load_user(user_id)?;
        let fields = update.fields();
        ensure(
            actor,
            Action::UserUpdate,
            Resource::User(&target),
            ProposedChanges::UserUpdate {
                fields: &fields,
                role: update.role,
            },
        )?;
        let user = self.apply_update(target, update)?;
        info!("User {} updated by user {} ({:?})", user_id, actor.id, fields);
        Ok(user)
    }

    /// Self-service update of the actor's own name, email and password.
    pub fn update_profile(&self, actor: &Actor, update: UserUpdate) -> HelpdeskResult<User> {
        let target = self.load_user(actor.id)?;
        let fields = update.fields();
        ensure(
            actor,
            Action::UserUpdateProfile,
            Resource::User(&target),
            ProposedChanges::UserUpdate {
                fields: &fields,
                role: update.role,
            },
        )?;
        self.apply_update(target, update)
    }

    pub fn delete_user(&self, actor: &Actor, user_id: i32) -> HelpdeskResult<()> {
        let target = self.load_user(user_id)?;
        ensure(actor, Action::UserDelete, Resource::User(&target), ProposedChanges::None)?;

        let references = self.store.count_user_references(user_id)?;
        if references > 0 {
            return Err(HelpdeskError::Conflict(format!(
                "User {user_id} is referenced by {references} tickets, history entries or comments; deactivate the account instead"
            )));
        }
        self.store.delete_user(user_id)?;
        info!("User {} deleted by user {}", user_id, actor.id);
        Ok(())
    }

    pub fn set_user_active(
        &self,
        actor: &Actor,
        user_id: i32,
        is_active: bool,
    ) -> HelpdeskResult<User> {
        let target = self.load_user(user_id)?;
        ensure(actor, Action::UserSetActive, Resource::User(&target), ProposedChanges::None)?;
        if target.is_active == is_active {
            return Ok(target);
        }
        let changes = UserChanges {
            is_active: Some(is_active),
            ..UserChanges::default()
        };
        let user = self.store.update_user(user_id, &changes)?;
        info!(
            "User {} {} by user {}",
            user_id,
            if is_active { "activated" } else { "deactivated" },
            actor.id
        );
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::test_utils::seed;
    use crate::core::shared::Role;
    use crate::core::store::MemoryStore;
    use crate::security::password::password_matches;

    fn service(store: &Arc<MemoryStore>) -> DirectoryService {
        DirectoryService::new(Arc::clone(store) as Arc<dyn HelpdeskStore>)
    }

    fn new_user(email: &str, role: Role, company_id: Option<i32>) -> UserInput {
        UserInput {
            email: email.to_string(),
            password: "s3cure-enough".to_string(),
            full_name: "New Person".to_string(),
            role,
            company_id,
        }
    }

    #[test]
    fn test_lone_root_company_cannot_be_deleted() {
        let store = Arc::new(MemoryStore::new());
        let root = store.create_company("HQ").unwrap();
        let owner = store
            .create_user(NewUser {
                email: "owner@hq.test".into(),
                password_hash: String::new(),
                full_name: "Owner".into(),
                role: Role::Owner,
                company_id: root.id,
                is_active: true,
            })
            .unwrap();
        let directory = service(&store);

        let err = directory.delete_company(&Actor::from(&owner), root.id).unwrap_err();
        assert!(matches!(err, HelpdeskError::Conflict(_)));
        assert!(store.get_company(root.id).unwrap().is_some());
        assert_eq!(store.list_users(Some(root.id)).unwrap().len(), 1);
    }

    #[test]
    fn test_root_company_with_sibling_is_transferred() {
        let seed = seed();
        let directory = service(&seed.store);
        let owner_ticket = seed.ticket_by(&seed.owner);

        directory
            .delete_company(&seed.actor(&seed.owner), seed.root.id)
            .unwrap();

        assert!(seed.store.get_company(seed.root.id).unwrap().is_none());
        let owner = seed.store.get_user(seed.owner.id).unwrap().unwrap();
        assert_eq!(owner.company_id, seed.acme.id);
        let ticket = seed.store.get_ticket(owner_ticket.id).unwrap().unwrap();
        assert_eq!(ticket.company_id, seed.acme.id);
    }

    #[test]
    fn test_company_delete_removes_tickets_then_users() {
        let seed = seed();
        let directory = service(&seed.store);
        let ticket = seed.ticket_by(&seed.globex_admin);
        crate::tickets::TicketEngine::new(Arc::clone(&seed.store) as Arc<dyn HelpdeskStore>)
            .add_comment(&seed.actor(&seed.globex_admin), ticket.id, "note")
            .unwrap();

        directory
            .delete_company(&seed.actor(&seed.owner), seed.globex.id)
            .unwrap();

        assert!(seed.store.get_company(seed.globex.id).unwrap().is_none());
        assert!(seed.store.get_ticket(ticket.id).unwrap().is_none());
        assert!(seed.store.get_user(seed.globex_admin.id).unwrap().is_none());
        assert!(seed.store.ticket_history(ticket.id).unwrap().is_empty());
    }

    #[test]
    fn test_company_delete_refuses_users_active_elsewhere() {
        let seed = seed();
        let directory = service(&seed.store);
        let acme_owner = seed
            .store
            .create_user(crate::core::shared::models::NewUser {
                email: "owner@acme.test".to_string(),
                password_hash: "$argon2id$placeholder".to_string(),
                full_name: "Acme Owner".to_string(),
                role: Role::Owner,
                company_id: seed.acme.id,
                is_active: true,
            })
            .unwrap();
        let globex_ticket = seed.ticket_by(&seed.globex_admin);
        crate::tickets::TicketEngine::new(Arc::clone(&seed.store) as Arc<dyn HelpdeskStore>)
            .add_comment(&seed.actor(&acme_owner), globex_ticket.id, "seen")
            .unwrap();
        assert_eq!(
            seed.store.users_referenced_outside(seed.acme.id).unwrap(),
            vec![acme_owner.id]
        );

        let err = directory
            .delete_company(&seed.actor(&seed.owner), seed.acme.id)
            .unwrap_err();
        match err {
            HelpdeskError::Conflict(reason) => {
                assert!(reason.contains(&acme_owner.id.to_string()), "{reason}")
            }
            other => panic!("expected Conflict, got {other:?}"),
        }
        assert!(seed.store.get_company(seed.acme.id).unwrap().is_some());
        assert!(seed.store.get_user(acme_owner.id).unwrap().is_some());
        assert_eq!(seed.store.ticket_comments(globex_ticket.id).unwrap().len(), 1);

        // Globex's own staff only touch Globex tickets.
        assert!(seed.store.users_referenced_outside(seed.globex.id).unwrap().is_empty());
    }

    #[test]
    fn test_only_owner_manages_companies() {
        let seed = seed();
        let directory = service(&seed.store);
        let admin = seed.actor(&seed.acme_admin);
        assert!(directory.list_companies(&admin).unwrap_err().is_forbidden());
        assert!(directory
            .create_company(&admin, "Initech".into())
            .unwrap_err()
            .is_forbidden());
        assert!(directory
            .delete_company(&admin, seed.globex.id)
            .unwrap_err()
            .is_forbidden());
        assert_eq!(directory.get_company(&admin, seed.acme.id).unwrap().name, "Acme");
        assert!(directory.get_company(&admin, seed.globex.id).unwrap_err().is_forbidden());

        let owner = seed.actor(&seed.owner);
        let created = directory.create_company(&owner, "Initech".into()).unwrap();
        let renamed = directory
            .update_company(&owner, created.id, "Initrode".into())
            .unwrap();
        assert_eq!(renamed.name, "Initrode");
        assert_eq!(directory.list_companies(&owner).unwrap().len(), 4);
    }

    #[test]
    fn test_admin_cannot_create_owner() {
        let seed = seed();
        let directory = service(&seed.store);
        let admin = seed.actor(&seed.acme_admin);

        let err = directory
            .create_user(&admin, new_user("boss@acme.test", Role::Owner, None))
            .unwrap_err();
        match err {
            HelpdeskError::Forbidden(reason) => {
                assert_eq!(reason, "Admin cannot create users with role owner")
            }
            other => panic!("expected Forbidden, got {other:?}"),
        }
        assert!(seed.store.get_user_by_email("boss@acme.test").unwrap().is_none());
    }

    #[test]
    fn test_create_user_hashes_password_and_defaults_company() {
        let seed = seed();
        let directory = service(&seed.store);
        let tech = seed.actor(&seed.acme_tech);

        let user = directory
            .create_user(&tech, new_user("new@acme.test", Role::User, None))
            .unwrap();
        assert_eq!(user.company_id, seed.acme.id);
        assert!(user.is_active);
        assert!(password_matches("s3cure-enough", &user.password_hash));

        let duplicate = directory
            .create_user(&tech, new_user("new@acme.test", Role::User, None))
            .unwrap_err();
        assert!(matches!(duplicate, HelpdeskError::Conflict(_)));
    }

    #[test]
    fn test_user_listing_is_company_scoped() {
        let seed = seed();
        let directory = service(&seed.store);

        let tech = seed.actor(&seed.acme_tech);
        let users = directory.list_users(&tech, None).unwrap();
        assert!(users.iter().all(|u| u.company_id == seed.acme.id));
        assert_eq!(users.len(), 4);
        assert!(directory
            .list_users(&tech, Some(seed.globex.id))
            .unwrap_err()
            .is_forbidden());
        assert!(directory
            .list_company_users(&tech, seed.globex.id)
            .unwrap_err()
            .is_forbidden());

        let owner = seed.actor(&seed.owner);
        assert_eq!(directory.list_users(&owner, None).unwrap().len(), 6);
    }

    #[test]
    fn test_admin_update_limits() {
        let seed = seed();
        let directory = service(&seed.store);
        let admin = seed.actor(&seed.acme_admin);

        let promote = UserUpdate {
            role: Some(Role::TechAdmin),
            full_name: Some("Promoted".into()),
            ..UserUpdate::default()
        };
        let updated = directory
            .update_user(&admin, seed.acme_user.id, promote)
            .unwrap();
        assert_eq!(updated.role, Role::TechAdmin);

        let email_change = UserUpdate {
            email: Some("x@acme.test".into()),
            ..UserUpdate::default()
        };
        assert!(directory
            .update_user(&admin, seed.acme_other_user.id, email_change)
            .unwrap_err()
            .is_forbidden());

        let to_owner = UserUpdate {
            role: Some(Role::Owner),
            ..UserUpdate::default()
        };
        assert!(directory
            .update_user(&admin, seed.acme_other_user.id, to_owner)
            .unwrap_err()
            .is_forbidden());
    }

    #[test]
    fn test_profile_update_changes_own_credentials() {
        let seed = seed();
        let directory = service(&seed.store);
        let user = seed.actor(&seed.acme_user);

        let update = UserUpdate {
            email: Some("renamed@acme.test".into()),
            password: Some("brand-new-secret".into()),
            ..UserUpdate::default()
        };
        let updated = directory.update_profile(&user, update).unwrap();
        assert_eq!(updated.email, "renamed@acme.test");
        assert!(password_matches("brand-new-secret", &updated.password_hash));

        let taken = UserUpdate {
            email: Some(seed.acme_admin.email.clone()),
            ..UserUpdate::default()
        };
        assert!(matches!(
            directory.update_profile(&user, taken).unwrap_err(),
            HelpdeskError::Conflict(_)
        ));
    }

    #[test]
    fn test_delete_user_refuses_referenced_accounts() {
        let seed = seed();
        let directory = service(&seed.store);
        let admin = seed.actor(&seed.acme_admin);
        seed.ticket_by(&seed.acme_user);

        let err = directory.delete_user(&admin, seed.acme_user.id).unwrap_err();
        assert!(matches!(err, HelpdeskError::Conflict(_)));

        directory.delete_user(&admin, seed.acme_other_user.id).unwrap();
        assert!(seed.store.get_user(seed.acme_other_user.id).unwrap().is_none());

        let tech = seed.actor(&seed.acme_tech);
        assert!(directory
            .delete_user(&tech, seed.acme_admin.id)
            .unwrap_err()
            .is_forbidden());
    }

    #[test]
    fn test_set_active() {
        let seed = seed();
        let directory = service(&seed.store);
        let admin = seed.actor(&seed.acme_admin);

        let user = directory
            .set_user_active(&admin, seed.acme_user.id, false)
            .unwrap();
        assert!(!user.is_active);
        assert!(directory
            .set_user_active(&admin, seed.acme_admin.id, false)
            .unwrap_err()
            .is_forbidden());
        assert!(directory
            .set_user_active(&seed.actor(&seed.acme_tech), seed.acme_user.id, true)
            .unwrap_err()
            .is_forbidden());
    }
}
