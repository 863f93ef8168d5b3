//! First-run seeding of the root company and owner account

use anyhow::{anyhow, Context};
use log::{info, warn};

use crate::core::config::AppConfig;
use crate::core::shared::models::{NewUser, ROOT_COMPANY_ID};
use crate::core::shared::utils::normalize_email;
use crate::core::shared::Role;
use crate::core::store::HelpdeskStore;
use crate::security::{check_password, hash_password};

pub fn bootstrap_store(store: &dyn HelpdeskStore, config: &AppConfig) -> anyhow::Result<()> {
    let mut companies = store.list_companies().context("Failed to list companies")?;
    if companies.is_empty() {
        let root = store
            .create_company(&config.root_company_name)
            .context("Failed to create root company")?;
        if root.id != ROOT_COMPANY_ID {
            warn!(
                "Root company was created with id {} instead of {}",
                root.id, ROOT_COMPANY_ID
            );
        }
        info!("Created root company {} ({})", root.id, root.name);
        companies.push(root);
    }

    let Some(owner) = &config.bootstrap_owner else {
        return Ok(());
    };
    if !store.list_users(None).context("Failed to list users")?.is_empty() {
        return Ok(());
    }

    check_password(&owner.password).map_err(|e| anyhow!("HELPDESK_OWNER_PASSWORD: {e}"))?;
    let company_id = companies
        .iter()
        .map(|c| c.id)
        .min()
        .ok_or_else(|| anyhow!("No company available for the owner account"))?;

    let user = store
        .create_user(NewUser {
            email: normalize_email(&owner.email),
            password_hash: hash_password(&owner.password)?,
            full_name: owner.full_name.clone(),
            role: Role::Owner,
            company_id,
            is_active: true,
        })
        .context("Failed to create owner account")?;
    info!("Created owner account {} ({})", user.id, user.email);
    Ok(())
}
