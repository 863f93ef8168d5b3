use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::core::error::{HelpdeskError, HelpdeskResult};
use crate::core::shared::utils::{non_blank, normalize_email};
use crate::core::shared::Role;
use crate::security::{check_password, UserField};

pub const MAX_NAME_LENGTH: usize = 120;
pub const MAX_EMAIL_LENGTH: usize = 254;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)+$"
    ).expect("Invalid email regex")
});

fn name(field: &str, value: &str) -> HelpdeskResult<String> {
    let name = non_blank(value)
        .ok_or_else(|| HelpdeskError::Validation(format!("{field} cannot be empty")))?;
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(HelpdeskError::Validation(format!(
            "{field} must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(name)
}

fn email(value: &str) -> HelpdeskResult<String> {
    let email = normalize_email(value);
    if email.len() > MAX_EMAIL_LENGTH || !EMAIL_REGEX.is_match(&email) {
        return Err(HelpdeskError::Validation(format!(
            "Invalid email address: {value}"
        )));
    }
    Ok(email)
}

fn password(value: &str) -> HelpdeskResult<String> {
    check_password(value).map_err(HelpdeskError::Validation)?;
    Ok(value.to_string())
}

fn role(value: &str) -> HelpdeskResult<Role> {
    value
        .parse::<Role>()
        .map_err(|e| HelpdeskError::Validation(format!("Invalid role: {e}")))
}

// ============================================================================
// COMPANIES
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CompanyRequest {
    pub name: String,
}

impl CompanyRequest {
    pub fn validate(self) -> HelpdeskResult<String> {
        name("Company name", &self.name)
    }
}

// ============================================================================
// USERS
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: String,
    pub company_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserInput {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
    pub company_id: Option<i32>,
}

impl CreateUserRequest {
    pub fn validate(self) -> HelpdeskResult<UserInput> {
        Ok(UserInput {
            email: email(&self.email)?,
            password: password(&self.password)?,
            full_name: name("Full name", &self.full_name)?,
            role: role(&self.role)?,
            company_id: self.company_id,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<String>,
    pub company_id: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListUsersQuery {
    pub company_id: Option<i32>,
}

/// Validated partial user update; the password is still in clear text here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub company_id: Option<i32>,
    pub is_active: Option<bool>,
}

impl UserUpdate {
    pub fn fields(&self) -> Vec<UserField> {
        let mut fields = Vec::new();
        if self.email.is_some() {
            fields.push(UserField::Email);
        }
        if self.password.is_some() {
            fields.push(UserField::Password);
        }
        if self.full_name.is_some() {
            fields.push(UserField::FullName);
        }
        if self.role.is_some() {
            fields.push(UserField::Role);
        }
        if self.company_id.is_some() {
            fields.push(UserField::Company);
        }
        if self.is_active.is_some() {
            fields.push(UserField::IsActive);
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl UpdateUserRequest {
    pub fn validate(self) -> HelpdeskResult<UserUpdate> {
        Ok(UserUpdate {
            email: self.email.as_deref().map(email).transpose()?,
            password: self.password.as_deref().map(password).transpose()?,
            full_name: self
                .full_name
                .as_deref()
                .map(|n| name("Full name", n))
                .transpose()?,
            role: self.role.as_deref().map(role).transpose()?,
            company_id: self.company_id,
            is_active: self.is_active,
        })
    }
}

impl UpdateProfileRequest {
    pub fn validate(self) -> HelpdeskResult<UserUpdate> {
        UpdateUserRequest {
            email: self.email,
            password: self.password,
            full_name: self.full_name,
            ..UpdateUserRequest::default()
        }
        .validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_user_normalizes_email() {
        let input = CreateUserRequest {
            email: " Jane.Doe@Acme.Test ".into(),
            password: "hunter2hunter2".into(),
            full_name: "Jane Doe".into(),
            role: "TECH_ADMIN".into(),
            company_id: None,
        }
        .validate()
        .unwrap();
        assert_eq!(input.email, "jane.doe@acme.test");
        assert_eq!(input.role, Role::TechAdmin);
    }

    #[test]
    fn test_create_user_rejects_bad_input() {
        let base = CreateUserRequest {
            email: "jane@acme.test".into(),
            password: "hunter2hunter2".into(),
            full_name: "Jane".into(),
            role: "user".into(),
            company_id: None,
        };
        let mut bad_email = base.clone();
        bad_email.email = "jane-at-acme".into();
        assert!(bad_email.validate().unwrap_err().is_validation());

        for invalid in ["@acme.test", "jane@localhost", "jane doe@acme.test", "jane@-acme.test"] {
            let mut request = base.clone();
            request.email = invalid.into();
            assert!(request.validate().is_err(), "{invalid} was accepted");
        }

        let mut too_long = base.clone();
        too_long.email = format!("{}@acme.test", "j".repeat(MAX_EMAIL_LENGTH));
        assert!(too_long.validate().unwrap_err().is_validation());

        let mut short_password = base.clone();
        short_password.password = "123".into();
        assert!(short_password.validate().unwrap_err().is_validation());

        let mut bad_role = base;
        bad_role.role = "superuser".into();
        assert!(bad_role.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_update_fields() {
        let update = UpdateUserRequest {
            full_name: Some("New Name".into()),
            is_active: Some(false),
            ..UpdateUserRequest::default()
        }
        .validate()
        .unwrap();
        assert_eq!(update.fields(), vec![UserField::FullName, UserField::IsActive]);
        assert!(UserUpdate::default().is_empty());
    }

    #[test]
    fn test_company_name_required() {
        let request = CompanyRequest { name: "  ".into() };
        assert!(request.validate().unwrap_err().is_validation());
    }
}
