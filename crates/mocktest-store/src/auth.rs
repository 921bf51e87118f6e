//! User directory with demo-grade credentials.
//!
//! Passwords are compared as plain strings. The directory only exists to
//! tell learners from instructors at the command line.

use serde::{Deserialize, Serialize};

use mocktest_core::model::{Role, User};

use crate::error::AuthError;

/// A user together with the password used to log in.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(flatten)]
    pub user: User,
    pub password: String,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// All known accounts.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    accounts: Vec<Account>,
}

impl UserDirectory {
    pub fn new(accounts: Vec<Account>) -> Self {
        Self { accounts }
    }

    /// Authenticate by email (case-insensitive) and password.
    pub fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let account = self
            .find_by_email(email)
            .filter(|a| a.password == password)
            .ok_or(AuthError::InvalidCredentials)?;
        tracing::debug!(user = %account.user.id, "login succeeded");
        Ok(account.user.clone())
    }

    /// Register a new account and return its user.
    pub fn signup(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User, AuthError> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() {
            return Err(AuthError::MissingField("name"));
        }
        if email.is_empty() {
            return Err(AuthError::MissingField("email"));
        }
        if password.is_empty() {
            return Err(AuthError::MissingField("password"));
        }
        if self.find_by_email(email).is_some() {
            return Err(AuthError::EmailTaken(email.to_string()));
        }

        let user = User {
            id: self.next_id(),
            name: name.to_string(),
            email: email.to_string(),
            role,
        };
        self.accounts.push(Account {
            user: user.clone(),
            password: password.to_string(),
        });
        tracing::info!(user = %user.id, role = %role, "account created");
        Ok(user)
    }

    pub fn user(&self, user_id: &str) -> Option<&User> {
        self.accounts
            .iter()
            .map(|a| &a.user)
            .find(|u| u.id == user_id)
    }

    /// Every user, in registration order.
    pub fn users(&self) -> Vec<User> {
        self.accounts.iter().map(|a| a.user.clone()).collect()
    }

    /// Users with the learner role.
    pub fn learners(&self) -> Vec<User> {
        self.accounts
            .iter()
            .filter(|a| a.user.role == Role::Learner)
            .map(|a| a.user.clone())
            .collect()
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    fn find_by_email(&self, email: &str) -> Option<&Account> {
        let email = email.trim();
        self.accounts
            .iter()
            .find(|a| a.user.email.eq_ignore_ascii_case(email))
    }

    /// Numeric ids continue after the highest one in use.
    fn next_id(&self) -> String {
        let max = self
            .accounts
            .iter()
            .filter_map(|a| a.user.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        (max + 1).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::default_accounts;

    fn directory() -> UserDirectory {
        UserDirectory::new(default_accounts())
    }

    #[test]
    fn demo_logins() {
        let dir = directory();
        let student = dir.login("student@example.com", "password").unwrap();
        assert_eq!(student.role, Role::Learner);
        assert_eq!(student.id, "1");

        let faculty = dir.login("Faculty@Example.com", "password").unwrap();
        assert_eq!(faculty.role, Role::Instructor);
    }

    #[test]
    fn wrong_password_is_rejected() {
        let dir = directory();
        assert!(matches!(
            dir.login("student@example.com", "hunter2"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            dir.login("nobody@example.com", "password"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn signup_assigns_next_id() {
        let mut dir = directory();
        let user = dir
            .signup("Dana Lee", "dana@example.com", "secret", Role::Learner)
            .unwrap();
        assert_eq!(user.id, "5");
        assert_eq!(dir.login("dana@example.com", "secret").unwrap(), user);
        assert_eq!(dir.learners().len(), 4);
    }

    #[test]
    fn signup_rejects_duplicate_email() {
        let mut dir = directory();
        let err = dir
            .signup("Another", "STUDENT@example.com", "x", Role::Learner)
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken(_)));
        assert_eq!(dir.users().len(), 4);
    }

    #[test]
    fn signup_requires_fields() {
        let mut dir = directory();
        assert!(matches!(
            dir.signup("  ", "x@example.com", "pw", Role::Learner),
            Err(AuthError::MissingField("name"))
        ));
        assert!(matches!(
            dir.signup("X", "x@example.com", "", Role::Learner),
            Err(AuthError::MissingField("password"))
        ));
    }

    #[test]
    fn debug_masks_password() {
        let dir = directory();
        let debug = format!("{:?}", dir.accounts()[0]);
        assert!(debug.contains("***"));
        assert!(!debug.contains("\"password\""));
    }
}
