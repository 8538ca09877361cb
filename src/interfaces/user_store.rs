//! User persistence interface.

use async_trait::async_trait;

use super::Result;
use crate::domain::User;

/// Persistence operations for user accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Returns `StorageError::UserExists` when the
    /// username or email is already taken.
    async fn create(&self, user: &User) -> Result<()>;

    /// Look up a user by email. Returns `StorageError::UserNotFound` when
    /// absent.
    async fn find_by_email(&self, email: &str) -> Result<User>;
}
