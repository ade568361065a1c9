//! User Credential
//!
//! A user together with their stored password hash, as loaded for login.

use platform::password::HashedPassword;

use super::user::User;

#[derive(Debug, Clone)]
pub struct UserCredential {
    pub user: User,
    pub password_hash: HashedPassword,
}

impl UserCredential {
    pub fn new(user: User, password_hash: HashedPassword) -> Self {
        Self {
            user,
            password_hash,
        }
    }
}
