//! User Entity
//!
//! Profile data returned to the client after a successful login.
//! The password hash lives in [`UserCredential`](super::credential::UserCredential).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_object::{UserId, UserName};

/// UI language of the learner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PreferredLanguage {
    #[default]
    #[serde(rename = "hi")]
    Hindi,
    #[serde(rename = "en")]
    English,
}

impl PreferredLanguage {
    pub fn code(&self) -> &'static str {
        match self {
            PreferredLanguage::Hindi => "hi",
            PreferredLanguage::English => "en",
        }
    }
}

impl fmt::Display for PreferredLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PreferredLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hi" | "hindi" => Ok(PreferredLanguage::Hindi),
            "en" | "english" => Ok(PreferredLanguage::English),
            other => Err(format!("unsupported language code: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub user_id: UserId,
    pub user_name: UserName,
    pub display_name: String,
    pub preferred_language: PreferredLanguage,
    /// Deactivated accounts cannot log in
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// New active user; the display name defaults to the user name as typed.
    pub fn new(user_name: UserName) -> Self {
        Self {
            user_id: UserId::new(),
            display_name: user_name.original().to_string(),
            user_name,
            preferred_language: PreferredLanguage::default(),
            is_active: true,
            last_login_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn record_login(&mut self, at: DateTime<Utc>) {
        self.last_login_at = Some(at);
    }

    pub fn can_login(&self) -> bool {
        self.is_active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_codes() {
        assert_eq!("HI".parse::<PreferredLanguage>(), Ok(PreferredLanguage::Hindi));
        assert_eq!("english".parse::<PreferredLanguage>(), Ok(PreferredLanguage::English));
        assert!("fr".parse::<PreferredLanguage>().is_err());
        assert_eq!(
            serde_json::to_value(PreferredLanguage::English).unwrap(),
            serde_json::json!("en")
        );
    }

    #[test]
    fn test_new_user_defaults() {
        let user = User::new(UserName::new("Anita").unwrap());
        assert_eq!(user.display_name, "Anita");
        assert_eq!(user.preferred_language, PreferredLanguage::Hindi);
        assert!(user.can_login());
        assert!(user.last_login_at.is_none());
    }
}
