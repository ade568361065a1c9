//! Demo account seeding
//!
//! `DEMO_USERS` holds comma-separated `name:password[:lang]` entries. Both
//! user stores accept the parsed credentials.

use platform::password::{ClearTextPassword, HashCost};

use crate::domain::entity::{PreferredLanguage, User, UserCredential};
use crate::domain::value_object::UserName;
use crate::error::{AuthError, AuthResult};

/// Parse and hash seed entries.
///
/// Entries with a malformed name or a password that fails the policy are
/// skipped with a warning. Hashing itself failing is an error.
pub fn parse_demo_users(
    entries: &str,
    pepper: Option<&[u8]>,
    cost: HashCost,
) -> AuthResult<Vec<UserCredential>> {
    let mut credentials = Vec::new();
    for entry in entries.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let mut parts = entry.splitn(3, ':');
        let (Some(name), Some(password)) = (parts.next(), parts.next()) else {
            tracing::warn!(user_name = %entry, "Skipping demo user without password");
            continue;
        };

        let user_name = match UserName::new(name) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(user_name = %name, reason = %e, "Skipping demo user");
                continue;
            }
        };
        let password = match ClearTextPassword::new(password.to_string()) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(user_name = %user_name, reason = %e, "Skipping demo user");
                continue;
            }
        };

        let mut user = User::new(user_name);
        if let Some(lang) = parts.next() {
            user.preferred_language = lang.parse().unwrap_or_else(|e: String| {
                tracing::warn!(reason = %e, "Unknown language, using default");
                PreferredLanguage::default()
            });
        }

        let hash = password
            .hash_with_cost(pepper, cost)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        credentials.push(UserCredential::new(user, hash));
    }
    Ok(credentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_bad_entries() {
        let parsed = parse_demo_users(
            "Rahul:namaste2024:en, ,priya:dhanyavad99:xx, nopassword, bad name:whatever1, anita:short",
            None,
            HashCost::Minimal,
        )
        .unwrap();

        let names: Vec<_> = parsed.iter().map(|c| c.user.user_name.original()).collect();
        assert_eq!(names, ["Rahul", "priya"]);
        assert_eq!(parsed[0].user.preferred_language, PreferredLanguage::English);
        assert_eq!(parsed[1].user.preferred_language, PreferredLanguage::Hindi);
    }

    #[test]
    fn test_password_may_not_contain_separator() {
        // The third field is the language, so a colon ends the password
        let parsed = parse_demo_users("meera:pass:word99", None, HashCost::Minimal).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_demo_users("", None, HashCost::Minimal).unwrap().is_empty());
    }
}
