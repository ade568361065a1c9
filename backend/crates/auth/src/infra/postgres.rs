//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use platform::password::{HashCost, HashedPassword};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{PreferredLanguage, User, UserCredential};
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{UserId, UserName};
use crate::error::AuthResult;
use crate::infra::seed::parse_demo_users;

/// PostgreSQL-backed credential store
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a user, or update the profile and hash of an existing one
    pub async fn upsert_credential(&self, credential: &UserCredential) -> AuthResult<()> {
        let user = &credential.user;
        sqlx::query(
            r#"
            INSERT INTO users (
                user_id,
                user_name,
                user_name_canonical,
                display_name,
                password_hash,
                preferred_language,
                is_active,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_name_canonical) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                password_hash = EXCLUDED.password_hash,
                preferred_language = EXCLUDED.preferred_language,
                is_active = EXCLUDED.is_active
            "#,
        )
        .bind(user.user_id.as_uuid())
        .bind(user.user_name.original())
        .bind(user.user_name.canonical())
        .bind(&user.display_name)
        .bind(credential.password_hash.as_phc_string())
        .bind(user.preferred_language.code())
        .bind(user.is_active)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Upsert `DEMO_USERS` entries; see [`parse_demo_users`]. Existing
    /// accounts keep their id and get the seeded password and profile.
    pub async fn seed(
        &self,
        entries: &str,
        pepper: Option<&[u8]>,
        cost: HashCost,
    ) -> AuthResult<usize> {
        let credentials = parse_demo_users(entries, pepper, cost)?;
        for credential in &credentials {
            self.upsert_credential(credential).await?;
        }
        Ok(credentials.len())
    }
}

impl UserRepository for PgUserRepository {
    async fn find_credential(&self, user_name: &UserName) -> AuthResult<Option<UserCredential>> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT
                user_id,
                user_name,
                display_name,
                password_hash,
                preferred_language,
                is_active,
                last_login_at,
                created_at
            FROM users
            WHERE user_name_canonical = $1
            "#,
        )
        .bind(user_name.canonical())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(CredentialRow::into_credential))
    }

    async fn record_login(&self, user_id: &UserId, at: DateTime<Utc>) -> AuthResult<()> {
        sqlx::query("UPDATE users SET last_login_at = $2 WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    user_id: Uuid,
    user_name: String,
    display_name: String,
    password_hash: String,
    preferred_language: String,
    is_active: bool,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl CredentialRow {
    /// `None` when the stored hash is unusable. That account cannot log in,
    /// but the store itself is healthy, so it is a rejection and not a
    /// store failure.
    fn into_credential(self) -> Option<UserCredential> {
        let password_hash = match HashedPassword::from_phc_string(self.password_hash) {
            Ok(hash) => hash,
            Err(e) => {
                tracing::error!(user_id = %self.user_id, error = %e, "Stored password_hash is corrupt");
                return None;
            }
        };

        let preferred_language = self.preferred_language.parse().unwrap_or_else(|e: String| {
            tracing::warn!(user_id = %self.user_id, reason = %e, "Unknown preferred_language");
            PreferredLanguage::default()
        });

        let user = User {
            user_id: UserId::from_uuid(self.user_id),
            user_name: UserName::from_db(&self.user_name),
            display_name: self.display_name,
            preferred_language,
            is_active: self.is_active,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
        };

        Some(UserCredential::new(user, password_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::password::ClearTextPassword;

    fn row(user_name: &str, password_hash: String, preferred_language: &str) -> CredentialRow {
        CredentialRow {
            user_id: Uuid::new_v4(),
            user_name: user_name.to_string(),
            display_name: "Kavya R".to_string(),
            password_hash,
            preferred_language: preferred_language.to_string(),
            is_active: true,
            last_login_at: None,
            created_at: Utc::now(),
        }
    }

    fn phc(password: &str) -> String {
        ClearTextPassword::for_verification(password.to_string())
            .hash_with_cost(None, HashCost::Minimal)
            .unwrap()
            .as_phc_string()
            .to_string()
    }

    #[test]
    fn test_row_into_credential() {
        let source = row("Kavya.R", phc("pranam2025"), "en");
        let user_id = source.user_id;

        let credential = source.into_credential().unwrap();
        assert_eq!(credential.user.user_id, UserId::from_uuid(user_id));
        assert_eq!(credential.user.user_name.original(), "Kavya.R");
        assert_eq!(credential.user.user_name.canonical(), "kavya.r");
        assert_eq!(credential.user.display_name, "Kavya R");
        assert_eq!(credential.user.preferred_language, PreferredLanguage::English);
        assert!(credential.password_hash.verify(
            &ClearTextPassword::for_verification("pranam2025".to_string()),
            None
        ));
    }

    #[test]
    fn test_unknown_language_falls_back_to_default() {
        let credential = row("kavya", phc("pranam2025"), "fr").into_credential().unwrap();
        assert_eq!(credential.user.preferred_language, PreferredLanguage::default());
    }

    #[test]
    fn test_corrupt_hash_is_not_a_credential() {
        for hash in ["", "plaintext-password", "argon2id$v=19$m=19456"] {
            assert!(row("kavya", hash.to_string(), "hi").into_credential().is_none());
        }
    }
}
