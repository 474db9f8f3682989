use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{AuthError, AuthResult, Credential, PasswordResetToken, Repository, User};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: Option<String>,
    password_hash: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        // ---
        User {
            id: r.id,
            username: r.username,
            email: r.email,
            password_hash: r.password_hash,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: Vec<u8>,
    user_id: Uuid,
    public_key: Vec<u8>,
    counter: i64,
    label: String,
    created_at: DateTime<Utc>,
    last_used_at: Option<DateTime<Utc>>,
}

impl From<CredentialRow> for Credential {
    fn from(r: CredentialRow) -> Self {
        // ---
        Credential {
            id: r.id,
            user_id: r.user_id,
            public_key: r.public_key,
            counter: r.counter,
            label: r.label,
            created_at: r.created_at,
            last_used_at: r.last_used_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ResetTokenRow {
    user_id: Uuid,
    token: String,
    expires_at: DateTime<Utc>,
}

/// Maps uniqueness-constraint violations (username, email, credential id)
/// into the domain error instead of surfacing a raw storage error.
fn map_insert_err(err: sqlx::Error) -> AuthError {
    // ---
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return AuthError::DuplicateIdentity;
        }
    }
    AuthError::Storage(err)
}

pub struct PostgresRepository {
    // ---
    pool: PgPool,
}

impl PostgresRepository {
    // ---
    pub fn new(pool: PgPool) -> Self {
        // ---
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Repository for PostgresRepository {
    // ---
    async fn create_user(&self, user: &User) -> AuthResult<()> {
        // ---
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_insert_err)?;

        Ok(())
    }

    async fn create_user_with_credential(
        &self,
        user: &User,
        credential: &Credential,
    ) -> AuthResult<()> {
        // ---
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_insert_err)?;

        sqlx::query(
            "INSERT INTO credentials (id, user_id, public_key, counter, label, created_at, last_used_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&credential.id)
        .bind(credential.user_id)
        .bind(&credential.public_key)
        .bind(credential.counter)
        .bind(&credential.label)
        .bind(credential.created_at)
        .bind(credential.last_used_at)
        .execute(&mut *tx)
        .await
        .map_err(map_insert_err)?;

        tx.commit().await?;

        Ok(())
    }

    async fn get_user_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        // ---
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, created_at
             FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn get_user_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        // ---
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, created_at
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> AuthResult<Option<User>> {
        // ---
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, created_at
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn set_password_hash(&self, user_id: Uuid, password_hash: &str) -> AuthResult<()> {
        // ---
        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn save_credential(&self, credential: &Credential) -> AuthResult<()> {
        // ---
        sqlx::query(
            "INSERT INTO credentials (id, user_id, public_key, counter, label, created_at, last_used_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&credential.id)
        .bind(credential.user_id)
        .bind(&credential.public_key)
        .bind(credential.counter)
        .bind(&credential.label)
        .bind(credential.created_at)
        .bind(credential.last_used_at)
        .execute(&self.pool)
        .await
        .map_err(map_insert_err)?;

        Ok(())
    }

    async fn get_credentials_by_user(&self, user_id: Uuid) -> AuthResult<Vec<Credential>> {
        // ---
        let rows = sqlx::query_as::<_, CredentialRow>(
            "SELECT id, user_id, public_key, counter, label, created_at, last_used_at
             FROM credentials WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Credential::from).collect())
    }

    async fn get_credential_by_id(&self, credential_id: &[u8]) -> AuthResult<Option<Credential>> {
        // ---
        let row = sqlx::query_as::<_, CredentialRow>(
            "SELECT id, user_id, public_key, counter, label, created_at, last_used_at
             FROM credentials WHERE id = $1",
        )
        .bind(credential_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Credential::from))
    }

    async fn advance_credential_counter(
        &self,
        credential_id: &[u8],
        expected_counter: i64,
        new_counter: i64,
    ) -> AuthResult<bool> {
        // ---
        // Compare-and-set keyed on the previously observed counter. Two
        // concurrent verifications of the same signed response race here;
        // exactly one matches the WHERE clause.
        let result = sqlx::query(
            "UPDATE credentials SET counter = $1, last_used_at = NOW()
             WHERE id = $2 AND counter = $3",
        )
        .bind(new_counter)
        .bind(credential_id)
        .bind(expected_counter)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn touch_credential(&self, credential_id: &[u8]) -> AuthResult<()> {
        // ---
        sqlx::query("UPDATE credentials SET last_used_at = NOW() WHERE id = $1")
            .bind(credential_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_credential(&self, credential_id: &[u8]) -> AuthResult<()> {
        // ---
        sqlx::query("DELETE FROM credentials WHERE id = $1")
            .bind(credential_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn upsert_reset_token(&self, token: &PasswordResetToken) -> AuthResult<()> {
        // ---
        // One active token per user: the user id is the primary key, so a
        // new issuance replaces whatever token was outstanding.
        sqlx::query(
            "INSERT INTO password_reset_tokens (user_id, token, expires_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id)
             DO UPDATE SET token = EXCLUDED.token, expires_at = EXCLUDED.expires_at",
        )
        .bind(token.user_id)
        .bind(&token.token)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn consume_reset_token(&self, token: &str) -> AuthResult<Option<PasswordResetToken>> {
        // ---
        // DELETE ... RETURNING is the consumption point: of any number of
        // concurrent consumers, exactly one gets the row back.
        let row = sqlx::query_as::<_, ResetTokenRow>(
            "DELETE FROM password_reset_tokens WHERE token = $1
             RETURNING user_id, token, expires_at",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| PasswordResetToken {
            user_id: r.user_id,
            token: r.token,
            expires_at: r.expires_at,
        }))
    }
}
