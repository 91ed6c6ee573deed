use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tracing::{error, warn};
use uuid::Uuid;

use super::{
    identity::{AuthFailure, Identity, IdentityProvider},
    password::{hash_password, verify_password},
};

/// Credential row for the self-hosted identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Credential {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub created_at: OffsetDateTime,
}

impl Credential {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<Credential>> {
        let row = sqlx::query_as::<_, Credential>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM credentials
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn create(db: &PgPool, email: &str, password_hash: &str) -> anyhow::Result<Credential> {
        let row = sqlx::query_as::<_, Credential>(
            r#"
            INSERT INTO credentials (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(row)
    }
}

/// Postgres-backed identity provider for deployments without a hosted one.
pub struct LocalIdentity {
    db: PgPool,
}

impl LocalIdentity {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn backend(e: anyhow::Error) -> AuthFailure {
    error!(error = %e, "local identity backend failed");
    AuthFailure::Provider(e.to_string())
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthFailure> {
        let email = email.trim().to_lowercase();
        if Credential::find_by_email(&self.db, &email)
            .await
            .map_err(backend)?
            .is_some()
        {
            warn!(email = %email, "email already registered");
            return Err(AuthFailure::AlreadyRegistered);
        }

        let hash = hash_password(password).map_err(backend)?;
        let cred = Credential::create(&self.db, &email, &hash)
            .await
            .map_err(backend)?;
        Ok(Identity {
            id: cred.id,
            email: cred.email,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthFailure> {
        let email = email.trim().to_lowercase();
        let cred = match Credential::find_by_email(&self.db, &email)
            .await
            .map_err(backend)?
        {
            Some(c) => c,
            None => {
                warn!(email = %email, "login unknown email");
                return Err(AuthFailure::UnknownAccount);
            }
        };

        if !verify_password(password, &cred.password_hash).map_err(backend)? {
            warn!(email = %email, user_id = %cred.id, "login invalid password");
            return Err(AuthFailure::WrongCredential);
        }

        Ok(Identity {
            id: cred.id,
            email: cred.email,
        })
    }
}
