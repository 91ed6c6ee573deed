use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub enum IdentityConfig {
    Local,
    Firebase { api_key: String },
}

#[derive(Debug, Clone, Deserialize)]
pub enum GatewayConfig {
    Paystack {
        public_key: String,
        secret_key: String,
        base_url: String,
    },
    Dummy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageHostConfig {
    pub cloud_name: String,
    pub upload_preset: String,
}

/// Institution-specific knobs and the timing of background work.
#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    pub email_domain: String,
    pub department: String,
    pub session_resolve_timeout: Duration,
    pub reconcile_interval: Duration,
    pub reconcile_grace: Duration,
    pub reconcile_expire: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub identity: IdentityConfig,
    pub gateway: GatewayConfig,
    pub storage: StorageConfig,
    pub images: ImageHostConfig,
    pub portal: PortalConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = required("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "duesportal".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "duesportal-users".into()),
            ttl_minutes: parsed("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: parsed("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };

        let identity = match std::env::var("IDENTITY_PROVIDER")
            .unwrap_or_else(|_| "local".into())
            .to_lowercase()
            .as_str()
        {
            "local" => IdentityConfig::Local,
            "firebase" => IdentityConfig::Firebase {
                api_key: required("FIREBASE_API_KEY")?,
            },
            other => anyhow::bail!("unknown IDENTITY_PROVIDER {other:?}"),
        };

        let gateway = match std::env::var("PAYMENT_GATEWAY")
            .unwrap_or_else(|_| "dummy".into())
            .to_lowercase()
            .as_str()
        {
            "dummy" => GatewayConfig::Dummy,
            "paystack" => GatewayConfig::Paystack {
                public_key: required("PAYSTACK_PUBLIC_KEY")?,
                secret_key: required("PAYSTACK_SECRET_KEY")?,
                base_url: std::env::var("PAYSTACK_BASE_URL")
                    .unwrap_or_else(|_| "https://api.paystack.co".into()),
            },
            other => anyhow::bail!("unknown PAYMENT_GATEWAY {other:?}"),
        };

        let storage = StorageConfig {
            endpoint: required("MINIO_ENDPOINT")?,
            bucket: required("MINIO_BUCKET")?,
            access_key: required("MINIO_ACCESS_KEY")?,
            secret_key: required("MINIO_SECRET_KEY")?,
        };

        let images = ImageHostConfig {
            cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
            upload_preset: required("CLOUDINARY_UPLOAD_PRESET")?,
        };

        let portal = PortalConfig {
            email_domain: std::env::var("PORTAL_EMAIL_DOMAIN")
                .unwrap_or_else(|_| "cs.unn.edu.ng".into()),
            department: std::env::var("PORTAL_DEPARTMENT")
                .unwrap_or_else(|_| "Computer Science".into()),
            session_resolve_timeout: Duration::from_millis(parsed(
                "SESSION_RESOLVE_TIMEOUT_MS",
                3_000,
            )),
            reconcile_interval: Duration::from_secs(parsed("RECONCILE_INTERVAL_SECS", 60)),
            reconcile_grace: Duration::from_secs(parsed("RECONCILE_GRACE_SECS", 120)),
            reconcile_expire: Duration::from_secs(parsed("RECONCILE_EXPIRE_SECS", 86_400)),
        };

        Ok(Self {
            database_url,
            jwt,
            identity,
            gateway,
            storage,
            images,
            portal,
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    std::env::var(key).with_context(|| format!("missing environment variable {key}"))
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
