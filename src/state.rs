use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    auth::{firebase::FirebaseIdentity, identity::IdentityProvider, local::LocalIdentity},
    config::{AppConfig, IdentityConfig},
    dashboard::repo::DashboardStore,
    db::PgStore,
    images::{CloudinaryHost, ImageHost},
    payments::{
        gateway::{create_gateway, PaymentGateway},
        repo::PaymentStore,
    },
    profiles::repo::ProfileStore,
    storage::{S3Storage, StorageClient},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub profiles: Arc<dyn ProfileStore>,
    pub payments: Arc<dyn PaymentStore>,
    pub dashboard: Arc<dyn DashboardStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub storage: Arc<dyn StorageClient>,
    pub images: Arc<dyn ImageHost>,
}

impl AppState {
    pub async fn init(config: AppConfig, db: PgPool) -> anyhow::Result<Self> {
        let store = Arc::new(PgStore::new(db.clone()));

        let (identity, identity_kind) = match &config.identity {
            IdentityConfig::Local => (
                Arc::new(LocalIdentity::new(db)) as Arc<dyn IdentityProvider>,
                "local",
            ),
            IdentityConfig::Firebase { api_key } => (
                Arc::new(FirebaseIdentity::new(api_key.clone())?) as Arc<dyn IdentityProvider>,
                "firebase",
            ),
        };

        // Real S3/MinIO
        let storage = Arc::new(S3Storage::from_config(&config.storage).await?) as Arc<dyn StorageClient>;
        let images = Arc::new(CloudinaryHost::new(&config.images)?) as Arc<dyn ImageHost>;
        let gateway = create_gateway(&config.gateway)?;

        tracing::info!(
            gateway = gateway.name(),
            identity = identity_kind,
            "collaborators configured"
        );

        Ok(Self {
            config: Arc::new(config),
            profiles: store.clone(),
            payments: store.clone(),
            dashboard: store,
            identity,
            gateway,
            storage,
            images,
        })
    }

    /// In-memory state for tests; no network or database.
    #[cfg(test)]
    pub fn fake() -> Self {
        crate::testing::Fakes::new().state()
    }
}
