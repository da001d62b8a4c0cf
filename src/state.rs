use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::{Argon2Scheme, CredentialService, PasswordScheme, SeaOrmCredentialService};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub credentials: Arc<dyn CredentialService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let passwords: Arc<dyn PasswordScheme> =
            Arc::new(Argon2Scheme::from_config(&config.security)?);

        let credentials = Arc::new(SeaOrmCredentialService::new(store.clone(), passwords))
            as Arc<dyn CredentialService + Send + Sync + 'static>;

        Ok(Self {
            config: Arc::new(config),
            store,
            credentials,
        })
    }
}
