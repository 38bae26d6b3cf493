use std::sync::Arc;

use anyhow::{Context, anyhow};
use chrono::Utc;
use tracing::info;

use crate::auth::password::hash_password;
use crate::config::{Config, StorageBackend};
use crate::model::{
    attendance::Attendance, certificate::CertificateRequest, contract::Contract,
    document_request::DocumentRequest, employee::Employee, leave_request::LeaveRequest,
    message::Message, role::Role, user::RefreshToken, user::User,
};
use crate::store::{BlobStore, Collection};
use crate::utils::{username_cache, username_filter};

/// Every record collection, shared with handlers as `web::Data<Db>`.
pub struct Db {
    pub users: Collection<User>,
    pub refresh_tokens: Collection<RefreshToken>,
    pub employees: Collection<Employee>,
    pub attendance: Collection<Attendance>,
    pub leave_requests: Collection<LeaveRequest>,
    pub certificates: Collection<CertificateRequest>,
    pub contracts: Collection<Contract>,
    pub document_requests: Collection<DocumentRequest>,
    pub messages: Collection<Message>,
}

impl Db {
    pub fn new(store: BlobStore) -> Self {
        let store = Arc::new(store);
        Self {
            users: Collection::new(store.clone()),
            refresh_tokens: Collection::new(store.clone()),
            employees: Collection::new(store.clone()),
            attendance: Collection::new(store.clone()),
            leave_requests: Collection::new(store.clone()),
            certificates: Collection::new(store.clone()),
            contracts: Collection::new(store.clone()),
            document_requests: Collection::new(store.clone()),
            messages: Collection::new(store),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(BlobStore::memory())
    }
}

pub async fn init_db(config: &Config) -> anyhow::Result<Db> {
    let store = match config.storage_backend {
        StorageBackend::Memory => BlobStore::memory(),
        StorageBackend::File => BlobStore::file(&config.data_dir)
            .with_context(|| format!("failed to open data dir {}", config.data_dir.display()))?,
        StorageBackend::Mysql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            BlobStore::mysql(url)
                .await
                .context("Failed to connect to database")?
        }
    };

    let db = Db::new(store);
    seed_admin(&db, config).await?;
    Ok(db)
}

/// Creates the initial admin account when there are no users yet.
async fn seed_admin(db: &Db, config: &Config) -> anyhow::Result<()> {
    if db.users.len().await? > 0 {
        return Ok(());
    }

    let Some(password) = config.admin_password.as_deref() else {
        tracing::warn!("No users and ADMIN_PASSWORD unset; nobody can log in as admin");
        return Ok(());
    };

    let username = config.admin_username.trim().to_lowercase();
    let password_hash =
        hash_password(password).map_err(|e| anyhow!("failed to hash admin password: {e}"))?;

    db.users
        .insert(User {
            id: 0,
            username: username.clone(),
            password_hash,
            role: Role::Admin,
            employee_id: None,
            created_at: Utc::now(),
            last_login_at: None,
        })
        .await?;

    username_filter::insert(&username);
    username_cache::mark_taken(&username).await;

    info!(username = %username, "Seeded admin account");
    Ok(())
}
