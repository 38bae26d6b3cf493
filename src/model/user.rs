use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::role::Role;
use crate::store::Record;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl Record for User {
    const KEY: &'static str = "users";

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: u64,
    pub user_id: u64,
    pub jti: String,
    /// unix seconds
    pub expires_at: i64,
    pub revoked: bool,
}

impl Record for RefreshToken {
    const KEY: &'static str = "refresh_tokens";

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}
