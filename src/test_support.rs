//! Shared fixtures for handler tests: an in-memory app with a signed-in admin.

use std::net::SocketAddr;
use std::path::PathBuf;

use actix_web::{
    App,
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    test::TestRequest,
    web,
};
use chrono::{NaiveDate, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::auth::jwt::{Subject, generate_access_token};
use crate::config::{Config, StorageBackend, WorkPolicy};
use crate::db::Db;
use crate::model::employee::{Employee, EmployeeStatus};
use crate::model::role::Role;
use crate::model::user::User;
use crate::routes;

pub const TEST_SECRET: &str = "test-secret";

pub fn test_config() -> Config {
    Config {
        jwt_secret: TEST_SECRET.to_string(),
        server_addr: "127.0.0.1:0".to_string(),
        access_token_ttl: 900,
        refresh_token_ttl: 3600,
        rate_login_per_min: 10_000,
        rate_register_per_min: 10_000,
        rate_refresh_per_min: 10_000,
        rate_protected_per_min: 10_000,
        api_prefix: "/api".to_string(),
        storage_backend: StorageBackend::Memory,
        data_dir: PathBuf::from("data"),
        database_url: None,
        admin_username: "admin".to_string(),
        admin_password: None,
        work_policy: WorkPolicy::default(),
        log_dir: PathBuf::from("logs"),
    }
}

pub struct TestApp {
    pub db: web::Data<Db>,
    pub config: web::Data<Config>,
    pub admin_token: String,
}

impl TestApp {
    pub async fn start() -> Self {
        let db = web::Data::new(Db::in_memory());
        let config = web::Data::new(test_config());

        let admin = db
            .users
            .insert(User {
                id: 0,
                username: format!("admin-{}", Uuid::new_v4()),
                password_hash: String::new(),
                role: Role::Admin,
                employee_id: None,
                created_at: Utc::now(),
                last_login_at: None,
            })
            .await
            .unwrap();

        let admin_token = token_for(&config, &admin);
        Self {
            db,
            config,
            admin_token,
        }
    }

    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody + use<>>,
            Error = actix_web::Error,
            InitError = (),
        > + use<>,
    > {
        let config = self.config.get_ref().clone();
        App::new()
            .app_data(self.db.clone())
            .app_data(self.config.clone())
            .configure(move |cfg| routes::configure(cfg, config))
    }

    /// Inserts an active employee plus a linked login; returns its id and
    /// an access token.
    pub async fn employee(&self, first_name: &str) -> (u64, String) {
        let code = format!("EMP-{}", Uuid::new_v4());
        let employee = self
            .db
            .employees
            .insert(Employee {
                id: 0,
                employee_code: code,
                first_name: first_name.to_string(),
                last_name: "Test".to_string(),
                email: format!("{}@company.com", first_name.to_lowercase()),
                phone: None,
                department: "Engineering".to_string(),
                position: "Developer".to_string(),
                hire_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                status: EmployeeStatus::Active,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let user = self
            .db
            .users
            .insert(User {
                id: 0,
                username: format!("{}-{}", first_name.to_lowercase(), Uuid::new_v4()),
                password_hash: String::new(),
                role: Role::Employee,
                employee_id: Some(employee.id),
                created_at: Utc::now(),
                last_login_at: None,
            })
            .await
            .unwrap();

        (employee.id, token_for(&self.config, &user))
    }

    /// A token for an Hr user with no employee profile.
    pub async fn hr_token(&self) -> String {
        let hr = self
            .db
            .users
            .insert(User {
                id: 0,
                username: format!("hr-{}", Uuid::new_v4()),
                password_hash: String::new(),
                role: Role::Hr,
                employee_id: None,
                created_at: Utc::now(),
                last_login_at: None,
            })
            .await
            .unwrap();
        token_for(&self.config, &hr)
    }

    pub fn get(&self, path: &str, token: &str) -> TestRequest {
        authed(TestRequest::get().uri(path), token)
    }

    pub fn post(&self, path: &str, token: &str) -> TestRequest {
        authed(TestRequest::post().uri(path), token)
    }

    pub fn put(&self, path: &str, token: &str) -> TestRequest {
        authed(TestRequest::put().uri(path), token)
    }

    pub fn delete(&self, path: &str, token: &str) -> TestRequest {
        authed(TestRequest::delete().uri(path), token)
    }
}

/// The governor keys on the peer address, so every request needs one.
pub fn peer() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn authed(req: TestRequest, token: &str) -> TestRequest {
    req.peer_addr(peer())
        .insert_header(("Authorization", format!("Bearer {token}")))
}

fn token_for(config: &Config, user: &User) -> String {
    let subject = Subject {
        user_id: user.id,
        username: user.username.clone(),
        role: user.role.id(),
        employee_id: user.employee_id,
    };
    generate_access_token(&subject, &config.jwt_secret, config.access_token_ttl).unwrap()
}

pub fn employee_payload(code: &str, first_name: &str) -> serde_json::Value {
    json!({
        "employee_code": code,
        "first_name": first_name,
        "last_name": "Park",
        "email": format!("{}@company.com", first_name.to_lowercase()),
        "phone": null,
        "department": "Engineering",
        "position": "Backend Developer",
        "hire_date": "2024-01-01"
    })
}
