use crate::config::Config;
use crate::error::ApiError;
use crate::model::message::Inbox;
use crate::{model::role::Role, models::TokenType};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data};
use futures::future::{Ready, ready};

use super::jwt::verify_token;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // already resolved by auth_middleware
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(actix_web::error::ErrorInternalServerError(
                    "Config missing",
                )));
            }
        };

        let claims = match verify_token(token, &config.jwt_secret) {
            Ok(c) if c.token_type == TokenType::Access => c,
            _ => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        let role = match Role::from_id(claims.role) {
            Some(r) => r,
            None => return ready(Err(ErrorUnauthorized("Invalid role"))),
        };

        ready(Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
            employee_id: claims.employee_id,
        }))
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::forbidden("Admin only"))
        }
    }

    pub fn require_hr_or_admin(&self) -> Result<(), ApiError> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(ApiError::forbidden("HR/Admin only"))
        }
    }

    /// The linked employee record, required for self-service endpoints.
    pub fn employee_id(&self) -> Result<u64, ApiError> {
        self.employee_id
            .ok_or_else(|| ApiError::forbidden("No employee profile"))
    }

    /// Staff see every record; employees only their own.
    pub fn can_view(&self, owner_employee_id: u64) -> bool {
        self.role.is_staff() || self.employee_id == Some(owner_employee_id)
    }

    /// Which side of the messaging system this user reads.
    pub fn inbox(&self) -> Result<Inbox, ApiError> {
        if self.role.is_staff() {
            Ok(Inbox::Admin)
        } else {
            self.employee_id().map(Inbox::Employee)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, employee_id: Option<u64>) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "u".into(),
            role,
            employee_id,
        }
    }

    #[test]
    fn guards() {
        assert!(user(Role::Admin, None).require_admin().is_ok());
        assert!(user(Role::Hr, None).require_admin().is_err());
        assert!(user(Role::Hr, None).require_hr_or_admin().is_ok());
        assert!(user(Role::Employee, Some(3)).require_hr_or_admin().is_err());
    }

    #[test]
    fn visibility_and_inbox() {
        let emp = user(Role::Employee, Some(3));
        assert!(emp.can_view(3));
        assert!(!emp.can_view(4));
        assert_eq!(emp.inbox().unwrap(), Inbox::Employee(3));

        let hr = user(Role::Hr, None);
        assert!(hr.can_view(4));
        assert_eq!(hr.inbox().unwrap(), Inbox::Admin);

        assert!(user(Role::Employee, None).inbox().is_err());
    }
}
