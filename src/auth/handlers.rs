use crate::{
    auth::{
        auth::AuthUser,
        jwt::{Subject, generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    db::Db,
    error::ApiError,
    model::{
        role::Role,
        user::{RefreshToken, User},
    },
    models::{Claims, LoginReqDto, TokenPair, TokenType, UserReq},
};
use actix_web::{HttpRequest, HttpResponse, Responder, get, web};
use chrono::Utc;
use serde_json::json;
use tracing::{debug, error, info, instrument};

use crate::utils::username_cache;
use crate::utils::username_filter;

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// true  => username AVAILABLE
/// false => username TAKEN
pub async fn is_username_available(username: &str, db: &Db) -> Result<bool, ApiError> {
    let username = username.trim().to_lowercase();

    // 1. cuckoo filter: a miss means definitely free
    if !username_filter::might_exist(&username) {
        return Ok(true);
    }

    // 2. moka cache: a hit means definitely taken
    if username_cache::is_taken(&username).await {
        return Ok(false);
    }

    // 3. store fallback
    let exists = db
        .users
        .find_one(|u| u.username == username)
        .await?
        .is_some();

    if exists {
        username_cache::mark_taken(&username).await;
    }

    Ok(!exists)
}

/// Issues an access/refresh pair and remembers the refresh jti.
async fn issue_tokens(db: &Db, config: &Config, subject: &Subject) -> Result<TokenPair, ApiError> {
    let access_token = generate_access_token(subject, &config.jwt_secret, config.access_token_ttl)
        .map_err(|e| {
            error!(error = %e, "Failed to sign access token");
            ApiError::Internal
        })?;

    let (refresh_token, refresh_claims) =
        generate_refresh_token(subject, &config.jwt_secret, config.refresh_token_ttl).map_err(
            |e| {
                error!(error = %e, "Failed to sign refresh token");
                ApiError::Internal
            },
        )?;

    debug!(user_id = subject.user_id, jti = %refresh_claims.jti, "Storing refresh token");

    // drop rows that can no longer be used
    let now = Utc::now().timestamp();
    db.refresh_tokens
        .insert_retaining(
            |t| !t.revoked && t.expires_at >= now,
            RefreshToken {
                id: 0,
                user_id: subject.user_id,
                jti: refresh_claims.jti,
                expires_at: refresh_claims.exp as i64,
                revoked: false,
            },
        )
        .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// User registration handler
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = UserReq,
    responses(
        (status = 201, description = "User registered", body = Object, example = json!({
            "message": "User registered successfully"
        })),
        (status = 400, description = "Empty username or password"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Username taken or employee already linked")
    ),
    tag = "Auth"
)]
pub async fn register(
    user: web::Json<UserReq>,
    db: web::Data<Db>,
) -> actix_web::Result<impl Responder> {
    let username = user.username.trim().to_lowercase();
    let password = &user.password;

    if username.is_empty() || password.is_empty() {
        return Err(ApiError::bad_request("Username and password must not be empty").into());
    }

    if !is_username_available(&username, db.get_ref()).await? {
        return Err(ApiError::conflict("Username already taken").into());
    }

    if let Some(employee_id) = user.employee_id {
        if db.employees.get(employee_id).await?.is_none() {
            return Err(ApiError::not_found("Employee not found").into());
        }
    }

    let password_hash = hash_password(password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        ApiError::Internal
    })?;

    let employee_id = user.employee_id;
    let record = User {
        id: 0,
        username: username.clone(),
        password_hash,
        role: Role::Employee,
        employee_id,
        created_at: Utc::now(),
        last_login_at: None,
    };

    // re-checked under the write lock so two racing registrations can't both win
    db.users
        .insert_with(|users| {
            if users.iter().any(|u| u.username == username) {
                return Err(ApiError::conflict("Username already exists"));
            }
            if employee_id.is_some() && users.iter().any(|u| u.employee_id == employee_id) {
                return Err(ApiError::conflict("Employee already has an account"));
            }
            Ok(record)
        })
        .await?;

    username_filter::insert(&username);
    username_cache::mark_taken(&username).await;
    info!(username = %username, "User registered");

    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully"
    })))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = TokenPair),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(db, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    db: web::Data<Db>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(ApiError::bad_request("Username or password required").into());
    }

    let username = user.username.trim().to_lowercase();

    let Some(stored) = db.users.find_one(|u| u.username == username).await? else {
        info!("Invalid credentials: user not found");
        return Err(ApiError::Unauthorized("Invalid credentials".into()).into());
    };
    debug!(user_id = stored.id, "User found");

    if let Err(e) = verify_password(&user.password, &stored.password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(ApiError::Unauthorized("Invalid credentials".into()).into());
    }

    let subject = Subject {
        user_id: stored.id,
        username: stored.username.clone(),
        role: stored.role.id(),
        employee_id: stored.employee_id,
    };
    let tokens = issue_tokens(db.get_ref(), config.get_ref(), &subject).await?;

    // not fatal for the login itself
    if let Err(e) = db
        .users
        .update(stored.id, |u| {
            u.last_login_at = Some(Utc::now());
            Ok::<_, crate::store::StoreError>(())
        })
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }
    username_cache::mark_taken(&stored.username).await;

    info!("Login successful");
    Ok(HttpResponse::Ok().json(tokens))
}

#[get("/protected")]
pub async fn protected(auth: AuthUser) -> impl Responder {
    HttpResponse::Ok().body(auth.username)
}

fn refresh_claims(req: &HttpRequest, config: &Config) -> Option<Claims> {
    let claims = verify_token(bearer(req)?, &config.jwt_secret).ok()?;
    (claims.token_type == TokenType::Refresh).then_some(claims)
}

/// Rotates a refresh token: the presented one is revoked and a new pair issued.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Missing, invalid, revoked or non-refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    db: web::Data<Db>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let unauthorized = || ApiError::Unauthorized("Invalid token".into());

    let claims = refresh_claims(&req, config.get_ref()).ok_or_else(unauthorized)?;

    let Some(record) = db
        .refresh_tokens
        .find_one(|t| t.jti == claims.jti && !t.revoked)
        .await?
    else {
        return Err(unauthorized().into());
    };

    // revoke old refresh token; losing a race here means someone else rotated it
    let revoked = db
        .refresh_tokens
        .update(record.id, |t| {
            if t.revoked {
                return Err(ApiError::Unauthorized("Invalid token".into()));
            }
            t.revoked = true;
            Ok(())
        })
        .await?;
    if revoked.is_none() {
        return Err(unauthorized().into());
    }

    // the user may have been re-linked since the token was issued
    let Some(user) = db.users.get(record.user_id).await? else {
        return Err(unauthorized().into());
    };

    let subject = Subject {
        user_id: user.id,
        username: user.username,
        role: user.role.id(),
        employee_id: user.employee_id,
    };
    let tokens = issue_tokens(db.get_ref(), config.get_ref(), &subject).await?;

    Ok(HttpResponse::Ok().json(tokens))
}

/// Revokes the presented refresh token. Always answers 204.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Logged out")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    db: web::Data<Db>,
    config: web::Data<Config>,
) -> impl Responder {
    if let Some(claims) = refresh_claims(&req, config.get_ref()) {
        if let Err(e) = db
            .refresh_tokens
            .update_where(|t| t.jti == claims.jti, |t| t.revoked = true)
            .await
        {
            error!(error = %e, "Failed to revoke refresh token");
        }
    }

    HttpResponse::NoContent().finish()
}
