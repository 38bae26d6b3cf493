use crate::{
    api::{paginate, parse_filter, require_text},
    auth::auth::AuthUser,
    db::Db,
    error::ApiError,
    model::employee::{Employee, EmployeeStatus},
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "EMP-001")]
    pub employee_code: String,
    #[schema(example = "Mina")]
    pub first_name: String,
    #[schema(example = "Park")]
    pub last_name: String,
    #[schema(example = "mina.park@company.com", format = "email")]
    pub email: String,
    #[schema(example = "+82-10-1234-5678")]
    pub phone: Option<String>,
    #[schema(example = "Engineering")]
    pub department: String,
    #[schema(example = "Backend Developer")]
    pub position: String,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub hire_date: NaiveDate,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EmployeeQuery {
    /// Page number (1-based)
    pub page: Option<u64>,
    /// Items per page
    pub per_page: Option<u64>,
    /// Exact department name
    pub department: Option<String>,
    /// ACTIVE or INACTIVE
    pub status: Option<String>,
    /// Search by name, email or employee code
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateEmployee {
    pub employee_code: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub status: Option<EmployeeStatus>,
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub hire_date: Option<NaiveDate>,
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((user, domain)) if !user.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ApiError::bad_request("Invalid email")),
    }
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employee",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Missing or invalid field"),
        (status = 409, description = "Employee code already in use")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    auth: AuthUser,
    db: web::Data<Db>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let payload = payload.into_inner();
    require_text("employee_code", &payload.employee_code)?;
    require_text("first_name", &payload.first_name)?;
    require_text("department", &payload.department)?;
    require_text("position", &payload.position)?;
    validate_email(&payload.email)?;

    let code = payload.employee_code.trim().to_string();
    let employee = Employee {
        id: 0,
        employee_code: code.clone(),
        first_name: payload.first_name.trim().to_string(),
        last_name: payload.last_name.trim().to_string(),
        email: payload.email.trim().to_string(),
        phone: payload.phone.filter(|p| !p.trim().is_empty()),
        department: payload.department.trim().to_string(),
        position: payload.position.trim().to_string(),
        hire_date: payload.hire_date,
        status: EmployeeStatus::Active,
        created_at: Utc::now(),
    };

    let created = db
        .employees
        .insert_with(|all| {
            if all.iter().any(|e| e.employee_code.eq_ignore_ascii_case(&code)) {
                return Err(ApiError::conflict("Employee code already in use"));
            }
            Ok(employee)
        })
        .await?;

    info!(employee_id = created.id, code = %created.employee_code, "Employee created");
    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    get,
    path = "/api/employee",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse),
        (status = 400, description = "Invalid status filter")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    auth: AuthUser,
    db: web::Data<Db>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let status: Option<EmployeeStatus> = parse_filter("status", query.status.as_deref())?;
    let department = query.department.as_deref().map(str::trim);
    let search = query.search.as_deref().unwrap_or("");

    let mut employees = db
        .employees
        .find(|e| {
            status.is_none_or(|s| e.status == s)
                && department.is_none_or(|d| e.department.eq_ignore_ascii_case(d))
                && e.matches_search(search)
        })
        .await?;
    employees.sort_by(|a, b| b.id.cmp(&a.id));

    debug!(matched = employees.len(), "Listing employees");

    let page = paginate(employees, query.page, query.per_page);
    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: page.data,
        page: page.page,
        per_page: page.per_page,
        total: page.total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/employee/{id}",
    params(("id" = u64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 403, description = "Not your profile"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    auth: AuthUser,
    db: web::Data<Db>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();
    if !auth.can_view(id) {
        return Err(ApiError::forbidden("HR/Admin only").into());
    }

    match db.employees.get(id).await? {
        Some(employee) => Ok(HttpResponse::Ok().json(employee)),
        None => Err(ApiError::not_found("Employee not found").into()),
    }
}

#[utoipa::path(
    put,
    path = "/api/employee/{id}",
    request_body = UpdateEmployee,
    params(("id" = u64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "Invalid field"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Employee code already in use")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    auth: AuthUser,
    db: web::Data<Db>,
    path: web::Path<u64>,
    payload: web::Json<UpdateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let id = path.into_inner();
    let changes = payload.into_inner();

    if let Some(email) = &changes.email {
        validate_email(email)?;
    }
    for (field, value) in [
        ("employee_code", &changes.employee_code),
        ("first_name", &changes.first_name),
        ("department", &changes.department),
        ("position", &changes.position),
    ] {
        if let Some(v) = value {
            require_text(field, v)?;
        }
    }

    let updated = db
        .employees
        .update_with(id, |all, e| {
            if let Some(code) = changes.employee_code.as_deref().map(str::trim) {
                if all
                    .iter()
                    .any(|o| o.id != id && o.employee_code.eq_ignore_ascii_case(code))
                {
                    return Err(ApiError::conflict("Employee code already in use"));
                }
            }
            if let Some(v) = changes.employee_code {
                e.employee_code = v.trim().to_string();
            }
            if let Some(v) = changes.first_name {
                e.first_name = v.trim().to_string();
            }
            if let Some(v) = changes.last_name {
                e.last_name = v.trim().to_string();
            }
            if let Some(v) = changes.email {
                e.email = v.trim().to_string();
            }
            if let Some(v) = changes.phone {
                e.phone = Some(v).filter(|p| !p.trim().is_empty());
            }
            if let Some(v) = changes.department {
                e.department = v.trim().to_string();
            }
            if let Some(v) = changes.position {
                e.position = v.trim().to_string();
            }
            if let Some(v) = changes.status {
                e.status = v;
            }
            if let Some(v) = changes.hire_date {
                e.hire_date = v;
            }
            Ok::<_, ApiError>(())
        })
        .await?;

    match updated {
        Some(employee) => {
            info!(employee_id = id, user_id = auth.user_id, "Employee updated");
            Ok(HttpResponse::Ok().json(employee))
        }
        None => Err(ApiError::not_found("Employee not found").into()),
    }
}
