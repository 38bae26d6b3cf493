use crate::{
    api::{message::notify, paginate, parse_filter, require_text},
    auth::auth::AuthUser,
    db::Db,
    error::ApiError,
    model::{
        contract::{Contract, ContractStatus, ContractType},
        message::{MessageCategory, Sender},
    },
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateContract {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2026 Employment Agreement")]
    pub title: String,
    pub contract_type: ContractType,
    #[schema(example = "The parties agree ...")]
    pub content: String,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-12-31", format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    #[schema(example = 48000000)]
    pub annual_salary: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct SignContract {
    #[schema(example = "Mina Park")]
    pub signature: String,
}

#[derive(Deserialize, IntoParams)]
pub struct ContractQuery {
    /// Filter by employee ID (HR/Admin only)
    pub employee_id: Option<u64>,
    /// PENDING or SIGNED
    pub status: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ContractListResponse {
    pub data: Vec<Contract>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 2)]
    pub total: i64,
}

#[utoipa::path(
    post,
    path = "/api/contracts",
    request_body = CreateContract,
    responses(
        (status = 201, description = "Contract sent", body = Contract),
        (status = 400, description = "Missing title/content or invalid dates"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Contract"
)]
pub async fn create_contract(
    auth: AuthUser,
    db: web::Data<Db>,
    payload: web::Json<CreateContract>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let payload = payload.into_inner();

    require_text("title", &payload.title)?;
    require_text("content", &payload.content)?;
    if payload.end_date.is_some_and(|end| end < payload.start_date) {
        return Err(ApiError::bad_request("end_date cannot be before start_date").into());
    }
    if db.employees.get(payload.employee_id).await?.is_none() {
        return Err(ApiError::not_found("Employee not found").into());
    }

    let contract = db
        .contracts
        .insert(Contract {
            id: 0,
            employee_id: payload.employee_id,
            title: payload.title.trim().to_string(),
            contract_type: payload.contract_type,
            content: payload.content,
            start_date: payload.start_date,
            end_date: payload.end_date,
            annual_salary: payload.annual_salary,
            status: ContractStatus::Pending,
            sent_at: Utc::now(),
            signed_at: None,
            signature: None,
        })
        .await?;

    info!(contract_id = contract.id, employee_id = contract.employee_id, "Contract sent");

    notify(
        db.get_ref(),
        contract.employee_id,
        Sender::Admin,
        MessageCategory::Contract,
        "Contract to sign",
        format!("Please review and sign \"{}\".", contract.title),
        Some(contract.id),
    )
    .await;

    Ok(HttpResponse::Created().json(contract))
}

#[utoipa::path(
    get,
    path = "/api/contracts",
    params(ContractQuery),
    responses(
        (status = 200, description = "Contracts, newest first", body = ContractListResponse),
        (status = 400, description = "Invalid status filter")
    ),
    security(("bearer_auth" = [])),
    tag = "Contract"
)]
pub async fn list_contracts(
    auth: AuthUser,
    db: web::Data<Db>,
    query: web::Query<ContractQuery>,
) -> actix_web::Result<impl Responder> {
    let status: Option<ContractStatus> = parse_filter("status", query.status.as_deref())?;
    let employee_id = if auth.role.is_staff() {
        query.employee_id
    } else {
        Some(auth.employee_id()?)
    };

    let mut contracts = db
        .contracts
        .find(|c| {
            employee_id.is_none_or(|id| c.employee_id == id)
                && status.is_none_or(|s| c.status == s)
        })
        .await?;
    contracts.sort_by(|a, b| b.id.cmp(&a.id));

    let page = paginate(contracts, query.page, query.per_page);
    Ok(HttpResponse::Ok().json(ContractListResponse {
        data: page.data,
        page: page.page,
        per_page: page.per_page,
        total: page.total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/contracts/{id}",
    params(("id" = u64, Path, description = "Contract ID")),
    responses(
        (status = 200, description = "Contract", body = Contract),
        (status = 404, description = "Contract not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Contract"
)]
pub async fn get_contract(
    auth: AuthUser,
    db: web::Data<Db>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    match db.contracts.get(path.into_inner()).await? {
        Some(c) if auth.can_view(c.employee_id) => Ok(HttpResponse::Ok().json(c)),
        _ => Err(ApiError::not_found("Contract not found").into()),
    }
}

/// Only the employee the contract was sent to can sign it.
#[utoipa::path(
    put,
    path = "/api/contracts/{id}/sign",
    request_body = SignContract,
    params(("id" = u64, Path, description = "Contract ID")),
    responses(
        (status = 200, description = "Contract signed", body = Contract),
        (status = 400, description = "Blank signature or already signed"),
        (status = 404, description = "Contract not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Contract"
)]
pub async fn sign_contract(
    auth: AuthUser,
    db: web::Data<Db>,
    path: web::Path<u64>,
    payload: web::Json<SignContract>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;
    let id = path.into_inner();
    let signature = payload.into_inner().signature;
    require_text("signature", &signature)?;

    let signed = db
        .contracts
        .update(id, |c| {
            if c.employee_id != employee_id {
                return Err(ApiError::not_found("Contract not found"));
            }
            if !c.sign(&signature, Utc::now()) {
                return Err(ApiError::bad_request("Contract already signed"));
            }
            Ok(())
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Contract not found"))?;

    info!(contract_id = id, employee_id, "Contract signed");

    notify(
        db.get_ref(),
        employee_id,
        Sender::Employee,
        MessageCategory::Contract,
        "Contract signed",
        format!("\"{}\" was signed by {}.", signed.title, signature.trim()),
        Some(signed.id),
    )
    .await;

    Ok(HttpResponse::Ok().json(signed))
}
