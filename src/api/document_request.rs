use crate::{
    api::{message::notify, paginate, parse_filter, require_text, today},
    auth::auth::AuthUser,
    db::Db,
    error::ApiError,
    model::{
        document_request::{DocumentRequest, DocumentStatus, DocumentType},
        message::{MessageCategory, Sender},
    },
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateDocumentRequest {
    #[schema(example = 1000)]
    pub employee_id: u64,
    pub document_type: DocumentType,
    #[schema(example = "Needed for payroll setup")]
    pub note: Option<String>,
    #[schema(example = "2026-02-01", format = "date", value_type = Option<String>)]
    pub due_date: Option<NaiveDate>,
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitDocument {
    #[schema(example = "bank_account.pdf")]
    pub file_name: String,
    pub note: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct DocumentQuery {
    /// Filter by employee ID (HR/Admin only)
    pub employee_id: Option<u64>,
    /// PENDING or SUBMITTED
    pub status: Option<String>,
    /// Only pending requests past their due date
    pub overdue: Option<bool>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DocumentListResponse {
    pub data: Vec<DocumentRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 5)]
    pub total: i64,
}

#[utoipa::path(
    post,
    path = "/api/documents",
    request_body = CreateDocumentRequest,
    responses(
        (status = 201, description = "Document requested", body = DocumentRequest),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Document"
)]
pub async fn create_document_request(
    auth: AuthUser,
    db: web::Data<Db>,
    payload: web::Json<CreateDocumentRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let payload = payload.into_inner();

    if db.employees.get(payload.employee_id).await?.is_none() {
        return Err(ApiError::not_found("Employee not found").into());
    }

    let request = db
        .document_requests
        .insert(DocumentRequest {
            id: 0,
            employee_id: payload.employee_id,
            document_type: payload.document_type,
            note: payload
                .note
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            due_date: payload.due_date,
            status: DocumentStatus::Pending,
            file_name: None,
            submitted_note: None,
            requested_at: Utc::now(),
            submitted_at: None,
        })
        .await?;

    info!(document_id = request.id, employee_id = request.employee_id, "Document requested");

    let due = request
        .due_date
        .map(|d| format!(" by {d}"))
        .unwrap_or_default();
    notify(
        db.get_ref(),
        request.employee_id,
        Sender::Admin,
        MessageCategory::Document,
        "Document requested",
        format!("Please submit your {}{due}.", request.document_type.as_ref()),
        Some(request.id),
    )
    .await;

    Ok(HttpResponse::Created().json(request))
}

#[utoipa::path(
    get,
    path = "/api/documents",
    params(DocumentQuery),
    responses(
        (status = 200, description = "Document requests, newest first", body = DocumentListResponse),
        (status = 400, description = "Invalid status filter")
    ),
    security(("bearer_auth" = [])),
    tag = "Document"
)]
pub async fn list_document_requests(
    auth: AuthUser,
    db: web::Data<Db>,
    query: web::Query<DocumentQuery>,
) -> actix_web::Result<impl Responder> {
    let status: Option<DocumentStatus> = parse_filter("status", query.status.as_deref())?;
    let employee_id = if auth.role.is_staff() {
        query.employee_id
    } else {
        Some(auth.employee_id()?)
    };
    let overdue_only = query.overdue.unwrap_or(false);
    let today = today();

    let mut requests = db
        .document_requests
        .find(|d| {
            employee_id.is_none_or(|id| d.employee_id == id)
                && status.is_none_or(|s| d.status == s)
                && (!overdue_only || d.is_overdue(today))
        })
        .await?;
    requests.sort_by(|a, b| b.id.cmp(&a.id));

    let page = paginate(requests, query.page, query.per_page);
    Ok(HttpResponse::Ok().json(DocumentListResponse {
        data: page.data,
        page: page.page,
        per_page: page.per_page,
        total: page.total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/documents/{id}",
    params(("id" = u64, Path, description = "Document request ID")),
    responses(
        (status = 200, description = "Document request", body = DocumentRequest),
        (status = 404, description = "Document request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Document"
)]
pub async fn get_document_request(
    auth: AuthUser,
    db: web::Data<Db>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    match db.document_requests.get(path.into_inner()).await? {
        Some(d) if auth.can_view(d.employee_id) => Ok(HttpResponse::Ok().json(d)),
        _ => Err(ApiError::not_found("Document request not found").into()),
    }
}

#[utoipa::path(
    put,
    path = "/api/documents/{id}/submit",
    request_body = SubmitDocument,
    params(("id" = u64, Path, description = "Document request ID")),
    responses(
        (status = 200, description = "Document submitted", body = DocumentRequest),
        (status = 400, description = "Blank file name or already submitted"),
        (status = 404, description = "Document request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Document"
)]
pub async fn submit_document(
    auth: AuthUser,
    db: web::Data<Db>,
    path: web::Path<u64>,
    payload: web::Json<SubmitDocument>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;
    let id = path.into_inner();
    let SubmitDocument { file_name, note } = payload.into_inner();
    require_text("file_name", &file_name)?;

    let submitted = db
        .document_requests
        .update(id, |d| {
            if d.employee_id != employee_id {
                return Err(ApiError::not_found("Document request not found"));
            }
            if !d.submit(&file_name, note, Utc::now()) {
                return Err(ApiError::bad_request("Document already submitted"));
            }
            Ok(())
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Document request not found"))?;

    info!(document_id = id, employee_id, "Document submitted");

    notify(
        db.get_ref(),
        employee_id,
        Sender::Employee,
        MessageCategory::Document,
        "Document submitted",
        format!(
            "{} submitted: {}",
            submitted.document_type.as_ref(),
            submitted.file_name.as_deref().unwrap_or_default()
        ),
        Some(submitted.id),
    )
    .await;

    Ok(HttpResponse::Ok().json(submitted))
}

#[utoipa::path(
    delete,
    path = "/api/documents/{id}",
    params(("id" = u64, Path, description = "Document request ID")),
    responses(
        (status = 204, description = "Document request deleted"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Document request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Document"
)]
pub async fn delete_document_request(
    auth: AuthUser,
    db: web::Data<Db>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = path.into_inner();

    match db.document_requests.delete(id).await? {
        Some(_) => {
            info!(
                document_id = id,
                by = %auth.username,
                user_id = auth.user_id,
                "Document request deleted"
            );
            Ok(HttpResponse::NoContent().finish())
        }
        None => Err(ApiError::not_found("Document request not found").into()),
    }
}
