use crate::{
    api::{message::notify, paginate, parse_filter, require_text},
    auth::auth::AuthUser,
    db::Db,
    error::ApiError,
    model::{
        certificate::{CertificateRequest, CertificateStatus, CertificateType, MAX_COPIES},
        message::{MessageCategory, Sender},
    },
};
use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateCertificate {
    pub certificate_type: CertificateType,
    #[schema(example = "Bank loan application")]
    pub purpose: String,
    /// 1 to 5, defaults to 1
    #[schema(example = 1)]
    pub copies: Option<u8>,
}

#[derive(Deserialize, IntoParams)]
pub struct CertificateQuery {
    /// Filter by employee ID (HR/Admin only)
    pub employee_id: Option<u64>,
    /// PENDING or ISSUED
    pub status: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CertificateListResponse {
    pub data: Vec<CertificateRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 4)]
    pub total: i64,
}

#[utoipa::path(
    post,
    path = "/api/certificates",
    request_body = CreateCertificate,
    responses(
        (status = 201, description = "Certificate requested", body = CertificateRequest),
        (status = 400, description = "Blank purpose or copies out of range"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Certificate"
)]
pub async fn create_certificate(
    auth: AuthUser,
    db: web::Data<Db>,
    payload: web::Json<CreateCertificate>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;
    let payload = payload.into_inner();

    require_text("purpose", &payload.purpose)?;
    let copies = payload.copies.unwrap_or(1);
    if !(1..=MAX_COPIES).contains(&copies) {
        return Err(
            ApiError::bad_request(format!("copies must be between 1 and {MAX_COPIES}")).into(),
        );
    }

    let request = db
        .certificates
        .insert(CertificateRequest {
            id: 0,
            employee_id,
            certificate_type: payload.certificate_type,
            purpose: payload.purpose.trim().to_string(),
            copies,
            status: CertificateStatus::Pending,
            serial_number: None,
            requested_at: Utc::now(),
            issued_at: None,
        })
        .await?;

    info!(employee_id, certificate_id = request.id, "Certificate requested");

    notify(
        db.get_ref(),
        employee_id,
        Sender::Employee,
        MessageCategory::Certificate,
        "New certificate request",
        format!(
            "{} certificate x{} for: {}",
            request.certificate_type.as_ref(),
            request.copies,
            request.purpose
        ),
        Some(request.id),
    )
    .await;

    Ok(HttpResponse::Created().json(request))
}

#[utoipa::path(
    get,
    path = "/api/certificates",
    params(CertificateQuery),
    responses(
        (status = 200, description = "Certificate requests, newest first", body = CertificateListResponse),
        (status = 400, description = "Invalid status filter")
    ),
    security(("bearer_auth" = [])),
    tag = "Certificate"
)]
pub async fn list_certificates(
    auth: AuthUser,
    db: web::Data<Db>,
    query: web::Query<CertificateQuery>,
) -> actix_web::Result<impl Responder> {
    let status: Option<CertificateStatus> = parse_filter("status", query.status.as_deref())?;
    let employee_id = if auth.role.is_staff() {
        query.employee_id
    } else {
        Some(auth.employee_id()?)
    };

    let mut requests = db
        .certificates
        .find(|c| {
            employee_id.is_none_or(|id| c.employee_id == id)
                && status.is_none_or(|s| c.status == s)
        })
        .await?;
    requests.sort_by(|a, b| b.id.cmp(&a.id));

    let page = paginate(requests, query.page, query.per_page);
    Ok(HttpResponse::Ok().json(CertificateListResponse {
        data: page.data,
        page: page.page,
        per_page: page.per_page,
        total: page.total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/certificates/{id}",
    params(("id" = u64, Path, description = "Certificate request ID")),
    responses(
        (status = 200, description = "Certificate request", body = CertificateRequest),
        (status = 404, description = "Certificate request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Certificate"
)]
pub async fn get_certificate(
    auth: AuthUser,
    db: web::Data<Db>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    match db.certificates.get(path.into_inner()).await? {
        Some(c) if auth.can_view(c.employee_id) => Ok(HttpResponse::Ok().json(c)),
        _ => Err(ApiError::not_found("Certificate request not found").into()),
    }
}

#[utoipa::path(
    put,
    path = "/api/certificates/{id}/issue",
    params(("id" = u64, Path, description = "Certificate request ID")),
    responses(
        (status = 200, description = "Certificate issued", body = CertificateRequest),
        (status = 400, description = "Certificate request not found or already processed"),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Certificate"
)]
pub async fn issue_certificate(
    auth: AuthUser,
    db: web::Data<Db>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();

    let already = || ApiError::bad_request("Certificate request not found or already processed");
    let issued = db
        .certificates
        .update(id, |c| {
            if c.issue(Utc::now()) { Ok(()) } else { Err(already()) }
        })
        .await?
        .ok_or_else(already)?;

    let serial = issued.serial_number.clone().unwrap_or_default();
    info!(
        certificate_id = id,
        %serial,
        by = %auth.username,
        user_id = auth.user_id,
        "Certificate issued"
    );

    notify(
        db.get_ref(),
        issued.employee_id,
        Sender::Admin,
        MessageCategory::Certificate,
        "Certificate issued",
        format!(
            "Your {} certificate is ready. Serial number: {serial}",
            issued.certificate_type.as_ref()
        ),
        Some(issued.id),
    )
    .await;

    Ok(HttpResponse::Ok().json(issued))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestApp;
    use actix_web::{http::StatusCode, test};
    use chrono::Datelike;
    use serde_json::json;

    #[actix_web::test]
    async fn request_then_issue_stamps_serial() {
        let app = TestApp::start().await;
        let svc = test::init_service(app.app()).await;
        let (emp_id, token) = app.employee("Mina").await;

        let resp = test::call_service(
            &svc,
            app.post("/api/certificates", &token)
                .set_json(json!({"certificate_type": "EMPLOYMENT", "purpose": "Visa"}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: CertificateRequest = test::read_body_json(resp).await;
        assert_eq!(created.copies, 1);
        assert_eq!(created.status, CertificateStatus::Pending);

        let uri = format!("/api/certificates/{}/issue", created.id);
        let resp = test::call_service(&svc, app.put(&uri, &token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = test::call_service(&svc, app.put(&uri, &app.admin_token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let issued: CertificateRequest = test::read_body_json(resp).await;
        let expected = format!("CERT-{}-{:06}", Utc::now().year(), created.id);
        assert_eq!(issued.serial_number.as_deref(), Some(expected.as_str()));

        let resp = test::call_service(&svc, app.put(&uri, &app.admin_token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let notices = app
            .db
            .messages
            .find(|m| m.employee_id == emp_id && m.category == MessageCategory::Certificate)
            .await
            .unwrap();
        assert_eq!(notices.len(), 2);
    }

    #[actix_web::test]
    async fn copies_and_purpose_are_validated() {
        let app = TestApp::start().await;
        let svc = test::init_service(app.app()).await;
        let (_, token) = app.employee("Mina").await;

        for body in [
            json!({"certificate_type": "INCOME", "purpose": "Loan", "copies": 0}),
            json!({"certificate_type": "INCOME", "purpose": "Loan", "copies": 6}),
            json!({"certificate_type": "INCOME", "purpose": "   "}),
        ] {
            let resp = test::call_service(
                &svc,
                app.post("/api/certificates", &token).set_json(body).to_request(),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }

        let resp = test::call_service(
            &svc,
            app.post("/api/certificates", &token)
                .set_json(json!({"certificate_type": "CAREER", "purpose": "Loan", "copies": 5}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    #[actix_web::test]
    async fn employees_see_only_their_own() {
        let app = TestApp::start().await;
        let svc = test::init_service(app.app()).await;
        let (_, mina) = app.employee("Mina").await;
        let (_, jun) = app.employee("Jun").await;

        let resp = test::call_service(
            &svc,
            app.post("/api/certificates", &mina)
                .set_json(json!({"certificate_type": "CAREER", "purpose": "Move"}))
                .to_request(),
        )
        .await;
        let created: CertificateRequest = test::read_body_json(resp).await;

        let resp = test::call_service(
            &svc,
            app.get(&format!("/api/certificates/{}", created.id), &jun).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = test::call_service(&svc, app.get("/api/certificates", &jun).to_request()).await;
        let list: CertificateListResponse = test::read_body_json(resp).await;
        assert_eq!(list.total, 0);

        let resp = test::call_service(
            &svc,
            app.get("/api/certificates?status=PENDING", &app.admin_token).to_request(),
        )
        .await;
        let list: CertificateListResponse = test::read_body_json(resp).await;
        assert_eq!(list.total, 1);
    }
}
