use crate::{
    api::{message::notify, paginate, parse_filter},
    auth::auth::AuthUser,
    db::Db,
    error::ApiError,
    model::{
        leave_request::{LeaveRequest, LeaveStatus, LeaveType},
        message::{MessageCategory, Sender},
    },
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "sick")]
    pub leave_type: LeaveType, // enum ensures Swagger dropdown
    #[schema(example = "Flu")]
    pub reason: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LeaveResponse {
    #[serde(flatten)]
    pub leave: LeaveRequest,
    /// inclusive calendar days
    #[schema(example = 3)]
    pub days: i64,
}

impl From<LeaveRequest> for LeaveResponse {
    fn from(leave: LeaveRequest) -> Self {
        let days = leave.days();
        Self { leave, days }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveResponse>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams)]
pub struct LeaveFilter {
    /// Filter by employee ID (HR/Admin only)
    pub employee_id: Option<u64>,
    /// PENDING, APPROVED or REJECTED
    pub status: Option<String>,
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    /// Items per page
    pub per_page: Option<u64>,
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveResponse),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    db: web::Data<Db>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;
    let payload = payload.into_inner();

    if payload.start_date > payload.end_date {
        return Err(ApiError::bad_request("start_date cannot be after end_date").into());
    }

    let leave = db
        .leave_requests
        .insert(LeaveRequest {
            id: 0,
            employee_id,
            start_date: payload.start_date,
            end_date: payload.end_date,
            leave_type: payload.leave_type,
            reason: payload
                .reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
            status: LeaveStatus::Pending,
            created_at: Utc::now(),
            decided_at: None,
        })
        .await?;

    tracing::info!(employee_id, leave_id = leave.id, "Leave request submitted");

    notify(
        db.get_ref(),
        employee_id,
        Sender::Employee,
        MessageCategory::Leave,
        "New leave request",
        format!(
            "{} leave requested for {} to {} ({} day(s))",
            leave.leave_type,
            leave.start_date,
            leave.end_date,
            leave.days()
        ),
        Some(leave.id),
    )
    .await;

    Ok(HttpResponse::Created().json(LeaveResponse::from(leave)))
}

/// Shared by approve and reject: only a pending request can be decided.
async fn decide(
    auth: AuthUser,
    db: web::Data<Db>,
    leave_id: u64,
    decision: LeaveStatus,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let already = || ApiError::bad_request("Leave request not found or already processed");

    let decided = db
        .leave_requests
        .update(leave_id, |l| {
            if l.decide(decision, Utc::now()) {
                Ok(())
            } else {
                Err(already())
            }
        })
        .await?
        .ok_or_else(already)?;

    let verdict = match decision {
        LeaveStatus::Approved => "approved",
        _ => "rejected",
    };
    tracing::info!(
        leave_id,
        by = %auth.username,
        user_id = auth.user_id,
        verdict,
        "Leave decided"
    );

    notify(
        db.get_ref(),
        decided.employee_id,
        Sender::Admin,
        MessageCategory::Leave,
        format!("Leave {verdict}"),
        format!(
            "Your leave from {} to {} was {verdict}.",
            decided.start_date, decided.end_date
        ),
        Some(decided.id),
    )
    .await;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("Leave {verdict}")
    })))
}

/* =========================
Approve leave (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved successfully", body = Object, example = json!({
            "message": "Leave approved"
        })),
        (status = 400, description = "Leave request not found or already processed", body = Object, example = json!({
            "message": "Leave request not found or already processed"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    db: web::Data<Db>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    decide(auth, db, path.into_inner(), LeaveStatus::Approved).await
}

/* =========================
Reject leave (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected successfully", body = Object, example = json!({
            "message": "Leave rejected"
        })),
        (status = 400, description = "Leave request not found or already processed", body = Object, example = json!({
            "message": "Leave request not found or already processed"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    db: web::Data<Db>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    decide(auth, db, path.into_inner(), LeaveStatus::Rejected).await
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "Leave request not found"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    db: web::Data<Db>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    // other people's requests look the same as missing ones
    match db.leave_requests.get(leave_id).await? {
        Some(leave) if auth.can_view(leave.employee_id) => {
            Ok(HttpResponse::Ok().json(LeaveResponse::from(leave)))
        }
        _ => Err(ApiError::not_found("Leave request not found").into()),
    }
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 400, description = "Invalid status filter"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    db: web::Data<Db>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    let status: Option<LeaveStatus> = parse_filter("status", query.status.as_deref())?;

    // employees are pinned to their own requests
    let employee_id = if auth.role.is_staff() {
        query.employee_id
    } else {
        Some(auth.employee_id()?)
    };

    let mut leaves = db
        .leave_requests
        .find(|l| {
            employee_id.is_none_or(|id| l.employee_id == id)
                && status.is_none_or(|s| l.status == s)
        })
        .await?;
    leaves.sort_by(|a, b| b.id.cmp(&a.id));

    let page = paginate(leaves, query.page, query.per_page);
    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data: page.data.into_iter().map(LeaveResponse::from).collect(),
        page: page.page,
        per_page: page.per_page,
        total: page.total,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::message::Message;
    use crate::test_support::TestApp;
    use actix_web::{http::StatusCode, test};
    use serde_json::json;

    #[actix_web::test]
    async fn submit_approve_and_notify() {
        let app = TestApp::start().await;
        let svc = test::init_service(app.app()).await;
        let (emp_id, token) = app.employee("Mina").await;

        let resp = test::call_service(
            &svc,
            app.post("/api/leave", &token)
                .set_json(json!({
                    "start_date": "2026-05-04",
                    "end_date": "2026-05-06",
                    "leave_type": "annual",
                    "reason": "Trip"
                }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: LeaveResponse = test::read_body_json(resp).await;
        assert_eq!(created.days, 3);
        assert_eq!(created.leave.status, LeaveStatus::Pending);
        assert_eq!(created.leave.employee_id, emp_id);

        // employee cannot decide their own leave
        let uri = format!("/api/leave/{}/approve", created.leave.id);
        let resp = test::call_service(&svc, app.put(&uri, &token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = test::call_service(&svc, app.put(&uri, &app.admin_token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        // second decision is refused and nothing changes
        let reject = format!("/api/leave/{}/reject", created.leave.id);
        let resp = test::call_service(&svc, app.put(&reject, &app.admin_token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let stored = app.db.leave_requests.get(created.leave.id).await.unwrap().unwrap();
        assert_eq!(stored.status, LeaveStatus::Approved);

        let messages: Vec<Message> = app.db.messages.all().await.unwrap();
        assert!(messages.iter().any(|m| m.sender == Sender::Employee
            && m.category == MessageCategory::Leave
            && m.related_id == Some(created.leave.id)));
        assert!(messages.iter().any(|m| m.sender == Sender::Admin
            && m.employee_id == emp_id
            && m.subject == "Leave approved"));
    }

    #[actix_web::test]
    async fn reversed_dates_are_rejected() {
        let app = TestApp::start().await;
        let svc = test::init_service(app.app()).await;
        let (_, token) = app.employee("Mina").await;

        let resp = test::call_service(
            &svc,
            app.post("/api/leave", &token)
                .set_json(json!({
                    "start_date": "2026-05-06",
                    "end_date": "2026-05-04",
                    "leave_type": "sick"
                }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn missing_leave_cannot_be_decided() {
        let app = TestApp::start().await;
        let svc = test::init_service(app.app()).await;
        let resp = test::call_service(
            &svc,
            app.put("/api/leave/77/approve", &app.admin_token).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn employees_only_list_their_own() {
        let app = TestApp::start().await;
        let svc = test::init_service(app.app()).await;
        let (_, mina) = app.employee("Mina").await;
        let (jun_id, jun) = app.employee("Jun").await;

        for token in [&mina, &jun] {
            let resp = test::call_service(
                &svc,
                app.post("/api/leave", token)
                    .set_json(json!({
                        "start_date": "2026-06-01",
                        "end_date": "2026-06-01",
                        "leave_type": "unpaid"
                    }))
                    .to_request(),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        // the employee_id filter is ignored for employees
        let resp = test::call_service(
            &svc,
            app.get(&format!("/api/leave?employee_id={jun_id}"), &mina).to_request(),
        )
        .await;
        let list: LeaveListResponse = test::read_body_json(resp).await;
        assert_eq!(list.total, 1);
        assert_ne!(list.data[0].leave.employee_id, jun_id);

        let resp = test::call_service(
            &svc,
            app.get("/api/leave?status=pending", &app.admin_token).to_request(),
        )
        .await;
        let list: LeaveListResponse = test::read_body_json(resp).await;
        assert_eq!(list.total, 2);

        // someone else's request looks missing
        let theirs = list.data.iter().find(|l| l.leave.employee_id == jun_id).unwrap();
        let resp = test::call_service(
            &svc,
            app.get(&format!("/api/leave/{}", theirs.leave.id), &mina).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
