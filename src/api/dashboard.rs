use crate::{
    api::attendance::{AttendanceSummary, daily_board, summarize},
    api::local_now,
    auth::auth::AuthUser,
    config::Config,
    db::Db,
    model::{
        certificate::CertificateStatus,
        contract::ContractStatus,
        document_request::DocumentStatus,
        leave_request::LeaveStatus,
        message::Inbox,
    },
};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Everything the admin front page needs in one call.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Dashboard {
    #[schema(example = 42)]
    pub active_employees: usize,
    pub attendance: AttendanceSummary,
    #[schema(example = 3)]
    pub pending_leave: usize,
    #[schema(example = 1)]
    pub pending_certificates: usize,
    #[schema(example = 2)]
    pub unsigned_contracts: usize,
    #[schema(example = 4)]
    pub pending_documents: usize,
    #[schema(example = 1)]
    pub overdue_documents: usize,
    #[schema(example = 5)]
    pub unread_messages: usize,
}

#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Today's overview", body = Dashboard),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn dashboard(
    auth: AuthUser,
    db: web::Data<Db>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let now = local_now();
    let today = now.date();
    let board = daily_board(db.get_ref(), config.get_ref(), today, now).await?;

    let documents = db
        .document_requests
        .find(|d| d.status == DocumentStatus::Pending)
        .await?;

    let overview = Dashboard {
        active_employees: board.len(),
        attendance: summarize(today, &board),
        pending_leave: db
            .leave_requests
            .find(|l| l.status == LeaveStatus::Pending)
            .await?
            .len(),
        pending_certificates: db
            .certificates
            .find(|c| c.status == CertificateStatus::Pending)
            .await?
            .len(),
        unsigned_contracts: db
            .contracts
            .find(|c| c.status == ContractStatus::Pending)
            .await?
            .len(),
        overdue_documents: documents.iter().filter(|d| d.is_overdue(today)).count(),
        pending_documents: documents.len(),
        unread_messages: db
            .messages
            .find(|m| m.is_in(Inbox::Admin) && !m.read)
            .await?
            .len(),
    };

    tracing::debug!(by = %auth.username, "Dashboard served");
    Ok(HttpResponse::Ok().json(overview))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestApp;
    use actix_web::{http::StatusCode, test};
    use serde_json::json;

    #[actix_web::test]
    async fn counts_open_work() {
        let app = TestApp::start().await;
        let svc = test::init_service(app.app()).await;
        let (emp_id, token) = app.employee("Mina").await;
        app.employee("Jun").await;

        let resp = test::call_service(
            &svc,
            app.post("/api/leave", &token)
                .set_json(json!({
                    "start_date": "2026-07-01",
                    "end_date": "2026-07-02",
                    "leave_type": "annual"
                }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = test::call_service(
            &svc,
            app.post("/api/documents", &app.admin_token)
                .set_json(json!({
                    "employee_id": emp_id,
                    "document_type": "ID_CARD",
                    "due_date": "2020-01-01"
                }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp =
            test::call_service(&svc, app.post("/api/attendance", &token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = test::call_service(&svc, app.get("/api/dashboard", &token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp =
            test::call_service(&svc, app.get("/api/dashboard", &app.admin_token).to_request())
                .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let overview: Dashboard = test::read_body_json(resp).await;

        assert_eq!(overview.active_employees, 2);
        assert_eq!(overview.attendance.total, 2);
        assert_eq!(overview.attendance.working, 1);
        assert_eq!(overview.attendance.absent, 1);
        assert_eq!(overview.pending_leave, 1);
        assert_eq!(overview.pending_certificates, 0);
        assert_eq!(overview.unsigned_contracts, 0);
        assert_eq!((overview.pending_documents, overview.overdue_documents), (1, 1));
        // the leave notification
        assert_eq!(overview.unread_messages, 1);
    }
}
