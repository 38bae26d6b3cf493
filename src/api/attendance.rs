use std::collections::HashMap;

use crate::{
    api::{local_now, paginate, parse_filter},
    auth::auth::AuthUser,
    config::Config,
    db::Db,
    error::ApiError,
    model::{
        attendance::{Attendance, AttendanceStatus, derive_status},
        leave_request::LeaveStatus,
    },
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

/// Attendance of one employee on one day, with the derived status.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AttendanceView {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "Mina Park")]
    pub employee_name: String,
    #[schema(example = "2026-03-02", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "08:57:12", value_type = Option<String>)]
    pub check_in: Option<NaiveTime>,
    #[schema(example = "18:03:40", value_type = Option<String>)]
    pub check_out: Option<NaiveTime>,
    pub status: AttendanceStatus,
    /// Checked in after the start time plus grace
    pub late: bool,
    #[schema(example = 546)]
    pub worked_minutes: Option<i64>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AttendanceListResponse {
    pub data: Vec<AttendanceView>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 25)]
    pub total: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AttendanceSummary {
    #[schema(example = "2026-03-02", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = 20)]
    pub total: usize,
    pub normal: usize,
    pub late: usize,
    pub leave: usize,
    pub working: usize,
    pub absent: usize,
}

#[derive(Deserialize, IntoParams)]
pub struct AttendanceBoardQuery {
    /// Day to report, defaults to today (YYYY-MM-DD)
    #[param(value_type = Option<String>)]
    pub date: Option<NaiveDate>,
    /// Filter by employee ID
    pub employee_id: Option<u64>,
    /// NORMAL, LATE, LEAVE, WORKING or ABSENT
    pub status: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// First day, defaults to 30 days ago
    #[param(value_type = Option<String>)]
    pub from: Option<NaiveDate>,
    /// Last day, defaults to today
    #[param(value_type = Option<String>)]
    pub to: Option<NaiveDate>,
}

#[derive(Deserialize, IntoParams)]
pub struct SummaryQuery {
    #[param(value_type = Option<String>)]
    pub date: Option<NaiveDate>,
}

const MAX_HISTORY_DAYS: i64 = 366;

fn view(
    employee_id: u64,
    employee_name: String,
    date: NaiveDate,
    record: Option<&Attendance>,
    on_leave: bool,
    now: NaiveDateTime,
    config: &Config,
) -> AttendanceView {
    let policy = &config.work_policy;
    AttendanceView {
        employee_id,
        employee_name,
        date,
        check_in: record.map(|r| r.check_in),
        check_out: record.and_then(|r| r.check_out),
        status: derive_status(record, on_leave, date, now, policy),
        late: record.is_some_and(|r| r.is_late(policy)),
        worked_minutes: record.and_then(Attendance::worked_minutes),
    }
}

/// One row per active employee for `date`, absentees included.
pub(crate) async fn daily_board(
    db: &Db,
    config: &Config,
    date: NaiveDate,
    now: NaiveDateTime,
) -> Result<Vec<AttendanceView>, ApiError> {
    let employees = db.employees.find(|e| e.is_active()).await?;
    let records: HashMap<u64, Attendance> = db
        .attendance
        .find(|a| a.date == date)
        .await?
        .into_iter()
        .map(|a| (a.employee_id, a))
        .collect();
    let on_leave: Vec<u64> = db
        .leave_requests
        .find(|l| l.status == LeaveStatus::Approved && l.covers(date))
        .await?
        .into_iter()
        .map(|l| l.employee_id)
        .collect();

    let mut board: Vec<AttendanceView> = employees
        .into_iter()
        .map(|e| {
            view(
                e.id,
                e.full_name(),
                date,
                records.get(&e.id),
                on_leave.contains(&e.id),
                now,
                config,
            )
        })
        .collect();
    board.sort_by_key(|v| v.employee_id);
    Ok(board)
}

pub(crate) fn summarize(date: NaiveDate, board: &[AttendanceView]) -> AttendanceSummary {
    let count = |status: AttendanceStatus| board.iter().filter(|v| v.status == status).count();
    AttendanceSummary {
        date,
        total: board.len(),
        normal: count(AttendanceStatus::Normal),
        late: count(AttendanceStatus::Late),
        leave: count(AttendanceStatus::Leave),
        working: count(AttendanceStatus::Working),
        absent: count(AttendanceStatus::Absent),
    }
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance",
    responses(
        (status = 200, description = "Checked in successfully", body = Object, example = json!({
            "message": "Checked in successfully"
        })),
        (status = 400, description = "Already checked in today", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_in(auth: AuthUser, db: web::Data<Db>) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;
    let now = local_now();

    let record = db
        .attendance
        .insert_with(|all| {
            if all
                .iter()
                .any(|a| a.employee_id == employee_id && a.date == now.date())
            {
                return Err(ApiError::bad_request("Already checked in today"));
            }
            Ok(Attendance {
                id: 0,
                employee_id,
                date: now.date(),
                check_in: now.time(),
                check_out: None,
            })
        })
        .await?;

    info!(employee_id, attendance_id = record.id, "Checked in");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Checked in successfully"
    })))
}

/// Check-out endpoint
#[utoipa::path(
    put,
    path = "/api/attendance",
    responses(
        (status = 200, description = "Checked out successfully", body = Object, example = json!({
            "message": "Checked out successfully"
        })),
        (status = 400, description = "No active check-in found for today", body = Object, example = json!({
            "message": "No active check-in found for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_out(auth: AuthUser, db: web::Data<Db>) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;
    let now = local_now();

    let open = db
        .attendance
        .find_one(|a| a.employee_id == employee_id && a.date == now.date() && a.is_open())
        .await?;
    let Some(open) = open else {
        return Err(ApiError::bad_request("No active check-in found for today").into());
    };

    let updated = db
        .attendance
        .update(open.id, |a| {
            if !a.is_open() {
                return Err(ApiError::bad_request("No active check-in found for today"));
            }
            a.check_out = Some(now.time().max(a.check_in));
            Ok(())
        })
        .await?;
    if updated.is_none() {
        return Err(ApiError::bad_request("No active check-in found for today").into());
    }

    info!(employee_id, attendance_id = open.id, "Checked out");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Checked out successfully"
    })))
}

/// Caller's own attendance history, newest day first
#[utoipa::path(
    get,
    path = "/api/attendance/me",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Attendance history", body = [AttendanceView]),
        (status = 400, description = "Invalid range"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn my_attendance(
    auth: AuthUser,
    db: web::Data<Db>,
    config: web::Data<Config>,
    query: web::Query<HistoryQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;
    let now = local_now();

    let to = query.to.unwrap_or(now.date());
    let from = match query.from {
        Some(from) => from,
        None => to
            .checked_sub_signed(Duration::days(29))
            .ok_or_else(|| ApiError::bad_request("to is out of range"))?,
    };
    if from > to {
        return Err(ApiError::bad_request("from cannot be after to").into());
    }
    if (to - from).num_days() >= MAX_HISTORY_DAYS {
        return Err(ApiError::bad_request("Range is limited to one year").into());
    }

    let employee = db
        .employees
        .get(employee_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Employee not found"))?;

    let records: HashMap<NaiveDate, Attendance> = db
        .attendance
        .find(|a| a.employee_id == employee_id && from <= a.date && a.date <= to)
        .await?
        .into_iter()
        .map(|a| (a.date, a))
        .collect();
    let leaves = db
        .leave_requests
        .find(|l| l.employee_id == employee_id && l.status == LeaveStatus::Approved)
        .await?;

    // days after today have not happened yet
    let last = to.min(now.date());
    let history: Vec<AttendanceView> = from
        .iter_days()
        .take_while(|d| *d <= last)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .map(|date| {
            view(
                employee_id,
                employee.full_name(),
                date,
                records.get(&date),
                leaves.iter().any(|l| l.covers(date)),
                now,
                config.get_ref(),
            )
        })
        .collect();

    Ok(HttpResponse::Ok().json(history))
}

/// Daily attendance board for admin
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceBoardQuery),
    responses(
        (status = 200, description = "Paginated attendance board", body = AttendanceListResponse),
        (status = 400, description = "Invalid status filter"),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn attendance_board(
    auth: AuthUser,
    db: web::Data<Db>,
    config: web::Data<Config>,
    query: web::Query<AttendanceBoardQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let status: Option<AttendanceStatus> = parse_filter("status", query.status.as_deref())?;
    let now = local_now();
    let date = query.date.unwrap_or(now.date());

    let board: Vec<AttendanceView> = daily_board(db.get_ref(), config.get_ref(), date, now)
        .await?
        .into_iter()
        .filter(|v| query.employee_id.is_none_or(|id| v.employee_id == id))
        .filter(|v| status.is_none_or(|s| v.status == s))
        .collect();

    let page = paginate(board, query.page, query.per_page);
    Ok(HttpResponse::Ok().json(AttendanceListResponse {
        data: page.data,
        page: page.page,
        per_page: page.per_page,
        total: page.total,
    }))
}

/// Per-status head count for one day
#[utoipa::path(
    get,
    path = "/api/attendance/summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Attendance summary", body = AttendanceSummary),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn attendance_summary(
    auth: AuthUser,
    db: web::Data<Db>,
    config: web::Data<Config>,
    query: web::Query<SummaryQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let now = local_now();
    let date = query.date.unwrap_or(now.date());
    let board = daily_board(db.get_ref(), config.get_ref(), date, now).await?;

    Ok(HttpResponse::Ok().json(summarize(date, &board)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::leave_request::{LeaveRequest, LeaveType};
    use crate::test_support::TestApp;
    use actix_web::{http::StatusCode, test};
    use chrono::Utc;

    #[actix_web::test]
    async fn check_in_then_out_once_per_day() {
        let app = TestApp::start().await;
        let svc = test::init_service(app.app()).await;
        let (_, token) = app.employee("Mina").await;

        let resp = test::call_service(&svc, app.put("/api/attendance", &token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = test::call_service(&svc, app.post("/api/attendance", &token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = test::call_service(&svc, app.post("/api/attendance", &token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Already checked in today");

        let resp = test::call_service(&svc, app.put("/api/attendance", &token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = test::call_service(&svc, app.put("/api/attendance", &token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn admin_without_employee_profile_cannot_check_in() {
        let app = TestApp::start().await;
        let svc = test::init_service(app.app()).await;

        let resp =
            test::call_service(&svc, app.post("/api/attendance", &app.admin_token).to_request())
                .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn board_includes_absent_and_leave_rows() {
        let app = TestApp::start().await;
        let svc = test::init_service(app.app()).await;
        let (present, token) = app.employee("Present").await;
        let (absent, _) = app.employee("Absent").await;
        let (away, _) = app.employee("Away").await;

        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        app.db
            .attendance
            .insert(Attendance {
                id: 0,
                employee_id: present,
                date: day,
                check_in: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
                check_out: Some(NaiveTime::from_hms_opt(18, 0, 0).unwrap()),
            })
            .await
            .unwrap();
        app.db
            .leave_requests
            .insert(LeaveRequest {
                id: 0,
                employee_id: away,
                start_date: day,
                end_date: day,
                leave_type: LeaveType::Annual,
                reason: None,
                status: LeaveStatus::Approved,
                created_at: Utc::now(),
                decided_at: Some(Utc::now()),
            })
            .await
            .unwrap();

        let resp = test::call_service(
            &svc,
            app.get("/api/attendance?date=2026-03-02", &app.admin_token)
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: AttendanceListResponse = test::read_body_json(resp).await;
        assert_eq!(body.total, 3);
        let status_of = |id: u64| {
            body.data
                .iter()
                .find(|v| v.employee_id == id)
                .map(|v| v.status)
                .unwrap()
        };
        assert_eq!(status_of(present), AttendanceStatus::Late);
        assert_eq!(status_of(absent), AttendanceStatus::Absent);
        assert_eq!(status_of(away), AttendanceStatus::Leave);

        let resp = test::call_service(
            &svc,
            app.get("/api/attendance/summary?date=2026-03-02", &app.admin_token)
                .to_request(),
        )
        .await;
        let summary: AttendanceSummary = test::read_body_json(resp).await;
        assert_eq!((summary.total, summary.late, summary.absent, summary.leave), (3, 1, 1, 1));

        let resp = test::call_service(
            &svc,
            app.get("/api/attendance?date=2026-03-02&status=absent", &app.admin_token)
                .to_request(),
        )
        .await;
        let body: AttendanceListResponse = test::read_body_json(resp).await;
        assert_eq!(body.total, 1);
        assert_eq!(body.data[0].employee_id, absent);

        // employees only see their own history
        let resp =
            test::call_service(&svc, app.get("/api/attendance", &token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn history_lists_days_newest_first() {
        let app = TestApp::start().await;
        let svc = test::init_service(app.app()).await;
        let (_, token) = app.employee("Mina").await;

        let resp = test::call_service(
            &svc,
            app.get("/api/attendance/me?from=2024-01-01&to=2024-01-05", &token)
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let days: Vec<AttendanceView> = test::read_body_json(resp).await;
        assert_eq!(days.len(), 5);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert!(days.iter().all(|d| d.status == AttendanceStatus::Absent));

        let resp = test::call_service(
            &svc,
            app.get("/api/attendance/me?from=2024-01-05&to=2024-01-01", &token)
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn earliest_representable_to_date_is_a_bad_request() {
        let app = TestApp::start().await;
        let svc = test::init_service(app.app()).await;
        let (_, token) = app.employee("Mina").await;

        let resp = test::call_service(
            &svc,
            app.get("/api/attendance/me?to=-262143-01-01", &token).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
