use crate::{
    api::{paginate, parse_filter, require_text},
    auth::auth::AuthUser,
    db::Db,
    error::ApiError,
    model::message::{Inbox, Message, MessageCategory, Sender},
};
use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

/// Records a workflow notification. Failures are logged, not returned:
/// the action that triggered the notification has already been saved.
pub async fn notify(
    db: &Db,
    employee_id: u64,
    sender: Sender,
    category: MessageCategory,
    subject: impl Into<String>,
    body: impl Into<String>,
    related_id: Option<u64>,
) {
    let message = Message::new(employee_id, sender, category, subject, body, related_id);
    if let Err(e) = db.messages.insert(message).await {
        error!(error = %e, employee_id, ?category, "Failed to store notification");
    }
}

#[derive(Deserialize, ToSchema)]
pub struct SendMessage {
    /// Target employee; admin only. Omit to broadcast a notice to everyone.
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
    pub category: Option<MessageCategory>,
    #[schema(example = "Office closed Friday")]
    pub subject: String,
    #[schema(example = "The office will be closed for maintenance.")]
    pub body: String,
}

#[derive(Deserialize, IntoParams)]
pub struct InboxQuery {
    /// Only unread messages
    pub unread: Option<bool>,
    /// GENERAL, NOTICE, LEAVE, CERTIFICATE, CONTRACT or DOCUMENT
    pub category: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MessageListResponse {
    pub data: Vec<Message>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 3)]
    pub total: i64,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct UnreadCount {
    #[schema(example = 2)]
    pub unread: usize,
}

#[utoipa::path(
    post,
    path = "/api/messages",
    request_body = SendMessage,
    responses(
        (status = 201, description = "Message(s) stored", body = [Message]),
        (status = 400, description = "Blank subject or body"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Message"
)]
pub async fn send_message(
    auth: AuthUser,
    db: web::Data<Db>,
    payload: web::Json<SendMessage>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();
    require_text("subject", &payload.subject)?;
    require_text("body", &payload.body)?;

    let subject = payload.subject.trim().to_string();
    let body = payload.body.trim().to_string();

    let stored = match auth.inbox()? {
        Inbox::Employee(employee_id) => {
            let category = payload.category.unwrap_or(MessageCategory::General);
            let message = Message::new(employee_id, Sender::Employee, category, subject, body, None);
            vec![db.messages.insert(message).await?]
        }
        Inbox::Admin => match payload.employee_id {
            Some(employee_id) => {
                if db.employees.get(employee_id).await?.is_none() {
                    return Err(ApiError::not_found("Employee not found").into());
                }
                let category = payload.category.unwrap_or(MessageCategory::General);
                let message = Message::new(employee_id, Sender::Admin, category, subject, body, None);
                vec![db.messages.insert(message).await?]
            }
            None => {
                let category = payload.category.unwrap_or(MessageCategory::Notice);
                let recipients = db.employees.find(|e| e.is_active()).await?;
                let messages = recipients
                    .iter()
                    .map(|e| {
                        Message::new(e.id, Sender::Admin, category, subject.clone(), body.clone(), None)
                    })
                    .collect();
                db.messages.insert_many(messages).await?
            }
        },
    };

    info!(sender = %auth.username, count = stored.len(), "Message sent");
    Ok(HttpResponse::Created().json(stored))
}

#[utoipa::path(
    get,
    path = "/api/messages",
    params(InboxQuery),
    responses(
        (status = 200, description = "Caller's inbox, newest first", body = MessageListResponse),
        (status = 400, description = "Invalid category"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Message"
)]
pub async fn list_messages(
    auth: AuthUser,
    db: web::Data<Db>,
    query: web::Query<InboxQuery>,
) -> actix_web::Result<impl Responder> {
    let inbox = auth.inbox()?;
    let category: Option<MessageCategory> = parse_filter("category", query.category.as_deref())?;
    let unread_only = query.unread.unwrap_or(false);

    let mut messages = db
        .messages
        .find(|m| {
            m.is_in(inbox)
                && (!unread_only || !m.read)
                && category.is_none_or(|c| m.category == c)
        })
        .await?;
    messages.sort_by(|a, b| b.id.cmp(&a.id));

    let page = paginate(messages, query.page, query.per_page);
    Ok(HttpResponse::Ok().json(MessageListResponse {
        data: page.data,
        page: page.page,
        per_page: page.per_page,
        total: page.total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/messages/unread-count",
    responses(
        (status = 200, description = "Unread messages in the caller's inbox", body = UnreadCount)
    ),
    security(("bearer_auth" = [])),
    tag = "Message"
)]
pub async fn unread_count(auth: AuthUser, db: web::Data<Db>) -> actix_web::Result<impl Responder> {
    let inbox = auth.inbox()?;
    let unread = db
        .messages
        .find(|m| m.is_in(inbox) && !m.read)
        .await?
        .len();

    Ok(HttpResponse::Ok().json(UnreadCount { unread }))
}

#[utoipa::path(
    get,
    path = "/api/messages/{id}",
    params(("id" = u64, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Message", body = Message),
        (status = 404, description = "Message not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Message"
)]
pub async fn get_message(
    auth: AuthUser,
    db: web::Data<Db>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let inbox = auth.inbox()?;

    match db.messages.get(path.into_inner()).await? {
        Some(m) if m.is_visible_to(inbox) => Ok(HttpResponse::Ok().json(m)),
        _ => Err(ApiError::not_found("Message not found").into()),
    }
}

#[utoipa::path(
    put,
    path = "/api/messages/{id}/read",
    params(("id" = u64, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Marked read", body = Message),
        (status = 404, description = "Not in the caller's inbox")
    ),
    security(("bearer_auth" = [])),
    tag = "Message"
)]
pub async fn mark_read(
    auth: AuthUser,
    db: web::Data<Db>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let inbox = auth.inbox()?;
    let id = path.into_inner();

    let updated = db
        .messages
        .update(id, |m| {
            // only the recipient can mark a message read
            if !m.is_in(inbox) {
                return Err(ApiError::not_found("Message not found"));
            }
            m.mark_read(Utc::now());
            Ok(())
        })
        .await?;

    match updated {
        Some(m) => Ok(HttpResponse::Ok().json(m)),
        None => Err(ApiError::not_found("Message not found").into()),
    }
}

#[utoipa::path(
    put,
    path = "/api/messages/read-all",
    responses(
        (status = 200, description = "Number of messages marked read", body = Object, example = json!({
            "updated": 4
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Message"
)]
pub async fn mark_all_read(auth: AuthUser, db: web::Data<Db>) -> actix_web::Result<impl Responder> {
    let inbox = auth.inbox()?;
    let now = Utc::now();

    let updated = db
        .messages
        .update_where(|m| m.is_in(inbox) && !m.read, |m| m.mark_read(now))
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "updated": updated })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestApp;
    use actix_web::{http::StatusCode, test};
    use serde_json::json;

    #[actix_web::test]
    async fn broadcast_reaches_every_active_employee() {
        let app = TestApp::start().await;
        let svc = test::init_service(app.app()).await;
        let (_, a) = app.employee("Ann").await;
        let (_, b) = app.employee("Ben").await;

        let resp = test::call_service(
            &svc,
            app.post("/api/messages", &app.admin_token)
                .set_json(json!({"subject": "Holiday", "body": "Office closed Friday"}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let stored: Vec<Message> = test::read_body_json(resp).await;
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|m| m.category == MessageCategory::Notice));

        for token in [&a, &b] {
            let resp = test::call_service(
                &svc,
                app.get("/api/messages/unread-count", token).to_request(),
            )
            .await;
            let count: UnreadCount = test::read_body_json(resp).await;
            assert_eq!(count.unread, 1);
        }

        // admin's own inbox only holds what employees sent
        let resp = test::call_service(
            &svc,
            app.get("/api/messages", &app.admin_token).to_request(),
        )
        .await;
        let inbox: MessageListResponse = test::read_body_json(resp).await;
        assert_eq!(inbox.total, 0);
    }

    #[actix_web::test]
    async fn employee_reply_lands_in_admin_inbox_and_reads_are_scoped() {
        let app = TestApp::start().await;
        let svc = test::init_service(app.app()).await;
        let (_, mina) = app.employee("Mina").await;
        let (_, jun) = app.employee("Jun").await;

        let resp = test::call_service(
            &svc,
            app.post("/api/messages", &mina)
                .set_json(json!({"subject": "Question", "body": "When is payday?", "employee_id": 999}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let sent: Vec<Message> = test::read_body_json(resp).await;
        let id = sent[0].id;
        assert_eq!(sent[0].sender, Sender::Employee);

        // another employee can neither read nor mark it
        let resp = test::call_service(
            &svc,
            app.get(&format!("/api/messages/{id}"), &jun).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        // the sender can read it but it is not theirs to mark read
        let resp = test::call_service(
            &svc,
            app.put(&format!("/api/messages/{id}/read"), &mina).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = test::call_service(
            &svc,
            app.get("/api/messages?unread=true", &app.admin_token).to_request(),
        )
        .await;
        let inbox: MessageListResponse = test::read_body_json(resp).await;
        assert_eq!(inbox.total, 1);

        let resp = test::call_service(
            &svc,
            app.put("/api/messages/read-all", &app.admin_token).to_request(),
        )
        .await;
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["updated"], 1);

        let resp = test::call_service(
            &svc,
            app.get("/api/messages/unread-count", &app.admin_token).to_request(),
        )
        .await;
        let count: UnreadCount = test::read_body_json(resp).await;
        assert_eq!(count.unread, 0);
    }

    #[actix_web::test]
    async fn direct_message_to_unknown_employee_is_404() {
        let app = TestApp::start().await;
        let svc = test::init_service(app.app()).await;

        let resp = test::call_service(
            &svc,
            app.post("/api/messages", &app.admin_token)
                .set_json(json!({"employee_id": 42, "subject": "Hi", "body": "there"}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = test::call_service(
            &svc,
            app.post("/api/messages", &app.admin_token)
                .set_json(json!({"subject": " ", "body": "there"}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
