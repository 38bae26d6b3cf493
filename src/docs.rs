use crate::api::attendance::{AttendanceListResponse, AttendanceSummary, AttendanceView};
use crate::api::certificate::{CertificateListResponse, CreateCertificate};
use crate::api::contract::{ContractListResponse, CreateContract, SignContract};
use crate::api::dashboard::Dashboard;
use crate::api::document_request::{CreateDocumentRequest, DocumentListResponse, SubmitDocument};
use crate::api::employee::{CreateEmployee, EmployeeListResponse, UpdateEmployee};
use crate::api::leave_request::{CreateLeave, LeaveListResponse, LeaveResponse};
use crate::api::message::{MessageListResponse, SendMessage, UnreadCount};
use crate::model::attendance::AttendanceStatus;
use crate::model::certificate::{CertificateRequest, CertificateStatus, CertificateType};
use crate::model::contract::{Contract, ContractStatus, ContractType};
use crate::model::document_request::{DocumentRequest, DocumentStatus, DocumentType};
use crate::model::employee::{Employee, EmployeeStatus};
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType};
use crate::model::message::{Message, MessageCategory, Sender};
use crate::models::{LoginReqDto, TokenPair, UserReq};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HR Desk API",
        version = "1.0.0",
        description = r#"
## HR Desk

Back end for a small company's HR dashboard and its employee mobile app.

### 🔹 Key Features
- **Employees**: create, update, list and view employee profiles
- **Attendance**: daily check-in/check-out, a derived daily status board and summary
- **Leave**: apply, approve/reject, and view leave history
- **Certificates**: request employment, career and income certificates; HR issues them with a serial number
- **Contracts**: HR sends contracts, employees sign them
- **Documents**: HR asks for documents, employees submit them
- **Messages**: admin ↔ employee inbox, broadcast notices and workflow notifications
- **Dashboard**: today's numbers at a glance

### 🔐 Security
Endpoints under the API prefix require a **JWT Bearer** access token.
HR/Admin-only operations answer **403** for employees.

### 📦 Response Format
- JSON everywhere; errors are `{"message": "..."}`
- List endpoints are paginated with `page` / `per_page`
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::my_attendance,
        crate::api::attendance::attendance_board,
        crate::api::attendance::attendance_summary,

        crate::api::leave_request::create_leave,
        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,

        crate::api::certificate::create_certificate,
        crate::api::certificate::list_certificates,
        crate::api::certificate::get_certificate,
        crate::api::certificate::issue_certificate,

        crate::api::contract::create_contract,
        crate::api::contract::list_contracts,
        crate::api::contract::get_contract,
        crate::api::contract::sign_contract,

        crate::api::document_request::create_document_request,
        crate::api::document_request::list_document_requests,
        crate::api::document_request::get_document_request,
        crate::api::document_request::submit_document,
        crate::api::document_request::delete_document_request,

        crate::api::message::send_message,
        crate::api::message::list_messages,
        crate::api::message::unread_count,
        crate::api::message::get_message,
        crate::api::message::mark_read,
        crate::api::message::mark_all_read,

        crate::api::dashboard::dashboard
    ),
    components(
        schemas(
            UserReq,
            LoginReqDto,
            TokenPair,
            Employee,
            EmployeeStatus,
            CreateEmployee,
            UpdateEmployee,
            EmployeeListResponse,
            AttendanceStatus,
            AttendanceView,
            AttendanceListResponse,
            AttendanceSummary,
            LeaveType,
            LeaveStatus,
            LeaveRequest,
            CreateLeave,
            LeaveResponse,
            LeaveListResponse,
            CertificateType,
            CertificateStatus,
            CertificateRequest,
            CreateCertificate,
            CertificateListResponse,
            ContractType,
            ContractStatus,
            Contract,
            CreateContract,
            SignContract,
            ContractListResponse,
            DocumentType,
            DocumentStatus,
            DocumentRequest,
            CreateDocumentRequest,
            SubmitDocument,
            DocumentListResponse,
            Sender,
            MessageCategory,
            Message,
            SendMessage,
            MessageListResponse,
            UnreadCount,
            Dashboard
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and token rotation"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Attendance", description = "Attendance management APIs"),
        (name = "Leave", description = "Leave management APIs"),
        (name = "Certificate", description = "Certificate request APIs"),
        (name = "Contract", description = "Contract APIs"),
        (name = "Document", description = "Document request APIs"),
        (name = "Message", description = "Inbox and notifications"),
        (name = "Dashboard", description = "Admin overview"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme the paths refer to.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_area_and_the_bearer_scheme() {
        let doc = ApiDoc::openapi();
        for path in [
            "/auth/login",
            "/api/employee",
            "/api/attendance/summary",
            "/api/leave/{leave_id}/approve",
            "/api/certificates/{id}/issue",
            "/api/contracts/{id}/sign",
            "/api/documents/{id}",
            "/api/messages/unread-count",
            "/api/dashboard",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
