pub mod attendance;
pub mod certificate;
pub mod contract;
pub mod document_request;
pub mod employee;
pub mod leave_request;
pub mod message;
pub mod role;
pub mod user;
