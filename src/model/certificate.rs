use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

use crate::store::Record;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, EnumString, AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum CertificateType {
    /// Proof of current employment
    Employment,
    /// Career history
    Career,
    /// Income statement
    Income,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, EnumString, AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum CertificateStatus {
    Pending,
    Issued,
}

pub const MAX_COPIES: u8 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CertificateRequest {
    #[schema(example = 12)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    pub certificate_type: CertificateType,
    #[schema(example = "Bank loan application")]
    pub purpose: String,
    #[schema(example = 1)]
    pub copies: u8,
    pub status: CertificateStatus,
    #[schema(example = "CERT-2026-000012", nullable = true)]
    pub serial_number: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub requested_at: DateTime<Utc>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub issued_at: Option<DateTime<Utc>>,
}

impl CertificateRequest {
    /// Marks a pending request issued. Returns false if already issued.
    pub fn issue(&mut self, at: DateTime<Utc>) -> bool {
        if self.status != CertificateStatus::Pending {
            return false;
        }
        self.status = CertificateStatus::Issued;
        self.serial_number = Some(format!("CERT-{}-{:06}", at.year(), self.id));
        self.issued_at = Some(at);
        true
    }
}

impl Record for CertificateRequest {
    const KEY: &'static str = "certificate_requests";

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}
