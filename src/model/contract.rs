use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

use crate::store::Record;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, EnumString, AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum ContractType {
    Employment,
    Salary,
    Nda,
    Other,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, EnumString, AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum ContractStatus {
    Pending,
    Signed,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Contract {
    #[schema(example = 3)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2026 Employment Agreement")]
    pub title: String,
    pub contract_type: ContractType,
    pub content: String,
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(example = "2026-12-31", value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
    #[schema(example = 48000000)]
    pub annual_salary: Option<u64>,
    pub status: ContractStatus,
    #[schema(value_type = String, format = "date-time")]
    pub sent_at: DateTime<Utc>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub signed_at: Option<DateTime<Utc>>,
    #[schema(example = "Mina Park", nullable = true)]
    pub signature: Option<String>,
}

impl Contract {
    /// Records the employee's signature. Returns false if already signed.
    pub fn sign(&mut self, signature: &str, at: DateTime<Utc>) -> bool {
        if self.status != ContractStatus::Pending {
            return false;
        }
        self.status = ContractStatus::Signed;
        self.signature = Some(signature.trim().to_string());
        self.signed_at = Some(at);
        true
    }
}

impl Record for Contract {
    const KEY: &'static str = "contracts";

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}
