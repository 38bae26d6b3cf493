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
pub enum EmployeeStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP-001",
        "first_name": "Mina",
        "last_name": "Park",
        "email": "mina.park@company.com",
        "phone": "+82-10-1234-5678",
        "department": "Engineering",
        "position": "Backend Developer",
        "hire_date": "2024-01-01",
        "status": "ACTIVE",
        "created_at": "2024-01-01T00:00:00Z"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "EMP-001")]
    pub employee_code: String,

    #[schema(example = "Mina")]
    pub first_name: String,

    #[schema(example = "Park")]
    pub last_name: String,

    #[schema(example = "mina.park@company.com")]
    pub email: String,

    #[schema(example = "+82-10-1234-5678", nullable = true)]
    pub phone: Option<String>,

    #[schema(example = "Engineering")]
    pub department: String,

    #[schema(example = "Backend Developer")]
    pub position: String,

    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub hire_date: NaiveDate,

    pub status: EmployeeStatus,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active
    }

    /// Case-insensitive match over name, email and code.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [
            &self.first_name,
            &self.last_name,
            &self.email,
            &self.employee_code,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
            || self.full_name().to_lowercase().contains(&needle)
    }
}

impl Record for Employee {
    const KEY: &'static str = "employees";

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}
