use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

use crate::store::Record;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum DocumentType {
    IdCard,
    BankAccount,
    Diploma,
    HealthCheck,
    Residence,
    Other,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, EnumString, AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum DocumentStatus {
    Pending,
    Submitted,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentRequest {
    #[schema(example = 4)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    pub document_type: DocumentType,
    #[schema(example = "Needed for payroll setup", nullable = true)]
    pub note: Option<String>,
    #[schema(example = "2026-02-01", value_type = Option<String>, format = "date")]
    pub due_date: Option<NaiveDate>,
    pub status: DocumentStatus,
    #[schema(example = "bank_account.pdf", nullable = true)]
    pub file_name: Option<String>,
    #[schema(nullable = true)]
    pub submitted_note: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub requested_at: DateTime<Utc>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl DocumentRequest {
    /// Attaches the employee's upload. Returns false if already submitted.
    pub fn submit(&mut self, file_name: &str, note: Option<String>, at: DateTime<Utc>) -> bool {
        if self.status != DocumentStatus::Pending {
            return false;
        }
        self.status = DocumentStatus::Submitted;
        self.file_name = Some(file_name.trim().to_string());
        self.submitted_note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        self.submitted_at = Some(at);
        true
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == DocumentStatus::Pending && self.due_date.is_some_and(|due| due < today)
    }
}

impl Record for DocumentRequest {
    const KEY: &'static str = "document_requests";

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(due: Option<NaiveDate>) -> DocumentRequest {
        DocumentRequest {
            id: 1,
            employee_id: 1,
            document_type: DocumentType::BankAccount,
            note: None,
            due_date: due,
            status: DocumentStatus::Pending,
            file_name: None,
            submitted_note: None,
            requested_at: Utc::now(),
            submitted_at: None,
        }
    }

    #[test]
    fn submit_once_and_drop_blank_note() {
        let mut d = request(None);
        assert!(d.submit(" bank.pdf ", Some("   ".into()), Utc::now()));
        assert_eq!(d.file_name.as_deref(), Some("bank.pdf"));
        assert_eq!(d.submitted_note, None);
        assert!(!d.submit("other.pdf", None, Utc::now()));
        assert_eq!(d.file_name.as_deref(), Some("bank.pdf"));
    }

    #[test]
    fn overdue_only_while_pending() {
        let due = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let after = NaiveDate::from_ymd_opt(2026, 2, 2).unwrap();
        let mut d = request(Some(due));
        assert!(!d.is_overdue(due));
        assert!(d.is_overdue(after));
        d.submit("x.pdf", None, Utc::now());
        assert!(!d.is_overdue(after));
    }

    #[test]
    fn type_names_are_screaming_snake() {
        assert_eq!(DocumentType::IdCard.as_ref(), "ID_CARD");
        assert_eq!("bank_account".parse::<DocumentType>().unwrap(), DocumentType::BankAccount);
    }
}
