use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

use crate::store::Record;

/// Side of the admin/employee conversation that wrote a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, EnumString, AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Sender {
    Admin,
    Employee,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, EnumString, AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum MessageCategory {
    General,
    Notice,
    Leave,
    Certificate,
    Contract,
    Document,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Message {
    #[schema(example = 10)]
    pub id: u64,
    /// Employee side of the conversation
    #[schema(example = 1000)]
    pub employee_id: u64,
    pub sender: Sender,
    pub category: MessageCategory,
    #[schema(example = "Leave approved")]
    pub subject: String,
    pub body: String,
    /// Id of the leave/contract/... record this message is about
    #[schema(example = 5, nullable = true)]
    pub related_id: Option<u64>,
    pub read: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub read_at: Option<DateTime<Utc>>,
}

/// Whose inbox is being looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbox {
    Admin,
    Employee(u64),
}

impl Message {
    pub fn new(
        employee_id: u64,
        sender: Sender,
        category: MessageCategory,
        subject: impl Into<String>,
        body: impl Into<String>,
        related_id: Option<u64>,
    ) -> Self {
        Self {
            id: 0,
            employee_id,
            sender,
            category,
            subject: subject.into(),
            body: body.into(),
            related_id,
            read: false,
            created_at: Utc::now(),
            read_at: None,
        }
    }

    /// Admin receives what employees send; an employee receives what admin
    /// sent to them.
    pub fn is_in(&self, inbox: Inbox) -> bool {
        match inbox {
            Inbox::Admin => self.sender == Sender::Employee,
            Inbox::Employee(id) => self.sender == Sender::Admin && self.employee_id == id,
        }
    }

    /// Visible to the inbox owner and to whoever wrote it.
    pub fn is_visible_to(&self, inbox: Inbox) -> bool {
        match inbox {
            Inbox::Admin => true,
            Inbox::Employee(id) => self.employee_id == id,
        }
    }

    pub fn mark_read(&mut self, at: DateTime<Utc>) {
        if !self.read {
            self.read = true;
            self.read_at = Some(at);
        }
    }
}

impl Record for Message {
    const KEY: &'static str = "messages";

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}
