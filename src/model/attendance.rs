use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

use crate::config::WorkPolicy;
use crate::store::Record;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attendance {
    pub id: u64,
    pub employee_id: u64,
    pub date: NaiveDate,
    pub check_in: NaiveTime,
    pub check_out: Option<NaiveTime>,
}

impl Record for Attendance {
    const KEY: &'static str = "attendance";

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum AttendanceStatus {
    Normal,
    Late,
    Leave,
    Working,
    Absent,
}

impl Attendance {
    pub fn is_open(&self) -> bool {
        self.check_out.is_none()
    }

    pub fn is_late(&self, policy: &WorkPolicy) -> bool {
        let cutoff = policy.work_start + Duration::minutes(i64::from(policy.late_grace_minutes));
        self.check_in > cutoff
    }

    /// Minutes between check-in and check-out, if checked out.
    pub fn worked_minutes(&self) -> Option<i64> {
        self.check_out
            .map(|out| (out - self.check_in).num_minutes().max(0))
    }
}

/// Status of one employee on `date`, as seen at `now`.
///
/// A record always wins over leave: an employee on approved leave who still
/// checks in is reported by the record.
pub fn derive_status(
    record: Option<&Attendance>,
    on_approved_leave: bool,
    date: NaiveDate,
    now: NaiveDateTime,
    policy: &WorkPolicy,
) -> AttendanceStatus {
    match record {
        Some(r) if r.is_open() && date == now.date() => AttendanceStatus::Working,
        Some(r) if r.is_late(policy) => AttendanceStatus::Late,
        Some(_) => AttendanceStatus::Normal,
        None if on_approved_leave => AttendanceStatus::Leave,
        None => AttendanceStatus::Absent,
    }
}
