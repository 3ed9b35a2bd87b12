use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a work assignment. Wire code (route segments):
/// Pending=0, Started=1, Completed=2, Paused=3.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum WorkStatus {
    Pending,
    Started,
    Completed,
    Paused,
}

impl WorkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Paused => "paused",
        }
    }

    /// Maps the numeric code used in route segments. Returns None for
    /// anything outside 0..=3 so the boundary can reject it.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Pending),
            1 => Some(Self::Started),
            2 => Some(Self::Completed),
            3 => Some(Self::Paused),
            _ => None,
        }
    }
}

impl std::fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "started" => Ok(Self::Started),
            "completed" => Ok(Self::Completed),
            "paused" => Ok(Self::Paused),
            _ => Err(format!("Invalid work status: {}", s)),
        }
    }
}

/// Quality-control sign-off state. Wire code: Pending=0, Approved=1,
/// Rejected=2. Approved and Rejected are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Pending),
            1 => Some(Self::Approved),
            2 => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Invalid approval status: {}", s)),
        }
    }
}

/// Audit event type. One row per meaningful transition; Created and
/// Unknown exist for legacy data and the fallback mapping respectively.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LogEventType {
    Started,
    Paused,
    Completed,
    Approved,
    Rejected,
    Created,
    Unknown,
}

impl LogEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Created => "created",
            Self::Unknown => "unknown",
        }
    }

    /// Fixed status→event mapping used by the single-row update path.
    pub fn from_status(status: WorkStatus) -> Self {
        match status {
            WorkStatus::Started => Self::Started,
            WorkStatus::Paused => Self::Paused,
            WorkStatus::Completed => Self::Completed,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for LogEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "started" => Ok(Self::Started),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "created" => Ok(Self::Created),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("Invalid log event type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum PersonRole {
    Admin,
    Worker,
}

impl PersonRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Worker => "worker",
        }
    }
}

impl std::fmt::Display for PersonRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersonRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "worker" => Ok(Self::Worker),
            _ => Err(format!("Invalid person role: {}", s)),
        }
    }
}

/// Directory entry for a worker or admin. The credential fields never
/// leave the server: they are skipped on serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub section_id: Option<i64>,
    pub role: PersonRole,
    #[serde(skip)]
    pub hashed_password: String,
    #[serde(skip)]
    pub refresh_token: Option<String>,
    #[serde(skip)]
    pub refresh_token_expires_at: Option<String>,
}

/// A production stage (cutting, assembly, ...) that work orders flow
/// through. Carries a soft-delete flag as data; the delete endpoint
/// performs a hard delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_deleted: bool,
    pub deletion_date: Option<String>,
}

/// One production stage's claim on one work order. The lifecycle core of
/// the system: status and approval transitions happen here and every
/// transition leaves a SessionLog row behind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkAssignment {
    pub id: i64,
    pub work_order_id: String,
    pub section_id: i64,
    pub person_id: i64,
    pub start_date: String,
    pub end_date: Option<String>,
    pub pause_date: Option<String>,
    pub status: WorkStatus,
    pub approval_status: ApprovalStatus,
    pub description: Option<String>,
    pub approval_notes: Option<String>,
}

/// Append-only audit event. Written once, never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionLog {
    pub id: i64,
    pub work_order_id: String,
    pub section_id: i64,
    pub person_id: i64,
    pub log_type: LogEventType,
    pub event_date: String,
}

/// Registry row for an ingested workbook. Exactly one row is active at a
/// time; uploading a new file deactivates the previous one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcelFile {
    pub id: i64,
    pub file_name: String,
    pub stored_name: String,
    pub uploaded_at: String,
    pub is_active: bool,
    pub is_deleted: bool,
}

// API view types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentDetail {
    #[serde(flatten)]
    pub assignment: WorkAssignment,
    pub person: Option<Person>,
    pub section: Option<Section>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonInfo {
    #[serde(flatten)]
    pub person: Person,
    pub section: Option<Section>,
}
