//! Request and response types for the verification workflow.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;
use verification_db::entities::{case, decline_reason, note};

/// A case as it appears in the worklist.
#[derive(Debug, Clone, Serialize)]
pub struct CaseSummary {
    pub case_id: i32,
    pub user_id: String,
    pub ldap_id: String,
    pub registration_data: Value,
    /// Display status; a Pending case with notes reads as `In Progress`.
    pub status: String,
    pub date_added: DateTime<FixedOffset>,
    pub staff_id: Option<String>,
    pub date_agreed: Option<DateTime<FixedOffset>>,
}

impl CaseSummary {
    /// Build a summary from a stored case.
    #[must_use]
    pub fn from_model(case: case::Model, has_notes: bool) -> Self {
        let status = case.display_status(has_notes).to_string();
        Self {
            case_id: case.case_id,
            user_id: case.user_id,
            ldap_id: case.ldap_id,
            registration_data: case.registration_data,
            status,
            date_added: case.date_added,
            staff_id: case.staff_id,
            date_agreed: case.date_agreed,
        }
    }
}

/// A single case with its notepad.
#[derive(Debug, Clone, Serialize)]
pub struct CaseDetail {
    #[serde(flatten)]
    pub case: CaseSummary,
    pub notes: Vec<NoteView>,
}

/// A notepad entry.
#[derive(Debug, Clone, Serialize)]
pub struct NoteView {
    pub note_id: i32,
    pub case_id: i32,
    pub note_text: String,
    pub staff_id: Option<String>,
    pub date_added: DateTime<FixedOffset>,
}

impl From<note::Model> for NoteView {
    fn from(model: note::Model) -> Self {
        Self {
            note_id: model.note_id,
            case_id: model.case_id,
            note_text: model.note_text,
            staff_id: model.staff_id,
            date_added: model.date_added,
        }
    }
}

/// A decline reason as presented to staff.
#[derive(Debug, Clone, Serialize)]
pub struct DeclineReasonView {
    pub decline_reason: String,
    pub decline_text: String,
    pub decline_advice: String,
}

impl From<decline_reason::Model> for DeclineReasonView {
    fn from(model: decline_reason::Model) -> Self {
        Self {
            decline_reason: model.decline_description,
            decline_text: model.decline_detail,
            decline_advice: model.decline_advice,
        }
    }
}

/// Result of approving or declining a case.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub case_id: i32,
    pub staff_id: String,
    pub status_updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advice: Option<String>,
}

/// Result of closing an account.
#[derive(Debug, Clone, Serialize)]
pub struct CloseOutcome {
    pub case_id: i32,
    pub requester: String,
    pub close_detail: String,
    pub staff_id: Option<String>,
    pub status_updated: bool,
}

/// Closure record for a closed case.
#[derive(Debug, Clone, Serialize)]
pub struct ClosureView {
    pub closure_reason: String,
    pub date_closed: DateTime<FixedOffset>,
}

/// Result of an automated closure request.
#[derive(Debug, Clone, Serialize)]
pub struct AutoCloseOutcome {
    pub status: bool,
}

/// Result of a contact detail update.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateOutcome {
    pub updated: bool,
}

/// The payload forwarded to the dataset service, echoed back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetAccessOutcome {
    pub user_details_id: String,
    pub licences: Vec<LicenceUpdate>,
}

/// A single licence grant or removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenceUpdate {
    pub licence_id: String,
    pub agreed: bool,
}

/// Body for approve and decline requests.
#[derive(Debug, Clone, Deserialize)]
pub struct CaseActionRequest {
    pub staff_id: String,
    pub reason: Option<String>,
    pub advice: Option<String>,
}

/// Body for a staff-initiated account closure.
#[derive(Debug, Clone, Deserialize)]
pub struct CloseRequest {
    pub requester: String,
    pub close_detail: String,
    pub staff_id: Option<String>,
}

/// Body for an automated closure.
#[derive(Debug, Clone, Deserialize)]
pub struct AutoCloseRequest {
    /// Whether to actually close the account, or only record the warning note.
    pub close: bool,
    pub note_text: String,
    pub staff_id: Option<String>,
}

/// Body for registering a new case.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewCase {
    #[validate(length(min = 1))]
    pub user_id: String,
    #[validate(length(min = 1))]
    pub ldap_id: String,
    pub registration_data: Value,
}

/// Body for adding a notepad entry.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NoteRequest {
    pub staff_id: Option<String>,
    #[validate(length(min = 1))]
    pub note_text: String,
}

/// Body for a worklist search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub organisation_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Body for a contact detail update.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDetailsRequest {
    pub staff_id: Option<String>,
    pub updated_data: Map<String, Value>,
}

/// Body for a dataset access update.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetAccessRequest {
    pub staff_id: Option<String>,
    pub licences: Vec<LicenceUpdate>,
}
