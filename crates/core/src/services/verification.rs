//! The verification case workflow.
//!
//! Everything staff can do to a case goes through [`VerificationService`]:
//! worklist reads, approve/decline decisions, locking, notes, closures and
//! the passthrough reads against the dataset service. Decisions call out to
//! the account service before the case row is updated, so a failed upstream
//! call leaves the case untouched.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveValue::Set, IntoActiveModel};
use serde_json::{Map, Value, json};
use tracing::{error, info};
use validator::Validate;
use verification_clients::{AccountApi, DatasetApi};
use verification_common::{AppError, AppResult};
use verification_db::entities::case::{self, CaseStatus};
use verification_db::entities::{close, note};
use verification_db::repositories::{
    CaseRepository, CloseRepository, DeclineReasonRepository, NoteRepository, SearchFilters,
};

use crate::models::{
    ActionOutcome, AutoCloseOutcome, AutoCloseRequest, CaseActionRequest, CaseDetail, CaseSummary,
    CloseOutcome, CloseRequest, ClosureView, DatasetAccessOutcome, DatasetAccessRequest,
    DeclineReasonView, LicenceUpdate, NewCase, NoteRequest, NoteView, SearchParams, UpdateOutcome,
    UpdateDetailsRequest,
};

/// Requester recorded against automated closures.
const AUTO_CLOSE_REQUESTER: &str = "HMLR";

/// Closure detail recorded against automated closures.
const AUTO_CLOSE_DETAIL: &str = "Automated account closure";

/// Service for the staff verification workflow.
pub struct VerificationService {
    case_repo: CaseRepository,
    note_repo: NoteRepository,
    decline_repo: DeclineReasonRepository,
    close_repo: CloseRepository,
    account_api: Arc<dyn AccountApi>,
    dataset_api: Arc<dyn DatasetApi>,
}

impl VerificationService {
    /// Create a new verification service.
    #[must_use]
    pub fn new(
        case_repo: CaseRepository,
        note_repo: NoteRepository,
        decline_repo: DeclineReasonRepository,
        close_repo: CloseRepository,
        account_api: Arc<dyn AccountApi>,
        dataset_api: Arc<dyn DatasetApi>,
    ) -> Self {
        Self {
            case_repo,
            note_repo,
            decline_repo,
            close_repo,
            account_api,
            dataset_api,
        }
    }

    /// The worklist: all pending cases, newest first.
    pub async fn get_pending(&self) -> AppResult<Vec<CaseSummary>> {
        let cases = self.case_repo.find_pending().await?;
        self.summarize(cases).await
    }

    /// A single case with its notepad.
    pub async fn get_case(&self, case_id: i32) -> AppResult<CaseDetail> {
        let case = self.fetch_case(case_id).await?;
        let notes: Vec<NoteView> = self
            .note_repo
            .find_by_case(case_id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        let summary = CaseSummary::from_model(case, !notes.is_empty());
        Ok(CaseDetail {
            case: summary,
            notes,
        })
    }

    /// Approve or decline a case on behalf of a staff member.
    ///
    /// The account service is notified first; only once that call succeeds is
    /// the case row resolved. Declines also record the reason and next-steps
    /// advice as a notepad entry.
    pub async fn case_action(
        &self,
        action: &str,
        case_id: i32,
        request: CaseActionRequest,
    ) -> AppResult<ActionOutcome> {
        let case = self.fetch_case(case_id).await?;

        if !can_perform_action(&case, Some(&request.staff_id)) {
            return Err(AppError::Locked(
                "Could not perform action on case as it is locked to another user".to_string(),
            ));
        }

        match action {
            "Approve" => {
                self.account_api.approve(&case.ldap_id).await?;
                self.resolve_case(case, CaseStatus::Approved, &request.staff_id)
                    .await?;

                Ok(ActionOutcome {
                    case_id,
                    staff_id: request.staff_id,
                    status_updated: true,
                    reason: None,
                    advice: None,
                })
            }
            "Decline" => {
                let reason = request
                    .reason
                    .as_deref()
                    .ok_or_else(|| AppError::Validation("A decline reason is required".to_string()))?;
                let advice = request.advice.as_deref().ok_or_else(|| {
                    AppError::Validation("Decline next-steps advice is required".to_string())
                })?;

                // Lower-cased to fit mid-sentence in the notification template.
                let reason = lower_first(reason);
                let ldap_id = case.ldap_id.clone();
                let user_id = case.user_id.clone();

                self.account_api
                    .decline(&ldap_id, &reason, advice, &user_id)
                    .await?;
                self.resolve_case(case, CaseStatus::Declined, &request.staff_id)
                    .await?;
                self.add_note(
                    case_id,
                    Some(request.staff_id.clone()),
                    decline_note_text(&reason, advice),
                )
                .await?;

                Ok(ActionOutcome {
                    case_id,
                    staff_id: request.staff_id,
                    status_updated: true,
                    reason: request.reason,
                    advice: request.advice,
                })
            }
            other => {
                error!(case_id, action = other, "Invalid action");
                Err(AppError::Verification(format!("Invalid action {other}")))
            }
        }
    }

    /// Close an approved account at a staff member's or the user's request.
    pub async fn close_account(
        &self,
        case_id: i32,
        request: CloseRequest,
    ) -> AppResult<CloseOutcome> {
        let case = self.fetch_case(case_id).await?;

        if case.status != CaseStatus::Approved {
            error!(case_id, "Account closure only permitted on active user accounts");
            return Err(AppError::Conflict(
                "Account closure only permitted on active user accounts".to_string(),
            ));
        }

        self.account_api
            .close(&case.ldap_id, &case.user_id, &request.requester)
            .await?;

        self.close_repo
            .create(close::ActiveModel {
                case_id: Set(case_id),
                close_detail: Set(request.close_detail.clone()),
                requester: Set(request.requester.clone()),
                staff_id: Set(request.staff_id.clone()),
                ..Default::default()
            })
            .await?;

        let mut active = case.into_active_model();
        active.status = Set(CaseStatus::Closed);
        self.case_repo.update(active).await?;

        Ok(CloseOutcome {
            case_id,
            requester: request.requester,
            close_detail: request.close_detail,
            staff_id: request.staff_id,
            status_updated: true,
        })
    }

    /// Automated closure driven by account inactivity, keyed by directory
    /// identity. Records the warning or closure note either way; the case is
    /// only closed when `close` is set.
    pub async fn auto_close(
        &self,
        ldap_id: &str,
        request: AutoCloseRequest,
    ) -> AppResult<AutoCloseOutcome> {
        let case = self
            .case_repo
            .find_by_ldap_id(ldap_id)
            .await?
            .ok_or_else(|| AppError::CaseNotFound(ldap_id.to_string()))?;
        let case_id = case.case_id;

        if request.close {
            let mut active = case.into_active_model();
            active.status = Set(CaseStatus::Closed);
            self.case_repo.update(active).await?;

            self.close_repo
                .create(close::ActiveModel {
                    case_id: Set(case_id),
                    close_detail: Set(AUTO_CLOSE_DETAIL.to_string()),
                    requester: Set(AUTO_CLOSE_REQUESTER.to_string()),
                    staff_id: Set(request.staff_id.clone()),
                    ..Default::default()
                })
                .await?;
        }

        self.insert_note(
            case_id,
            NoteRequest {
                staff_id: request.staff_id,
                note_text: request.note_text,
            },
        )
        .await?;

        Ok(AutoCloseOutcome { status: true })
    }

    /// The closure record for a closed case.
    pub async fn get_closure(&self, case_id: i32) -> AppResult<ClosureView> {
        let closure = self
            .close_repo
            .find_by_case(case_id)
            .await?
            .ok_or_else(|| AppError::CaseNotFound(case_id.to_string()))?;

        Ok(ClosureView {
            closure_reason: closure.close_detail,
            date_closed: closure.date_added,
        })
    }

    /// Register a new case on the worklist. New cases always start Pending
    /// and unlocked.
    pub async fn insert_case(&self, new_case: NewCase) -> AppResult<i32> {
        new_case.validate()?;

        let created = self
            .case_repo
            .create(case::ActiveModel {
                user_id: Set(new_case.user_id),
                ldap_id: Set(new_case.ldap_id),
                registration_data: Set(new_case.registration_data),
                status: Set(CaseStatus::Pending),
                ..Default::default()
            })
            .await?;

        info!(case_id = created.case_id, "Case added to worklist");
        Ok(created.case_id)
    }

    /// Add a notepad entry, subject to the case lock.
    pub async fn insert_note(&self, case_id: i32, request: NoteRequest) -> AppResult<()> {
        request.validate()?;

        let Some(case) = self.case_repo.find_by_id(case_id).await? else {
            error!(case_id, "Could not add note for case as it does not exist");
            return Err(AppError::CaseNotFound(case_id.to_string()));
        };

        if !can_perform_action(&case, request.staff_id.as_deref()) {
            error!(case_id, "Could not add note to case as it is locked to another user");
            return Err(AppError::Locked(
                "Could not add note to case as it is locked to another user".to_string(),
            ));
        }

        self.add_note(case_id, request.staff_id, request.note_text)
            .await?;
        Ok(())
    }

    /// Active decline reasons for the decline form.
    pub async fn get_decline_reasons(&self) -> AppResult<Vec<DeclineReasonView>> {
        let reasons = self.decline_repo.find_active().await?;
        Ok(reasons.into_iter().map(Into::into).collect())
    }

    /// Take the case lock for `owner`.
    ///
    /// The claim is a single conditional update: it succeeds when the case is
    /// unlocked or already held by `owner`, and reports contention otherwise.
    pub async fn lock_case(&self, case_id: i32, owner: &str) -> AppResult<()> {
        let case = self.fetch_case(case_id).await?;

        if matches!(case.status, CaseStatus::Approved | CaseStatus::Declined) {
            return Err(AppError::Locking("Cannot lock resolved case".to_string()));
        }

        if !self.case_repo.try_set_lock_owner(case_id, owner).await? {
            return Err(AppError::Locked(format!(
                "Case {case_id} is already locked to another user"
            )));
        }

        Ok(())
    }

    /// Release the case lock, whoever holds it.
    pub async fn unlock_case(&self, case_id: i32) -> AppResult<()> {
        let case = self.fetch_case(case_id).await?;

        if matches!(case.status, CaseStatus::Approved | CaseStatus::Declined) {
            return Err(AppError::Locking("Cannot lock resolved case".to_string()));
        }

        self.case_repo.clear_lock_owner(case_id).await
    }

    /// Search cases by registration details.
    pub async fn search(&self, params: &SearchParams) -> AppResult<Vec<CaseSummary>> {
        let filters = SearchFilters {
            first_name: params.first_name.clone(),
            last_name: params.last_name.clone(),
            organisation_name: params.organisation_name.clone(),
            email: params.email.clone(),
        };

        let cases = self.case_repo.search(&filters).await?;
        self.summarize(cases).await
    }

    /// Update a user's contact details, in the dataset service and in the
    /// case's registration document. Contact preference changes are recorded
    /// as a notepad entry.
    pub async fn update_user_details(
        &self,
        case_id: i32,
        request: UpdateDetailsRequest,
    ) -> AppResult<UpdateOutcome> {
        let case = self.fetch_case(case_id).await?;

        let mut dataset_update = Map::new();
        dataset_update.insert("user_id".to_string(), json!(case.user_id));
        for (key, value) in &request.updated_data {
            dataset_update.insert(key.clone(), value.clone());
        }
        self.dataset_api
            .update_contact_preference(&Value::Object(dataset_update))
            .await?;

        let merged = merge_registration_data(case.registration_data.clone(), &request.updated_data);
        let mut active = case.into_active_model();
        active.registration_data = Set(merged);
        self.case_repo.update(active).await?;

        if request.updated_data.contains_key("contactable") {
            let note = contact_note(&request.updated_data);
            self.add_note(case_id, request.staff_id, note).await?;
        }

        Ok(UpdateOutcome { updated: true })
    }

    /// The dataset catalogue, passed through from the dataset service.
    pub async fn get_dataset_list_details(&self) -> AppResult<Value> {
        self.dataset_api.get_dataset_list_details().await
    }

    /// Grant or revoke dataset licences for the case's user, recording the
    /// change as a notepad entry.
    pub async fn update_dataset_access(
        &self,
        case_id: i32,
        request: DatasetAccessRequest,
    ) -> AppResult<DatasetAccessOutcome> {
        let case = self.fetch_case(case_id).await?;

        let outcome = DatasetAccessOutcome {
            user_details_id: case.user_id,
            licences: request.licences,
        };

        let payload =
            serde_json::to_value(&outcome).map_err(|e| AppError::Internal(e.to_string()))?;
        self.dataset_api.update_dataset_access(&payload).await?;

        self.add_note(case_id, request.staff_id, dataset_access_note(&outcome.licences))
            .await?;

        Ok(outcome)
    }

    /// The short names of the directory groups the case's user belongs to.
    pub async fn get_groups(&self, case_id: i32) -> AppResult<Vec<String>> {
        info!(case_id, "Getting list of groups from the account service");
        let case = self.fetch_case(case_id).await?;
        let details = self.account_api.get(&case.ldap_id).await?;

        // A single group arrives as a bare string rather than a list.
        let group_dns: Vec<String> = match details.get("groups") {
            Some(Value::String(group)) => vec![group.clone()],
            Some(Value::Array(groups)) => groups
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect(),
            _ => Vec::new(),
        };

        Ok(group_dns.iter().map(|dn| short_group_name(dn)).collect())
    }

    /// The user's licence agreements and download history.
    pub async fn get_dataset_activity(&self, case_id: i32) -> AppResult<Value> {
        info!(case_id, "Getting dataset activity");
        let case = self.fetch_case(case_id).await?;
        self.dataset_api.get_dataset_activity(&case.user_id).await
    }

    /// All datasets with the user's licence agreement state.
    pub async fn get_user_dataset_access(&self, case_id: i32) -> AppResult<Value> {
        info!(case_id, "Getting dataset access");
        let case = self.fetch_case(case_id).await?;
        self.dataset_api.get_user_dataset_access(&case.user_id).await
    }

    async fn fetch_case(&self, case_id: i32) -> AppResult<case::Model> {
        self.case_repo
            .find_by_id(case_id)
            .await?
            .ok_or_else(|| AppError::CaseNotFound(case_id.to_string()))
    }

    async fn summarize(&self, cases: Vec<case::Model>) -> AppResult<Vec<CaseSummary>> {
        let mut summaries = Vec::with_capacity(cases.len());
        for case in cases {
            let has_notes = self.note_repo.has_notes(case.case_id).await?;
            summaries.push(CaseSummary::from_model(case, has_notes));
        }
        Ok(summaries)
    }

    async fn resolve_case(
        &self,
        case: case::Model,
        decision: CaseStatus,
        staff_id: &str,
    ) -> AppResult<case::Model> {
        let mut active = case.into_active_model();
        active.status = Set(decision);
        active.staff_id = Set(Some(staff_id.to_string()));
        active.date_agreed = Set(Some(Utc::now().into()));
        self.case_repo.update(active).await
    }

    async fn add_note(
        &self,
        case_id: i32,
        staff_id: Option<String>,
        note_text: String,
    ) -> AppResult<note::Model> {
        self.note_repo
            .create(note::ActiveModel {
                case_id: Set(case_id),
                note_text: Set(note_text),
                staff_id: Set(staff_id),
                ..Default::default()
            })
            .await
    }
}

/// Whether `staff_id` may act on the case under the lock rules.
///
/// A Pending case may only be acted on by the current lock holder; an
/// unlocked Pending case requires no holder at all. Resolved cases are not
/// subject to the lock.
#[must_use]
pub fn can_perform_action(case: &case::Model, staff_id: Option<&str>) -> bool {
    if case.status == CaseStatus::Pending {
        staff_id == case.staff_id.as_deref()
    } else {
        true
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn decline_note_text(reason: &str, advice: &str) -> String {
    format!("Declined: Reason - {reason}; Next Steps - {advice}")
}

fn merge_registration_data(data: Value, updates: &Map<String, Value>) -> Value {
    match data {
        Value::Object(mut map) => {
            for (key, value) in updates {
                map.insert(key.clone(), value.clone());
            }
            Value::Object(map)
        }
        other => other,
    }
}

fn contact_note(updated_data: &Map<String, Value>) -> String {
    let contactable = updated_data
        .get("contactable")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let contacts: Vec<String> = updated_data
        .get("contact_preferences")
        .and_then(Value::as_array)
        .map(|prefs| {
            prefs
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    contact_preference_note(contactable, &contacts)
}

fn contact_preference_note(contactable: bool, contacts: &[String]) -> String {
    if !contactable {
        return "Contact Preference has been updated to No due to User request".to_string();
    }

    match contacts {
        [] => "Contact Preference has been updated to No due to User request".to_string(),
        [only] => {
            format!("Contact Preference has been updated to {only} due to User request")
        }
        [start @ .., last] => {
            let start = start.join(", ");
            format!(
                "Contact Preferences have been updated to {start} and {last} due to User request"
            )
        }
    }
}

fn dataset_access_note(licences: &[LicenceUpdate]) -> String {
    let messages: Vec<String> = licences
        .iter()
        .map(|licence| {
            let access_type = if licence.agreed { "granted" } else { "removed" };
            format!("access {access_type} for {} dataset", licence.licence_id)
        })
        .collect();

    format!("Data access updated: {}", messages.join(", "))
}

/// The common name portion of a group DN, without its `cn=` prefix.
fn short_group_name(dn: &str) -> String {
    let cn = dn.split(',').next().unwrap_or(dn);
    cn.get(3..).unwrap_or_default().to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Mutex;
    use verification_db::entities::decline_reason;

    #[derive(Default)]
    struct FakeAccountApi {
        approved: Mutex<Vec<String>>,
        declined: Mutex<Vec<(String, String, String, String)>>,
        closed: Mutex<Vec<(String, String, String)>>,
        account_details: Mutex<Option<Value>>,
    }

    #[async_trait]
    impl AccountApi for FakeAccountApi {
        async fn get(&self, _ldap_id: &str) -> AppResult<Value> {
            Ok(self
                .account_details
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| json!({})))
        }

        async fn approve(&self, ldap_id: &str) -> AppResult<()> {
            self.approved.lock().unwrap().push(ldap_id.to_string());
            Ok(())
        }

        async fn decline(
            &self,
            ldap_id: &str,
            reason: &str,
            advice: &str,
            user_id: &str,
        ) -> AppResult<()> {
            self.declined.lock().unwrap().push((
                ldap_id.to_string(),
                reason.to_string(),
                advice.to_string(),
                user_id.to_string(),
            ));
            Ok(())
        }

        async fn close(&self, ldap_id: &str, user_id: &str, requester: &str) -> AppResult<()> {
            self.closed.lock().unwrap().push((
                ldap_id.to_string(),
                user_id.to_string(),
                requester.to_string(),
            ));
            Ok(())
        }

        async fn update_groups(&self, _ldap_id: &str, _groups: &Value) -> AppResult<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeDatasetApi {
        contact_updates: Mutex<Vec<Value>>,
        access_updates: Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl DatasetApi for FakeDatasetApi {
        async fn update_contact_preference(&self, data: &Value) -> AppResult<()> {
            self.contact_updates.lock().unwrap().push(data.clone());
            Ok(())
        }

        async fn get_dataset_list_details(&self) -> AppResult<Value> {
            Ok(json!([]))
        }

        async fn get_dataset_activity(&self, user_id: &str) -> AppResult<Value> {
            Ok(json!({"user_id": user_id, "activity": []}))
        }

        async fn get_user_dataset_access(&self, user_id: &str) -> AppResult<Value> {
            Ok(json!({"user_id": user_id, "datasets": []}))
        }

        async fn update_dataset_access(&self, data: &Value) -> AppResult<Value> {
            self.access_updates.lock().unwrap().push(data.clone());
            Ok(json!({"message": "updated"}))
        }
    }

    fn mock_case(case_id: i32, status: CaseStatus, staff_id: Option<&str>) -> case::Model {
        case::Model {
            case_id,
            user_id: format!("user-{case_id}"),
            ldap_id: format!("cn=user{case_id},ou=users"),
            registration_data: json!({"first_name": "Rob", "email": "rob@example.com"}),
            status,
            date_added: Utc::now().into(),
            staff_id: staff_id.map(String::from),
            date_agreed: None,
        }
    }

    fn mock_note(note_id: i32, case_id: i32, text: &str) -> note::Model {
        note::Model {
            note_id,
            case_id,
            note_text: text.to_string(),
            staff_id: Some("cs999xx".to_string()),
            date_added: Utc::now().into(),
        }
    }

    fn mock_close(case_id: i32, detail: &str) -> close::Model {
        close::Model {
            close_id: 1,
            case_id,
            close_detail: detail.to_string(),
            requester: "customer".to_string(),
            staff_id: Some("cs999xx".to_string()),
            date_added: Utc::now().into(),
        }
    }

    struct Fixture {
        service: VerificationService,
        account: Arc<FakeAccountApi>,
        dataset: Arc<FakeDatasetApi>,
    }

    fn fixture(db: DatabaseConnection) -> Fixture {
        let db = Arc::new(db);
        let account = Arc::new(FakeAccountApi::default());
        let dataset = Arc::new(FakeDatasetApi::default());
        let service = VerificationService::new(
            CaseRepository::new(db.clone()),
            NoteRepository::new(db.clone()),
            DeclineReasonRepository::new(db.clone()),
            CloseRepository::new(db),
            account.clone(),
            dataset.clone(),
        );
        Fixture {
            service,
            account,
            dataset,
        }
    }

    fn action_request(staff_id: &str) -> CaseActionRequest {
        CaseActionRequest {
            staff_id: staff_id.to_string(),
            reason: None,
            advice: None,
        }
    }

    #[tokio::test]
    async fn test_approve_resolves_case_and_notifies_account_service() {
        let case = mock_case(1, CaseStatus::Pending, Some("cs111aa"));
        let mut resolved = case.clone();
        resolved.status = CaseStatus::Approved;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[case], [resolved]])
            .into_connection();
        let fx = fixture(db);

        let outcome = fx
            .service
            .case_action("Approve", 1, action_request("cs111aa"))
            .await
            .unwrap();

        assert!(outcome.status_updated);
        assert_eq!(outcome.case_id, 1);
        assert_eq!(
            *fx.account.approved.lock().unwrap(),
            vec!["cn=user1,ou=users".to_string()]
        );
    }

    #[tokio::test]
    async fn test_action_on_case_locked_to_another_user_is_refused() {
        let case = mock_case(1, CaseStatus::Pending, Some("cs222bb"));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[case]])
            .into_connection();
        let fx = fixture(db);

        let err = fx
            .service
            .case_action("Approve", 1, action_request("cs111aa"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Locked(_)));
        assert_eq!(
            err.to_string(),
            "Locking error: Could not perform action on case as it is locked to another user"
        );
        assert!(fx.account.approved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_action_on_unlocked_pending_case_is_refused() {
        // Staff must hold the lock before acting, even when nobody else does.
        let case = mock_case(1, CaseStatus::Pending, None);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[case]])
            .into_connection();
        let fx = fixture(db);

        let err = fx
            .service
            .case_action("Approve", 1, action_request("cs111aa"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Locked(_)));
    }

    #[tokio::test]
    async fn test_decline_lowercases_reason_and_records_note() {
        let case = mock_case(1, CaseStatus::Pending, Some("cs111aa"));
        let mut resolved = case.clone();
        resolved.status = CaseStatus::Declined;
        let note = mock_note(1, 1, "Declined: Reason - x; Next Steps - y");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[case], [resolved]])
            .append_query_results([[note]])
            .into_connection();
        let fx = fixture(db);

        let request = CaseActionRequest {
            staff_id: "cs111aa".to_string(),
            reason: Some("Details could not be validated".to_string()),
            advice: Some("Re-submit with proof of address".to_string()),
        };
        let outcome = fx.service.case_action("Decline", 1, request).await.unwrap();

        assert!(outcome.status_updated);
        let declined = fx.account.declined.lock().unwrap();
        assert_eq!(declined.len(), 1);
        let (ldap_id, reason, advice, user_id) = &declined[0];
        assert_eq!(ldap_id, "cn=user1,ou=users");
        assert_eq!(reason, "details could not be validated");
        assert_eq!(advice, "Re-submit with proof of address");
        assert_eq!(user_id, "user-1");
    }

    #[tokio::test]
    async fn test_decline_without_reason_is_rejected() {
        let case = mock_case(1, CaseStatus::Pending, Some("cs111aa"));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[case]])
            .into_connection();
        let fx = fixture(db);

        let err = fx
            .service
            .case_action("Decline", 1, action_request("cs111aa"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(fx.account.declined.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_action_is_a_server_error() {
        let case = mock_case(1, CaseStatus::Pending, Some("cs111aa"));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[case]])
            .into_connection();
        let fx = fixture(db);

        let err = fx
            .service
            .case_action("Revoke", 1, action_request("cs111aa"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Verification error: Invalid action Revoke");
    }

    #[tokio::test]
    async fn test_action_on_missing_case_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<case::Model>::new()])
            .into_connection();
        let fx = fixture(db);

        let err = fx
            .service
            .case_action("Approve", 42, action_request("cs111aa"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::CaseNotFound(_)));
    }

    #[tokio::test]
    async fn test_close_account_requires_approved_status() {
        let case = mock_case(1, CaseStatus::Pending, None);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[case]])
            .into_connection();
        let fx = fixture(db);

        let err = fx
            .service
            .close_account(
                1,
                CloseRequest {
                    requester: "customer".to_string(),
                    close_detail: "No longer required".to_string(),
                    staff_id: Some("cs111aa".to_string()),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(
            err.to_string(),
            "Verification error: Account closure only permitted on active user accounts"
        );
        assert!(fx.account.closed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_close_account_records_closure_and_closes_case() {
        let case = mock_case(1, CaseStatus::Approved, Some("cs111aa"));
        let mut closed = case.clone();
        closed.status = CaseStatus::Closed;
        let closure = mock_close(1, "No longer required");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[case]])
            .append_query_results([[closure]])
            .append_query_results([[closed]])
            .into_connection();
        let fx = fixture(db);

        let outcome = fx
            .service
            .close_account(
                1,
                CloseRequest {
                    requester: "customer".to_string(),
                    close_detail: "No longer required".to_string(),
                    staff_id: Some("cs111aa".to_string()),
                },
            )
            .await
            .unwrap();

        assert!(outcome.status_updated);
        assert_eq!(
            *fx.account.closed.lock().unwrap(),
            vec![(
                "cn=user1,ou=users".to_string(),
                "user-1".to_string(),
                "customer".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_auto_close_closes_and_notes_when_eligible() {
        let case = mock_case(1, CaseStatus::Approved, None);
        let mut closed = case.clone();
        closed.status = CaseStatus::Closed;
        let closure = mock_close(1, AUTO_CLOSE_DETAIL);
        let refetched = closed.clone();
        let note = mock_note(1, 1, "Account closed due to inactivity");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[case], [closed]])
            .append_query_results([[closure]])
            .append_query_results([[refetched]])
            .append_query_results([[note]])
            .into_connection();
        let fx = fixture(db);

        let outcome = fx
            .service
            .auto_close(
                "cn=user1,ou=users",
                AutoCloseRequest {
                    close: true,
                    note_text: "Account closed due to inactivity".to_string(),
                    staff_id: None,
                },
            )
            .await
            .unwrap();

        assert!(outcome.status);
    }

    #[tokio::test]
    async fn test_auto_close_warning_only_records_note() {
        let case = mock_case(1, CaseStatus::Approved, None);
        let refetched = case.clone();
        let note = mock_note(1, 1, "Inactivity warning issued");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[case], [refetched]])
            .append_query_results([[note]])
            .into_connection();
        let fx = fixture(db);

        let outcome = fx
            .service
            .auto_close(
                "cn=user1,ou=users",
                AutoCloseRequest {
                    close: false,
                    note_text: "Inactivity warning issued".to_string(),
                    staff_id: None,
                },
            )
            .await
            .unwrap();

        assert!(outcome.status);
    }

    #[tokio::test]
    async fn test_auto_close_unknown_ldap_id_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<case::Model>::new()])
            .into_connection();
        let fx = fixture(db);

        let err = fx
            .service
            .auto_close(
                "cn=ghost,ou=users",
                AutoCloseRequest {
                    close: true,
                    note_text: "Account closed due to inactivity".to_string(),
                    staff_id: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::CaseNotFound(_)));
    }

    #[tokio::test]
    async fn test_get_closure_shapes_record() {
        let closure = mock_close(1, "No longer required");
        let expected_date = closure.date_added;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[closure]])
            .into_connection();
        let fx = fixture(db);

        let view = fx.service.get_closure(1).await.unwrap();
        assert_eq!(view.closure_reason, "No longer required");
        assert_eq!(view.date_closed, expected_date);
    }

    #[tokio::test]
    async fn test_insert_case_returns_new_case_id() {
        let created = mock_case(9, CaseStatus::Pending, None);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[created]])
            .into_connection();
        let fx = fixture(db);

        let case_id = fx
            .service
            .insert_case(NewCase {
                user_id: "user-9".to_string(),
                ldap_id: "cn=user9,ou=users".to_string(),
                registration_data: json!({"first_name": "Rob"}),
            })
            .await
            .unwrap();

        assert_eq!(case_id, 9);
    }

    #[tokio::test]
    async fn test_insert_case_rejects_blank_identifiers() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let fx = fixture(db);

        let err = fx
            .service
            .insert_case(NewCase {
                user_id: String::new(),
                ldap_id: "cn=user9,ou=users".to_string(),
                registration_data: json!({}),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_insert_note_on_missing_case_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<case::Model>::new()])
            .into_connection();
        let fx = fixture(db);

        let err = fx
            .service
            .insert_note(
                7,
                NoteRequest {
                    staff_id: Some("cs111aa".to_string()),
                    note_text: "hello".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::CaseNotFound(_)));
    }

    #[tokio::test]
    async fn test_insert_note_respects_case_lock() {
        let case = mock_case(1, CaseStatus::Pending, Some("cs222bb"));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[case]])
            .into_connection();
        let fx = fixture(db);

        let err = fx
            .service
            .insert_note(
                1,
                NoteRequest {
                    staff_id: Some("cs111aa".to_string()),
                    note_text: "hello".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Locking error: Could not add note to case as it is locked to another user"
        );
    }

    #[tokio::test]
    async fn test_insert_note_by_lock_holder_succeeds() {
        let case = mock_case(1, CaseStatus::Pending, Some("cs111aa"));
        let note = mock_note(1, 1, "hello");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[case]])
            .append_query_results([[note]])
            .into_connection();
        let fx = fixture(db);

        fx.service
            .insert_note(
                1,
                NoteRequest {
                    staff_id: Some("cs111aa".to_string()),
                    note_text: "hello".to_string(),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_get_pending_derives_in_progress_from_notes() {
        let noted = mock_case(1, CaseStatus::Pending, None);
        let bare = mock_case(2, CaseStatus::Pending, None);
        let note = mock_note(1, 1, "started checks");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[noted, bare]])
            .append_query_results([vec![note], vec![]])
            .into_connection();
        let fx = fixture(db);

        let pending = fx.service.get_pending().await.unwrap();

        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].status, "In Progress");
        assert_eq!(pending[1].status, "Pending");
    }

    #[tokio::test]
    async fn test_get_case_returns_notes_newest_first() {
        let case = mock_case(1, CaseStatus::Pending, None);
        let notes = vec![mock_note(2, 1, "second"), mock_note(1, 1, "first")];

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[case]])
            .append_query_results([notes])
            .into_connection();
        let fx = fixture(db);

        let detail = fx.service.get_case(1).await.unwrap();

        assert_eq!(detail.case.status, "In Progress");
        assert_eq!(detail.notes.len(), 2);
        assert_eq!(detail.notes[0].note_text, "second");
    }

    #[tokio::test]
    async fn test_get_case_missing_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<case::Model>::new()])
            .into_connection();
        let fx = fixture(db);

        let err = fx.service.get_case(12).await.unwrap_err();
        assert_eq!(err.to_string(), "Case not found: 12");
    }

    #[tokio::test]
    async fn test_get_decline_reasons_reshapes_rows() {
        let reason = decline_reason::Model {
            decline_id: 1,
            decline_description: "Invalid details".to_string(),
            decline_detail: "The details provided could not be verified".to_string(),
            decline_advice: "Re-submit with proof of address".to_string(),
            date_added: Utc::now().into(),
            date_ended: None,
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[reason]])
            .into_connection();
        let fx = fixture(db);

        let reasons = fx.service.get_decline_reasons().await.unwrap();

        assert_eq!(reasons.len(), 1);
        assert_eq!(reasons[0].decline_reason, "Invalid details");
        assert_eq!(
            reasons[0].decline_text,
            "The details provided could not be verified"
        );
        assert_eq!(reasons[0].decline_advice, "Re-submit with proof of address");
    }

    #[tokio::test]
    async fn test_lock_case_claims_unlocked_case() {
        let case = mock_case(1, CaseStatus::Pending, None);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[case]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let fx = fixture(db);

        fx.service.lock_case(1, "cs111aa").await.unwrap();
    }

    #[tokio::test]
    async fn test_lock_case_reports_contention() {
        let case = mock_case(1, CaseStatus::Pending, Some("cs222bb"));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[case]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();
        let fx = fixture(db);

        let err = fx.service.lock_case(1, "cs111aa").await.unwrap_err();
        assert!(matches!(err, AppError::Locked(_)));
    }

    #[tokio::test]
    async fn test_lock_resolved_case_is_refused() {
        let case = mock_case(1, CaseStatus::Declined, Some("cs222bb"));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[case]])
            .into_connection();
        let fx = fixture(db);

        let err = fx.service.lock_case(1, "cs111aa").await.unwrap_err();
        assert!(matches!(err, AppError::Locking(_)));
        assert_eq!(err.to_string(), "Locking error: Cannot lock resolved case");
    }

    #[tokio::test]
    async fn test_unlock_clears_any_holder() {
        let case = mock_case(1, CaseStatus::Pending, Some("cs222bb"));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[case]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let fx = fixture(db);

        fx.service.unlock_case(1).await.unwrap();
    }

    #[tokio::test]
    async fn test_search_maps_results() {
        let case = mock_case(1, CaseStatus::Pending, None);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[case]])
            .append_query_results([Vec::<note::Model>::new()])
            .into_connection();
        let fx = fixture(db);

        let params = SearchParams {
            first_name: Some("rob".to_string()),
            ..SearchParams::default()
        };
        let results = fx.service.search(&params).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, "Pending");
    }

    #[tokio::test]
    async fn test_update_user_details_forwards_and_merges() {
        let case = mock_case(1, CaseStatus::Approved, None);
        let updated = case.clone();
        let note = mock_note(1, 1, "contact note");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[case], [updated]])
            .append_query_results([[note]])
            .into_connection();
        let fx = fixture(db);

        let updated_data = match json!({
            "contactable": true,
            "contact_preferences": ["Email"],
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        let outcome = fx
            .service
            .update_user_details(
                1,
                UpdateDetailsRequest {
                    staff_id: Some("cs111aa".to_string()),
                    updated_data,
                },
            )
            .await
            .unwrap();

        assert!(outcome.updated);
        let forwarded = fx.dataset.contact_updates.lock().unwrap();
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded[0]["user_id"], json!("user-1"));
        assert_eq!(forwarded[0]["contactable"], json!(true));
    }

    #[tokio::test]
    async fn test_update_dataset_access_forwards_and_notes() {
        let case = mock_case(1, CaseStatus::Approved, None);
        let note = mock_note(1, 1, "access note");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[case]])
            .append_query_results([[note]])
            .into_connection();
        let fx = fixture(db);

        let outcome = fx
            .service
            .update_dataset_access(
                1,
                DatasetAccessRequest {
                    staff_id: Some("cs111aa".to_string()),
                    licences: vec![
                        LicenceUpdate {
                            licence_id: "ccod".to_string(),
                            agreed: true,
                        },
                        LicenceUpdate {
                            licence_id: "ocod".to_string(),
                            agreed: false,
                        },
                    ],
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.user_details_id, "user-1");
        let forwarded = fx.dataset.access_updates.lock().unwrap();
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded[0]["user_details_id"], json!("user-1"));
        assert_eq!(forwarded[0]["licences"][0]["licence_id"], json!("ccod"));
    }

    #[tokio::test]
    async fn test_get_groups_handles_single_group_string() {
        let case = mock_case(1, CaseStatus::Approved, None);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[case]])
            .into_connection();
        let fx = fixture(db);
        *fx.account.account_details.lock().unwrap() =
            Some(json!({"groups": "cn=dst,ou=groups,dc=example"}));

        let groups = fx.service.get_groups(1).await.unwrap();
        assert_eq!(groups, vec!["dst".to_string()]);
    }

    #[tokio::test]
    async fn test_get_groups_handles_group_list() {
        let case = mock_case(1, CaseStatus::Approved, None);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[case]])
            .into_connection();
        let fx = fixture(db);
        *fx.account.account_details.lock().unwrap() = Some(json!({
            "groups": ["cn=dst,ou=groups", "cn=ccod,ou=groups"]
        }));

        let groups = fx.service.get_groups(1).await.unwrap();
        assert_eq!(groups, vec!["dst".to_string(), "ccod".to_string()]);
    }

    #[tokio::test]
    async fn test_dataset_passthroughs_use_case_user_id() {
        let activity_case = mock_case(1, CaseStatus::Approved, None);
        let access_case = activity_case.clone();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[activity_case], [access_case]])
            .into_connection();
        let fx = fixture(db);

        let activity = fx.service.get_dataset_activity(1).await.unwrap();
        assert_eq!(activity["user_id"], json!("user-1"));

        let access = fx.service.get_user_dataset_access(1).await.unwrap();
        assert_eq!(access["user_id"], json!("user-1"));
    }

    #[test]
    fn test_can_perform_action_lock_predicate() {
        let unlocked = mock_case(1, CaseStatus::Pending, None);
        let locked = mock_case(1, CaseStatus::Pending, Some("cs111aa"));
        let resolved = mock_case(1, CaseStatus::Approved, Some("cs111aa"));

        assert!(can_perform_action(&unlocked, None));
        assert!(!can_perform_action(&unlocked, Some("cs111aa")));
        assert!(can_perform_action(&locked, Some("cs111aa")));
        assert!(!can_perform_action(&locked, Some("cs222bb")));
        assert!(!can_perform_action(&locked, None));
        assert!(can_perform_action(&resolved, Some("cs222bb")));
        assert!(can_perform_action(&resolved, None));
    }

    #[test]
    fn test_lower_first() {
        assert_eq!(lower_first("Details missing"), "details missing");
        assert_eq!(lower_first("a"), "a");
        assert_eq!(lower_first(""), "");
    }

    #[test]
    fn test_decline_note_text() {
        assert_eq!(
            decline_note_text("details missing", "Re-submit"),
            "Declined: Reason - details missing; Next Steps - Re-submit"
        );
    }

    #[test]
    fn test_contact_preference_note_phrasing() {
        assert_eq!(
            contact_preference_note(false, &["Email".to_string()]),
            "Contact Preference has been updated to No due to User request"
        );
        assert_eq!(
            contact_preference_note(true, &["Email".to_string()]),
            "Contact Preference has been updated to Email due to User request"
        );
        assert_eq!(
            contact_preference_note(
                true,
                &[
                    "Email".to_string(),
                    "Phone".to_string(),
                    "Post".to_string()
                ]
            ),
            "Contact Preferences have been updated to Email, Phone and Post due to User request"
        );
    }

    #[test]
    fn test_dataset_access_note_phrasing() {
        let licences = vec![
            LicenceUpdate {
                licence_id: "ccod".to_string(),
                agreed: true,
            },
            LicenceUpdate {
                licence_id: "ocod".to_string(),
                agreed: false,
            },
        ];

        assert_eq!(
            dataset_access_note(&licences),
            "Data access updated: access granted for ccod dataset, access removed for ocod dataset"
        );
    }

    #[test]
    fn test_short_group_name() {
        assert_eq!(short_group_name("cn=dst,ou=groups,dc=example"), "dst");
        assert_eq!(short_group_name("cn=ccod"), "ccod");
    }

    #[test]
    fn test_merge_registration_data_is_shallow() {
        let data = json!({"first_name": "Rob", "address": {"town": "Leeds"}});
        let updates = match json!({"address": {"town": "York"}, "email": "r@e.com"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        let merged = merge_registration_data(data, &updates);

        assert_eq!(merged["first_name"], json!("Rob"));
        assert_eq!(merged["address"], json!({"town": "York"}));
        assert_eq!(merged["email"], json!("r@e.com"));
    }
}
