//! The staff verification workflow endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::info;
use verification_common::{AppError, AppResult};
use verification_core::{
    ActionOutcome, AutoCloseOutcome, AutoCloseRequest, CaseActionRequest, CaseDetail, CaseSummary,
    CloseOutcome, CloseRequest, ClosureView, DatasetAccessOutcome, DatasetAccessRequest,
    DeclineReasonView, NewCase, NoteRequest, SearchParams, UpdateDetailsRequest, UpdateOutcome,
};

use crate::state::AppState;

/// Routes for the verification workflow, mounted under `/v1`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/worklist", get(get_worklist))
        .route("/case", post(insert_case))
        .route("/case/{case_id}", get(get_case))
        .route("/case/{case_id}/approve", post(approve_case))
        .route("/case/{case_id}/decline", post(decline_case))
        .route("/case/{case_id}/note", post(insert_note))
        .route("/case/{case_id}/lock", post(lock_case))
        .route("/case/{case_id}/unlock", post(unlock_case))
        .route("/case/{case_id}/close", post(close_account))
        .route("/case/{case_id}/auto_close", post(auto_close))
        .route("/case/{case_id}/update", post(update_details))
        .route(
            "/case/{case_id}/update_dataset_access",
            post(update_dataset_access),
        )
        .route("/decline-reasons", get(get_decline_reasons))
        .route("/search", post(search))
        .route("/dataset-list-details", get(get_dataset_list_details))
        .route("/groups/{case_id}", get(get_groups))
        .route("/dataset-activity/{case_id}", get(get_dataset_activity))
        .route("/dataset-access/{case_id}", get(get_user_dataset_access))
}

#[derive(Debug, Deserialize)]
struct LockRequest {
    staff_id: Option<String>,
}

async fn get_worklist(State(state): State<AppState>) -> AppResult<Json<Vec<CaseSummary>>> {
    info!("Getting the full worklist");
    let pending = state
        .verification
        .get_pending()
        .await
        .map_err(|e| e.context("Failed to retrieve worklist"))?;
    Ok(Json(pending))
}

async fn insert_case(
    State(state): State<AppState>,
    Json(new_case): Json<NewCase>,
) -> AppResult<impl IntoResponse> {
    info!(user_id = %new_case.user_id, "Inserting case into worklist");
    let user_id = new_case.user_id.clone();
    let mut details = detail_map(&new_case);

    let case_id = state
        .verification
        .insert_case(new_case)
        .await
        .map_err(|e| e.context("Failed to insert case"))?;

    details.insert("status".to_string(), json!("Pending"));
    if let Some(Value::Object(registration)) = details.get_mut("registration_data") {
        registration.insert("date_added".to_string(), json!(Utc::now().to_rfc3339()));
    }
    state
        .metrics
        .record_event("application received", details)
        .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("user {user_id} added to dps worklist"),
            "case_id": case_id,
        })),
    ))
}

async fn get_case(
    State(state): State<AppState>,
    Path(case_id): Path<i32>,
) -> AppResult<Json<CaseDetail>> {
    info!(case_id, "Getting case details");
    let detail = state
        .verification
        .get_case(case_id)
        .await
        .map_err(|e| e.context(format!("Failed to get case '{case_id}'")))?;
    Ok(Json(detail))
}

async fn approve_case(
    State(state): State<AppState>,
    Path(case_id): Path<i32>,
    Json(request): Json<CaseActionRequest>,
) -> AppResult<Json<ActionOutcome>> {
    info!(case_id, staff_id = %request.staff_id, "Approving case");
    let outcome = state
        .verification
        .case_action("Approve", case_id, request)
        .await
        .map_err(|e| e.context("Failed to approve case"))?;

    if let Ok(details) = state.verification.get_case(case_id).await {
        state
            .metrics
            .record_event("dst action approved", detail_map(&details))
            .await;
    }

    Ok(Json(outcome))
}

async fn decline_case(
    State(state): State<AppState>,
    Path(case_id): Path<i32>,
    Json(request): Json<CaseActionRequest>,
) -> AppResult<Json<ActionOutcome>> {
    info!(case_id, staff_id = %request.staff_id, "Declining case");
    let outcome = state
        .verification
        .case_action("Decline", case_id, request)
        .await
        .map_err(|e| e.context("Failed to decline case"))?;
    Ok(Json(outcome))
}

async fn insert_note(
    State(state): State<AppState>,
    Path(case_id): Path<i32>,
    Json(request): Json<NoteRequest>,
) -> AppResult<impl IntoResponse> {
    info!(case_id, "Inserting note for case");
    state
        .verification
        .insert_note(case_id, request)
        .await
        .map_err(|e| e.context("Failed to insert note"))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({"message": format!("Note added for case {case_id}")})),
    ))
}

async fn lock_case(
    State(state): State<AppState>,
    Path(case_id): Path<i32>,
    Json(request): Json<LockRequest>,
) -> AppResult<StatusCode> {
    let Some(owner) = request.staff_id else {
        return Err(AppError::BadRequest("no 'staff_id' provided".to_string())
            .context("Failed to lock case"));
    };

    info!(case_id, owner = %owner, "Locking case");
    state
        .verification
        .lock_case(case_id, &owner)
        .await
        .map_err(|e| e.context("Failed to lock case"))?;

    Ok(StatusCode::NO_CONTENT)
}

async fn unlock_case(
    State(state): State<AppState>,
    Path(case_id): Path<i32>,
) -> AppResult<StatusCode> {
    info!(case_id, "Unlocking case");
    state
        .verification
        .unlock_case(case_id)
        .await
        .map_err(|e| e.context("Failed to unlock case"))?;

    Ok(StatusCode::NO_CONTENT)
}

async fn close_account(
    State(state): State<AppState>,
    Path(case_id): Path<i32>,
    Json(request): Json<CloseRequest>,
) -> AppResult<Json<CloseOutcome>> {
    info!(case_id, "Starting to close account");
    let staff_id = request.staff_id.clone();
    let closure_note = format!(
        "Account closure requested by: {}, for reason: {}",
        request.requester, request.close_detail
    );

    let outcome = state
        .verification
        .close_account(case_id, request)
        .await
        .map_err(|e| e.context(format!("Failed to close account {case_id}")))?;

    state
        .verification
        .insert_note(
            case_id,
            NoteRequest {
                staff_id,
                note_text: closure_note,
            },
        )
        .await
        .map_err(|e| e.context(format!("Failed to close account {case_id}")))?;

    if let Ok(details) = state.verification.get_case(case_id).await {
        let mut details = detail_map(&details);
        if let Ok(closure) = state.verification.get_closure(case_id).await {
            details.extend(detail_map::<ClosureView>(&closure));
        }
        state.metrics.record_event("account closed", details).await;
    }

    Ok(Json(outcome))
}

// The path segment is the directory identity, not a numeric case ID; the
// caller is the account inactivity job, which only knows the ldap_id.
async fn auto_close(
    State(state): State<AppState>,
    Path(ldap_id): Path<String>,
    Json(request): Json<AutoCloseRequest>,
) -> AppResult<Json<AutoCloseOutcome>> {
    info!(ldap_id = %ldap_id, "Starting automated account closure");
    let outcome = state
        .verification
        .auto_close(&ldap_id, request)
        .await
        .map_err(|e| e.context(format!("Failed to auto close account for ldap_id: {ldap_id}")))?;
    Ok(Json(outcome))
}

async fn update_details(
    State(state): State<AppState>,
    Path(case_id): Path<i32>,
    Json(request): Json<UpdateDetailsRequest>,
) -> AppResult<Json<UpdateOutcome>> {
    info!(case_id, "Updating contact details");
    let outcome = state
        .verification
        .update_user_details(case_id, request)
        .await
        .map_err(|e| e.context("Failed to update contact details"))?;
    Ok(Json(outcome))
}

async fn update_dataset_access(
    State(state): State<AppState>,
    Path(case_id): Path<i32>,
    Json(request): Json<DatasetAccessRequest>,
) -> AppResult<Json<DatasetAccessOutcome>> {
    info!(case_id, "Updating dataset access");
    let outcome = state
        .verification
        .update_dataset_access(case_id, request)
        .await
        .map_err(|e| e.context("Failed to update groups"))?;

    if let Ok(details) = state.verification.get_case(case_id).await {
        let details = detail_map(&details);
        let licences: Vec<(&str, bool)> = outcome
            .licences
            .iter()
            .map(|licence| (licence.licence_id.as_str(), licence.agreed))
            .collect();
        state
            .metrics
            .record_dataset_access_events(&details, licences)
            .await;
    }

    Ok(Json(outcome))
}

async fn get_decline_reasons(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<DeclineReasonView>>> {
    info!("Fetching decline reasons");
    let reasons = state
        .verification
        .get_decline_reasons()
        .await
        .map_err(|e| e.context("Failed to get decline reasons"))?;
    Ok(Json(reasons))
}

async fn search(
    State(state): State<AppState>,
    Json(params): Json<SearchParams>,
) -> AppResult<Json<Vec<CaseSummary>>> {
    info!("Performing a search");
    let results = state
        .verification
        .search(&params)
        .await
        .map_err(|e| e.context("Failed to perform search"))?;
    Ok(Json(results))
}

async fn get_dataset_list_details(State(state): State<AppState>) -> AppResult<Json<Value>> {
    info!("Getting detailed dataset list");
    let datasets = state
        .verification
        .get_dataset_list_details()
        .await
        .map_err(|e| e.context("Failed to get detailed dataset list"))?;
    Ok(Json(datasets))
}

async fn get_groups(
    State(state): State<AppState>,
    Path(case_id): Path<i32>,
) -> AppResult<Json<Vec<String>>> {
    info!(case_id, "Getting list of groups");
    let groups = state
        .verification
        .get_groups(case_id)
        .await
        .map_err(|e| e.context("Failed to get groups"))?;
    Ok(Json(groups))
}

async fn get_dataset_activity(
    State(state): State<AppState>,
    Path(case_id): Path<i32>,
) -> AppResult<Json<Value>> {
    info!(case_id, "Getting user's dataset activity");
    let activity = state
        .verification
        .get_dataset_activity(case_id)
        .await
        .map_err(|e| e.context("Failed to get dataset activity"))?;
    Ok(Json(activity))
}

async fn get_user_dataset_access(
    State(state): State<AppState>,
    Path(case_id): Path<i32>,
) -> AppResult<Json<Value>> {
    info!(case_id, "Getting user's dataset access");
    let access = state
        .verification
        .get_user_dataset_access(case_id)
        .await
        .map_err(|e| e.context("Failed to get dataset access"))?;
    Ok(Json(access))
}

/// Serialize a value into a flat detail map for metric delivery.
fn detail_map<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
