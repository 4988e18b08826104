use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};

use crate::audit;
use crate::context::AppContext;
use crate::hub::HubMessage;
use crate::ingestion::ingest_event;
use crate::reports::build_shift_report;
use crate::simulator::{ReplayReport, ScenarioPreset, SimulatorParams, SimulatorStatus};
use crate::types::{
    CameraEvent, Decision, DismissReason, Incident, IncidentMetadata, IncidentStatus,
    OperatorAction, Role, User,
};

use super::auth::AuthUser;
use super::error::AppError;

// ---- auth ----------------------------------------------------------------

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub role: Role,
}

pub async fn login(
    State(ctx): State<Arc<AppContext>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let now = ctx.clock.now();
    match ctx.identity.login(&req.username, &req.password, now) {
        Ok((token, user)) => {
            audit::login_success(&ctx.store.audit, &req.username).await?;
            Ok(Json(LoginResponse {
                token,
                username: user.username,
                role: user.role,
            }))
        }
        Err(e) => {
            audit::login_failure(&ctx.store.audit, &req.username).await?;
            Err(e.into())
        }
    }
}

#[derive(Serialize)]
pub struct MeResponse {
    pub username: String,
    pub role: Role,
}

pub async fn me(auth: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        username: auth.username().to_string(),
        role: auth.role(),
    })
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub new_password: String,
}

pub async fn change_password(
    State(ctx): State<Arc<AppContext>>,
    auth: AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<(), AppError> {
    ctx.identity.users.set_password(auth.username(), &req.new_password)?;
    audit::password_changed(&ctx.store.audit, auth.username(), auth.username()).await?;
    Ok(())
}

#[derive(Serialize)]
pub struct UserSummary {
    pub username: String,
    pub role: Role,
    pub enabled: bool,
}

pub async fn list_users(State(ctx): State<Arc<AppContext>>, auth: AuthUser) -> Result<Json<Vec<UserSummary>>, AppError> {
    auth.require_role(Role::Admin)?;
    let users: Vec<UserSummary> = ctx
        .identity
        .users
        .list()
        .into_iter()
        .map(|u: User| UserSummary {
            username: u.username,
            role: u.role,
            enabled: u.enabled,
        })
        .collect();
    Ok(Json(users))
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
}

pub async fn create_user(
    State(ctx): State<Arc<AppContext>>,
    auth: AuthUser,
    Json(req): Json<CreateUserRequest>,
) -> Result<(), AppError> {
    auth.require_role(Role::Admin)?;
    ctx.identity.users.add(&req.username, &req.password, req.role)?;
    audit::user_created(&ctx.store.audit, auth.username(), &req.username, req.role_str()).await?;
    Ok(())
}

impl CreateUserRequest {
    fn role_str(&self) -> &'static str {
        match self.role {
            Role::Operator => "operator",
            Role::Supervisor => "supervisor",
            Role::Admin => "admin",
        }
    }
}

pub async fn disable_user(
    State(ctx): State<Arc<AppContext>>,
    auth: AuthUser,
    Path(username): Path<String>,
) -> Result<(), AppError> {
    auth.require_role(Role::Admin)?;
    ctx.identity.users.set_enabled(&username, false)?;
    audit::user_disabled(&ctx.store.audit, auth.username(), &username).await?;
    Ok(())
}

// ---- ingestion -------------------------------------------------------------

#[derive(Serialize)]
pub struct IngestResponse {
    pub incident_id: String,
    pub version: u64,
    pub created_new_incident: bool,
}

pub async fn webhook_camera_event(
    State(ctx): State<Arc<AppContext>>,
    _auth: AuthUser,
    Json(event): Json<CameraEvent>,
) -> Result<Json<IngestResponse>, AppError> {
    let event_id = event.event_id.clone();
    let settings = ctx.settings.load();
    match ingest_event(event, &ctx.store, &ctx.hub, &settings, ctx.llm.as_ref()).await {
        Ok(result) => Ok(Json(IngestResponse {
            incident_id: result.incident_id,
            version: result.version,
            created_new_incident: result.created_new_incident,
        })),
        Err(e) => {
            audit::ingestion_rejected(&ctx.store.audit, &event_id, &e.to_string()).await?;
            Err(AppError::UnprocessableEntity(e.to_string()))
        }
    }
}

// ---- incidents --------------------------------------------------------------

#[derive(Serialize)]
pub struct IncidentView {
    #[serde(flatten)]
    pub incident: Incident,
    pub version: u64,
    #[serde(rename = "_metadata")]
    pub metadata: IncidentMetadata,
}

#[derive(Deserialize)]
pub struct ListIncidentsQuery {
    pub status: Option<IncidentStatus>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

pub async fn list_incidents(
    State(ctx): State<Arc<AppContext>>,
    _auth: AuthUser,
    Query(query): Query<ListIncidentsQuery>,
) -> Json<Vec<IncidentView>> {
    let limit = query.limit.unwrap_or(100);
    let items = ctx.store.incidents.list(query.status, query.since, limit);
    Json(
        items
            .into_iter()
            .map(|(incident, metadata, version)| IncidentView {
                incident,
                version,
                metadata,
            })
            .collect(),
    )
}

pub async fn get_incident(
    State(ctx): State<Arc<AppContext>>,
    _auth: AuthUser,
    Path(incident_id): Path<String>,
) -> Result<Json<IncidentView>, AppError> {
    let (incident, metadata, version) = ctx
        .store
        .incidents
        .get(&incident_id)
        .ok_or_else(|| AppError::NotFound(incident_id.clone()))?;
    Ok(Json(IncidentView {
        incident,
        version,
        metadata,
    }))
}

#[derive(Deserialize)]
pub struct DecisionRequest {
    pub action_taken: OperatorAction,
    pub operator_notes: Option<String>,
    pub was_true_positive: Option<bool>,
    pub dismiss_reason: Option<DismissReason>,
}

pub async fn record_decision(
    State(ctx): State<Arc<AppContext>>,
    auth: AuthUser,
    Path(incident_id): Path<String>,
    Json(req): Json<DecisionRequest>,
) -> Result<(), AppError> {
    auth.require_role(Role::Operator)?;
    if matches!(req.action_taken, OperatorAction::Dismiss) && req.dismiss_reason.is_none() {
        return Err(AppError::UnprocessableEntity(
            "dismiss_reason is required when action_taken=dismiss".to_string(),
        ));
    }
    let (mut incident, metadata, _) = ctx
        .store
        .incidents
        .get(&incident_id)
        .ok_or_else(|| AppError::NotFound(incident_id.clone()))?;

    let decision = Decision {
        incident_id: incident_id.clone(),
        decision_ts: ctx.clock.now(),
        action_taken: req.action_taken,
        operator_username: auth.username().to_string(),
        operator_notes: req.operator_notes,
        was_true_positive: req.was_true_positive,
        dismiss_reason: req.dismiss_reason,
    };
    ctx.store.decisions.append(decision).await?;

    incident.status = status_for_action(req.action_taken);
    incident.updated_ts = ctx.clock.now();
    let version = ctx.store.incidents.append(incident.clone(), metadata).await?;
    ctx.hub.publish_incident_upsert(
        incident.incident_id.clone(),
        version,
        format!("decision recorded: {}", action_taken_str(req.action_taken)),
        incident.updated_ts,
    );

    audit::decision_recorded(
        &ctx.store.audit,
        auth.username(),
        &incident_id,
        action_taken_str(req.action_taken),
    )
    .await?;
    Ok(())
}

fn status_for_action(action: OperatorAction) -> IncidentStatus {
    match action {
        OperatorAction::Confirm => IncidentStatus::Triage,
        OperatorAction::Dismiss => IncidentStatus::Dismissed,
        OperatorAction::Escalate => IncidentStatus::Escalated,
        OperatorAction::Close => IncidentStatus::Closed,
        OperatorAction::Approve => IncidentStatus::DispatchAuthorized,
    }
}

fn action_taken_str(action: OperatorAction) -> &'static str {
    match action {
        OperatorAction::Confirm => "confirm",
        OperatorAction::Dismiss => "dismiss",
        OperatorAction::Escalate => "escalate",
        OperatorAction::Close => "close",
        OperatorAction::Approve => "approve",
    }
}

#[derive(Deserialize)]
pub struct ApproveRequest {
    pub approval_notes: Option<String>,
}

pub async fn approve_incident(
    State(ctx): State<Arc<AppContext>>,
    auth: AuthUser,
    Path(incident_id): Path<String>,
    Json(req): Json<ApproveRequest>,
) -> Result<(), AppError> {
    auth.require_role(Role::Supervisor)?;
    let (mut incident, metadata, _) = ctx
        .store
        .incidents
        .get(&incident_id)
        .ok_or_else(|| AppError::NotFound(incident_id.clone()))?;
    if incident.status != IncidentStatus::DispatchPendingReview {
        return Err(AppError::Conflict(format!(
            "incident {incident_id} is not pending dispatch review"
        )));
    }
    incident.status = IncidentStatus::DispatchAuthorized;
    incident.updated_ts = ctx.clock.now();
    let version = ctx.store.incidents.append(incident.clone(), metadata).await?;
    ctx.hub.publish_incident_upsert(
        incident.incident_id.clone(),
        version,
        "dispatch authorized".to_string(),
        incident.updated_ts,
    );
    audit::approval_granted(
        &ctx.store.audit,
        auth.username(),
        &incident_id,
        req.approval_notes.as_deref(),
    )
    .await?;
    Ok(())
}

// ---- push stream -------------------------------------------------------------

#[derive(Serialize)]
struct IncidentUpsertPayload {
    incident_id: String,
    version: u64,
    summary: String,
    updated_ts: DateTime<Utc>,
    sequence: u64,
}

pub async fn stream_incidents(
    State(ctx): State<Arc<AppContext>>,
    _auth: AuthUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut subscription = ctx.hub.subscribe();
    let stream = async_stream::stream! {
        loop {
            match subscription.next().await {
                Some(HubMessage::IncidentUpsert {
                    incident_id,
                    version,
                    summary,
                    updated_ts,
                    sequence,
                }) => {
                    let payload = IncidentUpsertPayload { incident_id, version, summary, updated_ts, sequence };
                    if let Ok(data) = serde_json::to_string(&payload) {
                        yield Ok(Event::default().event("incident_upsert").data(data));
                    }
                }
                Some(HubMessage::Heartbeat { sequence }) => {
                    yield Ok(Event::default().event("heartbeat").data(sequence.to_string()));
                }
                Some(HubMessage::ResyncRequired { sequence }) => {
                    yield Ok(Event::default().event("resync_required").data(sequence.to_string()));
                }
                Some(HubMessage::Shutdown { .. }) | None => break,
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::new().interval(crate::hub::HEARTBEAT_INTERVAL))
}

// ---- reports -------------------------------------------------------------

#[derive(Deserialize)]
pub struct ShiftReportRequest {
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
}

pub async fn shift_report(
    State(ctx): State<Arc<AppContext>>,
    _auth: AuthUser,
    Json(req): Json<ShiftReportRequest>,
) -> Result<impl IntoResponse, AppError> {
    let settings = ctx.settings.load();
    let llm_timeout = Duration::from_secs(settings.llm.timeout_seconds);
    let report = build_shift_report(
        &ctx.store,
        req.start_ts,
        req.end_ts,
        settings.llm.enabled,
        ctx.llm.as_ref(),
        llm_timeout,
    )
    .await?;
    Ok(Json(report))
}

// ---- settings -------------------------------------------------------------

pub async fn get_settings(State(ctx): State<Arc<AppContext>>, _auth: AuthUser) -> Json<crate::config::Settings> {
    Json((*ctx.settings.load()).clone())
}

pub async fn put_settings(
    State(ctx): State<Arc<AppContext>>,
    auth: AuthUser,
    Json(settings): Json<crate::config::Settings>,
) -> Result<(), AppError> {
    auth.require_role(Role::Admin)?;
    crate::config::validate(&settings)?;
    ctx.settings.swap(settings);
    ctx.settings.persist_to_disk(&ctx.data_dir).map_err(AppError::from)?;
    audit::settings_updated(&ctx.store.audit, auth.username()).await?;
    Ok(())
}

// ---- simulator -------------------------------------------------------------

#[derive(Deserialize)]
pub struct SimStartRequest {
    pub scenario: ScenarioPreset,
    pub rate_per_minute: f64,
    pub seed: u64,
}

pub async fn sim_start(
    State(ctx): State<Arc<AppContext>>,
    auth: AuthUser,
    Json(req): Json<SimStartRequest>,
) -> Result<(), AppError> {
    auth.require_role(Role::Admin)?;
    let settings = Arc::new((*ctx.settings.load()).clone());
    let params = SimulatorParams {
        scenario: req.scenario,
        rate_per_minute: req.rate_per_minute,
        seed: req.seed,
    };
    let scenario_label = format!("{:?}", req.scenario);
    ctx.simulator
        .start(params, ctx.store.clone(), ctx.hub.clone(), settings, ctx.llm.clone(), ctx.clock.clone())
        .await
        .map_err(|e| AppError::Conflict(e.to_string()))?;
    audit::simulator_started(&ctx.store.audit, auth.username(), &scenario_label).await?;
    Ok(())
}

pub async fn sim_stop(State(ctx): State<Arc<AppContext>>, auth: AuthUser) -> Result<(), AppError> {
    auth.require_role(Role::Admin)?;
    ctx.simulator.stop().await.map_err(|e| AppError::Conflict(e.to_string()))?;
    audit::simulator_stopped(&ctx.store.audit, auth.username()).await?;
    Ok(())
}

#[derive(Deserialize)]
pub struct SimReplayRequest {
    pub jsonl: String,
}

pub async fn sim_replay(
    State(ctx): State<Arc<AppContext>>,
    auth: AuthUser,
    Json(req): Json<SimReplayRequest>,
) -> Result<Json<ReplayReport>, AppError> {
    auth.require_role(Role::Admin)?;
    let settings = ctx.settings.load();
    let report = ctx
        .simulator
        .replay(&req.jsonl, &ctx.store, &ctx.hub, &settings, ctx.llm.as_ref())
        .await;
    Ok(Json(report))
}

pub async fn sim_status(State(ctx): State<Arc<AppContext>>, auth: AuthUser) -> Result<Json<SimulatorStatus>, AppError> {
    auth.require_role(Role::Admin)?;
    Ok(Json(ctx.simulator.status().await))
}
