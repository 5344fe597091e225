use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::db::DbHandle;
use crate::engine::{
    AssignmentEngine, BulkCoordinator, EngineConfig, Reassignment, ReplacementEngine, Selector,
};
use crate::errors::EngineError;
use crate::models::{NewPullRequest, PullRequest, PullRequestSummary, RequestMetrics, Team, TeamMember, User};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: DbHandle,
    pub assigner: AssignmentEngine,
    pub replacer: Arc<ReplacementEngine>,
    pub bulk: BulkCoordinator,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(db: DbHandle, engine: EngineConfig) -> Self {
        Self::with_selector(db, engine, Arc::new(Selector::new()))
    }

    /// Wire the engines around one shared selector; tests inject a seeded one.
    pub fn with_selector(db: DbHandle, engine: EngineConfig, selector: Arc<Selector>) -> Self {
        let assigner = AssignmentEngine::new(db.clone(), selector.clone(), engine.max_reviewers);
        let replacer = Arc::new(ReplacementEngine::new(db.clone(), selector));
        let bulk = BulkCoordinator::new(db.clone(), replacer.clone(), engine.bulk_latency_budget);
        Self {
            db,
            assigner,
            replacer,
            bulk,
        }
    }
}

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct AddTeamRequest {
    pub team_name: String,
    pub members: Vec<TeamMember>,
}

#[derive(Deserialize)]
pub struct GetTeamParams {
    pub team_name: Option<String>,
}

#[derive(Deserialize)]
pub struct DeactivateUsersRequest {
    pub user_ids: Vec<String>,
}

#[derive(Deserialize)]
pub struct SetUserActiveRequest {
    pub user_id: String,
    pub is_active: bool,
}

#[derive(Deserialize)]
pub struct GetUserReviewsParams {
    pub user_id: Option<String>,
}

#[derive(Deserialize)]
pub struct MergeRequest {
    pub pull_request_id: String,
}

#[derive(Deserialize)]
pub struct ReassignReviewerRequest {
    pub pull_request_id: String,
    pub current_reviewer_id: String,
}

// ── Response types ────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

#[derive(Serialize)]
pub struct TeamResponse {
    pub team: Team,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Serialize)]
pub struct UserPrsResponse {
    pub user_id: String,
    pub pull_requests: Vec<PullRequestSummary>,
}

#[derive(Serialize)]
pub struct PrResponse {
    pub pr: PullRequest,
}

#[derive(Serialize)]
pub struct ReassignReviewerResponse {
    pub pr: PullRequest,
    pub replaced_by: String,
}

#[derive(Serialize)]
pub struct DeactivateUsersResponse {
    pub team_name: String,
    pub results: HashMap<String, Reassignment>,
}

#[derive(Serialize)]
pub struct UserAssignmentsResponse {
    pub user_assignments: HashMap<String, i64>,
}

#[derive(Serialize)]
pub struct PrMetricsResponse {
    pub pr_metrics: RequestMetrics,
}

// ── Error handling ────────────────────────────────────────────────────

pub enum ApiError {
    Engine(EngineError),
    BadRequest(String),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self::Engine(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Engine(EngineError::Database(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST", message)
            }
            ApiError::Engine(err) if err.is_domain() => {
                let status = match err.code() {
                    "NOT_FOUND" => StatusCode::NOT_FOUND,
                    // PR_EXISTS, TEAM_EXISTS, PR_MERGED, NOT_ASSIGNED, NO_CANDIDATE
                    _ => StatusCode::CONFLICT,
                };
                (status, err.code(), err.to_string())
            }
            ApiError::Engine(err) => {
                error!(error = %err, code = err.code(), "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };
        let body = serde_json::json!({"error": {"code": code, "message": message}});
        (status, Json(body)).into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/team/add", post(add_team))
        .route("/team/get", get(get_team))
        .route("/team/{team_name}/deactivate-users", post(deactivate_users))
        .route("/users/setIsActive", post(set_user_active))
        .route("/users/getReview", get(get_user_reviews))
        .route("/pullRequest/create", post(create_pull_request))
        .route("/pullRequest/merge", post(merge_pull_request))
        .route("/pullRequest/reassign", post(reassign_reviewer))
        .route("/stats/user-assignments", get(user_assignment_stats))
        .route("/stats/pr-metrics", get(pr_metrics))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "reviewd",
    })
}

async fn add_team(
    State(state): State<SharedState>,
    Json(req): Json<AddTeamRequest>,
) -> Result<(StatusCode, Json<TeamResponse>), ApiError> {
    if req.team_name.is_empty() {
        return Err(ApiError::BadRequest("team_name is required".into()));
    }
    info!(
        team_name = %req.team_name,
        member_count = req.members.len(),
        "creating team"
    );

    let team_name = req.team_name.clone();
    let members = req.members.clone();
    state
        .db
        .call(move |db| {
            if db.team_exists(&team_name)? {
                return Ok(Err(EngineError::TeamExists { name: team_name }));
            }
            db.create_team(&team_name)?;
            for member in &members {
                db.create_or_update_user(&User {
                    user_id: member.user_id.clone(),
                    username: member.username.clone(),
                    team_name: team_name.clone(),
                    is_active: member.is_active,
                    created_at: String::new(),
                    updated_at: String::new(),
                })?;
            }
            Ok(Ok(()))
        })
        .await?
        .map_err(|e: EngineError| {
            warn!(team_name = %req.team_name, "team already exists");
            ApiError::Engine(e)
        })?;

    Ok((
        StatusCode::CREATED,
        Json(TeamResponse {
            team: Team {
                team_name: req.team_name,
                members: req.members,
            },
        }),
    ))
}

async fn get_team(
    State(state): State<SharedState>,
    Query(params): Query<GetTeamParams>,
) -> Result<Json<Team>, ApiError> {
    let team_name = params
        .team_name
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("team_name parameter is required".into()))?;

    let team = state
        .db
        .call({
            let team_name = team_name.clone();
            move |db| {
                if !db.team_exists(&team_name)? {
                    return Ok(None);
                }
                let members = db
                    .users_by_team(&team_name)?
                    .into_iter()
                    .map(|u| TeamMember {
                        user_id: u.user_id,
                        username: u.username,
                        is_active: u.is_active,
                    })
                    .collect();
                Ok(Some(Team { team_name, members }))
            }
        })
        .await?
        .ok_or(EngineError::TeamNotFound { name: team_name })?;

    Ok(Json(team))
}

async fn deactivate_users(
    State(state): State<SharedState>,
    Path(team_name): Path<String>,
    Json(req): Json<DeactivateUsersRequest>,
) -> Result<Json<DeactivateUsersResponse>, ApiError> {
    if req.user_ids.is_empty() {
        return Err(ApiError::BadRequest("user_ids is required".into()));
    }

    let results = state.bulk.bulk_deactivate(&team_name, &req.user_ids).await;
    Ok(Json(DeactivateUsersResponse { team_name, results }))
}

async fn set_user_active(
    State(state): State<SharedState>,
    Json(req): Json<SetUserActiveRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    info!(user_id = %req.user_id, is_active = req.is_active, "setting user active flag");

    let user = state
        .db
        .call({
            let user_id = req.user_id.clone();
            let is_active = req.is_active;
            move |db| {
                if !db.set_user_active(&user_id, is_active)? {
                    return Ok(None);
                }
                db.user_by_id(&user_id)
            }
        })
        .await?
        .ok_or(EngineError::UserNotFound { id: req.user_id })?;

    Ok(Json(UserResponse { user }))
}

async fn get_user_reviews(
    State(state): State<SharedState>,
    Query(params): Query<GetUserReviewsParams>,
) -> Result<Json<UserPrsResponse>, ApiError> {
    let user_id = params
        .user_id
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::BadRequest("user_id parameter is required".into()))?;

    let pull_requests = state.assigner.assigned_requests(&user_id).await?;
    Ok(Json(UserPrsResponse {
        user_id,
        pull_requests,
    }))
}

async fn create_pull_request(
    State(state): State<SharedState>,
    Json(req): Json<NewPullRequest>,
) -> Result<(StatusCode, Json<PrResponse>), ApiError> {
    if req.pull_request_id.is_empty() || req.author_id.is_empty() {
        return Err(ApiError::BadRequest(
            "pull_request_id and author_id are required".into(),
        ));
    }

    let pr = state.assigner.create_and_assign(req).await?;
    Ok((StatusCode::CREATED, Json(PrResponse { pr })))
}

async fn merge_pull_request(
    State(state): State<SharedState>,
    Json(req): Json<MergeRequest>,
) -> Result<Json<PrResponse>, ApiError> {
    let pr = state.assigner.merge(&req.pull_request_id).await?;
    Ok(Json(PrResponse { pr }))
}

async fn reassign_reviewer(
    State(state): State<SharedState>,
    Json(req): Json<ReassignReviewerRequest>,
) -> Result<Json<ReassignReviewerResponse>, ApiError> {
    let replaced_by = state
        .replacer
        .replace(&req.pull_request_id, &req.current_reviewer_id)
        .await?;
    let pr = state.assigner.request_by_id(&req.pull_request_id).await?;
    Ok(Json(ReassignReviewerResponse { pr, replaced_by }))
}

async fn user_assignment_stats(
    State(state): State<SharedState>,
) -> Result<Json<UserAssignmentsResponse>, ApiError> {
    let stats = state.db.call(|db| db.assignment_stats()).await?;
    Ok(Json(UserAssignmentsResponse {
        user_assignments: stats.into_iter().collect(),
    }))
}

async fn pr_metrics(
    State(state): State<SharedState>,
) -> Result<Json<PrMetricsResponse>, ApiError> {
    let metrics = state.db.call(|db| db.request_metrics()).await?;
    Ok(Json(PrMetricsResponse {
        pr_metrics: metrics,
    }))
}
