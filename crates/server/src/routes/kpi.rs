use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use chrono::{Local, NaiveDate};
use db::{
    Db,
    models::{
        kpi::{
            DEFAULT_KPI_UNIT, KpiGoal, KpiGoalChanges, KpiPeriodHistory, KpiRecord, NewKpiGoal,
            PeriodBounds, RepeatCycle, achievement_rate,
        },
        ownership::Resource,
        project::Project,
    },
};
use serde::{Deserialize, Serialize};
use services::services::kpi_period::{
    calculate_period_end, closing_period, current_calendar_period, display_period, format_date,
    parse_date,
};
use utils::{response::ApiResponse, text::non_empty};

use super::{Created, required};
use crate::{
    AppState, auth::CurrentUser, error::ApiError, middleware::load_project_middleware,
};

#[derive(Debug, Deserialize)]
pub struct CreateKpiGoalRequest {
    pub category: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub target_value: f64,
    pub unit: Option<String>,
    #[serde(default)]
    pub repeat_cycle: RepeatCycle,
    pub period_start: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateKpiGoalRequest {
    pub title: Option<String>,
    pub target_value: Option<f64>,
    pub unit: Option<String>,
    pub repeat_cycle: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddRecordRequest {
    pub value: f64,
    pub recorded_date: Option<String>,
    pub note: Option<String>,
}

/// A goal with the figures of the period it is currently tracking.
#[derive(Debug, Serialize)]
pub struct KpiGoalView {
    #[serde(flatten)]
    pub goal: KpiGoal,
    pub current_period: Option<PeriodBounds>,
    pub current_value: f64,
    pub achievement_rate: f64,
    pub records: Vec<KpiRecord>,
    pub history: Vec<KpiPeriodHistory>,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub(crate) async fn goal_views(
    db: &Db,
    project_id: i64,
    today: NaiveDate,
) -> Result<Vec<KpiGoalView>, ApiError> {
    let goals = KpiGoal::find_by_project(db, project_id).await?;
    let mut views = Vec::with_capacity(goals.len());
    for goal in goals {
        let period = display_period(&goal, today);
        let records = KpiGoal::recent_records(db, goal.id, period.as_ref()).await?;
        let current_value = KpiGoal::sum_records(db, goal.id, period.as_ref()).await?;
        let history = KpiGoal::history(db, goal.id).await?;
        views.push(KpiGoalView {
            achievement_rate: achievement_rate(current_value, goal.target_value),
            goal,
            current_period: period,
            current_value,
            records,
            history,
        });
    }
    Ok(views)
}

async fn project_goal(
    user: &CurrentUser,
    db: &Db,
    project: &Project,
    goal_id: i64,
) -> Result<KpiGoal, ApiError> {
    user.ensure_owns(db, Resource::KpiGoal(goal_id)).await?;
    KpiGoal::find_by_id(db, goal_id)
        .await?
        .filter(|goal| goal.project_id == project.id)
        .ok_or_else(|| ApiError::not_found("KPI goal not found"))
}

pub async fn list_goals(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<KpiGoalView>>>, ApiError> {
    let views = goal_views(state.db(), project.id, today()).await?;
    Ok(ResponseJson(ApiResponse::success(views)))
}

pub async fn create_goal(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Json(payload): Json<CreateKpiGoalRequest>,
) -> Result<ResponseJson<ApiResponse<Created>>, ApiError> {
    let category = required(payload.category.as_deref(), "Category is required")?;
    let title = required(payload.title.as_deref(), "Title is required")?;
    let start = match non_empty(payload.period_start.as_deref()) {
        Some(raw) => parse_date(&raw)
            .ok_or_else(|| ApiError::bad_request("Start date must be YYYY-MM-DD"))?,
        None => today(),
    };
    let unit = non_empty(payload.unit.as_deref()).unwrap_or_else(|| DEFAULT_KPI_UNIT.to_string());

    let id = KpiGoal::create(
        state.db(),
        project.id,
        &NewKpiGoal {
            category: &category,
            title: &title,
            target_value: payload.target_value,
            unit: &unit,
            repeat_cycle: payload.repeat_cycle,
            period: PeriodBounds {
                start: format_date(start),
                end: format_date(calculate_period_end(start, payload.repeat_cycle)),
            },
        },
    )
    .await?;
    tracing::info!(project_id = project.id, goal_id = id, "created KPI goal");
    Ok(ResponseJson(ApiResponse::success(Created { id })))
}

/// Changing the cycle re-aligns the goal to the calendar period containing today.
pub async fn update_goal(
    user: CurrentUser,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Path((_, goal_id)): Path<(i64, i64)>,
    Json(payload): Json<UpdateKpiGoalRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let goal = project_goal(&user, state.db(), &project, goal_id).await?;
    let repeat_cycle = payload.repeat_cycle.as_deref().map(RepeatCycle::parse);
    let changes = KpiGoalChanges {
        title: non_empty(payload.title.as_deref()),
        target_value: payload.target_value,
        unit: non_empty(payload.unit.as_deref()),
        repeat_cycle,
        period: repeat_cycle.map(|cycle| current_calendar_period(cycle, today())),
    };
    KpiGoal::update(state.db(), goal.id, &changes).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn delete_goal(
    user: CurrentUser,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Path((_, goal_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let goal = project_goal(&user, state.db(), &project, goal_id).await?;
    KpiGoal::delete(state.db(), goal.id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn add_record(
    user: CurrentUser,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Path((_, goal_id)): Path<(i64, i64)>,
    Json(payload): Json<AddRecordRequest>,
) -> Result<ResponseJson<ApiResponse<Created>>, ApiError> {
    let goal = project_goal(&user, state.db(), &project, goal_id).await?;
    let date = match non_empty(payload.recorded_date.as_deref()) {
        Some(raw) => parse_date(&raw)
            .ok_or_else(|| ApiError::bad_request("Date must be YYYY-MM-DD"))?,
        None => today(),
    };
    let note = non_empty(payload.note.as_deref());
    let id = KpiGoal::add_record(
        state.db(),
        goal.id,
        payload.value,
        &format_date(date),
        note.as_deref(),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(Created { id })))
}

pub async fn complete_period(
    user: CurrentUser,
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Path((_, goal_id)): Path<(i64, i64)>,
) -> Result<ResponseJson<ApiResponse<KpiPeriodHistory>>, ApiError> {
    let goal = project_goal(&user, state.db(), &project, goal_id).await?;
    let period = closing_period(&goal, today())
        .ok_or_else(|| ApiError::bad_request("No period set for this goal"))?;
    let history = KpiGoal::complete_period(state.db(), &goal, &period).await?;
    tracing::info!(
        goal_id = goal.id,
        rate = history.achievement_rate,
        "completed KPI period"
    );
    Ok(ResponseJson(ApiResponse::success(history)))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let kpi = Router::new()
        .route("/", get(list_goals).post(create_goal))
        .route("/{goal_id}", put(update_goal).delete(delete_goal))
        .route("/{goal_id}/records", post(add_record))
        .route("/{goal_id}/complete", post(complete_period))
        .layer(from_fn_with_state(state.clone(), load_project_middleware));

    Router::new().nest("/projects/{project_id}/kpi", kpi)
}
