// HTTP API routes: gameplay, administrative snapshot, and game control.

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::auth::{AdminUser, AuthUser};
use crate::db::{Database, Team};
use crate::engine::{GameError, Progress, TeamState};
use crate::locks::TeamLocks;
use crate::metrics;

// ── Request types ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct QuestionRequest {
    pub no: i64,
}

#[derive(Deserialize)]
pub struct AnswerRequest {
    pub no: i64,
    pub answer: Option<String>,
}

#[derive(Deserialize)]
pub struct ChooseRequest {
    pub pokemon: String,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
pub struct PokecenterRequest {
    /// `false` asks for a cost quote without reviving.
    #[serde(default = "default_true")]
    pub commit: bool,
}

#[derive(Deserialize)]
pub struct GameSwitchRequest {
    pub open: bool,
}

#[derive(Deserialize)]
pub struct OpponentSpec {
    pub name: String,
    pub poke_type: i64,
    pub stage: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateQuestionRequest {
    pub number: i64,
    pub difficulty_level: i64,
    pub content: String,
    pub answer: String,
    /// Creature guarding the question. Optional when a creature with this
    /// question number already exists (the seeded species cover 1-4).
    pub opponent: Option<OpponentSpec>,
}

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub locks: TeamLocks,
    pub server_no: i64,
}

// ── Error helpers ─────────────────────────────────────────────────────

fn internal_error(e: sqlx::Error) -> Response {
    tracing::error!("Database error: {e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"status": 0, "error_message": "Internal server error"})),
    )
        .into_response()
}

fn corrupt_state_error(e: serde_json::Error) -> Response {
    tracing::error!("Corrupt progress state: {e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"status": 0, "error_message": "Internal server error"})),
    )
        .into_response()
}

/// Translate an engine error into the status-field JSON contract.
fn game_error(e: GameError) -> Response {
    match e {
        GameError::GameOver => (
            StatusCode::OK,
            Json(json!({"status": 2, "error_message": e.to_string()})),
        )
            .into_response(),
        GameError::AttemptsExhausted | GameError::CreatureNotChosen => (
            StatusCode::OK,
            Json(json!({"status": 0, "error_message": e.to_string()})),
        )
            .into_response(),
        GameError::NotFound => (
            StatusCode::NOT_FOUND,
            Json(json!({"status": 0, "error_message": "Not found"})),
        )
            .into_response(),
        GameError::Conflict => (
            StatusCode::CONFLICT,
            Json(json!({"status": 0, "error_message": e.to_string()})),
        )
            .into_response(),
        GameError::Validation(message) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": 0, "error_message": message})),
        )
            .into_response(),
        GameError::AuthFailure(message) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"status": 0, "error_message": message})),
        )
            .into_response(),
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(db: Arc<Database>, locks: TeamLocks, server_no: i64) -> Router {
    let state = AppState {
        db,
        locks,
        server_no,
    };

    Router::new()
        // Team snapshot
        .route("/details", get(get_details))
        // Gameplay
        .route("/question", post(post_question))
        .route("/answer", post(post_answer))
        .route("/choose", post(post_choose))
        .route("/pokecenter", post(post_pokecenter))
        // Administration
        .route("/send_all", get(send_all))
        .route("/admin/game_switch", post(set_game_switch))
        .route("/admin/finalize", post(finalize_game))
        .route("/admin/questions", post(create_question))
        // Observability
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}

// ── Gameplay plumbing ─────────────────────────────────────────────────

/// Every gameplay operation starts by reading the shared game switch.
async fn ensure_game_open(db: &Database) -> Result<(), Response> {
    match db.game_open().await {
        Ok(true) => Ok(()),
        Ok(false) => Err((
            StatusCode::OK,
            Json(json!({"status": 2, "error_message": "The game is not open"})),
        )
            .into_response()),
        Err(e) => Err(internal_error(e)),
    }
}

/// Load a team row and rebuild its engine state. Call with the team's
/// mutation lock held.
async fn load_state(db: &Database, team_id: i64) -> Result<(Team, TeamState), Response> {
    let team = db
        .get_team(team_id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| game_error(GameError::NotFound))?;
    let creature = match &team.creature {
        Some(name) => db.get_creature(name).await.map_err(internal_error)?,
        None => None,
    };
    let question_count = db.count_questions().await.map_err(internal_error)? as usize;
    let state = team
        .to_state(creature.as_ref(), question_count)
        .map_err(corrupt_state_error)?;
    Ok((team, state))
}

// ── Gameplay handlers ─────────────────────────────────────────────────

async fn get_details(State(state): State<AppState>, AuthUser(claims): AuthUser) -> Response {
    let team = match state.db.get_team(claims.sub).await {
        Ok(Some(t)) => t,
        Ok(None) => return game_error(GameError::NotFound),
        Err(e) => return internal_error(e),
    };

    let display_id = match &team.creature {
        Some(name) => match state.db.get_creature(name).await {
            Ok(Some(c)) => Some(c.info().display_id()),
            Ok(None) => None,
            Err(e) => return internal_error(e),
        },
        None => None,
    };

    let question_count = match state.db.count_questions().await {
        Ok(n) => n as usize,
        Err(e) => return internal_error(e),
    };
    let progress = match Progress::from_columns(
        &team.attempted_questions,
        &team.correct_questions,
        question_count,
    ) {
        Ok(p) => p,
        Err(e) => return corrupt_state_error(e),
    };

    (
        StatusCode::OK,
        Json(json!({
            "status": 1,
            "pokemon": display_id,
            "teamname": team.teamname,
            "attempted_questions": progress.attempted_counts(),
            "correct_questions": progress.correct_flags(),
            "xp": team.xp,
            "evolution_state": team.evolution,
            "pokemoney": team.pokemoney,
            "fainted": team.fainted,
        })),
    )
        .into_response()
}

async fn post_question(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(req): Json<QuestionRequest>,
) -> Response {
    if let Err(resp) = ensure_game_open(&state.db).await {
        return resp;
    }

    let lock = state.locks.for_team(claims.sub);
    let _guard = lock.lock().await;

    let question = match state.db.get_question(req.no).await {
        Ok(Some(q)) => q,
        Ok(None) => return game_error(GameError::NotFound),
        Err(e) => return internal_error(e),
    };
    let opponent = match state.db.get_creature_by_question(req.no).await {
        Ok(Some(c)) => c,
        Ok(None) => return game_error(GameError::NotFound),
        Err(e) => return internal_error(e),
    };

    let (team, mut ts) = match load_state(&state.db, claims.sub).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match ts.request_question(&question.info(), &opponent.info()) {
        Ok(view) => {
            if let Err(e) = state.db.save_state(team.id, &ts).await {
                return internal_error(e);
            }
            metrics::QUESTIONS_SERVED_TOTAL.inc();
            (
                StatusCode::OK,
                Json(json!({
                    "status": 1,
                    "question": view.question,
                    "visited": view.visited,
                    "amount_deducted": view.amount_deducted,
                    "poke_type_1": view.poke_type_1,
                    "poke_type_2": view.poke_type_2,
                })),
            )
                .into_response()
        }
        Err(e) => game_error(e),
    }
}

async fn post_answer(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(req): Json<AnswerRequest>,
) -> Response {
    // A request without an answer is a liveness ack, nothing more.
    let Some(answer) = req.answer else {
        return (StatusCode::OK, Json(json!({"status": 1}))).into_response();
    };

    if let Err(resp) = ensure_game_open(&state.db).await {
        return resp;
    }

    let lock = state.locks.for_team(claims.sub);
    let _guard = lock.lock().await;

    let question = match state.db.get_question(req.no).await {
        Ok(Some(q)) => q,
        Ok(None) => return game_error(GameError::NotFound),
        Err(e) => return internal_error(e),
    };
    let opponent = match state.db.get_creature_by_question(req.no).await {
        Ok(Some(c)) => c,
        Ok(None) => return game_error(GameError::NotFound),
        Err(e) => return internal_error(e),
    };

    let (team, mut ts) = match load_state(&state.db, claims.sub).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let outcome = match ts.submit_answer(&question.info(), &opponent.info(), &answer) {
        Ok(o) => o,
        Err(e) => return game_error(e),
    };

    // On evolution the engine renames the creature; rebind to the stored
    // species row so the display id follows the new stage.
    if let Some(species) = &outcome.new_species {
        match state.db.get_creature(species).await {
            Ok(Some(c)) => ts.creature = Some(c.info()),
            Ok(None) => tracing::error!("Evolved species {species} missing from creatures table"),
            Err(e) => return internal_error(e),
        }
        metrics::EVOLUTIONS_TOTAL.inc();
    }

    if let Err(e) = state.db.save_state(team.id, &ts).await {
        return internal_error(e);
    }

    if outcome.correct {
        metrics::ANSWERS_TOTAL.with_label_values(&["correct"]).inc();
        let display_id = ts.creature.as_ref().map(|c| c.display_id());
        (
            StatusCode::OK,
            Json(json!({
                "status": 1,
                "xp": outcome.xp,
                "pokemoney": outcome.pokemoney,
                "fainted": outcome.fainted as u8,
                "visited": outcome.visited,
                "correct": 1,
                "evolved": outcome.evolved as u8,
                "evolution_state": outcome.evolution,
                "pokemon": display_id,
            })),
        )
            .into_response()
    } else {
        metrics::ANSWERS_TOTAL
            .with_label_values(&["incorrect"])
            .inc();
        (
            StatusCode::OK,
            Json(json!({
                "status": 0,
                "fainted": outcome.fainted as u8,
                "xp": outcome.xp,
                "pokemoney": outcome.pokemoney,
            })),
        )
            .into_response()
    }
}

async fn post_choose(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(req): Json<ChooseRequest>,
) -> Response {
    if let Err(resp) = ensure_game_open(&state.db).await {
        return resp;
    }

    let lock = state.locks.for_team(claims.sub);
    let _guard = lock.lock().await;

    let creature = match state.db.get_creature(&req.pokemon).await {
        Ok(Some(c)) => c,
        Ok(None) => return game_error(GameError::NotFound),
        Err(e) => return internal_error(e),
    };

    let (team, mut ts) = match load_state(&state.db, claims.sub).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match ts.choose_starter(&creature.info()) {
        Ok(outcome) => {
            if !outcome.already_chosen {
                if let Err(e) = state.db.save_state(team.id, &ts).await {
                    return internal_error(e);
                }
            }
            (
                StatusCode::OK,
                Json(json!({"status": 1, "teamname": outcome.teamname})),
            )
                .into_response()
        }
        Err(e) => game_error(e),
    }
}

async fn post_pokecenter(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(req): Json<PokecenterRequest>,
) -> Response {
    if let Err(resp) = ensure_game_open(&state.db).await {
        return resp;
    }

    let lock = state.locks.for_team(claims.sub);
    let _guard = lock.lock().await;

    let (team, mut ts) = match load_state(&state.db, claims.sub).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    if !req.commit {
        return match ts.revive_quote() {
            Ok(cost) => (
                StatusCode::OK,
                Json(json!({"status": 1, "amount_deducted": cost})),
            )
                .into_response(),
            Err(e) => game_error(e),
        };
    }

    match ts.revive() {
        Ok(outcome) => {
            if let Err(e) = state.db.save_state(team.id, &ts).await {
                return internal_error(e);
            }
            metrics::REVIVES_TOTAL.inc();
            (
                StatusCode::OK,
                Json(json!({
                    "status": 1,
                    "amount_deducted": outcome.amount_deducted,
                    "pokemoney": outcome.pokemoney,
                    "fainted": outcome.fainted as u8,
                    "xp": outcome.xp,
                })),
            )
                .into_response()
        }
        Err(e) => game_error(e),
    }
}

// ── Administrative handlers ───────────────────────────────────────────

async fn send_all(State(state): State<AppState>, AdminUser(_claims): AdminUser) -> Response {
    let teams = match state.db.list_teams().await {
        Ok(t) => t,
        Err(e) => return internal_error(e),
    };

    let players: Vec<serde_json::Value> = teams
        .iter()
        .map(|t| {
            json!({
                "teamname": t.teamname,
                "pokemoney": t.pokemoney,
                "name1": t.name1,
                "name2": t.name2,
                "server": state.server_no,
            })
        })
        .collect();

    (StatusCode::OK, Json(json!({ "players": players }))).into_response()
}

async fn set_game_switch(
    State(state): State<AppState>,
    AdminUser(claims): AdminUser,
    Json(req): Json<GameSwitchRequest>,
) -> Response {
    if let Err(e) = state.db.set_game_open(req.open).await {
        return internal_error(e);
    }
    metrics::GAME_OPEN.set(req.open as i64);
    tracing::info!(
        "Game switch set to {} by {}",
        if req.open { "open" } else { "closed" },
        claims.teamname
    );
    (StatusCode::OK, Json(json!({"status": 1, "open": req.open}))).into_response()
}

async fn finalize_game(State(state): State<AppState>, AdminUser(claims): AdminUser) -> Response {
    match state.db.set_all_submitted().await {
        Ok(frozen) => {
            tracing::info!("Game finalized by {}: {frozen} teams frozen", claims.teamname);
            (
                StatusCode::OK,
                Json(json!({"status": 1, "teams_frozen": frozen})),
            )
                .into_response()
        }
        Err(e) => internal_error(e),
    }
}

async fn create_question(
    State(state): State<AppState>,
    AdminUser(_claims): AdminUser,
    Json(req): Json<CreateQuestionRequest>,
) -> Response {
    if req.number < 1 {
        return game_error(GameError::Validation(
            "question number must be positive".to_string(),
        ));
    }
    if !(1..=2).contains(&req.difficulty_level) {
        return game_error(GameError::Validation(
            "difficulty_level must be 1 or 2".to_string(),
        ));
    }
    if req.content.trim().is_empty() || req.answer.trim().is_empty() {
        return game_error(GameError::Validation(
            "content and answer are required".to_string(),
        ));
    }

    // The question needs an opponent creature sharing its number.
    let existing = match state.db.get_creature_by_question(req.number).await {
        Ok(c) => c,
        Err(e) => return internal_error(e),
    };
    let opponent = match (existing, req.opponent) {
        (Some(c), _) => c,
        (None, Some(spec)) => {
            if !(1..=4).contains(&spec.poke_type) {
                return game_error(GameError::Validation(
                    "opponent poke_type must be 1-4".to_string(),
                ));
            }
            match state
                .db
                .create_creature(
                    &spec.name,
                    spec.poke_type,
                    req.number,
                    spec.stage.unwrap_or(1),
                )
                .await
            {
                Ok(c) => c,
                Err(e) if e.to_string().contains("UNIQUE") => {
                    return game_error(GameError::Conflict)
                }
                Err(e) => return internal_error(e),
            }
        }
        (None, None) => {
            return game_error(GameError::Validation(
                "no creature holds this question number; supply an opponent".to_string(),
            ));
        }
    };

    match state
        .db
        .create_question(req.number, req.difficulty_level, &req.content, &req.answer)
        .await
    {
        Ok(question) => (
            StatusCode::CREATED,
            Json(json!({"status": 1, "question": question, "creature": opponent})),
        )
            .into_response(),
        Err(e) if e.to_string().contains("UNIQUE") => game_error(GameError::Conflict),
        Err(e) => internal_error(e),
    }
}
