/// HTTP client for the Sudoku Pro game service.
///
/// Every endpoint answers with a JSON envelope: `success` plus either the
/// payload fields or an optional `error` string. A falsy `success` is a
/// failure no matter what the HTTP status says, and a 4xx/5xx whose body
/// carries an `error` string is reported the same way.
///
/// Mutating calls are sent exactly once. Only the read-only statistics
/// fetch honours `request_attempts`, so a dropped connection can never
/// apply the same move twice.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::grid::{Board, Difficulty, NoteGrid, Pos};

pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_REQUEST_ATTEMPTS: usize = 2;

pub const NEW_GAME_PATH: &str = "/api/new-game";
pub const MAKE_MOVE_PATH: &str = "/api/make-move";
pub const UNDO_PATH: &str = "/api/undo";
pub const REDO_PATH: &str = "/api/redo";
pub const HINT_PATH: &str = "/api/hint";
pub const CHECK_SOLUTION_PATH: &str = "/api/check-solution";
pub const GAME_STATS_PATH: &str = "/api/game-stats";
pub const USER_STATS_PATH: &str = "/api/user-stats";

#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub request_attempts: usize,
}

impl ApiClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            request_attempts: DEFAULT_REQUEST_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    timeout: Duration,
    request_attempts: usize,
    http: reqwest::Client,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("api_base_url_missing")]
    BaseUrlMissing,
    #[error("api_invalid_path")]
    InvalidPath,
    #[error("api_request_failed:{message}")]
    Request { message: String },
    #[error("api_read_failed:{message}")]
    Read { message: String },
    #[error("api_http_{status}:{body}")]
    Http { status: StatusCode, body: String },
    #[error("api_json_decode_failed:{message}")]
    Decode { message: String },
    #[error("api_rejected:{message}")]
    Rejected { message: String },
}

impl ApiError {
    /// True when the request never reached the service.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, ApiError::Request { .. })
    }
}

// ── Wire types ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveType {
    Number,
    Note,
}

#[derive(Debug, Serialize)]
pub struct NewGameRequest {
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewGameResponse {
    pub game_id: String,
    pub puzzle: Board,
    pub solution: Board,
}

#[derive(Debug, Serialize)]
pub struct MakeMoveRequest {
    pub game_id: String,
    pub row: usize,
    pub col: usize,
    pub value: u8,
    pub move_type: MoveType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MakeMoveResponse {
    pub current_board: Board,
    pub notes: NoteGrid,
    #[serde(default)]
    pub moves_history: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub is_complete: bool,
}

#[derive(Debug, Serialize)]
pub struct GameIdRequest {
    pub game_id: String,
}

/// Shared by undo and redo.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    pub current_board: Board,
    pub notes: NoteGrid,
    #[serde(default)]
    pub moves_history: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub redo_stack: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
pub struct HintRequest {
    pub game_id: String,
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HintResponse {
    #[serde(default)]
    pub hint: Option<u8>,
    #[serde(default)]
    pub hints_used: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckSolutionResponse {
    pub is_valid: bool,
}

#[derive(Debug, Serialize)]
pub struct GameStatsRequest {
    pub game_id: String,
    pub time_taken: u64,
    pub completed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserStats {
    #[serde(default)]
    pub total_games: u64,
    #[serde(default)]
    pub completed_games: u64,
    #[serde(default)]
    pub total_play_time: u64,
    #[serde(default)]
    pub hints_used: u64,
    #[serde(default)]
    pub best_times: BTreeMap<String, u64>,
}

impl UserStats {
    /// Best times in difficulty order; names the client does not know
    /// follow in alphabetical order.
    pub fn best_times_ordered(&self) -> Vec<(String, u64)> {
        let mut rows: Vec<(String, u64)> =
            self.best_times.iter().map(|(k, v)| (k.clone(), *v)).collect();
        rows.sort_by_key(|(name, _)| {
            let rank = name
                .parse::<Difficulty>()
                .map(|d| d as usize)
                .unwrap_or(Difficulty::ALL.len());
            (rank, name.clone())
        });
        rows
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct UserStatsResponse {
    #[serde(default)]
    stats: UserStats,
}

// ── Calls and replies ──

/// One request to the service, owned so it can cross to the network thread.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    NewGame { difficulty: Difficulty },
    MakeMove { game_id: String, pos: Pos, value: u8, move_type: MoveType },
    Undo { game_id: String },
    Redo { game_id: String },
    Hint { game_id: String, pos: Pos },
    CheckSolution { game_id: String },
    SaveGameStats { game_id: String, time_taken: u64, completed: bool },
    UserStats,
}

impl ApiCall {
    pub fn path(&self) -> &'static str {
        match self {
            ApiCall::NewGame { .. } => NEW_GAME_PATH,
            ApiCall::MakeMove { .. } => MAKE_MOVE_PATH,
            ApiCall::Undo { .. } => UNDO_PATH,
            ApiCall::Redo { .. } => REDO_PATH,
            ApiCall::Hint { .. } => HINT_PATH,
            ApiCall::CheckSolution { .. } => CHECK_SOLUTION_PATH,
            ApiCall::SaveGameStats { .. } => GAME_STATS_PATH,
            ApiCall::UserStats => USER_STATS_PATH,
        }
    }
}

#[derive(Debug)]
pub enum ApiReply {
    NewGame(Result<NewGameResponse, ApiError>),
    MakeMove(Result<MakeMoveResponse, ApiError>),
    Undo(Result<HistoryResponse, ApiError>),
    Redo(Result<HistoryResponse, ApiError>),
    Hint(Result<HintResponse, ApiError>),
    CheckSolution(Result<CheckSolutionResponse, ApiError>),
    SaveGameStats(Result<(), ApiError>),
    UserStats(Result<UserStats, ApiError>),
}

impl ApiReply {
    pub fn error(&self) -> Option<&ApiError> {
        match self {
            ApiReply::NewGame(r) => r.as_ref().err(),
            ApiReply::MakeMove(r) => r.as_ref().err(),
            ApiReply::Undo(r) | ApiReply::Redo(r) => r.as_ref().err(),
            ApiReply::Hint(r) => r.as_ref().err(),
            ApiReply::CheckSolution(r) => r.as_ref().err(),
            ApiReply::SaveGameStats(r) => r.as_ref().err(),
            ApiReply::UserStats(r) => r.as_ref().err(),
        }
    }
}

// ── Client ──

impl ApiClient {
    pub fn new(config: ApiClientConfig) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(&config.base_url)?;
        Ok(Self {
            base_url,
            timeout: Duration::from_millis(config.timeout_ms.max(250)),
            request_attempts: config.request_attempts.max(1),
            http: reqwest::Client::new(),
        })
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> Option<String> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('/') {
            Some(format!("{}{}", self.base_url, trimmed))
        } else {
            Some(format!("{}/{}", self.base_url, trimmed))
        }
    }

    /// Run one call to completion and wrap the outcome.
    pub async fn execute(&self, call: ApiCall) -> ApiReply {
        let path = call.path();
        match call {
            ApiCall::NewGame { difficulty } => {
                ApiReply::NewGame(self.post_json(path, &NewGameRequest { difficulty }).await)
            }
            ApiCall::MakeMove { game_id, pos, value, move_type } => {
                let body = MakeMoveRequest { game_id, row: pos.row, col: pos.col, value, move_type };
                ApiReply::MakeMove(self.post_json(path, &body).await)
            }
            ApiCall::Undo { game_id } => {
                ApiReply::Undo(self.post_json(path, &GameIdRequest { game_id }).await)
            }
            ApiCall::Redo { game_id } => {
                ApiReply::Redo(self.post_json(path, &GameIdRequest { game_id }).await)
            }
            ApiCall::Hint { game_id, pos } => {
                let body = HintRequest { game_id, row: pos.row, col: pos.col };
                ApiReply::Hint(self.post_json(path, &body).await)
            }
            ApiCall::CheckSolution { game_id } => {
                ApiReply::CheckSolution(self.post_json(path, &GameIdRequest { game_id }).await)
            }
            ApiCall::SaveGameStats { game_id, time_taken, completed } => {
                let body = GameStatsRequest { game_id, time_taken, completed };
                let ack = self.post_json::<_, serde_json::Value>(path, &body).await;
                ApiReply::SaveGameStats(ack.map(|_| ()))
            }
            ApiCall::UserStats => {
                let res = self.get_json::<UserStatsResponse>(path).await;
                ApiReply::UserStats(res.map(|r| r.stats))
            }
        }
    }

    pub async fn post_json<Req, Res>(&self, path: &str, payload: &Req) -> Result<Res, ApiError>
    where
        Req: Serialize + ?Sized,
        Res: for<'de> Deserialize<'de>,
    {
        let url = self.endpoint(path).ok_or(ApiError::InvalidPath)?;
        tracing::debug!(%url, "POST");
        let response = self
            .http
            .post(url.as_str())
            .header("x-request-id", request_id())
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|error| ApiError::Request { message: error.to_string() })?;
        decode_response(response).await
    }

    pub async fn get_json<T>(&self, path: &str) -> Result<T, ApiError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = self.endpoint(path).ok_or(ApiError::InvalidPath)?;
        let mut last_error: Option<String> = None;

        for attempt in 0..self.request_attempts {
            tracing::debug!(%url, attempt, "GET");
            let request = self
                .http
                .get(url.as_str())
                .header("x-request-id", request_id())
                .timeout(self.timeout);

            match request.send().await {
                Ok(response) => return decode_response(response).await,
                Err(error) => {
                    last_error = Some(error.to_string());
                    if attempt + 1 >= self.request_attempts {
                        break;
                    }
                }
            }
        }

        Err(ApiError::Request {
            message: last_error.unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

fn request_id() -> String {
    format!("req_{}", Uuid::new_v4().simple())
}

fn normalize_base_url(base_url: &str) -> Result<String, ApiError> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BaseUrlMissing);
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

async fn decode_response<T>(response: reqwest::Response) -> Result<T, ApiError>
where
    T: for<'de> Deserialize<'de>,
{
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|error| ApiError::Read { message: error.to_string() })?;
    decode_envelope(status, &bytes)
}

/// Unwrap the `{success, error?, ...}` envelope into a typed payload.
pub fn decode_envelope<T>(status: StatusCode, body: &[u8]) -> Result<T, ApiError>
where
    T: for<'de> Deserialize<'de>,
{
    let parsed = serde_json::from_slice::<serde_json::Value>(body);

    if !status.is_success() {
        if let Some(message) = parsed.as_ref().ok().and_then(envelope_error) {
            return Err(ApiError::Rejected { message });
        }
        return Err(format_http_error(status, body));
    }

    let value = parsed.map_err(|error| ApiError::Decode { message: error.to_string() })?;
    let success = value.get("success").and_then(serde_json::Value::as_bool).unwrap_or(false);
    if !success {
        return Err(ApiError::Rejected {
            message: envelope_error(&value).unwrap_or_else(|| "request failed".to_string()),
        });
    }

    serde_json::from_value::<T>(value).map_err(|error| ApiError::Decode { message: error.to_string() })
}

fn envelope_error(value: &serde_json::Value) -> Option<String> {
    value
        .get("error")
        .and_then(serde_json::Value::as_str)
        .and_then(|s| non_empty_string(s.to_string()))
}

pub fn format_http_error(status: StatusCode, body: &[u8]) -> ApiError {
    let body = non_empty_string(String::from_utf8_lossy(body).to_string())
        .unwrap_or_else(|| "<empty>".to_string());
    ApiError::Http { status, body }
}

fn non_empty_string(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_builder_normalizes_paths() {
        let client = ApiClient::new(ApiClientConfig::new("http://127.0.0.1:5000/"))
            .expect("api client");

        assert_eq!(
            client.endpoint("/api/new-game"),
            Some("http://127.0.0.1:5000/api/new-game".to_string())
        );
        assert_eq!(
            client.endpoint("api/undo"),
            Some("http://127.0.0.1:5000/api/undo".to_string())
        );
        assert_eq!(client.endpoint(" "), None);
    }

    #[test]
    fn base_url_missing_is_rejected() {
        let result = ApiClient::new(ApiClientConfig::new("   "));
        assert!(matches!(result, Err(ApiError::BaseUrlMissing)));
    }

    #[test]
    fn call_paths_match_service_routes() {
        assert_eq!(ApiCall::UserStats.path(), "/api/user-stats");
        assert_eq!(
            ApiCall::CheckSolution { game_id: "g".into() }.path(),
            "/api/check-solution"
        );
        assert_eq!(ApiCall::Redo { game_id: "g".into() }.path(), "/api/redo");
    }

    #[test]
    fn move_request_serializes_wire_names() {
        let body = MakeMoveRequest {
            game_id: "abc".into(),
            row: 2,
            col: 7,
            value: 4,
            move_type: MoveType::Note,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"game_id": "abc", "row": 2, "col": 7, "value": 4, "move_type": "note"})
        );
    }

    #[test]
    fn falsy_success_is_rejected_with_server_message() {
        let body = br#"{"success": false, "error": "Invalid game ID"}"#;
        let err = decode_envelope::<CheckSolutionResponse>(StatusCode::OK, body).unwrap_err();
        assert_eq!(err.to_string(), "api_rejected:Invalid game ID");
    }

    #[test]
    fn bad_request_with_error_body_is_a_rejection() {
        let body = br#"{"success": false, "error": "No moves to undo"}"#;
        let err = decode_envelope::<HistoryResponse>(StatusCode::BAD_REQUEST, body).unwrap_err();
        assert!(matches!(err, ApiError::Rejected { ref message } if message == "No moves to undo"));
    }

    #[test]
    fn http_error_mapping_preserves_shape() {
        let error = decode_envelope::<UserStats>(StatusCode::BAD_GATEWAY, b" gateway failed ")
            .unwrap_err();
        assert_eq!(error.to_string(), "api_http_502 Bad Gateway:gateway failed");

        let empty = format_http_error(StatusCode::SERVICE_UNAVAILABLE, b" ");
        assert_eq!(empty.to_string(), "api_http_503 Service Unavailable:<empty>");
    }

    #[test]
    fn missing_success_flag_counts_as_failure() {
        let err = decode_envelope::<CheckSolutionResponse>(StatusCode::OK, br#"{"is_valid": true}"#)
            .unwrap_err();
        assert!(matches!(err, ApiError::Rejected { .. }));
    }

    #[test]
    fn move_response_without_history_decodes() {
        let mut board = [[0u8; 9]; 9];
        board[0][0] = 5;
        let body = serde_json::json!({
            "success": true,
            "current_board": board,
            "notes": vec![vec![Vec::<u8>::new(); 9]; 9],
            "is_complete": false,
            "is_valid": true,
        });
        let bytes = serde_json::to_vec(&body).unwrap();
        let res = decode_envelope::<MakeMoveResponse>(StatusCode::OK, &bytes).unwrap();
        assert!(res.moves_history.is_none());
        assert_eq!(res.current_board.get(Pos { row: 0, col: 0 }), 5);
    }

    #[test]
    fn user_stats_default_missing_fields() {
        let body = br#"{"success": true, "stats": {"total_games": 3, "best_times": {"hard": 400, "easy": 90, "daily": 50}}}"#;
        let res = decode_envelope::<UserStatsResponse>(StatusCode::OK, body).unwrap();
        assert_eq!(res.stats.total_games, 3);
        assert_eq!(res.stats.hints_used, 0);
        assert_eq!(
            res.stats.best_times_ordered(),
            vec![("easy".into(), 90), ("hard".into(), 400), ("daily".into(), 50)]
        );
    }

    #[test]
    fn only_transport_failures_count_as_offline() {
        assert!(ApiError::Request { message: "refused".into() }.is_connectivity());
        assert!(!ApiError::Rejected { message: "nope".into() }.is_connectivity());
    }
}
