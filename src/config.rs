/// External configuration loader.
///
/// Reads `config.toml` from an explicit path, or searches the executable's
/// directory, the working directory and the XDG data home. Falls back to
/// defaults if the file is missing or incomplete. Problems are collected as
/// warnings and logged once tracing is up.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::grid::Difficulty;
use crate::net::api::{ApiClientConfig, DEFAULT_REQUEST_ATTEMPTS, DEFAULT_TIMEOUT_MS};
use crate::sim::controller::DEFAULT_MAX_HINTS;
use crate::sim::install::{InstallConfig, DEFAULT_WORKER_PATH};

const APP_DIR: &str = "sudoku-pro";

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ApiClientConfig,
    pub game: GameConfig,
    pub install: InstallConfig,
    pub gamepad: GamepadConfig,
    pub data_dir: PathBuf,
    /// Non-fatal problems found while loading.
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub max_hints: u32,
    pub difficulty: Difficulty,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub place: Vec<String>,
    pub clear: Vec<String>,
    pub note_mode: Vec<String>,
    pub hint: Vec<String>,
    pub prev_digit: Vec<String>,
    pub next_digit: Vec<String>,
    pub undo: Vec<String>,
    pub redo: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    server: TomlServer,
    #[serde(default)]
    game: TomlGame,
    #[serde(default)]
    install: TomlInstall,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlServer {
    #[serde(default = "default_base_url")]
    base_url: String,
    #[serde(default = "default_timeout")]
    timeout_ms: u64,
    #[serde(default = "default_attempts")]
    request_attempts: usize,
}

#[derive(Deserialize, Debug)]
struct TomlGame {
    #[serde(default = "default_max_hints")]
    max_hints: u32,
    #[serde(default)]
    difficulty: Difficulty,
}

#[derive(Deserialize, Debug)]
struct TomlInstall {
    #[serde(default = "default_prompt_delay")]
    prompt_delay_ms: u64,
    #[serde(default = "default_launch_delay")]
    launch_delay_ms: u64,
    #[serde(default = "default_worker_path")]
    worker_path: String,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_place")]
    place: Vec<String>,
    #[serde(default = "default_clear")]
    clear: Vec<String>,
    #[serde(default = "default_note_mode")]
    note_mode: Vec<String>,
    #[serde(default = "default_hint")]
    hint: Vec<String>,
    #[serde(default = "default_prev_digit")]
    prev_digit: Vec<String>,
    #[serde(default = "default_next_digit")]
    next_digit: Vec<String>,
    #[serde(default = "default_undo")]
    undo: Vec<String>,
    #[serde(default = "default_redo")]
    redo: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
}

#[derive(Deserialize, Debug, Default)]
struct TomlGeneral {
    /// Where settings and the log live. Empty = auto.
    #[serde(default)]
    data_dir: String,
}

// ── Defaults ──

fn default_base_url() -> String { "http://127.0.0.1:5000".into() }
fn default_timeout() -> u64 { DEFAULT_TIMEOUT_MS }
fn default_attempts() -> usize { DEFAULT_REQUEST_ATTEMPTS }
fn default_max_hints() -> u32 { DEFAULT_MAX_HINTS }
fn default_prompt_delay() -> u64 { 3000 }
fn default_launch_delay() -> u64 { 1000 }
fn default_worker_path() -> String { DEFAULT_WORKER_PATH.into() }

fn default_place() -> Vec<String> { vec!["A".into()] }
fn default_clear() -> Vec<String> { vec!["B".into()] }
fn default_note_mode() -> Vec<String> { vec!["X".into()] }
fn default_hint() -> Vec<String> { vec!["Y".into()] }
fn default_prev_digit() -> Vec<String> { vec!["L1".into()] }
fn default_next_digit() -> Vec<String> { vec!["R1".into()] }
fn default_undo() -> Vec<String> { vec!["L2".into()] }
fn default_redo() -> Vec<String> { vec!["R2".into()] }
fn default_confirm() -> Vec<String> { vec!["Start".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }

impl Default for TomlServer {
    fn default() -> Self {
        TomlServer {
            base_url: default_base_url(),
            timeout_ms: default_timeout(),
            request_attempts: default_attempts(),
        }
    }
}

impl Default for TomlGame {
    fn default() -> Self {
        TomlGame {
            max_hints: default_max_hints(),
            difficulty: Difficulty::default(),
        }
    }
}

impl Default for TomlInstall {
    fn default() -> Self {
        TomlInstall {
            prompt_delay_ms: default_prompt_delay(),
            launch_delay_ms: default_launch_delay(),
            worker_path: default_worker_path(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            place: default_place(),
            clear: default_clear(),
            note_mode: default_note_mode(),
            hint: default_hint(),
            prev_digit: default_prev_digit(),
            next_digit: default_next_digit(),
            undo: default_undo(),
            redo: default_redo(),
            confirm: default_confirm(),
            cancel: default_cancel(),
        }
    }
}

// ── Loading ──

impl AppConfig {
    /// Load from `explicit` if given, otherwise search for `config.toml`.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Self {
        let mut warnings = Vec::new();
        let toml_cfg = match explicit {
            Some(path) => read_toml(path, &mut warnings).unwrap_or_default(),
            None => search_toml(&candidate_dirs(), &mut warnings),
        };
        Self::from_toml(toml_cfg, warnings)
    }

    fn from_toml(t: TomlConfig, warnings: Vec<String>) -> Self {
        let data_dir = if t.general.data_dir.trim().is_empty() {
            default_data_dir()
        } else {
            PathBuf::from(t.general.data_dir.trim())
        };

        AppConfig {
            server: ApiClientConfig {
                base_url: t.server.base_url,
                timeout_ms: t.server.timeout_ms,
                request_attempts: t.server.request_attempts,
            },
            game: GameConfig {
                max_hints: t.game.max_hints,
                difficulty: t.game.difficulty,
            },
            install: InstallConfig {
                worker_path: t.install.worker_path,
                prompt_delay: Duration::from_millis(t.install.prompt_delay_ms),
                launch_delay: Duration::from_millis(t.install.launch_delay_ms),
            },
            gamepad: GamepadConfig {
                place: t.gamepad.place,
                clear: t.gamepad.clear,
                note_mode: t.gamepad.note_mode,
                hint: t.gamepad.hint,
                prev_digit: t.gamepad.prev_digit,
                next_digit: t.gamepad.next_digit,
                undo: t.gamepad.undo,
                redo: t.gamepad.redo,
                confirm: t.gamepad.confirm,
                cancel: t.gamepad.cancel,
            },
            data_dir,
            warnings,
        }
    }
}

/// Candidate directories to search: exe dir + CWD + XDG data home (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/sudoku-pro)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share").join(APP_DIR);
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// First `config.toml` found wins; a broken one means defaults.
fn search_toml(search_dirs: &[PathBuf], warnings: &mut Vec<String>) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            return read_toml(&path, warnings).unwrap_or_default();
        }
    }
    TomlConfig::default()
}

fn read_toml(path: &Path, warnings: &mut Vec<String>) -> Option<TomlConfig> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warnings.push(format!("could not read {}: {e}", path.display()));
            return None;
        }
    };
    match toml::from_str::<TomlConfig>(&text) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            warnings.push(format!("{} parse error, using defaults: {e}", path.display()));
            None
        }
    }
}

/// Data directory for settings and the log: XDG data home, else CWD.
fn default_data_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share").join(APP_DIR);
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> AppConfig {
        let t: TomlConfig = toml::from_str(text).expect("valid toml");
        AppConfig::from_toml(t, Vec::new())
    }

    #[test]
    fn unset_keys_take_defaults() {
        let cfg = parse("[general]\ndata_dir = \"/tmp/sudoku\"\n");
        assert_eq!(cfg.server.base_url, "http://127.0.0.1:5000");
        assert_eq!(cfg.server.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(cfg.game.max_hints, 5);
        assert_eq!(cfg.game.difficulty, Difficulty::Medium);
        assert_eq!(cfg.install.worker_path, "/static/sw.js");
        assert_eq!(cfg.install.prompt_delay, Duration::from_secs(3));
        assert_eq!(cfg.gamepad.place, vec!["A".to_string()]);
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/sudoku"));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = parse(
            r#"
            [server]
            base_url = "https://sudoku.example"

            [game]
            difficulty = "expert"

            [gamepad]
            hint = ["RB"]

            [general]
            data_dir = "/tmp/sudoku"
            "#,
        );
        assert_eq!(cfg.server.base_url, "https://sudoku.example");
        assert_eq!(cfg.server.request_attempts, DEFAULT_REQUEST_ATTEMPTS);
        assert_eq!(cfg.game.difficulty, Difficulty::Expert);
        assert_eq!(cfg.gamepad.hint, vec!["RB".to_string()]);
        assert_eq!(cfg.gamepad.undo, vec!["L2".to_string()]);
    }

    #[test]
    fn broken_file_warns_and_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nbase_url = 3").unwrap();
        let mut warnings = Vec::new();
        assert!(read_toml(&path, &mut warnings).is_none());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("parse error"));
    }

    #[test]
    fn explicit_path_is_honoured() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            format!("[game]\nmax_hints = 3\n[general]\ndata_dir = \"{}\"\n", dir.path().display()),
        )
        .unwrap();
        let cfg = AppConfig::load(Some(&path));
        assert_eq!(cfg.game.max_hints, 3);
        assert_eq!(cfg.data_dir, dir.path());
        assert!(cfg.warnings.is_empty());
    }
}
