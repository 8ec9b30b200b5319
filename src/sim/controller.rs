/// Game controller: owns the UI state of one Sudoku session and turns player
/// intents into service requests.
///
/// Nothing in here does I/O. Intents mutate local state and queue calls;
/// the frame loop drains the outbox to the network worker and feeds replies
/// back through `on_reply`. Every board change is adopted from a reply.
///
/// Screen flow:
///   Welcome --confirm--> Game + Instructions --confirm--> new game
///   Game --Esc--> Welcome (session dropped)
///   solved --> Win modal --confirm--> Instructions

use std::time::{Duration, Instant};

use crate::domain::conflict::conflicting_cells;
use crate::domain::grid::{Difficulty, Pos, SIZE};
use crate::domain::timer::{format_clock, GameTimer};
use crate::net::api::{ApiCall, ApiError, ApiReply, MoveType, UserStats};
use crate::net::worker::{Incoming, Outgoing};
use crate::sim::event::GameEvent;
use crate::sim::queue::{Accepted, SessionQueue};
use crate::sim::settings::{Settings, SETTING_ROWS};
use crate::sim::view::GameView;

pub const DEFAULT_MAX_HINTS: u32 = 5;
const HINT_FLASH: Duration = Duration::from_millis(1000);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    Welcome,
    Game,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WinSummary {
    pub time: String,
    pub hints_used: u32,
    pub difficulty: Difficulty,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SettingsForm {
    pub draft: Settings,
    pub cursor: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Modal {
    Instructions,
    Win(WinSummary),
    Stats(UserStats),
    Settings(SettingsForm),
    Error(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub kind: StatusKind,
}

/// Player intent, already stripped of input-device detail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    Digit(u8),
    Clear,
    PlacePad,
    PadNext,
    PadPrev,
    ToggleNotes,
    Move(Direction),
    Select(Pos),
    Undo,
    Redo,
    Hint,
    Check,
    Stats,
    Settings,
    NewGame,
    CycleDifficulty,
    Toggle,
    Confirm,
    Cancel,
    Share,
    Quit,
}

pub struct GameController {
    view: Option<GameView>,
    difficulty: Difficulty,
    max_hints: u32,
    settings: Settings,
    screen: Screen,
    modal: Option<Modal>,
    loading: bool,
    status: Option<Status>,
    timer: GameTimer,
    errors: Vec<Pos>,
    pad_digit: u8,
    hint_flash: Option<(Pos, Instant)>,
    queue: SessionQueue,
    events: Vec<GameEvent>,
    quit: bool,
}

impl GameController {
    pub fn new(settings: Settings, difficulty: Difficulty, max_hints: u32) -> Self {
        GameController {
            view: None,
            difficulty,
            max_hints,
            settings,
            screen: Screen::Welcome,
            modal: None,
            loading: false,
            status: None,
            timer: GameTimer::default(),
            errors: Vec::new(),
            pad_digit: 1,
            hint_flash: None,
            queue: SessionQueue::default(),
            events: Vec::new(),
            quit: false,
        }
    }

    // ── Read access for rendering ──

    pub fn view(&self) -> Option<&GameView> {
        self.view.as_ref()
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn modal(&self) -> Option<&Modal> {
        self.modal.as_ref()
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn errors(&self) -> &[Pos] {
        &self.errors
    }

    pub fn pad_digit(&self) -> u8 {
        self.pad_digit
    }

    pub fn flashing(&self) -> Option<Pos> {
        self.hint_flash.map(|(pos, _)| pos)
    }

    pub fn clock(&self, now: Instant) -> String {
        format_clock(self.timer.elapsed_secs(now))
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    // ── Frame loop plumbing ──

    pub fn drain_outbox(&mut self) -> Vec<Outgoing> {
        self.queue.drain_ready()
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn tick(&mut self, now: Instant) {
        if let Some((_, until)) = self.hint_flash {
            if now >= until {
                self.hint_flash = None;
            }
        }
    }

    /// Route an intent according to what is on screen.
    pub fn apply(&mut self, intent: Intent, now: Instant) {
        if self.loading {
            return;
        }
        if intent == Intent::Quit && self.screen == Screen::Welcome && self.modal.is_none() {
            self.quit = true;
            return;
        }
        if let Some(modal) = self.modal.clone() {
            self.apply_modal(modal, intent, now);
            return;
        }
        match self.screen {
            Screen::Welcome => {
                if intent == Intent::Confirm {
                    self.enter_game();
                }
            }
            Screen::Game => self.apply_game(intent, now),
        }
    }

    fn apply_modal(&mut self, modal: Modal, intent: Intent, now: Instant) {
        match modal {
            Modal::Instructions => match intent {
                Intent::Confirm => self.start_new_game(self.difficulty),
                Intent::CycleDifficulty | Intent::Move(Direction::Right) => {
                    self.difficulty = self.difficulty.next();
                }
                Intent::Move(Direction::Left) => self.difficulty = self.difficulty.prev(),
                Intent::Cancel => self.modal = None,
                _ => {}
            },
            Modal::Win(_) => match intent {
                Intent::Confirm => self.modal = Some(Modal::Instructions),
                Intent::Share => self.share_result(now),
                Intent::Cancel => self.modal = None,
                _ => {}
            },
            Modal::Settings(mut form) => match intent {
                Intent::Move(Direction::Up) => {
                    form.cursor = (form.cursor + SETTING_ROWS - 1) % SETTING_ROWS;
                    self.modal = Some(Modal::Settings(form));
                }
                Intent::Move(Direction::Down) => {
                    form.cursor = (form.cursor + 1) % SETTING_ROWS;
                    self.modal = Some(Modal::Settings(form));
                }
                Intent::Toggle | Intent::Move(Direction::Left) | Intent::Move(Direction::Right) => {
                    form.draft.toggle_row(form.cursor);
                    self.modal = Some(Modal::Settings(form));
                }
                Intent::Confirm => self.save_settings(form.draft),
                Intent::Cancel => self.modal = None,
                _ => {}
            },
            Modal::Stats(_) | Modal::Error(_) => {
                if matches!(intent, Intent::Confirm | Intent::Cancel) {
                    self.modal = None;
                }
            }
        }
    }

    fn apply_game(&mut self, intent: Intent, now: Instant) {
        match intent {
            Intent::Digit(d) => self.make_move(d),
            Intent::Clear => self.make_move(0),
            Intent::PlacePad => self.make_move(self.pad_digit),
            Intent::PadNext => self.pad_digit = self.pad_digit % 9 + 1,
            Intent::PadPrev => self.pad_digit = (self.pad_digit + 7) % 9 + 1,
            Intent::ToggleNotes => self.toggle_note_mode(),
            Intent::Move(dir) => self.move_selection(dir),
            Intent::Select(pos) => self.select_cell(pos),
            Intent::Undo => self.undo_move(),
            Intent::Redo => self.redo_move(),
            Intent::Hint => self.get_hint(),
            Intent::Check => self.check_solution(),
            Intent::Stats => self.show_stats(),
            Intent::Settings => self.show_settings(),
            Intent::NewGame => self.show_instructions(),
            Intent::CycleDifficulty => {
                self.difficulty = self.difficulty.next();
                self.show_instructions();
            }
            Intent::Share => self.share_result(now),
            Intent::Cancel => self.show_welcome(),
            Intent::Toggle | Intent::Confirm | Intent::Quit => {}
        }
    }

    // ── Operations ──

    fn enter_game(&mut self) {
        self.screen = Screen::Game;
        self.show_instructions();
    }

    pub fn show_instructions(&mut self) {
        self.modal = Some(Modal::Instructions);
    }

    /// Jump straight into a game, skipping the welcome and instructions.
    pub fn launch(&mut self, difficulty: Difficulty) {
        self.screen = Screen::Game;
        self.start_new_game(difficulty);
    }

    /// Opens a new session beside the current one. The old game keeps
    /// adopting its replies until the new one arrives, so a failure leaves
    /// it on screen and in step with the server.
    pub fn start_new_game(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
        self.modal = None;
        let session = self.queue.open_session(ApiCall::NewGame { difficulty });
        self.loading = true;
        tracing::info!(%difficulty, session, "new game requested");
    }

    pub fn show_welcome(&mut self) {
        self.queue.begin_session();
        self.view = None;
        self.timer.reset();
        self.errors.clear();
        self.hint_flash = None;
        self.modal = None;
        self.status = None;
        self.loading = false;
        self.screen = Screen::Welcome;
    }

    /// Givens cannot be selected.
    pub fn select_cell(&mut self, pos: Pos) {
        let Some(view) = self.view.as_mut() else { return };
        if view.is_given(pos) {
            return;
        }
        view.selected = Some(pos);
        let value = view.board.get(pos);
        if value != 0 {
            self.pad_digit = value;
        }
    }

    /// Arrow navigation. Steps over givens and stops at the edge; with no
    /// selection, picks the first editable cell.
    pub fn move_selection(&mut self, dir: Direction) {
        let Some(view) = self.view.as_ref() else { return };
        let Some(from) = view.selected else {
            if let Some(first) = Pos::all().find(|&p| !view.is_given(p)) {
                self.select_cell(first);
            }
            return;
        };

        let (dr, dc): (isize, isize) = match dir {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        };
        let mut row = from.row as isize;
        let mut col = from.col as isize;
        loop {
            row += dr;
            col += dc;
            if !(0..SIZE as isize).contains(&row) || !(0..SIZE as isize).contains(&col) {
                return;
            }
            let pos = Pos { row: row as usize, col: col as usize };
            if !view.is_given(pos) {
                self.select_cell(pos);
                return;
            }
        }
    }

    pub fn toggle_note_mode(&mut self) {
        if let Some(view) = self.view.as_mut() {
            view.note_mode = !view.note_mode;
        }
    }

    /// `value` 0 clears the cell.
    pub fn make_move(&mut self, value: u8) {
        let Some(view) = self.view.as_ref() else { return };
        let Some(pos) = view.selected else { return };
        if view.complete || view.is_given(pos) || value > 9 {
            return;
        }
        let move_type = if view.note_mode { MoveType::Note } else { MoveType::Number };
        self.queue.push_back(ApiCall::MakeMove {
            game_id: view.game_id.clone(),
            pos,
            value,
            move_type,
        });
    }

    /// Also allowed while a move is still pending, since its reply will
    /// add to the history.
    pub fn undo_move(&mut self) {
        let Some(view) = self.view.as_ref() else { return };
        let pending_moves = self.queue.count_matching(|c| matches!(c, ApiCall::MakeMove { .. }));
        if !view.can_undo() && pending_moves == 0 {
            return;
        }
        self.queue.push_back(ApiCall::Undo { game_id: view.game_id.clone() });
    }

    pub fn redo_move(&mut self) {
        let Some(view) = self.view.as_ref() else { return };
        if !view.can_redo() {
            return;
        }
        self.queue.push_back(ApiCall::Redo { game_id: view.game_id.clone() });
    }

    /// Precondition failures post a status line and send nothing.
    pub fn get_hint(&mut self) {
        let Some(view) = self.view.as_ref() else { return };
        let Some(pos) = view.selected.filter(|_| !view.complete) else {
            self.set_status("Please select a cell first.", StatusKind::Error);
            return;
        };
        let pending = self.queue.count_matching(|c| matches!(c, ApiCall::Hint { .. })) as u32;
        if view.hints_used + pending >= view.max_hints {
            let text = format!("You've used all {} hints for this game.", view.max_hints);
            self.set_status(&text, StatusKind::Error);
            return;
        }
        if view.is_given(pos) {
            self.set_status("Cannot get hint for original cells.", StatusKind::Error);
            return;
        }
        let game_id = view.game_id.clone();
        self.queue.push_back(ApiCall::Hint { game_id, pos });
    }

    pub fn check_solution(&mut self) {
        let Some(view) = self.view.as_ref() else { return };
        let game_id = view.game_id.clone();
        self.queue.push_back(ApiCall::CheckSolution { game_id });
    }

    pub fn show_stats(&mut self) {
        self.queue.send_global(ApiCall::UserStats);
    }

    pub fn show_settings(&mut self) {
        self.modal = Some(Modal::Settings(SettingsForm {
            draft: self.settings.clone(),
            cursor: 0,
        }));
    }

    /// Adopt new settings. Persisting them is the frame loop's job, driven
    /// by the `SettingsSaved` event.
    pub fn save_settings(&mut self, settings: Settings) {
        self.settings = settings.clone();
        self.modal = None;
        self.refresh_errors();
        self.events.push(GameEvent::SettingsSaved(settings));
        self.set_status("Settings saved!", StatusKind::Success);
    }

    pub fn share_result(&mut self, now: Instant) {
        let Some(text) = self.share_text(now) else { return };
        tracing::info!(share = %text, "result shared");
        self.set_status(&text, StatusKind::Info);
    }

    pub fn share_text(&self, now: Instant) -> Option<String> {
        let view = self.view.as_ref().filter(|v| v.complete)?;
        Some(format!(
            "I solved a {} Sudoku puzzle in {} with {} hints!",
            view.difficulty,
            self.clock(now),
            view.hints_used
        ))
    }

    pub fn show_error(&mut self, message: &str) {
        self.modal = Some(Modal::Error(message.to_string()));
        self.events.push(GameEvent::RequestFailed);
    }

    // ── Replies ──

    pub fn on_reply(&mut self, incoming: Incoming, now: Instant) {
        let (sent, opened) = match self.queue.accept(incoming.ticket) {
            Accepted::Stale => {
                tracing::debug!(ticket = ?incoming.ticket, "stale reply dropped");
                return;
            }
            Accepted::Global => (None, None),
            Accepted::Current(call) => (Some(call), None),
            Accepted::Opening(session) => (None, Some(session)),
        };

        match incoming.reply {
            ApiReply::NewGame(Ok(res)) => {
                if let Some(session) = opened {
                    self.queue.commit_session(session);
                }
                self.loading = false;
                self.view = Some(GameView::from_new_game(res, self.difficulty, self.max_hints));
                self.timer.start(now);
                self.errors.clear();
                self.hint_flash = None;
                self.events.push(GameEvent::GameStarted);
                self.set_status("New game started! Select a cell to play.", StatusKind::Success);
            }
            ApiReply::NewGame(Err(err)) => {
                self.loading = false;
                self.fail("Failed to start new game. Please try again.", &err);
            }
            ApiReply::MakeMove(Ok(res)) => {
                let Some(view) = self.view.as_mut() else { return };
                let complete = res.is_complete;
                view.adopt_move(res);
                if let Some(ApiCall::MakeMove { pos, value, move_type, .. }) = sent {
                    self.events.push(match (move_type, value) {
                        (MoveType::Note, _) => GameEvent::NoteToggled { pos },
                        (MoveType::Number, 0) => GameEvent::DigitCleared { pos },
                        (MoveType::Number, _) => GameEvent::DigitPlaced { pos },
                    });
                }
                self.refresh_errors();
                if complete {
                    self.handle_complete(now);
                }
            }
            ApiReply::MakeMove(Err(err)) => self.fail("Failed to make move. Please try again.", &err),
            ApiReply::Undo(Ok(res)) => {
                let Some(view) = self.view.as_mut() else { return };
                view.adopt_history(res);
                self.refresh_errors();
                self.events.push(GameEvent::MoveUndone);
            }
            ApiReply::Undo(Err(err)) => self.fail("Failed to undo move. Please try again.", &err),
            ApiReply::Redo(Ok(res)) => {
                let Some(view) = self.view.as_mut() else { return };
                view.adopt_history(res);
                self.refresh_errors();
                self.events.push(GameEvent::MoveRedone);
            }
            ApiReply::Redo(Err(err)) => self.fail("Failed to redo move. Please try again.", &err),
            ApiReply::Hint(Ok(res)) => {
                let Some(ApiCall::Hint { game_id, pos }) = sent else { return };
                self.adopt_hint(game_id, pos, res.hint, res.hints_used, now);
            }
            ApiReply::Hint(Err(err)) => self.fail("Failed to get hint. Please try again.", &err),
            ApiReply::CheckSolution(Ok(res)) => {
                let Some(view) = self.view.as_ref() else { return };
                if res.is_valid {
                    self.errors.clear();
                    self.events.push(GameEvent::SolutionValid);
                    self.set_status("Current solution is valid!", StatusKind::Success);
                } else {
                    self.errors = conflicting_cells(&view.board);
                    self.events.push(GameEvent::ConflictsFound { count: self.errors.len() });
                    self.set_status("Current solution has conflicts.", StatusKind::Error);
                }
            }
            ApiReply::CheckSolution(Err(err)) => {
                self.fail("Failed to check solution. Please try again.", &err)
            }
            ApiReply::SaveGameStats(Ok(())) => tracing::debug!("game stats saved"),
            ApiReply::SaveGameStats(Err(err)) => {
                tracing::warn!(error = %err, "saving game stats failed");
            }
            ApiReply::UserStats(Ok(stats)) => self.modal = Some(Modal::Stats(stats)),
            ApiReply::UserStats(Err(err)) => {
                self.fail("Failed to load statistics. Please try again.", &err)
            }
        }
    }

    /// The hinted digit is placed as a number move ahead of anything else
    /// queued, whatever the note mode.
    fn adopt_hint(
        &mut self,
        game_id: String,
        pos: Pos,
        hint: Option<u8>,
        hints_used: Option<u32>,
        now: Instant,
    ) {
        let Some(view) = self.view.as_mut() else { return };
        let Some(digit) = hint.filter(|d| (1..=9).contains(d)) else {
            self.set_status("No hint available for this cell.", StatusKind::Error);
            return;
        };
        view.hints_used = hints_used.unwrap_or(view.hints_used + 1);
        let remaining = view.hints_remaining();
        self.queue.push_front(ApiCall::MakeMove {
            game_id,
            pos,
            value: digit,
            move_type: MoveType::Number,
        });
        if self.settings.animations {
            self.hint_flash = Some((pos, now + HINT_FLASH));
        }
        self.events.push(GameEvent::HintApplied { pos });
        let text = format!("Hint applied! ({remaining} hints remaining)");
        self.set_status(&text, StatusKind::Success);
    }

    fn handle_complete(&mut self, now: Instant) {
        let Some(view) = self.view.as_mut() else { return };
        view.complete = true;
        self.timer.stop(now);
        let time_taken = self.timer.elapsed_secs(now);
        self.queue.clear_pending();
        self.queue.push_back(ApiCall::SaveGameStats {
            game_id: view.game_id.clone(),
            time_taken,
            completed: true,
        });
        self.modal = Some(Modal::Win(WinSummary {
            time: format_clock(time_taken),
            hints_used: view.hints_used,
            difficulty: view.difficulty,
        }));
        self.events.push(GameEvent::PuzzleSolved);
        tracing::info!(game_id = %view.game_id, time_taken, hints = view.hints_used, "puzzle solved");
    }

    /// With auto-check on, highlight clashes on every adopted board;
    /// otherwise a board change clears stale highlights.
    fn refresh_errors(&mut self) {
        self.errors = match (&self.view, self.settings.auto_check) {
            (Some(view), true) => conflicting_cells(&view.board),
            _ => Vec::new(),
        };
    }

    fn fail(&mut self, message: &str, err: &ApiError) {
        tracing::warn!(error = %err, "{message}");
        self.show_error(message);
    }

    fn set_status(&mut self, text: &str, kind: StatusKind) {
        self.status = Some(Status { text: text.to_string(), kind });
    }
}
