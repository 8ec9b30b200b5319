/// Events emitted by the controller while handling intents and replies.
/// The presentation layer consumes these for sound; settings changes are
/// persisted by the frame loop.

use crate::domain::grid::Pos;
use crate::sim::settings::Settings;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    GameStarted,
    DigitPlaced { pos: Pos },
    DigitCleared { pos: Pos },
    NoteToggled { pos: Pos },
    MoveUndone,
    MoveRedone,
    HintApplied { pos: Pos },
    ConflictsFound { count: usize },
    SolutionValid,
    PuzzleSolved,
    RequestFailed,
    SettingsSaved(Settings),
}
