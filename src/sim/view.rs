/// Client-side snapshot of one game.
///
/// Created from a new-game reply and replaced piecewise by later replies.
/// The board is never edited locally: every change is adopted from the
/// service. History arrays are opaque; only their emptiness matters here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::grid::{Board, Difficulty, NoteGrid, Pos, CELL_COUNT};
use crate::net::api::{HistoryResponse, MakeMoveResponse, NewGameResponse};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameView {
    pub game_id: String,
    pub difficulty: Difficulty,
    pub board: Board,
    pub solution: Board,
    /// Givens: non-zero here means the cell is fixed for the session.
    pub original: Board,
    pub notes: NoteGrid,
    pub selected: Option<Pos>,
    pub hints_used: u32,
    pub max_hints: u32,
    pub moves_history: Vec<Value>,
    pub redo_stack: Vec<Value>,
    pub note_mode: bool,
    pub complete: bool,
}

impl GameView {
    pub fn from_new_game(res: NewGameResponse, difficulty: Difficulty, max_hints: u32) -> Self {
        GameView {
            game_id: res.game_id,
            difficulty,
            board: res.puzzle,
            solution: res.solution,
            original: res.puzzle,
            notes: NoteGrid::default(),
            selected: None,
            hints_used: 0,
            max_hints,
            moves_history: Vec::new(),
            redo_stack: Vec::new(),
            note_mode: false,
            complete: false,
        }
    }

    pub fn is_given(&self, pos: Pos) -> bool {
        self.original.get(pos) != 0
    }

    pub fn can_undo(&self) -> bool {
        !self.moves_history.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn hints_remaining(&self) -> u32 {
        self.max_hints.saturating_sub(self.hints_used)
    }

    /// (filled, total)
    pub fn progress(&self) -> (usize, usize) {
        (self.board.filled_count(), CELL_COUNT)
    }

    /// A new move invalidates anything that could have been redone.
    pub fn adopt_move(&mut self, res: MakeMoveResponse) {
        self.board = res.current_board;
        self.notes = res.notes;
        if let Some(history) = res.moves_history {
            self.moves_history = history;
        }
        self.redo_stack.clear();
    }

    /// Undo and redo replies; absent arrays keep the cached value.
    pub fn adopt_history(&mut self, res: HistoryResponse) {
        self.board = res.current_board;
        self.notes = res.notes;
        if let Some(history) = res.moves_history {
            self.moves_history = history;
        }
        if let Some(redo) = res.redo_stack {
            self.redo_stack = redo;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::board_from;
    use serde_json::json;

    fn view() -> GameView {
        let puzzle = board_from(&["5.3......"]);
        GameView::from_new_game(
            NewGameResponse { game_id: "g1".into(), puzzle, solution: puzzle },
            Difficulty::Easy,
            5,
        )
    }

    fn history_reply(history: Option<Vec<Value>>, redo: Option<Vec<Value>>) -> HistoryResponse {
        HistoryResponse {
            current_board: board_from(&["5.3......"]),
            notes: NoteGrid::default(),
            moves_history: history,
            redo_stack: redo,
        }
    }

    #[test]
    fn givens_come_from_the_puzzle() {
        let v = view();
        assert!(v.is_given(Pos { row: 0, col: 0 }));
        assert!(!v.is_given(Pos { row: 0, col: 1 }));
        assert_eq!(v.progress(), (2, 81));
        assert!(!v.can_undo() && !v.can_redo());
    }

    #[test]
    fn move_keeps_history_when_absent_and_clears_redo() {
        let mut v = view();
        v.moves_history = vec![json!({"row": 0})];
        v.redo_stack = vec![json!({"row": 1})];
        v.adopt_move(MakeMoveResponse {
            current_board: board_from(&["543......"]),
            notes: NoteGrid::default(),
            moves_history: None,
            is_complete: false,
        });
        assert_eq!(v.moves_history.len(), 1);
        assert!(!v.can_redo());
        assert_eq!(v.board.get(Pos { row: 0, col: 1 }), 4);
    }

    #[test]
    fn history_reply_replaces_only_present_arrays() {
        let mut v = view();
        v.moves_history = vec![json!(1), json!(2)];
        v.redo_stack = vec![json!(3)];

        v.adopt_history(history_reply(Some(vec![json!(1)]), None));
        assert_eq!(v.moves_history.len(), 1);
        assert_eq!(v.redo_stack.len(), 1);

        v.adopt_history(history_reply(Some(vec![]), Some(vec![json!(2), json!(3)])));
        assert!(!v.can_undo());
        assert!(v.can_redo());
    }

    #[test]
    fn hints_remaining_never_underflows() {
        let mut v = view();
        v.hints_used = 7;
        assert_eq!(v.hints_remaining(), 0);
    }
}
