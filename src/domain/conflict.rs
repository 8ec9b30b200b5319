/// Local conflict detection.
///
/// This is a duplicate scan for error highlighting only. Move acceptance,
/// solving and win detection belong to the game service.

use super::grid::{Board, Pos, BOX, SIZE};

/// False iff `value` already appears elsewhere in the row, column, or
/// 3x3 box of `pos`. The cell itself is never compared against.
pub fn is_valid_move(board: &Board, pos: Pos, value: u8) -> bool {
    for col in 0..SIZE {
        if col != pos.col && board.get(Pos { row: pos.row, col }) == value {
            return false;
        }
    }

    for row in 0..SIZE {
        if row != pos.row && board.get(Pos { row, col: pos.col }) == value {
            return false;
        }
    }

    let (r0, c0) = pos.box_origin();
    for row in r0..r0 + BOX {
        for col in c0..c0 + BOX {
            if (row, col) != (pos.row, pos.col) && board.get(Pos { row, col }) == value {
                return false;
            }
        }
    }

    true
}

/// Every filled cell whose digit clashes with a peer.
pub fn conflicting_cells(board: &Board) -> Vec<Pos> {
    Pos::all()
        .filter(|&p| {
            let v = board.get(p);
            v != 0 && !is_valid_move(board, p, v)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::board_from;

    fn p(row: usize, col: usize) -> Pos {
        Pos { row, col }
    }

    /// Reference predicate written independently: collect all peers, then look.
    fn naive_valid(board: &Board, pos: Pos, value: u8) -> bool {
        let peers = Pos::all().filter(|&q| {
            q != pos
                && (q.row == pos.row
                    || q.col == pos.col
                    || q.box_origin() == pos.box_origin())
        });
        peers.map(|q| board.get(q)).all(|v| v != value)
    }

    /// Deterministic pseudo-random board, roughly half filled.
    fn lcg_board(seed: u32) -> Board {
        let mut rng = seed;
        let mut cells = [[0u8; SIZE]; SIZE];
        for row in cells.iter_mut() {
            for cell in row.iter_mut() {
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let r = (rng >> 16) % 18;
                *cell = if r < 9 { 0 } else { (r - 8) as u8 };
            }
        }
        Board::try_from(cells).unwrap()
    }

    const PUZZLE: [&str; 9] = [
        "530070000",
        "600195000",
        "098000060",
        "800060003",
        "400803001",
        "700020006",
        "060000280",
        "000419005",
        "000080079",
    ];

    // ── Row / column / box ──

    #[test]
    fn row_duplicate_is_invalid() {
        let b = board_from(&PUZZLE);
        // 7 already sits at r0c4
        assert!(!is_valid_move(&b, p(0, 2), 7));
    }

    #[test]
    fn column_duplicate_is_invalid() {
        let b = board_from(&PUZZLE);
        // 8 is at r3c0
        assert!(!is_valid_move(&b, p(1, 0), 8));
    }

    #[test]
    fn box_duplicate_is_invalid() {
        let b = board_from(&PUZZLE);
        // 9 is at r2c1: same box as r0c2, different row and column
        assert!(!is_valid_move(&b, p(0, 2), 9));
    }

    #[test]
    fn fresh_digit_is_valid() {
        let b = board_from(&PUZZLE);
        assert!(is_valid_move(&b, p(0, 2), 4));
    }

    #[test]
    fn cell_does_not_conflict_with_itself() {
        let b = board_from(&PUZZLE);
        assert!(is_valid_move(&b, p(0, 0), 5));
    }

    #[test]
    fn agrees_with_reference_on_random_boards() {
        for seed in 1..40u32 {
            let b = lcg_board(seed);
            for pos in Pos::all() {
                for v in 1..=9u8 {
                    assert_eq!(
                        is_valid_move(&b, pos, v),
                        naive_valid(&b, pos, v),
                        "seed {seed} at {pos} value {v}"
                    );
                }
            }
        }
    }

    // ── conflicting_cells ──

    #[test]
    fn clean_puzzle_has_no_conflicts() {
        assert!(conflicting_cells(&board_from(&PUZZLE)).is_empty());
    }

    #[test]
    fn both_ends_of_a_clash_are_reported() {
        let b = board_from(&["5....5...", ".........", "........."]);
        assert_eq!(conflicting_cells(&b), vec![p(0, 0), p(0, 5)]);
    }

    #[test]
    fn empty_cells_never_conflict() {
        assert!(conflicting_cells(&Board::empty()).is_empty());
    }
}
