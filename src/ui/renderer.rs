/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The board layout chosen for the last frame is kept so mouse clicks can
/// be mapped back to cells with `cell_at`.

use std::io::{self, BufWriter, Write};
use std::time::Instant;

use crossterm::{
    cursor::{self, MoveTo},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::grid::{Difficulty, Pos, BOX, SIZE};
use crate::domain::timer::format_duration_words;
use crate::net::api::UserStats;
use crate::sim::controller::{GameController, Modal, Screen, StatusKind};
use crate::sim::install::Notice;
use crate::sim::settings::{Settings, Theme};
use crate::sim::view::GameView;

// ── Palettes ──

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Palette {
    bg: Color,
    text: Color,
    dim: Color,
    given: Color,
    filled: Color,
    note: Color,
    grid: Color,
    selected: Color,
    peer: Color,
    same: Color,
    flash: Color,
    error: Color,
    success: Color,
    info: Color,
    accent: Color,
    bar_fg: Color,
    bar_bg: Color,
    panel: Color,
}

const LIGHT: Palette = Palette {
    bg: Color::Rgb { r: 250, g: 248, b: 240 },
    text: Color::Rgb { r: 40, g: 40, b: 50 },
    dim: Color::Rgb { r: 140, g: 140, b: 150 },
    given: Color::Rgb { r: 20, g: 30, b: 80 },
    filled: Color::Rgb { r: 30, g: 100, b: 200 },
    note: Color::Rgb { r: 120, g: 120, b: 140 },
    grid: Color::Rgb { r: 90, g: 90, b: 110 },
    selected: Color::Rgb { r: 190, g: 215, b: 255 },
    peer: Color::Rgb { r: 232, g: 236, b: 245 },
    same: Color::Rgb { r: 215, g: 230, b: 250 },
    flash: Color::Rgb { r: 255, g: 230, b: 120 },
    error: Color::Rgb { r: 210, g: 40, b: 40 },
    success: Color::Rgb { r: 30, g: 140, b: 60 },
    info: Color::Rgb { r: 40, g: 90, b: 170 },
    accent: Color::Rgb { r: 200, g: 120, b: 20 },
    bar_fg: Color::Rgb { r: 255, g: 255, b: 255 },
    bar_bg: Color::Rgb { r: 60, g: 70, b: 120 },
    panel: Color::Rgb { r: 235, g: 235, b: 245 },
};

const DARK: Palette = Palette {
    bg: Color::Rgb { r: 22, g: 22, b: 35 },
    text: Color::Rgb { r: 220, g: 220, b: 230 },
    dim: Color::Rgb { r: 100, g: 100, b: 120 },
    given: Color::Rgb { r: 235, g: 235, b: 245 },
    filled: Color::Rgb { r: 110, g: 180, b: 255 },
    note: Color::Rgb { r: 140, g: 140, b: 170 },
    grid: Color::Rgb { r: 90, g: 90, b: 130 },
    selected: Color::Rgb { r: 50, g: 70, b: 130 },
    peer: Color::Rgb { r: 35, g: 35, b: 55 },
    same: Color::Rgb { r: 45, g: 55, b: 95 },
    flash: Color::Rgb { r: 130, g: 110, b: 30 },
    error: Color::Rgb { r: 255, g: 90, b: 90 },
    success: Color::Rgb { r: 80, g: 220, b: 110 },
    info: Color::Rgb { r: 110, g: 170, b: 255 },
    accent: Color::Rgb { r: 255, g: 200, b: 50 },
    bar_fg: Color::Rgb { r: 255, g: 255, b: 255 },
    bar_bg: Color::Rgb { r: 20, g: 20, b: 60 },
    panel: Color::Rgb { r: 40, g: 40, b: 60 },
};

fn palette(theme: Theme) -> &'static Palette {
    match theme {
        Theme::Light => &LIGHT,
        Theme::Dark => &DARK,
    }
}

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Sentinel used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn blank(bg: Color) -> Self {
        Cell { ch: ' ', fg: bg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::INVALID; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::INVALID; w * h];
        }
    }

    fn clear(&mut self, bg: Color) {
        self.cells.fill(Cell::blank(bg));
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::INVALID
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, Cell { ch, fg, bg });
        }
    }

    fn put_centered(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        let x = self.width.saturating_sub(s.chars().count()) / 2;
        self.put_str(x, y, s, fg, bg);
    }

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, bg: Color) {
        for dy in 0..h {
            for dx in 0..w {
                self.set(x + dx, y + dy, Cell::blank(bg));
            }
        }
    }
}

// ── Board layout ──

const HUD_ROW: usize = 0;
const BOARD_ROW: usize = 2;
const BOARD_COL: usize = 2;
/// Gap, status line, notices and help bar below the board.
const FOOTER_ROWS: usize = 4;
const PANEL_W: usize = 36;

/// Where the 9x9 board sits on screen. Box borders are one character
/// thick; cells inside a box are not separated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoardLayout {
    x: usize,
    y: usize,
    cell_w: usize,
    cell_h: usize,
}

impl BoardLayout {
    /// 7x3 cells with room for a 3x3 pencil-mark grid
    const LARGE: BoardLayout = BoardLayout { x: BOARD_COL, y: BOARD_ROW, cell_w: 7, cell_h: 3 };
    /// 3x1 cells; notes collapse to a dot
    const COMPACT: BoardLayout = BoardLayout { x: BOARD_COL, y: BOARD_ROW, cell_w: 3, cell_h: 1 };

    fn fit(term_w: usize, term_h: usize) -> Self {
        let large = Self::LARGE;
        if large.y + large.height() + FOOTER_ROWS <= term_h && large.x + large.width() <= term_w {
            large
        } else {
            Self::COMPACT
        }
    }

    fn width(&self) -> usize {
        SIZE * self.cell_w + BOX + 1
    }

    fn height(&self) -> usize {
        SIZE * self.cell_h + BOX + 1
    }

    fn has_note_grid(&self) -> bool {
        self.cell_w >= 7 && self.cell_h >= 3
    }

    /// Top-left terminal position of a cell's interior.
    fn cell_origin(&self, pos: Pos) -> (usize, usize) {
        (
            self.x + 1 + pos.col * self.cell_w + pos.col / BOX,
            self.y + 1 + pos.row * self.cell_h + pos.row / BOX,
        )
    }

    /// Cell under a terminal position; `None` on borders and outside.
    pub fn cell_at(&self, column: usize, row: usize) -> Option<Pos> {
        let col = axis_index(column.checked_sub(self.x)?, self.cell_w)?;
        let row = axis_index(row.checked_sub(self.y)?, self.cell_h)?;
        Pos::new(row, col)
    }
}

/// Cell index along one axis for an offset from the board edge.
fn axis_index(offset: usize, cell: usize) -> Option<usize> {
    let span = BOX * cell + 1;
    let (block, within) = (offset / span, offset % span);
    if within == 0 || block >= BOX {
        return None;
    }
    Some(block * BOX + (within - 1) / cell)
}

fn border_char(on_row: bool, on_col: bool, top: bool, bottom: bool, left: bool, right: bool) -> char {
    match (on_row, on_col) {
        (true, true) => match (top, bottom, left, right) {
            (true, _, true, _) => '┌',
            (true, _, _, true) => '┐',
            (_, true, true, _) => '└',
            (_, true, _, true) => '┘',
            (true, ..) => '┬',
            (_, true, ..) => '┴',
            (_, _, true, _) => '├',
            (_, _, _, true) => '┤',
            _ => '┼',
        },
        (true, false) => '─',
        _ => '│',
    }
}

fn digit_char(d: u8) -> char {
    char::from(b'0' + d)
}

/// Same row, column or box.
fn is_peer(a: Pos, b: Pos) -> bool {
    a.row == b.row || a.col == b.col || a.box_origin() == b.box_origin()
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    layout: BoardLayout,
    last_frame: Option<(Screen, Theme)>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            layout: BoardLayout::COMPACT,
            last_frame: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Board cell under a terminal position, using the last frame's layout.
    pub fn cell_at(&self, column: u16, row: u16) -> Option<Pos> {
        self.layout.cell_at(column as usize, row as usize)
    }

    pub fn render(&mut self, game: &GameController, notices: &[Notice], now: Instant) -> io::Result<()> {
        let pal = palette(game.settings().theme);

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(pal.bg), Clear(ClearType::All))?;
        }

        // Screen or theme change → clear for a clean transition
        let frame = (game.screen(), game.settings().theme);
        if self.last_frame != Some(frame) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(pal.bg), Clear(ClearType::All))?;
            self.last_frame = Some(frame);
        }

        self.layout = BoardLayout::fit(self.term_w, self.term_h);
        self.front.clear(pal.bg);

        match game.screen() {
            Screen::Welcome => self.compose_welcome(pal),
            Screen::Game => self.compose_game(game, pal, now),
        }
        if let Some(modal) = game.modal() {
            let (title, lines) = modal_lines(modal, game.difficulty());
            self.compose_box(&title, &lines, pal);
        }
        if game.is_loading() {
            self.compose_box("Sudoku Pro", &[Line::plain("Generating puzzle...")], pal);
        }
        self.compose_notices(notices, pal);

        self.flush_diff(pal)?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Screens ──

    fn compose_welcome(&mut self, pal: &Palette) {
        const TITLE: [&str; 5] = [
            "╔═╗╦ ╦╔╦╗╔═╗╦╔═╦ ╦  ╔═╗╦═╗╔═╗",
            "╚═╗║ ║ ║║║ ║╠╩╗║ ║  ╠═╝╠╦╝║ ║",
            "╚═╝╚═╝═╩╝╚═╝╩ ╩╚═╝  ╩  ╩╚═╚═╝",
            "",
            "Classic 9x9 Sudoku",
        ];
        const FEATURES: [&str; 5] = [
            "Four difficulty levels, from easy to expert",
            "Pencil-mark notes for candidates",
            "Unlimited undo and redo",
            "Hints when you get stuck",
            "Personal statistics and best times",
        ];

        let top = self.term_h.saturating_sub(TITLE.len() + FEATURES.len() + 6) / 2;
        for (i, line) in TITLE.iter().enumerate() {
            let fg = if i < 3 { pal.accent } else { pal.text };
            self.front.put_centered(top + i, line, fg, pal.bg);
        }
        let list_y = top + TITLE.len() + 1;
        for (i, feature) in FEATURES.iter().enumerate() {
            self.front.put_centered(list_y + i, &format!("· {feature}"), pal.dim, pal.bg);
        }
        self.front.put_centered(
            list_y + FEATURES.len() + 2,
            "ENTER Continue     Q Quit",
            pal.info,
            pal.bg,
        );
    }

    fn compose_game(&mut self, game: &GameController, pal: &Palette, now: Instant) {
        self.compose_hud(game, pal, now);

        let Some(view) = game.view() else { return };
        self.compose_board(game, view, pal);

        let panel_x = self.layout.x + self.layout.width() + 3;
        if panel_x + PANEL_W <= self.term_w {
            self.compose_panel(game, view, pal, panel_x);
        }

        let status_y = self.layout.y + self.layout.height() + 1;
        if let Some(status) = game.status() {
            let fg = match status.kind {
                StatusKind::Info => pal.info,
                StatusKind::Success => pal.success,
                StatusKind::Error => pal.error,
            };
            self.front.put_str(self.layout.x, status_y, &status.text, fg, pal.bg);
        }

        let help = "1-9 place  0 clear  n notes  u/r undo/redo  h hint  c check  s stats  o settings  F2 new  Esc menu";
        let help_y = self.term_h.saturating_sub(1);
        self.front.fill_rect(0, help_y, self.term_w, 1, pal.bar_bg);
        self.front.put_str(1, help_y, help, pal.bar_fg, pal.bar_bg);
    }

    fn compose_hud(&mut self, game: &GameController, pal: &Palette, now: Instant) {
        self.front.fill_rect(0, HUD_ROW, self.term_w, 1, pal.bar_bg);
        self.front.put_str(1, HUD_ROW, "SUDOKU PRO", pal.accent, pal.bar_bg);

        let Some(view) = game.view() else { return };
        let (filled, total) = view.progress();
        let mut info = format!(
            "{}   {}   Hints {}/{}   {}/{}",
            view.difficulty.label(),
            game.clock(now),
            view.hints_remaining(),
            view.max_hints,
            filled,
            total,
        );
        if view.note_mode {
            info.push_str("   NOTES");
        }
        let x = self.term_w.saturating_sub(info.chars().count() + 1);
        self.front.put_str(x.max(12), HUD_ROW, &info, pal.bar_fg, pal.bar_bg);
    }

    fn compose_board(&mut self, game: &GameController, view: &GameView, pal: &Palette) {
        let l = self.layout;
        let (w, h) = (l.width(), l.height());
        let (span_x, span_y) = (BOX * l.cell_w + 1, BOX * l.cell_h + 1);

        for dy in 0..h {
            for dx in 0..w {
                let on_row = dy % span_y == 0;
                let on_col = dx % span_x == 0;
                if !on_row && !on_col {
                    continue;
                }
                let ch = border_char(on_row, on_col, dy == 0, dy == h - 1, dx == 0, dx == w - 1);
                self.front.set(l.x + dx, l.y + dy, Cell { ch, fg: pal.grid, bg: pal.bg });
            }
        }

        let selected = view.selected;
        let selected_digit = selected.map(|p| view.board.get(p)).filter(|&d| d != 0);
        let flash = game.flashing();
        let errors = game.errors();

        for pos in Pos::all() {
            let value = view.board.get(pos);
            let bg = if selected == Some(pos) {
                pal.selected
            } else if flash == Some(pos) {
                pal.flash
            } else if value != 0 && selected_digit == Some(value) {
                pal.same
            } else if selected.is_some_and(|s| is_peer(s, pos)) {
                pal.peer
            } else {
                pal.bg
            };

            let (x, y) = l.cell_origin(pos);
            self.front.fill_rect(x, y, l.cell_w, l.cell_h, bg);

            if value != 0 {
                let fg = if errors.contains(&pos) {
                    pal.error
                } else if view.is_given(pos) {
                    pal.given
                } else {
                    pal.filled
                };
                self.front.set(x + l.cell_w / 2, y + l.cell_h / 2, Cell { ch: digit_char(value), fg, bg });
                continue;
            }

            let notes = view.notes.get(pos);
            if notes.is_empty() {
                continue;
            }
            if l.has_note_grid() {
                for d in notes.iter() {
                    let i = (d - 1) as usize;
                    let cell = Cell { ch: digit_char(d), fg: pal.note, bg };
                    self.front.set(x + 1 + 2 * (i % BOX), y + i / BOX, cell);
                }
            } else {
                self.front.set(x + l.cell_w / 2, y, Cell { ch: '·', fg: pal.note, bg });
            }
        }
    }

    fn compose_panel(&mut self, game: &GameController, view: &GameView, pal: &Palette, x: usize) {
        let mut y = self.layout.y;
        let label_w = 13;
        let mut row = |fb: &mut FrameBuffer, label: &str, value: &str, fg: Color| {
            fb.put_str(x, y, label, pal.dim, pal.bg);
            fb.put_str(x + label_w, y, value, fg, pal.bg);
            y += 1;
        };

        let mode = if view.note_mode { "Notes" } else { "Numbers" };
        let mode_fg = if view.note_mode { pal.accent } else { pal.text };
        row(&mut self.front, "Difficulty", view.difficulty.label(), pal.text);
        row(&mut self.front, "Mode", mode, mode_fg);
        row(
            &mut self.front,
            "Hints left",
            &format!("{} of {}", view.hints_remaining(), view.max_hints),
            pal.text,
        );
        let (filled, total) = view.progress();
        row(&mut self.front, "Progress", &format!("{filled}/{total}"), pal.text);
        row(&mut self.front, "", &progress_bar(filled, total, 20), pal.success);
        y += 1;

        // Number pad; digits already placed nine times are dimmed
        let mut counts = [0usize; SIZE + 1];
        for pos in Pos::all() {
            counts[view.board.get(pos) as usize] += 1;
        }
        self.front.put_str(x, y, "Pad", pal.dim, pal.bg);
        for d in 1..=SIZE as u8 {
            let px = x + label_w + 2 * (d as usize - 1);
            let (fg, bg) = if d == game.pad_digit() {
                (pal.text, pal.selected)
            } else if counts[d as usize] >= SIZE {
                (pal.dim, pal.bg)
            } else {
                (pal.text, pal.bg)
            };
            self.front.set(px, y, Cell { ch: digit_char(d), fg, bg });
        }
        y += 1;

        let undo_fg = if view.can_undo() { pal.text } else { pal.dim };
        let redo_fg = if view.can_redo() { pal.text } else { pal.dim };
        self.front.put_str(x, y, "Undo [u]", undo_fg, pal.bg);
        self.front.put_str(x + label_w, y, "Redo [r]", redo_fg, pal.bg);
        y += 1;

        if let Some(pos) = view.selected {
            let notes: Vec<String> = view.notes.get(pos).iter().map(|d| d.to_string()).collect();
            if !notes.is_empty() {
                let label = format!("Notes r{}c{}", pos.row + 1, pos.col + 1);
                self.front.put_str(x, y, &label, pal.dim, pal.bg);
                self.front.put_str(x + label_w, y, &notes.join(" "), pal.note, pal.bg);
            }
        }
    }

    fn compose_notices(&mut self, notices: &[Notice], pal: &Palette) {
        let bottom = self.term_h.saturating_sub(2);
        for (i, notice) in notices.iter().enumerate() {
            let Some(y) = bottom.checked_sub(i) else { break };
            let (text, fg) = notice_text(*notice, pal);
            let width = text.chars().count() + 2;
            let x = self.term_w.saturating_sub(width + 1);
            self.front.fill_rect(x, y, width, 1, pal.panel);
            self.front.put_str(x + 1, y, text, fg, pal.panel);
        }
    }

    /// Centered framed box with a title and body lines.
    fn compose_box(&mut self, title: &str, lines: &[Line], pal: &Palette) {
        let inner = lines
            .iter()
            .map(|l| l.text.chars().count())
            .chain(std::iter::once(title.chars().count()))
            .max()
            .unwrap_or(0)
            + 4;
        let height = lines.len() + 4;
        let x0 = self.term_w.saturating_sub(inner + 2) / 2;
        let y0 = self.term_h.saturating_sub(height) / 2;

        self.front.fill_rect(x0, y0, inner + 2, height, pal.panel);
        let horiz = "═".repeat(inner);
        self.front.put_str(x0, y0, &format!("╔{horiz}╗"), pal.accent, pal.panel);
        self.front.put_str(x0, y0 + height - 1, &format!("╚{horiz}╝"), pal.accent, pal.panel);
        for dy in 1..height - 1 {
            self.front.set(x0, y0 + dy, Cell { ch: '║', fg: pal.accent, bg: pal.panel });
            self.front.set(x0 + inner + 1, y0 + dy, Cell { ch: '║', fg: pal.accent, bg: pal.panel });
        }

        let title_x = x0 + 1 + (inner - title.chars().count()) / 2;
        self.front.put_str(title_x, y0 + 1, title, pal.accent, pal.panel);
        for (i, line) in lines.iter().enumerate() {
            let fg = match line.tone {
                Tone::Plain => pal.text,
                Tone::Dim => pal.dim,
                Tone::Strong => pal.info,
                Tone::Cursor => pal.accent,
            };
            self.front.put_str(x0 + 3, y0 + 3 + i, &line.text, fg, pal.panel);
        }
    }

    // ── Diff flush ──

    fn flush_diff(&mut self, pal: &Palette) -> io::Result<()> {
        let mut last_fg = pal.text;
        let mut last_bg = pal.bg;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors; ResetColor would fall back to the terminal
        // default, which may differ from the theme background.
        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;

                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }
}

// ── Text content ──

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tone {
    Plain,
    Dim,
    Strong,
    Cursor,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Line {
    text: String,
    tone: Tone,
}

impl Line {
    fn new(text: impl Into<String>, tone: Tone) -> Self {
        Line { text: text.into(), tone }
    }

    fn plain(text: impl Into<String>) -> Self {
        Line::new(text, Tone::Plain)
    }
}

fn progress_bar(filled: usize, total: usize, width: usize) -> String {
    let done = if total == 0 { 0 } else { filled * width / total };
    format!("{}{}", "█".repeat(done), "░".repeat(width - done.min(width)))
}

/// Title and body for a modal dialog.
fn modal_lines(modal: &Modal, difficulty: Difficulty) -> (String, Vec<Line>) {
    match modal {
        Modal::Instructions => (
            "How to Play".into(),
            vec![
                Line::plain("Fill every row, column and 3x3 box"),
                Line::plain("with the digits 1 to 9, each exactly once."),
                Line::plain(""),
                Line::new("Arrows or mouse  select a cell", Tone::Dim),
                Line::new("1-9  place a digit     0  clear", Tone::Dim),
                Line::new("n  notes mode          h  hint", Tone::Dim),
                Line::new("u / r  undo / redo     c  check", Tone::Dim),
                Line::plain(""),
                Line::new(format!("Difficulty  < {} >   (d or ←/→)", difficulty.label()), Tone::Cursor),
                Line::plain(""),
                Line::new("ENTER Start Game     Esc Close", Tone::Strong),
            ],
        ),
        Modal::Win(win) => (
            "Congratulations!".into(),
            vec![
                Line::plain("You solved the puzzle!"),
                Line::plain(""),
                Line::plain(format!("Time        {}", win.time)),
                Line::plain(format!("Hints used  {}", win.hints_used)),
                Line::plain(format!("Difficulty  {}", win.difficulty.label())),
                Line::plain(""),
                Line::new("ENTER Play Again   P Share   Esc Close", Tone::Strong),
            ],
        ),
        Modal::Stats(stats) => ("Statistics".into(), stats_lines(stats)),
        Modal::Settings(form) => ("Settings".into(), settings_lines(&form.draft, form.cursor)),
        Modal::Error(message) => (
            "Error".into(),
            vec![
                Line::plain(message.clone()),
                Line::plain(""),
                Line::new("ENTER OK", Tone::Strong),
            ],
        ),
    }
}

fn stats_lines(stats: &UserStats) -> Vec<Line> {
    let mut lines = vec![
        Line::plain(format!("Total games      {}", stats.total_games)),
        Line::plain(format!("Completed        {}", stats.completed_games)),
        Line::plain(format!("Total time       {}", format_duration_words(stats.total_play_time))),
        Line::plain(format!("Hints used       {}", stats.hints_used)),
        Line::plain(""),
        Line::new("Best times", Tone::Strong),
    ];
    let best = stats.best_times_ordered();
    if best.is_empty() {
        lines.push(Line::new("No completed games yet", Tone::Dim));
    }
    for (name, secs) in best {
        let label = match name.parse::<Difficulty>() {
            Ok(d) => d.label().to_string(),
            Err(_) => capitalize(&name),
        };
        lines.push(Line::plain(format!("  {label:<14} {}", format_duration_words(secs))));
    }
    lines.push(Line::plain(""));
    lines.push(Line::new("Esc Close", Tone::Strong));
    lines
}

fn settings_lines(draft: &Settings, cursor: usize) -> Vec<Line> {
    let on_off = |b: bool| if b { "On" } else { "Off" };
    let rows = [
        ("Theme", draft.theme.label()),
        ("Animations", on_off(draft.animations)),
        ("Auto-check", on_off(draft.auto_check)),
        ("Sound", on_off(draft.sound)),
    ];
    let mut lines: Vec<Line> = rows
        .iter()
        .enumerate()
        .map(|(i, (name, value))| {
            if i == cursor {
                Line::new(format!("▸ {name:<12} {value}"), Tone::Cursor)
            } else {
                Line::plain(format!("  {name:<12} {value}"))
            }
        })
        .collect();
    lines.push(Line::plain(""));
    lines.push(Line::new("↑↓ select  Space toggle", Tone::Dim));
    lines.push(Line::new("ENTER Save     Esc Cancel", Tone::Strong));
    lines
}

fn notice_text(notice: Notice, pal: &Palette) -> (&'static str, Color) {
    match notice {
        Notice::UpdateAvailable => ("Update available   y Update   x Later", pal.info),
        Notice::InstallPrompt => ("Install Sudoku Pro?   y Install   x Not now", pal.info),
        Notice::Installed => ("App installed successfully!", pal.success),
        Notice::Offline => ("You are offline. Some features may not work.", pal.error),
        Notice::BackOnline => ("Back online!", pal.success),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
