/// Terminal input.
///
/// Drains crossterm events once per frame and turns them into commands.
/// Everything here is edge-triggered: a key press (or auto-repeat) is one
/// command, releases are ignored. Mouse clicks are reported in terminal
/// coordinates; the renderer knows which cell sits there.

use std::time::Duration;

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton,
    MouseEventKind,
};

use crate::sim::controller::{Direction, Intent};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Game(Intent),
    Click { column: u16, row: u16 },
    InstallConfirm,
    InstallDismiss,
    /// Ctrl+C: leave immediately from anywhere.
    ForceQuit,
}

pub struct InputState {
    commands: Vec<Command>,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            commands: Vec::with_capacity(8),
        }
    }

    /// Drain all pending terminal events. Call once per frame.
    pub fn drain_events(&mut self) {
        self.commands.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) if key.kind != KeyEventKind::Release => {
                    if let Some(cmd) = map_key(key) {
                        self.commands.push(cmd);
                    }
                }
                Ok(Event::Mouse(mouse)) => {
                    if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
                        self.commands.push(Command::Click {
                            column: mouse.column,
                            row: mouse.row,
                        });
                    }
                }
                // The renderer polls the terminal size itself.
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "terminal event read failed");
                    break;
                }
            }
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }
}

/// Key binding table.
pub fn map_key(key: KeyEvent) -> Option<Command> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('C') => Some(Command::ForceQuit),
            _ => None,
        };
    }

    let intent = match key.code {
        KeyCode::Char(c @ '1'..='9') => Intent::Digit(c as u8 - b'0'),
        KeyCode::Char('0') | KeyCode::Backspace | KeyCode::Delete => Intent::Clear,
        KeyCode::Char('n') | KeyCode::Char('N') => Intent::ToggleNotes,
        KeyCode::Up => Intent::Move(Direction::Up),
        KeyCode::Down => Intent::Move(Direction::Down),
        KeyCode::Left => Intent::Move(Direction::Left),
        KeyCode::Right => Intent::Move(Direction::Right),
        KeyCode::Char('u') => Intent::Undo,
        KeyCode::Char('r') => Intent::Redo,
        KeyCode::Char('h') => Intent::Hint,
        KeyCode::Char('c') => Intent::Check,
        KeyCode::Char('s') => Intent::Stats,
        KeyCode::Char('o') => Intent::Settings,
        KeyCode::Char('d') => Intent::CycleDifficulty,
        KeyCode::F(2) => Intent::NewGame,
        KeyCode::Char('[') => Intent::PadPrev,
        KeyCode::Char(']') => Intent::PadNext,
        KeyCode::Char(' ') => Intent::Toggle,
        KeyCode::Enter => Intent::Confirm,
        KeyCode::Esc => Intent::Cancel,
        KeyCode::Char('p') => Intent::Share,
        KeyCode::Char('q') => Intent::Quit,
        KeyCode::Char('y') => return Some(Command::InstallConfirm),
        KeyCode::Char('x') => return Some(Command::InstallDismiss),
        _ => return None,
    };
    Some(Command::Game(intent))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn digits_and_clear_keys() {
        assert_eq!(map_key(key(KeyCode::Char('7'))), Some(Command::Game(Intent::Digit(7))));
        for code in [KeyCode::Char('0'), KeyCode::Backspace, KeyCode::Delete] {
            assert_eq!(map_key(key(code)), Some(Command::Game(Intent::Clear)));
        }
    }

    #[test]
    fn note_toggle_accepts_both_cases() {
        assert_eq!(map_key(key(KeyCode::Char('N'))), Some(Command::Game(Intent::ToggleNotes)));
        assert_eq!(map_key(key(KeyCode::Char('n'))), Some(Command::Game(Intent::ToggleNotes)));
    }

    #[test]
    fn ctrl_c_quits_but_plain_c_checks() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(ctrl_c), Some(Command::ForceQuit));
        assert_eq!(map_key(key(KeyCode::Char('c'))), Some(Command::Game(Intent::Check)));
    }

    #[test]
    fn install_keys_are_separate_from_game_intents() {
        assert_eq!(map_key(key(KeyCode::Char('y'))), Some(Command::InstallConfirm));
        assert_eq!(map_key(key(KeyCode::Char('x'))), Some(Command::InstallDismiss));
    }

    #[test]
    fn unbound_keys_are_ignored() {
        assert_eq!(map_key(key(KeyCode::Char('z'))), None);
        assert_eq!(map_key(key(KeyCode::Tab)), None);
    }
}
