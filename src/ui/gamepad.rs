/// Gamepad input using gilrs.
///
/// Button mapping is loaded from config.toml via `load_button_config()`.
/// Default mapping:
///   D-pad / Left Stick    →  Move selection
///   A                     →  Place pad digit
///   B                     →  Clear cell
///   X                     →  Note mode
///   Y                     →  Hint
///   L1 / R1               →  Previous / next pad digit
///   L2 / R2               →  Undo / redo
///   Start                 →  Confirm
///   Select                →  Cancel / back
///
/// Everything is edge-triggered: one press, one intent.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;
use crate::sim::controller::{Direction, Intent};

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.5;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,      // LeftTrigger
    R1,      // RightTrigger
    L2,      // LeftTrigger2
    R2,      // RightTrigger2
    Start,
    Select,
}

const BTN_COUNT: usize = 10;

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER"  => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "L2" | "LT" | "LEFTTRIGGER2"  => Some(Btn::L2),
            "R2" | "RT" | "RIGHTTRIGGER2" => Some(Btn::R2),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South     => Some(Btn::A),
            Button::East      => Some(Btn::B),
            Button::West      => Some(Btn::X),
            Button::North     => Some(Btn::Y),
            Button::LeftTrigger  => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::LeftTrigger2  => Some(Btn::L2),
            Button::RightTrigger2 => Some(Btn::R2),
            Button::Start     => Some(Btn::Start),
            Button::Select    => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Intent-to-button mapping (loaded from config).
struct ActionMap {
    bindings: Vec<(Intent, Vec<Btn>)>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            bindings: vec![
                (Intent::PlacePad, vec![Btn::A]),
                (Intent::Clear, vec![Btn::B]),
                (Intent::ToggleNotes, vec![Btn::X]),
                (Intent::Hint, vec![Btn::Y]),
                (Intent::PadPrev, vec![Btn::L1]),
                (Intent::PadNext, vec![Btn::R1]),
                (Intent::Undo, vec![Btn::L2]),
                (Intent::Redo, vec![Btn::R2]),
                (Intent::Confirm, vec![Btn::Start]),
                (Intent::Cancel, vec![Btn::Select]),
            ],
        }
    }
}

impl ActionMap {
    /// Override a binding; an empty or unparseable list keeps the default.
    fn rebind(&mut self, intent: Intent, names: &[String]) {
        let btns: Vec<Btn> = names.iter().filter_map(|s| Btn::from_name(s)).collect();
        if btns.is_empty() {
            return;
        }
        if let Some((_, slot)) = self.bindings.iter_mut().find(|(i, _)| *i == intent) {
            *slot = btns;
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    /// Buttons pressed since the last `update`, indexed by Btn.
    fresh: [bool; BTN_COUNT],
    /// D-pad and stick presses since the last `update`.
    moves: Vec<Direction>,

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    stick: Option<Direction>,

    action_map: ActionMap,

    pub connected: bool,
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = {
            match Gilrs::new() {
                Ok(g) => {
                    let has_pad = g.gamepads().next().is_some();
                    (Some(g), has_pad)
                }
                Err(err) => {
                    tracing::debug!(error = %err, "gamepad support unavailable");
                    (None, false)
                }
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            fresh: [false; BTN_COUNT],
            moves: Vec::new(),
            stick: None,
            action_map: ActionMap::default(),
            connected,
        }
    }

    /// Load button mapping from config.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        let map = &mut self.action_map;
        map.rebind(Intent::PlacePad, &cfg.place);
        map.rebind(Intent::Clear, &cfg.clear);
        map.rebind(Intent::ToggleNotes, &cfg.note_mode);
        map.rebind(Intent::Hint, &cfg.hint);
        map.rebind(Intent::PadPrev, &cfg.prev_digit);
        map.rebind(Intent::PadNext, &cfg.next_digit);
        map.rebind(Intent::Undo, &cfg.undo);
        map.rebind(Intent::Redo, &cfg.redo);
        map.rebind(Intent::Confirm, &cfg.confirm);
        map.rebind(Intent::Cancel, &cfg.cancel);
    }

    pub fn update(&mut self) {
        self.fresh = [false; BTN_COUNT];
        self.moves.clear();

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    /// Intents for everything pressed since the last `update`.
    pub fn intents(&self) -> Vec<Intent> {
        let mut out: Vec<Intent> = self.moves.iter().map(|&d| Intent::Move(d)).collect();
        for (intent, btns) in &self.action_map.bindings {
            if btns.iter().any(|&b| self.fresh[b as usize]) {
                out.push(*intent);
            }
        }
        out
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let Some(gilrs) = self.gilrs.as_mut() else { return };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    self.press(btn);
                }
                EventType::AxisChanged(axis, value, _) => {
                    self.connected = true;
                    self.update_axis(axis, value);
                }
                EventType::Connected => {
                    tracing::info!("gamepad connected");
                    self.connected = true;
                }
                EventType::Disconnected => {
                    tracing::info!("gamepad disconnected");
                    self.connected = false;
                    self.stick = None;
                }
                _ => {}
            }
        }
    }

    #[cfg(feature = "gamepad")]
    fn press(&mut self, gilrs_btn: Button) {
        let dir = match gilrs_btn {
            Button::DPadUp => Some(Direction::Up),
            Button::DPadDown => Some(Direction::Down),
            Button::DPadLeft => Some(Direction::Left),
            Button::DPadRight => Some(Direction::Right),
            _ => None,
        };
        if let Some(d) = dir {
            self.moves.push(d);
        } else if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            self.fresh[btn as usize] = true;
        }
    }

    /// The stick acts like a D-pad: one move each time it leaves the centre.
    #[cfg(feature = "gamepad")]
    fn update_axis(&mut self, axis: Axis, value: f32) {
        let dir = match axis {
            Axis::LeftStickX if value < -STICK_DEADZONE => Some(Direction::Left),
            Axis::LeftStickX if value > STICK_DEADZONE => Some(Direction::Right),
            Axis::LeftStickY if value > STICK_DEADZONE => Some(Direction::Up),
            Axis::LeftStickY if value < -STICK_DEADZONE => Some(Direction::Down),
            Axis::LeftStickX | Axis::LeftStickY => None,
            _ => return,
        };
        if dir.is_some() && dir != self.stick {
            self.moves.extend(dir);
        }
        self.stick = dir;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> GamepadConfig {
        GamepadConfig {
            place: vec!["A".into()],
            clear: vec!["B".into()],
            note_mode: vec!["X".into()],
            hint: vec!["rb".into(), "north".into()],
            prev_digit: vec!["L1".into()],
            next_digit: vec![],
            undo: vec!["nonsense".into()],
            redo: vec!["R2".into()],
            confirm: vec!["Start".into()],
            cancel: vec!["Back".into()],
        }
    }

    fn bound(pad: &GamepadState, intent: Intent) -> Vec<Btn> {
        pad.action_map
            .bindings
            .iter()
            .find(|(i, _)| *i == intent)
            .map(|(_, b)| b.clone())
            .unwrap_or_default()
    }

    #[test]
    fn config_overrides_and_falls_back() {
        let mut pad = GamepadState::new();
        pad.load_button_config(&cfg());
        assert_eq!(bound(&pad, Intent::Hint), vec![Btn::R1, Btn::Y]);
        assert_eq!(bound(&pad, Intent::PadNext), vec![Btn::R1], "empty list keeps default");
        assert_eq!(bound(&pad, Intent::Undo), vec![Btn::L2], "junk names keep default");
        assert_eq!(bound(&pad, Intent::Cancel), vec![Btn::Select]);
    }

    #[test]
    fn fresh_presses_become_intents() {
        let mut pad = GamepadState::new();
        pad.fresh[Btn::Y as usize] = true;
        pad.moves.push(Direction::Left);
        assert_eq!(pad.intents(), vec![Intent::Move(Direction::Left), Intent::Hint]);
    }
}
