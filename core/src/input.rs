use bitflags::bitflags;
use log::{debug, info, trace};
use crate::settings::{JoyMapping, Settings};

/// Physical keys, independent of the window system.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Scancode {
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
    Num0, Num1, Num2, Num3, Num4, Num5, Num6, Num7, Num8, Num9,
    Kp0, Kp1, Kp2, Kp3, Kp4, Kp5, Kp6, Kp7, Kp8, Kp9,
    F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12,
    Escape,
    LeftCtrl,
    RightCtrl,
    LeftShift,
    RightShift,
    Return,
    Pause,
    Insert,
    Space,
    Left,
    Right,
    Up,
    Down,
    PageUp,
    PageDown,
}

impl Scancode {
    pub const COUNT: usize = Scancode::PageDown as usize + 1;
}

/// Keys the game logic asks about.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LogicalKey {
    Escape,
    Ctrl,
    Return,
    Pause,
    Shift,
    K0, K1, K2, K3, K4, K5, K6, K7, K8, K9,
    F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12,
    Insert,
    /// Fire.
    Space,
    Left,
    Right,
    Up,
    Down,
    A, B, C, E, F, G, P, Q, S, V,
    PageUp,
    PageDown,
}

impl LogicalKey {
    pub const COUNT: usize = LogicalKey::PageDown as usize + 1;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyStates([bool; LogicalKey::COUNT]);

impl Default for KeyStates {
    fn default() -> Self {
        Self([false; LogicalKey::COUNT])
    }
}

impl KeyStates {
    #[inline(always)]
    pub fn is_down(&self, key: LogicalKey) -> bool {
        self.0[key as usize]
    }

    pub fn set(&mut self, key: LogicalKey, down: bool) {
        self.0[key as usize] = down;
    }

    pub fn any_down(&self) -> bool {
        self.0.iter().any(|down| *down)
    }
}

bitflags! {
    /// Joystick actions latched for text-entry screens.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct JoyBits: u8 {
        const LEFT = 1 << 0;
        const RIGHT = 1 << 1;
        const TOP = 1 << 2;
        const DOWN = 1 << 3;
        const FIRE = 1 << 4;
        const OPTION = 1 << 5;
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Joystick {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub fire: bool,
    pub option: bool,
    pub start: bool,
}

impl Joystick {
    fn set_directions(&mut self, left: bool, right: bool, up: bool, down: bool) {
        self.left = left;
        self.right = right;
        self.up = up;
        self.down = down;
    }
}

/// Left button state, in 320x200 screen coordinates.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Mouse {
    pub pressed: bool,
    pub x: i32,
    pub y: i32,
}

/// Pause requested by the player or forced by losing focus. Regaining focus
/// only lifts the forced kind.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PauseState {
    paused: bool,
    auto_triggered: bool,
}

impl PauseState {
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Player toggle. Returns the new state.
    pub fn toggle(&mut self) -> bool {
        self.paused = !self.paused;
        self.auto_triggered = false;
        self.paused
    }

    fn focus_lost(&mut self) {
        if !self.paused {
            self.paused = true;
            self.auto_triggered = true;
        }
    }

    fn focus_gained(&mut self) {
        if self.paused && self.auto_triggered {
            self.paused = false;
        }
        self.auto_triggered = false;
    }
}

/// Screens that claim the return key for themselves.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct InputContext {
    pub text_entry: bool,
    pub order_screen: bool,
}

/// Everything the simulation reads about the player's devices.
#[derive(Clone, Debug, Default)]
pub struct InputState {
    pub keys: KeyStates,
    /// Last key pressed, cleared when that same key is released.
    pub last_key: Option<Scancode>,
    pub joystick: Joystick,
    pub joy_latch: JoyBits,
    pub mouse: Mouse,
    pub pause: PauseState,
    pub context: InputContext,
}

impl InputState {
    pub fn fire(&self) -> bool {
        self.keys.is_down(LogicalKey::Space) || self.joystick.fire
    }

    pub fn option(&self) -> bool {
        self.keys.is_down(LogicalKey::Ctrl) || self.joystick.option
    }

    pub fn left(&self) -> bool {
        self.keys.is_down(LogicalKey::Left) || self.joystick.left
    }

    pub fn right(&self) -> bool {
        self.keys.is_down(LogicalKey::Right) || self.joystick.right
    }

    pub fn up(&self) -> bool {
        self.keys.is_down(LogicalKey::Up) || self.joystick.up
    }

    pub fn down(&self) -> bool {
        self.keys.is_down(LogicalKey::Down) || self.joystick.down
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HatPosition {
    Centered,
    Up,
    RightUp,
    Right,
    RightDown,
    Down,
    LeftDown,
    Left,
    LeftUp,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    Other(u16),
}

/// Analog values within this distance of the center read as centered.
pub const AXIS_DEADZONE: i16 = 4096;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlatformEvent {
    KeyDown(Scancode),
    KeyUp(Scancode),
    JoyHat(HatPosition),
    JoyAxis { axis: u8, value: i16 },
    JoyButtonDown(u8),
    JoyButtonUp(u8),
    MouseButtonDown { button: MouseButton, x: i32, y: i32 },
    MouseButtonUp { button: MouseButton },
    MouseMotion { x: i32, y: i32 },
    FocusGained,
    FocusLost,
    /// Window contents were lost and must be drawn again.
    Exposed,
    Quit,
    /// Anything else the backend saw, by its own type code.
    Unknown(u32),
}

/// What the loop has to do about an event beyond the state update.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventResponse {
    None,
    Redraw,
    Quit,
}

/// Turns platform events into the key table and joystick flags.
pub struct InputTranslator {
    physical: [bool; Scancode::COUNT],
    reverse_controls: bool,
    joy: JoyMapping,
}

impl InputTranslator {
    pub fn new(settings: &Settings) -> Self {
        Self {
            physical: [false; Scancode::COUNT],
            reverse_controls: settings.reverse_controls,
            joy: settings.joystick,
        }
    }

    pub fn set_reverse_controls(&mut self, reverse: bool) {
        self.reverse_controls = reverse;
    }

    pub fn translate(&mut self, event: &PlatformEvent, state: &mut InputState) -> EventResponse {
        match *event {
            PlatformEvent::KeyDown(code) => {
                trace!("key down: {:?}", code);
                self.physical[code as usize] = true;
                state.last_key = Some(code);
                self.refresh(state);
            }
            PlatformEvent::KeyUp(code) => {
                trace!("key up: {:?}", code);
                self.physical[code as usize] = false;
                if state.last_key == Some(code) {
                    state.last_key = None;
                }
                self.refresh(state);
            }
            PlatformEvent::JoyHat(position) => {
                let (left, right, up, down) = match position {
                    HatPosition::Centered => (false, false, false, false),
                    HatPosition::Up => (false, false, true, false),
                    HatPosition::RightUp => (false, true, true, false),
                    HatPosition::Right => (false, true, false, false),
                    HatPosition::RightDown => (false, true, false, true),
                    HatPosition::Down => (false, false, false, true),
                    HatPosition::LeftDown => (true, false, false, true),
                    HatPosition::Left => (true, false, false, false),
                    HatPosition::LeftUp => (true, false, true, false),
                };
                state.joystick.set_directions(left, right, up, down);
            }
            PlatformEvent::JoyAxis { axis, value } => self.axis(axis, value, state),
            PlatformEvent::JoyButtonDown(button) => self.button(button, true, state),
            PlatformEvent::JoyButtonUp(button) => self.button(button, false, state),
            PlatformEvent::MouseButtonDown { button: MouseButton::Left, x, y } => {
                state.mouse = Mouse { pressed: true, x, y };
                debug!("mouse_x = {} mouse_y = {}", x, y);
            }
            PlatformEvent::MouseButtonUp { button: MouseButton::Left } => {
                state.mouse.pressed = false;
            }
            PlatformEvent::MouseButtonDown { .. }
            | PlatformEvent::MouseButtonUp { .. }
            | PlatformEvent::MouseMotion { .. } => {}
            PlatformEvent::FocusLost => {
                debug!("focus lost");
                state.pause.focus_lost();
            }
            PlatformEvent::FocusGained => {
                debug!("focus gained");
                state.pause.focus_gained();
            }
            PlatformEvent::Exposed => return EventResponse::Redraw,
            PlatformEvent::Quit => return EventResponse::Quit,
            PlatformEvent::Unknown(code) => info!("not supported event type: {}", code),
        }
        EventResponse::None
    }

    fn axis(&self, axis: u8, value: i16, state: &mut InputState) {
        let (negative, positive) = if value < -AXIS_DEADZONE {
            (true, false)
        } else if value > AXIS_DEADZONE {
            (false, true)
        } else {
            (false, false)
        };

        let (neg_bit, pos_bit) = if axis == self.joy.x_axis {
            state.joystick.left = negative;
            state.joystick.right = positive;
            (JoyBits::LEFT, JoyBits::RIGHT)
        } else if axis == self.joy.y_axis {
            state.joystick.up = negative;
            state.joystick.down = positive;
            (JoyBits::TOP, JoyBits::DOWN)
        } else {
            return;
        };
        state.joy_latch.set(neg_bit, negative);
        state.joy_latch.set(pos_bit, positive);
    }

    fn button(&self, button: u8, down: bool, state: &mut InputState) {
        if button == self.joy.start {
            state.joystick.start = down;
        } else if button == self.joy.fire {
            state.joystick.fire = down;
            state.joy_latch.set(JoyBits::FIRE, down);
        } else if button == self.joy.option {
            state.joystick.option = down;
            state.joy_latch.set(JoyBits::OPTION, down);
        }
    }

    /// Rebuilds the whole logical table from the physical snapshot.
    fn refresh(&self, state: &mut InputState) {
        use LogicalKey as L;
        use Scancode as S;

        let k = |code: Scancode| self.physical[code as usize];
        let keys = &mut state.keys;

        keys.set(L::Escape, k(S::Escape));
        keys.set(L::Ctrl, k(S::LeftCtrl) || k(S::RightCtrl) || k(S::Kp2));
        keys.set(L::Return, k(S::Return));
        keys.set(L::Pause, k(S::Pause));
        keys.set(L::Shift, k(S::LeftShift) || k(S::RightShift));

        let digits = [
            (L::K0, S::Num0, S::Kp0),
            (L::K1, S::Num1, S::Kp1),
            (L::K2, S::Num2, S::Kp2),
            (L::K3, S::Num3, S::Kp3),
            (L::K4, S::Num4, S::Kp4),
            (L::K5, S::Num5, S::Kp5),
            (L::K6, S::Num6, S::Kp6),
            (L::K7, S::Num7, S::Kp7),
            (L::K8, S::Num8, S::Kp8),
            (L::K9, S::Num9, S::Kp9),
        ];
        for (key, row, pad) in digits {
            keys.set(key, k(row) || k(pad));
        }

        let plain = [
            (L::F1, S::F1),
            (L::F2, S::F2),
            (L::F3, S::F3),
            (L::F4, S::F4),
            (L::F5, S::F5),
            (L::F6, S::F6),
            (L::F7, S::F7),
            (L::F8, S::F8),
            (L::F9, S::F9),
            (L::F10, S::F10),
            (L::F11, S::F11),
            (L::F12, S::F12),
            (L::Insert, S::Insert),
            (L::A, S::A),
            (L::B, S::B),
            (L::C, S::C),
            (L::E, S::E),
            (L::F, S::F),
            (L::G, S::G),
            (L::P, S::P),
            (L::Q, S::Q),
            (L::S, S::S),
            (L::V, S::V),
            (L::PageUp, S::PageUp),
            (L::PageDown, S::PageDown),
        ];
        for (key, code) in plain {
            keys.set(key, k(code));
        }

        let (left, right, up, down) = if self.reverse_controls {
            (k(S::Right), k(S::Left), k(S::Down), k(S::Up))
        } else {
            (k(S::Left), k(S::Right), k(S::Up), k(S::Down))
        };
        keys.set(L::Left, left || k(S::Kp4));
        keys.set(L::Right, right || k(S::Kp6));
        keys.set(L::Up, up || k(S::Kp8));
        keys.set(L::Down, down || k(S::Kp5));

        let return_fires = k(S::Return) && !state.context.text_entry && !state.context.order_screen;
        keys.set(L::Space, k(S::Space) || k(S::Kp0) || return_fires);
    }
}
