use gilrs::{Axis, Button, EventType, Gilrs};
use manga_core::input::HatPosition;
use manga_core::{DisplayError, PlatformEvent};
use tracing::{debug, info};

/// Host gamepads, reported with the button and axis numbers of a plain
/// joystick: face buttons 0..=3, start 2, the d-pad as a hat.
pub struct Gamepads {
    gilrs: Gilrs,
    dpad: [bool; 4],
}

const DPAD_UP: usize = 0;
const DPAD_DOWN: usize = 1;
const DPAD_LEFT: usize = 2;
const DPAD_RIGHT: usize = 3;

fn button_number(button: Button) -> Option<u8> {
    match button {
        Button::South => Some(0),
        Button::East => Some(1),
        Button::Start => Some(2),
        Button::West => Some(3),
        Button::North => Some(4),
        Button::Select => Some(5),
        _ => None,
    }
}

fn dpad_slot(button: Button) -> Option<usize> {
    match button {
        Button::DPadUp => Some(DPAD_UP),
        Button::DPadDown => Some(DPAD_DOWN),
        Button::DPadLeft => Some(DPAD_LEFT),
        Button::DPadRight => Some(DPAD_RIGHT),
        _ => None,
    }
}

fn hat_position(dpad: [bool; 4]) -> HatPosition {
    match (dpad[DPAD_UP], dpad[DPAD_DOWN], dpad[DPAD_LEFT], dpad[DPAD_RIGHT]) {
        (true, false, false, true) => HatPosition::RightUp,
        (true, false, true, false) => HatPosition::LeftUp,
        (false, true, false, true) => HatPosition::RightDown,
        (false, true, true, false) => HatPosition::LeftDown,
        (true, false, _, _) => HatPosition::Up,
        (false, true, _, _) => HatPosition::Down,
        (_, _, true, false) => HatPosition::Left,
        (_, _, false, true) => HatPosition::Right,
        _ => HatPosition::Centered,
    }
}

/// Scales a gilrs axis reading to the signed 16-bit range. Up is negative.
fn axis_value(axis: Axis, value: f32) -> Option<(u8, i16)> {
    let scaled = (value.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
    match axis {
        Axis::LeftStickX => Some((0, scaled)),
        Axis::LeftStickY => Some((1, scaled.saturating_neg())),
        Axis::RightStickX => Some((2, scaled)),
        Axis::RightStickY => Some((3, scaled.saturating_neg())),
        _ => None,
    }
}

impl Gamepads {
    pub fn open() -> Result<(Self, usize), DisplayError> {
        let gilrs = Gilrs::new().map_err(|e| DisplayError::BackendInit(e.to_string()))?;
        let count = gilrs.gamepads().count();
        for (id, pad) in gilrs.gamepads() {
            info!("gamepad {}: {}", id, pad.name());
        }
        Ok((Self { gilrs, dpad: [false; 4] }, count))
    }

    /// Drains pending gamepad events into `out`.
    pub fn poll(&mut self, out: &mut impl Extend<PlatformEvent>) {
        while let Some(event) = self.gilrs.next_event() {
            match event.event {
                EventType::ButtonPressed(button, _) | EventType::ButtonReleased(button, _) => {
                    let pressed = matches!(event.event, EventType::ButtonPressed(..));
                    if let Some(slot) = dpad_slot(button) {
                        self.dpad[slot] = pressed;
                        out.extend(Some(PlatformEvent::JoyHat(hat_position(self.dpad))));
                    } else if let Some(number) = button_number(button) {
                        out.extend(Some(if pressed {
                            PlatformEvent::JoyButtonDown(number)
                        } else {
                            PlatformEvent::JoyButtonUp(number)
                        }));
                    }
                }
                EventType::AxisChanged(axis, value, _) => {
                    if let Some((axis, value)) = axis_value(axis, value) {
                        out.extend(Some(PlatformEvent::JoyAxis { axis, value }));
                    }
                }
                EventType::Connected => info!("gamepad {} connected", event.id),
                EventType::Disconnected => {
                    info!("gamepad {} disconnected", event.id);
                    self.dpad = [false; 4];
                    out.extend(Some(PlatformEvent::JoyHat(HatPosition::Centered)));
                }
                other => debug!("ignored gamepad event {:?}", other),
            }
        }
    }
}
