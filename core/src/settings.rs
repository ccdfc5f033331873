/// Joystick axis and button indices.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct JoyMapping {
    pub x_axis: u8,
    pub y_axis: u8,
    pub fire: u8,
    pub option: u8,
    pub start: u8,
}

impl Default for JoyMapping {
    fn default() -> Self {
        Self { x_axis: 0, y_axis: 1, fire: 0, option: 1, start: 2 }
    }
}

/// Runtime switches handed in by whoever launched the game.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Settings {
    /// Swap up/down and left/right.
    pub reverse_controls: bool,
    /// Run the loop as fast as it goes.
    pub nosync: bool,
    pub nosound: bool,
    pub fullscreen: bool,
    pub joystick: JoyMapping,
}
