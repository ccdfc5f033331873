use clap::Parser;
use manga_core::{Depth, JoyMapping, Settings};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "manga")]
#[command(version, about = "Mangadualist, a scrolling shoot-'em-up", long_about = None)]
pub struct Cli {
    /// More output per occurrence (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Swap up/down and left/right
    #[arg(long)]
    pub reverse: bool,

    /// Don't wait between frames
    #[arg(long)]
    pub nosync: bool,

    /// Disable sound
    #[arg(long)]
    pub nosound: bool,

    /// Start in fullscreen mode
    #[arg(long)]
    pub fullscreen: bool,

    /// Joystick axis used for left/right
    #[arg(long, default_value_t = 0)]
    pub joy_x_axis: u8,

    /// Joystick axis used for up/down
    #[arg(long, default_value_t = 1)]
    pub joy_y_axis: u8,

    /// Joystick button for fire
    #[arg(long, default_value_t = 0)]
    pub joy_fire: u8,

    /// Joystick button for option
    #[arg(long, default_value_t = 1)]
    pub joy_option: u8,

    /// Joystick button for start
    #[arg(long, default_value_t = 2)]
    pub joy_start: u8,

    /// Force the pixel depth the game draws in
    #[arg(long, value_parser = ["8", "15", "16", "24", "32"])]
    pub depth: Option<String>,

    /// Run without a window, for benchmarking
    #[arg(long)]
    pub headless: bool,

    /// Stop after this many frames
    #[arg(long)]
    pub frames: Option<u64>,
}

impl Cli {
    pub fn level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    pub fn depth(&self) -> Option<Depth> {
        match self.depth.as_deref()? {
            "8" => Some(Depth::Indexed8),
            "15" => Some(Depth::Rgb15),
            "16" => Some(Depth::Rgb16),
            "24" => Some(Depth::Rgb24),
            "32" => Some(Depth::Rgb32),
            _ => None,
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            reverse_controls: self.reverse,
            nosync: self.nosync,
            nosound: self.nosound,
            fullscreen: self.fullscreen,
            joystick: JoyMapping {
                x_axis: self.joy_x_axis,
                y_axis: self.joy_y_axis,
                fire: self.joy_fire,
                option: self.joy_option,
                start: self.joy_start,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["manga"]);
        assert_eq!(cli.level(), Level::WARN);
        assert_eq!(cli.settings(), Settings::default());
        assert_eq!(cli.depth(), None);
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from([
            "manga", "-vv", "--reverse", "--nosync", "--joy-fire", "5", "--depth", "15",
        ]);
        assert_eq!(cli.level(), Level::DEBUG);
        let settings = cli.settings();
        assert!(settings.reverse_controls);
        assert!(settings.nosync);
        assert_eq!(settings.joystick.fire, 5);
        assert_eq!(cli.depth(), Some(Depth::Rgb15));
    }

    #[test]
    fn test_rejects_odd_depths() {
        assert!(Cli::try_parse_from(["manga", "--depth", "12"]).is_err());
    }
}
