use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::animation::{SPEED_RANGE, TIMESTEP_RANGE};
use crate::error::{Result, ShowdeskError};
use crate::matcher::WindowMatch;

pub const DEFAULT_WINDOW_MATCH: &str = "type=toolbar | type=utility | type=dialog | type=normal";

/// Edge (or edges) windows slide towards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Direction {
    #[default]
    Up,
    Down,
    Left,
    Right,
    UpDown,
    LeftRight,
    ToCorners,
}

impl Direction {
    const ALL: [Direction; 7] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
        Direction::UpDown,
        Direction::LeftRight,
        Direction::ToCorners,
    ];

    /// Accepts the option index (0-6) or a name such as `up/down` or `to corners`.
    pub fn parse(value: &str) -> Result<Self> {
        if let Ok(index) = value.trim().parse::<usize>() {
            return Self::ALL
                .get(index)
                .copied()
                .ok_or_else(|| ShowdeskError::InvalidDirection(value.to_string()));
        }

        let normalized: String = value
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            "updown" => Ok(Direction::UpDown),
            "leftright" => Ok(Direction::LeftRight),
            "tocorners" | "corners" => Ok(Direction::ToCorners),
            _ => Err(ShowdeskError::InvalidDirection(value.to_string())),
        }
    }
}

impl FromStr for Direction {
    type Err = ShowdeskError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Configuration loaded from ~/.showdeskrc
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Windows that take part in show-desktop
    pub window_match: WindowMatch,
    pub direction: Direction,
    /// Pixels of each window left visible at the screen edge
    pub window_part_size: i32,
    pub speed: f32,
    pub timestep: f32,
    /// Opacity multiplier for hidden windows once fully off-screen
    pub window_opacity: f32,
    /// Paint cycles per second while animating
    pub refresh_rate: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_match: WindowMatch::parse(DEFAULT_WINDOW_MATCH)
                .unwrap_or_else(|_| WindowMatch::any()),
            direction: Direction::Up,
            window_part_size: 20,
            speed: 1.2,
            timestep: 0.1,
            window_opacity: 0.3,
            refresh_rate: 60,
        }
    }
}

impl Config {
    /// Load configuration from ~/.showdeskrc
    /// Falls back to defaults if file doesn't exist or has parse errors.
    pub fn load() -> Self {
        let path = match Self::default_path() {
            Some(path) => path,
            None => return Self::default(),
        };

        match fs::read_to_string(&path) {
            Ok(contents) => {
                log::debug!("Config: reading {}", path.display());
                Self::parse(&contents)
            }
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from an explicit file. A missing file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(Self::parse(&contents))
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".showdeskrc"))
    }

    /// Parse "Key Value" lines. Bad values are logged and the default kept.
    pub fn parse(contents: &str) -> Self {
        let mut config = Self::default();

        for line in contents.lines() {
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = match line.split_once(char::is_whitespace) {
                Some((k, v)) => (k, v.trim()),
                None => {
                    log::warn!("Config: '{}' has no value", line);
                    continue;
                }
            };

            match key {
                "WindowMatch" => match WindowMatch::parse(value) {
                    Ok(rule) => {
                        log::debug!("Config: WindowMatch = {}", rule);
                        config.window_match = rule;
                    }
                    Err(e) => log::warn!("Config: {}", e),
                },
                "Direction" => match Direction::parse(value) {
                    Ok(direction) => {
                        log::debug!("Config: Direction = {}", direction);
                        config.direction = direction;
                    }
                    Err(e) => log::warn!("Config: {}", e),
                },
                "WindowPartSize" => match value.parse::<i32>() {
                    Ok(size) if size >= 0 => {
                        config.window_part_size = size;
                        log::debug!("Config: WindowPartSize = {}", size);
                    }
                    _ => log::warn!("Config: invalid WindowPartSize '{}'", value),
                },
                "Speed" => match value.parse::<f32>() {
                    Ok(speed) if SPEED_RANGE.contains(&speed) => {
                        config.speed = speed;
                        log::debug!("Config: Speed = {}", speed);
                    }
                    _ => log::warn!("Config: invalid Speed '{}'", value),
                },
                "Timestep" => match value.parse::<f32>() {
                    Ok(timestep) if TIMESTEP_RANGE.contains(&timestep) => {
                        config.timestep = timestep;
                        log::debug!("Config: Timestep = {}", timestep);
                    }
                    _ => log::warn!("Config: invalid Timestep '{}'", value),
                },
                "WindowOpacity" => match value.parse::<f32>() {
                    Ok(opacity) if (0.0..=1.0).contains(&opacity) => {
                        config.window_opacity = opacity;
                        log::debug!("Config: WindowOpacity = {}", opacity);
                    }
                    _ => log::warn!("Config: invalid WindowOpacity '{}'", value),
                },
                "RefreshRate" => match value.parse::<u32>() {
                    Ok(rate) if (1..=480).contains(&rate) => {
                        config.refresh_rate = rate;
                        log::debug!("Config: RefreshRate = {}", rate);
                    }
                    _ => log::warn!("Config: invalid RefreshRate '{}'", value),
                },
                _ => {
                    log::debug!("Config: unknown key '{}'", key);
                }
            }
        }

        config
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.refresh_rate.max(1) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{WindowProperties, WindowType};

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.direction, Direction::Up);
        assert_eq!(config.window_part_size, 20);
        assert_eq!(config.window_match.as_str(), DEFAULT_WINDOW_MATCH);
        assert_eq!(config.frame_duration(), Duration::from_secs_f64(1.0 / 60.0));
    }

    #[test]
    fn test_parse_rc() {
        let config = Config::parse(
            "# slide down, leave a sliver\n\
             Direction down\n\
             WindowPartSize 10\n\
             Speed 2.5\n\
             Timestep 0.2\n\
             WindowOpacity 0.5\n\
             RefreshRate 120\n\
             WindowMatch type=normal & !class=^Conky$\n",
        );
        assert_eq!(config.direction, Direction::Down);
        assert_eq!(config.window_part_size, 10);
        assert!((config.speed - 2.5).abs() < f32::EPSILON);
        assert!((config.timestep - 0.2).abs() < f32::EPSILON);
        assert!((config.window_opacity - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.refresh_rate, 120);
        assert_eq!(config.window_match.as_str(), "type=normal & !class=^Conky$");

        let conky = WindowProperties {
            window_type: WindowType::Normal,
            class: Some("Conky".to_string()),
            ..Default::default()
        };
        assert!(!config.window_match.matches(&conky));
    }

    #[test]
    fn test_bad_values_keep_defaults() {
        let config = Config::parse(
            "Direction sideways\n\
             Speed -1\n\
             WindowOpacity 3\n\
             WindowPartSize lots\n\
             WindowMatch (type=normal\n\
             Bogus 1\n\
             Lonely\n",
        );
        let defaults = Config::default();
        assert_eq!(config.direction, defaults.direction);
        assert_eq!(config.speed, defaults.speed);
        assert_eq!(config.window_opacity, defaults.window_opacity);
        assert_eq!(config.window_part_size, defaults.window_part_size);
        assert_eq!(config.window_match, defaults.window_match);
    }

    #[test]
    fn test_animation_options_are_bounded() {
        let defaults = Config::default();
        for rc in ["Timestep 0.0000001", "Timestep 2000", "Timestep NaN", "Speed 0.01", "Speed 500"] {
            let config = Config::parse(rc);
            assert_eq!(config.speed, defaults.speed, "{}", rc);
            assert_eq!(config.timestep, defaults.timestep, "{}", rc);
        }

        let config = Config::parse("Speed 50
Timestep 10
");
        assert_eq!(config.speed, 50.0);
        assert_eq!(config.timestep, 10.0);
    }

    #[test]
    fn test_direction_names_and_indices() {
        assert_eq!(Direction::parse("Up/Down").unwrap(), Direction::UpDown);
        assert_eq!(Direction::parse("left-right").unwrap(), Direction::LeftRight);
        assert_eq!(Direction::parse("To Corners").unwrap(), Direction::ToCorners);
        assert_eq!(Direction::parse("3").unwrap(), Direction::Right);
        assert!(Direction::parse("7").is_err());
        assert!("diagonal".parse::<Direction>().is_err());
    }

    #[test]
    fn test_serializes_to_json() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(json["direction"], "Up");
        assert_eq!(json["window_match"], DEFAULT_WINDOW_MATCH);
        assert_eq!(json["window_part_size"], 20);
    }
}
