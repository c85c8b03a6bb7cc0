use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Smallest board the engine accepts
pub const MIN_GRID_SIZE: usize = 4;

/// Largest board the engine accepts; keeps coordinates and cell counts
/// well inside `i32` and `usize`
pub const MAX_GRID_SIZE: usize = 1024;

/// How the self-collision check treats the cell the tail is about to leave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfCollisionRule {
    /// Every segment behind the head is solid, including the tail cell that
    /// would be vacated on this tick.
    #[default]
    Strict,
    /// The tail cell is free to enter unless the move also eats food.
    Vacating,
}

/// Configuration for the game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Cells per side of the square board
    pub grid_size: usize,
    /// Pixel size of one cell. Presentation only, the engine never reads it.
    pub cell_size: u32,
    /// Milliseconds between two ticks when driven by a session
    pub tick_interval_ms: u64,
    /// Initial length of the snake
    pub initial_snake_length: usize,
    /// Score awarded per food eaten
    pub points_per_food: u32,
    pub self_collision: SelfCollisionRule,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_size: 20,
            cell_size: 15,
            tick_interval_ms: 150,
            initial_snake_length: 3,
            points_per_food: 10,
            self_collision: SelfCollisionRule::Strict,
        }
    }
}

impl GameConfig {
    /// Create a new configuration with custom grid size
    pub fn new(grid_size: usize) -> Self {
        Self {
            grid_size,
            ..Default::default()
        }
    }

    /// Create a small grid for testing
    pub fn small() -> Self {
        Self::new(10)
    }

    /// Load a configuration from a JSON file. Missing fields take their
    /// default values.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: GameConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Check that a new game can be laid out on this board.
    ///
    /// The snake starts horizontally with its head at a quarter of the board
    /// width, so the whole body must fit between that column and the left
    /// wall.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_layout(self.grid_size, self.initial_snake_length)?;
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }
        Ok(())
    }
}

pub(crate) fn validate_layout(grid_size: usize, initial_length: usize) -> Result<(), ConfigError> {
    if grid_size < MIN_GRID_SIZE {
        return Err(ConfigError::GridTooSmall {
            grid_size,
            min: MIN_GRID_SIZE,
        });
    }
    if grid_size > MAX_GRID_SIZE {
        return Err(ConfigError::GridTooLarge {
            grid_size,
            max: MAX_GRID_SIZE,
        });
    }
    if initial_length == 0 {
        return Err(ConfigError::EmptySnake);
    }
    if initial_length >= grid_size || initial_length > grid_size / 4 + 1 {
        return Err(ConfigError::SnakeTooLong {
            grid_size,
            initial_length,
        });
    }
    Ok(())
}

/// Rejected game configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    GridTooSmall { grid_size: usize, min: usize },
    GridTooLarge { grid_size: usize, max: usize },
    EmptySnake,
    SnakeTooLong { grid_size: usize, initial_length: usize },
    ZeroTickInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::GridTooSmall { grid_size, min } => {
                write!(f, "grid size {grid_size} is below the minimum of {min}")
            }
            ConfigError::GridTooLarge { grid_size, max } => {
                write!(f, "grid size {grid_size} is above the maximum of {max}")
            }
            ConfigError::EmptySnake => write!(f, "initial snake length must be at least 1"),
            ConfigError::SnakeTooLong {
                grid_size,
                initial_length,
            } => write!(
                f,
                "a snake of length {initial_length} does not fit on a {grid_size}x{grid_size} board"
            ),
            ConfigError::ZeroTickInterval => write!(f, "tick interval must be non-zero"),
        }
    }
}

impl std::error::Error for ConfigError {}
