//! Core game logic module for Snake
//!
//! This module contains all the game logic without any I/O, timers or
//! rendering. Callers drive it by invoking [`GameEngine::tick`] at whatever
//! cadence they choose.

pub mod action;
pub mod config;
pub mod engine;
pub mod state;

// Re-export commonly used types
pub use action::Direction;
pub use config::{ConfigError, GameConfig, SelfCollisionRule};
pub use engine::{GameEngine, GameOverEvent, GameOverReason, RestoreError, TickResult};
pub use state::{CollisionType, GameState, Phase, Position, Snake};
