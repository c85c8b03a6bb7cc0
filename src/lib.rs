//! Tick Snake - a deterministic snake game engine
//!
//! This library provides:
//! - Core game logic (game module)
//! - A session actor that serializes commands and drives ticks (session module)
//! - Text command parsing (input module)
//! - A headless JSON-lines driver (modes module)

pub mod game;
pub mod input;
pub mod modes;
pub mod session;
