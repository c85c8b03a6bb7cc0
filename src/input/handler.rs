use crate::game::Direction;
use crate::session::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    Command(Command),
    Quit,
    /// Blank line
    None,
    Unknown(String),
}

/// Maps one line of text input to a session command
pub struct InputHandler;

impl InputHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_line(&self, line: &str) -> InputAction {
        let word = line.trim().to_ascii_lowercase();

        match word.as_str() {
            "" => InputAction::None,

            // Movement
            "up" | "w" => InputAction::Command(Command::SetHeading(Direction::Up)),
            "down" | "s" => InputAction::Command(Command::SetHeading(Direction::Down)),
            "left" | "a" => InputAction::Command(Command::SetHeading(Direction::Left)),
            "right" | "d" => InputAction::Command(Command::SetHeading(Direction::Right)),

            // Controls
            "pause" | "resume" | "p" => InputAction::Command(Command::TogglePause),
            "reset" | "start" | "play" | "r" => InputAction::Command(Command::Reset),
            "dismiss" | "close" => InputAction::Command(Command::Dismiss),
            "quit" | "exit" | "q" => InputAction::Quit,

            _ => InputAction::Unknown(word),
        }
    }
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}
