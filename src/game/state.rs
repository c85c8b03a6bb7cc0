use serde::{Deserialize, Serialize};

use super::action::Direction;

/// A position on the game grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Move position by delta
    pub fn moved_by(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Move position in a direction
    pub fn moved_in_direction(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.moved_by(dx, dy)
    }
}

/// The snake in the game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snake {
    /// Body segments, with head at index 0
    pub body: Vec<Position>,
}

impl Snake {
    /// Lay out a snake with `length` segments trailing behind `head`,
    /// opposite to `heading`.
    pub fn new(head: Position, heading: Direction, length: usize) -> Self {
        let mut body = vec![head];
        let (back_dx, back_dy) = heading.opposite().delta();

        for i in 1..length {
            let prev = body[i - 1];
            body.push(prev.moved_by(back_dx, back_dy));
        }

        Self { body }
    }

    pub fn from_segments(body: Vec<Position>) -> Self {
        Self { body }
    }

    /// Get the head position
    pub fn head(&self) -> Position {
        self.body[0]
    }

    /// Get the tail position (last segment)
    pub fn tail(&self) -> Option<Position> {
        self.body.last().copied()
    }

    /// Get body segments (excluding head)
    pub fn body_segments(&self) -> &[Position] {
        &self.body[1..]
    }

    /// Check if position collides with snake body (excluding head)
    pub fn collides_with_body(&self, pos: Position) -> bool {
        self.body_segments().contains(&pos)
    }

    /// Like `collides_with_body`, but the tail cell counts as free
    pub fn collides_with_body_before_tail(&self, pos: Position) -> bool {
        let segments = self.body_segments();
        match segments.split_last() {
            Some((_, rest)) => rest.contains(&pos),
            None => false,
        }
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.body.contains(&pos)
    }

    /// Push a new head, dropping the tail unless the snake grows
    pub fn advance(&mut self, new_head: Position, should_grow: bool) {
        self.body.insert(0, new_head);

        if !should_grow {
            self.body.pop();
        }
    }

    /// Get the length of the snake
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Check if the snake is empty (should never happen in practice)
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Type of collision that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionType {
    /// Snake hit a wall
    Wall,
    /// Snake hit itself
    SelfCollision,
}

/// Lifecycle of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No game started yet
    Ready,
    Running,
    Paused,
    GameOver,
}

/// Complete game state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub snake: Snake,
    pub heading: Direction,
    pub food: Position,
    pub grid_size: usize,
    pub score: u32,
    pub high_score: u32,
    pub phase: Phase,
}

impl GameState {
    /// Create a running game state with a zero score
    pub fn new(snake: Snake, heading: Direction, food: Position, grid_size: usize) -> Self {
        Self {
            snake,
            heading,
            food,
            grid_size,
            score: 0,
            high_score: 0,
            phase: Phase::Running,
        }
    }

    /// True before the first game and after a collision
    pub fn is_over(&self) -> bool {
        matches!(self.phase, Phase::Ready | Phase::GameOver)
    }

    pub fn is_paused(&self) -> bool {
        self.phase == Phase::Paused
    }

    /// Check if a position is within the grid bounds
    pub fn is_in_bounds(&self, pos: Position) -> bool {
        let size = self.grid_size as i32;
        pos.x >= 0 && pos.x < size && pos.y >= 0 && pos.y < size
    }

    /// Check if a position is occupied by the snake
    pub fn is_occupied_by_snake(&self, pos: Position) -> bool {
        self.snake.contains(pos)
    }

    /// Number of cells not covered by the snake
    pub fn free_cells(&self) -> usize {
        self.grid_size.saturating_mul(self.grid_size).saturating_sub(self.snake.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_movement() {
        let pos = Position::new(5, 5);
        assert_eq!(pos.moved_by(1, 0), Position::new(6, 5));
        assert_eq!(pos.moved_by(-1, 0), Position::new(4, 5));
        assert_eq!(pos.moved_in_direction(Direction::Down), Position::new(5, 6));
        assert_eq!(pos.moved_in_direction(Direction::Up), Position::new(5, 4));
    }

    #[test]
    fn test_snake_creation() {
        let snake = Snake::new(Position::new(5, 10), Direction::Right, 3);
        assert_eq!(snake.len(), 3);
        assert_eq!(snake.head(), Position::new(5, 10));
        assert_eq!(snake.body[1], Position::new(4, 10));
        assert_eq!(snake.tail(), Some(Position::new(3, 10)));
    }

    #[test]
    fn test_snake_advance() {
        let mut snake = Snake::new(Position::new(5, 5), Direction::Right, 3);

        snake.advance(Position::new(6, 5), false);
        assert_eq!(snake.len(), 3);
        assert_eq!(snake.head(), Position::new(6, 5));
        assert_eq!(snake.tail(), Some(Position::new(4, 5)));

        snake.advance(Position::new(7, 5), true);
        assert_eq!(snake.len(), 4);
        assert_eq!(snake.tail(), Some(Position::new(4, 5)));
    }

    #[test]
    fn test_collision_detection() {
        let snake = Snake::new(Position::new(5, 5), Direction::Right, 3);
        assert!(!snake.collides_with_body(Position::new(5, 5))); // head
        assert!(snake.collides_with_body(Position::new(4, 5)));
        assert!(snake.collides_with_body(Position::new(3, 5))); // tail
        assert!(!snake.collides_with_body(Position::new(10, 10)));

        assert!(snake.collides_with_body_before_tail(Position::new(4, 5)));
        assert!(!snake.collides_with_body_before_tail(Position::new(3, 5)));
    }

    #[test]
    fn test_single_segment_has_no_body() {
        let snake = Snake::new(Position::new(2, 2), Direction::Up, 1);
        assert!(snake.body_segments().is_empty());
        assert!(!snake.collides_with_body_before_tail(Position::new(2, 2)));
    }

    #[test]
    fn test_bounds_checking() {
        let state = GameState::new(
            Snake::new(Position::new(5, 5), Direction::Right, 3),
            Direction::Right,
            Position::new(10, 10),
            20,
        );

        assert!(state.is_in_bounds(Position::new(0, 0)));
        assert!(state.is_in_bounds(Position::new(19, 19)));
        assert!(!state.is_in_bounds(Position::new(-1, 0)));
        assert!(!state.is_in_bounds(Position::new(20, 0)));
        assert!(!state.is_in_bounds(Position::new(0, 20)));
        assert_eq!(state.free_cells(), 397);
    }

    #[test]
    fn test_phase_flags() {
        let mut state = GameState::new(
            Snake::new(Position::new(5, 5), Direction::Right, 3),
            Direction::Right,
            Position::new(10, 10),
            20,
        );
        assert!(!state.is_over());
        state.phase = Phase::Paused;
        assert!(state.is_paused());
        state.phase = Phase::Ready;
        assert!(state.is_over());
        state.phase = Phase::GameOver;
        assert!(state.is_over());
    }
}
