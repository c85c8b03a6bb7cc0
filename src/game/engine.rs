use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info};

use super::{
    action::Direction,
    config::{ConfigError, GameConfig, SelfCollisionRule, validate_layout},
    state::{CollisionType, GameState, Phase, Position, Snake},
};

/// Why a game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    Collision(CollisionType),
    /// The snake covers every cell, so no food can be placed
    BoardFilled,
}

/// Notification emitted once per finished game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOverEvent {
    pub final_score: u32,
    pub high_score: u32,
    pub reason: GameOverReason,
}

/// Result of a game tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickResult {
    /// Whether the snake ate food this tick
    pub ate_food: bool,
    /// Set on the tick that ended the game
    pub game_over: Option<GameOverEvent>,
}

impl TickResult {
    pub fn terminated(&self) -> bool {
        self.game_over.is_some()
    }

    pub fn collision(&self) -> Option<CollisionType> {
        match self.game_over?.reason {
            GameOverReason::Collision(collision) => Some(collision),
            GameOverReason::BoardFilled => None,
        }
    }
}

/// Snapshot that cannot be resumed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreError {
    /// The board cannot host a new game with the configured snake length
    Layout(ConfigError),
    EmptySnake,
    SegmentOutOfBounds(Position),
    DuplicateSegment(Position),
    FoodOutOfBounds(Position),
    FoodOnSnake(Position),
}

impl fmt::Display for RestoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestoreError::Layout(err) => write!(f, "snapshot board is unusable: {err}"),
            RestoreError::EmptySnake => write!(f, "snapshot snake has no segments"),
            RestoreError::SegmentOutOfBounds(pos) => {
                write!(f, "snake segment ({}, {}) lies outside the board", pos.x, pos.y)
            }
            RestoreError::DuplicateSegment(pos) => {
                write!(f, "snake covers ({}, {}) more than once", pos.x, pos.y)
            }
            RestoreError::FoodOutOfBounds(pos) => {
                write!(f, "food ({}, {}) lies outside the board", pos.x, pos.y)
            }
            RestoreError::FoodOnSnake(pos) => {
                write!(f, "food ({}, {}) sits on the snake", pos.x, pos.y)
            }
        }
    }
}

impl std::error::Error for RestoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RestoreError::Layout(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for RestoreError {
    fn from(err: ConfigError) -> Self {
        RestoreError::Layout(err)
    }
}

/// The game engine that owns one game state and all rules applied to it.
///
/// A fresh engine sits in [`Phase::Ready`] until the first [`reset`].
/// All mutation goes through `reset`, `set_heading`, `toggle_pause` and
/// `tick`; none of them block or know about wall-clock time.
///
/// [`reset`]: GameEngine::reset
pub struct GameEngine {
    config: GameConfig,
    state: GameState,
    rng: StdRng,
}

impl GameEngine {
    /// Create a new game engine with the given configuration
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create an engine whose food placement is reproducible
    pub fn with_seed(config: GameConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: GameConfig, rng: StdRng) -> Result<Self, ConfigError> {
        config.validate()?;

        let snake = initial_snake(config.grid_size, config.initial_snake_length);
        let mut state = GameState::new(snake, Direction::Right, Position::new(0, 0), config.grid_size);
        state.phase = Phase::Ready;

        let mut engine = Self { config, state, rng };
        engine.place_food();
        Ok(engine)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Start a new game with the configured board. The high score carries
    /// over, everything else starts fresh.
    pub fn reset(&mut self) -> &GameState {
        let high_score = self.state.high_score;
        let grid_size = self.config.grid_size;
        let snake = initial_snake(grid_size, self.config.initial_snake_length);

        self.state = GameState::new(snake, Direction::Right, Position::new(0, 0), grid_size);
        self.state.high_score = high_score;
        self.place_food();

        info!(
            grid_size,
            length = self.state.snake.len(),
            high_score,
            "new game started"
        );
        &self.state
    }

    /// Start a new game on a different board. Rejected layouts leave the
    /// engine untouched.
    pub fn reset_with(
        &mut self,
        grid_size: usize,
        initial_length: usize,
    ) -> Result<&GameState, ConfigError> {
        validate_layout(grid_size, initial_length)?;
        self.config.grid_size = grid_size;
        self.config.initial_snake_length = initial_length;
        Ok(self.reset())
    }

    /// Replace the whole state with a snapshot, e.g. one taken earlier
    /// from [`GameEngine::state`]. Rejected snapshots leave the engine
    /// untouched.
    pub fn restore(&mut self, state: GameState) -> Result<(), RestoreError> {
        check_snapshot(&state, self.config.initial_snake_length)?;
        self.config.grid_size = state.grid_size;
        self.state = state;
        Ok(())
    }

    /// Queue a new heading for the next tick. Returns false when the turn
    /// is rejected.
    pub fn set_heading(&mut self, heading: Direction) -> bool {
        if !matches!(self.state.phase, Phase::Running | Phase::Paused) {
            return false;
        }
        if self.state.heading.is_opposite(heading) {
            debug!(current = ?self.state.heading, requested = ?heading, "reversal rejected");
            return false;
        }
        self.state.heading = heading;
        true
    }

    /// Flip between running and paused. Returns whether the game is paused
    /// afterwards.
    pub fn toggle_pause(&mut self) -> bool {
        self.state.phase = match self.state.phase {
            Phase::Running => Phase::Paused,
            Phase::Paused => Phase::Running,
            other => other,
        };
        self.state.is_paused()
    }

    /// Advance the game by one cell
    pub fn tick(&mut self) -> TickResult {
        if self.state.phase != Phase::Running {
            return TickResult::default();
        }

        let new_head = self.state.snake.head().moved_in_direction(self.state.heading);
        let ate_food = new_head == self.state.food;

        if let Some(collision) = self.check_collision(new_head, ate_food) {
            let event = self.finish(GameOverReason::Collision(collision));
            return TickResult {
                ate_food: false,
                game_over: Some(event),
            };
        }

        self.state.snake.advance(new_head, ate_food);

        if ate_food {
            self.state.score = self.state.score.saturating_add(self.config.points_per_food);
            debug!(score = self.state.score, length = self.state.snake.len(), "food eaten");

            if self.place_food().is_none() {
                let event = self.finish(GameOverReason::BoardFilled);
                return TickResult {
                    ate_food,
                    game_over: Some(event),
                };
            }
        }

        TickResult {
            ate_food,
            game_over: None,
        }
    }

    /// Move the food to a random cell not covered by the snake. Returns
    /// `None`, leaving the food where it was, when the board is full.
    ///
    /// Uses rejection sampling, so the expected number of draws grows as
    /// the snake approaches filling the board.
    pub fn place_food(&mut self) -> Option<Position> {
        let food = random_free_cell(&mut self.rng, self.state.grid_size, &self.state.snake)?;
        self.state.food = food;
        debug!(x = food.x, y = food.y, "food placed");
        Some(food)
    }

    /// Check if the new head position causes a collision
    fn check_collision(&self, pos: Position, ate_food: bool) -> Option<CollisionType> {
        if !self.state.is_in_bounds(pos) {
            return Some(CollisionType::Wall);
        }

        let hit_body = match self.config.self_collision {
            SelfCollisionRule::Strict => self.state.snake.collides_with_body(pos),
            SelfCollisionRule::Vacating if ate_food => self.state.snake.collides_with_body(pos),
            SelfCollisionRule::Vacating => self.state.snake.collides_with_body_before_tail(pos),
        };
        hit_body.then_some(CollisionType::SelfCollision)
    }

    fn finish(&mut self, reason: GameOverReason) -> GameOverEvent {
        self.state.phase = Phase::GameOver;
        self.state.high_score = self.state.high_score.max(self.state.score);

        let event = GameOverEvent {
            final_score: self.state.score,
            high_score: self.state.high_score,
            reason,
        };
        info!(
            final_score = event.final_score,
            high_score = event.high_score,
            reason = ?event.reason,
            "game over"
        );
        event
    }
}

/// The board must still fit a fresh game, and the snake must be a
/// non-empty set of distinct on-board cells. Food may only overlap the
/// snake once the board is full.
fn check_snapshot(state: &GameState, initial_length: usize) -> Result<(), RestoreError> {
    validate_layout(state.grid_size, initial_length)?;
    if state.snake.is_empty() {
        return Err(RestoreError::EmptySnake);
    }

    let mut seen = HashSet::with_capacity(state.snake.len());
    for &segment in &state.snake.body {
        if !state.is_in_bounds(segment) {
            return Err(RestoreError::SegmentOutOfBounds(segment));
        }
        if !seen.insert(segment) {
            return Err(RestoreError::DuplicateSegment(segment));
        }
    }

    if !state.is_in_bounds(state.food) {
        return Err(RestoreError::FoodOutOfBounds(state.food));
    }
    if state.is_occupied_by_snake(state.food) && state.free_cells() > 0 {
        return Err(RestoreError::FoodOnSnake(state.food));
    }
    Ok(())
}

/// Horizontal starting snake: head at a quarter of the width on the middle
/// row, body trailing to the left.
pub fn initial_snake(grid_size: usize, length: usize) -> Snake {
    let head = Position::new((grid_size / 4) as i32, (grid_size / 2) as i32);
    Snake::new(head, Direction::Right, length)
}

/// Draw uniformly random cells until one is not covered by the snake
pub fn random_free_cell<R: Rng + ?Sized>(
    rng: &mut R,
    grid_size: usize,
    snake: &Snake,
) -> Option<Position> {
    let side = i32::try_from(grid_size).ok()?;
    let cells = grid_size.checked_mul(grid_size)?;
    if cells <= snake.len() {
        return None;
    }

    loop {
        let x = rng.gen_range(0..side);
        let y = rng.gen_range(0..side);
        let pos = Position::new(x, y);

        if !snake.contains(pos) {
            return Some(pos);
        }
    }
}
