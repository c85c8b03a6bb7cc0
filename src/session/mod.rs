//! Session actor that owns a [`GameEngine`] and drives it on a fixed cadence
//!
//! One task owns the engine. Any number of [`SessionHandle`] clones send
//! [`Command`]s over a channel, so turns coming from an input task and ticks
//! coming from the timer are applied strictly one after another. Observers
//! read the latest snapshot through a watch channel or subscribe to the
//! [`SessionEvent`] stream.

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::game::{Direction, GameEngine, GameOverEvent, GameState, Phase};

/// Commands waiting for the session task; senders wait once it is full
pub const COMMAND_CAPACITY: usize = 32;
const EVENT_CAPACITY: usize = 256;

/// Input accepted by a running session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetHeading(Direction),
    /// Start a new game ("play again")
    Reset,
    TogglePause,
    /// Acknowledge a game over without starting a new game
    Dismiss,
    Shutdown,
}

/// Everything a presentation layer needs to react to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    StateChanged { state: GameState },
    GameOver(GameOverEvent),
    HeadingRejected { requested: Direction },
    Dismissed,
}

/// Returned when the session task ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub games_played: u32,
    pub high_score: u32,
    pub final_state: GameState,
}

/// The session task has already stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClosed;

impl fmt::Display for SessionClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "game session has shut down")
    }
}

impl std::error::Error for SessionClosed {}

/// Cloneable handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<GameState>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    /// Queue a command, waiting while the session is behind
    pub async fn send(&self, command: Command) -> Result<(), SessionClosed> {
        self.commands.send(command).await.map_err(|_| SessionClosed)
    }

    pub async fn set_heading(&self, heading: Direction) -> Result<(), SessionClosed> {
        self.send(Command::SetHeading(heading)).await
    }

    pub async fn reset(&self) -> Result<(), SessionClosed> {
        self.send(Command::Reset).await
    }

    pub async fn toggle_pause(&self) -> Result<(), SessionClosed> {
        self.send(Command::TogglePause).await
    }

    pub async fn dismiss(&self) -> Result<(), SessionClosed> {
        self.send(Command::Dismiss).await
    }

    pub async fn shutdown(&self) -> Result<(), SessionClosed> {
        self.send(Command::Shutdown).await
    }

    /// Latest published state
    pub fn snapshot(&self) -> GameState {
        self.snapshots.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<GameState> {
        self.snapshots.clone()
    }

    /// Receive every event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

pub struct Session {
    engine: GameEngine,
    commands: mpsc::Receiver<Command>,
    snapshots: watch::Sender<GameState>,
    events: broadcast::Sender<SessionEvent>,
    tick_interval: Duration,
    games_played: u32,
}

impl Session {
    /// Move `engine` into a new task that ticks every `tick_interval`
    pub fn spawn(
        engine: GameEngine,
        tick_interval: Duration,
    ) -> (SessionHandle, JoinHandle<SessionSummary>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (snapshot_tx, snapshot_rx) = watch::channel(engine.state().clone());
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);

        let handle = SessionHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            events: event_tx.clone(),
        };
        let session = Session {
            engine,
            commands: command_rx,
            snapshots: snapshot_tx,
            events: event_tx,
            tick_interval,
            games_played: 0,
        };

        (handle, tokio::spawn(session.run()))
    }

    async fn run(mut self) -> SessionSummary {
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => {
                    match command {
                        Some(Command::Shutdown) | None => break,
                        Some(command) => self.apply(command, &mut ticker),
                    }
                }

                _ = ticker.tick() => {
                    if self.engine.phase() == Phase::Running {
                        self.on_tick();
                    }
                }
            }
        }

        let final_state = self.engine.state().clone();
        info!(
            games_played = self.games_played,
            high_score = final_state.high_score,
            "session finished"
        );

        SessionSummary {
            games_played: self.games_played,
            high_score: final_state.high_score,
            final_state,
        }
    }

    fn apply(&mut self, command: Command, ticker: &mut Interval) {
        debug!(?command, "applying command");

        match command {
            Command::SetHeading(heading) => {
                if self.engine.set_heading(heading) {
                    self.publish();
                } else {
                    self.emit(SessionEvent::HeadingRejected { requested: heading });
                }
            }
            Command::Reset => {
                self.engine.reset();
                // First move happens one full interval after the new game starts
                ticker.reset();
                self.publish();
            }
            Command::TogglePause => {
                self.engine.toggle_pause();
                self.publish();
            }
            Command::Dismiss => self.emit(SessionEvent::Dismissed),
            Command::Shutdown => {}
        }
    }

    fn on_tick(&mut self) {
        let result = self.engine.tick();
        self.publish();

        if let Some(event) = result.game_over {
            self.games_played += 1;
            self.emit(SessionEvent::GameOver(event));
        }
    }

    fn publish(&mut self) {
        let state = self.engine.state().clone();
        self.snapshots.send_replace(state.clone());
        self.emit(SessionEvent::StateChanged { state });
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine; the watch channel still holds the state.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{CollisionType, GameConfig, GameOverReason, Position};

    const TICK: Duration = Duration::from_millis(150);

    fn spawn_session(seed: u64) -> (SessionHandle, JoinHandle<SessionSummary>) {
        let engine = GameEngine::with_seed(GameConfig::default(), seed).unwrap();
        Session::spawn(engine, TICK)
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_until_reset() {
        let (handle, task) = spawn_session(1);

        tokio::time::sleep(TICK * 10).await;
        assert_eq!(handle.snapshot().phase, Phase::Ready);

        handle.shutdown().await.unwrap();
        let summary = task.await.unwrap();
        assert_eq!(summary.games_played, 0);
        assert_eq!(summary.final_state.phase, Phase::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_into_wall() {
        let (handle, task) = spawn_session(5);
        let mut events = handle.subscribe();

        handle.reset().await.unwrap();

        let game_over = loop {
            if let SessionEvent::GameOver(event) = events.recv().await.unwrap() {
                break event;
            }
        };

        assert_eq!(
            game_over.reason,
            GameOverReason::Collision(CollisionType::Wall)
        );
        let state = handle.snapshot();
        assert_eq!(state.phase, Phase::GameOver);
        assert_eq!(state.snake.head(), Position::new(19, 10));
        assert_eq!(game_over.final_score, state.score);
        assert_eq!(game_over.high_score, state.high_score);

        handle.shutdown().await.unwrap();
        let summary = task.await.unwrap();
        assert_eq!(summary.games_played, 1);
        assert_eq!(summary.high_score, state.high_score);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_stops_ticks() {
        let (handle, task) = spawn_session(2);

        handle.reset().await.unwrap();
        handle.toggle_pause().await.unwrap();
        tokio::time::sleep(TICK * 10).await;

        let paused = handle.snapshot();
        assert_eq!(paused.phase, Phase::Paused);
        assert_eq!(paused.snake.head(), Position::new(5, 10));

        handle.toggle_pause().await.unwrap();
        tokio::time::sleep(TICK + Duration::from_millis(10)).await;

        let resumed = handle.snapshot();
        assert_eq!(resumed.phase, Phase::Running);
        assert!(resumed.snake.head().x > 5);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_heading_is_reported() {
        let (handle, task) = spawn_session(3);
        let mut events = handle.subscribe();

        handle.reset().await.unwrap();
        handle.set_heading(Direction::Left).await.unwrap();
        handle.set_heading(Direction::Up).await.unwrap();

        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::StateChanged { ref state } if state.phase == Phase::Running
        ));
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::HeadingRejected {
                requested: Direction::Left
            }
        );
        match events.recv().await.unwrap() {
            SessionEvent::StateChanged { state } => assert_eq!(state.heading, Direction::Up),
            other => panic!("unexpected event {other:?}"),
        }

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_keeps_game_over() {
        let (handle, task) = spawn_session(4);
        let mut events = handle.subscribe();

        handle.reset().await.unwrap();
        loop {
            if let SessionEvent::GameOver(_) = events.recv().await.unwrap() {
                break;
            }
        }
        let frozen = handle.snapshot();

        handle.dismiss().await.unwrap();
        assert_eq!(events.recv().await.unwrap(), SessionEvent::Dismissed);
        tokio::time::sleep(TICK * 3).await;
        assert_eq!(handle.snapshot(), frozen);

        // "Play again" starts a fresh game with the high score kept
        handle.reset().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        let restarted = handle.snapshot();
        assert_eq!(restarted.phase, Phase::Running);
        assert_eq!(restarted.score, 0);
        assert_eq!(restarted.high_score, frozen.high_score);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_from_many_handles() {
        let (handle, task) = spawn_session(6);
        handle.reset().await.unwrap();

        let producers: Vec<_> = [Direction::Up, Direction::Down]
            .into_iter()
            .map(|heading| {
                let handle = handle.clone();
                tokio::spawn(async move { handle.set_heading(heading).await })
            })
            .collect();
        for producer in producers {
            producer.await.unwrap().unwrap();
        }
        tokio::time::sleep(Duration::from_millis(1)).await;

        // Up and Down are opposites, so the second one applied is rejected
        let heading = handle.snapshot().heading;
        assert!(heading == Direction::Up || heading == Direction::Down);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_queue_waits_instead_of_dropping() {
        let (handle, task) = spawn_session(8);
        handle.reset().await.unwrap();

        // More commands than the queue holds; every one must be applied
        for _ in 0..COMMAND_CAPACITY * 3 {
            handle.toggle_pause().await.unwrap();
        }
        handle.toggle_pause().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;

        let state = handle.snapshot();
        assert_eq!(state.phase, Phase::Paused);
        assert_eq!(state.snake.head(), Position::new(5, 10));

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_send_after_shutdown_fails() {
        let (handle, task) = spawn_session(7);

        handle.shutdown().await.unwrap();
        task.await.unwrap();

        assert_eq!(handle.reset().await, Err(SessionClosed));
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(SessionEvent::HeadingRejected {
            requested: Direction::Left,
        })
        .unwrap();
        assert_eq!(json["event"], "heading_rejected");
        assert_eq!(json["requested"], "left");

        let json = serde_json::to_value(SessionEvent::GameOver(GameOverEvent {
            final_score: 20,
            high_score: 40,
            reason: GameOverReason::Collision(CollisionType::Wall),
        }))
        .unwrap();
        assert_eq!(json["event"], "game_over");
        assert_eq!(json["final_score"], 20);
        assert_eq!(json["high_score"], 40);
    }
}
