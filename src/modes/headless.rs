use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{info, warn};

use crate::game::{GameConfig, GameEngine};
use crate::input::{InputAction, InputHandler};
use crate::session::{Session, SessionEvent, SessionSummary};

/// Line-oriented driver: text commands in, one JSON event per line out
pub struct HeadlessMode {
    engine: GameEngine,
    input_handler: InputHandler,
}

impl HeadlessMode {
    pub fn new(config: GameConfig, seed: Option<u64>) -> Result<Self> {
        let engine = match seed {
            Some(seed) => GameEngine::with_seed(config, seed),
            None => GameEngine::new(config),
        }
        .context("Invalid game configuration")?;

        Ok(Self {
            engine,
            input_handler: InputHandler::new(),
        })
    }

    /// Run until `quit`, end of input or Ctrl+C. Events still queued when
    /// the session stops are written before returning.
    pub async fn run<R, W>(self, reader: R, mut writer: W) -> Result<SessionSummary>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let HeadlessMode {
            engine,
            input_handler,
        } = self;
        let tick_interval = engine.config().tick_interval();

        let (handle, task) = Session::spawn(engine, tick_interval);
        let mut events = handle.subscribe();
        let mut lines = reader.lines();

        info!(?tick_interval, "headless session started");
        let initial = SessionEvent::StateChanged {
            state: handle.snapshot(),
        };
        write_event(&mut writer, &initial).await?;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("Failed to read input")? else {
                        break;
                    };
                    match input_handler.parse_line(&line) {
                        InputAction::Command(command) => handle.send(command).await?,
                        InputAction::Quit => break,
                        InputAction::None => {}
                        InputAction::Unknown(word) => warn!(%word, "ignoring unknown command"),
                    }
                }

                event = events.recv() => {
                    match event {
                        Ok(event) => write_event(&mut writer, &event).await?,
                        Err(RecvError::Lagged(skipped)) => warn!(skipped, "output fell behind, events dropped"),
                        Err(RecvError::Closed) => break,
                    }
                }

                _ = tokio::signal::ctrl_c() => break,
            }
        }

        handle.shutdown().await?;
        let summary = task.await.context("Session task failed")?;

        loop {
            match events.try_recv() {
                Ok(event) => write_event(&mut writer, &event).await?,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "output fell behind, events dropped")
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        writer.flush().await.context("Failed to flush output")?;

        Ok(summary)
    }
}

async fn write_event<W: AsyncWrite + Unpin>(writer: &mut W, event: &SessionEvent) -> Result<()> {
    let mut line = serde_json::to_vec(event).context("Failed to encode event")?;
    line.push(b'\n');
    writer
        .write_all(&line)
        .await
        .context("Failed to write event")?;
    Ok(())
}
