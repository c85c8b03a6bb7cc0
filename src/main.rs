use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tick_snake::game::{GameConfig, SelfCollisionRule};
use tick_snake::modes::HeadlessMode;
use tokio::io::{BufReader, stdin, stdout};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tick_snake")]
#[command(version, about = "Snake game engine driven by text commands on stdin")]
struct Cli {
    /// JSON file with game settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Cells per side of the board
    #[arg(long)]
    grid_size: Option<usize>,

    /// Milliseconds between ticks
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Initial snake length
    #[arg(long)]
    initial_length: Option<usize>,

    /// Points per food eaten
    #[arg(long)]
    points: Option<u32>,

    /// Whether the cell the tail is leaving counts as occupied
    #[arg(long, value_enum)]
    self_collision: Option<CollisionRule>,

    /// Seed for food placement
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum CollisionRule {
    /// The tail cell is always solid
    Strict,
    /// The tail cell may be entered when it is being vacated
    Vacating,
}

impl From<CollisionRule> for SelfCollisionRule {
    fn from(rule: CollisionRule) -> Self {
        match rule {
            CollisionRule::Strict => SelfCollisionRule::Strict,
            CollisionRule::Vacating => SelfCollisionRule::Vacating,
        }
    }
}

impl Cli {
    fn game_config(&self) -> Result<GameConfig> {
        let mut config = match &self.config {
            Some(path) => GameConfig::from_json_file(path)?,
            None => GameConfig::default(),
        };

        if let Some(grid_size) = self.grid_size {
            config.grid_size = grid_size;
        }
        if let Some(tick_ms) = self.tick_ms {
            config.tick_interval_ms = tick_ms;
        }
        if let Some(length) = self.initial_length {
            config.initial_snake_length = length;
        }
        if let Some(points) = self.points {
            config.points_per_food = points;
        }
        if let Some(rule) = self.self_collision {
            config.self_collision = rule.into();
        }

        config.validate().context("Invalid game configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only events
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.game_config()?;

    let mode = HeadlessMode::new(config, cli.seed)?;
    let summary = mode.run(BufReader::new(stdin()), stdout()).await?;

    tracing::info!(
        games_played = summary.games_played,
        high_score = summary.high_score,
        "exiting"
    );

    Ok(())
}
