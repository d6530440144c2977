use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use common::{
    DEFAULT_TICK_INTERVAL_MS, Direction, GameEngine, GameEvent, GameOverReport, GameStatus,
    calculate_ai_move,
};

use crate::service::ScoreService;

/// Player input, applied between ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Turn(Direction),
    Pause,
    Resume,
    Stop,
}

/// What the session reports back to whoever is displaying it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    Event(GameEvent),
    ScoreSaved { score: u32 },
    /// The local result stands; only the remote write failed
    ScoreNotSaved { score: u32, reason: String },
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub tick_interval: Duration,
    /// Let the greedy chooser steer instead of waiting for input
    pub autopilot: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            autopilot: false,
        }
    }
}

/// How a session ended
#[derive(Debug)]
pub struct SessionOutcome {
    /// Present when the game reached GameOver, absent when it was stopped
    pub report: Option<GameOverReport>,
    /// Background score submission, if one was started
    pub submission: Option<JoinHandle<()>>,
}

/// Runs one engine on a fixed tick until game over, stop, or cancellation
pub struct GameSession {
    engine: GameEngine,
    config: SessionConfig,
    user_id: Option<i32>,
    scores: Arc<dyn ScoreService>,
    notices: Option<mpsc::UnboundedSender<SessionNotice>>,
    cancel: CancellationToken,
}

impl GameSession {
    pub fn new(engine: GameEngine, scores: Arc<dyn ScoreService>, config: SessionConfig) -> Self {
        Self {
            engine,
            config,
            user_id: None,
            scores,
            notices: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Account the final score is submitted for. Without one nothing is submitted.
    pub fn with_user(mut self, user_id: i32) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_notices(mut self, notices: mpsc::UnboundedSender<SessionNotice>) -> Self {
        self.notices = Some(notices);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) -> SessionOutcome {
        if matches!(self.engine.status(), GameStatus::Idle | GameStatus::GameOver) {
            let events = self.engine.start();
            self.publish(events);
        }

        let period = self.config.tick_interval;
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut inputs_open = true;

        info!(
            tick_ms = period.as_millis() as u64,
            autopilot = self.config.autopilot,
            "Session started"
        );

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Session cancelled at tick {}", self.engine.current_tick());
                    break;
                }
                command = commands.recv(), if inputs_open => {
                    match command {
                        Some(SessionCommand::Stop) => {
                            info!("Session stopped at tick {}", self.engine.current_tick());
                            break;
                        }
                        Some(command) => {
                            if self.apply(command) {
                                interval.reset();
                            }
                        }
                        None => {
                            debug!("Input channel closed");
                            inputs_open = false;
                            // Nothing can resume a paused game any more
                            if self.engine.status() != GameStatus::Running {
                                info!("Session stopped at tick {}", self.engine.current_tick());
                                break;
                            }
                        }
                    }
                }
                _ = interval.tick(), if self.engine.status() == GameStatus::Running => {
                    if self.config.autopilot {
                        if let Some(direction) = calculate_ai_move(self.engine.state()) {
                            self.engine.set_direction(direction);
                        }
                    }

                    let events = self.engine.tick();
                    self.publish(events);

                    if self.engine.status() == GameStatus::GameOver {
                        break;
                    }
                }
            }
        }

        self.cancel.cancel();
        self.finish()
    }

    /// Apply one input. Returns true when the tick schedule should restart.
    fn apply(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::Turn(direction) => {
                if !self.engine.set_direction(direction) {
                    debug!(?direction, "Direction change ignored");
                }
                false
            }
            SessionCommand::Pause => {
                if self.engine.pause() {
                    self.publish(vec![GameEvent::Paused]);
                }
                false
            }
            SessionCommand::Resume => {
                let resumed = self.engine.resume();
                if resumed {
                    self.publish(vec![GameEvent::Resumed]);
                }
                resumed
            }
            SessionCommand::Stop => false,
        }
    }

    fn finish(self) -> SessionOutcome {
        let report = self.engine.last_report().cloned();
        let submission = match (&report, self.user_id) {
            (Some(report), Some(user_id)) => report.submission().map(|score| {
                spawn_submission(self.scores.clone(), self.notices.clone(), user_id, score)
            }),
            _ => None,
        };

        if let Some(report) = &report {
            info!(
                score = report.final_score,
                best = report.best_score,
                new_record = report.is_new_record,
                "Game over after {} ticks",
                report.ticks
            );
        }

        SessionOutcome { report, submission }
    }

    fn publish(&self, events: Vec<GameEvent>) {
        let Some(notices) = &self.notices else {
            return;
        };
        for event in events {
            // Nobody listening is fine
            let _ = notices.send(SessionNotice::Event(event));
        }
    }
}

fn spawn_submission(
    scores: Arc<dyn ScoreService>,
    notices: Option<mpsc::UnboundedSender<SessionNotice>>,
    user_id: i32,
    score: u32,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let notice = match scores.submit_score(user_id, score).await {
            Ok(_) => {
                info!(user_id, score, "Score submitted");
                SessionNotice::ScoreSaved { score }
            }
            Err(e) => {
                warn!(user_id, score, "Failed to submit score: {}", e);
                SessionNotice::ScoreNotSaved {
                    score,
                    reason: e.to_string(),
                }
            }
        };
        if let Some(notices) = notices {
            let _ = notices.send(notice);
        }
    })
}
