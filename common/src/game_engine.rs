use anyhow::Result;
use log::{debug, info};

use crate::util::PseudoRandom;
use crate::{Arena, DeathCause, Direction, GameEvent, GameOverReport, GameStatus, SimulationState};

/// Single-session snake engine. Owns the simulation state and drives the
/// `Idle -> Running <-> Paused -> GameOver -> Idle` lifecycle. The engine never
/// schedules itself: a caller invokes `tick` once per tick interval while
/// the game is running.
pub struct GameEngine {
    state: SimulationState,
    rng: PseudoRandom,
    best_score: u32,
    best_before_session: u32,
    last_report: Option<GameOverReport>,
}

impl GameEngine {
    pub fn new(arena: Arena, rng_seed: u64) -> Self {
        Self::new_from_state(SimulationState::new(arena), rng_seed)
    }

    /// Wrap an existing state, e.g. a hand-built board in tests or a restored snapshot
    pub fn new_from_state(state: SimulationState, rng_seed: u64) -> Self {
        GameEngine {
            state,
            rng: PseudoRandom::new(rng_seed),
            best_score: 0,
            best_before_session: 0,
            last_report: None,
        }
    }

    pub fn with_best_score(mut self, best_score: u32) -> Self {
        self.set_best_score(best_score);
        self
    }

    /// Merge a best score reported by the account service. Never lowers the
    /// locally known best.
    pub fn set_best_score(&mut self, best_score: u32) {
        self.best_score = self.best_score.max(best_score);
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn status(&self) -> GameStatus {
        self.state.status
    }

    pub fn score(&self) -> u32 {
        self.state.score
    }

    pub fn best_score(&self) -> u32 {
        self.best_score
    }

    pub fn current_tick(&self) -> u32 {
        self.state.current_tick()
    }

    pub fn last_report(&self) -> Option<&GameOverReport> {
        self.last_report.as_ref()
    }

    /// Fraction of the best score reached in the current session, clamped to `0.0..=1.0`
    pub fn progress_to_best(&self) -> f32 {
        if self.best_before_session == 0 {
            return 0.0;
        }
        (self.state.score as f32 / self.best_before_session as f32).clamp(0.0, 1.0)
    }

    /// Begin a new session from the canonical start position. Any session in
    /// progress is discarded.
    pub fn start(&mut self) -> Vec<GameEvent> {
        self.state = SimulationState::new(self.state.arena);
        self.state.status = GameStatus::Running;
        self.best_before_session = self.best_score;
        self.last_report = None;

        let mut events = vec![GameEvent::Started];
        if let Some(position) = self.state.spawn_food(&mut self.rng) {
            events.push(GameEvent::FoodSpawned { position });
        }
        info!("Game started at {:?}, best score {}", self.state.snake.head(), self.best_score);
        events
    }

    /// Request a direction change for the next tick. Returns false when the
    /// request is ignored (reversal, or no active session).
    pub fn set_direction(&mut self, direction: Direction) -> bool {
        if !matches!(self.state.status, GameStatus::Running | GameStatus::Paused) {
            return false;
        }
        self.state.queue_direction(direction)
    }

    pub fn tick(&mut self) -> Vec<GameEvent> {
        if self.state.status != GameStatus::Running {
            return Vec::new();
        }

        let (mut events, causes) = self.state.tick_forward(&mut self.rng);
        if !causes.is_empty() {
            let report = self.finish(causes);
            events.push(GameEvent::GameOver { report });
        }
        events
    }

    pub fn pause(&mut self) -> bool {
        if self.state.status != GameStatus::Running {
            return false;
        }
        self.state.status = GameStatus::Paused;
        debug!("Game paused at tick {}", self.state.tick);
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.state.status != GameStatus::Paused {
            return false;
        }
        self.state.status = GameStatus::Running;
        debug!("Game resumed at tick {}", self.state.tick);
        true
    }

    /// Tear down the session and return to the pre-start configuration
    pub fn reset(&mut self) -> Vec<GameEvent> {
        self.state = SimulationState::new(self.state.arena);
        self.last_report = None;
        vec![GameEvent::Reset]
    }

    pub fn get_state_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.state)?)
    }

    fn finish(&mut self, causes: Vec<DeathCause>) -> GameOverReport {
        self.state.status = GameStatus::GameOver;

        let final_score = self.state.score;
        let is_new_record = final_score > self.best_before_session;
        self.best_score = self.best_score.max(final_score);

        let report = GameOverReport {
            final_score,
            previous_best: self.best_before_session,
            best_score: self.best_score,
            is_new_record,
            causes,
            ticks: self.state.tick,
        };
        info!(
            "Game over after {} ticks: score {}, causes {:?}, new record: {}",
            report.ticks, report.final_score, report.causes, report.is_new_record
        );
        self.last_report = Some(report.clone());
        report
    }
}
