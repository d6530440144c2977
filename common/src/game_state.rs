use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use crate::util::PseudoRandom;
use crate::{ARENA_HEIGHT, ARENA_WIDTH, CELL_SIZE, Direction, Position, Snake};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arena {
    pub width: i32,
    pub height: i32,
    pub cell_size: i32,
}

impl Default for Arena {
    fn default() -> Self {
        Arena {
            width: ARENA_WIDTH,
            height: ARENA_HEIGHT,
            cell_size: CELL_SIZE,
        }
    }
}

impl Arena {
    pub fn new(width: i32, height: i32, cell_size: i32) -> Result<Self> {
        ensure!(cell_size > 0, "Cell size must be positive, got {}", cell_size);
        ensure!(
            width > 0 && height > 0,
            "Arena must not be empty, got {}x{}",
            width,
            height
        );
        ensure!(
            width % cell_size == 0 && height % cell_size == 0,
            "Arena {}x{} is not a multiple of cell size {}",
            width,
            height,
            cell_size
        );
        Ok(Arena {
            width,
            height,
            cell_size,
        })
    }

    pub fn columns(&self) -> i32 {
        self.width / self.cell_size
    }

    pub fn rows(&self) -> i32 {
        self.height / self.cell_size
    }

    pub fn cell_count(&self) -> usize {
        (self.columns() * self.rows()) as usize
    }

    pub fn contains(&self, position: &Position) -> bool {
        position.x >= 0 && position.x < self.width && position.y >= 0 && position.y < self.height
    }

    /// Spawn point of a fresh snake: the centre cell of the grid
    pub fn origin(&self) -> Position {
        Position {
            x: (self.columns() / 2) * self.cell_size,
            y: (self.rows() / 2) * self.cell_size,
        }
    }

    /// Top-left corner of the cell with the given grid index (row major)
    pub fn cell_at(&self, index: usize) -> Position {
        let columns = self.columns() as usize;
        Position {
            x: (index % columns) as i32 * self.cell_size,
            y: (index / columns) as i32 * self.cell_size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Idle,
    Running,
    Paused,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    OutOfBounds,
    SelfCollision,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOverReport {
    pub final_score: u32,
    /// Best score known before this session started
    pub previous_best: u32,
    /// Best score after taking this session into account
    pub best_score: u32,
    pub is_new_record: bool,
    pub causes: Vec<DeathCause>,
    pub ticks: u32,
}

impl GameOverReport {
    /// Score to hand to the persistence collaborator, if any
    pub fn submission(&self) -> Option<u32> {
        (self.final_score > 0).then_some(self.final_score)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    Started,
    DirectionChanged { direction: Direction },
    FoodSpawned { position: Position },
    FoodEaten { position: Position, score: u32 },
    SnakeDied { cause: DeathCause },
    GameOver { report: GameOverReport },
    Paused,
    Resumed,
    Reset,
}

/// All mutable state of one game session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationState {
    pub tick: u32,
    pub arena: Arena,
    pub snake: Snake,
    pub direction: Direction,
    pub pending_direction: Option<Direction>,
    pub food: Option<Position>,
    pub score: u32,
    pub status: GameStatus,
}

impl SimulationState {
    /// Pre-start configuration: a single head at the arena origin heading right
    pub fn new(arena: Arena) -> Self {
        SimulationState {
            tick: 0,
            arena,
            snake: Snake::new(arena.origin()),
            direction: Direction::Right,
            pending_direction: None,
            food: None,
            score: 0,
            status: GameStatus::Idle,
        }
    }

    pub fn current_tick(&self) -> u32 {
        self.tick
    }

    /// Buffer a direction change for the next tick. A reversal of the
    /// current direction is ignored.
    pub fn queue_direction(&mut self, direction: Direction) -> bool {
        if self.direction.is_opposite(&direction) {
            return false;
        }
        self.pending_direction = Some(direction);
        true
    }

    /// Place food on a uniformly chosen cell not covered by the snake.
    /// Leaves the arena without food when the snake covers every cell.
    pub fn spawn_food(&mut self, rng: &mut PseudoRandom) -> Option<Position> {
        let free_cells: Vec<Position> = (0..self.arena.cell_count())
            .map(|index| self.arena.cell_at(index))
            .filter(|cell| !self.snake.contains_point(cell, true))
            .collect();

        self.food = if free_cells.is_empty() {
            None
        } else {
            Some(free_cells[rng.next_below(free_cells.len())])
        };
        self.food
    }

    /// Advance the simulation by one step. Returns the emitted events and the
    /// terminal causes detected during the step; the caller owns the status
    /// transition to `GameOver`.
    pub fn tick_forward(&mut self, rng: &mut PseudoRandom) -> (Vec<GameEvent>, Vec<DeathCause>) {
        let mut events = Vec::new();
        let mut causes = Vec::new();

        if let Some(direction) = self.pending_direction.take() {
            if direction != self.direction {
                self.direction = direction;
                events.push(GameEvent::DirectionChanged { direction });
            }
        }

        let vacated = self.snake.step_forward(self.direction, self.arena.cell_size);
        self.tick += 1;

        let head = self.snake.head();
        if !self.arena.contains(&head) {
            causes.push(DeathCause::OutOfBounds);
        }
        if self.snake.head_overlaps_body() {
            causes.push(DeathCause::SelfCollision);
        }

        if !causes.is_empty() {
            events.extend(causes.iter().map(|&cause| GameEvent::SnakeDied { cause }));
            return (events, causes);
        }

        if self.food == Some(head) {
            self.score += 1;
            self.snake.grow(vacated);
            events.push(GameEvent::FoodEaten {
                position: head,
                score: self.score,
            });
            if let Some(position) = self.spawn_food(rng) {
                events.push(GameEvent::FoodSpawned { position });
            }
        }

        (events, causes)
    }
}
