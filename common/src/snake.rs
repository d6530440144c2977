use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }

    /// Position `distance` units away in the given direction
    pub fn step(&self, direction: Direction, distance: i32) -> Position {
        let (dx, dy) = direction.delta();
        Position {
            x: self.x + dx * distance,
            y: self.y + dy * distance,
        }
    }

    pub fn manhattan_distance(&self, other: &Position) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn is_opposite(&self, other: &Direction) -> bool {
        self.opposite() == *other
    }

    /// Unit vector in screen coordinates (y grows downwards)
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

/// The snake body. The head is stored apart from the rest of the body so a
/// snake can never be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snake {
    head: Position,
    body: VecDeque<Position>,
}

impl Snake {
    pub fn new(head: Position) -> Self {
        Snake {
            head,
            body: VecDeque::new(),
        }
    }

    /// Build a snake from segments ordered head first. Returns `None` for an
    /// empty list.
    pub fn from_segments(segments: impl IntoIterator<Item = Position>) -> Option<Self> {
        let mut iter = segments.into_iter();
        let head = iter.next()?;
        Some(Snake {
            head,
            body: iter.collect(),
        })
    }

    pub fn head(&self) -> Position {
        self.head
    }

    /// Last segment of the snake (the head for a single segment snake)
    pub fn tail(&self) -> Position {
        self.body.back().copied().unwrap_or(self.head)
    }

    pub fn length(&self) -> usize {
        self.body.len() + 1
    }

    /// All segments, head first
    pub fn segments(&self) -> impl Iterator<Item = Position> + '_ {
        std::iter::once(self.head).chain(self.body.iter().copied())
    }

    pub fn contains_point(&self, point: &Position, include_head: bool) -> bool {
        (include_head && self.head == *point) || self.body.contains(point)
    }

    /// True when the head shares a cell with any other segment
    pub fn head_overlaps_body(&self) -> bool {
        self.body.contains(&self.head)
    }

    /// Move the head one step of `distance` units. Every other segment takes
    /// the previous position of the segment in front of it. Returns the cell
    /// vacated by the tail.
    pub fn step_forward(&mut self, direction: Direction, distance: i32) -> Position {
        let old_head = self.head;
        self.head = old_head.step(direction, distance);
        if self.body.is_empty() {
            return old_head;
        }
        self.body.push_front(old_head);
        self.body.pop_back().unwrap_or(old_head)
    }

    /// Append a segment behind the current tail
    pub fn grow(&mut self, at: Position) {
        self.body.push_back(at);
    }
}
