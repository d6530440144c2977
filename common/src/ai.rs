use crate::{Direction, GameStatus, Position, SimulationState};

/// Basic autopilot that heads for the food while avoiding walls and its own body.
/// Returns `None` when the session is not running.
pub fn calculate_ai_move(state: &SimulationState) -> Option<Direction> {
    if state.status != GameStatus::Running {
        return None;
    }

    let head = state.snake.head();
    let current_direction = state.pending_direction.unwrap_or(state.direction);
    let target = state.food.unwrap_or_else(|| state.arena.origin());
    let step = state.arena.cell_size;

    let mut best_direction = current_direction;
    let mut best_score = i32::MIN;

    for direction in Direction::ALL {
        // Reversal requests are ignored by the engine, so never choose one
        if state.direction.is_opposite(&direction) {
            continue;
        }

        let new_pos = head.step(direction, step);
        if !is_safe(state, &new_pos) {
            continue;
        }

        let mut score = 0;

        // Prefer moving toward food
        score -= new_pos.manhattan_distance(&target) / step * 10;

        let escape_routes = count_escape_routes(state, &new_pos);
        if escape_routes == 0 {
            continue;
        }
        score += escape_routes as i32 * 5;

        // Keep going straight on ties
        if direction == current_direction {
            score += 1;
        }

        if score > best_score {
            best_score = score;
            best_direction = direction;
        }
    }

    Some(best_direction)
}

/// A cell is safe when it is inside the arena and not covered by the body
/// after the next shift (the tail end moves away).
fn is_safe(state: &SimulationState, pos: &Position) -> bool {
    if !state.arena.contains(pos) {
        return false;
    }
    let length = state.snake.length();
    !state
        .snake
        .segments()
        .take(length.saturating_sub(1))
        .any(|segment| segment == *pos)
}

fn count_escape_routes(state: &SimulationState, pos: &Position) -> u8 {
    let mut count = 0;
    for direction in Direction::ALL {
        let next = pos.step(direction, state.arena.cell_size);
        if next != state.snake.head() && is_safe(state, &next) {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Arena, Snake};

    fn running_state() -> SimulationState {
        let mut state = SimulationState::new(Arena::default());
        state.status = GameStatus::Running;
        state
    }

    #[test]
    fn heads_toward_food() {
        let mut state = running_state();
        state.food = Some(Position::new(200, 100));
        assert_eq!(calculate_ai_move(&state), Some(Direction::Up));
    }

    #[test]
    fn never_reverses() {
        let mut state = running_state();
        state.food = Some(Position::new(0, 200));
        let choice = calculate_ai_move(&state);
        assert_ne!(choice, Some(Direction::Left));
    }

    #[test]
    fn avoids_the_wall() {
        let mut state = running_state();
        state.snake = Snake::new(Position::new(380, 0));
        state.food = Some(Position::new(380, 380));
        let choice = calculate_ai_move(&state);
        assert_eq!(choice, Some(Direction::Down));
    }

    #[test]
    fn idle_game_has_no_move() {
        let state = SimulationState::new(Arena::default());
        assert_eq!(calculate_ai_move(&state), None);
    }
}
