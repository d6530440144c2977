use common::{
    Arena, DeathCause, Direction, GameEngine, GameEvent, GameStatus, Position, SimulationState,
    Snake, calculate_ai_move,
};

fn running_state(segments: &[(i32, i32)], direction: Direction) -> SimulationState {
    let mut state = SimulationState::new(Arena::default());
    state.snake = Snake::from_segments(segments.iter().map(|&(x, y)| Position::new(x, y)))
        .expect("at least one segment");
    state.direction = direction;
    state.status = GameStatus::Running;
    state
}

fn game_over_count(events: &[GameEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, GameEvent::GameOver { .. }))
        .count()
}

#[test]
fn start_places_single_head_at_origin() {
    let mut engine = GameEngine::new(Arena::default(), 1);
    assert_eq!(engine.status(), GameStatus::Idle);

    let events = engine.start();
    assert_eq!(events[0], GameEvent::Started);
    assert_eq!(engine.status(), GameStatus::Running);
    assert_eq!(engine.score(), 0);
    assert_eq!(engine.state().snake.length(), 1);
    assert_eq!(engine.state().snake.head(), Position::new(200, 200));
    assert_eq!(engine.state().direction, Direction::Right);

    let food = engine.state().food.expect("food spawned on start");
    assert_ne!(food, engine.state().snake.head());
    assert_eq!(food.x % 20, 0);
    assert_eq!(food.y % 20, 0);
}

#[test]
fn reverse_direction_never_changes_heading() {
    let mut engine = GameEngine::new(Arena::default(), 2);
    engine.start();
    for _ in 0..4 {
        let current = engine.state().direction;
        assert!(!engine.set_direction(current.opposite()));
        engine.tick();
        assert_eq!(engine.state().direction, current);
    }

    // Same rule for every heading
    for direction in Direction::ALL {
        let mut engine = GameEngine::new_from_state(running_state(&[(200, 200)], direction), 2);
        assert!(!engine.set_direction(direction.opposite()));
        engine.tick();
        assert_eq!(engine.state().direction, direction);
    }
}

#[test]
fn direction_change_is_applied_on_next_tick() {
    let mut engine = GameEngine::new_from_state(running_state(&[(200, 200)], Direction::Right), 3);
    assert!(engine.set_direction(Direction::Up));
    assert_eq!(engine.state().direction, Direction::Right);

    let events = engine.tick();
    assert!(events.contains(&GameEvent::DirectionChanged { direction: Direction::Up }));
    assert_eq!(engine.state().direction, Direction::Up);
    assert_eq!(engine.state().snake.head(), Position::new(200, 180));
}

#[test]
fn only_the_last_buffered_direction_counts() {
    let mut engine = GameEngine::new_from_state(running_state(&[(200, 200)], Direction::Right), 3);
    assert!(engine.set_direction(Direction::Up));
    assert!(engine.set_direction(Direction::Down));
    // Still checked against the current heading, not the buffered one
    assert!(!engine.set_direction(Direction::Left));
    engine.tick();
    assert_eq!(engine.state().snake.head(), Position::new(200, 220));
}

#[test]
fn leaving_the_right_edge_ends_the_game() {
    let mut engine = GameEngine::new_from_state(running_state(&[(380, 200)], Direction::Right), 4);
    let events = engine.tick();
    assert_eq!(engine.state().snake.head(), Position::new(400, 200));
    assert_eq!(engine.status(), GameStatus::GameOver);
    assert!(events.contains(&GameEvent::SnakeDied { cause: DeathCause::OutOfBounds }));
    assert_eq!(game_over_count(&events), 1);
}

#[test]
fn leaving_the_left_edge_ends_the_game() {
    let mut engine = GameEngine::new_from_state(running_state(&[(0, 200)], Direction::Left), 4);
    engine.tick();
    assert_eq!(engine.state().snake.head(), Position::new(-20, 200));
    assert_eq!(engine.status(), GameStatus::GameOver);
}

#[test]
fn running_straight_from_origin_hits_wall_after_ten_ticks() {
    let mut engine = GameEngine::new(Arena::default(), 5);
    engine.start();
    for _ in 0..9 {
        engine.tick();
        assert_eq!(engine.status(), GameStatus::Running);
    }
    engine.tick();
    assert_eq!(engine.status(), GameStatus::GameOver);
}

#[test]
fn turning_into_own_body_ends_the_game() {
    // Head at (100,100) heading up, body curls round to the right
    let state = running_state(
        &[(100, 100), (100, 120), (120, 120), (120, 100), (140, 100)],
        Direction::Up,
    );
    let mut engine = GameEngine::new_from_state(state, 6);
    assert!(engine.set_direction(Direction::Right));
    let events = engine.tick();

    assert_eq!(engine.status(), GameStatus::GameOver);
    assert!(events.contains(&GameEvent::SnakeDied { cause: DeathCause::SelfCollision }));
    let report = engine.last_report().expect("report recorded");
    assert_eq!(report.causes, vec![DeathCause::SelfCollision]);
}

#[test]
fn chasing_the_tail_is_safe() {
    // The tail vacates its cell in the same tick the head enters it
    let state = running_state(&[(100, 100), (100, 120), (120, 120), (120, 100)], Direction::Up);
    let mut engine = GameEngine::new_from_state(state, 6);
    engine.set_direction(Direction::Right);
    engine.tick();
    assert_eq!(engine.status(), GameStatus::Running);
    assert_eq!(engine.state().snake.head(), Position::new(120, 100));
}

#[test]
fn simultaneous_terminal_causes_raise_one_game_over() {
    let state = running_state(&[(380, 0), (360, 0), (400, 0), (340, 0)], Direction::Right);
    let mut engine = GameEngine::new_from_state(state, 7);
    let events = engine.tick();

    assert_eq!(game_over_count(&events), 1);
    let report = engine.last_report().expect("report recorded");
    assert_eq!(report.causes, vec![DeathCause::OutOfBounds, DeathCause::SelfCollision]);

    // Further ticks do nothing once the game is over
    assert!(engine.tick().is_empty());
}

#[test]
fn eating_food_grows_at_the_old_tail_and_scores() {
    let mut state = running_state(&[(200, 200), (180, 200)], Direction::Right);
    state.food = Some(Position::new(220, 200));
    let mut engine = GameEngine::new_from_state(state, 8);

    let events = engine.tick();
    assert_eq!(engine.score(), 1);
    assert_eq!(engine.state().snake.length(), 3);
    assert_eq!(engine.state().snake.tail(), Position::new(180, 200));
    assert!(events.contains(&GameEvent::FoodEaten { position: Position::new(220, 200), score: 1 }));

    let food = engine.state().food.expect("food respawned");
    assert!(!engine.state().snake.contains_point(&food, true));
}

#[test]
fn length_grows_by_one_per_food_and_never_shrinks() {
    for seed in 1..20u64 {
        let mut engine = GameEngine::new(Arena::default(), seed);
        engine.start();
        let mut length = engine.state().snake.length();
        let mut score = engine.score();

        for _ in 0..2_000 {
            if let Some(direction) = calculate_ai_move(engine.state()) {
                engine.set_direction(direction);
            }
            engine.tick();

            let new_length = engine.state().snake.length();
            let new_score = engine.score();
            assert!(new_length >= length);
            assert_eq!(new_length - length, (new_score - score) as usize);
            if let Some(food) = engine.state().food {
                assert!(!engine.state().snake.contains_point(&food, true), "food on snake");
            }

            length = new_length;
            score = new_score;
            if engine.status() != GameStatus::Running {
                break;
            }
        }
    }
}

#[test]
fn pause_freezes_and_resume_continues() {
    let mut engine = GameEngine::new_from_state(running_state(&[(200, 200)], Direction::Right), 9);
    assert!(engine.pause());
    assert!(!engine.pause());
    assert!(engine.tick().is_empty());
    assert_eq!(engine.state().snake.head(), Position::new(200, 200));

    // Direction requests are still buffered while paused
    assert!(engine.set_direction(Direction::Down));
    assert!(engine.resume());
    assert!(!engine.resume());
    engine.tick();
    assert_eq!(engine.state().snake.head(), Position::new(200, 220));
}

#[test]
fn pause_is_ignored_when_not_running() {
    let mut engine = GameEngine::new(Arena::default(), 10);
    assert!(!engine.pause());
    assert!(!engine.resume());
    assert!(!engine.set_direction(Direction::Up));
}

#[test]
fn zero_score_game_has_nothing_to_submit() {
    let mut engine = GameEngine::new_from_state(running_state(&[(380, 0)], Direction::Right), 11);
    engine.tick();
    let report = engine.last_report().expect("game over");
    assert_eq!(report.final_score, 0);
    assert_eq!(report.submission(), None);
    assert!(!report.is_new_record);
}

#[test]
fn new_record_is_reported_against_previous_best() {
    let mut state = running_state(&[(360, 0)], Direction::Right);
    state.food = Some(Position::new(380, 0));
    let mut engine = GameEngine::new_from_state(state, 12);

    engine.tick();
    assert_eq!(engine.score(), 1);
    engine.tick();

    let report = engine.last_report().expect("game over");
    assert_eq!(report.submission(), Some(1));
    assert!(report.is_new_record);
    assert_eq!(report.previous_best, 0);
    assert_eq!(engine.best_score(), 1);
}

#[test]
fn known_best_is_not_beaten_by_lower_score() {
    let mut engine = GameEngine::new(Arena::default(), 13).with_best_score(50);
    engine.start();
    for _ in 0..10 {
        engine.tick();
    }
    let report = engine.last_report().expect("game over");
    assert!(!report.is_new_record);
    assert_eq!(report.previous_best, 50);
    assert_eq!(engine.best_score(), 50);
}

#[test]
fn new_session_after_game_over_starts_fresh() {
    let mut state = running_state(&[(360, 0), (340, 0)], Direction::Right);
    state.food = Some(Position::new(380, 0));
    state.score = 4;
    let mut engine = GameEngine::new_from_state(state, 14);
    engine.tick();
    engine.tick();
    assert_eq!(engine.status(), GameStatus::GameOver);

    engine.start();
    assert_eq!(engine.status(), GameStatus::Running);
    assert_eq!(engine.score(), 0);
    assert_eq!(engine.state().snake.length(), 1);
    assert_eq!(engine.state().snake.head(), Position::new(200, 200));
    assert!(engine.last_report().is_none());
}

#[test]
fn reset_returns_to_idle() {
    let mut engine = GameEngine::new(Arena::default(), 15);
    engine.start();
    engine.tick();
    assert_eq!(engine.reset(), vec![GameEvent::Reset]);
    assert_eq!(engine.status(), GameStatus::Idle);
    assert_eq!(engine.state().food, None);
    assert_eq!(engine.current_tick(), 0);
    assert!(engine.tick().is_empty());
}

#[test]
fn state_serialises_for_renderers() {
    let mut engine = GameEngine::new(Arena::default(), 16);
    engine.start();
    let json = engine.get_state_json().expect("serialisable state");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    assert_eq!(value["status"], "Running");
    assert_eq!(value["score"], 0);
}
