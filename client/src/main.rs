use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use client::{
    AccountService, GameSession, LocalStore, RemoteStore, ScoreService, SessionCommand,
    SessionConfig, SessionNotice, Store,
};
use common::api::Account;
use common::leaderboard::{parse_sort_selection, rank};
use common::{Arena, DEFAULT_TICK_INTERVAL_MS, Direction, GameEngine, GameEvent, SortKey, SortOrder};

#[derive(Parser, Debug)]
#[command(
    name = "snake-arena",
    about = "Play Snake Arena and manage your account from the terminal"
)]
struct Args {
    /// Base HTTP URL of the API server (e.g. http://localhost:3000)
    #[arg(long, default_value = "http://localhost:3000")]
    server: String,

    /// Keep accounts and scores in this JSON file instead of using a server
    #[arg(long)]
    local: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct Credentials {
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account
    Register {
        #[arg(long)]
        nickname: String,
        #[command(flatten)]
        credentials: Credentials,
    },
    /// Check credentials and show the account
    Login {
        #[command(flatten)]
        credentials: Credentials,
    },
    /// Play one game. Steer with w/a/s/d, p to pause, r to resume, q to quit.
    Play {
        #[arg(long, requires = "password")]
        email: Option<String>,
        #[arg(long, requires = "email")]
        password: Option<String>,
        /// Milliseconds between ticks
        #[arg(long, default_value_t = DEFAULT_TICK_INTERVAL_MS)]
        tick_ms: u64,
        /// Let the built-in chooser steer
        #[arg(long)]
        autopilot: bool,
        /// Seed for food placement
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show the leaderboard
    Leaderboard {
        /// score_desc | score_asc | name_asc | name_desc
        #[arg(long, default_value = "score_desc")]
        sort: String,
        /// Highlight this account's place
        #[arg(long)]
        user_id: Option<i32>,
    },
    /// Change the nickname
    Rename {
        #[command(flatten)]
        credentials: Credentials,
        #[arg(long)]
        nickname: String,
    },
    /// Set or clear the avatar
    Avatar {
        #[command(flatten)]
        credentials: Credentials,
        /// Image reference; omit to clear
        #[arg(long)]
        image: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let args = Args::parse();

    match args.local {
        Some(path) => {
            let store = LocalStore::open(&path)
                .await
                .with_context(|| format!("Failed to open local store {}", path.display()))?;
            info!("Using local store at {}", store.path().display());
            run(args.command, Arc::new(store)).await
        }
        None => {
            let store = RemoteStore::new(&args.server)?;
            info!("Using server at {}", store.base_url());
            run(args.command, Arc::new(store)).await
        }
    }
}

async fn run<S: Store + 'static>(command: Command, store: Arc<S>) -> Result<()> {
    match command {
        Command::Register {
            nickname,
            credentials,
        } => {
            let account = store
                .register(&nickname, &credentials.email, &credentials.password)
                .await?;
            println!("Registered {} (id {})", account.nickname, account.id);
        }
        Command::Login { credentials } => {
            let account = login(store.as_ref(), &credentials).await?;
            print_account(&account);
        }
        Command::Play {
            email,
            password,
            tick_ms,
            autopilot,
            seed,
        } => {
            let account = match (email, password) {
                (Some(email), Some(password)) => {
                    Some(login(store.as_ref(), &Credentials { email, password }).await?)
                }
                _ => None,
            };
            let config = SessionConfig {
                tick_interval: Duration::from_millis(tick_ms.max(1)),
                autopilot,
            };
            play(store, account, config, seed).await?;
        }
        Command::Leaderboard { sort, user_id } => {
            let (sort_key, order) = parse_sort_selection(&sort);
            show_leaderboard(store.as_ref(), sort_key, order, user_id).await?;
        }
        Command::Rename {
            credentials,
            nickname,
        } => {
            let account = login(store.as_ref(), &credentials).await?;
            let account = store.rename_account(account.id, &nickname).await?;
            println!("Nickname changed to {}", account.nickname);
            show_leaderboard(store.as_ref(), SortKey::Score, SortOrder::Descending, Some(account.id))
                .await?;
        }
        Command::Avatar { credentials, image } => {
            let account = login(store.as_ref(), &credentials).await?;
            let account = store.set_avatar(account.id, image.as_deref()).await?;
            match &account.avatar {
                Some(avatar) => println!("Avatar set to {}", avatar),
                None => println!("Avatar cleared"),
            }
            show_leaderboard(store.as_ref(), SortKey::Score, SortOrder::Descending, Some(account.id))
                .await?;
        }
    }
    Ok(())
}

async fn login<S: Store + ?Sized>(store: &S, credentials: &Credentials) -> Result<Account> {
    let account = store.login(&credentials.email, &credentials.password).await?;
    info!(user_id = account.id, "Logged in as {}", account.nickname);
    Ok(account)
}

fn print_account(account: &Account) {
    println!("{} <{}>", account.nickname, account.email);
    println!("Best score: {}", account.best_score);
    if let Some(avatar) = &account.avatar {
        println!("Avatar: {}", avatar);
    }
}

async fn show_leaderboard<S: Store + ?Sized>(
    store: &S,
    sort_key: SortKey,
    order: SortOrder,
    user_id: Option<i32>,
) -> Result<()> {
    let entries = store.query_leaderboard(sort_key, order).await?;
    let ranked = rank(&entries, sort_key, order, user_id);
    print!("{}", ranked);
    Ok(())
}

async fn play<S: Store + 'static>(
    store: Arc<S>,
    account: Option<Account>,
    config: SessionConfig,
    seed: Option<u64>,
) -> Result<()> {
    let seed = seed.unwrap_or_else(rand::random);
    let best_score = account.as_ref().map_or(0, |a| a.best_score);
    let engine = GameEngine::new(Arena::default(), seed).with_best_score(best_score);
    debug!(seed, best_score, "Starting game");

    let (notice_tx, notice_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::channel(32);
    let cancel = CancellationToken::new();
    let autopilot = config.autopilot;

    let mut session = GameSession::new(engine, store.clone(), config)
        .with_notices(notice_tx)
        .with_cancellation(cancel.clone());
    if let Some(account) = &account {
        session = session.with_user(account.id);
    }

    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));
    if !autopilot {
        spawn_input_reader(command_tx);
    }
    let printer = tokio::spawn(print_notices(notice_rx));

    let outcome = session.run(command_rx).await;
    if let Some(submission) = outcome.submission {
        if let Err(e) = submission.await {
            warn!("Score submission task failed: {}", e);
        }
    }
    let _ = printer.await;

    match (&outcome.report, &account) {
        (Some(report), Some(account)) if report.submission().is_some() => {
            show_leaderboard(
                store.as_ref(),
                SortKey::Score,
                SortOrder::Descending,
                Some(account.id),
            )
            .await?;
        }
        (None, _) => println!("Game stopped"),
        _ => {}
    }
    Ok(())
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if result.is_ok() {
                cancel.cancel();
            }
        }
        _ = cancel.cancelled() => {}
    }
}

fn parse_command(line: &str) -> Option<SessionCommand> {
    match line.trim().to_lowercase().as_str() {
        "w" | "up" => Some(SessionCommand::Turn(Direction::Up)),
        "s" | "down" => Some(SessionCommand::Turn(Direction::Down)),
        "a" | "left" => Some(SessionCommand::Turn(Direction::Left)),
        "d" | "right" => Some(SessionCommand::Turn(Direction::Right)),
        "p" | "pause" => Some(SessionCommand::Pause),
        "r" | "resume" => Some(SessionCommand::Resume),
        "q" | "quit" => Some(SessionCommand::Stop),
        _ => None,
    }
}

/// Forward input lines as session commands until input ends or the session is gone
fn forward_commands<R: BufRead>(input: R, commands: mpsc::Sender<SessionCommand>) {
    for line in input.lines() {
        match line {
            Ok(line) => match parse_command(&line) {
                Some(command) => {
                    if commands.blocking_send(command).is_err() {
                        break;
                    }
                }
                None => println!("Unknown command: {}", line.trim()),
            },
            Err(e) => {
                warn!("Failed to read input: {}", e);
                break;
            }
        }
    }
}

/// Blocking stdin reads cannot be cancelled, so they live on their own thread
/// that the process does not wait for on exit
fn spawn_input_reader(commands: mpsc::Sender<SessionCommand>) {
    std::thread::spawn(move || forward_commands(std::io::stdin().lock(), commands));
}

async fn print_notices(mut notices: mpsc::UnboundedReceiver<SessionNotice>) {
    while let Some(notice) = notices.recv().await {
        match notice {
            SessionNotice::Event(GameEvent::Started) => println!("Go!"),
            SessionNotice::Event(GameEvent::FoodEaten { score, .. }) => println!("Score: {}", score),
            SessionNotice::Event(GameEvent::Paused) => println!("Paused"),
            SessionNotice::Event(GameEvent::Resumed) => println!("Resumed"),
            SessionNotice::Event(GameEvent::GameOver { report }) => {
                println!("Game over! Score: {}", report.final_score);
                if report.is_new_record {
                    println!("New record! Previous best: {}", report.previous_best);
                } else {
                    println!("Best score: {}", report.best_score);
                }
            }
            SessionNotice::ScoreSaved { score } => println!("Score {} saved", score),
            SessionNotice::ScoreNotSaved { score, reason } => {
                println!("Score {} could not be saved: {}", score, reason)
            }
            SessionNotice::Event(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_lines_map_to_commands() {
        assert_eq!(parse_command(" W "), Some(SessionCommand::Turn(Direction::Up)));
        assert_eq!(parse_command("left"), Some(SessionCommand::Turn(Direction::Left)));
        assert_eq!(parse_command("p"), Some(SessionCommand::Pause));
        assert_eq!(parse_command("q"), Some(SessionCommand::Stop));
        assert_eq!(parse_command("jump"), None);
    }

    #[test]
    fn input_reader_forwards_until_input_ends() {
        let (tx, mut rx) = mpsc::channel(8);
        forward_commands(std::io::Cursor::new("w\njump\np\nq\n"), tx);

        let mut received = Vec::new();
        while let Ok(command) = rx.try_recv() {
            received.push(command);
        }
        assert_eq!(
            received,
            vec![
                SessionCommand::Turn(Direction::Up),
                SessionCommand::Pause,
                SessionCommand::Stop
            ]
        );
        // All senders are gone once input ends, so the session sees a closed channel
        assert_eq!(rx.try_recv(), Err(mpsc::error::TryRecvError::Disconnected));
    }

    #[test]
    fn input_reader_stops_when_session_is_gone() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        // Returns instead of blocking on the rest of the input
        forward_commands(std::io::Cursor::new("w\nd\ns\n"), tx);
    }

    #[test]
    fn cli_parses_play_flags() {
        let args = Args::try_parse_from([
            "snake-arena",
            "--local",
            "arena.json",
            "play",
            "--autopilot",
            "--tick-ms",
            "50",
        ])
        .unwrap();
        assert_eq!(args.local, Some(PathBuf::from("arena.json")));
        match args.command {
            Command::Play {
                tick_ms, autopilot, email, ..
            } => {
                assert_eq!(tick_ms, 50);
                assert!(autopilot);
                assert!(email.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn play_needs_both_credentials() {
        assert!(Args::try_parse_from(["snake-arena", "play", "--email", "a@b.c"]).is_err());
    }
}
