pub mod local;
pub mod remote;
pub mod service;
pub mod session;

pub use local::LocalStore;
pub use remote::RemoteStore;
pub use service::{AccountService, ScoreService, ServiceError, ServiceResult, Store};
pub use session::{GameSession, SessionCommand, SessionConfig, SessionNotice, SessionOutcome};
