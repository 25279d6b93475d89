// Session module - Command sessions and the interactive loop
pub mod repl;
pub mod reply;
pub mod session;
pub mod state;

pub use repl::{run_interactive, LoopOutcome};
pub use reply::{Reply, ReplyRecord, NO_RESPONSE};
pub use session::CommandSession;
pub use state::{SessionState, SessionStatistics, SessionStatus};
