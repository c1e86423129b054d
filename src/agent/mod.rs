// Agent module: the polling loop
//
// Each cycle resolves every configured child concurrently, logs the outcome and
// persists it as the single state file that `status` reads back.

mod daemon;
mod scheduler;
mod state;

pub use daemon::{check_once, run_agent_daemon};
pub use scheduler::PollingScheduler;
pub use state::{AgentState, get_agent_state_path};
