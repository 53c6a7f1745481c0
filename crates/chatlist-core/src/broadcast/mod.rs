//! Admin broadcast subsystem: session state machine, planning, fan-out and audit.

pub mod console;
pub mod executor;
pub mod menu;
pub mod planner;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use console::{AdminConsole, BroadcastOutcome, ConsoleConfig, Handled};
pub use executor::{BroadcastExecutor, BroadcastTally, ExecutorConfig};
pub use planner::{BroadcastPlan, ConfirmationAction};
