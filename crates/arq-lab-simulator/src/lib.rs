pub mod link;
pub mod report;
pub mod runner;

pub use link::{LinkReceiver, LinkSender};
pub use report::{EventSummary, FrameSummary, RunReport};
pub use runner::{load_scenario, run_scenario};
