pub mod punctuality;
pub mod recorder;
pub mod report;
pub mod sweeper;
