mod responses;
mod runner;

pub use responses::*;
pub use runner::{drive_run, RunAborted};
