//! In-memory adapters for tests.

mod events;
mod profile;
mod storage;

pub use events::*;
pub use profile::*;
pub use storage::*;
