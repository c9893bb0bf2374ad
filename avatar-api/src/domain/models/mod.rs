mod avatar;
mod events;
mod ids;
mod workflow;

pub use avatar::*;
pub use events::*;
pub use ids::*;
pub use workflow::*;
