mod avatar_workflow;
mod image_acquisition;
mod single_flight;

pub use avatar_workflow::*;
pub use image_acquisition::*;
pub use single_flight::*;
