mod avatar_processing;
mod events;
mod image_source;
mod object_storage;
mod profile;

pub use avatar_processing::*;
pub use events::*;
pub use image_source::*;
pub use object_storage::*;
pub use profile::*;
