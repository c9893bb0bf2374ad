pub(crate) mod avatars;
pub(crate) mod error;

pub(crate) use error::ApiError;
