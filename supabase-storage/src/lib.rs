mod client;
mod credentials;
mod storage_url;

pub(crate) use storage_url::*;

pub use client::*;
pub use credentials::*;
