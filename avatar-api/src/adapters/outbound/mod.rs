pub mod cache;
pub mod media;
#[cfg(test)]
pub mod memory;
pub mod postgres;
pub mod supabase;
