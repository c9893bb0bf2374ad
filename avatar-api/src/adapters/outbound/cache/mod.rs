mod profile;

pub use profile::CachedProfileRepository;
