//! User id to display identity lookup

mod profile_directory;

pub use profile_directory::ProfileDirectory;
