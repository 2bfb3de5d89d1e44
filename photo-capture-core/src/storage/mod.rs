pub mod atomic_write;
pub mod session_directory;
pub mod session_listing;
