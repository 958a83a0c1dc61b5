//! Host-side services
//!
//! Format conversion and file I/O, kept apart from the pure compositing
//! stages.

pub mod format;
pub mod io;

pub use format::OutputFormatHandler;
pub use io::ImageIOService;
