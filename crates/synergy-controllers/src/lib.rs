//! # Synergy Controllers
//!
//! Reference [`Controller`](synergy_core::Controller) implementations:
//!
//! - [`MemoryController`] - a concurrent in-memory key/value store
//! - [`FileController`] - files below a root directory, via `tokio::fs`
//!
//! Both report a missing resource as a `NotFound` response rather than an
//! error, so they compose with the dispatcher's read fan-out.

#![doc(html_root_url = "https://docs.rs/synergy-controllers/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod file;
pub mod memory;

pub use file::FileController;
pub use memory::MemoryController;
