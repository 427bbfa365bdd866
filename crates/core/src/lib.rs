//! `mebatch-core` -- pure domain logic for multi-echo batch decomposition.
//!
//! Filename parsing, directory discovery, sidecar reading, acquisition
//! table building and the tedana command builder/runner. No pool or
//! batch state lives here.

pub mod acquisition;
pub mod discovery;
pub mod error;
pub mod naming;
pub mod scripting;
pub mod sidecar;
pub mod tedana;
pub mod types;

pub use error::CoreError;
