//! Core types for duet
//!
//! This crate provides the session store, the conversation client and the
//! toolkit-independent view controller used by the duet front ends.

pub mod attachment;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod session;
pub mod utils;
pub mod view;

pub use error::{Error, Result};
