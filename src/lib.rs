//! Display-title resolution for note files.
//!
//! A [`resolver::CachedResolver`] sits in front of an arbitrary title source,
//! keeps results in a bounded cache and invalidates them from bus events.
//! Feature managers in [`feature`] push the resolved titles onto the host's
//! tabs and canvases.

pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod feature;
pub mod infra;
pub mod resolver;
pub mod surface;
