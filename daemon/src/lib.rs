//! Rolling per-process resource history for processes matching a name filter

pub mod collector;
pub mod config;
pub mod error;
pub mod filter;
pub mod monitor;
pub mod protocol;
pub mod registry;
pub mod sampler;
pub mod snapshot;
pub mod socket;
pub mod window;
