//! Shared building blocks for `arpcast`.
//!
//! * [`config`]: the static configuration file and its validation.
//! * [`device`]: what a scan cycle produces and what gets published.
//! * [`network`]: MAC handling, vendor lookup, interfaces and address ranges.

pub mod config;
pub mod device;
pub mod network;
