//! # Presencia Application Library
//!
//! Shared pieces of the kiosk binary, exposed as a library so integration
//! tests can drive them directly.

pub mod cli;
pub mod config;
pub mod device_sim;
pub mod kiosk_loop;
pub mod sink;
