#![warn(unused_crate_dependencies)]

// Only used in binary and triggers unused warning
use tokio as _;


pub mod cli;
pub mod commands;
pub mod tracing;
