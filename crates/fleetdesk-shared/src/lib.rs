//! Code shared between the dashboard clients and the Auth API wire format

#![warn(unused_crate_dependencies)]

pub mod api;
pub mod const_config;
pub mod errors;
pub mod req_args;
pub mod token;
pub mod uac;

#[cfg(not(target_arch = "wasm32"))]
pub mod telemetry;
