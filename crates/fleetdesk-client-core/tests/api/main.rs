#![cfg(not(target_arch = "wasm32"))]

mod authorizer;
mod guards;
mod helpers;
mod login;
mod logout;
mod startup;
