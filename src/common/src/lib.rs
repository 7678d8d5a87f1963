#![deny(warnings)]
#![warn(unused_extern_crates)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unreachable)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::trivially_copy_pass_by_ref)]

#[macro_use]
extern crate tracing;

pub mod cache;
pub mod claims;
pub mod config;
pub mod constants;
pub mod gate;
pub mod groups;
pub mod hooks;
pub mod interface;
pub mod memstore;
pub mod reconcile;
pub mod sync;
pub mod token;

#[cfg(test)]
pub(crate) mod test_utils;
