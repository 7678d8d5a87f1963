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

pub mod group;
pub mod token;
pub mod transport;
pub mod user;

pub use transport::{HttpRequest, HttpTransport, ReqwestTransport};

#[cfg(any(test, feature = "mock"))]
pub mod mock;
