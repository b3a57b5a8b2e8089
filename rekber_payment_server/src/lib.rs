//! # RPG server
//! The HTTP surface of the Rekber escrow payment gateway. It is responsible for:
//! * Exposing the order lifecycle (creation, payment proof, verification, delivery, cancellation, fund release)
//!   as a JSON API on top of `rekber_payment_engine`.
//! * Validating bearer tokens and enforcing role-based access on every route.
//! * Running the hourly sweep that cancels orders left unpaid past the payment deadline.
//!
//! ## Configuration
//! The server is configured via `RPG_`-prefixed environment variables. See [config](config/index.html) for the
//! full list.

pub mod auth;
pub mod auto_cancel_worker;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
