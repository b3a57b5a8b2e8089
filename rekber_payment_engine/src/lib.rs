//! Rekber Payment Engine
//!
//! The core logic of the Rekber escrow payment gateway. Sellers create orders, buyers pay by bank transfer or QRIS
//! and upload proof, admins verify the proof, and the platform holds the money until delivery is confirmed, at
//! which point the funds are released to the seller.
//!
//! The library is split into three sections:
//! 1. Database management ([`mod@db`]). SQLite is the default backend. Backends implement the
//!    [`EscrowDatabase`], [`OrderManagement`] and [`QrisManagement`] traits; everything else goes through the
//!    public APIs rather than touching the database directly. The record types live in [`db_types`] and are public.
//! 2. The public API ([`OrderFlowApi`], [`OrderQueryApi`], [`QrisApi`]): order lifecycle, queries, and dynamic
//!    QRIS generation.
//! 3. Lifecycle events ([`mod@events`]): hooks fire when an order is paid, cancelled or completed, or when a new
//!    payment proof arrives, so that notification channels can react without being wired into the flow itself.

mod db;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub mod db_types;
pub mod events;
pub mod helpers;
pub mod qris;
mod rpe_api;

#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use db::traits::{CancelOutcome, EscrowDatabase, OrderManagement, QrisManagement};
pub use rpe_api::{
    errors::{OrderFlowError, QrisApiError},
    order_flow_api::OrderFlowApi,
    order_objects,
    order_query_api::OrderQueryApi,
    qris_api::{QrisApi, QRIS_VALIDITY_MINUTES},
};
