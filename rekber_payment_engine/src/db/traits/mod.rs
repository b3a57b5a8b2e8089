//! Interface contracts for payment engine database backends.
//!
//! * [`EscrowDatabase`] covers every state-changing operation in the order lifecycle. Implementations must make each
//!   operation atomic: the status guard and the write happen inside one transaction, so two admins racing on the
//!   same order can never both win.
//! * [`OrderManagement`] is the read side: fetching and searching orders, payments, proofs, cancellation requests
//!   and fund releases.
//! * [`QrisManagement`] stores the merchant's QRIS configuration and the dynamic payloads generated from it.

mod data_objects;
mod escrow_database;
mod order_management;
mod qris_management;

pub use data_objects::CancelOutcome;
pub use escrow_database::EscrowDatabase;
pub use order_management::OrderManagement;
pub use qris_management::QrisManagement;
