//! Domain types shared by the storage layer and the HTTP application.
//!
//! Everything in this crate is pure: commission computation, request
//! validation and the wire representation of records.

pub mod sale;
pub mod types;

pub use sale::{compute_commission, parse_record_id, SaleRequest, SaleValueInput, ValidationError};
pub use types::{Commission, DashboardSummary, NewCommission};
