//! # LedgerLink Protocol
//!
//! Domain records and the XML codec for the ledger engine's
//! XML-over-HTTP dialect.
//!
//! This crate provides:
//! - The [`DomainRecord`] data model (vouchers, ledger masters, stock
//!   items, report queries) with normalized dates and fixed-precision
//!   amounts
//! - Deterministic content fingerprints for duplicate detection
//! - [`encode`], which renders a record into a well-formed request
//!   envelope and never fails for a validated record
//! - [`decode_response`], a strict decoder that maps every response body
//!   to exactly one [`EngineResult`], including empty bodies, truncated
//!   XML, engine error blocks, and partial acceptance
//!
//! ## Key invariants
//!
//! - Every outbound envelope is well-formed XML; absent optional fields
//!   are omitted, never emitted empty
//! - Amounts render with two decimal places, quantities with three, so
//!   values round-trip through the engine without drift
//! - A record's fingerprint depends only on its normalized fields

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decode;
mod envelope;
mod error;
mod money;
mod record;
mod report;
mod result;

pub use decode::decode_response;
pub use envelope::{encode, CompanyContext, EngineEnvelope, ResponseShape};
pub use error::ValidationError;
pub use money::{Money, Quantity};
pub use record::{
    DomainRecord, Fingerprint, LedgerEntryLine, LedgerMaster, ReportQuery, StockItem, Voucher,
    VoucherKind,
};
pub use report::{
    CompanyInfo, LedgerInfo, NamedAmount, ReportData, StockRow, TrialBalanceRow, VoucherRow,
};
pub use result::{Acceptance, EngineRejection, EngineResult, ItemError, TransientReason};
