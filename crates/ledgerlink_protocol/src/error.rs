//! Validation errors raised before a record enters the sync path.

use crate::money::Money;
use chrono::NaiveDate;
use thiserror::Error;

/// A structurally invalid domain record.
///
/// Validation happens before encoding, so `encode` itself never fails:
/// by the time a record reaches the codec it is known to be well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required name field is empty or whitespace.
    #[error("{field} must not be empty")]
    EmptyField {
        /// Which field was empty.
        field: &'static str,
    },

    /// A voucher carries no ledger lines.
    #[error("voucher has no ledger lines")]
    NoLines,

    /// A journal voucher's debits and credits differ.
    #[error("journal voucher does not balance: debit {debit}, credit {credit}")]
    Unbalanced {
        /// Total of debit lines.
        debit: Money,
        /// Total of credit lines.
        credit: Money,
    },

    /// A report period ends before it starts.
    #[error("report range is inverted: {from} is after {to}")]
    InvertedRange {
        /// Period start.
        from: NaiveDate,
        /// Period end.
        to: NaiveDate,
    },
}
