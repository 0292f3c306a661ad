//! Typed rows decoded from engine export responses.

use crate::money::{Money, Quantity};

/// Decoded payload of an export query, one variant per report shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportData {
    /// Per-ledger debit/credit totals.
    TrialBalance(Vec<TrialBalanceRow>),
    /// Assets and liabilities as of a date.
    BalanceSheet {
        /// Asset lines.
        assets: Vec<NamedAmount>,
        /// Liability lines.
        liabilities: Vec<NamedAmount>,
    },
    /// Income and expense totals over a period.
    ProfitAndLoss {
        /// Income lines.
        income: Vec<NamedAmount>,
        /// Expense lines.
        expenses: Vec<NamedAmount>,
    },
    /// Vouchers posted to one ledger.
    LedgerVouchers(Vec<VoucherRow>),
    /// Closing stock per item.
    StockSummary(Vec<StockRow>),
    /// Companies known to the engine.
    Companies(Vec<CompanyInfo>),
    /// Result of a ledger master lookup; `None` when the ledger does not
    /// exist.
    LedgerMaster(Option<LedgerInfo>),
    /// Result of a stock item master lookup.
    StockItemMaster {
        /// Whether the item exists.
        exists: bool,
    },
}

/// One trial balance line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialBalanceRow {
    /// Ledger name.
    pub ledger: String,
    /// Debit total.
    pub debit: Money,
    /// Credit total.
    pub credit: Money,
}

/// A named amount line (balance sheet or P&L).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedAmount {
    /// Line name.
    pub name: String,
    /// Line amount.
    pub amount: Money,
}

/// One voucher row from a ledger report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoucherRow {
    /// Voucher date as the engine rendered it.
    pub date: String,
    /// Voucher type name.
    pub voucher_type: String,
    /// Reference number.
    pub reference: String,
    /// Narration text.
    pub narration: String,
    /// Voucher amount.
    pub amount: Money,
}

/// One stock summary row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockRow {
    /// Item name.
    pub name: String,
    /// Closing quantity.
    pub quantity: Quantity,
    /// Closing value.
    pub value: Money,
}

/// A company entry from the company list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyInfo {
    /// Company name.
    pub name: String,
    /// Whether the company is currently loaded in the engine.
    pub loaded: bool,
}

/// Details of an existing ledger master.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerInfo {
    /// Ledger name.
    pub name: String,
    /// Parent group.
    pub parent: String,
    /// Opening balance.
    pub opening_balance: Money,
}
