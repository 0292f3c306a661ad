//! Domain records submitted to the ledger engine.

use crate::error::ValidationError;
use crate::money::{Money, Quantity};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Renders a business date in the engine's canonical `YYYYMMDD` form.
#[must_use]
pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// The kind of voucher being posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoucherKind {
    /// Sales invoice.
    Sales,
    /// Purchase invoice.
    Purchase,
    /// Payment out of a bank or cash ledger.
    Payment,
    /// Receipt into a bank or cash ledger.
    Receipt,
    /// Free-form journal entry.
    Journal,
    /// Transfer between bank/cash ledgers.
    Contra,
}

impl VoucherKind {
    /// The engine's voucher type name for this kind.
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            VoucherKind::Sales => "Sales",
            VoucherKind::Purchase => "Purchase",
            VoucherKind::Payment => "Payment",
            VoucherKind::Receipt => "Receipt",
            VoucherKind::Journal => "Journal",
            VoucherKind::Contra => "Contra",
        }
    }
}

/// One debit or credit line of a voucher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntryLine {
    /// Ledger the line posts to.
    pub ledger: String,
    /// Line amount; the sign convention is normalized at encode time.
    pub amount: Money,
    /// True for debit lines.
    pub is_debit: bool,
}

impl LedgerEntryLine {
    /// Creates a debit line.
    pub fn debit(ledger: impl Into<String>, amount: Money) -> Self {
        Self {
            ledger: ledger.into(),
            amount,
            is_debit: true,
        }
    }

    /// Creates a credit line.
    pub fn credit(ledger: impl Into<String>, amount: Money) -> Self {
        Self {
            ledger: ledger.into(),
            amount,
            is_debit: false,
        }
    }

    /// The amount as the engine expects it: debits positive, credits
    /// negative, regardless of the sign the caller supplied.
    #[must_use]
    pub fn signed_amount(&self) -> Money {
        let magnitude = self.amount.abs();
        if self.is_debit {
            magnitude
        } else {
            -magnitude
        }
    }
}

/// A transactional voucher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    /// Voucher kind.
    pub kind: VoucherKind,
    /// Voucher date.
    pub date: NaiveDate,
    /// Party ledger, for sales/purchase vouchers.
    pub party: Option<String>,
    /// Invoice or reference number.
    pub reference: Option<String>,
    /// Free-text narration.
    pub narration: Option<String>,
    /// Debit/credit lines.
    pub lines: Vec<LedgerEntryLine>,
}

impl Voucher {
    /// Creates a voucher with no lines.
    #[must_use]
    pub fn new(kind: VoucherKind, date: NaiveDate) -> Self {
        Self {
            kind,
            date,
            party: None,
            reference: None,
            narration: None,
            lines: Vec::new(),
        }
    }

    /// Sets the party ledger.
    #[must_use]
    pub fn with_party(mut self, party: impl Into<String>) -> Self {
        self.party = Some(party.into());
        self
    }

    /// Sets the reference number.
    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Sets the narration.
    #[must_use]
    pub fn with_narration(mut self, narration: impl Into<String>) -> Self {
        self.narration = Some(narration.into());
        self
    }

    /// Appends a line.
    #[must_use]
    pub fn with_line(mut self, line: LedgerEntryLine) -> Self {
        self.lines.push(line);
        self
    }

    fn total(&self, debit: bool) -> Money {
        self.lines
            .iter()
            .filter(|l| l.is_debit == debit)
            .fold(Money::ZERO, |acc, l| acc + l.amount.abs())
    }
}

/// A ledger master record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerMaster {
    /// Ledger name.
    pub name: String,
    /// Parent group, e.g. "Sundry Debtors".
    pub parent_group: String,
    /// Opening balance.
    pub opening_balance: Money,
    /// GST registration number of the party, when known.
    pub gstin: Option<String>,
}

impl LedgerMaster {
    /// Creates a ledger master with zero opening balance.
    pub fn new(name: impl Into<String>, parent_group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_group: parent_group.into(),
            opening_balance: Money::ZERO,
            gstin: None,
        }
    }

    /// Sets the opening balance.
    #[must_use]
    pub fn with_opening_balance(mut self, balance: Money) -> Self {
        self.opening_balance = balance;
        self
    }

    /// Sets the party GSTIN.
    #[must_use]
    pub fn with_gstin(mut self, gstin: impl Into<String>) -> Self {
        self.gstin = Some(gstin.into());
        self
    }
}

/// A stock item master record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItem {
    /// Item name.
    pub name: String,
    /// Stock group the item belongs to.
    pub group: String,
    /// Base unit of measure, e.g. "Pcs".
    pub unit: String,
    /// Opening quantity.
    pub opening_qty: Quantity,
    /// Opening rate per unit.
    pub opening_rate: Money,
    /// HSN/SAC code, when known.
    pub hsn: Option<String>,
}

impl StockItem {
    /// Creates a stock item with zero opening stock.
    pub fn new(
        name: impl Into<String>,
        group: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            unit: unit.into(),
            opening_qty: Quantity::ZERO,
            opening_rate: Money::ZERO,
            hsn: None,
        }
    }

    /// Sets opening quantity and rate.
    #[must_use]
    pub fn with_opening(mut self, qty: Quantity, rate: Money) -> Self {
        self.opening_qty = qty;
        self.opening_rate = rate;
        self
    }

    /// Sets the HSN code.
    #[must_use]
    pub fn with_hsn(mut self, hsn: impl Into<String>) -> Self {
        self.hsn = Some(hsn.into());
        self
    }

    /// Opening stock value (quantity × rate).
    #[must_use]
    pub fn opening_value(&self) -> Money {
        self.opening_qty.value_at(self.opening_rate)
    }
}

/// A read-only query against engine state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportQuery {
    /// Trial balance over a date range.
    TrialBalance {
        /// Period start.
        from: NaiveDate,
        /// Period end.
        to: NaiveDate,
    },
    /// Balance sheet as of a date.
    BalanceSheet {
        /// Reporting date.
        to: NaiveDate,
    },
    /// Profit and loss over a date range.
    ProfitAndLoss {
        /// Period start.
        from: NaiveDate,
        /// Period end.
        to: NaiveDate,
    },
    /// Transactions posted to one ledger over a date range.
    LedgerVouchers {
        /// Ledger name.
        ledger: String,
        /// Period start.
        from: NaiveDate,
        /// Period end.
        to: NaiveDate,
    },
    /// Closing quantity and value of every stock item.
    StockSummary,
    /// Companies known to the engine and whether each is loaded.
    CompanyList,
    /// Existence and details of a single ledger master.
    LedgerLookup {
        /// Ledger name.
        name: String,
    },
    /// Existence of a single stock item master.
    StockItemLookup {
        /// Item name.
        name: String,
    },
}

/// A record submitted through the sync coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainRecord {
    /// A voucher import.
    Voucher(Voucher),
    /// A ledger master import.
    Ledger(LedgerMaster),
    /// A stock item master import.
    StockItem(StockItem),
    /// A report or lookup export.
    Report(ReportQuery),
}

impl DomainRecord {
    /// Short label for logs and error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            DomainRecord::Voucher(v) => v.kind.type_name(),
            DomainRecord::Ledger(_) => "ledger",
            DomainRecord::StockItem(_) => "stock item",
            DomainRecord::Report(_) => "report",
        }
    }

    /// True for records that create engine state and must therefore be
    /// queued and replayed when the engine is unreachable. Report queries
    /// are reads and are never queued.
    #[must_use]
    pub fn is_business_event(&self) -> bool {
        !matches!(self, DomainRecord::Report(_))
    }

    /// Computes the content fingerprint over the record's normalized
    /// fields. Identical business content always yields an identical
    /// fingerprint, independent of process or platform.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = FieldHasher::new();
        match self {
            DomainRecord::Voucher(v) => {
                hasher.field("record", "voucher");
                hasher.field("kind", v.kind.type_name());
                hasher.field("date", &format_date(v.date));
                hasher.opt_field("party", v.party.as_deref());
                hasher.opt_field("reference", v.reference.as_deref());
                hasher.opt_field("narration", v.narration.as_deref());
                for line in &v.lines {
                    hasher.field("line.ledger", &line.ledger);
                    hasher.field("line.amount", &line.signed_amount().to_string());
                }
            }
            DomainRecord::Ledger(l) => {
                hasher.field("record", "ledger");
                hasher.field("name", &l.name);
                hasher.field("parent", &l.parent_group);
                hasher.field("opening", &l.opening_balance.to_string());
                hasher.opt_field("gstin", l.gstin.as_deref());
            }
            DomainRecord::StockItem(s) => {
                hasher.field("record", "stock-item");
                hasher.field("name", &s.name);
                hasher.field("group", &s.group);
                hasher.field("unit", &s.unit);
                hasher.field("qty", &s.opening_qty.to_string());
                hasher.field("rate", &s.opening_rate.to_string());
                hasher.opt_field("hsn", s.hsn.as_deref());
            }
            DomainRecord::Report(q) => {
                hasher.field("record", "report");
                match q {
                    ReportQuery::TrialBalance { from, to } => {
                        hasher.field("query", "trial-balance");
                        hasher.field("from", &format_date(*from));
                        hasher.field("to", &format_date(*to));
                    }
                    ReportQuery::BalanceSheet { to } => {
                        hasher.field("query", "balance-sheet");
                        hasher.field("to", &format_date(*to));
                    }
                    ReportQuery::ProfitAndLoss { from, to } => {
                        hasher.field("query", "profit-and-loss");
                        hasher.field("from", &format_date(*from));
                        hasher.field("to", &format_date(*to));
                    }
                    ReportQuery::LedgerVouchers { ledger, from, to } => {
                        hasher.field("query", "ledger-vouchers");
                        hasher.field("ledger", ledger);
                        hasher.field("from", &format_date(*from));
                        hasher.field("to", &format_date(*to));
                    }
                    ReportQuery::StockSummary => hasher.field("query", "stock-summary"),
                    ReportQuery::CompanyList => hasher.field("query", "company-list"),
                    ReportQuery::LedgerLookup { name } => {
                        hasher.field("query", "ledger-lookup");
                        hasher.field("name", name);
                    }
                    ReportQuery::StockItemLookup { name } => {
                        hasher.field("query", "stock-lookup");
                        hasher.field("name", name);
                    }
                }
            }
        }
        hasher.finish()
    }

    /// Checks structural validity before the record enters the sync path.
    ///
    /// # Errors
    ///
    /// Returns the first violation found: empty required names, vouchers
    /// without lines, unbalanced journal entries, or inverted date ranges.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            DomainRecord::Voucher(v) => {
                if v.lines.is_empty() {
                    return Err(ValidationError::NoLines);
                }
                for line in &v.lines {
                    require_name("line ledger", &line.ledger)?;
                }
                if let Some(party) = &v.party {
                    require_name("party", party)?;
                }
                if v.kind == VoucherKind::Journal {
                    let debit = v.total(true);
                    let credit = v.total(false);
                    if debit != credit {
                        return Err(ValidationError::Unbalanced { debit, credit });
                    }
                }
                Ok(())
            }
            DomainRecord::Ledger(l) => {
                require_name("ledger name", &l.name)?;
                require_name("parent group", &l.parent_group)
            }
            DomainRecord::StockItem(s) => {
                require_name("item name", &s.name)?;
                require_name("stock group", &s.group)?;
                require_name("unit", &s.unit)
            }
            DomainRecord::Report(q) => match q {
                ReportQuery::TrialBalance { from, to }
                | ReportQuery::ProfitAndLoss { from, to } => check_range(*from, *to),
                ReportQuery::LedgerVouchers { ledger, from, to } => {
                    require_name("ledger name", ledger)?;
                    check_range(*from, *to)
                }
                ReportQuery::LedgerLookup { name } => require_name("ledger name", name),
                ReportQuery::StockItemLookup { name } => require_name("item name", name),
                ReportQuery::BalanceSheet { .. }
                | ReportQuery::StockSummary
                | ReportQuery::CompanyList => Ok(()),
            },
        }
    }
}

fn require_name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::EmptyField { field })
    } else {
        Ok(())
    }
}

fn check_range(from: NaiveDate, to: NaiveDate) -> Result<(), ValidationError> {
    if from > to {
        Err(ValidationError::InvertedRange { from, to })
    } else {
        Ok(())
    }
}

/// A deterministic SHA-256 digest of a record's normalized fields.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Returns the raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

/// Length-prefixed field feed into SHA-256, so field boundaries can never
/// be confused by adjacent values.
struct FieldHasher {
    hasher: Sha256,
}

impl FieldHasher {
    fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    fn field(&mut self, name: &str, value: &str) {
        self.hasher.update((name.len() as u32).to_le_bytes());
        self.hasher.update(name.as_bytes());
        self.hasher.update((value.len() as u32).to_le_bytes());
        self.hasher.update(value.as_bytes());
    }

    fn opt_field(&mut self, name: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.field(name, value);
        }
    }

    fn finish(self) -> Fingerprint {
        Fingerprint(self.hasher.finalize().into())
    }
}
