//! Request envelope construction.
//!
//! The engine speaks a fixed `<ENVELOPE>` dialect: a header naming the
//! request (import or export), and a body of static variables plus the
//! payload. Encoding is infallible for validated records; optional
//! fields are omitted entirely, all text content is escaped, and amounts
//! render at fixed precision.

use crate::record::{format_date, DomainRecord, ReportQuery, Voucher};
use quick_xml::escape::escape;

/// The company the engine should apply a request to.
///
/// When no company is named, the engine uses whichever company is
/// currently active.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyContext {
    /// Target company name.
    pub company: Option<String>,
}

impl CompanyContext {
    /// Context targeting the engine's active company.
    #[must_use]
    pub fn active() -> Self {
        Self::default()
    }

    /// Context targeting a named company.
    pub fn named(company: impl Into<String>) -> Self {
        Self {
            company: Some(company.into()),
        }
    }
}

/// Which decoder a response to this envelope needs.
///
/// Carried alongside the request XML so the decoder can map the body to
/// the right [`crate::ReportData`] variant without re-deriving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// An import result with created/altered/error counters.
    Import,
    /// Trial balance rows.
    TrialBalance,
    /// Balance sheet lines.
    BalanceSheet,
    /// Profit and loss lines.
    ProfitAndLoss,
    /// Ledger voucher rows.
    LedgerVouchers,
    /// Stock summary rows.
    StockSummary,
    /// Company list entries.
    CompanyList,
    /// Single ledger master lookup.
    LedgerLookup,
    /// Single stock item lookup.
    StockLookup,
}

/// A wire-ready request envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEnvelope {
    /// Which decoder the response needs.
    pub shape: ResponseShape,
    /// The request body, well-formed XML.
    pub xml: String,
}

impl EngineEnvelope {
    /// The request body as bytes for the transport.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.xml.as_bytes()
    }
}

/// Serializes a domain record into the engine's envelope dialect.
///
/// Never fails: records reach this point already validated, optional
/// fields are simply omitted, and every text value is escaped.
#[must_use]
pub fn encode(record: &DomainRecord, ctx: &CompanyContext) -> EngineEnvelope {
    match record {
        DomainRecord::Voucher(voucher) => encode_voucher(voucher, ctx),
        DomainRecord::Ledger(ledger) => {
            let mut x = XmlBuilder::new();
            import_header(&mut x, "All Masters");
            x.open("BODY");
            import_desc(&mut x, ctx);
            x.open("DATA");
            x.open("TALLYMESSAGE");
            x.open_with_attrs("LEDGER", &[("NAME", &ledger.name), ("ACTION", "Create")]);
            x.open("NAME.LIST");
            x.leaf("NAME", &ledger.name);
            x.close("NAME.LIST");
            x.leaf("PARENT", &ledger.parent_group);
            x.leaf("OPENINGBALANCE", &ledger.opening_balance.to_string());
            x.leaf("ISBILLWISEON", "Yes");
            x.leaf("ISCOSTCENTRESON", "No");
            if let Some(gstin) = &ledger.gstin {
                x.leaf("PARTYGSTIN", gstin);
                x.leaf("GSTREGISTRATIONTYPE", "Regular");
            }
            x.close("LEDGER");
            x.close("TALLYMESSAGE");
            x.close("DATA");
            x.close("BODY");
            x.finish(ResponseShape::Import)
        }
        DomainRecord::StockItem(item) => {
            let mut x = XmlBuilder::new();
            import_header(&mut x, "All Masters");
            x.open("BODY");
            import_desc(&mut x, ctx);
            x.open("DATA");
            x.open("TALLYMESSAGE");
            x.open_with_attrs("STOCKITEM", &[("NAME", &item.name), ("ACTION", "Create")]);
            x.open("NAME.LIST");
            x.leaf("NAME", &item.name);
            x.close("NAME.LIST");
            x.leaf("PARENT", &item.group);
            x.leaf("BASEUNITS", &item.unit);
            x.leaf("OPENINGBALANCE", &item.opening_qty.to_string());
            x.leaf("OPENINGVALUE", &item.opening_value().to_string());
            x.leaf("OPENINGRATE", &item.opening_rate.to_string());
            if let Some(hsn) = &item.hsn {
                x.open("GSTDETAILS.LIST");
                x.leaf("HSNCODE", hsn);
                x.close("GSTDETAILS.LIST");
            }
            x.close("STOCKITEM");
            x.close("TALLYMESSAGE");
            x.close("DATA");
            x.close("BODY");
            x.finish(ResponseShape::Import)
        }
        DomainRecord::Report(query) => encode_report(query, ctx),
    }
}

fn encode_voucher(voucher: &Voucher, ctx: &CompanyContext) -> EngineEnvelope {
    let mut x = XmlBuilder::new();
    import_header(&mut x, "Vouchers");
    x.open("BODY");
    import_desc(&mut x, ctx);
    x.open("DATA");
    x.open("TALLYMESSAGE");
    x.open_with_attrs(
        "VOUCHER",
        &[("VCHTYPE", voucher.kind.type_name()), ("ACTION", "Create")],
    );
    x.leaf("DATE", &format_date(voucher.date));
    x.leaf("VOUCHERTYPENAME", voucher.kind.type_name());
    if let Some(reference) = &voucher.reference {
        x.leaf("REFERENCE", reference);
    }
    if let Some(narration) = &voucher.narration {
        x.leaf("NARRATION", narration);
    }
    if let Some(party) = &voucher.party {
        x.leaf("PARTYLEDGERNAME", party);
    }
    for line in &voucher.lines {
        x.open("ALLLEDGERENTRIES.LIST");
        x.leaf("LEDGERNAME", &line.ledger);
        x.leaf(
            "ISDEEMEDPOSITIVE",
            if line.is_debit { "Yes" } else { "No" },
        );
        x.leaf("AMOUNT", &line.signed_amount().to_string());
        x.close("ALLLEDGERENTRIES.LIST");
    }
    x.close("VOUCHER");
    x.close("TALLYMESSAGE");
    x.close("DATA");
    x.close("BODY");
    x.finish(ResponseShape::Import)
}

fn encode_report(query: &ReportQuery, ctx: &CompanyContext) -> EngineEnvelope {
    // Header ID, collection vs data request, response shape, and the
    // static variables each export needs.
    let (id, request_type, shape) = match query {
        ReportQuery::TrialBalance { .. } => {
            ("Trial Balance", "Collection", ResponseShape::TrialBalance)
        }
        ReportQuery::BalanceSheet { .. } => {
            ("Balance Sheet", "Collection", ResponseShape::BalanceSheet)
        }
        ReportQuery::ProfitAndLoss { .. } => {
            ("Profit and Loss", "Collection", ResponseShape::ProfitAndLoss)
        }
        ReportQuery::LedgerVouchers { .. } => {
            ("Ledger Vouchers", "Collection", ResponseShape::LedgerVouchers)
        }
        ReportQuery::StockSummary => ("StockSummary", "Collection", ResponseShape::StockSummary),
        ReportQuery::CompanyList => {
            ("List of Companies", "Collection", ResponseShape::CompanyList)
        }
        ReportQuery::LedgerLookup { .. } => ("LedgerMaster", "Data", ResponseShape::LedgerLookup),
        ReportQuery::StockItemLookup { .. } => {
            ("StockItemMaster", "Data", ResponseShape::StockLookup)
        }
    };

    let mut x = XmlBuilder::new();
    x.open("ENVELOPE");
    x.open("HEADER");
    x.leaf("VERSION", "1");
    x.leaf("TALLYREQUEST", "Export");
    x.leaf("TYPE", request_type);
    x.leaf("ID", id);
    x.close("HEADER");
    x.open("BODY");
    x.open("DESC");
    x.open("STATICVARIABLES");
    x.leaf("SVEXPORTFORMAT", "$$SysName:XML");
    if let Some(company) = &ctx.company {
        x.leaf("SVCURRENTCOMPANY", company);
    }
    match query {
        ReportQuery::TrialBalance { from, to } | ReportQuery::ProfitAndLoss { from, to } => {
            x.leaf("SVFROMDATE", &format_date(*from));
            x.leaf("SVTODATE", &format_date(*to));
        }
        ReportQuery::BalanceSheet { to } => {
            x.leaf("SVTODATE", &format_date(*to));
        }
        ReportQuery::LedgerVouchers { ledger, from, to } => {
            x.leaf("LEDGERNAME", ledger);
            x.leaf("SVFROMDATE", &format_date(*from));
            x.leaf("SVTODATE", &format_date(*to));
        }
        ReportQuery::LedgerLookup { name } => {
            x.leaf("LEDGERNAME", name);
        }
        ReportQuery::StockItemLookup { name } => {
            x.leaf("STOCKITEMNAME", name);
        }
        ReportQuery::StockSummary | ReportQuery::CompanyList => {}
    }
    x.close("STATICVARIABLES");
    x.close("DESC");
    x.close("BODY");
    x.finish(shape)
}

fn import_header(x: &mut XmlBuilder, id: &str) {
    x.open("ENVELOPE");
    x.open("HEADER");
    x.leaf("VERSION", "1");
    x.leaf("TALLYREQUEST", "Import");
    x.leaf("TYPE", "Data");
    x.leaf("ID", id);
    x.close("HEADER");
}

fn import_desc(x: &mut XmlBuilder, ctx: &CompanyContext) {
    x.open("DESC");
    x.open("STATICVARIABLES");
    x.leaf("IMPORTDUPS", "@@DUPS");
    if let Some(company) = &ctx.company {
        x.leaf("SVCURRENTCOMPANY", company);
    }
    x.close("STATICVARIABLES");
    x.close("DESC");
}

/// Minimal well-formed-by-construction XML writer.
///
/// Tag names are compile-time literals; only text content and attribute
/// values pass through escaping.
struct XmlBuilder {
    buf: String,
}

impl XmlBuilder {
    fn new() -> Self {
        Self {
            buf: String::with_capacity(512),
        }
    }

    fn open(&mut self, tag: &str) {
        self.buf.push('<');
        self.buf.push_str(tag);
        self.buf.push('>');
    }

    fn open_with_attrs(&mut self, tag: &str, attrs: &[(&str, &str)]) {
        self.buf.push('<');
        self.buf.push_str(tag);
        for (key, value) in attrs {
            self.buf.push(' ');
            self.buf.push_str(key);
            self.buf.push_str("=\"");
            self.buf.push_str(&escape(*value));
            self.buf.push('"');
        }
        self.buf.push('>');
    }

    fn close(&mut self, tag: &str) {
        self.buf.push_str("</");
        self.buf.push_str(tag);
        self.buf.push('>');
    }

    fn leaf(&mut self, tag: &str, text: &str) {
        self.open(tag);
        self.buf.push_str(&escape(text));
        self.close(tag);
    }

    fn finish(mut self, shape: ResponseShape) -> EngineEnvelope {
        self.close("ENVELOPE");
        EngineEnvelope {
            shape,
            xml: self.buf,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::{Money, Quantity};
    use crate::record::{LedgerEntryLine, LedgerMaster, StockItem, VoucherKind};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn voucher_envelope_structure() {
        let voucher = Voucher::new(VoucherKind::Sales, date(2025, 4, 1))
            .with_party("Acme Traders")
            .with_reference("INV-001")
            .with_line(LedgerEntryLine::debit("Acme Traders", Money::from_major(118)))
            .with_line(LedgerEntryLine::credit("Sales", Money::from_major(118)));
        let envelope = encode(
            &DomainRecord::Voucher(voucher),
            &CompanyContext::named("Demo Co"),
        );

        assert_eq!(envelope.shape, ResponseShape::Import);
        assert!(envelope.xml.starts_with("<ENVELOPE><HEADER>"));
        assert!(envelope.xml.contains("<TALLYREQUEST>Import</TALLYREQUEST>"));
        assert!(envelope.xml.contains("<ID>Vouchers</ID>"));
        assert!(envelope.xml.contains("VCHTYPE=\"Sales\""));
        assert!(envelope.xml.contains("<DATE>20250401</DATE>"));
        assert!(envelope.xml.contains("<SVCURRENTCOMPANY>Demo Co</SVCURRENTCOMPANY>"));
        assert!(envelope.xml.contains("<AMOUNT>118.00</AMOUNT>"));
        assert!(envelope.xml.contains("<AMOUNT>-118.00</AMOUNT>"));
        assert!(envelope.xml.ends_with("</ENVELOPE>"));
    }

    #[test]
    fn text_content_is_escaped() {
        let voucher = Voucher::new(VoucherKind::Journal, date(2025, 4, 1))
            .with_narration("R&D <prototype> \"phase 1\"")
            .with_line(LedgerEntryLine::debit("R&D Expenses", Money::from_major(10)))
            .with_line(LedgerEntryLine::credit("Cash", Money::from_major(10)));
        let envelope = encode(&DomainRecord::Voucher(voucher), &CompanyContext::active());

        assert!(envelope.xml.contains("R&amp;D &lt;prototype&gt;"));
        assert!(envelope.xml.contains("<LEDGERNAME>R&amp;D Expenses</LEDGERNAME>"));
        assert!(!envelope.xml.contains("<prototype>"));
    }

    #[test]
    fn optional_fields_are_omitted() {
        let voucher = Voucher::new(VoucherKind::Payment, date(2025, 4, 2))
            .with_line(LedgerEntryLine::debit("Vendor", Money::from_major(50)))
            .with_line(LedgerEntryLine::credit("Bank", Money::from_major(50)));
        let envelope = encode(&DomainRecord::Voucher(voucher), &CompanyContext::active());

        assert!(!envelope.xml.contains("<REFERENCE>"));
        assert!(!envelope.xml.contains("<NARRATION>"));
        assert!(!envelope.xml.contains("<PARTYLEDGERNAME>"));
        assert!(!envelope.xml.contains("<SVCURRENTCOMPANY>"));
    }

    #[test]
    fn ledger_master_with_gstin() {
        let ledger = LedgerMaster::new("Acme Traders", "Sundry Debtors")
            .with_opening_balance(Money::from_major(5000))
            .with_gstin("27AAAAA0000A1Z5");
        let envelope = encode(&DomainRecord::Ledger(ledger), &CompanyContext::active());

        assert!(envelope.xml.contains("<ID>All Masters</ID>"));
        assert!(envelope.xml.contains("NAME=\"Acme Traders\""));
        assert!(envelope.xml.contains("<PARENT>Sundry Debtors</PARENT>"));
        assert!(envelope.xml.contains("<PARTYGSTIN>27AAAAA0000A1Z5</PARTYGSTIN>"));
        assert!(envelope.xml.contains("<GSTREGISTRATIONTYPE>Regular</GSTREGISTRATIONTYPE>"));
    }

    #[test]
    fn stock_item_derives_opening_value() {
        let item = StockItem::new("Widget", "Finished Goods", "Pcs")
            .with_opening(Quantity::from_units(10), Money::from_minor(2550));
        let envelope = encode(&DomainRecord::StockItem(item), &CompanyContext::active());

        assert!(envelope.xml.contains("<OPENINGBALANCE>10.000</OPENINGBALANCE>"));
        assert!(envelope.xml.contains("<OPENINGRATE>25.50</OPENINGRATE>"));
        assert!(envelope.xml.contains("<OPENINGVALUE>255.00</OPENINGVALUE>"));
        assert!(!envelope.xml.contains("GSTDETAILS"));
    }

    #[test]
    fn report_envelopes() {
        let envelope = encode(
            &DomainRecord::Report(ReportQuery::TrialBalance {
                from: date(2025, 4, 1),
                to: date(2025, 4, 30),
            }),
            &CompanyContext::active(),
        );
        assert_eq!(envelope.shape, ResponseShape::TrialBalance);
        assert!(envelope.xml.contains("<TALLYREQUEST>Export</TALLYREQUEST>"));
        assert!(envelope.xml.contains("<ID>Trial Balance</ID>"));
        assert!(envelope.xml.contains("<SVFROMDATE>20250401</SVFROMDATE>"));
        assert!(envelope.xml.contains("<SVTODATE>20250430</SVTODATE>"));

        let envelope = encode(
            &DomainRecord::Report(ReportQuery::LedgerLookup {
                name: "Acme Traders".into(),
            }),
            &CompanyContext::active(),
        );
        assert_eq!(envelope.shape, ResponseShape::LedgerLookup);
        assert!(envelope.xml.contains("<TYPE>Data</TYPE>"));
        assert!(envelope.xml.contains("<LEDGERNAME>Acme Traders</LEDGERNAME>"));
    }
}
