//! Response decoding.
//!
//! Maps a raw engine response body to exactly one [`EngineResult`]. An
//! empty body, an XML parse error, or a body that matches no known shape
//! all classify as transient: the engine truncates and garbles responses
//! under load, and a retry routinely succeeds.

use crate::envelope::ResponseShape;
use crate::money::{Money, Quantity};
use crate::report::{
    CompanyInfo, LedgerInfo, NamedAmount, ReportData, StockRow, TrialBalanceRow, VoucherRow,
};
use crate::result::{Acceptance, EngineRejection, EngineResult, ItemError, TransientReason};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Decodes an engine response body according to the request's shape.
#[must_use]
pub fn decode_response(shape: ResponseShape, body: &[u8]) -> EngineResult {
    let text = String::from_utf8_lossy(body);
    if text.trim().is_empty() {
        return EngineResult::TransientFailure(TransientReason::EmptyResponse);
    }
    match shape {
        ResponseShape::Import => decode_import(&text),
        _ => decode_export(shape, &text),
    }
}

// Upper bound on placeholder entries synthesized for an ERRORS counter
// larger than the number of LINEERROR lines; a garbled counter must not
// drive an unbounded allocation.
const MAX_PADDED_ERRORS: usize = 32;

fn decode_import(text: &str) -> EngineResult {
    let mut created: u32 = 0;
    let mut altered: u32 = 0;
    let mut errors: u32 = 0;
    let mut reference: Option<String> = None;
    let mut line_errors: Vec<ItemError> = Vec::new();
    let mut saw_counters = false;

    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);
    let mut current: Vec<u8> = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => current = start.name().as_ref().to_vec(),
            Ok(Event::Text(t)) => {
                let value = match t.unescape() {
                    Ok(value) => value,
                    Err(err) => {
                        return EngineResult::TransientFailure(TransientReason::MalformedResponse(
                            err.to_string(),
                        ))
                    }
                };
                match current.as_slice() {
                    b"CREATED" => {
                        saw_counters = true;
                        created = value.trim().parse().unwrap_or(0);
                    }
                    b"ALTERED" => {
                        saw_counters = true;
                        altered = value.trim().parse().unwrap_or(0);
                    }
                    b"ERRORS" => {
                        saw_counters = true;
                        errors = value.trim().parse().unwrap_or(0);
                    }
                    b"LASTVCHID" => reference = Some(value.trim().to_string()),
                    b"LINEERROR" => line_errors.push(ItemError::new(value.trim())),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current.clear(),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return EngineResult::TransientFailure(TransientReason::MalformedResponse(
                    err.to_string(),
                ))
            }
        }
    }

    if !saw_counters {
        return EngineResult::TransientFailure(TransientReason::UnrecognizedResponse);
    }
    let accepted = created.saturating_add(altered);
    if errors == 0 && accepted > 0 {
        return EngineResult::Success(Acceptance::imported(created, altered, reference));
    }
    if errors > 0 && accepted > 0 {
        // The engine sometimes reports fewer LINEERROR lines than its
        // ERRORS counter. Pad so callers see one entry per error, up to
        // a bound.
        let padded = (errors as usize).min(MAX_PADDED_ERRORS);
        while line_errors.len() < padded {
            line_errors.push(ItemError::new("rejected without detail"));
        }
        return EngineResult::PartialSuccess {
            accepted,
            errors: line_errors,
        };
    }
    if errors > 0 {
        let message = if line_errors.is_empty() {
            format!("{errors} item(s) rejected")
        } else {
            line_errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ")
        };
        return EngineResult::PermanentFailure(EngineRejection {
            message,
            code: None,
        });
    }
    EngineResult::TransientFailure(TransientReason::UnrecognizedResponse)
}

/// A flat view of one repeating response element: its tag name plus its
/// direct leaf children.
struct FlatElement {
    name: String,
    fields: Vec<(String, String)>,
}

impl FlatElement {
    fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    fn text(&self, field: &str) -> String {
        self.get(field).unwrap_or_default().to_string()
    }

    fn money(&self, field: &str) -> Money {
        self.get(field).and_then(Money::parse).unwrap_or(Money::ZERO)
    }

    fn quantity(&self, field: &str) -> Quantity {
        self.get(field)
            .and_then(Quantity::parse)
            .unwrap_or(Quantity::ZERO)
    }
}

/// Collects every occurrence of the named container elements, flattening
/// each to its leaf children. Nesting below a container is ignored apart
/// from the leaf text itself.
fn collect_elements(text: &str, containers: &[&str]) -> Result<Vec<FlatElement>, String> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);
    let mut out: Vec<FlatElement> = Vec::new();
    let mut open: Option<FlatElement> = None;
    let mut leaf: Vec<u8> = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let name = start.name().as_ref().to_vec();
                let as_str = String::from_utf8_lossy(&name).to_string();
                if open.is_none() && containers.contains(&as_str.as_str()) {
                    open = Some(FlatElement {
                        name: as_str,
                        fields: Vec::new(),
                    });
                } else if open.is_some() {
                    leaf = name;
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(element) = open.as_mut() {
                    if !leaf.is_empty() {
                        let value = t.unescape().map_err(|e| e.to_string())?;
                        element.fields.push((
                            String::from_utf8_lossy(&leaf).to_string(),
                            value.trim().to_string(),
                        ));
                    }
                }
            }
            Ok(Event::End(end)) => {
                let name = end.name().as_ref().to_vec();
                if let Some(element) = open.as_ref() {
                    if element.name.as_bytes() == name.as_slice() {
                        if let Some(done) = open.take() {
                            out.push(done);
                        }
                    }
                }
                leaf.clear();
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(err.to_string()),
        }
    }
    Ok(out)
}

fn decode_export(shape: ResponseShape, text: &str) -> EngineResult {
    let containers: &[&str] = match shape {
        ResponseShape::TrialBalance | ResponseShape::LedgerLookup => &["LEDGER"],
        ResponseShape::BalanceSheet => &["ASSET", "LIABILITY"],
        ResponseShape::ProfitAndLoss => &["INCOME", "EXPENSE"],
        ResponseShape::LedgerVouchers => &["VOUCHER"],
        ResponseShape::StockSummary | ResponseShape::StockLookup => &["STOCKITEM"],
        ResponseShape::CompanyList => &["COMPANY"],
        ResponseShape::Import => unreachable!("imports are decoded separately"),
    };
    let elements = match collect_elements(text, containers) {
        Ok(elements) => elements,
        Err(detail) => {
            return EngineResult::TransientFailure(TransientReason::MalformedResponse(detail))
        }
    };

    let data = match shape {
        ResponseShape::TrialBalance => ReportData::TrialBalance(
            elements
                .iter()
                .filter(|e| e.get("NAME").is_some())
                .map(|e| TrialBalanceRow {
                    ledger: e.text("NAME"),
                    debit: e.money("DEBIT"),
                    credit: e.money("CREDIT"),
                })
                .collect(),
        ),
        ResponseShape::BalanceSheet => ReportData::BalanceSheet {
            assets: named_amounts(&elements, "ASSET"),
            liabilities: named_amounts(&elements, "LIABILITY"),
        },
        ResponseShape::ProfitAndLoss => ReportData::ProfitAndLoss {
            income: named_amounts(&elements, "INCOME"),
            expenses: named_amounts(&elements, "EXPENSE"),
        },
        ResponseShape::LedgerVouchers => ReportData::LedgerVouchers(
            elements
                .iter()
                .map(|e| VoucherRow {
                    date: e.text("DATE"),
                    voucher_type: e.text("VOUCHERTYPENAME"),
                    reference: e.text("REFERENCE"),
                    narration: e.text("NARRATION"),
                    amount: e.money("AMOUNT"),
                })
                .collect(),
        ),
        ResponseShape::StockSummary => ReportData::StockSummary(
            elements
                .iter()
                .filter(|e| e.get("NAME").is_some())
                .map(|e| StockRow {
                    name: e.text("NAME"),
                    quantity: e.quantity("CLOSINGBALANCE"),
                    value: e.money("CLOSINGVALUE"),
                })
                .collect(),
        ),
        ResponseShape::CompanyList => ReportData::Companies(
            elements
                .iter()
                .filter(|e| e.get("NAME").is_some())
                .map(|e| CompanyInfo {
                    name: e.text("NAME"),
                    loaded: e.get("LOADED").is_some_and(|v| v.eq_ignore_ascii_case("yes")),
                })
                .collect(),
        ),
        ResponseShape::LedgerLookup => ReportData::LedgerMaster(
            elements
                .iter()
                .find(|e| e.get("NAME").is_some())
                .map(|e| LedgerInfo {
                    name: e.text("NAME"),
                    parent: e.text("PARENT"),
                    opening_balance: e.money("OPENINGBALANCE"),
                }),
        ),
        ResponseShape::StockLookup => ReportData::StockItemMaster {
            exists: elements.iter().any(|e| e.get("NAME").is_some()),
        },
        ResponseShape::Import => unreachable!("imports are decoded separately"),
    };
    EngineResult::Success(Acceptance::report(data))
}

fn named_amounts(elements: &[FlatElement], container: &str) -> Vec<NamedAmount> {
    elements
        .iter()
        .filter(|e| e.name == container && e.get("NAME").is_some())
        .map(|e| NamedAmount {
            name: e.text("NAME"),
            amount: e.money("AMOUNT"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn import(body: &str) -> EngineResult {
        decode_response(ResponseShape::Import, body.as_bytes())
    }

    #[test]
    fn empty_body_is_transient() {
        assert_eq!(
            import("   \n "),
            EngineResult::TransientFailure(TransientReason::EmptyResponse)
        );
        assert_eq!(
            decode_response(ResponseShape::TrialBalance, b""),
            EngineResult::TransientFailure(TransientReason::EmptyResponse)
        );
    }

    #[test]
    fn malformed_body_is_transient() {
        let result = import("<ENVELOPE><CREATED>1</CREA");
        assert!(matches!(
            result,
            EngineResult::TransientFailure(TransientReason::MalformedResponse(_))
        ));
    }

    #[test]
    fn well_formed_but_unknown_is_transient() {
        let result = import("<ENVELOPE><SOMETHING>1</SOMETHING></ENVELOPE>");
        assert_eq!(
            result,
            EngineResult::TransientFailure(TransientReason::UnrecognizedResponse)
        );
    }

    #[test]
    fn full_acceptance_with_reference() {
        let result = import(
            "<ENVELOPE><IMPORTRESULT>\
             <CREATED>1</CREATED><ALTERED>0</ALTERED><ERRORS>0</ERRORS>\
             <LASTVCHID>2841</LASTVCHID>\
             </IMPORTRESULT></ENVELOPE>",
        );
        assert_eq!(
            result,
            EngineResult::Success(Acceptance::imported(1, 0, Some("2841".into())))
        );
    }

    #[test]
    fn partial_acceptance_keeps_error_lines() {
        let result = import(
            "<ENVELOPE><IMPORTRESULT>\
             <CREATED>2</CREATED><ALTERED>0</ALTERED><ERRORS>1</ERRORS>\
             </IMPORTRESULT>\
             <LINEERROR>Ledger 'Freight' does not exist</LINEERROR>\
             </ENVELOPE>",
        );
        match result {
            EngineResult::PartialSuccess { accepted, errors } => {
                assert_eq!(accepted, 2);
                assert_eq!(errors.len(), 1);
                assert!(errors[0].message.contains("Freight"));
            }
            other => panic!("expected partial success, got {other:?}"),
        }
    }

    #[test]
    fn partial_acceptance_pads_missing_error_lines() {
        let result = import(
            "<ENVELOPE><CREATED>1</CREATED><ALTERED>0</ALTERED><ERRORS>2</ERRORS></ENVELOPE>",
        );
        match result {
            EngineResult::PartialSuccess { accepted, errors } => {
                assert_eq!(accepted, 1);
                assert_eq!(errors.len(), 2);
            }
            other => panic!("expected partial success, got {other:?}"),
        }
    }

    #[test]
    fn oversized_counters_classify_without_panic() {
        // Counters near u32::MAX must not overflow the accepted sum.
        let result = import(
            "<ENVELOPE><CREATED>4294967295</CREATED>\
             <ALTERED>4294967295</ALTERED><ERRORS>0</ERRORS></ENVELOPE>",
        );
        assert!(matches!(result, EngineResult::Success(_)));

        // A garbage ERRORS counter must not drive an unbounded padding.
        let result = import(
            "<ENVELOPE><CREATED>1</CREATED><ALTERED>0</ALTERED>\
             <ERRORS>4294967295</ERRORS></ENVELOPE>",
        );
        match result {
            EngineResult::PartialSuccess { errors, .. } => {
                assert_eq!(errors.len(), MAX_PADDED_ERRORS);
            }
            other => panic!("expected partial success, got {other:?}"),
        }
    }

    #[test]
    fn total_rejection_is_permanent() {
        let result = import(
            "<ENVELOPE><CREATED>0</CREATED><ALTERED>0</ALTERED><ERRORS>1</ERRORS>\
             <LINEERROR>Voucher date out of range</LINEERROR></ENVELOPE>",
        );
        match result {
            EngineResult::PermanentFailure(rejection) => {
                assert!(rejection.message.contains("out of range"));
            }
            other => panic!("expected permanent failure, got {other:?}"),
        }
    }

    #[test]
    fn trial_balance_rows() {
        let body = "<ENVELOPE>\
             <LEDGER><NAME>Cash</NAME><DEBIT>1500.00</DEBIT><CREDIT>0</CREDIT></LEDGER>\
             <LEDGER><NAME>Sales</NAME><DEBIT>0</DEBIT><CREDIT>1500.00</CREDIT></LEDGER>\
             </ENVELOPE>";
        let result = decode_response(ResponseShape::TrialBalance, body.as_bytes());
        match result {
            EngineResult::Success(acceptance) => match acceptance.report {
                Some(ReportData::TrialBalance(rows)) => {
                    assert_eq!(rows.len(), 2);
                    assert_eq!(rows[0].ledger, "Cash");
                    assert_eq!(rows[0].debit, Money::from_major(1500));
                    assert_eq!(rows[1].credit, Money::from_major(1500));
                }
                other => panic!("expected trial balance, got {other:?}"),
            },
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn balance_sheet_splits_sides() {
        let body = "<ENVELOPE>\
             <ASSET><NAME>Bank</NAME><AMOUNT>9000.00</AMOUNT></ASSET>\
             <LIABILITY><NAME>Capital</NAME><AMOUNT>9000.00</AMOUNT></LIABILITY>\
             </ENVELOPE>";
        let result = decode_response(ResponseShape::BalanceSheet, body.as_bytes());
        match result {
            EngineResult::Success(Acceptance {
                report: Some(ReportData::BalanceSheet { assets, liabilities }),
                ..
            }) => {
                assert_eq!(assets.len(), 1);
                assert_eq!(assets[0].name, "Bank");
                assert_eq!(liabilities[0].amount, Money::from_major(9000));
            }
            other => panic!("expected balance sheet, got {other:?}"),
        }
    }

    #[test]
    fn stock_summary_rows() {
        let body = "<ENVELOPE>\
             <STOCKITEM><NAME>Widget</NAME>\
             <CLOSINGBALANCE>12.500</CLOSINGBALANCE>\
             <CLOSINGVALUE>318.75</CLOSINGVALUE></STOCKITEM>\
             </ENVELOPE>";
        let result = decode_response(ResponseShape::StockSummary, body.as_bytes());
        match result {
            EngineResult::Success(Acceptance {
                report: Some(ReportData::StockSummary(rows)),
                ..
            }) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].quantity, Quantity::from_milli(12_500));
                assert_eq!(rows[0].value, Money::from_minor(31_875));
            }
            other => panic!("expected stock summary, got {other:?}"),
        }
    }

    #[test]
    fn company_list_reads_loaded_flag() {
        let body = "<ENVELOPE>\
             <COMPANY><NAME>Demo Co</NAME><LOADED>Yes</LOADED></COMPANY>\
             <COMPANY><NAME>Old Co</NAME><LOADED>No</LOADED></COMPANY>\
             </ENVELOPE>";
        let result = decode_response(ResponseShape::CompanyList, body.as_bytes());
        match result {
            EngineResult::Success(Acceptance {
                report: Some(ReportData::Companies(companies)),
                ..
            }) => {
                assert!(companies[0].loaded);
                assert!(!companies[1].loaded);
            }
            other => panic!("expected companies, got {other:?}"),
        }
    }

    #[test]
    fn ledger_lookup_hit_and_miss() {
        let hit = "<ENVELOPE><LEDGER>\
             <NAME>Acme Traders</NAME><PARENT>Sundry Debtors</PARENT>\
             <OPENINGBALANCE>5000.00</OPENINGBALANCE>\
             </LEDGER></ENVELOPE>";
        let result = decode_response(ResponseShape::LedgerLookup, hit.as_bytes());
        match result {
            EngineResult::Success(Acceptance {
                report: Some(ReportData::LedgerMaster(Some(info))),
                ..
            }) => {
                assert_eq!(info.name, "Acme Traders");
                assert_eq!(info.parent, "Sundry Debtors");
                assert_eq!(info.opening_balance, Money::from_major(5000));
            }
            other => panic!("expected ledger info, got {other:?}"),
        }

        let miss = "<ENVELOPE></ENVELOPE>";
        let result = decode_response(ResponseShape::LedgerLookup, miss.as_bytes());
        assert_eq!(
            result,
            EngineResult::Success(Acceptance::report(ReportData::LedgerMaster(None)))
        );
    }

    #[test]
    fn ledger_fields_survive_echoed_lookup() {
        use crate::envelope::{encode, CompanyContext};
        use crate::record::{DomainRecord, LedgerMaster, ReportQuery};

        let master = LedgerMaster::new("A & B Traders", "Sundry Debtors")
            .with_opening_balance(Money::from_minor(123_456));
        let query = DomainRecord::Report(ReportQuery::LedgerLookup {
            name: master.name.clone(),
        });
        let envelope = encode(&query, &CompanyContext::active());
        assert_eq!(envelope.shape, ResponseShape::LedgerLookup);
        assert!(envelope.xml.contains("A &amp; B Traders"));

        // The engine echoes the master back, escaped the same way.
        let body = format!(
            "<ENVELOPE><LEDGER><NAME>{}</NAME><PARENT>{}</PARENT>\
             <OPENINGBALANCE>{}</OPENINGBALANCE></LEDGER></ENVELOPE>",
            quick_xml::escape::escape(master.name.as_str()),
            quick_xml::escape::escape(master.parent_group.as_str()),
            master.opening_balance,
        );
        let result = decode_response(envelope.shape, body.as_bytes());
        match result {
            EngineResult::Success(Acceptance {
                report: Some(ReportData::LedgerMaster(Some(info))),
                ..
            }) => {
                assert_eq!(info.name, master.name);
                assert_eq!(info.parent, master.parent_group);
                assert_eq!(info.opening_balance, master.opening_balance);
            }
            other => panic!("expected ledger info, got {other:?}"),
        }
    }

    #[test]
    fn voucher_acknowledgement_carries_engine_reference() {
        use crate::envelope::{encode, CompanyContext};
        use crate::record::{DomainRecord, LedgerEntryLine, Voucher, VoucherKind};
        use chrono::NaiveDate;

        let date = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        let record = DomainRecord::Voucher(
            Voucher::new(VoucherKind::Sales, date)
                .with_reference("INV-42")
                .with_line(LedgerEntryLine::debit("Party", Money::from_major(100)))
                .with_line(LedgerEntryLine::credit("Sales", Money::from_major(100))),
        );
        let envelope = encode(&record, &CompanyContext::active());
        assert_eq!(envelope.shape, ResponseShape::Import);
        assert!(envelope.xml.contains("<REFERENCE>INV-42</REFERENCE>"));

        let ack = "<ENVELOPE><CREATED>1</CREATED><ALTERED>0</ALTERED>\
                   <ERRORS>0</ERRORS><LASTVCHID>2841</LASTVCHID></ENVELOPE>";
        let result = decode_response(envelope.shape, ack.as_bytes());
        assert_eq!(
            result,
            EngineResult::Success(Acceptance::imported(1, 0, Some("2841".into())))
        );
    }

    #[test]
    fn stock_lookup_existence() {
        let hit = "<ENVELOPE><STOCKITEM><NAME>Widget</NAME></STOCKITEM></ENVELOPE>";
        let result = decode_response(ResponseShape::StockLookup, hit.as_bytes());
        assert_eq!(
            result,
            EngineResult::Success(Acceptance::report(ReportData::StockItemMaster {
                exists: true
            }))
        );
    }
}
