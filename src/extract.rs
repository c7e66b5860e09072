use lazy_static::lazy_static;
use regex::Regex;
use roxmltree::Node;

use crate::model::{Result, PregaoError, Sourced, TradingRecord};

// Namespace of the exchange pricing document (BVMF price report schema).
pub const DOCUMENT_NS: &str = "urn:bvmf.217.01.xsd";

lazy_static! {
    // Four letters plus one of the equity/unit/BDR suffixes. Everything
    // else (rights, fractional lots, odd derivatives) stays out of the feed.
    static ref VALID_TICKER: Regex = Regex::new(r"^[A-Z]{4}(3|4|5|6|11|34)$").unwrap();
}

/// Whether a ticker belongs to the instrument classes this feed keeps.
pub fn ticker_is_valid(ticker: &str) -> bool {
    VALID_TICKER.is_match(ticker)
}

/// Outcome of one document extraction.
#[derive(Debug)]
pub struct Extraction {
    pub records: Vec<TradingRecord>,
    pub accepted: usize,  // Records passing the ticker filter and parsing.
    pub rejected: usize,  // Tickers outside the accepted grammar.
    pub malformed: usize, // Accepted tickers with unparseable numeric fields.
}

/// Decodes the raw document under the first encoding that decodes cleanly.
/// Returns the text together with the encoding name that was used.
pub fn decode_document(raw: &[u8]) -> Result<(String, &'static str)> {
    // UTF-8 is strict; windows-1252 accepts any byte sequence, so it
    // doubles as the legacy default the exchange used.
    let encodings = [encoding_rs::UTF_8, encoding_rs::WINDOWS_1252];
    for encoding in encodings {
        let (text, _, had_errors) = encoding.decode(raw);
        if !had_errors {
            log::info!("document decoded as {}", encoding.name());
            return Ok((text.into_owned(), encoding.name()));
        }
    }
    Err(PregaoError::Decode(
        "document is not valid under any attempted encoding".to_string(),
    ))
}

// Finds the text of a descendant reached through the given element path,
// matching on local names within the document namespace.
fn child_text<'a>(node: Node<'a, '_>, path: &[&str]) -> Option<&'a str> {
    let mut current = node;
    for name in path {
        current = current.children().find(|c| {
            c.is_element()
                && c.tag_name().name() == *name
                && c.tag_name().namespace() == Some(DOCUMENT_NS)
        })?;
    }
    current.text()
}

// A decimal field: absent means the instrument did not trade the statistic
// and defaults to zero; present but unparseable makes the record malformed.
fn decimal_field(report: Node, path: &[&str]) -> Option<Sourced<f64>> {
    match child_text(report, path) {
        None => Some(Sourced::Defaulted(0.0)),
        Some(text) => text.trim().parse().ok().map(Sourced::Reported),
    }
}

// Same contract as decimal_field, for the integer traded quantity.
fn quantity_field(report: Node, path: &[&str]) -> Option<Sourced<i64>> {
    match child_text(report, path) {
        None => Some(Sourced::Defaulted(0)),
        Some(text) => text.trim().parse().ok().map(Sourced::Reported),
    }
}

// Reads every field of one accepted price report. None means a numeric
// field was present but unparseable.
fn parse_report(report: Node, ticker: &str) -> Option<TradingRecord> {
    let session_date = match child_text(report, &["TradDt", "Dt"]) {
        Some(text) => Sourced::Reported(text.trim().to_string()),
        None => Sourced::Defaulted(String::new()),
    };

    Some(TradingRecord {
        ticker: ticker.to_string(),
        session_date,
        open: decimal_field(report, &["FinInstrmAttrbts", "FrstPric"])?,
        min: decimal_field(report, &["FinInstrmAttrbts", "MinPric"])?,
        max: decimal_field(report, &["FinInstrmAttrbts", "MaxPric"])?,
        average: decimal_field(report, &["FinInstrmAttrbts", "TradAvrgPric"])?,
        last: decimal_field(report, &["FinInstrmAttrbts", "LastPric"])?,
        volume: quantity_field(report, &["FinInstrmAttrbts", "RglrTxsQty"])?,
    })
}

/// Walks every price report in the document and extracts the records whose
/// ticker passes the grammar filter. Rejected tickers are counted without
/// reading any further field. A document with zero qualifying records is a
/// valid outcome, reported through the counters.
pub fn extract_records(text: &str) -> Result<Extraction> {
    let doc = roxmltree::Document::parse(text)?;

    let mut records = Vec::new();
    let mut rejected = 0usize;
    let mut malformed = 0usize;

    for report in doc
        .descendants()
        .filter(|n| n.has_tag_name((DOCUMENT_NS, "PricRpt")))
    {
        let ticker = child_text(report, &["SctyId", "TckrSymb"])
            .unwrap_or("")
            .trim();

        if !ticker_is_valid(ticker) {
            rejected += 1;
            continue;
        }

        match parse_report(report, ticker) {
            Some(record) => records.push(record),
            None => {
                malformed += 1;
                log::warn!("dropping {}: unparseable numeric field", ticker);
            }
        }
    }

    let accepted = records.len();
    log::info!(
        "extraction finished: {} accepted, {} rejected, {} malformed",
        accepted,
        rejected,
        malformed
    );

    Ok(Extraction {
        records,
        accepted,
        rejected,
        malformed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(ticker: &str, date: &str, fields: &str) -> String {
        format!(
            "<PricRpt>\
               <TradDt><Dt>{date}</Dt></TradDt>\
               <SctyId><TckrSymb>{ticker}</TckrSymb></SctyId>\
               <FinInstrmAttrbts>{fields}</FinInstrmAttrbts>\
             </PricRpt>"
        )
    }

    fn document(reports: &str) -> String {
        format!("<Document xmlns=\"{DOCUMENT_NS}\"><BizGrp>{reports}</BizGrp></Document>")
    }

    const FULL_FIELDS: &str = "<FrstPric>36.50</FrstPric>\
                               <MinPric>36.10</MinPric>\
                               <MaxPric>37.20</MaxPric>\
                               <TradAvrgPric>36.75</TradAvrgPric>\
                               <LastPric>37.00</LastPric>\
                               <RglrTxsQty>1000000</RglrTxsQty>";

    #[test]
    fn ticker_grammar_accepts_equity_suffixes() {
        for ticker in ["PETR3", "PETR4", "ITUB5", "BBDC6", "TAEE11", "PETR34", "VALE3"] {
            assert!(ticker_is_valid(ticker), "{ticker} should be accepted");
        }
    }

    #[test]
    fn ticker_grammar_rejects_everything_else() {
        for ticker in ["PETR35", "ABC3", "petr4", "PETR111", "PETR", "PETRA4", "", "VALE39"] {
            assert!(!ticker_is_valid(ticker), "{ticker} should be rejected");
        }
    }

    #[test]
    fn extracts_full_record() {
        let doc = document(&report("PETR4", "2024-01-01", FULL_FIELDS));
        let extraction = extract_records(&doc).unwrap();

        assert_eq!(extraction.accepted, 1);
        assert_eq!(extraction.rejected, 0);
        let record = &extraction.records[0];
        assert_eq!(record.ticker, "PETR4");
        assert_eq!(record.session_date, Sourced::Reported("2024-01-01".to_string()));
        assert_eq!(record.open, Sourced::Reported(36.50));
        assert_eq!(record.min, Sourced::Reported(36.10));
        assert_eq!(record.max, Sourced::Reported(37.20));
        assert_eq!(record.average, Sourced::Reported(36.75));
        assert_eq!(record.last, Sourced::Reported(37.00));
        assert_eq!(record.volume, Sourced::Reported(1_000_000));
    }

    #[test]
    fn filters_invalid_tickers_and_counts_them() {
        let reports = [
            report("PETR4", "2024-01-01", FULL_FIELDS),
            report("PETR35", "2024-01-01", FULL_FIELDS),
            report("XXXX1", "2024-01-01", FULL_FIELDS),
        ]
        .concat();
        let extraction = extract_records(&document(&reports)).unwrap();

        assert_eq!(extraction.accepted, 1);
        assert_eq!(extraction.rejected, 2);
        assert_eq!(extraction.records[0].ticker, "PETR4");
    }

    #[test]
    fn absent_field_is_defaulted_reported_zero_is_not() {
        // No MinPric at all, but LastPric explicitly zero.
        let fields = "<FrstPric>10.0</FrstPric>\
                      <MaxPric>11.0</MaxPric>\
                      <TradAvrgPric>10.5</TradAvrgPric>\
                      <LastPric>0</LastPric>";
        let doc = document(&report("VALE3", "2024-01-01", fields));
        let extraction = extract_records(&doc).unwrap();

        let record = &extraction.records[0];
        assert_eq!(record.min, Sourced::Defaulted(0.0));
        assert!(record.min.is_defaulted());
        assert_eq!(record.last, Sourced::Reported(0.0));
        assert!(!record.last.is_defaulted());
        assert_eq!(record.volume, Sourced::Defaulted(0));
    }

    #[test]
    fn absent_date_is_defaulted_to_empty() {
        let xml = format!(
            "<Document xmlns=\"{DOCUMENT_NS}\"><PricRpt>\
               <SctyId><TckrSymb>PETR4</TckrSymb></SctyId>\
             </PricRpt></Document>"
        );
        let extraction = extract_records(&xml).unwrap();
        let record = &extraction.records[0];
        assert_eq!(record.session_date, Sourced::Defaulted(String::new()));
    }

    #[test]
    fn unparseable_numeric_drops_only_that_record() {
        let reports = [
            report("PETR4", "2024-01-01", "<FrstPric>not-a-price</FrstPric>"),
            report("VALE3", "2024-01-01", FULL_FIELDS),
        ]
        .concat();
        let extraction = extract_records(&document(&reports)).unwrap();

        assert_eq!(extraction.accepted, 1);
        assert_eq!(extraction.malformed, 1);
        assert_eq!(extraction.records[0].ticker, "VALE3");
    }

    #[test]
    fn document_without_reports_yields_zero_records() {
        let extraction = extract_records(&document("")).unwrap();
        assert!(extraction.records.is_empty());
        assert_eq!(extraction.accepted, 0);
        assert_eq!(extraction.rejected, 0);
    }

    #[test]
    fn elements_outside_the_namespace_are_ignored() {
        let xml = format!(
            "<Document xmlns=\"{DOCUMENT_NS}\">\
               <PricRpt xmlns=\"urn:other\">\
                 <SctyId><TckrSymb>PETR4</TckrSymb></SctyId>\
               </PricRpt>\
             </Document>"
        );
        let extraction = extract_records(&xml).unwrap();
        assert!(extraction.records.is_empty());
        assert_eq!(extraction.rejected, 0);
    }

    #[test]
    fn decodes_utf8_documents() {
        let (text, encoding) = decode_document("<doc>ação</doc>".as_bytes()).unwrap();
        assert_eq!(encoding, "UTF-8");
        assert!(text.contains("ação"));
    }

    #[test]
    fn falls_back_to_windows_1252() {
        // "ação" in windows-1252; invalid as UTF-8.
        let raw = b"<doc>a\xe7\xe3o</doc>";
        let (text, encoding) = decode_document(raw).unwrap();
        assert_eq!(encoding, "windows-1252");
        assert!(text.contains("ação"));
    }
}
