use std::{
    collections::HashSet,
    error::Error,
    fmt::Display,
    io::{self, BufWriter},
};

use chrono::NaiveDate;
use csv::Writer;
use serde::Serialize;

use crate::http::client;

/// A field value together with where it came from.
///
/// The exchange document omits fields for instruments that did not trade a
/// given statistic. Absent numeric fields are substituted with zero and
/// absent dates with an empty string, and the record is still admitted;
/// `Defaulted` keeps that substitution distinguishable from a value the
/// document actually reported.
#[derive(Debug, Clone, PartialEq)]
pub enum Sourced<T> {
    Reported(T),
    Defaulted(T),
}

impl<T> Sourced<T> {
    pub fn value(&self) -> &T {
        match self {
            Sourced::Reported(v) => v,
            Sourced::Defaulted(v) => v,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, Sourced::Defaulted(_))
    }
}

/// One instrument's trading statistics for one session, as extracted from
/// the exchange document.
#[derive(Debug, Clone, PartialEq)]
pub struct TradingRecord {
    pub ticker: String,               // Instrument symbol, already filtered.
    pub session_date: Sourced<String>, // ISO date text as reported.
    pub open: Sourced<f64>,           // First price of the session.
    pub min: Sourced<f64>,            // Lowest price.
    pub max: Sourced<f64>,            // Highest price.
    pub average: Sourced<f64>,        // Volume-weighted average price.
    pub last: Sourced<f64>,           // Last traded price.
    pub volume: Sourced<i64>,         // Regular-market traded quantity.
}

/// Identity of a record within one session load: ticker plus session date.
pub type RecordKey = (String, String);

impl TradingRecord {
    pub fn key(&self) -> RecordKey {
        (self.ticker.clone(), self.session_date.value().clone())
    }
}

/// A row as persisted in the store; never mutated after insert.
#[derive(Debug, Serialize, PartialEq)]
pub struct PersistedRow {
    pub id: i64,
    pub ticker: String,
    pub session_date: String,
    pub open: f64,
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub last: f64,
    pub volume: i64,
    pub inserted_at: String,
}

/// Formats a session date the way the exchange embeds it in file names.
pub fn yymmdd(date: NaiveDate) -> String {
    date.format("%y%m%d").to_string()
}

/// Collects the distinct session dates present in a record set, in first
/// appearance order.
pub fn session_dates(records: &[TradingRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut dates = Vec::new();
    for record in records {
        let date = record.session_date.value();
        if seen.insert(date.clone()) {
            dates.push(date.clone());
        }
    }
    dates
}

/// Renders persisted rows as CSV bytes for the export command.
pub fn rows_to_csv_vec(rows: &[PersistedRow]) -> Result<Vec<u8>> {
    let buf = BufWriter::new(Vec::new());
    let mut writer = Writer::from_writer(buf);

    writer
        .write_record([
            "id",
            "ticker",
            "session_date",
            "open",
            "min",
            "max",
            "average",
            "last",
            "volume",
            "inserted_at",
        ])
        .map_err(PregaoError::Csv)?;

    for row in rows {
        writer
            .write_record([
                &row.id.to_string(),
                &row.ticker,
                &row.session_date,
                &row.open.to_string(),
                &row.min.to_string(),
                &row.max.to_string(),
                &row.average.to_string(),
                &row.last.to_string(),
                &row.volume.to_string(),
                &row.inserted_at,
            ])
            .map_err(PregaoError::Csv)?;
    }

    let buf = writer
        .into_inner()
        .map_err(|e| PregaoError::Io(e.into_error()))?;
    buf.into_inner()
        .map_err(|e| PregaoError::Io(e.into_error()))
}

pub type Result<T> = std::result::Result<T, PregaoError>;

#[derive(Debug)]
pub enum PregaoError {
    MissingConfig(Vec<String>),
    InvalidDate(String),
    Io(io::Error),
    Http(client::RequestError),
    Archive(zip::result::ZipError),
    MissingInnerArchive(String),
    MissingDocument(String),
    Decode(String),
    Xml(roxmltree::Error),
    ObjectNotFound(String),
    Database(rusqlite::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
}

impl Display for PregaoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Error for PregaoError {}

impl From<io::Error> for PregaoError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<client::RequestError> for PregaoError {
    fn from(value: client::RequestError) -> Self {
        Self::Http(value)
    }
}

impl From<zip::result::ZipError> for PregaoError {
    fn from(value: zip::result::ZipError) -> Self {
        Self::Archive(value)
    }
}

impl From<roxmltree::Error> for PregaoError {
    fn from(value: roxmltree::Error) -> Self {
        Self::Xml(value)
    }
}

impl From<rusqlite::Error> for PregaoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Database(value)
    }
}

impl From<csv::Error> for PregaoError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<serde_json::Error> for PregaoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}
