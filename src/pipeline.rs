use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::buffer::Buffer;
use crate::config::Config;
use crate::model::{PregaoError, Result, yymmdd};
use crate::run_context::RunContext;
use crate::{constants, dedupe, extract, fetch, store, unpack};

/// The session the nightly trigger targets: the previous calendar day in
/// the exchange's timezone.
pub fn default_session_date() -> NaiveDate {
    let now = Utc::now().with_timezone(&chrono_tz::America::Sao_Paulo);
    now.date_naive() - chrono::Duration::days(1)
}

/// Name under which a session's document is staged in the hand-off buffer.
pub fn document_name(date: NaiveDate) -> String {
    format!("{}_{}.xml", constants::DOCUMENT_PREFIX, yymmdd(date))
}

#[derive(Debug)]
pub struct StageOutcome {
    pub object_name: String,
}

/// Fetches and unpacks the session archive, then stages the document in
/// the hand-off buffer. `Ok(None)` means the exchange had no data for this
/// run; the working directory is removed on every path.
pub async fn stage(config: &Config, date: NaiveDate) -> Result<Option<StageOutcome>> {
    log::info!("staging session {}", date);
    let Some(archive) = fetch::fetch_session_archive(date).await else {
        log::warn!("no session data available for {}, ending run", date);
        return Ok(None);
    };

    let mut ctx = RunContext::new(date)?;
    let staged = stage_archive(&ctx, config, &archive);
    ctx.cleanup();
    staged.map(Some)
}

fn stage_archive(
    ctx: &RunContext,
    config: &Config,
    archive: &fetch::DownloadedArchive,
) -> Result<StageOutcome> {
    log::info!("unpacking {}", archive.name);
    let document = unpack::unpack_session_archive(ctx, &archive.bytes)?;
    let object_name = document_name(ctx.session_date);
    Buffer::new(config).put_file(&object_name, &document)?;
    Ok(StageOutcome { object_name })
}

/// Counters for one load: extraction, deduplication and insert results.
#[derive(Debug, Serialize)]
pub struct LoadOutcome {
    pub accepted: usize,
    pub rejected: usize,
    pub malformed: usize,
    pub duplicates: usize,
    pub attempted: usize,
    pub inserted: usize,
    pub failed: usize,
}

/// Reads the staged document for a session, extracts and deduplicates its
/// records and loads them into the store. A document with no qualifying
/// records ends the run before the store is touched.
pub fn load(config: &Config, conn: &mut Connection, date: NaiveDate) -> Result<LoadOutcome> {
    let object_name = document_name(date);
    log::info!("loading session {} from {}", date, object_name);
    let raw = Buffer::new(config)
        .get(&object_name)?
        .ok_or_else(|| PregaoError::ObjectNotFound(object_name.clone()))?;

    log::info!("extracting records from {} ({} bytes)", object_name, raw.len());
    let (text, _) = extract::decode_document(&raw)?;
    let extraction = extract::extract_records(&text)?;

    let mut outcome = LoadOutcome {
        accepted: extraction.accepted,
        rejected: extraction.rejected,
        malformed: extraction.malformed,
        duplicates: 0,
        attempted: 0,
        inserted: 0,
        failed: 0,
    };

    if extraction.records.is_empty() {
        log::warn!(
            "document for {} contains no qualifying records, store untouched",
            date
        );
        return Ok(outcome);
    }

    let deduped = dedupe::dedupe_records(extraction.records);
    outcome.duplicates = deduped.duplicates;

    log::info!("loading {} records into the store", deduped.records.len());
    let report = store::records::load_records(conn, &deduped.records)?;
    outcome.attempted = report.attempted;
    outcome.inserted = report.inserted;
    outcome.failed = report.failed;

    log::info!(
        "session {} done: {} inserted of {} attempted ({} rejected, {} malformed, {} duplicates, {} failed)",
        date,
        outcome.inserted,
        outcome.attempted,
        outcome.rejected,
        outcome.malformed,
        outcome.duplicates,
        outcome.failed
    );
    Ok(outcome)
}

/// The full scheduled run: stage, then load what was staged. `Ok(None)`
/// when the exchange had no data for the session.
pub async fn run(
    config: &Config,
    conn: &mut Connection,
    date: NaiveDate,
) -> Result<Option<LoadOutcome>> {
    match stage(config, date).await? {
        Some(_) => load(config, conn, date).map(Some),
        None => Ok(None),
    }
}
