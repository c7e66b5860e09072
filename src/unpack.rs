use std::fs::{self, File};
use std::io::Cursor;
use std::path::PathBuf;

use zip::ZipArchive;

use crate::model::{PregaoError, Result, yymmdd};
use crate::run_context::RunContext;

/// Unpacks the downloaded session archive inside the run's working area.
///
/// The outer archive must contain an inner archive named after the session
/// date (SPRE<yymmdd>.zip), which in turn contains the pricing document.
/// Returns the path of the extracted XML document. A corrupt archive at
/// either stage, a missing inner archive, or a missing document all fail
/// the run.
pub fn unpack_session_archive(ctx: &RunContext, archive: &[u8]) -> Result<PathBuf> {
    // First stage: outer archive.
    let outer_dir = ctx.dir().join("outer");
    let mut outer = ZipArchive::new(Cursor::new(archive))?;
    outer.extract(&outer_dir)?;
    log::info!("outer archive extracted ({} entries)", outer.len());

    // The inner archive is named after the session date.
    let inner_name = format!("SPRE{}.zip", yymmdd(ctx.session_date));
    let inner_path = outer_dir.join(&inner_name);
    if !inner_path.is_file() {
        return Err(PregaoError::MissingInnerArchive(inner_name));
    }

    // Second stage: inner archive.
    let inner_dir = ctx.dir().join("inner");
    let mut inner = ZipArchive::new(File::open(&inner_path)?)?;
    inner.extract(&inner_dir)?;
    log::info!("inner archive {} extracted ({} entries)", inner_name, inner.len());

    // Locate the pricing document.
    for entry in fs::read_dir(&inner_dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("xml")) {
            log::info!("session document: {}", path.display());
            return Ok(path);
        }
    }
    Err(PregaoError::MissingDocument(inner_name))
}
