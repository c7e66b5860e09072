use chrono::NaiveDate;

use crate::constants;
use crate::http::client;
use crate::model::yymmdd;

/// The downloaded outer archive, kept in memory for the unpack stage.
#[derive(Debug)]
pub struct DownloadedArchive {
    pub name: String,    // Remote file name, e.g. SPRE240101.zip.
    pub bytes: Vec<u8>, // Raw archive bytes, signature already checked.
}

// Builds the remote file name for a session date.
pub fn remote_file_name(date: NaiveDate) -> String {
    format!("{}{}.zip", constants::REMOTE_FILE_PREFIX, yymmdd(date))
}

/// Fetches the session archive for the given date. Transport failures and
/// non-conforming responses are logged and reported as `None`: the exchange
/// simply has no data for this run (holiday, weekend, not yet published),
/// and the caller ends the run cleanly.
pub async fn fetch_session_archive(date: NaiveDate) -> Option<DownloadedArchive> {
    let name = remote_file_name(date);
    log::info!("downloading {} from {}", name, constants::DOWNLOAD_URL);

    let body = match client::get_bytes(constants::DOWNLOAD_URL, &[("filelist", &name)]).await {
        Ok(body) => body,
        Err(err) => {
            log::error!("download of {} failed: {}", name, err);
            return None;
        }
    };

    if body.len() <= constants::MIN_ARCHIVE_BYTES {
        log::warn!("response for {} is only {} bytes, not an archive", name, body.len());
        return None;
    }
    if !body.starts_with(constants::ARCHIVE_SIGNATURE) {
        log::warn!("response for {} does not carry the zip signature", name);
        return None;
    }

    log::info!("downloaded {} ({} bytes)", name, body.len());
    Some(DownloadedArchive { name, bytes: body })
}
