// Defaults and fixed protocol values for the session-data pipeline.

// Base URL of the exchange download endpoint.
pub const DOWNLOAD_URL: &str = "https://www.b3.com.br/pesquisapregao/download";

// Remote file prefix; the daily archive is named SPRE<yymmdd>.zip and the
// inner archive carries the same name.
pub const REMOTE_FILE_PREFIX: &str = "SPRE";

// Object name prefix for the staged document in the hand-off buffer.
pub const DOCUMENT_PREFIX: &str = "BVBG186";

// Two-byte zip signature the downloaded body must start with.
pub const ARCHIVE_SIGNATURE: &[u8] = b"PK";

// Bodies at or below this size are error pages, not archives.
pub const MIN_ARCHIVE_BYTES: usize = 200;

// Timeout for the single download request.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

// Number of records per multi-row insert statement.
pub const INSERT_BATCH_SIZE: usize = 1000;

// How long a connection waits on a locked database before giving up.
pub const DB_BUSY_TIMEOUT_SECS: u64 = 5;
