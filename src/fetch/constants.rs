//! Timeout defaults for page fetches.

use std::time::Duration;

/// Connect timeout for disclosure-file fetches.
pub const DISCLOSURE_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Read timeout for disclosure-file fetches.
pub const DISCLOSURE_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Connect timeout for store pages and store APIs.
pub const STORE_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Read timeout for store pages and store APIs.
pub const STORE_READ_TIMEOUT: Duration = Duration::from_secs(2);
