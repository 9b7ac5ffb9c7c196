//! User-Agent string sent with every download request.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/grabfile/grabfile";

/// Default User-Agent for download requests (identifies the tool and version).
#[must_use]
pub(crate) fn default_download_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("grabfile/{version} (+{PROJECT_UA_URL})")
}
