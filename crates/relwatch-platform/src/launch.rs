use log::{debug, warn};

/// Hand `url` to the OS default handler (browser, download manager) without
/// waiting for it.
///
/// Launch failures are logged and swallowed; the caller has nothing useful to
/// do with them once the request has left the process.
pub fn open_url(url: &str) {
    debug!("Opening {url} with the system handler");
    if let Err(error) = open::that_detached(url) {
        warn!("Failed to open {url}: {error}");
    }
}
