//! Headless-browser rendering for script-heavy pages.
//!
//! The configured browser is run as a subprocess that prints the rendered DOM
//! on stdout (`--headless --disable-gpu --dump-dom <url>`, understood by
//! Chromium and Chrome).

use std::process::Stdio;
use std::time::Duration;

use blogwriter_shared::{BlogWriterError, Result};
use tokio::process::Command;
use tracing::{debug, info};

/// Run `browser_cmd` against `url` and return the dumped DOM.
pub async fn render_dom(browser_cmd: &str, url: &str, timeout: Duration) -> Result<String> {
    info!(cmd = %browser_cmd, %url, "rendering page in headless browser");

    let child = Command::new(browser_cmd)
        .arg("--headless")
        .arg("--disable-gpu")
        .arg("--dump-dom")
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            BlogWriterError::Fetch(format!(
                "failed to spawn browser: {e}. Is `{browser_cmd}` installed?"
            ))
        })?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| {
            BlogWriterError::Fetch(format!(
                "{url}: browser render timed out after {}s",
                timeout.as_secs()
            ))
        })?
        .map_err(|e| BlogWriterError::Fetch(format!("{url}: browser I/O error: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BlogWriterError::Fetch(format!(
            "{url}: browser exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let dom = String::from_utf8_lossy(&output.stdout).into_owned();
    debug!(bytes = dom.len(), "browser render complete");
    Ok(dom)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout() {
        // `echo` stands in for the browser and prints its own arguments.
        let dom = render_dom("echo", "https://example.com", Duration::from_secs(5))
            .await
            .expect("echo render");
        assert_eq!(dom.trim(), "--headless --disable-gpu --dump-dom https://example.com");
    }

    #[tokio::test]
    async fn missing_binary_is_fetch_error() {
        let err = render_dom(
            "blogwriter-no-such-browser",
            "https://example.com",
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BlogWriterError::Fetch(_)));
        assert!(err.to_string().contains("failed to spawn browser"));
    }

    #[tokio::test]
    async fn non_zero_exit_is_fetch_error() {
        let err = render_dom("false", "https://example.com", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("browser exited"));
    }
}
