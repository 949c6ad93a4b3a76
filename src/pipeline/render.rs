//! PDF generation: drive a headless browser over the assembled document.
//!
//! ## Why a browser?
//!
//! The assembled document is HTML with print CSS (`@page`, forced page
//! breaks). A CSS-paged renderer is the only engine that honours all of it
//! without a second layout implementation, and every machine that edits
//! Markdown tends to have one installed. The browser is an external
//! collaborator behind the [`PdfRenderer`] trait, so tests and embedders can
//! substitute their own backend.
//!
//! By the time HTML reaches this stage every image is an inline `data:` URI
//! and every link is an internal anchor, so there is no network activity to
//! wait for — `--virtual-time-budget` is a guard, not a dependency.

use async_trait::async_trait;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::BundleError;

/// Candidate binary names probed on `$PATH`, in preference order.
const CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
    "brave-browser",
    "msedge",
];

/// Absolute locations probed on macOS, where browsers live outside `$PATH`.
#[cfg(target_os = "macos")]
const APP_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
];

/// Produces the paginated output file from one assembled document.
///
/// The input is fully self-contained (no further external references); the
/// implementation must finish all layout before capturing and honour the
/// `.page-break` marker class as a forced page boundary.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render_pdf(&self, html: &str, dest: &Path) -> Result<(), BundleError>;
}

/// The default renderer: a headless Chromium/Chrome/Edge process.
#[derive(Debug)]
pub struct ChromiumRenderer {
    binary: PathBuf,
    timeout: Duration,
}

impl ChromiumRenderer {
    /// Locate a browser binary.
    ///
    /// Resolution order, most-specific first:
    /// 1. `explicit` — the caller named a binary (`--chromium` / config).
    /// 2. `$MDBUNDLE_CHROMIUM` — chosen at the environment level.
    /// 3. Well-known binary names on `$PATH` (plus the standard application
    ///    bundles on macOS).
    pub fn discover(
        explicit: Option<&Path>,
        timeout: Duration,
    ) -> Result<Self, BundleError> {
        if let Some(path) = explicit {
            if path.is_file() {
                return Ok(Self {
                    binary: path.to_path_buf(),
                    timeout,
                });
            }
            return Err(BundleError::RendererNotFound {
                searched: path.display().to_string(),
            });
        }

        if let Some(path) = std::env::var_os("MDBUNDLE_CHROMIUM") {
            let path = PathBuf::from(path);
            if path.is_file() {
                return Ok(Self {
                    binary: path,
                    timeout,
                });
            }
            return Err(BundleError::RendererNotFound {
                searched: path.display().to_string(),
            });
        }

        for name in CANDIDATES {
            if let Some(path) = find_on_path(name) {
                debug!("using browser binary: {}", path.display());
                return Ok(Self {
                    binary: path,
                    timeout,
                });
            }
        }

        #[cfg(target_os = "macos")]
        for app in APP_PATHS {
            let path = Path::new(app);
            if path.is_file() {
                return Ok(Self {
                    binary: path.to_path_buf(),
                    timeout,
                });
            }
        }

        Err(BundleError::RendererNotFound {
            searched: CANDIDATES.join(", "),
        })
    }

    /// The resolved browser binary.
    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl PdfRenderer for ChromiumRenderer {
    async fn render_pdf(&self, html: &str, dest: &Path) -> Result<(), BundleError> {
        // The browser needs a URL; hand it the document as a temp file that
        // lives until the process exits.
        let mut page = tempfile::Builder::new()
            .prefix("mdbundle-")
            .suffix(".html")
            .tempfile()
            .map_err(|e| BundleError::Internal(format!("temp file: {e}")))?;
        page.write_all(html.as_bytes())
            .map_err(|e| BundleError::Internal(format!("temp file write: {e}")))?;

        let url = format!("file://{}", page.path().display());
        info!("rendering PDF via {}", self.binary.display());

        let mut command = Command::new(&self.binary);
        command
            .arg("--headless")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--hide-scrollbars")
            .arg("--no-pdf-header-footer")
            .arg("--virtual-time-budget=10000")
            .arg(format!("--print-to-pdf={}", dest.display()))
            .arg(&url)
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(BundleError::RenderFailed {
                    detail: format!("failed to launch '{}': {e}", self.binary.display()),
                });
            }
            // Dropping the future kills the child (kill_on_drop).
            Err(_) => {
                return Err(BundleError::RenderTimeout {
                    secs: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            return Err(BundleError::RenderFailed {
                detail: format!(
                    "'{}' exited with {}: {}",
                    self.binary.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        if !dest.is_file() {
            return Err(BundleError::RenderFailed {
                detail: format!(
                    "'{}' exited successfully but produced no file at '{}'",
                    self.binary.display(),
                    dest.display()
                ),
            });
        }

        Ok(())
    }
}

/// Search `$PATH` for an executable with the given name.
fn find_on_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}
