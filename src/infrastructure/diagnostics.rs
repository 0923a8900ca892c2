//! Raw-page dumps for pages that parsed to nothing
//!
//! When a listing or detail page yields no entries the markup is written to
//! disk for later inspection. Failures here are logged and never propagate.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, warn};

#[async_trait]
pub trait DiagnosticSink: Send + Sync {
    /// Persist `body` under a deterministic `name`
    async fn dump(&self, name: &str, body: &str);
}

/// Writes `{dir}/{name}.html`
#[derive(Debug, Clone)]
pub struct FileDiagnostics {
    dir: PathBuf,
}

impl FileDiagnostics {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        let safe: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.html"))
    }
}

#[async_trait]
impl DiagnosticSink for FileDiagnostics {
    async fn dump(&self, name: &str, body: &str) {
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            warn!("Failed to create diagnostics directory {}: {}", self.dir.display(), e);
            return;
        }

        let path = self.path_for(name);
        match tokio::fs::write(&path, body).await {
            Ok(()) => debug!("Saved page dump to {}", path.display()),
            Err(e) => warn!("Failed to write page dump {}: {}", path.display(), e),
        }
    }
}

/// Discards every dump
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDiagnostics;

#[async_trait]
impl DiagnosticSink for NoopDiagnostics {
    async fn dump(&self, name: &str, _body: &str) {
        debug!("Diagnostics disabled, dropping dump '{}'", name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_named_html_file() {
        let temp = TempDir::new().unwrap();
        let sink = FileDiagnostics::new(temp.path().join("dumps"));

        sink.dump("cinevood_latest_page_2", "<html></html>").await;

        let written = std::fs::read_to_string(temp.path().join("dumps/cinevood_latest_page_2.html")).unwrap();
        assert_eq!(written, "<html></html>");
    }

    #[test]
    fn sanitises_names() {
        let sink = FileDiagnostics::new("/tmp/x");
        assert_eq!(sink.path_for("a/b c"), PathBuf::from("/tmp/x/a_b_c.html"));
    }

    #[tokio::test]
    async fn unwritable_directory_is_swallowed() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        // A regular file where the directory should be
        FileDiagnostics::new(&blocker).dump("page", "body").await;
        assert_eq!(std::fs::read_to_string(&blocker).unwrap(), "x");
    }
}
