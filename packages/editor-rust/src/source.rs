//! Where document text comes from.

use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;

/// Asynchronously produces the raw text of a GeoJSON document.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetches the whole document. Called once per load; no retry.
    async fn fetch(&self) -> anyhow::Result<String>;

    /// Short description for logs and error messages.
    fn describe(&self) -> String;
}

/// Reads a document from the local filesystem.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DocumentSource for FileSource {
    async fn fetch(&self) -> anyhow::Result<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading {}", self.path.display()))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Fetches a document over HTTP(S) with a plain GET.
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSource {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, reqwest::Client::new())
    }

    /// Uses a preconfigured client (proxies, headers).
    #[must_use]
    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    async fn fetch(&self) -> anyhow::Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("GET {}", self.url))?
            .error_for_status()?;
        Ok(response.text().await?)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// In-memory document text.
#[derive(Debug, Clone)]
pub struct StaticSource(pub String);

#[async_trait]
impl DocumentSource for StaticSource {
    async fn fetch(&self) -> anyhow::Result<String> {
        Ok(self.0.clone())
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_source_reads_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("countries.geojson");
        tokio::fs::write(&path, "{}").await.unwrap();

        let source = FileSource::new(&path);
        assert_eq!(source.fetch().await.unwrap(), "{}");
        assert!(source.describe().ends_with("countries.geojson"));
    }

    #[tokio::test]
    async fn missing_file_names_the_path() {
        let source = FileSource::new("/nonexistent/countries.geojson");
        let err = source.fetch().await.unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/countries.geojson"));
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() {
        let source = HttpSource::new("http://127.0.0.1:1/countries.geojson");
        assert!(source.fetch().await.is_err());
        assert_eq!(source.describe(), "http://127.0.0.1:1/countries.geojson");
    }

    #[tokio::test]
    async fn static_source_returns_text() {
        let source = StaticSource("x".to_string());
        assert_eq!(source.fetch().await.unwrap(), "x");
    }
}
