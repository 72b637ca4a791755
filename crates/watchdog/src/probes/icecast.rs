//! Stream-source presence on an Icecast server.

use super::SignalProbe;
use crate::types::{ProbeOutcome, ProbeReport};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

static SOURCE_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    // Matches <source mount="..."> but not <sources> or <source_client_connections>
    Regex::new(r"<source\b[^>]*>").expect("static regex")
});

static COMMENT_OR_CDATA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--.*?-->|<!\[CDATA\[.*?\]\]>").expect("static regex")
});

/// Count `<source>` elements in an Icecast `/admin/stats` document.
///
/// This is a text scan, not an XML parse. Comments and CDATA sections are
/// dropped first; other markup that merely looks like a `<source>` tag
/// (e.g. inside an attribute value) would still be counted.
pub fn count_sources(xml: &str) -> usize {
    let visible = COMMENT_OR_CDATA.replace_all(xml, "");
    SOURCE_ELEMENT.find_iter(&visible).count()
}

/// Checks that at least one source is connected to the streaming server
pub struct IcecastProbe {
    stats_url: String,
    username: String,
    password: String,
    client: reqwest::Client,
}

impl IcecastProbe {
    /// Create a new Icecast probe for the server at `base_url`
    pub fn new(
        base_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout_duration: Duration,
    ) -> common::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout_duration)
            .build()
            .map_err(common::Error::probe)?;

        Ok(Self {
            stats_url: format!("{}/admin/stats", base_url.trim_end_matches('/')),
            username: username.into(),
            password: password.into(),
            client,
        })
    }

    async fn fetch_stats(&self) -> Result<String, reqwest::Error> {
        self.client
            .get(&self.stats_url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl SignalProbe for IcecastProbe {
    async fn probe(&self) -> ProbeReport {
        let start = Instant::now();

        match self.fetch_stats().await {
            Ok(body) => {
                let duration = start.elapsed();
                let sources = count_sources(&body);
                if sources == 0 {
                    warn!(url = %self.stats_url, "Sources are null or empty");
                    ProbeReport::new(ProbeOutcome::fail("no active sources"), duration)
                } else {
                    debug!(url = %self.stats_url, sources, "Icecast sources connected");
                    ProbeReport::new(ProbeOutcome::Pass, duration)
                }
            }
            Err(e) => {
                let duration = start.elapsed();
                warn!(url = %self.stats_url, error = %e, "Icecast stats request failed");
                ProbeReport::new(
                    ProbeOutcome::error(format!("Icecast stats request failed: {}", e)),
                    duration,
                )
            }
        }
    }

    fn name(&self) -> &str {
        "icecast"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATS: &str = r#"<?xml version="1.0"?>
<icestats>
  <admin>icemaster@localhost</admin>
  <source_client_connections>3</source_client_connections>
  <sources>2</sources>
  <source mount="/live">
    <listeners>12</listeners>
  </source>
  <source mount="/backup">
    <listeners>0</listeners>
  </source>
</icestats>"#;

    #[test]
    fn test_count_sources() {
        assert_eq!(count_sources(STATS), 2);
    }

    #[test]
    fn test_count_sources_empty() {
        let xml = "<icestats><sources>0</sources><source_client_connections>0</source_client_connections></icestats>";
        assert_eq!(count_sources(xml), 0);
        assert_eq!(count_sources(""), 0);
    }

    #[test]
    fn test_count_sources_ignores_comments_and_cdata() {
        let xml = r#"<icestats>
  <!-- <source mount="/old"></source> -->
  <server_id><![CDATA[<source mount="/fake">]]></server_id>
  <source mount="/live"><listeners>3</listeners></source>
</icestats>"#;
        assert_eq!(count_sources(xml), 1);
    }

    #[test]
    fn test_stats_url_normalised() {
        let probe = IcecastProbe::new("http://localhost:8000/", "admin", "hackme", Duration::from_secs(1))
            .unwrap();
        assert_eq!(probe.stats_url, "http://localhost:8000/admin/stats");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_error() {
        let probe = IcecastProbe::new("http://127.0.0.1:1", "admin", "hackme", Duration::from_millis(200))
            .unwrap();

        let report = probe.probe().await;
        assert!(matches!(report.outcome, ProbeOutcome::Error(_)));
    }
}
