//! Nyaa torrent index client.
//!
//! Scrapes the uploader listing for search results and each torrent page
//! for its file list.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::config::NyaaConfig;
use crate::matching::CandidateFile;
use crate::metrics;

use super::{ManifestFetcher, SearchError, TorrentCandidate, TorrentIndex};

const USER_AGENT: &str = concat!("kaistream/", env!("CARGO_PKG_VERSION"));

/// Nyaa client implementing both search and manifest fetching.
pub struct NyaaClient {
    client: Client,
    config: NyaaConfig,
}

impl NyaaClient {
    pub fn new(config: NyaaConfig) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SearchError::ConnectionFailed(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn search_url(&self, query: &str) -> String {
        let listing = if self.config.uploader.is_empty() {
            String::new()
        } else {
            format!("/user/{}", urlencoding::encode(&self.config.uploader))
        };
        format!(
            "{}{}?f=0&c=0_0&q={}",
            self.base_url(),
            listing,
            urlencoding::encode(query)
        )
    }

    async fn get_html(&self, url: &str) -> Result<String, SearchError> {
        let start = Instant::now();
        let response = self.client.get(url).send().await;
        metrics::EXTERNAL_REQUEST_DURATION
            .with_label_values(&["nyaa"])
            .observe(start.elapsed().as_secs_f64());
        let response = response?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::ApiError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl TorrentIndex for NyaaClient {
    fn name(&self) -> &str {
        "nyaa"
    }

    async fn search(&self, query: &str) -> Result<Vec<TorrentCandidate>, SearchError> {
        let url = self.search_url(query);
        debug!(url = %url, "Searching Nyaa");

        let html = self.get_html(&url).await?;
        let results = parse_search_results(&html, self.base_url())?;

        debug!(query = %query, results = results.len(), "Nyaa search complete");
        Ok(results)
    }
}

#[async_trait]
impl ManifestFetcher for NyaaClient {
    async fn fetch_manifest(
        &self,
        candidate: &TorrentCandidate,
    ) -> Result<Vec<CandidateFile>, SearchError> {
        let url = candidate
            .details_url
            .as_deref()
            .ok_or_else(|| SearchError::Parse(format!("No torrent page for {}", candidate.title)))?;

        let html = self.get_html(url).await?;
        let files = parse_file_list(&html)?;
        if files.is_empty() {
            warn!(url = %url, "Torrent page has an empty file list");
        }
        Ok(files)
    }
}

fn css(selector: &str) -> Result<Selector, SearchError> {
    Selector::parse(selector)
        .map_err(|e| SearchError::Parse(format!("Invalid selector {}: {:?}", selector, e)))
}

fn text_of(element: &ElementRef<'_>, selector: &Selector) -> String {
    element
        .select(selector)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

fn absolute(base_url: &str, href: &str) -> String {
    if href.starts_with('/') {
        format!("{}{}", base_url, href)
    } else {
        href.to_string()
    }
}

/// Parse a listing page into candidates. Rows without a magnet are skipped.
pub(crate) fn parse_search_results(
    html: &str,
    base_url: &str,
) -> Result<Vec<TorrentCandidate>, SearchError> {
    let document = Html::parse_document(html);

    let row_selector = css("table.torrent-list tbody tr")?;
    let title_selector = css("td:nth-child(2) a:not(.comments)")?;
    let download_selector = css("td:nth-child(3) a[href$='.torrent']")?;
    let magnet_selector = css("td:nth-child(3) a[href^='magnet:']")?;
    let size_selector = css("td:nth-child(4)")?;
    let date_selector = css("td:nth-child(5)")?;
    let seeders_selector = css("td:nth-child(6)")?;
    let leechers_selector = css("td:nth-child(7)")?;
    let downloads_selector = css("td:nth-child(8)")?;

    let mut results = Vec::new();

    for row in document.select(&row_selector) {
        let Some(title_link) = row.select(&title_selector).next() else {
            continue;
        };
        let Some(magnet) = row
            .select(&magnet_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };

        let title = title_link.text().collect::<String>().trim().to_string();
        let mut candidate = TorrentCandidate::new(title, magnet);

        candidate.details_url = title_link
            .value()
            .attr("href")
            .map(|href| absolute(base_url, href));
        candidate.torrent_url = row
            .select(&download_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| absolute(base_url, href));
        candidate.size_text = text_of(&row, &size_selector);

        let date = text_of(&row, &date_selector);
        candidate.published = (!date.is_empty()).then_some(date);
        candidate.seeders = text_of(&row, &seeders_selector).parse().unwrap_or(0);
        candidate.leechers = text_of(&row, &leechers_selector).parse().unwrap_or(0);
        candidate.downloads = text_of(&row, &downloads_selector).parse().unwrap_or(0);

        results.push(candidate);
    }

    Ok(results)
}

/// Parse a torrent page's file tree into a flat file list. Folder entries
/// are dropped; files at any depth are kept in document order.
pub(crate) fn parse_file_list(html: &str) -> Result<Vec<CandidateFile>, SearchError> {
    let document = Html::parse_document(html);

    let item_selector = css(".torrent-file-list li")?;
    let nested_list_selector = css("ul")?;
    let size_selector = css(".file-size")?;

    let mut files = Vec::new();

    for item in document.select(&item_selector) {
        if item.select(&nested_list_selector).next().is_some() {
            continue;
        }

        let size_text = text_of(&item, &size_selector);
        let full_text = item.text().collect::<String>();
        let name = if size_text.is_empty() {
            full_text.trim().to_string()
        } else {
            full_text.replace(&size_text, "").trim().to_string()
        };

        if name.is_empty() {
            continue;
        }

        let size = size_text.trim_matches(|c| c == '(' || c == ')');
        files.push(CandidateFile::new(name, parse_size(size)));
    }

    Ok(files)
}

/// Parse sizes like "1.2 GiB", "350 MB" or "700KiB" into bytes (0 if unknown).
pub fn parse_size(size: &str) -> u64 {
    let clean = size.trim().to_uppercase();
    let parts: Vec<&str> = clean.split_whitespace().collect();
    if parts.is_empty() {
        return 0;
    }

    let (number, unit) = if parts.len() >= 2 {
        (parts[0], parts[1])
    } else {
        let s = parts[0];
        let pos = s.find(|c: char| c.is_alphabetic()).unwrap_or(s.len());
        (&s[..pos], &s[pos..])
    };

    let value: f64 = number.parse().unwrap_or(0.0);

    let multiplier: u64 = match unit {
        "KIB" | "KB" => 1024,
        "MIB" | "MB" => 1024 * 1024,
        "GIB" | "GB" => 1024 * 1024 * 1024,
        "TIB" | "TB" => 1024 * 1024 * 1024 * 1024,
        _ => 1,
    };

    (value * multiplier as f64) as u64
}
