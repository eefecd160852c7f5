// Resource page scraper
//
// Fetches informational pages and keeps the headline plus paragraph text.

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;

use super::{default_title, Resource, ResourceLibrary};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

pub struct ResourceScraper {
    client: Client,
    sources: Vec<String>,
    whitespace: Regex,
}

impl ResourceScraper {
    pub fn new(sources: Vec<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            sources,
            whitespace: Regex::new(r"\s+")?,
        })
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Pull the first `h1` and every non-empty paragraph out of a page
    pub fn extract(&self, html: &str, fallback_title: &str) -> Resource {
        let document = Html::parse_document(html);

        let title = Selector::parse("h1")
            .ok()
            .and_then(|selector| {
                document
                    .select(&selector)
                    .next()
                    .map(|h1| self.collapse(&h1.text().collect::<String>()))
            })
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| fallback_title.to_string());

        let paragraphs: Vec<String> = match Selector::parse("p") {
            Ok(selector) => document
                .select(&selector)
                .map(|p| self.collapse(&p.text().collect::<String>()))
                .filter(|text| !text.is_empty())
                .collect(),
            Err(_) => Vec::new(),
        };

        Resource {
            title,
            content: paragraphs.join("\n\n"),
        }
    }

    fn collapse(&self, text: &str) -> String {
        self.whitespace.replace_all(text, " ").trim().to_string()
    }

    /// Fetch and extract one page
    pub async fn fetch(&self, url: &str, fallback_title: &str) -> Result<Resource> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Fetching {} failed with status {}", url, status);
        }

        let html = response
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;

        let resource = self.extract(&html, fallback_title);
        if resource.content.is_empty() {
            anyhow::bail!("No paragraph text found at {}", url);
        }
        Ok(resource)
    }

    /// Scrape every source into the library, one file per source
    ///
    /// A source that cannot be fetched gets a placeholder file, so the
    /// library always ends up with one entry per source. Returns how many
    /// sources were fetched successfully.
    pub async fn scrape_into(&self, library: &ResourceLibrary) -> Result<usize> {
        let mut fetched = 0;

        for (index, url) in self.sources.iter().enumerate() {
            let number = index + 1;
            let resource = match self.fetch(url, &default_title(number)).await {
                Ok(resource) => {
                    fetched += 1;
                    tracing::info!(url = %url, title = %resource.title, "Scraped resource");
                    resource
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %format!("{:#}", e), "Scrape failed, writing placeholder");
                    Resource::placeholder(number)
                }
            };

            library.write(number, &resource).await?;
        }

        Ok(fetched)
    }
}
