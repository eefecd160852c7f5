// Informational resource cache
//
// Scraped pages live as `scraped_data_{n}.txt` files (1-based), each starting
// with a `TITLE:` line followed by a blank line and the body text.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod scrape;

pub use scrape::ResourceScraper;

const FILE_PREFIX: &str = "scraped_data_";
const FILE_SUFFIX: &str = ".txt";
const TITLE_PREFIX: &str = "TITLE:";
const PLACEHOLDER_BODY: &str =
    "This content is temporarily unavailable. Please try refreshing later.";

/// Title used when a page or cache file has none
pub fn default_title(number: usize) -> String {
    format!("Mental Health Resource {}", number)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub title: String,
    pub content: String,
}

impl Resource {
    pub fn placeholder(number: usize) -> Self {
        Self {
            title: default_title(number),
            content: PLACEHOLDER_BODY.to_string(),
        }
    }

    /// Parse a cache file body
    pub fn parse(number: usize, text: &str) -> Self {
        let text = text.trim_start_matches('\u{feff}');
        let (first_line, rest) = text.split_once('\n').unwrap_or((text, ""));

        match first_line.trim().strip_prefix(TITLE_PREFIX) {
            Some(title) => {
                let title = title.trim();
                Self {
                    title: if title.is_empty() {
                        default_title(number)
                    } else {
                        title.to_string()
                    },
                    content: rest.trim().to_string(),
                }
            }
            None => Self {
                title: default_title(number),
                content: text.trim().to_string(),
            },
        }
    }

    pub fn to_file_contents(&self) -> String {
        format!("{} {}\n\n{}", TITLE_PREFIX, self.title, self.content)
    }
}

/// Body of the `/resources` endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ResourcesPayload {
    pub resources: Vec<Resource>,
    /// Whether the cache was rebuilt for this request
    pub updated: bool,
}

/// Directory of cached resource files
#[derive(Debug, Clone)]
pub struct ResourceLibrary {
    dir: PathBuf,
}

impl ResourceLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self, number: usize) -> PathBuf {
        self.dir.join(format!("{}{}{}", FILE_PREFIX, number, FILE_SUFFIX))
    }

    pub async fn write(&self, number: usize, resource: &Resource) -> Result<()> {
        let path = self.file_path(number);
        tokio::fs::write(&path, resource.to_file_contents())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Cached resources for files `1..=count`, in file order
    ///
    /// Missing files are skipped. A file that cannot be read is logged and
    /// skipped so one bad entry does not hide the rest.
    pub async fn read_cached(&self, count: usize) -> Vec<Resource> {
        let mut resources = Vec::new();

        for number in 1..=count {
            let path = self.file_path(number);
            match tokio::fs::read_to_string(&path).await {
                Ok(text) => resources.push(Resource::parse(number, &text)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable resource file");
                }
            }
        }

        resources
    }

    /// Serve the cache, scraping first when asked to or when it is empty
    pub async fn load(&self, scraper: &ResourceScraper, refresh: bool) -> Result<ResourcesPayload> {
        let created = !tokio::fs::try_exists(&self.dir).await.unwrap_or(false);
        if created {
            tokio::fs::create_dir_all(&self.dir)
                .await
                .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        }

        let count = scraper.sources().len();
        let mut resources = self.read_cached(count).await;
        let updated = refresh || created || resources.is_empty();

        if updated {
            let fetched = scraper.scrape_into(self).await?;
            tracing::info!(
                fetched,
                sources = count,
                refresh,
                "Resource cache rebuilt"
            );
            resources = self.read_cached(count).await;
        }

        Ok(ResourcesPayload { resources, updated })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_titled_file() {
        let resource = Resource::parse(1, "TITLE: Depression\n\nWhat is depression?\n\nMore text.");
        assert_eq!(resource.title, "Depression");
        assert_eq!(resource.content, "What is depression?\n\nMore text.");
    }

    #[test]
    fn test_parse_untitled_file() {
        let resource = Resource::parse(3, "Just a body");
        assert_eq!(resource.title, "Mental Health Resource 3");
        assert_eq!(resource.content, "Just a body");
    }

    #[test]
    fn test_placeholder_round_trips_through_file_format() {
        let placeholder = Resource::placeholder(4);
        assert_eq!(
            placeholder.to_file_contents(),
            "TITLE: Mental Health Resource 4\n\nThis content is temporarily unavailable. Please try refreshing later."
        );
        assert_eq!(Resource::parse(4, &placeholder.to_file_contents()), placeholder);
    }

    #[tokio::test]
    async fn test_unreadable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let library = ResourceLibrary::new(dir.path());
        library
            .write(1, &Resource {
                title: "Anxiety".to_string(),
                content: "Anxiety is common.".to_string(),
            })
            .await
            .unwrap();
        std::fs::write(library.file_path(2), [0xff, 0xfe, 0x00]).unwrap();
        library.write(3, &Resource::placeholder(3)).await.unwrap();

        let resources = library.read_cached(3).await;
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].title, "Anxiety");
        assert_eq!(resources[1], Resource::placeholder(3));
    }

    #[tokio::test]
    async fn test_only_configured_sources_are_served() {
        let dir = tempfile::tempdir().unwrap();
        let library = ResourceLibrary::new(dir.path());
        for number in 1..=4 {
            library.write(number, &Resource::placeholder(number)).await.unwrap();
        }

        let resources = library.read_cached(2).await;
        assert_eq!(
            resources,
            vec![Resource::placeholder(1), Resource::placeholder(2)]
        );
        assert!(library.read_cached(0).await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_directory_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let library = ResourceLibrary::new(dir.path().join("absent"));
        assert!(library.read_cached(5).await.is_empty());
    }
}
