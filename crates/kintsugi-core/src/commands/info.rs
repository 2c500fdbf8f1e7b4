//! `kintsugi info` — inspect a series without downloading anything.

use serde::Serialize;
use tracing::info;

use crate::config::KintsugiConfig;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::site::{self, ChapterLink, SeriesMeta};

use super::util::{collect_chapter_links, sanitize_component};

/// Everything `info` reports about a series.
#[derive(Debug, Serialize)]
pub struct SeriesReport {
    #[serde(flatten)]
    pub meta: SeriesMeta,
    /// Directory name `download` would use for this series.
    pub folder: String,
    pub chapters: Vec<ChapterEntry>,
}

#[derive(Debug, Serialize)]
pub struct ChapterEntry {
    pub title: String,
    pub url: String,
}

impl From<ChapterLink> for ChapterEntry {
    fn from(link: ChapterLink) -> Self {
        Self {
            title: link.title,
            url: link.url,
        }
    }
}

pub fn run(config: &KintsugiConfig, series_url: &str) -> Result<SeriesReport> {
    site::validate_series_url(series_url)?;

    let fetcher = Fetcher::new(
        &config.user_agent,
        config.connect_timeout(),
        config.read_timeout(),
    );

    let html = fetcher.text(series_url)?;
    let meta = site::extract_series_meta(&html)?;
    let chapters = collect_chapter_links(&fetcher, series_url)?;
    info!(title = %meta.title, chapters = chapters.len(), "series resolved");

    Ok(SeriesReport {
        folder: sanitize_component(&meta.folder_name()),
        meta,
        chapters: chapters.into_iter().map(ChapterEntry::from).collect(),
    })
}
