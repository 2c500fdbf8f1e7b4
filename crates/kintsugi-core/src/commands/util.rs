//! Helpers shared by the command implementations.

use tracing::debug;

use crate::error::Result;
use crate::fetch::Fetcher;
use crate::site::{self, ChapterLink};

/// Walk the paginated chapter listing and collect every chapter link.
///
/// Pagination runs from page 1 upward and stops on the first 404 or the
/// first page that lists no chapters, whichever comes first.
pub(crate) fn collect_chapter_links(
    fetcher: &Fetcher,
    series_url: &str,
) -> Result<Vec<ChapterLink>> {
    let mut chapters = Vec::new();
    for page in 1u32.. {
        let url = site::listing_page_url(series_url, page);
        let Some(html) = fetcher.text_opt(&url)? else {
            debug!(page, "chapter listing ended with 404");
            break;
        };
        let links = site::extract_chapter_links(&html);
        if links.is_empty() {
            debug!(page, "chapter listing page is empty, stopping");
            break;
        }
        chapters.extend(links);
    }
    Ok(chapters)
}

/// Make a site-provided name safe to use as a single path component.
///
/// Separators and characters that are special on any supported filesystem
/// are replaced, leading/trailing dots and whitespace are trimmed, and an
/// empty result falls back to a placeholder.
pub(crate) fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_matches('.').trim();
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}
