//! Site contract: URL shapes and page extraction.
//!
//! All extraction here is plain textual pattern matching over server-rendered
//! markup. The pages involved are machine-generated and stable, so regexes
//! over known markers beat a full HTML parse; if a pattern stops matching,
//! the command fails with a [`KintsugiError::Scrape`] naming what went
//! missing.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{KintsugiError, Result};
use crate::key::{PageImage, PageKey, ScrambleKey};

/// Series pages live under this prefix; anything else is rejected up front.
pub const SERIES_URL_PREFIX: &str = "https://mangalove.me/comic/";

// ---------------------------------------------------------------------------
// URL shapes
// ---------------------------------------------------------------------------

pub fn validate_series_url(url: &str) -> Result<()> {
    if url.starts_with(SERIES_URL_PREFIX) {
        Ok(())
    } else {
        Err(KintsugiError::InvalidUrl(url.to_string()))
    }
}

/// Chapter listings paginate with a 1-based `page` query parameter.
pub fn listing_page_url(series_url: &str, page: u32) -> String {
    format!("{series_url}?page={page}")
}

/// CDN location of one page image.
pub fn image_url(host: &str, manga_id: &str, series_number: &str, filename: &str) -> String {
    let host = host.trim_end_matches('/');
    format!("{host}/comics/{manga_id}/web/{series_number}/{filename}")
}

// ---------------------------------------------------------------------------
// Extracted page models
// ---------------------------------------------------------------------------

/// Metadata shown on a series page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesMeta {
    pub genre: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
}

impl SeriesMeta {
    /// Directory name for the series, each metadata field bracketed.
    pub fn folder_name(&self) -> String {
        format!(
            "[{}]-[{}]-[{}]-[{}]",
            self.genre, self.author, self.title, self.publisher
        )
    }
}

/// One entry of the chapter listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterLink {
    pub title: String,
    pub url: String,
}

/// Variables embedded in a chapter's viewer script.
#[derive(Debug, Clone)]
pub struct ViewerPage {
    pub pages_count: u32,
    pub manga_id: String,
    pub series_number: String,
    /// Present in the script but unused by any request; kept for debug logs.
    pub chapter_id: Option<String>,
    pub images: Vec<PageImage>,
    pub keys: Vec<PageKey>,
}

impl ViewerPage {
    /// Key published for the given page image, if any.
    pub fn key_for(&self, id: u32) -> Option<&ScrambleKey> {
        self.keys.iter().find(|k| k.id == id).map(|k| &k.key)
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Pull the itemprop metadata off a series page.
///
/// Individual fields may be absent (they end up empty, as they would render
/// on the page); a page with no metadata at all is not a series page.
pub fn extract_series_meta(html: &str) -> Result<SeriesMeta> {
    let meta = SeriesMeta {
        genre: itemprop_text(html, "a", "genre").unwrap_or_default(),
        title: itemprop_text(html, "h1", "name").unwrap_or_default(),
        author: itemprop_text(html, "a", "author").unwrap_or_default(),
        publisher: itemprop_text(html, "a", "publisher").unwrap_or_default(),
    };
    if meta.genre.is_empty()
        && meta.title.is_empty()
        && meta.author.is_empty()
        && meta.publisher.is_empty()
    {
        return Err(KintsugiError::Scrape(
            "series page carries no itemprop metadata".to_string(),
        ));
    }
    Ok(meta)
}

/// Chapter links from one listing page, in page order. A page without a
/// chapter list yields an empty vec, which ends pagination.
pub fn extract_chapter_links(html: &str) -> Vec<ChapterLink> {
    let Some(start) = html.find("list-chapter") else {
        return Vec::new();
    };
    let listing = &html[start..];
    let listing = match listing.find("</ul>") {
        Some(end) => &listing[..end],
        None => listing,
    };

    let Ok(anchor) = Regex::new(r#"(?s)<a[^>]*href=["']([^"']+)["'][^>]*>(.*?)</a>"#) else {
        return Vec::new();
    };
    let Ok(title) = Regex::new(r#"(?s)class=["']title["'][^>]*>(.*?)<"#) else {
        return Vec::new();
    };

    anchor
        .captures_iter(listing)
        .filter_map(|c| {
            let url = c.get(1)?.as_str().to_string();
            let body = c.get(2)?.as_str();
            let t = title
                .captures(body)
                .and_then(|t| t.get(1))
                .map(|m| m.as_str().trim())
                .unwrap_or("");
            Some(ChapterLink {
                title: t.to_string(),
                url,
            })
        })
        .collect()
}

/// Extract the viewer variables from a chapter page. The script block that
/// defines `var pagesCount` carries everything: page count, CDN path parts,
/// and the JSON image/key descriptor lists.
pub fn extract_viewer_page(html: &str) -> Result<ViewerPage> {
    let script = find_viewer_script(html).ok_or_else(|| {
        KintsugiError::Scrape("no script block defines 'var pagesCount'".to_string())
    })?;

    let pages_count = require_var(script, "pagesCount")?
        .parse::<u32>()
        .map_err(|e| KintsugiError::Scrape(format!("pagesCount is not a number: {e}")))?;
    let manga_id = require_var(script, "mangaID")?;
    let series_number = require_var(script, "seriesNumber")?;
    let chapter_id = extract_script_var(script, "chapterID");
    let images: Vec<PageImage> = serde_json::from_str(&require_var(script, "array")?)?;
    let keys: Vec<PageKey> = serde_json::from_str(&require_var(script, "keys")?)?;

    Ok(ViewerPage {
        pages_count,
        manga_id,
        series_number,
        chapter_id,
        images,
        keys,
    })
}

/// Extract `var <name> = <value>;` from script text, with one layer of
/// surrounding quotes removed. The value ends at the first semicolon, which
/// matches how the site emits these assignments (one per line, JSON literals
/// included).
pub fn extract_script_var(script: &str, name: &str) -> Option<String> {
    let pattern = format!(r"var {} = '?(.*?)'?;", regex::escape(name));
    let re = Regex::new(&pattern).ok()?;
    let m = re.captures(script)?.get(1)?;
    Some(trim_quotes(m.as_str()).to_string())
}

fn find_viewer_script(html: &str) -> Option<&str> {
    let re = Regex::new(r"(?s)<script[^>]*>(.*?)</script>").ok()?;
    let body = re
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .find(|body| body.contains("var pagesCount"));
    body
}

fn require_var(script: &str, name: &str) -> Result<String> {
    extract_script_var(script, name).ok_or_else(|| {
        KintsugiError::Scrape(format!("variable '{name}' not found in viewer script"))
    })
}

/// Text content of the first `<tag ... itemprop="prop" ...>` element.
fn itemprop_text(html: &str, tag: &str, prop: &str) -> Option<String> {
    let pattern = format!(r#"<{tag}[^>]*itemprop=["']{prop}["'][^>]*>([^<]*)</{tag}>"#);
    let re = Regex::new(&pattern).ok()?;
    let m = re.captures(html)?.get(1)?;
    Some(m.as_str().trim().to_string())
}

fn trim_quotes(s: &str) -> &str {
    let s = s.strip_prefix(['\'', '"']).unwrap_or(s);
    s.strip_suffix(['\'', '"']).unwrap_or(s)
}
