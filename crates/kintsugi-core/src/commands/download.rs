//! `kintsugi download` — fetch a series end to end.
//!
//! Resolves the series page, walks the paginated chapter listing, then for
//! each chapter scrapes the viewer script and repairs every page image with
//! its published key. Pages within a chapter are processed by a bounded
//! worker pool; a failed page or chapter is logged and skipped, never fatal
//! to the rest of the run.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::{self, KintsugiConfig};
use crate::error::{KintsugiError, Result};
use crate::fetch::Fetcher;
use crate::key::ScrambleKey;
use crate::reassemble::reassemble;
use crate::site::{self, ChapterLink, ViewerPage};

use super::util::{collect_chapter_links, sanitize_component};

/// Run `kintsugi download` for one series.
pub struct DownloadRequest<'a> {
    pub series_url: &'a str,
    /// Overrides the configured output root when set.
    pub output_dir: Option<&'a str>,
    /// Overrides the configured worker count when set.
    pub jobs: Option<usize>,
}

#[derive(Debug, Clone)]
pub enum DownloadProgressEvent {
    SeriesResolved {
        title: String,
        folder: String,
        chapters: usize,
    },
    ChapterStarted {
        index: usize,
        total: usize,
        title: String,
        pages: usize,
    },
    PageFinished {
        chapter: usize,
        page: usize,
        completed: usize,
        total: usize,
        /// Size of the written PNG.
        bytes: u64,
    },
    PageFailed {
        chapter: usize,
        page: usize,
        completed: usize,
        total: usize,
    },
    ChapterFinished {
        index: usize,
        pages: u64,
        failed: u64,
    },
}

#[derive(Debug, Default)]
pub struct DownloadStats {
    pub chapters: u64,
    pub chapters_failed: u64,
    pub pages: u64,
    /// Pages with no published key — never attempted.
    pub pages_skipped: u64,
    /// Pages that failed during fetch, decode, repair, or write.
    pub pages_failed: u64,
    pub bytes_written: u64,
}

pub(crate) fn emit_progress(
    progress: &mut Option<&mut dyn FnMut(DownloadProgressEvent)>,
    event: DownloadProgressEvent,
) {
    if let Some(callback) = progress.as_deref_mut() {
        callback(event);
    }
}

pub fn run(config: &KintsugiConfig, req: DownloadRequest<'_>) -> Result<DownloadStats> {
    run_with_progress(config, req, None)
}

pub fn run_with_progress(
    config: &KintsugiConfig,
    req: DownloadRequest<'_>,
    mut progress: Option<&mut dyn FnMut(DownloadProgressEvent)>,
) -> Result<DownloadStats> {
    site::validate_series_url(req.series_url)?;
    let jobs = effective_jobs(req.jobs, config.jobs);

    let fetcher = Fetcher::new(
        &config.user_agent,
        config.connect_timeout(),
        config.read_timeout(),
    );

    let series_html = fetcher.text(req.series_url)?;
    let meta = site::extract_series_meta(&series_html)?;
    info!(title = %meta.title, author = %meta.author, "resolved series");

    let output_root = match req.output_dir {
        Some(dir) => PathBuf::from(config::expand_tilde(dir)),
        None => config.output_dir_path(),
    };
    let series_dir = output_root.join(sanitize_component(&meta.folder_name()));
    std::fs::create_dir_all(&series_dir)?;

    let chapters = collect_chapter_links(&fetcher, req.series_url)?;
    if chapters.is_empty() {
        warn!("series lists no chapters");
    }
    emit_progress(
        &mut progress,
        DownloadProgressEvent::SeriesResolved {
            title: meta.title.clone(),
            folder: meta.folder_name(),
            chapters: chapters.len(),
        },
    );

    let mut stats = DownloadStats::default();
    for (index, chapter) in chapters.iter().enumerate() {
        let outcome = download_chapter(
            &fetcher,
            config,
            &series_dir,
            index,
            chapters.len(),
            chapter,
            jobs,
            &mut progress,
            &mut stats,
        );
        match outcome {
            Ok(()) => stats.chapters += 1,
            Err(e) => {
                warn!(chapter = %chapter.title, error = %e, "chapter failed, continuing");
                stats.chapters_failed += 1;
            }
        }
    }

    info!(
        chapters = stats.chapters,
        pages = stats.pages,
        skipped = stats.pages_skipped,
        failed = stats.pages_failed,
        bytes = stats.bytes_written,
        "download finished"
    );
    Ok(stats)
}

/// Worker count after CLI override and clamping.
fn effective_jobs(override_jobs: Option<usize>, config_jobs: usize) -> usize {
    override_jobs
        .unwrap_or(config_jobs)
        .clamp(1, config::MAX_JOBS)
}

#[allow(clippy::too_many_arguments)]
fn download_chapter(
    fetcher: &Fetcher,
    config: &KintsugiConfig,
    series_dir: &Path,
    index: usize,
    chapter_total: usize,
    chapter: &ChapterLink,
    jobs: usize,
    progress: &mut Option<&mut dyn FnMut(DownloadProgressEvent)>,
    stats: &mut DownloadStats,
) -> Result<()> {
    let html = fetcher.text(&chapter.url)?;
    let viewer = site::extract_viewer_page(&html)?;
    if let Some(ref chapter_id) = viewer.chapter_id {
        debug!(chapter_id = %chapter_id, "viewer metadata");
    }
    if viewer.pages_count as usize != viewer.images.len() {
        warn!(
            declared = viewer.pages_count,
            listed = viewer.images.len(),
            "page count mismatch in viewer metadata"
        );
    }

    let chapter_dir = series_dir.join(sanitize_component(&chapter.title));
    std::fs::create_dir_all(&chapter_dir)?;

    emit_progress(
        progress,
        DownloadProgressEvent::ChapterStarted {
            index,
            total: chapter_total,
            title: chapter.title.clone(),
            pages: viewer.images.len(),
        },
    );

    let (tasks, skipped) = plan_page_tasks(&viewer, &chapter_dir, &config.image_host);
    stats.pages_skipped += skipped;

    let (pages, failed, bytes) = run_page_pipeline(fetcher, tasks, jobs, index, progress)?;
    stats.pages += pages;
    stats.pages_failed += failed;
    stats.bytes_written += bytes;

    emit_progress(
        progress,
        DownloadProgressEvent::ChapterFinished {
            index,
            pages,
            failed: failed + skipped,
        },
    );
    Ok(())
}

/// One page ready for the worker pool.
struct PageTask {
    page: usize,
    url: String,
    dest: PathBuf,
    key: ScrambleKey,
}

/// Outcome of one page, sent from a worker back to the orchestrator.
enum PageResult {
    Done { page: usize, bytes: u64 },
    Failed { page: usize, error: KintsugiError },
}

/// Pair each page image with its key and output path.
///
/// Images with no published key are counted and dropped here, before any
/// network traffic happens for them.
fn plan_page_tasks(
    viewer: &ViewerPage,
    chapter_dir: &Path,
    image_host: &str,
) -> (Vec<PageTask>, u64) {
    let mut tasks = Vec::with_capacity(viewer.images.len());
    let mut skipped = 0u64;

    for (page, image) in viewer.images.iter().enumerate() {
        match viewer.key_for(image.id) {
            Some(key) => tasks.push(PageTask {
                page,
                url: site::image_url(
                    image_host,
                    &viewer.manga_id,
                    &viewer.series_number,
                    &image.filename,
                ),
                dest: chapter_dir.join(format!("{page}.png")),
                key: key.clone(),
            }),
            None => {
                let e = KintsugiError::KeyMissing(image.filename.clone());
                warn!(page, error = %e, "skipping page");
                skipped += 1;
            }
        }
    }

    (tasks, skipped)
}

/// Fetch, repair, and write every planned page on a bounded worker pool.
///
/// Workers send per-page outcomes over a channel drained on the calling
/// thread, so progress callbacks and counters never need locking. A failed
/// page never cancels its siblings.
fn run_page_pipeline(
    fetcher: &Fetcher,
    tasks: Vec<PageTask>,
    jobs: usize,
    chapter_index: usize,
    progress: &mut Option<&mut dyn FnMut(DownloadProgressEvent)>,
) -> Result<(u64, u64, u64)> {
    if tasks.is_empty() {
        return Ok((0, 0, 0));
    }
    let num_workers = jobs.min(tasks.len()).max(1);
    let total = tasks.len();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_workers)
        .build()
        .map_err(|e| KintsugiError::Other(format!("failed to build thread pool: {e}")))?;

    let mut pages = 0u64;
    let mut failed = 0u64;
    let mut bytes_total = 0u64;

    pool.in_place_scope(|s| {
        let (result_tx, result_rx) = crossbeam_channel::bounded::<PageResult>(num_workers * 2);

        for task in tasks {
            let tx = result_tx.clone();
            s.spawn(move |_| {
                let page = task.page;
                let msg = match process_page(fetcher, &task) {
                    Ok(bytes) => PageResult::Done { page, bytes },
                    Err(error) => PageResult::Failed { page, error },
                };
                // Orchestrator gone means the scope is unwinding; nothing to do.
                let _ = tx.send(msg);
            });
        }
        // Workers hold clones; the loop ends when the last one drops.
        drop(result_tx);

        for msg in &result_rx {
            match msg {
                PageResult::Done { page, bytes } => {
                    pages += 1;
                    bytes_total += bytes;
                    debug!(page, bytes, "page written");
                    emit_progress(
                        progress,
                        DownloadProgressEvent::PageFinished {
                            chapter: chapter_index,
                            page,
                            completed: (pages + failed) as usize,
                            total,
                            bytes,
                        },
                    );
                }
                PageResult::Failed { page, error } => {
                    warn!(page, error = %error, "page failed, continuing");
                    failed += 1;
                    emit_progress(
                        progress,
                        DownloadProgressEvent::PageFailed {
                            chapter: chapter_index,
                            page,
                            completed: (pages + failed) as usize,
                            total,
                        },
                    );
                }
            }
        }
    });

    Ok((pages, failed, bytes_total))
}

/// Fetch one scrambled page, repair it, and write the PNG.
///
/// The output file is written in a single call after a successful encode, so
/// a failure at any stage leaves no partial file behind.
fn process_page(fetcher: &Fetcher, task: &PageTask) -> Result<u64> {
    let raw = fetcher.bytes(&task.url)?;
    let scrambled = image::load_from_memory(&raw)?.to_rgba8();
    let repaired = reassemble(&scrambled, &task.key)?;

    let mut encoded = Vec::new();
    repaired.write_to(
        &mut std::io::Cursor::new(&mut encoded),
        image::ImageFormat::Png,
    )?;
    std::fs::write(&task.dest, &encoded)?;
    Ok(encoded.len() as u64)
}
