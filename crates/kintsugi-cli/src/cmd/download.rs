use std::io::IsTerminal;

use kintsugi_core::commands;
use kintsugi_core::commands::download::DownloadRequest;
use kintsugi_core::config::KintsugiConfig;

use crate::format::format_bytes;
use crate::progress::DownloadProgressRenderer;
use crate::prompt::prompt_line;

pub(crate) fn run_download(
    config: &KintsugiConfig,
    url: Option<&str>,
    out: Option<&str>,
    jobs: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let url = match url {
        Some(u) => u.to_string(),
        None => {
            if !std::io::stdin().is_terminal() {
                return Err("no series URL given and stdin is not a terminal".into());
            }
            let entered = prompt_line("Series URL: ")?;
            if entered.is_empty() {
                return Err("no series URL given".into());
            }
            entered
        }
    };

    let show_progress = std::io::stderr().is_terminal();
    let req = DownloadRequest {
        series_url: &url,
        output_dir: out,
        jobs,
    };

    let stats = if show_progress {
        let mut renderer = DownloadProgressRenderer::new();
        let mut on_progress = |event| renderer.on_event(event);
        let result = commands::download::run_with_progress(config, req, Some(&mut on_progress));
        renderer.finish();
        result
    } else {
        commands::download::run(config, req)
    }
    .map_err(|e| -> Box<dyn std::error::Error> { Box::new(e) })?;

    println!(
        "Downloaded {} chapters, {} pages ({})",
        stats.chapters,
        stats.pages,
        format_bytes(stats.bytes_written)
    );
    if stats.pages_skipped > 0 {
        println!(
            "  Skipped {} pages with no published key",
            stats.pages_skipped
        );
    }
    if stats.pages_failed > 0 || stats.chapters_failed > 0 {
        println!(
            "  Failed: {} pages, {} chapters",
            stats.pages_failed, stats.chapters_failed
        );
    }
    Ok(())
}
