//! `kintsugi unscramble` — repair a single scrambled image from disk.
//!
//! Offline counterpart of the download pipeline: the image and its key JSON
//! come from files instead of the viewer page.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{KintsugiError, Result};
use crate::key::ScrambleKey;
use crate::reassemble::reassemble;

pub struct UnscrambleRequest<'a> {
    pub image_path: &'a Path,
    pub key_path: &'a Path,
    /// Defaults to `<stem>.unscrambled.png` next to the input.
    pub output_path: Option<&'a Path>,
}

/// Repair one image; returns the path the output was written to.
pub fn run(req: UnscrambleRequest<'_>) -> Result<PathBuf> {
    let key_text = std::fs::read_to_string(req.key_path).map_err(|e| {
        KintsugiError::Config(format!("cannot read key file '{}': {e}", req.key_path.display()))
    })?;
    let key: ScrambleKey = serde_json::from_str(&key_text)?;

    let raw = std::fs::read(req.image_path)?;
    let scrambled = image::load_from_memory(&raw)?.to_rgba8();
    let repaired = reassemble(&scrambled, &key)?;

    let out_path = match req.output_path {
        Some(path) => path.to_path_buf(),
        None => default_output_path(req.image_path),
    };
    repaired.save_with_format(&out_path, image::ImageFormat::Png)?;
    info!(
        input = %req.image_path.display(),
        output = %out_path.display(),
        "image repaired"
    );
    Ok(out_path)
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("page");
    input.with_file_name(format!("{stem}.unscrambled.png"))
}
