use std::path::Path;

use kintsugi_core::commands::unscramble::{self, UnscrambleRequest};

pub(crate) fn run_unscramble(
    image: &str,
    key: &str,
    out: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = UnscrambleRequest {
        image_path: Path::new(image),
        key_path: Path::new(key),
        output_path: out.map(Path::new),
    };
    let written = unscramble::run(request)
        .map_err(|e| -> Box<dyn std::error::Error> { Box::new(e) })?;
    println!("Repaired image written to: {}", written.display());
    Ok(())
}
