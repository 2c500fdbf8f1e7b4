use kintsugi_core::commands;
use kintsugi_core::config::KintsugiConfig;

pub(crate) fn run_info(
    config: &KintsugiConfig,
    url: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = commands::info::run(config, url)
        .map_err(|e| -> Box<dyn std::error::Error> { Box::new(e) })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Title:     {}", report.meta.title);
    println!("Author:    {}", report.meta.author);
    println!("Genre:     {}", report.meta.genre);
    println!("Publisher: {}", report.meta.publisher);
    println!("Folder:    {}", report.folder);
    println!();
    if report.chapters.is_empty() {
        println!("No chapters listed.");
    } else {
        println!("Chapters ({}):", report.chapters.len());
        for chapter in &report.chapters {
            println!("  {}", chapter.title);
        }
    }
    Ok(())
}
