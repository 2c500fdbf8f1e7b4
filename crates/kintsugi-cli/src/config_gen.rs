use std::path::PathBuf;

use kintsugi_core::config;

use crate::prompt::prompt_line;

pub(crate) fn run_config_generate(dest: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let path = match dest {
        Some(d) => PathBuf::from(d),
        None => choose_location()?,
    };

    if path.exists() {
        return Err(format!("file already exists: {}", path.display()).into());
    }
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir)?,
        _ => {}
    }

    std::fs::write(&path, config::minimal_config_template())?;
    println!("Config written to: {}", path.display());
    println!("Edit it to set the output directory and worker count.");
    Ok(())
}

fn choose_location() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let candidates = config::default_config_search_paths();

    let labels = ["Local directory", "User config", "System-wide"];
    let blurbs = [
        "Best for: keeping settings next to one download project",
        "Best for: your personal library, applies everywhere you run kintsugi",
        "Best for: shared machines, applies to every user",
    ];

    eprintln!("Where should the config file live?");
    for (i, ((path, _), (label, blurb))) in candidates
        .iter()
        .zip(labels.iter().zip(blurbs.iter()))
        .enumerate()
    {
        eprintln!("  [{}] {} {}", i + 1, label, path.display());
        eprintln!("      {blurb}");
    }

    let input = prompt_line("Choice [1]: ")?;
    if input.is_empty() {
        return Ok(candidates[0].0.clone());
    }

    let n: usize = input
        .parse()
        .map_err(|_| format!("invalid choice: '{input}'"))?;
    if !(1..=candidates.len()).contains(&n) {
        return Err(format!("choice out of range: {n}").into());
    }
    Ok(candidates[n - 1].0.clone())
}
