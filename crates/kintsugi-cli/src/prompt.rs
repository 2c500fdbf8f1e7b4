use std::io::{self, BufRead, Write};

/// Prompt on stderr and read one trimmed line from stdin.
pub(crate) fn prompt_line(prompt: &str) -> io::Result<String> {
    eprint!("{prompt}");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
