use std::io::{self, IsTerminal, Stderr, Write};
use std::sync::atomic::{AtomicBool, Ordering::Relaxed};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use kintsugi_core::commands::download::DownloadProgressEvent;
use tracing_subscriber::fmt::MakeWriter;

use crate::format::format_bytes;

const REDRAW_EVERY: Duration = Duration::from_millis(100);
const FALLBACK_COLUMNS: usize = 120;

/// ANSI: return to column 0 and erase the whole line.
const CLEAR_LINE: &[u8] = b"\r\x1b[2K";

// ---------------------------------------------------------------------------
// stderr coordination
// ---------------------------------------------------------------------------

/// True while a download progress line is being displayed on stderr.
static PROGRESS_VISIBLE: AtomicBool = AtomicBool::new(false);

/// Serializes all stderr writes between the progress renderer and tracing.
static STDERR_GATE: Mutex<()> = Mutex::new(());

fn lock_stderr() -> MutexGuard<'static, ()> {
    STDERR_GATE.lock().unwrap_or_else(|e| e.into_inner())
}

/// A [`MakeWriter`] that clears the progress line before each tracing event,
/// preventing log messages from corrupting the `\r`-based progress display.
pub(crate) struct ProgressSafeStderr;

/// Holds the `STDERR_GATE` guard for the entire lifetime of a single tracing
/// write, so the gate spans from the line-clear through the full log message.
pub(crate) struct LockedStderr {
    _gate: MutexGuard<'static, ()>,
    stream: Stderr,
}

impl Write for LockedStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl<'a> MakeWriter<'a> for ProgressSafeStderr {
    type Writer = LockedStderr;

    fn make_writer(&'a self) -> Self::Writer {
        let gate = lock_stderr();
        let stream = io::stderr();
        if PROGRESS_VISIBLE.load(Relaxed) && stream.is_terminal() {
            // Wipe the in-place progress line so the log record starts at column 0.
            let _ = stream.lock().write_all(CLEAR_LINE);
        }
        LockedStderr { _gate: gate, stream }
    }
}

// ---------------------------------------------------------------------------
// Download progress line
// ---------------------------------------------------------------------------

pub(crate) struct DownloadProgressRenderer {
    chapter: usize,
    chapter_total: usize,
    chapter_title: Option<String>,
    page_completed: usize,
    page_total: usize,
    failed: u64,
    bytes_written: u64,
    last_paint: Instant,
    prev_width: usize,
    painted: bool,
}

impl DownloadProgressRenderer {
    pub(crate) fn new() -> Self {
        PROGRESS_VISIBLE.store(true, Relaxed);
        Self {
            chapter: 0,
            chapter_total: 0,
            chapter_title: None,
            page_completed: 0,
            page_total: 0,
            failed: 0,
            bytes_written: 0,
            last_paint: Instant::now(),
            prev_width: 0,
            painted: false,
        }
    }

    pub(crate) fn on_event(&mut self, event: DownloadProgressEvent) {
        let should_render = match event {
            DownloadProgressEvent::SeriesResolved { chapters, .. } => {
                self.chapter_total = chapters;
                false
            }
            DownloadProgressEvent::ChapterStarted {
                index,
                total,
                title,
                pages,
            } => {
                self.chapter = index + 1;
                self.chapter_total = total;
                self.chapter_title = Some(title);
                self.page_completed = 0;
                self.page_total = pages;
                true
            }
            DownloadProgressEvent::PageFinished {
                completed, bytes, ..
            } => {
                self.page_completed = completed;
                self.bytes_written += bytes;
                true
            }
            DownloadProgressEvent::PageFailed { completed, .. } => {
                self.page_completed = completed;
                self.failed += 1;
                true
            }
            DownloadProgressEvent::ChapterFinished { .. } => false,
        };

        if should_render {
            self.render(false);
        }
    }

    pub(crate) fn finish(&mut self) {
        if self.painted {
            self.render(true);
            // Final newline under the gate so it doesn't race with tracing.
            let _gate = lock_stderr();
            eprintln!();
        }
        PROGRESS_VISIBLE.store(false, Relaxed);
        self.painted = false;
        self.prev_width = 0;
    }

    fn render(&mut self, force: bool) {
        if !force && self.painted && self.last_paint.elapsed() < REDRAW_EVERY {
            return;
        }
        self.last_paint = Instant::now();

        let title = self.chapter_title.as_deref().unwrap_or("-");
        let failed_suffix = (self.failed > 0)
            .then(|| format!(", Failed: {}", self.failed))
            .unwrap_or_default();
        let prefix = format!(
            "Chapter {}/{}, Pages: {}/{}, Written: {}{failed_suffix}, Current: ",
            self.chapter,
            self.chapter_total,
            self.page_completed,
            self.page_total,
            format_bytes(self.bytes_written),
        );

        let width_limit = terminal_columns().saturating_sub(5);
        let room = width_limit.saturating_sub(display_width(&prefix));
        let shown = truncate_middle(title, room);
        let row = format!("{prefix}{shown}");
        let row_width = display_width(&row);
        let padding = self.prev_width.saturating_sub(row_width);

        {
            let _gate = lock_stderr();
            eprint!("\r{row}{:padding$}", "");
            let _ = io::stderr().flush();
        }

        self.prev_width = row_width;
        self.painted = true;
    }
}

// ---------------------------------------------------------------------------
// Terminal geometry
// ---------------------------------------------------------------------------

fn terminal_columns() -> usize {
    if let Some(cols) = stderr_width() {
        return cols;
    }
    std::env::var("COLUMNS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(FALLBACK_COLUMNS)
}

#[cfg(unix)]
fn stderr_width() -> Option<usize> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let ok = unsafe { libc::ioctl(libc::STDERR_FILENO, libc::TIOCGWINSZ, &mut ws) };
    (ok == 0 && ws.ws_col > 0).then(|| ws.ws_col as usize)
}

#[cfg(windows)]
fn stderr_width() -> Option<usize> {
    use windows_sys::Win32::System::Console::{
        GetConsoleScreenBufferInfo, GetStdHandle, CONSOLE_SCREEN_BUFFER_INFO, STD_ERROR_HANDLE,
    };
    let mut info: CONSOLE_SCREEN_BUFFER_INFO = unsafe { std::mem::zeroed() };
    let ok = unsafe { GetConsoleScreenBufferInfo(GetStdHandle(STD_ERROR_HANDLE), &mut info) };
    if ok == 0 {
        return None;
    }
    let width = i32::from(info.srWindow.Right) - i32::from(info.srWindow.Left) + 1;
    (width > 0).then(|| width as usize)
}

#[cfg(not(any(unix, windows)))]
fn stderr_width() -> Option<usize> {
    None
}

// ---------------------------------------------------------------------------
// Display width and middle truncation
// ---------------------------------------------------------------------------

/// East Asian Wide and Fullwidth code point ranges that occupy two terminal
/// columns. Chapter titles on the site are mostly Japanese, so getting this
/// right matters for the progress line more than it would for file paths.
const WIDE_RANGES: &[(u32, u32)] = &[
    (0x1100, 0x115F),   // Hangul Jamo initials
    (0x2E80, 0x303E),   // CJK Radicals, Kangxi, Symbols & Punctuation
    (0x3040, 0x33FF),   // Hiragana, Katakana, Bopomofo, CJK Compat
    (0x3400, 0x4DBF),   // CJK Extension A
    (0x4E00, 0x9FFF),   // CJK Unified Ideographs
    (0xAC00, 0xD7AF),   // Hangul Syllables
    (0xF900, 0xFAFF),   // CJK Compat Ideographs
    (0xFE30, 0xFE6F),   // CJK Compat Forms
    (0xFF01, 0xFF60),   // Fullwidth Forms
    (0xFFE0, 0xFFE6),   // Fullwidth Signs
    (0x20000, 0x3FFFF), // CJK Extensions B..G
];

fn char_width(c: char) -> usize {
    let cp = c as u32;
    if WIDE_RANGES.iter().any(|&(lo, hi)| (lo..=hi).contains(&cp)) {
        2
    } else {
        1
    }
}

fn display_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

/// Truncate a string to `max_cols` display columns, keeping both the start and
/// the end with `...` in between.
fn truncate_middle(input: &str, max_cols: usize) -> String {
    if display_width(input) <= max_cols {
        return input.to_string();
    }
    if max_cols <= 3 {
        return ".".repeat(max_cols);
    }

    let keep = max_cols - 3;
    let head_budget = keep / 2;
    let tail_budget = keep - head_budget;

    let mut head = String::new();
    let mut used = 0;
    for c in input.chars() {
        if used + char_width(c) > head_budget {
            break;
        }
        used += char_width(c);
        head.push(c);
    }

    let mut tail = String::new();
    let mut used = 0;
    for c in input.chars().rev() {
        if used + char_width(c) > tail_budget {
            break;
        }
        used += char_width(c);
        tail.insert(0, c);
    }

    format!("{head}...{tail}")
}
