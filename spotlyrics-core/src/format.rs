//! Export of synced lyric lines to LRC, SRT and plain text.

use std::fmt::Write;
use std::time::Duration;

use crate::error::{CoreError, Result};
use crate::state::LyricLine;

/// Parse a textual millisecond timestamp as reported by the backend
///
/// # Errors
///
/// Returns [`CoreError::InvalidTimestamp`] for empty, negative or non-numeric values.
pub fn parse_start_time(start_time_ms: &str) -> Result<Duration> {
    start_time_ms
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| CoreError::InvalidTimestamp {
            value: start_time_ms.to_string(),
        })
}

/// Format as LRC `mm:ss.xx` (hundredths)
#[must_use]
pub fn format_lrc_timestamp(time: Duration) -> String {
    let total_secs = time.as_secs();
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;
    let hundredths = time.subsec_millis() / 10;

    format!("{minutes:02}:{seconds:02}.{hundredths:02}")
}

/// Format as SRT `hh:mm:ss,mmm`
#[must_use]
pub fn format_srt_timestamp(time: Duration) -> String {
    let total_secs = time.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let millis = time.subsec_millis();

    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// Render lines as an LRC document, one `[mm:ss.xx]words` line each
///
/// # Errors
///
/// Returns an error if any line has an unparseable start time.
pub fn to_lrc(lines: &[LyricLine]) -> Result<String> {
    let mut output = String::new();
    for line in lines {
        let timestamp = format_lrc_timestamp(parse_start_time(&line.start_time_ms)?);
        let _ = writeln!(output, "[{timestamp}]{}", line.words);
    }
    Ok(output)
}

/// Render lines as SRT cues.
///
/// Each cue ends where the next line starts, so the last line produces no cue
/// and fewer than two lines produce an empty document.
///
/// # Errors
///
/// Returns an error if any line has an unparseable start time.
pub fn to_srt(lines: &[LyricLine]) -> Result<String> {
    let mut output = String::new();
    for (index, pair) in lines.windows(2).enumerate() {
        let start = parse_start_time(&pair[0].start_time_ms)?;
        let end = parse_start_time(&pair[1].start_time_ms)?;
        let _ = writeln!(
            output,
            "{}\n{} --> {}\n{}\n",
            index + 1,
            format_srt_timestamp(start),
            format_srt_timestamp(end),
            pair[0].words
        );
    }
    Ok(output)
}

/// Words only, each followed by a newline
#[must_use]
pub fn to_raw(lines: &[LyricLine]) -> String {
    lines.iter().fold(String::new(), |mut output, line| {
        output.push_str(&line.words);
        output.push('\n');
        output
    })
}
