use std::path::Path;

pub fn format_time(value: f64) -> String {
    format!("{value:.6}")
}

/// Escape a path for use inside an ffmpeg filter argument (`ass=`, `movie=`).
pub fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace('\'', "'\\''")
        .replace(':', "\\:")
}

/// Quote a path for an ffmpeg concat demuxer list.
pub fn concat_list_entry(path: &Path) -> String {
    format!("file '{}'", path.to_string_lossy().replace('\'', "'\\''"))
}

/// Escape text for the `drawtext` filter.
pub fn escape_drawtext(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\'', "\u{2019}")
        .replace(':', "\\:")
        .replace('%', "\\%")
        .replace(',', "\\,")
}
