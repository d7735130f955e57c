/// Format seconds as M:SS or H:MM:SS. `Unknown` for missing or zero durations.
///
/// # Example
///
/// ```
/// use vidfetch::core::utils::format_duration;
///
/// assert_eq!(format_duration(Some(75.0)), "1:15");
/// assert_eq!(format_duration(Some(3725.4)), "1:02:05");
/// assert_eq!(format_duration(None), "Unknown");
/// ```
pub fn format_duration(seconds: Option<f64>) -> String {
    let secs = match seconds {
        Some(s) if s.is_finite() && s >= 1.0 => s as u64,
        _ => return "Unknown".to_string(),
    };

    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

/// Human readable size with 1024-based units and one decimal.
///
/// # Example
///
/// ```
/// use vidfetch::core::utils::format_file_size;
///
/// assert_eq!(format_file_size(12 * 1024 * 1024), "12.0 MB");
/// assert_eq!(format_file_size(0), "Unknown");
/// ```
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "Unknown".to_string();
    }

    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Truncate to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
