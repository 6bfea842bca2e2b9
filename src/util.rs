/// Render elapsed milliseconds as "MM:SS", rolling into "H:MM:SS" past an
/// hour. Negative inputs clamp to zero.
pub fn format_elapsed(ms: i64) -> String {
    let total_secs = ms.max(0) / 1_000;
    let hours = total_secs / 3_600;
    let mins = (total_secs % 3_600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}", mins, secs)
    }
}

/// Same as `format_elapsed` with a trailing tenths digit, matching the
/// running display cadence.
pub fn format_elapsed_tenths(ms: i64) -> String {
    let tenths = (ms.max(0) % 1_000) / 100;
    format!("{}.{}", format_elapsed(ms), tenths)
}
