pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

/// Big clock display: whole seconds rounded up, `H:MM:SS` past the hour, `MM:SS` below it
pub fn format_clock(ms: u64) -> String {
    let total_secs = ms.div_ceil(1000);
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Compact total such as `0m`, `45m` or `2h 5m`
pub fn format_short(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let mins = (ms % 3_600_000) / 60_000;
    match (hours, mins) {
        (0, 0) => "0m".to_string(),
        (0, m) => format!("{}m", m),
        (h, m) => format!("{}h {}m", h, m),
    }
}

/// Session length such as `42s` or `12m 5s`
pub fn format_duration(ms: u64) -> String {
    let mins = ms / 60_000;
    let secs = (ms % 60_000) / 1000;
    if mins == 0 {
        format!("{}s", secs)
    } else {
        format!("{}m {}s", mins, secs)
    }
}

/// What the clock shows: time left for countdown modes, elapsed time otherwise.
/// The flag is true once a countdown target has been reached.
pub fn clock_reading(elapsed_ms: u64, target_ms: Option<u64>) -> (u64, bool) {
    match target_ms {
        Some(target) => (target.saturating_sub(elapsed_ms), elapsed_ms >= target),
        None => (elapsed_ms, false),
    }
}
