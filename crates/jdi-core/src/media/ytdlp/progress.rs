//! Progress lines produced by our `--progress-template`.

/// Marker we put at the start of every progress line.
pub(super) const MARKER: &str = "JDI";

/// Template: marker, downloaded bytes, total bytes, estimated total, speed.
pub(super) const TEMPLATE: &str = "download:JDI %(progress.downloaded_bytes)s %(progress.total_bytes)s %(progress.total_bytes_estimate)s %(progress.speed)s";

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct LineProgress {
    pub done: u64,
    /// 0 when neither the exact nor the estimated size is known.
    pub total: u64,
    pub rate: f64,
}

/// Parses one template line; `None` for anything else yt-dlp prints.
/// Missing values come through as `NA` or `None`.
pub(super) fn parse_progress_line(line: &str) -> Option<LineProgress> {
    let mut parts = line.split_whitespace();
    if parts.next()? != MARKER {
        return None;
    }
    let num = |s: Option<&str>| s.and_then(|v| v.parse::<f64>().ok()).filter(|v| v.is_finite() && *v >= 0.0);
    let done = num(parts.next())?;
    let total = num(parts.next());
    let estimate = num(parts.next());
    let rate = num(parts.next()).unwrap_or(0.0);
    Some(LineProgress {
        done: done as u64,
        total: total.or(estimate).unwrap_or(0.0) as u64,
        rate,
    })
}
