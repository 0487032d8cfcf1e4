//! ffmpeg stderr progress parsing.

/// Per-invocation progress state: the duration is learned from the first
/// `Duration:` line of this run and never shared with another run.
#[derive(Debug, Default)]
pub(crate) struct MuxProgress {
    duration: Option<f64>,
}

impl MuxProgress {
    /// Feeds one stderr line; returns a percentage when the line carries a
    /// `time=` position and the duration is known.
    pub(crate) fn feed(&mut self, line: &str) -> Option<f64> {
        if self.duration.is_none() {
            if let Some(d) = field(line, "Duration:").and_then(parse_timestamp) {
                if d > 0.0 {
                    self.duration = Some(d);
                }
                return None;
            }
        }
        let t = field(line, "time=").and_then(parse_timestamp)?;
        let d = self.duration?;
        Some((t / d * 100.0).clamp(0.0, 100.0))
    }
}

/// The token following `key` (up to whitespace or a comma).
fn field<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let start = line.find(key)? + key.len();
    line[start..]
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == ',')
        .next()
}

/// `HH:MM:SS(.frac)` -> seconds. `N/A` and negatives are rejected.
pub(crate) fn parse_timestamp(s: &str) -> Option<f64> {
    if s.starts_with('-') {
        return None;
    }
    let mut parts = s.split(':');
    let h: f64 = parts.next()?.parse().ok()?;
    let m: f64 = parts.next()?.parse().ok()?;
    let sec: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(h * 3600.0 + m * 60.0 + sec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps() {
        assert_eq!(parse_timestamp("00:03:32.50"), Some(212.5));
        assert_eq!(parse_timestamp("01:00:00"), Some(3600.0));
        assert_eq!(parse_timestamp("N/A"), None);
        assert_eq!(parse_timestamp("-00:00:01.00"), None);
    }

    #[test]
    fn percent_after_duration() {
        let mut p = MuxProgress::default();
        assert_eq!(p.feed("frame=1 time=00:00:10.00 bitrate=N/A"), None);
        assert_eq!(p.feed("  Duration: 00:01:40.00, start: 0.000000, bitrate: 128 kb/s"), None);
        assert_eq!(p.feed("frame=  50 fps=0.0 q=-1.0 size=256kB time=00:00:25.00 bitrate=83.9kbits/s"), Some(25.0));
        assert_eq!(p.feed("time=00:02:00.00"), Some(100.0));
        assert_eq!(p.feed("Press [q] to stop"), None);
    }

    #[test]
    fn state_is_per_instance() {
        let mut a = MuxProgress::default();
        a.feed("Duration: 00:00:10.00,");
        let mut b = MuxProgress::default();
        assert_eq!(b.feed("time=00:00:05.00"), None);
        assert_eq!(a.feed("time=00:00:05.00"), Some(50.0));
    }
}
