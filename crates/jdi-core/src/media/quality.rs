//! Parsing of user-facing quality labels.

/// `"1080p"`, `"2160p (4K)"` or a bare number -> target height.
pub fn parse_video_quality(label: &str) -> Option<u32> {
    let digits: String = label.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok().filter(|&h| h > 0)
}

/// Audio label -> target bitrate in kbit/s. Accepts the named presets
/// (`"High (m4a)"` ...), `"160k"` or a bare number.
pub fn parse_audio_quality(label: &str) -> Option<u32> {
    let label = label.trim();
    let preset = match label.to_ascii_lowercase().as_str() {
        "high (opus)" => Some(160),
        "high (m4a)" | "medium (opus)" => Some(128),
        "medium (m4a)" | "low (opus)" => Some(96),
        "low (m4a)" => Some(64),
        _ => None,
    };
    preset.or_else(|| {
        label
            .trim_end_matches(|c| c == 'k' || c == 'K')
            .parse()
            .ok()
            .filter(|&b| b > 0)
    })
}
