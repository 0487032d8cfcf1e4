//! Closest-match format selection.

use super::MediaFormat;

/// Picks the value in `available` nearest to `target`: below the minimum
/// gives the minimum, above the maximum gives the maximum, otherwise the
/// nearer neighbour wins and a tie goes to the lower one.
pub fn closest_match(available: &[u32], target: u32) -> Option<u32> {
    let mut sorted = available.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    let (&min, &max) = (sorted.first()?, sorted.last()?);
    if target <= min {
        return Some(min);
    }
    if target >= max {
        return Some(max);
    }
    let lower = sorted.iter().copied().filter(|&v| v <= target).max()?;
    let higher = sorted.iter().copied().filter(|&v| v >= target).min()?;
    if higher - target < target - lower {
        Some(higher)
    } else {
        Some(lower)
    }
}

/// Video-only format whose height is closest to `target_height`; among
/// equals prefer mp4, then the highest total bitrate.
pub fn select_video(formats: &[MediaFormat], target_height: u32) -> Option<&MediaFormat> {
    let candidates: Vec<&MediaFormat> = formats
        .iter()
        .filter(|f| f.is_video_only() && f.height.is_some())
        .collect();
    let heights: Vec<u32> = candidates.iter().filter_map(|f| f.height).collect();
    let chosen = closest_match(&heights, target_height)?;
    best_of(candidates.into_iter().filter(|f| f.height == Some(chosen)), "mp4")
}

/// Audio-only format whose bitrate (kbit/s, rounded) is closest to
/// `target_kbps`; among equals prefer m4a, then the highest total bitrate.
pub fn select_audio(formats: &[MediaFormat], target_kbps: u32) -> Option<&MediaFormat> {
    let kbps = |f: &MediaFormat| f.abr.or(f.tbr).map(|b| b.round() as u32);
    let candidates: Vec<&MediaFormat> = formats
        .iter()
        .filter(|f| f.is_audio_only() && kbps(*f).is_some())
        .collect();
    let rates: Vec<u32> = candidates.iter().filter_map(|f| kbps(*f)).collect();
    let chosen = closest_match(&rates, target_kbps)?;
    best_of(candidates.into_iter().filter(|f| kbps(*f) == Some(chosen)), "m4a")
}

fn best_of<'a>(it: impl Iterator<Item = &'a MediaFormat>, preferred_ext: &str) -> Option<&'a MediaFormat> {
    it.max_by(|a, b| {
        let pa = a.ext == preferred_ext;
        let pb = b.ext == preferred_ext;
        pa.cmp(&pb).then(
            a.tbr
                .unwrap_or(0.0)
                .partial_cmp(&b.tbr.unwrap_or(0.0))
                .unwrap_or(std::cmp::Ordering::Equal),
        )
    })
}

/// Container for the merged file: mp4 only when both inputs are
/// mp4-compatible, otherwise mkv (accepts any codec pair).
pub fn output_extension(video: &MediaFormat, audio: &MediaFormat) -> &'static str {
    if video.ext == "mp4" && matches!(audio.ext.as_str(), "m4a" | "mp4") {
        "mp4"
    } else {
        "mkv"
    }
}
