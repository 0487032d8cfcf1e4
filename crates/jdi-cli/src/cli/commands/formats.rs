//! `jdi formats <URL>` – list what the extractor offers for a media URL.

use anyhow::{Context, Result};
use jdi_core::config::JdiConfig;
use jdi_core::media::{MediaExtractor, MediaFormat, YtDlp};
use jdi_core::CancelSignal;

pub async fn run_formats(cfg: &JdiConfig, url: &str) -> Result<()> {
    let extractor = YtDlp::new(&cfg.tools.ytdlp).with_cookie_file(cfg.cookies_file.clone());
    let url_owned = url.to_string();
    let info = tokio::task::spawn_blocking(move || extractor.resolve_formats(&url_owned, &CancelSignal::new()))
        .await?
        .with_context(|| format!("resolving formats for {url}"))?;

    println!("{}", info.title);
    println!("{:<10} {:<5} {:>6} {:<14} {:<14} {:>8} {:>10}", "ID", "EXT", "HEIGHT", "VCODEC", "ACODEC", "KBPS", "SIZE");
    for f in &info.formats {
        println!("{}", format_row(f));
    }
    Ok(())
}

fn format_row(f: &MediaFormat) -> String {
    let dash = || "-".to_string();
    let height = f.height.map(|h| format!("{h}p")).unwrap_or_else(dash);
    let kbps = f
        .abr
        .filter(|_| f.is_audio_only())
        .or(f.tbr)
        .map(|k| format!("{k:.0}"))
        .unwrap_or_else(dash);
    let size = f
        .filesize
        .map(|b| format!("{:.1} MiB", b as f64 / 1_048_576.0))
        .unwrap_or_else(dash);
    format!(
        "{:<10} {:<5} {:>6} {:<14} {:<14} {:>8} {:>10}",
        f.format_id,
        f.ext,
        height,
        f.vcodec.as_deref().unwrap_or("-"),
        f.acodec.as_deref().unwrap_or("-"),
        kbps,
        size
    )
}
