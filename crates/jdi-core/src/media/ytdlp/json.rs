//! Shapes of `yt-dlp -J` output we care about.

use serde::Deserialize;

use crate::media::{MediaFormat, MediaInfo};

#[derive(Debug, Deserialize)]
pub(super) struct InfoJson {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    formats: Vec<FormatJson>,
}

#[derive(Debug, Deserialize)]
struct FormatJson {
    format_id: String,
    #[serde(default)]
    ext: Option<String>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    vcodec: Option<String>,
    #[serde(default)]
    acodec: Option<String>,
    #[serde(default)]
    abr: Option<f64>,
    #[serde(default)]
    tbr: Option<f64>,
    #[serde(default)]
    filesize: Option<u64>,
    #[serde(default)]
    filesize_approx: Option<u64>,
}

impl From<InfoJson> for MediaInfo {
    fn from(j: InfoJson) -> Self {
        MediaInfo {
            title: j.title.unwrap_or_default(),
            duration: j.duration,
            formats: j
                .formats
                .into_iter()
                .map(|f| MediaFormat {
                    format_id: f.format_id,
                    ext: f.ext.unwrap_or_default(),
                    height: f.height,
                    vcodec: f.vcodec,
                    acodec: f.acodec,
                    abr: f.abr,
                    tbr: f.tbr,
                    filesize: f.filesize.or(f.filesize_approx),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct PlaylistJson {
    #[serde(default)]
    entries: Vec<Option<EntryJson>>,
}

#[derive(Debug, Deserialize)]
struct EntryJson {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl PlaylistJson {
    /// Watch URLs for every entry with an id (unavailable entries are null
    /// or id-less and skipped).
    pub(super) fn item_urls(&self) -> Vec<String> {
        self.entries
            .iter()
            .flatten()
            .filter_map(|e| match (&e.id, &e.url) {
                (Some(id), _) if !id.is_empty() => {
                    Some(format!("https://www.youtube.com/watch?v={id}"))
                }
                (_, Some(url)) if url.starts_with("http") => Some(url.clone()),
                _ => None,
            })
            .collect()
    }
}
