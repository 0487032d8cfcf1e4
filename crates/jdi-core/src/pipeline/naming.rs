use crate::url_model::sanitize_title;

/// File stem for media outputs: the cleaned title, or `download`.
pub fn output_stem(title: &str) -> String {
    sanitize_title(title).unwrap_or_else(|| "download".to_string())
}
