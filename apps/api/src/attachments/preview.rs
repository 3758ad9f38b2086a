use anyhow::{Context, Result};
use reqwest::Url;
use serde::Serialize;
use uuid::Uuid;

use crate::models::files::FileReference;

/// Content types that say nothing about the document itself.
const UNINFORMATIVE_TYPES: &[&str] = &[
    "application/octet-stream",
    "binary/octet-stream",
    "application/unknown",
    "application/x-download",
    "application/force-download",
];

/// Types rendered inside the portal; everything else opens in a new tab.
const PREVIEWABLE_TYPES: &[&str] = &[
    "application/pdf",
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "image/bmp",
];

const FALLBACK_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PreviewMode {
    InApp,
    NewContext,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFile {
    pub file_id: Uuid,
    pub url: String,
    pub content_type: String,
    pub preview: PreviewMode,
}

/// Fixed retrieval endpoint; a file is fetched by appending `?guid=<GUID>`.
#[derive(Debug, Clone)]
pub struct RetrievalEndpoint {
    base: Url,
}

impl RetrievalEndpoint {
    pub fn new(base: &str) -> Result<Self> {
        let base = Url::parse(base).with_context(|| format!("Invalid retrieval URL '{base}'"))?;
        Ok(Self { base })
    }

    pub fn url_for(&self, file_id: Uuid) -> String {
        let mut url = self.base.clone();
        url.query_pairs_mut()
            .append_pair("guid", &file_id.to_string());
        url.to_string()
    }
}

/// Picks the content type to trust: the reported one when it is specific,
/// otherwise whatever the extension implies.
pub fn effective_content_type(reported: Option<&str>, extension: &str) -> String {
    let reported = reported
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_lowercase())
        .filter(|ct| !ct.is_empty() && !UNINFORMATIVE_TYPES.contains(&ct.as_str()));

    reported.unwrap_or_else(|| {
        mime_guess::from_ext(extension.trim_start_matches('.'))
            .first()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_else(|| FALLBACK_TYPE.to_string())
    })
}

pub fn preview_mode(content_type: &str) -> PreviewMode {
    if PREVIEWABLE_TYPES.contains(&content_type) {
        PreviewMode::InApp
    } else {
        PreviewMode::NewContext
    }
}

pub fn resolve_reference(endpoint: &RetrievalEndpoint, reference: &FileReference) -> ResolvedFile {
    let content_type =
        effective_content_type(reference.content_type.as_deref(), &reference.extension);
    ResolvedFile {
        file_id: reference.file_id,
        url: endpoint.url_for(reference.file_id),
        preview: preview_mode(&content_type),
        content_type,
    }
}
