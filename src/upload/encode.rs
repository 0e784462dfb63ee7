use std::path::Path;

use base64::{Engine, engine::general_purpose::STANDARD};

use super::{FileHandle, FileSource, ReadFailure};
use crate::constants::{ACCEPTED_EXTENSIONS, ACCEPTED_MIME_TYPES};

const FALLBACK_MIME: &str = "application/octet-stream";

/// `data:<mime>;base64,<payload>`, the textual form handed to `onComplete`.
pub fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    let mime_type = if mime_type.is_empty() {
        FALLBACK_MIME
    } else {
        mime_type
    };

    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

pub async fn read_data_url(file: &FileHandle) -> Result<String, ReadFailure> {
    let bytes = match &file.source {
        FileSource::Memory(bytes) => bytes.to_vec(),
        FileSource::Path(path) => {
            tokio::fs::read(path)
                .await
                .map_err(|source| ReadFailure::Io {
                    name: file.name.clone(),
                    source,
                })?
        }
    };

    Ok(data_url(&file.mime_type, &bytes))
}

/// What the file picker's accept filter lets through.
pub fn has_accepted_extension(name: &str) -> bool {
    extension(name).is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_accepted_mime(mime_type: &str) -> bool {
    ACCEPTED_MIME_TYPES.contains(&mime_type)
}

pub fn mime_for_name(name: &str) -> &'static str {
    match extension(name).as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "",
    }
}

fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}
