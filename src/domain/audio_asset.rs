use bytes::Bytes;

/// Raw upload as received from the transport, before any decoding.
#[derive(Debug, Clone)]
pub struct AudioAsset {
    pub bytes: Bytes,
    pub content_type: String,
    pub filename: Option<String>,
}

impl AudioAsset {
    pub fn new(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
            filename: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// Media type without parameters, lower-cased.
    pub fn mime(&self) -> String {
        self.content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    }

    pub fn is_audio(&self) -> bool {
        self.mime().starts_with("audio/")
    }

    /// Container hint for the decoder: the filename extension if there is one,
    /// otherwise a guess from the media subtype.
    pub fn extension(&self) -> Option<String> {
        let from_name = self
            .filename
            .as_deref()
            .and_then(|name| std::path::Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

        from_name.or_else(|| extension_for_mime(&self.mime()).map(str::to_string))
    }
}

fn extension_for_mime(mime: &str) -> Option<&'static str> {
    match mime {
        "audio/wav" | "audio/wave" | "audio/x-wav" | "audio/vnd.wave" => Some("wav"),
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" | "audio/aac" => Some("m4a"),
        "audio/flac" | "audio/x-flac" => Some("flac"),
        "audio/ogg" | "audio/vorbis" => Some("ogg"),
        "audio/webm" => Some("webm"),
        "audio/aiff" | "audio/x-aiff" => Some("aiff"),
        _ => None,
    }
}
