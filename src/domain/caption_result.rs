#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionResult {
    pub caption: String,
    pub tag: Option<String>,
}

impl CaptionResult {
    pub fn new(caption: String, tag: Option<String>) -> Self {
        Self { caption, tag }
    }
}
