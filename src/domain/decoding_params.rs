/// Decoding parameters handed to the captioning model on every call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodingParams {
    pub beam_width: u32,
    pub max_length: u32,
    pub temperature: f32,
    pub resample: bool,
}

impl DecodingParams {
    /// Near-deterministic beam search; reproducibility over diversity.
    pub const CAPTION_POLICY: DecodingParams = DecodingParams {
        beam_width: 3,
        max_length: 67,
        temperature: 0.01,
        resample: true,
    };
}

impl Default for DecodingParams {
    fn default() -> Self {
        Self::CAPTION_POLICY
    }
}
