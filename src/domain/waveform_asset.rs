use std::io;
use std::path::Path;

use tempfile::TempPath;

/// Canonical mono PCM file produced by normalization.
///
/// The backing scratch file is removed when the asset is dropped; `release`
/// removes it eagerly and surfaces the I/O result.
#[derive(Debug)]
pub struct WaveformAsset {
    path: TempPath,
    sample_rate: u32,
    frames: u64,
}

impl WaveformAsset {
    pub fn new(path: TempPath, sample_rate: u32, frames: u64) -> Self {
        Self {
            path,
            sample_rate,
            frames,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f32 / self.sample_rate as f32
    }

    pub fn release(self) -> io::Result<()> {
        self.path.close()
    }
}
