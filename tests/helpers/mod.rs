#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use audiocap::application::ports::{
    AudioTranscoder, Captioner, CaptionerError, CaptionerLoader, ModelSpec, TranscodeError,
    TranscodeStats, WeightFetcher,
};
use audiocap::application::services::{
    AudioNormalizer, CaptionService, DevicePreference, LoadError, ModelHandle,
    ModelLifecycleManager,
};
use audiocap::domain::{ComputeDevice, DecodingParams, WeightSource};
use audiocap::infrastructure::audio::SymphoniaTranscoder;
use audiocap::infrastructure::model::StaticDeviceProbe;

pub const TEST_SAMPLE_RATE: u32 = 44_100;

pub fn build_wav(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Mono 440 Hz tone.
pub fn sine_wav(sample_rate: u32, seconds: f32) -> Vec<u8> {
    let frames = (sample_rate as f32 * seconds) as usize;
    let samples: Vec<i16> = (0..frames)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            ((t * 440.0 * std::f32::consts::TAU).sin() * 8_000.0) as i16
        })
        .collect();
    build_wav(sample_rate, 1, &samples)
}

pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default()
}

#[derive(Clone)]
pub enum FakeOutput {
    Value(Value),
    Fail(String),
    Terminate(String),
}

#[derive(Default)]
pub struct CaptionerCalls {
    pub generate_calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub releases: AtomicUsize,
    pub loads: AtomicUsize,
}

pub struct FakeCaptioner {
    output: FakeOutput,
    delay: Duration,
    device: ComputeDevice,
    calls: Arc<CaptionerCalls>,
}

#[async_trait]
impl Captioner for FakeCaptioner {
    async fn generate(
        &mut self,
        waveform: &Path,
        _params: &DecodingParams,
    ) -> Result<Value, CaptionerError> {
        assert!(waveform.exists(), "waveform must exist during inference");

        self.calls.generate_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.calls.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.calls.in_flight.fetch_sub(1, Ordering::SeqCst);

        match &self.output {
            FakeOutput::Value(v) => Ok(v.clone()),
            FakeOutput::Fail(msg) => Err(CaptionerError::Inference(msg.clone())),
            FakeOutput::Terminate(msg) => Err(CaptionerError::Terminated(msg.clone())),
        }
    }

    fn device(&self) -> ComputeDevice {
        self.device
    }

    async fn release(&mut self) {
        self.calls.releases.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeCaptionerLoader {
    pub output: FakeOutput,
    pub delay: Duration,
    pub fail_load: Option<String>,
    pub needs_weights: bool,
    pub calls: Arc<CaptionerCalls>,
    pub last_spec: std::sync::Mutex<Option<ModelSpec>>,
}

impl FakeCaptionerLoader {
    pub fn returning(output: FakeOutput) -> Self {
        Self {
            output,
            delay: Duration::ZERO,
            fail_load: None,
            needs_weights: false,
            calls: Arc::new(CaptionerCalls::default()),
            last_spec: std::sync::Mutex::new(None),
        }
    }

    pub fn captioning(text: &str) -> Self {
        Self::returning(FakeOutput::Value(json!([text])))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_load(mut self, reason: &str) -> Self {
        self.fail_load = Some(reason.to_string());
        self
    }

    pub fn requiring_weights(mut self) -> Self {
        self.needs_weights = true;
        self
    }
}

#[async_trait]
impl CaptionerLoader for FakeCaptionerLoader {
    fn requires_local_weights(&self) -> bool {
        self.needs_weights
    }

    async fn load(&self, spec: &ModelSpec) -> Result<Box<dyn Captioner>, LoadError> {
        self.calls.loads.fetch_add(1, Ordering::SeqCst);
        *self.last_spec.lock().unwrap() = Some(spec.clone());

        if let Some(reason) = &self.fail_load {
            return Err(LoadError::ModelConstruction(reason.clone()));
        }

        Ok(Box::new(FakeCaptioner {
            output: self.output.clone(),
            delay: self.delay,
            device: spec.device,
            calls: Arc::clone(&self.calls),
        }))
    }
}

pub struct FakeWeightFetcher {
    pub fail: Option<String>,
    pub calls: AtomicUsize,
}

impl FakeWeightFetcher {
    pub fn ok() -> Self {
        Self {
            fail: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            fail: Some(reason.to_string()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl WeightFetcher for FakeWeightFetcher {
    async fn ensure_present(&self, source: &WeightSource) -> Result<PathBuf, LoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail {
            Some(reason) => Err(LoadError::WeightAcquisition(reason.clone())),
            None => Ok(source.local_path().to_path_buf()),
        }
    }
}

/// Real transcoder that counts how often it is invoked.
#[derive(Default)]
pub struct CountingTranscoder {
    pub calls: AtomicUsize,
    inner: SymphoniaTranscoder,
}

impl CountingTranscoder {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AudioTranscoder for CountingTranscoder {
    fn transcode(
        &self,
        input: &Path,
        extension_hint: Option<&str>,
        output: &Path,
        target_sample_rate: u32,
    ) -> Result<TranscodeStats, TranscodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .transcode(input, extension_hint, output, target_sample_rate)
    }
}

pub fn test_weights() -> WeightSource {
    WeightSource::new("http://127.0.0.1:9/weights.pth", "weights.pth")
}

pub fn lifecycle_for(
    handle: &Arc<ModelHandle>,
    loader: Arc<dyn CaptionerLoader>,
) -> ModelLifecycleManager {
    ModelLifecycleManager::new(
        Arc::clone(handle),
        loader,
        Arc::new(FakeWeightFetcher::ok()),
        Arc::new(StaticDeviceProbe(false)),
        DevicePreference::Auto,
        1,
    )
}

pub struct TestPipeline {
    pub scratch: tempfile::TempDir,
    pub transcoder: Arc<CountingTranscoder>,
    pub handle: Arc<ModelHandle>,
    pub lifecycle: ModelLifecycleManager,
    pub service: CaptionService,
    pub captioner: Arc<CaptionerCalls>,
}

/// Builds a caption pipeline around `loader`; the model is left unloaded.
pub fn pipeline(loader: FakeCaptionerLoader) -> TestPipeline {
    let scratch = tempfile::TempDir::new().unwrap();
    let transcoder = Arc::new(CountingTranscoder::default());
    let normalizer = Arc::new(
        AudioNormalizer::new(
            Arc::clone(&transcoder) as Arc<dyn AudioTranscoder>,
            scratch.path().to_path_buf(),
            TEST_SAMPLE_RATE,
            2,
        )
        .unwrap(),
    );

    let captioner = Arc::clone(&loader.calls);
    let handle = Arc::new(ModelHandle::new(test_weights()));
    let lifecycle = lifecycle_for(&handle, Arc::new(loader));
    let service = CaptionService::new(Arc::clone(&handle), normalizer);

    TestPipeline {
        scratch,
        transcoder,
        handle,
        lifecycle,
        service,
        captioner,
    }
}
