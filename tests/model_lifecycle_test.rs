mod helpers;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use audiocap::application::ports::{CaptionerLoader, DeviceProbe, WeightFetcher};
use audiocap::application::services::{
    DevicePreference, LoadError, ModelHandle, ModelLifecycleManager,
};
use audiocap::domain::{ComputeDevice, ModelState};
use audiocap::infrastructure::model::StaticDeviceProbe;
use helpers::{FakeCaptionerLoader, FakeWeightFetcher, test_weights};

struct Setup {
    handle: Arc<ModelHandle>,
    loader: Arc<FakeCaptionerLoader>,
    fetcher: Arc<FakeWeightFetcher>,
    lifecycle: ModelLifecycleManager,
}

fn setup(
    loader: FakeCaptionerLoader,
    fetcher: FakeWeightFetcher,
    cuda: bool,
    preference: DevicePreference,
) -> Setup {
    let handle = Arc::new(ModelHandle::new(test_weights()));
    let loader = Arc::new(loader);
    let fetcher = Arc::new(fetcher);
    let lifecycle = ModelLifecycleManager::new(
        Arc::clone(&handle),
        Arc::clone(&loader) as Arc<dyn CaptionerLoader>,
        Arc::clone(&fetcher) as Arc<dyn WeightFetcher>,
        Arc::new(StaticDeviceProbe(cuda)) as Arc<dyn DeviceProbe>,
        preference,
        4,
    );
    Setup {
        handle,
        loader,
        fetcher,
        lifecycle,
    }
}

#[tokio::test]
async fn given_cpu_host_when_loading_then_ready_on_cpu_with_threads() {
    let s = setup(
        FakeCaptionerLoader::captioning("x").requiring_weights(),
        FakeWeightFetcher::ok(),
        false,
        DevicePreference::Auto,
    );

    let handle = s.lifecycle.load().await.unwrap();

    assert!(Arc::ptr_eq(&handle, &s.handle));
    assert_eq!(s.handle.state(), ModelState::Ready);
    assert_eq!(s.handle.device(), Some(ComputeDevice::Cpu));
    assert_eq!(s.fetcher.calls.load(Ordering::SeqCst), 1);

    let spec = s.loader.last_spec.lock().unwrap().clone().unwrap();
    assert_eq!(spec.device, ComputeDevice::Cpu);
    assert_eq!(spec.cpu_threads, 4);
    assert_eq!(spec.weights_path, test_weights().local_path());
}

#[tokio::test]
async fn given_accelerator_when_loading_auto_then_ready_on_cuda() {
    let s = setup(
        FakeCaptionerLoader::captioning("x"),
        FakeWeightFetcher::ok(),
        true,
        DevicePreference::Auto,
    );

    s.lifecycle.load().await.unwrap();

    assert_eq!(s.handle.device(), Some(ComputeDevice::Cuda));
    let spec = s.loader.last_spec.lock().unwrap().clone().unwrap();
    assert_eq!(spec.cpu_threads, 0);
}

#[tokio::test]
async fn given_cpu_preference_on_accelerator_host_when_loading_then_uses_cpu() {
    let s = setup(
        FakeCaptionerLoader::captioning("x"),
        FakeWeightFetcher::ok(),
        true,
        DevicePreference::Cpu,
    );

    s.lifecycle.load().await.unwrap();

    assert_eq!(s.handle.device(), Some(ComputeDevice::Cpu));
}

#[tokio::test]
async fn given_cuda_preference_without_accelerator_when_loading_then_device_unavailable() {
    let s = setup(
        FakeCaptionerLoader::captioning("x"),
        FakeWeightFetcher::ok(),
        false,
        DevicePreference::Cuda,
    );

    let result = s.lifecycle.load().await;

    assert!(matches!(result, Err(LoadError::DeviceUnavailable(_))));
    assert_eq!(s.handle.state(), ModelState::Failed);
    assert_eq!(s.loader.calls.loads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn given_weight_download_failure_when_loading_then_failed_without_construction() {
    let s = setup(
        FakeCaptionerLoader::captioning("x").requiring_weights(),
        FakeWeightFetcher::failing("HTTP 404"),
        false,
        DevicePreference::Auto,
    );

    let result = s.lifecycle.load().await;

    assert!(matches!(result, Err(LoadError::WeightAcquisition(_))));
    assert_eq!(s.handle.state(), ModelState::Failed);
    assert!(!s.handle.is_ready());
    assert_eq!(s.loader.calls.loads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn given_loader_without_local_weights_when_loading_then_fetch_skipped() {
    let s = setup(
        FakeCaptionerLoader::captioning("x"),
        FakeWeightFetcher::failing("must not be called"),
        false,
        DevicePreference::Auto,
    );

    s.lifecycle.load().await.unwrap();

    assert!(s.handle.is_ready());
    assert_eq!(s.fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn given_construction_failure_when_loading_then_failed() {
    let s = setup(
        FakeCaptionerLoader::captioning("x").failing_load("corrupt checkpoint"),
        FakeWeightFetcher::ok(),
        false,
        DevicePreference::Auto,
    );

    let result = s.lifecycle.load().await;

    assert!(matches!(result, Err(LoadError::ModelConstruction(ref m)) if m == "corrupt checkpoint"));
    assert_eq!(s.handle.state(), ModelState::Failed);
    assert_eq!(s.handle.device(), None);
}

#[tokio::test]
async fn given_ready_model_when_unloaded_then_released_once_and_unloaded() {
    let s = setup(
        FakeCaptionerLoader::captioning("x"),
        FakeWeightFetcher::ok(),
        false,
        DevicePreference::Auto,
    );
    s.lifecycle.load().await.unwrap();

    s.lifecycle.unload().await;
    s.lifecycle.unload().await;

    assert_eq!(s.handle.state(), ModelState::Unloaded);
    assert_eq!(s.handle.device(), None);
    assert_eq!(s.loader.calls.releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn given_failed_model_when_unloaded_then_returns_to_unloaded() {
    let s = setup(
        FakeCaptionerLoader::captioning("x").failing_load("boom"),
        FakeWeightFetcher::ok(),
        false,
        DevicePreference::Auto,
    );
    let _ = s.lifecycle.load().await;

    s.lifecycle.unload().await;

    assert_eq!(s.handle.state(), ModelState::Unloaded);
    assert_eq!(s.loader.calls.releases.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn given_ready_model_when_reloaded_then_previous_released_and_ready_again() {
    let s = setup(
        FakeCaptionerLoader::captioning("x"),
        FakeWeightFetcher::ok(),
        false,
        DevicePreference::Auto,
    );
    s.lifecycle.load().await.unwrap();

    s.lifecycle.reload().await.unwrap();

    assert!(s.handle.is_ready());
    assert_eq!(s.loader.calls.loads.load(Ordering::SeqCst), 2);
    assert_eq!(s.loader.calls.releases.load(Ordering::SeqCst), 1);
}
