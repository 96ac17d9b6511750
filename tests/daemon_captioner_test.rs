#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::json;

use audiocap::application::ports::{CaptionerError, CaptionerLoader, ModelSpec};
use audiocap::application::services::LoadError;
use audiocap::domain::{ComputeDevice, DecodingParams};
use audiocap::infrastructure::captioning::ClapDaemonLoader;

// Positional args after the script name: --weights <p> --device <d> [--threads <n>]
const WELL_BEHAVED: &str = r#"
echo "warming up"
printf '{"status":"ready","device":"%s"}\n' "$4"
while IFS= read -r line; do
  case "$line" in
    *'"shutdown"'*) exit 0 ;;
    *'"beam_size":3,"entry_length":67'*) echo '{"captions":["A fake daemon caption.","alt"]}' ;;
    *'"caption"'*) echo '{"error":"unexpected decoding parameters"}' ;;
  esac
done
"#;

fn loader(script: &str, ready_timeout: Duration) -> ClapDaemonLoader {
    ClapDaemonLoader::new(
        "sh",
        vec!["-c".to_string(), script.to_string(), "fake-daemon".to_string()],
        ready_timeout,
    )
}

fn cpu_spec() -> ModelSpec {
    ModelSpec {
        weights_path: PathBuf::from("weights.pth"),
        device: ComputeDevice::Cpu,
        cpu_threads: 2,
    }
}

#[tokio::test]
async fn given_ready_daemon_when_captioning_then_returns_caption_list() {
    let daemon = loader(WELL_BEHAVED, Duration::from_secs(10));

    let mut captioner = daemon.load(&cpu_spec()).await.unwrap();
    let output = captioner
        .generate(Path::new("/tmp/waveform.wav"), &DecodingParams::CAPTION_POLICY)
        .await
        .unwrap();
    captioner.release().await;

    assert_eq!(output, json!(["A fake daemon caption.", "alt"]));
    assert_eq!(captioner.device(), ComputeDevice::Cpu);
}

#[tokio::test]
async fn given_daemon_error_reply_when_captioning_then_inference_error() {
    let daemon = loader(WELL_BEHAVED, Duration::from_secs(10));
    let params = DecodingParams {
        beam_width: 5,
        ..DecodingParams::CAPTION_POLICY
    };

    let mut captioner = daemon.load(&cpu_spec()).await.unwrap();
    let result = captioner
        .generate(Path::new("/tmp/waveform.wav"), &params)
        .await;
    captioner.release().await;

    assert!(matches!(result, Err(CaptionerError::Inference(ref m)) if m.contains("unexpected")));
}

const CHATTY: &str = r#"
echo '{"status":"ready"}'
while IFS= read -r line; do
  case "$line" in *'"shutdown"'*) exit 0 ;; esac
  id=$(printf '%s\n' "$line" | sed -n 's/.*"id":\([0-9]*\).*/\1/p')
  echo '{progress 50%}'
  printf '{"id":%s,"captions":["caption for request %s"]}\n' "$id" "$id"
done
"#;

#[tokio::test]
async fn given_daemon_printing_brace_noise_when_captioning_then_each_call_gets_its_own_reply() {
    let daemon = loader(CHATTY, Duration::from_secs(10));

    let mut captioner = daemon.load(&cpu_spec()).await.unwrap();
    let first = captioner
        .generate(Path::new("/tmp/a.wav"), &DecodingParams::CAPTION_POLICY)
        .await
        .unwrap();
    let second = captioner
        .generate(Path::new("/tmp/b.wav"), &DecodingParams::CAPTION_POLICY)
        .await
        .unwrap();
    captioner.release().await;

    assert_eq!(first, json!(["caption for request 1"]));
    assert_eq!(second, json!(["caption for request 2"]));
}

#[tokio::test]
async fn given_stale_reply_in_pipe_when_captioning_then_it_is_discarded() {
    let script = r#"
echo '{"status":"ready"}'
while IFS= read -r line; do
  case "$line" in *'"shutdown"'*) exit 0 ;; esac
  echo '{"id":0,"captions":["left over from an earlier request"]}'
  echo '{"id":1,"captions":["fresh"]}'
done
"#;
    let daemon = loader(script, Duration::from_secs(10));

    let mut captioner = daemon.load(&cpu_spec()).await.unwrap();
    let output = captioner
        .generate(Path::new("/tmp/a.wav"), &DecodingParams::CAPTION_POLICY)
        .await
        .unwrap();
    captioner.release().await;

    assert_eq!(output, json!(["fresh"]));
}

#[tokio::test]
async fn given_daemon_reporting_other_device_when_loaded_then_reported_device_wins() {
    let script = r#"
echo '{"status":"ready","device":"cuda"}'
while IFS= read -r line; do exit 0; done
"#;
    let daemon = loader(script, Duration::from_secs(10));

    let mut captioner = daemon.load(&cpu_spec()).await.unwrap();
    let device = captioner.device();
    captioner.release().await;

    assert_eq!(device, ComputeDevice::Cuda);
}

#[tokio::test]
async fn given_daemon_crash_during_inference_then_terminated() {
    let script = r#"
echo '{"status":"ready"}'
read -r line
exit 1
"#;
    let daemon = loader(script, Duration::from_secs(10));

    let mut captioner = daemon.load(&cpu_spec()).await.unwrap();
    let result = captioner
        .generate(Path::new("/tmp/waveform.wav"), &DecodingParams::CAPTION_POLICY)
        .await;
    captioner.release().await;

    assert!(matches!(result, Err(CaptionerError::Terminated(_))));
}

#[tokio::test]
async fn given_daemon_exiting_before_ready_when_loaded_then_construction_error() {
    let daemon = loader("echo 'ImportError: msclap'; exit 3", Duration::from_secs(10));

    let result = daemon.load(&cpu_spec()).await;

    assert!(matches!(result, Err(LoadError::ModelConstruction(_))));
}

#[tokio::test]
async fn given_daemon_load_error_when_loaded_then_error_is_surfaced() {
    let daemon = loader(
        r#"echo '{"error":"weights file is corrupt"}'"#,
        Duration::from_secs(10),
    );

    let result = daemon.load(&cpu_spec()).await;

    assert!(matches!(result, Err(LoadError::ModelConstruction(ref m)) if m.contains("corrupt")));
}

#[tokio::test]
async fn given_silent_daemon_when_loaded_then_times_out() {
    let daemon = loader(
        "while IFS= read -r line; do exit 0; done",
        Duration::from_millis(200),
    );

    let result = daemon.load(&cpu_spec()).await;

    assert!(matches!(result, Err(LoadError::ModelConstruction(ref m)) if m.contains("not ready")));
}

#[tokio::test]
async fn given_missing_program_when_loaded_then_construction_error() {
    let daemon = ClapDaemonLoader::new(
        "/nonexistent/clapcap-daemon",
        Vec::new(),
        Duration::from_secs(1),
    );

    let result = daemon.load(&cpu_spec()).await;

    assert!(matches!(result, Err(LoadError::ModelConstruction(_))));
}
