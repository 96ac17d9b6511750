use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use audiocap::application::ports::DeviceProbe;
use audiocap::application::services::{
    AudioNormalizer, CaptionService, ModelHandle, ModelLifecycleManager,
};
use audiocap::infrastructure::audio::SymphoniaTranscoder;
use audiocap::infrastructure::captioning::CaptionerFactory;
use audiocap::infrastructure::model::{HttpWeightFetcher, NvidiaSmiProbe};
use audiocap::infrastructure::observability::{TracingConfig, init_tracing};
use audiocap::presentation::{AppState, Environment, ScaffoldConfig, Settings, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env().map_err(anyhow::Error::msg)?;
    let settings = Settings::load(environment).context("Failed to load settings")?;

    let tracing_defaults = TracingConfig::default();
    init_tracing(&TracingConfig::new(
        environment.as_str(),
        settings.logging.level.clone(),
        settings.logging.enable_json || tracing_defaults.json_format,
    ));

    let scaffold_config = ScaffoldConfig::default();
    if scaffold_config.enabled {
        tracing::warn!("Scaffold mode enabled: captions come from the mock captioner");
    }

    let normalizer = Arc::new(
        AudioNormalizer::new(
            Arc::new(SymphoniaTranscoder::new()),
            settings.audio.scratch_dir.clone(),
            settings.audio.sample_rate,
            settings.audio.max_concurrent_decodes,
        )
        .context("Failed to prepare scratch directory")?,
    );

    let probe = Arc::new(NvidiaSmiProbe::new());
    let accelerator_available = probe.cuda_available().await;

    let model_handle = Arc::new(ModelHandle::new(settings.model.weight_source()));
    let lifecycle = ModelLifecycleManager::new(
        Arc::clone(&model_handle),
        CaptionerFactory::create(&settings.model, &scaffold_config)?,
        Arc::new(HttpWeightFetcher::new()?),
        probe,
        settings.model.device,
        settings.model.cpu_threads,
    );

    if let Err(e) = lifecycle.load().await {
        tracing::error!(error = %e, "Failed to load model during startup");
        return Err(e).context("Failed to load model");
    }

    let caption_service = CaptionService::new(Arc::clone(&model_handle), normalizer);
    let state = AppState::new(caption_service, accelerator_available);
    let router = create_router(state, &settings.server);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Invalid server address")?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    lifecycle.unload().await;
    tracing::info!("Server stopped");

    served.map_err(Into::into)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
