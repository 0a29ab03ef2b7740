use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal, sync::oneshot};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use weather_station::{
    api::{self, AppState},
    config::{Config, OutputSpec},
    control::{FileOutput, LogOutput, SwitchOutput},
    sensors::{drivers, SamplingScheduler, SensorSuite},
    settings::{FileStorage, MemoryStorage, SettingKey, SettingsService, SettingsStore},
    snapshot::SnapshotWriter,
    station::Station,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env (ignore error if file absent; env vars may be set externally)
    let _ = dotenvy::dotenv();

    // Initialise tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    // Load config
    let config = Config::from_env()?;

    // Settings store, restored from the durable record
    let store = match &config.settings_path {
        Some(path) => {
            info!(path = %path.display(), "Using file-backed settings");
            SettingsStore::load(FileStorage::new(path.clone()))
        }
        None => {
            warn!("SETTINGS_PATH=memory; settings will not survive a restart");
            SettingsStore::load(MemoryStorage::new())
        }
    };

    let output: Box<dyn SwitchOutput> = match &config.switch_output {
        OutputSpec::Log => Box::new(LogOutput::new()),
        OutputSpec::File(path) => Box::new(FileOutput::new(path.clone())),
    };

    let (mut settings, handle) = SettingsService::new(store, output);
    settings.start();

    let ssid = settings.store().text(SettingKey::WifiSsid);
    if ssid.is_empty() {
        info!("No Wi-Fi network configured; waiting for credentials via /settings");
    } else {
        info!(ssid = %ssid, "Stored Wi-Fi network");
    }

    // Sensors; a missing required sensor stops the node here
    let mut suite = SensorSuite {
        temperature: drivers::from_spec("temperature", &config.temperature_sensor)
            .context("temperature sensor is required")?,
        humidity: drivers::from_spec("humidity", &config.humidity_sensor)
            .context("humidity sensor is required")?,
        pressure: drivers::from_spec("pressure", &config.pressure_sensor),
    };
    if let Err(e) = suite.init() {
        error!(error = %e, "Sensor initialisation failed");
        return Err(e).context("cannot start without sensors");
    }
    info!(barometer = suite.has_pressure(), "Sensors ready");

    let writer = SnapshotWriter::new(suite.has_pressure());
    let snapshot = writer.reader();
    let scheduler = SamplingScheduler::new(suite, writer, config.sensor_interval);

    // Spawn the station loop; it stops once the server has drained
    let (stop, stopped) = oneshot::channel::<()>();
    let station = tokio::spawn(Station::new(scheduler, settings, config.loop_tick).run(async {
        let _ = stopped.await;
    }));

    // Start HTTP server
    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "HTTP server listening");

    let state = AppState {
        snapshot,
        settings: handle,
    };
    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = stop.send(());
    station.await.context("station loop panicked")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received");
}
