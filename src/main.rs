use anyhow::Context;
use callflow::application::{CallDispatcher, CallOriginator, IntentBridge};
use callflow::config::Config;
use callflow::domain::call_record::CallRecordStore;
use callflow::domain::session::CallSessionTracker;
use callflow::domain::telephony::TelephonyProvider;
use callflow::domain::voice_flow::VoiceFlowEngine;
use callflow::infrastructure::origination_client::HttpOriginationClient;
use callflow::infrastructure::persistence::MemoryCallRecordStore;
use callflow::infrastructure::telephony::{DryRunProvider, TwilioClient};
use callflow::interface::api::{build_router, init_metrics, AppState};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "postgres")]
use callflow::infrastructure::persistence::{
    create_pool, database::mask_password, run_migrations, DatabaseConfig, PgCallRecordRepository,
};

const DEFAULT_LOG_FILTER: &str = "callflow=info,tower_http=info";

/// Call record store plus whatever has to be closed on shutdown
struct Storage {
    records: Arc<dyn CallRecordStore>,
    #[cfg(feature = "postgres")]
    pool: Option<sqlx::PgPool>,
}

impl Storage {
    fn in_memory() -> Self {
        info!("Using in-memory call record store");
        Self {
            records: Arc::new(MemoryCallRecordStore::new()),
            #[cfg(feature = "postgres")]
            pool: None,
        }
    }

    #[cfg(feature = "postgres")]
    async fn open(config: &Config) -> anyhow::Result<Self> {
        let Some(url) = config.database.url.as_deref() else {
            return Ok(Self::in_memory());
        };

        info!("Initializing database connection to {}", mask_password(url));
        let db_config = DatabaseConfig::with_url(url, config.database.max_connections);
        let pool = create_pool(&db_config)
            .await
            .context("failed to connect to database")?;
        run_migrations(&pool)
            .await
            .context("failed to run database migrations")?;

        info!("Call record repository initialized");
        Ok(Self {
            records: Arc::new(PgCallRecordRepository::new(pool.clone())),
            pool: Some(pool),
        })
    }

    #[cfg(not(feature = "postgres"))]
    async fn open(config: &Config) -> anyhow::Result<Self> {
        if config.database.url.is_some() {
            warn!("database.url is set but the postgres feature is disabled");
        }
        Ok(Self::in_memory())
    }

    async fn close(self) {
        #[cfg(feature = "postgres")]
        if let Some(pool) = self.pool {
            pool.close().await;
            info!("Database pool closed");
        }
    }
}

fn telephony_provider(config: &Config) -> anyhow::Result<Arc<dyn TelephonyProvider>> {
    if config.telephony.has_credentials() {
        let client = TwilioClient::new(config.telephony.twilio_settings())
            .context("failed to create Twilio client")?;
        info!(account_sid = %config.telephony.account_sid, "Using Twilio telephony provider");
        Ok(Arc::new(client))
    } else {
        warn!("Twilio credentials not configured, calls will not be placed (dry run)");
        Ok(Arc::new(DryRunProvider::new()))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    info!("Starting callflow IVR service");

    let config = Config::load().context("failed to load configuration")?;
    info!("Configuration loaded: {:?}", config);

    let storage = Storage::open(&config).await?;
    let records = storage.records.clone();
    let sessions = Arc::new(CallSessionTracker::new(records.clone()));
    let routes = config.flow_routes();

    let engine = Arc::new(VoiceFlowEngine::new(
        config.flow.clone(),
        routes.clone(),
        records.clone(),
        sessions.clone(),
    ));

    let dispatcher = Arc::new(CallDispatcher::new(
        CallOriginator::new(telephony_provider(&config)?),
        records,
        sessions,
        routes,
        config.dispatch_settings(),
    ));

    let origination_client = HttpOriginationClient::new(
        config.origination_url(),
        Duration::from_secs(config.intent.timeout_secs),
    )
    .context("failed to create origination client")?;
    info!(url = origination_client.url(), "Agent requests forward to origination endpoint");
    let intent_bridge = Arc::new(IntentBridge::new(
        Arc::new(origination_client),
        config.intent.replies(),
    ));

    info!("Initializing Prometheus metrics exporter");
    let prometheus_handle = init_metrics().context("failed to install metrics recorder")?;

    let state = AppState {
        engine,
        dispatcher,
        intent_bridge,
        default_country_code: config.telephony.default_country_code.clone(),
    };
    let app = build_router(state, prometheus_handle);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    info!("HTTP server listening on {}", address);
    info!("Provider callbacks at {}", config.flow_routes().answer);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    storage.close().await;
    info!("callflow stopped");
    Ok(())
}
