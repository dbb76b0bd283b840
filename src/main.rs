use actix_cors::Cors;
use actix_web::{web, App, HttpServer, HttpResponse, middleware, error, http::StatusCode};
use event_radar::config::{LoggingSettings, Settings};
use event_radar::core::{GeoFilterEngine, Recommender, TrigramSimilarity};
use event_radar::auth::TokenVerifier;
use event_radar::models::RecommendParams;
use event_radar::routes::{self, AppState};
use event_radar::services::{CacheManager, GeocodeClient, StoreClient, StoreTables};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, error};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("Query error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

/// Install the global subscriber; `RUST_LOG` overrides the configured level
fn init_logging(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    match logging.format.as_str() {
        "pretty" => subscriber.pretty().init(),
        "compact" => subscriber.compact().init(),
        _ => subscriber.json().init(),
    }
}

fn startup_error<E: std::fmt::Display>(what: &str, e: E) -> std::io::Error {
    error!("{}: {}", what, e);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", what, e))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Configuration comes first so logging can honour it
    let settings = Settings::load().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    init_logging(&settings.logging);

    info!("Starting Event Radar service...");
    info!("Configuration loaded successfully");

    // Initialize data store client
    let tables = StoreTables {
        events: settings.store.events_table.clone(),
        event_tags: settings.store.event_tags_table.clone(),
        profile_tags: settings.store.profile_tags_table.clone(),
        near_events_rpc: settings.store.near_events_rpc.clone(),
    };

    let store = Arc::new(
        StoreClient::new(settings.store.url.clone(), settings.store.api_key.clone(), tables)
            .map_err(|e| startup_error("Failed to build data store client", e))?,
    );

    info!("Data store client initialized ({})", settings.store.url);

    // Initialize geocoding client
    if settings.geocoding.api_key.is_empty() {
        warn!("No geocoding API key configured, address lookups will fail");
    }

    let geocoder = Arc::new(
        GeocodeClient::new(
            settings.geocoding.base_url.clone(),
            settings.geocoding.api_key.clone(),
            settings.geocoding.country.clone(),
        )
        .map_err(|e| startup_error("Failed to build geocoding client", e))?,
    );

    // Initialize cache manager; Redis is optional
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);

    let cache = match CacheManager::new(settings.cache.redis_url.as_deref(), l1_cache_size, cache_ttl).await {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to connect to Redis ({}), using in-memory cache only", e);
            CacheManager::in_memory(l1_cache_size, cache_ttl)
        }
    };
    let stats = cache.stats();
    info!(
        "Cache manager initialized (L1: {} entries, TTL: {}s, Redis: {})",
        l1_cache_size, cache_ttl, stats.redis_enabled
    );
    let cache = Arc::new(cache);

    // Token verification for event mutations
    let verifier = if settings.auth.jwt_secret.is_empty() {
        warn!("No JWT secret configured, event mutations are disabled");
        None
    } else {
        Some(Arc::new(TokenVerifier::new(
            settings.auth.jwt_secret.clone(),
            settings.auth.audience.clone(),
        )))
    };

    let recommend_params = RecommendParams::from(&settings.recommend);
    let recommender = Arc::new(Recommender::new(TrigramSimilarity, recommend_params));

    info!("Recommender initialized with params: {:?}", recommend_params);

    let debounce_delay = Duration::from_millis(settings.geocoding.debounce_ms);
    let debouncers = moka::future::Cache::builder()
        .max_capacity(10_000)
        .time_to_idle(Duration::from_secs(300))
        .build();

    // Build application state
    let app_state = AppState {
        store,
        geocoder,
        cache,
        engine: GeoFilterEngine::new(),
        recommender,
        verifier,
        search: settings.search.clone(),
        debouncers,
        debounce_delay,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
