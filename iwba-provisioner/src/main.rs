use axum::http::StatusCode;
use axum::{
    extract::State,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;

mod services;
mod settings;
mod store;

use iwba_common::ProvisionRequest;
use iwba_providers::openstack::OpenStackProvider;
use iwba_providers::ComputeProvider;
use settings::Settings;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

struct AppState {
    db: Pool<Postgres>,
    redis_client: redis::Client,
    provider: Arc<dyn ComputeProvider>,
    settings: Settings,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let settings = Settings::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.database_url)
        .await?;
    sqlx::query("SELECT 1").execute(&pool).await?;
    println!("✅ Connected to Database");

    sqlx::migrate!("../sqlx-migrations").run(&pool).await?;

    let redis_client = redis::Client::open(settings.redis_url.clone())?;
    let provider: Arc<dyn ComputeProvider> = Arc::new(OpenStackProvider::new(
        settings.provider_api_url.clone(),
        settings.provider_token.clone(),
    )?);

    let bind_addr = settings.bind_addr.clone();
    let state = Arc::new(AppState {
        db: pool,
        redis_client,
        provider,
        settings,
    });

    let app = Router::new()
        .route("/", get(root))
        .route("/provision", post(provision))
        .with_state(state);

    tracing::info!("provisioner listening on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn root() -> &'static str {
    "IWBA Provisioner Online"
}

async fn provision(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProvisionRequest>,
) -> impl IntoResponse {
    let name = request.record_name();
    println!("📩 provision request: name={} type={}", name, request.instance_type);

    match services::process_provisioning(
        &state.db,
        &state.redis_client,
        state.provider.as_ref(),
        &state.settings,
        request,
    )
    .await
    {
        Ok(event) => (
            StatusCode::OK,
            Json(json!({"status": "ok", "name": name, "ip": event.ip})),
        )
            .into_response(),
        Err(e) => {
            eprintln!("❌ provisioning failed for {}: {:?}", name, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "provisioning_failed", "message": e.to_string()})),
            )
                .into_response()
        }
    }
}
