use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use founderfinder::advisor::{CompletionAdvisor, ProfileAdvisor};
use founderfinder::app::AppState;
use founderfinder::completion::openai::OpenAICompletionModel;
use founderfinder::config::{get_settings, Settings};
use founderfinder::database::memory::MemoryProfileStore;
use founderfinder::database::postgres::PostgresProfileStore;
use founderfinder::database::ProfileStore;
use founderfinder::embedding::openai::OpenAIEmbeddingModel;
use founderfinder::embedding::EmbeddingModel;
use founderfinder::models::profile::UserAccount;
use founderfinder::routes;
use founderfinder::vector_store::memory::MemoryEmbeddingStore;
use founderfinder::vector_store::postgres::PostgresEmbeddingStore;
use founderfinder::vector_store::EmbeddingStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting founderfinder server...");

    // Load configuration.
    let settings = get_settings()?;
    info!(
        "Configuration loaded: environment={}, host={}, port={}",
        settings.environment, settings.host, settings.port
    );

    // Initialize persistence.
    let (profiles, embedding_store) = init_stores(settings).await?;
    profiles.initialize().await?;
    embedding_store.initialize().await?;
    info!("Stores initialized: {}", settings.database_provider);

    if settings.bypass_auth_mode {
        ensure_dev_user(profiles.as_ref(), settings).await?;
    }

    // Resolve model names from registered models.
    let embedding_model_name = settings
        .resolve_model_name(&settings.embedding_model)
        .unwrap_or_else(|| settings.embedding_model.clone());
    let completion_model_name = settings
        .resolve_model_name(&settings.completion_model)
        .unwrap_or_else(|| settings.completion_model.clone());

    // Initialize embedding model.
    let embedding_model: Arc<dyn EmbeddingModel> = Arc::new(OpenAIEmbeddingModel::new(
        &embedding_model_name,
        &settings.openai_api_key,
        settings.vector_dimensions,
    )?);
    info!("Embedding model initialized: {embedding_model_name}");

    // Initialize completion model and advisor.
    let completion_model = Arc::new(OpenAICompletionModel::new(
        &completion_model_name,
        &settings.openai_api_key,
        settings.default_max_tokens,
        settings.default_temperature,
    )?);
    let advisor: Arc<dyn ProfileAdvisor> = Arc::new(CompletionAdvisor::new(completion_model));
    info!("Completion model initialized: {completion_model_name}");

    // Build application state.
    let state = Arc::new(AppState::new(
        settings.clone(),
        embedding_store,
        profiles,
        embedding_model,
        advisor,
    ));

    // Build router.
    let app = routes::build_router(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    // Start server.
    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port).parse()?;
    info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn init_stores(
    settings: &Settings,
) -> anyhow::Result<(Arc<dyn ProfileStore>, Arc<dyn EmbeddingStore>)> {
    match settings.database_provider.as_str() {
        "postgres" => {
            let uri = settings
                .postgres_uri
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("POSTGRES_URI is required for postgres provider"))?;
            let store = PostgresProfileStore::new(uri, settings.db_pool_size).await?;
            // Both stores share one pool.
            let embeddings: Arc<dyn EmbeddingStore> = Arc::new(PostgresEmbeddingStore::from_pool(
                store.pool().clone(),
                settings.vector_dimensions,
            ));
            let profiles: Arc<dyn ProfileStore> = Arc::new(store);
            Ok((profiles, embeddings))
        }
        _ => {
            let profiles: Arc<dyn ProfileStore> = Arc::new(MemoryProfileStore::new());
            let embeddings: Arc<dyn EmbeddingStore> = Arc::new(MemoryEmbeddingStore::new());
            Ok((profiles, embeddings))
        }
    }
}

/// Make sure the bypass identity has an account row to attach data to.
async fn ensure_dev_user(profiles: &dyn ProfileStore, settings: &Settings) -> anyhow::Result<()> {
    if profiles.get_user(&settings.dev_user_id).await?.is_none() {
        profiles
            .create_user(&UserAccount {
                id: settings.dev_user_id.clone(),
                email: format!("{}@localhost", settings.dev_user_id),
                name: None,
                role: settings.dev_user_role,
                onboarded: false,
            })
            .await?;
        info!("Created dev user {}", settings.dev_user_id);
    }
    Ok(())
}
