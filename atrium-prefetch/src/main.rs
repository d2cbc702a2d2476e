use atrium::CacheRegistry;
use education::{EducationCaches, EducationRepository, RestBackend};
use shared::config::Config;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Atrium catalog prefetch");

    // Load environment variables from .env file (if exists)
    match dotenvy::dotenv() {
        Ok(_) => info!("Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let config = Config::from_env();

    match run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Prefetch failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config) -> shared::Result<()> {
    let backend = Arc::new(RestBackend::from_config(config)?);
    let caches = EducationCaches::new(config.cache_ttl.as_duration(), config.cache_max_entries);

    let registry = CacheRegistry::new();
    caches.register(&registry);

    let repository = EducationRepository::new(backend, caches);

    info!("Fetching course catalog from {}", config.backend_url);
    let courses = repository.list_courses().await?;
    info!("Catalog holds {} course(s)", courses.len());

    let mut lesson_count = 0;
    for course in &courses {
        match repository.list_lessons(course.id).await {
            Ok(lessons) => lesson_count += lessons.len(),
            // one broken course should not abort the warm-up
            Err(e) => warn!("Skipping lessons of course {} ('{}'): {}", course.id, course.title, e),
        }
    }
    info!("Prefetched {} lesson(s)", lesson_count);

    for cache in registry.list() {
        match serde_json::to_string(&cache) {
            Ok(json) => info!("Cache state: {}", json),
            Err(e) => warn!("Could not serialize state of cache '{}': {}", cache.name, e),
        }
    }

    Ok(())
}
