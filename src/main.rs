use std::sync::Arc;

use learning_planner::config::PlannerConfig;
use learning_planner::error::Result;
use learning_planner::llm::create_provider;
use learning_planner::onboarding::{OnboardingRouteState, Planner, PlannerSettings, app};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = PlannerConfig::from_env()?;

    eprintln!("📚 Learning Planner v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Ollama: {}", config.ollama.base_url);
    eprintln!("   Model: {}", config.ollama.model);
    eprintln!("   Backgrounds: {}", config.backgrounds.names().join(", "));
    eprintln!("   API: http://0.0.0.0:{}/api/onboarding", config.port);
    eprintln!("   Health: http://0.0.0.0:{}/health\n", config.port);

    let llm = create_provider(&config.ollama)?;

    // Startup probe only warns; the server still comes up without Ollama.
    match llm.health_check().await {
        Ok(health) if !health.model_available => tracing::warn!(
            model = %health.model,
            "Model not pulled on Ollama server; run `ollama pull {}`",
            health.model
        ),
        Ok(health) => tracing::info!(
            version = health.version.as_deref().unwrap_or("unknown"),
            "Ollama reachable"
        ),
        Err(e) => tracing::warn!(error = %e, "Ollama not reachable at startup"),
    }

    let planner = Arc::new(Planner::new(llm, PlannerSettings::from(&config)));
    let router = app(OnboardingRouteState { planner }, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Learning planner API started");
    axum::serve(listener, router).await?;

    Ok(())
}
