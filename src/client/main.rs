/**
 * Rollcall - Command-Line Entry Point
 *
 * Loads the configuration, connects to the hosted store, refreshes the
 * roster and attendance, and prints the dashboard counters followed by the
 * absence alerts.
 */
use rollcall::client::{AppContext, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "rollcall=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let config = Config::load()?;
    if config.get_token().is_none() {
        tracing::warn!("[STARTUP] no access token set; reads may be limited by row-level policies");
    }
    tracing::info!("[STARTUP] connecting to {}", config.server_url());

    let context = AppContext::connect(config)?;
    let summary = context.refresh().await?;
    println!(
        "{} turmas, {} alunos, {} registros de frequência",
        summary.classes, summary.students, summary.records
    );

    let stats = context.dashboard_stats().await;
    println!(
        "ATIVOS: {}  CRÍTICOS: {}",
        stats.active_students, stats.critical_students
    );

    let alerts = context.absence_alerts().await;
    if alerts.is_empty() {
        println!("NENHUM ALERTA DE FALTAS.");
    }
    for alert in alerts {
        println!(
            "{:>3}  {}  (desde {})",
            alert.absences,
            alert.name.to_uppercase(),
            alert.registration_date.format("%d/%m/%Y")
        );
    }

    Ok(())
}
