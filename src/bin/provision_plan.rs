//! Provisions (or updates) a degree plan so transcripts on it can be ingested.
//!
//! Usage:
//!   cargo run --bin provision-plan -- --version 2182 \
//!       --name "Ingeniería en Sistemas de Información" \
//!       --total-credits 393 --suggested-terms 9
//!
//! Omitted milestone thresholds keep their stored values; thresholds that are
//! still unset are defaulted by the next ingestion on the plan.

use clap::Parser;
use kardex_ingest::db::Database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "provision-plan", about = "Create or update a degree plan")]
struct Args {
    /// Plan version code as printed on transcripts.
    #[arg(long)]
    version: String,

    /// Plan display name.
    #[arg(long)]
    name: String,

    /// Credits required to graduate.
    #[arg(long)]
    total_credits: i32,

    /// Number of suggested semesters.
    #[arg(long)]
    suggested_terms: i32,

    /// Credits required to enable social service.
    #[arg(long)]
    social_service_credits: Option<i32>,

    /// Credits required to enable professional practice.
    #[arg(long)]
    practice_credits: Option<i32>,

    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "provision_plan=info,kardex_ingest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let version = args.version.trim();
    if version.is_empty() {
        anyhow::bail!("--version cannot be empty");
    }
    if args.total_credits <= 0 || args.suggested_terms <= 0 {
        anyhow::bail!("--total-credits and --suggested-terms must be positive");
    }

    let db = Database::new(&args.database_url).await?;

    let (id, social_service, practice): (uuid::Uuid, Option<i32>, Option<i32>) = sqlx::query_as(
        r#"
        INSERT INTO plans (version, name, total_credits, suggested_terms,
                           social_service_credits, professional_practice_credits)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (version) DO UPDATE SET
            name = EXCLUDED.name,
            total_credits = EXCLUDED.total_credits,
            suggested_terms = EXCLUDED.suggested_terms,
            social_service_credits =
                COALESCE(EXCLUDED.social_service_credits, plans.social_service_credits),
            professional_practice_credits =
                COALESCE(EXCLUDED.professional_practice_credits, plans.professional_practice_credits),
            updated_at = now()
        RETURNING id, social_service_credits, professional_practice_credits
        "#,
    )
    .bind(version)
    .bind(args.name.trim())
    .bind(args.total_credits)
    .bind(args.suggested_terms)
    .bind(args.social_service_credits)
    .bind(args.practice_credits)
    .fetch_one(&db.pool)
    .await?;

    tracing::info!(
        "Plan {} provisioned ({}): {} credits, {} terms, social service at {:?}, practice at {:?}",
        version,
        id,
        args.total_credits,
        args.suggested_terms,
        social_service,
        practice
    );

    Ok(())
}
