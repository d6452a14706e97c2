use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Domain used for the placeholder address `a{folio}@{domain}` of new students.
    pub student_email_domain: String,
    /// Extra plan-definition JSON files loaded on top of the built-in ones.
    pub plan_definitions_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DB_URL or DATABASE_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DB_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            student_email_domain: std::env::var("STUDENT_EMAIL_DOMAIN")
                .ok()
                .map(|d| d.trim().trim_start_matches('@').to_string())
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| "unison.mx".to_string()),
            plan_definitions_dir: std::env::var("PLAN_DEFINITIONS_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        };

        tracing::debug!(
            "Database URL: {}...",
            &config.database_url[..20.min(config.database_url.len())]
        );
        tracing::debug!("Student e-mail domain: {}", config.student_email_domain);
        if let Some(ref dir) = config.plan_definitions_dir {
            tracing::info!("Extra plan definitions directory: {}", dir.display());
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}
