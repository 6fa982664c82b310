use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub recipes_per_page: i64,
    pub max_body_bytes: usize,
    /// TTF font used for the shopping list PDF. The bundled Roboto when unset.
    pub shopping_list_font: Option<String>,
}

/// `DATABASE_URL`, the only setting the maintenance binaries need.
pub fn database_url() -> anyhow::Result<String> {
    env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL is not set"))
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = database_url()?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_ttl_hours = env::var("JWT_TTL_HOURS")
            .ok()
            .and_then(|h| h.parse::<i64>().ok())
            .unwrap_or(24);
        let recipes_per_page = env::var("RECIPES_PER_PAGE")
            .ok()
            .and_then(|n| n.parse::<i64>().ok())
            .unwrap_or(6);
        let max_body_bytes = env::var("MAX_BODY_BYTES")
            .ok()
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(10 * 1024 * 1024);
        let shopping_list_font = env::var("SHOPPING_LIST_FONT")
            .ok()
            .filter(|p| !p.trim().is_empty());
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            jwt_ttl_hours,
            recipes_per_page,
            max_body_bytes,
            shopping_list_font,
        })
    }
}
