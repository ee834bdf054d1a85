use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Limits applied to posts and feed pages.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub max_post_length: usize,
    pub page_size: i64,
    pub max_page_size: i64,
}

impl FeedConfig {
    /// Page sizes below 1 are raised to 1, and the default page never
    /// exceeds the maximum.
    pub fn normalized(self) -> Self {
        let max_page_size = self.max_page_size.max(1);
        Self {
            max_post_length: self.max_post_length.max(1),
            page_size: self.page_size.clamp(1, max_page_size),
            max_page_size,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_post_length: 3000,
            page_size: 50,
            max_page_size: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub feed: FeedConfig,
    /// When set, every API request must send it in the `apikey` header.
    pub public_api_key: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "linkup".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "linkup-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES").unwrap_or(60 * 24 * 14),
        };
        let defaults = FeedConfig::default();
        let feed = FeedConfig {
            max_post_length: env_parse("POST_MAX_LENGTH").unwrap_or(defaults.max_post_length),
            page_size: env_parse("FEED_PAGE_SIZE").unwrap_or(defaults.page_size),
            max_page_size: env_parse("FEED_MAX_PAGE_SIZE").unwrap_or(defaults.max_page_size),
        }
        .normalized();
        let public_api_key = std::env::var("PUBLIC_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());
        Ok(Self {
            database_url,
            jwt,
            feed,
            public_api_key,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
