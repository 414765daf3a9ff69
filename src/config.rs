use jsonwebtoken::Algorithm;

/// Token signing configuration. The secret is process-wide state loaded once
/// at startup; there is no runtime rotation.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub token: TokenConfig,
}

const MIN_SECRET_BYTES: usize = 32;

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;

        let secret = std::env::var("JWT_SECRET")?;
        if secret.len() < MIN_SECRET_BYTES {
            anyhow::bail!("JWT_SECRET must be at least {MIN_SECRET_BYTES} bytes");
        }

        let algorithm = match std::env::var("JWT_ALGORITHM").as_deref() {
            Err(_) => Algorithm::HS256,
            Ok("HS256") => Algorithm::HS256,
            Ok("HS384") => Algorithm::HS384,
            Ok("HS512") => Algorithm::HS512,
            Ok(other) => anyhow::bail!("unsupported JWT_ALGORITHM: {other}"),
        };

        let ttl_minutes = std::env::var("JWT_TTL_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(60);

        Ok(Self {
            database_url,
            token: TokenConfig {
                secret,
                algorithm,
                ttl_minutes,
            },
        })
    }
}
