use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// How a bulk fetch treats records that fail to decode: drop them with a
/// warning, or fail the whole fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
    #[default]
    Lenient,
    Strict,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub decode_policy: DecodePolicy,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "hype".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "hype-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };
        let decode_policy = std::env::var("RECORD_DECODE_POLICY")
            .ok()
            .map(|v| {
                if v.eq_ignore_ascii_case("strict") {
                    DecodePolicy::Strict
                } else {
                    DecodePolicy::Lenient
                }
            })
            .unwrap_or_default();
        Ok(Self {
            database_url,
            jwt,
            decode_policy,
        })
    }
}
