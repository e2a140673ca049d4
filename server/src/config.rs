use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub db: DbConfig,
    pub jwt: JwtConfig,
    pub sweep: SweepConfig,
}

#[derive(Clone, Debug)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub pool_min: u32,
    pub pool_max: u32,
}

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub expiry_secs: i64,
}

/// Wall-clock time (UTC) at which the daily package sweep runs.
#[derive(Clone, Debug)]
pub struct SweepConfig {
    pub hour: u32,
    pub minute: u32,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", 8080),
            db: DbConfig {
                host: env_or("DB_HOST", "localhost"),
                port: env_parse("DB_PORT", 5432),
                database: env_or("DB_NAME", "travel_office"),
                user: env_or("DB_USER", "postgres"),
                password: env_or("DB_PASSWORD", "postgres"),
                pool_min: env_parse("DB_POOL_MIN", 1),
                pool_max: env_parse("DB_POOL_MAX", 10),
            },
            jwt: JwtConfig {
                secret: env_or("JWT_SECRET_KEY", "dev-secret-change-me"),
                // Sessions are valid for one week.
                expiry_secs: env_parse("JWT_EXPIRY_SECS", 7 * 24 * 3600),
            },
            sweep: SweepConfig {
                hour: env_parse("SWEEP_HOUR", 0),
                minute: env_parse("SWEEP_MINUTE", 5),
            },
        }
    }

    pub fn database_url(&self) -> String {
        if let Ok(url) = env::var("DATABASE_URL") {
            return url;
        }
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.db.user, self.db.password, self.db.host, self.db.port, self.db.database
        )
    }
}
