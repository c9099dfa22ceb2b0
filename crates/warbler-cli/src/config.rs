pub const DEFAULT_DATABASE_URL: &str = "warbler.db";

pub struct Config {
    pub database_url: String,
}

impl Config {
    /// Read configuration from the process environment. Call after
    /// `dotenvy::dotenv()` so a `.env` file is honored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.into());

        Self { database_url }
    }
}
