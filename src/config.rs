use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_SESSION_FILE: &str = "./.eduverse/session.json";
pub const DEFAULT_LOG_FILTER: &str = "eduverse_client=info,eduverse=info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub session_file: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    /// Blank values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Config {
            api_url: get("EDUVERSE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into()),
            session_file: get("EDUVERSE_SESSION_FILE")
                .unwrap_or_else(|| DEFAULT_SESSION_FILE.into())
                .into(),
        }
    }
}
