use std::path::PathBuf;
use std::time::Duration;

/// Default address the server binds to
pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_MAX_UPLOAD_MB: usize = 10;
const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60; // 24 hours

/// Server configuration
///
/// Built from defaults, then environment variables, then command line
/// arguments. Invalid values are reported and replaced by the default.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Socket address to listen on (`TODO_ADDR`, or the first CLI argument)
    pub addr: String,

    /// Directory served under `/static` (`TODO_STATIC_DIR`)
    pub static_dir: PathBuf,

    /// Maximum request body size for uploads (`TODO_MAX_UPLOAD_MB`)
    pub max_upload_bytes: usize,

    /// Idle lifetime of a browser session (`TODO_SESSION_TTL_SECS`)
    pub session_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            addr: DEFAULT_ADDR.to_string(),
            static_dir: PathBuf::from("static"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source
    ///
    /// # Arguments
    /// * `lookup` - Returns the value of a variable, if set
    ///
    /// # Examples
    /// ```
    /// use todo_web::config::Config;
    ///
    /// let config = Config::from_lookup(|key| match key {
    ///     "TODO_ADDR" => Some("0.0.0.0:8080".to_string()),
    ///     _ => None,
    /// });
    /// assert_eq!(config.addr, "0.0.0.0:8080");
    /// ```
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();

        if let Some(addr) = lookup("TODO_ADDR").filter(|v| !v.trim().is_empty()) {
            config.addr = addr.trim().to_string();
        }
        if let Some(dir) = lookup("TODO_STATIC_DIR").filter(|v| !v.trim().is_empty()) {
            config.static_dir = PathBuf::from(dir);
        }
        if let Some(mb) = parse_var::<usize>(&lookup, "TODO_MAX_UPLOAD_MB") {
            match mb.checked_mul(1024 * 1024) {
                Some(bytes) => config.max_upload_bytes = bytes,
                None => log::warn!("Ignoring oversized TODO_MAX_UPLOAD_MB={}, using default", mb),
            }
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "TODO_SESSION_TTL_SECS") {
            config.session_ttl = Duration::from_secs(secs);
        }

        config
    }

    /// Apply command line arguments
    ///
    /// `args[0]` is the program name; `args[1]`, when present, is the address
    /// to listen on.
    pub fn with_args(mut self, args: &[String]) -> Self {
        if let Some(addr) = args.get(1).filter(|a| !a.trim().is_empty()) {
            self.addr = addr.trim().to_string();
        }
        self
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring invalid {}={:?}, using default", key, raw);
            None
        }
    }
}
