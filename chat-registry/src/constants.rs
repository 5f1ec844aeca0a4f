//! Constants and configuration defaults used throughout the chat registry

/// Name given to the registry actor when none is configured
pub const DEFAULT_ACTOR_NAME: &str = "chat-registry";

/// How long a caller waits on a reply slot before giving up, in milliseconds
pub const DEFAULT_REPLY_TIMEOUT_MS: u64 = 30_000;

/// Environment variable overriding [`DEFAULT_REPLY_TIMEOUT_MS`]
pub const REPLY_TIMEOUT_ENV: &str = "CHAT_REGISTRY_REPLY_TIMEOUT_MS";

/// Directory for temporary files (logs, etc.)
pub const TEMP_DIR: &str = "/tmp";

/// Default log file name for development mode
pub const DEV_LOG_FILENAME: &str = "chat-registry.log";

/// Development log file path
pub fn dev_log_path() -> String {
    format!("{}/{}", TEMP_DIR, DEV_LOG_FILENAME)
}
