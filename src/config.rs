//! Environment configuration.

use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// Directory where uploads land and rendition output is written
    pub upload_dir: String,
    /// URL root under which the upload directory is served to players
    pub public_prefix: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            addr: env::var("ADDR").unwrap_or_else(|_| String::from("127.0.0.1")),
            port: env::var("PORT").unwrap_or_else(|_| String::from("3000")),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| String::from("./uploads")),
            public_prefix: env::var("PUBLIC_PREFIX").unwrap_or_else(|_| String::from("/uploads")),
        }
    }
}
