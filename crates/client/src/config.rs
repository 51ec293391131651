//! Where to find the Moodle instance, and how to authenticate to it
use std::env;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Environment variable holding the web service token
pub const KEY_VAR: &str = "AEDUCAR_API_KEY";

/// Environment variable holding the base URL of the Moodle site
pub const URL_VAR: &str = "AEDUCAR_API_URL";

/// Path of the REST server, relative to the site's base URL
pub const ENDPOINT: &str = "/webservice/rest/server.php";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub base_url: String,
    pub token: Token,
}

impl Config {
    pub fn new(base_url: impl Into<String>, token: impl Into<Token>) -> Self {
        let base_url: String = base_url.into();
        Config {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Read the token and base URL from the environment.
    ///
    /// A `.env` file in the current directory or any parent is loaded first, without
    /// overriding variables that are already set.
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("loaded environment from {}", path.display()),
            Err(e) => debug!("no .env loaded: {}", e),
        }

        let token = env::var(KEY_VAR).map_err(|_| Error::MissingConfig(KEY_VAR))?;
        let base_url = env::var(URL_VAR).map_err(|_| Error::MissingConfig(URL_VAR))?;

        Ok(Config::new(base_url, token))
    }

    /// Full URL of the REST server
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, ENDPOINT)
    }
}

/// A web service token, wrapped so we don't print it by accident
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Token (******)")
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Token(value)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token(value.to_string())
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}
