use std::path::Path;

use serde_derive::Deserialize;

use crate::error::{Error, Result};

#[derive(Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn read_secrets_from_file(path: &Path) -> Result<Self> {
        let secrets_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("unable to open {}: {e}", path.display())))?;

        Credentials::from_toml(&secrets_content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let credentials: Credentials = toml::from_str(content)?;

        if credentials.username.trim().is_empty() {
            return Err(Error::Config("USERNAME must not be empty".to_string()));
        }

        Ok(credentials)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}
