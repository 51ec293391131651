use std::fs::File;

use anyhow::{anyhow, Context, Result};
use log::info;
use moodle_client::{Config, Error};
use xdg::BaseDirectories;

const PREFIX: &str = "moodle-client";
const CONFIG_FILE: &str = "config.json";

/// Load the connection settings, preferring the environment over the config file.
pub fn load() -> Result<Config> {
    match Config::from_env() {
        Ok(config) => Ok(config),
        Err(Error::MissingConfig(var)) => {
            info!("{} is not set, falling back to config file", var);
            load_file().with_context(|| format!("{} is not set and no config file found", var))
        }
        Err(e) => Err(e.into()),
    }
}

fn load_file() -> Result<Config> {
    let path = BaseDirectories::with_prefix(PREFIX)?
        .find_config_file(CONFIG_FILE)
        .ok_or_else(|| anyhow!("config does not exist"))?;

    let file = File::open(&path).context("error opening config file")?;
    let config: Config =
        serde_json::from_reader(&file).context("error deserialising config file")?;

    // Normalise the base url the same way as the environment does
    Ok(Config::new(config.base_url, config.token))
}

/// Persist `config` so later runs work without the environment
pub fn save(config: &Config) -> Result<()> {
    let path = BaseDirectories::with_prefix(PREFIX)?.place_config_file(CONFIG_FILE)?;

    let mut file = File::create(&path).context("error opening config file")?;
    serde_json::to_writer(&mut file, config).context("error serialising config file")?;

    info!("saved config to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;
    use moodle_client::config::{KEY_VAR, URL_VAR};

    #[test]
    fn test_falls_back_to_config_file() {
        let dir = tempfile::tempdir().unwrap();
        env::set_var("XDG_CONFIG_HOME", dir.path());
        env::remove_var(KEY_VAR);
        env::remove_var(URL_VAR);

        assert!(load().is_err());

        save(&Config::new("https://moodle.example.org/", "secret")).unwrap();
        assert!(dir.path().join(PREFIX).join(CONFIG_FILE).exists());

        let config = load().unwrap();
        assert_eq!(
            config.endpoint(),
            "https://moodle.example.org/webservice/rest/server.php"
        );
        assert_eq!(config.token.as_ref(), "secret");
    }
}
