use std::fs::{read_to_string, write};
use std::path::Path;

use anyhow::{Context, Error};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::{from_str, to_string_pretty};

/// Name of the configuration file.
pub(crate) const CONFIG_NAME: &str = "config.json";

/// Name of the login file.
pub(crate) const LOGIN_NAME: &str = "login.json";

/// Config that holds the service endpoints and the classification ledger
/// locations.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub(crate) struct Config {
    /// Base URL of the tracker's web front-end.
    #[serde(rename = "trackerUrl", default = "default_tracker_url")]
    tracker_url: String,
    /// Base URL of the image-hosting service.
    #[serde(rename = "imageHostUrl", default = "default_image_host_url")]
    image_host_url: String,
    /// Base URL of the NFO-lookup API.
    #[serde(rename = "nfoApiUrl", default = "default_nfo_api_url")]
    nfo_api_url: String,
    /// File recording groups classified as scene.
    #[serde(rename = "sceneFile", default = "default_scene_file")]
    scene_file: String,
    /// File recording groups classified as p2p.
    #[serde(rename = "p2pFile", default = "default_p2p_file")]
    p2p_file: String,
}

fn default_tracker_url() -> String {
    String::from("https://torrent-syndikat.org")
}
fn default_image_host_url() -> String {
    String::from("https://ptpimg.me")
}
fn default_nfo_api_url() -> String {
    String::from("https://api.srrdb.com")
}
fn default_scene_file() -> String {
    String::from("scene.txt")
}
fn default_p2p_file() -> String {
    String::from("p2p.txt")
}

static CONFIG: OnceCell<Config> = OnceCell::new();

impl Config {
    /// Base URL of the tracker's web front-end.
    pub(crate) fn tracker_url(&self) -> &str {
        &self.tracker_url
    }

    /// Base URL of the image-hosting service.
    pub(crate) fn image_host_url(&self) -> &str {
        &self.image_host_url
    }

    /// Base URL of the NFO-lookup API.
    pub(crate) fn nfo_api_url(&self) -> &str {
        &self.nfo_api_url
    }

    /// File recording groups classified as scene.
    pub(crate) fn scene_file(&self) -> &str {
        &self.scene_file
    }

    /// File recording groups classified as p2p.
    pub(crate) fn p2p_file(&self) -> &str {
        &self.p2p_file
    }

    /// Checks config and ensure it isn't missing.
    pub(crate) fn config_exists() -> bool {
        if !Path::new(CONFIG_NAME).exists() {
            trace!("config.json: does not exist!");
            return false;
        }

        true
    }

    /// Creates config file with default values.
    pub(crate) fn create_config() -> Result<(), Error> {
        let json = to_string_pretty(&Config::default())?;
        write(Path::new(CONFIG_NAME), json)?;

        Ok(())
    }

    /// Get the global instance of the `Config`.
    pub(crate) fn get() -> &'static Config {
        CONFIG.get_or_init(|| match Self::load() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load config: {}", e);
                warn!("Falling back to default endpoints and ledger paths.");
                Config::default()
            }
        })
    }

    fn load() -> Result<Self, Error> {
        let contents = read_to_string(CONFIG_NAME)
            .with_context(|| format!("Failed to read config file: {}", CONFIG_NAME))?;
        let config: Config = from_str(&contents)?;

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tracker_url: default_tracker_url(),
            image_host_url: default_image_host_url(),
            nfo_api_url: default_nfo_api_url(),
            scene_file: default_scene_file(),
            p2p_file: default_p2p_file(),
        }
    }
}

/// `Login` contains the account credentials and the upload API key. Values
/// given on the command line override whatever the file holds.
#[derive(Serialize, Deserialize, Clone, Default)]
pub(crate) struct Login {
    /// Username of user.
    #[serde(rename = "Username")]
    username: String,
    /// Account password for the web front-end login.
    #[serde(rename = "Password")]
    password: String,
    /// The API key bound to the upload endpoint.
    #[serde(rename = "APIKey")]
    api_key: String,
}

static LOGIN: OnceCell<Login> = OnceCell::new();

impl Login {
    /// Username of user.
    pub(crate) fn username(&self) -> &str {
        &self.username
    }

    /// Account password for the web front-end login.
    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    /// The API key bound to the upload endpoint.
    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Gets the global instance of [Login].
    pub(crate) fn get() -> &'static Self {
        LOGIN.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                error!("Unable to load `login.json`. Error: {}", e);
                warn!(
                    "The program will use empty credentials; pass them on the command line or fix your login.json."
                );
                Login::default()
            })
        })
    }

    /// Loads the login file or creates an empty one if it doesn't exist.
    fn load() -> Result<Self, Error> {
        let mut login = Login::default();
        let login_path = Path::new(LOGIN_NAME);
        if login_path.exists() {
            login = from_str(&read_to_string(login_path)?)?;
        } else {
            login.create_login()?;
        }

        Ok(login)
    }

    /// Returns a copy with any given command-line value taking precedence
    /// over the file value.
    pub(crate) fn override_with(
        &self,
        username: Option<String>,
        password: Option<String>,
        api_key: Option<String>,
    ) -> Login {
        Login {
            username: username.unwrap_or_else(|| self.username.clone()),
            password: password.unwrap_or_else(|| self.password.clone()),
            api_key: api_key.unwrap_or_else(|| self.api_key.clone()),
        }
    }

    /// Checks whether any credential needed for a submission is missing.
    pub(crate) fn is_empty(&self) -> bool {
        self.username.is_empty() || self.password.is_empty() || self.api_key.is_empty()
    }

    /// Creates a new login file.
    fn create_login(&self) -> Result<(), Error> {
        write(LOGIN_NAME, to_string_pretty(self)?)?;

        info!("The login file was created.");
        info!("Fill in your username, password and API key before uploading.");
        info!(
            "Treat the API key like a password; do not hand it to software you don't trust."
        );

        Ok(())
    }
}
