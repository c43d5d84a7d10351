use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::pet::PetState;

const USER_FILE: &str = "user.json";
const STATE_FILE: &str = "state.json";

/// User-editable settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub user_name: String,
    pub follow_enabled: bool,
    pub auto_start: bool,
    pub sound_enabled: bool,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            user_name: "user".to_string(),
            follow_enabled: false,
            auto_start: false,
            sound_enabled: true,
        }
    }
}

/// Last known pet position and facing, restored on startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub x: i32,
    pub y: i32,
    pub state: PetState,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            x: 100,
            y: 100,
            state: PetState::Normal,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config io error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// On-disk configuration: two small JSON documents under the platform config
/// directory. Load failures degrade to defaults; setters persist
/// synchronously; saves are atomic (write a sibling temp file, then swap).
pub struct ConfigStore {
    dir: PathBuf,
    pub user: UserConfig,
    pub state: StateConfig,
}

impl ConfigStore {
    /// Load from the default platform location.
    pub fn load() -> Self {
        Self::load_from(default_dir())
    }

    /// Load from an explicit directory. Missing or unreadable files fall
    /// back to defaults with a log line; nothing here is fatal.
    pub fn load_from(dir: PathBuf) -> Self {
        let user = load_or_default(&dir.join(USER_FILE));
        let state = load_or_default(&dir.join(STATE_FILE));
        log::info!("Config loaded from {}", dir.display());
        Self { dir, user, state }
    }

    pub fn save_user(&self) {
        if let Err(e) = write_json(&self.dir, USER_FILE, &self.user) {
            log::error!("Failed to save {USER_FILE}: {e}");
        }
    }

    pub fn save_state(&self) {
        if let Err(e) = write_json(&self.dir, STATE_FILE, &self.state) {
            log::error!("Failed to save {STATE_FILE}: {e}");
        }
    }

    pub fn set_position(&mut self, x: i32, y: i32) {
        self.state.x = x;
        self.state.y = y;
        self.save_state();
    }

    pub fn set_pet_state(&mut self, state: PetState) {
        self.state.state = state;
        self.save_state();
    }

    pub fn set_follow_enabled(&mut self, enabled: bool) {
        self.user.follow_enabled = enabled;
        self.save_user();
    }

    pub fn set_user_name(&mut self, name: &str) {
        self.user.user_name = name.to_string();
        self.save_user();
    }
}

/// Config directory: platform config dir, then home, then the CWD.
fn default_dir() -> PathBuf {
    if let Some(base) = dirs::config_dir() {
        return base.join("deskpet");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".deskpet");
    }
    PathBuf::from(".")
}

fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    match read_json(path) {
        Ok(value) => value,
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => T::default(),
        Err(e) => {
            log::warn!("Ignoring {}: {e}", path.display());
            T::default()
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Write `<name>.tmp` next to the target, then swap it into place. The
/// explicit remove keeps the rename valid on Windows, where renaming over an
/// existing file fails.
fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<(), ConfigError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(name);
    let tmp = dir.join(format!("{name}.tmp"));

    let text = serde_json::to_string_pretty(value)?;
    fs::write(&tmp, text)?;

    if path.exists() {
        fs::remove_file(&path)?;
    }
    fs::rename(&tmp, &path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("deskpet_cfg_{}", fastrand::u64(..)));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn missing_files_load_as_defaults() {
        let dir = scratch_dir();
        let store = ConfigStore::load_from(dir.clone());
        assert_eq!(store.user, UserConfig::default());
        assert_eq!(store.state, StateConfig::default());
        assert_eq!(store.state.x, 100);
        // Follow is opt-in: a fresh profile starts with it off.
        assert!(!store.user.follow_enabled);
        assert_eq!(store.user.user_name, "user");
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn corrupt_file_loads_as_defaults() {
        let dir = scratch_dir();
        fs::write(dir.join(USER_FILE), "{not json").unwrap();
        fs::write(dir.join(STATE_FILE), "[1, 2, 3]").unwrap();

        let store = ConfigStore::load_from(dir.clone());
        assert_eq!(store.user, UserConfig::default());
        assert_eq!(store.state, StateConfig::default());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn partial_documents_fill_missing_fields() {
        let user: UserConfig = serde_json::from_str(r#"{"user_name": "Sam"}"#).unwrap();
        assert_eq!(user.user_name, "Sam");
        assert!(!user.follow_enabled);
        assert!(!user.auto_start);

        let state: StateConfig = serde_json::from_str(r#"{"x": 640, "state": "back"}"#).unwrap();
        assert_eq!(state.x, 640);
        assert_eq!(state.y, 100);
        assert_eq!(state.state, PetState::Back);
    }

    #[test]
    fn setters_persist_and_reload() {
        let dir = scratch_dir();
        {
            let mut store = ConfigStore::load_from(dir.clone());
            store.set_position(640, 360);
            store.set_pet_state(PetState::Back);
            store.set_user_name("Sam");
            store.set_follow_enabled(true);
        }

        let store = ConfigStore::load_from(dir.clone());
        assert_eq!((store.state.x, store.state.y), (640, 360));
        assert_eq!(store.state.state, PetState::Back);
        assert_eq!(store.user.user_name, "Sam");
        assert!(store.user.follow_enabled);

        // No temp leftovers after the swap.
        assert!(!dir.join(format!("{STATE_FILE}.tmp")).exists());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn save_replaces_existing_file() {
        let dir = scratch_dir();
        let mut store = ConfigStore::load_from(dir.clone());
        store.set_position(1, 2);
        store.set_position(3, 4);

        let text = fs::read_to_string(dir.join(STATE_FILE)).unwrap();
        let reloaded: StateConfig = serde_json::from_str(&text).unwrap();
        assert_eq!((reloaded.x, reloaded.y), (3, 4));
        fs::remove_dir_all(dir).unwrap();
    }
}
