use anyhow::{Context, Result};
use chrono::Timelike;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Name used when the user declines to give one
pub const DEFAULT_NAME: &str = "User";

/// Greeting for an hour of the day (0-23)
pub fn greeting_for_hour(hour: u32) -> &'static str {
    if hour < 12 {
        "Good morning"
    } else if hour < 18 {
        "Good afternoon"
    } else {
        "Good evening"
    }
}

/// Greeting for the current local time
pub fn current_greeting() -> &'static str {
    greeting_for_hour(chrono::Local::now().hour())
}

/// Normalise onboarding input into a display name
pub fn name_or_default(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Stored user preferences
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub display_name: Option<String>,
}

/// Read/write access to the user's display name
pub trait ProfileStore: Send {
    fn display_name(&self) -> Result<Option<String>>;
    fn set_display_name(&mut self, name: &str) -> Result<()>;
}

/// Profile kept in a TOML file under the sparkchat home directory
pub struct FileProfileStore {
    path: PathBuf,
}

impl FileProfileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn load(&self) -> Result<UserProfile> {
        if !self.path.exists() {
            return Ok(UserProfile::default());
        }

        let content = fs::read_to_string(&self.path)
            .context("Failed to read profile")?;
        toml::from_str(&content)
            .context("Failed to parse profile")
    }
}

impl ProfileStore for FileProfileStore {
    fn display_name(&self) -> Result<Option<String>> {
        Ok(self
            .load()?
            .display_name
            .filter(|name| !name.trim().is_empty()))
    }

    fn set_display_name(&mut self, name: &str) -> Result<()> {
        let mut profile = self.load()?;
        profile.display_name = Some(name.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create profile directory")?;
        }

        let content = toml::to_string_pretty(&profile)
            .context("Failed to serialize profile")?;
        fs::write(&self.path, content)
            .context("Failed to write profile")?;
        Ok(())
    }
}

/// Profile that lives only for the current run (used with `--name`)
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    name: Option<String>,
}

impl MemoryProfileStore {
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

impl ProfileStore for MemoryProfileStore {
    fn display_name(&self) -> Result<Option<String>> {
        Ok(self.name.clone())
    }

    fn set_display_name(&mut self, name: &str) -> Result<()> {
        self.name = Some(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_boundaries() {
        assert_eq!(greeting_for_hour(0), "Good morning");
        assert_eq!(greeting_for_hour(11), "Good morning");
        assert_eq!(greeting_for_hour(12), "Good afternoon");
        assert_eq!(greeting_for_hour(17), "Good afternoon");
        assert_eq!(greeting_for_hour(18), "Good evening");
        assert_eq!(greeting_for_hour(23), "Good evening");
    }

    #[test]
    fn blank_name_falls_back() {
        assert_eq!(name_or_default(""), "User");
        assert_eq!(name_or_default("   "), "User");
        assert_eq!(name_or_default("  Ada "), "Ada");
    }

    #[test]
    fn file_store_round_trips_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("profile.toml");
        let mut store = FileProfileStore::new(path.clone());

        assert_eq!(store.display_name().unwrap(), None);

        store.set_display_name("Ada").unwrap();
        assert!(path.exists());

        let reopened = FileProfileStore::new(path);
        assert_eq!(reopened.display_name().unwrap().as_deref(), Some("Ada"));
    }

    #[test]
    fn blank_stored_name_counts_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.toml");
        fs::write(&path, "display_name = \"\"\n").unwrap();

        assert_eq!(FileProfileStore::new(path).display_name().unwrap(), None);
    }
}
