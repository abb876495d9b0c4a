// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the preference file that steers how items are
//! loaded, ordered, and written back, plus the layering rules that let an
//! administrator lock parts of it.
//!
//! # Layers
//!
//! Preferences come in two layers: the __user__ file and the __mandatory__
//! file. Any key set in the mandatory file overrides the user value and is
//! locked, i.e., cannot be changed through [`Preferences`]. The global
//! `readonly` switch is only honoured from the mandatory layer.
//!
//! # Errors
//!
//! Parsing, shell expansion, and file access report [`ConfigError`]. Trying
//! to change a locked key reports [`ConfigError::Locked`].

use crate::provider::{desktop::DESKTOP_PROVIDER_ID, registry::REGISTRY_PROVIDER_ID};

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use toml::{Table, Value};
use tracing::{debug, instrument};

const LEVEL_ZERO_ORDER_KEY: &str = "level-zero-order";
const IO_PROVIDERS_KEY: &str = "io-providers";
const READONLY_KEY: &str = "readonly";

/// Preference file layout.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Settings {
    /// Manual order of top-level item identifiers.
    pub level_zero_order: Vec<String>,

    /// How items are ordered.
    pub order_mode: OrderMode,

    /// Reading priority of providers. Unlisted providers come last.
    pub io_providers_order: Vec<String>,

    /// Global administrator lock.
    pub readonly: bool,

    /// Quiet period after the last change notice before reloading.
    pub burst_delay_ms: u64,

    /// Per-provider switches.
    pub io_providers: BTreeMap<String, ProviderSettings>,

    /// Desktop backend settings.
    pub desktop: DesktopSettings,
}

impl Settings {
    /// Build settings from a parsed table, expanding shell variables.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Deserialize`] if table does not fit layout.
    /// - Return [`ConfigError::ShellExpansion`] if a path cannot be expanded.
    pub fn from_table(table: Table) -> Result<Self> {
        let settings: Settings = Value::Table(table).try_into()?;
        settings.expand()
    }

    /// Check if provider may be read from.
    pub fn is_provider_readable(&self, id: &str) -> bool {
        self.io_providers.get(id).is_none_or(|provider| provider.readable)
    }

    /// Check if user allows writes through provider.
    pub fn is_provider_writable(&self, id: &str) -> bool {
        self.io_providers.get(id).is_none_or(|provider| provider.writable)
    }

    pub fn burst_delay(&self) -> Duration {
        Duration::from_millis(self.burst_delay_ms)
    }

    fn expand(mut self) -> Result<Self> {
        // INVARIANT: Perform shell expansion on extra desktop directories.
        self.desktop.extra_dirs = self
            .desktop
            .extra_dirs
            .iter()
            .map(|dir| {
                shellexpand::full(dir.to_string_lossy().as_ref())
                    .map(|dir| PathBuf::from(dir.into_owned()))
                    .map_err(ConfigError::ShellExpansion)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            level_zero_order: Vec::new(),
            order_mode: OrderMode::default(),
            io_providers_order: vec![DESKTOP_PROVIDER_ID.into(), REGISTRY_PROVIDER_ID.into()],
            readonly: false,
            burst_delay_ms: 100,
            io_providers: BTreeMap::new(),
            desktop: DesktopSettings::default(),
        }
    }
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let settings: Settings = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;
        settings.expand()
    }
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Ordering of items at every level of the tree.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderMode {
    /// Level zero follows the stored order. Sub-menus follow their own list.
    #[default]
    Manual,

    /// Label order, A to Z.
    Ascending,

    /// Label order, Z to A.
    Descending,
}

/// Switches of one provider.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ProviderSettings {
    pub readable: bool,
    pub writable: bool,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            readable: true,
            writable: true,
        }
    }
}

/// Desktop backend settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DesktopSettings {
    /// Additional search directories, after the user one.
    pub extra_dirs: Vec<PathBuf>,
}

/// Layered preferences.
#[derive(Debug, Clone)]
pub struct Preferences {
    user_path: Option<PathBuf>,
    user: Table,
    mandatory: Table,
    effective: Settings,
}

impl Preferences {
    /// Construct preferences from user and mandatory file contents.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError`] if either layer cannot be parsed.
    pub fn from_layers(user: &str, mandatory: &str) -> Result<Self> {
        let user = user.parse::<Table>()?;
        let mandatory = mandatory.parse::<Table>()?;
        let effective = effective(&user, &mandatory)?;

        Ok(Self {
            user_path: None,
            user,
            mandatory,
            effective,
        })
    }

    /// Load preferences from disk.
    ///
    /// Missing files count as empty layers. The user file path is kept for
    /// [`Preferences::save`].
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Io`] if an existing file cannot be read.
    /// - Return [`ConfigError`] if either layer cannot be parsed.
    #[instrument(level = "debug")]
    pub fn load(user_path: Option<&Path>, mandatory_path: Option<&Path>) -> Result<Self> {
        let user = match user_path {
            Some(path) => read_optional(path)?,
            None => String::new(),
        };
        let mandatory = match mandatory_path {
            Some(path) => read_optional(path)?,
            None => String::new(),
        };

        let mut preferences = Self::from_layers(&user, &mandatory)?;
        preferences.user_path = user_path.map(Path::to_path_buf);
        Ok(preferences)
    }

    /// Effective settings after layering.
    pub fn settings(&self) -> &Settings {
        &self.effective
    }

    /// Check if a key path is set by the mandatory layer.
    pub fn is_locked(&self, key: &[&str]) -> bool {
        let Some((last, parents)) = key.split_last() else {
            return false;
        };

        let mut table = &self.mandatory;
        for parent in parents {
            match table.get(*parent).and_then(Value::as_table) {
                Some(inner) => table = inner,
                None => return false,
            }
        }

        table.contains_key(*last)
    }

    /// Whole configuration is locked by an administrator.
    pub fn is_readonly(&self) -> bool {
        self.effective.readonly
    }

    pub fn is_level_zero_locked(&self) -> bool {
        self.is_locked(&[LEVEL_ZERO_ORDER_KEY])
    }

    /// Writability switch of a provider is set by an administrator.
    pub fn is_provider_locked(&self, id: &str) -> bool {
        self.is_locked(&[IO_PROVIDERS_KEY, id, "writable"])
    }

    /// Replace manual level-zero order in the user layer.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Locked`] if the order is set by the mandatory
    ///   layer or the configuration is read-only.
    pub fn set_level_zero_order(&mut self, ids: &[String]) -> Result<()> {
        if self.is_readonly() || self.is_level_zero_locked() {
            return Err(ConfigError::Locked {
                key: LEVEL_ZERO_ORDER_KEY.into(),
            });
        }

        let ids = ids.iter().cloned().map(Value::String).collect();
        self.user
            .insert(LEVEL_ZERO_ORDER_KEY.into(), Value::Array(ids));
        self.effective = effective(&self.user, &self.mandatory)?;

        Ok(())
    }

    /// Write user layer back to its file.
    ///
    /// Preferences not loaded from a file have nothing to save to.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Io`] if file cannot be written.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.user_path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        debug!("save preferences to {path:?}");
        let data = toml::ser::to_string_pretty(&self.user)?;
        fs::write(path, data).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })
    }
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            user_path: None,
            user: Table::new(),
            mandatory: Table::new(),
            effective: Settings::default(),
        }
    }
}

fn read_optional(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(data) => Ok(data),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn effective(user: &Table, mandatory: &Table) -> Result<Settings> {
    let mut merged = user.clone();
    merge(&mut merged, mandatory);

    // INVARIANT: Read-only switch is only honoured from the mandatory layer.
    let readonly = mandatory
        .get(READONLY_KEY)
        .and_then(Value::as_bool)
        .unwrap_or(false);
    merged.insert(READONLY_KEY.into(), Value::Boolean(readonly));

    Settings::from_table(merged)
}

fn merge(base: &mut Table, over: &Table) {
    for (key, value) in over {
        match (base.get_mut(key), value) {
            (Some(Value::Table(base)), Value::Table(over)) => merge(base, over),
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Failed to access configuration file.
    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Key is locked by an administrator.
    #[error("preference {key:?} is locked by an administrator")]
    Locked { key: String },
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn deserialize_settings() -> anyhow::Result<()> {
        let home = dirs::home_dir().ok_or(anyhow::anyhow!("no home"))?;
        let result: Settings = indoc! {r#"
            level-zero-order = ["b", "a"]
            order-mode = "descending"
            io-providers-order = ["io-registry"]
            burst-delay-ms = 250

            [io-providers.io-registry]
            writable = false

            [desktop]
            extra-dirs = ["~/actions", "/opt/actions"]
        "#}
        .parse()?;

        let mut io_providers = BTreeMap::new();
        io_providers.insert(
            "io-registry".to_string(),
            ProviderSettings {
                readable: true,
                writable: false,
            },
        );
        let expect = Settings {
            level_zero_order: vec!["b".into(), "a".into()],
            order_mode: OrderMode::Descending,
            io_providers_order: vec!["io-registry".into()],
            readonly: false,
            burst_delay_ms: 250,
            io_providers,
            desktop: DesktopSettings {
                extra_dirs: vec![home.join("actions"), "/opt/actions".into()],
            },
        };

        assert_eq!(result, expect);
        assert!(result.is_provider_readable("io-registry"));
        assert!(!result.is_provider_writable("io-registry"));
        assert!(result.is_provider_writable("io-desktop"));
        assert_eq!(result.burst_delay(), Duration::from_millis(250));

        Ok(())
    }

    #[test]
    fn empty_file_gives_defaults() -> anyhow::Result<()> {
        let result: Settings = "".parse()?;
        assert_eq!(result, Settings::default());
        assert_eq!(
            result.io_providers_order,
            vec!["io-desktop".to_string(), "io-registry".into()]
        );
        assert_eq!(result.burst_delay_ms, 100);

        Ok(())
    }

    #[test]
    fn serialize_settings() -> anyhow::Result<()> {
        let mut settings = Settings::default();
        settings.level_zero_order = vec!["a".into()];
        settings.order_mode = OrderMode::Ascending;

        let data = settings.to_string();
        assert!(data.contains("order-mode = \"ascending\""));
        assert_eq!(data.parse::<Settings>()?, settings);

        Ok(())
    }

    #[test]
    fn mandatory_layer_overrides_and_locks() -> anyhow::Result<()> {
        let user = indoc! {r#"
            level-zero-order = ["a", "b"]
            readonly = true

            [io-providers.io-desktop]
            writable = false
        "#};
        let mandatory = indoc! {r#"
            order-mode = "ascending"

            [io-providers.io-registry]
            writable = false
        "#};

        let mut preferences = Preferences::from_layers(user, mandatory)?;
        let settings = preferences.settings();
        assert_eq!(settings.order_mode, OrderMode::Ascending);
        assert_eq!(settings.level_zero_order, vec!["a".to_string(), "b".into()]);
        assert!(!settings.is_provider_writable("io-desktop"));
        assert!(!preferences.is_readonly());

        assert!(preferences.is_provider_locked("io-registry"));
        assert!(!preferences.is_provider_locked("io-desktop"));
        assert!(!preferences.is_level_zero_locked());

        preferences.set_level_zero_order(&["b".into()])?;
        assert_eq!(preferences.settings().level_zero_order, vec!["b".to_string()]);

        Ok(())
    }

    #[test]
    fn locked_level_zero_cannot_change() -> anyhow::Result<()> {
        let mut preferences =
            Preferences::from_layers("", "level-zero-order = [\"x\"]\n")?;
        assert!(preferences.is_level_zero_locked());
        assert!(matches!(
            preferences.set_level_zero_order(&["y".into()]),
            Err(ConfigError::Locked { .. })
        ));

        let mut preferences = Preferences::from_layers("", "readonly = true\n")?;
        assert!(preferences.is_readonly());
        assert!(preferences.set_level_zero_order(&["y".into()]).is_err());

        Ok(())
    }

    #[test]
    fn load_and_save_user_layer() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let user = dir.path().join("config/settings.toml");

        let mut preferences = Preferences::load(Some(&user), None)?;
        assert_eq!(preferences.settings(), &Settings::default());

        preferences.set_level_zero_order(&["a".into(), "b".into()])?;
        preferences.save()?;

        let reloaded = Preferences::load(Some(&user), None)?;
        assert_eq!(
            reloaded.settings().level_zero_order,
            vec!["a".to_string(), "b".into()]
        );

        Ok(())
    }
}
