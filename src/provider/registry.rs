// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Legacy registry backend.
//!
//! Every item occupies a registry directory named by its identifier below
//! [`CONFIG_ROOT`]. Item attributes are leaf entries of that directory.
//! Profiles occupy one further sub-directory each:
//!
//! ```text
//! /apps/fm-actions/configurations/<id>/label
//! /apps/fm-actions/configurations/<id>/items-list
//! /apps/fm-actions/configurations/<id>/<profile-id>/path
//! /apps/fm-actions/configurations/<id>/<profile-id>/parameters
//! ```
//!
//! Actions written before profiles existed keep their command directly in
//! the item directory. Such data is read as a single synthesized profile.
//!
//! # Write Support
//!
//! This backend is legacy. Reading always works, but writing, deleting, the
//! willingness probe, and per-item writability are only compiled in with the
//! `registry-write` Cargo feature. Without it, the backend keeps the
//! conservative [`IoProvider`] defaults and is read-only.

#[cfg(feature = "registry-write")]
mod writer;

use crate::{
    codec::{read_group, EntryStore},
    model::{
        data::{ACTION_GROUP, ACTION_ITEMS, ITEM_GROUP, MENU_GROUP, PROFILE_GROUP},
        version::{apply_generation_defaults, reconcile_profiles, synthesize_legacy_profile},
        DataType, Item, ItemType, Profile, ProviderId, LEGACY_PROFILE_ID,
    },
    monitor::{DirMonitor, MonitorHandle, Result as MonitorResult, WatchSpec},
    provider::{IoProvider, ProviderNotice},
    registry::{join_key, key_basename, Registry},
};

#[cfg(feature = "registry-write")]
use crate::provider::Outcome;

use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, instrument, warn};

/// Identifier of the registry provider.
pub const REGISTRY_PROVIDER_ID: &str = "io-registry";

/// Directory holding one sub-directory per item.
pub const CONFIG_ROOT: &str = "/apps/fm-actions/configurations";

/// Directory holding legacy schema descriptions, one per item.
pub const SCHEMAS_ROOT: &str = "/schemas/apps/fm-actions/configurations";

/// Entry holding the item type discriminator.
pub const TYPE_ENTRY: &str = "type";

/// Registry directory of an item.
pub fn item_dir(id: &str) -> String {
    join_key(CONFIG_ROOT, id)
}

/// Registry directory of an item's legacy schema description.
pub fn schema_dir(id: &str) -> String {
    join_key(SCHEMAS_ROOT, id)
}

/// Registry provider over any [`Registry`] implementation.
#[derive(Debug)]
pub struct RegistryProvider<R> {
    id: ProviderId,
    registry: R,
}

impl<R> RegistryProvider<R>
where
    R: Registry + Send + 'static,
{
    pub fn new(registry: R) -> Self {
        Self {
            id: ProviderId::new(REGISTRY_PROVIDER_ID),
            registry,
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    fn store(&self) -> &dyn Registry {
        &self.registry
    }

    fn read_item(&self, dir: &str, messages: &mut Vec<String>) -> Option<Item> {
        let store = self.store();
        let id = key_basename(dir);

        let discriminator = match store.read_value(dir, TYPE_ENTRY, DataType::String) {
            Ok(value) => value,
            Err(error) => {
                warn!("{dir}: {error}");
                messages.push(format!("{dir}: {error}"));
                return None;
            }
        };
        let discriminator = discriminator.as_ref().and_then(|value| value.as_str());
        let Some(item_type) = ItemType::from_discriminator(discriminator) else {
            warn!("{dir}: unknown item type {discriminator:?}");
            return None;
        };

        let mut item = Item::new_of_type(item_type, id);
        let mut writable = read_group(store, dir, ITEM_GROUP, item.attributes_mut());
        if discriminator.is_some() {
            writable &= store.is_entry_writable(dir, TYPE_ENTRY);
        }

        match item_type {
            ItemType::Menu => {
                writable &= read_group(store, dir, MENU_GROUP, item.attributes_mut());
            }
            ItemType::Action => {
                writable &= read_group(store, dir, ACTION_GROUP, item.attributes_mut());
                let generation = item.schema_generation();

                let profile_dirs = store.all_dirs(dir).unwrap_or_else(|error| {
                    warn!("{dir}: cannot list profiles: {error}");
                    Vec::new()
                });

                let profiles = if profile_dirs.is_empty() {
                    // INVARIANT: No profile directory means pre-profile data.
                    let mut flat = Profile::new(LEGACY_PROFILE_ID);
                    writable &= read_group(store, dir, PROFILE_GROUP, flat.attributes_mut());
                    vec![synthesize_legacy_profile(flat, generation)]
                } else {
                    let mut discovered = Vec::with_capacity(profile_dirs.len());
                    for profile_dir in &profile_dirs {
                        let mut profile = Profile::new(key_basename(profile_dir));
                        writable &=
                            read_group(store, profile_dir, PROFILE_GROUP, profile.attributes_mut());
                        apply_generation_defaults(&mut profile, generation);
                        discovered.push(profile);
                    }

                    let listed = item.attributes().list(&ACTION_ITEMS);
                    reconcile_profiles(id, Some(&listed), discovered)
                };
                item.set_profiles(profiles);
            }
        }

        item.set_readonly(!writable);
        item.set_provider(Some(self.id.clone()));
        Some(item)
    }
}

impl<R> IoProvider for RegistryProvider<R>
where
    R: Registry + Send + 'static,
{
    fn id(&self) -> &ProviderId {
        &self.id
    }

    #[instrument(skip(self, messages), level = "debug")]
    fn read_items(&mut self, messages: &mut Vec<String>) -> Vec<Item> {
        let dirs = match self.registry.all_dirs(CONFIG_ROOT) {
            Ok(dirs) => dirs,
            Err(error) => {
                warn!("cannot list {CONFIG_ROOT}: {error}");
                messages.push(format!("{CONFIG_ROOT}: {error}"));
                return Vec::new();
            }
        };

        let items = dirs
            .iter()
            .filter_map(|dir| self.read_item(dir, messages))
            .collect::<Vec<_>>();

        info!("read {} items from registry", items.len());
        items
    }

    #[cfg(feature = "registry-write")]
    fn is_willing_to_write(&mut self) -> bool {
        writer::probe(&mut self.registry)
    }

    #[cfg(feature = "registry-write")]
    fn is_writable(&self, item: &Item) -> bool {
        if item.provider().is_some_and(|provider| provider != &self.id) {
            return false;
        }

        writer::is_dir_writable(&self.registry, &item_dir(item.id()))
    }

    #[cfg(feature = "registry-write")]
    #[instrument(skip(self, item), fields(item = item.id()), level = "debug")]
    fn write_item(&mut self, item: &Item) -> Outcome {
        writer::write_item(&mut self.registry, item)
    }

    #[cfg(feature = "registry-write")]
    #[instrument(skip(self, item), fields(item = item.id()), level = "debug")]
    fn delete_item(&mut self, item: &Item) -> Outcome {
        writer::delete_item(&mut self.registry, item)
    }

    fn watch(
        &self,
        sink: UnboundedSender<ProviderNotice>,
        delay: Duration,
    ) -> MonitorResult<Option<MonitorHandle>> {
        let Some(root) = self.registry.watch_root() else {
            return Ok(None);
        };

        let spec = WatchSpec::new([root]).recursive(true);
        let id = self.id.clone();
        let handle = DirMonitor::start(spec, delay, move || {
            let _ = sink.send(ProviderNotice::ItemsChanged(id.clone()));
        })?;

        Ok(Some(handle))
    }
}
