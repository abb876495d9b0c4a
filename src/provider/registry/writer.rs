// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{
    codec::{write_group, EntryStore},
    model::{
        data::{ACTION_GROUP, ITEM_GROUP, MENU_GROUP, PROFILE_GROUP},
        DataValue, EntryDialect, Item, ItemKind,
    },
    provider::{
        program_error,
        registry::{item_dir, schema_dir, CONFIG_ROOT, TYPE_ENTRY},
        Outcome, WriteStatus,
    },
    registry::{join_key, key_basename, Registry},
};

use std::collections::HashSet;
use tracing::{debug, warn};

const PROBE_ENTRY: &str = "fmactions-write-probe";

/// Throwaway write then unset below the configuration root.
pub(super) fn probe(registry: &mut dyn Registry) -> bool {
    let key = join_key(CONFIG_ROOT, PROBE_ENTRY);
    let result = registry
        .set(&key, &DataValue::Bool(true))
        .and_then(|_| registry.unset(&key));

    match result {
        Ok(()) => true,
        Err(error) => {
            debug!("registry is not willing to write: {error}");
            false
        }
    }
}

/// Check if every entry at or below a directory can be written.
///
/// A directory holding nothing yet is as writable as its type entry would be.
pub(super) fn is_dir_writable(registry: &dyn Registry, dir: &str) -> bool {
    let entries = registry.all_entries(dir).unwrap_or_default();
    let dirs = registry.all_dirs(dir).unwrap_or_default();

    if entries.is_empty() && dirs.is_empty() {
        return registry.is_key_writable(&join_key(dir, TYPE_ENTRY));
    }

    entries
        .iter()
        .all(|entry| registry.is_key_writable(&join_key(dir, entry)))
        && dirs.iter().all(|sub| is_dir_writable(registry, sub))
}

pub(super) fn write_item(registry: &mut dyn Registry, item: &Item) -> Outcome {
    if let Some(outcome) = program_error(item) {
        return outcome;
    }

    let dir = item_dir(item.id());
    let mut messages = Vec::new();

    let discriminator = DataValue::Str(item.item_type().as_str().into());
    let mut ok = match registry.write_value(&dir, TYPE_ENTRY, &discriminator) {
        Ok(()) => true,
        Err(error) => {
            messages.push(format!("{dir}: {TYPE_ENTRY}: {error}"));
            false
        }
    };
    ok &= write_group(&mut *registry, &dir, ITEM_GROUP, item.attributes(), &mut messages);

    match item.kind() {
        ItemKind::Menu(_) => {
            ok &= write_group(&mut *registry, &dir, MENU_GROUP, item.attributes(), &mut messages);
        }
        ItemKind::Action(action) => {
            ok &= write_group(&mut *registry, &dir, ACTION_GROUP, item.attributes(), &mut messages);
            ok &= remove_legacy_entries(registry, &dir, &mut messages);
            ok &= remove_stale_profiles(registry, &dir, item, &mut messages);

            for profile in action.profiles() {
                let profile_dir = join_key(&dir, profile.id());
                let stored = write_group(
                    &mut *registry,
                    &profile_dir,
                    PROFILE_GROUP,
                    profile.attributes(),
                    &mut messages,
                );
                if !stored {
                    ok = false;
                    break;
                }
            }
        }
    }

    if !ok {
        warn!("item {:?} only partially written", item.id());
    }

    Outcome::from_success(ok, messages)
}

pub(super) fn delete_item(registry: &mut dyn Registry, item: &Item) -> Outcome {
    if item.id().trim().is_empty() {
        return Outcome::new(
            WriteStatus::ProgramError,
            vec!["item has an empty identifier".into()],
        );
    }

    let dir = item_dir(item.id());
    if let Err(error) = registry.recursive_unset(&dir) {
        warn!("failed to delete {dir}: {error}");
        return Outcome::new(WriteStatus::WriteError, vec![format!("{dir}: {error}")]);
    }

    let mut messages = Vec::new();
    let schema = schema_dir(item.id());
    if let Err(error) = registry.recursive_unset(&schema) {
        warn!("failed to delete legacy schema {schema}: {error}");
        messages.push(format!("{schema}: {error}"));
    }

    Outcome::new(WriteStatus::Ok, messages)
}

/// Remove flat profile entries left over from data that predates profiles.
fn remove_legacy_entries(registry: &mut dyn Registry, dir: &str, messages: &mut Vec<String>) -> bool {
    let item_entries = ITEM_GROUP
        .iter()
        .chain(ACTION_GROUP.iter())
        .filter_map(|def| def.entry(EntryDialect::Registry))
        .collect::<HashSet<_>>();
    let present = registry.all_entries(dir).unwrap_or_default();

    let mut ok = true;
    for entry in PROFILE_GROUP
        .iter()
        .filter_map(|def| def.entry(EntryDialect::Registry))
        .filter(|entry| !item_entries.contains(entry))
        .filter(|entry| present.iter().any(|name| name == entry))
    {
        debug!("{dir}: drop legacy entry {entry:?}");
        if let Err(error) = registry.unset(&join_key(dir, entry)) {
            messages.push(format!("{dir}: {entry}: {error}"));
            ok = false;
        }
    }

    ok
}

fn remove_stale_profiles(
    registry: &mut dyn Registry,
    dir: &str,
    item: &Item,
    messages: &mut Vec<String>,
) -> bool {
    let stale = registry
        .all_dirs(dir)
        .unwrap_or_default()
        .into_iter()
        .filter(|profile_dir| item.profile(key_basename(profile_dir)).is_none())
        .collect::<Vec<_>>();

    let mut ok = true;
    for profile_dir in stale {
        debug!("remove stale profile {profile_dir:?}");
        if let Err(error) = registry.recursive_unset(&profile_dir) {
            messages.push(format!("{profile_dir}: {error}"));
            ok = false;
        }
    }

    ok
}
