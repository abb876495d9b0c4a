// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{
    codec::{write_group, EntryStore},
    model::{
        data::{ACTION_GROUP, ITEM_GROUP, MENU_GROUP, PROFILE_GROUP, TOOLBAR_LABEL},
        DataValue, Item, ItemKind, Profile,
    },
    provider::desktop::{
        file::{join_exec, DesktopFile},
        profile_group, DESKTOP_GROUP, EXEC_KEY, PROFILE_GROUP_PREFIX, TYPE_KEY,
    },
};

/// Store an item into a desktop file.
///
/// Keys and groups the item does not know about are left alone, except for
/// profile groups of profiles the action no longer has. Profiles are written
/// in order, stopping at the first one that fails.
///
/// Returns true if everything was stored.
pub(crate) fn write_item(file: &mut DesktopFile, item: &Item, messages: &mut Vec<String>) -> bool {
    let mut ok = store(
        file,
        DESKTOP_GROUP,
        TYPE_KEY,
        &DataValue::Str(item.item_type().as_str().into()),
        messages,
    );
    ok &= write_group(file, DESKTOP_GROUP, ITEM_GROUP, item.attributes(), messages);

    match item.kind() {
        ItemKind::Menu(_) => {
            ok &= write_group(file, DESKTOP_GROUP, MENU_GROUP, item.attributes(), messages);
        }
        ItemKind::Action(action) => {
            ok &= write_group(file, DESKTOP_GROUP, ACTION_GROUP, item.attributes(), messages);

            // INVARIANT: Same-label flag is derived from the toolbar label on read.
            let toolbar_label = item.attributes().get(&TOOLBAR_LABEL).and_then(DataValue::as_str);
            if item.toolbar_same_label() && toolbar_label.is_some_and(|label| label != item.label()) {
                ok &= remove(file, DESKTOP_GROUP, "ToolbarLabel", messages);
            }

            let stale = file
                .keyfile()
                .group_names()
                .into_iter()
                .filter_map(|group| group.strip_prefix(PROFILE_GROUP_PREFIX))
                .filter(|id| item.profile(id).is_none())
                .map(profile_group)
                .collect::<Vec<_>>();
            for group in stale {
                file.keyfile_mut().remove_group(&group);
            }

            for profile in action.profiles() {
                if !write_profile(file, profile, messages) {
                    ok = false;
                    break;
                }
            }
        }
    }

    ok
}

fn write_profile(file: &mut DesktopFile, profile: &Profile, messages: &mut Vec<String>) -> bool {
    let group = profile_group(profile.id());
    let mut ok = write_group(file, &group, PROFILE_GROUP, profile.attributes(), messages);

    let (path, parameters) = (profile.path(), profile.parameters());
    ok &= if path.is_empty() && parameters.is_empty() {
        remove(file, &group, EXEC_KEY, messages)
    } else {
        let exec = DataValue::Str(join_exec(&path, &parameters));
        store(file, &group, EXEC_KEY, &exec, messages)
    };

    ok
}

fn store(
    file: &mut DesktopFile,
    group: &str,
    key: &str,
    value: &DataValue,
    messages: &mut Vec<String>,
) -> bool {
    match file.write_value(group, key, value) {
        Ok(()) => true,
        Err(error) => {
            messages.push(format!("{group}: {key}: {error}"));
            false
        }
    }
}

fn remove(file: &mut DesktopFile, group: &str, key: &str, messages: &mut Vec<String>) -> bool {
    match file.remove_value(group, key) {
        Ok(()) => true,
        Err(error) => {
            messages.push(format!("{group}: {key}: {error}"));
            false
        }
    }
}
