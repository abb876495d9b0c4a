// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{
    codec::{read_group, EntryStore},
    model::{
        data::{
            ACTION_GROUP, ACTION_ITEMS, ITEM_GROUP, MENU_GROUP, PARAMETERS, PATH, PROFILE_GROUP,
            TOOLBAR_LABEL,
        },
        version::reconcile_profiles,
        DataValue, Item, ItemType, Profile, CURRENT_VERSION,
    },
    provider::desktop::{
        file::{split_exec, DesktopFile},
        profile_group, DESKTOP_GROUP, EXEC_KEY, HIDDEN_KEY, PROFILE_GROUP_PREFIX, TYPE_KEY,
    },
};

use tracing::{debug, warn};

/// Materialize the item stored in a desktop file.
///
/// Returns `None` for hidden files and files that do not describe an item.
pub(crate) fn read_item(id: &str, file: &DesktopFile, messages: &mut Vec<String>) -> Option<Item> {
    let keyfile = file.keyfile();
    if !keyfile.has_group(DESKTOP_GROUP) {
        warn!("{:?}: no [{DESKTOP_GROUP}] group", file.path());
        messages.push(format!("{}: no [{DESKTOP_GROUP}] group", file.path().display()));
        return None;
    }

    if keyfile.boolean(DESKTOP_GROUP, HIDDEN_KEY).ok().flatten() == Some(true) {
        debug!("skip hidden desktop file {:?}", file.path());
        return None;
    }

    let discriminator = keyfile.string(DESKTOP_GROUP, TYPE_KEY).ok().flatten();
    let Some(item_type) = ItemType::from_discriminator(discriminator.as_deref()) else {
        warn!("{:?}: unknown item type {discriminator:?}", file.path());
        return None;
    };

    let mut item = Item::new_of_type(item_type, id);
    let mut writable = read_group(file, DESKTOP_GROUP, ITEM_GROUP, item.attributes_mut());
    if discriminator.is_some() {
        writable &= file.is_entry_writable(DESKTOP_GROUP, TYPE_KEY);
    }

    match item_type {
        ItemType::Menu => {
            writable &= read_group(file, DESKTOP_GROUP, MENU_GROUP, item.attributes_mut());
        }
        ItemType::Action => {
            writable &= read_group(file, DESKTOP_GROUP, ACTION_GROUP, item.attributes_mut());
            item.set_version(CURRENT_VERSION);

            // INVARIANT: Toolbar label equal to the label, or absent, means same label.
            let same = match item.attributes().get(&TOOLBAR_LABEL) {
                Some(label) => label.as_str() == Some(item.label().as_str()),
                None => true,
            };
            item.set_toolbar_same_label(same);

            let mut discovered = Vec::new();
            for group in keyfile.group_names() {
                let Some(profile_id) = group.strip_prefix(PROFILE_GROUP_PREFIX) else {
                    continue;
                };

                let mut profile = Profile::new(profile_id);
                writable &= read_profile(file, &mut profile);
                discovered.push(profile);
            }

            if discovered.is_empty() {
                warn!("action {id:?} has no profile");
            }

            let listed = item.attributes().list(&ACTION_ITEMS);
            let profiles = reconcile_profiles(id, Some(&listed), discovered);
            item.set_profiles(profiles);
        }
    }

    item.set_readonly(!writable);
    Some(item)
}

fn read_profile(file: &DesktopFile, profile: &mut Profile) -> bool {
    let group = profile_group(profile.id());
    let mut writable = read_group(file, &group, PROFILE_GROUP, profile.attributes_mut());

    match file.keyfile().string(&group, EXEC_KEY) {
        Ok(Some(exec)) => {
            writable &= file.is_entry_writable(&group, EXEC_KEY);
            let (path, parameters) = split_exec(&exec);
            profile.set_path(path);
            profile.set_parameters(parameters);
        }
        Ok(None) => {
            warn!("{group}: mandatory entry {EXEC_KEY:?} not found, using default");
            profile
                .attributes_mut()
                .set(&PATH, DataValue::Str(String::new()));
        }
        Err(error) => {
            warn!("{group}: {error}, using default for {EXEC_KEY:?}");
            writable &= file.is_entry_writable(&group, EXEC_KEY);
            profile
                .attributes_mut()
                .set(&PATH, DataValue::Str(String::new()));
            profile.attributes_mut().unset(&PARAMETERS);
        }
    }

    writable
}
