// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::RegistryFixture;

use anyhow::Result;
use fmactions::{
    model::DataValue,
    provider::{
        registry::{item_dir, CONFIG_ROOT},
        IoProvider,
    },
    registry::{join_key, Registry, ENTRIES_FILE},
};
use pretty_assertions::assert_eq;

fn text(value: &str) -> DataValue {
    DataValue::Str(value.into())
}

fn seed_open_foo(fixture: &RegistryFixture) -> Result<()> {
    let mut registry = fixture.registry();
    let dir = item_dir("open-foo");
    registry.set(&join_key(&dir, "type"), &text("Action"))?;
    registry.set(&join_key(&dir, "label"), &text("Open"))?;
    registry.set(&join_key(&dir, "target-selection"), &DataValue::Bool(true))?;
    registry.set(&join_key(&dir, "p1/path"), &text("/usr/bin/foo"))?;
    registry.set(&join_key(&dir, "p1/parameters"), &text("%f"))?;
    Ok(())
}

#[test]
fn read_action_from_directory_tree() -> Result<()> {
    let fixture = RegistryFixture::new()?;
    seed_open_foo(&fixture)?;

    let entries = fixture
        .path()
        .join(CONFIG_ROOT.trim_start_matches('/'))
        .join("open-foo")
        .join(ENTRIES_FILE);
    assert!(entries.is_file());

    let mut provider = fixture.provider();
    let mut messages = Vec::new();
    let items = provider.read_items(&mut messages);
    assert_eq!(messages, Vec::<String>::new());

    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert_eq!(item.id(), "open-foo");
    assert!(item.is_action());
    assert_eq!(item.label(), "Open");
    assert!(item.target_selection());
    assert_eq!(item.profiles().len(), 1);
    assert_eq!(item.profiles()[0].path(), "/usr/bin/foo");
    assert_eq!(item.profiles()[0].parameters(), "%f");

    Ok(())
}

#[test]
fn empty_registry_reads_nothing() -> Result<()> {
    let fixture = RegistryFixture::new()?;
    let mut provider = fixture.provider();

    let mut messages = Vec::new();
    assert!(provider.read_items(&mut messages).is_empty());
    assert!(messages.is_empty());

    Ok(())
}

#[cfg(not(feature = "registry-write"))]
#[test]
fn read_only_without_write_support() -> Result<()> {
    use fmactions::provider::WriteStatus;

    let fixture = RegistryFixture::new()?;
    seed_open_foo(&fixture)?;

    let mut provider = fixture.provider();
    let items = provider.read_items(&mut Vec::new());
    assert!(!provider.is_willing_to_write());
    assert!(!provider.is_writable(&items[0]));
    assert_eq!(provider.write_item(&items[0]).status, WriteStatus::NotWilling);

    Ok(())
}

#[cfg(feature = "registry-write")]
mod write {
    use super::*;
    use fmactions::{
        model::{Item, Profile},
        provider::{registry::schema_dir, WriteStatus},
    };
    use std::{fs, os::unix::fs::PermissionsExt};

    #[test]
    fn write_read_delete_round_trip() -> Result<()> {
        let fixture = RegistryFixture::new()?;
        let mut provider = fixture.provider();
        assert!(provider.is_willing_to_write());

        let mut item = Item::new_action("greet");
        item.set_label("Greet");
        item.set_enabled(true);
        let mut profile = Profile::new("main");
        profile.set_path("/usr/bin/echo");
        profile.set_parameters("hi %f");
        item.attach_profile(profile);

        assert!(provider.is_writable(&item));
        assert_eq!(provider.write_item(&item).status, WriteStatus::Ok);

        let items = provider.read_items(&mut Vec::new());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].label(), "Greet");
        assert_eq!(items[0].profiles()[0].id(), "main");
        assert_eq!(items[0].profiles()[0].parameters(), "hi %f");

        assert_eq!(provider.delete_item(&items[0]).status, WriteStatus::Ok);
        assert!(!fixture.registry().dir_exists(&item_dir("greet")));
        assert!(provider.read_items(&mut Vec::new()).is_empty());

        Ok(())
    }

    #[test]
    fn locked_schema_still_deletes_item() -> Result<()> {
        let fixture = RegistryFixture::new()?;
        seed_open_foo(&fixture)?;
        fixture
            .registry()
            .set(&join_key(&schema_dir("open-foo"), "label"), &text("Open"))?;

        let schemas = fixture
            .path()
            .join(schema_dir("open-foo").trim_start_matches('/'))
            .parent()
            .map(|path| path.to_path_buf())
            .ok_or(anyhow::anyhow!("schema directory has no parent"))?;
        fs::set_permissions(&schemas, fs::Permissions::from_mode(0o555))?;

        let mut provider = fixture.provider();
        let items = provider.read_items(&mut Vec::new());
        let outcome = provider.delete_item(&items[0]);

        fs::set_permissions(&schemas, fs::Permissions::from_mode(0o755))?;

        assert_eq!(outcome.status, WriteStatus::Ok);
        assert_eq!(outcome.messages.len(), 1);
        assert!(!fixture.registry().dir_exists(&item_dir("open-foo")));
        assert!(fixture.registry().dir_exists(&schema_dir("open-foo")));

        Ok(())
    }
}
