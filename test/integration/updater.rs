// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{DesktopFixture, RegistryFixture};

use anyhow::{anyhow, Result};
use fmactions::{
    config::Preferences,
    model::{DataValue, Item, ProviderId},
    pivot::Pivot,
    provider::{
        desktop::DESKTOP_PROVIDER_ID,
        registry::item_dir,
        IoProvider, WriteStatus,
    },
    registry::{join_key, Registry},
    updater::{NotWritable, Updater},
};
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::fs;

const DESKTOP_OPEN_FOO: &str = indoc! {r#"
    [Desktop Entry]
    Type=Action
    Name=Open from desktop
    Profiles=main;

    [X-Action-Profile main]
    Exec=/usr/bin/foo %f
"#};

fn seed_registry(fixture: &RegistryFixture, id: &str, label: &str) -> Result<()> {
    let mut registry = fixture.registry();
    let dir = item_dir(id);
    registry.set(&join_key(&dir, "label"), &DataValue::Str(label.into()))?;
    registry.set(&join_key(&dir, "p1/path"), &DataValue::Str("/usr/bin/foo".into()))?;
    Ok(())
}

fn updater(desktop: &DesktopFixture, registry: &RegistryFixture, preferences: Preferences) -> Updater {
    let providers: Vec<Box<dyn IoProvider>> =
        vec![Box::new(desktop.provider()), Box::new(registry.provider())];
    let mut pivot = Pivot::new(providers, preferences);
    pivot.load_items();
    Updater::new(pivot)
}

#[test]
fn desktop_copy_wins_over_registry() -> Result<()> {
    let desktop = DesktopFixture::new()?;
    let registry = RegistryFixture::new()?;
    desktop.write_system("open-foo", DESKTOP_OPEN_FOO)?;
    seed_registry(&registry, "open-foo", "Open from registry")?;
    seed_registry(&registry, "legacy-only", "Legacy")?;

    let updater = updater(&desktop, &registry, Preferences::default());
    let pivot = updater.pivot();
    assert_eq!(pivot.items().len(), 2);

    let item = pivot.get_item("open-foo").ok_or(anyhow!("open-foo missing"))?;
    assert_eq!(item.label(), "Open from desktop");
    assert_eq!(item.provider(), Some(&ProviderId::new(DESKTOP_PROVIDER_ID)));

    let legacy = pivot.get_item("legacy-only").ok_or(anyhow!("legacy-only missing"))?;
    assert_eq!(legacy.label(), "Legacy");
    assert_eq!(legacy.profiles()[0].path(), "/usr/bin/foo");

    Ok(())
}

#[test]
fn new_items_go_to_desktop_files() -> Result<()> {
    let desktop = DesktopFixture::new()?;
    let registry = RegistryFixture::new()?;
    let mut updater = updater(&desktop, &registry, Preferences::default());

    assert_eq!(updater.default_writer(), Ok(ProviderId::new(DESKTOP_PROVIDER_ID)));

    let mut item = Item::create_menu("Tools");
    item.set_items_list(["nothing-yet"]);
    let outcome = updater.write_item(&item);
    assert_eq!(outcome.status, WriteStatus::Ok);

    let path = desktop.user_dir().join(format!("{}.desktop", item.id()));
    let data = fs::read_to_string(path)?;
    assert!(data.contains("Type=Menu\n"));
    assert!(data.contains("ItemsList=nothing-yet;\n"));
    assert!(registry.provider().read_items(&mut Vec::new()).is_empty());

    let stored = updater
        .pivot()
        .get_item(item.id())
        .ok_or(anyhow!("menu not in tree"))?;
    assert_eq!(stored.provider(), Some(&ProviderId::new(DESKTOP_PROVIDER_ID)));

    Ok(())
}

#[test]
fn read_only_configuration_refuses_writes() -> Result<()> {
    let desktop = DesktopFixture::new()?;
    let registry = RegistryFixture::new()?;
    desktop.write_system("open-foo", DESKTOP_OPEN_FOO)?;

    let preferences = Preferences::from_layers("", "readonly = true\n")?;
    let mut updater = updater(&desktop, &registry, preferences);

    let mut item = updater
        .pivot()
        .get_item("open-foo")
        .cloned()
        .ok_or(anyhow!("open-foo missing"))?;
    assert_eq!(
        updater.check_writability(&item),
        Err(NotWritable::ConfigurationLockedByAdmin)
    );

    item.set_label("Renamed");
    let outcome = updater.write_item(&item);
    assert_eq!(outcome.status, WriteStatus::NotWilling);
    assert_eq!(
        outcome.messages,
        vec![NotWritable::ConfigurationLockedByAdmin.to_string()]
    );
    assert!(!desktop.user_dir().exists());

    Ok(())
}

#[test]
fn level_zero_order_is_persisted() -> Result<()> {
    let desktop = DesktopFixture::new()?;
    let registry = RegistryFixture::new()?;
    desktop.write_system("b", "[Desktop Entry]\nName=B\n\n[X-Action-Profile p]\nExec=/bin/b\n")?;
    desktop.write_system("a", "[Desktop Entry]\nName=A\n\n[X-Action-Profile p]\nExec=/bin/a\n")?;

    let config = tempfile::tempdir()?;
    let settings = config.path().join("fmactions/settings.toml");
    let preferences = Preferences::load(Some(settings.as_path()), None)?;
    let mut updater = updater(&desktop, &registry, preferences);
    assert!(updater.is_level_zero_writable());

    let mut order = updater.pivot().items().to_vec();
    order.sort_by_key(|item| std::cmp::Reverse(item.id().to_string()));
    updater.write_level_zero(&order)?;

    let reloaded = Preferences::load(Some(settings.as_path()), None)?;
    assert_eq!(
        reloaded.settings().level_zero_order,
        vec!["b".to_string(), "a".into()]
    );

    let mut pivot = updater.into_pivot();
    pivot.load_items();
    let ids = pivot.items().iter().map(Item::id).collect::<Vec<_>>();
    assert_eq!(ids, vec!["b", "a"]);

    Ok(())
}

#[cfg(not(feature = "registry-write"))]
#[test]
fn read_only_registry_refuses_delete() -> Result<()> {
    use fmactions::provider::registry::REGISTRY_PROVIDER_ID;

    let desktop = DesktopFixture::new()?;
    let registry = RegistryFixture::new()?;
    seed_registry(&registry, "legacy-only", "Legacy")?;

    let mut updater = updater(&desktop, &registry, Preferences::default());
    let outcome = updater.delete_item("legacy-only");
    assert_eq!(outcome.status, WriteStatus::NotWilling);
    assert_eq!(
        outcome.messages,
        vec![NotWritable::ProviderNotWilling(REGISTRY_PROVIDER_ID.into()).to_string()]
    );
    assert!(registry.registry().dir_exists(&item_dir("legacy-only")));

    Ok(())
}
