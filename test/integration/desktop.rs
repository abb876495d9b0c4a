// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::DesktopFixture;

use anyhow::{anyhow, Result};
use fmactions::{
    config::Preferences,
    model::data::TOOLBAR_LABEL,
    pivot::Pivot,
    provider::{desktop::DESKTOP_PROVIDER_ID, IoProvider, WriteStatus},
    updater::{NotWritable, Updater},
};
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::fs;

const SYSTEM_ACTION: &str = indoc! {r#"
    # Shipped by the distribution.
    [Desktop Entry]
    Type=Action
    Name=Open Terminal
    X-Vendor-Extra=keep me
    Profiles=main;

    [X-Action-Profile main]
    Exec=/usr/bin/terminal --working-directory %d
    MimeTypes=inode/directory;
"#};

fn updater(fixture: &DesktopFixture) -> Updater {
    let mut pivot = Pivot::new(vec![Box::new(fixture.provider())], Preferences::default());
    pivot.load_items();
    Updater::new(pivot)
}

#[test]
fn system_item_is_shadowed_on_write() -> Result<()> {
    let fixture = DesktopFixture::new()?;
    let system = fixture.write_system("terminal", SYSTEM_ACTION)?;

    let mut updater = updater(&fixture);
    let mut item = updater
        .pivot()
        .get_item("terminal")
        .cloned()
        .ok_or(anyhow!("terminal not loaded"))?;
    assert_eq!(item.label(), "Open Terminal");
    assert!(!item.is_readonly());
    assert_eq!(updater.check_writability(&item), Ok(()));

    item.set_enabled(false);
    let outcome = updater.write_item(&item);
    assert_eq!(outcome.status, WriteStatus::Ok);

    // System file is left alone.
    assert_eq!(fs::read_to_string(&system)?, SYSTEM_ACTION);

    let shadow = fs::read_to_string(fixture.user_dir().join("terminal.desktop"))?;
    assert!(shadow.contains("Enabled=false\n"));
    assert!(shadow.contains("X-Vendor-Extra=keep me\n"));
    assert!(shadow.contains("Exec=/usr/bin/terminal --working-directory %d\n"));

    let mut pivot = updater.into_pivot();
    pivot.load_items();
    let reloaded = pivot.get_item("terminal").ok_or(anyhow!("terminal lost"))?;
    assert!(!reloaded.is_enabled());
    assert_eq!(reloaded.profiles()[0].mimetypes(), vec!["inode/directory".to_string()]);

    Ok(())
}

#[test]
fn hidden_user_file_masks_system_item() -> Result<()> {
    let fixture = DesktopFixture::new()?;
    fixture.write_system("terminal", SYSTEM_ACTION)?;
    fixture.write_user("terminal", "[Desktop Entry]\nType=Action\nHidden=true\n")?;

    let mut provider = fixture.provider();
    let items = provider.read_items(&mut Vec::new());
    assert!(items.is_empty());

    Ok(())
}

#[test]
fn menus_group_items_from_files() -> Result<()> {
    let fixture = DesktopFixture::new()?;
    fixture.write_system("terminal", SYSTEM_ACTION)?;
    fixture.write_user(
        "tools",
        "[Desktop Entry]\nType=Menu\nName=Tools\nItemsList=terminal;missing;\n",
    )?;
    fixture.write_user("broken", "[Desktop Entry\nName=Broken\n")?;

    let mut pivot = Pivot::new(vec![Box::new(fixture.provider())], Preferences::default());
    let messages = pivot.load_items();
    assert_eq!(messages.len(), 1);

    let ids = pivot.items().iter().map(|item| item.id()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["tools"]);
    let children = pivot.items()[0]
        .children()
        .iter()
        .map(|item| item.id())
        .collect::<Vec<_>>();
    assert_eq!(children, vec!["terminal"]);

    Ok(())
}

#[test]
fn new_action_is_created_then_deleted() -> Result<()> {
    let fixture = DesktopFixture::new()?;
    let mut updater = updater(&fixture);

    let mut item = fmactions::model::Item::create_action("Say Hello");
    let id = item.id().to_string();
    if let Some(profile) = item.profiles().first().map(|profile| profile.id().to_string()) {
        if let Some(profile) = item.profile_mut(&profile) {
            profile.set_path("/usr/bin/echo");
            profile.set_parameters("hello %f");
        }
    }

    let outcome = updater.write_item(&item);
    assert_eq!(outcome.status, WriteStatus::Ok);

    let path = fixture.user_dir().join(format!("{id}.desktop"));
    let data = fs::read_to_string(&path)?;
    assert!(data.starts_with("[Desktop Entry]\nType=Action\nName=Say Hello\n"));
    assert!(data.contains("Exec=/usr/bin/echo hello %f\n"));

    let outcome = updater.delete_item(&id);
    assert_eq!(outcome.status, WriteStatus::Ok);
    assert!(!path.exists());
    assert!(updater.pivot().get_item(&id).is_none());

    Ok(())
}

#[test]
fn empty_action_is_a_program_error() -> Result<()> {
    let fixture = DesktopFixture::new()?;
    let mut provider = fixture.provider();

    let outcome = provider.write_item(&fmactions::model::Item::new_action("bare"));
    assert_eq!(outcome.status, WriteStatus::ProgramError);
    assert!(!fixture.user_dir().exists());
    assert!(fixture.system_dir().exists());

    Ok(())
}

#[test]
fn deleting_system_item_masks_it() -> Result<()> {
    let fixture = DesktopFixture::new()?;
    let system = fixture.write_system("terminal", SYSTEM_ACTION)?;
    let mut updater = updater(&fixture);

    let outcome = updater.delete_item("terminal");
    assert_eq!(outcome.status, WriteStatus::Ok);
    assert_eq!(fs::read_to_string(&system)?, SYSTEM_ACTION);
    assert!(fixture.user_dir().join("terminal.desktop").is_file());

    let mut pivot = updater.into_pivot();
    pivot.load_items();
    assert!(pivot.get_item("terminal").is_none());

    Ok(())
}

#[test]
fn disabled_provider_keeps_files_on_delete() -> Result<()> {
    let fixture = DesktopFixture::new()?;
    let user = fixture.write_user("terminal", SYSTEM_ACTION)?;
    let preferences = Preferences::from_layers("[io-providers.io-desktop]\nwritable = false\n", "")?;

    let mut pivot = Pivot::new(vec![Box::new(fixture.provider())], preferences);
    pivot.load_items();
    let mut updater = Updater::new(pivot);

    let outcome = updater.delete_item("terminal");
    assert_eq!(outcome.status, WriteStatus::NotWilling);
    assert_eq!(
        outcome.messages,
        vec![NotWritable::ProviderDisabledByUser(DESKTOP_PROVIDER_ID.into()).to_string()]
    );
    assert!(user.is_file());
    assert!(updater.pivot().get_item("terminal").is_some());

    Ok(())
}

#[test]
fn hidden_toolbar_label_matches_reload() -> Result<()> {
    let fixture = DesktopFixture::new()?;
    fixture.write_system("terminal", SYSTEM_ACTION)?;
    let mut updater = updater(&fixture);

    let mut item = updater
        .pivot()
        .get_item("terminal")
        .cloned()
        .ok_or(anyhow!("terminal not loaded"))?;
    item.set_toolbar_same_label(true);
    item.set_toolbar_label("Shell");
    assert_eq!(updater.write_item(&item).status, WriteStatus::Ok);

    let written = updater
        .pivot()
        .get_item("terminal")
        .cloned()
        .ok_or(anyhow!("terminal lost"))?;
    let mut pivot = updater.into_pivot();
    pivot.load_items();
    let reloaded = pivot.get_item("terminal").ok_or(anyhow!("terminal not reloaded"))?;

    assert_eq!(written.attributes().get(&TOOLBAR_LABEL), None);
    assert_eq!(reloaded.attributes().get(&TOOLBAR_LABEL), None);
    assert_eq!(written.toolbar_label(), reloaded.toolbar_label());

    Ok(())
}
