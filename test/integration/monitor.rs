// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{DesktopFixture, RegistryFixture};

use anyhow::Result;
use fmactions::{
    config::Preferences,
    pivot::{Pivot, PivotEvent},
};
use pretty_assertions::assert_eq;
use std::{fs, time::Duration};
use tokio::time::timeout;

const ACTION: &str = "[Desktop Entry]\nName=Watched\n\n[X-Action-Profile p]\nExec=/bin/true\n";

#[tokio::test]
async fn new_desktop_file_is_reported() -> Result<()> {
    let desktop = DesktopFixture::new()?;
    desktop.write_user("first", ACTION)?;

    let preferences = Preferences::from_layers("burst-delay-ms = 50\n", "")?;
    let mut pivot = Pivot::new(vec![Box::new(desktop.provider())], preferences);
    pivot.load_items();
    assert_eq!(pivot.items().len(), 1);

    let mut events = pivot.subscribe();
    pivot.start_monitoring()?;
    assert!(pivot.is_monitoring());

    desktop.write_user("second", ACTION)?;
    let event = timeout(Duration::from_secs(5), events.recv()).await??;
    assert_eq!(event, PivotEvent::ItemsChanged);

    pivot.load_items();
    assert_eq!(pivot.items().len(), 2);

    pivot.shutdown();
    assert!(!pivot.is_monitoring());

    Ok(())
}

#[tokio::test]
async fn registry_changes_are_reported() -> Result<()> {
    let registry = RegistryFixture::new()?;
    let preferences = Preferences::from_layers("burst-delay-ms = 50\n", "")?;
    let mut pivot = Pivot::new(vec![Box::new(registry.provider())], preferences);

    let mut events = pivot.subscribe();
    pivot.start_monitoring()?;

    let dir = registry.path().join("apps");
    fs::create_dir_all(&dir)?;
    fs::write(dir.join("%entries.toml"), "label = \"x\"\n")?;
    let event = timeout(Duration::from_secs(5), events.recv()).await??;
    assert_eq!(event, PivotEvent::ItemsChanged);

    Ok(())
}
