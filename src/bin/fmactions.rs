// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use fmactions::{
    config::Preferences,
    model::Item,
    path::{
        default_registry_root, default_settings_path, desktop_search_dirs,
        mandatory_settings_path,
    },
    pivot::{Pivot, PivotEvent},
    provider::{desktop::DesktopProvider, registry::RegistryProvider, IoProvider},
    registry::FsRegistry,
    updater::Updater,
};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::{path::PathBuf, process::exit};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "fmactions [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to user preference file.
    #[arg(short, long, value_name = "path", global = true)]
    pub settings: Option<PathBuf>,

    /// Path to mandatory preference file.
    #[arg(short, long, value_name = "path", global = true)]
    pub mandatory: Option<PathBuf>,

    /// Root directory of the legacy registry.
    #[arg(short, long, value_name = "path", global = true)]
    pub registry_root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    async fn run(self) -> Result<()> {
        let updater = self.updater()?;
        match self.command {
            Command::List => run_list(&updater),
            Command::Show(opts) => run_show(&updater, opts),
            Command::Enable(opts) => run_toggle(updater, opts, true),
            Command::Disable(opts) => run_toggle(updater, opts, false),
            Command::Delete(opts) => run_delete(updater, opts),
            Command::Check(opts) => run_check(&updater, opts),
            Command::Watch => run_watch(updater.into_pivot()).await,
        }
    }

    fn updater(&self) -> Result<Updater> {
        let user = match &self.settings {
            Some(path) => path.clone(),
            None => default_settings_path()?,
        };
        let mandatory = match &self.mandatory {
            Some(path) => path.clone(),
            None => mandatory_settings_path(),
        };
        let preferences = Preferences::load(Some(&user), Some(&mandatory))?;

        let dirs = desktop_search_dirs(&preferences.settings().desktop.extra_dirs)?;
        let registry_root = match &self.registry_root {
            Some(path) => path.clone(),
            None => default_registry_root()?,
        };

        let providers: Vec<Box<dyn IoProvider>> = vec![
            Box::new(DesktopProvider::new(dirs)),
            Box::new(RegistryProvider::new(FsRegistry::new(registry_root))),
        ];
        let mut pivot = Pivot::new(providers, preferences);
        for message in pivot.load_items() {
            warn!("{message}");
        }

        Ok(Updater::new(pivot))
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// List loaded items as a tree.
    #[command(override_usage = "fmactions list [options]")]
    List,

    /// Show every attribute of an item.
    #[command(override_usage = "fmactions show [options] <id>")]
    Show(ItemOptions),

    /// Enable an item.
    #[command(override_usage = "fmactions enable [options] <id>")]
    Enable(ItemOptions),

    /// Disable an item.
    #[command(override_usage = "fmactions disable [options] <id>")]
    Disable(ItemOptions),

    /// Delete an item, and every item below it for menus.
    #[command(override_usage = "fmactions delete [options] <id>")]
    Delete(ItemOptions),

    /// Explain whether an item can be written back.
    #[command(override_usage = "fmactions check [options] <id>")]
    Check(ItemOptions),

    /// Report changes to stored items until interrupted.
    #[command(override_usage = "fmactions watch [options]")]
    Watch,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ItemOptions {
    /// Identifier of target item.
    #[arg(required = true, value_name = "id")]
    pub id: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run().await {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

async fn run() -> Result<()> {
    Cli::parse().run().await
}

fn find(updater: &Updater, id: &str) -> Result<Item> {
    updater
        .pivot()
        .get_item(id)
        .cloned()
        .ok_or_else(|| anyhow!("no item named {id:?}"))
}

fn run_list(updater: &Updater) -> Result<()> {
    fn print(item: &Item, depth: usize) {
        let provider = item.provider().map(|id| id.as_str()).unwrap_or("-");
        let flags = match (item.is_enabled(), item.is_readonly()) {
            (true, false) => "",
            (false, false) => " (disabled)",
            (true, true) => " (read-only)",
            (false, true) => " (disabled, read-only)",
        };
        println!(
            "{:indent$}{} {:?} [{provider}]{flags}",
            "",
            item.id(),
            item.label(),
            indent = depth * 2
        );

        for child in item.children() {
            print(child, depth + 1);
        }
    }

    for item in updater.pivot().items() {
        print(item, 0);
    }

    Ok(())
}

fn run_show(updater: &Updater, opts: ItemOptions) -> Result<()> {
    let item = find(updater, &opts.id)?;
    println!("id: {}", item.id());
    println!("type: {}", item.item_type().as_str());
    println!("label: {}", item.label());
    println!("tooltip: {}", item.tooltip());
    println!("icon: {}", item.icon());
    println!("enabled: {}", item.is_enabled());
    println!("read-only: {}", item.is_readonly());
    println!("items: {}", item.items_list().join(", "));

    for profile in item.profiles() {
        println!("profile {}:", profile.id());
        println!("  label: {}", profile.label());
        println!("  command: {} {}", profile.path(), profile.parameters());
        println!("  basenames: {}", profile.basenames().join(", "));
        println!("  mimetypes: {}", profile.mimetypes().join(", "));
        println!("  schemes: {}", profile.schemes().join(", "));
    }

    Ok(())
}

fn run_toggle(mut updater: Updater, opts: ItemOptions, enabled: bool) -> Result<()> {
    let mut item = find(&updater, &opts.id)?;
    item.set_enabled(enabled);

    let outcome = updater.write_item(&item);
    for message in &outcome.messages {
        warn!("{message}");
    }

    if !outcome.is_ok() {
        return Err(anyhow!("failed to write {:?}: {:?}", opts.id, outcome.status));
    }

    info!("{} {:?}", if enabled { "enabled" } else { "disabled" }, opts.id);
    Ok(())
}

fn run_delete(mut updater: Updater, opts: ItemOptions) -> Result<()> {
    let outcome = updater.delete_item(&opts.id);
    for message in &outcome.messages {
        warn!("{message}");
    }

    if !outcome.is_ok() {
        return Err(anyhow!("failed to delete {:?}: {:?}", opts.id, outcome.status));
    }

    info!("deleted {:?}", opts.id);
    Ok(())
}

fn run_check(updater: &Updater, opts: ItemOptions) -> Result<()> {
    let item = find(updater, &opts.id)?;
    match updater.check_writability(&item) {
        Ok(()) => println!("{}: writable", item.id()),
        Err(reason) => println!("{}: not writable: {reason}", item.id()),
    }

    Ok(())
}

async fn run_watch(mut pivot: Pivot) -> Result<()> {
    let mut events = pivot.subscribe();
    pivot.start_monitoring()?;
    info!("watching {} items, press Ctrl-C to stop", pivot.items().len());

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(PivotEvent::ItemsChanged) | Err(RecvError::Lagged(_)) => {
                    for message in pivot.load_items() {
                        warn!("{message}");
                    }
                    info!("items changed, {} top-level items loaded", pivot.items().len());
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    pivot.shutdown();
    Ok(())
}
