// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Item aggregator.
//!
//! The __pivot__ owns every registered I/O provider and the item tree built
//! from all of them. Loading reads each readable provider in the configured
//! priority order, resolves duplicate identifiers in favour of the provider
//! read first, rebuilds the menu hierarchy from the child identifier lists,
//! and orders the result following the user preferences.
//!
//! # Change Notification
//!
//! Once monitoring is started, providers forward their own debounced change
//! notices to the pivot. The pivot debounces them once more and publishes a
//! single [`PivotEvent::ItemsChanged`] to every subscriber. Reloading is left
//! to the subscriber.
//!
//! # See Also
//!
//! 1. [`crate::updater`] for writing items back.

use crate::{
    config::{OrderMode, Preferences},
    model::Item,
    monitor::{MonitorHandle, Result as MonitorResult},
    provider::{IoProvider, ProviderNotice},
    timer::Debouncer,
};

use std::collections::{HashMap, HashSet};
use tokio::{
    sync::{broadcast, mpsc},
    task::AbortHandle,
};
use tracing::{debug, info, instrument, warn};

const EVENT_CAPACITY: usize = 16;

/// Event published to subscribers of a [`Pivot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotEvent {
    /// Stored items changed. The tree should be reloaded.
    ItemsChanged,
}

/// Aggregator of every provider's items.
pub struct Pivot {
    providers: Vec<Box<dyn IoProvider>>,
    preferences: Preferences,
    tree: Vec<Item>,
    events: broadcast::Sender<PivotEvent>,
    monitors: Vec<MonitorHandle>,
    relay: Option<AbortHandle>,
}

impl Pivot {
    pub fn new(providers: Vec<Box<dyn IoProvider>>, preferences: Preferences) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            providers,
            preferences,
            tree: Vec::new(),
            events,
            monitors: Vec::new(),
            relay: None,
        }
    }

    /// Register another provider, lowest priority unless preferences say
    /// otherwise.
    pub fn add_provider(&mut self, provider: Box<dyn IoProvider>) {
        self.providers.push(provider);
    }

    pub fn providers(&self) -> &[Box<dyn IoProvider>] {
        self.providers.as_slice()
    }

    pub fn provider(&self, id: &str) -> Option<&dyn IoProvider> {
        self.providers
            .iter()
            .find(|provider| provider.id().as_str() == id)
            .map(|provider| provider.as_ref())
    }

    pub fn provider_mut(&mut self, id: &str) -> Option<&mut (dyn IoProvider + 'static)> {
        self.providers
            .iter_mut()
            .find(|provider| provider.id().as_str() == id)
            .map(|provider| provider.as_mut())
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn preferences_mut(&mut self) -> &mut Preferences {
        &mut self.preferences
    }

    /// Provider indices in priority order.
    ///
    /// Providers named by the preferences come first, in that order. The
    /// rest follow in registration order.
    pub fn provider_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.providers.len());
        for id in &self.preferences.settings().io_providers_order {
            let index = self
                .providers
                .iter()
                .position(|provider| provider.id().as_str() == id);
            if let Some(index) = index.filter(|index| !order.contains(index)) {
                order.push(index);
            }
        }

        for index in 0..self.providers.len() {
            if !order.contains(&index) {
                order.push(index);
            }
        }

        order
    }

    /// Read every readable provider and rebuild the item tree.
    ///
    /// Returns the messages providers reported while reading.
    #[instrument(skip(self), level = "debug")]
    pub fn load_items(&mut self) -> Vec<String> {
        let mut messages = Vec::new();
        let mut seen = HashSet::new();
        let mut flat = Vec::new();

        for index in self.provider_order() {
            let settings = self.preferences.settings();
            let provider = &mut self.providers[index];
            if !settings.is_provider_readable(provider.id().as_str()) {
                debug!("provider {} disabled for reading", provider.id());
                continue;
            }

            for item in provider.read_items(&mut messages) {
                if !seen.insert(item.id().to_string()) {
                    warn!(
                        "item {:?} from {} shadowed by an earlier provider",
                        item.id(),
                        provider.id()
                    );
                    continue;
                }
                flat.push(item);
            }
        }

        let mut tree = build_hierarchy(flat);
        let settings = self.preferences.settings();
        order_tree(&mut tree, settings.order_mode, &settings.level_zero_order);

        info!("loaded {} items", seen.len());
        self.tree = tree;
        messages
    }

    /// Top-level items.
    pub fn items(&self) -> &[Item] {
        self.tree.as_slice()
    }

    pub fn items_mut(&mut self) -> &mut Vec<Item> {
        &mut self.tree
    }

    /// Find item anywhere in the tree.
    pub fn get_item(&self, id: &str) -> Option<&Item> {
        self.tree.iter().find_map(|item| item.find(id))
    }

    pub fn get_item_mut(&mut self, id: &str) -> Option<&mut Item> {
        self.tree.iter_mut().find_map(|item| item.find_mut(id))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PivotEvent> {
        self.events.subscribe()
    }

    /// Install change monitors on every readable provider.
    ///
    /// Any monitors already running are replaced.
    ///
    /// # Errors
    ///
    /// - Return [`crate::monitor::MonitorError`] if a provider fails to
    ///   install its monitor.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    #[instrument(skip(self), level = "debug")]
    pub fn start_monitoring(&mut self) -> MonitorResult<()> {
        self.shutdown();

        let settings = self.preferences.settings();
        let delay = settings.burst_delay();
        let (sink, mut notices) = mpsc::unbounded_channel::<ProviderNotice>();

        let mut monitors = Vec::new();
        for provider in &self.providers {
            if !settings.is_provider_readable(provider.id().as_str()) {
                continue;
            }

            if let Some(handle) = provider.watch(sink.clone(), delay)? {
                monitors.push(handle);
            }
        }
        drop(sink);

        let events = self.events.clone();
        let mut debouncer = Debouncer::new(delay, move || {
            debug!("publish items changed");
            let _ = events.send(PivotEvent::ItemsChanged);
        });
        let relay = tokio::spawn(async move {
            while let Some(ProviderNotice::ItemsChanged(provider)) = notices.recv().await {
                debug!("items changed in {provider}");
                debouncer.touch();
            }
        });

        info!("monitoring {} providers", monitors.len());
        self.monitors = monitors;
        self.relay = Some(relay.abort_handle());

        Ok(())
    }

    /// Stop every monitor and pending notification.
    pub fn shutdown(&mut self) {
        for monitor in self.monitors.drain(..) {
            monitor.stop();
        }

        if let Some(relay) = self.relay.take() {
            relay.abort();
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.relay.as_ref().is_some_and(|relay| !relay.is_finished())
    }
}

impl Drop for Pivot {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Pivot {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let providers = self
            .providers
            .iter()
            .map(|provider| provider.id().as_str())
            .collect::<Vec<_>>();
        fmt.debug_struct("Pivot")
            .field("providers", &providers)
            .field("items", &self.tree.len())
            .field("monitoring", &self.is_monitoring())
            .finish_non_exhaustive()
    }
}

/// Attach items to the menus listing them.
///
/// An item is attached to the first menu in read order that lists it. Items
/// nobody lists form level zero, in read order. Items only reachable through
/// a cycle fall back to level zero as well.
fn build_hierarchy(flat: Vec<Item>) -> Vec<Item> {
    let order = flat.iter().map(|item| item.id().to_string()).collect::<Vec<_>>();

    let mut parents: HashMap<String, String> = HashMap::new();
    for menu in flat.iter().filter(|item| item.is_menu()) {
        for child in menu.items_list() {
            if child == menu.id() || parents.contains_key(&child) {
                continue;
            }

            if order.contains(&child) {
                parents.insert(child, menu.id().to_string());
            }
        }
    }

    let mut pool = flat
        .into_iter()
        .map(|item| (item.id().to_string(), item))
        .collect::<HashMap<_, _>>();

    let mut tree = Vec::new();
    for id in order.iter().filter(|id| !parents.contains_key(*id)) {
        if let Some(item) = attach(id, &mut pool, &parents) {
            tree.push(item);
        }
    }

    // INVARIANT: Items caught in a cycle are never lost.
    for id in &order {
        if pool.contains_key(id) {
            warn!("item {id:?} is part of a menu cycle, moved to level zero");
            if let Some(item) = attach(id, &mut pool, &parents) {
                tree.push(item);
            }
        }
    }

    tree
}

fn attach(id: &str, pool: &mut HashMap<String, Item>, parents: &HashMap<String, String>) -> Option<Item> {
    let mut item = pool.remove(id)?;

    if item.is_menu() {
        let mut children = Vec::new();
        for child in item.items_list() {
            if parents.get(&child).map(String::as_str) != Some(id) {
                continue;
            }

            if let Some(child) = attach(&child, pool, parents) {
                children.push(child);
            }
        }

        // INVARIANT: Identifier list is kept as stored, dangling ids included.
        if let Some(slot) = item.children_mut() {
            *slot = children;
        }
    }

    Some(item)
}

/// Order items following the preferences.
fn order_tree(tree: &mut [Item], mode: OrderMode, level_zero: &[String]) {
    match mode {
        OrderMode::Manual => {
            let rank = |item: &Item| {
                level_zero
                    .iter()
                    .position(|id| id == item.id())
                    .unwrap_or(level_zero.len())
            };
            tree.sort_by_key(rank);
        }
        OrderMode::Ascending | OrderMode::Descending => sort_by_label(tree, mode),
    }
}

fn sort_by_label(items: &mut [Item], mode: OrderMode) {
    items.sort_by_cached_key(|item| item.label().to_lowercase());
    if mode == OrderMode::Descending {
        items.reverse();
    }

    for item in items.iter_mut() {
        if let Some(children) = item.children_mut() {
            sort_by_label(children, mode);
        }
    }
}
