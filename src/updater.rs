// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Write side of the aggregator.
//!
//! The [`Updater`] wraps a [`Pivot`] and decides whether, and through which
//! provider, an item may be written back. Each provider is probed for
//! willingness once, when the updater is constructed.
//!
//! # Writability
//!
//! Checks run from the broadest lock to the narrowest:
//!
//! 1. Configuration locked by an administrator.
//! 2. Item read-only in its storage.
//! 3. Item's provider missing, locked by an administrator, disabled by the
//!    user, or not willing to write.
//! 4. Brand new item without any writable provider to receive it.
//!
//! The first failing check is reported as a [`NotWritable`] reason.

use crate::{
    config::Result as ConfigResult,
    model::{Item, ProviderId},
    pivot::Pivot,
    provider::{Outcome, WriteStatus},
};

use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

/// Reason an item cannot be written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotWritable {
    #[error("configuration is locked by an administrator")]
    ConfigurationLockedByAdmin,

    #[error("item is read-only")]
    ItemReadOnly,

    #[error("provider {0} is not registered")]
    ProviderNotFound(ProviderId),

    #[error("provider {0} is locked by an administrator")]
    ProviderLockedByAdmin(ProviderId),

    #[error("provider {0} is disabled by the user")]
    ProviderDisabledByUser(ProviderId),

    #[error("provider {0} is not willing to write")]
    ProviderNotWilling(ProviderId),

    #[error("no writable provider available")]
    NoWritableProvider,
}

/// Aggregator able to write items back.
#[derive(Debug)]
pub struct Updater {
    pivot: Pivot,
    willing: HashMap<ProviderId, bool>,
}

impl Updater {
    /// Wrap pivot, probing every provider for willingness to write.
    #[instrument(skip(pivot), level = "debug")]
    pub fn new(mut pivot: Pivot) -> Self {
        let ids = pivot
            .providers()
            .iter()
            .map(|provider| provider.id().clone())
            .collect::<Vec<_>>();

        let mut willing = HashMap::new();
        for id in ids {
            let probe = pivot
                .provider_mut(id.as_str())
                .is_some_and(|provider| provider.is_willing_to_write());
            info!("provider {id} willing to write: {probe}");
            willing.insert(id, probe);
        }

        Self { pivot, willing }
    }

    pub fn pivot(&self) -> &Pivot {
        &self.pivot
    }

    pub fn pivot_mut(&mut self) -> &mut Pivot {
        &mut self.pivot
    }

    pub fn into_pivot(self) -> Pivot {
        self.pivot
    }

    /// Cached result of a provider's willingness probe.
    pub fn is_willing(&self, id: &str) -> bool {
        self.willing.get(&ProviderId::new(id)).copied().unwrap_or(false)
    }

    /// Check if item can be written right now.
    ///
    /// # Errors
    ///
    /// - Return [`NotWritable`] naming the first failing check.
    pub fn check_writability(&self, item: &Item) -> Result<(), NotWritable> {
        if self.pivot.preferences().is_readonly() {
            return Err(NotWritable::ConfigurationLockedByAdmin);
        }

        if item.is_readonly() {
            return Err(NotWritable::ItemReadOnly);
        }

        match item.provider() {
            Some(id) => {
                self.check_provider(id)?;
                let writable = self
                    .pivot
                    .provider(id.as_str())
                    .is_some_and(|provider| provider.is_writable(item));
                if !writable {
                    return Err(NotWritable::ItemReadOnly);
                }
                Ok(())
            }
            None => self.default_writer().map(|_| ()),
        }
    }

    /// First provider in priority order able to receive new items.
    ///
    /// # Errors
    ///
    /// - Return [`NotWritable::NoWritableProvider`] if there is none.
    pub fn default_writer(&self) -> Result<ProviderId, NotWritable> {
        self.pivot
            .provider_order()
            .into_iter()
            .map(|index| self.pivot.providers()[index].id())
            .find(|id| self.check_provider(id).is_ok())
            .cloned()
            .ok_or(NotWritable::NoWritableProvider)
    }

    /// Write item through its provider, or the default writer if new.
    ///
    /// On success the written item replaces its previous version in the
    /// tree, or is appended to level zero if it is new. On failure the tree
    /// is left untouched.
    #[instrument(skip(self, item), fields(item = item.id()), level = "debug")]
    pub fn write_item(&mut self, item: &Item) -> Outcome {
        if let Err(reason) = self.check_writability(item) {
            warn!("cannot write {:?}: {reason}", item.id());
            return Outcome::new(WriteStatus::NotWilling, vec![reason.to_string()]);
        }

        let target = match item.provider() {
            Some(id) => id.clone(),
            None => match self.default_writer() {
                Ok(id) => id,
                Err(reason) => {
                    return Outcome::new(WriteStatus::NotWilling, vec![reason.to_string()])
                }
            },
        };

        // INVARIANT: Tree copy matches what a reload would produce.
        let mut written = item.clone();
        if written.drop_hidden_toolbar_label() {
            debug!("drop toolbar label hidden by same-label flag on {:?}", item.id());
        }

        let Some(provider) = self.pivot.provider_mut(target.as_str()) else {
            return Outcome::new(
                WriteStatus::NotWilling,
                vec![NotWritable::ProviderNotFound(target).to_string()],
            );
        };

        let outcome = provider.write_item(&written);
        if !outcome.is_ok() {
            warn!("failed to write {:?} through {target}", item.id());
            return outcome;
        }

        written.set_provider(Some(target));
        written.set_readonly(false);
        match self.pivot.get_item_mut(item.id()) {
            Some(slot) => *slot = written,
            None => self.pivot.items_mut().push(written),
        }

        outcome
    }

    /// Delete item from storage and from the tree.
    ///
    /// Menus delete their descendants first, stopping at the first failure.
    /// Items never written to any provider are only removed from the tree.
    ///
    /// Nothing is deleted unless the item and every descendant pass the
    /// same checks as [`Updater::check_writability`]. Otherwise the first
    /// failing reason is reported with [`WriteStatus::NotWilling`].
    #[instrument(skip(self), level = "debug")]
    pub fn delete_item(&mut self, id: &str) -> Outcome {
        let Some(item) = self.pivot.get_item(id).cloned() else {
            return Outcome::new(
                WriteStatus::ProgramError,
                vec![format!("item {id:?} is not loaded")],
            );
        };

        if self.pivot.preferences().is_readonly() {
            return Outcome::new(
                WriteStatus::NotWilling,
                vec![NotWritable::ConfigurationLockedByAdmin.to_string()],
            );
        }

        let mut doomed = item.walk();
        doomed.reverse();

        let stored = doomed.iter().filter(|victim| victim.provider().is_some());
        for victim in stored {
            if let Err(reason) = self.check_writability(victim) {
                warn!("cannot delete {:?}: {reason}", victim.id());
                return Outcome::new(WriteStatus::NotWilling, vec![reason.to_string()]);
            }
        }

        let mut messages = Vec::new();

        for victim in doomed {
            let Some(provider_id) = victim.provider() else {
                continue;
            };

            let Some(provider) = self.pivot.provider_mut(provider_id.as_str()) else {
                messages.push(NotWritable::ProviderNotFound(provider_id.clone()).to_string());
                return Outcome::new(WriteStatus::NotWilling, messages);
            };

            let outcome = provider.delete_item(victim);
            messages.extend(outcome.messages);
            if outcome.status != WriteStatus::Ok {
                warn!("failed to delete {:?}", victim.id());
                return Outcome::new(outcome.status, messages);
            }
        }

        remove_from_tree(self.pivot.items_mut(), id);
        Outcome::new(WriteStatus::Ok, messages)
    }

    /// Check if level-zero order may be changed.
    pub fn is_level_zero_writable(&self) -> bool {
        let preferences = self.pivot.preferences();
        !preferences.is_readonly() && !preferences.is_level_zero_locked()
    }

    /// Store level-zero order into the user preferences.
    ///
    /// # Errors
    ///
    /// - Return [`crate::config::ConfigError::Locked`] if the order is locked.
    /// - Return [`crate::config::ConfigError`] if preferences cannot be saved.
    pub fn write_level_zero(&mut self, items: &[Item]) -> ConfigResult<()> {
        let ids = items
            .iter()
            .map(|item| item.id().to_string())
            .collect::<Vec<_>>();

        let preferences = self.pivot.preferences_mut();
        preferences.set_level_zero_order(&ids)?;
        preferences.save()
    }

    fn check_provider(&self, id: &ProviderId) -> Result<(), NotWritable> {
        if self.pivot.provider(id.as_str()).is_none() {
            return Err(NotWritable::ProviderNotFound(id.clone()));
        }

        let preferences = self.pivot.preferences();
        let enabled = preferences.settings().is_provider_writable(id.as_str());
        if !enabled && preferences.is_provider_locked(id.as_str()) {
            return Err(NotWritable::ProviderLockedByAdmin(id.clone()));
        }

        if !enabled {
            return Err(NotWritable::ProviderDisabledByUser(id.clone()));
        }

        if !self.is_willing(id.as_str()) {
            return Err(NotWritable::ProviderNotWilling(id.clone()));
        }

        Ok(())
    }
}

fn remove_from_tree(items: &mut Vec<Item>, id: &str) -> bool {
    if let Some(index) = items.iter().position(|item| item.id() == id) {
        items.remove(index);
        return true;
    }

    for item in items.iter_mut() {
        if item.find(id).is_none() {
            continue;
        }

        if item.remove_child(id).is_some() {
            return true;
        }

        if let Some(children) = item.children_mut() {
            return remove_from_tree(children, id);
        }
    }

    false
}
