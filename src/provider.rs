// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! I/O providers.
//!
//! An __I/O provider__ is a storage backend able to enumerate stored items,
//! and optionally to write, delete, and monitor them. The aggregator only
//! ever talks to backends through the [`IoProvider`] trait.
//!
//! # Capabilities
//!
//! Every capability beyond reading has a conservative default. A provider
//! that does not override [`IoProvider::write_item`] is never willing to
//! write, and calling [`IoProvider::delete_item`] on it is a caller bug
//! reported as [`WriteStatus::ProgramError`].
//!
//! # Errors
//!
//! Providers never fail loudly. Reading logs problems, substitutes defaults,
//! and keeps going. Writing and deleting report an [`Outcome`] carrying a
//! status and every human-readable message collected along the way.
//!
//! # See Also
//!
//! 1. [`desktop`] for the desktop-entry backend.
//! 2. [`registry`] for the legacy registry backend.

pub mod desktop;
pub mod registry;

use crate::{
    model::{Item, ProviderId},
    monitor::{MonitorHandle, Result as MonitorResult},
};

use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Status of a write or delete operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteStatus {
    /// Operation succeeded.
    Ok,

    /// Storage refused part of the operation.
    WriteError,

    /// Provider does not accept writes.
    NotWilling,

    /// Caller handed over data it should never have.
    ProgramError,
}

/// Result of a write or delete operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: WriteStatus,
    pub messages: Vec<String>,
}

impl Outcome {
    pub fn new(status: WriteStatus, messages: Vec<String>) -> Self {
        Self { status, messages }
    }

    /// Successful outcome without messages.
    pub fn ok() -> Self {
        Self::new(WriteStatus::Ok, Vec::new())
    }

    pub fn with_status(status: WriteStatus) -> Self {
        Self::new(status, Vec::new())
    }

    /// Outcome of a best-effort operation: `Ok` if everything succeeded,
    /// `WriteError` otherwise.
    pub fn from_success(success: bool, messages: Vec<String>) -> Self {
        let status = if success {
            WriteStatus::Ok
        } else {
            WriteStatus::WriteError
        };
        Self::new(status, messages)
    }

    pub fn is_ok(&self) -> bool {
        self.status == WriteStatus::Ok
    }
}

/// Notice a provider sends to the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderNotice {
    /// Stored items changed outside of this process.
    ItemsChanged(ProviderId),
}

/// Storage backend.
pub trait IoProvider: Send {
    /// Stable identifier of this provider.
    fn id(&self) -> &ProviderId;

    /// Enumerate and fully materialize every stored item.
    ///
    /// Menus only carry their child identifier list. Problems are logged and
    /// may append messages, but never abort the whole read. Sibling order is
    /// unspecified.
    fn read_items(&mut self, messages: &mut Vec<String>) -> Vec<Item>;

    /// Cheap probe telling whether the backend accepts writes at all.
    fn is_willing_to_write(&mut self) -> bool {
        false
    }

    /// Check if an item can be written back right now.
    fn is_writable(&self, _item: &Item) -> bool {
        false
    }

    /// Write an item, creating or replacing its stored form.
    fn write_item(&mut self, _item: &Item) -> Outcome {
        Outcome::with_status(WriteStatus::NotWilling)
    }

    /// Remove every stored trace of an item.
    fn delete_item(&mut self, item: &Item) -> Outcome {
        Outcome::new(
            WriteStatus::ProgramError,
            vec![format!(
                "provider {} cannot delete {:?}",
                self.id(),
                item.id()
            )],
        )
    }

    /// Install a change monitor.
    ///
    /// The monitor sends [`ProviderNotice::ItemsChanged`] to `sink` once per
    /// burst of external changes, `delay` after the last one. Returns `None`
    /// if the backend has nothing to monitor.
    ///
    /// # Errors
    ///
    /// - Return [`crate::monitor::MonitorError`] if watches cannot be
    ///   installed.
    fn watch(
        &self,
        _sink: UnboundedSender<ProviderNotice>,
        _delay: Duration,
    ) -> MonitorResult<Option<MonitorHandle>> {
        Ok(None)
    }
}

/// Check item for data no provider should ever be asked to write.
///
/// Returns the failing outcome, if any.
pub fn program_error(item: &Item) -> Option<Outcome> {
    if item.id().trim().is_empty() {
        return Some(Outcome::new(
            WriteStatus::ProgramError,
            vec!["item has an empty identifier".into()],
        ));
    }

    if item.is_action() && item.profiles().is_empty() {
        return Some(Outcome::new(
            WriteStatus::ProgramError,
            vec![format!("action {:?} has no profile", item.id())],
        ));
    }

    None
}
