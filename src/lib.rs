// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Storage core for file-manager context-menu actions.
//!
//! Items, i.e., actions and the menus grouping them, are read from and
//! written to pluggable I/O providers. Two providers ship with the crate: a
//! desktop-entry backend and a legacy key registry backend. The [`pivot`]
//! aggregates every provider into one item tree, and the [`updater`] writes
//! items back through the provider owning them.
//!
//! # See Also
//!
//! 1. [`model`] for the object model.
//! 2. [`provider`] for the provider contract.
//! 3. [`codec`] for the mapping between attributes and stored entries.

pub mod codec;
pub mod config;
pub mod model;
pub mod monitor;
pub mod path;
pub mod pivot;
pub mod provider;
pub mod registry;
pub mod timer;
pub mod updater;
