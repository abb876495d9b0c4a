// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Versioned object model.
//!
//! In-memory representation of context-menu configuration, independent of
//! any storage backend. Storage readers populate these objects attribute by
//! attribute, and the pivot assembles them into a tree.
//!
//! # Object Graph
//!
//! - An [`Item`] is either an action or a menu.
//! - An action owns an ordered list of [`Profile`]s.
//! - A menu owns an ordered list of child items once the pivot has built the
//!   hierarchy.
//!
//! # See Also
//!
//! 1. [`data`] for attribute definitions.
//! 2. [`version`] for schema generation handling.

pub mod data;
pub mod item;
pub mod profile;
pub mod version;

pub use data::{Attributes, DataDef, DataType, DataValue, EntryDialect};
pub use item::{ActionData, Item, ItemKind, ItemType, MenuData, ProviderId};
pub use profile::{Profile, LEGACY_PROFILE_ID};
pub use version::{SchemaGeneration, CURRENT_VERSION};
