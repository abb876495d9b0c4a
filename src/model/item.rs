// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Items: actions and menus.
//!
//! An __item__ is a storage-backed node of the context-menu configuration.
//! It is either an __action__, which owns an ordered list of profiles, or a
//! __menu__, which groups other items.
//!
//! # Child Ordering
//!
//! Storage backends rarely guarantee a stable enumeration order. Thus, every
//! item keeps an explicit ordered list of child identifiers in its
//! `items-list` attribute. Every accessor that changes the attached children
//! also rewrites that list, so the two never drift apart.

use crate::model::{
    data::{
        Attributes, DataDef, DataValue, ACTION_ITEMS, DESCRIPTION, ENABLED, ICON, LABEL, MENU_ITEMS,
        TARGET_BACKGROUND, TARGET_SELECTION, TARGET_TOOLBAR, TOOLBAR_LABEL, TOOLBAR_SAME_LABEL,
        TOOLTIP, VERSION,
    },
    profile::{next_profile_id, Profile},
    version::{SchemaGeneration, CURRENT_VERSION},
};

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Non-owning handle naming the provider that last loaded or saved an item.
///
/// Only ever used to look a provider up again. Holding one never keeps a
/// provider alive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for ProviderId {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_str())
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Kind specific payload of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    Action(ActionData),
    Menu(MenuData),
}

/// Profiles of an action, in display order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ActionData {
    profiles: Vec<Profile>,
}

impl ActionData {
    pub fn profiles(&self) -> &[Profile] {
        self.profiles.as_slice()
    }
}

/// Children of a menu, in display order.
///
/// Empty until the pivot builds the item hierarchy. Providers only fill the
/// child identifier list.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MenuData {
    children: Vec<Item>,
}

impl MenuData {
    pub fn children(&self) -> &[Item] {
        self.children.as_slice()
    }
}

/// Type discriminator value as stored by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    Action,
    Menu,
}

impl ItemType {
    /// Literal used by the storage discriminator entry.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Action => "Action",
            Self::Menu => "Menu",
        }
    }

    /// Parse storage discriminator.
    ///
    /// An absent discriminator means an action, because data written before
    /// the discriminator existed only knew about actions.
    pub fn from_discriminator(value: Option<&str>) -> Option<Self> {
        match value {
            None => Some(Self::Action),
            Some(value) if value.eq_ignore_ascii_case("action") => Some(Self::Action),
            Some(value) if value.eq_ignore_ascii_case("menu") => Some(Self::Menu),
            Some(_) => None,
        }
    }
}

/// A context-menu item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    id: String,
    attrs: Attributes,
    kind: ItemKind,
    readonly: bool,
    provider: Option<ProviderId>,
}

impl Item {
    /// Construct empty action with given identifier.
    pub fn new_action(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attrs: Attributes::new(),
            kind: ItemKind::Action(ActionData::default()),
            readonly: false,
            provider: None,
        }
    }

    /// Construct empty menu with given identifier.
    pub fn new_menu(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attrs: Attributes::new(),
            kind: ItemKind::Menu(MenuData::default()),
            readonly: false,
            provider: None,
        }
    }

    /// Construct empty item of the given discriminated type.
    pub fn new_of_type(item_type: ItemType, id: impl Into<String>) -> Self {
        match item_type {
            ItemType::Action => Self::new_action(id),
            ItemType::Menu => Self::new_menu(id),
        }
    }

    /// Create brand new action ready to be edited.
    ///
    /// Gets a random UUID identifier, the current schema version, and a single
    /// empty profile.
    pub fn create_action(label: impl Into<String>) -> Self {
        let mut item = Self::new_action(uuid::Uuid::new_v4().to_string());
        item.set_label(label);
        item.set_version(CURRENT_VERSION);
        let profile_id = next_profile_id(item.profiles());
        item.attach_profile(Profile::new(profile_id));
        item
    }

    /// Create brand new empty menu ready to be edited.
    pub fn create_menu(label: impl Into<String>) -> Self {
        let mut item = Self::new_menu(uuid::Uuid::new_v4().to_string());
        item.set_label(label);
        item
    }

    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    pub fn kind(&self) -> &ItemKind {
        &self.kind
    }

    pub fn item_type(&self) -> ItemType {
        match self.kind {
            ItemKind::Action(_) => ItemType::Action,
            ItemKind::Menu(_) => ItemType::Menu,
        }
    }

    pub fn is_action(&self) -> bool {
        matches!(self.kind, ItemKind::Action(_))
    }

    pub fn is_menu(&self) -> bool {
        matches!(self.kind, ItemKind::Menu(_))
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attrs
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attrs
    }

    /// Item cannot be written back to its storage.
    ///
    /// Computed when loaded, never stored.
    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn set_readonly(&mut self, readonly: bool) {
        self.readonly = readonly;
    }

    /// Provider that last loaded or saved this item.
    pub fn provider(&self) -> Option<&ProviderId> {
        self.provider.as_ref()
    }

    pub fn set_provider(&mut self, provider: Option<ProviderId>) {
        self.provider = provider;
    }

    pub fn label(&self) -> String {
        self.attrs.string(&LABEL)
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.attrs.set_string(&LABEL, label);
    }

    pub fn tooltip(&self) -> String {
        self.attrs.string(&TOOLTIP)
    }

    pub fn set_tooltip(&mut self, tooltip: impl Into<String>) {
        self.attrs.set_string(&TOOLTIP, tooltip);
    }

    pub fn icon(&self) -> String {
        self.attrs.string(&ICON)
    }

    pub fn set_icon(&mut self, icon: impl Into<String>) {
        self.attrs.set_string(&ICON, icon);
    }

    pub fn description(&self) -> String {
        self.attrs.string(&DESCRIPTION)
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.attrs.set_string(&DESCRIPTION, description);
    }

    pub fn is_enabled(&self) -> bool {
        self.attrs.boolean(&ENABLED)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.attrs.set_boolean(&ENABLED, enabled);
    }

    /// Definition holding the ordered child identifier list for this kind.
    pub fn items_list_def(&self) -> &'static DataDef {
        match self.kind {
            ItemKind::Action(_) => &ACTION_ITEMS,
            ItemKind::Menu(_) => &MENU_ITEMS,
        }
    }

    /// Ordered child identifiers.
    pub fn items_list(&self) -> Vec<String> {
        self.attrs.list(self.items_list_def())
    }

    /// Overwrite ordered child identifiers without touching attached children.
    ///
    /// Meant for storage readers. Use the child accessors otherwise.
    pub fn set_items_list(&mut self, ids: impl IntoIterator<Item = impl Into<String>>) {
        let def = self.items_list_def();
        self.attrs.set_list(def, ids);
    }

    /// Schema version string of an action.
    pub fn version(&self) -> String {
        self.attrs.string(&VERSION)
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.attrs.set_string(&VERSION, version);
    }

    /// Schema generation the action's data was written under.
    pub fn schema_generation(&self) -> SchemaGeneration {
        SchemaGeneration::from_version(self.attrs.get(&VERSION).and_then(|value| value.as_str()))
    }

    pub fn target_selection(&self) -> bool {
        self.attrs.boolean(&TARGET_SELECTION)
    }

    pub fn set_target_selection(&mut self, target: bool) {
        self.attrs.set_boolean(&TARGET_SELECTION, target);
    }

    pub fn target_background(&self) -> bool {
        self.attrs.boolean(&TARGET_BACKGROUND)
    }

    pub fn set_target_background(&mut self, target: bool) {
        self.attrs.set_boolean(&TARGET_BACKGROUND, target);
    }

    pub fn target_toolbar(&self) -> bool {
        self.attrs.boolean(&TARGET_TOOLBAR)
    }

    pub fn set_target_toolbar(&mut self, target: bool) {
        self.attrs.set_boolean(&TARGET_TOOLBAR, target);
    }

    /// Toolbar reuses the action label.
    pub fn toolbar_same_label(&self) -> bool {
        self.attrs.boolean(&TOOLBAR_SAME_LABEL)
    }

    pub fn set_toolbar_same_label(&mut self, same: bool) {
        self.attrs.set_boolean(&TOOLBAR_SAME_LABEL, same);
    }

    /// Label shown in the toolbar, honoring the same-label flag.
    pub fn toolbar_label(&self) -> String {
        if self.toolbar_same_label() {
            return self.label();
        }

        self.attrs.string(&TOOLBAR_LABEL)
    }

    pub fn set_toolbar_label(&mut self, label: impl Into<String>) {
        self.attrs.set_string(&TOOLBAR_LABEL, label);
    }

    /// Unset an explicit toolbar label hidden by the same-label flag.
    ///
    /// Returns true if a label was dropped.
    pub fn drop_hidden_toolbar_label(&mut self) -> bool {
        let hidden = self.toolbar_same_label()
            && self
                .attrs
                .get(&TOOLBAR_LABEL)
                .and_then(DataValue::as_str)
                .is_some_and(|label| label != self.label());
        if hidden {
            self.attrs.unset(&TOOLBAR_LABEL);
        }

        hidden
    }

    /// Profiles of an action. Always empty for menus.
    pub fn profiles(&self) -> &[Profile] {
        match &self.kind {
            ItemKind::Action(action) => action.profiles(),
            ItemKind::Menu(_) => &[],
        }
    }

    pub fn profile(&self, id: &str) -> Option<&Profile> {
        self.profiles().iter().find(|profile| profile.id() == id)
    }

    pub fn profile_mut(&mut self, id: &str) -> Option<&mut Profile> {
        match &mut self.kind {
            ItemKind::Action(action) => action.profiles.iter_mut().find(|p| p.id() == id),
            ItemKind::Menu(_) => None,
        }
    }

    /// Replace all profiles of an action.
    ///
    /// Ignored for menus.
    pub fn set_profiles(&mut self, profiles: Vec<Profile>) {
        if let ItemKind::Action(action) = &mut self.kind {
            action.profiles = profiles;
            self.sync_items_list();
        }
    }

    /// Append profile to an action.
    ///
    /// A profile whose identifier is already taken is given a fresh one.
    pub fn attach_profile(&mut self, mut profile: Profile) {
        if let ItemKind::Action(action) = &mut self.kind {
            if action.profiles.iter().any(|p| p.id() == profile.id()) {
                profile.set_id(next_profile_id(action.profiles.iter()));
            }
            action.profiles.push(profile);
            self.sync_items_list();
        }
    }

    /// Detach profile from an action.
    pub fn remove_profile(&mut self, id: &str) -> Option<Profile> {
        let removed = match &mut self.kind {
            ItemKind::Action(action) => {
                let index = action.profiles.iter().position(|p| p.id() == id)?;
                Some(action.profiles.remove(index))
            }
            ItemKind::Menu(_) => None,
        };
        self.sync_items_list();
        removed
    }

    /// Children of a menu. Always empty for actions.
    pub fn children(&self) -> &[Item] {
        match &self.kind {
            ItemKind::Menu(menu) => menu.children(),
            ItemKind::Action(_) => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Item>> {
        match &mut self.kind {
            ItemKind::Menu(menu) => Some(&mut menu.children),
            ItemKind::Action(_) => None,
        }
    }

    /// Replace all children of a menu.
    ///
    /// Ignored for actions.
    pub fn set_children(&mut self, children: Vec<Item>) {
        if let ItemKind::Menu(menu) = &mut self.kind {
            menu.children = children;
            self.sync_items_list();
        }
    }

    /// Append child item to a menu.
    pub fn push_child(&mut self, child: Item) {
        if let ItemKind::Menu(menu) = &mut self.kind {
            menu.children.push(child);
            self.sync_items_list();
        }
    }

    /// Detach direct child from a menu.
    pub fn remove_child(&mut self, id: &str) -> Option<Item> {
        let removed = match &mut self.kind {
            ItemKind::Menu(menu) => {
                let index = menu.children.iter().position(|c| c.id() == id)?;
                Some(menu.children.remove(index))
            }
            ItemKind::Action(_) => None,
        };
        self.sync_items_list();
        removed
    }

    /// Take attached children, keeping the identifier list intact.
    pub(crate) fn take_children(&mut self) -> Vec<Item> {
        match &mut self.kind {
            ItemKind::Menu(menu) => std::mem::take(&mut menu.children),
            ItemKind::Action(_) => Vec::new(),
        }
    }

    /// Find item by identifier in this subtree, including self.
    pub fn find(&self, id: &str) -> Option<&Item> {
        if self.id == id {
            return Some(self);
        }

        self.children().iter().find_map(|child| child.find(id))
    }

    /// Find item by identifier in this subtree, including self.
    pub fn find_mut(&mut self, id: &str) -> Option<&mut Item> {
        if self.id == id {
            return Some(self);
        }

        match &mut self.kind {
            ItemKind::Menu(menu) => menu
                .children
                .iter_mut()
                .find_map(|child| child.find_mut(id)),
            ItemKind::Action(_) => None,
        }
    }

    /// All items of this subtree in depth-first order, including self.
    pub fn walk(&self) -> Vec<&Item> {
        let mut items = vec![self];
        for child in self.children() {
            items.extend(child.walk());
        }
        items
    }

    /// Item holds enough data to be displayed and executed.
    ///
    /// A label is always required. Actions also need at least one profile, and
    /// every profile needs a command.
    pub fn is_valid(&self) -> bool {
        if self.label().trim().is_empty() {
            return false;
        }

        match &self.kind {
            ItemKind::Action(action) => {
                !action.profiles.is_empty() && action.profiles.iter().all(Profile::is_valid)
            }
            ItemKind::Menu(_) => true,
        }
    }

    // INVARIANT: Attached children and identifier list stay in sync.
    fn sync_items_list(&mut self) {
        let ids = match &self.kind {
            ItemKind::Action(action) => action
                .profiles
                .iter()
                .map(|p| p.id().to_string())
                .collect::<Vec<_>>(),
            ItemKind::Menu(menu) => menu
                .children
                .iter()
                .map(|c| c.id().to_string())
                .collect::<Vec<_>>(),
        };
        self.set_items_list(ids);
    }
}
