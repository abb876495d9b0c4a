// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Action profiles.
//!
//! A __profile__ is one concrete way to invoke an action: a command, its
//! parameter template, and the conditions a selection must meet for the
//! command to be offered.

use crate::model::data::{
    Attributes, DataDef, DataValue, BASENAMES, FOLDERS, IS_DIR, IS_FILE, MATCHCASE, MIMETYPES,
    MULTIPLE, PARAMETERS, PATH, PROFILE_LABEL, SCHEMES, WORKING_DIR,
};

/// Identifier given to the profile synthesized from pre-2.0 actions.
pub const LEGACY_PROFILE_ID: &str = "profile-zero";

/// One invocation variant of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    id: String,
    attrs: Attributes,
}

impl Profile {
    /// Construct empty profile.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attrs: Attributes::new(),
        }
    }

    /// Construct profile with pre-populated attributes.
    pub fn with_attributes(id: impl Into<String>, attrs: Attributes) -> Self {
        Self {
            id: id.into(),
            attrs,
        }
    }

    /// Identifier, unique within the parent action.
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    pub(crate) fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attrs
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attrs
    }

    pub fn label(&self) -> String {
        self.attrs.string(&PROFILE_LABEL)
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.attrs.set_string(&PROFILE_LABEL, label);
    }

    /// Path to the command to execute.
    pub fn path(&self) -> String {
        self.attrs.string(&PATH)
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.attrs.set_string(&PATH, path);
    }

    /// Parameter template handed to the command, e.g., `%f`.
    pub fn parameters(&self) -> String {
        self.attrs.string(&PARAMETERS)
    }

    pub fn set_parameters(&mut self, parameters: impl Into<String>) {
        self.attrs.set_string(&PARAMETERS, parameters);
    }

    pub fn working_dir(&self) -> String {
        self.attrs.string(&WORKING_DIR)
    }

    pub fn set_working_dir(&mut self, dir: impl Into<String>) {
        self.attrs.set_string(&WORKING_DIR, dir);
    }

    pub fn basenames(&self) -> Vec<String> {
        self.attrs.list(&BASENAMES)
    }

    pub fn set_basenames(&mut self, basenames: impl IntoIterator<Item = impl Into<String>>) {
        self.attrs.set_list(&BASENAMES, basenames);
    }

    /// Basename patterns are matched case sensitively.
    pub fn matchcase(&self) -> bool {
        self.attrs.boolean(&MATCHCASE)
    }

    pub fn set_matchcase(&mut self, matchcase: bool) {
        self.attrs.set_boolean(&MATCHCASE, matchcase);
    }

    pub fn mimetypes(&self) -> Vec<String> {
        self.attrs.list(&MIMETYPES)
    }

    pub fn set_mimetypes(&mut self, mimetypes: impl IntoIterator<Item = impl Into<String>>) {
        self.attrs.set_list(&MIMETYPES, mimetypes);
    }

    pub fn schemes(&self) -> Vec<String> {
        self.attrs.list(&SCHEMES)
    }

    pub fn set_schemes(&mut self, schemes: impl IntoIterator<Item = impl Into<String>>) {
        self.attrs.set_list(&SCHEMES, schemes);
    }

    pub fn folders(&self) -> Vec<String> {
        self.attrs.list(&FOLDERS)
    }

    pub fn set_folders(&mut self, folders: impl IntoIterator<Item = impl Into<String>>) {
        self.attrs.set_list(&FOLDERS, folders);
    }

    pub fn is_file(&self) -> bool {
        self.attrs.boolean(&IS_FILE)
    }

    pub fn set_is_file(&mut self, is_file: bool) {
        self.attrs.set_boolean(&IS_FILE, is_file);
    }

    pub fn is_dir(&self) -> bool {
        self.attrs.boolean(&IS_DIR)
    }

    pub fn set_is_dir(&mut self, is_dir: bool) {
        self.attrs.set_boolean(&IS_DIR, is_dir);
    }

    /// Profile accepts a selection of more than one element.
    pub fn accepts_multiple(&self) -> bool {
        self.attrs.boolean(&MULTIPLE)
    }

    pub fn set_accepts_multiple(&mut self, multiple: bool) {
        self.attrs.set_boolean(&MULTIPLE, multiple);
    }

    /// Profile can be executed.
    pub fn is_valid(&self) -> bool {
        !self.path().trim().is_empty()
    }

    /// Fill an unset attribute with a value, leaving explicit values alone.
    pub(crate) fn default_unset(&mut self, def: &DataDef, value: DataValue) {
        if !self.attrs.is_set(def) {
            self.attrs.set(def, value);
        }
    }
}

/// Allocate next free profile identifier.
///
/// Identifiers take the form `profile-<n>` with the smallest `n` not used by
/// any existing profile.
pub fn next_profile_id<'a>(existing: impl IntoIterator<Item = &'a Profile>) -> String {
    let used = existing
        .into_iter()
        .map(Profile::id)
        .collect::<std::collections::HashSet<_>>();

    (1..)
        .map(|n| format!("profile-{n}"))
        .find(|id| !used.contains(id.as_str()))
        .unwrap_or_else(|| LEGACY_PROFILE_ID.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn profile_accessors_default_when_unset() {
        let profile = Profile::new("p");

        assert_eq!(profile.path(), "");
        assert_eq!(profile.schemes(), vec!["file".to_string()]);
        assert_eq!(profile.folders(), vec!["/".to_string()]);
        assert!(profile.is_file());
        assert!(!profile.is_dir());
        assert!(!profile.accepts_multiple());
        assert!(!profile.is_valid());
    }

    #[test]
    fn next_profile_id_fills_gaps() {
        let profiles = [
            Profile::new("profile-1"),
            Profile::new("profile-3"),
            Profile::new(LEGACY_PROFILE_ID),
        ];

        assert_eq!(next_profile_id(&profiles), "profile-2");
        assert_eq!(next_profile_id(Vec::<Profile>::new().iter()), "profile-1");
    }
}
