// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Attribute definitions and typed values.
//!
//! Every attribute an item, action, menu, or profile can carry is described
//! once by a [`DataDef`]. A definition knows the attribute's type, its
//! default, and the native entry name each storage backend uses for it. The
//! codec walks these tables instead of hard-coding per-backend field lists.
//!
//! # Entry Dialects
//!
//! The registry backend and the desktop-entry backend name the same attribute
//! differently, e.g., `label` versus `Name`. Some attributes exist in only one
//! of the two formats. A definition without an entry name for a dialect is
//! simply skipped by that backend.

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result as FmtResult},
};

/// Type of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Plain string.
    String,

    /// Localizable string.
    LocaleString,

    /// Boolean flag.
    Boolean,

    /// Ordered list of strings.
    StringList,

    /// Unsigned integer.
    UInt,
}

impl DataType {
    /// Default value for this type when a definition does not specify one.
    pub fn default_value(self) -> DataValue {
        match self {
            Self::String => DataValue::Str(String::new()),
            Self::LocaleString => DataValue::LocaleStr(String::new()),
            Self::Boolean => DataValue::Bool(false),
            Self::StringList => DataValue::StrList(Vec::new()),
            Self::UInt => DataValue::UInt(0),
        }
    }
}

impl Display for DataType {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Self::String => "string",
            Self::LocaleString => "locale string",
            Self::Boolean => "boolean",
            Self::StringList => "string list",
            Self::UInt => "unsigned integer",
        };
        fmt.write_str(name)
    }
}

/// Typed attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataValue {
    Str(String),
    LocaleStr(String),
    Bool(bool),
    StrList(Vec<String>),
    UInt(u32),
}

impl DataValue {
    /// Type of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Str(_) => DataType::String,
            Self::LocaleStr(_) => DataType::LocaleString,
            Self::Bool(_) => DataType::Boolean,
            Self::StrList(_) => DataType::StringList,
            Self::UInt(_) => DataType::UInt,
        }
    }

    /// Borrow string content of plain or locale strings.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) | Self::LocaleStr(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::StrList(value) => Some(value.as_slice()),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u32> {
        match self {
            Self::UInt(value) => Some(*value),
            _ => None,
        }
    }

    /// Coerce value into target type when the two are compatible.
    ///
    /// Plain and locale strings are interchangeable, because the registry
    /// backend has no notion of localization.
    pub fn coerce(self, data_type: DataType) -> Option<Self> {
        match (self, data_type) {
            (Self::Str(value) | Self::LocaleStr(value), DataType::String) => Some(Self::Str(value)),
            (Self::Str(value) | Self::LocaleStr(value), DataType::LocaleString) => {
                Some(Self::LocaleStr(value))
            }
            (value, data_type) if value.data_type() == data_type => Some(value),
            _ => None,
        }
    }

    /// Parse textual representation of a value of the given type.
    ///
    /// Lists are `;` separated with empty trailing elements dropped. Used for
    /// definition defaults, not for any storage format.
    pub fn parse(data_type: DataType, text: &str) -> Option<Self> {
        match data_type {
            DataType::String => Some(Self::Str(text.to_string())),
            DataType::LocaleString => Some(Self::LocaleStr(text.to_string())),
            DataType::Boolean => match text {
                "true" => Some(Self::Bool(true)),
                "false" => Some(Self::Bool(false)),
                _ => None,
            },
            DataType::StringList => Some(Self::StrList(
                text.split(';')
                    .filter(|elem| !elem.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
            DataType::UInt => text.parse().ok().map(Self::UInt),
        }
    }
}

impl Display for DataValue {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Str(value) | Self::LocaleStr(value) => fmt.write_str(value),
            Self::Bool(value) => write!(fmt, "{value}"),
            Self::StrList(value) => write!(fmt, "[{}]", value.join(", ")),
            Self::UInt(value) => write!(fmt, "{value}"),
        }
    }
}

/// Storage dialect used to look up native entry names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryDialect {
    Registry,
    Desktop,
}

/// Definition of one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataDef {
    /// Backend-neutral attribute name.
    pub name: &'static str,

    /// Type of the attribute.
    pub data_type: DataType,

    /// Textual default, parsed with [`DataValue::parse`].
    pub default: &'static str,

    /// Write the value even when it equals the default.
    pub write_if_default: bool,

    /// Warn when absent from storage.
    pub mandatory: bool,

    /// Entry name in the registry backend.
    pub registry_entry: Option<&'static str>,

    /// Entry name in the desktop-entry backend.
    pub desktop_entry: Option<&'static str>,
}

impl DataDef {
    /// Parsed default value.
    ///
    /// Falls back to the type default when the textual default does not
    /// parse.
    pub fn default_value(&self) -> DataValue {
        DataValue::parse(self.data_type, self.default)
            .unwrap_or_else(|| self.data_type.default_value())
    }

    /// Native entry name for storage dialect.
    pub fn entry(&self, dialect: EntryDialect) -> Option<&'static str> {
        match dialect {
            EntryDialect::Registry => self.registry_entry,
            EntryDialect::Desktop => self.desktop_entry,
        }
    }

    /// Check if value equals this definition's default.
    pub fn is_default(&self, value: &DataValue) -> bool {
        *value == self.default_value()
    }
}

const fn def(
    name: &'static str,
    data_type: DataType,
    default: &'static str,
    registry_entry: Option<&'static str>,
    desktop_entry: Option<&'static str>,
) -> DataDef {
    DataDef {
        name,
        data_type,
        default,
        write_if_default: false,
        mandatory: false,
        registry_entry,
        desktop_entry,
    }
}

pub static LABEL: DataDef = DataDef {
    mandatory: true,
    write_if_default: true,
    ..def("label", DataType::LocaleString, "", Some("label"), Some("Name"))
};
pub static TOOLTIP: DataDef = def(
    "tooltip",
    DataType::LocaleString,
    "",
    Some("tooltip"),
    Some("Tooltip"),
);
pub static ICON: DataDef = def("icon", DataType::LocaleString, "", Some("icon"), Some("Icon"));
pub static DESCRIPTION: DataDef = def(
    "description",
    DataType::LocaleString,
    "",
    None,
    Some("Description"),
);
pub static ENABLED: DataDef = DataDef {
    write_if_default: true,
    ..def("enabled", DataType::Boolean, "true", Some("enabled"), Some("Enabled"))
};

pub static ACTION_ITEMS: DataDef = DataDef {
    write_if_default: true,
    ..def(
        "items-list",
        DataType::StringList,
        "",
        Some("items-list"),
        Some("Profiles"),
    )
};
pub static VERSION: DataDef = def("version", DataType::String, "", Some("version"), None);
pub static TARGET_SELECTION: DataDef = def(
    "target-selection",
    DataType::Boolean,
    "true",
    Some("target-selection"),
    Some("TargetContext"),
);
pub static TARGET_BACKGROUND: DataDef = def(
    "target-background",
    DataType::Boolean,
    "false",
    Some("target-background"),
    Some("TargetLocation"),
);
pub static TARGET_TOOLBAR: DataDef = def(
    "target-toolbar",
    DataType::Boolean,
    "false",
    Some("target-toolbar"),
    Some("TargetToolbar"),
);
pub static TOOLBAR_SAME_LABEL: DataDef = def(
    "toolbar-same-label",
    DataType::Boolean,
    "true",
    Some("toolbar-same-label"),
    None,
);
pub static TOOLBAR_LABEL: DataDef = def(
    "toolbar-label",
    DataType::LocaleString,
    "",
    Some("toolbar-label"),
    Some("ToolbarLabel"),
);

pub static MENU_ITEMS: DataDef = DataDef {
    write_if_default: true,
    ..def(
        "items-list",
        DataType::StringList,
        "",
        Some("items-list"),
        Some("ItemsList"),
    )
};

pub static PROFILE_LABEL: DataDef = def(
    "label",
    DataType::LocaleString,
    "",
    Some("label"),
    Some("Name"),
);
pub static PATH: DataDef = DataDef {
    mandatory: true,
    ..def("path", DataType::String, "", Some("path"), None)
};
pub static PARAMETERS: DataDef = def("parameters", DataType::String, "", Some("parameters"), None);
pub static WORKING_DIR: DataDef = def("working-dir", DataType::String, "", None, Some("Path"));
pub static BASENAMES: DataDef = def(
    "basenames",
    DataType::StringList,
    "*",
    Some("basenames"),
    Some("Basenames"),
);
pub static MATCHCASE: DataDef = def(
    "matchcase",
    DataType::Boolean,
    "true",
    Some("matchcase"),
    Some("Matchcase"),
);
pub static MIMETYPES: DataDef = def(
    "mimetypes",
    DataType::StringList,
    "*",
    Some("mimetypes"),
    Some("MimeTypes"),
);
pub static IS_FILE: DataDef = def(
    "isfile",
    DataType::Boolean,
    "true",
    Some("isfile"),
    Some("X-TargetFiles"),
);
pub static IS_DIR: DataDef = def(
    "isdir",
    DataType::Boolean,
    "false",
    Some("isdir"),
    Some("X-TargetFolders"),
);
pub static MULTIPLE: DataDef = def(
    "multiple-accepted",
    DataType::Boolean,
    "false",
    Some("multiple-accepted"),
    Some("X-MultipleSelection"),
);
pub static SCHEMES: DataDef = def(
    "schemes",
    DataType::StringList,
    "file",
    Some("schemes"),
    Some("Schemes"),
);
pub static FOLDERS: DataDef = def(
    "folders",
    DataType::StringList,
    "/",
    Some("folders"),
    Some("Folders"),
);

/// Attributes shared by actions and menus.
pub static ITEM_GROUP: &[&DataDef] = &[&LABEL, &TOOLTIP, &ICON, &DESCRIPTION, &ENABLED];

/// Attributes specific to actions.
pub static ACTION_GROUP: &[&DataDef] = &[
    &ACTION_ITEMS,
    &VERSION,
    &TARGET_SELECTION,
    &TARGET_BACKGROUND,
    &TARGET_TOOLBAR,
    &TOOLBAR_SAME_LABEL,
    &TOOLBAR_LABEL,
];

/// Attributes specific to menus.
pub static MENU_GROUP: &[&DataDef] = &[&MENU_ITEMS];

/// Attributes of a profile.
pub static PROFILE_GROUP: &[&DataDef] = &[
    &PROFILE_LABEL,
    &PATH,
    &PARAMETERS,
    &WORKING_DIR,
    &BASENAMES,
    &MATCHCASE,
    &MIMETYPES,
    &IS_FILE,
    &IS_DIR,
    &MULTIPLE,
    &SCHEMES,
    &FOLDERS,
];

/// Bag of typed attribute values keyed by definition name.
///
/// # Invariant
///
/// - Getters never fail. Unset attributes yield the definition default.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Attributes {
    values: BTreeMap<&'static str, DataValue>,
}

impl Attributes {
    /// Construct empty attribute bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored value, if any.
    pub fn get(&self, def: &DataDef) -> Option<&DataValue> {
        self.values.get(def.name)
    }

    /// Stored value or the definition default.
    pub fn value(&self, def: &DataDef) -> DataValue {
        self.get(def).cloned().unwrap_or_else(|| def.default_value())
    }

    /// Check if attribute has been explicitly set.
    pub fn is_set(&self, def: &DataDef) -> bool {
        self.values.contains_key(def.name)
    }

    /// Set attribute value.
    ///
    /// Value is coerced to the definition's type. An incompatible value is
    /// dropped, leaving the attribute unset.
    pub fn set(&mut self, def: &DataDef, value: DataValue) {
        match value.coerce(def.data_type) {
            Some(value) => {
                self.values.insert(def.name, value);
            }
            None => {
                self.values.remove(def.name);
            }
        }
    }

    /// Unset attribute.
    pub fn unset(&mut self, def: &DataDef) {
        self.values.remove(def.name);
    }

    pub fn string(&self, def: &DataDef) -> String {
        self.get(def)
            .and_then(DataValue::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| def.default_value().as_str().unwrap_or_default().to_string())
    }

    pub fn set_string(&mut self, def: &DataDef, value: impl Into<String>) {
        self.set(def, DataValue::Str(value.into()));
    }

    pub fn boolean(&self, def: &DataDef) -> bool {
        self.get(def)
            .and_then(DataValue::as_bool)
            .unwrap_or_else(|| def.default_value().as_bool().unwrap_or_default())
    }

    pub fn set_boolean(&mut self, def: &DataDef, value: bool) {
        self.set(def, DataValue::Bool(value));
    }

    pub fn list(&self, def: &DataDef) -> Vec<String> {
        match self.get(def).and_then(DataValue::as_list) {
            Some(list) => list.to_vec(),
            None => def.default_value().as_list().unwrap_or_default().to_vec(),
        }
    }

    pub fn set_list(&mut self, def: &DataDef, value: impl IntoIterator<Item = impl Into<String>>) {
        self.set(
            def,
            DataValue::StrList(value.into_iter().map(Into::into).collect()),
        );
    }

    pub fn uint(&self, def: &DataDef) -> u32 {
        self.get(def)
            .and_then(DataValue::as_uint)
            .unwrap_or_else(|| def.default_value().as_uint().unwrap_or_default())
    }

    pub fn set_uint(&mut self, def: &DataDef, value: u32) {
        self.set(def, DataValue::UInt(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unset_attributes_yield_definition_defaults() {
        let attrs = Attributes::new();

        assert_eq!(attrs.string(&LABEL), "");
        assert!(attrs.boolean(&ENABLED));
        assert!(!attrs.boolean(&TARGET_TOOLBAR));
        assert_eq!(attrs.list(&BASENAMES), vec!["*".to_string()]);
        assert_eq!(attrs.list(&ACTION_ITEMS), Vec::<String>::new());
        assert!(!attrs.is_set(&LABEL));
    }

    #[test]
    fn set_coerces_between_string_kinds() {
        let mut attrs = Attributes::new();
        attrs.set(&LABEL, DataValue::Str("Open".into()));
        assert_eq!(attrs.get(&LABEL), Some(&DataValue::LocaleStr("Open".into())));

        attrs.set(&PATH, DataValue::LocaleStr("/usr/bin/foo".into()));
        assert_eq!(attrs.get(&PATH), Some(&DataValue::Str("/usr/bin/foo".into())));
    }

    #[test]
    fn set_drops_incompatible_values() {
        let mut attrs = Attributes::new();
        attrs.set_boolean(&MATCHCASE, false);
        attrs.set(&MATCHCASE, DataValue::Str("nope".into()));

        assert!(!attrs.is_set(&MATCHCASE));
        assert!(attrs.boolean(&MATCHCASE));
    }

    #[test]
    fn explicit_empty_value_differs_from_unset() {
        let mut attrs = Attributes::new();
        attrs.set_list(&BASENAMES, Vec::<String>::new());

        assert!(attrs.is_set(&BASENAMES));
        assert_eq!(attrs.list(&BASENAMES), Vec::<String>::new());
    }

    #[test]
    fn definition_defaults_parse() {
        assert_eq!(SCHEMES.default_value(), DataValue::StrList(vec!["file".into()]));
        assert_eq!(ENABLED.default_value(), DataValue::Bool(true));
        assert!(TOOLTIP.is_default(&DataValue::LocaleStr(String::new())));
        assert_eq!(WORKING_DIR.entry(EntryDialect::Registry), None);
        assert_eq!(WORKING_DIR.entry(EntryDialect::Desktop), Some("Path"));
    }
}
