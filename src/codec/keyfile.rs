// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Desktop-entry key file format.
//!
//! A __key file__ is a line oriented text file made of named groups, each
//! holding `key=value` entries. Localized values use `key[locale]=value`.
//!
//! # Layout
//!
//! ```text
//! # comment
//! [Desktop Entry]
//! Type=Action
//! Name=Open with foo
//! Name[fr]=Ouvrir avec foo
//! Profiles=profile-1;
//!
//! [X-Action-Profile profile-1]
//! Exec=/usr/bin/foo %f
//! ```
//!
//! Comments, blank lines, group order, and entries this crate knows nothing
//! about all survive a parse and serialize cycle, so files edited by hand or
//! by other tools are not mangled when written back.
//!
//! # Value Encoding
//!
//! - Strings escape `\s` (leading space), `\n`, `\t`, `\r`, and `\\`.
//! - Lists separate elements with `;` and escape a literal `;` as `\;`. A
//!   trailing `;` is always written.
//! - Booleans are `true` or `false`. Unsigned integers are decimal.
//!
//! # See Also
//!
//! 1. [Desktop Entry Specification](https://specifications.freedesktop.org/desktop-entry-spec/latest/)

use std::{
    env,
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

/// Parsed key file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KeyFile {
    header: Vec<Line>,
    groups: Vec<Group>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Group {
    name: String,
    lines: Vec<Line>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Blank,
    Comment(String),
    Entry(Entry),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    key: String,
    locale: Option<String>,
    value: String,
}

impl KeyFile {
    /// Construct empty key file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all groups in file order.
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|group| group.name.as_str()).collect()
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.group(group).is_some()
    }

    /// Add empty group if it does not exist yet.
    pub fn add_group(&mut self, group: &str) {
        if self.has_group(group) {
            return;
        }

        // INVARIANT: Keep one blank line between groups.
        if let Some(last) = self.groups.last_mut() {
            if !matches!(last.lines.last(), Some(Line::Blank)) {
                last.lines.push(Line::Blank);
            }
        }

        self.groups.push(Group {
            name: group.to_string(),
            lines: Vec::new(),
        });
    }

    /// Remove group with all its entries. Returns true if it existed.
    pub fn remove_group(&mut self, group: &str) -> bool {
        let before = self.groups.len();
        self.groups.retain(|g| g.name != group);
        before != self.groups.len()
    }

    /// Distinct untranslated key names of a group, in file order.
    pub fn keys(&self, group: &str) -> Vec<&str> {
        let mut keys = Vec::new();
        for entry in self.entries(group) {
            if !keys.contains(&entry.key.as_str()) {
                keys.push(entry.key.as_str());
            }
        }
        keys
    }

    /// Check if group holds key, translated or not.
    pub fn has_key(&self, group: &str, key: &str) -> bool {
        self.entries(group).any(|entry| entry.key == key)
    }

    /// Raw, still escaped, untranslated value.
    pub fn raw_value(&self, group: &str, key: &str) -> Option<&str> {
        self.find(group, key, None).map(|entry| entry.value.as_str())
    }

    /// Untranslated string value.
    ///
    /// # Errors
    ///
    /// - Return [`KeyFileError::InvalidEscape`] if value holds a bad escape.
    pub fn string(&self, group: &str, key: &str) -> Result<Option<String>> {
        self.find(group, key, None)
            .map(|entry| unescape(&entry.value).ok_or_else(|| invalid_escape(entry)))
            .transpose()
    }

    /// String value best matching the preferred locales.
    ///
    /// Tries every variant of every preferred locale in order, then falls back
    /// to the untranslated value.
    ///
    /// # Errors
    ///
    /// - Return [`KeyFileError::InvalidEscape`] if value holds a bad escape.
    pub fn locale_string(
        &self,
        group: &str,
        key: &str,
        locales: &[String],
    ) -> Result<Option<String>> {
        let translated = locales
            .iter()
            .flat_map(|locale| locale_variants(locale))
            .find_map(|variant| self.find(group, key, Some(variant.as_str())));

        match translated {
            Some(entry) => unescape(&entry.value)
                .ok_or_else(|| invalid_escape(entry))
                .map(Some),
            None => self.string(group, key),
        }
    }

    /// Boolean value.
    ///
    /// # Errors
    ///
    /// - Return [`KeyFileError::InvalidBoolean`] if value is not a boolean.
    pub fn boolean(&self, group: &str, key: &str) -> Result<Option<bool>> {
        let Some(entry) = self.find(group, key, None) else {
            return Ok(None);
        };

        match entry.value.trim() {
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            _ => Err(KeyFileError::InvalidBoolean {
                key: entry.key.clone(),
                value: entry.value.clone(),
            }),
        }
    }

    /// String list value.
    ///
    /// # Errors
    ///
    /// - Return [`KeyFileError::InvalidEscape`] if an element holds a bad escape.
    pub fn string_list(&self, group: &str, key: &str) -> Result<Option<Vec<String>>> {
        let Some(entry) = self.find(group, key, None) else {
            return Ok(None);
        };

        split_list(&entry.value)
            .into_iter()
            .map(|elem| unescape(&elem).ok_or_else(|| invalid_escape(entry)))
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    /// Unsigned integer value.
    ///
    /// # Errors
    ///
    /// - Return [`KeyFileError::InvalidInteger`] if value is not an unsigned
    ///   integer.
    pub fn uint(&self, group: &str, key: &str) -> Result<Option<u32>> {
        let Some(entry) = self.find(group, key, None) else {
            return Ok(None);
        };

        entry
            .value
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| KeyFileError::InvalidInteger {
                key: entry.key.clone(),
                value: entry.value.clone(),
            })
    }

    /// Set untranslated string value, creating group if needed.
    pub fn set_string(&mut self, group: &str, key: &str, value: &str) {
        self.set_raw(group, key, None, escape(value, false));
    }

    /// Set string value for a locale, or untranslated if `locale` is `None`.
    pub fn set_locale_string(&mut self, group: &str, key: &str, locale: Option<&str>, value: &str) {
        self.set_raw(group, key, locale, escape(value, false));
    }

    pub fn set_boolean(&mut self, group: &str, key: &str, value: bool) {
        self.set_raw(group, key, None, value.to_string());
    }

    pub fn set_string_list(&mut self, group: &str, key: &str, value: &[String]) {
        let mut raw = String::new();
        for elem in value {
            raw.push_str(&escape(elem, true));
            raw.push(';');
        }
        self.set_raw(group, key, None, raw);
    }

    pub fn set_uint(&mut self, group: &str, key: &str, value: u32) {
        self.set_raw(group, key, None, value.to_string());
    }

    /// Remove key and all of its translations. Returns true if anything was
    /// removed.
    pub fn remove_key(&mut self, group: &str, key: &str) -> bool {
        let Some(group) = self.group_mut(group) else {
            return false;
        };

        let before = group.lines.len();
        group
            .lines
            .retain(|line| !matches!(line, Line::Entry(entry) if entry.key == key));
        before != group.lines.len()
    }

    fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|group| group.name == name)
    }

    fn group_mut(&mut self, name: &str) -> Option<&mut Group> {
        self.groups.iter_mut().find(|group| group.name == name)
    }

    fn entries<'a>(&'a self, group: &str) -> impl Iterator<Item = &'a Entry> + 'a {
        self.group(group)
            .into_iter()
            .flat_map(|group| group.lines.iter())
            .filter_map(|line| match line {
                Line::Entry(entry) => Some(entry),
                _ => None,
            })
    }

    // INVARIANT: Last duplicate entry wins, like every other reader does.
    fn find(&self, group: &str, key: &str, locale: Option<&str>) -> Option<&Entry> {
        self.entries(group)
            .filter(|entry| entry.key == key && entry.locale.as_deref() == locale)
            .last()
    }

    fn set_raw(&mut self, group: &str, key: &str, locale: Option<&str>, value: String) {
        self.add_group(group);
        let Some(group) = self.group_mut(group) else {
            return;
        };

        let existing = group.lines.iter_mut().rev().find_map(|line| match line {
            Line::Entry(entry) if entry.key == key && entry.locale.as_deref() == locale => {
                Some(entry)
            }
            _ => None,
        });

        match existing {
            Some(entry) => entry.value = value,
            None => {
                let entry = Line::Entry(Entry {
                    key: key.to_string(),
                    locale: locale.map(str::to_string),
                    value,
                });

                // INVARIANT: Insert before trailing blank lines of the group.
                let at = group
                    .lines
                    .iter()
                    .rposition(|line| !matches!(line, Line::Blank))
                    .map_or(0, |pos| pos + 1);
                group.lines.insert(at, entry);
            }
        }
    }
}

impl FromStr for KeyFile {
    type Err = KeyFileError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut keyfile = KeyFile::new();

        for (index, raw) in data.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();

            if trimmed.is_empty() {
                push_line(&mut keyfile, Line::Blank);
                continue;
            }

            if trimmed.starts_with('#') {
                push_line(&mut keyfile, Line::Comment(raw.to_string()));
                continue;
            }

            if let Some(header) = trimmed.strip_prefix('[') {
                let name = header
                    .strip_suffix(']')
                    .filter(|name| !name.is_empty() && !name.contains(['[', ']']))
                    .ok_or(KeyFileError::Syntax {
                        line,
                        reason: "malformed group header",
                    })?;

                if keyfile.has_group(name) {
                    return Err(KeyFileError::DuplicateGroup {
                        line,
                        group: name.to_string(),
                    });
                }

                keyfile.groups.push(Group {
                    name: name.to_string(),
                    lines: Vec::new(),
                });
                continue;
            }

            if keyfile.groups.is_empty() {
                return Err(KeyFileError::EntryOutsideGroup { line });
            }

            let (key, value) = raw.split_once('=').ok_or(KeyFileError::Syntax {
                line,
                reason: "expected key=value",
            })?;
            let (key, locale) = split_locale(key.trim()).ok_or(KeyFileError::Syntax {
                line,
                reason: "malformed key name",
            })?;

            push_line(
                &mut keyfile,
                Line::Entry(Entry {
                    key: key.to_string(),
                    locale: locale.map(str::to_string),
                    value: value.trim_start().to_string(),
                }),
            );
        }

        Ok(keyfile)
    }
}

impl Display for KeyFile {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        for line in &self.header {
            writeln!(fmt, "{line}")?;
        }

        for group in &self.groups {
            writeln!(fmt, "[{}]", group.name)?;
            for line in &group.lines {
                writeln!(fmt, "{line}")?;
            }
        }

        Ok(())
    }
}

impl Display for Line {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Blank => Ok(()),
            Self::Comment(comment) => fmt.write_str(comment),
            Self::Entry(Entry {
                key,
                locale: Some(locale),
                value,
            }) => write!(fmt, "{key}[{locale}]={value}"),
            Self::Entry(Entry {
                key,
                locale: None,
                value,
            }) => write!(fmt, "{key}={value}"),
        }
    }
}

fn push_line(keyfile: &mut KeyFile, line: Line) {
    match keyfile.groups.last_mut() {
        Some(group) => group.lines.push(line),
        None => keyfile.header.push(line),
    }
}

fn split_locale(key: &str) -> Option<(&str, Option<&str>)> {
    if key.is_empty() {
        return None;
    }

    match key.split_once('[') {
        Some((name, rest)) => {
            let locale = rest.strip_suffix(']')?;
            if name.is_empty() || locale.is_empty() || locale.contains(['[', ']']) {
                return None;
            }
            Some((name.trim_end(), Some(locale)))
        }
        None if key.contains(']') => None,
        None => Some((key, None)),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    let mut elems = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                current.push(ch);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ';' => elems.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }

    if !current.is_empty() {
        elems.push(current);
    }

    elems
}

fn unescape(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }

        match chars.next()? {
            's' => out.push(' '),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '\\' => out.push('\\'),
            ';' => out.push(';'),
            _ => return None,
        }
    }

    Some(out)
}

fn escape(value: &str, list_elem: bool) -> String {
    let mut out = String::with_capacity(value.len());

    for (index, ch) in value.chars().enumerate() {
        match ch {
            ' ' if index == 0 => out.push_str("\\s"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            ';' if list_elem => out.push_str("\\;"),
            _ => out.push(ch),
        }
    }

    out
}

fn invalid_escape(entry: &Entry) -> KeyFileError {
    KeyFileError::InvalidEscape {
        key: entry.key.clone(),
        value: entry.value.clone(),
    }
}

/// Lookup variants of a locale name, most specific first.
///
/// `fr_CA.UTF-8@euro` yields `fr_CA@euro`, `fr_CA`, `fr@euro`, `fr`. The
/// encoding part never takes part in matching.
pub fn locale_variants(locale: &str) -> Vec<String> {
    let (base, modifier) = match locale.split_once('@') {
        Some((base, modifier)) => (base, Some(modifier)),
        None => (locale, None),
    };
    let base = base.split('.').next().unwrap_or(base);
    let (lang, country) = match base.split_once('_') {
        Some((lang, country)) => (lang, Some(country)),
        None => (base, None),
    };

    if lang.is_empty() {
        return Vec::new();
    }

    let mut variants = Vec::with_capacity(4);
    if let (Some(country), Some(modifier)) = (country, modifier) {
        variants.push(format!("{lang}_{country}@{modifier}"));
    }
    if let Some(country) = country {
        variants.push(format!("{lang}_{country}"));
    }
    if let Some(modifier) = modifier {
        variants.push(format!("{lang}@{modifier}"));
    }
    variants.push(lang.to_string());

    variants
}

/// Preferred message locales of the current process environment.
///
/// Reads `LANGUAGE` first, then the first of `LC_ALL`, `LC_MESSAGES`, and
/// `LANG` that is set. The `C` and `POSIX` locales mean untranslated.
pub fn system_locales() -> Vec<String> {
    let mut locales = Vec::new();

    if let Ok(language) = env::var("LANGUAGE") {
        locales.extend(language.split(':').map(str::to_string));
    }

    let primary = ["LC_ALL", "LC_MESSAGES", "LANG"]
        .into_iter()
        .filter_map(|name| env::var(name).ok())
        .find(|value| !value.is_empty());
    locales.extend(primary);

    let mut seen = Vec::new();
    for locale in locales {
        let locale = locale.trim().to_string();
        if locale.is_empty() || locale == "C" || locale.starts_with("C.") || locale == "POSIX" {
            continue;
        }
        if !seen.contains(&locale) {
            seen.push(locale);
        }
    }

    seen
}

/// Key file error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyFileError {
    /// Line cannot be parsed.
    #[error("line {line}: {reason}")]
    Syntax { line: usize, reason: &'static str },

    /// Entry appears before any group header.
    #[error("line {line}: entry outside of any group")]
    EntryOutsideGroup { line: usize },

    /// Group header appears twice.
    #[error("line {line}: duplicate group {group:?}")]
    DuplicateGroup { line: usize, group: String },

    /// Value holds an unknown escape sequence.
    #[error("key {key:?} holds invalid escape sequence in {value:?}")]
    InvalidEscape { key: String, value: String },

    /// Value cannot be interpreted as a boolean.
    #[error("key {key:?} holds non-boolean value {value:?}")]
    InvalidBoolean { key: String, value: String },

    /// Value cannot be interpreted as an unsigned integer.
    #[error("key {key:?} holds non-integer value {value:?}")]
    InvalidInteger { key: String, value: String },
}

/// Friendly result alias :3
pub type Result<T, E = KeyFileError> = std::result::Result<T, E>;
