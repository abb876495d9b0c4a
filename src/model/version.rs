// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Schema version reconciliation.
//!
//! Action definitions have been written under three schema generations over
//! time. Readers hand whatever they found in storage to this module, which
//! normalizes it into the current in-memory shape.
//!
//! # Generations
//!
//! 1. __V1__ (`1.x` or no version at all): actions carry their command and
//!    conditions directly, without profiles. Case sensitivity and MIME types
//!    did not exist yet.
//! 2. __V2__ (`2.x`): actions own one or more profiles.
//! 3. __V3__ (`3.x`): menus and the desktop-entry format exist.

use crate::model::{
    data::{DataValue, MATCHCASE, MIMETYPES},
    profile::{Profile, LEGACY_PROFILE_ID},
};

use std::collections::HashSet;
use tracing::warn;

/// Version string written for new actions.
pub const CURRENT_VERSION: &str = "3.0";

/// Schema generation of stored action data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SchemaGeneration {
    V1,
    V2,
    V3,
}

impl SchemaGeneration {
    /// Determine generation from stored version string.
    pub fn from_version(version: Option<&str>) -> Self {
        let major = version
            .map(str::trim)
            .filter(|version| !version.is_empty())
            .and_then(|version| version.split('.').next())
            .and_then(|major| major.parse::<u32>().ok());

        match major {
            None | Some(0) | Some(1) => Self::V1,
            Some(2) => Self::V2,
            Some(_) => Self::V3,
        }
    }

    /// Data of this generation may lack explicit profiles.
    pub fn predates_profiles(self) -> bool {
        self < Self::V2
    }
}

/// Apply generation specific defaults to attributes absent from storage.
///
/// Version 1 data never stored case sensitivity nor MIME types: such
/// profiles matched case sensitively and accepted every MIME type.
pub fn apply_generation_defaults(profile: &mut Profile, generation: SchemaGeneration) {
    if generation != SchemaGeneration::V1 {
        return;
    }

    profile.default_unset(&MATCHCASE, DataValue::Bool(true));
    profile.default_unset(&MIMETYPES, DataValue::StrList(vec!["*/*".into()]));
}

/// Build the profile synthesized from a legacy action's flat attributes.
pub fn synthesize_legacy_profile(mut profile: Profile, generation: SchemaGeneration) -> Profile {
    profile.set_id(LEGACY_PROFILE_ID);
    apply_generation_defaults(&mut profile, generation);
    profile
}

/// Order discovered profiles following the stored identifier list.
///
/// Profiles named by `listed` come first, in list order. Profiles physically
/// present but missing from the list are appended in discovery order, so data
/// storage really holds is never dropped. Listed identifiers without a
/// matching profile are skipped with a warning.
pub fn reconcile_profiles(
    action_id: &str,
    listed: Option<&[String]>,
    discovered: Vec<Profile>,
) -> Vec<Profile> {
    let Some(listed) = listed else {
        return discovered;
    };

    let mut pool = discovered.into_iter().map(Some).collect::<Vec<_>>();
    let mut ordered = Vec::with_capacity(pool.len());
    let mut seen = HashSet::new();

    for id in listed {
        if !seen.insert(id.as_str()) {
            continue;
        }

        let slot = pool
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|profile| profile.id() == id));
        match slot.and_then(Option::take) {
            Some(profile) => ordered.push(profile),
            None => warn!("action {action_id:?} lists missing profile {id:?}"),
        }
    }

    // INVARIANT: Recover unlisted profiles in discovery order.
    ordered.extend(pool.into_iter().flatten());

    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(profiles: &[Profile]) -> Vec<&str> {
        profiles.iter().map(Profile::id).collect()
    }

    #[test]
    fn generation_from_version_string() {
        assert_eq!(SchemaGeneration::from_version(None), SchemaGeneration::V1);
        assert_eq!(SchemaGeneration::from_version(Some("")), SchemaGeneration::V1);
        assert_eq!(SchemaGeneration::from_version(Some("1.1")), SchemaGeneration::V1);
        assert_eq!(SchemaGeneration::from_version(Some("2.0")), SchemaGeneration::V2);
        assert_eq!(SchemaGeneration::from_version(Some("3.0")), SchemaGeneration::V3);
        assert_eq!(SchemaGeneration::from_version(Some("bogus")), SchemaGeneration::V1);
        assert!(SchemaGeneration::V1.predates_profiles());
        assert!(!SchemaGeneration::V2.predates_profiles());
    }

    #[test]
    fn listed_profiles_first_then_unlisted_in_discovery_order() {
        let discovered = vec![
            Profile::new("d"),
            Profile::new("b"),
            Profile::new("c"),
            Profile::new("a"),
        ];
        let listed = vec!["a".to_string(), "b".into()];

        let result = reconcile_profiles("act", Some(&listed), discovered);
        assert_eq!(ids(&result), vec!["a", "b", "d", "c"]);
    }

    #[test]
    fn missing_and_duplicate_listed_profiles_are_skipped() {
        let discovered = vec![Profile::new("a"), Profile::new("b")];
        let listed = vec!["ghost".to_string(), "b".into(), "b".into()];

        let result = reconcile_profiles("act", Some(&listed), discovered);
        assert_eq!(ids(&result), vec!["b", "a"]);
    }

    #[test]
    fn no_list_keeps_discovery_order() {
        let discovered = vec![Profile::new("z"), Profile::new("y")];

        let result = reconcile_profiles("act", None, discovered);
        assert_eq!(ids(&result), vec!["z", "y"]);
    }

    #[test]
    fn legacy_profile_gets_v1_defaults() {
        let mut flat = Profile::new("ignored");
        flat.set_path("/usr/bin/foo");
        let profile = synthesize_legacy_profile(flat, SchemaGeneration::V1);

        assert_eq!(profile.id(), LEGACY_PROFILE_ID);
        assert_eq!(profile.path(), "/usr/bin/foo");
        assert_eq!(profile.mimetypes(), vec!["*/*".to_string()]);
        assert!(profile.matchcase());
    }

    #[test]
    fn explicit_values_survive_generation_defaults() {
        let mut profile = Profile::new("p");
        profile.set_matchcase(false);
        apply_generation_defaults(&mut profile, SchemaGeneration::V1);
        assert!(!profile.matchcase());

        let mut modern = Profile::new("p");
        apply_generation_defaults(&mut modern, SchemaGeneration::V3);
        assert_eq!(modern.mimetypes(), vec!["*".to_string()]);
    }
}
