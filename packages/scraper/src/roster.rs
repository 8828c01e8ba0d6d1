//! Compile-time registry of idol member rosters.
//!
//! Each roster is a TOML file under `rosters/` embedded via
//! `include_str!`, mapping a member's stage name to the Japanese search
//! name that Mercari sellers actually use in listing titles (some search
//! names carry a group qualifier to disambiguate common given names).

use serde::Deserialize;

/// A group of members loaded from one roster TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct Roster {
    /// Human-readable roster name.
    pub name: String,
    /// The members in this roster.
    pub members: Vec<RosterMember>,
}

/// One idol member and their marketplace search name.
#[derive(Debug, Clone, Deserialize)]
pub struct RosterMember {
    /// Romanized stage name.
    pub stage_name: String,
    /// Group the member belongs to.
    pub group: String,
    /// Japanese name (plus optional qualifier) used in search queries.
    pub search_name: String,
}

impl RosterMember {
    /// Returns the full Mercari search phrase for this member.
    #[must_use]
    pub fn search_phrase(&self) -> String {
        format!("{} フォトカード", self.search_name)
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const ROSTER_TOMLS: &[(&str, &str)] = &[
    (
        "generation_three",
        include_str!("../rosters/generation_three.toml"),
    ),
    (
        "generation_four",
        include_str!("../rosters/generation_four.toml"),
    ),
];

#[cfg(test)]
const EXPECTED_ROSTER_COUNT: usize = 2;

/// Returns all embedded rosters.
///
/// # Panics
///
/// Panics if any roster TOML is malformed (this is a compile-time
/// guarantee since the rosters are embedded).
#[must_use]
pub fn all_rosters() -> Vec<Roster> {
    ROSTER_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse roster '{name}': {e}"))
        })
        .collect()
}

/// Returns the search phrase for every member across all rosters.
#[must_use]
pub fn all_search_phrases() -> Vec<String> {
    all_rosters()
        .iter()
        .flat_map(|roster| roster.members.iter().map(RosterMember::search_phrase))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn loads_all_rosters() {
        let rosters = all_rosters();
        assert_eq!(rosters.len(), EXPECTED_ROSTER_COUNT);
        for roster in &rosters {
            assert!(!roster.name.is_empty());
            assert!(!roster.members.is_empty());
        }
    }

    #[test]
    fn search_names_are_unique() {
        let mut seen = BTreeSet::new();
        for roster in all_rosters() {
            for member in &roster.members {
                assert!(
                    seen.insert(member.search_name.clone()),
                    "Duplicate search name: {}",
                    member.search_name
                );
            }
        }
    }

    #[test]
    fn search_phrase_appends_photocard_keyword() {
        let member = RosterMember {
            stage_name: "Jimin".to_owned(),
            group: "BTS".to_owned(),
            search_name: "ジミン".to_owned(),
        };
        assert_eq!(member.search_phrase(), "ジミン フォトカード");
    }

    #[test]
    fn members_have_required_fields() {
        for roster in all_rosters() {
            for member in &roster.members {
                assert!(!member.stage_name.is_empty());
                assert!(!member.group.is_empty());
                assert!(!member.search_name.is_empty());
            }
        }
    }
}
