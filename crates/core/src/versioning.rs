//! Semantic version numbering for prompt snapshots.
//!
//! A prompt's versions are numbered `MAJOR.MINOR.PATCH`. The next number is
//! derived from the current *latest* number, where latest means the maximum
//! triple under component-wise lexicographic order -- never the newest row by
//! timestamp, since backfilled or concurrently inserted rows may not arrive
//! in numeric order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum length for a version change summary, in characters.
pub const MAX_CHANGE_SUMMARY_LENGTH: usize = 500;

/// Maximum length for a version change log, in characters.
pub const MAX_CHANGE_LOG_LENGTH: usize = 10_000;

/// Maximum length for a prompt's text, in characters.
pub const MAX_PROMPT_LENGTH: usize = 10_000;

/// Valid `change_type` values.
pub const VALID_CHANGE_TYPES: &[&str] = &["major", "minor", "patch"];

/// Valid `version_tag` values.
pub const VALID_VERSION_TAGS: &[&str] = &["draft", "beta", "stable", "production", "archived"];

// ---------------------------------------------------------------------------
// Change type
// ---------------------------------------------------------------------------

/// Classifies a new version and decides which component gets bumped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Major,
    Minor,
    Patch,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "patch" => Ok(Self::Patch),
            other => Err(CoreError::Validation(format!(
                "Invalid change_type '{other}'. Must be one of: {}",
                VALID_CHANGE_TYPES.join(", ")
            ))),
        }
    }
}

impl TryFrom<String> for ChangeType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// Version tag
// ---------------------------------------------------------------------------

/// Release label attached to a version. Mutable after creation and has no
/// influence on numbering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionTag {
    #[default]
    Draft,
    Beta,
    Stable,
    Production,
    Archived,
}

impl VersionTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Beta => "beta",
            Self::Stable => "stable",
            Self::Production => "production",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersionTag {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "beta" => Ok(Self::Beta),
            "stable" => Ok(Self::Stable),
            "production" => Ok(Self::Production),
            "archived" => Ok(Self::Archived),
            other => Err(CoreError::Validation(format!(
                "Invalid version_tag '{other}'. Must be one of: {}",
                VALID_VERSION_TAGS.join(", ")
            ))),
        }
    }
}

impl TryFrom<String> for VersionTag {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// Version number
// ---------------------------------------------------------------------------

/// A parsed `MAJOR.MINOR.PATCH` triple.
///
/// Field order matters: the derived `Ord` compares `major`, then `minor`,
/// then `patch`. A component too large for `u64` is reported as malformed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionNumber {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl VersionNumber {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// The number that follows `self` for the given kind of change.
    ///
    /// Fails with [`CoreError::InvariantViolation`] when the bumped component
    /// is already at its maximum; wrapping would break monotonic numbering.
    pub fn bump(self, change_type: ChangeType) -> Result<Self, CoreError> {
        let next = match change_type {
            ChangeType::Major => self.major.checked_add(1).map(|major| Self::new(major, 0, 0)),
            ChangeType::Minor => self
                .minor
                .checked_add(1)
                .map(|minor| Self::new(self.major, minor, 0)),
            ChangeType::Patch => self
                .patch
                .checked_add(1)
                .map(|patch| Self::new(self.major, self.minor, patch)),
        };
        next.ok_or_else(|| {
            CoreError::InvariantViolation(format!(
                "Version {self} cannot take a {change_type} bump without overflowing"
            ))
        })
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for VersionNumber {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed =
            || CoreError::Validation(format!("Malformed version number '{s}', expected MAJOR.MINOR.PATCH"));

        let mut parts = s.split('.');
        let mut component = || -> Result<u64, CoreError> {
            let part = parts.next().ok_or_else(malformed)?;
            // `u64::from_str` accepts a leading '+', which is not valid here.
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            part.parse().map_err(|_| malformed())
        };

        let major = component()?;
        let minor = component()?;
        let patch = component()?;
        if parts.next().is_some() {
            return Err(malformed());
        }
        Ok(Self::new(major, minor, patch))
    }
}

impl Serialize for VersionNumber {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Latest-version resolution
// ---------------------------------------------------------------------------

/// Minimal view of a stored version used for numbering and summaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMarker {
    pub id: DbId,
    pub version_number: String,
    pub create_time: Timestamp,
}

impl From<(DbId, String, Timestamp)> for VersionMarker {
    fn from((id, version_number, create_time): (DbId, String, Timestamp)) -> Self {
        Self {
            id,
            version_number,
            create_time,
        }
    }
}

/// Find the marker carrying the highest version number.
///
/// Every stored number is parsed; a single malformed value fails the whole
/// lookup rather than being skipped.
pub fn latest_marker(
    markers: &[VersionMarker],
) -> Result<Option<(&VersionMarker, VersionNumber)>, CoreError> {
    let mut latest: Option<(&VersionMarker, VersionNumber)> = None;
    for marker in markers {
        let number: VersionNumber = marker.version_number.parse()?;
        match latest {
            Some((_, best)) if number <= best => {}
            _ => latest = Some((marker, number)),
        }
    }
    Ok(latest)
}

/// Compute the next version number from the current latest (if any).
///
/// With no prior version the base is `0.0.0`, so the first `major` change
/// yields `1.0.0`.
pub fn next_version_number(
    latest: Option<VersionNumber>,
    change_type: ChangeType,
) -> Result<VersionNumber, CoreError> {
    latest.unwrap_or_default().bump(change_type)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a change summary: must be non-blank and within length limit.
pub fn validate_change_summary(summary: &str) -> Result<(), CoreError> {
    if summary.trim().is_empty() {
        return Err(CoreError::Validation(
            "Change summary must not be empty".to_string(),
        ));
    }
    let len = summary.chars().count();
    if len > MAX_CHANGE_SUMMARY_LENGTH {
        return Err(CoreError::Validation(format!(
            "Change summary exceeds maximum length of {MAX_CHANGE_SUMMARY_LENGTH} characters (got {len})"
        )));
    }
    Ok(())
}

/// Validate a change log: length check only.
pub fn validate_change_log(log: &str) -> Result<(), CoreError> {
    let len = log.chars().count();
    if len > MAX_CHANGE_LOG_LENGTH {
        return Err(CoreError::Validation(format!(
            "Change log exceeds maximum length of {MAX_CHANGE_LOG_LENGTH} characters (got {len})"
        )));
    }
    Ok(())
}

/// Validate prompt text: must be non-blank and within [`MAX_PROMPT_LENGTH`].
pub fn validate_final_prompt(text: &str) -> Result<(), CoreError> {
    if text.trim().is_empty() {
        return Err(CoreError::Validation(
            "Prompt content must not be empty".to_string(),
        ));
    }
    let len = text.chars().count();
    if len > MAX_PROMPT_LENGTH {
        return Err(CoreError::Validation(format!(
            "Prompt exceeds maximum length of {MAX_PROMPT_LENGTH} characters (got {len})"
        )));
    }
    Ok(())
}

/// Default change summary recorded on a rollback version.
pub fn rollback_summary(target: &str) -> String {
    format!("回滚至 v{target}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn marker(id: DbId, number: &str, minutes: i64) -> VersionMarker {
        VersionMarker {
            id,
            version_number: number.to_string(),
            create_time: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(minutes),
        }
    }

    // -- bump --

    #[test]
    fn major_resets_minor_and_patch() {
        assert_eq!(VersionNumber::new(1, 4, 2).bump(ChangeType::Major).unwrap(), VersionNumber::new(2, 0, 0));
    }

    #[test]
    fn minor_resets_patch() {
        assert_eq!(VersionNumber::new(1, 4, 2).bump(ChangeType::Minor).unwrap(), VersionNumber::new(1, 5, 0));
    }

    #[test]
    fn patch_increments_patch_only() {
        assert_eq!(VersionNumber::new(1, 4, 2).bump(ChangeType::Patch).unwrap(), VersionNumber::new(1, 4, 3));
    }

    #[test]
    fn bump_always_exceeds_input() {
        let change_types = [ChangeType::Major, ChangeType::Minor, ChangeType::Patch];
        for major in 0..4 {
            for minor in 0..4 {
                for patch in 0..4 {
                    let current = VersionNumber::new(major, minor, patch);
                    for ct in change_types {
                        assert!(current.bump(ct).unwrap() > current, "{current} bumped by {ct}");
                    }
                }
            }
        }
    }

    #[test]
    fn first_version_seeds_from_zero() {
        assert_eq!(next_version_number(None, ChangeType::Major).unwrap().to_string(), "1.0.0");
        assert_eq!(next_version_number(None, ChangeType::Minor).unwrap().to_string(), "0.1.0");
        assert_eq!(next_version_number(None, ChangeType::Patch).unwrap().to_string(), "0.0.1");
    }

    #[test]
    fn numbers_past_u32_parse_and_bump() {
        let big: VersionNumber = "4294967295.0.0".parse().unwrap();
        assert_eq!(next_version_number(Some(big), ChangeType::Major).unwrap().to_string(), "4294967296.0.0");
        assert_eq!(
            "4294967296.0.0".parse::<VersionNumber>().unwrap(),
            VersionNumber::new(4_294_967_296, 0, 0)
        );
    }

    #[test]
    fn bump_at_component_max_is_invariant_violation() {
        let at_max = VersionNumber::new(u64::MAX, u64::MAX, u64::MAX);
        for ct in [ChangeType::Major, ChangeType::Minor, ChangeType::Patch] {
            let err = at_max.bump(ct).unwrap_err();
            assert!(matches!(err, CoreError::InvariantViolation(_)), "{ct} bump should not wrap");
        }
        // Only the bumped component matters.
        let minor_max = VersionNumber::new(1, u64::MAX, 7);
        assert_eq!(minor_max.bump(ChangeType::Major).unwrap(), VersionNumber::new(2, 0, 0));
        assert_eq!(minor_max.bump(ChangeType::Patch).unwrap(), VersionNumber::new(1, u64::MAX, 8));
    }

    #[test]
    fn component_wider_than_u64_is_malformed() {
        let err = "18446744073709551616.0.0".parse::<VersionNumber>().unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    // -- parsing --

    #[test]
    fn parses_valid_numbers() {
        assert_eq!("1.10.3".parse::<VersionNumber>().unwrap(), VersionNumber::new(1, 10, 3));
        assert_eq!("0.0.0".parse::<VersionNumber>().unwrap(), VersionNumber::default());
    }

    #[test]
    fn rejects_malformed_numbers() {
        for bad in ["", "1", "1.2", "1.2.3.4", "a.b.c", "1..2", "v1.0.0", "1.+2.3", " 1.2.3", "1.2.-3"] {
            let err = bad.parse::<VersionNumber>().unwrap_err();
            assert!(
                matches!(err, CoreError::Validation(_)),
                "'{bad}' should be a validation error"
            );
        }
    }

    #[test]
    fn display_round_trips() {
        let n = VersionNumber::new(3, 0, 12);
        assert_eq!(n.to_string().parse::<VersionNumber>().unwrap(), n);
    }

    #[test]
    fn ordering_is_numeric_not_textual() {
        let a: VersionNumber = "1.9.0".parse().unwrap();
        let b: VersionNumber = "1.10.0".parse().unwrap();
        assert!(b > a);
        assert!("1.9.0" > "1.10.0", "string comparison would get this wrong");
    }

    // -- latest_marker --

    #[test]
    fn latest_marker_empty_is_none() {
        assert!(latest_marker(&[]).unwrap().is_none());
    }

    #[test]
    fn latest_marker_ignores_timestamps() {
        // 1.10.0 was backfilled with the oldest timestamp.
        let markers = vec![marker(1, "1.10.0", 0), marker(2, "1.2.0", 10), marker(3, "1.9.5", 20)];
        let (m, number) = latest_marker(&markers).unwrap().unwrap();
        assert_eq!(m.id, 1);
        assert_eq!(number, VersionNumber::new(1, 10, 0));
    }

    #[test]
    fn latest_marker_fails_on_malformed_value() {
        let markers = vec![marker(1, "1.0.0", 0), marker(2, "garbage", 1)];
        let err = latest_marker(&markers).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    // -- enums --

    #[test]
    fn change_type_parses_known_values() {
        assert_eq!("major".parse::<ChangeType>().unwrap(), ChangeType::Major);
        assert_eq!("patch".parse::<ChangeType>().unwrap(), ChangeType::Patch);
    }

    #[test]
    fn change_type_rejects_unknown_value() {
        let err = "rollback".parse::<ChangeType>().unwrap_err();
        assert!(err.to_string().contains("Invalid change_type"));
    }

    #[test]
    fn version_tag_parses_all_valid_values() {
        for tag in VALID_VERSION_TAGS {
            let parsed: VersionTag = tag.parse().unwrap();
            assert_eq!(parsed.as_str(), *tag);
        }
    }

    #[test]
    fn version_tag_rejects_unknown_value() {
        let err = "release".parse::<VersionTag>().unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn version_tag_defaults_to_draft() {
        assert_eq!(VersionTag::default(), VersionTag::Draft);
    }

    // -- validation --

    #[test]
    fn blank_summary_rejected() {
        assert!(validate_change_summary("").is_err());
        assert!(validate_change_summary("   ").is_err());
    }

    #[test]
    fn summary_length_counts_characters() {
        let exact = "版".repeat(MAX_CHANGE_SUMMARY_LENGTH);
        assert!(validate_change_summary(&exact).is_ok());
        let long = "版".repeat(MAX_CHANGE_SUMMARY_LENGTH + 1);
        assert!(validate_change_summary(&long).is_err());
    }

    #[test]
    fn too_long_change_log_rejected() {
        let long = "x".repeat(MAX_CHANGE_LOG_LENGTH + 1);
        let err = validate_change_log(&long).unwrap_err();
        assert!(err.to_string().contains("Change log exceeds"));
    }

    #[test]
    fn prompt_at_limit_accepted() {
        assert!(validate_final_prompt(&"词".repeat(MAX_PROMPT_LENGTH)).is_ok());
    }

    #[test]
    fn prompt_over_limit_rejected() {
        let err = validate_final_prompt(&"x".repeat(MAX_PROMPT_LENGTH + 1)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(err.to_string().contains("Prompt exceeds maximum length"));
    }

    #[test]
    fn blank_prompt_rejected() {
        assert!(validate_final_prompt(" \n\t").is_err());
    }

    #[test]
    fn rollback_summary_names_target() {
        assert_eq!(rollback_summary("1.0.0"), "回滚至 v1.0.0");
    }
}
