//! Cache directory naming profiles.
//!
//! Two profiles exist:
//!
//! - `hashed`: `.` followed by the first 16 hex characters of
//!   `sha256("{epoch}_{fingerprint}")`. Deterministic; reveals nothing about
//!   the epoch or fingerprint, so staleness is "any matching name other than
//!   the current one".
//! - `labeled`: `.{fingerprint}_{epoch}_{8 random hex}`. Readable; staleness
//!   is "same fingerprint, different epoch".

use std::fmt;
use std::str::FromStr;

use runway_core::MachineFingerprint;
use sha2::{Digest, Sha256};

use crate::epoch::CacheEpoch;
use crate::error::CacheError;

const HASHED_LEN: usize = 16;
const SUFFIX_LEN: usize = 8;

/// How cache directory names are built and recognised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NamingProfile {
    /// Opaque hash of epoch and fingerprint.
    #[default]
    Hashed,
    /// Fingerprint, epoch and a random disambiguator.
    Labeled,
}

impl NamingProfile {
    /// Build the directory name for `fingerprint` in `epoch`.
    ///
    /// The labeled profile draws a fresh random suffix on every call.
    #[must_use]
    pub fn dir_name(self, fingerprint: &MachineFingerprint, epoch: CacheEpoch) -> String {
        match self {
            Self::Hashed => format!(".{}", hashed_component(fingerprint, epoch)),
            Self::Labeled => {
                let suffix: u32 = rand::random();
                format!(".{fingerprint}_{epoch}_{suffix:08x}")
            },
        }
    }

    /// Whether `name` structurally belongs to this profile.
    #[must_use]
    pub fn matches(self, name: &str) -> bool {
        match self {
            Self::Hashed => name
                .strip_prefix('.')
                .is_some_and(|rest| rest.len() == HASHED_LEN && is_lower_hex(rest)),
            Self::Labeled => parse_labeled(name).is_some(),
        }
    }

    /// Whether `name` is a directory of ours from a different epoch.
    #[must_use]
    pub fn is_stale(self, name: &str, fingerprint: &MachineFingerprint, current: CacheEpoch) -> bool {
        match self {
            Self::Hashed => {
                self.matches(name)
                    && name.get(1..) != Some(hashed_component(fingerprint, current).as_str())
            },
            Self::Labeled => parse_labeled(name)
                .is_some_and(|(fp, epoch)| fp == fingerprint.as_str() && epoch != current),
        }
    }

    /// Whether `name` is a directory of ours for exactly this epoch.
    #[must_use]
    pub fn is_current(self, name: &str, fingerprint: &MachineFingerprint, current: CacheEpoch) -> bool {
        match self {
            Self::Hashed => name.get(1..) == Some(hashed_component(fingerprint, current).as_str()),
            Self::Labeled => parse_labeled(name)
                .is_some_and(|(fp, epoch)| fp == fingerprint.as_str() && epoch == current),
        }
    }
}

impl fmt::Display for NamingProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hashed => f.write_str("hashed"),
            Self::Labeled => f.write_str("labeled"),
        }
    }
}

impl FromStr for NamingProfile {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hashed" => Ok(Self::Hashed),
            "labeled" => Ok(Self::Labeled),
            other => Err(CacheError::UnknownNaming(other.to_owned())),
        }
    }
}

fn hashed_component(fingerprint: &MachineFingerprint, epoch: CacheEpoch) -> String {
    let digest = hex::encode(Sha256::digest(format!("{epoch}_{fingerprint}").as_bytes()));
    digest[..HASHED_LEN].to_owned()
}

/// Split a labeled name into its fingerprint and epoch.
fn parse_labeled(name: &str) -> Option<(&str, CacheEpoch)> {
    let rest = name.strip_prefix('.')?;
    let mut parts = rest.split('_');
    let fp = parts.next()?;
    let epoch = parts.next()?;
    let suffix = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    MachineFingerprint::parse(fp)?;
    if suffix.len() != SUFFIX_LEN || !is_lower_hex(suffix) {
        return None;
    }
    Some((fp, epoch.parse().ok()?))
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(raw: &str) -> MachineFingerprint {
        MachineFingerprint::derive(raw)
    }

    fn epoch(s: &str) -> CacheEpoch {
        s.parse().unwrap()
    }

    #[test]
    fn test_hashed_name_is_deterministic() {
        let a = NamingProfile::Hashed.dir_name(&fp("host"), epoch("2025-W11"));
        let b = NamingProfile::Hashed.dir_name(&fp("host"), epoch("2025-W11"));
        let c = NamingProfile::Hashed.dir_name(&fp("host"), epoch("2025-W12"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 17);
        assert!(NamingProfile::Hashed.matches(&a));
    }

    #[test]
    fn test_hashed_staleness() {
        let me = fp("host");
        let now = epoch("2025-W11");
        let old = NamingProfile::Hashed.dir_name(&me, epoch("2025-W10"));
        let cur = NamingProfile::Hashed.dir_name(&me, now);

        assert!(NamingProfile::Hashed.is_stale(&old, &me, now));
        assert!(!NamingProfile::Hashed.is_stale(&cur, &me, now));
        assert!(NamingProfile::Hashed.is_current(&cur, &me, now));
        assert!(!NamingProfile::Hashed.is_stale(".config", &me, now));
        assert!(!NamingProfile::Hashed.is_stale("0123456789abcdef0", &me, now));
    }

    #[test]
    fn test_labeled_name_shape() {
        let me = fp("host");
        let name = NamingProfile::Labeled.dir_name(&me, epoch("2025-W11"));
        assert!(name.starts_with(&format!(".{me}_2025-W11_")));
        assert!(NamingProfile::Labeled.matches(&name));
    }

    #[test]
    fn test_labeled_staleness_respects_fingerprint() {
        let me = fp("host");
        let other = fp("other");
        let now = epoch("2025-W11");

        let mine_old = format!(".{me}_2025-W10_0badc0de");
        let mine_now = format!(".{me}_2025-W11_0badc0de");
        let theirs_old = format!(".{other}_2025-W10_0badc0de");

        assert!(NamingProfile::Labeled.is_stale(&mine_old, &me, now));
        assert!(!NamingProfile::Labeled.is_stale(&mine_now, &me, now));
        assert!(!NamingProfile::Labeled.is_stale(&theirs_old, &me, now));
        assert!(NamingProfile::Labeled.is_current(&mine_now, &me, now));
    }

    #[test]
    fn test_labeled_rejects_malformed() {
        let me = fp("host");
        assert!(!NamingProfile::Labeled.matches(&format!(".{me}_2025-W10")));
        assert!(!NamingProfile::Labeled.matches(&format!(".{me}_2025-W10_XYZ")));
        assert!(!NamingProfile::Labeled.matches(&format!("{me}_2025-W10_0badc0de")));
    }

    #[test]
    fn test_profile_from_str() {
        assert_eq!("hashed".parse::<NamingProfile>().unwrap(), NamingProfile::Hashed);
        assert_eq!("labeled".parse::<NamingProfile>().unwrap(), NamingProfile::Labeled);
        assert!("disguised".parse::<NamingProfile>().is_err());
    }
}
