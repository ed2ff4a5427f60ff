//! Content freshness.
//!
//! Independent of epoch rotation: an artifact is fresh when its sidecar and
//! file both exist and it was fetched less than one TTL ago.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::artifact::{ArtifactKind, ArtifactMeta};

/// Default TTL for both classes: seven days.
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Per-class time-to-live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    tool: TimeDelta,
    asset: TimeDelta,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_TTL)
    }
}

impl TtlPolicy {
    /// Build a policy from per-class TTLs. Values beyond the representable
    /// range saturate.
    #[must_use]
    pub fn new(tool: Duration, asset: Duration) -> Self {
        Self {
            tool: TimeDelta::from_std(tool).unwrap_or(TimeDelta::MAX),
            asset: TimeDelta::from_std(asset).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Policy from TTLs expressed in hours.
    #[must_use]
    pub fn from_hours(tool_hours: u64, asset_hours: u64) -> Self {
        let hours = |h: u64| Duration::from_secs(h.saturating_mul(3600));
        Self::new(hours(tool_hours), hours(asset_hours))
    }

    /// TTL for a class.
    #[must_use]
    pub fn ttl(&self, kind: ArtifactKind) -> TimeDelta {
        match kind {
            ArtifactKind::Tool => self.tool,
            ArtifactKind::Asset => self.asset,
        }
    }

    /// Whether `meta` describes a usable artifact of class `kind` right now.
    #[must_use]
    pub fn is_valid(&self, meta: Option<&ArtifactMeta>, kind: ArtifactKind) -> bool {
        self.is_valid_at(meta, kind, Utc::now())
    }

    /// Whether `meta` describes a usable artifact of class `kind` at `now`.
    ///
    /// Missing metadata or a missing file is never valid. Otherwise valid iff
    /// `now - fetched_at` is strictly less than the class TTL.
    #[must_use]
    pub fn is_valid_at(
        &self,
        meta: Option<&ArtifactMeta>,
        kind: ArtifactKind,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(meta) = meta else {
            return false;
        };
        if meta.kind != kind || !meta.path.is_file() {
            return false;
        }
        now.signed_duration_since(meta.fetched_at) < self.ttl(kind)
    }

    /// Time left before `meta` expires, if it is still valid at `now`.
    #[must_use]
    pub fn remaining_at(&self, meta: &ArtifactMeta, now: DateTime<Utc>) -> Option<TimeDelta> {
        let age = now.signed_duration_since(meta.fetched_at);
        let left = self.ttl(meta.kind).checked_sub(&age)?;
        (left > TimeDelta::zero()).then_some(left)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn meta_at(path: PathBuf, fetched_at: DateTime<Utc>) -> ArtifactMeta {
        ArtifactMeta {
            id: "merger".to_owned(),
            kind: ArtifactKind::Tool,
            path,
            fetched_at,
            size: 1,
            source: "test".to_owned(),
        }
    }

    #[test]
    fn test_boundary_one_second_each_side() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("tool.bin");
        std::fs::write(&file, b"x").unwrap();

        let policy = TtlPolicy::default();
        let ttl = policy.ttl(ArtifactKind::Tool);
        let fetched = Utc::now();
        let m = meta_at(file, fetched);

        let just_inside = fetched + ttl - TimeDelta::seconds(1);
        let just_outside = fetched + ttl + TimeDelta::seconds(1);
        assert!(policy.is_valid_at(Some(&m), ArtifactKind::Tool, just_inside));
        assert!(!policy.is_valid_at(Some(&m), ArtifactKind::Tool, just_outside));
        assert!(!policy.is_valid_at(Some(&m), ArtifactKind::Tool, fetched + ttl));
    }

    #[test]
    fn test_missing_meta_or_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let policy = TtlPolicy::default();
        assert!(!policy.is_valid(None, ArtifactKind::Tool));

        let m = meta_at(dir.path().join("gone.bin"), Utc::now());
        assert!(!policy.is_valid(Some(&m), ArtifactKind::Tool));
    }

    #[test]
    fn test_class_mismatch_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("tool.bin");
        std::fs::write(&file, b"x").unwrap();
        let m = meta_at(file, Utc::now());
        assert!(!TtlPolicy::default().is_valid(Some(&m), ArtifactKind::Asset));
    }

    #[test]
    fn test_classes_have_independent_ttls() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.js");
        std::fs::write(&file, b"x").unwrap();

        let policy = TtlPolicy::from_hours(168, 24);
        let fetched = Utc::now() - TimeDelta::hours(30);
        let mut m = meta_at(file, fetched);
        m.kind = ArtifactKind::Asset;

        assert!(!policy.is_valid(Some(&m), ArtifactKind::Asset));
        m.kind = ArtifactKind::Tool;
        assert!(policy.is_valid(Some(&m), ArtifactKind::Tool));
    }

    #[test]
    fn test_remaining() {
        let policy = TtlPolicy::from_hours(2, 2);
        let now = Utc::now();
        let m = meta_at(PathBuf::from("/x"), now - TimeDelta::hours(1));
        let left = policy.remaining_at(&m, now).unwrap();
        assert_eq!(left.num_minutes(), 60);
        assert!(policy.remaining_at(&m, now + TimeDelta::hours(2)).is_none());
    }
}
