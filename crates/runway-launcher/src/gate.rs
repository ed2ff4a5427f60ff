//! Device authorization gate.
//!
//! The allow-list is any text containing GUID-shaped device ids. An absent
//! asset or one with no ids leaves the gate open; otherwise the device's raw
//! identity must be listed (case-insensitively).
//!
//! The gate is consumed by [`DeviceAuthorizationGate::authorize`], and the
//! [`Authorized`] token it yields is the only way to build a
//! [`Launcher`](crate::Launcher).

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use runway_core::MachineIdentity;
use tracing::{info, warn};

use crate::error::GateError;

static DEVICE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}\b")
        .expect("invalid regex")
});

/// Device ids extracted from an authorization asset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    ids: HashSet<String>,
}

impl AllowList {
    /// Extract every GUID-shaped token from `text`, lower-cased.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        Self {
            ids: DEVICE_ID
                .find_iter(text)
                .map(|m| m.as_str().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Whether the list has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of distinct entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Case-insensitive membership.
    #[must_use]
    pub fn contains(&self, device_id: &str) -> bool {
        self.ids.contains(&device_id.trim().to_ascii_lowercase())
    }
}

/// How the gate decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationMode {
    /// No authorization asset was available.
    NoAsset,
    /// The asset lists no devices.
    NotConfigured,
    /// The device is listed among `entries` devices.
    Listed {
        /// Size of the allow-list.
        entries: usize,
    },
}

impl AuthorizationMode {
    /// Whether any device would have been accepted.
    #[must_use]
    pub fn is_open(self) -> bool {
        !matches!(self, Self::Listed { .. })
    }
}

/// Proof that the device passed the gate.
///
/// Has no public constructor.
#[derive(Debug, Clone, Copy)]
pub struct Authorized {
    mode: AuthorizationMode,
}

impl Authorized {
    /// How authorization was granted.
    #[must_use]
    pub fn mode(&self) -> AuthorizationMode {
        self.mode
    }
}

/// One-shot authorization check.
#[derive(Debug)]
pub struct DeviceAuthorizationGate {
    list: Option<AllowList>,
}

impl DeviceAuthorizationGate {
    /// Gate over the content of the authorization asset, `None` when no
    /// copy could be found.
    #[must_use]
    pub fn from_asset(text: Option<&str>) -> Self {
        Self {
            list: text.map(AllowList::parse),
        }
    }

    /// The decision this gate would make, without consuming it.
    #[must_use]
    pub fn mode_for(&self, device_id: &str) -> Option<AuthorizationMode> {
        match &self.list {
            None => Some(AuthorizationMode::NoAsset),
            Some(list) if list.is_empty() => Some(AuthorizationMode::NotConfigured),
            Some(list) if list.contains(device_id) => Some(AuthorizationMode::Listed {
                entries: list.len(),
            }),
            Some(_) => None,
        }
    }

    /// Whether `device_id` would be admitted.
    #[must_use]
    pub fn is_authorized(&self, device_id: &str) -> bool {
        self.mode_for(device_id).is_some()
    }

    /// Evaluate the gate for this machine.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Denied`] when the allow-list is non-empty and
    /// does not contain the machine's raw identity.
    pub fn authorize(self, identity: &MachineIdentity) -> Result<Authorized, GateError> {
        let device_id = identity.raw().expose();
        match self.mode_for(device_id) {
            Some(mode) => {
                match mode {
                    AuthorizationMode::NoAsset => {
                        warn!("authorization asset unavailable; running without device check");
                    },
                    AuthorizationMode::NotConfigured => {
                        info!("authorization list is empty; all devices allowed");
                    },
                    AuthorizationMode::Listed { entries } => {
                        info!(entries, "device authorized");
                    },
                }
                Ok(Authorized { mode })
            },
            None => {
                warn!(fingerprint = %identity.fingerprint(), "device not on authorization list");
                Err(GateError::Denied {
                    device_id: device_id.to_owned(),
                    fingerprint: identity.fingerprint().to_string(),
                })
            },
        }
    }
}
