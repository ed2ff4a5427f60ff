//! Machine identity derivation.
//!
//! A [`MachineIdentity`] pairs a public [`MachineFingerprint`] (16 hex
//! characters of a SHA-256 digest) with the [`RawIdentity`] it was derived
//! from. The fingerprint names and locates the cache; the raw value is what
//! device authorization compares against and what users read out to an
//! administrator.
//!
//! Sources are tried in order:
//!
//! 1. A platform identifier (registry `MachineGuid` or SMBIOS UUID on
//!    Windows, `IOPlatformUUID` on macOS, `machine-id` on Linux/Unix).
//! 2. A composite of hostname, OS, architecture and the first hardware
//!    address that can be read.
//! 3. A random UUID, persisted when a fallback path is configured.
//!
//! Detection never fails. Every detection failure degrades to the next source.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Number of hex characters kept from the digest.
pub const FINGERPRINT_LEN: usize = 16;

/// Default timeout for identity subprocesses.
pub const DEFAULT_DETECT_TIMEOUT: Duration = Duration::from_secs(5);

static CURRENT: OnceCell<MachineIdentity> = OnceCell::const_new();

/// Public, fixed-length per-host identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineFingerprint(String);

impl MachineFingerprint {
    /// Derive the fingerprint for a raw identity value.
    #[must_use]
    pub fn derive(raw: &str) -> Self {
        let digest = hex::encode(Sha256::digest(raw.as_bytes()));
        Self(digest[..FINGERPRINT_LEN].to_owned())
    }

    /// Parse an existing fingerprint string (16 lowercase hex characters).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        (s.len() == FINGERPRINT_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')))
            .then(|| Self(s.to_owned()))
    }

    /// The fingerprint as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, used for short file names.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Display for MachineFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The un-hashed identity value. Kept in memory only.
#[derive(Clone, PartialEq, Eq)]
pub struct RawIdentity(String);

impl RawIdentity {
    /// Wrap a raw identity value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value, for display and authorization comparison.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RawIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawIdentity(***)")
    }
}

/// Where the identity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    /// A stable platform identifier. The string names the source.
    Platform(&'static str),
    /// Hostname/OS/architecture/hardware-address composite.
    HostComposite,
    /// Random identifier read back from (or just written to) the fallback file.
    PersistedRandom,
    /// Random identifier that could not be persisted. Changes every run.
    EphemeralRandom,
}

impl IdentitySource {
    /// Whether the identity is expected to survive a process restart.
    #[must_use]
    pub fn is_stable(self) -> bool {
        !matches!(self, Self::EphemeralRandom)
    }
}

impl fmt::Display for IdentitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Platform(name) => write!(f, "platform ({name})"),
            Self::HostComposite => write!(f, "host composite"),
            Self::PersistedRandom => write!(f, "random (persisted)"),
            Self::EphemeralRandom => write!(f, "random (ephemeral)"),
        }
    }
}

/// Knobs for identity detection.
#[derive(Debug, Clone)]
pub struct IdentityOptions {
    /// Timeout applied to each identity subprocess.
    pub detect_timeout: Duration,
    /// Where to persist a random identity. `None` disables persistence.
    pub fallback_path: Option<PathBuf>,
}

impl Default for IdentityOptions {
    fn default() -> Self {
        Self {
            detect_timeout: DEFAULT_DETECT_TIMEOUT,
            fallback_path: None,
        }
    }
}

/// A derived machine identity.
#[derive(Debug, Clone)]
pub struct MachineIdentity {
    fingerprint: MachineFingerprint,
    raw: RawIdentity,
    source: IdentitySource,
}

impl MachineIdentity {
    /// Build an identity from a known raw value.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>, source: IdentitySource) -> Self {
        let raw = raw.into();
        Self {
            fingerprint: MachineFingerprint::derive(&raw),
            raw: RawIdentity(raw),
            source,
        }
    }

    /// Identity for the current process, detected once and memoized.
    ///
    /// The options passed to the first caller win.
    pub async fn current(options: &IdentityOptions) -> &'static Self {
        CURRENT.get_or_init(|| Self::detect(options)).await
    }

    /// Run the detection chain without memoization.
    pub async fn detect(options: &IdentityOptions) -> Self {
        if let Some((raw, name)) = query_platform(options.detect_timeout).await {
            debug!(platform = name, "machine identity from platform identifier");
            return Self::from_raw(raw, IdentitySource::Platform(name));
        }

        if let Some(raw) = host_composite() {
            debug!("machine identity from host composite");
            return Self::from_raw(raw, IdentitySource::HostComposite);
        }

        let (raw, source) = random_fallback(options.fallback_path.as_deref());
        warn!(%source, "no stable host identifier available; using random identity");
        Self::from_raw(raw, source)
    }

    /// The public fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> &MachineFingerprint {
        &self.fingerprint
    }

    /// The raw identity value.
    #[must_use]
    pub fn raw(&self) -> &RawIdentity {
        &self.raw
    }

    /// Where the identity came from.
    #[must_use]
    pub fn source(&self) -> IdentitySource {
        self.source
    }
}

// ---------------------------------------------------------------------------
// Platform queries
// ---------------------------------------------------------------------------

#[cfg(windows)]
async fn query_platform(timeout: Duration) -> Option<(String, &'static str)> {
    if let Some(out) = run_query(
        "reg",
        &[
            "query",
            r"HKLM\SOFTWARE\Microsoft\Cryptography",
            "/v",
            "MachineGuid",
        ],
        timeout,
    )
    .await
        && let Some(guid) = parse_reg_machine_guid(&out)
    {
        return Some((guid, "registry MachineGuid"));
    }
    let out = run_query("wmic", &["csproduct", "get", "UUID"], timeout).await?;
    parse_wmic_uuid(&out).map(|uuid| (uuid, "wmic csproduct UUID"))
}

#[cfg(target_os = "macos")]
async fn query_platform(timeout: Duration) -> Option<(String, &'static str)> {
    let out = run_query("ioreg", &["-rd1", "-c", "IOPlatformExpertDevice"], timeout).await?;
    parse_ioreg_platform_uuid(&out).map(|uuid| (uuid, "IOPlatformUUID"))
}

#[cfg(all(unix, not(target_os = "macos")))]
async fn query_platform(_timeout: Duration) -> Option<(String, &'static str)> {
    for path in ["/etc/machine-id", "/var/lib/dbus/machine-id"] {
        if let Ok(content) = std::fs::read_to_string(path)
            && let Some(id) = parse_machine_id(&content)
        {
            return Some((id, "machine-id"));
        }
    }
    None
}

#[cfg(not(any(unix, windows)))]
async fn query_platform(_timeout: Duration) -> Option<(String, &'static str)> {
    None
}

/// Run a query command and return its stdout if it exits successfully
/// within `timeout`.
#[allow(dead_code)]
async fn run_query(program: &str, args: &[&str], timeout: Duration) -> Option<String> {
    let mut cmd = tokio::process::Command::new(program);
    cmd.args(args)
        .stdin(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .kill_on_drop(true);

    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        },
        Ok(Ok(output)) => {
            debug!(program, status = %output.status, "identity query exited unsuccessfully");
            None
        },
        Ok(Err(e)) => {
            debug!(program, error = %e, "identity query could not run");
            None
        },
        Err(_) => {
            debug!(program, timeout_secs = timeout.as_secs(), "identity query timed out");
            None
        },
    }
}

/// Extract the value from `reg query ... /v MachineGuid` output.
#[must_use]
pub fn parse_reg_machine_guid(output: &str) -> Option<String> {
    output
        .lines()
        .find(|line| line.contains("MachineGuid"))
        .and_then(|line| line.split_whitespace().last())
        .filter(|v| !v.eq_ignore_ascii_case("MachineGuid"))
        .and_then(usable_uuid)
}

/// Extract the UUID from `wmic csproduct get UUID` output.
#[must_use]
pub fn parse_wmic_uuid(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.eq_ignore_ascii_case("UUID"))
        .find_map(usable_uuid)
}

/// Extract `IOPlatformUUID` from `ioreg -rd1 -c IOPlatformExpertDevice`.
#[must_use]
pub fn parse_ioreg_platform_uuid(output: &str) -> Option<String> {
    let line = output.lines().find(|l| l.contains("\"IOPlatformUUID\""))?;
    let (_, value) = line.split_once('=')?;
    usable_uuid(value.trim().trim_matches('"'))
}

/// Validate the content of a `machine-id` file and render it in the
/// hyphenated 8-4-4-4-12 form, so it can appear on a device allow-list.
#[must_use]
pub fn parse_machine_id(content: &str) -> Option<String> {
    let id = content.trim();
    if id.len() != 32 || !id.chars().all(|c| c.is_ascii_hexdigit()) || is_degenerate(id) {
        return None;
    }
    uuid::Uuid::try_parse(id)
        .ok()
        .map(|u| u.hyphenated().to_string())
}

/// Reject empty values and the all-zero / all-F placeholders some firmware
/// reports instead of a real UUID.
fn usable_uuid(value: &str) -> Option<String> {
    let v = value.trim();
    if v.is_empty() || is_degenerate(v) {
        return None;
    }
    uuid::Uuid::parse_str(v).ok().map(|_| v.to_owned())
}

fn is_degenerate(v: &str) -> bool {
    let digits: Vec<char> = v.chars().filter(char::is_ascii_hexdigit).collect();
    digits.is_empty()
        || digits.iter().all(|c| *c == '0')
        || digits.iter().all(|c| c.eq_ignore_ascii_case(&'f'))
}

// ---------------------------------------------------------------------------
// Host composite
// ---------------------------------------------------------------------------

fn host_composite() -> Option<String> {
    let hostname = hostname()?;
    let mut fields = BTreeMap::new();
    fields.insert("arch", std::env::consts::ARCH.to_owned());
    fields.insert("hostname", hostname);
    fields.insert("os", std::env::consts::OS.to_owned());
    if let Some(mac) = first_hardware_address() {
        fields.insert("mac", mac);
    }
    serde_json::to_string(&fields).ok()
}

#[cfg(unix)]
fn hostname() -> Option<String> {
    nix::unistd::gethostname()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.is_empty())
}

#[cfg(not(unix))]
fn hostname() -> Option<String> {
    std::env::var("COMPUTERNAME").ok().filter(|h| !h.is_empty())
}

#[cfg(target_os = "linux")]
fn first_hardware_address() -> Option<String> {
    let mut addrs: Vec<String> = std::fs::read_dir("/sys/class/net")
        .ok()?
        .filter_map(Result::ok)
        .filter(|e| e.file_name() != "lo")
        .filter_map(|e| std::fs::read_to_string(e.path().join("address")).ok())
        .map(|a| a.trim().to_ascii_lowercase())
        .filter(|a| !a.is_empty() && a != "00:00:00:00:00:00")
        .collect();
    addrs.sort();
    addrs.into_iter().next()
}

#[cfg(not(target_os = "linux"))]
fn first_hardware_address() -> Option<String> {
    None
}

// ---------------------------------------------------------------------------
// Random fallback
// ---------------------------------------------------------------------------

fn random_fallback(path: Option<&Path>) -> (String, IdentitySource) {
    let Some(path) = path else {
        return (uuid::Uuid::new_v4().to_string(), IdentitySource::EphemeralRandom);
    };

    if let Ok(content) = std::fs::read_to_string(path)
        && let Ok(id) = uuid::Uuid::parse_str(content.trim())
    {
        return (id.to_string(), IdentitySource::PersistedRandom);
    }

    let id = uuid::Uuid::new_v4().to_string();
    let persisted = path
        .parent()
        .map_or(Ok(()), std::fs::create_dir_all)
        .and_then(|()| std::fs::write(path, &id));
    match persisted {
        Ok(()) => (id, IdentitySource::PersistedRandom),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not persist fallback identity");
            (id, IdentitySource::EphemeralRandom)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_sixteen_hex_chars() {
        let fp = MachineFingerprint::derive("3dc6a97e-2166-48b5-ab74-92bbc1674ec5");
        assert_eq!(fp.as_str().len(), FINGERPRINT_LEN);
        assert!(MachineFingerprint::parse(fp.as_str()).is_some());
        assert_eq!(fp.short().len(), 8);
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = MachineIdentity::from_raw("host-a", IdentitySource::HostComposite);
        let b = MachineIdentity::from_raw("host-a", IdentitySource::HostComposite);
        let c = MachineIdentity::from_raw("host-b", IdentitySource::HostComposite);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_fingerprint_matches_sha256_prefix() {
        // sha256("abc") = ba7816bf8f01cfea414140de5dae2223...
        assert_eq!(MachineFingerprint::derive("abc").as_str(), "ba7816bf8f01cfea");
    }

    #[test]
    fn test_fingerprint_parse_rejects_bad_input() {
        assert!(MachineFingerprint::parse("ABCDEF0123456789").is_none());
        assert!(MachineFingerprint::parse("abc").is_none());
        assert!(MachineFingerprint::parse("zzzzzzzzzzzzzzzz").is_none());
    }

    #[test]
    fn test_raw_identity_debug_is_redacted() {
        let id = MachineIdentity::from_raw(
            "29AC32F9-0DD1-4C04-8F37-BAD0892D1E84",
            IdentitySource::Platform("test"),
        );
        let dbg = format!("{id:?}");
        assert!(!dbg.contains("29AC32F9"));
        assert_eq!(id.raw().expose(), "29AC32F9-0DD1-4C04-8F37-BAD0892D1E84");
    }

    #[test]
    fn test_parse_wmic_uuid() {
        let out = "UUID                                  \r\n4C4C4544-0038-3010-8052-B4C04F4E4B32  \r\n\r\n";
        assert_eq!(
            parse_wmic_uuid(out).as_deref(),
            Some("4C4C4544-0038-3010-8052-B4C04F4E4B32")
        );
        let bogus = "UUID\nFFFFFFFF-FFFF-FFFF-FFFF-FFFFFFFFFFFF\n";
        assert!(parse_wmic_uuid(bogus).is_none());
    }

    #[test]
    fn test_parse_reg_machine_guid() {
        let out = "\r\nHKEY_LOCAL_MACHINE\\SOFTWARE\\Microsoft\\Cryptography\r\n    MachineGuid    REG_SZ    fb5668ca-b429-4a4f-8cc6-83c6adeeceaf\r\n";
        assert_eq!(
            parse_reg_machine_guid(out).as_deref(),
            Some("fb5668ca-b429-4a4f-8cc6-83c6adeeceaf")
        );
        assert!(parse_reg_machine_guid("nothing here").is_none());
    }

    #[test]
    fn test_parse_ioreg_platform_uuid() {
        let out = r#"+-o MacBookPro18,3  <class IOPlatformExpertDevice>
    {
      "IOPlatformSerialNumber" = "C02XXXXX"
      "IOPlatformUUID" = "3DC6A97E-2166-48B5-AB74-92BBC1674EC5"
    }"#;
        assert_eq!(
            parse_ioreg_platform_uuid(out).as_deref(),
            Some("3DC6A97E-2166-48B5-AB74-92BBC1674EC5")
        );
    }

    #[test]
    fn test_parse_machine_id() {
        assert_eq!(
            parse_machine_id("b08dfa6083e7567a1921a715000001fb\n").as_deref(),
            Some("b08dfa60-83e7-567a-1921-a715000001fb")
        );
        assert_eq!(
            parse_machine_id("B08DFA6083E7567A1921A715000001FB").as_deref(),
            Some("b08dfa60-83e7-567a-1921-a715000001fb")
        );
        assert!(parse_machine_id("b08dfa6083e7567a").is_none());
        assert!(parse_machine_id("").is_none());
        assert!(parse_machine_id("00000000000000000000000000000000").is_none());
        assert!(parse_machine_id("not-a-machine-id").is_none());
    }

    #[test]
    fn test_random_fallback_persists_and_reuses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity").join("fallback-id");

        let (first, source) = random_fallback(Some(&path));
        assert_eq!(source, IdentitySource::PersistedRandom);
        let (second, _) = random_fallback(Some(&path));
        assert_eq!(first, second);
    }

    #[test]
    fn test_random_fallback_without_path_is_ephemeral() {
        let (_, source) = random_fallback(None);
        assert_eq!(source, IdentitySource::EphemeralRandom);
        assert!(!source.is_stable());
    }

    #[tokio::test]
    async fn test_detect_is_stable_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let options = IdentityOptions {
            fallback_path: Some(dir.path().join("fallback-id")),
            ..IdentityOptions::default()
        };
        let a = MachineIdentity::detect(&options).await;
        let b = MachineIdentity::detect(&options).await;
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.source(), b.source());
    }

    #[tokio::test]
    async fn test_current_is_memoized() {
        let options = IdentityOptions::default();
        let a = MachineIdentity::current(&options).await;
        let b = MachineIdentity::current(&options).await;
        assert!(std::ptr::eq(a, b));
    }
}
