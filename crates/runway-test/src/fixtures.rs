//! Fixtures for common types.

use std::path::PathBuf;

use runway_core::{IdentitySource, MachineIdentity};
use runway_fetch::SourceLocator;
use runway_launcher::{AssetSpec, Catalog, ToolId, ToolSpec};

/// Raw identity used by [`test_identity`].
pub const TEST_DEVICE_ID: &str = "4c4c4544-0042-3510-8052-b4c04f4d4e31";

/// Identity with a fixed platform identifier.
#[must_use]
pub fn test_identity() -> MachineIdentity {
    MachineIdentity::from_raw(TEST_DEVICE_ID, IdentitySource::Platform("test"))
}

/// Identity with the given raw value.
#[must_use]
pub fn test_identity_from(raw: &str) -> MachineIdentity {
    MachineIdentity::from_raw(raw, IdentitySource::Platform("test"))
}

/// Tool id from a literal.
///
/// # Panics
///
/// Panics if `id` is not a valid tool id.
#[must_use]
pub fn tool_id(id: &str) -> ToolId {
    ToolId::parse(id).expect("invalid tool id")
}

/// Directly executed tool fetched from `acme/tools/{id}.sh`.
///
/// # Panics
///
/// Panics if `id` is not a valid tool id.
#[must_use]
pub fn test_tool(id: &str) -> ToolSpec {
    let file = format!("{id}.sh");
    let source = SourceLocator::repo("acme", "tools", file.clone()).expect("invalid locator");
    ToolSpec::new(tool_id(id), source, file)
}

/// Asset fetched from `acme/web/{file}`.
///
/// # Panics
///
/// Panics if `file` is not a valid locator path.
#[must_use]
pub fn test_asset(id: &str, file: &str, bundled: Option<PathBuf>) -> AssetSpec {
    AssetSpec {
        id: id.to_owned(),
        source: SourceLocator::repo("acme", "web", file).expect("invalid locator"),
        file_name: file.to_owned(),
        bundled,
    }
}

/// Catalog of directly executed tools.
#[must_use]
pub fn test_catalog(ids: &[&str]) -> Catalog {
    Catalog::new(ids.iter().map(|id| test_tool(id)).collect(), Vec::new())
}

/// Authorization asset text listing `ids`, in the shape of a web config file.
#[must_use]
pub fn device_list(ids: &[&str]) -> String {
    let quoted: Vec<String> = ids.iter().map(|id| format!("    \"{id}\",")).collect();
    format!("window.AUTHORIZED_DEVICES = [\n{}\n];\n", quoted.join("\n"))
}
