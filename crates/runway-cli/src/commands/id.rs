//! `runway id`: show this device's identity.

use anyhow::Result;

use crate::context::CliContext;
use crate::theme::Theme;

/// Print the device id to send to an administrator.
pub(crate) async fn run_id(ctx: &CliContext) -> Result<()> {
    let identity = ctx.identity().await;

    println!("{}", Theme::header("Device identity"));
    println!("{}", Theme::separator());
    println!("  {}", Theme::kv("Device id", identity.raw().expose()));
    println!("  {}", Theme::kv("Fingerprint", identity.fingerprint().as_str()));
    println!("  {}", Theme::kv("Source", &identity.source().to_string()));
    if !identity.source().is_stable() {
        println!();
        println!(
            "{}",
            Theme::warning("No stable host identifier was found; this id may change.")
        );
    }
    Ok(())
}
