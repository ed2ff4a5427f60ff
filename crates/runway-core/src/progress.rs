//! Progress reporting shared by fetch, provisioning and launch.
//!
//! Producers call [`ProgressSink::report`] with a percentage in `0..=100`
//! and a short status message. Sinks must tolerate being called before any
//! user interface exists; [`NoProgress`] discards everything.

use std::fmt;

/// Receiver for progress updates.
pub trait ProgressSink: Send + Sync {
    /// Report progress. `percent` is clamped to `0.0..=100.0` by callers
    /// that use [`ProgressRange`].
    fn report(&self, percent: f32, message: &str);
}

/// Sink that ignores every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _percent: f32, _message: &str) {}
}

/// Adapts a closure into a [`ProgressSink`].
pub struct FnProgress<F>(pub F);

impl<F> ProgressSink for FnProgress<F>
where
    F: Fn(f32, &str) + Send + Sync,
{
    fn report(&self, percent: f32, message: &str) {
        (self.0)(percent, message);
    }
}

impl<F> fmt::Debug for FnProgress<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnProgress")
    }
}

/// Maps a sub-operation's `0..=100` scale onto a slice of an outer scale.
///
/// The launcher reserves `0..30` for provisioning and `30..95` for the
/// download; each step reports against its own full range.
pub struct ProgressRange<'a> {
    inner: &'a dyn ProgressSink,
    start: f32,
    end: f32,
}

impl<'a> ProgressRange<'a> {
    /// Create a range forwarding to `inner`, mapping `0..=100` onto
    /// `start..=end`.
    #[must_use]
    pub fn new(inner: &'a dyn ProgressSink, start: f32, end: f32) -> Self {
        let start = start.clamp(0.0, 100.0);
        let end = end.clamp(start, 100.0);
        Self { inner, start, end }
    }

    /// Report a fraction in `0.0..=1.0` of this range.
    pub fn fraction(&self, fraction: f32, message: &str) {
        self.report(fraction.clamp(0.0, 1.0) * 100.0, message);
    }
}

impl ProgressSink for ProgressRange<'_> {
    fn report(&self, percent: f32, message: &str) {
        let p = percent.clamp(0.0, 100.0) / 100.0;
        self.inner
            .report(self.start + (self.end - self.start) * p, message);
    }
}

impl fmt::Debug for ProgressRange<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressRange")
            .field("start", &self.start)
            .field("end", &self.end)
            .finish_non_exhaustive()
    }
}

/// Render a byte count as a human-readable size (`512 B`, `1.5 MB`).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if size < 1024.0 {
            break;
        }
        size /= 1024.0;
        unit = next;
    }
    format!("{size:.1} {unit}")
}
