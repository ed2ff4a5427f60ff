//! Background jobs with terminal progress.
//!
//! Long operations run on a spawned task and never touch the terminal. They
//! report through a [`ChannelProgress`] sink; the foreground drains the
//! channel into an `indicatif` bar with [`follow`]. Ctrl-C while following
//! abandons the wait and leaves the task to finish on its own.

use std::future::Future;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use runway_core::ProgressSink;
use tokio::sync::mpsc;

/// One message from a background job.
#[derive(Debug)]
pub(crate) enum JobEvent<T> {
    /// Intermediate progress.
    Progress {
        /// Overall percentage.
        percent: f32,
        /// Status line.
        message: String,
    },
    /// Final result.
    Done(T),
}

/// [`ProgressSink`] that forwards reports over a job's channel.
///
/// Reports after the receiver is gone are dropped.
#[derive(Debug)]
pub(crate) struct ChannelProgress<T> {
    tx: mpsc::UnboundedSender<JobEvent<T>>,
}

impl<T: Send> ProgressSink for ChannelProgress<T> {
    fn report(&self, percent: f32, message: &str) {
        let _ = self.tx.send(JobEvent::Progress {
            percent,
            message: message.to_owned(),
        });
    }
}

/// Run `job` on a background task.
///
/// The returned receiver yields the job's progress followed by exactly one
/// [`JobEvent::Done`]. Dropping it discards the result.
pub(crate) fn spawn_job<T, F, Fut>(job: F) -> mpsc::UnboundedReceiver<JobEvent<T>>
where
    T: Send + 'static,
    F: FnOnce(ChannelProgress<T>) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let task = job(ChannelProgress { tx: tx.clone() });
    tokio::spawn(async move {
        let value = task.await;
        let _ = tx.send(JobEvent::Done(value));
    });
    rx
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn position(percent: f32) -> u64 {
    percent.clamp(0.0, 100.0).round() as u64
}

fn progress_bar(label: &str) -> ProgressBar {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
            .expect("valid progress template")
            .progress_chars("=> "),
    );
    bar.set_prefix(label.to_owned());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// Drain a job's events into a progress bar until it finishes.
///
/// Returns `None` if the user pressed Ctrl-C or the job went away without a
/// result.
pub(crate) async fn follow<T>(label: &str, mut rx: mpsc::UnboundedReceiver<JobEvent<T>>) -> Option<T> {
    let bar = progress_bar(label);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(JobEvent::Progress { percent, message }) => {
                    bar.set_position(position(percent));
                    bar.set_message(message);
                },
                Some(JobEvent::Done(value)) => {
                    bar.finish_and_clear();
                    return Some(value);
                },
                None => {
                    bar.abandon_with_message("job ended without a result");
                    return None;
                },
            },
            _ = &mut ctrl_c => {
                bar.abandon_with_message("abandoned; the transfer finishes in the background");
                return None;
            },
        }
    }
}
