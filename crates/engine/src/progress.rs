//! Progress reporting: capacity-1 channel plus a printing consumer task.

use bundlepush_tus::ProgressEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Creates the single-slot progress channel. The producer sends with
/// `try_send`; with one slot, a fast producer simply drops unread ticks —
/// the report is advisory, not an event log.
pub fn progress_channel() -> (mpsc::Sender<ProgressEvent>, mpsc::Receiver<ProgressEvent>) {
    mpsc::channel(1)
}

/// Spawns the consumer task: one timestamped stdout line per event, in
/// emission order. The task ends when every sender is dropped.
pub fn spawn_reporter(mut rx: mpsc::Receiver<ProgressEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            println!(
                "{} Completed {:.0}% {} Bytes of {} Bytes",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                event.percentage(),
                event.offset,
                event.total
            );
        }
    })
}
