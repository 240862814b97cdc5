//! Terminal Spinner
//!
//! Purely cosmetic progress indicator running as a background task. It is
//! cancelled through a flag checked on every animation tick and carries no
//! data the pipeline reads back.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use console::{Term, style};
use tokio::task::JoinHandle;

const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const TICK: Duration = Duration::from_millis(80);

pub struct Spinner {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Spinner {
    /// Start animating `message` on stderr.
    pub fn start(message: impl Into<String>) -> Self {
        let message = message.into();
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = tokio::spawn(async move {
            let term = Term::stderr();
            let mut frame = 0usize;
            while flag.load(Ordering::Relaxed) {
                // Terminal writes are best-effort; a closed stderr must not
                // disturb the run.
                let _ = term.clear_line();
                let _ = term.write_str(&format!(
                    "{} {}",
                    style(FRAMES[frame % FRAMES.len()]).cyan(),
                    message
                ));
                frame += 1;
                tokio::time::sleep(TICK).await;
            }
            let _ = term.clear_line();
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Stop the animation and print a final status line.
    pub async fn finish(mut self, message: &str) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        let term = Term::stderr();
        let _ = term.write_line(message);
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spinner_cancels_cleanly() {
        let spinner = Spinner::start("working");
        tokio::time::sleep(Duration::from_millis(10)).await;
        spinner.finish("done").await;
    }

    #[tokio::test]
    async fn test_spinner_drop_stops_task() {
        let spinner = Spinner::start("working");
        drop(spinner);
    }
}
