use indicatif::{HumanDuration, ProgressBar};
use std::time::{Duration, Instant};

/// Spinner shown while graphs are built or a question is embedded.
///
/// Hidden when stdout is not a terminal or in JSON mode.
pub struct Spinner {
    pb: ProgressBar,
    started: Instant,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = if console::Term::stdout().is_term() {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Self {
            pb,
            started: Instant::now(),
        }
    }

    pub fn hidden() -> Self {
        Self {
            pb: ProgressBar::hidden(),
            started: Instant::now(),
        }
    }

    /// Finish with the message and the elapsed time
    pub fn finish_with_message(&self, msg: &str) {
        self.pb
            .finish_with_message(format!("{} ({})", msg, HumanDuration(self.started.elapsed())));
    }

    pub fn clear(&self) {
        self.pb.finish_and_clear();
    }
}
