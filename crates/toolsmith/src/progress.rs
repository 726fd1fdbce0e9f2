//! Download progress bar.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Mutex, PoisonError};
use toolsmith_core::install::{DownloadProgress, ProgressSink};

const TEMPLATE: &str = "{msg:>12} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({eta})";

/// Shows downloads as an `indicatif` bar on stderr.
///
/// A new bar is started for every download attempt.
#[derive(Debug)]
pub struct BarProgress {
    label: String,
    bar: Mutex<Option<ProgressBar>>,
}

impl BarProgress {
    /// Create a sink whose bars are labelled with `label`.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            bar: Mutex::new(None),
        }
    }

    fn start(&self, total: Option<u64>) -> ProgressBar {
        let bar = match total {
            Some(total) => {
                let style = ProgressStyle::with_template(TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> ");
                ProgressBar::new(total).with_style(style)
            }
            None => ProgressBar::new_spinner(),
        };
        bar.set_draw_target(ProgressDrawTarget::stderr());
        bar.set_message(self.label.clone());
        bar
    }
}

impl ProgressSink for BarProgress {
    fn report(&self, progress: DownloadProgress) {
        let mut slot = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        if progress.downloaded == 0 || slot.is_none() {
            if let Some(old) = slot.take() {
                old.finish_and_clear();
            }
            *slot = Some(self.start(progress.total));
        }
        if let Some(bar) = slot.as_ref() {
            bar.set_position(progress.downloaded);
            if let Some(percent) = progress.percent() {
                bar.set_message(format!("{} {percent:>3}%", self.label));
            }
        }
    }

    fn finish(&self) {
        let mut slot = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bar) = slot.take() {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_lifecycle() {
        let sink = BarProgress::new("kn");
        sink.report(DownloadProgress {
            downloaded: 0,
            total: Some(100),
        });
        sink.report(DownloadProgress {
            downloaded: 40,
            total: Some(100),
        });
        assert_eq!(
            sink.bar.lock().unwrap().as_ref().map(ProgressBar::position),
            Some(40)
        );
        assert_eq!(
            sink.bar.lock().unwrap().as_ref().map(ProgressBar::message),
            Some("kn  40%".to_string())
        );

        sink.finish();
        assert!(sink.bar.lock().unwrap().is_none());
    }
}
