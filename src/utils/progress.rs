use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner per source while `ingest` runs.
pub struct ProgressReporter {
    multi: Option<MultiProgress>,
}

impl ProgressReporter {
    pub fn new(silent: bool) -> Self {
        Self {
            multi: (!silent).then(MultiProgress::new),
        }
    }

    pub fn spinner(&self, source_name: &str) -> SourceProgress {
        let bar = self.multi.as_ref().map(|multi| {
            let pb = multi.add(ProgressBar::new_spinner());
            if let Ok(style) =
                ProgressStyle::default_spinner().template("{spinner:.green} {prefix:>12} {msg}")
            {
                pb.set_style(style);
            }
            pb.set_prefix(source_name.to_string());
            pb.set_message("loading history...");
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        SourceProgress { bar }
    }
}

pub struct SourceProgress {
    bar: Option<ProgressBar>,
}

impl SourceProgress {
    pub fn set_message(&self, message: &str) {
        if let Some(ref pb) = self.bar {
            pb.set_message(message.to_string());
        }
    }

    pub fn finish_with_message(&self, message: &str) {
        if let Some(ref pb) = self.bar {
            pb.finish_with_message(message.to_string());
        }
    }
}

impl Drop for SourceProgress {
    fn drop(&mut self) {
        if let Some(ref pb) = self.bar {
            if !pb.is_finished() {
                pb.finish_and_clear();
            }
        }
    }
}
