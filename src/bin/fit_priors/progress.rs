/// Progress bar over the distributions being fitted to each param
pub (super) struct FitProgress {
    bar: ProgressBar,
    failed: Mutex<Vec<String>>,
}

impl FitProgress {

    pub (super) fn new() -> Result<Self, Box<dyn Error>> {
        let bar = ProgressBar::new(0);
        bar.set_style(ProgressStyle::default_bar()
                      .template("Fitting: {msg}\n[{elapsed_precise}] {wide_bar} {pos}/{len} ({eta_precise})")?
        );
        Ok(Self { bar, failed: Mutex::new(vec![]) })
    }

    pub (super) fn final_report(&self) {
        self.bar.finish_and_clear();
        let failed = self.failed.lock().map(|f| f.clone()).unwrap_or_default();
        if !failed.is_empty() {
            println!("{} fits failed or timed out: {}", failed.len(), failed.join(" "));
        }
    }
}

impl FitMonitor for FitProgress {

    fn fitting(&self, names: &[&str]) {
        self.bar.reset();
        self.bar.set_length(names.len() as u64);
        self.bar.set_message(names.join(" "));
    }

    fn finished(&self, name: &str, succeeded: bool) {
        if !succeeded {
            if let Ok(mut failed) = self.failed.lock() { failed.push(name.to_string()) }
        }
        self.bar.inc(1);
    }
}

// ----- Imports -----------------------------------------------------------------------------------------
use std::sync::Mutex;
use std::error::Error;
use indicatif::{ProgressBar, ProgressStyle};
use retro::fit::FitMonitor;
