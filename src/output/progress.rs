use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright, bright_green, bright_yellow};

/// Spinner for the three phases of a batch: runs, timelines and logs, analysis.
pub struct PhaseProgress {
    pb: ProgressBar,
}

impl PhaseProgress {
    pub fn start_fetching_runs() -> Self {
        eprintln!("{}  {}", bright("⚙️"), bright("Phases").underlined());
        let pb = create_spinner(bright_yellow("Phase 1/3: Fetching runs").to_string());
        Self { pb }
    }

    pub fn finish_runs_start_timelines(self, run_count: usize) -> Self {
        self.pb.finish_with_message(
            bright_green(format!("Phase 1/3: Fetched {run_count} runs ✓")).to_string(),
        );
        let pb = create_spinner(
            bright_yellow("Phase 2/3: Fetching timelines and build logs").to_string(),
        );
        Self { pb }
    }

    pub fn finish_timelines_start_analysis(self) -> Self {
        self.pb.finish_with_message(
            bright_green("Phase 2/3: Fetched timelines and build logs ✓").to_string(),
        );
        let pb = create_spinner(bright_yellow("Phase 3/3: Computing statistics").to_string());
        Self { pb }
    }

    pub fn finish_analysis(self) {
        self.pb
            .finish_with_message(bright_green("Phase 3/3: Statistics computed ✓").to_string());
        eprintln!();
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
