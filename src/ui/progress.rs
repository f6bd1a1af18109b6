use crate::ui::progress_message::{ProgressMessage, ProgressPhase};
use crate::ui::theme;
use crate::ui::Icons;
use indicatif::{HumanDuration, MultiProgress, ProgressBar};
use owo_colors::OwoColorize;
use std::thread;
use std::time::Duration;

/// Renders enumerator progress messages as spinners.
pub struct ProgressManager {
    mp: MultiProgress,
    _handle: thread::JoinHandle<()>,
}

fn spinner(mp: &MultiProgress, message: &str) -> ProgressBar {
    if console::Term::stdout().is_term() {
        mp.add(ProgressBar::new_spinner().with_message(message.to_string()))
    } else {
        ProgressBar::hidden()
    }
}

fn bar_index(phase: ProgressPhase) -> usize {
    match phase {
        ProgressPhase::Discovery => 0,
        ProgressPhase::Enumeration => 1,
        ProgressPhase::Cache => 2,
    }
}

impl ProgressManager {
    pub fn new() -> (Self, crossbeam::channel::Sender<ProgressMessage>) {
        let (tx, rx) = crossbeam::channel::unbounded::<ProgressMessage>();

        let mp = MultiProgress::new();
        let bars = [
            spinner(&mp, "Discovering modules"),
            spinner(&mp, "Enumerating routes"),
            spinner(&mp, "Writing route cache"),
        ];

        let handle = thread::spawn(move || {
            for msg in rx {
                match msg {
                    ProgressMessage::Started { phase, total } => {
                        let pb = &bars[bar_index(phase)];
                        if phase == ProgressPhase::Enumeration {
                            pb.set_message(format!("Enumerating routes in {} modules", total));
                        }
                        pb.enable_steady_tick(Duration::from_millis(100));
                    }
                    ProgressMessage::Progress { phase, current, item } => {
                        let pb = &bars[bar_index(phase)];
                        pb.set_position(current as u64);
                        if let Some(item) = item {
                            pb.set_message(format!("{} routes: {}", current, item));
                        }
                    }
                    ProgressMessage::Finished { phase } => {
                        bars[bar_index(phase)].finish_with_message("Done");
                    }
                    ProgressMessage::Warning(text) => {
                        let _ = bars[1].println(format!("{} {}", Icons::WARN, text.style(theme().warn.clone())));
                    }
                }
            }
        });

        (Self { mp, _handle: handle }, tx)
    }

    pub fn clear(&self) {
        self.mp.clear().ok();
    }

    pub fn finish_with_summary(&self, duration: Duration, modules: usize, routes: usize) {
        self.clear();
        println!();
        println!(
            "{} {}",
            Icons::CHECK.style(theme().success.clone()),
            format!("Complete in {}", HumanDuration(duration)).style(theme().success.clone())
        );
        println!(
            "  {} {}  {} {}",
            Icons::PACKAGE.style(theme().info.clone()),
            modules,
            Icons::FILE.style(theme().info.clone()),
            routes
        );
    }
}

pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_message(message.to_string());
        if console::Term::stdout().is_term() {
            pb.enable_steady_tick(Duration::from_millis(100));
        }
        Self { pb }
    }

    pub fn finish_with_message(&self, msg: &str) {
        self.pb.finish_with_message(msg.to_string());
    }
}
