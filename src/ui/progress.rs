use crate::ui::progress_message::{ProgressMessage, ProgressPhase};
use crate::ui::theme;
use crate::ui::Icons;
use indicatif::{HumanDuration, MultiProgress, ProgressBar};
use owo_colors::OwoColorize;
use std::thread;
use std::time::Duration;

/// Drives terminal progress bars from a crossbeam channel.
///
/// Bars appear when their phase starts. The display thread exits once every
/// sender is dropped.
pub struct ProgressManager {
    mp: MultiProgress,
    handle: Option<thread::JoinHandle<()>>,
}

impl ProgressManager {
    pub fn new() -> (Self, crossbeam::channel::Sender<ProgressMessage>) {
        let (tx, rx) = crossbeam::channel::unbounded::<ProgressMessage>();

        let mp = MultiProgress::new();
        let visible = console::Term::stdout().is_term() && !crate::output::is_quiet();
        let mp_clone = mp.clone();

        let handle = thread::spawn(move || {
            let bar = |bar: ProgressBar| if visible { mp_clone.add(bar) } else { ProgressBar::hidden() };
            let mut parsing: Option<ProgressBar> = None;
            let mut generating: Option<ProgressBar> = None;

            for msg in rx {
                match msg {
                    ProgressMessage::Started {
                        phase: ProgressPhase::Parsing,
                        total,
                    } => {
                        parsing = Some(bar(ProgressBar::new(total as u64).with_message("Parsing migrations")));
                    }
                    ProgressMessage::Progress {
                        phase: ProgressPhase::Parsing,
                        current,
                        file,
                    } => {
                        if let Some(pb) = &parsing {
                            pb.set_position(current as u64);
                            if let Some(ref f) = file {
                                pb.set_message(format!("Parsing: {}", f));
                            }
                        }
                    }
                    ProgressMessage::Started {
                        phase: ProgressPhase::Generating,
                        ..
                    } => {
                        let pb = bar(ProgressBar::new_spinner().with_message("Generating script"));
                        pb.enable_steady_tick(Duration::from_millis(100));
                        generating = Some(pb);
                    }
                    ProgressMessage::Finished { phase } => {
                        let done = match phase {
                            ProgressPhase::Parsing => &parsing,
                            ProgressPhase::Generating => &generating,
                        };
                        if let Some(pb) = done {
                            pb.finish_with_message("Done");
                        }
                    }
                    ProgressMessage::Error(e) => {
                        if visible {
                            mp_clone.println(format!("{} {}", Icons::WARN, e)).ok();
                        }
                    }
                    ProgressMessage::Progress {
                        phase: ProgressPhase::Generating,
                        ..
                    } => {}
                }
            }
        });

        (
            Self {
                mp,
                handle: Some(handle),
            },
            tx,
        )
    }

    /// Wait for the display thread. Every sender must be dropped first.
    pub fn finish(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
        self.mp.clear().ok();
    }

    pub fn finish_with_summary(self, duration: Duration, files: usize, statements: usize, unparsed: usize) {
        self.finish();
        if crate::output::is_quiet() {
            return;
        }
        println!();
        println!(
            "{} {}",
            Icons::CHECK.style(theme().success.clone()),
            format!("Complete in {}", HumanDuration(duration)).style(theme().success.clone())
        );
        println!(
            "  {} {}  {} {}  {} {}",
            Icons::FILE.style(theme().info.clone()),
            files,
            Icons::PACKAGE.style(theme().info.clone()),
            statements,
            Icons::WARN.style(theme().warn.clone()),
            unparsed
        );
    }
}
