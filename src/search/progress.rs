//! Terminal progress output for a running search.
//!
//! Two channels share one writer: a single live status line that is
//! overwritten in place with `\r`, and permanent newline-terminated lines for
//! accepted PINs. A mutex serializes every write so concurrent workers never
//! interleave partial output.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use super::candidate::{Candidate, PIN_SPACE};
use super::executor::AttemptOutcome;

/// Flags longer than this are cut for display.
pub const MAX_FLAG_DISPLAY: usize = 300;

struct Terminal {
    out: Box<dyn Write + Send>,
    /// Width of the live line currently on screen, 0 when none.
    live_width: usize,
    /// Highest attempt count shown so far; the live counter never goes back.
    attempts_shown: u64,
}

impl Terminal {
    fn clear_live(&mut self) -> io::Result<()> {
        if self.live_width > 0 {
            write!(self.out, "\r{}\r", " ".repeat(self.live_width))?;
            self.live_width = 0;
        }
        Ok(())
    }
}

/// Serialized writer for live and permanent progress lines.
pub struct ProgressReporter {
    terminal: Mutex<Terminal>,
}

impl ProgressReporter {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            terminal: Mutex::new(Terminal {
                out: Box::new(out),
                live_width: 0,
                attempts_shown: 0,
            }),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Discards all output.
    pub fn sink() -> Self {
        Self::new(io::sink())
    }

    fn with_terminal(&self, write: impl FnOnce(&mut Terminal) -> io::Result<()>) {
        let mut terminal = self
            .terminal
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = write(&mut *terminal).and_then(|()| terminal.out.flush()) {
            tracing::debug!(error = %e, "Failed to write progress output");
        }
    }

    /// Overwrites the live line with the status of a non-success outcome.
    ///
    /// Workers read their count before taking the lock, so a stale count can
    /// arrive late; the line keeps showing the highest one seen.
    pub fn report_live(&self, outcome: &AttemptOutcome, attempts_completed: u64) {
        self.with_terminal(|terminal| {
            terminal.attempts_shown = terminal.attempts_shown.max(attempts_completed);
            let text = live_text(outcome, terminal.attempts_shown);
            let padding = terminal.live_width.saturating_sub(text.len());
            write!(terminal.out, "\r{}{}", text, " ".repeat(padding))?;
            terminal.live_width = text.len();
            Ok(())
        });
    }

    /// Writes a line that later live updates never overwrite.
    pub fn report_permanent(&self, text: &str) {
        self.with_terminal(|terminal| {
            terminal.clear_live()?;
            writeln!(terminal.out, "{}", text)
        });
    }

    /// Permanent report of an accepted PIN and its flag.
    pub fn report_found(&self, pin: Candidate, flag: Option<&str>) {
        let mut text = format!("FOUND PIN {}", pin);
        if let Some(flag) = flag {
            text.push_str(&format!("\nflag: {}", display_flag(flag)));
        }
        self.report_permanent(&text);
    }

    /// Ends the live line so following output starts on a fresh line.
    pub fn finish_live(&self) {
        self.with_terminal(|terminal| {
            if terminal.live_width > 0 {
                writeln!(terminal.out)?;
                terminal.live_width = 0;
            }
            Ok(())
        });
    }
}

fn live_text(outcome: &AttemptOutcome, attempts_completed: u64) -> String {
    if outcome.is_fatal() {
        format!("candidate {} error after retries, skipping", outcome.candidate)
    } else {
        format!(
            "trying PIN {} (attempt {}/{})...",
            outcome.candidate, attempts_completed, PIN_SPACE
        )
    }
}

/// Truncates long flags to [`MAX_FLAG_DISPLAY`] characters.
pub fn display_flag(flag: &str) -> String {
    if flag.chars().count() <= MAX_FLAG_DISPLAY {
        return flag.to_string();
    }
    let cut: String = flag.chars().take(MAX_FLAG_DISPLAY).collect();
    format!("{} ... (truncated)", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::executor::AttemptStatus;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().expect("lock").clone()).expect("utf8")
        }
    }

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn outcome(value: u16, status: AttemptStatus) -> AttemptOutcome {
        AttemptOutcome {
            candidate: Candidate::new(value).expect("in range"),
            status,
            http_status: Some(403),
            flag: None,
            retries: 0,
            error: None,
        }
    }

    #[test]
    fn test_live_updates_never_add_lines() {
        let capture = Capture::default();
        let reporter = ProgressReporter::new(capture.clone());

        for i in 0..100 {
            reporter.report_live(&outcome(i, AttemptStatus::Failure), u64::from(i) + 1);
        }

        let text = capture.text();
        assert!(!text.contains('\n'));
        assert!(text.ends_with("trying PIN 0099 (attempt 100/10000)..."));
    }

    #[test]
    fn test_live_line_padding_erases_longer_text() {
        let capture = Capture::default();
        let reporter = ProgressReporter::new(capture.clone());

        reporter.report_live(&outcome(3, AttemptStatus::FatalError), 1);
        reporter.report_live(&outcome(4, AttemptStatus::Failure), 2);

        let text = capture.text();
        let last = text.rsplit('\r').next().expect("segment");
        let fatal_len = "candidate 0003 error after retries, skipping".len();
        assert_eq!(last.len(), fatal_len);
        assert!(last.starts_with("trying PIN 0004 (attempt 2/10000)..."));
    }

    #[test]
    fn test_live_counter_never_goes_backwards() {
        let capture = Capture::default();
        let reporter = ProgressReporter::new(capture.clone());

        reporter.report_live(&outcome(6, AttemptStatus::Failure), 6);
        reporter.report_live(&outcome(5, AttemptStatus::Failure), 5);

        let text = capture.text();
        let last = text.rsplit('\r').next().expect("segment");
        assert!(last.starts_with("trying PIN 0005 (attempt 6/10000)..."), "{last:?}");
        assert!(!text.contains("attempt 5/"));
    }

    #[test]
    fn test_permanent_lines_survive_live_updates() {
        let capture = Capture::default();
        let reporter = ProgressReporter::new(capture.clone());

        reporter.report_live(&outcome(1, AttemptStatus::Failure), 1);
        reporter.report_found(Candidate::new(4242).expect("pin"), Some("CTF{x}"));
        reporter.report_live(&outcome(2, AttemptStatus::Failure), 2);
        reporter.finish_live();

        let text = capture.text();
        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with("\rFOUND PIN 4242"));
        assert_eq!(lines[1], "flag: CTF{x}");
        assert!(lines[2].contains("trying PIN 0002"));
        assert_eq!(lines[3], "");
    }

    #[test]
    fn test_concurrent_writers_do_not_interleave() {
        let capture = Capture::default();
        let reporter = Arc::new(ProgressReporter::new(capture.clone()));

        let handles: Vec<_> = (0..8u16)
            .map(|t| {
                let reporter = Arc::clone(&reporter);
                std::thread::spawn(move || {
                    for i in 0..50u16 {
                        let value = t * 1000 + i;
                        if i % 10 == 0 {
                            reporter.report_found(Candidate::new(value).expect("pin"), None);
                        } else {
                            reporter
                                .report_live(&outcome(value, AttemptStatus::Failure), u64::from(i));
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("writer thread");
        }

        let text = capture.text();
        for t in 0..8u16 {
            for i in (0..50u16).step_by(10) {
                let line = format!("FOUND PIN {:04}\n", t * 1000 + i);
                assert_eq!(text.matches(&line).count(), 1, "missing {line:?}");
            }
        }
        assert_eq!(text.matches('\n').count(), 40);
    }

    #[test]
    fn test_display_flag_truncation() {
        assert_eq!(display_flag("CTF{short}"), "CTF{short}");

        let long = "x".repeat(MAX_FLAG_DISPLAY + 5);
        let shown = display_flag(&long);
        assert!(shown.ends_with(" ... (truncated)"));
        assert_eq!(shown.chars().filter(|c| *c == 'x').count(), MAX_FLAG_DISPLAY);
    }
}
