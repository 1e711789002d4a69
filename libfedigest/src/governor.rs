//! Rate-limit governance
//!
//! One governor instance is shared across every walk in a run. It compares
//! the latest [`RateLimitSnapshot`] against the allowed spend and either
//! lets the walk continue, blocks until the reset instant, or relays an
//! operator's decision to abort. The first exhaustion event asks the
//! operator what to do; choosing to stop asking sets `quiet_mode` for the
//! rest of the run.

use chrono::{DateTime, Local, Utc};
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::types::RateLimitSnapshot;

/// Default interval between wake-ups while waiting for a reset.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of a governor consultation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Budget available, or the operator chose to wait; keep walking.
    Continue,
    /// Waited out a reset without prompting; keep walking.
    ContinueQuiet,
    /// The operator asked to stop. A normal termination, not an error.
    Abort,
}

/// The operator's answer to the three-way rate-limit prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitChoice {
    /// Wait for the reset and continue.
    Wait,
    /// Wait for the reset, and stop asking for the rest of this run.
    WaitQuietly,
    /// Abort the current collection.
    Abort,
}

/// Channel through which the governor asks the operator for a decision.
pub trait OperatorPrompt: Send {
    fn ask(&mut self, snapshot: &RateLimitSnapshot) -> LimitChoice;
}

/// Interactive prompt on stdin/stderr.
///
/// Re-prompts indefinitely on anything that is not 1, 2 or 3. When stdin is
/// not a TTY (cron, pipes) or reaches EOF, it answers
/// [`LimitChoice::WaitQuietly`] so unattended runs cannot hang.
pub struct ConsolePrompt;

impl ConsolePrompt {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsolePrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl OperatorPrompt for ConsolePrompt {
    fn ask(&mut self, snapshot: &RateLimitSnapshot) -> LimitChoice {
        if !atty::is(atty::Stream::Stdin) {
            tracing::info!("rate limit reached and stdin is not a TTY; waiting quietly");
            return LimitChoice::WaitQuietly;
        }

        let stdin = std::io::stdin();
        let mut lines = stdin.lock().lines();
        loop {
            eprintln!(
                "Rate limit reached ({} of {} requests left, resets {}).",
                snapshot.remaining,
                snapshot.limit,
                snapshot.reset.with_timezone(&Local).format("%H:%M:%S"),
            );
            eprintln!("  1) wait for the reset and continue");
            eprintln!("  2) wait, and stop asking for the rest of this run");
            eprintln!("  3) abort collection");
            eprint!("Select [1-3]: ");
            let _ = std::io::stderr().flush();

            match lines.next() {
                Some(Ok(line)) => {
                    if let Some(choice) = parse_choice(&line) {
                        return choice;
                    }
                    eprintln!("Invalid choice. Please enter 1, 2, or 3.\n");
                }
                // EOF or a broken stdin: behave like an unattended run
                _ => return LimitChoice::WaitQuietly,
            }
        }
    }
}

fn parse_choice(input: &str) -> Option<LimitChoice> {
    match input.trim() {
        "1" => Some(LimitChoice::Wait),
        "2" => Some(LimitChoice::WaitQuietly),
        "3" => Some(LimitChoice::Abort),
        _ => None,
    }
}

/// Scripted prompt for tests; answers are served in order.
///
/// An exhausted script answers [`LimitChoice::Abort`] so a test that
/// under-scripts fails loudly instead of blocking.
pub struct ScriptedPrompt {
    choices: VecDeque<LimitChoice>,
    asked: Arc<Mutex<usize>>,
}

impl ScriptedPrompt {
    pub fn new(choices: impl IntoIterator<Item = LimitChoice>) -> Self {
        Self {
            choices: choices.into_iter().collect(),
            asked: Arc::new(Mutex::new(0)),
        }
    }

    /// Shared counter of how many times the prompt was shown.
    pub fn ask_count(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.asked)
    }
}

impl OperatorPrompt for ScriptedPrompt {
    fn ask(&mut self, _snapshot: &RateLimitSnapshot) -> LimitChoice {
        *self.asked.lock().unwrap() += 1;
        self.choices.pop_front().unwrap_or(LimitChoice::Abort)
    }
}

/// Decides, after every page fetch, whether the walk may continue.
pub struct RateLimitGovernor {
    quiet_mode: bool,
    poll: Duration,
    prompt: Box<dyn OperatorPrompt>,
}

impl RateLimitGovernor {
    pub fn new(prompt: Box<dyn OperatorPrompt>) -> Self {
        Self {
            quiet_mode: false,
            poll: DEFAULT_POLL_INTERVAL,
            prompt,
        }
    }

    /// Override the reset-wait poll interval.
    pub fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    pub fn quiet_mode(&self) -> bool {
        self.quiet_mode
    }

    /// Check the snapshot against the allowed spend.
    ///
    /// `offset` is the number of the window's requests the walk may consume
    /// before the governor intervenes; callers pass their window depth in
    /// days. The snapshot is stale after any wait; fetch a fresh one before
    /// acting on `remaining` again.
    pub async fn check(&mut self, snapshot: &RateLimitSnapshot, offset: u32) -> Verdict {
        let threshold = snapshot.limit.saturating_sub(offset);
        if snapshot.remaining > threshold {
            return Verdict::Continue;
        }

        if self.quiet_mode {
            self.wait_until(snapshot.reset).await;
            return Verdict::ContinueQuiet;
        }

        match self.prompt.ask(snapshot) {
            LimitChoice::Wait => {
                self.wait_until(snapshot.reset).await;
                Verdict::Continue
            }
            LimitChoice::WaitQuietly => {
                self.quiet_mode = true;
                self.wait_until(snapshot.reset).await;
                Verdict::ContinueQuiet
            }
            LimitChoice::Abort => Verdict::Abort,
        }
    }

    /// Sleep until `reset`, waking at the poll interval so progress stays
    /// observable and the wait ends promptly once the instant passes.
    async fn wait_until(&self, reset: DateTime<Utc>) {
        let mut polls: u32 = 0;
        loop {
            let now = Utc::now();
            if now >= reset {
                break;
            }
            let left = (reset - now).to_std().unwrap_or(Duration::ZERO);
            if polls % 10 == 0 {
                tracing::info!(
                    "waiting {} for rate limit reset",
                    humantime::format_duration(Duration::from_secs(left.as_secs().max(1)))
                );
            }
            polls += 1;
            tokio::time::sleep(self.poll.min(left)).await;
        }
    }
}
