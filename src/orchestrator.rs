//! Orchestrator control plane.
//!
//! Owns the run's state machine and the worker thread that executes it:
//!
//! ```text
//! Idle → Planning → AwaitingConfirmation → Merging → Finished
//! ```
//!
//! with an orthogonal paused flag (settable from any state) and a one-way
//! stop flag. A fatal error from either stage jumps straight to Finished
//! with a [`Event::Fatal`] instead of a completion event.
//!
//! The whole pipeline runs on one dedicated worker thread so long
//! filesystem and subprocess work never blocks command intake; commands
//! arrive through the [`Orchestrator`] handle from whatever thread the
//! front-end lives on. Pause/stop latency is bounded by one file's
//! processing time: the walker checkpoints per directory, the plan mapper
//! per file, and the merge loop per entry.
//!
//! ## The confirmation gate
//!
//! When Stage 1 completes (including the zero-media short circuit), the
//! worker itself sets the paused flag, publishes the analysis summary via
//! [`Event::ConfirmationNeeded`], and blocks in `wait_while_paused`. The
//! consumer answers with [`Orchestrator::confirm_proceed`] (unpause into
//! the merge) or [`Orchestrator::confirm_cancel`] (stop, then unpause so
//! the worker observes the stop and exits with zero Stage-2 side effects).
//! This is the only point where a full plan exists with no move or tool
//! invocation having happened.

use crate::config::RunOptions;
use crate::control::{ControlState, PAUSE_POLL};
use crate::events::{Event, EventSink};
use crate::exiftool::ExifTool;
use crate::report::SessionLog;
use crate::{merge, plan};
use std::fmt;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// The run state machine. `Paused` is a flag, not a state; see module docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Planning,
    AwaitingConfirmation,
    Merging,
    Finished,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "Idle",
            Stage::Planning => "Planning",
            Stage::AwaitingConfirmation => "Awaiting confirmation",
            Stage::Merging => "Merging",
            Stage::Finished => "Finished",
        };
        f.write_str(name)
    }
}

/// Handle to a running (or finished) pipeline.
///
/// Dropping the handle detaches the worker; use [`Orchestrator::join`] to
/// wait for it.
pub struct Orchestrator {
    control: Arc<ControlState>,
    stage: Arc<Mutex<Stage>>,
    worker: Option<JoinHandle<()>>,
}

impl Orchestrator {
    /// Start a run. Events flow into `events` until the worker finishes;
    /// the sender is dropped with the worker, so a consumer loop over the
    /// receiving end terminates naturally.
    pub fn start(options: RunOptions, events: Sender<Event>) -> Self {
        let control = Arc::new(ControlState::new());
        let stage = Arc::new(Mutex::new(Stage::Idle));
        let worker = {
            let control = Arc::clone(&control);
            let stage = Arc::clone(&stage);
            std::thread::spawn(move || run_worker(options, &control, &stage, EventSink::new(events)))
        };
        Self {
            control,
            stage,
            worker: Some(worker),
        }
    }

    pub fn stage(&self) -> Stage {
        *self.stage.lock().unwrap()
    }

    /// Graceful stop: the current item drains, then the worker exits.
    pub fn request_stop(&self) {
        self.control.request_stop();
    }

    /// Pause or resume the worker at its next checkpoint.
    pub fn set_paused(&self, paused: bool) {
        self.control.set_paused(paused);
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    /// Answer the confirmation gate: proceed into the merge stage.
    pub fn confirm_proceed(&self) {
        self.control.set_paused(false);
    }

    /// Answer the confirmation gate: cancel with zero merge side effects.
    pub fn confirm_cancel(&self) {
        self.control.request_stop();
        self.control.set_paused(false);
    }

    /// Wait for the worker thread to finish.
    pub fn join(mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn set_stage(stage: &Mutex<Stage>, sink: &EventSink, next: Stage) {
    *stage.lock().unwrap() = next;
    sink.emit(Event::StageChanged(next));
}

fn run_worker(
    options: RunOptions,
    control: &ControlState,
    stage: &Mutex<Stage>,
    sink: EventSink,
) {
    let mut log = match SessionLog::create(&options.logs) {
        Ok(log) => log,
        Err(err) => {
            sink.emit(Event::Fatal(format!(
                "could not create session log in {}: {err}",
                options.logs.display()
            )));
            set_stage(stage, &sink, Stage::Finished);
            return;
        }
    };

    set_stage(stage, &sink, Stage::Planning);
    log.log(&sink, format!("Session started for {}", options.source.display()));
    if options.dry_run {
        log.log(&sink, "Dry-run mode: no files will be modified or moved");
    }

    let outcome = match plan::build_plan(&options.source, control, &sink, &mut log) {
        Ok(outcome) => outcome,
        Err(err) => {
            sink.emit(Event::Fatal(err.to_string()));
            set_stage(stage, &sink, Stage::Finished);
            return;
        }
    };

    if control.stop_requested() {
        log.log(&sink, "Stopped during planning; nothing was modified");
        set_stage(stage, &sink, Stage::Finished);
        return;
    }

    set_stage(stage, &sink, Stage::AwaitingConfirmation);
    control.set_paused(true);
    sink.emit(Event::ConfirmationNeeded(outcome.summary.clone()));
    control.wait_while_paused(PAUSE_POLL);

    if control.stop_requested() {
        log.log(&sink, "Run cancelled at the confirmation gate; nothing was modified");
        set_stage(stage, &sink, Stage::Finished);
        return;
    }

    set_stage(stage, &sink, Stage::Merging);
    let tool = ExifTool::new(&options.exiftool, options.overwrite);
    match merge::run_merge(
        &outcome.entries,
        &outcome.summary,
        &options,
        &tool,
        control,
        &sink,
        &mut log,
    ) {
        Ok(_) => {}
        Err(err) => sink.emit(Event::Fatal(err.to_string())),
    }
    set_stage(stage, &sink, Stage::Finished);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{relative_files, write_media, write_sidecar};
    use std::fs;
    use std::sync::mpsc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn options_for(tmp: &TempDir, dry_run: bool) -> RunOptions {
        let source = tmp.path().join("source");
        fs::create_dir_all(&source).unwrap();
        RunOptions {
            source,
            completed: tmp.path().join("Completed"),
            failed: tmp.path().join("Failed"),
            logs: tmp.path().join("Logs"),
            preserve_tree: true,
            overwrite: true,
            dry_run,
            exiftool: "exiftool-that-does-not-exist".into(),
        }
    }

    /// Drain events, answering the confirmation gate with `proceed`.
    fn drive(
        orchestrator: &Orchestrator,
        rx: mpsc::Receiver<Event>,
        proceed: bool,
    ) -> Vec<Event> {
        let mut events = Vec::new();
        for event in rx {
            if matches!(event, Event::ConfirmationNeeded(_)) {
                if proceed {
                    orchestrator.confirm_proceed();
                } else {
                    orchestrator.confirm_cancel();
                }
            }
            events.push(event);
        }
        events
    }

    #[test]
    fn dry_run_reaches_finished_through_all_stages() {
        let tmp = TempDir::new().unwrap();
        let options = options_for(&tmp, true);
        write_media(&options.source, "a.jpg");
        write_sidecar(&options.source, "a.jpg");
        write_media(&options.source, "b.jpg");

        let (tx, rx) = mpsc::channel();
        let orchestrator = Orchestrator::start(options.clone(), tx);
        let events = drive(&orchestrator, rx, true);
        orchestrator.join();

        let stages: Vec<Stage> = events
            .iter()
            .filter_map(|e| match e {
                Event::StageChanged(s) => Some(*s),
                _ => None,
            })
            .collect();
        assert_eq!(
            stages,
            vec![
                Stage::Planning,
                Stage::AwaitingConfirmation,
                Stage::Merging,
                Stage::Finished
            ]
        );
        assert!(events.iter().any(|e| matches!(e, Event::Finished { .. })));
        assert!(!events.iter().any(|e| matches!(e, Event::Fatal(_))));
        // Dry run: the source tree is untouched.
        assert!(options.source.join("a.jpg").exists());
        assert!(options.source.join("b.jpg").exists());
    }

    #[test]
    fn cancel_at_the_gate_has_zero_side_effects() {
        let tmp = TempDir::new().unwrap();
        let options = options_for(&tmp, false);
        write_media(&options.source, "a.jpg");
        write_sidecar(&options.source, "a.jpg");
        let before = relative_files(&options.source);

        let (tx, rx) = mpsc::channel();
        let orchestrator = Orchestrator::start(options.clone(), tx);
        let events = drive(&orchestrator, rx, false);
        orchestrator.join();

        assert_eq!(orchestrator_final_stage(&events), Stage::Finished);
        assert!(!events.iter().any(|e| matches!(e, Event::Finished { .. })));
        assert!(!events.iter().any(|e| matches!(e, Event::Fatal(_))));
        assert_eq!(relative_files(&options.source), before);
        assert!(!options.completed.exists());
        assert!(!options.failed.exists());
    }

    fn orchestrator_final_stage(events: &[Event]) -> Stage {
        events
            .iter()
            .filter_map(|e| match e {
                Event::StageChanged(s) => Some(*s),
                _ => None,
            })
            .next_back()
            .unwrap()
    }

    #[test]
    fn missing_source_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let mut options = options_for(&tmp, true);
        options.source = tmp.path().join("does-not-exist");

        let (tx, rx) = mpsc::channel();
        let orchestrator = Orchestrator::start(options, tx);
        let events: Vec<Event> = rx.into_iter().collect();
        orchestrator.join();

        assert!(events.iter().any(
            |e| matches!(e, Event::Fatal(msg) if msg.contains("source folder does not exist"))
        ));
        assert_eq!(orchestrator_final_stage(&events), Stage::Finished);
    }

    #[test]
    fn unresolvable_tool_is_fatal_outside_dry_run() {
        let tmp = TempDir::new().unwrap();
        let options = options_for(&tmp, false);
        write_media(&options.source, "a.jpg");
        write_sidecar(&options.source, "a.jpg");

        let (tx, rx) = mpsc::channel();
        let orchestrator = Orchestrator::start(options, tx);
        let events = drive(&orchestrator, rx, true);
        orchestrator.join();

        assert!(
            events
                .iter()
                .any(|e| matches!(e, Event::Fatal(msg) if msg.contains("not usable")))
        );
    }

    #[test]
    fn zero_media_still_reaches_the_confirmation_gate() {
        let tmp = TempDir::new().unwrap();
        let options = options_for(&tmp, true);

        let (tx, rx) = mpsc::channel();
        let orchestrator = Orchestrator::start(options, tx);
        let events = drive(&orchestrator, rx, true);
        orchestrator.join();

        let summary = events
            .iter()
            .find_map(|e| match e {
                Event::ConfirmationNeeded(s) => Some(s.clone()),
                _ => None,
            })
            .expect("confirmation event");
        assert_eq!(summary.total, 0);
        assert!(events.iter().any(|e| matches!(e, Event::Finished { .. })));
    }

    #[test]
    fn stop_request_during_the_gate_wait_is_honored() {
        let tmp = TempDir::new().unwrap();
        let options = options_for(&tmp, false);
        write_media(&options.source, "a.jpg");

        let (tx, rx) = mpsc::channel();
        let orchestrator = Orchestrator::start(options.clone(), tx);

        // Wait for the gate, then stop without answering it.
        let mut events = Vec::new();
        for event in &rx {
            let was_gate = matches!(event, Event::ConfirmationNeeded(_));
            events.push(event);
            if was_gate {
                orchestrator.request_stop();
            }
        }
        events.extend(rx.try_iter());
        orchestrator.join();

        assert_eq!(orchestrator_final_stage(&events), Stage::Finished);
        assert!(options.source.join("a.jpg").exists());
    }

    #[test]
    fn confirmation_gate_holds_the_worker_until_answered() {
        let tmp = TempDir::new().unwrap();
        let options = options_for(&tmp, true);
        write_media(&options.source, "a.jpg");

        let (tx, rx) = mpsc::channel();
        let orchestrator = Orchestrator::start(options, tx);

        // Block until the gate announces itself.
        let mut events = Vec::new();
        loop {
            let event = rx.recv().unwrap();
            let was_gate = matches!(event, Event::ConfirmationNeeded(_));
            events.push(event);
            if was_gate {
                break;
            }
        }

        // The worker paused itself and must hold there unanswered.
        assert!(orchestrator.is_paused());
        assert_eq!(orchestrator.stage(), Stage::AwaitingConfirmation);
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(orchestrator.stage(), Stage::AwaitingConfirmation);

        orchestrator.confirm_proceed();
        events.extend(rx.into_iter());
        orchestrator.join();
        assert!(events.iter().any(|e| matches!(e, Event::Finished { .. })));
        assert_eq!(orchestrator_final_stage(&events), Stage::Finished);
    }
}
