//! # Takeout Merge
//!
//! Prepares a Google Takeout export for import into a photo library:
//! merges each media file's JSON sidecar metadata (capture time, GPS,
//! description, people-as-keywords) into the file's embedded tags via
//! exiftool, then sorts files into Completed/ and Failed/ result trees
//! with a CSV report of every decision.
//!
//! # Architecture: Plan → Confirm → Merge
//!
//! The pipeline runs in two stages on a single worker thread, with an
//! explicit confirmation gate between them:
//!
//! ```text
//! 1. Plan     source/   →  ordered plan + analysis summary   (read-only)
//! 2. Confirm  summary   →  proceed | cancel                  (the only gate)
//! 3. Merge    plan      →  Completed/, Failed/, report CSV   (writes)
//! ```
//!
//! This separation exists for three reasons:
//!
//! - **Nothing is touched before consent**: the full plan and its summary
//!   exist before a single file is modified or moved, so the confirmation
//!   gate shows real numbers, not estimates.
//! - **Determinism**: the plan orders entries by BFS directory order and
//!   sorted filenames, so two runs over an unchanged tree produce
//!   byte-identical plans and reports.
//! - **Recoverability**: per-file problems become failed rows and a
//!   Failed/ tree, never aborts; re-running with Failed/ as the source
//!   retries exactly the tough cases.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`media`] | Extension-based media/album-JSON classification |
//! | [`sidecar`] | Sidecar resolution: exact suffix, shortest-name fallback |
//! | [`metadata`] | Sidecar JSON → normalized [`metadata::MetadataFields`] |
//! | [`exiftool`] | Argument builder + black-box subprocess behind a trait |
//! | [`walker`] | Queue-based BFS directory inventory with heartbeats |
//! | [`plan`] | Stage 1 — count, map sidecars, build the ordered plan |
//! | [`merge`] | Stage 2 — write tags, move files, write the CSV report |
//! | [`control`] | Mutex+condvar pause/stop gate shared across threads |
//! | [`events`] | Typed event channel from the worker to the front-end |
//! | [`orchestrator`] | State machine, worker thread, command surface |
//! | [`report`] | Incremental CSV report + timestamped session log |
//! | [`config`] | `merge.toml` defaults + destination derivation |
//! | [`output`] | Terminal rendering of the event stream |
//!
//! # Design Decisions
//!
//! ## One worker thread, typed events out, commands in
//!
//! All filesystem and subprocess work happens on a dedicated thread; the
//! front-end consumes a closed [`events::Event`] enum over an mpsc channel
//! and issues pause/stop/confirm commands through the
//! [`orchestrator::Orchestrator`] handle. The core never touches a
//! terminal or a widget, which is what keeps it testable end to end with
//! nothing but a temp directory and a channel receiver.
//!
//! ## Sequential merge, on purpose
//!
//! Entries are processed strictly one at a time. Exiftool invocations are
//! not assumed to be concurrency-safe against a single source tree, and
//! an in-order, incrementally flushed CSV means a stopped or crashed run
//! leaves an exact record of what moved.
//!
//! ## Moves, not copies
//!
//! Files are renamed into the result trees (with a copy+delete fallback
//! across filesystems). On a typical single-volume export this makes the
//! move step nearly free and keeps disk usage flat, at the cost of
//! mutating the source tree — which is why nothing moves before the
//! confirmation gate, and why dry-run mode exists.
//!
//! ## Exiftool as a black box
//!
//! The merge stage talks to [`exiftool::MetadataTool`], a two-method
//! trait; production code shells out to exiftool, tests substitute a
//! recording mock. What exiftool does internally is out of scope — the
//! contract is an argument vector in and an exit code out.

pub mod config;
pub mod control;
pub mod events;
pub mod exiftool;
pub mod media;
pub mod merge;
pub mod metadata;
pub mod orchestrator;
pub mod output;
pub mod plan;
pub mod report;
pub mod sidecar;
pub mod walker;

#[cfg(test)]
pub(crate) mod test_helpers;
