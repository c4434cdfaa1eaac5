//! Run tracking.
//!
//! A run begins when a start command goes out over a live link and ends
//! either on a terminal status line or, for image-recognition runs, once
//! every obstacle from the last report has a recognized target.
//!
//! Timing is left to the caller; this type only decides *when* a run
//! starts and finishes.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::obstacle::ObstacleId;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunKind {
    /// Drive around and identify the image on every obstacle.
    ImageRecognition,
    /// Fastest route through the course.
    ShortestPath,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Running(RunKind),
    Completed(RunKind),
}

#[derive(Debug, Clone)]
pub struct RunTracker {
    phase: RunPhase,
    /// Obstacles counted in the most recent report.
    reported: usize,
    recognized: BTreeSet<ObstacleId>,
}

impl Default for RunTracker {
    fn default() -> Self {
        RunTracker {
            phase: RunPhase::Idle,
            reported: 0,
            recognized: BTreeSet::new(),
        }
    }
}

impl RunTracker {
    pub fn new() -> Self {
        RunTracker::default()
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn reported(&self) -> usize {
        self.reported
    }

    pub fn recognized(&self) -> usize {
        self.recognized.len()
    }

    /// An obstacle report was sent with `count` non-empty segments.
    pub fn obstacles_reported(&mut self, count: usize) {
        self.reported = count;
        self.recognized.clear();
    }

    /// A start command was sent. Restarts any run already in progress.
    pub fn start(&mut self, kind: RunKind) {
        self.phase = RunPhase::Running(kind);
        self.recognized.clear();
    }

    /// A target was resolved; returns the finished run if this was the
    /// last outstanding obstacle.
    pub fn target_recognized(&mut self, id: ObstacleId) -> Option<RunKind> {
        self.recognized.insert(id);
        match self.phase {
            RunPhase::Running(kind @ RunKind::ImageRecognition)
                if self.reported > 0 && self.recognized.len() >= self.reported =>
            {
                self.finish(kind)
            }
            _ => None,
        }
    }

    /// A status line arrived; a terminal one ends the current run.
    pub fn status(&mut self, terminal: bool) -> Option<RunKind> {
        match self.phase {
            RunPhase::Running(kind) if terminal => self.finish(kind),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        *self = RunTracker::default();
    }

    fn finish(&mut self, kind: RunKind) -> Option<RunKind> {
        self.phase = RunPhase::Completed(kind);
        Some(kind)
    }
}
