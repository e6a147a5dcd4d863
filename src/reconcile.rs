//! Write orchestration against a backend whose derived aggregates are
//! recomputed asynchronously after the write acknowledgment. A run walks
//! `Idle → Validating → Writing → Invalidating → AwaitingRecompute →
//! Refetching → Settled`, with `Failed` reachable from Writing and
//! Refetching. The backoff before re-fetching is a bounded wait, not a
//! completion signal: if the backend is still recomputing when the
//! re-fetch lands, the caller sees stale aggregates and re-triggers via
//! the refresh affordance.

use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::{validate_components, RangeError};
use crate::cache::{AggregateKind, ViewStateCache};
use crate::client::{AcademicClient, ClientError};
use crate::model::{
    AttendanceEntry, AttendanceWriteRow, BulkAttendancePayload, BulkGradePayload,
    BulkParticipationPayload, GradeEntry, GradeWriteRow, ParticipationEntry, ParticipationWriteRow,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Wait before the post-write re-fetch, in milliseconds. The backend
    /// acknowledges a bulk grade write before final grades and predictive
    /// statistics are recomputed; fetching sooner observes pre-write
    /// aggregates.
    #[serde(default = "default_recompute_backoff_ms")]
    pub recompute_backoff_ms: u64,
    /// Pause between the staged re-fetch calls, in milliseconds.
    #[serde(default = "default_refetch_gap_ms")]
    pub refetch_gap_ms: u64,
}

fn default_recompute_backoff_ms() -> u64 {
    3_000
}

fn default_refetch_gap_ms() -> u64 {
    100
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            recompute_backoff_ms: default_recompute_backoff_ms(),
            refetch_gap_ms: default_refetch_gap_ms(),
        }
    }
}

impl ReconcileConfig {
    /// Zero-wait configuration for tests and refresh-only runs.
    pub const fn immediate() -> Self {
        Self {
            recompute_backoff_ms: 0,
            refetch_gap_ms: 0,
        }
    }

    pub fn recompute_backoff(&self) -> Duration {
        Duration::from_millis(self.recompute_backoff_ms)
    }

    pub fn refetch_gap(&self) -> Duration {
        Duration::from_millis(self.refetch_gap_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Validating,
    Writing,
    Invalidating,
    AwaitingRecompute,
    Refetching,
    Settled,
    Failed,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Validating => "validating",
            Stage::Writing => "writing",
            Stage::Invalidating => "invalidating",
            Stage::AwaitingRecompute => "awaiting_recompute",
            Stage::Refetching => "refetching",
            Stage::Settled => "settled",
            Stage::Failed => "failed",
        }
    }
}

/// One bulk write, still in UI vocabulary. Validation turns it into the
/// wire payload: grade components go through the aggregator bounds,
/// attendance and participation rows through the status codec.
#[derive(Debug, Clone)]
pub enum BulkWrite {
    Grades {
        class_id: i64,
        period_id: i64,
        rows: Vec<GradeEntry>,
    },
    Attendance {
        class_id: i64,
        period_id: i64,
        date: NaiveDate,
        rows: Vec<AttendanceEntry>,
    },
    Participation {
        class_id: i64,
        period_id: i64,
        date: NaiveDate,
        rows: Vec<ParticipationEntry>,
    },
}

impl BulkWrite {
    pub fn class_id(&self) -> i64 {
        match self {
            BulkWrite::Grades { class_id, .. }
            | BulkWrite::Attendance { class_id, .. }
            | BulkWrite::Participation { class_id, .. } => *class_id,
        }
    }

    /// Only grade writes trigger the asynchronous final-grade and
    /// prediction recomputation the backoff exists for; attendance and
    /// participation statistics come back consistent on the ack.
    fn awaits_recompute(&self) -> bool {
        matches!(self, BulkWrite::Grades { .. })
    }

    fn refetch_steps(&self) -> Vec<RefetchStep> {
        match self {
            BulkWrite::Grades { period_id, .. } => vec![
                RefetchStep {
                    kind: AggregateKind::Grades,
                    period_id: Some(*period_id),
                },
                RefetchStep {
                    kind: AggregateKind::GradeStats,
                    period_id: Some(*period_id),
                },
                RefetchStep {
                    kind: AggregateKind::FinalGrades,
                    period_id: None,
                },
            ],
            BulkWrite::Attendance { period_id, .. } => vec![RefetchStep {
                kind: AggregateKind::AttendanceStats,
                period_id: Some(*period_id),
            }],
            BulkWrite::Participation { period_id, .. } => vec![RefetchStep {
                kind: AggregateKind::ParticipationStats,
                period_id: Some(*period_id),
            }],
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RefetchStep {
    kind: AggregateKind,
    period_id: Option<i64>,
}

enum WirePayload {
    Grades(BulkGradePayload),
    Attendance(BulkAttendancePayload),
    Participation(BulkParticipationPayload),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Published {
    pub kind: AggregateKind,
    pub version: u64,
}

#[derive(Debug)]
pub struct ReconcileOutcome {
    pub run_id: Uuid,
    pub ack: serde_json::Value,
    pub published: Vec<Published>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The batch never left the client; no network call was made.
    #[error("batch rejected: {0}")]
    Validation(#[from] RangeError),
    /// The bulk write itself failed; nothing was invalidated or re-fetched.
    #[error("bulk write failed: {0}")]
    Write(#[source] ClientError),
    /// The write was acknowledged but a re-fetch step failed. Entries
    /// refreshed before the failure stay published; displayed aggregates
    /// for the remaining kinds may be stale until a manual refresh.
    #[error("refetch of {kind:?} failed after a successful write: {source}")]
    Refetch {
        kind: AggregateKind,
        #[source]
        source: ClientError,
        published: Vec<Published>,
    },
}

pub struct Reconciler<'a> {
    client: &'a dyn AcademicClient,
    cache: &'a mut ViewStateCache,
    config: &'a ReconcileConfig,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        client: &'a dyn AcademicClient,
        cache: &'a mut ViewStateCache,
        config: &'a ReconcileConfig,
    ) -> Self {
        Self {
            client,
            cache,
            config,
        }
    }

    /// Runs one reconciliation to completion. Stages execute strictly in
    /// sequence; the version for every refreshed kind is strictly greater
    /// than any version published before the run. Runs are not queued or
    /// merged: a run holds the cache mutably, and the caller must disable
    /// its save trigger while one is in flight.
    pub fn run(&mut self, write: &BulkWrite) -> Result<ReconcileOutcome, ReconcileError> {
        let run_id = Uuid::new_v4();
        let mut stage = Stage::Idle;

        self.transition(run_id, &mut stage, Stage::Validating);
        let payload = validate(write)?;

        self.transition(run_id, &mut stage, Stage::Writing);
        let ack = match self.send(&payload) {
            Ok(ack) => ack,
            Err(err) => {
                self.transition(run_id, &mut stage, Stage::Failed);
                return Err(ReconcileError::Write(err));
            }
        };

        self.transition(run_id, &mut stage, Stage::Invalidating);
        self.cache.invalidate_class(write.class_id());

        self.transition(run_id, &mut stage, Stage::AwaitingRecompute);
        if write.awaits_recompute() {
            pause(self.config.recompute_backoff());
        }

        self.transition(run_id, &mut stage, Stage::Refetching);
        let published = match self.refetch(write.class_id(), &write.refetch_steps()) {
            Ok(published) => published,
            Err(err) => {
                self.transition(run_id, &mut stage, Stage::Failed);
                return Err(err);
            }
        };

        self.transition(run_id, &mut stage, Stage::Settled);
        Ok(ReconcileOutcome {
            run_id,
            ack,
            published,
        })
    }

    /// Refresh-only run backing the manual retry affordance: invalidate
    /// and re-fetch the grade aggregates for a class without writing.
    pub fn refresh_grade_aggregates(
        &mut self,
        class_id: i64,
        period_id: i64,
    ) -> Result<Vec<Published>, ReconcileError> {
        let run_id = Uuid::new_v4();
        tracing::debug!(run_id = %run_id, class_id, "refresh-only reconcile");
        self.cache.invalidate_class(class_id);
        let steps = [
            RefetchStep {
                kind: AggregateKind::Grades,
                period_id: Some(period_id),
            },
            RefetchStep {
                kind: AggregateKind::GradeStats,
                period_id: Some(period_id),
            },
            RefetchStep {
                kind: AggregateKind::FinalGrades,
                period_id: None,
            },
        ];
        self.refetch(class_id, &steps)
    }

    fn transition(&self, run_id: Uuid, stage: &mut Stage, next: Stage) {
        tracing::debug!(run_id = %run_id, from = stage.as_str(), to = next.as_str(), "reconcile stage");
        *stage = next;
    }

    fn send(&self, payload: &WirePayload) -> Result<serde_json::Value, ClientError> {
        match payload {
            WirePayload::Grades(p) => self.client.bulk_save_grades(p),
            WirePayload::Attendance(p) => self.client.bulk_save_attendance(p),
            WirePayload::Participation(p) => self.client.bulk_save_participation(p),
        }
    }

    /// Executes the steps in their fixed order, publishing each payload as
    /// it lands. On failure, whatever already published stays in place.
    fn refetch(
        &mut self,
        class_id: i64,
        steps: &[RefetchStep],
    ) -> Result<Vec<Published>, ReconcileError> {
        let mut published = Vec::with_capacity(steps.len());
        for (i, step) in steps.iter().enumerate() {
            if i > 0 {
                pause(self.config.refetch_gap());
            }
            let payload = self.fetch(class_id, step).map_err(|source| ReconcileError::Refetch {
                kind: step.kind,
                source,
                published: published.clone(),
            })?;
            let version = self.cache.put(class_id, step.period_id, step.kind, payload);
            published.push(Published {
                kind: step.kind,
                version,
            });
        }
        Ok(published)
    }

    fn fetch(&self, class_id: i64, step: &RefetchStep) -> Result<serde_json::Value, ClientError> {
        match step.kind {
            AggregateKind::Grades => self
                .client
                .grades_by_class_and_period(class_id, step.period_id.unwrap_or_default()),
            AggregateKind::GradeStats => self.client.grade_stats(class_id, step.period_id),
            AggregateKind::FinalGrades => self.client.final_grades_by_class(class_id),
            AggregateKind::AttendanceStats => self.client.attendance_stats(class_id, step.period_id),
            AggregateKind::ParticipationStats => {
                self.client.participation_stats(class_id, step.period_id)
            }
            AggregateKind::Predictions => self.client.predictions_by_class(class_id),
        }
    }
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}

fn validate(write: &BulkWrite) -> Result<WirePayload, RangeError> {
    match write {
        BulkWrite::Grades {
            class_id,
            period_id,
            rows,
        } => {
            let mut grades = Vec::with_capacity(rows.len());
            for row in rows {
                validate_components(&row.components)?;
                grades.push(GradeWriteRow {
                    student_id: row.student_id.clone(),
                    ser: row.components.ser,
                    saber: row.components.saber,
                    hacer: row.components.hacer,
                    decidir: row.components.decidir,
                    autoevaluacion: row.components.autoevaluacion,
                });
            }
            Ok(WirePayload::Grades(BulkGradePayload {
                class_instance: *class_id,
                period: *period_id,
                grades,
            }))
        }
        BulkWrite::Attendance {
            class_id,
            period_id,
            date,
            rows,
        } => Ok(WirePayload::Attendance(BulkAttendancePayload {
            class_instance: *class_id,
            period: *period_id,
            date: *date,
            attendances: rows
                .iter()
                .map(|row| AttendanceWriteRow {
                    student_id: row.student_id.clone(),
                    status: row.status.encode(),
                })
                .collect(),
        })),
        BulkWrite::Participation {
            class_id,
            period_id,
            date,
            rows,
        } => Ok(WirePayload::Participation(BulkParticipationPayload {
            class_instance: *class_id,
            period: *period_id,
            date: *date,
            participations: rows
                .iter()
                .map(|row| ParticipationWriteRow {
                    student_id: row.student_id.clone(),
                    level: row.level.encode(),
                })
                .collect(),
        })),
    }
}
