// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch results as returned to the caller and serialised for clients.

use chrono::{DateTime, Utc};
use imagegate_core::{Rejection, SlotUpdate};
use serde::Serialize;
use uuid::Uuid;

/// Either every upload was admitted, or exactly one rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum BatchOutcome {
    /// Continue to business logic. `updates` lists uploads that were resized.
    Proceed { updates: Vec<SlotUpdate> },
    /// The first failing slot in input order.
    Rejected(Rejection),
}

/// A batch outcome plus the identifiers used in the logs.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub evaluated_at: DateTime<Utc>,
    pub success: bool,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

impl BatchReport {
    pub fn new(batch_id: Uuid, outcome: BatchOutcome) -> Self {
        Self {
            batch_id,
            evaluated_at: Utc::now(),
            success: matches!(outcome, BatchOutcome::Proceed { .. }),
            outcome,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match &self.outcome {
            BatchOutcome::Rejected(rejection) => Some(rejection),
            BatchOutcome::Proceed { .. } => None,
        }
    }

    /// Resized uploads, empty when the batch was rejected.
    pub fn updates(&self) -> &[SlotUpdate] {
        match &self.outcome {
            BatchOutcome::Proceed { updates } => updates,
            BatchOutcome::Rejected(_) => &[],
        }
    }
}
