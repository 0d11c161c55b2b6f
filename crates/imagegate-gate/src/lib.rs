// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// imagegate-gate — Admission for a whole upload request.
//
// Uploads are judged in the order given and the first rejection ends the
// batch. The rejected file is discarded, admitted files that were shrunk are
// overwritten with their resized encoding, and the caller gets back a single
// `BatchReport`.

pub mod gate;
pub mod outcome;

pub use gate::UploadGate;
pub use outcome::{BatchOutcome, BatchReport};
