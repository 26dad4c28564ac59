// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Validation of captured streams against golden references.
//!
//! Both comparisons tolerate a length difference (it is reported as a
//! warning) and compare the overlapping prefix element by element. Only the
//! first divergence is reported.

use crate::capture::{load_debug_capture, Captures, DebugRecord};
use crate::wav;
use itertools::Itertools;
use std::fmt;
use std::path::Path;

/// The first divergence between a capture and its reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mismatch {
    Predictor { index: usize, time: u64 },
    StepIndex { index: usize, time: u64 },
    /// `index` is the flat sample index, `frame` the stereo frame holding it.
    Sample { index: usize, frame: usize },
    /// Less than one stereo frame was captured.
    NoAudioCaptured,
    /// The reference could not be loaded or has the wrong shape.
    Reference(String),
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Predictor { time, .. } => write!(f, "ADPCM debug: predictor mismatch at: {}", time),
            Self::StepIndex { time, .. } => write!(f, "ADPCM debug: step_index mismatch at: {}", time),
            Self::Sample { index, frame } => write!(
                f,
                "Reference WAV mismatch at: {} (stereo sample: {})",
                index, frame
            ),
            Self::NoAudioCaptured => write!(f, "No WAV capture to compare reference to"),
            Self::Reference(reason) => write!(f, "{}", reason),
        }
    }
}

/// Result of one reference comparison.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Comparison {
    /// `(reference, captured)` lengths, when they differ.
    pub length_mismatch: Option<(usize, usize)>,
    pub mismatch: Option<Mismatch>,
}

impl Comparison {
    pub fn passed(&self) -> bool {
        self.mismatch.is_none()
    }

    fn failed(mismatch: Mismatch) -> Self {
        log::error!("{}", mismatch);
        Self {
            length_mismatch: None,
            mismatch: Some(mismatch),
        }
    }
}

/// Combined result of the debug and audio comparisons.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub debug: Comparison,
    pub audio: Comparison,
}

impl Verdict {
    pub fn passed(&self) -> bool {
        self.debug.passed() && self.audio.passed()
    }
}

fn length_mismatch(what: &str, reference: usize, captured: usize) -> Option<(usize, usize)> {
    if reference == captured {
        return None;
    }
    log::warn!(
        "{} capture is not equally sized to reference (reference: {}, captured: {})",
        what,
        reference,
        captured
    );
    Some((reference, captured))
}

pub fn compare_debug(captured: &[DebugRecord], reference: &[DebugRecord]) -> Comparison {
    let length_mismatch = length_mismatch("ADPCM debug", reference.len(), captured.len());
    let mismatch = captured
        .iter()
        .zip(reference)
        .find_position(|(captured, reference)| {
            captured.predictor != reference.predictor
                || captured.step_index != reference.step_index
        })
        .map(|(index, (captured, reference))| {
            if captured.predictor != reference.predictor {
                Mismatch::Predictor {
                    index,
                    time: captured.time,
                }
            } else {
                Mismatch::StepIndex {
                    index,
                    time: captured.time,
                }
            }
        });
    match &mismatch {
        Some(mismatch) => log::error!("{}", mismatch),
        None => log::info!("Debug ADPCM capture matches"),
    }
    Comparison {
        length_mismatch,
        mismatch,
    }
}

pub fn compare_audio(captured: &[i16], reference: &[i16]) -> Comparison {
    if captured.len() < 2 {
        return Comparison::failed(Mismatch::NoAudioCaptured);
    }
    let length_mismatch = length_mismatch("WAV", reference.len(), captured.len());
    let mismatch = captured
        .iter()
        .zip(reference)
        .position(|(captured, reference)| captured != reference)
        .map(|index| Mismatch::Sample {
            index,
            frame: index / 2,
        });
    match &mismatch {
        Some(mismatch) => log::error!("{}", mismatch),
        None => log::info!("Reference WAV matches"),
    }
    Comparison {
        length_mismatch,
        mismatch,
    }
}

/// Compare the debug capture against a reference capture file.
pub fn check_debug_reference(path: &Path, captured: &[DebugRecord]) -> Comparison {
    match load_debug_capture(path) {
        Ok(reference) => compare_debug(captured, &reference),
        Err(err) => Comparison::failed(Mismatch::Reference(format!("{:#}", err))),
    }
}

/// Compare the audio capture against a reference WAV file. The reference is
/// not touched when nothing was captured.
pub fn check_audio_reference(path: &Path, captured: &[i16]) -> Comparison {
    if captured.len() < 2 {
        return Comparison::failed(Mismatch::NoAudioCaptured);
    }
    match wav::read_stereo(path) {
        Ok(reference) => compare_audio(captured, &reference),
        Err(err) => Comparison::failed(Mismatch::Reference(format!("{:#}", err))),
    }
}

/// Run both reference comparisons. Both always run, so every divergence is
/// logged even when the first one already failed.
pub fn verify(captures: &Captures, debug_reference: &Path, audio_reference: &Path) -> Verdict {
    Verdict {
        debug: check_debug_reference(debug_reference, &captures.debug),
        audio: check_audio_reference(audio_reference, &captures.audio),
    }
}
