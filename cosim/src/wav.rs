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

//! Interleaved stereo 16-bit PCM WAV files.

use crate::Error;
use anyhow::Context;
use std::path::Path;

/// Output rate of the peripheral.
pub const SAMPLE_RATE: u32 = 44_100;

const CHANNELS: u16 = 2;
const BITS_PER_SAMPLE: u16 = 16;

fn stereo_spec() -> hound::WavSpec {
    hound::WavSpec {
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    }
}

fn invalid(err: hound::Error) -> Error {
    Error::InvalidWav(err.to_string())
}

/// Write the whole stereo frames of `samples`; a trailing half frame is
/// dropped.
pub fn write_stereo(path: &Path, samples: &[i16]) -> anyhow::Result<()> {
    let frames = samples.len() / CHANNELS as usize;
    let mut writer = hound::WavWriter::create(path, stereo_spec())
        .map_err(invalid)
        .with_context(|| format!("Failed to open WAV output file: {}", path.display()))?;
    for sample in &samples[..frames * CHANNELS as usize] {
        writer
            .write_sample(*sample)
            .map_err(invalid)
            .with_context(|| format!("Failed to write WAV output: {}", path.display()))?;
    }
    writer
        .finalize()
        .map_err(invalid)
        .with_context(|| format!("Failed to finalize WAV output: {}", path.display()))
}

/// Read a reference WAV. Anything but stereo 16-bit integer PCM is rejected.
pub fn read_stereo(path: &Path) -> anyhow::Result<Vec<i16>> {
    let reader = hound::WavReader::open(path)
        .map_err(invalid)
        .with_context(|| format!("Failed to open reference WAV file: {}", path.display()))?;
    let spec = reader.spec();
    if spec.channels != CHANNELS {
        return Err(Error::InvalidWav(format!(
            "expected a stereo reference, found {} channels",
            spec.channels
        )))
        .with_context(|| format!("Invalid reference WAV: {}", path.display()));
    }
    if spec.bits_per_sample != BITS_PER_SAMPLE || spec.sample_format != hound::SampleFormat::Int {
        return Err(Error::InvalidWav(format!(
            "expected 16-bit PCM, found {:?} with {} bits",
            spec.sample_format, spec.bits_per_sample
        )))
        .with_context(|| format!("Invalid reference WAV: {}", path.display()));
    }
    reader
        .into_samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(invalid)
        .with_context(|| format!("Invalid reference WAV: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_stereo_pcm16() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        write_stereo(&path, &[1, -1, 2, -2]).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec(), stereo_spec());
        assert_eq!(reader.duration(), 2);
        assert_eq!(read_stereo(&path).unwrap(), vec![1, -1, 2, -2]);
    }

    #[test]
    fn drops_incomplete_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odd.wav");
        write_stereo(&path, &[5, 6, 7]).unwrap();
        assert_eq!(read_stereo(&path).unwrap(), vec![5, 6]);
    }

    #[test]
    fn rejects_mono_reference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        let spec = hound::WavSpec {
            channels: 1,
            ..stereo_spec()
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0i16).unwrap();
        writer.finalize().unwrap();

        let err = read_stereo(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InvalidWav(_))
        ));
    }

    #[test]
    fn rejects_float_reference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let spec = hound::WavSpec {
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
            ..stereo_spec()
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0.5f32).unwrap();
        writer.write_sample(-0.5f32).unwrap();
        writer.finalize().unwrap();

        assert!(read_stereo(&path).is_err());
    }

    #[test]
    fn rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.wav");
        std::fs::write(&path, b"not a wav file").unwrap();
        let err = read_stereo(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("garbage.wav"));
    }
}
