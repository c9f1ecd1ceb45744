//! Optional WAV capture of processed session output.
//!
//! Writes 16-bit PCM mono. The header is written with placeholder sizes on
//! creation and patched on finalize. Recorder failures are recoverable
//! events; they never fail the audio session.

use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

// WAV format constants. See: http://soundfile.sapp.org/doc/WaveFormat/

/// Byte offset of the file size field in the WAV header (RIFF chunk size).
const WAV_FILE_SIZE_OFFSET: u64 = 4;

/// Byte offset of the data chunk size field in the WAV header.
const WAV_DATA_SIZE_OFFSET: u64 = 40;

/// Size of the WAV header in bytes (RIFF + fmt + data chunk headers).
const WAV_HEADER_SIZE: u32 = 44;

/// Size of the fmt chunk data (16 bytes for PCM).
const WAV_FMT_CHUNK_SIZE: u32 = 16;

/// Audio format code for PCM (uncompressed).
const WAV_FORMAT_PCM: u16 = 1;

/// Bits per sample for 16-bit audio.
const WAV_BITS_PER_SAMPLE: u16 = 16;

/// Bytes per sample (16-bit = 2 bytes).
const BYTES_PER_SAMPLE: u64 = 2;

/// Symmetric i16 scale for float conversion (avoids asymmetric clipping).
const I16_SCALE: f32 = i16::MAX as f32;

/// A WAV file being written alongside a session.
///
/// Created by the engine when [`SessionConfig::capture_path`] is set;
/// receives every processed buffer and is finalized when the session stops.
///
/// [`SessionConfig::capture_path`]: crate::SessionConfig::capture_path
pub struct WavRecorder {
    path: PathBuf,
    writer: BufWriter<File>,
    samples_written: u64,
    finalized: bool,
}

impl WavRecorder {
    /// Creates the file and writes a header with placeholder sizes.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file cannot be created.
    pub fn create(path: impl AsRef<Path>, sample_rate: u32) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut writer = BufWriter::new(File::create(&path)?);
        write_header(&mut writer, sample_rate)?;
        Ok(Self {
            path,
            writer,
            samples_written: 0,
            finalized: false,
        })
    }

    /// The file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one buffer of processed samples, converted to 16-bit PCM.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error on write failure.
    pub fn write(&mut self, samples: &[f32]) -> io::Result<()> {
        for &sample in samples {
            let converted = (sample.clamp(-1.0, 1.0) * I16_SCALE) as i16;
            self.writer.write_all(&converted.to_le_bytes())?;
        }
        self.samples_written += samples.len() as u64;
        Ok(())
    }

    /// Patches the header sizes and flushes the file. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the header cannot be patched.
    pub fn finalize(&mut self) -> io::Result<()> {
        if self.finalized {
            return Ok(());
        }
        self.finalized = true;

        let data_size = self.samples_written * BYTES_PER_SAMPLE;
        let file_size = u64::from(WAV_HEADER_SIZE) + data_size - 8;

        self.writer.flush()?;
        let file = self.writer.get_mut();
        file.seek(SeekFrom::Start(WAV_FILE_SIZE_OFFSET))?;
        file.write_all(&(file_size as u32).to_le_bytes())?;
        file.seek(SeekFrom::Start(WAV_DATA_SIZE_OFFSET))?;
        file.write_all(&(data_size as u32).to_le_bytes())?;
        file.flush()
    }
}

/// Writes the 44-byte mono 16-bit PCM header with zeroed size fields.
fn write_header(writer: &mut BufWriter<File>, sample_rate: u32) -> io::Result<()> {
    let channels: u16 = 1;
    let block_align = channels * (WAV_BITS_PER_SAMPLE / 8);
    let byte_rate = sample_rate * u32::from(block_align);

    writer.write_all(b"RIFF")?;
    writer.write_all(&0u32.to_le_bytes())?; // patched on finalize
    writer.write_all(b"WAVE")?;
    writer.write_all(b"fmt ")?;
    writer.write_all(&WAV_FMT_CHUNK_SIZE.to_le_bytes())?;
    writer.write_all(&WAV_FORMAT_PCM.to_le_bytes())?;
    writer.write_all(&channels.to_le_bytes())?;
    writer.write_all(&sample_rate.to_le_bytes())?;
    writer.write_all(&byte_rate.to_le_bytes())?;
    writer.write_all(&block_align.to_le_bytes())?;
    writer.write_all(&WAV_BITS_PER_SAMPLE.to_le_bytes())?;
    writer.write_all(b"data")?;
    writer.write_all(&0u32.to_le_bytes())?; // patched on finalize
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_header_and_sizes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("take.wav");

        let mut recorder = WavRecorder::create(&path, 44_100).unwrap();
        recorder.write(&[0.0; 1000]).unwrap();
        recorder.finalize().unwrap();

        let data = std::fs::read(&path).unwrap();
        assert_eq!(data.len(), 44 + 1000 * 2);
        assert_eq!(&data[0..4], b"RIFF");
        assert_eq!(&data[8..12], b"WAVE");
        // data chunk size field
        let data_size = u32::from_le_bytes([data[40], data[41], data[42], data[43]]);
        assert_eq!(data_size, 2000);
    }

    #[test]
    fn test_full_scale_conversion() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scale.wav");

        let mut recorder = WavRecorder::create(&path, 44_100).unwrap();
        // Out-of-range input is clamped, in-range scales symmetrically.
        recorder.write(&[1.0, -1.0, 0.0, 2.0]).unwrap();
        recorder.finalize().unwrap();

        let data = std::fs::read(&path).unwrap();
        let sample =
            |i: usize| i16::from_le_bytes([data[44 + 2 * i], data[45 + 2 * i]]);
        assert_eq!(sample(0), 32767);
        assert_eq!(sample(1), -32767);
        assert_eq!(sample(2), 0);
        assert_eq!(sample(3), 32767);
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("idem.wav");

        let mut recorder = WavRecorder::create(&path, 44_100).unwrap();
        recorder.write(&[0.5; 10]).unwrap();
        recorder.finalize().unwrap();
        recorder.finalize().unwrap();

        let data = std::fs::read(&path).unwrap();
        assert_eq!(data.len(), 44 + 20);
    }
}
