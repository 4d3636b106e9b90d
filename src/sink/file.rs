//! WAV file sink implementation.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::meter::MeterBuffer;
use crate::sink::AudioSink;
use crate::{AudioFormat, AudioFrames, SinkError};

// Canonical 44-byte PCM header: RIFF, "fmt " and "data" chunk headers.
// See: http://soundfile.sapp.org/doc/WaveFormat/
const WAV_HEADER_LEN: usize = 44;
const WAV_FMT_CHUNK_LEN: u32 = 16;
const WAV_FORMAT_PCM: u16 = 1;
const WAV_BITS_PER_SAMPLE: u16 = 16;
const BYTES_PER_SAMPLE: u16 = WAV_BITS_PER_SAMPLE / 8;

/// A sink that records the routed audio to a 16-bit PCM WAV file.
///
/// The file is created on the first write and its header is finalized by
/// [`finish`](Self::finish). The format can be changed with `setup` until the
/// first sample is written; after that only the recorded format is accepted,
/// so a recording never mixes formats. All file I/O runs in the blocking
/// thread pool.
///
/// # Example
///
/// ```no_run
/// use dsp_router::FileSink;
///
/// let sink = FileSink::wav("session.wav");
/// // Hand it to DspRouter::set_sink, then call sink.finish() when done.
/// ```
pub struct FileSink {
    name: String,
    path: Arc<PathBuf>,
    state: Arc<Mutex<FileState>>,
    meter: MeterBuffer,
}

#[derive(Default)]
struct FileState {
    writer: Option<BufWriter<File>>,
    format: Option<AudioFormat>,
    samples_written: u64,
    finished: bool,
}

impl FileSink {
    /// Creates a new file sink that writes WAV format.
    pub fn wav(path: impl AsRef<Path>) -> Self {
        Self {
            name: format!("file:{}", path.as_ref().display()),
            path: Arc::new(path.as_ref().to_path_buf()),
            state: Arc::new(Mutex::new(FileState::default())),
            meter: MeterBuffer::for_format(AudioFormat::DEFAULT),
        }
    }

    /// Returns the path being recorded to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of samples written so far.
    pub async fn samples_written(&self) -> u64 {
        self.state.lock().await.samples_written
    }

    /// Flushes buffered data to disk without finalizing the header.
    pub async fn flush(&self) -> Result<(), SinkError> {
        let state = Arc::clone(&self.state);
        let path = Arc::clone(&self.path);

        tokio::task::spawn_blocking(move || {
            let mut state = state.blocking_lock();
            if let Some(writer) = state.writer.as_mut() {
                writer.flush().map_err(|e| SinkError::file_error(&*path, e))?;
            }
            Ok(())
        })
        .await
        .map_err(|e| SinkError::custom(format!("flush task panicked: {e}")))?
    }

    /// Writes the final sizes into the header and closes the file.
    ///
    /// Further writes are rejected. Finishing a sink that never received
    /// audio creates no file.
    pub async fn finish(&self) -> Result<(), SinkError> {
        let state = Arc::clone(&self.state);
        let path = Arc::clone(&self.path);

        tokio::task::spawn_blocking(move || {
            let mut state = state.blocking_lock();
            finalize_blocking(&mut state, &path)
        })
        .await
        .map_err(|e| SinkError::custom(format!("finalize task panicked: {e}")))?
    }
}

fn wav_header(format: AudioFormat, data_len: u32) -> Vec<u8> {
    let block_align = format.channels * BYTES_PER_SAMPLE;
    let byte_rate = format.sample_rate * u32::from(block_align);
    // Header length fits in u32; the RIFF size excludes its own 8-byte preamble.
    let riff_len = data_len.saturating_add(WAV_HEADER_LEN as u32 - 8);

    let mut header = Vec::with_capacity(WAV_HEADER_LEN);
    header.extend_from_slice(b"RIFF");
    header.extend_from_slice(&riff_len.to_le_bytes());
    header.extend_from_slice(b"WAVE");

    header.extend_from_slice(b"fmt ");
    header.extend_from_slice(&WAV_FMT_CHUNK_LEN.to_le_bytes());
    header.extend_from_slice(&WAV_FORMAT_PCM.to_le_bytes());
    header.extend_from_slice(&format.channels.to_le_bytes());
    header.extend_from_slice(&format.sample_rate.to_le_bytes());
    header.extend_from_slice(&byte_rate.to_le_bytes());
    header.extend_from_slice(&block_align.to_le_bytes());
    header.extend_from_slice(&WAV_BITS_PER_SAMPLE.to_le_bytes());

    header.extend_from_slice(b"data");
    header.extend_from_slice(&data_len.to_le_bytes());
    header
}

fn write_blocking(
    state: &mut FileState,
    path: &Path,
    format: AudioFormat,
    samples: &[i16],
) -> Result<(), SinkError> {
    if state.finished {
        return Err(SinkError::write_failed("recording already finished"));
    }
    // `setup` may have switched formats since the caller read it.
    if state.format != Some(format) {
        return Err(SinkError::UnsupportedFormat { format });
    }

    if state.writer.is_none() {
        let file = File::create(path).map_err(|e| SinkError::file_error(path, e))?;
        let mut writer = BufWriter::new(file);
        // Sizes are patched in by `finish`.
        writer
            .write_all(&wav_header(format, 0))
            .map_err(|e| SinkError::file_error(path, e))?;
        state.writer = Some(writer);
    }

    if let Some(writer) = state.writer.as_mut() {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        writer
            .write_all(&bytes)
            .map_err(|e| SinkError::file_error(path, e))?;
        state.samples_written += samples.len() as u64;
    }
    Ok(())
}

fn finalize_blocking(state: &mut FileState, path: &Path) -> Result<(), SinkError> {
    state.finished = true;
    let Some(mut writer) = state.writer.take() else {
        return Ok(());
    };
    let Some(format) = state.format else {
        return Ok(());
    };

    let data_len = u32::try_from(state.samples_written * u64::from(BYTES_PER_SAMPLE))
        .unwrap_or(u32::MAX);

    writer
        .seek(SeekFrom::Start(0))
        .and_then(|_| writer.write_all(&wav_header(format, data_len)))
        .and_then(|()| writer.flush())
        .map_err(|e| SinkError::file_error(path, e))?;

    tracing::debug!(
        "FileSink: finalized {} ({} samples)",
        path.display(),
        state.samples_written
    );
    Ok(())
}

#[async_trait]
impl AudioSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn setup(&self, format: AudioFormat) -> bool {
        let mut state = self.state.lock().await;
        if state.format == Some(format) {
            return true;
        }
        if state.writer.is_some() || state.finished {
            tracing::warn!(
                "FileSink {}: cannot switch to {format}, recording already started",
                self.name
            );
            return false;
        }

        state.format = Some(format);
        self.meter.reset_for(format);
        true
    }

    async fn write(&self, frames: &AudioFrames) -> Result<(), SinkError> {
        let format = self
            .state
            .lock()
            .await
            .format
            .ok_or(SinkError::NotConfigured)?;
        if frames.channels() != format.channels {
            return Err(SinkError::UnsupportedFormat { format });
        }

        tracing::trace!(
            "FileSink {}: writing {} frames",
            self.name,
            frames.frame_count()
        );

        let owned = frames.clone();
        let state = Arc::clone(&self.state);
        let path = Arc::clone(&self.path);

        tokio::task::spawn_blocking(move || {
            let mut state = state.blocking_lock();
            write_blocking(&mut state, &path, format, owned.samples())
        })
        .await
        .map_err(|e| SinkError::custom(format!("write task panicked: {e}")))??;

        self.meter.push(frames.samples());
        Ok(())
    }

    fn rms_samples(&self) -> Vec<i16> {
        self.meter.snapshot()
    }
}
