//! CPAL output device sink.

use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, Stream, StreamConfig as CpalStreamConfig};
use parking_lot::Mutex;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tokio::sync::oneshot;

use crate::format::{i16_to_f32, i16_to_u16};
use crate::meter::MeterBuffer;
use crate::sink::AudioSink;
use crate::{AudioFormat, AudioFrames, SinkError};

/// How much audio the playback queue holds before writes are rejected.
const PLAYBACK_QUEUE: Duration = Duration::from_millis(500);

enum DeviceCommand {
    Configure {
        format: AudioFormat,
        reply: oneshot::Sender<Result<HeapProd<i16>, SinkError>>,
    },
}

/// A sink that plays audio through the default output device.
///
/// CPAL streams are not `Send` on every platform, so the device and its
/// stream live on a dedicated thread. `setup` asks that thread to build a
/// stream for the requested format; `write` only pushes samples into a
/// lock-free queue the device callback drains. When the device runs dry it
/// plays silence.
///
/// Dropping the sink stops the stream and ends the thread.
pub struct DeviceSink {
    name: String,
    commands: std_mpsc::Sender<DeviceCommand>,
    queue: Mutex<Option<HeapProd<i16>>>,
    format: Mutex<Option<AudioFormat>>,
    meter: MeterBuffer,
}

impl DeviceSink {
    /// Opens the default output device.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Device`] if there is no default output device or
    /// the output thread cannot be started.
    pub fn open_default() -> Result<Self, SinkError> {
        let (commands, command_rx) = std_mpsc::channel();
        let (opened_tx, opened_rx) = std_mpsc::sync_channel(1);

        thread::Builder::new()
            .name("dsp-router-output".to_string())
            .spawn(move || {
                let device = match cpal::default_host().default_output_device() {
                    Some(device) => device,
                    None => {
                        let _ = opened_tx.send(Err(SinkError::Device(
                            "no default output device".to_string(),
                        )));
                        return;
                    }
                };
                let name = device.name().unwrap_or_else(|_| "unknown".to_string());
                if opened_tx.send(Ok(name)).is_err() {
                    return;
                }
                run_output_thread(&device, &command_rx);
            })
            .map_err(|e| SinkError::Device(format!("failed to spawn output thread: {e}")))?;

        let device_name = opened_rx
            .recv()
            .map_err(|_| SinkError::Device("output thread exited".to_string()))??;

        tracing::info!("DeviceSink: opened output device '{device_name}'");

        Ok(Self {
            name: format!("device:{device_name}"),
            commands,
            queue: Mutex::new(None),
            format: Mutex::new(None),
            meter: MeterBuffer::for_format(AudioFormat::DEFAULT),
        })
    }
}

/// Owns the device and at most one running stream until the sink is dropped.
fn run_output_thread(device: &Device, commands: &std_mpsc::Receiver<DeviceCommand>) {
    let mut _stream: Option<Stream> = None;

    while let Ok(command) = commands.recv() {
        match command {
            DeviceCommand::Configure { format, reply } => {
                // The old stream must stop before the new one claims the device.
                _stream = None;
                let result = build_stream(device, format).map(|(stream, producer)| {
                    _stream = Some(stream);
                    producer
                });
                let _ = reply.send(result);
            }
        }
    }
    tracing::debug!("DeviceSink: output thread exiting");
}

fn build_stream(
    device: &Device,
    format: AudioFormat,
) -> Result<(Stream, HeapProd<i16>), SinkError> {
    let rate = SampleRate(format.sample_rate);
    let supported = device
        .supported_output_configs()
        .map_err(|e| SinkError::Device(e.to_string()))?
        .filter(|range| {
            range.channels() == format.channels
                && range.min_sample_rate() <= rate
                && rate <= range.max_sample_rate()
        })
        .min_by_key(|range| match range.sample_format() {
            SampleFormat::I16 => 0,
            SampleFormat::F32 => 1,
            SampleFormat::U16 => 2,
            _ => 3,
        })
        .ok_or(SinkError::UnsupportedFormat { format })?;

    let sample_format = supported.sample_format();
    let config: CpalStreamConfig = supported.with_sample_rate(rate).into();

    let capacity = format.samples_for_frames(format.frames_for_duration(PLAYBACK_QUEUE));
    let (producer, consumer) = HeapRb::<i16>::new(capacity.max(1)).split();

    let stream = match sample_format {
        SampleFormat::I16 => build_output::<i16>(device, &config, consumer, |s| s),
        SampleFormat::F32 => build_output::<f32>(device, &config, consumer, i16_to_f32),
        SampleFormat::U16 => build_output::<u16>(device, &config, consumer, i16_to_u16),
        other => {
            return Err(SinkError::Device(format!(
                "unsupported device sample format {other:?}"
            )))
        }
    }?;

    stream.play().map_err(|e| SinkError::Device(e.to_string()))?;
    tracing::debug!("DeviceSink: stream playing at {format} ({sample_format:?})");
    Ok((stream, producer))
}

fn build_output<T>(
    device: &Device,
    config: &CpalStreamConfig,
    mut consumer: HeapCons<i16>,
    convert: fn(i16) -> T,
) -> Result<Stream, SinkError>
where
    T: cpal::SizedSample,
{
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for out in data.iter_mut() {
                    *out = convert(consumer.try_pop().unwrap_or(0));
                }
            },
            |err| {
                tracing::error!("Audio output stream error: {}", err);
            },
            None,
        )
        .map_err(|e| SinkError::Device(e.to_string()))
}

#[async_trait]
impl AudioSink for DeviceSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn setup(&self, format: AudioFormat) -> bool {
        if *self.format.lock() == Some(format) {
            return true;
        }

        let (reply, reply_rx) = oneshot::channel();
        if self
            .commands
            .send(DeviceCommand::Configure { format, reply })
            .is_err()
        {
            tracing::warn!("DeviceSink {}: output thread is gone", self.name);
            return false;
        }

        match reply_rx.await {
            Ok(Ok(producer)) => {
                *self.queue.lock() = Some(producer);
                *self.format.lock() = Some(format);
                self.meter.reset_for(format);
                true
            }
            Ok(Err(e)) => {
                tracing::debug!("DeviceSink {}: cannot play {format}: {e}", self.name);
                // The previous stream was stopped to try the new format.
                *self.queue.lock() = None;
                *self.format.lock() = None;
                false
            }
            Err(_) => false,
        }
    }

    async fn write(&self, frames: &AudioFrames) -> Result<(), SinkError> {
        let format = (*self.format.lock()).ok_or(SinkError::NotConfigured)?;
        if frames.channels() != format.channels {
            return Err(SinkError::UnsupportedFormat { format });
        }

        let samples = frames.samples();
        {
            let mut queue = self.queue.lock();
            let producer = queue.as_mut().ok_or(SinkError::NotConfigured)?;
            // Whole buffers only, so the device never plays half a frame.
            if producer.vacant_len() < samples.len() {
                return Err(SinkError::write_failed("playback queue full"));
            }
            producer.push_slice(samples);
        }

        self.meter.push(samples);
        Ok(())
    }

    fn rms_samples(&self) -> Vec<i16> {
        self.meter.snapshot()
    }
}
