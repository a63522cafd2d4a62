//! Microphone and speaker wiring.
//!
//! Both cpal streams are built once at startup and stay on the main thread.
//! Microphone samples fan out through a broadcast channel that the live
//! recognition backend taps while a capture binding is active; synthesized
//! speech is resampled into a ring buffer drained by the output callback.

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FrameCount, StreamConfig};
use interview_core::error::PlaybackError;
use interview_core::playback::AudioSink;
use interview_native_utils::{audio, device};
use ringbuf::HeapProd;
use ringbuf::traits::{Consumer, Producer, Split};
use rubato::{FastFixedIn, Resampler};
use tokio::sync::broadcast;

use crate::config::{INPUT_CHUNK_SIZE, OUTPUT_BUFFER_SECS, OUTPUT_CHUNK_SIZE};

/// Pushes decoded 24 kHz speech into the playback ring buffer, resampled to
/// the device rate. Enqueue-and-return: audible playback continues on the
/// audio thread. When the buffer is full the tail is dropped rather than
/// blocking the session.
pub struct RingBufferSink {
    producer: HeapProd<f32>,
    resampler: FastFixedIn<f32>,
}

impl AudioSink for RingBufferSink {
    fn play(&mut self, samples: &[f32]) -> Result<(), PlaybackError> {
        let chunk_size = self.resampler.input_frames_next();
        let mut dropped = 0usize;
        for chunk in audio::split_for_chunks(samples, chunk_size) {
            let resampled = self
                .resampler
                .process(&[chunk.as_slice()], None)
                .map_err(|e| PlaybackError::Sink(e.to_string()))?;
            if let Some(resampled) = resampled.first() {
                for sample in resampled {
                    if self.producer.try_push(*sample).is_err() {
                        dropped += 1;
                    }
                }
            }
        }
        if dropped > 0 {
            tracing::warn!("playback buffer full, dropped {dropped} samples");
        }
        Ok(())
    }
}

/// Builds the output stream and the sink feeding it. The returned stream must
/// be kept alive for as long as playback is wanted.
pub fn build_output(device_name: Option<String>) -> Result<(cpal::Stream, RingBufferSink)> {
    let output =
        device::get_or_default_output(device_name).context("Failed to get audio output device")?;
    tracing::info!("Using output device: {:?}", output.name()?);

    let output_config = output
        .default_output_config()
        .context("Failed to get default output config")?;
    let output_config = StreamConfig {
        channels: output_config.channels(),
        sample_rate: output_config.sample_rate(),
        buffer_size: cpal::BufferSize::Fixed(FrameCount::from(OUTPUT_CHUNK_SIZE as u32)),
    };
    let channel_count = output_config.channels as usize;
    let sample_rate = output_config.sample_rate.0 as f64;
    tracing::debug!("Output stream config: {:?}", &output_config);

    let buffer = audio::shared_buffer(sample_rate as usize * OUTPUT_BUFFER_SECS);
    let (producer, mut consumer) = buffer.split();

    // Pull samples from the ring buffer, duplicating mono onto the first two
    // channels and silencing the rest.
    let output_data_fn = move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
        for frame in data.chunks_mut(channel_count) {
            let sample = consumer.try_pop().unwrap_or(0.0);
            for slot in frame.iter_mut() {
                *slot = 0.0;
            }
            for slot in frame.iter_mut().take(2) {
                *slot = sample;
            }
        }
    };

    let stream = output.build_output_stream(
        &output_config,
        output_data_fn,
        move |err| tracing::error!("An error occurred on output stream: {}", err),
        None,
    )?;
    stream.play()?;

    let resampler =
        audio::create_resampler(audio::PLAYBACK_SAMPLE_RATE, sample_rate, OUTPUT_CHUNK_SIZE)?;

    Ok((stream, RingBufferSink { producer, resampler }))
}

/// Builds the always-on microphone stream. Samples are mixed down to mono and
/// broadcast; the recognition backend subscribes per capture binding. Returns
/// the stream, the broadcast handle, and the device sample rate.
pub fn build_input(
    device_name: Option<String>,
) -> Result<(cpal::Stream, broadcast::Sender<Vec<f32>>, f64)> {
    let input =
        device::get_or_default_input(device_name).context("Failed to get audio input device")?;
    tracing::info!("Using input device: {:?}", input.name()?);

    let input_config = input
        .default_input_config()
        .context("Failed to get default input config")?;
    let input_config = StreamConfig {
        channels: input_config.channels(),
        sample_rate: input_config.sample_rate(),
        buffer_size: cpal::BufferSize::Fixed(FrameCount::from(INPUT_CHUNK_SIZE as u32)),
    };
    let channel_count = input_config.channels as usize;
    let sample_rate = input_config.sample_rate.0 as f64;
    tracing::debug!("Input stream config: {:?}", &input_config);

    let (mic_tx, _) = broadcast::channel::<Vec<f32>>(32);
    let mic_for_callback = mic_tx.clone();

    let input_data_fn = move |data: &[f32], _: &cpal::InputCallbackInfo| {
        let mono = if channel_count > 1 {
            data.chunks(channel_count)
                .map(|frame| frame.iter().sum::<f32>() / channel_count as f32)
                .collect::<Vec<f32>>()
        } else {
            data.to_vec()
        };
        // No subscribers simply means no capture binding is active.
        let _ = mic_for_callback.send(mono);
    };

    let stream = input.build_input_stream(
        &input_config,
        input_data_fn,
        move |err| tracing::error!("An error occurred on input stream: {}", err),
        None,
    )?;
    stream.play()?;

    Ok((stream, mic_tx, sample_rate))
}
