//! CPAL-based audio output backend.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};
use imp_engine::{Mixer, MusicStream, Synthesizer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::proxy::{device_link, CpalDevice, VoiceFeed};
use crate::traits::{AudioError, AudioOutput};

/// Output rate; the MUS tick is defined against it.
pub const OUTPUT_RATE: u32 = 44100;

/// Frames rendered per pass inside the callback.
const SCRATCH_FRAMES: usize = 2048;

/// CPAL-based audio output.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    running: Arc<AtomicBool>,
}

impl CpalOutput {
    /// Open the default output device.
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;

        let mut config: StreamConfig = config.into();
        // The callback assumes 2-channel interleaving at the score rate
        config.channels = 2;
        config.sample_rate = SampleRate(OUTPUT_RATE);

        Ok(Self {
            device,
            config,
            stream: None,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Build and start the stream. The callback takes ownership of a fresh
    /// mixer and of `music`; the returned proxy drives the mixer.
    pub fn build_stream<S>(&mut self, music: MusicStream<S>) -> Result<CpalDevice, AudioError>
    where
        S: Synthesizer + 'static,
    {
        let channels = self.config.channels as usize;
        let (device, feed): (CpalDevice, VoiceFeed) = device_link();
        let mut callback = OutputCallback::new(
            feed,
            Mixer::new(self.config.sample_rate.0),
            music,
            channels,
            self.running.clone(),
        );

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| callback.fill(data),
                |err| log::error!("audio stream error: {err}"),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        self.stream = Some(stream);
        self.running.store(true, Ordering::Relaxed);
        log::info!(
            "audio: output stream running at {} Hz, {} channels",
            self.config.sample_rate.0,
            channels
        );

        Ok(device)
    }
}

/// State owned by the audio callback.
struct OutputCallback<S> {
    feed: VoiceFeed,
    mixer: Mixer,
    music: MusicStream<S>,
    scratch: Vec<f32>,
    channels: usize,
    running: Arc<AtomicBool>,
}

impl<S: Synthesizer> OutputCallback<S> {
    fn new(feed: VoiceFeed, mixer: Mixer, music: MusicStream<S>, channels: usize, running: Arc<AtomicBool>) -> Self {
        Self {
            feed,
            mixer,
            music,
            scratch: vec![0.0; SCRATCH_FRAMES * 2],
            channels: channels.max(1),
            running,
        }
    }

    /// Fill one device buffer.
    ///
    /// Commands are applied and voice state published even while output
    /// is stopped, so the command ring keeps draining; only rendering is
    /// skipped.
    fn fill(&mut self, data: &mut [f32]) {
        self.feed.apply(&mut self.mixer);
        if !self.running.load(Ordering::Relaxed) {
            data.fill(0.0);
            self.feed.publish(&self.mixer);
            return;
        }

        let channels = self.channels;
        for block in data.chunks_mut(SCRATCH_FRAMES * channels) {
            let frames = block.len() / channels;
            let stereo = &mut self.scratch[..frames * 2];
            self.music.render(stereo);
            self.mixer.mix_into(stereo);

            // Write stereo pair; zero-fill any extra channels
            for (chunk, lr) in block.chunks_mut(channels).zip(stereo.chunks_exact(2)) {
                for (i, sample) in chunk.iter_mut().enumerate() {
                    *sample = match i {
                        0 => lr[0].clamp(-1.0, 1.0),
                        1 => lr[1].clamp(-1.0, 1.0),
                        _ => 0.0,
                    };
                }
            }
        }
        self.feed.publish(&self.mixer);
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running.store(true, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    /// Silence the output. The stream itself keeps running so queued
    /// voice commands are still applied while stopped.
    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        Ok(())
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if self.stream.take().is_some() {
            log::info!("audio: output stream closed");
        }
    }
}
