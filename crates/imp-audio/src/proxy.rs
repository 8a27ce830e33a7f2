//! Simulation-side proxy for the mixer living in the audio callback.
//!
//! Commands travel over a lock-free ring. The callback publishes each
//! voice's status and remaining time through atomics, tagged with how
//! many commands for that voice it has applied. Until the callback has
//! caught up, the proxy answers from its own record of what it sent.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

use imp_core::SoundBuffer;
use imp_engine::{ChannelDevice, Mixer, VoiceParams, VoiceStatus, VOICE_COUNT};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Commands that may be queued before the callback drains them.
pub const COMMAND_CAPACITY: usize = 64;

/// One mixer operation sent to the audio thread.
#[derive(Clone, Debug)]
pub enum DeviceCommand {
    Play {
        voice: usize,
        buffer: Arc<SoundBuffer>,
        params: VoiceParams,
        pitch: f32,
    },
    SetParams { voice: usize, params: VoiceParams },
    Stop(usize),
    Pause(usize),
    Resume(usize),
}

impl DeviceCommand {
    fn voice(&self) -> usize {
        match self {
            DeviceCommand::Play { voice, .. } | DeviceCommand::SetParams { voice, .. } => *voice,
            DeviceCommand::Stop(voice) | DeviceCommand::Pause(voice) | DeviceCommand::Resume(voice) => {
                *voice
            }
        }
    }
}

#[derive(Default)]
struct VoiceSlot {
    status: AtomicU8,
    /// Seconds left, as `f32` bits.
    remaining: AtomicU32,
    applied: AtomicU32,
}

type Telemetry = [VoiceSlot; VOICE_COUNT];

/// [`ChannelDevice`] that forwards to a [`Mixer`] on the audio thread.
pub struct CpalDevice {
    commands: HeapProd<DeviceCommand>,
    telemetry: Arc<Telemetry>,
    sent: [u32; VOICE_COUNT],
    shadow: [(VoiceStatus, f32); VOICE_COUNT],
}

/// Callback half: applies queued commands and publishes voice state.
pub struct VoiceFeed {
    commands: HeapCons<DeviceCommand>,
    telemetry: Arc<Telemetry>,
    applied: [u32; VOICE_COUNT],
}

/// Build a connected proxy and callback feed.
pub fn device_link() -> (CpalDevice, VoiceFeed) {
    let (prod, cons) = HeapRb::<DeviceCommand>::new(COMMAND_CAPACITY).split();
    let telemetry: Arc<Telemetry> = Arc::new(Default::default());
    (
        CpalDevice {
            commands: prod,
            telemetry: Arc::clone(&telemetry),
            sent: [0; VOICE_COUNT],
            shadow: [(VoiceStatus::Stopped, 0.0); VOICE_COUNT],
        },
        VoiceFeed {
            commands: cons,
            telemetry,
            applied: [0; VOICE_COUNT],
        },
    )
}

impl CpalDevice {
    fn send(&mut self, command: DeviceCommand, status: Option<VoiceStatus>, remaining: Option<f32>) {
        let voice = command.voice();
        if voice >= VOICE_COUNT {
            return;
        }
        let caught_up = self.telemetry[voice].applied.load(Ordering::Acquire) == self.sent[voice];
        if self.commands.try_push(command).is_err() {
            log::warn!("audio: command queue full, dropping command for voice {voice}");
            return;
        }
        if caught_up {
            self.shadow[voice] = self.published(voice);
        }
        self.sent[voice] = self.sent[voice].wrapping_add(1);
        if let Some(status) = status {
            self.shadow[voice].0 = status;
        }
        if let Some(remaining) = remaining {
            self.shadow[voice].1 = remaining;
        }
    }

    fn published(&self, voice: usize) -> (VoiceStatus, f32) {
        let slot = &self.telemetry[voice];
        (
            VoiceStatus::from_u8(slot.status.load(Ordering::Relaxed)),
            f32::from_bits(slot.remaining.load(Ordering::Relaxed)),
        )
    }

    fn current(&self, voice: usize) -> (VoiceStatus, f32) {
        match self.telemetry.get(voice) {
            None => (VoiceStatus::Stopped, 0.0),
            Some(slot) if slot.applied.load(Ordering::Acquire) == self.sent[voice] => {
                self.published(voice)
            }
            Some(_) => self.shadow[voice],
        }
    }
}

impl ChannelDevice for CpalDevice {
    fn status(&self, voice: usize) -> VoiceStatus {
        self.current(voice).0
    }

    fn play(&mut self, voice: usize, buffer: &Arc<SoundBuffer>, params: VoiceParams, pitch: f32) {
        let remaining = buffer.duration() / pitch.max(f32::EPSILON);
        self.send(
            DeviceCommand::Play {
                voice,
                buffer: Arc::clone(buffer),
                params,
                pitch,
            },
            Some(VoiceStatus::Playing),
            Some(remaining),
        );
    }

    fn set_params(&mut self, voice: usize, params: VoiceParams) {
        self.send(DeviceCommand::SetParams { voice, params }, None, None);
    }

    fn stop(&mut self, voice: usize) {
        self.send(DeviceCommand::Stop(voice), Some(VoiceStatus::Stopped), Some(0.0));
    }

    fn pause(&mut self, voice: usize) {
        self.send(DeviceCommand::Pause(voice), Some(VoiceStatus::Paused), None);
    }

    fn resume(&mut self, voice: usize) {
        self.send(DeviceCommand::Resume(voice), Some(VoiceStatus::Playing), None);
    }

    fn remaining(&self, voice: usize) -> f32 {
        self.current(voice).1
    }
}

impl VoiceFeed {
    /// Apply every queued command to `mixer`. Real-time safe as long as
    /// the sound bank outlives the commands.
    pub fn apply(&mut self, mixer: &mut Mixer) {
        while let Some(command) = self.commands.try_pop() {
            let voice = command.voice();
            match command {
                DeviceCommand::Play {
                    voice,
                    buffer,
                    params,
                    pitch,
                } => mixer.play(voice, &buffer, params, pitch),
                DeviceCommand::SetParams { voice, params } => mixer.set_params(voice, params),
                DeviceCommand::Stop(voice) => mixer.stop(voice),
                DeviceCommand::Pause(voice) => mixer.pause(voice),
                DeviceCommand::Resume(voice) => mixer.resume(voice),
            }
            if let Some(count) = self.applied.get_mut(voice) {
                *count = count.wrapping_add(1);
            }
        }
    }

    /// Publish every voice's state after rendering.
    pub fn publish(&self, mixer: &Mixer) {
        for (voice, slot) in self.telemetry.iter().enumerate() {
            slot.status
                .store(mixer.status(voice).as_u8(), Ordering::Relaxed);
            slot.remaining
                .store(mixer.remaining(voice).to_bits(), Ordering::Relaxed);
            slot.applied.store(self.applied[voice], Ordering::Release);
        }
    }
}
