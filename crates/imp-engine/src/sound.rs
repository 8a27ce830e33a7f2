//! Sound-effect channel allocation.
//!
//! [`SoundSystem`] arbitrates a fixed table of [`CHANNEL_COUNT`] channels
//! between competing effect requests. Requests only *reserve* a channel;
//! [`SoundSystem::update`] starts reserved sounds on the device, decays the
//! priority of sounds already playing and re-places them relative to the
//! listener.

use std::time::{Duration, Instant};

use imp_core::spatial::{self, Placement};
use imp_core::{
    AudioConfig, EmitterId, EmitterPositions, Listener, Position, SfxId, SfxKind, SoundBank,
    SoundBuffer, MAX_VOLUME,
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::channel::Channel;
use crate::device::{ChannelDevice, VoiceParams, VoiceStatus, CHANNEL_COUNT, UI_CHANNEL};

/// Updates closer together than this are ignored.
pub const UPDATE_INTERVAL: Duration = Duration::from_millis(10);

/// Per-update priority decay for positional sounds, `0.5^(1/7)`.
pub const FAST_DECAY: f32 = 0.905_723_66;

/// Per-update priority decay for diffuse sounds, `0.5^(1/35)`.
pub const SLOW_DECAY: f32 = 0.980_390_6;

/// Volume given to `start_sound` by callers with no opinion.
pub const DEFAULT_VOLUME: i32 = 100;

/// Remaining playback below which `pause` leaves a sound running.
const PAUSE_THRESHOLD: f32 = 0.2;

const PITCH_SEED: u64 = 0x1D;

/// Channel allocator for sound effects.
pub struct SoundSystem<D> {
    device: D,
    bank: SoundBank,
    channels: [Channel; CHANNEL_COUNT],
    ui_reserved: Option<SfxId>,
    listener: Listener,
    volume: u8,
    master: f32,
    random_pitch: bool,
    rng: Pcg32,
    last_update: Option<Instant>,
}

impl<D: ChannelDevice> SoundSystem<D> {
    pub fn new(config: &AudioConfig, bank: SoundBank, device: D) -> Self {
        let volume = config.sfx_volume.min(MAX_VOLUME);
        Self {
            device,
            bank,
            channels: Default::default(),
            ui_reserved: None,
            listener: Listener::default(),
            volume,
            master: volume as f32 / MAX_VOLUME as f32,
            random_pitch: config.random_pitch,
            rng: Pcg32::seed_from_u64(PITCH_SEED),
            last_update: None,
        }
    }

    pub fn bank(&self) -> &SoundBank {
        &self.bank
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn channels(&self) -> &[Channel; CHANNEL_COUNT] {
        &self.channels
    }

    pub fn listener(&self) -> Listener {
        self.listener
    }

    /// Set where the sounds are heard from; call once per tick.
    pub fn set_listener(&mut self, listener: Listener) {
        self.listener = listener;
    }

    pub fn max_volume(&self) -> u8 {
        MAX_VOLUME
    }

    /// Effect volume, 0..=15.
    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(MAX_VOLUME);
        self.master = self.volume as f32 / MAX_VOLUME as f32;
    }

    pub fn set_random_pitch(&mut self, enabled: bool) {
        self.random_pitch = enabled;
    }

    /// Request `sfx` from `emitter` (or from the listener itself when `None`).
    ///
    /// An existing channel for the same emitter and kind is taken over,
    /// then any idle channel. Otherwise the lowest-priority channel is
    /// evicted if the new sound's priority is at least as high; if not the
    /// request is dropped.
    pub fn start_sound<E>(
        &mut self,
        emitters: &E,
        emitter: Option<EmitterId>,
        sfx: SfxId,
        kind: SfxKind,
        volume: i32,
    ) where
        E: EmitterPositions + ?Sized,
    {
        let Some(buffer) = self.bank.get(sfx) else {
            return;
        };

        let position = match emitter {
            Some(id) => match emitters.position(id) {
                Some(pos) => Some(pos),
                None => return,
            },
            None => None,
        };

        let priority = match kind {
            SfxKind::Diffuse => volume as f32,
            SfxKind::Positional | SfxKind::Voice => {
                let dist = position.map_or(0.0, |p| spatial::distance(p, self.listener.position));
                buffer.amplitude * spatial::distance_decay(dist) * volume as f32
            }
        };

        if emitter.is_some() {
            if let Some(ch) = self
                .channels
                .iter_mut()
                .find(|ch| ch.source == emitter && ch.kind == kind)
            {
                ch.reserved = Some(sfx);
                ch.priority = priority;
                ch.volume = volume;
                ch.last_position = position;
                return;
            }
        }

        if let Some(ch) = self.channels.iter_mut().find(|ch| ch.is_idle()) {
            ch.reserve(sfx, priority, emitter, kind, volume, position);
            return;
        }

        let mut victim = 0;
        for (i, ch) in self.channels.iter().enumerate() {
            if ch.priority < self.channels[victim].priority {
                victim = i;
            }
        }
        if priority >= self.channels[victim].priority {
            self.channels[victim].reserve(sfx, priority, emitter, kind, volume, position);
        }
    }

    /// Queue a menu/HUD sound on the dedicated UI channel.
    pub fn start_ui_sound(&mut self, sfx: SfxId) {
        if self.bank.get(sfx).is_some() {
            self.ui_reserved = Some(sfx);
        }
    }

    /// Detach every sound playing from `emitter`; they fade out in place.
    pub fn stop_sound<E>(&mut self, emitters: &E, emitter: EmitterId)
    where
        E: EmitterPositions + ?Sized,
    {
        for ch in &mut self.channels {
            if ch.source == Some(emitter) {
                if let Some(pos) = emitters.position(emitter) {
                    ch.last_position = Some(pos);
                }
                ch.source = None;
                ch.volume /= 5;
            }
        }
    }

    /// Reconcile the channel table with the device. Returns `false` if
    /// the call came too soon after the previous one and was ignored.
    pub fn update<E>(&mut self, emitters: &E) -> bool
    where
        E: EmitterPositions + ?Sized,
    {
        self.update_at(Instant::now(), emitters)
    }

    /// [`update`](Self::update) against an explicit clock.
    pub fn update_at<E>(&mut self, now: Instant, emitters: &E) -> bool
    where
        E: EmitterPositions + ?Sized,
    {
        if let Some(last) = self.last_update {
            if now.saturating_duration_since(last) < UPDATE_INTERVAL {
                return false;
            }
        }

        for (i, ch) in self.channels.iter_mut().enumerate() {
            if ch.playing.is_some() {
                if self.device.status(i) != VoiceStatus::Stopped {
                    ch.priority *= match ch.kind {
                        SfxKind::Diffuse => SLOW_DECAY,
                        SfxKind::Positional | SfxKind::Voice => FAST_DECAY,
                    };
                    let params = voice_params(ch, emitters, &self.listener, self.master);
                    self.device.set_params(i, params);
                } else {
                    ch.playing = None;
                    if ch.reserved.is_none() {
                        ch.source = None;
                    }
                }
            }

            if let Some(sfx) = ch.reserved.take() {
                if ch.playing.is_some() {
                    self.device.stop(i);
                }
                match self.bank.get(sfx) {
                    Some(buffer) => {
                        let params = voice_params(ch, emitters, &self.listener, self.master);
                        let pitch = pitch_for(&mut self.rng, self.random_pitch, ch.kind, buffer);
                        self.device.play(i, buffer, params, pitch);
                        ch.playing = Some(sfx);
                    }
                    None => ch.clear(),
                }
            }
        }

        if let Some(sfx) = self.ui_reserved.take() {
            if let Some(buffer) = self.bank.get(sfx) {
                if self.device.status(UI_CHANNEL) == VoiceStatus::Playing {
                    self.device.stop(UI_CHANNEL);
                }
                let params = VoiceParams::centered(100.0 * self.master);
                self.device.play(UI_CHANNEL, buffer, params, 1.0);
            }
        }

        self.last_update = Some(now);
        true
    }

    /// Stop and clear every channel; used at level transitions.
    pub fn reset(&mut self) {
        for (i, ch) in self.channels.iter_mut().enumerate() {
            self.device.stop(i);
            ch.clear();
        }
        self.listener = Listener::default();
        self.rng = Pcg32::seed_from_u64(PITCH_SEED);
        log::debug!("sound channels reset");
    }

    /// Pause sounds that still have more than 0.2 s to play.
    pub fn pause(&mut self) {
        for i in 0..CHANNEL_COUNT {
            if self.device.status(i) == VoiceStatus::Playing
                && self.device.remaining(i) > PAUSE_THRESHOLD
            {
                self.device.pause(i);
            }
        }
    }

    pub fn resume(&mut self) {
        for i in 0..CHANNEL_COUNT {
            if self.device.status(i) == VoiceStatus::Paused {
                self.device.resume(i);
            }
        }
    }

    /// Stop every voice, the UI channel included.
    pub fn stop_all(&mut self) {
        self.reset();
        self.ui_reserved = None;
        self.device.stop(UI_CHANNEL);
    }
}

/// Where the channel's sound is, refreshing the cached position from a
/// live emitter. Sounds never tied to an emitter sit on the listener.
fn source_position<E>(ch: &mut Channel, emitters: &E, listener: &Listener) -> Position
where
    E: EmitterPositions + ?Sized,
{
    if let Some(pos) = ch.source.and_then(|id| emitters.position(id)) {
        ch.last_position = Some(pos);
        return pos;
    }
    ch.last_position.unwrap_or(listener.position)
}

fn voice_params<E>(ch: &mut Channel, emitters: &E, listener: &Listener, master: f32) -> VoiceParams
where
    E: EmitterPositions + ?Sized,
{
    let volume = master * ch.volume as f32;
    if ch.kind == SfxKind::Diffuse {
        return VoiceParams::centered(volume);
    }
    match spatial::place(source_position(ch, emitters, listener), listener) {
        Placement::Centered => VoiceParams::centered(volume),
        Placement::Placed { decay, angle } => VoiceParams::placed(volume * decay, angle),
    }
}

fn pitch_for(rng: &mut Pcg32, random_pitch: bool, kind: SfxKind, buffer: &SoundBuffer) -> f32 {
    if !random_pitch || buffer.fixed_pitch {
        return 1.0;
    }
    let spread = match kind {
        SfxKind::Voice => 0.075,
        SfxKind::Diffuse | SfxKind::Positional => 0.025,
    };
    let r = rng.random_range(0..256) as f32;
    1.0 + spread * (r - 128.0) / 128.0
}
