//! Control-side music handle and the real-time render half.
//!
//! Decoders are built on the control thread and staged in a single
//! atomic slot; a newer selection overwrites one the render side has not
//! picked up yet. The render side swaps the staged decoder in between
//! renders and hands the replaced one back over a ring so it is dropped
//! off the audio thread.

use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU8, Ordering};
use std::sync::Arc;

use imp_core::{Frame, MAX_VOLUME};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::music::decoder::Decoder;
use crate::music::mus::DecodeError;
use crate::music::synth::{MidiSequencer, Synthesizer};
use crate::music::MusicError;

const RETIRE_CAPACITY: usize = 8;
const ERROR_CAPACITY: usize = 4;
/// Frames rendered per synthesizer call.
const CHUNK_FRAMES: usize = 1024;

/// Where playback stands, as seen from either side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MusicState {
    #[default]
    Idle,
    Playing,
    EndReached,
}

impl MusicState {
    fn as_u8(self) -> u8 {
        match self {
            MusicState::Idle => 0,
            MusicState::Playing => 1,
            MusicState::EndReached => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => MusicState::Playing,
            2 => MusicState::EndReached,
            _ => MusicState::Idle,
        }
    }
}

struct Shared {
    volume: AtomicU8,
    state: AtomicU8,
}

/// `None` stops playback.
type Staged<S> = Option<Decoder<S>>;

/// Latest selection not yet adopted by the render side. Null when empty.
struct Stage<S> {
    slot: AtomicPtr<Staged<S>>,
}

impl<S> Stage<S> {
    fn empty() -> Self {
        Self {
            slot: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Put `next` in the slot and take ownership of what was there.
    fn swap(&self, next: Option<Box<Staged<S>>>) -> Option<Box<Staged<S>>> {
        let raw = next.map_or(ptr::null_mut(), Box::into_raw);
        let old = self.slot.swap(raw, Ordering::AcqRel);
        if old.is_null() {
            return None;
        }
        // SAFETY: non-null slot values come from `Box::into_raw` above, and
        // the swap hands each one to exactly one caller.
        Some(unsafe { Box::from_raw(old) })
    }
}

impl<S> Drop for Stage<S> {
    fn drop(&mut self) {
        drop(self.swap(None));
    }
}

/// Control-side handle: selects scores and sets the music volume.
pub struct Music<S> {
    shared: Arc<Shared>,
    stage: Arc<Stage<S>>,
    retired: HeapCons<Box<Staged<S>>>,
    errors: HeapCons<DecodeError>,
    midi: Option<Box<dyn MidiSequencer<S>>>,
    current: Option<String>,
}

/// Render half, owned by the audio callback.
pub struct MusicStream<S> {
    shared: Arc<Shared>,
    synth: S,
    decoder: Option<Decoder<S>>,
    stage: Arc<Stage<S>>,
    retired: HeapProd<Box<Staged<S>>>,
    errors: HeapProd<DecodeError>,
    left: Vec<f32>,
    right: Vec<f32>,
    last_error: Option<DecodeError>,
}

/// Build a connected control handle and render stream around `synth`.
pub fn music_channel<S: Synthesizer>(
    synth: S,
    midi: Option<Box<dyn MidiSequencer<S>>>,
    volume: u8,
) -> (Music<S>, MusicStream<S>) {
    let shared = Arc::new(Shared {
        volume: AtomicU8::new(volume.min(MAX_VOLUME)),
        state: AtomicU8::new(MusicState::Idle.as_u8()),
    });
    let stage = Arc::new(Stage::empty());
    let (retire_prod, retire_cons) = HeapRb::<Box<Staged<S>>>::new(RETIRE_CAPACITY).split();
    let (error_prod, error_cons) = HeapRb::<DecodeError>::new(ERROR_CAPACITY).split();
    let chunk = CHUNK_FRAMES.max(synth.block_size());

    let music = Music {
        shared: Arc::clone(&shared),
        stage: Arc::clone(&stage),
        retired: retire_cons,
        errors: error_cons,
        midi,
        current: None,
    };
    let stream = MusicStream {
        shared,
        synth,
        decoder: None,
        stage,
        retired: retire_prod,
        errors: error_prod,
        left: vec![0.0; chunk],
        right: vec![0.0; chunk],
        last_error: None,
    };
    (music, stream)
}

impl<S: Synthesizer> Music<S> {
    /// Select a score. Selecting the track already playing does nothing.
    ///
    /// The decoder is built here; the render side adopts it on its next
    /// render and resets the synthesizer. A selection the render side has
    /// not adopted yet is replaced.
    pub fn start_music(&mut self, track: &str, data: &[u8], looping: bool) -> Result<(), MusicError> {
        if self.current.as_deref() == Some(track) {
            return Ok(());
        }
        let decoder = Decoder::from_score(data, looping, self.midi.as_deref())?;
        self.stage(Some(decoder));
        log::info!("music: playing {track}");
        self.current = Some(track.to_owned());
        Ok(())
    }

    /// Stop the current score, discarding any selection not yet adopted.
    pub fn stop(&mut self) {
        self.stage(None);
        self.current = None;
    }

    pub fn current_track(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn volume(&self) -> u8 {
        self.shared.volume.load(Ordering::Relaxed)
    }

    pub fn set_volume(&self, volume: u8) {
        self.shared
            .volume
            .store(volume.min(MAX_VOLUME), Ordering::Relaxed);
    }

    pub fn state(&self) -> MusicState {
        MusicState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// Oldest decode failure the render side reported, if any.
    pub fn take_error(&mut self) -> Option<DecodeError> {
        self.collect();
        let err = self.errors.try_pop();
        if let Some(err) = err {
            log::warn!("music: decode failed: {err}");
        }
        err
    }

    fn stage(&mut self, next: Staged<S>) {
        self.collect();
        if let Some(replaced) = self.stage.swap(Some(Box::new(next))) {
            if let Some(decoder) = &*replaced {
                log::debug!("music: replacing unplayed {:?} score", decoder.format());
            }
        }
    }

    /// Drop decoders the render side has finished with.
    fn collect(&mut self) {
        while self.retired.try_pop().is_some() {}
    }
}

impl<S: Synthesizer> MusicStream<S> {
    pub fn synth(&self) -> &S {
        &self.synth
    }

    pub fn state(&self) -> MusicState {
        MusicState::from_u8(self.shared.state.load(Ordering::Relaxed))
    }

    pub fn last_error(&self) -> Option<DecodeError> {
        self.last_error
    }

    /// Fill interleaved stereo `out`. Real-time safe.
    pub fn render(&mut self, out: &mut [f32]) {
        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| self.render_inner(out));
        #[cfg(not(feature = "alloc_check"))]
        self.render_inner(out);
    }

    /// Render `count` frames into a new buffer, for offline use.
    pub fn render_frames(&mut self, count: usize) -> Vec<Frame> {
        let mut interleaved = vec![0.0f32; count * 2];
        self.render(&mut interleaved);
        interleaved
            .chunks_exact(2)
            .map(|lr| Frame::from_f32(lr[0], lr[1]))
            .collect()
    }

    /// Swap in the staged selection, if any.
    fn adopt_staged(&mut self) {
        let Some(mut staged) = self.stage.swap(None) else {
            return;
        };
        let next = staged.take();

        self.synth.reset();
        self.last_error = None;
        let state = if next.is_some() { MusicState::Playing } else { MusicState::Idle };
        // The emptied box carries the old decoder back to the control side.
        *staged = core::mem::replace(&mut self.decoder, next);
        // A full ring drops here; the control side drains it on every call.
        let _ = self.retired.try_push(staged);
        self.shared.state.store(state.as_u8(), Ordering::Release);
    }

    fn render_inner(&mut self, out: &mut [f32]) {
        self.adopt_staged();

        let gain = 2.0 * self.shared.volume.load(Ordering::Relaxed) as f32 / MAX_VOLUME as f32;
        let frames = out.len() / 2;
        let mut done = 0;

        while done < frames {
            let n = (frames - done).min(self.left.len());
            let (left, right) = (&mut self.left[..n], &mut self.right[..n]);
            left.fill(0.0);
            right.fill(0.0);

            if let Some(decoder) = self.decoder.as_mut() {
                if let Err(err) = decoder.render(&mut self.synth, left, right) {
                    self.last_error = Some(err);
                    let _ = self.errors.try_push(err);
                }
                if decoder.is_finished() {
                    self.shared
                        .state
                        .store(MusicState::EndReached.as_u8(), Ordering::Release);
                }
            }

            let dst = &mut out[done * 2..(done + n) * 2];
            for (i, lr) in dst.chunks_exact_mut(2).enumerate() {
                lr[0] = (left[i] * gain).clamp(-1.0, 1.0);
                lr[1] = (right[i] * gain).clamp(-1.0, 1.0);
            }
            done += n;
        }
        out[frames * 2..].fill(0.0);
    }
}
