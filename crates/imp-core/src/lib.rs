//! Core types for the imp audio subsystem.
//!
//! Defines the data shared between the asset loaders, the channel
//! allocator and the music sequencer: fixed-point world coordinates,
//! emitter handles, sound buffers and the audio configuration.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod bank;
mod config;
mod emitter;
mod fixed;
mod frame;
mod sound;
pub mod spatial;

pub use bank::{SfxId, SoundBank};
pub use config::{AudioConfig, MAX_VOLUME};
pub use emitter::{EmitterId, EmitterPositions, Listener, Position};
pub use fixed::{Angle, Fixed};
pub use frame::Frame;
pub use sound::{peak_amplitude, SfxKind, SoundBuffer, FIXED_PITCH_SFX};
