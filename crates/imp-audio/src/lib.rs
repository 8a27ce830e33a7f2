//! Real-time audio output for imp.
//!
//! The cpal callback owns the software [`Mixer`](imp_engine::Mixer) and
//! the [`MusicStream`](imp_engine::MusicStream); the simulation talks to
//! the mixer through [`CpalDevice`].

mod cpal_backend;
mod proxy;
mod traits;

pub use cpal_backend::{CpalOutput, OUTPUT_RATE};
pub use proxy::{device_link, CpalDevice, DeviceCommand, VoiceFeed, COMMAND_CAPACITY};
pub use traits::{AudioError, AudioOutput};
