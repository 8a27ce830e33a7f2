//! Sound bank loading from `DS*` lumps.

use imp_core::{SoundBank, SoundBuffer};
use imp_formats::{load_dmx_sound, load_wav, Wad};

/// Load every named effect from `wad`.
///
/// Each name is looked up as `DS<NAME>`. Missing, short or empty lumps
/// still get an id but stay unplayable.
pub fn load_sound_bank(wad: &Wad, names: &[&str]) -> SoundBank {
    let mut bank = SoundBank::new();
    for name in names {
        let lump = format!("DS{}", name.to_ascii_uppercase());
        bank.insert(name, load_effect(wad, &lump, name));
    }
    log::info!(
        "sound: loaded {} of {} effects",
        bank.playable_count(),
        bank.len()
    );
    bank
}

fn load_effect(wad: &Wad, lump: &str, name: &str) -> Option<SoundBuffer> {
    let Some(data) = wad.lump(lump) else {
        log::debug!("sound: {lump} missing");
        return None;
    };

    let loaded = if data.starts_with(b"RIFF") {
        load_wav(data, name).map(Some)
    } else {
        load_dmx_sound(data, name)
    };

    match loaded {
        Ok(Some(buffer)) if !buffer.samples.is_empty() => Some(buffer),
        Ok(_) => {
            log::debug!("sound: {lump} has no samples");
            None
        }
        Err(e) => {
            log::debug!("sound: {lump} unreadable: {e}");
            None
        }
    }
}
