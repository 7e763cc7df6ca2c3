//! Audio output
//!
//! Playback is split across two threads: systems on the game thread send
//! messages through a fixed-capacity SPSC channel, and the mixer drains them
//! inside the output device callback before mixing active sources into the
//! hardware buffer. Volume levels are shared atomics so they apply
//! immediately without a channel round trip.

pub mod channel;
pub mod mixer;
pub mod system;

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use thiserror::Error;

pub use channel::{channel, ChannelFull, Consumer, Producer, CHANNEL_SIZE};
pub use mixer::{Mixer, MixerMessage};
pub use system::AudioSystem;

use crate::config::AudioConfig;

/// Audio subsystem error.
#[derive(Debug, Error)]
pub enum AudioError {
    /// No output device is available on the host.
    #[error("no audio output device available")]
    NoOutputDevice,

    /// The output device rejected the stream config query.
    #[error("failed to query output stream config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    /// The output stream could not be built.
    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    /// The output stream could not be started.
    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    /// The device's sample format is not supported by the mixer.
    #[error("unsupported output sample format {0:?}")]
    UnsupportedFormat(cpal::SampleFormat),

    /// The device is not stereo.
    #[error("unsupported output channel count {0}")]
    UnsupportedChannelCount(u16),
}

/// Volume category a sound is mixed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCategory {
    /// Background music.
    Music,
    /// Gameplay effects.
    Effect,
    /// Interface sounds.
    Ui,
}

impl SoundCategory {
    const COUNT: usize = 3;

    fn index(self) -> usize {
        match self {
            SoundCategory::Music => 0,
            SoundCategory::Effect => 1,
            SoundCategory::Ui => 2,
        }
    }
}

/// Volume state shared between the game thread and the mixer callback.
///
/// Volumes are percentages, 0 to 100. Mute is a hard gate applied after
/// mixing, independent of the stored master volume.
pub struct Levels {
    master: AtomicU8,
    muted: AtomicBool,
    categories: [AtomicU8; SoundCategory::COUNT],
}

impl Levels {
    /// Create levels from the audio configuration, all categories at full
    /// volume.
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            master: AtomicU8::new(config.master_volume.min(100)),
            muted: AtomicBool::new(config.muted),
            categories: [
                AtomicU8::new(100),
                AtomicU8::new(100),
                AtomicU8::new(100),
            ],
        }
    }

    /// Master volume percentage.
    pub fn master(&self) -> u8 {
        self.master.load(Ordering::Relaxed)
    }

    /// Set the master volume percentage, clamped to 100.
    pub fn set_master(&self, volume: u8) {
        self.master.store(volume.min(100), Ordering::Relaxed);
    }

    /// Whether output is muted.
    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }

    /// Mute or unmute output.
    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
    }

    /// Volume percentage for a category.
    pub fn category(&self, category: SoundCategory) -> u8 {
        self.categories[category.index()].load(Ordering::Relaxed)
    }

    /// Set the volume percentage for a category, clamped to 100.
    pub fn set_category(&self, category: SoundCategory, volume: u8) {
        self.categories[category.index()].store(volume.min(100), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_clamp_to_100() {
        let levels = Levels::new(&AudioConfig::default());
        levels.set_master(200);
        assert_eq!(levels.master(), 100);
        levels.set_category(SoundCategory::Music, 130);
        assert_eq!(levels.category(SoundCategory::Music), 100);
    }

    #[test]
    fn test_levels_start_from_config() {
        let levels = Levels::new(&AudioConfig {
            master_volume: 40,
            muted: true,
        });
        assert_eq!(levels.master(), 40);
        assert!(levels.is_muted());
        assert_eq!(levels.category(SoundCategory::Effect), 100);
    }
}
