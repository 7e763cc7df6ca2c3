//! Software mixer
//!
//! The mixer runs inside the output device callback. Each fill first drains
//! the message ring, then sums every active source into the interleaved
//! stereo buffer with category volume applied per source and master volume
//! (or hard mute) applied to the sum.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::assets::AudioClip;
use crate::audio::channel::Consumer;
use crate::audio::{Levels, SoundCategory};
use crate::ecs::registry::ObjectId;

/// Message from the game thread to the mixer.
pub enum MixerMessage {
    /// Start playing a clip for the given object.
    Play {
        /// Object the sound belongs to.
        id: ObjectId,
        /// Decoded samples to play.
        clip: Arc<AudioClip>,
        /// Category volume the source is scaled by.
        category: SoundCategory,
        /// Per-source gain percentage, 0 to 100.
        gain: u8,
        /// Frame to rewind to at end of clip; `None` plays once.
        loop_start: Option<usize>,
    },
    /// Stop the sound playing for the given object.
    Stop {
        /// Object whose sound should stop.
        id: ObjectId,
    },
}

struct ActiveSource {
    clip: Arc<AudioClip>,
    category: SoundCategory,
    gain: u8,
    cursor: usize,
    loop_start: Option<usize>,
}

impl ActiveSource {
    /// Next stereo frame, or `None` once a non-looping clip has ended.
    fn next_frame(&mut self) -> Option<(i16, i16)> {
        if self.cursor >= self.clip.frames() {
            match self.loop_start {
                Some(start) => self.cursor = start,
                None => return None,
            }
        }
        let left = self.clip.samples[self.cursor * 2];
        let right = self.clip.samples[self.cursor * 2 + 1];
        self.cursor += 1;
        Some((left, right))
    }

    fn finished(&self) -> bool {
        self.loop_start.is_none() && self.cursor >= self.clip.frames()
    }
}

/// Sums active sources into the hardware buffer.
pub struct Mixer {
    inbox: Consumer<MixerMessage>,
    levels: Arc<Levels>,
    sources: BTreeMap<ObjectId, ActiveSource>,
}

impl Mixer {
    /// Create a mixer reading messages from `inbox` and volumes from
    /// `levels`.
    pub fn new(inbox: Consumer<MixerMessage>, levels: Arc<Levels>) -> Self {
        Self {
            inbox,
            levels,
            sources: BTreeMap::new(),
        }
    }

    /// Number of sources currently playing.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Fill an interleaved stereo buffer.
    ///
    /// Pending messages are applied in arrival order before any mixing, so a
    /// stop that chases a play in the same fill wins.
    pub fn fill(&mut self, out: &mut [i16]) {
        self.drain_inbox();

        let muted = self.levels.is_muted();
        let master = i32::from(self.levels.master());
        for frame in out.chunks_exact_mut(2) {
            let mut left = 0i32;
            let mut right = 0i32;
            for source in self.sources.values_mut() {
                if let Some((l, r)) = source.next_frame() {
                    let volume = i32::from(self.levels.category(source.category));
                    let gain = i32::from(source.gain);
                    left += i32::from(l) * gain / 100 * volume / 100;
                    right += i32::from(r) * gain / 100 * volume / 100;
                }
            }
            let (left, right) = if muted {
                (0, 0)
            } else {
                (left * master / 100, right * master / 100)
            };
            frame[0] = left.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
            frame[1] = right.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
        }

        self.sources.retain(|_, source| !source.finished());
    }

    fn drain_inbox(&mut self) {
        while let Some(message) = self.inbox.try_recv() {
            match message {
                MixerMessage::Play {
                    id,
                    clip,
                    category,
                    gain,
                    loop_start,
                } => {
                    // A loop point at or past the end can never produce a
                    // frame; treat the source as one-shot so it retires.
                    let loop_start = loop_start.filter(|start| *start < clip.frames());
                    self.sources.insert(
                        id,
                        ActiveSource {
                            clip,
                            category,
                            gain,
                            cursor: 0,
                            loop_start,
                        },
                    );
                }
                MixerMessage::Stop { id } => {
                    self.sources.remove(&id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::channel::{channel, Producer};
    use crate::config::AudioConfig;

    fn clip(samples: Vec<i16>) -> Arc<AudioClip> {
        Arc::new(AudioClip {
            samples,
            sample_rate: 44100,
        })
    }

    fn mixer_pair() -> (Producer<MixerMessage>, Mixer, Arc<Levels>) {
        let (tx, rx) = channel(8);
        let levels = Arc::new(Levels::new(&AudioConfig::default()));
        let mixer = Mixer::new(rx, Arc::clone(&levels));
        (tx, mixer, levels)
    }

    #[test]
    fn test_single_source_passes_through_at_full_volume() {
        let (mut tx, mut mixer, _levels) = mixer_pair();
        tx.send(MixerMessage::Play {
            id: 1,
            clip: clip(vec![100, -100, 200, -200]),
            category: SoundCategory::Effect,
            gain: 100,
            loop_start: None,
        })
        .ok()
        .unwrap();
        let mut out = [0i16; 4];
        mixer.fill(&mut out);
        assert_eq!(out, [100, -100, 200, -200]);
    }

    #[test]
    fn test_stop_chasing_play_in_same_fill_wins() {
        let (mut tx, mut mixer, _levels) = mixer_pair();
        tx.send(MixerMessage::Play {
            id: 1,
            clip: clip(vec![100, 100]),
            category: SoundCategory::Effect,
            gain: 100,
            loop_start: None,
        })
        .ok()
        .unwrap();
        tx.send(MixerMessage::Play {
            id: 2,
            clip: clip(vec![7, 7]),
            category: SoundCategory::Effect,
            gain: 100,
            loop_start: None,
        })
        .ok()
        .unwrap();
        tx.send(MixerMessage::Stop { id: 1 }).ok().unwrap();
        let mut out = [0i16; 2];
        mixer.fill(&mut out);
        assert_eq!(out, [7, 7]);
        assert_eq!(mixer.source_count(), 0);
    }

    #[test]
    fn test_sources_sum() {
        let (mut tx, mut mixer, _levels) = mixer_pair();
        for id in [1, 2] {
            tx.send(MixerMessage::Play {
                id,
                clip: clip(vec![10, 20]),
                category: SoundCategory::Effect,
                gain: 100,
                loop_start: None,
            })
            .ok()
            .unwrap();
        }
        let mut out = [0i16; 2];
        mixer.fill(&mut out);
        assert_eq!(out, [20, 40]);
    }

    #[test]
    fn test_mute_zeroes_output_and_sources_still_advance() {
        let (mut tx, mut mixer, levels) = mixer_pair();
        levels.set_muted(true);
        tx.send(MixerMessage::Play {
            id: 1,
            clip: clip(vec![100, 100, 50, 50]),
            category: SoundCategory::Effect,
            gain: 100,
            loop_start: None,
        })
        .ok()
        .unwrap();
        let mut out = [i16::MAX; 4];
        mixer.fill(&mut out);
        assert_eq!(out, [0, 0, 0, 0]);
        // The clip played to the end while muted.
        assert_eq!(mixer.source_count(), 0);
    }

    #[test]
    fn test_master_and_category_volumes_scale() {
        let (mut tx, mut mixer, levels) = mixer_pair();
        levels.set_master(50);
        levels.set_category(SoundCategory::Music, 50);
        tx.send(MixerMessage::Play {
            id: 1,
            clip: clip(vec![100, 100]),
            category: SoundCategory::Music,
            gain: 100,
            loop_start: None,
        })
        .ok()
        .unwrap();
        let mut out = [0i16; 2];
        mixer.fill(&mut out);
        assert_eq!(out, [25, 25]);
    }

    #[test]
    fn test_per_source_gain_scales_before_the_category() {
        let (mut tx, mut mixer, levels) = mixer_pair();
        levels.set_category(SoundCategory::Effect, 50);
        tx.send(MixerMessage::Play {
            id: 1,
            clip: clip(vec![100, 100]),
            category: SoundCategory::Effect,
            gain: 50,
            loop_start: None,
        })
        .ok()
        .unwrap();
        let mut out = [0i16; 2];
        mixer.fill(&mut out);
        assert_eq!(out, [25, 25]);
    }

    #[test]
    fn test_finished_clip_leaves_silence() {
        let (mut tx, mut mixer, _levels) = mixer_pair();
        tx.send(MixerMessage::Play {
            id: 1,
            clip: clip(vec![100, 100]),
            category: SoundCategory::Effect,
            gain: 100,
            loop_start: None,
        })
        .ok()
        .unwrap();
        let mut out = [0i16; 6];
        mixer.fill(&mut out);
        assert_eq!(out, [100, 100, 0, 0, 0, 0]);
        assert_eq!(mixer.source_count(), 0);
    }

    #[test]
    fn test_looping_clip_rewinds_to_loop_start() {
        let (mut tx, mut mixer, _levels) = mixer_pair();
        // Frames: [1,1] [2,2] [3,3]; loop back to frame 1.
        tx.send(MixerMessage::Play {
            id: 1,
            clip: clip(vec![1, 1, 2, 2, 3, 3]),
            category: SoundCategory::Music,
            gain: 100,
            loop_start: Some(1),
        })
        .ok()
        .unwrap();
        let mut out = [0i16; 10];
        mixer.fill(&mut out);
        assert_eq!(out, [1, 1, 2, 2, 3, 3, 2, 2, 3, 3]);
        assert_eq!(mixer.source_count(), 1);
    }

    #[test]
    fn test_loop_start_past_clip_end_plays_once_and_retires() {
        let (mut tx, mut mixer, _levels) = mixer_pair();
        tx.send(MixerMessage::Play {
            id: 1,
            clip: clip(vec![9, 9]),
            category: SoundCategory::Effect,
            gain: 100,
            loop_start: Some(5),
        })
        .ok()
        .unwrap();
        let mut out = [0i16; 4];
        mixer.fill(&mut out);
        assert_eq!(out, [9, 9, 0, 0]);
        assert_eq!(mixer.source_count(), 0);
    }

    #[test]
    fn test_sum_clamps_to_sample_range() {
        let (mut tx, mut mixer, _levels) = mixer_pair();
        for id in [1, 2] {
            tx.send(MixerMessage::Play {
                id,
                clip: clip(vec![i16::MAX, i16::MIN]),
                category: SoundCategory::Effect,
                gain: 100,
                loop_start: None,
            })
            .ok()
            .unwrap();
        }
        let mut out = [0i16; 2];
        mixer.fill(&mut out);
        assert_eq!(out, [i16::MAX, i16::MIN]);
    }
}
