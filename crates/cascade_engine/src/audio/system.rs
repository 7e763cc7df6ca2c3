//! Audio output system
//!
//! Owns the output stream and the sending half of the sound channel. Attach
//! an [`AudioEmitter`] to start a sound; detach it (or destroy the object) to
//! stop it. The stream object is kept alive for the life of the system; the
//! mixer lives inside the device callback.

use std::any::{Any, TypeId};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{error, info, warn};

use crate::audio::channel::{channel, Producer, CHANNEL_SIZE};
use crate::audio::mixer::{Mixer, MixerMessage};
use crate::audio::{AudioError, Levels};
use crate::config::AudioConfig;
use crate::ecs::components::AudioEmitter;
use crate::ecs::registry::ObjectId;
use crate::ecs::system::System;
use crate::engine::{Engine, EngineError};

/// Real-time audio playback system.
pub struct AudioSystem {
    outbox: Producer<MixerMessage>,
    levels: Arc<Levels>,
    stream: cpal::Stream,
    dropped: u64,
}

impl AudioSystem {
    /// Open the default output device and build the mixer stream.
    ///
    /// The stream is created paused; [`System::init`] starts it when the
    /// owning state is pushed.
    pub fn new(config: &AudioConfig) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;
        let stream_config = device.default_output_config()?;
        if stream_config.channels() != 2 {
            return Err(AudioError::UnsupportedChannelCount(stream_config.channels()));
        }
        info!(
            "audio output: {} Hz, format {:?}",
            stream_config.sample_rate(),
            stream_config.sample_format()
        );

        let (outbox, inbox) = channel(CHANNEL_SIZE);
        let levels = Arc::new(Levels::new(config));
        let mut mixer = Mixer::new(inbox, Arc::clone(&levels));
        let err_fn = |err| error!("audio stream error: {err}");

        let stream = match stream_config.sample_format() {
            cpal::SampleFormat::I16 => device.build_output_stream(
                &stream_config.into(),
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    mixer.fill(data);
                },
                err_fn,
                None,
            )?,
            cpal::SampleFormat::F32 => {
                let mut scratch: Vec<i16> = Vec::new();
                device.build_output_stream(
                    &stream_config.into(),
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        scratch.resize(data.len(), 0);
                        mixer.fill(&mut scratch);
                        for (out, sample) in data.iter_mut().zip(&scratch) {
                            *out = f32::from(*sample) / 32768.0;
                        }
                    },
                    err_fn,
                    None,
                )?
            }
            other => return Err(AudioError::UnsupportedFormat(other)),
        };

        Ok(Self {
            outbox,
            levels,
            stream,
            dropped: 0,
        })
    }

    /// Shared volume levels; writes apply on the next mixed frame.
    pub fn levels(&self) -> &Arc<Levels> {
        &self.levels
    }

    /// Messages dropped because the sound channel was full.
    pub fn dropped_messages(&self) -> u64 {
        self.dropped
    }

    fn send(&mut self, message: MixerMessage) {
        if self.outbox.send(message).is_err() {
            self.dropped += 1;
            warn!(
                "sound channel full, message dropped ({} total)",
                self.dropped
            );
        }
    }

    fn stop(&mut self, id: ObjectId) {
        self.send(MixerMessage::Stop { id });
    }
}

impl System for AudioSystem {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn init(&mut self, _engine: &mut Engine) -> Result<(), EngineError> {
        self.stream.play().map_err(AudioError::from)?;
        info!("audio stream started");
        Ok(())
    }

    fn component_added(
        &mut self,
        engine: &mut Engine,
        id: ObjectId,
        type_id: TypeId,
    ) -> Result<(), EngineError> {
        if type_id != TypeId::of::<AudioEmitter>() {
            return Ok(());
        }
        let Some(emitter) = engine.registry().get::<AudioEmitter>(id) else {
            return Ok(());
        };
        let message = MixerMessage::Play {
            id,
            clip: Arc::clone(&emitter.clip),
            category: emitter.category,
            gain: emitter.gain,
            loop_start: emitter.loop_start,
        };
        self.send(message);
        Ok(())
    }

    fn component_removed(
        &mut self,
        _engine: &mut Engine,
        id: ObjectId,
        type_id: TypeId,
    ) -> Result<(), EngineError> {
        if type_id == TypeId::of::<AudioEmitter>() {
            self.stop(id);
        }
        Ok(())
    }
}
