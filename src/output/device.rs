use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::{
    HeapCons, HeapProd, HeapRb,
    traits::{Consumer, Producer, Split},
};
use tracing::{error, info};

use super::{AudioBackend, AudioClock, BackendOptions};
use crate::audio::{Mixer, Voice};
use crate::{Error, Result};

struct CallbackState {
    mixer: Mixer,
    consumer: HeapCons<Voice>,
    clock: AudioClock,
    num_channels: usize,
}

/// The default output device, driven by a cpal stream.
///
/// Voices reach the audio callback through a lock-free ring buffer; the
/// callback advances the shared frame counter that serves as the clock.
pub struct DeviceOutput {
    stream: Option<cpal::Stream>,
    producer: HeapProd<Voice>,
    clock: AudioClock,
}

impl DeviceOutput {
    pub fn open(options: &BackendOptions) -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(Error::NoOutputDevice)?;
        let config = device.default_output_config()?;
        let stream_config: cpal::StreamConfig = config.into();

        let num_channels = stream_config.channels as usize;
        let sample_rate = stream_config.sample_rate as f64;
        info!("Audio output: {} channels, {} Hz", num_channels, sample_rate);

        let ring_buffer = HeapRb::<Voice>::new(options.voice_queue_capacity.max(1));
        let (producer, consumer) = ring_buffer.split();
        let clock = AudioClock::new(sample_rate);

        let mut state = CallbackState {
            mixer: Mixer::new(sample_rate, options.mix.clone(), options.voice_queue_capacity),
            consumer,
            clock: clock.clone(),
            num_channels,
        };

        let stream = device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                audio_callback(data, &mut state);
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )?;
        stream.play()?;

        Ok(Self {
            stream: Some(stream),
            producer,
            clock,
        })
    }
}

fn audio_callback(data: &mut [f32], state: &mut CallbackState) {
    while let Some(voice) = state.consumer.try_pop() {
        state.mixer.add(voice);
    }

    let first_frame = state.clock.frame();
    let frames = state.mixer.render(data, state.num_channels, first_frame);
    state.clock.advance(frames as u64);
}

impl AudioBackend for DeviceOutput {
    fn clock(&self) -> AudioClock {
        self.clock.clone()
    }

    fn submit(&mut self, voice: Voice) -> Result<()> {
        if self.stream.is_none() {
            return Ok(());
        }
        self.producer.try_push(voice).map_err(|_| Error::QueueFull)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                error!("Failed to pause audio stream: {}", e);
            }
        }
    }
}
