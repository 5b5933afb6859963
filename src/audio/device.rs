//! Hardware output through cpal.
//!
//! The cpal stream is owned by a dedicated audio thread (streams cannot move
//! between threads on every platform). The control side keeps the ring buffer
//! producer and talks to the callback only through [`AudioCommand`]s.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Sender};
use ringbuf::{
    traits::{Producer, Split},
    HeapProd, HeapRb,
};

use super::callback::AudioCallback;
use super::clock::{Clock, FrameClock};
use super::command::{AudioCommand, Generator};
use super::{AudioError, AudioOutput};

/// Ring buffer capacity (number of commands).
pub const RING_BUFFER_CAPACITY: usize = 1024;

/// Output on the system's default audio device.
pub struct DeviceOutput {
    producer: HeapProd<AudioCommand>,
    clock: Arc<FrameClock>,
    active: Arc<AtomicUsize>,
    sample_rate: u32,
    channels: u16,
    shutdown: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl DeviceOutput {
    /// Open the default output device, optionally forcing a sample rate.
    pub fn open(sample_rate: Option<u32>) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;
        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceConfig(e.to_string()))?;

        let sample_rate = sample_rate.unwrap_or(config.sample_rate().0);
        let channels = config.channels();
        let stream_config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let rb = HeapRb::<AudioCommand>::new(RING_BUFFER_CAPACITY);
        let (producer, consumer) = rb.split();
        let clock = Arc::new(FrameClock::new(sample_rate));
        let active = Arc::new(AtomicUsize::new(0));
        let mut callback = AudioCallback::new(consumer, channels, clock.counter(), active.clone());

        let (ready_tx, ready_rx) = bounded::<Result<(), AudioError>>(1);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);

        let thread = std::thread::Builder::new()
            .name("sythm-audio".into())
            .spawn(move || {
                let stream = device
                    .build_output_stream(
                        &stream_config,
                        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                            callback.process(data);
                        },
                        |err| tracing::error!("audio stream error: {err}"),
                        None,
                    )
                    .map_err(|e| AudioError::StreamBuild(e.to_string()))
                    .and_then(|stream| {
                        stream
                            .play()
                            .map_err(|e| AudioError::StreamPlay(e.to_string()))?;
                        Ok(stream)
                    });

                match stream {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        // Park until closed; a dropped sender also ends the wait.
                        let _ = shutdown_rx.recv();
                        drop(stream);
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })
            .map_err(|e| AudioError::StreamBuild(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|_| AudioError::StreamBuild("audio thread exited".into()))??;

        tracing::info!(sample_rate, channels, "audio output opened");
        Ok(Self {
            producer,
            clock,
            active,
            sample_rate,
            channels,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    fn send(&mut self, command: AudioCommand) -> Result<(), AudioError> {
        if self.shutdown.is_none() {
            return Err(AudioError::Closed);
        }
        self.producer
            .try_push(command)
            .map_err(|_| AudioError::BufferFull)
    }
}

impl AudioOutput for DeviceOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    fn schedule(&mut self, start_time: f64, samples: Vec<f32>) -> Result<(), AudioError> {
        let start_frame = (start_time.max(0.0) * self.sample_rate as f64).round() as u64;
        self.send(AudioCommand::Start(Generator::new(start_frame, samples)))
    }

    fn stop_all(&mut self) -> Result<(), AudioError> {
        self.send(AudioCommand::StopAll)
    }

    /// As of the last completed callback.
    fn active_generators(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    fn close(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("audio thread panicked");
            }
            tracing::info!("audio output closed");
        }
    }
}

impl Drop for DeviceOutput {
    fn drop(&mut self) {
        self.close();
    }
}
