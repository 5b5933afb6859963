//! Audio callback: runs on the cpal audio thread.
//!
//! Drains commands from the ring buffer, mixes every active generator into
//! the block, applies the master limiter, then advances the frame
//! counter that serves as the audio clock.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use ringbuf::traits::Consumer;
use ringbuf::HeapCons;

use super::command::{AudioCommand, Generator};
use super::limiter::Limiter;

/// State that lives on the audio thread. Accessed only from the cpal callback.
pub struct AudioCallback {
    consumer: HeapCons<AudioCommand>,
    generators: Vec<Generator>,
    mono: Vec<f32>,
    limiter: Limiter,
    channels: u16,
    frames: Arc<AtomicU64>,
    active: Arc<AtomicUsize>,
}

impl AudioCallback {
    pub fn new(
        consumer: HeapCons<AudioCommand>,
        channels: u16,
        frames: Arc<AtomicU64>,
        active: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            consumer,
            generators: Vec::new(),
            mono: Vec::new(),
            limiter: Limiter::default(),
            channels: channels.max(1),
            frames,
            active,
        }
    }

    /// Called by cpal for each buffer. `output` is interleaved.
    pub fn process(&mut self, output: &mut [f32]) {
        let channels = self.channels as usize;
        let block_frames = output.len() / channels;
        let block_start = self.frames.load(Ordering::Acquire);

        // 1. Drain pending commands.
        while let Some(cmd) = self.consumer.try_pop() {
            match cmd {
                AudioCommand::Start(mut generator) => {
                    // Late arrivals start now instead of losing their head.
                    generator.start_frame = generator.start_frame.max(block_start);
                    self.generators.push(generator);
                }
                AudioCommand::StopAll => {
                    self.generators.clear();
                }
            }
        }

        // 2. Mix generators into a mono block.
        self.mono.clear();
        self.mono.resize(block_frames, 0.0);
        for generator in &self.generators {
            generator.mix_into(block_start, &mut self.mono);
        }

        // 3. Limiter, fan out to every channel.
        for (frame, &sample) in output.chunks_mut(channels).zip(&self.mono) {
            let s = self.limiter.process(sample);
            frame.fill(s);
        }
        // Trailing partial frame, if any.
        for sample in output[block_frames * channels..].iter_mut() {
            *sample = 0.0;
        }

        // 4. Retire finished generators and advance the clock.
        let block_end = block_start + block_frames as u64;
        self.generators.retain(|g| !g.is_finished(block_end));
        self.active.store(self.generators.len(), Ordering::Release);
        self.frames.store(block_end, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::{
        traits::{Producer, Split},
        HeapRb,
    };

    struct Rig {
        prod: ringbuf::HeapProd<AudioCommand>,
        callback: AudioCallback,
        frames: Arc<AtomicU64>,
        active: Arc<AtomicUsize>,
    }

    fn setup(channels: u16) -> Rig {
        let rb = HeapRb::<AudioCommand>::new(16);
        let (prod, cons) = rb.split();
        let frames = Arc::new(AtomicU64::new(0));
        let active = Arc::new(AtomicUsize::new(0));
        let callback = AudioCallback::new(cons, channels, frames.clone(), active.clone());
        Rig {
            prod,
            callback,
            frames,
            active,
        }
    }

    #[test]
    fn silence_on_empty_and_clock_advances() {
        let mut rig = setup(2);
        let mut output = vec![999.0f32; 64];
        rig.callback.process(&mut output);
        assert!(output.iter().all(|&s| s == 0.0));
        assert_eq!(rig.frames.load(Ordering::Acquire), 32);
    }

    #[test]
    fn generator_starts_at_its_frame() {
        let mut rig = setup(1);
        rig.prod
            .try_push(AudioCommand::Start(Generator::new(2, vec![0.1, 0.2])))
            .unwrap();
        let mut output = vec![0.0f32; 4];
        rig.callback.process(&mut output);
        assert_eq!(output, vec![0.0, 0.0, 0.1, 0.2]);
        assert_eq!(rig.active.load(Ordering::Acquire), 0);
    }

    #[test]
    fn mono_fans_out_to_channels() {
        let mut rig = setup(2);
        rig.prod
            .try_push(AudioCommand::Start(Generator::new(0, vec![0.3, 0.4])))
            .unwrap();
        let mut output = vec![0.0f32; 4];
        rig.callback.process(&mut output);
        assert_eq!(output, vec![0.3, 0.3, 0.4, 0.4]);
    }

    #[test]
    fn overlapping_generators_sum_and_limit() {
        let mut rig = setup(1);
        rig.prod
            .try_push(AudioCommand::Start(Generator::new(0, vec![0.6; 4])))
            .unwrap();
        rig.prod
            .try_push(AudioCommand::Start(Generator::new(0, vec![0.2, 0.6, 0.6, 0.6])))
            .unwrap();
        let mut output = vec![0.0f32; 4];
        rig.callback.process(&mut output);
        assert!((output[0] - 0.8).abs() < 1e-6);
        assert_eq!(output[1], 0.95);
    }

    #[test]
    fn late_generator_plays_from_its_start() {
        let mut rig = setup(1);
        let mut output = vec![0.0f32; 8];
        rig.callback.process(&mut output);
        rig.prod
            .try_push(AudioCommand::Start(Generator::new(2, vec![0.5, 0.25])))
            .unwrap();
        rig.callback.process(&mut output);
        assert_eq!(&output[..3], &[0.5, 0.25, 0.0]);
    }

    #[test]
    fn generators_span_blocks() {
        let mut rig = setup(1);
        rig.prod
            .try_push(AudioCommand::Start(Generator::new(0, vec![0.1; 6])))
            .unwrap();
        let mut output = vec![0.0f32; 4];
        rig.callback.process(&mut output);
        assert_eq!(rig.active.load(Ordering::Acquire), 1);
        rig.callback.process(&mut output);
        assert!((output[1] - 0.1).abs() < 1e-6);
        assert_eq!(output[2], 0.0);
        assert_eq!(rig.active.load(Ordering::Acquire), 0);
    }

    #[test]
    fn stop_all_silences() {
        let mut rig = setup(1);
        rig.prod
            .try_push(AudioCommand::Start(Generator::new(0, vec![0.5; 64])))
            .unwrap();
        rig.prod.try_push(AudioCommand::StopAll).unwrap();
        let mut output = vec![999.0f32; 16];
        rig.callback.process(&mut output);
        assert!(output.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn samples_pass_at_unity_gain() {
        let mut rig = setup(1);
        rig.prod
            .try_push(AudioCommand::Start(Generator::new(0, vec![0.4, -0.25])))
            .unwrap();
        let mut output = vec![0.0f32; 2];
        rig.callback.process(&mut output);
        assert!((output[0] - 0.4).abs() < 1e-6);
        assert!((output[1] + 0.25).abs() < 1e-6);
    }
}
