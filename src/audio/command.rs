//! Commands sent from the control thread to the audio thread via ring buffer,
//! and the generators they carry.

/// A pre-rendered mono buffer that plays from a fixed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Generator {
    pub start_frame: u64,
    pub samples: Vec<f32>,
}

impl Generator {
    pub fn new(start_frame: u64, samples: Vec<f32>) -> Self {
        Self {
            start_frame,
            samples,
        }
    }

    /// First frame after the last sample.
    pub fn end_frame(&self) -> u64 {
        self.start_frame + self.samples.len() as u64
    }

    pub fn is_finished(&self, frame: u64) -> bool {
        frame >= self.end_frame()
    }

    /// Add this generator's contribution to `out`, whose first frame is
    /// `block_start`. `out` is mono.
    pub fn mix_into(&self, block_start: u64, out: &mut [f32]) {
        let block_end = block_start + out.len() as u64;
        let from = self.start_frame.max(block_start);
        let to = self.end_frame().min(block_end);
        if from >= to {
            return;
        }
        let src = &self.samples[(from - self.start_frame) as usize..(to - self.start_frame) as usize];
        let dst = &mut out[(from - block_start) as usize..(to - block_start) as usize];
        for (d, s) in dst.iter_mut().zip(src) {
            *d += *s;
        }
    }

    /// Cut the buffer so it ends at `frame`.
    pub fn truncate_at(&mut self, frame: u64) {
        let keep = frame.saturating_sub(self.start_frame) as usize;
        self.samples.truncate(keep);
    }
}

/// Commands sent from the control thread to the audio thread.
#[derive(Debug)]
pub enum AudioCommand {
    /// Start a generator. Past start frames play immediately.
    Start(Generator),

    /// Silence and drop every generator.
    StopAll,
}
