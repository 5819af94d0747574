use crate::{Bitmap, Result};

/// Destination for rendered frames. Each submitted frame is handed over by
/// value; the sink owns it from then on.
pub trait FrameSink {
    fn submit(&mut self, frame: Bitmap) -> Result<()>;
}

impl<F> FrameSink for F
where
    F: FnMut(Bitmap) -> Result<()>,
{
    fn submit(&mut self, frame: Bitmap) -> Result<()> {
        self(frame)
    }
}

/// Sink that keeps every frame it receives, in arrival order.
#[derive(Debug, Default)]
pub struct FrameRecorder {
    frames: Vec<Bitmap>,
    limit: Option<usize>,
}

impl FrameRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorder that keeps only the most recent `limit` frames.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            frames: Vec::new(),
            limit: Some(limit),
        }
    }

    pub fn frames(&self) -> &[Bitmap] {
        &self.frames
    }

    pub fn last(&self) -> Option<&Bitmap> {
        self.frames.last()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSink for FrameRecorder {
    fn submit(&mut self, frame: Bitmap) -> Result<()> {
        if let Some(limit) = self.limit {
            if limit == 0 {
                return Ok(());
            }
            if self.frames.len() >= limit {
                let overflow = self.frames.len() + 1 - limit;
                self.frames.drain(0..overflow);
            }
        }
        self.frames.push(frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SpectrumError;

    #[test]
    fn records_frames_in_order() {
        let mut recorder = FrameRecorder::new();
        recorder.submit(Bitmap::new(1, 1)).unwrap();
        recorder.submit(Bitmap::new(2, 1)).unwrap();

        let widths: Vec<u32> = recorder.frames().iter().map(Bitmap::width).collect();
        assert_eq!(widths, vec![1, 2]);
    }

    #[test]
    fn limit_keeps_latest_frames() {
        let mut recorder = FrameRecorder::with_limit(2);
        for width in 1..=4 {
            recorder.submit(Bitmap::new(width, 1)).unwrap();
        }
        let widths: Vec<u32> = recorder.frames().iter().map(Bitmap::width).collect();
        assert_eq!(widths, vec![3, 4]);
    }

    #[test]
    fn closures_act_as_sinks() {
        let mut seen = 0;
        let mut sink = |_frame: Bitmap| -> Result<()> {
            seen += 1;
            Err(SpectrumError::Sink("full".to_string()))
        };
        assert!(sink.submit(Bitmap::new(1, 1)).is_err());
        assert_eq!(seen, 1);
    }
}
