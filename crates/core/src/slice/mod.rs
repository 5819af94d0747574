use crate::{Result, SpectrumError};

/// Downmixes interleaved frames to mono and collects them into fixed-size
/// slices.
#[derive(Debug)]
pub struct SliceAccumulator {
    buffer: Vec<i16>,
    len: usize,
}

impl SliceAccumulator {
    /// Reserves storage for slices of `slice_samples` mono samples.
    pub fn new(slice_samples: usize) -> Result<Self> {
        if slice_samples == 0 {
            return Err(SpectrumError::InvalidInput("slice length must be positive"));
        }
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(slice_samples)?;
        buffer.resize(slice_samples, 0);
        Ok(Self { buffer, len: 0 })
    }

    pub fn slice_samples(&self) -> usize {
        self.buffer.len()
    }

    /// Number of mono samples collected towards the current slice.
    pub fn pending(&self) -> usize {
        self.len
    }

    /// Appends interleaved samples, calling `on_slice` once for every slice
    /// completed, in input order. Returns how many slices were completed.
    ///
    /// `samples` must hold whole frames of `channels` samples; a trailing
    /// partial frame is rejected before anything is consumed.
    pub fn push<F>(&mut self, samples: &[i16], channels: usize, mut on_slice: F) -> Result<usize>
    where
        F: FnMut(&[i16]),
    {
        if channels == 0 {
            return Err(SpectrumError::InvalidInput("channel count must be positive"));
        }
        if samples.len() % channels != 0 {
            return Err(SpectrumError::InvalidInput(
                "sample count is not a multiple of the channel count",
            ));
        }

        let mut completed = 0;
        for frame in samples.chunks_exact(channels) {
            self.buffer[self.len] = downmix(frame);
            self.len += 1;

            if self.len == self.buffer.len() {
                self.len = 0;
                on_slice(&self.buffer);
                completed += 1;
            }
        }

        Ok(completed)
    }
}

/// Integer mean of one frame, truncated toward zero.
fn downmix(frame: &[i16]) -> i16 {
    let total: i32 = frame.iter().map(|&sample| i32::from(sample)).sum();
    (total / frame.len() as i32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_truncates_toward_zero() {
        assert_eq!(downmix(&[3, 4]), 3);
        assert_eq!(downmix(&[-3, -4]), -3);
        assert_eq!(downmix(&[i16::MAX, i16::MAX]), i16::MAX);
        assert_eq!(downmix(&[i16::MIN, i16::MIN]), i16::MIN);
        assert_eq!(downmix(&[7]), 7);
    }

    #[test]
    fn emits_slice_once_full() {
        let mut acc = SliceAccumulator::new(4).unwrap();
        let mut slices = Vec::new();

        let done = acc.push(&[1, 2, 3], 1, |s| slices.push(s.to_vec())).unwrap();
        assert_eq!(done, 0);
        assert_eq!(acc.pending(), 3);

        let done = acc.push(&[4, 5], 1, |s| slices.push(s.to_vec())).unwrap();
        assert_eq!(done, 1);
        assert_eq!(slices, vec![vec![1, 2, 3, 4]]);
        assert_eq!(acc.pending(), 1);
    }

    #[test]
    fn completes_many_slices_in_order() {
        let mut acc = SliceAccumulator::new(2).unwrap();
        let mut slices = Vec::new();
        let stereo = [0, 2, 10, 20, 100, 200, -4, -6, 9, 9];

        let done = acc.push(&stereo, 2, |s| slices.push(s.to_vec())).unwrap();
        assert_eq!(done, 2);
        assert_eq!(slices, vec![vec![1, 15], vec![150, -5]]);
        assert_eq!(acc.pending(), 1);
    }

    #[test]
    fn rejects_partial_frames() {
        let mut acc = SliceAccumulator::new(4).unwrap();
        let err = acc.push(&[1, 2, 3], 2, |_| {}).unwrap_err();
        assert!(matches!(err, SpectrumError::InvalidInput(_)));
        assert_eq!(acc.pending(), 0);
    }
}
