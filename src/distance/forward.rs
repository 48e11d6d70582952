//! Distances of one sweep and the features derived from them

use super::wall::{wall_through, Sample};
use crate::config::ScanConfig;

/// Samples of one sweep, index 0 is the rightmost, `N - 1` the leftmost
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForwardDistances<const N: usize = 10> {
    config: ScanConfig,
    raw: [u8; N],
    processed: [u8; N],
    min_index: Option<usize>,
    max_index: Option<usize>,
    threshold_index: Option<usize>,
    wall_right: Option<i8>,
    wall_left: Option<i8>,
}

impl<const N: usize> ForwardDistances<N> {
    /// Empty sweep, all samples at the timeout distance
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            raw: [config.timeout_cm; N],
            processed: [config.timeout_cm; N],
            min_index: None,
            max_index: None,
            threshold_index: None,
            wall_right: None,
            wall_left: None,
        }
    }

    /// Sweep from raw samples, values at or beyond the timeout are clamped
    pub fn from_raw(config: ScanConfig, raw: [u8; N]) -> Self {
        let mut distances = Self::new(config);
        for (index, distance) in raw.into_iter().enumerate() {
            distances.set_raw(index, distance);
        }
        distances
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Store the sample of `index`, out of range indices are ignored
    pub fn set_raw(&mut self, index: usize, distance_cm: u8) {
        if let Some(slot) = self.raw.get_mut(index) {
            *slot = distance_cm.min(self.config.timeout_cm);
        }
    }

    pub fn raw(&self) -> &[u8; N] {
        &self.raw
    }

    /// Samples after glitch filtering, valid after [`Self::post_process`]
    pub fn processed(&self) -> &[u8; N] {
        &self.processed
    }

    /// Index of the rightmost sample
    pub fn index_right(&self) -> usize {
        0
    }

    /// Index of the leftmost sample
    pub fn index_left(&self) -> usize {
        N.saturating_sub(1)
    }

    /// The sample nearest to straight ahead, and its twin if two are equally near
    pub fn forward_indices(&self) -> (usize, Option<usize>) {
        let offset = |index: usize| self.angle_of(index).abs_diff(u16::from(super::FORWARD_ANGLE));
        let nearest = (0..N).min_by_key(|&index| offset(index)).unwrap_or(0);
        let twin = (nearest + 1 < N && offset(nearest + 1) == offset(nearest)).then_some(nearest + 1);
        (nearest, twin)
    }

    /// Servo angle of the first sample, chosen so the sweep is centered on forward
    pub fn start_angle(&self) -> u16 {
        let span = u16::from(self.config.degrees_per_step) * N.saturating_sub(1) as u16;
        180u16.saturating_sub(span) / 2
    }

    /// Servo angle at which sample `index` is taken
    pub fn angle_of(&self, index: usize) -> u16 {
        self.start_angle() + u16::from(self.config.degrees_per_step) * index as u16
    }

    /// Degrees to turn to face sample `index`, positive turns left
    pub fn degrees_to_turn(&self, index: usize) -> i16 {
        self.angle_of(index) as i16 - i16::from(super::FORWARD_ANGLE)
    }

    /// Index of the nearest obstacle, first and last sample excluded
    pub fn min_index(&self) -> Option<usize> {
        self.min_index
    }

    pub fn min_distance(&self) -> Option<u8> {
        self.min_index.map(|index| self.processed[index])
    }

    /// Index of the farthest free direction, first and last sample excluded
    pub fn max_index(&self) -> Option<usize> {
        self.max_index
    }

    pub fn max_distance(&self) -> Option<u8> {
        self.max_index.map(|index| self.processed[index])
    }

    /// First index from the right whose distance exceeds the threshold
    pub fn threshold_index(&self) -> Option<usize> {
        self.threshold_index
    }

    /// Degrees to turn to drive parallel to the wall on the right
    pub fn wall_right_angle(&self) -> Option<i8> {
        self.wall_right
    }

    /// Degrees to turn to drive parallel to the wall on the left
    pub fn wall_left_angle(&self) -> Option<i8> {
        self.wall_left
    }

    /// Degrees to turn towards the nearest target closer than `max_cm`
    ///
    /// Looks at the raw samples, so a single near reading counts. Samples at the timeout
    /// distance never do. On a tie the rightmost sample wins.
    pub fn target_direction(&self, max_cm: u8) -> Option<i16> {
        let limit = max_cm.min(self.config.timeout_cm.saturating_sub(1));
        (0..N)
            .filter(|&index| self.raw[index] <= limit)
            .min_by_key(|&index| self.raw[index])
            .map(|index| self.degrees_to_turn(index))
    }

    /// Filter the raw samples and derive all features
    pub fn post_process(&mut self, threshold_cm: u8) {
        let radius = self.config.filter_radius;
        for index in 0..N {
            let window = index.saturating_sub(radius)..=index.saturating_add(radius).min(N - 1);
            self.processed[index] = self.raw[window]
                .iter()
                .copied()
                .min()
                .unwrap_or(self.config.timeout_cm);
        }

        let inner = 1..N.saturating_sub(1);
        self.min_index = inner
            .clone()
            .reduce(|best, index| if self.processed[index] < self.processed[best] { index } else { best });
        self.max_index = inner
            .reduce(|best, index| if self.processed[index] > self.processed[best] { index } else { best });

        self.threshold_index = (0..N).find(|&index| self.processed[index] > threshold_cm);

        self.wall_right = self.detect_wall((0..N / 2).triples());
        self.wall_left = self.detect_wall((N - N / 2..N).rev().triples());

        debug!(
            "min {:?} max {:?} walls {:?} / {:?}",
            self.min_index, self.max_index, self.wall_right, self.wall_left
        );
    }

    /// First wall found in `triples`, each given from the outer edge inward
    fn detect_wall(&self, triples: impl Iterator<Item = [usize; 3]>) -> Option<i8> {
        let limit = self.config.wall_detection_max_cm.min(self.config.timeout_cm);
        let tolerance = f32::from(self.config.wall_tolerance_cm);

        triples
            .filter(|triple| triple.iter().all(|&index| self.raw[index] < limit))
            .find_map(|triple| {
                let mut samples = triple.map(|index| {
                    Sample::new(f32::from(self.angle_of(index)), f32::from(self.raw[index]))
                });
                // Geometry expects ascending angles
                if samples[0].angle_deg > samples[2].angle_deg {
                    samples.reverse();
                }
                wall_through(samples[0], samples[1], samples[2], tolerance)
            })
    }
}

/// Overlapping index triples of a range
trait IndexTriples: Iterator<Item = usize> + Sized {
    fn triples(self) -> Triples<Self> {
        Triples {
            inner: self,
            window: [None; 3],
        }
    }
}

impl<I: Iterator<Item = usize>> IndexTriples for I {}

struct Triples<I> {
    inner: I,
    window: [Option<usize>; 3],
}

impl<I: Iterator<Item = usize>> Iterator for Triples<I> {
    type Item = [usize; 3];

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let index = self.inner.next()?;
            self.window = [self.window[1], self.window[2], Some(index)];
            if let [Some(a), Some(b), Some(c)] = self.window {
                return Some([a, b, c]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distances(raw: [u8; 10]) -> ForwardDistances {
        let mut distances = ForwardDistances::from_raw(ScanConfig::default(), raw);
        distances.post_process(50);
        distances
    }

    #[test]
    fn angles_are_centered() {
        let distances = ForwardDistances::<10>::new(ScanConfig::default());
        assert_eq!(distances.angle_of(0), 9);
        assert_eq!(distances.angle_of(9), 171);
        assert_eq!(distances.forward_indices(), (4, Some(5)));
        assert_eq!(distances.degrees_to_turn(0), -81);
        assert_eq!(distances.degrees_to_turn(distances.index_left()), 81);
    }

    #[test]
    fn odd_sample_count_has_single_forward_index() {
        let distances = ForwardDistances::<9>::new(ScanConfig::default());
        assert_eq!(distances.angle_of(4), 90);
        assert_eq!(distances.forward_indices(), (4, None));
    }

    #[test]
    fn raw_samples_are_clamped() {
        let mut distances = ForwardDistances::<10>::new(ScanConfig::default());
        distances.set_raw(3, 250);
        distances.set_raw(42, 10);
        assert_eq!(distances.raw()[3], 100);
    }

    #[test]
    fn single_glitch_is_filtered() {
        let distances = distances([60, 60, 60, 60, 100, 60, 60, 60, 60, 60]);
        assert_eq!(distances.processed()[4], 60);
        assert_eq!(distances.threshold_index(), Some(0));
    }

    #[test]
    fn extrema_skip_outer_samples() {
        let distances = distances([100, 90, 90, 90, 40, 40, 40, 60, 60, 60]);
        assert_eq!(distances.processed(), &[90, 90, 90, 40, 40, 40, 40, 40, 60, 60]);
        assert_eq!(distances.min_index(), Some(3));
        assert_eq!(distances.min_distance(), Some(40));
        assert_eq!(distances.max_index(), Some(1));
        assert_eq!(distances.max_distance(), Some(90));
    }

    #[test]
    fn threshold_not_exceeded() {
        let distances = distances([30; 10]);
        assert_eq!(distances.threshold_index(), None);
    }

    #[test]
    fn target_is_nearest_sample_in_range() {
        let sweep = distances([100, 90, 70, 45, 60, 45, 100, 100, 30, 100]);
        // Index 8 sits at 153 degrees
        assert_eq!(sweep.target_direction(50), Some(63));
        // Tie between index 3 and 5 at 45 cm, the right one wins
        let sweep = distances([100, 90, 70, 45, 60, 45, 100, 100, 100, 100]);
        assert_eq!(sweep.target_direction(50), Some(-27));
        assert_eq!(sweep.target_direction(40), None);
    }

    #[test]
    fn timeout_samples_are_no_target() {
        let sweep = distances([100; 10]);
        assert_eq!(sweep.target_direction(u8::MAX), None);
    }

    #[test]
    fn huge_filter_radius_spans_all_samples() {
        let config = ScanConfig {
            filter_radius: usize::MAX,
            ..ScanConfig::default()
        };
        let mut sweep = ForwardDistances::from_raw(config, [80, 70, 60, 50, 40, 30, 20, 90, 90, 90]);
        sweep.post_process(50);
        assert_eq!(sweep.processed(), &[20; 10]);
    }

    #[test]
    fn triples_overlap() {
        let triples: std::vec::Vec<_> = (0..5).triples().collect();
        assert_eq!(triples, [[0, 1, 2], [1, 2, 3], [2, 3, 4]]);
        assert_eq!((0..2).triples().count(), 0);
    }
}
