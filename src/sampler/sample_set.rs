use std::collections::{hash_map::Entry, HashMap};

use serde::Serialize;

/// A single distinct state returned by a sampler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// The binary value of each variable.
    pub state: Vec<u8>,

    /// Energy of the state, excluding the QUBO offset.
    pub energy: f64,

    /// How many reads ended in this state.
    pub num_occurrences: usize,
}

/// The aggregated response of a sampler.
///
/// Samples are unique by state and ordered by ascending energy, so the first
/// sample is always a lowest-energy one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleSet {
    samples: Vec<Sample>,
    offset: f64,
}

impl SampleSet {
    /// Aggregates raw `(state, energy)` reads.
    ///
    /// Identical states are merged and their occurrences counted. Ties in
    /// energy are broken by state so the ordering is deterministic.
    #[must_use]
    pub fn from_reads(reads: impl IntoIterator<Item = (Vec<u8>, f64)>, offset: f64) -> Self {
        let mut index: HashMap<Vec<u8>, usize> = HashMap::new();
        let mut samples: Vec<Sample> = Vec::new();
        for (state, energy) in reads {
            match index.entry(state) {
                Entry::Occupied(seen) => samples[*seen.get()].num_occurrences += 1,
                Entry::Vacant(slot) => {
                    samples.push(Sample {
                        state: slot.key().clone(),
                        energy,
                        num_occurrences: 1,
                    });
                    slot.insert(samples.len() - 1);
                }
            }
        }
        samples.sort_by(|a, b| {
            a.energy
                .total_cmp(&b.energy)
                .then_with(|| a.state.cmp(&b.state))
        });
        Self { samples, offset }
    }

    /// The lowest-energy sample, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    /// Iterates samples in ascending energy order.
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// The number of distinct states.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the set holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Total number of reads across all samples.
    #[must_use]
    pub fn num_reads(&self) -> usize {
        self.samples.iter().map(|s| s.num_occurrences).sum()
    }

    /// The constant excluded from every sample's energy.
    #[must_use]
    pub const fn offset(&self) -> f64 {
        self.offset
    }
}

impl<'a> IntoIterator for &'a SampleSet {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregates_and_sorts_reads() {
        let reads = vec![
            (vec![1, 0], 2.0),
            (vec![0, 1], -1.0),
            (vec![1, 0], 2.0),
            (vec![0, 0], 0.0),
        ];
        let set = SampleSet::from_reads(reads, 3.0);

        assert_eq!(set.len(), 3);
        assert_eq!(set.num_reads(), 4);
        assert_eq!(set.offset(), 3.0);

        let first = set.first().unwrap();
        assert_eq!(first.state, vec![0, 1]);
        assert_eq!(first.energy, -1.0);

        let energies: Vec<f64> = set.iter().map(|s| s.energy).collect();
        assert_eq!(energies, vec![-1.0, 0.0, 2.0]);
        assert_eq!(set.iter().last().unwrap().num_occurrences, 2);
    }

    #[test]
    fn empty_set_has_no_first() {
        let set = SampleSet::from_reads(Vec::new(), 0.0);
        assert!(set.is_empty());
        assert!(set.first().is_none());
    }
}
