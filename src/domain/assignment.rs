use std::fmt;

use ndarray::Array2;
use serde::Serialize;

/// A placement of facilities onto locations.
///
/// `locations[i]` is the location assigned to facility `i`. A valid QAP
/// solution is a permutation, but lenient decoding (see
/// [`Assignment::argmax_rows`]) can produce placements that reuse a
/// location, so permutation-ness is checked rather than assumed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Assignment {
    locations: Vec<usize>,
}

impl Assignment {
    /// Creates an assignment from a facility-to-location map.
    ///
    /// # Errors
    ///
    /// Returns an error if a location index is out of range or used twice.
    pub fn new(locations: Vec<usize>) -> Result<Self, DecodeError> {
        let n = locations.len();
        let mut seen = vec![false; n];
        for &location in &locations {
            if location >= n {
                return Err(DecodeError::OutOfRange { location, size: n });
            }
            if std::mem::replace(&mut seen[location], true) {
                return Err(DecodeError::LocationReused { location });
            }
        }
        Ok(Self { locations })
    }

    /// The identity placement, facility `i` at location `i`.
    #[must_use]
    pub fn identity(n: usize) -> Self {
        Self {
            locations: (0..n).collect(),
        }
    }

    /// Decodes a binary sample laid out as `x[facility * n + location]`.
    ///
    /// Every facility row must hold exactly one `1`, and no location may be
    /// used twice.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first constraint the sample violates.
    pub fn from_sample(sample: &[u8], n: usize) -> Result<Self, DecodeError> {
        if sample.len() != n * n {
            return Err(DecodeError::WrongLength {
                expected: n * n,
                found: sample.len(),
            });
        }

        let mut locations = Vec::with_capacity(n);
        for (facility, row) in sample.chunks(n).enumerate() {
            let ones: Vec<usize> = row
                .iter()
                .enumerate()
                .filter(|&(_, &bit)| bit != 0)
                .map(|(location, _)| location)
                .collect();
            match ones.as_slice() {
                [location] => locations.push(*location),
                _ => {
                    return Err(DecodeError::RowNotOneHot {
                        facility,
                        ones: ones.len(),
                    });
                }
            }
        }
        Self::new(locations)
    }

    /// Decodes a sample by taking, for each facility, the first location
    /// holding the row maximum.
    ///
    /// Rows without a `1` fall back to location 0 and two facilities may land
    /// on the same location. Use [`Assignment::is_permutation`] to check the
    /// result.
    ///
    /// # Errors
    ///
    /// Returns an error if the sample length is not `n * n`.
    pub fn argmax_rows(sample: &[u8], n: usize) -> Result<Self, DecodeError> {
        if sample.len() != n * n {
            return Err(DecodeError::WrongLength {
                expected: n * n,
                found: sample.len(),
            });
        }

        let locations = sample
            .chunks(n)
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, 0u8), |best, (location, &bit)| {
                        if bit > best.1 { (location, bit) } else { best }
                    })
                    .0
            })
            .collect();
        Ok(Self { locations })
    }

    /// The number of facilities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether the assignment places no facilities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// The location of the given facility.
    #[must_use]
    pub fn location(&self, facility: usize) -> Option<usize> {
        self.locations.get(facility).copied()
    }

    /// The facility-to-location map.
    #[must_use]
    pub fn locations(&self) -> &[usize] {
        &self.locations
    }

    /// Whether every location is used exactly once.
    #[must_use]
    pub fn is_permutation(&self) -> bool {
        Self::new(self.locations.clone()).is_ok()
    }

    /// The `n x n` placement matrix with a `1` at `[facility, location]`.
    #[must_use]
    pub fn to_matrix(&self) -> Array2<u8> {
        let n = self.len();
        let mut matrix = Array2::zeros((n, n));
        for (facility, &location) in self.locations.iter().enumerate() {
            if location < n {
                matrix[[facility, location]] = 1;
            }
        }
        matrix
    }

    /// The binary sample vector this assignment corresponds to.
    #[must_use]
    pub fn to_sample(&self) -> Vec<u8> {
        self.to_matrix().into_iter().collect()
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .locations
            .iter()
            .enumerate()
            .map(|(facility, location)| format!("{facility}->{location}"))
            .collect();
        write!(f, "{}", pairs.join(", "))
    }
}

/// Errors raised when a sample cannot be read as an assignment.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The sample does not hold `n * n` variables.
    #[error("expected a sample of {expected} variables, found {found}")]
    WrongLength {
        /// `n * n`.
        expected: usize,
        /// Actual sample length.
        found: usize,
    },

    /// A facility is placed at zero or several locations.
    #[error("facility {facility} is assigned to {ones} locations")]
    RowNotOneHot {
        /// The offending facility.
        facility: usize,
        /// How many locations it was assigned to.
        ones: usize,
    },

    /// A location hosts more than one facility.
    #[error("location {location} is assigned more than once")]
    LocationReused {
        /// The offending location.
        location: usize,
    },

    /// A location index is outside `0..n`.
    #[error("location {location} is out of range for {size} locations")]
    OutOfRange {
        /// The offending location.
        location: usize,
        /// Number of locations.
        size: usize,
    },
}
