use crate::{Error, Face};
use claim::{debug_assert_ge, debug_assert_lt};
use rand::{
    distributions::{Distribution, Open01},
    Rng,
};
use std::collections::HashMap;

//////////////
// Die //////
//////////////

/// A die with a fixed set of unique faces, each carrying a mutable,
/// non-negative weight. Weights default to 1.0 and are relative, never
/// normalized; a zero-weight face is simply never rolled.
///
/// Faces are stored in construction order next to a parallel weight array,
/// with a hash index for face -> position lookup. The face set is immutable
/// after construction; only weights change.
#[derive(Clone, Debug)]
pub struct Die<F> {
    faces: Vec<F>,
    weights: Vec<f64>,
    index: HashMap<F, usize>,
}

impl<F: Face> Die<F> {
    /// Build a die from an ordered collection of distinct faces, all weights
    /// starting at 1.0. Fails with [`Error::InvalidInput`] if any face
    /// repeats.
    pub fn new(faces: impl IntoIterator<Item = F>) -> Result<Self, Error> {
        let faces = faces.into_iter().collect::<Vec<_>>();

        let mut index = HashMap::with_capacity(faces.len());
        for (idx, face) in faces.iter().enumerate() {
            if index.insert(face.clone(), idx).is_some() {
                return Err(Error::InvalidInput(format!(
                    "faces must be unique: '{face:?}' appears more than once"
                )));
            }
        }

        let weights = vec![1.0; faces.len()];
        Ok(Self {
            faces,
            weights,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// The faces in construction order.
    pub fn faces(&self) -> &[F] {
        &self.faces
    }

    /// The current weight of `face`, or `None` if the die has no such face.
    pub fn weight(&self, face: &F) -> Option<f64> {
        self.index.get(face).map(|&idx| self.weights[idx])
    }

    /// Replace the weight of `face`.
    ///
    /// Fails with [`Error::FaceNotFound`] if `face` is not on this die and
    /// with [`Error::InvalidInput`] if the weight is non-finite or negative.
    /// A weight of exactly 0.0 is allowed and means "never selected".
    pub fn set_weight(&mut self, face: &F, weight: f64) -> Result<(), Error> {
        let idx = *self.index.get(face).ok_or_else(|| {
            Error::FaceNotFound(format!("'{face:?}' is not a face of this die"))
        })?;

        if !weight.is_finite() {
            return Err(Error::InvalidInput(format!(
                "weight must be a finite number, got: {weight}"
            )));
        }
        if weight < 0.0 {
            return Err(Error::InvalidInput(format!(
                "weight must be non-negative, got: {weight}"
            )));
        }

        self.weights[idx] = weight;
        Ok(())
    }

    /// An owned copy of the face -> weight mapping in construction order.
    /// Mutating the returned pairs never touches the die.
    pub fn snapshot(&self) -> Vec<(F, f64)> {
        self.faces
            .iter()
            .cloned()
            .zip(self.weights.iter().copied())
            .collect()
    }

    /// Roll the die `nrolls` times, independently and with replacement, where
    /// each roll selects face `i` with probability `w_i / Σw`. The output
    /// order is the draw order.
    ///
    /// Fails with [`Error::InvalidInput`] if `nrolls < 1` or if the total
    /// weight is zero (no valid distribution). The cumulative-weight table is
    /// rebuilt once per call, so weight changes between calls need no
    /// invalidation step.
    pub fn roll<R: Rng + ?Sized>(&self, nrolls: usize, rng: &mut R) -> Result<Vec<F>, Error> {
        if nrolls < 1 {
            return Err(Error::InvalidInput(format!(
                "number of rolls must be >= 1, got: {nrolls}"
            )));
        }

        let cdf = WeightCdf::from_weights(&self.weights).ok_or_else(|| {
            Error::InvalidInput(
                "total weight is zero; the die has no valid distribution".to_string(),
            )
        })?;

        Ok((0..nrolls)
            .map(|_| self.faces[cdf.sample(rng)].clone())
            .collect())
    }
}

///////////////
// WeightCdf //
///////////////

/// A die's weights folded into a cumulative-weight table, for inverse-CDF
/// sampling: draw `r ∈ (0, 1)`, scale by the total weight, and binary-search
/// the first cumulative entry above it.
#[derive(Clone, Debug)]
pub(crate) struct WeightCdf {
    cum: Vec<f64>,
    total: f64,
    // fallback when `r * total` rounds all the way up to `total`
    last_positive: usize,
}

impl WeightCdf {
    /// Returns `None` when the weights admit no distribution: an empty face
    /// set, or a total weight of zero.
    pub(crate) fn from_weights(weights: &[f64]) -> Option<Self> {
        let mut cum = Vec::with_capacity(weights.len());
        let mut total = 0.0;
        for &w in weights {
            debug_assert_ge!(w, 0.0);
            total += w;
            cum.push(total);
        }

        if total > 0.0 && total.is_finite() {
            let last_positive = weights.iter().rposition(|&w| w > 0.0)?;
            Some(Self {
                cum,
                total,
                last_positive,
            })
        } else {
            None
        }
    }
}

impl Distribution<usize> for WeightCdf {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        // r ∈ (0, 1), both endpoints excluded, so x ∈ (0, total). the face at
        // the chosen index always has positive weight: a zero-weight face
        // shares its cumulative value with its predecessor and can never be
        // the first entry strictly above x.
        let r: f64 = Open01.sample(rng);
        let x = r * self.total;

        let idx = self.cum.partition_point(|&c| c <= x);
        if idx < self.cum.len() {
            debug_assert_lt!(x, self.cum[idx]);
            idx
        } else {
            self.last_positive
        }
    }
}


///////////
// Tests //
///////////
