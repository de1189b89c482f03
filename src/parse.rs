use crate::{die::Die, Error};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt, str::FromStr};

////////////////////
// parse::DieSpec //
////////////////////

/// The CLI-facing description of one die: an ordered list of unique string
/// faces, each with an optional weight (defaulting to 1.0).
///
/// String form is a bracketed list, e.g. `[1,2,3,4,5,6]` or `[H:1,T:2]`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct DieSpec(Vec<(String, f64)>);

impl DieSpec {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// A standard six-sided die, faces "1".."6", uniform weights.
    pub fn standard_d6() -> Self {
        Self((1..=6).map(|face| (face.to_string(), 1.0)).collect())
    }

    pub fn num_faces(&self) -> usize {
        self.0.len()
    }

    /// Pairs in spec order.
    pub fn face_weights(&self) -> &[(String, f64)] {
        &self.0
    }

    /// Realize the spec as a [`Die`] with its weights applied.
    pub fn to_die(&self) -> Result<Die<String>, Error> {
        let mut die = Die::new(self.0.iter().map(|(face, _)| face.clone()))?;
        for (face, weight) in &self.0 {
            die.set_weight(face, *weight)?;
        }
        Ok(die)
    }
}

impl Default for DieSpec {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<(String, f64)> for DieSpec {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = (String, f64)>,
    {
        Self(Vec::from_iter(iter))
    }
}

impl FromStr for DieSpec {
    type Err = String;

    // [1,2,3,4,5,6] or [H:1,T:2] or [a:0.5, b, c:2]

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut spec = DieSpec::new();
        let mut seen = HashSet::new();

        let s = s.trim_start_matches('[');
        let s = s.trim_end_matches(']');

        let splitters = &[',', ' ', '\n', '\t'];

        for face_weight_str in s.split(splitters).filter(|s| !s.is_empty()) {
            let (face_str, weight) = match face_weight_str.split_once(':') {
                Some((face_str, weight_str)) => {
                    let weight = weight_str.parse::<f64>().map_err(|err| {
                        format!("failed to parse weight: '{weight_str}', error: {err}")
                    })?;
                    (face_str, weight)
                }
                None => (face_weight_str, 1.0),
            };

            if face_str.is_empty() {
                return Err(format!("empty face in die spec: '{face_weight_str}'"));
            }
            if !seen.insert(face_str.to_owned()) {
                return Err(format!(
                    "a die can't contain duplicate faces: already contains face: '{face_str}'"
                ));
            }
            if !weight.is_finite() || weight < 0.0 {
                return Err(format!(
                    "face weight must be a finite non-negative number: '{face_str}:{weight}'"
                ));
            }

            spec.0.push((face_str.to_owned(), weight));
        }

        if spec.0.is_empty() {
            return Err("die spec must contain at least one face".to_string());
        }

        Ok(spec)
    }
}

impl fmt::Display for DieSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use itertools::Itertools;
        let pieces = self
            .0
            .iter()
            .map(|(face, weight)| format!("{face}:{weight}"))
            .join(",");
        write!(f, "[{pieces}]")
    }
}

impl fmt::Debug for DieSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
