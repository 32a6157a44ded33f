//! Builds one composite reducer from a reducer name or an ordered list of names.

use crate::reducers::error::ReducerError;
use crate::reducers::reducer::Reducer;
use serde::{Deserialize, Serialize};

/// The reducer(s) a dataset is reduced with, as configured by name.
///
/// Names are only resolved against the registry when the reducer is
/// composed, so an unknown name fails before anything is sent to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReducerSpec {
    Single(String),
    Combined {
        reducers: Vec<String>,
        /// `true`: every reducer sees every band. `false`: reducer `i` sees band `i`.
        shared_inputs: bool,
    },
}

impl ReducerSpec {
    pub fn single(reducer: Reducer) -> Self {
        ReducerSpec::Single(reducer.name().to_string())
    }

    pub fn combined(reducers: &[Reducer], shared_inputs: bool) -> Self {
        ReducerSpec::Combined {
            reducers: reducers.iter().map(|r| r.name().to_string()).collect(),
            shared_inputs,
        }
    }

    /// The first reducer, which decides whether scale correction applies.
    pub fn primary(&self) -> Result<Reducer, ReducerError> {
        match self {
            ReducerSpec::Single(name) => name.parse(),
            ReducerSpec::Combined { reducers, .. } => reducers
                .first()
                .ok_or(ReducerError::EmptyReducerList)?
                .parse(),
        }
    }
}

impl Default for ReducerSpec {
    fn default() -> Self {
        ReducerSpec::single(Reducer::Mean)
    }
}

/// Whether pixels partially covered by a region count fractionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Weighting {
    #[default]
    Weighted,
    Unweighted,
}

/// One reducer inside a composite.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReducerPart {
    pub reducer: Reducer,
    pub weighting: Weighting,
}

/// Which band a reducer consumes and the output property it writes.
/// `band` is `None` when band names were not known at composition time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub band: Option<String>,
    pub reducer: Reducer,
    pub output: String,
}

/// An immutable composite reducer description, sent to the engine as is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeReducer {
    pub parts: Vec<ReducerPart>,
    pub shared_inputs: bool,
    /// Input band names, in order. Empty if unknown.
    pub bands: Vec<String>,
    /// Output property names, in order.
    pub outputs: Vec<String>,
}

impl CompositeReducer {
    /// A composite of a single reducer. Its outputs keep the band names.
    pub fn single(reducer: Reducer, weighting: Weighting, bands: &[String]) -> Self {
        let outputs = if bands.is_empty() {
            vec![reducer.name().to_string()]
        } else {
            bands.to_vec()
        };
        Self {
            parts: vec![ReducerPart { reducer, weighting }],
            shared_inputs: true,
            bands: bands.to_vec(),
            outputs,
        }
    }

    fn combine(self, reducer: Reducer) -> Self {
        let mut parts = self.parts;
        parts.push(ReducerPart {
            reducer,
            weighting: Weighting::Unweighted,
        });
        Self { parts, ..self }
    }

    /// The single reducer if this composite has exactly one part.
    pub fn as_single(&self) -> Option<Reducer> {
        match self.parts.as_slice() {
            [part] => Some(part.reducer),
            _ => None,
        }
    }

    /// Expands the composite into band/reducer/output triples, in output order.
    pub fn assignments(&self) -> Vec<Assignment> {
        let bands: Vec<Option<String>> = if self.bands.is_empty() {
            vec![None]
        } else {
            self.bands.iter().cloned().map(Some).collect()
        };
        let pairs: Vec<(Option<String>, Reducer)> = if self.shared_inputs {
            self.parts
                .iter()
                .flat_map(|part| bands.iter().map(move |band| (band.clone(), part.reducer)))
                .collect()
        } else {
            self.parts
                .iter()
                .enumerate()
                .map(|(i, part)| (bands.get(i).cloned().flatten(), part.reducer))
                .collect()
        };
        pairs
            .into_iter()
            .zip(self.outputs.iter())
            .map(|((band, reducer), output)| Assignment {
                band,
                reducer,
                output: output.clone(),
            })
            .collect()
    }
}

enum Fold {
    Empty,
    Seeded(CompositeReducer),
}

/// Composes `spec` into a single [`CompositeReducer`].
///
/// A single name becomes a one-part composite with the given `weighting`.
/// A list is folded left: the first reducer seeds the composite and each
/// following reducer is combined with it, all unweighted. When inputs are not
/// shared, reducer `i` consumes band `i` and, if `bands` are known, the
/// outputs are named after the bands. When inputs are shared every reducer
/// consumes every band and outputs carry the reducer's position as a suffix,
/// empty for the first reducer.
///
/// # Errors
///
/// [`ReducerError::UnknownReducer`] for a name outside the registry,
/// [`ReducerError::EmptyReducerList`] for an empty list, and
/// [`ReducerError::BandCountMismatch`] when per-band reducers cannot be paired
/// with the known bands.
///
/// # Examples
///
/// ```
/// use climate_data::{compose, Reducer, ReducerSpec, Weighting};
///
/// let bands = vec!["a".to_string(), "b".to_string()];
/// let spec = ReducerSpec::combined(&[Reducer::Mean, Reducer::Max], false);
/// let composite = compose(&spec, &bands, Weighting::Weighted).unwrap();
/// assert_eq!(composite.outputs, ["a", "b"]);
/// ```
pub fn compose(
    spec: &ReducerSpec,
    bands: &[String],
    weighting: Weighting,
) -> Result<CompositeReducer, ReducerError> {
    let (names, shared_inputs) = match spec {
        ReducerSpec::Single(name) => {
            return Ok(CompositeReducer::single(name.parse()?, weighting, bands));
        }
        ReducerSpec::Combined {
            reducers,
            shared_inputs,
        } => (reducers, *shared_inputs),
    };

    let folded = names.iter().try_fold(Fold::Empty, |state, name| {
        let reducer: Reducer = name.parse()?;
        Ok::<_, ReducerError>(match state {
            Fold::Empty => Fold::Seeded(CompositeReducer {
                parts: vec![ReducerPart {
                    reducer,
                    weighting: Weighting::Unweighted,
                }],
                shared_inputs,
                bands: bands.to_vec(),
                outputs: Vec::new(),
            }),
            Fold::Seeded(composite) => Fold::Seeded(composite.combine(reducer)),
        })
    })?;
    let Fold::Seeded(composite) = folded else {
        return Err(ReducerError::EmptyReducerList);
    };

    if !shared_inputs && !bands.is_empty() && bands.len() != composite.parts.len() {
        return Err(ReducerError::BandCountMismatch {
            reducers: composite.parts.len(),
            bands: bands.len(),
        });
    }

    let outputs = output_names(&composite.parts, bands, shared_inputs);
    Ok(CompositeReducer {
        outputs,
        ..composite
    })
}

fn position_tag(position: usize) -> String {
    if position == 0 {
        String::new()
    } else {
        position.to_string()
    }
}

fn output_names(parts: &[ReducerPart], bands: &[String], shared_inputs: bool) -> Vec<String> {
    if shared_inputs {
        parts
            .iter()
            .enumerate()
            .flat_map(|(i, part)| {
                let suffix = position_tag(i);
                let name = part.reducer.name();
                if bands.is_empty() {
                    vec![format!("{}{}", name, suffix)]
                } else {
                    bands
                        .iter()
                        .map(|band| format!("{}_{}{}", band, name, suffix))
                        .collect()
                }
            })
            .collect()
    } else if !bands.is_empty() {
        bands.to_vec()
    } else {
        parts
            .iter()
            .enumerate()
            .map(|(i, part)| format!("{}{}", position_tag(i), part.reducer.name()))
            .collect()
    }
}
