//! Examples
//!
//! The units that are clustered: a record of properties that questions are
//! asked about, a box of numeric observations the scorer looks at, and the
//! observation mass the example stands for.
use crate::errors::CartError;
use crate::properties::{PropertyMap, PropertyMapRef, StoredProperties};
use crate::utils::{kahan_sum, validate_float_parameter};
use hashbrown::HashSet;
use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Dense row-major matrix of observations.
///
/// A box can be read as a scalar (its first value), as a vector (all values
/// in row-major order) or as a 2-dim matrix.
#[derive(Debug, Clone)]
pub struct FloatBox {
    rows: usize,
    columns: usize,
    data: Vec<f64>,
}

fn allocate(size: usize) -> Result<Vec<f64>, CartError> {
    let mut data = Vec::new();
    if data.try_reserve_exact(size).is_err() {
        return Err(CartError::AllocationFailed(size));
    }
    data.resize(size, 0.0);
    Ok(data)
}

impl FloatBox {
    /// Zero filled `rows x columns` matrix.
    pub fn new(rows: usize, columns: usize) -> Result<Self, CartError> {
        let size = rows
            .checked_mul(columns)
            .ok_or(CartError::AllocationFailed(usize::MAX))?;
        Ok(FloatBox {
            rows,
            columns,
            data: allocate(size)?,
        })
    }

    pub fn scalar(value: f64) -> Self {
        FloatBox {
            rows: 1,
            columns: 1,
            data: vec![value],
        }
    }

    pub fn vector(values: Vec<f64>) -> Self {
        FloatBox {
            rows: 1,
            columns: values.len(),
            data: values,
        }
    }

    pub fn from_matrix(rows: usize, columns: usize, values: Vec<f64>) -> Result<Self, CartError> {
        if rows.checked_mul(columns) != Some(values.len()) {
            return Err(CartError::InvalidShape(rows, columns, values.len()));
        }
        Ok(FloatBox {
            rows,
            columns,
            data: values,
        })
    }

    // as scalar
    pub fn get(&self) -> f64 {
        self.data.first().copied().unwrap_or(0.0)
    }

    // as vector
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    // as 2-dim. values
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn at(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.columns + j]
    }

    pub fn set_at(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.columns + j] = value;
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.columns..(i + 1) * self.columns]
    }

}

impl PartialEq for FloatBox {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FloatBox {}

impl PartialOrd for FloatBox {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatBox {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rows
            .cmp(&other.rows)
            .then(self.columns.cmp(&other.columns))
            .then_with(|| {
                self.data
                    .iter()
                    .zip(other.data.iter())
                    .map(|(a, b)| a.total_cmp(b))
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            })
    }
}

impl Hash for FloatBox {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rows.hash(state);
        self.columns.hash(state);
        for v in &self.data {
            v.to_bits().hash(state);
        }
    }
}

impl Display for FloatBox {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for i in 0..self.rows {
            let row: Vec<String> = self.row(i).iter().map(|v| v.to_string()).collect();
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", row.join(" "))?;
        }
        Ok(())
    }
}

/// A record to be clustered.
#[derive(Debug, Clone)]
pub struct Example {
    pub properties: StoredProperties,
    pub values: FloatBox,
    pub n_obs: f64,
}

pub type ExampleRef = Rc<Example>;

impl Example {
    pub fn new(properties: StoredProperties, values: FloatBox, n_obs: f64) -> Self {
        Example {
            properties,
            values,
            n_obs,
        }
    }
}

impl Display for Example {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}] nObs={} values={}", self.properties, self.n_obs, self.values)
    }
}

/// Ordered examples sharing one schema.
///
/// Each handle is held once, so clusters over the list can be matched back to
/// it by identity.
#[derive(Debug, Clone)]
pub struct ExampleList {
    map: PropertyMapRef,
    examples: Vec<ExampleRef>,
    identities: HashSet<usize>,
}

impl ExampleList {
    pub fn new(map: PropertyMapRef) -> Result<Self, CartError> {
        map.require_set()?;
        Ok(ExampleList {
            map,
            examples: Vec::new(),
            identities: HashSet::new(),
        })
    }

    pub fn map(&self) -> &PropertyMap {
        &self.map
    }

    pub fn map_ref(&self) -> &PropertyMapRef {
        &self.map
    }

    fn check_map(&self, map: &PropertyMap) -> Result<(), CartError> {
        let diff = self.map.diff(map);
        if diff.has_differences() {
            Err(CartError::PropertyMapMismatch(diff.to_string()))
        } else {
            Ok(())
        }
    }

    pub fn add(&mut self, example: Example) -> Result<ExampleRef, CartError> {
        let example = Rc::new(example);
        self.add_ref(example.clone())?;
        Ok(example)
    }

    pub fn add_ref(&mut self, example: ExampleRef) -> Result<(), CartError> {
        if !Rc::ptr_eq(&self.map, example.properties.map_ref()) {
            self.check_map(example.properties.map_ref())?;
        }
        // Masses are counts: finite and non-negative.
        validate_float_parameter(example.n_obs, 0.0, f64::MAX, "n_obs")?;
        if !self.identities.insert(Rc::as_ptr(&example) as usize) {
            return Err(CartError::DuplicateExample(self.examples.len()));
        }
        self.examples.push(example);
        Ok(())
    }

    pub fn get(&self, i: usize) -> Option<&ExampleRef> {
        self.examples.get(i)
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExampleRef> {
        self.examples.iter()
    }

    pub fn as_slice(&self) -> &[ExampleRef] {
        &self.examples
    }

    /// Total observation mass.
    pub fn n_obs(&self) -> f64 {
        kahan_sum(self.examples.iter().map(|e| e.n_obs))
    }
}

impl<'a> IntoIterator for &'a ExampleList {
    type Item = &'a ExampleRef;
    type IntoIter = std::slice::Iter<'a, ExampleRef>;
    fn into_iter(self) -> Self::IntoIter {
        self.examples.iter()
    }
}
