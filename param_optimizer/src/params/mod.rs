use std::collections::HashSet;
use std::fmt;

use crate::error::ParamsError;

/// One row of a parameter table: a named value with optional box bounds.
///
/// Unbounded sides are stored as `-inf` / `+inf`.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub value: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl Param {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            lower_bound: f64::NEG_INFINITY,
            upper_bound: f64::INFINITY,
        }
    }

    pub fn with_bounds(mut self, lower: f64, upper: f64) -> Self {
        self.lower_bound = lower;
        self.upper_bound = upper;
        self
    }

    pub fn with_lower_bound(mut self, lower: f64) -> Self {
        self.lower_bound = lower;
        self
    }

    pub fn with_upper_bound(mut self, upper: f64) -> Self {
        self.upper_bound = upper;
        self
    }

    /// True if at least one side of the box is finite.
    pub fn is_bounded(&self) -> bool {
        self.lower_bound.is_finite() || self.upper_bound.is_finite()
    }

    /// Distance by which `value` lies outside `[lower_bound, upper_bound]`, or 0.0.
    pub fn bound_violation(&self) -> f64 {
        (self.lower_bound - self.value)
            .max(self.value - self.upper_bound)
            .max(0.0)
    }

    fn validate(&self) -> Result<(), ParamsError> {
        if !self.value.is_finite() {
            return Err(ParamsError::NonFiniteValue {
                name: self.name.clone(),
                value: self.value,
            });
        }
        if self.lower_bound.is_nan()
            || self.upper_bound.is_nan()
            || self.lower_bound >= self.upper_bound
        {
            return Err(ParamsError::InvalidBounds {
                name: self.name.clone(),
                lower: self.lower_bound,
                upper: self.upper_bound,
            });
        }
        // The bound reparametrization needs a strictly interior start.
        if self.value <= self.lower_bound || self.value >= self.upper_bound {
            return Err(ParamsError::StartOutsideBounds {
                name: self.name.clone(),
                value: self.value,
                lower: self.lower_bound,
                upper: self.upper_bound,
            });
        }
        Ok(())
    }
}

/// Ordered parameter table.
///
/// Order is significant: result vectors (`x`, gradients, Hessian rows) are
/// positionally aligned to it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Params {
    entries: Vec<Param>,
}

impl Params {
    pub fn new(entries: Vec<Param>) -> Self {
        Self { entries }
    }

    /// Builds an unbounded table named `x_0`, `x_1`, ...
    pub fn from_values(values: &[f64]) -> Self {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Param::new(format!("x_{i}"), v))
            .collect()
    }

    pub fn from_named<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        pairs
            .into_iter()
            .map(|(name, value)| Param::new(name, value))
            .collect()
    }

    pub fn with_param(mut self, param: Param) -> Self {
        self.entries.push(param);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Param> {
        self.entries.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&Param> {
        self.entries.get(idx)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.iter_values().collect()
    }

    pub fn iter_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|p| p.value)
    }

    /// Value of the parameter called `name`, if present.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.entries.iter().find(|p| p.name == name).map(|p| p.value)
    }

    pub fn lower_bounds(&self) -> Vec<f64> {
        self.entries.iter().map(|p| p.lower_bound).collect()
    }

    pub fn upper_bounds(&self) -> Vec<f64> {
        self.entries.iter().map(|p| p.upper_bound).collect()
    }

    pub fn has_bounds(&self) -> bool {
        self.entries.iter().any(Param::is_bounded)
    }

    /// Checks the table is usable as a starting point.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.entries.is_empty() {
            return Err(ParamsError::Empty);
        }
        let mut seen = HashSet::with_capacity(self.entries.len());
        for param in &self.entries {
            if !seen.insert(param.name.as_str()) {
                return Err(ParamsError::DuplicateName {
                    name: param.name.clone(),
                });
            }
            param.validate()?;
        }
        Ok(())
    }

    /// Copy of this table with the values replaced, keeping names, order and bounds.
    pub fn with_values(&self, values: &[f64]) -> Result<Params, ParamsError> {
        if values.len() != self.entries.len() {
            return Err(ParamsError::LengthMismatch {
                expected: self.entries.len(),
                got: values.len(),
            });
        }
        let mut out = self.clone();
        out.overwrite_values(values);
        Ok(out)
    }

    /// Overwrites values positionally. Callers guarantee matching length.
    pub(crate) fn overwrite_values(&mut self, values: &[f64]) {
        debug_assert_eq!(values.len(), self.entries.len());
        for (param, &v) in self.entries.iter_mut().zip(values) {
            param.value = v;
        }
    }

    /// Largest bound violation over all parameters, or `None` when no bound is finite.
    pub fn max_bound_violation(&self) -> Option<f64> {
        if !self.has_bounds() {
            return None;
        }
        Some(
            self.entries
                .iter()
                .map(Param::bound_violation)
                .fold(0.0, f64::max),
        )
    }
}

impl FromIterator<Param> for Params {
    fn from_iter<I: IntoIterator<Item = Param>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = &'a Param;
    type IntoIter = std::slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .entries
            .iter()
            .map(|p| p.name.len())
            .max()
            .unwrap_or(0)
            .max("name".len());
        writeln!(f, "{:<width$}  value", "name")?;
        for p in &self.entries {
            write!(f, "{:<width$}  {}", p.name, p.value)?;
            if p.is_bounded() {
                write!(f, "  [{}, {}]", p.lower_bound, p.upper_bound)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn from_values_names_positionally() {
        let params = Params::from_values(&[1.0, 2.5, -1.0]);
        assert_eq!(params.names(), vec!["x_0", "x_1", "x_2"]);
        assert_eq!(params.values(), vec![1.0, 2.5, -1.0]);
        assert_eq!(params.value("x_1"), Some(2.5));
        assert_eq!(params.value("missing"), None);
    }

    #[test]
    fn valid_table_passes() {
        let params = Params::default()
            .with_param(Param::new("a", 1.0))
            .with_param(Param::new("b", 0.5).with_bounds(0.0, 1.0))
            .with_param(Param::new("c", -3.0).with_upper_bound(0.0));
        assert_eq!(params.validate(), Ok(()));
    }

    #[test]
    fn empty_table_is_rejected() {
        assert_eq!(Params::default().validate(), Err(ParamsError::Empty));
    }

    #[test_case(f64::NAN; "nan")]
    #[test_case(f64::INFINITY; "pos inf")]
    #[test_case(f64::NEG_INFINITY; "neg inf")]
    fn non_finite_value_is_rejected(value: f64) {
        let params = Params::from_values(&[1.0, value]);
        assert!(matches!(
            params.validate(),
            Err(ParamsError::NonFiniteValue { name, .. }) if name == "x_1"
        ));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let params = Params::from_named([("a", 1.0), ("b", 2.0), ("a", 3.0)]);
        assert_eq!(
            params.validate(),
            Err(ParamsError::DuplicateName {
                name: "a".to_string()
            })
        );
    }

    #[test_case(1.0, 1.0; "equal bounds")]
    #[test_case(2.0, 1.0; "inverted bounds")]
    #[test_case(f64::NAN, 1.0; "nan lower")]
    fn invalid_bounds_are_rejected(lower: f64, upper: f64) {
        let params = Params::new(vec![Param::new("a", 0.5).with_bounds(lower, upper)]);
        assert!(matches!(
            params.validate(),
            Err(ParamsError::InvalidBounds { .. })
        ));
    }

    #[test_case(0.0, 0.0, 1.0; "on lower bound")]
    #[test_case(1.0, 0.0, 1.0; "on upper bound")]
    #[test_case(-2.0, 0.0, 1.0; "below")]
    #[test_case(5.0, f64::NEG_INFINITY, 1.0; "above upper only")]
    fn start_outside_bounds_is_rejected(value: f64, lower: f64, upper: f64) {
        let params = Params::new(vec![Param::new("a", value).with_bounds(lower, upper)]);
        assert!(matches!(
            params.validate(),
            Err(ParamsError::StartOutsideBounds { .. })
        ));
    }

    #[test]
    fn with_values_keeps_shape() {
        let params = Params::new(vec![
            Param::new("a", 1.0).with_bounds(0.0, 2.0),
            Param::new("b", 2.0),
        ]);
        let moved = params.with_values(&[1.5, -4.0]).unwrap();

        assert_eq!(moved.names(), params.names());
        assert_eq!(moved.values(), vec![1.5, -4.0]);
        assert_eq!(moved.lower_bounds(), vec![0.0, f64::NEG_INFINITY]);
        assert_eq!(moved.upper_bounds(), vec![2.0, f64::INFINITY]);
        assert_eq!(
            params.with_values(&[1.0]),
            Err(ParamsError::LengthMismatch {
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn bound_violation_summary() {
        let unbounded = Params::from_values(&[1.0, 2.0]);
        assert_eq!(unbounded.max_bound_violation(), None);

        let inside = Params::new(vec![Param::new("a", 0.5).with_bounds(0.0, 1.0)]);
        assert_eq!(inside.max_bound_violation(), Some(0.0));

        let outside = Params::new(vec![
            Param::new("a", 1.25).with_bounds(0.0, 1.0),
            Param::new("b", -3.0).with_lower_bound(-2.0),
        ]);
        assert_eq!(outside.max_bound_violation(), Some(1.0));
    }
}
