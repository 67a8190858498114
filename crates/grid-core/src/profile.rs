//! Snapshot values with optional time series.
//!
//! Every time-varying device attribute is a [`Profile`]: the snapshot value
//! used when no time index is given, plus an optional series indexed by time
//! step. Reading at a time index past the end of the series falls back to the
//! snapshot value; [`Network::validate_into`](crate::Network::validate_into)
//! reports series whose length disagrees with the network's step count.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile<T> {
    /// Snapshot value
    pub value: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<Vec<T>>,
}

impl<T: Clone> Profile<T> {
    pub fn fixed(value: T) -> Self {
        Self {
            value,
            series: None,
        }
    }

    /// Profile whose snapshot value is `value` and whose steps are `series`.
    pub fn with_series(value: T, series: Vec<T>) -> Self {
        Self {
            value,
            series: Some(series),
        }
    }

    /// Value at `t_idx`, or the snapshot value when `t_idx` is `None`.
    #[inline]
    pub fn at(&self, t_idx: Option<usize>) -> T {
        match (t_idx, &self.series) {
            (Some(t), Some(series)) => series.get(t).cloned().unwrap_or_else(|| self.value.clone()),
            _ => self.value.clone(),
        }
    }

    /// Overwrite the snapshot value and every step of the series.
    pub fn set_all(&mut self, value: T) {
        if let Some(series) = self.series.as_mut() {
            series.iter_mut().for_each(|v| *v = value.clone());
        }
        self.value = value;
    }

    /// Number of steps, zero for a fixed profile.
    pub fn len(&self) -> usize {
        self.series.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_series(&self) -> bool {
        self.series.is_some()
    }
}

impl<T: Clone + Default> Default for Profile<T> {
    fn default() -> Self {
        Self::fixed(T::default())
    }
}

impl<T: Clone> From<T> for Profile<T> {
    fn from(value: T) -> Self {
        Self::fixed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_series_lookup() {
        let p = Profile::with_series(10.0, vec![1.0, 2.0, 3.0]);
        assert_eq!(p.at(None), 10.0);
        assert_eq!(p.at(Some(1)), 2.0);
        assert_eq!(p.at(Some(7)), 10.0);
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn test_fixed_ignores_time_index() {
        let p: Profile<bool> = true.into();
        assert!(p.at(Some(4)));
        assert!(!p.has_series());
    }

    #[test]
    fn test_set_all() {
        let mut p = Profile::with_series(true, vec![true, false]);
        p.set_all(false);
        assert_eq!(p.series, Some(vec![false, false]));
        assert!(!p.value);
    }
}
