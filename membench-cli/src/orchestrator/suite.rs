//! Benchmark Suite
//!
//! The ordered list of tests a run walks through. Built once from the
//! measurement layer's test count and never modified afterwards.

use membench_core::{MeasurementError, MeasurementLayer};
use std::fmt;

/// Position of a test in the suite
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TestId(usize);

impl TestId {
    /// Zero-based suite index
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ordered, immutable list of tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkSuite {
    tests: Vec<TestId>,
}

impl BenchmarkSuite {
    /// Ask the layer how many tests it has. Called exactly once.
    pub fn discover<M: MeasurementLayer + ?Sized>(layer: &mut M) -> Result<Self, MeasurementError> {
        let count = layer.test_count()?;
        tracing::debug!(count, "discovered suite");
        Ok(Self::with_count(count))
    }

    /// Suite of `count` tests, indices `0..count`
    pub fn with_count(count: usize) -> Self {
        Self {
            tests: (0..count).map(TestId).collect(),
        }
    }

    /// Number of tests
    pub fn test_count(&self) -> usize {
        self.tests.len()
    }

    /// True when there is nothing to run
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Tests in run order
    pub fn iter(&self) -> impl Iterator<Item = TestId> + '_ {
        self.tests.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counting {
        count: usize,
        queries: usize,
    }

    impl MeasurementLayer for Counting {
        fn test_count(&mut self) -> Result<usize, MeasurementError> {
            self.queries += 1;
            Ok(self.count)
        }

        fn run_one_test(&mut self, _index: usize) -> Result<String, MeasurementError> {
            unreachable!("suite discovery never runs tests")
        }
    }

    #[test]
    fn test_discover_queries_once() {
        let mut layer = Counting { count: 3, queries: 0 };
        let suite = BenchmarkSuite::discover(&mut layer).unwrap();
        assert_eq!(layer.queries, 1);
        assert_eq!(suite.test_count(), 3);
        let indices: Vec<_> = suite.iter().map(TestId::index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_suite() {
        let suite = BenchmarkSuite::with_count(0);
        assert!(suite.is_empty());
        assert_eq!(suite.iter().count(), 0);
    }

    #[test]
    fn test_discover_propagates_errors() {
        struct Broken;
        impl MeasurementLayer for Broken {
            fn test_count(&mut self) -> Result<usize, MeasurementError> {
                Err(MeasurementError::Unavailable("no worker".to_string()))
            }
            fn run_one_test(&mut self, _index: usize) -> Result<String, MeasurementError> {
                unreachable!()
            }
        }
        assert!(BenchmarkSuite::discover(&mut Broken).is_err());
    }
}
