//! Suite Planner
//!
//! Builds the native kernel suite for a run by filtering the catalog.
//!
//! Filtering options:
//! - Regex pattern matching on kernel name
//!
//! Ordering: catalog order is kept, so suite indices match the listing.

use membench_core::KernelDef;
use regex::Regex;

/// Kernels selected for a run
pub struct ExecutionPlan {
    /// Ordered list of kernels to run
    pub kernels: Vec<KernelDef>,
}

/// Build execution plan from the kernel catalog
pub fn build_plan(catalog: impl IntoIterator<Item = KernelDef>, filter: Option<&Regex>) -> ExecutionPlan {
    let kernels = catalog
        .into_iter()
        .filter(|k| filter.is_none_or(|re| re.is_match(&k.name)))
        .collect();

    ExecutionPlan { kernels }
}
