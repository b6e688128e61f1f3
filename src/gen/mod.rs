//! # Generator decay-graph reconstruction
//!
//! Generator-level particles reach the ntuplizer through two partially overlapping
//! collections:
//!
//! - the **pruned** collection: few particles, full (possibly multi-valued) ancestry;
//! - the **packed** collection: all final-state particles, a single mother pointer into the
//!   pruned collection at most.
//!
//! This module merges them into one deduplicated [`DecayForest`](crate::gen::forest::DecayForest)
//! and lays it out parent-before-child.
//!
//! ## Pipeline
//!
//! ```text
//!  pruned ──┬─▶ duplicate detection ──┐
//!  packed ──┴─▶ orphan-photon scan ───┴─▶ size ─▶ forest construction ─▶ pre-order flatten
//!                                                   (custody for pruned)
//! ```
//!
//! 1. [`merge`](crate::gen::merge) – duplicate detection, orphan photons, size computation and
//!    forest construction.
//! 2. [`custody`](crate::gen::custody) – single-parent resolution of multi-mother pruned records
//!    (hadronic lineage first, then angular proximity).
//! 3. [`forest`](crate::gen::forest) – the arena, re-parenting and pre-order flattening.
//!
//! Matching tolerances are configuration, gathered in [`MergeParams`](crate::gen::MergeParams).
//!
//! ## See also
//! ------------
//! * [`GenParticlesFiller`](crate::fillers::gen_particles::GenParticlesFiller) – The filler that
//!   runs this pipeline once per event.

pub mod custody;
pub mod forest;
pub mod kinematics;
pub mod merge;
pub mod particle;
pub mod pdg;

use std::cmp::Ordering::{Equal, Greater};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DELTA_R2_TOLERANCE, DEFAULT_PT_REL_TOLERANCE, DEFAULT_TRACKING_RAPIDITY,
};
use crate::ntuplizer_errors::NtuplizerError;

/// What to keep when several packed particles match one pruned status-1 particle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    /// Keep the first match in packed order.
    #[default]
    FirstMatch,
    /// Keep the match with the smallest angular separation.
    ClosestMatch,
}

/// Configuration of the pruned/packed merge.
///
/// Fields
/// -----------------
/// * `pt_rel_tolerance` – maximal `|pt_packed − pt_pruned| / pt_pruned` of a duplicate.
/// * `delta_r2_tolerance` – maximal `ΔR²` between a pruned particle and its packed duplicate.
/// * `tracking_rapidity` – `|y|` below which an unmatched status-1 pruned particle is reported.
/// * `duplicate_policy` – choice among several packed matches.
///
/// Defaults
/// -----------------
/// * `pt_rel_tolerance`: 1.0e-3
/// * `delta_r2_tolerance`: 1.0e-5
/// * `tracking_rapidity`: 6.0
/// * `duplicate_policy`: [`DuplicatePolicy::FirstMatch`]
///
/// ```rust
/// use ntuplizer::gen::{DuplicatePolicy, MergeParams};
///
/// let params = MergeParams::builder()
///     .pt_rel_tolerance(2e-3)
///     .duplicate_policy(DuplicatePolicy::ClosestMatch)
///     .build()
///     .unwrap();
/// assert_eq!(params.delta_r2_tolerance, 1e-5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeParams {
    pub pt_rel_tolerance: f64,
    pub delta_r2_tolerance: f64,
    pub tracking_rapidity: f64,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for MergeParams {
    fn default() -> Self {
        MergeParams {
            pt_rel_tolerance: DEFAULT_PT_REL_TOLERANCE,
            delta_r2_tolerance: DEFAULT_DELTA_R2_TOLERANCE,
            tracking_rapidity: DEFAULT_TRACKING_RAPIDITY,
            duplicate_policy: DuplicatePolicy::FirstMatch,
        }
    }
}

impl MergeParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> MergeParamsBuilder {
        MergeParamsBuilder::new()
    }

    /// Apply the builder validation rules to an already constructed value (e.g. deserialized).
    pub fn validate(&self) -> Result<(), NtuplizerError> {
        if !MergeParamsBuilder::gt0(self.pt_rel_tolerance) {
            return Err(NtuplizerError::InvalidParams(
                "pt_rel_tolerance must be > 0".into(),
            ));
        }
        if !MergeParamsBuilder::gt0(self.delta_r2_tolerance) {
            return Err(NtuplizerError::InvalidParams(
                "delta_r2_tolerance must be > 0".into(),
            ));
        }
        if !MergeParamsBuilder::ge0(self.tracking_rapidity) {
            return Err(NtuplizerError::InvalidParams(
                "tracking_rapidity must be >= 0".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`MergeParams`], with validation.
#[derive(Debug, Clone, Default)]
pub struct MergeParamsBuilder {
    params: MergeParams,
}

impl MergeParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: MergeParams::default(),
        }
    }

    pub fn pt_rel_tolerance(mut self, v: f64) -> Self {
        self.params.pt_rel_tolerance = v;
        self
    }
    pub fn delta_r2_tolerance(mut self, v: f64) -> Self {
        self.params.delta_r2_tolerance = v;
        self
    }
    pub fn tracking_rapidity(mut self, v: f64) -> Self {
        self.params.tracking_rapidity = v;
        self
    }
    pub fn duplicate_policy(mut self, v: DuplicatePolicy) -> Self {
        self.params.duplicate_policy = v;
        self
    }

    /// Return true iff x > 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn gt0(x: f64) -> bool {
        x.partial_cmp(&0.0) == Some(Greater)
    }

    /// Return true iff x >= 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn ge0(x: f64) -> bool {
        matches!(x.partial_cmp(&0.0), Some(Greater) | Some(Equal))
    }

    /// Finalize the builder.
    ///
    /// Validation rules
    /// -----------------
    /// * `pt_rel_tolerance > 0`
    /// * `delta_r2_tolerance > 0`
    /// * `tracking_rapidity ≥ 0`
    ///
    /// NaN fails every rule.
    pub fn build(self) -> Result<MergeParams, NtuplizerError> {
        self.params.validate()?;
        Ok(self.params)
    }
}
