//! # Pruned/packed merge
//!
//! Builds a single deduplicated [`DecayForest`] out of the pruned and packed generator
//! collections of one event.
//!
//! ## Steps
//!
//! 1. **Duplicate detection.** Every status-1 pruned particle is compared with the packed
//!    particles of the same species. A packed particle is a duplicate of it when
//!    `|Δpt| ≤ pt_rel_tolerance · pt` and `ΔR² ≤ delta_r2_tolerance`. Several matches are
//!    reported as [`MergeAnomaly::MultipleMatches`] and resolved by
//!    [`DuplicatePolicy`](crate::gen::DuplicatePolicy); no match inside the tracking acceptance
//!    (`|y| < tracking_rapidity`) is reported as [`MergeAnomaly::Unmatched`]. A packed particle is
//!    claimed by at most one pruned particle.
//! 2. **Orphan photons.** A kept packed photon flagged as direct hadron-decay product whose
//!    mother is missing, or is not a decayed hadron, receives a synthetic neutral-pion parent.
//! 3. **Size.** `pruned + packed − duplicates + synthetic parents`; the arena is allocated once
//!    with that capacity.
//! 4. **Construction.** Pruned nodes first (custody resolved by
//!    [`grow_pruned`](crate::gen::custody::grow_pruned)), then the kept packed particles under
//!    their pruned mother, each orphan photon preceded by its synthetic parent.
//!
//! Anomalies never abort the merge: they are logged with `tracing::warn!` and collected in the
//! [`MergeReport`].
use itertools::Itertools;
use nalgebra::Vector3;
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::constants::{PdgId, PDG_PHOTON, STATUS_DECAYED};
use crate::gen::custody::grow_pruned;
use crate::gen::forest::{DecayForest, DecayNode};
use crate::gen::kinematics::delta_r2;
use crate::gen::particle::{PackedGenParticle, PrunedGenParticle, StatusFlags};
use crate::gen::pdg::is_hadron;
use crate::gen::{DuplicatePolicy, MergeParams};
use crate::ntuplizer_errors::NtuplizerError;

/// Unexpected configuration found while matching pruned and packed particles.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeAnomaly {
    /// A status-1 pruned particle matched several packed particles.
    MultipleMatches {
        pruned_index: usize,
        pdg_id: PdgId,
        pt: f64,
        rapidity: f64,
        /// Packed positions of all candidates, in packed order.
        matches: Vec<usize>,
    },
    /// A status-1 pruned particle inside the tracking acceptance matched nothing.
    Unmatched {
        pruned_index: usize,
        pdg_id: PdgId,
        pt: f64,
        rapidity: f64,
    },
}

/// Bookkeeping of one merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    pub pruned: usize,
    pub packed: usize,
    pub duplicates: usize,
    pub synthetic_parents: usize,
    pub custody_transfers: usize,
    pub anomalies: Vec<MergeAnomaly>,
}

impl MergeReport {
    /// `pruned + packed − duplicates + synthetic_parents`.
    pub fn expected_size(&self) -> usize {
        self.pruned + self.packed - self.duplicates + self.synthetic_parents
    }
}

/// Result of [`GenParticleMerger::merge`].
#[derive(Debug, Clone)]
pub struct MergedGenParticles {
    pub forest: DecayForest,
    pub report: MergeReport,
    /// For each packed position, the pruned particle it duplicates.
    pub duplicate_of: Vec<Option<usize>>,
}

/// Merges pruned and packed generator collections with fixed [`MergeParams`].
#[derive(Debug, Clone, Default)]
pub struct GenParticleMerger {
    params: MergeParams,
}

impl GenParticleMerger {
    pub fn new(params: MergeParams) -> Self {
        GenParticleMerger { params }
    }

    pub fn params(&self) -> &MergeParams {
        &self.params
    }

    /// Pair status-1 pruned particles with their packed duplicates.
    ///
    /// Return
    /// ----------
    /// * For each packed position, the pruned position it duplicates, and the anomalies met.
    pub fn find_duplicates(
        &self,
        pruned: &[PrunedGenParticle],
        packed: &[PackedGenParticle],
    ) -> (Vec<Option<usize>>, Vec<MergeAnomaly>) {
        let mut duplicate_of: Vec<Option<usize>> = vec![None; packed.len()];
        let mut anomalies = Vec::new();

        for (i, particle) in pruned.iter().enumerate().filter(|(_, p)| p.is_final_state()) {
            let pt_threshold = self.params.pt_rel_tolerance * particle.p4.pt;

            let matches: SmallVec<[(usize, f64); 2]> = packed
                .iter()
                .enumerate()
                .filter(|(j, candidate)| {
                    duplicate_of[*j].is_none()
                        && candidate.pdg_id == particle.pdg_id
                        && (candidate.p4.pt - particle.p4.pt).abs() <= pt_threshold
                })
                .map(|(j, candidate)| (j, delta_r2(&candidate.p4, &particle.p4)))
                .filter(|(_, dr2)| *dr2 <= self.params.delta_r2_tolerance)
                .collect();

            let kept = match matches.as_slice() {
                [] => {
                    let rapidity = particle.p4.rapidity();
                    if rapidity.abs() < self.params.tracking_rapidity {
                        warn!(
                            pruned_index = i,
                            pdg_id = particle.pdg_id,
                            pt = particle.p4.pt,
                            rapidity,
                            "status-1 pruned particle has no packed counterpart"
                        );
                        anomalies.push(MergeAnomaly::Unmatched {
                            pruned_index: i,
                            pdg_id: particle.pdg_id,
                            pt: particle.p4.pt,
                            rapidity,
                        });
                    }
                    None
                }
                [(j, _)] => Some(*j),
                several => {
                    let rapidity = particle.p4.rapidity();
                    let positions = several.iter().map(|(j, _)| *j).collect_vec();
                    warn!(
                        pruned_index = i,
                        pdg_id = particle.pdg_id,
                        pt = particle.p4.pt,
                        rapidity,
                        matches = ?positions,
                        "status-1 pruned particle matches several packed particles"
                    );
                    anomalies.push(MergeAnomaly::MultipleMatches {
                        pruned_index: i,
                        pdg_id: particle.pdg_id,
                        pt: particle.p4.pt,
                        rapidity,
                        matches: positions,
                    });

                    match self.params.duplicate_policy {
                        DuplicatePolicy::FirstMatch => several.first().map(|(j, _)| *j),
                        // min_by keeps the first of equal elements
                        DuplicatePolicy::ClosestMatch => several
                            .iter()
                            .min_by(|a, b| a.1.total_cmp(&b.1))
                            .map(|(j, _)| *j),
                    }
                }
            };

            if let Some(j) = kept {
                duplicate_of[j] = Some(i);
            }
        }

        (duplicate_of, anomalies)
    }

    /// Merge the two collections of one event.
    ///
    /// Arguments
    /// -----------------
    /// * `pruned`: pruned particles, links given as positions in `pruned`.
    /// * `packed`: packed particles, mothers given as positions in `pruned`.
    ///
    /// Return
    /// ----------
    /// * The merged forest, where node `i` is pruned particle `i`, with the merge report and
    ///   the duplicate assignment.
    ///
    /// Errors
    /// ----------
    /// * [`NtuplizerError::MalformedInput`] for out-of-range links.
    /// * [`NtuplizerError::InvariantViolation`] if custody or construction breaks the forest
    ///   invariants, or the built forest does not have the computed size.
    pub fn merge(
        &self,
        pruned: &[PrunedGenParticle],
        packed: &[PackedGenParticle],
    ) -> Result<MergedGenParticles, NtuplizerError> {
        if let Some((j, m)) = packed
            .iter()
            .enumerate()
            .find_map(|(j, p)| p.mother.filter(|m| *m >= pruned.len()).map(|m| (j, m)))
        {
            return Err(NtuplizerError::MalformedInput(format!(
                "packed particle {j} points to pruned mother {m} (collection size {})",
                pruned.len()
            )));
        }

        let (duplicate_of, anomalies) = self.find_duplicates(pruned, packed);
        let duplicates = duplicate_of.iter().flatten().count();
        let synthetic_parents = packed
            .iter()
            .zip(&duplicate_of)
            .filter(|(p, dup)| dup.is_none() && needs_synthetic_parent(p, pruned))
            .count();

        let mut report = MergeReport {
            pruned: pruned.len(),
            packed: packed.len(),
            duplicates,
            synthetic_parents,
            custody_transfers: 0,
            anomalies,
        };
        let size = report.expected_size();

        let mut forest = DecayForest::with_capacity(size);
        for (i, particle) in pruned.iter().enumerate() {
            forest.push(DecayNode::from_pruned(i, particle));
        }
        report.custody_transfers = grow_pruned(&mut forest, pruned)?.transfers;

        for (j, particle) in packed.iter().enumerate() {
            if duplicate_of[j].is_some() {
                continue;
            }

            let mother = particle.mother.and_then(|m| forest.id_at(m));
            let mut node = DecayNode::from_packed(j, particle);
            if let Some(m) = particle.mother {
                node.vertex = pruned[m].vertex;
            }

            let owner = if needs_synthetic_parent(particle, pruned) {
                let (p4, vertex) = match particle.mother {
                    Some(m) => (pruned[m].p4, pruned[m].vertex),
                    None => (particle.p4, Vector3::zeros()),
                };
                let synthetic = forest.push(DecayNode::synthetic_pi0(j, p4, vertex));
                if let Some(m) = mother {
                    forest.attach(synthetic, m)?;
                }
                Some(synthetic)
            } else {
                mother
            };

            let id = forest.push(node);
            if let Some(owner) = owner {
                forest.attach(id, owner)?;
            }
        }

        if forest.len() != size {
            return Err(NtuplizerError::InvariantViolation(format!(
                "merged forest holds {} particles, expected {size}",
                forest.len()
            )));
        }

        debug!(
            pruned = report.pruned,
            packed = report.packed,
            duplicates,
            synthetic_parents,
            size,
            "merged generator collections"
        );

        Ok(MergedGenParticles {
            forest,
            report,
            duplicate_of,
        })
    }
}

/// `true` for a packed photon from a hadron decay whose mother is not a decayed hadron.
///
/// Packed mothers outside `pruned` count as missing.
pub fn needs_synthetic_parent(particle: &PackedGenParticle, pruned: &[PrunedGenParticle]) -> bool {
    if particle.pdg_id != PDG_PHOTON
        || !particle
            .flags
            .contains(StatusFlags::IS_DIRECT_HADRON_DECAY_PRODUCT)
    {
        return false;
    }

    match particle.mother.and_then(|m| pruned.get(m)) {
        None => true,
        Some(mother) => !(is_hadron(mother.pdg_id) && mother.status == STATUS_DECAYED),
    }
}

/// Merge with the given parameters. See [`GenParticleMerger::merge`].
pub fn merge_gen_particles(
    pruned: &[PrunedGenParticle],
    packed: &[PackedGenParticle],
    params: &MergeParams,
) -> Result<MergedGenParticles, NtuplizerError> {
    GenParticleMerger::new(params.clone()).merge(pruned, packed)
}
