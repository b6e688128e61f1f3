//! # Custody resolution for multi-mother pruned records
//!
//! Pruned generator records may declare several mothers for one particle (e.g. a photon
//! radiated in an interference region, or a hadron produced by a string connecting several
//! partons). The decay forest needs exactly one owner per node, so a tree is grown from the
//! declared daughter lists and, whenever a daughter is claimed by a second mother, custody goes
//! to the **more specific** candidate:
//!
//! 1. a hadronic candidate always beats a non-hadronic one;
//! 2. otherwise (both or neither hadronic) the candidate with the smaller ΔR to the daughter
//!    wins; an exact tie keeps the current owner.
//!
//! The rule is applied claim by claim while the tree grows, so a node already placed under one
//! mother can be moved under another later on.
use tracing::debug;

use crate::gen::forest::{DecayForest, DecayNode, NodeId};
use crate::gen::kinematics::delta_r2;
use crate::gen::particle::PrunedGenParticle;
use crate::gen::pdg::is_hadron;
use crate::ntuplizer_errors::NtuplizerError;

/// Counters collected while growing a forest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CustodyReport {
    /// Daughter claims that found the daughter unowned.
    pub attachments: usize,
    /// Daughters moved from one mother to a more specific one.
    pub transfers: usize,
}

/// `true` if `challenger` should take custody of `daughter` away from `incumbent`.
pub fn is_more_specific(challenger: &DecayNode, incumbent: &DecayNode, daughter: &DecayNode) -> bool {
    let challenger_hadronic = is_hadron(challenger.pdg_id);
    let incumbent_hadronic = is_hadron(incumbent.pdg_id);

    if challenger_hadronic != incumbent_hadronic {
        return challenger_hadronic;
    }
    delta_r2(&challenger.p4, &daughter.p4) < delta_r2(&incumbent.p4, &daughter.p4)
}

/// Link the first `pruned.len()` nodes of `forest` according to the declared daughters.
///
/// Node `i` of the forest must be the node built from pruned particle `i`, and these nodes must
/// still be unlinked.
///
/// Arguments
/// -----------------
/// * `forest`: arena whose leading nodes mirror the pruned collection.
/// * `pruned`: the pruned records, with daughter positions in the same collection.
///
/// Return
/// ----------
/// * A [`CustodyReport`] with the number of attachments and transfers.
///
/// Errors
/// ----------
/// * [`NtuplizerError::MalformedInput`] if a daughter position is out of range or a particle
///   lists itself as daughter.
/// * [`NtuplizerError::InvariantViolation`] if a custody step would create a cycle.
pub fn grow_pruned(
    forest: &mut DecayForest,
    pruned: &[PrunedGenParticle],
) -> Result<CustodyReport, NtuplizerError> {
    let n = pruned.len();
    if forest.len() < n {
        return Err(NtuplizerError::InvariantViolation(format!(
            "custody needs {n} pruned nodes, forest holds {}",
            forest.len()
        )));
    }
    validate_links(pruned)?;

    let mut report = CustodyReport::default();
    let mut visited = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();

    // roots first, then whatever the roots could not reach
    let declared_roots = (0..n).filter(|&i| pruned[i].mothers.iter().all(|&m| m >= n));
    let starts: Vec<usize> = declared_roots.chain(0..n).collect();

    for start in starts {
        if visited[start] {
            continue;
        }
        stack.push(start);

        while let Some(mother) = stack.pop() {
            if visited[mother] {
                continue;
            }
            visited[mother] = true;

            for &daughter in &pruned[mother].daughters {
                claim(forest, node_id(forest, mother)?, node_id(forest, daughter)?, &mut report)?;
            }
            stack.extend(
                pruned[mother]
                    .daughters
                    .iter()
                    .rev()
                    .copied()
                    .filter(|&d| !visited[d]),
            );
        }
    }

    Ok(report)
}

/// Build a forest from a pruned collection alone.
pub fn build_pruned_forest(
    pruned: &[PrunedGenParticle],
) -> Result<(DecayForest, CustodyReport), NtuplizerError> {
    let mut forest = DecayForest::with_capacity(pruned.len());
    for (i, particle) in pruned.iter().enumerate() {
        forest.push(DecayNode::from_pruned(i, particle));
    }
    let report = grow_pruned(&mut forest, pruned)?;
    Ok((forest, report))
}

fn claim(
    forest: &mut DecayForest,
    mother: NodeId,
    daughter: NodeId,
    report: &mut CustodyReport,
) -> Result<(), NtuplizerError> {
    match forest.node(daughter).parent() {
        None => {
            forest.attach(daughter, mother)?;
            report.attachments += 1;
        }
        Some(incumbent) if incumbent == mother => {}
        Some(incumbent) => {
            if is_more_specific(
                forest.node(mother),
                forest.node(incumbent),
                forest.node(daughter),
            ) {
                forest.reparent(daughter, mother)?;
                report.transfers += 1;
                debug!(
                    daughter = daughter.index(),
                    from = incumbent.index(),
                    to = mother.index(),
                    "custody transferred"
                );
            }
        }
    }
    Ok(())
}

fn node_id(forest: &DecayForest, index: usize) -> Result<NodeId, NtuplizerError> {
    forest.id_at(index).ok_or_else(|| {
        NtuplizerError::InvariantViolation(format!("no forest node for pruned particle {index}"))
    })
}

fn validate_links(pruned: &[PrunedGenParticle]) -> Result<(), NtuplizerError> {
    let n = pruned.len();
    for (i, particle) in pruned.iter().enumerate() {
        if let Some(&d) = particle.daughters.iter().find(|&&d| d >= n || d == i) {
            return Err(NtuplizerError::MalformedInput(format!(
                "pruned particle {i} declares invalid daughter {d} (collection size {n})"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gen::kinematics::P4;
    use crate::gen::particle::link_pruned;

    fn particle(pdg_id: i32, status: i32, eta: f64, phi: f64) -> PrunedGenParticle {
        PrunedGenParticle::new(pdg_id, status, P4::massless(10.0, eta, phi))
    }

    #[test]
    fn test_single_mother_chain() {
        let mut pruned = vec![
            particle(25, 62, 0.0, 0.0),
            particle(5, 71, 0.2, 0.0),
            particle(511, 2, 0.2, 0.1),
        ];
        link_pruned(&mut pruned, 0, 1);
        link_pruned(&mut pruned, 1, 2);

        let (forest, report) = build_pruned_forest(&pruned).unwrap();

        assert_eq!(report.attachments, 2);
        assert_eq!(report.transfers, 0);
        assert_eq!(forest.roots().count(), 1);
        forest.check_invariants().unwrap();
    }

    #[test]
    fn test_closer_mother_wins_among_non_hadrons() {
        // two quarks (non-hadronic) both claim the photon; the closer one keeps it
        let mut pruned = vec![
            particle(1, 23, 0.8, 0.0),
            particle(2, 23, 0.1, 0.0),
            particle(22, 1, 0.0, 0.0),
        ];
        link_pruned(&mut pruned, 0, 2);
        link_pruned(&mut pruned, 1, 2);

        let (forest, report) = build_pruned_forest(&pruned).unwrap();

        let photon = forest.id_at(2).unwrap();
        assert_eq!(forest.node(photon).parent(), forest.id_at(1));
        assert_eq!(report.transfers, 1);
        assert!(forest.node(forest.id_at(0).unwrap()).children().is_empty());
    }

    #[test]
    fn test_transfer_moves_whole_subtree() {
        // 0 (far quark) and 1 (near quark) claim 2, which owns 3
        let mut pruned = vec![
            particle(1, 23, 1.0, 0.0),
            particle(2, 23, 0.05, 0.0),
            particle(111, 2, 0.0, 0.0),
            particle(22, 1, 0.0, 0.01),
        ];
        link_pruned(&mut pruned, 0, 2);
        link_pruned(&mut pruned, 2, 3);
        link_pruned(&mut pruned, 1, 2);

        let (forest, _) = build_pruned_forest(&pruned).unwrap();
        let flat = forest.flatten().unwrap();

        let ids: Vec<usize> = flat.order.iter().map(|id| id.index()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert_eq!(flat.parents, vec![None, None, Some(1), Some(2)]);
    }

    #[test]
    fn test_invalid_daughter_is_malformed_input() {
        let mut pruned = vec![particle(25, 62, 0.0, 0.0)];
        pruned[0].daughters.push(4);

        assert!(matches!(
            build_pruned_forest(&pruned),
            Err(NtuplizerError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_declared_cycle_aborts() {
        let mut pruned = vec![particle(1, 23, 0.0, 0.0), particle(2, 23, 0.1, 0.0)];
        link_pruned(&mut pruned, 0, 1);
        link_pruned(&mut pruned, 1, 0);

        assert!(matches!(
            build_pruned_forest(&pruned),
            Err(NtuplizerError::InvariantViolation(_))
        ));
    }
}
