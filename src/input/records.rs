//! Reconstruction-level input records read by the built-in fillers.
//!
//! Links between input records are positions in the referenced input collection; the fillers
//! turn them into [`IdentityKey`](crate::object_map::IdentityKey)s with the token of that
//! collection.
use nalgebra::Vector3;

use crate::constants::PdgId;
use crate::gen::kinematics::P4;

/// Reconstructed primary vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoVertex {
    pub position: Vector3<f64>,
    pub ndof: f64,
    pub chi2: f64,
    pub score: f64,
    pub is_fake: bool,
}

impl RecoVertex {
    pub const MIN_NDOF: f64 = 4.0;
    pub const MAX_ABS_Z: f64 = 24.0;
    pub const MAX_RHO: f64 = 2.0;

    pub fn new(position: Vector3<f64>, ndof: f64) -> Self {
        RecoVertex {
            position,
            ndof,
            chi2: 0.0,
            score: 0.0,
            is_fake: false,
        }
    }

    pub fn rho(&self) -> f64 {
        self.position.x.hypot(self.position.y)
    }

    /// Good primary vertex: real fit, `ndof ≥ 4`, `|z| ≤ 24`, `ρ ≤ 2`.
    pub fn is_good(&self) -> bool {
        !self.is_fake
            && self.ndof >= Self::MIN_NDOF
            && self.position.z.abs() <= Self::MAX_ABS_Z
            && self.rho() <= Self::MAX_RHO
    }
}

/// Particle-flow candidate in one of its two input formats.
///
/// Packed candidates carry their PUPPI weight and vertex association; reco candidates get the
/// weight from a separate optional product indexed like the candidates.
#[derive(Debug, Clone, PartialEq)]
pub enum PfCandidate {
    Packed {
        p4: P4,
        pdg_id: PdgId,
        puppi_w: f32,
        vertex: Option<usize>,
    },
    Reco {
        p4: P4,
        pdg_id: PdgId,
        vertex: Option<usize>,
    },
}

impl PfCandidate {
    pub fn p4(&self) -> &P4 {
        match self {
            PfCandidate::Packed { p4, .. } | PfCandidate::Reco { p4, .. } => p4,
        }
    }

    pub fn pdg_id(&self) -> PdgId {
        match self {
            PfCandidate::Packed { pdg_id, .. } | PfCandidate::Reco { pdg_id, .. } => *pdg_id,
        }
    }

    pub fn vertex(&self) -> Option<usize> {
        match self {
            PfCandidate::Packed { vertex, .. } | PfCandidate::Reco { vertex, .. } => *vertex,
        }
    }

    /// Embedded PUPPI weight, only known for packed candidates.
    pub fn embedded_puppi_weight(&self) -> Option<f32> {
        match self {
            PfCandidate::Packed { puppi_w, .. } => Some(*puppi_w),
            PfCandidate::Reco { .. } => None,
        }
    }
}

/// Reconstructed muon.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoMuon {
    pub p4: P4,
    pub charge: i8,
    pub is_global: bool,
    pub is_tracker: bool,
    /// Position of the best vertex in the vertex collection.
    pub vertex: Option<usize>,
    /// Position of the matched particle in the pruned generator collection.
    pub gen_match: Option<usize>,
}

impl RecoMuon {
    pub fn new(p4: P4, charge: i8) -> Self {
        RecoMuon {
            p4,
            charge,
            is_global: true,
            is_tracker: true,
            vertex: None,
            gen_match: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_good_vertex_cuts() {
        assert!(RecoVertex::new(Vector3::new(0.1, 0.1, 3.0), 10.0).is_good());
        assert!(!RecoVertex::new(Vector3::new(0.1, 0.1, 3.0), 3.5).is_good());
        assert!(!RecoVertex::new(Vector3::new(0.0, 0.0, 24.5), 10.0).is_good());
        assert!(!RecoVertex::new(Vector3::new(1.5, 1.5, 0.0), 10.0).is_good());
    }
}
