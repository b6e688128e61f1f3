use bitflags::bitflags;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::constants::{PdgId, STATUS_FINAL_STATE};
use crate::gen::kinematics::P4;

bitflags! {
    /// Generator history flags attached to each particle.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct StatusFlags: u16 {
        const IS_PROMPT = 1 << 0;
        const IS_DECAYED_LEPTON_HADRON = 1 << 1;
        const IS_TAU_DECAY_PRODUCT = 1 << 2;
        const IS_PROMPT_TAU_DECAY_PRODUCT = 1 << 3;
        const IS_DIRECT_TAU_DECAY_PRODUCT = 1 << 4;
        const IS_DIRECT_PROMPT_TAU_DECAY_PRODUCT = 1 << 5;
        const IS_DIRECT_HADRON_DECAY_PRODUCT = 1 << 6;
        const IS_HARD_PROCESS = 1 << 7;
        const FROM_HARD_PROCESS = 1 << 8;
        const IS_HARD_PROCESS_TAU_DECAY_PRODUCT = 1 << 9;
        const IS_DIRECT_HARD_PROCESS_TAU_DECAY_PRODUCT = 1 << 10;
        const FROM_HARD_PROCESS_BEFORE_FSR = 1 << 11;
        const IS_FIRST_COPY = 1 << 12;
        const IS_LAST_COPY = 1 << 13;
        const IS_LAST_COPY_BEFORE_FSR = 1 << 14;
    }
}

/// Particle of the pruned generator collection.
///
/// Mother and daughter links are positions in the same pruned collection and may be
/// multi-valued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrunedGenParticle {
    pub pdg_id: PdgId,
    pub status: i32,
    pub charge: i8,
    pub p4: P4,
    pub vertex: Vector3<f64>,
    pub flags: StatusFlags,
    pub mothers: SmallVec<[usize; 2]>,
    pub daughters: SmallVec<[usize; 4]>,
}

impl PrunedGenParticle {
    pub fn new(pdg_id: PdgId, status: i32, p4: P4) -> Self {
        PrunedGenParticle {
            pdg_id,
            status,
            charge: 0,
            p4,
            vertex: Vector3::zeros(),
            flags: StatusFlags::empty(),
            mothers: SmallVec::new(),
            daughters: SmallVec::new(),
        }
    }

    pub fn with_flags(mut self, flags: StatusFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_vertex(mut self, vertex: Vector3<f64>) -> Self {
        self.vertex = vertex;
        self
    }

    pub fn with_charge(mut self, charge: i8) -> Self {
        self.charge = charge;
        self
    }

    pub fn is_final_state(&self) -> bool {
        self.status == STATUS_FINAL_STATE
    }
}

/// Particle of the packed (final-state only) generator collection.
///
/// Packed particles carry at most one mother, given as a position in the **pruned** collection,
/// and no vertex position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackedGenParticle {
    pub pdg_id: PdgId,
    pub charge: i8,
    pub p4: P4,
    pub flags: StatusFlags,
    pub mother: Option<usize>,
}

impl PackedGenParticle {
    pub fn new(pdg_id: PdgId, p4: P4) -> Self {
        PackedGenParticle {
            pdg_id,
            charge: 0,
            p4,
            flags: StatusFlags::empty(),
            mother: None,
        }
    }

    pub fn with_flags(mut self, flags: StatusFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_mother(mut self, mother: usize) -> Self {
        self.mother = Some(mother);
        self
    }

    pub fn with_charge(mut self, charge: i8) -> Self {
        self.charge = charge;
        self
    }
}

/// Link `mother → daughter` in both directions of a pruned collection under construction.
///
/// Test fixtures and readers building pruned collections by hand use this to keep mother and
/// daughter lists consistent.
///
/// Panics
/// ----------
/// * If `mother` or `daughter` is out of range.
pub fn link_pruned(particles: &mut [PrunedGenParticle], mother: usize, daughter: usize) {
    particles[mother].daughters.push(daughter);
    particles[daughter].mothers.push(mother);
}
