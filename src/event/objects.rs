//! Flat output objects written by the built-in fillers.
//!
//! Cross references between objects are [`OutputHandle`]s into other collections of the same
//! [`OutputEventRecord`](crate::event::OutputEventRecord). They are left empty during value
//! extraction and attached during reference linking.
use nalgebra::Vector3;

use crate::constants::{GeV, PdgId};
use crate::event::collection::OutputHandle;
use crate::gen::kinematics::P4;
use crate::gen::particle::StatusFlags;

/// Generator particle of the merged decay forest.
#[derive(Debug, Clone, PartialEq)]
pub struct GenParticle {
    pub p4: P4,
    pub pdgid: PdgId,
    pub status: i32,
    pub status_flags: StatusFlags,
    pub vertex: Vector3<f64>,
    /// Nearest emitted ancestor. Always precedes this particle in the collection.
    pub parent: Option<OutputHandle<GenParticle>>,
    /// Set when the particle is a synthetic parent inserted for an orphan photon.
    pub synthetic: bool,
}

/// Reconstructed primary vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub position: Vector3<f64>,
    pub ndof: f64,
    pub score: f64,
    /// One past the last PF candidate associated to this vertex.
    pub pf_range_max: u32,
}

/// Particle-flow candidate type, in the order of [`PfCand::PDG_IDS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PType {
    HadronPlus,
    HadronMinus,
    ElectronPlus,
    ElectronMinus,
    MuonPlus,
    MuonMinus,
    Gamma,
    Hadron0,
    HfHadron,
    HfEm,
    /// Anything that does not match a known PDG code.
    X,
}

/// Particle-flow candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct PfCand {
    pub p4: P4,
    pub ptype: PType,
    pub puppi_w: f32,
    /// Position of the associated vertex in the input vertex collection.
    pub vertex_index: Option<usize>,
    pub vertex: Option<OutputHandle<Vertex>>,
}

impl PfCand {
    /// PDG codes recognized as PF candidate types, in [`PType`] order.
    pub const PDG_IDS: [(PdgId, PType); 10] = [
        (211, PType::HadronPlus),
        (-211, PType::HadronMinus),
        (-11, PType::ElectronPlus),
        (11, PType::ElectronMinus),
        (-13, PType::MuonPlus),
        (13, PType::MuonMinus),
        (22, PType::Gamma),
        (130, PType::Hadron0),
        (1, PType::HfHadron),
        (2, PType::HfEm),
    ];

    pub fn ptype_of(pdg_id: PdgId) -> PType {
        Self::PDG_IDS
            .iter()
            .find(|(id, _)| *id == pdg_id)
            .map(|(_, t)| *t)
            .unwrap_or(PType::X)
    }

    pub fn pt(&self) -> GeV {
        self.p4.pt
    }
}

/// Reconstructed muon.
#[derive(Debug, Clone, PartialEq)]
pub struct Muon {
    pub p4: P4,
    pub charge: i8,
    pub global: bool,
    pub tracker: bool,
    pub vertex: Option<OutputHandle<Vertex>>,
    pub matched_gen: Option<OutputHandle<GenParticle>>,
}
