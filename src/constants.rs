//! # Constants and type definitions for the ntuplizer
//!
//! This module centralizes the **particle identifiers**, **generator status codes** and
//! **default matching tolerances** used by the decay-graph builder and the fillers, together
//! with the small type aliases shared across the crate.
//!
//! ## Overview
//!
//! - PDG Monte Carlo numbering for the few species the core needs to recognize
//! - Generator status convention (status 1 = stable final state, status 2 = decayed)
//! - Default tolerances for pruned/packed duplicate detection
//! - Map and collection names of the built-in fillers

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Energy, momentum or mass in GeV
pub type GeV = f64;
/// Angle in radians
pub type Radian = f64;
/// Signed PDG Monte Carlo particle code
pub type PdgId = i32;

// -------------------------------------------------------------------------------------------------
// Particle identifiers (PDG Monte Carlo numbering)
// -------------------------------------------------------------------------------------------------

/// Photon
pub const PDG_PHOTON: PdgId = 22;
/// Neutral pion, used as the species of synthetic parents of orphan photons
pub const PDG_PI0: PdgId = 111;
/// Electron
pub const PDG_ELECTRON: PdgId = 11;
/// Muon
pub const PDG_MUON: PdgId = 13;
/// Tau lepton
pub const PDG_TAU: PdgId = 15;

// -------------------------------------------------------------------------------------------------
// Generator status codes
// -------------------------------------------------------------------------------------------------

/// Stable final-state particle
pub const STATUS_FINAL_STATE: i32 = 1;
/// Intermediate particle that decayed in the generator
pub const STATUS_DECAYED: i32 = 2;

// -------------------------------------------------------------------------------------------------
// Default duplicate-detection tolerances
// -------------------------------------------------------------------------------------------------

/// Maximal fractional transverse-momentum difference between a pruned and a packed copy
pub const DEFAULT_PT_REL_TOLERANCE: f64 = 1.0e-3;

/// Maximal squared angular separation ΔR² between a pruned and a packed copy
pub const DEFAULT_DELTA_R2_TOLERANCE: f64 = 1.0e-5;

/// Rapidity acceptance of the tracker; unmatched status-1 particles inside it are anomalies
pub const DEFAULT_TRACKING_RAPIDITY: f64 = 6.0;

// -------------------------------------------------------------------------------------------------
// Names used by the built-in fillers
// -------------------------------------------------------------------------------------------------
//
// A built-in filler publishes its object map under its own name and writes its output
// collection under a fixed name. With the default configuration both coincide, which is what
// reference linking relies on to find the maps of the other fillers.

/// Vertex map and output collection
pub const VERTICES: &str = "vertices";
/// Generator-particle map and output collection
pub const GEN_PARTICLES: &str = "genParticles";
/// PF-candidate map and output collection
pub const PF_CANDIDATES: &str = "pfCandidates";
/// Muon map and output collection
pub const MUONS: &str = "muons";
