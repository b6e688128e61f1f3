//! # Built-in fillers
//!
//! | class                | map name       | map kind                        | reads                     |
//! |----------------------|----------------|---------------------------------|---------------------------|
//! | `VerticesFiller`     | `vertices`     | `RecoVertex → Vertex`           | `vertices`                |
//! | `PFCandsFiller`      | `pfCandidates` | `PfCandidate → PfCand`          | `candidates`, `vertices`, `puppi`¹ |
//! | `GenParticlesFiller` | `genParticles` | `DecayNode → GenParticle`       | `genParticles`, `packedGenParticles`¹ |
//! | `MuonsFiller`        | `muons`        | `RecoMuon → Muon`               | `muons`, `vertices`¹, `genParticles`¹ |
//!
//! ¹ optional label.
//!
//! The "reads" column lists configuration parameters holding input labels. Map names are the
//! filler names of the usual configuration; cross references are looked up under the names in
//! [`crate::constants`].
pub mod gen_particles;
pub mod muons;
pub mod pf_cands;
pub mod vertices;
