#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use nalgebra::Vector3;

use ntuplizer::event::{EventId, OutputEventRecord};
use ntuplizer::filler::registry::FillerRegistry;
use ntuplizer::filler::{Filler, FillerConfig};
use ntuplizer::gen::kinematics::P4;
use ntuplizer::gen::particle::{link_pruned, PackedGenParticle, PrunedGenParticle, StatusFlags};
use ntuplizer::input::records::{PfCandidate, RecoMuon, RecoVertex};
use ntuplizer::input::InputEvent;
use ntuplizer::ntuplizer_errors::NtuplizerError;
use ntuplizer::object_map::store::{MapScope, ObjectMapStore};
use ntuplizer::pipeline::producer::ProducerConfig;

pub const VERTICES_LABEL: &str = "offlineSlimmedPrimaryVertices";
pub const PF_LABEL: &str = "packedPFCandidates";
pub const PRUNED_LABEL: &str = "prunedGenParticles";
pub const PACKED_LABEL: &str = "packedGenParticles";
pub const MUONS_LABEL: &str = "slimmedMuons";

pub fn vertices_config() -> FillerConfig {
    FillerConfig::new("vertices", "VerticesFiller").with_param("vertices", VERTICES_LABEL)
}

pub fn pf_config() -> FillerConfig {
    FillerConfig::new("pfCandidates", "PFCandsFiller")
        .with_param("candidates", PF_LABEL)
        .with_param("vertices", VERTICES_LABEL)
}

pub fn gen_config() -> FillerConfig {
    FillerConfig::new("genParticles", "GenParticlesFiller")
        .with_param("genParticles", PRUNED_LABEL)
        .with_param("packedGenParticles", PACKED_LABEL)
        .with_param("promptPhotonsOnly", false)
}

pub fn muons_config() -> FillerConfig {
    FillerConfig::new("muons", "MuonsFiller")
        .with_param("muons", MUONS_LABEL)
        .with_param("vertices", VERTICES_LABEL)
        .with_param("genParticles", PRUNED_LABEL)
        .with_param("minPt", 5.0)
}

/// The four built-in fillers, in dependency-free declaration order.
pub fn full_config() -> ProducerConfig {
    ProducerConfig::new()
        .with_filler(vertices_config())
        .with_filler(pf_config())
        .with_filler(gen_config())
        .with_filler(muons_config())
}

/// Z → μ⁻ μ⁺ in the pruned collection; both muons repeated in the packed collection, plus an
/// orphan photon and an unrelated pion.
///
/// Merged layout (pre-order): Z, μ⁻, μ⁺, synthetic π⁰, γ, π⁺.
pub fn dimuon_gen() -> (Vec<PrunedGenParticle>, Vec<PackedGenParticle>) {
    let final_state = StatusFlags::IS_PROMPT | StatusFlags::IS_LAST_COPY;

    let mut pruned = vec![
        PrunedGenParticle::new(23, 62, P4::new(12.0, 0.1, 0.3, 91.2))
            .with_flags(StatusFlags::IS_HARD_PROCESS | StatusFlags::IS_LAST_COPY),
        PrunedGenParticle::new(13, 1, P4::new(41.0, 0.5, 1.0, 0.105))
            .with_charge(-1)
            .with_flags(final_state),
        PrunedGenParticle::new(-13, 1, P4::new(38.0, -0.7, -2.0, 0.105))
            .with_charge(1)
            .with_flags(final_state),
    ];
    link_pruned(&mut pruned, 0, 1);
    link_pruned(&mut pruned, 0, 2);

    let packed = vec![
        PackedGenParticle::new(13, P4::new(41.0, 0.5, 1.0, 0.105))
            .with_charge(-1)
            .with_flags(final_state)
            .with_mother(0),
        PackedGenParticle::new(-13, P4::new(38.0, -0.7, -2.0, 0.105))
            .with_charge(1)
            .with_flags(final_state)
            .with_mother(0),
        PackedGenParticle::new(22, P4::massless(2.0, 1.8, 0.4)).with_flags(
            StatusFlags::IS_DIRECT_HADRON_DECAY_PRODUCT | StatusFlags::IS_LAST_COPY,
        ),
        PackedGenParticle::new(211, P4::massless(4.0, -1.2, 2.2))
            .with_charge(1)
            .with_flags(StatusFlags::IS_LAST_COPY),
    ];

    (pruned, packed)
}

pub fn sample_vertices() -> Vec<RecoVertex> {
    vec![
        RecoVertex::new(Vector3::new(0.01, -0.02, 1.0), 20.0),
        RecoVertex::new(Vector3::new(0.02, 0.01, -3.0), 2.0),
    ]
}

/// Sorted layout: [10 (v0), 3 (v0), 5 (v1), 8 (none)].
pub fn sample_pf_candidates() -> Vec<PfCandidate> {
    vec![
        PfCandidate::Packed {
            p4: P4::massless(5.0, 0.1, 0.1),
            pdg_id: 211,
            puppi_w: 0.5,
            vertex: Some(1),
        },
        PfCandidate::Packed {
            p4: P4::massless(10.0, -0.3, 2.0),
            pdg_id: -211,
            puppi_w: 1.0,
            vertex: Some(0),
        },
        PfCandidate::Packed {
            p4: P4::massless(3.0, 1.4, -1.0),
            pdg_id: 22,
            puppi_w: 1.0,
            vertex: Some(0),
        },
        PfCandidate::Reco {
            p4: P4::massless(8.0, 2.0, 0.5),
            pdg_id: 130,
            vertex: None,
        },
    ]
}

/// Sorted layout after the 5 GeV cut: [μ⁻ 41 GeV, μ⁺ 38 GeV].
pub fn sample_muons() -> Vec<RecoMuon> {
    let mut plus = RecoMuon::new(P4::new(38.0, -0.7, -2.0, 0.105), 1);
    plus.vertex = Some(0);
    plus.gen_match = Some(2);

    let mut minus = RecoMuon::new(P4::new(41.0, 0.5, 1.0, 0.105), -1);
    minus.vertex = Some(1);
    minus.gen_match = Some(1);

    let soft = RecoMuon::new(P4::new(3.0, 2.6, 0.0, 0.105), 1);

    vec![plus, minus, soft]
}

pub fn sample_event(event: u64) -> InputEvent {
    let (pruned, packed) = dimuon_gen();
    InputEvent::new(EventId::new(1, 1, event))
        .with(VERTICES_LABEL, sample_vertices())
        .with(PF_LABEL, sample_pf_candidates())
        .with(PRUNED_LABEL, pruned)
        .with(PACKED_LABEL, packed)
        .with(MUONS_LABEL, sample_muons())
}

// -------------------------------------------------------------------------------------------------
// Probe filler: records the order of the calls it receives
// -------------------------------------------------------------------------------------------------

pub type Journal = Arc<Mutex<Vec<String>>>;

pub struct ProbeInput;
pub struct ProbeOutput;

/// Filler writing `fill:<name>` / `setRefs:<name>` to a shared journal.
///
/// Parameters: `failOnEvent` (event number), `failIn` (`"fill"` or `"setRefs"`), `failWith`
/// (`"missing"` or `"invariant"`), `peek` (name of a map to open during `fill`).
pub struct ProbeFiller {
    name: String,
    enabled: bool,
    journal: Journal,
    fail_on_event: Option<u64>,
    fail_in: String,
    fail_with: String,
    peek: Option<String>,
}

impl ProbeFiller {
    fn failure(&self, event: u64, phase: &str) -> Result<(), NtuplizerError> {
        if self.fail_on_event != Some(event) || self.fail_in != phase {
            return Ok(());
        }
        Err(match self.fail_with.as_str() {
            "missing" => NtuplizerError::MissingProduct(format!("{}Input", self.name)),
            _ => NtuplizerError::InvariantViolation(format!("{} gave up", self.name)),
        })
    }

    fn log(&self, entry: String) {
        self.journal.lock().unwrap().push(entry);
    }
}

impl Filler for ProbeFiller {
    fn name(&self) -> &str {
        &self.name
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn branch_names(&self) -> Vec<String> {
        vec![format!("{}Branch", self.name)]
    }

    fn fill(
        &mut self,
        _out: &mut OutputEventRecord,
        input: &InputEvent,
        maps: &mut MapScope<'_>,
    ) -> Result<(), NtuplizerError> {
        self.log(format!("fill:{}", self.name));
        maps.own::<ProbeInput, ProbeOutput>()?;
        if let Some(other) = &self.peek {
            maps.get_mut::<ProbeInput, ProbeOutput>(other)?;
        }
        self.failure(input.id.event, "fill")
    }

    fn set_refs(
        &mut self,
        out: &mut OutputEventRecord,
        _maps: &ObjectMapStore,
    ) -> Result<(), NtuplizerError> {
        self.log(format!("setRefs:{}", self.name));
        self.failure(out.id.event, "setRefs")
    }
}

pub fn probe_config(name: &str) -> FillerConfig {
    FillerConfig::new(name, "Probe")
}

/// Built-in fillers plus the `Probe` class writing to `journal`.
pub fn registry_with_probe(journal: &Journal) -> FillerRegistry {
    let mut registry = FillerRegistry::with_builtin_fillers();
    let journal = journal.clone();
    registry.register("Probe", move |config, ctx| {
        ctx.publish::<ProbeInput, ProbeOutput>(config)?;
        let fail_on_event = match config.float_or("failOnEvent", -1.0)? {
            e if e >= 0.0 => Some(e as u64),
            _ => None,
        };
        Ok(Box::new(ProbeFiller {
            name: config.name.clone(),
            enabled: config.enabled,
            journal: journal.clone(),
            fail_on_event,
            fail_in: config.text("failIn")?.unwrap_or("fill").to_string(),
            fail_with: config.text("failWith")?.unwrap_or("missing").to_string(),
            peek: config.text("peek")?.map(str::to_string),
        }) as Box<dyn Filler>)
    });
    registry
}

pub fn journal_entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}
