use crate::constants::{GEN_PARTICLES, MUONS, VERTICES};
use crate::event::objects::{GenParticle, Muon, Vertex};
use crate::event::OutputEventRecord;
use crate::filler::{Filler, FillerConfig, JobContext};
use crate::gen::forest::DecayNode;
use crate::gen::particle::PrunedGenParticle;
use crate::input::records::{RecoMuon, RecoVertex};
use crate::input::{InputEvent, ProductToken};
use crate::ntuplizer_errors::NtuplizerError;
use crate::object_map::store::{MapScope, ObjectMapStore};
use crate::object_map::IdentityKey;

/// Input identities a muon refers to, kept from `fill` to `set_refs`.
#[derive(Debug, Clone, Copy, Default)]
struct PendingLinks {
    vertex: Option<IdentityKey>,
    gen: Option<IdentityKey>,
}

/// Muons sorted by decreasing pt, linked to their vertex and to their generator match.
///
/// A reference whose target was not written (filler disabled, object not selected) stays empty.
#[derive(Debug)]
pub struct MuonsFiller {
    name: String,
    enabled: bool,
    muons: ProductToken<RecoMuon>,
    vertices: Option<ProductToken<RecoVertex>>,
    gen_particles: Option<ProductToken<PrunedGenParticle>>,
    min_pt: f64,
    max_eta: f64,
    /// Indexed by output position.
    pending: Vec<PendingLinks>,
}

impl MuonsFiller {
    pub fn new(config: &FillerConfig, ctx: &mut JobContext<'_>) -> Result<Self, NtuplizerError> {
        let muons = ctx.require::<RecoMuon>(config, "muons")?;
        let vertices = ctx.consumes::<RecoVertex>(config, "vertices", false)?;
        let gen_particles = if ctx.is_real_data {
            None
        } else {
            ctx.consumes::<PrunedGenParticle>(config, "genParticles", false)?
        };
        ctx.publish::<RecoMuon, Muon>(config)?;

        Ok(MuonsFiller {
            name: config.name.clone(),
            enabled: config.enabled,
            muons,
            vertices,
            gen_particles,
            min_pt: config.float_or("minPt", -1.0)?,
            max_eta: config.float_or("maxEta", 10.0)?,
            pending: Vec::new(),
        })
    }
}

impl Filler for MuonsFiller {
    fn name(&self) -> &str {
        &self.name
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn branch_names(&self) -> Vec<String> {
        vec![MUONS.to_string()]
    }

    fn reads(&self) -> Vec<String> {
        std::iter::once(self.muons.label())
            .chain(self.vertices.as_ref().map(|t| t.label()))
            .chain(self.gen_particles.as_ref().map(|t| t.label()))
            .map(str::to_string)
            .collect()
    }

    fn fill(
        &mut self,
        out: &mut OutputEventRecord,
        input: &InputEvent,
        maps: &mut MapScope<'_>,
    ) -> Result<(), NtuplizerError> {
        self.pending.clear();
        let muons = input.require(&self.muons)?;

        let collection = out.collection_mut::<Muon>(MUONS)?;
        let mut links = Vec::new();
        let mut sources = Vec::new();

        for (i, muon) in muons.iter().enumerate() {
            if muon.p4.pt < self.min_pt || muon.p4.eta.abs() > self.max_eta {
                continue;
            }

            collection.push(Muon {
                p4: muon.p4,
                charge: muon.charge,
                global: muon.is_global,
                tracker: muon.is_tracker,
                vertex: None,
                matched_gen: None,
            });
            sources.push(i);
            links.push(PendingLinks {
                vertex: self
                    .vertices
                    .as_ref()
                    .zip(muon.vertex)
                    .map(|(t, v)| t.key(v)),
                gen: self
                    .gen_particles
                    .as_ref()
                    .zip(muon.gen_match)
                    .map(|(t, g)| t.key(g)),
            });
        }

        let original = collection.sort_by(|a, b| b.p4.pt.total_cmp(&a.p4.pt));

        let map = maps.own::<RecoMuon, Muon>()?;
        for (position, old) in original.into_iter().enumerate() {
            if let Some(handle) = collection.handle_at(position) {
                map.add(muons.key(sources[old]), handle);
            }
            self.pending.push(links[old]);
        }
        Ok(())
    }

    fn set_refs(
        &mut self,
        out: &mut OutputEventRecord,
        maps: &ObjectMapStore,
    ) -> Result<(), NtuplizerError> {
        let vertex_map = maps.get::<RecoVertex, Vertex>(VERTICES)?;
        let gen_map = maps.get::<DecayNode, GenParticle>(GEN_PARTICLES)?;

        let collection = out.collection_mut::<Muon>(MUONS)?;
        for (muon, links) in collection.iter_mut().zip(&self.pending) {
            muon.vertex = vertex_map.zip(links.vertex).and_then(|(m, k)| m.find(&k));
            muon.matched_gen = gen_map.zip(links.gen).and_then(|(m, k)| m.find(&k));
        }
        Ok(())
    }
}
