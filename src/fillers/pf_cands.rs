//! Particle-flow candidates.
//!
//! Candidates are written grouped by associated vertex (in vertex collection order, unassociated
//! candidates last) and by decreasing pt inside each group. Reference linking then stores, for
//! every output vertex, one past the position of its last candidate in `pf_range_max`, so that
//! the candidates of vertex `i` occupy `[pf_range_max(i-1), pf_range_max(i))`.
use std::cmp::Ordering;

use crate::constants::{PF_CANDIDATES, VERTICES};
use crate::event::objects::{PfCand, Vertex};
use crate::event::OutputEventRecord;
use crate::filler::{Filler, FillerConfig, JobContext};
use crate::input::records::{PfCandidate, RecoVertex};
use crate::input::{InputEvent, ProductToken};
use crate::ntuplizer_errors::NtuplizerError;
use crate::object_map::store::{MapScope, ObjectMapStore};

#[derive(Debug)]
pub struct PfCandsFiller {
    name: String,
    enabled: bool,
    candidates: ProductToken<PfCandidate>,
    vertices: ProductToken<RecoVertex>,
    puppi: Option<ProductToken<f32>>,
    /// Size of the vertex collection of the current event.
    n_vertices: usize,
}

/// Vertex position first (unassociated last), then decreasing pt.
fn by_vertex_and_pt(a: &PfCand, b: &PfCand) -> Ordering {
    let va = a.vertex_index.unwrap_or(usize::MAX);
    let vb = b.vertex_index.unwrap_or(usize::MAX);
    va.cmp(&vb).then_with(|| b.pt().total_cmp(&a.pt()))
}

impl PfCandsFiller {
    pub fn new(config: &FillerConfig, ctx: &mut JobContext<'_>) -> Result<Self, NtuplizerError> {
        let candidates = ctx.require::<PfCandidate>(config, "candidates")?;
        let vertices = ctx.require::<RecoVertex>(config, "vertices")?;
        let puppi = ctx.consumes::<f32>(config, "puppi", false)?;
        ctx.publish::<PfCandidate, PfCand>(config)?;

        Ok(PfCandsFiller {
            name: config.name.clone(),
            enabled: config.enabled,
            candidates,
            vertices,
            puppi,
            n_vertices: 0,
        })
    }
}

impl Filler for PfCandsFiller {
    fn name(&self) -> &str {
        &self.name
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn branch_names(&self) -> Vec<String> {
        vec![PF_CANDIDATES.to_string()]
    }

    fn reads(&self) -> Vec<String> {
        let mut labels = vec![
            self.candidates.label().to_string(),
            self.vertices.label().to_string(),
        ];
        labels.extend(self.puppi.iter().map(|t| t.label().to_string()));
        labels
    }

    fn fill(
        &mut self,
        out: &mut OutputEventRecord,
        input: &InputEvent,
        maps: &mut MapScope<'_>,
    ) -> Result<(), NtuplizerError> {
        let candidates = input.require(&self.candidates)?;
        self.n_vertices = input.require(&self.vertices)?.len();

        let weights = match &self.puppi {
            Some(token) => input.product(token)?,
            None => None,
        };
        if let Some(weights) = weights.filter(|w| w.len() != candidates.len()) {
            return Err(NtuplizerError::MalformedInput(format!(
                "{} PUPPI weights for {} PF candidates",
                weights.len(),
                candidates.len()
            )));
        }

        let collection = out.collection_mut::<PfCand>(PF_CANDIDATES)?;
        for (i, candidate) in candidates.iter().enumerate() {
            let puppi_w = weights
                .and_then(|w| w.get(i).copied())
                .or_else(|| candidate.embedded_puppi_weight())
                .unwrap_or(1.0);

            collection.push(PfCand {
                p4: *candidate.p4(),
                ptype: PfCand::ptype_of(candidate.pdg_id()),
                puppi_w,
                vertex_index: candidate.vertex(),
                vertex: None,
            });
        }

        let original = collection.sort_by(by_vertex_and_pt);

        let map = maps.own::<PfCandidate, PfCand>()?;
        for (position, old) in original.into_iter().enumerate() {
            if let Some(handle) = collection.handle_at(position) {
                map.add(candidates.key(old), handle);
            }
        }
        Ok(())
    }

    fn set_refs(
        &mut self,
        out: &mut OutputEventRecord,
        maps: &ObjectMapStore,
    ) -> Result<(), NtuplizerError> {
        let Some(vertex_map) = maps.get::<RecoVertex, Vertex>(VERTICES)? else {
            return Ok(());
        };

        let ranges: Vec<_> = {
            let Some(candidates) = out.collection::<PfCand>(PF_CANDIDATES)? else {
                return Ok(());
            };
            let sorted = candidates.as_slice();
            (0..self.n_vertices)
                .filter_map(|v| {
                    let handle = vertex_map.find(&self.vertices.key(v))?;
                    let end = sorted.partition_point(|c| c.vertex_index.is_some_and(|w| w <= v));
                    Some((handle, end as u32))
                })
                .collect()
        };

        let output_vertices = out.collection_mut::<Vertex>(VERTICES)?;
        for (handle, end) in ranges {
            if let Some(vertex) = output_vertices.get_mut(handle) {
                vertex.pf_range_max = end;
            }
        }

        let candidates = out.collection_mut::<PfCand>(PF_CANDIDATES)?;
        for candidate in candidates.iter_mut() {
            candidate.vertex = candidate
                .vertex_index
                .and_then(|v| vertex_map.find(&self.vertices.key(v)));
        }
        Ok(())
    }
}
