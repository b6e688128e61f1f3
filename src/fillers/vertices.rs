use crate::constants::VERTICES;
use crate::event::objects::Vertex;
use crate::event::OutputEventRecord;
use crate::filler::{Filler, FillerConfig, JobContext};
use crate::input::records::RecoVertex;
use crate::input::{InputEvent, ProductToken};
use crate::ntuplizer_errors::NtuplizerError;
use crate::object_map::store::MapScope;

/// Copies the primary vertices and counts the good ones into the `npv` scalar.
#[derive(Debug)]
pub struct VerticesFiller {
    name: String,
    enabled: bool,
    vertices: ProductToken<RecoVertex>,
}

impl VerticesFiller {
    pub fn new(config: &FillerConfig, ctx: &mut JobContext<'_>) -> Result<Self, NtuplizerError> {
        let vertices = ctx.require::<RecoVertex>(config, "vertices")?;
        ctx.publish::<RecoVertex, Vertex>(config)?;

        Ok(VerticesFiller {
            name: config.name.clone(),
            enabled: config.enabled,
            vertices,
        })
    }
}

impl Filler for VerticesFiller {
    fn name(&self) -> &str {
        &self.name
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn branch_names(&self) -> Vec<String> {
        vec![VERTICES.to_string(), "npv".to_string()]
    }

    fn reads(&self) -> Vec<String> {
        vec![self.vertices.label().to_string()]
    }

    fn fill(
        &mut self,
        out: &mut OutputEventRecord,
        input: &InputEvent,
        maps: &mut MapScope<'_>,
    ) -> Result<(), NtuplizerError> {
        let vertices = input.require(&self.vertices)?;
        let map = maps.own::<RecoVertex, Vertex>()?;
        let collection = out.collection_mut::<Vertex>(VERTICES)?;

        let mut npv = 0_usize;
        for (key, vertex) in vertices.keyed() {
            if vertex.is_good() {
                npv += 1;
            }
            let handle = collection.push(Vertex {
                position: vertex.position,
                ndof: vertex.ndof,
                score: vertex.score,
                pf_range_max: 0,
            });
            map.add(key, handle);
        }

        out.set_scalar("npv", npv as f64);
        Ok(())
    }
}
