//! # Generator particles
//!
//! Runs the decay-graph builder once per event and writes the selected particles of the merged
//! forest in pre-order, so that every particle follows its parent.
//!
//! Parameters
//! -----------------
//! * `genParticles` – label of the pruned collection (mandatory).
//! * `packedGenParticles` – label of the packed collection. Without it the forest is built from
//!   the pruned collection alone.
//! * `minPt` – minimal transverse momentum (default `-1`, no cut).
//! * `pdgIds` – absolute PDG codes to keep: single codes (`"11"`), inclusive ranges (`"1-6"`),
//!   and open ranges (`"-5"` for all codes up to 5, `"1000000-"` for all codes from 1000000).
//!   Empty keeps every species.
//! * `promptPhotonsOnly` – drop photons that are not prompt final-state (default `true`).
//! * `firstLastCopyOnly` – keep only first or last copies of a particle (default `true`).
//! * `ptRelTolerance`, `deltaR2Tolerance`, `trackingRapidity`, `duplicatePolicy`
//!   (`"first"` or `"closest"`) – see [`MergeParams`].
//!
//! A particle that is not selected is skipped, and its selected descendants take its nearest
//! selected ancestor as parent.
use std::collections::BTreeSet;

use crate::constants::{PdgId, GEN_PARTICLES, PDG_PHOTON, STATUS_FINAL_STATE};
use crate::event::collection::OutputHandle;
use crate::event::objects::GenParticle;
use crate::event::{OutputEventRecord, RunRecord};
use crate::filler::{Filler, FillerConfig, JobContext};
use crate::gen::custody::build_pruned_forest;
use crate::gen::forest::{DecayForest, DecayNode, NodeOrigin};
use crate::gen::merge::{GenParticleMerger, MergeReport};
use crate::gen::particle::{PackedGenParticle, PrunedGenParticle, StatusFlags};
use crate::gen::{DuplicatePolicy, MergeParams};
use crate::input::{InputEvent, InputRun, ProductToken};
use crate::ntuplizer_errors::NtuplizerError;
use crate::object_map::store::MapScope;
use crate::object_map::{CollectionHandle, IdentityKey};

/// Species filter on absolute PDG codes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdgSelection {
    ids: BTreeSet<u32>,
    all_up_to: Option<u32>,
    all_from: Option<u32>,
}

impl PdgSelection {
    /// Parse entries of the form `"a"`, `"a-b"`, `"-b"` and `"a-"`.
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self, String> {
        let number = |s: &str| {
            s.trim()
                .parse::<u32>()
                .map_err(|e| format!("invalid PDG code '{s}': {e}"))
        };

        let mut selection = PdgSelection::default();
        for entry in entries.iter().map(AsRef::as_ref) {
            match entry.split_once('-') {
                None => {
                    selection.ids.insert(number(entry)?);
                }
                Some(("", high)) => selection.all_up_to = Some(number(high)?),
                Some((low, "")) => selection.all_from = Some(number(low)?),
                Some((low, high)) => selection.ids.extend(number(low)?..=number(high)?),
            }
        }
        Ok(selection)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.all_up_to.is_none() && self.all_from.is_none()
    }

    pub fn accepts(&self, pdg_id: PdgId) -> bool {
        if self.is_empty() {
            return true;
        }
        let abs_id = pdg_id.unsigned_abs();
        self.all_up_to.is_some_and(|b| abs_id <= b)
            || self.all_from.is_some_and(|a| abs_id >= a)
            || self.ids.contains(&abs_id)
    }
}

/// Particle selection applied to the flattened forest.
#[derive(Debug, Clone, PartialEq)]
pub struct GenSelection {
    pub min_pt: f64,
    pub pdg_ids: PdgSelection,
    pub prompt_photons_only: bool,
    pub first_last_copy_only: bool,
}

impl Default for GenSelection {
    fn default() -> Self {
        GenSelection {
            min_pt: -1.0,
            pdg_ids: PdgSelection::default(),
            prompt_photons_only: true,
            first_last_copy_only: true,
        }
    }
}

impl GenSelection {
    pub fn accepts(&self, node: &DecayNode) -> bool {
        if node.p4.pt < self.min_pt || !self.pdg_ids.accepts(node.pdg_id) {
            return false;
        }

        let prompt_final_state =
            node.status == STATUS_FINAL_STATE && node.flags.contains(StatusFlags::IS_PROMPT);
        if self.prompt_photons_only && node.pdg_id.abs() == PDG_PHOTON && !prompt_final_state {
            return false;
        }

        !self.first_last_copy_only
            || node
                .flags
                .intersects(StatusFlags::IS_FIRST_COPY | StatusFlags::IS_LAST_COPY)
    }
}

fn merge_params(config: &FillerConfig) -> Result<MergeParams, NtuplizerError> {
    let defaults = MergeParams::default();
    let policy = match config.text("duplicatePolicy")? {
        None | Some("first") => DuplicatePolicy::FirstMatch,
        Some("closest") => DuplicatePolicy::ClosestMatch,
        Some(other) => {
            return Err(NtuplizerError::config(
                &config.name,
                format!("unknown duplicatePolicy '{other}' (expected 'first' or 'closest')"),
            ))
        }
    };

    MergeParams::builder()
        .pt_rel_tolerance(config.float_or("ptRelTolerance", defaults.pt_rel_tolerance)?)
        .delta_r2_tolerance(config.float_or("deltaR2Tolerance", defaults.delta_r2_tolerance)?)
        .tracking_rapidity(config.float_or("trackingRapidity", defaults.tracking_rapidity)?)
        .duplicate_policy(policy)
        .build()
}

#[derive(Debug)]
pub struct GenParticlesFiller {
    name: String,
    enabled: bool,
    pruned: ProductToken<PrunedGenParticle>,
    packed: Option<ProductToken<PackedGenParticle>>,
    synthetic: CollectionHandle,
    merger: GenParticleMerger,
    selection: GenSelection,
}

impl GenParticlesFiller {
    pub fn new(config: &FillerConfig, ctx: &mut JobContext<'_>) -> Result<Self, NtuplizerError> {
        let pruned = ctx.require::<PrunedGenParticle>(config, "genParticles")?;
        let packed = ctx.consumes::<PackedGenParticle>(config, "packedGenParticles", false)?;
        let synthetic = ctx.products.derived(&format!("{}:synthetic", config.name));

        let pdg_ids = PdgSelection::parse(&config.text_list("pdgIds")?)
            .map_err(|e| NtuplizerError::config(&config.name, e))?;
        let selection = GenSelection {
            min_pt: config.float_or("minPt", -1.0)?,
            pdg_ids,
            prompt_photons_only: config.bool_or("promptPhotonsOnly", true)?,
            first_last_copy_only: config.bool_or("firstLastCopyOnly", true)?,
        };

        ctx.publish::<DecayNode, GenParticle>(config)?;

        Ok(GenParticlesFiller {
            name: config.name.clone(),
            enabled: config.enabled,
            pruned,
            packed,
            synthetic,
            merger: GenParticleMerger::new(merge_params(config)?),
            selection,
        })
    }

    fn build_forest(
        &self,
        pruned: &[PrunedGenParticle],
        packed: Option<&[PackedGenParticle]>,
    ) -> Result<(DecayForest, MergeReport), NtuplizerError> {
        match packed {
            Some(packed) => {
                let merged = self.merger.merge(pruned, packed)?;
                Ok((merged.forest, merged.report))
            }
            None => {
                let (forest, custody) = build_pruned_forest(pruned)?;
                let report = MergeReport {
                    pruned: pruned.len(),
                    custody_transfers: custody.transfers,
                    ..MergeReport::default()
                };
                Ok((forest, report))
            }
        }
    }

    fn key_of(&self, origin: NodeOrigin) -> Result<IdentityKey, NtuplizerError> {
        match origin {
            NodeOrigin::Pruned(i) => Ok(self.pruned.key(i)),
            NodeOrigin::Packed(j) => self.packed.as_ref().map(|t| t.key(j)).ok_or_else(|| {
                NtuplizerError::InvariantViolation(format!(
                    "packed node {j} without a packed collection"
                ))
            }),
            NodeOrigin::SyntheticFor(j) => Ok(IdentityKey::new(self.synthetic, j)),
        }
    }
}

impl Filler for GenParticlesFiller {
    fn name(&self) -> &str {
        &self.name
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn branch_names(&self) -> Vec<String> {
        vec![GEN_PARTICLES.to_string()]
    }

    fn reads(&self) -> Vec<String> {
        let mut labels = vec![self.pruned.label().to_string()];
        labels.extend(self.packed.iter().map(|t| t.label().to_string()));
        labels
    }

    fn fill(
        &mut self,
        out: &mut OutputEventRecord,
        input: &InputEvent,
        maps: &mut MapScope<'_>,
    ) -> Result<(), NtuplizerError> {
        let collection = out.collection_mut::<GenParticle>(GEN_PARTICLES)?;
        if input.is_real_data {
            return Ok(());
        }

        let pruned = input.require(&self.pruned)?;
        let packed = match &self.packed {
            Some(token) => input.product(token)?,
            None => None,
        };

        let (forest, report) = self.build_forest(pruned.items(), packed.map(|p| p.items()))?;
        let flat = forest.flatten()?;
        let map = maps.own::<DecayNode, GenParticle>()?;

        // nearest emitted ancestor-or-self of each output position
        let mut emitted: Vec<Option<OutputHandle<GenParticle>>> = Vec::with_capacity(flat.len());
        for (position, id) in flat.order.iter().enumerate() {
            let node = forest.node(*id);
            let inherited = flat.parents[position].and_then(|p| emitted[p]);

            if !self.selection.accepts(node) {
                emitted.push(inherited);
                continue;
            }

            let handle = collection.push(GenParticle {
                p4: node.p4,
                pdgid: node.pdg_id,
                status: node.status,
                status_flags: node.flags,
                vertex: node.vertex,
                parent: inherited,
                synthetic: node.is_synthetic(),
            });
            map.add(self.key_of(node.origin)?, handle);
            emitted.push(Some(handle));
        }

        tracing::debug!(
            filler = %self.name,
            forest = forest.len(),
            written = collection.len(),
            anomalies = report.anomalies.len(),
            "generator particles filled"
        );
        Ok(())
    }

    fn fill_run(&mut self, run: &mut RunRecord, _input: &InputRun) -> Result<(), NtuplizerError> {
        let params = self.merger.params();
        run.set(&format!("{}.ptRelTolerance", self.name), params.pt_rel_tolerance);
        run.set(&format!("{}.deltaR2Tolerance", self.name), params.delta_r2_tolerance);
        run.set(&format!("{}.trackingRapidity", self.name), params.tracking_rapidity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gen::kinematics::P4;

    #[test]
    fn test_pdg_selection_forms() {
        let selection = PdgSelection::parse(&["11", "1-3", "-0", "1000000-"]).unwrap();

        assert!(selection.accepts(-11));
        assert!(selection.accepts(2));
        assert!(!selection.accepts(4));
        assert!(selection.accepts(1000022));
        assert!(!selection.accepts(211));
    }

    #[test]
    fn test_pdg_selection_up_to() {
        let selection = PdgSelection::parse(&["-6"]).unwrap();
        assert!(selection.accepts(-5));
        assert!(!selection.accepts(11));
        assert!(PdgSelection::parse(&["x"]).is_err());
        assert!(PdgSelection::default().accepts(211));
    }

    #[test]
    fn test_selection_drops_non_prompt_photons() {
        let selection = GenSelection::default();
        let photon = DecayNode::new(22, 1, P4::massless(5.0, 0.0, 0.0), NodeOrigin::Packed(0));
        let mut prompt = photon.clone();
        prompt.flags = StatusFlags::IS_PROMPT | StatusFlags::IS_LAST_COPY;

        assert!(!selection.accepts(&photon));
        assert!(selection.accepts(&prompt));
    }

    #[test]
    fn test_selection_keeps_first_and_last_copies() {
        let selection = GenSelection::default();
        let mut tau = DecayNode::new(15, 2, P4::new(30.0, 0.1, 0.2, 1.777), NodeOrigin::Pruned(0));

        assert!(!selection.accepts(&tau));
        tau.flags = StatusFlags::IS_FIRST_COPY;
        assert!(selection.accepts(&tau));
        tau.flags = StatusFlags::IS_LAST_COPY;
        assert!(selection.accepts(&tau));

        let mut intermediate = tau.clone();
        intermediate.flags = StatusFlags::IS_HARD_PROCESS;
        assert!(!selection.accepts(&intermediate));
        let every_copy = GenSelection {
            first_last_copy_only: false,
            ..GenSelection::default()
        };
        assert!(every_copy.accepts(&intermediate));
    }

    #[test]
    fn test_merge_params_from_config() {
        let config = FillerConfig::new("genParticles", "GenParticlesFiller")
            .with_param("duplicatePolicy", "closest")
            .with_param("ptRelTolerance", 0.01);
        let params = merge_params(&config).unwrap();

        assert_eq!(params.duplicate_policy, DuplicatePolicy::ClosestMatch);
        assert_eq!(params.pt_rel_tolerance, 0.01);

        let bad = config.with_param("deltaR2Tolerance", -1.0);
        assert!(matches!(
            merge_params(&bad),
            Err(NtuplizerError::InvalidParams(_))
        ));
    }
}
