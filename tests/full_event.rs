mod common;

use ntuplizer::event::collection::OutputHandle;
use ntuplizer::event::objects::{GenParticle, Muon, PfCand, Vertex};
use ntuplizer::event::{EventId, OutputEventRecord};
use ntuplizer::filler::registry::FillerRegistry;
use ntuplizer::input::InputEvent;
use ntuplizer::ntuplizer_errors::NtuplizerError;
use ntuplizer::pipeline::producer::{Producer, ProducerConfig};
use ntuplizer::pipeline::sink::MemorySink;
use ntuplizer::pipeline::EventOutcome;

use common::{
    full_config, gen_config, muons_config, pf_config, sample_event, vertices_config, MUONS_LABEL,
};

fn produce(config: &ProducerConfig, event: &InputEvent) -> OutputEventRecord {
    let mut producer = Producer::from_config(config, &FillerRegistry::with_builtin_fillers()).unwrap();
    assert_eq!(producer.process_event(event).unwrap(), EventOutcome::Produced);
    producer.output().clone()
}

fn collection<T>(record: &OutputEventRecord, name: &str) -> Vec<T>
where
    T: Clone + Send + std::fmt::Debug + 'static,
{
    record
        .collection::<T>(name)
        .unwrap()
        .map(|c| c.as_slice().to_vec())
        .unwrap_or_default()
}

fn indices<T>(handles: impl IntoIterator<Item = Option<OutputHandle<T>>>) -> Vec<Option<usize>> {
    handles.into_iter().map(|h| h.map(|h| h.index())).collect()
}

#[test]
fn test_vertices_and_pf_candidates() {
    let record = produce(&full_config(), &sample_event(1));

    let vertices = collection::<Vertex>(&record, "vertices");
    assert_eq!(vertices.len(), 2);
    assert_eq!(record.scalar("npv"), Some(1.0));
    let ranges: Vec<u32> = vertices.iter().map(|v| v.pf_range_max).collect();
    assert_eq!(ranges, vec![2, 3]);

    let cands = collection::<PfCand>(&record, "pfCandidates");
    let pts: Vec<f64> = cands.iter().map(|c| c.pt()).collect();
    assert_eq!(pts, vec![10.0, 3.0, 5.0, 8.0]);
    assert_eq!(
        indices(cands.iter().map(|c| c.vertex)),
        vec![Some(0), Some(0), Some(1), None]
    );
    let weights: Vec<f32> = cands.iter().map(|c| c.puppi_w).collect();
    assert_eq!(weights, vec![1.0, 1.0, 0.5, 1.0]);
}

#[test]
fn test_generator_forest_is_written_in_pre_order() {
    let record = produce(&full_config(), &sample_event(1));

    let gen = collection::<GenParticle>(&record, "genParticles");
    let ids: Vec<i32> = gen.iter().map(|g| g.pdgid).collect();
    assert_eq!(ids, vec![23, 13, -13, 111, 22, 211]);
    assert_eq!(
        indices(gen.iter().map(|g| g.parent)),
        vec![None, Some(0), Some(0), None, Some(3), None]
    );

    let synthetic: Vec<bool> = gen.iter().map(|g| g.synthetic).collect();
    assert_eq!(synthetic, vec![false, false, false, true, false, false]);
    assert_eq!(gen[3].status, 2);
    assert_eq!(gen[3].p4.pt, gen[4].p4.pt);
}

#[test]
fn test_muon_references_follow_sorting() {
    let record = produce(&full_config(), &sample_event(1));

    let muons = collection::<Muon>(&record, "muons");
    let charges: Vec<i8> = muons.iter().map(|m| m.charge).collect();
    assert_eq!(charges, vec![-1, 1]);
    assert_eq!(indices(muons.iter().map(|m| m.vertex)), vec![Some(1), Some(0)]);
    assert_eq!(
        indices(muons.iter().map(|m| m.matched_gen)),
        vec![Some(1), Some(2)]
    );

    // the references land on the right objects
    let gen = collection::<GenParticle>(&record, "genParticles");
    for muon in &muons {
        let target = &gen[muon.matched_gen.unwrap().index()];
        assert_eq!(target.pdgid, -13 * i32::from(muon.charge));
    }
}

#[test]
fn test_consumer_declared_before_its_providers() {
    let reversed = ProducerConfig::new()
        .with_filler(muons_config())
        .with_filler(gen_config())
        .with_filler(vertices_config());
    let record = produce(&reversed, &sample_event(1));

    let muons = collection::<Muon>(&record, "muons");
    let refs: Vec<(Option<usize>, Option<usize>)> = muons
        .iter()
        .map(|m| (m.vertex.map(|h| h.index()), m.matched_gen.map(|h| h.index())))
        .collect();
    assert_eq!(refs, vec![(Some(1), Some(1)), (Some(0), Some(2))]);

    let reference = produce(&full_config(), &sample_event(1));
    assert_eq!(muons, collection::<Muon>(&reference, "muons"));
}

#[test]
fn test_gen_selection_reparents_to_nearest_selected_ancestor() {
    let muons_only = ProducerConfig::new()
        .with_filler(gen_config().with_param("pdgIds", vec!["13"]))
        .with_filler(muons_config());
    let record = produce(&muons_only, &sample_event(1));

    let gen = collection::<GenParticle>(&record, "genParticles");
    assert_eq!(gen.iter().map(|g| g.pdgid).collect::<Vec<_>>(), vec![13, -13]);
    assert_eq!(indices(gen.iter().map(|g| g.parent)), vec![None, None]);
    let muons = collection::<Muon>(&record, "muons");
    assert_eq!(
        indices(muons.iter().map(|m| m.matched_gen)),
        vec![Some(0), Some(1)]
    );

    let with_z = ProducerConfig::new().with_filler(gen_config().with_param("pdgIds", vec!["23", "13"]));
    let record = produce(&with_z, &sample_event(1));
    let gen = collection::<GenParticle>(&record, "genParticles");
    assert_eq!(indices(gen.iter().map(|g| g.parent)), vec![None, Some(0), Some(0)]);
}

#[test]
fn test_disabled_target_leaves_references_empty() {
    let config = ProducerConfig::new()
        .with_filler(vertices_config().disabled())
        .with_filler(pf_config())
        .with_filler(gen_config().disabled())
        .with_filler(muons_config());
    let record = produce(&config, &sample_event(1));

    assert!(collection::<GenParticle>(&record, "genParticles").is_empty());
    let muons = collection::<Muon>(&record, "muons");
    assert_eq!(muons.len(), 2);
    assert!(muons.iter().all(|m| m.matched_gen.is_none() && m.vertex.is_none()));
    assert!(collection::<PfCand>(&record, "pfCandidates")
        .iter()
        .all(|c| c.vertex.is_none()));
}

#[test]
fn test_missing_mandatory_product_skips_the_event() {
    let mut producer =
        Producer::from_config(&full_config(), &FillerRegistry::with_builtin_fillers()).unwrap();

    let mut broken = sample_event(2);
    assert!(broken.remove(MUONS_LABEL));
    let events = [sample_event(1), broken, sample_event(3)];

    let mut sink = MemorySink::new();
    let summary = producer.run(&events, &mut sink).unwrap();

    assert_eq!((summary.processed, summary.skipped), (2, 1));
    assert_eq!(sink.events[1].id, EventId::new(1, 1, 3));
    assert_eq!(collection::<Muon>(&sink.events[1], "muons").len(), 2);
}

#[test]
fn test_skipped_event_leaves_no_partial_record() {
    let mut producer =
        Producer::from_config(&full_config(), &FillerRegistry::with_builtin_fillers()).unwrap();
    assert_eq!(producer.process_event(&sample_event(1)).unwrap(), EventOutcome::Produced);

    let mut broken = sample_event(2);
    assert!(broken.remove(MUONS_LABEL));
    let outcome = producer.process_event(&broken).unwrap();
    assert!(matches!(outcome, EventOutcome::Skipped(_)));

    let record = producer.output();
    assert_eq!(record.id, EventId::new(1, 1, 2));
    assert_eq!(record.scalar("npv"), None);
    assert!(record.collection_sizes().iter().all(|(_, len)| *len == 0));
    assert!(producer.maps().names().iter().all(|name| producer.maps().entries(name) == 0));
}

#[test]
fn test_malformed_links_skip_the_event() {
    let mut producer =
        Producer::from_config(&full_config(), &FillerRegistry::with_builtin_fillers()).unwrap();

    let (mut pruned, packed) = common::dimuon_gen();
    pruned[1].daughters.push(1);
    let event = sample_event(1)
        .with(common::PRUNED_LABEL, pruned)
        .with(common::PACKED_LABEL, packed);

    let outcome = producer.process_event(&event).unwrap();
    let EventOutcome::Skipped(NtuplizerError::Filler(fault)) = outcome else {
        panic!("expected the event to be skipped");
    };
    assert_eq!(fault.filler, "genParticles");
    assert!(matches!(fault.source, NtuplizerError::MalformedInput(_)));
}

#[test]
fn test_real_data_has_no_generator_content() {
    let config = full_config().real_data(true);
    let mut event = InputEvent::new(EventId::new(2, 1, 5))
        .with(common::VERTICES_LABEL, common::sample_vertices())
        .with(common::PF_LABEL, common::sample_pf_candidates())
        .with(MUONS_LABEL, common::sample_muons());
    event.is_real_data = true;

    let record = produce(&config, &event);

    assert!(collection::<GenParticle>(&record, "genParticles").is_empty());
    let muons = collection::<Muon>(&record, "muons");
    assert_eq!(indices(muons.iter().map(|m| m.vertex)), vec![Some(1), Some(0)]);
    assert!(muons.iter().all(|m| m.matched_gen.is_none()));
}

#[test]
fn test_independent_workers_produce_identical_records() {
    let events: Vec<InputEvent> = (1..=8).map(sample_event).collect();
    let registry = FillerRegistry::with_builtin_fillers();
    let config = full_config();

    let mut reference = MemorySink::new();
    Producer::from_config(&config, &registry)
        .unwrap()
        .run(&events, &mut reference)
        .unwrap();

    let (left, right) = events.split_at(events.len() / 2);
    let sinks: Vec<MemorySink> = std::thread::scope(|s| {
        let workers: Vec<_> = [left, right]
            .into_iter()
            .map(|chunk| {
                let (config, registry) = (&config, &registry);
                s.spawn(move || {
                    let mut producer = Producer::from_config(config, registry).unwrap();
                    let mut sink = MemorySink::new();
                    producer.run(chunk, &mut sink).unwrap();
                    sink
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    let parallel: Vec<&OutputEventRecord> = sinks.iter().flat_map(|s| &s.events).collect();
    assert_eq!(parallel.len(), reference.events.len());
    for (a, b) in parallel.iter().zip(&reference.events) {
        assert_eq!(a.id, b.id);
        assert_eq!(
            collection::<GenParticle>(a, "genParticles"),
            collection::<GenParticle>(b, "genParticles")
        );
        assert_eq!(collection::<Muon>(a, "muons"), collection::<Muon>(b, "muons"));
    }
}
