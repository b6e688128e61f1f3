mod common;

use std::sync::{Arc, Mutex};

use ntuplizer::event::EventId;
use ntuplizer::filler::registry::FillerRegistry;
use ntuplizer::input::{InputEvent, InputRun};
use ntuplizer::ntuplizer_errors::{FaultKind, NtuplizerError};
use ntuplizer::pipeline::producer::{Producer, ProducerConfig};
use ntuplizer::pipeline::sink::MemorySink;
use ntuplizer::pipeline::{EventOutcome, Phase};

use common::{journal_entries, probe_config, registry_with_probe, Journal};

fn event(n: u64) -> InputEvent {
    InputEvent::new(EventId::new(1, 1, n))
}

fn probes(config: ProducerConfig, journal: &Journal) -> Producer {
    Producer::from_config(&config, &registry_with_probe(journal)).unwrap()
}

#[test]
fn test_all_fills_precede_all_set_refs() {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let config = ProducerConfig::new()
        .with_filler(probe_config("a"))
        .with_filler(probe_config("b"))
        .with_filler(probe_config("c"));
    let mut producer = probes(config, &journal);

    assert_eq!(producer.process_event(&event(1)).unwrap(), EventOutcome::Produced);

    assert_eq!(
        journal_entries(&journal),
        vec!["fill:a", "fill:b", "fill:c", "setRefs:a", "setRefs:b", "setRefs:c"]
    );
    assert_eq!(producer.phase(), Phase::Idle);
}

#[test]
fn test_disabled_filler_is_skipped_and_excluded() {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let config = ProducerConfig::new()
        .with_filler(probe_config("a"))
        .with_filler(probe_config("b").disabled());
    let mut producer = probes(config, &journal);

    producer.process_event(&event(1)).unwrap();

    assert_eq!(journal_entries(&journal), vec!["fill:a", "setRefs:a"]);
    assert_eq!(producer.branch_list(), vec!["aBranch", "!b"]);
    assert!(producer.maps().contains("a"));
    assert!(!producer.maps().contains("b"));
}

#[test]
fn test_event_local_fault_skips_event_and_job_continues() {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let config = ProducerConfig::new()
        .with_filler(probe_config("a"))
        .with_filler(probe_config("b").with_param("failOnEvent", 2_i64))
        .with_filler(probe_config("c"));
    let mut producer = probes(config, &journal);

    let events = [event(1), event(2), event(3)];
    let mut sink = MemorySink::new();
    let summary = producer.run(&events, &mut sink).unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.to_string(), "3 events read, 2 written, 1 skipped");
    let written: Vec<u64> = sink.events.iter().map(|r| r.id.event).collect();
    assert_eq!(written, vec![1, 3]);

    // event 2 stopped inside the first phase: no filler after b ran, no reference linking
    let entries = journal_entries(&journal);
    assert_eq!(&entries[6..8], &["fill:a".to_string(), "fill:b".to_string()]);
    assert_eq!(entries[8], "fill:a");
}

#[test]
fn test_skipped_outcome_names_filler_and_phase() {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let config = ProducerConfig::new().with_filler(
        probe_config("b")
            .with_param("failOnEvent", 7_i64)
            .with_param("failIn", "setRefs"),
    );
    let mut producer = probes(config, &journal);

    let outcome = producer.process_event(&event(7)).unwrap();

    let EventOutcome::Skipped(NtuplizerError::Filler(fault)) = outcome else {
        panic!("expected a skipped event, got {outcome:?}");
    };
    assert_eq!(fault.filler, "b");
    assert_eq!(fault.phase, Phase::ReferenceLinking);
    assert_eq!(fault.source, NtuplizerError::MissingProduct("bInput".into()));
    assert_eq!(producer.phase(), Phase::Idle);
}

#[test]
fn test_job_fatal_fault_stops_the_run() {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let config = ProducerConfig::new().with_filler(
        probe_config("a")
            .with_param("failOnEvent", 2_i64)
            .with_param("failWith", "invariant"),
    );
    let mut producer = probes(config, &journal);

    let events = [event(1), event(2), event(3)];
    let mut sink = MemorySink::new();
    let err = producer.run(&events, &mut sink).unwrap_err();

    assert_eq!(err.kind(), FaultKind::JobFatal);
    assert!(err.to_string().starts_with("filler 'a' failed during fill"));
    assert_eq!(sink.events.len(), 1);
    assert_eq!(producer.phase(), Phase::Idle);
}

#[test]
fn test_foreign_map_access_during_fill_is_fatal() {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let config = ProducerConfig::new()
        .with_filler(probe_config("a"))
        .with_filler(probe_config("b").with_param("peek", "a"));
    let mut producer = probes(config, &journal);

    let err = producer.process_event(&event(1)).unwrap_err();

    let NtuplizerError::Filler(fault) = err else {
        panic!("expected a filler fault");
    };
    assert_eq!(
        fault.source,
        NtuplizerError::ForeignMapAccess {
            owner: "b".into(),
            requested: "a".into()
        }
    );
}

#[test]
fn test_maps_are_cleared_between_events() {
    let mut producer = Producer::from_config(
        &common::full_config(),
        &FillerRegistry::with_builtin_fillers(),
    )
    .unwrap();

    producer.process_event(&common::sample_event(1)).unwrap();
    assert_eq!(producer.maps().entries("vertices"), 2);

    let no_vertices = InputEvent::new(EventId::new(1, 1, 2))
        .with(common::VERTICES_LABEL, Vec::<ntuplizer::input::records::RecoVertex>::new())
        .with(common::PF_LABEL, common::sample_pf_candidates())
        .with(common::PRUNED_LABEL, common::dimuon_gen().0)
        .with(common::MUONS_LABEL, common::sample_muons());
    producer.process_event(&no_vertices).unwrap();

    assert_eq!(producer.maps().entries("vertices"), 0);
    assert_eq!(producer.maps().entries("genParticles"), 3);
    assert_eq!(producer.maps().names(), vec!["genParticles", "muons", "pfCandidates", "vertices"]);
}

#[test]
fn test_begin_run_fills_run_record() {
    let mut producer = Producer::from_config(
        &common::full_config(),
        &FillerRegistry::with_builtin_fillers(),
    )
    .unwrap();

    producer
        .begin_run(&InputRun {
            run: 273_158,
            is_real_data: false,
        })
        .unwrap();

    let run = producer.run_record();
    assert_eq!(run.run, 273_158);
    assert_eq!(run.get("genParticles.ptRelTolerance"), Some(1e-3));
    assert_eq!(run.get("genParticles.trackingRapidity"), Some(6.0));

    let mut sink = MemorySink::new();
    producer.end_run(&mut sink).unwrap();
    assert_eq!(sink.runs.len(), 1);
}

#[test]
fn test_configuration_faults_surface_at_construction() {
    let registry = FillerRegistry::with_builtin_fillers();

    let missing_label = ProducerConfig::new().with_filler(
        ntuplizer::filler::FillerConfig::new("vertices", "VerticesFiller"),
    );
    assert!(matches!(
        Producer::from_config(&missing_label, &registry),
        Err(NtuplizerError::Configuration { .. })
    ));

    let unknown = ProducerConfig::new()
        .with_filler(ntuplizer::filler::FillerConfig::new("jets", "JetsFiller"));
    assert!(matches!(
        Producer::from_config(&unknown, &registry),
        Err(NtuplizerError::UnknownFillerClass(_))
    ));
}
