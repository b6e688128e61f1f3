use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ntuplizer::event::EventId;
use ntuplizer::filler::registry::FillerRegistry;
use ntuplizer::filler::FillerConfig;
use ntuplizer::gen::kinematics::P4;
use ntuplizer::gen::merge::GenParticleMerger;
use ntuplizer::gen::particle::{link_pruned, PackedGenParticle, PrunedGenParticle, StatusFlags};
use ntuplizer::gen::MergeParams;
use ntuplizer::input::InputEvent;
use ntuplizer::pipeline::producer::{Producer, ProducerConfig};

/// Random kinematics in the tracker region.
#[inline]
fn rand_p4(rng: &mut StdRng, mass: f64) -> P4 {
    P4::new(
        rng.random_range(1.0..80.0),
        rng.random_range(-2.5..2.5),
        rng.random_range(-std::f64::consts::PI..std::f64::consts::PI),
        mass,
    )
}

/// A hard-scatter-like event: `n_pruned` pruned particles arranged as decay chains, and a packed
/// collection holding copies of the final-state ones plus `n_extra` soft photons and pions.
fn make_event(
    rng: &mut StdRng,
    n_pruned: usize,
    n_extra: usize,
) -> (Vec<PrunedGenParticle>, Vec<PackedGenParticle>) {
    let mut pruned: Vec<PrunedGenParticle> = (0..n_pruned)
        .map(|i| {
            if i % 3 == 0 {
                PrunedGenParticle::new(111, 2, rand_p4(rng, 0.135))
                    .with_flags(StatusFlags::IS_LAST_COPY)
            } else {
                PrunedGenParticle::new(22, 1, rand_p4(rng, 0.0))
                    .with_flags(StatusFlags::IS_LAST_COPY)
            }
        })
        .collect();
    for i in 1..n_pruned {
        if i % 3 != 0 {
            link_pruned(&mut pruned, i - i % 3, i);
        }
    }

    let mut packed: Vec<PackedGenParticle> = pruned
        .iter()
        .filter(|p| p.status == 1)
        .map(|p| PackedGenParticle::new(p.pdg_id, p.p4).with_flags(p.flags))
        .collect();
    packed.extend((0..n_extra).map(|_| {
        if rng.random_bool(0.5) {
            let mut photon = PackedGenParticle::new(22, rand_p4(rng, 0.0))
                .with_flags(
                StatusFlags::IS_DIRECT_HADRON_DECAY_PRODUCT | StatusFlags::IS_LAST_COPY,
            );
            if rng.random_bool(0.5) {
                photon = photon.with_mother(3 * rng.random_range(0..n_pruned / 3));
            }
            photon
        } else {
            PackedGenParticle::new(211, rand_p4(rng, 0.1396))
                .with_charge(1)
                .with_flags(StatusFlags::IS_LAST_COPY)
        }
    }));

    (pruned, packed)
}

fn bench_merge(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let merger = GenParticleMerger::new(MergeParams::default());

    c.bench_function("merge_gen_particles/300_pruned_1000_extra", |b| {
        b.iter_batched(
            || make_event(&mut rng, 300, 1000),
            |(pruned, packed)| {
                let merged = merger.merge(black_box(&pruned), black_box(&packed)).unwrap();
                black_box(merged.forest.len());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_producer(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    let config = ProducerConfig::new().with_filler(
        FillerConfig::new("genParticles", "GenParticlesFiller")
            .with_param("genParticles", "prunedGenParticles")
            .with_param("packedGenParticles", "packedGenParticles")
            .with_param("promptPhotonsOnly", false),
    );
    let mut producer =
        Producer::from_config(&config, &FillerRegistry::with_builtin_fillers()).unwrap();

    let events: Vec<InputEvent> = (0..32)
        .map(|n| {
            let (pruned, packed) = make_event(&mut rng, 150, 400);
            InputEvent::new(EventId::new(1, 1, n))
                .with("prunedGenParticles", pruned)
                .with("packedGenParticles", packed)
        })
        .collect();

    c.bench_function("producer/gen_particles_32_events", |b| {
        b.iter(|| {
            for event in &events {
                black_box(producer.process_event(black_box(event)).unwrap());
            }
        })
    });
}

criterion_group!(benches, bench_merge, bench_producer);
criterion_main!(benches);
