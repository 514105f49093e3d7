use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use oxigraph::model::{BlankNode, GraphName, Literal, NamedNode, Quad, Term};
use solid_client::accessors::add_string_no_locale;
use solid_client::options::ChainDetection;
use solid_client::thing::{create_thing_with_url, set_thing};
use solid_client::SolidDataset;

/// `n_subjects` subjects with a few literal properties each; every fourth one
/// also points to a two-node Blank Node chain.
fn generate_quads(n_subjects: usize) -> Vec<Quad> {
    let mut quads = Vec::with_capacity(n_subjects * 6);
    for s in 0..n_subjects {
        let subject = NamedNode::new_unchecked(format!("https://pod.example/doc#s{s}"));
        for p in 0..3 {
            let object: Term = match p {
                0 => Literal::new_simple_literal(format!("value {s}")).into(),
                1 => Literal::new_language_tagged_literal_unchecked(format!("bonjour {s}"), "fr").into(),
                _ => NamedNode::new_unchecked(format!("https://vocab.example/o{}", s % 10)).into(),
            };
            quads.push(Quad::new(
                subject.clone(),
                NamedNode::new_unchecked(format!("https://vocab.example/p{p}")),
                object,
                GraphName::DefaultGraph,
            ));
        }
        if s % 4 == 0 {
            let first = BlankNode::default();
            let second = BlankNode::default();
            let link = NamedNode::new_unchecked("https://vocab.example/next");
            quads.push(Quad::new(subject.clone(), link.clone(), first.clone(), GraphName::DefaultGraph));
            quads.push(Quad::new(first, link, second.clone(), GraphName::DefaultGraph));
            quads.push(Quad::new(
                second,
                NamedNode::new_unchecked("https://vocab.example/end"),
                Literal::new_simple_literal("end"),
                GraphName::DefaultGraph,
            ));
        }
    }
    quads
}

fn bench_from_quads(c: &mut Criterion) {
    let mut group = c.benchmark_group("from_quads");
    for n in [100, 1_000, 10_000] {
        let quads = generate_quads(n);
        group.throughput(Throughput::Elements(quads.len() as u64));
        group.bench_with_input(BenchmarkId::new("chains", n), &quads, |b, quads| {
            b.iter(|| SolidDataset::from_quads(quads, ChainDetection::Enabled).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("opaque", n), &quads, |b, quads| {
            b.iter(|| SolidDataset::from_quads(quads, ChainDetection::Disabled).unwrap());
        });
    }
    group.finish();
}

fn bench_to_quads(c: &mut Criterion) {
    let mut group = c.benchmark_group("to_quads");
    for n in [100, 1_000, 10_000] {
        let dataset = SolidDataset::from_quads(&generate_quads(n), ChainDetection::Enabled).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &dataset, |b, dataset| {
            b.iter(|| dataset.to_quads());
        });
    }
    group.finish();
}

// Each set_thing copies only the path to the changed subject.
fn bench_set_thing(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_thing");
    for n in [100, 1_000, 10_000] {
        let dataset = SolidDataset::from_quads(&generate_quads(n), ChainDetection::Enabled).unwrap();
        let thing = create_thing_with_url("https://pod.example/doc#s1").unwrap();
        let thing = add_string_no_locale(&thing, "https://vocab.example/p0", "changed").unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &dataset, |b, dataset| {
            b.iter(|| set_thing(dataset, &thing).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_from_quads, bench_to_quads, bench_set_thing);
criterion_main!(benches);
