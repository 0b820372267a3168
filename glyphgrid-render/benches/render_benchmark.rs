//! Benchmarks for label assembly and index grouping.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glyphgrid_atlas::{AtlasConfig, FontContext, StaticOutlines};
use glyphgrid_render::label::{Align, Label};
use glyphgrid_render::pipelines::glyph::build_indices;

const PANGRAM: &str = "The quick brown fox jumps over the lazy dog. ";

fn bench_set_text(c: &mut Criterion) {
    let fonts = FontContext::with_config(AtlasConfig::default()).unwrap();
    let face = fonts.add_face(StaticOutlines::block_face("blocks"));
    fonts.load_ascii(face).unwrap();

    let mut group = c.benchmark_group("label_set_text");
    for &repeat in &[1, 10, 100] {
        let text = PANGRAM.repeat(repeat);
        group.bench_with_input(BenchmarkId::from_parameter(text.len()), &text, |b, text| {
            let mut label = Label::new(&fonts, face).unwrap();
            label.set_alignment(Align::Center, Align::Center);
            b.iter(|| label.set_text(black_box(text)).unwrap());
        });
    }
    group.finish();
}

fn bench_append_text(c: &mut Criterion) {
    let fonts = FontContext::with_config(AtlasConfig::default()).unwrap();
    let face = fonts.add_face(StaticOutlines::block_face("blocks"));
    fonts.load_ascii(face).unwrap();

    c.bench_function("label_append_realign", |b| {
        let mut label = Label::new(&fonts, face).unwrap();
        label.set_alignment(Align::End, Align::Start);
        b.iter(|| {
            label.set_text(PANGRAM).unwrap();
            label.append_text(black_box(PANGRAM)).unwrap();
        });
    });
}

fn bench_build_indices(c: &mut Criterion) {
    let fonts = FontContext::with_config(AtlasConfig::default()).unwrap();
    let face = fonts.add_face(StaticOutlines::block_face("blocks"));
    let mut label = Label::new(&fonts, face).unwrap();
    label.set_text(&PANGRAM.repeat(20)).unwrap();

    c.bench_function("build_indices_pangram_x20", |b| {
        b.iter(|| build_indices(black_box(&label)));
    });
}

criterion_group!(benches, bench_set_text, bench_append_text, bench_build_indices);
criterion_main!(benches);
