use bg_erase::{
    build_mask, composite, gaussian_blur, resize, Channels, ConfidenceGrid, RasterImage,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn photo(width: u32, height: u32) -> RasterImage {
    RasterImage::from_fn(width, height, Channels::Rgb, |x, y, p| {
        let fx = x as f32 / width as f32;
        let fy = y as f32 / height as f32;
        p.copy_from_slice(&[fx, fy, 1.0 - fx]);
    })
    .unwrap()
}

/// Model-sized grid with a soft disc in the middle
fn grid(size: u32) -> ConfidenceGrid {
    let centre = size as f32 / 2.0;
    let values = (0..size * size)
        .map(|i| {
            let dx = (i % size) as f32 - centre;
            let dy = (i / size) as f32 - centre;
            (1.0 - (dx * dx + dy * dy).sqrt() / centre).clamp(0.0, 1.0)
        })
        .collect();
    ConfidenceGrid::from_vec(size, size, values).unwrap()
}

fn bench_blur(c: &mut Criterion) {
    let mut group = c.benchmark_group("gaussian_blur");
    let image = photo(512, 512);

    for sigma in [1.0f32, 5.0, 20.0] {
        group.bench_with_input(BenchmarkId::from_parameter(sigma), &sigma, |b, &sigma| {
            b.iter(|| gaussian_blur(black_box(&image), sigma).unwrap());
        });
    }
    group.finish();
}

fn bench_resize(c: &mut Criterion) {
    let mask = build_mask(&grid(256), 0.0, 1.0).unwrap();

    c.bench_function("resize_mask_256_to_1200x900", |b| {
        b.iter(|| resize(black_box(&mask), 1200, 900).unwrap());
    });
}

fn bench_composite(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite");
    group.sample_size(20);

    let mask = build_mask(&grid(256), 0.0, 1.0).unwrap();
    let background = photo(640, 480);

    for (width, height) in [(640, 480), (1200, 900)] {
        let foreground = photo(width, height);
        group.bench_with_input(
            BenchmarkId::new("default_sigmas", format!("{}x{}", width, height)),
            &foreground,
            |b, foreground| {
                b.iter(|| composite(black_box(foreground), &mask, &background, 20.0, 1.0).unwrap());
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_blur, bench_resize, bench_composite);
criterion_main!(benches);
