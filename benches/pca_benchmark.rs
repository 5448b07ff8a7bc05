use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use exact_pca::PCA;
use ndarray::{Array, Array2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

// Function to generate random data for PCA
fn generate_data(n_samples: usize, n_features: usize) -> Array2<f64> {
    Array::random((n_samples, n_features), Uniform::new(0., 10.))
}

// Benchmark for PCA::fit_transform
fn bench_pca_fit_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("PCA_fit_transform");

    for &(n_samples, n_features) in [(100, 10), (500, 50), (1000, 100)].iter() {
        let data = generate_data(n_samples, n_features);
        let n_components = n_features.min(10);
        group.throughput(Throughput::Elements((n_samples * n_features) as u64));
        group.bench_with_input(
            BenchmarkId::new("fit_transform", format!("{}x{}", n_samples, n_features)),
            &data,
            |b, data_matrix| {
                b.iter_with_setup(
                    || (PCA::new(), data_matrix.clone()),
                    |(mut pca, data_to_fit)| pca.fit_transform(data_to_fit, n_components).unwrap(),
                );
            },
        );
    }
    group.finish();
}

// Benchmark for PCA::inverse_transform
fn bench_pca_inverse_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("PCA_inverse_transform");

    for &(n_samples, n_features) in [(500, 50), (1000, 100)].iter() {
        let data = generate_data(n_samples, n_features);
        let n_components = n_features.min(10);
        let mut pca = PCA::new();
        let scores = pca.fit_transform(data, n_components).unwrap();

        group.throughput(Throughput::Elements((n_samples * n_components) as u64));
        group.bench_with_input(
            BenchmarkId::new(
                "inverse_transform",
                format!("{}x{}", n_samples, n_features),
            ),
            &scores,
            |b, score_matrix| {
                b.iter_with_setup(
                    || score_matrix.clone(),
                    |scores_to_map| pca.inverse_transform(scores_to_map).unwrap(),
                );
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_pca_fit_transform, bench_pca_inverse_transform);
criterion_main!(benches);
