use criterion::{black_box, criterion_group, criterion_main, Criterion};
use math_cbx::{
    DynamicConfigBuilder, DynamicKind, Objective, build_dynamic, compute_consensus,
    covariance::covariance_sqrt, get_objective,
};
use ndarray::{Array1, Array2, Array3};

fn bench_steps(c: &mut Criterion) {
    for kind in [DynamicKind::Cbo, DynamicKind::Pso, DynamicKind::Cbs, DynamicKind::PolarCbo] {
        c.bench_function(&format!("{kind}_step_m4_n100_d10"), |b| {
            let config = DynamicConfigBuilder::new()
                .m(4)
                .n(100)
                .d(10)
                .bounds(-3.0, 3.0)
                .sigma(1.0)
                .dt(0.05)
                .seed(1)
                .build()
                .expect("valid config");
            let f = get_objective("rastrigin").expect("registered objective");
            let mut dynamic = build_dynamic(kind, f, config).expect("valid dynamic");
            b.iter(|| {
                dynamic.step().expect("step");
                black_box(dynamic.core().x());
            })
        });
    }
}

fn bench_consensus(c: &mut Criterion) {
    let x = Array3::from_shape_fn((4, 1000, 20), |(i, j, k)| ((i * 31 + j * 7 + k) % 97) as f64 / 97.0);
    let energy = Array2::from_shape_fn((4, 1000), |(i, j)| ((i + j * 13) % 101) as f64);
    let alpha = Array1::from_elem(4, 50.0);

    c.bench_function("consensus_m4_n1000_d20", |b| {
        b.iter(|| black_box(compute_consensus(x.view(), energy.view(), alpha.view())))
    });

    let consensus = compute_consensus(x.view(), energy.view(), alpha.view());
    c.bench_function("covariance_sqrt_m4_n1000_d20", |b| {
        b.iter(|| {
            black_box(covariance_sqrt(
                x.view(),
                consensus.point.view(),
                consensus.weights.view(),
            ))
        })
    });
}

fn bench_objective(c: &mut Criterion) {
    let x = Array3::from_elem((8, 500, 10), 0.3);
    let f = Objective::point(|p| p.dot(&p));
    let parallel = math_cbx::ParallelConfig::default();
    c.bench_function("point_objective_m8_n500_d10", |b| {
        b.iter(|| black_box(f.evaluate(x.view(), &parallel).expect("finite")))
    });
}

criterion_group!(benches, bench_steps, bench_consensus, bench_objective);
criterion_main!(benches);
