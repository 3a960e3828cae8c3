use math_cbx::{
    CallbackAction, Cbo, CorrectionKind, Dynamic, DynamicConfigBuilder, Multiply, NoiseKind,
    Objective,
};

fn main() {
    // Ackley function (2D)
    let ackley = Objective::point(|x| {
        let (x0, x1) = (x[0], x[1]);
        let s = 0.5 * (x0 * x0 + x1 * x1);
        let c = 0.5
            * ((2.0 * std::f64::consts::PI * x0).cos() + (2.0 * std::f64::consts::PI * x1).cos());
        -20.0 * (-0.2 * s.sqrt()).exp() - c.exp() + 20.0 + std::f64::consts::E
    });

    let config = DynamicConfigBuilder::new()
        .m(4)
        .n(50)
        .d(2)
        .bounds(-5.0, 5.0)
        .dt(0.1)
        .sigma(1.0)
        .noise(NoiseKind::Anisotropic)
        .correction(CorrectionKind::HeavisideReg)
        .max_it(500)
        .seed(42)
        .build()
        .expect("invalid config");
    let mut cbo = Cbo::new(ackley, config).expect("valid dynamic");

    // Callback every iteration: stop once every ensemble is close enough
    let mut sched = Multiply::new(1.05, 1e4);
    cbo.optimize_with_callback(&mut sched, None, &mut |inter| {
        if inter.iter % 25 == 0 {
            eprintln!(
                "iter {:4}  best_f={:?}  alpha={:.3e}",
                inter.iter,
                inter.best_energy.to_vec(),
                inter.alpha[0]
            );
        }
        if inter.best_energy.iter().all(|&e| e < 1e-6) {
            CallbackAction::Stop
        } else {
            CallbackAction::Continue
        }
    })
    .expect("optimization failed");

    let report = cbo.report();
    println!(
        "status=\"{}\" nit={}\nbest f={:?}\nbest x={:?}",
        report
            .termination
            .map_or_else(|| "not run".to_string(), |r| r.to_string()),
        report.nit,
        report.best_f.to_vec(),
        report.best_x
    );
}
