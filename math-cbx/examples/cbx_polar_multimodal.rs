use math_cbx::{
    Dynamic, DynamicConfigBuilder, KernelKind, Multiply, PolarCbo, get_objective,
};

fn main() {
    // Himmelblau has four global minima; a localised consensus keeps
    // one group of particles around each of them
    let himmelblau = get_objective("himmelblau").expect("registered objective");
    let config = DynamicConfigBuilder::new()
        .n(200)
        .d(2)
        .bounds(-5.0, 5.0)
        .dt(0.05)
        .sigma(0.3)
        .alpha(10.0)
        .kernel(KernelKind::Gaussian, 0.5)
        .max_it(400)
        .seed(7)
        .build()
        .expect("invalid config");
    let mut polar = PolarCbo::new(himmelblau, config).expect("valid dynamic");
    polar
        .optimize(&mut Multiply::new(1.01, 1e3), Some(100))
        .expect("optimization failed");

    let minima = [
        (3.0, 2.0),
        (-2.805118, 3.131312),
        (-3.779310, -3.283186),
        (3.584428, -1.848126),
    ];
    let x = polar.core().x();
    for (mx, my) in minima {
        let close = x
            .outer_iter()
            .flat_map(|ensemble| {
                ensemble
                    .outer_iter()
                    .map(|p| ((p[0] - mx).powi(2) + (p[1] - my).powi(2)).sqrt())
                    .collect::<Vec<_>>()
            })
            .filter(|&dist| dist < 0.25)
            .count();
        println!("minimum ({mx:>9.5}, {my:>9.5}): {close:>3} particles within 0.25");
    }
    println!("best f = {:?}", polar.report().best_f.to_vec());
}
