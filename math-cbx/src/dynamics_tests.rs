use crate::{
    CallbackAction, Cbo, Dynamic, DynamicConfig, DynamicConfigBuilder, DynamicKind, EffectiveSampleSize,
    Multiply, NoScheduler, Objective, TerminationReason, build_dynamic,
};
use ndarray::{Array3, Axis};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn sphere() -> Objective {
    Objective::point(|x| x.dot(&x))
}

fn base(m: usize, n: usize, d: usize, seed: u64) -> DynamicConfigBuilder {
    DynamicConfigBuilder::new()
        .m(m)
        .n(n)
        .d(d)
        .bounds(-3.0, 3.0)
        .dt(0.1)
        .sigma(1.0)
        .seed(seed)
}

fn build(kind: DynamicKind, config: DynamicConfig) -> Box<dyn Dynamic> {
    build_dynamic(kind, sphere(), config).expect("dynamic should build")
}

#[cfg(test)]
mod invariant_tests {
    use super::*;

    #[test]
    fn test_shape_is_preserved_by_every_dynamic() {
        for kind in DynamicKind::ALL {
            let mut dynamic = build(kind, base(3, 7, 4, 11).build().unwrap());
            for _ in 0..10 {
                dynamic.step().unwrap();
                assert_eq!(dynamic.core().x().dim(), (3, 7, 4), "{}", kind);
                assert_eq!(dynamic.core().energy().dim(), (3, 7), "{}", kind);
            }
        }
    }

    #[test]
    fn test_positions_stay_finite_and_clipped() {
        for kind in DynamicKind::ALL {
            let config = base(2, 10, 3, 5).sigma(50.0).max_thresh(10.0).build().unwrap();
            let mut dynamic = build(kind, config);
            for _ in 0..5 {
                dynamic.step().unwrap();
                for v in dynamic.core().x().iter() {
                    assert!(v.is_finite(), "{}: non-finite position", kind);
                    assert!(v.abs() <= 10.0, "{}: {} outside threshold", kind, v);
                }
            }
        }
    }

    #[test]
    fn test_best_energy_never_increases() {
        for kind in DynamicKind::ALL {
            let mut dynamic = build(kind, base(2, 12, 2, 3).build().unwrap());
            let mut previous = dynamic.core().best_energy().to_owned();
            for _ in 0..25 {
                dynamic.step().unwrap();
                let current = dynamic.core().best_energy().to_owned();
                for (c, p) in current.iter().zip(previous.iter()) {
                    assert!(c <= p, "{}: best energy rose from {} to {}", kind, p, c);
                }
                previous = current;
            }
        }
    }

    #[test]
    fn test_best_record_is_an_evaluated_pair() {
        for kind in DynamicKind::ALL {
            let mut dynamic = build(kind, base(2, 8, 3, 17).build().unwrap());
            for _ in 0..8 {
                dynamic.step().unwrap();
            }
            let core = dynamic.core();
            for (i, row) in core.best_particle().outer_iter().enumerate() {
                let f = row.dot(&row);
                assert!((f - core.best_energy()[i]).abs() < 1e-12, "{}", kind);
            }
        }
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        for kind in DynamicKind::ALL {
            let mut a = build(kind, base(1, 10, 2, 99).build().unwrap());
            let mut b = build(kind, base(1, 10, 2, 99).build().unwrap());
            for _ in 0..5 {
                a.step().unwrap();
                b.step().unwrap();
            }
            assert_eq!(a.core().x(), b.core().x(), "{}", kind);
        }
    }
}

#[cfg(test)]
mod batching_tests {
    use super::*;

    #[test]
    fn test_partial_batch_updates_only_the_batch() {
        let config = base(1, 10, 2, 21).batch(4, true).build().unwrap();
        let mut cbo = Cbo::new(sphere(), config).unwrap();
        let before = cbo.core().x().to_owned();
        cbo.step().unwrap();
        let after = cbo.core().x();
        let moved = (0..10)
            .filter(|&j| after.index_axis(Axis(1), j) != before.index_axis(Axis(1), j))
            .count();
        assert_eq!(moved, 4);
        assert_eq!(cbo.core().num_f_eval()[0], 4);
    }

    #[test]
    fn test_full_update_with_batched_consensus() {
        let config = base(2, 10, 2, 22).batch(3, false).build().unwrap();
        let mut cbo = Cbo::new(sphere(), config).unwrap();
        let before = cbo.core().x().to_owned();
        cbo.step().unwrap();
        let after = cbo.core().x();
        for j in 0..10 {
            assert_ne!(after.slice(ndarray::s![0, j, ..]), before.slice(ndarray::s![0, j, ..]));
        }
        assert!(cbo.core().num_f_eval().iter().all(|&c| c == 3));
    }

    #[test]
    fn test_batch_larger_than_ensemble_uses_everything() {
        let config = base(1, 6, 1, 23).batch(6, true).build().unwrap();
        let mut cbo = Cbo::new(sphere(), config).unwrap();
        cbo.step().unwrap();
        assert_eq!(cbo.core().num_f_eval()[0], 6);
    }
}

#[cfg(test)]
mod termination_tests {
    use super::*;

    #[test]
    fn test_energy_tolerance() {
        let config = base(1, 20, 2, 31)
            .sigma(0.5)
            .energy_tol(1e-2)
            .max_it(10_000)
            .build()
            .unwrap();
        let mut dynamic = build(DynamicKind::Cbo, config);
        dynamic.optimize(&mut Multiply::default(), None).unwrap();
        let report = dynamic.report();
        assert_eq!(report.termination, Some(TerminationReason::EnergyTolerance));
        assert!(dynamic.core().f_min()[0] < 1e-2);
        assert!(report.nit < 10_000);
    }

    #[test]
    fn test_max_eval() {
        let config = base(2, 10, 2, 32).max_eval(55).max_it(1000).build().unwrap();
        let mut dynamic = build(DynamicKind::Cbo, config);
        dynamic.optimize(&mut NoScheduler, None).unwrap();
        let report = dynamic.report();
        assert_eq!(report.termination, Some(TerminationReason::MaxEvaluations));
        assert_eq!(report.nit, 6);
        assert!(report.num_f_eval.iter().all(|&c| c == 60));
    }

    #[test]
    fn test_diff_tolerance() {
        let config = base(1, 10, 2, 33)
            .sigma(0.0)
            .dt(0.5)
            .diff_tol(1e-6)
            .build()
            .unwrap();
        let mut dynamic = build(DynamicKind::Cbo, config);
        dynamic.optimize(&mut NoScheduler, None).unwrap();
        assert_eq!(
            dynamic.report().termination,
            Some(TerminationReason::DiffTolerance)
        );
        assert!(dynamic.core().update_diff()[0] < 1e-6);
    }

    #[test]
    fn test_callback_can_stop() {
        let config = base(1, 10, 2, 34).build().unwrap();
        let mut dynamic = build(DynamicKind::Pso, config);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        dynamic
            .optimize_with_callback(&mut NoScheduler, None, &mut |info| {
                counter.fetch_add(1, Ordering::SeqCst);
                assert_eq!(info.best_particle.dim(), (1, 2));
                if info.iter >= 3 {
                    CallbackAction::Stop
                } else {
                    CallbackAction::Continue
                }
            })
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let report = dynamic.report();
        assert_eq!(report.nit, 3);
        assert_eq!(report.termination, Some(TerminationReason::Callback));
    }

    #[test]
    fn test_optimize_returns_best_particle() {
        let config = base(3, 15, 2, 35).max_it(30).build().unwrap();
        let mut dynamic = build(DynamicKind::CboMemory, config);
        let best = dynamic.optimize(&mut Multiply::default(), Some(10)).unwrap();
        assert_eq!(best.dim(), (3, 2));
        assert_eq!(best, dynamic.core().best_particle());
    }
}

#[cfg(test)]
mod scheduler_tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_multiply_runs_after_every_step() {
        let config = base(2, 10, 2, 41).alpha(1.0).max_it(5).build().unwrap();
        let mut dynamic = build(DynamicKind::Cbo, config);
        let mut sched = Multiply::new(2.0, 10.0);
        dynamic.optimize(&mut sched, None).unwrap();
        for &a in dynamic.core().alpha().iter() {
            assert_relative_eq!(a, 10.0);
        }
    }

    #[test]
    fn test_ess_scheduler_adapts_alpha() {
        let config = base(1, 40, 2, 42).max_it(3).build().unwrap();
        let mut dynamic = build(DynamicKind::Cbo, config);
        dynamic
            .optimize(&mut EffectiveSampleSize::default(), None)
            .unwrap();
        assert_ne!(dynamic.core().alpha()[0], 1.0);
    }
}

#[cfg(test)]
mod history_tests {
    use super::*;

    #[test]
    fn test_history_records_every_iteration() {
        let config = base(2, 8, 2, 51)
            .max_it(12)
            .track_history(true)
            .track_consensus(true)
            .build()
            .unwrap();
        let mut dynamic = build(DynamicKind::PolarCbo, config);
        dynamic.optimize(&mut NoScheduler, None).unwrap();
        let history = dynamic.core().history().unwrap();
        assert_eq!(history.len(), 12);
        assert_eq!(history.records()[3].iteration, 3);
        assert_eq!(
            history.records()[0].consensus.as_ref().unwrap().dim(),
            (2, 8, 2)
        );
        let trace = history.best_energy_trace(1);
        assert!(trace.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_history_is_off_by_default() {
        let mut dynamic = build(DynamicKind::Cbo, base(1, 5, 1, 52).build().unwrap());
        dynamic.step().unwrap();
        assert!(dynamic.core().history().is_none());
    }
}

#[cfg(test)]
mod objective_tests {
    use super::*;
    use crate::CbxError;

    #[test]
    fn test_nan_objective_is_fatal() {
        let config = base(1, 5, 2, 61).build().unwrap();
        let mut cbo = Cbo::new(Objective::point(|_| f64::NAN), config).unwrap();
        let err = cbo.step().unwrap_err();
        assert!(matches!(err, CbxError::NonFiniteObjective { .. }));
        assert!(err.is_objective_error());
    }

    #[test]
    fn test_infinite_objective_is_tolerated() {
        let config = base(1, 6, 2, 62).build().unwrap();
        let f = Objective::point(|x| if x[0] > 0.0 { f64::INFINITY } else { x.dot(&x) });
        let mut cbo = Cbo::new(f, config).unwrap();
        for _ in 0..5 {
            cbo.step().unwrap();
        }
        assert!(cbo.core().x().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_ensemble_and_batch_objectives() {
        let x = Array3::from_shape_fn((2, 6, 2), |(i, j, k)| (i + j + k) as f64 * 0.1 - 0.5);
        let ensemble = Objective::ensemble(|slab| slab.map_axis(Axis(1), |p| p.dot(&p)));
        let config = DynamicConfigBuilder::new()
            .x(x.clone())
            .f_dim(crate::FDim::TwoD)
            .seed(1)
            .build()
            .unwrap();
        let mut dynamic = build_dynamic(DynamicKind::Cbo, ensemble, config).unwrap();
        dynamic.step().unwrap();

        let batch = Objective::batch(|x| x.map_axis(Axis(2), |p| p.dot(&p)));
        let config = DynamicConfigBuilder::new()
            .x(x)
            .f_dim(crate::FDim::ThreeD)
            .seed(1)
            .build()
            .unwrap();
        let mut other = build_dynamic(DynamicKind::Cbo, batch, config).unwrap();
        other.step().unwrap();
        assert_eq!(dynamic.core().x(), other.core().x());
    }

    #[test]
    fn test_f_dim_mismatch() {
        let config = DynamicConfigBuilder::new()
            .d(2)
            .f_dim(crate::FDim::ThreeD)
            .build()
            .unwrap();
        let err = Cbo::new(sphere(), config).unwrap_err();
        assert!(matches!(err, CbxError::ObjectiveDimMismatch { .. }));
    }

    #[test]
    fn test_objective_evaluations_are_counted() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let f = Objective::point(move |x| {
            counter.fetch_add(1, Ordering::SeqCst);
            x.dot(&x)
        });
        let config = base(2, 5, 2, 63).build().unwrap();
        let mut cbo = Cbo::new(f, config).unwrap();
        for _ in 0..3 {
            cbo.step().unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 30);
        assert!(cbo.core().num_f_eval().iter().all(|&c| c == 15));
    }
}
