use calo_core::processing::filters::check_feasibility;
use calo_core::processing::{
    compare_amplitudes, estimate_amplitudes, estimate_count, Estimator, FilterSpec, Of2,
    SolutionStatus,
};
use ndarray::{Array1, Array2};
use proptest::prelude::*;

// Property 1: one estimate per stride-1 window position
proptest! {
    #[test]
    fn prop_estimate_count(
        n_slices in 1usize..40,
        slice_size in 1usize..16,
        seed in -10.0f64..10.0
    ) {
        let samples = Array2::from_shape_fn((n_slices, slice_size), |(i, j)| seed + (i * slice_size + j) as f64);
        let weights = Array1::from_elem(slice_size, 0.5);

        let estimates = estimate_amplitudes(&samples, &weights, n_slices, slice_size).unwrap();
        prop_assert_eq!(estimates.len(), (n_slices - 1) * slice_size + 1);
        prop_assert_eq!(estimates.len(), estimate_count(n_slices, slice_size));
    }
}

// Property 2: a centre-tap filter over its own amplitudes gives zero error
proptest! {
    #[test]
    fn prop_centre_tap_round_trip(
        n_slices in 1usize..30,
        half in 0usize..6,
        values in prop::collection::vec(-1000.0f64..1000.0, 400)
    ) {
        let slice_size = 2 * half + 1;
        let amplitudes = Array2::from_shape_fn((n_slices, slice_size), |(i, j)| {
            values[(i * slice_size + j) % values.len()]
        });
        let mut weights = Array1::zeros(slice_size);
        weights[half] = 1.0;

        let estimated = estimate_amplitudes(&amplitudes, &weights, n_slices, slice_size).unwrap();
        let errors = compare_amplitudes(&amplitudes, n_slices, slice_size, &estimated).unwrap();

        prop_assert_eq!(errors.len(), estimated.len());
        prop_assert!(errors.iter().all(|e| *e == 0.0));
    }
}

// Property 3: feasible OF2 weights honour every constraint they were checked against
proptest! {
    #[test]
    fn prop_of2_feasible_weights_are_bounded(
        half in 1usize..6,
        shape in prop::collection::vec(0.0f64..1.0, 11),
        slope in prop::collection::vec(-0.05f64..0.05, 11)
    ) {
        let n = 2 * half + 1;
        let mut g = Array1::from(shape[..n].to_vec());
        g[half] = 1.0;
        let dg = Array1::from(slope[..n].to_vec());
        let t = Array1::from_shape_fn(n, |i| (i as f64 - half as f64) * 25.0);

        let of2 = Of2::new(n, t, g.clone(), dg).unwrap();
        if let Ok(output) = of2.go_filtering() {
            prop_assert_eq!(output.weights.len(), n);
            if output.status == SolutionStatus::Feasible {
                prop_assert!(output.weights.iter().all(|w| (-1.0..=1.0).contains(w)));
                prop_assert!(output.weights.sum().abs() < 1e-12);
                prop_assert!((output.weights.dot(&g) - 1.0).abs() < 2e-5);
            }
        }
    }
}

// Property 4: the feasibility check is exactly bounds plus zero sum
proptest! {
    #[test]
    fn prop_feasibility_matches_definition(
        weights in prop::collection::vec(-2.0f64..2.0, 1..12)
    ) {
        let weights = Array1::from(weights);
        let expected = weights.iter().all(|w| (-1.0..=1.0).contains(w)) && weights.sum().abs() < 1e-12;
        prop_assert_eq!(check_feasibility(&weights).is_feasible(), expected);
    }
}

// Property 5: mismatched tap offsets are rejected before any solve
proptest! {
    #[test]
    fn prop_t_filter_length_checked(n_filter in 1usize..20, t_len in 0usize..20) {
        prop_assume!(n_filter != t_len);
        let result = FilterSpec::new(n_filter, Some(Array1::zeros(t_len)), None, None);
        prop_assert_eq!(result.unwrap_err().kind(), "DimensionMismatch");
    }
}
