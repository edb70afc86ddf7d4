use nalgebra::DVector;
use proptest::prelude::*;
use test_case::test_case;

use crate::assert_approx_eq;
use crate::optimization::param_scaling::*;
use crate::params::{Param, Params};

#[test_case((0.5, 1.0, 0.0); "p below prior")]
#[test_case((1.0, 1.0, 0.0); "p at prior")]
#[test_case((10.0, 1.0, 0.5); "p above prior")]
#[test_case((-1.0, 2.0, -3.0); "negative lb")]
fn test_scaled_log_link_round_trip((p, prior, lb): (f64, f64, f64)) {
    let x = scaled_log_link(p, prior, lb);
    assert_approx_eq!(scaled_log_link_inv(x, prior, lb), p);
}

#[test]
fn test_scaled_log_link_centers_on_prior() {
    assert_approx_eq!(scaled_log_link(3.0, 3.0, 1.0), 0.0);
    assert_approx_eq!(scaled_log_link_inv(0.0, 3.0, 1.0), 3.0);
}

#[test_case(Param::new("a", 1.5), Link::Identity; "unbounded")]
#[test_case(Param::new("a", 1.5).with_lower_bound(1.0), Link::Lower { lb: 1.0, prior: 1.5 }; "lower")]
#[test_case(Param::new("a", 1.5).with_upper_bound(2.0), Link::Upper { ub: 2.0, prior: 1.5 }; "upper")]
fn test_link_selection(param: Param, expected: Link) {
    assert_eq!(Link::for_param(&param), expected);
}

#[test]
fn test_interval_link_selected_for_two_sided_bounds() {
    let link = Link::for_param(&Param::new("a", 0.25).with_bounds(0.0, 1.0));
    assert!(matches!(link, Link::Interval { lb, width, .. } if lb == 0.0 && width == 1.0));
}

#[test]
fn test_scaler_maps_start_to_origin() {
    let params = Params::new(vec![
        Param::new("free", 4.0),
        Param::new("lower", 2.0).with_lower_bound(0.0),
        Param::new("upper", -2.0).with_upper_bound(1.0),
        Param::new("both", 0.9).with_bounds(0.0, 1.0),
    ]);
    let scaler = ParamScaler::from_params(&params);
    assert!(!scaler.is_identity());

    let opt = scaler.model_to_opt(&params.values());
    assert_approx_eq!(opt[0], 4.0);
    assert_approx_eq!(opt[1], 0.0);
    assert_approx_eq!(opt[2], 0.0);
    assert_approx_eq!(opt[3], 0.0);

    let back = scaler.opt_to_model(&opt);
    for (b, v) in back.iter().zip(params.values()) {
        assert_approx_eq!(*b, v);
    }
}

#[test]
fn test_unbounded_scaler_is_identity() {
    let scaler = ParamScaler::from_params(&Params::from_values(&[1.0, -2.0]));
    assert!(scaler.is_identity());
    let opt = DVector::from_vec(vec![3.0, 4.0]);
    assert_eq!(scaler.opt_to_model(&opt), vec![3.0, 4.0]);
    assert_eq!(
        scaler.chain_gradient(&opt, &[1.0, 2.0]),
        DVector::from_vec(vec![1.0, 2.0])
    );
}

#[test_case(1e3; "far above")]
#[test_case(-1e3; "far below")]
fn test_saturated_interval_link_stays_strictly_inside(z: f64) {
    let link = Link::for_param(&Param::new("a", 0.5).with_bounds(0.0, 1.0));
    let x = link.to_model(z);
    assert!(x > 0.0 && x < 1.0, "x={x}");
    assert!(link.to_internal(x).is_finite());
}

#[test]
fn test_saturated_one_sided_links_stay_strictly_inside() {
    let lower = Link::for_param(&Param::new("a", 10.5).with_lower_bound(10.0));
    assert!(lower.to_model(-1e3) > 10.0);

    let upper = Link::for_param(&Param::new("a", -10.5).with_upper_bound(-10.0));
    assert!(upper.to_model(-1e3) < -10.0);
}

#[test]
fn test_start_one_ulp_inside_bounds_has_finite_offset() {
    let near_upper = Param::new("a", 1.0_f64.next_down()).with_bounds(0.0, 1.0);
    let near_lower = Param::new("b", 5e-324).with_bounds(0.0, 1.0);
    for param in [near_upper, near_lower] {
        let link = Link::for_param(&param);
        assert!(matches!(link, Link::Interval { offset, .. } if offset.is_finite()));
        let x = link.to_model(0.0);
        assert!(x > 0.0 && x < 1.0, "{}: x={x}", param.name);
    }
}

#[test_case(0.0, 1.0, 0.0, 5e-324; "on lower")]
#[test_case(0.0, 1.0, 1.0, 1.0 - f64::EPSILON / 2.0; "on upper")]
#[test_case(0.0, 1.0, 0.5, 0.5; "interior untouched")]
#[test_case(2.0, f64::INFINITY, 1.0, 2.0 + 4.0 * f64::EPSILON / 2.0; "below lower only")]
fn test_strictly_inside(lb: f64, ub: f64, x: f64, expected: f64) {
    assert_eq!(strictly_inside(x, lb, ub), expected);
}

fn finite_difference_derivative(link: &Link, z: f64) -> f64 {
    let h = 1e-6;
    (link.to_model(z + h) - link.to_model(z - h)) / (2.0 * h)
}

proptest! {
    /// Model values always stay strictly inside the bounds, whatever the internal value.
    #[test]
    fn prop_interval_link_stays_inside(
        z in -30.0_f64..30.0,
        lb in -10.0_f64..10.0,
        width in 0.1_f64..100.0,
        frac in 0.01_f64..0.99,
    ) {
        let link = Link::for_param(&Param::new("a", lb + frac * width).with_bounds(lb, lb + width));
        let x = link.to_model(z);
        prop_assert!(x > lb && x < lb + width, "x={} outside ({}, {})", x, lb, lb + width);
    }

    #[test]
    fn prop_lower_link_stays_above(z in -30.0_f64..30.0, lb in -10.0_f64..10.0, gap in 0.01_f64..100.0) {
        let link = Link::for_param(&Param::new("a", lb + gap).with_lower_bound(lb));
        prop_assert!(link.to_model(z) > lb);
    }

    #[test]
    fn prop_upper_link_stays_below(z in -30.0_f64..30.0, ub in -10.0_f64..10.0, gap in 0.01_f64..100.0) {
        let link = Link::for_param(&Param::new("a", ub - gap).with_upper_bound(ub));
        prop_assert!(link.to_model(z) < ub);
    }

    /// to_internal inverts to_model away from saturation.
    #[test]
    fn prop_links_round_trip(z in -5.0_f64..5.0, lb in -10.0_f64..10.0, width in 0.5_f64..50.0) {
        let prior = lb + 0.3 * width;
        let links = [
            Link::for_param(&Param::new("a", prior)),
            Link::for_param(&Param::new("a", prior).with_lower_bound(lb)),
            Link::for_param(&Param::new("a", prior).with_upper_bound(lb + width)),
            Link::for_param(&Param::new("a", prior).with_bounds(lb, lb + width)),
        ];
        for link in links {
            let z_back = link.to_internal(link.to_model(z));
            prop_assert!((z_back - z).abs() < 1e-6, "{:?}: z={} z_back={}", link, z, z_back);
        }
    }

    /// The analytic link derivative used for the chain rule matches finite differences.
    #[test]
    fn prop_link_derivative_matches_finite_difference(z in -3.0_f64..3.0, lb in -5.0_f64..5.0, width in 0.5_f64..10.0) {
        let prior = lb + 0.6 * width;
        let links = [
            Link::for_param(&Param::new("a", prior).with_lower_bound(lb)),
            Link::for_param(&Param::new("a", prior).with_upper_bound(lb + width)),
            Link::for_param(&Param::new("a", prior).with_bounds(lb, lb + width)),
        ];
        for link in links {
            let analytic = link.derivative(z);
            let numeric = finite_difference_derivative(&link, z);
            let rel_error = (analytic - numeric).abs() / (analytic.abs() + 1.0);
            prop_assert!(rel_error < 1e-5, "{:?}: analytic={} numeric={}", link, analytic, numeric);
        }
    }
}
