//! Batched f-wave solver.
//!
//! Same formula as [`fwave_normal`](crate::flux::fwave_normal), evaluated
//! for a whole tensor of edges at once. Tensors hold one entry per edge
//! and all inputs of a call share one shape.

use burn::prelude::*;

/// Waves slower than this are treated as stationary.
const ZERO_SPEED_TOL: f64 = 1e-12;

/// Edge states in edge-normal coordinates: (h, h·u_n, h·u_t) and bed.
#[derive(Clone, Debug)]
pub struct NormalStates<B: Backend> {
    pub h: Tensor<B, 2>,
    pub hn: Tensor<B, 2>,
    pub ht: Tensor<B, 2>,
    pub b: Tensor<B, 2>,
}

/// Net updates of a batch of edges, in edge-normal coordinates.
#[derive(Clone, Debug)]
pub struct BatchedUpdates<B: Backend> {
    /// (h, h·u_n, h·u_t) applied to the left cells
    pub left: [Tensor<B, 2>; 3],
    /// (h, h·u_n, h·u_t) applied to the right cells
    pub right: [Tensor<B, 2>; 3],
    /// Largest |wave speed| per edge
    pub speed: Tensor<B, 2>,
}

/// F-wave net updates for every edge of a batch.
///
/// A dry side whose bed lies below the wet surface is flooded with the
/// hydrostatic HLL flux of [`fwave_normal`](crate::flux::fwave_normal).
/// Any other dry side is replaced by the mirror of its wet neighbour and
/// its own update is zeroed. Edges dry on both sides produce no update and
/// no speed.
pub fn fwave_batched<B: Backend>(
    l: &NormalStates<B>,
    r: &NormalStates<B>,
    g: f64,
    dry_tol: f64,
) -> BatchedUpdates<B> {
    let left_dry = l.h.clone().lower_elem(dry_tol);
    let right_dry = r.h.clone().lower_elem(dry_tol);
    let left_dry_f = left_dry.clone().float();
    let right_dry_f = right_dry.clone().float();
    let both_dry_f = left_dry_f.clone().mul(right_dry_f.clone());
    let both_dry = both_dry_f.clone().greater_elem(0.5);

    // One side dry with its bed below the wet surface
    let left_floods = l.b.clone().lower(r.h.clone().add(r.b.clone())).float();
    let right_floods = r.b.clone().lower(l.h.clone().add(l.b.clone())).float();
    let flooding = left_dry_f
        .clone()
        .mul(left_floods)
        .add(right_dry_f.clone().mul(right_floods))
        .mul(both_dry_f.clone().neg().add_scalar(1.0))
        .greater_elem(0.5);
    let flooded = hydrostatic_hll_batched(l, r, left_dry.clone(), right_dry.clone(), g);

    // Mirror the wet side into the dry side
    let h_l = l.h.clone().mask_where(left_dry.clone(), r.h.clone());
    let hn_l = l.hn.clone().mask_where(left_dry.clone(), r.hn.clone().neg());
    let ht_l = l.ht.clone().mask_where(left_dry.clone(), r.ht.clone());
    let b_l = l.b.clone().mask_where(left_dry, r.b.clone());

    let h_r = r.h.clone().mask_where(right_dry.clone(), l.h.clone());
    let hn_r = r.hn.clone().mask_where(right_dry.clone(), l.hn.clone().neg());
    let ht_r = r.ht.clone().mask_where(right_dry.clone(), l.ht.clone());
    let b_r = r.b.clone().mask_where(right_dry, l.b.clone());

    // Fully dry edges: any positive height keeps the arithmetic finite
    let h_l = h_l.mask_fill(both_dry.clone(), 1.0);
    let h_r = h_r.mask_fill(both_dry, 1.0);

    let u_l = hn_l.clone().div(h_l.clone());
    let u_r = hn_r.clone().div(h_r.clone());
    let v_l = ht_l.div(h_l.clone());
    let v_r = ht_r.div(h_r.clone());

    // Roe averages
    let sqrt_h_l = h_l.clone().sqrt();
    let sqrt_h_r = h_r.clone().sqrt();
    let inv_sum = sqrt_h_l.clone().add(sqrt_h_r.clone()).recip();
    let u_hat = u_l
        .clone()
        .mul(sqrt_h_l.clone())
        .add(u_r.clone().mul(sqrt_h_r.clone()))
        .mul(inv_sum.clone());
    let v_hat = v_l
        .clone()
        .mul(sqrt_h_l)
        .add(v_r.clone().mul(sqrt_h_r))
        .mul(inv_sum);
    let h_mean = h_l.clone().add(h_r.clone()).mul_scalar(0.5);
    let c_hat = h_mean.clone().mul_scalar(g).sqrt();

    let s1 = u_hat.clone().sub(c_hat.clone());
    let s3 = u_hat.clone().add(c_hat);

    // Flux jump including the bathymetry source, momentum in surface form
    let eta_jump = h_r.add(b_r).sub(h_l.add(b_l));
    let df0 = hn_r.clone().sub(hn_l.clone());
    let df1 = hn_r
        .clone()
        .mul(u_r.clone())
        .sub(hn_l.clone().mul(u_l.clone()))
        .add(h_mean.mul_scalar(g).mul(eta_jump));
    let df2 = hn_r.mul(v_r).sub(hn_l.mul(v_l));

    let inv_gap = s3.clone().sub(s1.clone()).recip();
    let beta1 = s3
        .clone()
        .mul(df0.clone())
        .sub(df1.clone())
        .mul(inv_gap.clone());
    let beta3 = df1.sub(s1.clone().mul(df0.clone())).mul(inv_gap);
    let beta2 = df2.sub(v_hat.clone().mul(df0));

    let waves = [
        (
            s1.clone(),
            [beta1.clone(), beta1.clone().mul(s1.clone()), beta1.mul(v_hat.clone())],
        ),
        (
            u_hat,
            [beta2.zeros_like(), beta2.zeros_like(), beta2],
        ),
        (
            s3.clone(),
            [beta3.clone(), beta3.clone().mul(s3.clone()), beta3.mul(v_hat)],
        ),
    ];

    let keep_left = left_dry_f.neg().add_scalar(1.0);
    let keep_right = right_dry_f.neg().add_scalar(1.0);

    let mut left: [Tensor<B, 2>; 3] = [s1.zeros_like(), s1.zeros_like(), s1.zeros_like()];
    let mut right: [Tensor<B, 2>; 3] = [s1.zeros_like(), s1.zeros_like(), s1.zeros_like()];
    for (speed, wave) in waves {
        let (to_left, to_right) = route_weights(speed);
        for (k, component) in wave.into_iter().enumerate() {
            left[k] = left[k].clone().add(component.clone().mul(to_left.clone()));
            right[k] = right[k].clone().add(component.mul(to_right.clone()));
        }
    }
    let left = left.map(|t| t.mul(keep_left.clone()));
    let right = right.map(|t| t.mul(keep_right.clone()));

    let speed = s1
        .abs()
        .max_pair(s3.abs())
        .mul(both_dry_f.neg().add_scalar(1.0));

    BatchedUpdates {
        left: select(&flooding, left, flooded.left),
        right: select(&flooding, right, flooded.right),
        speed: speed.mask_where(flooding, flooded.speed),
    }
}

/// `over` where `mask` is set, `base` elsewhere.
fn select<B: Backend>(
    mask: &Tensor<B, 2, Bool>,
    base: [Tensor<B, 2>; 3],
    over: [Tensor<B, 2>; 3],
) -> [Tensor<B, 2>; 3] {
    let [a0, a1, a2] = base;
    let [b0, b1, b2] = over;
    [
        a0.mask_where(mask.clone(), b0),
        a1.mask_where(mask.clone(), b1),
        a2.mask_where(mask.clone(), b2),
    ]
}

fn physical_flux<B: Backend>(h: &Tensor<B, 2>, u: &Tensor<B, 2>, v: &Tensor<B, 2>, g: f64) -> [Tensor<B, 2>; 3] {
    let hu = h.clone().mul(u.clone());
    [
        hu.clone(),
        hu.clone().mul(u.clone()).add(h.clone().mul(h.clone()).mul_scalar(0.5 * g)),
        hu.mul(v.clone()),
    ]
}

/// Hydrostatic HLL updates of every edge, the batched form of the
/// flooding branch of the scalar solver. Entries of edges that do not
/// flood are finite but meaningless and must be masked out by the caller.
fn hydrostatic_hll_batched<B: Backend>(
    l: &NormalStates<B>,
    r: &NormalStates<B>,
    left_dry: Tensor<B, 2, Bool>,
    right_dry: Tensor<B, 2, Bool>,
    g: f64,
) -> BatchedUpdates<B> {
    let velocity = |q: &Tensor<B, 2>, h: &Tensor<B, 2>, dry: &Tensor<B, 2, Bool>| {
        let safe_h = h.clone().mask_fill(dry.clone(), 1.0);
        q.clone().div(safe_h).mask_fill(dry.clone(), 0.0)
    };
    let u_l = velocity(&l.hn, &l.h, &left_dry);
    let v_l = velocity(&l.ht, &l.h, &left_dry);
    let u_r = velocity(&r.hn, &r.h, &right_dry);
    let v_r = velocity(&r.ht, &r.h, &right_dry);

    let b_star = l.b.clone().max_pair(r.b.clone());
    let h_l_star = l.h.clone().add(l.b.clone()).sub(b_star.clone()).clamp_min(0.0);
    let h_r_star = r.h.clone().add(r.b.clone()).sub(b_star).clamp_min(0.0);
    let c_l = h_l_star.clone().mul_scalar(g).sqrt();
    let c_r = h_r_star.clone().mul_scalar(g).sqrt();

    let s_l = u_l
        .clone()
        .sub(c_l.clone())
        .min_pair(u_r.clone().sub(c_r.clone()));
    let s_r = u_l
        .clone()
        .add(c_l.clone())
        .max_pair(u_r.clone().add(c_r.clone()));
    // Dry-front speeds
    let s_r = s_r
        .clone()
        .mask_where(right_dry, s_r.max_pair(u_l.clone().add(c_l.mul_scalar(2.0))));
    let s_l = s_l
        .clone()
        .mask_where(left_dry, s_l.min_pair(u_r.clone().sub(c_r.mul_scalar(2.0))));

    let f_l_star = physical_flux(&h_l_star, &u_l, &v_l, g);
    let f_r_star = physical_flux(&h_r_star, &u_r, &v_r, g);
    let q_l_star = [h_l_star.clone(), h_l_star.clone().mul(u_l.clone()), h_l_star.clone().mul(v_l.clone())];
    let q_r_star = [h_r_star.clone(), h_r_star.clone().mul(u_r.clone()), h_r_star.clone().mul(v_r.clone())];

    let inv_gap = s_r.clone().sub(s_l.clone()).clamp_min(f64::MIN_POSITIVE).recip();
    let s_lr = s_l.clone().mul(s_r.clone());
    let upwind_left = s_l.clone().greater_equal_elem(0.0);
    let upwind_right = s_r.clone().lower_equal_elem(0.0);

    let flux = [0, 1, 2].map(|k| {
        let central = s_r
            .clone()
            .mul(f_l_star[k].clone())
            .sub(s_l.clone().mul(f_r_star[k].clone()))
            .add(s_lr.clone().mul(q_r_star[k].clone().sub(q_l_star[k].clone())))
            .mul(inv_gap.clone());
        central
            .mask_where(upwind_right.clone(), f_r_star[k].clone())
            .mask_where(upwind_left.clone(), f_l_star[k].clone())
    });

    let pressure = |h: &Tensor<B, 2>, h_star: Tensor<B, 2>| {
        h.clone()
            .mul(h.clone())
            .sub(h_star.clone().mul(h_star))
            .mul_scalar(0.5 * g)
    };
    let f_l = physical_flux(&l.h, &u_l, &v_l, g);
    let f_r = physical_flux(&r.h, &u_r, &v_r, g);
    let g_minus_1 = flux[1].clone().add(pressure(&l.h, h_l_star));
    let g_plus_1 = flux[1].clone().add(pressure(&r.h, h_r_star));

    let [f_l0, f_l1, f_l2] = f_l;
    let [f_r0, f_r1, f_r2] = f_r;
    let left = [
        flux[0].clone().sub(f_l0),
        g_minus_1.sub(f_l1),
        flux[2].clone().sub(f_l2),
    ];
    let right = [
        f_r0.sub(flux[0].clone()),
        f_r1.sub(g_plus_1),
        f_r2.sub(flux[2].clone()),
    ];

    BatchedUpdates {
        left,
        right,
        speed: s_l.abs().max_pair(s_r.abs()),
    }
}

/// Share of each wave sent left and right: negative speeds go left,
/// positive speeds right, stationary waves are split evenly.
fn route_weights<B: Backend>(speed: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
    let neg = speed.clone().lower_elem(-ZERO_SPEED_TOL).float();
    let pos = speed.greater_elem(ZERO_SPEED_TOL).float();
    let half_zero = neg.clone().add(pos.clone()).neg().add_scalar(1.0).mul_scalar(0.5);
    (neg.add(half_zero.clone()), pos.add(half_zero))
}

#[cfg(all(test, feature = "burn-ndarray"))]
mod tests {
    use super::*;
    use crate::flux::fwave_normal;
    use crate::solver::burn::backend::{tensor_from_slice, tensor_to_vec};
    use crate::state::SWEState2D;
    use burn_ndarray::{NdArray, NdArrayDevice};

    type B = NdArray<f64>;

    const G: f64 = 9.81;
    const DRY: f64 = 1e-3;

    fn states(q: &[SWEState2D], b: &[f64]) -> NormalStates<B> {
        let device = NdArrayDevice::Cpu;
        let shape = [1, q.len()];
        let col = |f: fn(&SWEState2D) -> f64| q.iter().map(f).collect::<Vec<_>>();
        NormalStates {
            h: tensor_from_slice(&col(|q| q.h), shape, &device).unwrap(),
            hn: tensor_from_slice(&col(|q| q.hu), shape, &device).unwrap(),
            ht: tensor_from_slice(&col(|q| q.hv), shape, &device).unwrap(),
            b: tensor_from_slice(b, shape, &device).unwrap(),
        }
    }

    #[test]
    fn test_matches_scalar_solver() {
        let left = [
            SWEState2D::new(3.0, 1.2, -0.4),
            SWEState2D::new(5.0, 0.0, 0.0),
            SWEState2D::new(0.0, 0.0, 0.0),
            SWEState2D::new(2.0, 0.7, 0.3),
            SWEState2D::new(0.0, 0.0, 0.0),
            SWEState2D::new(1.0, 3.13, 0.0),
            // flooding edges
            SWEState2D::new(1.0, 0.4, 0.1),
            SWEState2D::new(DRY * 0.5, 0.0, 0.0),
        ];
        let right = [
            SWEState2D::new(2.0, -0.5, 0.8),
            SWEState2D::new(2.5, 0.0, 0.0),
            SWEState2D::new(1.5, -0.3, 0.2),
            SWEState2D::new(0.0, 0.0, 0.0),
            SWEState2D::new(0.0, 0.0, 0.0),
            SWEState2D::new(1.0, 3.13, 0.0),
            SWEState2D::new(0.0, 0.0, 0.0),
            SWEState2D::new(0.8, -0.3, 0.2),
        ];
        let b_l = [0.0, -4.0, 1.0, -2.0, 0.0, 0.0, 0.0, 0.5];
        let b_r = [0.0, -1.5, -1.5, 0.5, 0.0, 0.0, -0.5, 0.2];

        let out = fwave_batched(&states(&left, &b_l), &states(&right, &b_r), G, DRY);
        let l: Vec<Vec<f64>> = out.left.into_iter().map(|t| tensor_to_vec(t).unwrap()).collect();
        let r: Vec<Vec<f64>> = out.right.into_iter().map(|t| tensor_to_vec(t).unwrap()).collect();
        let speed = tensor_to_vec(out.speed).unwrap();

        for k in 0..left.len() {
            let expected = fwave_normal(&left[k], &right[k], b_l[k], b_r[k], G, DRY);
            let got_l = [l[0][k], l[1][k], l[2][k]];
            let got_r = [r[0][k], r[1][k], r[2][k]];
            for c in 0..3 {
                assert!((got_l[c] - expected.left.to_array()[c]).abs() < 1e-10, "edge {k} left {c}");
                assert!((got_r[c] - expected.right.to_array()[c]).abs() < 1e-10, "edge {k} right {c}");
            }
            assert!((speed[k] - expected.max_speed).abs() < 1e-10, "edge {k} speed");
        }
    }
}
