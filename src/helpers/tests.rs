use super::linalg::*;
use super::seeds::derive_seed;
use super::stats::*;
use super::test_helpers::assert_array_all_close;
use crate::error::SelectionError;
use ndarray::{array, Array1, Array2};

#[test]
fn cholesky_works() {
    let mat = array![[4., 12., -16.], [12., 37., -43.], [-16., -43., 98.]];
    let res = cholesky_factorization(mat.view()).unwrap();
    let ans = array![[2., 0., 0.], [6., 1., 0.], [-8., 5., 3.]];
    assert_eq!(res, ans);
}

#[test]
fn cholesky_returns_error() {
    let mat = Array2::<f64>::zeros((3, 3));
    match cholesky_factorization(mat.view()) {
        Err(SelectionError::SingularDesign { rank_hint, n_columns }) => {
            assert_eq!(rank_hint, 0);
            assert_eq!(n_columns, 3);
        }
        other => panic!("Should return a singular design error, got {:?}", other),
    }
}

#[test]
fn cholesky_detects_collinear_columns() {
    // X = [a, 2a] has rank one
    let X = array![[1., 2.], [2., 4.], [3., 6.]];
    let XtX = X.t().dot(&X);
    assert!(matches!(
        cholesky_factorization(XtX.view()),
        Err(SelectionError::SingularDesign { rank_hint: 1, .. })
    ));
}

#[test]
fn cholesky_positive_definite_keeps_small_pivots() {
    // smallest eigenvalue ~1e-3 against a diagonal of ~4e8
    let mat: Array2<f64> = array![[1e8, 2e8], [2e8, 4e8 + 1e-3]];
    assert!(matches!(
        cholesky_factorization(mat.view()),
        Err(SelectionError::SingularDesign { rank_hint: 1, .. })
    ));
    let L = cholesky_positive_definite(mat.view()).unwrap();
    for (a, b) in L.dot(&L.t()).iter().zip(mat.iter()) {
        assert!((a - b).abs() < 1e-6);
    }

    let zeros = Array2::<f64>::zeros((2, 2));
    assert!(matches!(
        cholesky_positive_definite(zeros.view()),
        Err(SelectionError::SingularDesign { rank_hint: 0, .. })
    ));
}

#[test]
fn forward_substitution_works() {
    let mat = array![[3., 0., 0.], [1., 2., 0.], [-3., 42., 12.]];
    let b = Array1::<f64>::ones(3);
    let res = forward_substitution(mat.view(), b.view());
    let ans = array![0.333333, 0.333333, -1.];
    assert_array_all_close(res.view(), ans.view(), 1e-5);
}

#[test]
fn backward_substitution_works() {
    // solves L^T x = b with L^T = [[3, 2, 1], [0, 1, 1], [0, 0, 2]]
    let mat = array![[3., 0., 0.], [2., 1., 0.], [1., 1., 2.]];
    let b = array![1., 2., 3.];
    let res = backward_substitution(mat.view(), b.view());
    let ans = array![-0.5, 0.5, 1.5];
    assert_array_all_close(res.view(), ans.view(), 1e-12);
}

#[test]
fn cholesky_solve_works() {
    let mat = array![[26., 8., 15.], [8., 14., 5.], [15., 5., 14.]];
    let L = cholesky_factorization(mat.view()).unwrap();
    let b = Array1::<f64>::ones(3);
    let res = cholesky_solve(L.view(), b.view());
    let ans = array![-0.0225, 0.0575, 0.075];
    assert_array_all_close(res.view(), ans.view(), 1e-10);
}

#[test]
fn log_sum_exp_works() {
    let x = array![0., 3f64.ln()];
    assert!((log_sum_exp(x.view()) - 4f64.ln()).abs() < 1e-12);

    let large = array![1000f64, 1000.];
    assert!((log_sum_exp(large.view()) - (1000. + 2f64.ln())).abs() < 1e-9);

    let empty = Array1::<f64>::zeros(0);
    assert_eq!(log_sum_exp(empty.view()), f64::NEG_INFINITY);
}

#[test]
fn moments_work() {
    let x = array![1f64, 2., 3., 4.];
    assert_eq!(mean(x.view()), 2.5);
    assert!((sample_variance(x.view()) - 5. / 3.).abs() < 1e-12);
    assert!(sample_variance::<f64>(array![1.].view()).is_nan());
    assert!(mean(Array1::<f64>::zeros(0).view()).is_nan());
}

#[test]
fn median_works() {
    assert_eq!(median(array![3., 1., 2.].view()), 2.);
    assert_eq!(median(array![4., 1., 3., 2.].view()), 2.5);
}

#[test]
fn argsort_by_works() {
    let x = array![0.3, -1., 2., 0.];
    let order = argsort_by(&x, |a: &f64, b| a.partial_cmp(b).unwrap());
    assert_eq!(order, vec![1, 3, 0, 2]);
}

#[test]
fn derive_seed_is_stable() {
    assert_eq!(derive_seed(42, 3, 7), derive_seed(42, 3, 7));
    assert_ne!(derive_seed(42, 3, 7), derive_seed(42, 7, 3));
    assert_ne!(derive_seed(42, 0, 0), derive_seed(43, 0, 0));
    assert_ne!(derive_seed(0, 0, 1), derive_seed(0, 1, 0));
}
