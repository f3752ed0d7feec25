//! Numeric helpers shared by the fitting code.

pub mod lstsq;
pub mod matrix_convert;

pub use lstsq::{lstsq, LstsqSolution};
pub use matrix_convert::{
    nalgebra_to_ndarray, nalgebra_vec_to_ndarray, ndarray_to_nalgebra, ndarray_vec_to_nalgebra,
};
