pub mod artifact;
pub mod matrix;
