pub mod shape;
pub mod transform;
