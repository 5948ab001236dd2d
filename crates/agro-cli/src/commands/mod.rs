pub mod bmp;
pub mod goal;
pub mod solvers;
