pub mod curves;
pub mod intersection;
pub mod point;
pub mod surfaces;
pub mod transform;
pub mod vector;
