//! Algorithms driven directly by the storage layer.

pub mod color_array;
pub mod triangles;

pub use color_array::ColorArray;
pub use triangles::{
    count_triangles, stream_triangles, Triangle, TriangleCountConfig, TriangleCountResult,
    TriangleStream,
};
