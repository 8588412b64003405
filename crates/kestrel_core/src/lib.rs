//! Kestrel Core - geometry and material hints consumed by the renderer.
//!
//! This crate provides:
//!
//! - **Mesh data**: `Mesh` with positions, optional normals/UVs and triangle
//!   indices, plus procedural quads and spheres for test scenes
//! - **Material hints**: `MaterialDesc`, a principled parameter set parsed
//!   from MTL files or written by hand
//! - **OBJ loading**: `load_obj` via tobj
//!
//! # Example
//!
//! ```ignore
//! use kestrel_core::load_obj;
//!
//! let asset = load_obj("bunny.obj")?;
//! for sub in &asset.submeshes {
//!     println!("{}: {} triangles", sub.name, sub.mesh.triangle_count());
//! }
//! ```

pub mod material;
pub mod mesh;
pub mod obj;
pub mod transform;

// Re-export commonly used types
pub use material::MaterialDesc;
pub use mesh::Mesh;
pub use obj::{load_obj, load_obj_from_str, LoadError, LoadResult, ObjAsset, ObjSubmesh};
pub use transform::Transform;
