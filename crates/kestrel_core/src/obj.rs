//! Wavefront OBJ loading via tobj.
//!
//! Each OBJ object/group becomes one [`ObjSubmesh`]. MTL materials are
//! converted to [`MaterialDesc`] hints; the common PBR extension keys
//! (`Pm`, `Pr`, `Ps`, `Pc`, `Pcr`) are honoured when present.

use std::io::BufReader;
use std::path::Path;

use kestrel_math::{Vec2, Vec3};
use thiserror::Error;

use crate::material::MaterialDesc;
use crate::mesh::Mesh;

/// Errors that can occur during OBJ loading.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OBJ parse error: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("No geometry found in OBJ file")]
    NoGeometry,

    #[error("Invalid mesh '{name}': {reason}")]
    InvalidMesh { name: String, reason: String },
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// One object or group of an OBJ file.
#[derive(Clone, Debug)]
pub struct ObjSubmesh {
    pub name: String,
    pub mesh: Mesh,
    /// Index into [`ObjAsset::materials`]
    pub material: Option<usize>,
}

/// Everything read from an OBJ file and its material library.
#[derive(Clone, Debug, Default)]
pub struct ObjAsset {
    pub submeshes: Vec<ObjSubmesh>,
    pub materials: Vec<MaterialDesc>,
}

impl ObjAsset {
    /// Material hints for a submesh, falling back to the default grey.
    pub fn material_for(&self, submesh: &ObjSubmesh) -> MaterialDesc {
        submesh
            .material
            .and_then(|id| self.materials.get(id))
            .cloned()
            .unwrap_or_default()
    }

    pub fn triangle_count(&self) -> usize {
        self.submeshes.iter().map(|s| s.mesh.triangle_count()).sum()
    }
}

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        single_index: true,
        triangulate: true,
        ..Default::default()
    }
}

/// Load an OBJ file and the MTL libraries it references.
pub fn load_obj(path: impl AsRef<Path>) -> LoadResult<ObjAsset> {
    let path = path.as_ref();
    // surface a missing file as an IO error rather than a parse failure
    std::fs::metadata(path)?;

    log::info!("Loading OBJ: {}", path.display());
    let (models, materials) = tobj::load_obj(path, &load_options())?;
    let materials = materials.unwrap_or_else(|err| {
        log::warn!("Failed to load MTL for {}: {}", path.display(), err);
        Vec::new()
    });

    convert(models, materials)
}

/// Parse OBJ text held in memory. `mtllib` statements are ignored.
pub fn load_obj_from_str(source: &str) -> LoadResult<ObjAsset> {
    let mut reader = BufReader::new(source.as_bytes());
    let (models, _) = tobj::load_obj_buf(&mut reader, &load_options(), |_| {
        Err(tobj::LoadError::OpenFileFailed)
    })?;

    convert(models, Vec::new())
}

fn convert(models: Vec<tobj::Model>, materials: Vec<tobj::Material>) -> LoadResult<ObjAsset> {
    let materials: Vec<MaterialDesc> = materials.iter().map(convert_material).collect();

    let mut submeshes = Vec::with_capacity(models.len());
    for model in models {
        if model.mesh.indices.is_empty() {
            log::debug!("Skipping empty OBJ object '{}'", model.name);
            continue;
        }
        let mesh = convert_mesh(&model.name, &model.mesh)?;
        submeshes.push(ObjSubmesh {
            name: model.name,
            mesh,
            material: model.mesh.material_id,
        });
    }

    if submeshes.is_empty() {
        return Err(LoadError::NoGeometry);
    }

    let asset = ObjAsset {
        submeshes,
        materials,
    };
    log::info!(
        "Loaded {} submeshes, {} triangles, {} materials",
        asset.submeshes.len(),
        asset.triangle_count(),
        asset.materials.len()
    );
    Ok(asset)
}

fn convert_mesh(name: &str, src: &tobj::Mesh) -> LoadResult<Mesh> {
    let positions: Vec<Vec3> = src
        .positions
        .chunks_exact(3)
        .map(|p| Vec3::new(p[0], p[1], p[2]))
        .collect();

    let normals = if src.normals.len() == src.positions.len() {
        Some(
            src.normals
                .chunks_exact(3)
                .map(|n| Vec3::new(n[0], n[1], n[2]))
                .collect(),
        )
    } else {
        None
    };

    let mut mesh = Mesh::new(positions, src.indices.clone(), normals);
    if src.texcoords.len() / 2 == mesh.vertex_count() && !src.texcoords.is_empty() {
        mesh = mesh.with_uvs(
            src.texcoords
                .chunks_exact(2)
                .map(|t| Vec2::new(t[0], t[1]))
                .collect(),
        );
    }

    mesh.validate().map_err(|reason| LoadError::InvalidMesh {
        name: name.to_string(),
        reason,
    })?;

    if !mesh.has_normals() {
        log::warn!("OBJ object '{}' has no normals, computing smooth normals", name);
        mesh.compute_normals();
    }

    Ok(mesh)
}

fn convert_material(src: &tobj::Material) -> MaterialDesc {
    let mut desc = MaterialDesc::new(src.name.clone(), Vec3::new(0.5, 0.5, 0.5));

    if let Some([r, g, b]) = src.diffuse {
        desc.diffuse_color = Vec3::new(r, g, b);
    }
    if let Some(ns) = src.shininess {
        desc.roughness = MaterialDesc::roughness_from_shininess(ns);
    }
    if let Some(ks) = src.specular {
        desc.specular = ks[0].max(ks[1]).max(ks[2]).clamp(0.0, 1.0);
    }
    if let Some(d) = src.dissolve {
        desc.transmission = (1.0 - d).clamp(0.0, 1.0);
    }
    if let Some(ni) = src.optical_density {
        if ni > 0.0 {
            desc.ior = ni;
        }
    }

    let param = |key: &str| {
        src.unknown_param
            .get(key)
            .and_then(|v| v.trim().parse::<f32>().ok())
    };
    if let Some(v) = param("Pm") {
        desc.metallic = v;
    }
    if let Some(v) = param("Pr") {
        desc.roughness = v;
    }
    if let Some(v) = param("Ps") {
        desc.sheen = v;
    }
    if let Some(v) = param("Pc") {
        desc.clearcoat = v;
    }
    if let Some(v) = param("Pcr") {
        desc.clearcoat_gloss = 1.0 - v;
    }

    desc
}
