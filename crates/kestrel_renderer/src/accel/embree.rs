//! Intel Embree 4 backend.
//!
//! Manual FFI for the handful of calls a two-level instanced scene needs.
//! Each geometry collection becomes one Embree scene with its geometries
//! attached in order, and each instance becomes an instance geometry in
//! the top-level scene, so Embree's geometry and instance ids line up with
//! the scene's own indices.

use std::ffi::{c_char, c_void};

use kestrel_math::{Aabb, Vec3};

use super::{Hit, Intersector};
use crate::error::SceneError;
use crate::ray::Ray;
use crate::scene::{GeometryCollection, Instance};

#[allow(non_camel_case_types)]
type RTCDevice = *mut c_void;
#[allow(non_camel_case_types)]
type RTCScene = *mut c_void;
#[allow(non_camel_case_types)]
type RTCGeometry = *mut c_void;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum RTCGeometryType {
    Triangle = 0,
    Instance = 121,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum RTCBufferType {
    Index = 0,
    Vertex = 1,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum RTCFormat {
    UInt3 = 0x5003,
    Float3 = 0x9003,
    Float4x4ColumnMajor = 0x9244,
}

#[repr(C, align(16))]
#[derive(Debug, Copy, Clone)]
struct RTCRay {
    org_x: f32,
    org_y: f32,
    org_z: f32,
    tnear: f32,

    dir_x: f32,
    dir_y: f32,
    dir_z: f32,
    time: f32,

    tfar: f32,
    mask: u32,
    id: u32,
    flags: u32,
}

#[repr(C, align(16))]
#[derive(Debug, Copy, Clone)]
struct RTCHit {
    ng_x: f32,
    ng_y: f32,
    ng_z: f32,

    u: f32,
    v: f32,

    prim_id: u32,
    geom_id: u32,
    inst_id: [u32; 1],
}

#[repr(C, align(16))]
#[derive(Debug, Copy, Clone)]
struct RTCRayHit {
    ray: RTCRay,
    hit: RTCHit,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default)]
struct RTCBounds {
    lower_x: f32,
    lower_y: f32,
    lower_z: f32,
    align0: f32,

    upper_x: f32,
    upper_y: f32,
    upper_z: f32,
    align1: f32,
}

const RTC_INVALID_GEOMETRY_ID: u32 = 0xFFFF_FFFF;

#[link(name = "embree4")]
extern "C" {
    fn rtcNewDevice(config: *const c_char) -> RTCDevice;
    fn rtcReleaseDevice(device: RTCDevice);
    fn rtcGetDeviceError(device: RTCDevice) -> i32;

    fn rtcNewScene(device: RTCDevice) -> RTCScene;
    fn rtcReleaseScene(scene: RTCScene);
    fn rtcCommitScene(scene: RTCScene);
    fn rtcGetSceneBounds(scene: RTCScene, bounds: *mut RTCBounds);

    fn rtcNewGeometry(device: RTCDevice, geom_type: RTCGeometryType) -> RTCGeometry;
    fn rtcReleaseGeometry(geom: RTCGeometry);
    fn rtcCommitGeometry(geom: RTCGeometry);
    fn rtcAttachGeometry(scene: RTCScene, geom: RTCGeometry) -> u32;

    fn rtcSetSharedGeometryBuffer(
        geom: RTCGeometry,
        buffer_type: u32,
        slot: u32,
        format: u32,
        ptr: *const c_void,
        byte_offset: usize,
        byte_stride: usize,
        item_count: usize,
    );

    fn rtcSetGeometryInstancedScene(geom: RTCGeometry, scene: RTCScene);
    fn rtcSetGeometryTransform(geom: RTCGeometry, time_step: u32, format: u32, xfm: *const f32);

    fn rtcIntersect1(scene: RTCScene, rayhit: *mut RTCRayHit, args: *const c_void);
    fn rtcOccluded1(scene: RTCScene, ray: *mut RTCRay, args: *const c_void);
}

fn error_name(code: i32) -> &'static str {
    match code {
        1 => "RTC_ERROR_UNKNOWN",
        2 => "RTC_ERROR_INVALID_ARGUMENT",
        3 => "RTC_ERROR_INVALID_OPERATION",
        4 => "RTC_ERROR_OUT_OF_MEMORY",
        5 => "RTC_ERROR_UNSUPPORTED_CPU",
        6 => "RTC_ERROR_CANCELLED",
        _ => "RTC_ERROR_UNRECOGNIZED",
    }
}

/// Turn the device's sticky error code into a `SceneError`.
///
/// # Safety
/// `device` must be a live Embree device.
unsafe fn check(device: RTCDevice, stage: &str) -> Result<(), SceneError> {
    let code = rtcGetDeviceError(device);
    if code == 0 {
        Ok(())
    } else {
        Err(SceneError::Device(format!("{} while {}", error_name(code), stage)))
    }
}

impl RTCRay {
    fn from_ray(ray: &Ray) -> Self {
        Self {
            org_x: ray.origin.x,
            org_y: ray.origin.y,
            org_z: ray.origin.z,
            tnear: ray.t_min,

            dir_x: ray.direction.x,
            dir_y: ray.direction.y,
            dir_z: ray.direction.z,
            time: ray.time,

            tfar: ray.t_max,
            mask: 0xFFFF_FFFF,
            id: 0,
            flags: 0,
        }
    }
}

impl RTCRayHit {
    fn from_ray(ray: &Ray) -> Self {
        Self {
            ray: RTCRay::from_ray(ray),
            hit: RTCHit {
                ng_x: 0.0,
                ng_y: 0.0,
                ng_z: 0.0,
                u: 0.0,
                v: 0.0,
                prim_id: RTC_INVALID_GEOMETRY_ID,
                geom_id: RTC_INVALID_GEOMETRY_ID,
                inst_id: [RTC_INVALID_GEOMETRY_ID],
            },
        }
    }
}

/// Vertex and index data Embree reads in place.
struct SharedBuffers {
    // one padding float so Embree's 16-byte loads stay in bounds
    vertices: Vec<f32>,
    indices: Vec<u32>,
}

/// Embree-backed [`Intersector`].
pub struct EmbreeIntersector {
    device: RTCDevice,
    scene: RTCScene,
    /// One per collection; instances reference them
    collection_scenes: Vec<RTCScene>,
    _buffers: Vec<SharedBuffers>,
    _transforms: Vec<[f32; 16]>,
}

impl EmbreeIntersector {
    pub fn new(collections: &[GeometryCollection], instances: &[Instance]) -> Result<Self, SceneError> {
        // SAFETY: every handle is checked before use and owned by `Self`
        // (or released on the error path through `Drop`) once created.
        unsafe {
            let device = rtcNewDevice(std::ptr::null());
            if device.is_null() {
                return Err(SceneError::Device("rtcNewDevice returned null".to_string()));
            }

            let scene = rtcNewScene(device);
            let mut this = Self {
                device,
                scene,
                collection_scenes: Vec::with_capacity(collections.len()),
                _buffers: Vec::new(),
                _transforms: instances.iter().map(|inst| inst.transform.to_cols_array()).collect(),
            };
            if scene.is_null() {
                return Err(SceneError::Device("rtcNewScene returned null".to_string()));
            }

            for collection in collections {
                let collection_scene = rtcNewScene(device);
                if collection_scene.is_null() {
                    return Err(SceneError::Device(format!(
                        "could not create a scene for collection '{}'",
                        collection.name
                    )));
                }
                this.collection_scenes.push(collection_scene);

                for geometry in &collection.geometries {
                    let mesh = &geometry.mesh;
                    let mut vertices: Vec<f32> = mesh.positions.iter().flat_map(|p| [p.x, p.y, p.z]).collect();
                    vertices.push(0.0);
                    let buffers = SharedBuffers {
                        vertices,
                        indices: mesh.indices.clone(),
                    };

                    let geom = rtcNewGeometry(device, RTCGeometryType::Triangle);
                    if geom.is_null() {
                        return Err(SceneError::Device("rtcNewGeometry returned null".to_string()));
                    }
                    rtcSetSharedGeometryBuffer(
                        geom,
                        RTCBufferType::Vertex as u32,
                        0,
                        RTCFormat::Float3 as u32,
                        buffers.vertices.as_ptr() as *const c_void,
                        0,
                        12,
                        mesh.positions.len(),
                    );
                    rtcSetSharedGeometryBuffer(
                        geom,
                        RTCBufferType::Index as u32,
                        0,
                        RTCFormat::UInt3 as u32,
                        buffers.indices.as_ptr() as *const c_void,
                        0,
                        12,
                        mesh.triangle_count(),
                    );
                    rtcCommitGeometry(geom);
                    rtcAttachGeometry(collection_scene, geom);
                    rtcReleaseGeometry(geom);
                    // the Vec's heap storage does not move when pushed
                    this._buffers.push(buffers);
                    check(device, "uploading triangles")?;
                }
                rtcCommitScene(collection_scene);
            }

            for (inst, xfm) in instances.iter().zip(&this._transforms) {
                let geom = rtcNewGeometry(device, RTCGeometryType::Instance);
                if geom.is_null() {
                    return Err(SceneError::Device("rtcNewGeometry returned null".to_string()));
                }
                rtcSetGeometryInstancedScene(geom, this.collection_scenes[inst.collection]);
                rtcSetGeometryTransform(geom, 0, RTCFormat::Float4x4ColumnMajor as u32, xfm.as_ptr());
                rtcCommitGeometry(geom);
                rtcAttachGeometry(scene, geom);
                rtcReleaseGeometry(geom);
            }
            check(device, "creating instances")?;

            rtcCommitScene(scene);
            check(device, "committing the scene")?;

            log::info!(
                "Embree scene created: {} collections, {} instances",
                collections.len(),
                instances.len()
            );
            Ok(this)
        }
    }
}

impl Intersector for EmbreeIntersector {
    fn intersect(&self, ray: &mut Ray) -> Option<Hit> {
        let mut rayhit = RTCRayHit::from_ray(ray);
        // SAFETY: the scene is committed and immutable while `self` lives.
        unsafe {
            rtcIntersect1(self.scene, &mut rayhit, std::ptr::null());
        }
        if rayhit.hit.geom_id == RTC_INVALID_GEOMETRY_ID {
            return None;
        }

        ray.t_max = rayhit.ray.tfar;
        Some(Hit {
            instance: rayhit.hit.inst_id[0] as usize,
            geometry: rayhit.hit.geom_id as usize,
            primitive: rayhit.hit.prim_id as usize,
            u: rayhit.hit.u,
            v: rayhit.hit.v,
            t: rayhit.ray.tfar,
        })
    }

    fn occluded(&self, ray: &Ray) -> bool {
        let mut rtc_ray = RTCRay::from_ray(ray);
        // SAFETY: see `intersect`
        unsafe {
            rtcOccluded1(self.scene, &mut rtc_ray, std::ptr::null());
        }
        // Embree sets tfar to -inf on a hit
        rtc_ray.tfar == f32::NEG_INFINITY
    }

    fn bounds(&self) -> Aabb {
        let mut b = RTCBounds::default();
        // SAFETY: see `intersect`
        unsafe {
            rtcGetSceneBounds(self.scene, &mut b);
        }
        Aabb::from_points(
            Vec3::new(b.lower_x, b.lower_y, b.lower_z),
            Vec3::new(b.upper_x, b.upper_y, b.upper_z),
        )
    }
}

impl Drop for EmbreeIntersector {
    fn drop(&mut self) {
        // SAFETY: handles were created by this struct and are released once,
        // top-level scene before the scenes it instances.
        unsafe {
            if !self.scene.is_null() {
                rtcReleaseScene(self.scene);
            }
            for &scene in &self.collection_scenes {
                rtcReleaseScene(scene);
            }
            rtcReleaseDevice(self.device);
        }
    }
}

// SAFETY: Embree scenes are safe to query from many threads once
// committed, and nothing is mutated after construction.
unsafe impl Send for EmbreeIntersector {}
unsafe impl Sync for EmbreeIntersector {}
