//! The reserved `globals` namespace (group 0).

use bytemuck::{Pod, Zeroable};

use crate::time::ClockSnapshot;

pub const GLOBALS_NAME: &str = "globals";

/// Fields a shader may read as `globals.<field>` without declaring anything.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GlobalField {
    Resolution,
    Time,
    DeltaTime,
    Frame,
    Aspect,
}

impl GlobalField {
    pub const ALL: [Self; 5] = [
        Self::Resolution,
        Self::Time,
        Self::DeltaTime,
        Self::Frame,
        Self::Aspect,
    ];

    pub fn wgsl_name(self) -> &'static str {
        match self {
            Self::Resolution => "resolution",
            Self::Time => "time",
            Self::DeltaTime => "deltaTime",
            Self::Frame => "frame",
            Self::Aspect => "aspect",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.wgsl_name() == name)
    }
}

/// Declarations injected into modules that read `globals` without declaring it.
pub(crate) const GLOBALS_WGSL: &str = "\
struct PrismGlobals {
    resolution: vec2<f32>,
    time: f32,
    deltaTime: f32,
    frame: u32,
    aspect: f32,
}
@group(0) @binding(0) var<uniform> globals: PrismGlobals;
";

/// CPU mirror of `PrismGlobals`, padded to 32 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct GlobalsUniform {
    pub resolution: [f32; 2],
    pub time: f32,
    pub delta_time: f32,
    pub frame: u32,
    pub aspect: f32,
    _pad: [u32; 2],
}

impl GlobalsUniform {
    pub fn new(width: u32, height: u32, clock: ClockSnapshot) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self {
            resolution: [w, h],
            time: clock.time,
            delta_time: clock.delta_time,
            frame: clock.frame as u32,
            aspect: if h > 0.0 { w / h } else { 1.0 },
            _pad: [0; 2],
        }
    }
}
