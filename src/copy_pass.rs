//! Copy-color render pass: blits the current color target into a separate
//! texture, optionally downsampling, so later passes can sample it.
//!
//! The GPU itself stays behind the [`CommandBuffer`] abstraction; this module
//! only decides what to allocate and which blits to issue.

use crate::error::{Error, Result};

pub const COPY_COLOR_TAG: &str = "Copy Color";

/// Material parameter set for the box-filtered downsample.
pub const SAMPLE_OFFSET_PARAM: &str = "sample_offset";

/// Where in the frame the pass is scheduled by the render-graph driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PassEvent {
    BeforeRenderingOpaques,
    AfterRenderingOpaques,
    AfterRenderingSkybox,
    AfterRenderingTransparents,
}

/// Resolution reduction applied while copying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Downsampling {
    None,
    Bilinear2x,
    Box4x,
    Bilinear4x,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Point,
    Bilinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Rgba8Unorm,
    Rgba16Float,
    Rgb10A2Unorm,
}

/// Size and sampling description of a color target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: TargetFormat,
    pub msaa_samples: u32,
    pub depth_bits: u32,
}

/// Identifies a render target to the command buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetHandle {
    /// The camera's own backbuffer target; never allocated or released by
    /// this pass.
    CameraTarget,
    Named(String),
}

impl TargetHandle {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

/// A material a blit can sample through.
pub trait BlitMaterial {
    fn name(&self) -> &str;
    fn set_float(&mut self, param: &str, value: f32);
}

/// The slice of the GPU command abstraction this pass consumes.
pub trait CommandBuffer {
    fn allocate_temporary_target(
        &mut self,
        target: &TargetHandle,
        descriptor: &TargetDescriptor,
        filter: FilterMode,
    );
    fn release_temporary_target(&mut self, target: &TargetHandle);
    fn blit(
        &mut self,
        source: &TargetHandle,
        destination: &TargetHandle,
        material: Option<&dyn BlitMaterial>,
        tag: &str,
    );
}

/// Copies the source color target into the destination, with optional
/// downsampling. Lifecycle is `setup` → `configure` → `execute` → `cleanup`,
/// driven once per frame by the render-graph driver.
pub struct CopyColorPass {
    event: PassEvent,
    sampling_material: Option<Box<dyn BlitMaterial>>,
    downsampling: Downsampling,
    source: TargetHandle,
    destination: TargetHandle,
}

impl CopyColorPass {
    pub fn new(
        event: PassEvent,
        sampling_material: Option<Box<dyn BlitMaterial>>,
        downsampling: Downsampling,
    ) -> Self {
        Self {
            event,
            sampling_material,
            downsampling,
            source: TargetHandle::CameraTarget,
            destination: TargetHandle::CameraTarget,
        }
    }

    pub fn event(&self) -> PassEvent {
        self.event
    }

    pub fn downsampling(&self) -> Downsampling {
        self.downsampling
    }

    pub fn destination(&self) -> &TargetHandle {
        &self.destination
    }

    /// Bind the source and destination targets for this frame.
    pub fn setup(&mut self, source: TargetHandle, destination: TargetHandle) {
        self.source = source;
        self.destination = destination;
    }

    /// Allocate the temporary destination target, sized from the camera's
    /// descriptor with multisampling disabled and no depth buffer. Point
    /// filtering when not downsampling, bilinear otherwise.
    pub fn configure(&self, cmd: &mut dyn CommandBuffer, camera_descriptor: &TargetDescriptor) {
        let mut descriptor = camera_descriptor.clone();
        descriptor.msaa_samples = 1;
        descriptor.depth_bits = 0;
        let filter = if self.downsampling == Downsampling::None {
            FilterMode::Point
        } else {
            FilterMode::Bilinear
        };
        cmd.allocate_temporary_target(&self.destination, &descriptor, filter);
    }

    /// Blit the source into the destination. Box-filtered downsampling goes
    /// through the sampling material with its sample offset set to 2; every
    /// other mode is a plain blit. Logs and skips when the sampling material
    /// is missing.
    pub fn execute(&mut self, cmd: &mut dyn CommandBuffer) {
        let Some(material) = self.sampling_material.as_deref_mut() else {
            tracing::error!(
                "missing sampling material, {COPY_COLOR_TAG} render pass will not execute"
            );
            return;
        };
        match self.downsampling {
            Downsampling::None | Downsampling::Bilinear2x | Downsampling::Bilinear4x => {
                cmd.blit(&self.source, &self.destination, None, COPY_COLOR_TAG);
            }
            Downsampling::Box4x => {
                material.set_float(SAMPLE_OFFSET_PARAM, 2.0);
                cmd.blit(
                    &self.source,
                    &self.destination,
                    Some(&*material),
                    COPY_COLOR_TAG,
                );
            }
        }
    }

    /// Release the temporary destination unless it aliases the camera's own
    /// target, and reset the handle.
    pub fn cleanup(&mut self, cmd: Option<&mut dyn CommandBuffer>) -> Result<()> {
        let Some(cmd) = cmd else {
            return Err(Error::InvalidArgument(
                "copy color cleanup requires a command buffer",
            ));
        };
        if self.destination != TargetHandle::CameraTarget {
            cmd.release_temporary_target(&self.destination);
            self.destination = TargetHandle::CameraTarget;
        }
        Ok(())
    }
}
