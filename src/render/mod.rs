pub mod pipeline;
pub mod present;

use std::sync::Arc;
use winit::window::Window;

use crate::assets::SpriteCatalog;

use self::pipeline::{SpritePipeline, SpriteUniform};

#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("failed to create wgpu surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter found: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create wgpu device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}

/// Alpha modes that give a see-through overlay, best first.
const ALPHA_PREFERENCE: [wgpu::CompositeAlphaMode; 2] = [
    wgpu::CompositeAlphaMode::PreMultiplied,
    wgpu::CompositeAlphaMode::PostMultiplied,
];

/// Device, queue, surface and the sprite pipeline.
pub struct GpuState {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: wgpu::Surface<'static>,
    pub surface_config: wgpu::SurfaceConfiguration,
    pub sprite_pipeline: SpritePipeline,
}

/// DX12 through a DirectComposition visual on Windows: Vulkan WSI there
/// can't composite per-pixel alpha.
#[cfg(windows)]
fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::DX12,
        backend_options: wgpu::BackendOptions {
            dx12: wgpu::Dx12BackendOptions {
                presentation_system: wgpu_types::Dx12SwapchainKind::DxgiFromVisual,
                ..Default::default()
            },
            ..Default::default()
        },
        ..Default::default()
    })
}

#[cfg(not(windows))]
fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    })
}

fn pick_format(caps: &wgpu::SurfaceCapabilities) -> wgpu::TextureFormat {
    let srgb = wgpu::TextureFormat::Bgra8UnormSrgb;
    if caps.formats.contains(&srgb) {
        srgb
    } else {
        caps.formats.first().copied().unwrap_or(srgb)
    }
}

fn pick_alpha_mode(caps: &wgpu::SurfaceCapabilities) -> wgpu::CompositeAlphaMode {
    ALPHA_PREFERENCE
        .into_iter()
        .find(|mode| caps.alpha_modes.contains(mode))
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

impl GpuState {
    /// Initialize wgpu and upload every sprite frame.
    pub fn new(window: Arc<Window>, catalog: &SpriteCatalog) -> Result<Self, GpuError> {
        let size = window.inner_size();
        let instance = create_instance();
        let surface = instance.create_surface(window)?;

        // One small sprite: the integrated GPU is plenty.
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))?;
        let info = adapter.get_info();
        log::info!("GPU adapter: {:?} ({:?})", info.name, info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("perchcat_device"),
            ..Default::default()
        }))?;

        let caps = surface.get_capabilities(&adapter);
        let format = pick_format(&caps);
        let alpha_mode = pick_alpha_mode(&caps);
        log::info!("Surface: format={format:?}, alpha_mode={alpha_mode:?}");

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            // Vsync keeps the GPU idle between frames.
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let sprite_pipeline = SpritePipeline::new(&device, &queue, format, catalog);

        Ok(Self {
            device,
            queue,
            surface,
            surface_config,
            sprite_pipeline,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Upload sprite parameters for this frame.
    pub fn update_sprite(&mut self, uniform: &SpriteUniform) {
        self.sprite_pipeline.update(&self.queue, uniform);
    }

    /// Next swapchain texture. A lost or outdated surface is reconfigured
    /// and the frame skipped.
    fn acquire(&self) -> Option<wgpu::SurfaceTexture> {
        match self.surface.get_current_texture() {
            Ok(output) => Some(output),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.surface_config);
                None
            }
            Err(e) => {
                log::warn!("Skipping frame: {e:?}");
                None
            }
        }
    }

    /// Clear to transparent, draw the sprite and present.
    pub fn render_frame(&self) {
        let Some(output) = self.acquire() else {
            return;
        };
        let view = output.texture.create_view(&Default::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("sprite_encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sprite_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });
            self.sprite_pipeline.draw(&mut pass);
        }

        self.queue.submit([encoder.finish()]);
        output.present();
    }
}
