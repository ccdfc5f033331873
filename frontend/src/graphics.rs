use std::sync::Arc;
use anyhow::{anyhow, Context};
use tracing::{error, info};
use winit::window::Window;
use wgpu::{Features, Limits, MemoryHints};
use manga_core::{HEIGHT, WIDTH};

pub struct GraphicsContext {
    pub _instance: wgpu::Instance,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface_config: wgpu::SurfaceConfiguration,
    pub surface: wgpu::Surface<'static>,
}

impl GraphicsContext {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;

        let adapter = match instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: Some(&surface),
        }).await {
            Some(adapter) => adapter,
            None => {
                error!("failed to find adapter, forcing fallback");
                instance.request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::None,
                    force_fallback_adapter: true,
                    compatible_surface: Some(&surface),
                }).await.ok_or_else(|| anyhow!("failed to find fallback adapter"))?
            }
        };
        info!("adapter: {:?}", adapter.get_info().name);

        let mut limits = Limits::downlevel_webgl2_defaults();
        limits.max_texture_dimension_1d = 8192;
        limits.max_texture_dimension_2d = 8192;

        let (device, queue) = adapter.request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: Features::default(),
            required_limits: limits,
            memory_hints: MemoryHints::default(),
        }, None).await.context("failed to open the graphics device")?;

        let swapchain_capabilities = surface.get_capabilities(&adapter);

        let swapchain_format = swapchain_capabilities
            .formats.iter()
            .find(|&&fmt| fmt == wgpu::TextureFormat::Rgba8Unorm || fmt == wgpu::TextureFormat::Bgra8Unorm)
            .or_else(|| swapchain_capabilities.formats.first())
            .copied()
            .ok_or_else(|| anyhow!("surface offers no texture format"))?;

        let alpha_mode = swapchain_capabilities
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: swapchain_format,
            width: window.inner_size().width.max(WIDTH),
            height: window.inner_size().height.max(HEIGHT),
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode,
            view_formats: vec![],
        };

        surface.configure(&device, &surface_config);

        Ok(Self {
            _instance: instance,
            device,
            queue,
            surface_config,
            surface,
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
}
