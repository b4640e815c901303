// src/backend/wgpu_backend.rs
// Hardware rasterization backend with depth readback
// RELEVANT FILES: src/backend/terrain.wgsl, src/backend/mod.rs, src/capture/mod.rs

use std::num::NonZeroU32;

use anyhow::{anyhow, ensure, Context, Result};
use bytemuck::{Pod, Zeroable};
use futures_intrusive::channel::shared::oneshot_channel;
use once_cell::sync::OnceCell;
use wgpu::util::DeviceExt;

use super::{OffscreenFrame, OutputConfig, RasterBackend, SceneView, AMBIENT, CLEAR_COLOR};
use crate::error::{TerrainError, TerrainResult};
use crate::terrain::{Indices, TerrainVertex};

const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter: wgpu::Adapter,
}

static CTX: OnceCell<GpuContext> = OnceCell::new();

/// Shared device and queue, created on first use.
pub fn ctx() -> TerrainResult<&'static GpuContext> {
    CTX.get_or_try_init(|| {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| TerrainError::render_init("no suitable GPU adapter"))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                label: Some("relief3d-device"),
            },
            None,
        ))
        .map_err(|e| TerrainError::render_init(format!("request_device failed: {e}")))?;

        log::info!("wgpu backend on {:?}", adapter.get_info().backend);
        Ok(GpuContext { device, queue, adapter })
    })
}

/// Align to WebGPU's required bytes-per-row for copies.
#[inline]
fn align_copy_bpr(unpadded: u32) -> u32 {
    let a = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    ((unpadded + a - 1) / a) * a
}

#[repr(C)]
#[derive(Clone, Copy, Zeroable, Pod)]
struct Globals {
    view_proj: [[f32; 4]; 4],
    sun_dir: [f32; 4],
    sun_color: [f32; 4],
    params: [f32; 4],
}

pub struct WgpuBackend {
    ctx: &'static GpuContext,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    output: OutputConfig,
    last_frame: Option<OffscreenFrame>,
}

impl WgpuBackend {
    pub fn new(output: OutputConfig) -> TerrainResult<Self> {
        output.validate()?;
        let ctx = ctx()?;
        let device = &ctx.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("relief3d-terrain-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("terrain.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("relief3d-terrain-bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("relief3d-terrain-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("relief3d-terrain-pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<TerrainVertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2],
                }],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: COLOR_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("relief3d-ramp-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Ok(Self { ctx, pipeline, bind_group_layout, sampler, output, last_frame: None })
    }

    pub fn last_frame(&self) -> Option<&OffscreenFrame> {
        self.last_frame.as_ref()
    }

    fn draw(&self, scene: &SceneView<'_>) -> Result<OffscreenFrame> {
        let device = &self.ctx.device;
        let queue = &self.ctx.queue;
        let (width, height) = self.output.physical_size();
        let extent = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };

        let mut camera = *scene.camera;
        camera.set_aspect(width, height);
        let sun_dir = scene.light_direction();
        let rgb = scene.sun.rgb();
        let globals = Globals {
            view_proj: camera.view_projection().to_cols_array_2d(),
            sun_dir: [sun_dir.x, sun_dir.y, sun_dir.z, 0.0],
            sun_color: [rgb[0], rgb[1], rgb[2], scene.sun.intensity],
            params: [AMBIENT, 0.0, 0.0, 0.0],
        };
        let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("relief3d-globals"),
            contents: bytemuck::bytes_of(&globals),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let vbuf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("relief3d-vertices"),
            contents: bytemuck::cast_slice(&scene.mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let (ibuf, index_format) = match &scene.mesh.indices {
            Indices::U16(idx) => (
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("relief3d-indices"),
                    contents: bytemuck::cast_slice(idx),
                    usage: wgpu::BufferUsages::INDEX,
                }),
                wgpu::IndexFormat::Uint16,
            ),
            Indices::U32(idx) => (
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("relief3d-indices"),
                    contents: bytemuck::cast_slice(idx),
                    usage: wgpu::BufferUsages::INDEX,
                }),
                wgpu::IndexFormat::Uint32,
            ),
        };

        let tex = scene.texture;
        let ramp = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("relief3d-ramp"),
            size: wgpu::Extent3d { width: tex.width, height: tex.height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &ramp,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &tex.rgba,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * tex.width),
                rows_per_image: Some(tex.height),
            },
            wgpu::Extent3d { width: tex.width, height: tex.height, depth_or_array_layers: 1 },
        );
        let ramp_view = ramp.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("relief3d-terrain-bg"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: uniform.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(&ramp_view) },
                wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::Sampler(&self.sampler) },
            ],
        });

        let target = |label: &'static str, format: wgpu::TextureFormat| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: extent,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            })
        };
        let color = target("relief3d-offscreen-color", COLOR_FORMAT);
        let depth = target("relief3d-offscreen-depth", DEPTH_FORMAT);
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("relief3d-frame"),
        });
        {
            let clear = CLEAR_COLOR.map(|c| c as f64 / 255.0);
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("relief3d-terrain-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r: clear[0], g: clear[1], b: clear[2], a: 1.0 }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.set_vertex_buffer(0, vbuf.slice(..));
            pass.set_index_buffer(ibuf.slice(..), index_format);
            pass.draw_indexed(0..scene.mesh.indices.len() as u32, 0, 0..1);
        }
        queue.submit(std::iter::once(encoder.finish()));

        let color_bytes = read_texture_tight(device, queue, &color, (width, height), 4, wgpu::TextureAspect::All)
            .context("color readback")?;
        let depth_bytes =
            read_texture_tight(device, queue, &depth, (width, height), 4, wgpu::TextureAspect::DepthOnly)
                .context("depth readback")?;
        let depth_values = depth_bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        Ok(OffscreenFrame { width, height, color: color_bytes, depth: depth_values })
    }
}

/// Copy a single-sample texture into a tightly packed CPU buffer.
fn read_texture_tight(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    src: &wgpu::Texture,
    size: (u32, u32),
    bytes_per_pixel: u32,
    aspect: wgpu::TextureAspect,
) -> Result<Vec<u8>> {
    let (width, height) = size;
    ensure!(width > 0 && height > 0, "readback size must be positive");

    let tight_bpr = bytes_per_pixel * width;
    let padded_bpr = align_copy_bpr(tight_bpr);
    let rows_per_image = NonZeroU32::new(height).ok_or_else(|| anyhow!("rows_per_image must be non-zero"))?;

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("relief3d-readback-staging"),
        size: padded_bpr as wgpu::BufferAddress * height as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("relief3d-readback-encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture { texture: src, mip_level: 0, origin: wgpu::Origin3d::ZERO, aspect },
        wgpu::ImageCopyBuffer {
            buffer: &staging,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded_bpr),
                rows_per_image: Some(rows_per_image.get()),
            },
        },
        wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (sender, receiver) = oneshot_channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device.poll(wgpu::Maintain::Wait);
    pollster::block_on(receiver.receive())
        .ok_or_else(|| anyhow!("map_async callback channel dropped"))??;

    let data = slice.get_mapped_range();
    let (tight_bpr, padded_bpr) = (tight_bpr as usize, padded_bpr as usize);
    let mut tight = vec![0u8; tight_bpr * height as usize];
    for row in 0..height as usize {
        let src_offset = row * padded_bpr;
        tight[row * tight_bpr..(row + 1) * tight_bpr].copy_from_slice(&data[src_offset..src_offset + tight_bpr]);
    }
    drop(data);
    staging.unmap();
    Ok(tight)
}

impl RasterBackend for WgpuBackend {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn output(&self) -> OutputConfig {
        self.output
    }

    fn set_output(&mut self, output: OutputConfig) -> TerrainResult<()> {
        output.validate()?;
        self.output = output;
        Ok(())
    }

    fn render(&mut self, scene: &SceneView<'_>) -> TerrainResult<()> {
        let frame = self.draw(scene).map_err(|e| TerrainError::capture(format!("{e:#}")))?;
        self.last_frame = Some(frame);
        Ok(())
    }

    fn render_offscreen(&mut self, scene: &SceneView<'_>) -> TerrainResult<OffscreenFrame> {
        self.draw(scene).map_err(|e| TerrainError::capture(format!("{e:#}")))
    }
}
