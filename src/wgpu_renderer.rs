// GPU rendering using wgpu with raw Wayland surface
// The editor paints into a Scene of colored triangles that the GPU rasterizes directly

use crate::color::Rgb;
use crate::star::Point;
use crate::surface::Surface;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use raw_window_handle::{
    RawDisplayHandle, RawWindowHandle, WaylandDisplayHandle, WaylandWindowHandle,
};
use std::ptr::NonNull;
use wgpu::util::DeviceExt;

// Maximum surface size to prevent GPU memory issues
const MAX_SURFACE_SIZE: u32 = 4096;

// Vertex buffer starts with room for a few dozen stars plus the menu text
const INITIAL_VERTEX_CAPACITY: usize = 4096;

/// One corner of a triangle, in surface pixels with straight RGBA color
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    position: [f32; 2],
    color: [f32; 4],
}

impl Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Triangle list for one frame, built through the `Surface` drawing calls
#[derive(Debug, Clone)]
pub struct Scene {
    background: Rgb,
    vertices: Vec<Vertex>,
}

impl Scene {
    pub fn new(background: Rgb) -> Self {
        Self {
            background,
            vertices: Vec::new(),
        }
    }

    pub fn background(&self) -> Rgb {
        self.background
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    fn push_triangle(&mut self, corners: [[f32; 2]; 3], color: [f32; 4]) {
        self.vertices.extend(corners.map(|position| Vertex { position, color }));
    }

    /// Corners in order around the quad
    fn push_quad(&mut self, corners: [[f32; 2]; 4], color: [f32; 4]) {
        let [a, b, c, d] = corners;
        self.push_triangle([a, b, c], color);
        self.push_triangle([a, c, d], color);
    }
}

fn rgba(color: Rgb, alpha: u8) -> [f32; 4] {
    let channel = |v: u8| v as f32 / 255.0;
    [
        channel(color.r()),
        channel(color.g()),
        channel(color.b()),
        channel(alpha),
    ]
}

impl Surface for Scene {
    fn clear(&mut self, color: Rgb) {
        self.background = color;
        self.vertices.clear();
    }

    /// Triangle fan around the vertex centroid. Exact for polygons that are
    /// star-shaped about their centroid, which star outlines are.
    fn fill_polygon(&mut self, points: &[Point], color: Rgb) {
        if points.len() < 3 {
            return;
        }
        let n = points.len() as f32;
        let cx = points.iter().map(|p| p.x as f32).sum::<f32>() / n;
        let cy = points.iter().map(|p| p.y as f32).sum::<f32>() / n;
        let color = rgba(color, u8::MAX);

        for (i, a) in points.iter().enumerate() {
            let b = points[(i + 1) % points.len()];
            self.push_triangle(
                [[cx, cy], [a.x as f32, a.y as f32], [b.x as f32, b.y as f32]],
                color,
            );
        }
    }

    fn stroke_line(&mut self, from: Point, to: Point, color: Rgb, width: f32) {
        // A zero-length segment has no direction to widen along
        if from == to {
            return;
        }

        let half = width.max(1.0) / 2.0;
        let (ax, ay) = (from.x as f32, from.y as f32);
        let (bx, by) = (to.x as f32, to.y as f32);
        let len = (bx - ax).hypot(by - ay);
        let (ux, uy) = ((bx - ax) / len * half, (by - ay) / len * half);
        // normal is the direction turned a quarter, square caps extend the ends
        let (nx, ny) = (-uy, ux);
        let (ax, ay) = (ax - ux, ay - uy);
        let (bx, by) = (bx + ux, by + uy);

        self.push_quad(
            [
                [ax + nx, ay + ny],
                [bx + nx, by + ny],
                [bx - nx, by - ny],
                [ax - nx, ay - ny],
            ],
            rgba(color, u8::MAX),
        );
    }

    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgb, alpha: u8) {
        if width == 0 || height == 0 {
            return;
        }
        let (x0, y0) = (x as f32, y as f32);
        let (x1, y1) = (x0 + width as f32, y0 + height as f32);
        self.push_quad([[x0, y0], [x1, y0], [x1, y1], [x0, y1]], rgba(color, alpha));
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    viewport: [f32; 2],
    opacity: f32,
    _padding: f32,
}

pub struct WgpuRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    render_pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    vertex_capacity: usize,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    opacity: f32,
    max_texture_size: u32,
}

impl WgpuRenderer {
    /// Create a new WgpuRenderer from raw Wayland display and surface pointers
    ///
    /// # Safety
    /// - `display_ptr` must be a valid pointer to a wl_display
    /// - `surface_ptr` must be a valid pointer to a wl_surface
    /// - The display and surface must remain valid for the lifetime of the renderer
    pub fn new(
        display_ptr: *mut std::ffi::c_void,
        surface_ptr: *mut std::ffi::c_void,
        width: u32,
        height: u32,
        opacity: f32,
    ) -> Result<Self> {
        info!("Initializing wgpu renderer with size {}x{}", width, height);

        let display_non_null = NonNull::new(display_ptr).context("Display pointer is null")?;
        let surface_non_null = NonNull::new(surface_ptr).context("Surface pointer is null")?;

        let raw_display_handle =
            RawDisplayHandle::Wayland(WaylandDisplayHandle::new(display_non_null));
        let raw_window_handle =
            RawWindowHandle::Wayland(WaylandWindowHandle::new(surface_non_null));

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::VULKAN | wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle,
                raw_window_handle,
            })?
        };

        pollster::block_on(Self::init_async(surface, instance, width, height, opacity))
    }

    async fn init_async(
        surface: wgpu::Surface<'static>,
        instance: wgpu::Instance,
        width: u32,
        height: u32,
        opacity: f32,
    ) -> Result<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("Failed to find an appropriate adapter")?;

        info!("Using adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .context("Failed to create device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        debug!("Surface capabilities: {:?}", surface_caps);

        // Non-sRGB target so colors and blending match the shared-memory canvas
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("Surface reports no formats")?;

        let alpha_mode = if surface_caps
            .alpha_modes
            .contains(&wgpu::CompositeAlphaMode::PreMultiplied)
        {
            wgpu::CompositeAlphaMode::PreMultiplied
        } else {
            surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto)
        };
        info!("Using format {:?}, alpha mode {:?}", surface_format, alpha_mode);

        let max_texture_size = adapter.limits().max_texture_dimension_2d.min(MAX_SURFACE_SIZE);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.clamp(1, max_texture_size),
            height: height.clamp(1, max_texture_size),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("uniform_bind_group_layout"),
            });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&[Uniforms {
                viewport: [config.width as f32, config.height as f32],
                opacity,
                _padding: 0.0,
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("uniform_bind_group"),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                push_constant_ranges: &[],
            });

        // Color blends by source alpha; destination alpha keeps the cleared opacity
        let blend = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::Zero,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        };

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[Vertex::desc()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // fans and quads come in either winding
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        let vertex_buffer = Self::create_vertex_buffer(&device, INITIAL_VERTEX_CAPACITY);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            render_pipeline,
            vertex_buffer,
            vertex_capacity: INITIAL_VERTEX_CAPACITY,
            uniform_buffer,
            uniform_bind_group,
            opacity,
            max_texture_size,
        })
    }

    fn create_vertex_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Vertex Buffer"),
            size: (capacity * std::mem::size_of::<Vertex>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        if new_width == 0 || new_height == 0 {
            return;
        }
        let safe_width = new_width.min(self.max_texture_size);
        let safe_height = new_height.min(self.max_texture_size);

        if safe_width != self.config.width || safe_height != self.config.height {
            self.config.width = safe_width;
            self.config.height = safe_height;
            self.surface.configure(&self.device, &self.config);
            debug!("Resized to {}x{}", safe_width, safe_height);
        }
    }

    /// Render a scene and return whether a frame was presented
    pub fn render(&mut self, scene: &Scene) -> Result<bool> {
        let vertices = scene.vertices();
        if vertices.len() > self.vertex_capacity {
            self.vertex_capacity = vertices.len().next_power_of_two();
            debug!("Growing vertex buffer to {} vertices", self.vertex_capacity);
            self.vertex_buffer = Self::create_vertex_buffer(&self.device, self.vertex_capacity);
        }
        if !vertices.is_empty() {
            self.queue
                .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(vertices));
        }

        let uniforms = Uniforms {
            viewport: [self.config.width as f32, self.config.height as f32],
            opacity: self.opacity,
            _padding: 0.0,
        };
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Timeout) => {
                debug!("Surface timeout, skipping frame");
                return Ok(false);
            }
            Err(wgpu::SurfaceError::Outdated) | Err(wgpu::SurfaceError::Lost) => {
                debug!("Surface outdated or lost, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(false);
            }
            Err(e) => {
                warn!("Surface error: {:?}", e);
                return Err(e.into());
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        // Background premultiplied by the window opacity
        let background = rgba(scene.background(), u8::MAX);
        let opacity = self.opacity as f64;
        let clear = wgpu::Color {
            r: background[0] as f64 * opacity,
            g: background[1] as f64 * opacity,
            b: background[2] as f64 * opacity,
            a: opacity,
        };

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if !vertices.is_empty() {
                render_pass.set_pipeline(&self.render_pipeline);
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
                render_pass.draw(0..vertices.len() as u32, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::star::Star;

    fn positions(scene: &Scene) -> Vec<[f32; 2]> {
        scene.vertices().iter().map(|v| v.position).collect()
    }

    #[test]
    fn clear_sets_background_and_drops_geometry() {
        let mut scene = Scene::new(Rgb::WHITE);
        scene.fill_rect(0, 0, 4, 4, Rgb::RED, u8::MAX);
        assert_eq!(scene.vertices().len(), 6);

        scene.clear(Rgb::BLUE);
        assert_eq!(scene.background(), Rgb::BLUE);
        assert!(scene.vertices().is_empty());
    }

    #[test]
    fn rect_covers_its_pixel_span() {
        let mut scene = Scene::new(Rgb::WHITE);
        scene.fill_rect(2, 3, 10, 5, Rgb::RED, 128);
        assert_eq!(
            positions(&scene),
            vec![
                [2.0, 3.0],
                [12.0, 3.0],
                [12.0, 8.0],
                [2.0, 3.0],
                [12.0, 8.0],
                [2.0, 8.0],
            ]
        );
        assert!(scene
            .vertices()
            .iter()
            .all(|v| v.color == [1.0, 0.0, 0.0, 128.0 / 255.0]));

        scene.fill_rect(0, 0, 0, 5, Rgb::RED, u8::MAX);
        assert_eq!(scene.vertices().len(), 6);
    }

    #[test]
    fn horizontal_stroke_is_widened_and_capped() {
        let mut scene = Scene::new(Rgb::WHITE);
        scene.stroke_line(Point::new(5, 10), Point::new(15, 10), Rgb::BLUE, 2.0);
        let pts = positions(&scene);
        assert_eq!(pts.len(), 6);
        let xs: Vec<f32> = pts.iter().map(|p| p[0]).collect();
        let ys: Vec<f32> = pts.iter().map(|p| p[1]).collect();
        assert_eq!(xs.iter().cloned().fold(f32::MAX, f32::min), 4.0);
        assert_eq!(xs.iter().cloned().fold(f32::MIN, f32::max), 16.0);
        assert_eq!(ys.iter().cloned().fold(f32::MAX, f32::min), 9.0);
        assert_eq!(ys.iter().cloned().fold(f32::MIN, f32::max), 11.0);
    }

    #[test]
    fn star_becomes_a_fan_and_eight_border_quads() {
        let mut scene = Scene::new(Rgb::WHITE);
        Star::new(Point::new(50, 50), 40, Rgb::BLUE, Rgb::RED).draw(&mut scene);

        // 8 fan triangles, then 8 strokes of 2 triangles each
        assert_eq!(scene.vertices().len(), 8 * 3 + 8 * 6);
        let fan = &scene.vertices()[..24];
        assert!(fan.iter().all(|v| v.color == rgba(Rgb::YELLOW, u8::MAX)));
        // every fan triangle starts at the star's center
        for tri in fan.chunks_exact(3) {
            assert_eq!(tri[0].position, [50.0, 50.0]);
        }

        let strokes = &scene.vertices()[24..];
        assert!(strokes[..12].iter().all(|v| v.color == rgba(Rgb::BLUE, u8::MAX)));
        assert!(strokes[12..24].iter().all(|v| v.color == rgba(Rgb::RED, u8::MAX)));
    }

    #[test]
    fn zero_radius_star_has_no_strokes_or_area() {
        let mut scene = Scene::new(Rgb::WHITE);
        Star::new(Point::new(8, 8), 0, Rgb::BLUE, Rgb::RED).draw(&mut scene);
        assert!(scene.vertices().iter().all(|v| v.position == [8.0, 8.0]));
    }

    #[test]
    fn text_is_emitted_as_row_runs() {
        let mut scene = Scene::new(Rgb::WHITE);
        scene.draw_text(0, 0, "L", Rgb::WHITE);
        // six single-pixel rows plus the full-width foot
        assert_eq!(scene.vertices().len(), 7 * 6);
        let foot = &scene.vertices()[36..];
        assert_eq!(foot[1].position, [5.0, 6.0]);
    }
}
