// Wayland integration module
// Handles all Wayland-specific functionality using smithay-client-toolkit

use crate::app::{ColorSlot, Command, Editor, Event, PointerButton};
use crate::cli::Config;
use crate::raster::Canvas;
use crate::star::Point;
use crate::wgpu_renderer::{Scene, WgpuRenderer};
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use smithay_client_toolkit::{
    compositor::{CompositorHandler, CompositorState},
    delegate_compositor, delegate_keyboard, delegate_layer, delegate_output, delegate_pointer,
    delegate_registry, delegate_seat, delegate_shm,
    output::{OutputHandler, OutputState},
    registry::{ProvidesRegistryState, RegistryState},
    registry_handlers,
    seat::{
        keyboard::{KeyEvent, KeyboardHandler, Keysym, Modifiers},
        pointer::{PointerEvent, PointerEventKind, PointerHandler},
        Capability, SeatHandler, SeatState,
    },
    shell::{
        wlr_layer::{
            Anchor, KeyboardInteractivity, Layer, LayerShell, LayerShellHandler, LayerSurface,
            LayerSurfaceConfigure,
        },
        WaylandSurface,
    },
    shm::{
        slot::{Buffer, SlotPool},
        Shm, ShmHandler,
    },
};
use wayland_client::{
    globals::registry_queue_init,
    protocol::{wl_keyboard, wl_output, wl_pointer, wl_seat, wl_shm, wl_surface},
    Connection, Proxy, QueueHandle,
};

/// Mouse button constants
const BTN_LEFT: u32 = 272;
const BTN_RIGHT: u32 = 273;

/// Maximum surface size (width or height) to prevent buffer allocation failures
const MAX_SIZE: u32 = 4096;

/// What a key press asks the front end to do
#[derive(Debug, Clone, Copy, PartialEq)]
enum KeyAction {
    Exit,
    Dispatch(Event),
}

/// Map a key press to an action; `overlay_open` decides what Escape means
fn key_action(keysym: Keysym, modifiers: &Modifiers, overlay_open: bool) -> Option<KeyAction> {
    let command = |command| Some(KeyAction::Dispatch(Event::Command(command)));
    match keysym {
        Keysym::Escape if overlay_open => Some(KeyAction::Dispatch(Event::Cancel)),
        Keysym::Escape | Keysym::q => Some(KeyAction::Exit),
        Keysym::Delete if modifiers.shift => command(Command::DeleteAll),
        Keysym::Delete | Keysym::BackSpace => command(Command::DeleteLast),
        Keysym::r => command(Command::Redo),
        Keysym::y if modifiers.ctrl => command(Command::Redo),
        Keysym::_1 => command(Command::ChooseColor(ColorSlot::First)),
        Keysym::_2 => command(Command::ChooseColor(ColorSlot::Second)),
        _ => None,
    }
}

fn pointer_button(button: u32) -> Option<PointerButton> {
    match button {
        BTN_LEFT => Some(PointerButton::Left),
        BTN_RIGHT => Some(PointerButton::Right),
        _ => None,
    }
}

fn surface_point((x, y): (f64, f64)) -> Point {
    Point::new(x as i32, y as i32)
}

/// Repaint bookkeeping: whether the frame is stale and whether a frame
/// callback is still outstanding
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct RedrawState {
    needs_redraw: bool,
    frame_pending: bool,
}

impl RedrawState {
    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    /// Input repaints immediately only when no frame callback will do it
    fn should_draw_now(&self) -> bool {
        self.needs_redraw && !self.frame_pending
    }

    fn frame_requested(&mut self) {
        self.frame_pending = true;
    }

    /// A frame callback fired; returns whether a repaint is owed
    fn frame_done(&mut self) -> bool {
        self.frame_pending = false;
        self.needs_redraw
    }

    fn presented(&mut self) {
        self.needs_redraw = false;
    }
}

/// Main Wayland application state
struct WaylandApp {
    // Registry state
    registry_state: RegistryState,
    // Seat state for input handling
    seat_state: SeatState,
    // Output state for display info
    output_state: OutputState,
    // Shared memory for buffer allocation
    shm: Shm,
    // Layer shell for overlay windows
    layer_shell: LayerShell,
    // Compositor state
    compositor_state: CompositorState,

    // Wayland display pointer (for GPU rendering)
    display_ptr: *mut std::ffi::c_void,

    // Application-specific state
    editor: Editor,
    canvas: Canvas,
    scene: Scene,
    opacity: f32,
    should_exit: bool,

    // Surface and buffer management
    layer_surface: Option<LayerSurface>,
    pool: Option<SlotPool>,
    buffer: Option<Buffer>,
    width: u32,
    height: u32,
    configured: bool,

    // Input state
    modifiers: Modifiers,

    // Redraw flag and frame callback tracking
    redraw: RedrawState,

    // GPU rendering
    use_gpu: bool,
    gpu_renderer: Option<WgpuRenderer>,
    gpu_initialized: bool,
}

impl WaylandApp {
    /// Create a new Wayland application
    fn new(
        registry_state: RegistryState,
        seat_state: SeatState,
        output_state: OutputState,
        shm: Shm,
        layer_shell: LayerShell,
        compositor_state: CompositorState,
        display_ptr: *mut std::ffi::c_void,
        config: &Config,
    ) -> Self {
        let viewport = (config.width, config.height);
        Self {
            registry_state,
            seat_state,
            output_state,
            shm,
            layer_shell,
            compositor_state,
            display_ptr,
            editor: Editor::new(config.palette, config.background, viewport),
            canvas: Canvas::new(config.width, config.height, config.background),
            scene: Scene::new(config.background),
            opacity: config.opacity,
            should_exit: false,
            layer_surface: None,
            pool: None,
            buffer: None,
            width: config.width,
            height: config.height,
            configured: false,
            modifiers: Modifiers::default(),
            redraw: RedrawState::default(),
            use_gpu: config.use_gpu,
            gpu_renderer: None,
            gpu_initialized: false,
        }
    }

    /// Feed one event to the editor and remember whether it changed the frame
    fn dispatch(&mut self, event: Event) {
        if self.editor.handle(event) {
            self.redraw.mark_dirty();
        }
    }

    /// Repaint now unless a frame callback is already on its way
    fn request_redraw(&mut self, qh: &QueueHandle<Self>) {
        if self.redraw.should_draw_now() {
            self.draw(qh);
        }
    }

    /// Initialize GPU renderer from Wayland surface
    fn init_gpu_renderer(&mut self) {
        if self.gpu_initialized {
            return;
        }

        let layer_surface = match &self.layer_surface {
            Some(ls) => ls,
            None => {
                warn!("Cannot init GPU: no layer surface");
                return;
            }
        };

        // With wayland-backend client_system feature, ObjectId.as_ptr() is available
        let wl_surface = layer_surface.wl_surface();
        let surface_ptr = wl_surface.id().as_ptr() as *mut std::ffi::c_void;
        let display_ptr = self.display_ptr;

        if display_ptr.is_null() {
            warn!("Display pointer is null, falling back to CPU rendering");
            self.use_gpu = false;
            return;
        }

        info!("Initializing GPU renderer...");
        debug!("  Surface ptr: {:?}", surface_ptr);
        debug!("  Display ptr: {:?}", display_ptr);
        info!("  Size: {}x{}", self.width, self.height);

        match WgpuRenderer::new(display_ptr, surface_ptr, self.width, self.height, self.opacity) {
            Ok(renderer) => {
                self.gpu_renderer = Some(renderer);
                self.gpu_initialized = true;
                info!("GPU renderer initialized successfully");
            }
            Err(e) => {
                warn!("Failed to initialize GPU renderer: {:?}", e);
                warn!("Falling back to CPU rendering");
                self.use_gpu = false;
            }
        }
    }

    /// Paint the editor through whichever path owns the surface
    fn draw(&mut self, qh: &QueueHandle<Self>) {
        if !self.configured {
            return;
        }
        let Some(wl_surface) = self.layer_surface.as_ref().map(|ls| ls.wl_surface().clone())
        else {
            return;
        };

        // The next repaint waits for this frame to reach the screen
        wl_surface.frame(qh, wl_surface.clone());
        self.redraw.frame_requested();

        // Once wgpu has configured the surface, shm buffers must not be attached to it
        if self.gpu_renderer.is_some() {
            self.draw_gpu(&wl_surface);
        } else if let Err(e) = self.draw_cpu(&wl_surface) {
            error!("CPU rendering failed: {:?}", e);
            // Nothing was committed, so no callback will arrive
            self.redraw.frame_done();
        }
    }

    /// Draw using GPU (wgpu)
    fn draw_gpu(&mut self, wl_surface: &wl_surface::WlSurface) {
        let Some(renderer) = self.gpu_renderer.as_mut() else {
            return;
        };

        renderer.resize(self.width, self.height);
        self.editor.render(&mut self.scene);

        match renderer.render(&self.scene) {
            Ok(true) => self.redraw.presented(),
            // Skipped frame; the frame callback retries
            Ok(false) => {}
            Err(e) => {
                error!("GPU render error: {:?}", e);
                self.redraw.presented();
            }
        }

        // Also carries the frame request when nothing was presented
        wl_surface.commit();
    }

    /// Draw using CPU (shared memory buffer)
    fn draw_cpu(&mut self, surface: &wl_surface::WlSurface) -> Result<()> {
        self.canvas.resize(self.width, self.height);
        self.editor.render(&mut self.canvas);

        let width = self.canvas.width();
        let height = self.canvas.height();

        // 4 bytes per pixel for ARGB
        let stride = width as i32 * 4;
        let buffer_size = stride as usize * height as usize;

        if self.pool.is_none() {
            let pool = SlotPool::new(buffer_size, &self.shm)
                .with_context(|| format!("Failed to create slot pool of {} bytes", buffer_size))?;
            self.pool = Some(pool);
        }
        let pool = self.pool.as_mut().context("Slot pool missing")?;

        if pool.len() < buffer_size {
            if let Err(e) = pool.resize(buffer_size) {
                self.pool = None;
                return Err(e).context(format!("Failed to resize pool to {} bytes", buffer_size));
            }
        }

        let (buffer, pixels) = pool
            .create_buffer(width as i32, height as i32, stride, wl_shm::Format::Argb8888)
            .with_context(|| format!("Failed to create buffer {}x{}", width, height))?;

        self.canvas.write_bgra(pixels, self.opacity);

        buffer
            .attach_to(surface)
            .context("Failed to attach buffer")?;
        surface.damage_buffer(0, 0, width as i32, height as i32);
        surface.commit();

        self.buffer = Some(buffer);
        self.redraw.presented();
        Ok(())
    }
}

impl CompositorHandler for WaylandApp {
    fn scale_factor_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_factor: i32,
    ) {
        debug!("Scale factor changed");
    }

    fn transform_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_transform: wl_output::Transform,
    ) {
        debug!("Transform changed");
    }

    fn frame(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _time: u32,
    ) {
        if self.redraw.frame_done() {
            self.draw(qh);
        }
    }

    fn surface_enter(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }

    fn surface_leave(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }
}

impl OutputHandler for WaylandApp {
    fn output_state(&mut self) -> &mut OutputState {
        &mut self.output_state
    }

    fn new_output(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
        debug!("New output detected");
    }

    fn update_output(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
        debug!("Output updated");
    }

    fn output_destroyed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
        debug!("Output destroyed");
    }
}

impl LayerShellHandler for WaylandApp {
    fn closed(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _layer: &LayerSurface) {
        info!("Layer surface closed");
        self.should_exit = true;
    }

    fn configure(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        _layer: &LayerSurface,
        configure: LayerSurfaceConfigure,
        _serial: u32,
    ) {
        debug!("Layer surface configured: {:?}", configure);

        if configure.new_size.0 > 0 {
            self.width = configure.new_size.0.min(MAX_SIZE);
        }
        if configure.new_size.1 > 0 {
            self.height = configure.new_size.1.min(MAX_SIZE);
        }
        // Buffers from the old size are not reused
        if (self.width, self.height) != (self.canvas.width(), self.canvas.height()) {
            self.pool = None;
        }
        self.editor.handle(Event::Resize {
            width: self.width,
            height: self.height,
        });

        self.configured = true;
        self.redraw.mark_dirty();

        if self.use_gpu && !self.gpu_initialized {
            self.init_gpu_renderer();
        }

        self.draw(qh);
    }
}

impl SeatHandler for WaylandApp {
    fn seat_state(&mut self) -> &mut SeatState {
        &mut self.seat_state
    }

    fn new_seat(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _seat: wl_seat::WlSeat) {
        debug!("New seat");
    }

    fn new_capability(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        seat: wl_seat::WlSeat,
        capability: Capability,
    ) {
        debug!("New capability: {:?}", capability);

        if capability == Capability::Keyboard {
            if let Err(e) = self.seat_state.get_keyboard(qh, &seat, None) {
                error!("Failed to get keyboard: {}", e);
            }
        }
        if capability == Capability::Pointer {
            if let Err(e) = self.seat_state.get_pointer(qh, &seat) {
                error!("Failed to get pointer: {}", e);
            }
        }
    }

    fn remove_capability(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _seat: wl_seat::WlSeat,
        _capability: Capability,
    ) {
        debug!("Capability removed");
    }

    fn remove_seat(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _seat: wl_seat::WlSeat) {
        debug!("Seat removed");
    }
}

impl KeyboardHandler for WaylandApp {
    fn enter(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _surface: &wl_surface::WlSurface,
        _serial: u32,
        _raw: &[u32],
        _keysyms: &[Keysym],
    ) {
        debug!("Keyboard entered surface");
    }

    fn leave(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _surface: &wl_surface::WlSurface,
        _serial: u32,
    ) {
        debug!("Keyboard left surface");
        self.modifiers = Modifiers::default();
    }

    fn press_key(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        event: KeyEvent,
    ) {
        debug!("Key pressed: {:?}", event.keysym);

        match key_action(event.keysym, &self.modifiers, self.editor.has_overlay()) {
            Some(KeyAction::Exit) => {
                info!("Exit key pressed");
                self.should_exit = true;
            }
            Some(KeyAction::Dispatch(event)) => {
                self.dispatch(event);
                self.request_redraw(qh);
            }
            None => {}
        }
    }

    fn release_key(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        _event: KeyEvent,
    ) {
    }

    fn update_modifiers(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        modifiers: Modifiers,
        _layout: u32,
    ) {
        self.modifiers = modifiers;
    }
}

impl PointerHandler for WaylandApp {
    fn pointer_frame(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        _pointer: &wl_pointer::WlPointer,
        events: &[PointerEvent],
    ) {
        for event in events {
            match event.kind {
                PointerEventKind::Enter { .. } => {
                    debug!("Pointer entered");
                    self.dispatch(Event::PointerMove {
                        position: surface_point(event.position),
                    });
                }
                PointerEventKind::Leave { .. } => {
                    debug!("Pointer left");
                    self.dispatch(Event::PointerLeave);
                }
                PointerEventKind::Motion { .. } => {
                    self.dispatch(Event::PointerMove {
                        position: surface_point(event.position),
                    });
                }
                PointerEventKind::Press { button, .. } => {
                    debug!("Pointer button pressed: {}", button);
                    if let Some(button) = pointer_button(button) {
                        self.dispatch(Event::PointerDown {
                            button,
                            position: surface_point(event.position),
                        });
                    }
                }
                PointerEventKind::Release { button, .. } => {
                    if let Some(button) = pointer_button(button) {
                        self.dispatch(Event::PointerUp { button });
                    }
                }
                _ => {}
            }
        }

        // At most one repaint per pointer frame
        self.request_redraw(qh);
    }
}

impl ShmHandler for WaylandApp {
    fn shm_state(&mut self) -> &mut Shm {
        &mut self.shm
    }
}

impl ProvidesRegistryState for WaylandApp {
    fn registry(&mut self) -> &mut RegistryState {
        &mut self.registry_state
    }

    registry_handlers![OutputState, SeatState];
}

// Delegate macros
delegate_compositor!(WaylandApp);
delegate_output!(WaylandApp);
delegate_layer!(WaylandApp);
delegate_seat!(WaylandApp);
delegate_keyboard!(WaylandApp);
delegate_pointer!(WaylandApp);
delegate_shm!(WaylandApp);
delegate_registry!(WaylandApp);

/// Run the Wayland application
pub fn run(config: Config) -> Result<()> {
    info!("Connecting to Wayland display");

    let conn = Connection::connect_to_env().context("Failed to connect to Wayland display")?;

    let (globals, mut event_queue) =
        registry_queue_init(&conn).context("Failed to initialize registry")?;
    let qh = event_queue.handle();

    let compositor_state =
        CompositorState::bind(&globals, &qh).context("Failed to bind compositor")?;
    let layer_shell = LayerShell::bind(&globals, &qh).context("Failed to bind layer shell")?;
    let shm = Shm::bind(&globals, &qh).context("Failed to bind shm")?;

    // Get the display pointer for GPU rendering
    let display_ptr = conn.backend().display_ptr() as *mut std::ffi::c_void;

    let mut app = WaylandApp::new(
        RegistryState::new(&globals),
        SeatState::new(&globals, &qh),
        OutputState::new(&globals, &qh),
        shm,
        layer_shell,
        compositor_state,
        display_ptr,
        &config,
    );

    // Dispatch once to get output info
    event_queue.roundtrip(&mut app)?;

    let (display_width, display_height) = get_display_dimensions(&app.output_state);
    info!("Display dimensions: {}x{}", display_width, display_height);

    let (width, height) = fit_to_display(
        (config.width, config.height),
        (display_width, display_height),
    );
    info!("Canvas size: {}x{}", width, height);
    app.width = width;
    app.height = height;

    let surface = app.compositor_state.create_surface(&qh);
    let layer_surface = app.layer_shell.create_layer_surface(
        &qh,
        surface,
        Layer::Top,
        Some("starpad"),
        None,
    );

    // No anchor centers the surface on the output
    layer_surface.set_anchor(Anchor::empty());
    layer_surface.set_size(width, height);
    layer_surface.set_keyboard_interactivity(KeyboardInteractivity::OnDemand);

    // Commit the surface to trigger configure
    layer_surface.commit();

    app.layer_surface = Some(layer_surface);

    info!("Starting event loop");
    info!("Controls: Drag to draw a star, Right-click for menu, Escape or q to quit");

    loop {
        event_queue.blocking_dispatch(&mut app)?;

        if app.should_exit {
            info!("Exiting application");
            break;
        }
    }

    Ok(())
}

/// Get display dimensions from the output state
fn get_display_dimensions(output_state: &OutputState) -> (u32, u32) {
    for output in output_state.outputs() {
        if let Some(info) = output_state.info(&output) {
            if let Some(mode) = info.modes.iter().find(|m| m.current) {
                return (mode.dimensions.0 as u32, mode.dimensions.1 as u32);
            }
            if let Some(mode) = info.modes.first() {
                return (mode.dimensions.0 as u32, mode.dimensions.1 as u32);
            }
        }
    }
    (1920, 1080)
}

/// Clamp the requested canvas to the display and the buffer limit
fn fit_to_display(requested: (u32, u32), display: (u32, u32)) -> (u32, u32) {
    let limit_w = display.0.clamp(1, MAX_SIZE);
    let limit_h = display.1.clamp(1, MAX_SIZE);
    (requested.0.clamp(1, limit_w), requested.1.clamp(1, limit_h))
}
