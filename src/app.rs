//! Application shell
//!
//! Owns the winit event loop and wires the pieces together: taxonomy
//! loading (snapshot or relation files), parallel mesh loading with a
//! progress overlay, the render engine and imgui layer, and the per-frame
//! drive of the selection synchronizer and command manager.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context as _};
use cgmath::{Vector3, Zero};
use log::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowAttributes},
};

use crate::command::{CommandManager, FnCommand};
use crate::concept::{snapshot, source, ConceptTree};
use crate::gfx::{
    camera::{CameraController, OrbitCamera},
    CameraManager, RenderEngine, Scene,
};
use crate::logwatch::LogWatcher;
use crate::mesh::{BulkLoader, LoadEvent, MeshRegistry};
use crate::prefs::{Preferences, LAST_FOLDER_KEY};
use crate::selection::{SelectionSynchronizer, TreeViewState};
use crate::ui::{log_panel, selection_panel, tree_panel, UiAction, UiManager};

/// Default root concept of the part-of taxonomy (human body)
pub const PARTOF_ROOT_ID: &str = "FMA20394";
/// Default root concept of the is-a taxonomy (anatomical entity)
pub const ISA_ROOT_ID: &str = "FMA62955";

/// Startup configuration, usually derived from the command line
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub data_dir: PathBuf,
    pub partof_root: String,
    pub isa_root: String,
    pub log_file: Option<PathBuf>,
}

impl ViewerConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            partof_root: PARTOF_ROOT_ID.to_string(),
            isa_root: ISA_ROOT_ID.to_string(),
            log_file: None,
        }
    }
}

/// Camera-affecting requests queued by undoable commands and applied on
/// the next frame
#[derive(Default)]
struct ViewEffects {
    turntable: bool,
    reset_requested: bool,
    pending_view: Option<(f32, f32, f32, Vector3<f32>)>,
}

/// One taxonomy with its retained panel state
struct BoundView {
    title: String,
    tree: Rc<ConceptTree>,
    state: Rc<RefCell<TreeViewState>>,
}

pub struct VesaliusApp {
    event_loop: Option<EventLoop<()>>,
    app_state: AppState,
}

impl VesaliusApp {
    /// Builds the application: preferences, both taxonomies and the mesh
    /// loader. Fails when no taxonomy can be built at all.
    pub fn new(config: ViewerConfig) -> anyhow::Result<Self> {
        let event_loop = EventLoop::new().context("create event loop")?;

        let prefs_path = Preferences::default_path();
        let prefs = prefs_path
            .as_deref()
            .map(Preferences::load)
            .unwrap_or_default();

        let mut views = Vec::new();
        let taxonomies = [
            ("Part of", "partof.txt", config.partof_root.clone()),
            ("Is a", "isa.txt", config.isa_root.clone()),
        ];
        for (title, relations_file, root_id) in taxonomies {
            match load_tree(&config.data_dir, relations_file, &root_id) {
                Ok(tree) => {
                    let tree = Rc::new(tree);
                    let state = Rc::new(RefCell::new(TreeViewState::new()));
                    state.borrow_mut().expand(tree.root());
                    info!("taxonomy {title}: {} concepts", tree.len());
                    views.push(BoundView {
                        title: title.to_string(),
                        tree,
                        state,
                    });
                }
                // A failed tree stays absent; never show a partial one
                Err(err) => error!("taxonomy {title} unavailable: {err:#}"),
            }
        }
        if views.is_empty() {
            bail!("no taxonomy could be built from {}", config.data_dir.display());
        }

        let mesh_dir = {
            let remembered = prefs.get(LAST_FOLDER_KEY);
            if remembered.is_empty() {
                config.data_dir.join("meshes")
            } else {
                PathBuf::from(remembered)
            }
        };
        let obj_files = list_obj_files(&mesh_dir);
        info!("loading {} meshes from {}", obj_files.len(), mesh_dir.display());
        let loader = Some(BulkLoader::spawn(obj_files));

        let camera = OrbitCamera::new(4.0, 0.35, 0.3, Vector3::zero(), 1.0);
        let controller = CameraController::new(0.005, 0.1);
        let scene = Scene::new(CameraManager::new(camera, controller));

        let logwatch = config.log_file.clone().map(LogWatcher::spawn);

        Ok(Self {
            event_loop: Some(event_loop),
            app_state: AppState {
                config,
                window: None,
                render_engine: None,
                ui_manager: None,
                scene,
                views,
                staging: MeshRegistry::new(),
                registry: None,
                loader,
                sync: None,
                commands: CommandManager::new(),
                prefs,
                prefs_path,
                effects: Rc::new(RefCell::new(ViewEffects::default())),
                logwatch,
                home_target: Vector3::zero(),
                home_distance: 4.0,
                last_frame: Instant::now(),
            },
        })
    }

    /// Runs the application (consumes self and starts the event loop).
    pub fn run(mut self) {
        let event_loop = self.event_loop.take().expect("Event loop already consumed");
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop
            .run_app(&mut self.app_state)
            .expect("Failed to run event loop");
    }
}

struct AppState {
    config: ViewerConfig,
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    ui_manager: Option<UiManager>,
    scene: Scene,
    views: Vec<BoundView>,
    staging: MeshRegistry,
    registry: Option<Rc<MeshRegistry>>,
    loader: Option<BulkLoader>,
    sync: Option<Rc<RefCell<SelectionSynchronizer>>>,
    commands: CommandManager,
    prefs: Preferences,
    prefs_path: Option<PathBuf>,
    effects: Rc<RefCell<ViewEffects>>,
    logwatch: Option<LogWatcher>,
    home_target: Vector3<f32>,
    home_distance: f32,
    last_frame: Instant,
}

impl AppState {
    /// Merges finished loader results and, once complete, freezes the
    /// registry and binds the selection core to it. From here on the
    /// fileId -> mesh mapping is immutable for the session.
    fn drive_loader(&mut self) {
        let Some(loader) = self.loader.as_mut() else {
            return;
        };
        for event in loader.drain() {
            if let LoadEvent::Loaded(mesh) = event {
                self.staging.insert(mesh);
            }
        }
        if !loader.is_done() {
            return;
        }
        let (loaded, total) = loader.progress();
        info!("mesh loading complete: {loaded}/{total} files, {} usable", self.staging.len());
        self.loader = None;

        let registry = Rc::new(std::mem::take(&mut self.staging));
        self.scene.build_from_registry(&registry);
        if let Some(engine) = &self.render_engine {
            self.scene
                .init_gpu_resources(engine.device(), engine.object_layout());
        }

        // Frame the whole model as the home view
        let (center, radius) = overall_bounds(&registry);
        self.home_target = Vector3::new(center[0], center[1], center[2]);
        self.home_distance = (radius * 2.8).max(1.0);
        self.scene
            .camera_manager
            .camera
            .reset_view(self.home_target, self.home_distance);

        let mut sync = SelectionSynchronizer::new(Rc::clone(&registry));
        sync.subscribe(Box::new(|delta| {
            log::debug!(
                "selection changed: +{} -{}",
                delta.added.len(),
                delta.removed.len()
            );
        }));
        for view in &self.views {
            sync.bind_view(Rc::clone(&view.tree), Rc::clone(&view.state));
        }
        self.sync = Some(Rc::new(RefCell::new(sync)));
        self.registry = Some(registry);
    }

    fn redraw(&mut self) {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32().min(0.1);
        self.last_frame = now;

        self.drive_loader();
        if let Some(watch) = self.logwatch.as_mut() {
            watch.poll();
        }

        let actions = self.build_ui();
        self.process_actions(actions);

        // Queued camera requests from commands
        {
            let mut effects = self.effects.borrow_mut();
            let camera = &mut self.scene.camera_manager.camera;
            if effects.reset_requested {
                effects.reset_requested = false;
                camera.reset_view(self.home_target, self.home_distance);
            }
            if let Some(view) = effects.pending_view.take() {
                camera.restore_view(view);
            }
            if effects.turntable {
                camera.add_yaw(dt * 0.25);
            }
        }

        // Route selection changes to every bound view, then mirror the
        // converged canonical set into the 3D highlight state.
        if let Some(sync) = self.sync.clone() {
            let outcome = sync.borrow_mut().pump();
            if let (Some(focus), Some(registry)) = (outcome.focus, self.registry.as_ref()) {
                let mesh = registry.mesh(focus.handle);
                self.scene
                    .camera_manager
                    .camera
                    .frame(mesh.center, mesh.radius.max(0.05));
            }
            if !outcome.deltas.is_empty() {
                let sync = sync.borrow();
                let selection = sync.selection();
                self.scene.apply_selection(|handle| selection.contains(handle));
            }
        }

        self.scene.update(dt);

        let (Some(engine), Some(ui_manager)) =
            (self.render_engine.as_mut(), self.ui_manager.as_mut())
        else {
            return;
        };
        engine.update_camera(self.scene.camera_manager.camera.uniform);
        self.scene.sync_uniforms(engine.queue());
        engine.render_frame_with_ui(&self.scene, |device, queue, encoder, color_attachment| {
            ui_manager.render_display_only(device, queue, encoder, color_attachment);
        });
    }

    /// Builds this frame's panels and collects their requests.
    fn build_ui(&mut self) -> Vec<UiAction> {
        let mut actions = Vec::new();

        let Some(window) = self.window.clone() else {
            return actions;
        };
        let Some(ui_manager) = self.ui_manager.as_mut() else {
            return actions;
        };

        let views = &self.views;
        let sync = &self.sync;
        let commands = &self.commands;
        let logwatch = &self.logwatch;
        let progress = self.loader.as_ref().map(|l| l.progress());
        let turntable_on = self.effects.borrow().turntable;

        ui_manager.update_logic(&window, |ui| {
            ui.main_menu_bar(|| {
                ui.menu("Edit", || {
                    let undo_label = commands
                        .undo_label()
                        .map(|name| format!("Undo {name}"))
                        .unwrap_or_else(|| "Undo".to_string());
                    if ui
                        .menu_item_config(&undo_label)
                        .enabled(commands.undo_label().is_some())
                        .build()
                    {
                        actions.push(UiAction::Undo);
                    }
                    let redo_label = commands
                        .redo_label()
                        .map(|name| format!("Redo {name}"))
                        .unwrap_or_else(|| "Redo".to_string());
                    if ui
                        .menu_item_config(&redo_label)
                        .enabled(commands.redo_label().is_some())
                        .build()
                    {
                        actions.push(UiAction::Redo);
                    }
                });
                ui.menu("View", || {
                    if ui.menu_item("Reset View") {
                        actions.push(UiAction::ResetView);
                    }
                    if ui.menu_item_config("Turntable").selected(turntable_on).build() {
                        actions.push(UiAction::ToggleTurntable);
                    }
                    ui.separator();
                    if ui.menu_item("Choose Mesh Folder...") {
                        actions.push(UiAction::PickMeshFolder);
                    }
                });
            });

            if let Some((loaded, total)) = progress {
                ui.window("Loading")
                    .position([500.0, 400.0], imgui::Condition::FirstUseEver)
                    .size([360.0, 90.0], imgui::Condition::FirstUseEver)
                    .build(|| {
                        let fraction = if total == 0 {
                            1.0
                        } else {
                            loaded as f32 / total as f32
                        };
                        imgui::ProgressBar::new(fraction)
                            .overlay_text(format!("{loaded} / {total} meshes"))
                            .build(ui);
                    });
            }

            for (index, view) in views.iter().enumerate() {
                let mut state = view.state.borrow_mut();
                let output = tree_panel::tree_panel(
                    ui,
                    &view.title,
                    &view.tree,
                    &mut state,
                    [20.0 + 300.0 * index as f32, 40.0],
                    [280.0, 500.0],
                );
                if output.collapsed {
                    actions.push(UiAction::Collapsed { view: index });
                }
                if let Some(node) = output.subtree_request {
                    actions.push(UiAction::SelectSubtree { view: index, node });
                }
            }

            if let Some(sync) = sync {
                let sync = sync.borrow();
                let output =
                    selection_panel::selection_panel(ui, sync.list(), [20.0, 560.0], [280.0, 220.0]);
                if output.clear_requested {
                    actions.push(UiAction::ClearSelection);
                }
            }

            if let Some(watch) = logwatch {
                log_panel::log_panel(ui, watch.lines(), [320.0, 560.0], [500.0, 220.0]);
            }
        });

        actions
    }

    fn process_actions(&mut self, actions: Vec<UiAction>) {
        for action in actions {
            match action {
                UiAction::Undo => {
                    self.commands.undo();
                }
                UiAction::Redo => {
                    self.commands.redo();
                }
                UiAction::Collapsed { view } => {
                    if let Some(sync) = &self.sync {
                        sync.borrow_mut().reconcile(view);
                    }
                }
                UiAction::ClearSelection => {
                    let Some(sync) = self.sync.clone() else {
                        continue;
                    };
                    let before = sync.borrow().selected_handles();
                    if before.is_empty() {
                        continue;
                    }
                    let execute_sync = Rc::clone(&sync);
                    let undo_sync = Rc::clone(&sync);
                    self.commands.execute_command(Box::new(FnCommand::new(
                        "Clear Selection",
                        move || {
                            execute_sync.borrow_mut().clear_selection();
                        },
                        move || {
                            undo_sync.borrow_mut().restore_selection(before.clone());
                        },
                    )));
                }
                UiAction::SelectSubtree { view, node } => {
                    let Some(sync) = self.sync.clone() else {
                        continue;
                    };
                    let name = self.views[view].tree.node(node).name.clone();
                    let before = sync.borrow().selected_handles();
                    let execute_sync = Rc::clone(&sync);
                    let undo_sync = Rc::clone(&sync);
                    self.commands.execute_command(Box::new(FnCommand::new(
                        format!("Select {name}"),
                        move || {
                            execute_sync.borrow_mut().select_subtree(view, node);
                        },
                        move || {
                            undo_sync.borrow_mut().restore_selection(before.clone());
                        },
                    )));
                }
                UiAction::ResetView => {
                    let before = self.scene.camera_manager.camera.view_snapshot();
                    let execute_effects = Rc::clone(&self.effects);
                    let undo_effects = Rc::clone(&self.effects);
                    self.commands.execute_command(Box::new(FnCommand::new(
                        "Reset View",
                        move || execute_effects.borrow_mut().reset_requested = true,
                        move || undo_effects.borrow_mut().pending_view = Some(before),
                    )));
                }
                UiAction::ToggleTurntable => {
                    let execute_effects = Rc::clone(&self.effects);
                    let undo_effects = Rc::clone(&self.effects);
                    self.commands.execute_command(Box::new(FnCommand::new(
                        "Turntable",
                        move || {
                            let mut effects = execute_effects.borrow_mut();
                            effects.turntable = !effects.turntable;
                        },
                        move || {
                            let mut effects = undo_effects.borrow_mut();
                            effects.turntable = !effects.turntable;
                        },
                    )));
                }
                UiAction::PickMeshFolder => {
                    let start = self.prefs.get(LAST_FOLDER_KEY);
                    let start_dir = if start.is_empty() {
                        self.config.data_dir.clone()
                    } else {
                        PathBuf::from(start)
                    };
                    if let Some(folder) = rfd::FileDialog::new()
                        .set_directory(start_dir)
                        .pick_folder()
                    {
                        info!("mesh folder set to {}; takes effect next start", folder.display());
                        self.prefs
                            .set(LAST_FOLDER_KEY, folder.to_string_lossy().to_string());
                        self.save_prefs();
                    }
                }
            }
        }
    }

    fn save_prefs(&self) {
        if let Some(path) = &self.prefs_path {
            if let Err(err) = self.prefs.save(path) {
                warn!("could not save preferences: {err}");
            }
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Ok(window) = event_loop.create_window(
            WindowAttributes::default()
                .with_title("Vesalius")
                .with_inner_size(winit::dpi::LogicalSize::new(1400, 900)),
        ) {
            let window_handle = Arc::new(window);
            self.window = Some(window_handle.clone());

            let (width, height) = window_handle.inner_size().into();
            let window_clone = window_handle.clone();
            let engine = pollster::block_on(async move {
                RenderEngine::new(window_clone, width, height).await
            });

            if self.registry.is_some() {
                self.scene
                    .init_gpu_resources(engine.device(), engine.object_layout());
            }

            let ui_manager = UiManager::new(
                engine.device(),
                engine.queue(),
                engine.surface_format(),
                &window_handle,
            );

            self.ui_manager = Some(ui_manager);
            self.render_engine = Some(engine);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.clone() else {
            return;
        };

        if let Some(ui_manager) = self.ui_manager.as_mut() {
            let ui_event: winit::event::Event<()> = winit::event::Event::WindowEvent {
                window_id,
                event: event.clone(),
            };
            if ui_manager.handle_input(&window, &ui_event) {
                window.request_redraw();
                return;
            }
        }

        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if matches!(
                    event.physical_key,
                    winit::keyboard::PhysicalKey::Code(winit::keyboard::KeyCode::Escape)
                ) {
                    self.save_prefs();
                    event_loop.exit();
                    return;
                }
                self.scene.camera_manager.process_key_event(&event);
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                self.scene
                    .camera_manager
                    .camera
                    .resize_projection(width, height);
                if let Some(engine) = self.render_engine.as_mut() {
                    engine.resize(width, height);
                }
                if let Some(ui_manager) = self.ui_manager.as_mut() {
                    ui_manager.update_display_size(width, height);
                }
            }
            WindowEvent::CloseRequested => {
                self.save_prefs();
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
            }
            _ => (),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: winit::event::DeviceEvent,
    ) {
        let Some(window) = self.window.as_ref() else {
            return;
        };

        if let Some(ui_manager) = self.ui_manager.as_ref() {
            let io = ui_manager.context.io();
            if io.want_capture_mouse || io.want_capture_keyboard {
                return;
            }
        }

        self.scene.camera_manager.process_event(&event, window);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}

/// Loads one taxonomy, preferring its snapshot and falling back to the
/// relation files; a freshly built tree is snapshotted best-effort.
fn load_tree(data_dir: &Path, relations_file: &str, root_id: &str) -> anyhow::Result<ConceptTree> {
    let snapshots = data_dir.join("snapshots");
    match snapshot::load(&snapshots, root_id) {
        Ok(tree) => Ok(tree),
        Err(err) => {
            info!("no snapshot for {root_id} ({err}); building from relations");
            let relations = source::read_relations(&data_dir.join(relations_file))
                .with_context(|| format!("reading {relations_file}"))?;
            let file_ids = source::read_element_map(&data_dir.join("elements.txt"))
                .unwrap_or_else(|err| {
                    warn!("element map unavailable: {err}");
                    HashMap::new()
                });
            let tree = ConceptTree::build(&relations, &file_ids, root_id)?;
            snapshot::save_quietly(&snapshots, root_id, &tree);
            Ok(tree)
        }
    }
}

fn list_obj_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("mesh folder {} unreadable: {err}", dir.display());
            return Vec::new();
        }
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "obj"))
        .collect();
    files.sort();
    files
}

/// Union bounding sphere over all loaded meshes, for the home view.
fn overall_bounds(registry: &MeshRegistry) -> ([f32; 3], f32) {
    if registry.is_empty() {
        return ([0.0; 3], 1.5);
    }
    let mut center = [0.0f32; 3];
    for (_, mesh) in registry.iter() {
        for axis in 0..3 {
            center[axis] += mesh.center[axis];
        }
    }
    for axis in &mut center {
        *axis /= registry.len() as f32;
    }
    let mut radius: f32 = 0.0;
    for (_, mesh) in registry.iter() {
        let offset = [
            mesh.center[0] - center[0],
            mesh.center[1] - center[1],
            mesh.center[2] - center[2],
        ];
        let distance =
            (offset[0] * offset[0] + offset[1] * offset[1] + offset[2] * offset[2]).sqrt();
        radius = radius.max(distance + mesh.radius);
    }
    (center, radius.max(0.5))
}
