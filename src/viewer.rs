use crate::participant::ParticipantKind;
use crate::scene::{Renderable, Scene, SceneError, Transform};
use kiss3d::camera::FirstPerson;
use kiss3d::light::Light;
use kiss3d::loader::obj;
use kiss3d::resource::Mesh;
use kiss3d::scene::SceneNode;
use kiss3d::window::Window;
use log::*;
use nalgebra as na;
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

const EYE: [f32; 3] = [2.0, 0.0, 0.0];
const GROUND_TILES: usize = 4;
const GROUND_TILE_SIZE: f32 = 0.5;
const GROUND_THICKNESS: f32 = 0.001;
/// Floor height, one unit below the starting eye.
const GROUND_LEVEL: f32 = EYE[1] - 1.0;
const GROUND_COLORS: [[f32; 3]; 2] = [[1.0, 0.3, 0.2], [0.5, 0.04, 0.17]];

type SharedMesh = Rc<RefCell<Mesh>>;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum MeshTemplate {
    Cube { size: [f32; 3] },
    Sphere { radius: f32 },
    Obj {
        path: PathBuf,
        mtl_dir: PathBuf,
        scale: f32,
    },
}

/// Mesh and colour every participant of one kind is drawn with.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct TemplateSpec {
    pub mesh: MeshTemplate,
    #[serde(default = "TemplateSpec::default_color")]
    pub color: [f32; 3],
}

impl TemplateSpec {
    fn default_color() -> [f32; 3] {
        [1.0, 0.0, 0.0]
    }

    /// Observers are deliberately absent, they never show up as objects.
    pub fn defaults() -> BTreeMap<ParticipantKind, TemplateSpec> {
        let mut templates = BTreeMap::new();
        templates.insert(
            ParticipantKind::Racket,
            TemplateSpec {
                mesh: MeshTemplate::Cube {
                    size: [0.15, 0.02, 0.25],
                },
                color: [0.0, 0.0, 1.0],
            },
        );
        templates.insert(
            ParticipantKind::Head,
            TemplateSpec {
                mesh: MeshTemplate::Sphere { radius: 0.1 },
                color: [1.0, 1.0, 0.0],
            },
        );
        templates
    }
}

pub struct NodeHandle {
    node: SceneNode,
}

impl Renderable for NodeHandle {
    fn set_transform(&mut self, transform: &Transform) {
        self.node.set_local_transformation(transform.isometry());
    }
}

/// kiss3d window acting as the observer's scene and render driver.
pub struct Viewer {
    window: Window,
    camera: FirstPerson,
    templates: BTreeMap<ParticipantKind, TemplateSpec>,
    /// Parsed obj geometry, shared by every node of that kind.
    obj_meshes: BTreeMap<ParticipantKind, Vec<SharedMesh>>,
}

/// Runs `load` once per obj template.
fn load_obj_templates<M>(
    templates: &BTreeMap<ParticipantKind, TemplateSpec>,
    mut load: impl FnMut(&Path, &Path) -> std::io::Result<Vec<M>>,
) -> Result<BTreeMap<ParticipantKind, Vec<M>>, SceneError> {
    let mut loaded = BTreeMap::new();
    for (kind, spec) in templates {
        if let MeshTemplate::Obj { path, mtl_dir, .. } = &spec.mesh {
            let meshes = load(path, mtl_dir).map_err(|source| SceneError::AssetLoad {
                path: path.clone(),
                source,
            })?;
            info!("loaded {} mesh parts for {} from {:?}", meshes.len(), kind, path);
            loaded.insert(*kind, meshes);
        }
    }
    Ok(loaded)
}

fn parse_obj(path: &Path, mtl_dir: &Path) -> std::io::Result<Vec<SharedMesh>> {
    let basename = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("mesh");
    Ok(obj::parse_file(path, mtl_dir, basename)?
        .into_iter()
        .map(|(_, mesh, _)| Rc::new(RefCell::new(mesh)))
        .collect())
}

impl Viewer {
    pub fn new(
        title: &str,
        templates: BTreeMap<ParticipantKind, TemplateSpec>,
    ) -> Result<Self, SceneError> {
        for spec in templates.values() {
            if let MeshTemplate::Obj { path, .. } = &spec.mesh {
                if !path.exists() {
                    return Err(SceneError::MissingAsset(path.clone()));
                }
            }
        }

        let mut window = Window::new(title);
        window.set_background_color(0.5, 0.5, 0.5);
        window.set_light(Light::StickToCamera);
        add_ground_plane(&mut window);
        let obj_meshes = load_obj_templates(&templates, parse_obj)?;

        let camera = FirstPerson::new_with_frustrum(
            80_f32.to_radians(),
            0.1,
            1000.0,
            na::Point3::from(EYE),
            na::Point3::origin(),
        );
        Ok(Self {
            window,
            camera,
            templates,
            obj_meshes,
        })
    }

    /// Draws one frame, returns false once the window was closed.
    pub fn render(&mut self) -> bool {
        self.window.render_with_camera(&mut self.camera)
    }
}

impl Scene for Viewer {
    type Handle = NodeHandle;

    fn has_template(&self, kind: ParticipantKind) -> bool {
        self.templates.contains_key(&kind)
    }

    fn spawn(&mut self, kind: ParticipantKind) -> Result<NodeHandle, SceneError> {
        let spec = self
            .templates
            .get(&kind)
            .ok_or(SceneError::NoTemplate(kind))?;
        let mut node = match &spec.mesh {
            MeshTemplate::Cube { size: [x, y, z] } => self.window.add_cube(*x, *y, *z),
            MeshTemplate::Sphere { radius } => self.window.add_sphere(*radius),
            MeshTemplate::Obj { scale, .. } => {
                let meshes = self
                    .obj_meshes
                    .get(&kind)
                    .ok_or(SceneError::NoTemplate(kind))?;
                let mut group = self.window.add_group();
                for mesh in meshes {
                    group.add_mesh(mesh.clone(), na::Vector3::repeat(*scale));
                }
                group
            }
        };
        let [r, g, b] = spec.color;
        node.set_color(r, g, b);
        debug!("spawned {} node", kind);
        Ok(NodeHandle { node })
    }

    fn despawn(&mut self, handle: &mut NodeHandle) {
        handle.node.unlink();
        debug!("despawned node");
    }

    fn set_camera(&mut self, transform: &Transform) {
        self.camera
            .look_at(transform.position, transform.look_target());
    }
}

/// Checkerboard tiles centred under the origin: colour index and centre.
fn ground_tiles() -> Vec<(usize, na::Point3<f32>)> {
    let offset = GROUND_TILES as f32 / 2.0 - 0.5;
    let mut tiles = Vec::with_capacity(GROUND_TILES * GROUND_TILES);
    for i in 0..GROUND_TILES {
        for j in 0..GROUND_TILES {
            let center = na::Point3::new(
                (j as f32 - offset) * GROUND_TILE_SIZE,
                GROUND_LEVEL,
                (i as f32 - offset) * GROUND_TILE_SIZE,
            );
            tiles.push(((i + j) % 2, center));
        }
    }
    tiles
}

fn add_ground_plane(window: &mut Window) {
    for (color, center) in ground_tiles() {
        let mut tile = window.add_cube(GROUND_TILE_SIZE, GROUND_THICKNESS, GROUND_TILE_SIZE);
        let [r, g, b] = GROUND_COLORS[color];
        tile.set_color(r, g, b);
        tile.set_local_translation(na::Translation3::from(center.coords));
    }
}
