
use std::path::Path;

use crate::cache::{Resource, TypeTag};


#[derive(Clone, Debug)]
pub struct Mesh {
    pub name: String,
    pub positions: Vec<f32>,
    pub indices: Vec<u32>,
    pub normals: Option<Vec<f32>>,
    pub texcoords: Option<Vec<f32>>,
}

impl Mesh {
    pub fn vertex_ct(&self) -> u32 {
        self.indices.len() as u32
    }
}


/// Every mesh found in one Wavefront OBJ file.
#[derive(Clone, Debug, Default)]
pub struct Model {
    pub meshes: Vec<Mesh>,
}

impl Resource for Model {
    const TAG: TypeTag = TypeTag::new("Model");
}

impl Model {
    pub fn mesh(&self, name: &str) -> Option<&Mesh> {
        self.meshes.iter().find(|mesh| mesh.name == name)
    }
}


fn non_empty(v: Vec<f32>) -> Option<Vec<f32>> {
    if v.is_empty() { None } else { Some(v) }
}


pub fn load_model_file(path: &Path) -> anyhow::Result<Model> {
    // TODO: handle material-mesh associations
    let (models, _materials) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS)?;

    let meshes = models.into_iter()
        .map(|model| {
            let mesh = model.mesh;
            log::trace!("positions.len: {} indices.len: {} texcoords.len: {} normals.len: {}",
                mesh.positions.len(),
                mesh.indices.len(),
                mesh.texcoords.len(),
                mesh.normals.len());

            Mesh {
                name: model.name,
                positions: mesh.positions,
                indices: mesh.indices,
                normals: non_empty(mesh.normals),
                texcoords: non_empty(mesh.texcoords),
            }
        })
        .collect::<Vec<_>>();

    log::debug!("decoded model {}: {} meshes", path.display(), meshes.len());

    Ok(Model { meshes })
}
