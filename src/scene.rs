//! Scene graph as handed over by the authoring tool.
//!
//! The document mirrors what an authoring tool exposes after triangulation
//! and normal computation: collections holding objects and sub-collections,
//! objects referencing a mesh and/or instancing another collection, and
//! meshes made of vertices, per-corner loop records and polygons.
//!
//! All cross references are by name. [`Scene::from_document`] resolves them
//! to ids once, so traversal never has to deal with dangling names.

use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::HashMap;

/// Name of the collection traversed when none is selected.
pub const DEFAULT_ROOT: &str = "Scene Collection";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Collection traversed when none is selected, [`DEFAULT_ROOT`] if
    /// absent. Only an explicit root has to exist when loading.
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub collections: Vec<CollectionDef>,
    #[serde(default)]
    pub objects: Vec<ObjectDef>,
    #[serde(default)]
    pub meshes: Vec<MeshData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionDef {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<String>,
    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectDef {
    pub name: String,
    #[serde(default)]
    pub mesh: Option<String>,
    /// Collection instanced by this object
    #[serde(default)]
    pub instance_collection: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshData {
    pub name: String,
    #[serde(default)]
    pub vertices: Vec<[f32; 3]>,
    #[serde(default)]
    pub loops: Vec<Loop>,
    /// Loop indices of each polygon
    #[serde(default)]
    pub polygons: Vec<Vec<u32>>,
    #[serde(default)]
    pub color_layers: Vec<ColorLayer>,
    #[serde(default)]
    pub uv_layers: Vec<UvLayer>,
}

/// One polygon corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Loop {
    pub vertex: u32,
    /// Smoothing-aware corner normal
    #[serde(default)]
    pub normal: Option<[f32; 3]>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColorLayer {
    pub name: String,
    #[serde(default)]
    pub active: bool,
    /// RGB in `[0, 1]`, one per loop
    pub colors: Vec<[f32; 3]>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UvLayer {
    pub name: String,
    #[serde(default)]
    pub active: bool,
    /// One per loop
    pub uvs: Vec<[f32; 2]>,
}

/// Common view of color and UV layers.
pub trait Layer {
    fn name(&self) -> &str;
    fn is_active(&self) -> bool;
    fn len(&self) -> usize;
}

impl Layer for ColorLayer {
    fn name(&self) -> &str {
        &self.name
    }
    fn is_active(&self) -> bool {
        self.active
    }
    fn len(&self) -> usize {
        self.colors.len()
    }
}

impl Layer for UvLayer {
    fn name(&self) -> &str {
        &self.name
    }
    fn is_active(&self) -> bool {
        self.active
    }
    fn len(&self) -> usize {
        self.uvs.len()
    }
}

/// The layer to export from a list: the first one flagged active, else
/// the first one.
pub fn active_layer<L: Layer>(layers: &[L]) -> Option<&L> {
    layers.iter().find(|l| l.is_active()).or_else(|| layers.first())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub usize);

#[derive(Debug, Clone)]
pub struct Collection {
    pub name: String,
    pub objects: Vec<ObjectId>,
    pub children: Vec<CollectionId>,
}

#[derive(Debug, Clone)]
pub struct Object {
    pub name: String,
    pub mesh: Option<MeshId>,
    pub instance_collection: Option<CollectionId>,
}

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot parse scene document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Duplicate {kind} name {name:?}")]
    DuplicateName { kind: &'static str, name: String },
    #[error("{from} references {kind} {name:?}, which does not exist")]
    MissingReference {
        kind: &'static str,
        name: String,
        from: String,
    },
    #[error("Collection {0:?} does not exist in scene")]
    MissingCollection(String),
}

/// A scene document with all name references resolved.
#[derive(Debug, Clone)]
pub struct Scene {
    root: String,
    collections: Vec<Collection>,
    objects: Vec<Object>,
    meshes: Vec<MeshData>,
    collection_names: HashMap<String, CollectionId>,
}

fn index_names<'a, I>(
    kind: &'static str,
    names: impl Iterator<Item = &'a str>,
    make_id: impl Fn(usize) -> I,
) -> Result<HashMap<String, I>, SceneError> {
    let mut r = HashMap::default();
    for (i, name) in names.enumerate() {
        if r.insert(name.to_owned(), make_id(i)).is_some() {
            return Err(SceneError::DuplicateName {
                kind,
                name: name.to_owned(),
            });
        }
    }
    Ok(r)
}

fn lookup<I: Copy>(
    map: &HashMap<String, I>,
    kind: &'static str,
    name: &str,
    from: impl FnOnce() -> String,
) -> Result<I, SceneError> {
    map.get(name).copied().ok_or_else(|| SceneError::MissingReference {
        kind,
        name: name.to_owned(),
        from: from(),
    })
}

impl Scene {
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let file = std::fs::File::open(path)?;
        let doc: SceneDocument = serde_json::from_reader(BufReader::new(file))?;
        Self::from_document(doc)
    }

    pub fn from_json_str(s: &str) -> Result<Self, SceneError> {
        let doc: SceneDocument = serde_json::from_str(s)?;
        Self::from_document(doc)
    }

    pub fn from_document(doc: SceneDocument) -> Result<Self, SceneError> {
        let collection_names = index_names(
            "collection",
            doc.collections.iter().map(|c| c.name.as_str()),
            CollectionId,
        )?;
        let object_names = index_names(
            "object",
            doc.objects.iter().map(|o| o.name.as_str()),
            ObjectId,
        )?;
        let mesh_names = index_names(
            "mesh",
            doc.meshes.iter().map(|m| m.name.as_str()),
            MeshId,
        )?;

        let mut objects = Vec::with_capacity(doc.objects.len());
        for o in doc.objects.iter() {
            let from = || format!("Object {:?}", o.name);
            let mesh = match &o.mesh {
                Some(name) => Some(lookup(&mesh_names, "mesh", name, from)?),
                None => None,
            };
            let instance_collection = match &o.instance_collection {
                Some(name) => {
                    Some(lookup(&collection_names, "collection", name, from)?)
                }
                None => None,
            };
            objects.push(Object {
                name: o.name.clone(),
                mesh,
                instance_collection,
            });
        }

        let mut collections = Vec::with_capacity(doc.collections.len());
        for c in doc.collections.iter() {
            let from = || format!("Collection {:?}", c.name);
            let objects = c
                .objects
                .iter()
                .map(|name| lookup(&object_names, "object", name, from))
                .collect::<Result<Vec<_>, _>>()?;
            let children = c
                .children
                .iter()
                .map(|name| lookup(&collection_names, "collection", name, from))
                .collect::<Result<Vec<_>, _>>()?;
            collections.push(Collection {
                name: c.name.clone(),
                objects,
                children,
            });
        }

        let root = match doc.root {
            Some(name) => {
                lookup(&collection_names, "collection", &name, || {
                    "Scene root".to_owned()
                })?;
                name
            }
            None => DEFAULT_ROOT.to_owned(),
        };

        Ok(Self {
            root,
            collections,
            objects,
            meshes: doc.meshes,
            collection_names,
        })
    }

    /// The collection traversed when none is selected.
    pub fn root(&self) -> Result<CollectionId, SceneError> {
        self.collection_by_name(&self.root)
    }

    pub fn collection_by_name(&self, name: &str) -> Result<CollectionId, SceneError> {
        self.collection_names
            .get(name)
            .copied()
            .ok_or_else(|| SceneError::MissingCollection(name.to_owned()))
    }

    pub fn collection(&self, id: CollectionId) -> &Collection {
        &self.collections[id.0]
    }

    pub fn object(&self, id: ObjectId) -> &Object {
        &self.objects[id.0]
    }

    pub fn mesh(&self, id: MeshId) -> &MeshData {
        &self.meshes[id.0]
    }

    pub fn n_collections(&self) -> usize {
        self.collections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "collections": [
            { "name": "Scene Collection", "objects": ["A"], "children": ["Props"] },
            { "name": "Props", "objects": ["B"] }
        ],
        "objects": [
            { "name": "A", "mesh": "Cube" },
            { "name": "B", "instance_collection": "Props" }
        ],
        "meshes": [
            { "name": "Cube" }
        ]
    }"#;

    #[test]
    fn resolves_references() {
        let scene = Scene::from_json_str(DOC).unwrap();
        let root = scene.collection(scene.root().unwrap());
        assert_eq!(root.name, DEFAULT_ROOT);
        assert_eq!(root.children, vec![CollectionId(1)]);
        let a = scene.object(root.objects[0]);
        assert_eq!(a.mesh, Some(MeshId(0)));
        let b = scene.object(ObjectId(1));
        assert_eq!(b.instance_collection, Some(CollectionId(1)));
        assert_eq!(scene.collection_by_name("Props").unwrap(), CollectionId(1));
        assert!(matches!(
            scene.collection_by_name("Nope"),
            Err(SceneError::MissingCollection(_))
        ));
    }

    #[test]
    fn dangling_reference_is_an_error() {
        let doc = DOC.replace(r#""mesh": "Cube""#, r#""mesh": "Sphere""#);
        let err = Scene::from_json_str(&doc).unwrap_err();
        assert!(
            matches!(err, SceneError::MissingReference { kind: "mesh", ref name, .. } if name == "Sphere")
        );
    }

    #[test]
    fn duplicate_names_are_an_error() {
        let doc = DOC.replace(r#"{ "name": "Props", "objects": ["B"] }"#,
            r#"{ "name": "Props", "objects": ["B"] }, { "name": "Props" }"#);
        let err = Scene::from_json_str(&doc).unwrap_err();
        assert!(matches!(err, SceneError::DuplicateName { kind: "collection", .. }));
    }

    #[test]
    fn default_root_is_only_required_when_used() {
        let scene = Scene::from_json_str(
            r#"{ "collections": [ { "name": "Props" } ] }"#,
        )
        .unwrap();
        assert!(matches!(
            scene.root(),
            Err(SceneError::MissingCollection(ref name)) if name == DEFAULT_ROOT
        ));
        assert_eq!(scene.collection_by_name("Props").unwrap(), CollectionId(0));

        let scene = Scene::from_json_str(
            r#"{ "root": "Props", "collections": [ { "name": "Props" } ] }"#,
        )
        .unwrap();
        assert_eq!(scene.root().unwrap(), CollectionId(0));

        let err = Scene::from_json_str(
            r#"{ "root": "Nope", "collections": [ { "name": "Props" } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, SceneError::MissingReference { kind: "collection", .. }));
    }

    #[test]
    fn active_layer_prefers_flagged_layer() {
        let layers = vec![
            UvLayer { name: "first".into(), active: false, uvs: vec![] },
            UvLayer { name: "second".into(), active: true, uvs: vec![] },
        ];
        assert_eq!(active_layer(&layers).unwrap().name, "second");
        assert_eq!(active_layer(&layers[..1]).unwrap().name, "first");
        assert!(active_layer::<UvLayer>(&[]).is_none());
    }
}
