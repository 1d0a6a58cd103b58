//! Selection of the meshes to export.
//!
//! Walks collections depth-first: a collection's objects in order (an
//! object's mesh, then the collection it instances), then its child
//! collections in order. Each collection is entered at most once, which
//! also makes the walk terminate on instancing cycles. Each mesh is
//! exported once, through the first object that reaches it.

use crate::HashSet;
use crate::diag::{Diagnostic, Diagnostics};
use crate::mesh::MeshWorkItem;
use crate::scene::{CollectionId, MeshId, ObjectId, Scene};

/// Marker that `--skip-underscore` excludes.
pub const RESERVED_NAME_MARKER: char = '_';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CollectSettings {
    /// Skip collections and meshes whose name begins with this character.
    pub exclude_prefix: Option<char>,
}

impl CollectSettings {
    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclude_prefix.is_some_and(|p| name.starts_with(p))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Collected<'s> {
    /// Meshes to export, in traversal order
    pub items: Vec<MeshWorkItem<'s>>,
    /// Collections entered, in traversal order (excluded ones included)
    pub visited: Vec<CollectionId>,
    pub diagnostics: Diagnostics,
}

struct Frame {
    collection: CollectionId,
    next_object: usize,
    next_child: usize,
}

enum Step {
    Object(ObjectId),
    Child(CollectionId),
    Done,
}

struct Traversal<'s> {
    scene: &'s Scene,
    settings: CollectSettings,
    entered: HashSet<CollectionId>,
    written: HashSet<MeshId>,
    /// Meshes already reported as duplicated or skipped
    reported_duplicate: HashSet<MeshId>,
    reported_skip: HashSet<MeshId>,
    stack: Vec<Frame>,
    out: Collected<'s>,
}

impl<'s> Traversal<'s> {
    fn enter(&mut self, id: CollectionId) {
        if !self.entered.insert(id) {
            return;
        }
        self.out.visited.push(id);
        let collection = self.scene.collection(id);
        if self.settings.is_excluded(&collection.name) {
            self.out.diagnostics.push(Diagnostic::SkippedCollection {
                collection: collection.name.clone(),
            });
            return;
        }
        tracing::debug!("Adding meshes from collection {:?}", collection.name);
        self.stack.push(Frame {
            collection: id,
            next_object: 0,
            next_child: 0,
        });
    }

    fn next_step(&mut self) -> Option<Step> {
        let frame = self.stack.last_mut()?;
        let collection = self.scene.collection(frame.collection);
        if let Some(&obj) = collection.objects.get(frame.next_object) {
            frame.next_object += 1;
            return Some(Step::Object(obj));
        }
        if let Some(&child) = collection.children.get(frame.next_child) {
            frame.next_child += 1;
            return Some(Step::Child(child));
        }
        Some(Step::Done)
    }

    fn visit_object(&mut self, id: ObjectId) {
        let object = self.scene.object(id);
        if let Some(mesh_id) = object.mesh {
            let mesh = self.scene.mesh(mesh_id);
            if self.settings.is_excluded(&mesh.name) {
                if self.reported_skip.insert(mesh_id) {
                    self.out.diagnostics.push(Diagnostic::SkippedMesh {
                        mesh: mesh.name.clone(),
                    });
                }
            } else if !self.written.insert(mesh_id) {
                if self.reported_duplicate.insert(mesh_id) {
                    self.out.diagnostics.push(Diagnostic::DuplicateMesh {
                        mesh: mesh.name.clone(),
                        object: object.name.clone(),
                    });
                } else {
                    tracing::debug!("{:?} also references {:?}", object.name, mesh.name);
                }
            } else {
                self.out.items.push(MeshWorkItem {
                    mesh: mesh_id,
                    name: &mesh.name,
                    via_object: &object.name,
                    data: mesh,
                });
            }
        }
        if let Some(instance) = object.instance_collection {
            self.enter(instance);
        }
    }

    fn run(mut self, root: CollectionId) -> Collected<'s> {
        self.enter(root);
        while let Some(step) = self.next_step() {
            match step {
                Step::Object(id) => self.visit_object(id),
                Step::Child(id) => self.enter(id),
                Step::Done => {
                    self.stack.pop();
                }
            }
        }
        self.out
    }
}

/// Produce the ordered, deduplicated list of meshes reachable from `root`.
pub fn collect_meshes<'s>(
    scene: &'s Scene,
    root: CollectionId,
    settings: CollectSettings,
) -> Collected<'s> {
    Traversal {
        scene,
        settings,
        entered: HashSet::default(),
        written: HashSet::default(),
        reported_duplicate: HashSet::default(),
        reported_skip: HashSet::default(),
        stack: vec![],
        out: Collected::default(),
    }
    .run(root)
}
