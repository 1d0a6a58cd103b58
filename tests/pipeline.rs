//! Scene -> blob -> reader, over the whole pipeline.

use mesh_blob::collect::CollectSettings;
use mesh_blob::diag::Diagnostic;
use mesh_blob::format::FormatTable;
use mesh_blob::header::IndexRecord;
use mesh_blob::read::MeshBlob;
use mesh_blob::scene::Scene;
use mesh_blob::write::{ExportSettings, export_scene};

const SCENE: &str = r#"{
    "collections": [
        { "name": "Scene Collection", "objects": ["Ground", "Spawner"], "children": ["Props"] },
        { "name": "Props", "objects": ["Crate", "Crate.001", "Self"] },
        { "name": "Library", "objects": ["Barrel"], "children": ["Props"] }
    ],
    "objects": [
        { "name": "Ground", "mesh": "Ground" },
        { "name": "Spawner", "instance_collection": "Library" },
        { "name": "Crate", "mesh": "Crate" },
        { "name": "Crate.001", "mesh": "Crate" },
        { "name": "Self", "instance_collection": "Props" },
        { "name": "Barrel", "mesh": "Barrel" }
    ],
    "meshes": [
        {
            "name": "Crate",
            "vertices": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            "loops": [
                { "vertex": 0, "normal": [0.0, 0.0, 1.0] },
                { "vertex": 1, "normal": [0.0, 0.0, 1.0] },
                { "vertex": 2, "normal": [0.0, 0.0, 1.0] },
                { "vertex": 2, "normal": [0.0, 0.0, 1.0] },
                { "vertex": 3, "normal": [0.0, 0.0, 1.0] },
                { "vertex": 0, "normal": [0.0, 0.0, 1.0] }
            ],
            "polygons": [[0, 1, 2], [3, 4, 5]],
            "color_layers": [
                { "name": "Col", "colors": [[1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 0.0],
                                            [0.0, 0.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0, 1.0]] }
            ],
            "uv_layers": [
                { "name": "UVMap", "uvs": [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]] }
            ]
        },
        {
            "name": "Ground",
            "vertices": [[-5.0, 0.0, -5.0], [5.0, 0.0, -5.0], [0.0, 0.0, 5.0]],
            "loops": [
                { "vertex": 0, "normal": [0.0, 1.0, 0.0] },
                { "vertex": 1, "normal": [0.0, 1.0, 0.0] },
                { "vertex": 2, "normal": [0.0, 1.0, 0.0] }
            ],
            "polygons": [[0, 1, 2]]
        },
        {
            "name": "Barrel",
            "vertices": [[0.0, 0.0, 0.0], [0.5, 0.0, 0.0], [0.0, 2.0, 0.0]],
            "loops": [
                { "vertex": 0, "normal": [1.0, 0.0, 0.0] },
                { "vertex": 1, "normal": [1.0, 0.0, 0.0] },
                { "vertex": 2, "normal": [1.0, 0.0, 0.0] }
            ],
            "polygons": [[0, 1, 2]]
        }
    ]
}"#;

fn export(scene: &Scene, suffix: &str) -> mesh_blob::write::Export {
    let format = FormatTable::builtin()
        .unwrap()
        .resolve(&format!("out{suffix}"))
        .unwrap();
    export_scene(scene, scene.root().unwrap(), format, ExportSettings::default()).unwrap()
}

#[test]
fn traversal_order_and_dedup() {
    let scene = Scene::from_json_str(SCENE).unwrap();
    let export = export(&scene, ".pnct");
    let blob = MeshBlob::from_bytes(&export.blob.bytes).unwrap();
    let names: Vec<_> = blob.entries().iter().map(|e| e.name.as_str()).collect();
    // Library is instanced before Props is reached as a child.
    assert_eq!(names, vec!["Ground", "Barrel", "Crate"]);
    let duplicates: Vec<_> = export
        .diagnostics
        .iter()
        .filter(|d| matches!(d, Diagnostic::DuplicateMesh { .. }))
        .collect();
    assert_eq!(
        duplicates,
        vec![&Diagnostic::DuplicateMesh {
            mesh: "Crate".into(),
            object: "Crate.001".into(),
        }]
    );
}

#[test]
fn round_trip_through_index() {
    let scene = Scene::from_json_str(SCENE).unwrap();
    for suffix in [".p", ".pn", ".pc", ".pt", ".pnc", ".pnt", ".pct", ".pnct"] {
        let export = export(&scene, suffix);
        let blob = MeshBlob::from_bytes(&export.blob.bytes).unwrap();
        let stride = blob.format().vertex_stride();
        assert_eq!(blob.data().len(), blob.n_vertices() * stride, "{suffix}");
        let mut next = 0;
        for (entry, rec) in blob.entries().iter().zip(blob.index()) {
            assert_eq!(rec.vertex_begin, next);
            assert_eq!(rec.vertex_count() % 3, 0);
            let bytes = blob.mesh_bytes(entry).unwrap();
            assert_eq!(bytes.len() / stride, rec.vertex_count() as usize);
            assert!(bytes.chunks_exact(stride).all(|v| v.len() == stride));
            next = rec.vertex_end;
        }
        assert_eq!(next as usize, blob.n_vertices());
    }
}

#[test]
fn export_is_idempotent() {
    let scene = Scene::from_json_str(SCENE).unwrap();
    let a = export(&scene, ".pnct");
    let b = export(&Scene::from_json_str(SCENE).unwrap(), ".pnct");
    assert_eq!(a.blob.bytes, b.blob.bytes);
}

#[test]
fn defaults_for_missing_layers() {
    let scene = Scene::from_json_str(SCENE).unwrap();
    let export = export(&scene, ".pnct");
    let blob = MeshBlob::from_bytes(&export.blob.bytes).unwrap();

    let ground = blob.lookup("Ground").unwrap();
    for v in blob.mesh_vertices(ground).unwrap() {
        assert_eq!(v.color, Some([255, 255, 255, 255]));
        assert_eq!(v.texcoord, Some([0.0, 0.0]));
        assert_eq!(v.normal, Some([0.0, 1.0, 0.0]));
    }

    let crate_mesh = blob.lookup("Crate").unwrap();
    let verts: Vec<_> = blob.mesh_vertices(crate_mesh).unwrap().collect();
    assert_eq!(verts.len(), 6);
    assert_eq!(verts[0].color, Some([255, 0, 0, 255]));
    assert_eq!(verts[5].color, Some([0, 0, 255, 255]));
    assert_eq!(verts[2].texcoord, Some([1.0, 1.0]));
    assert_eq!(verts[4].position, Some([0.0, 1.0, 0.0]));

    let missing: Vec<_> = export
        .diagnostics
        .iter()
        .filter(|d| matches!(d, Diagnostic::MissingColors { .. } | Diagnostic::MissingUvs { .. }))
        .filter_map(|d| d.mesh())
        .collect();
    assert_eq!(missing, vec!["Ground", "Ground", "Barrel", "Barrel"]);
}

#[test]
fn single_triangle_example() {
    let scene = Scene::from_json_str(
        r#"{
        "collections": [ { "name": "Scene Collection", "objects": ["Tri"] } ],
        "objects": [ { "name": "Tri", "mesh": "Tri" } ],
        "meshes": [ {
            "name": "Tri",
            "vertices": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            "loops": [ { "vertex": 0 }, { "vertex": 1 }, { "vertex": 2 } ],
            "polygons": [[0, 1, 2]]
        } ]
    }"#,
    )
    .unwrap();
    let export = export(&scene, ".pc");
    assert_eq!(export.blob.data_len, 48);
    let blob = MeshBlob::from_bytes(&export.blob.bytes).unwrap();
    assert_eq!(blob.strings(), b"Tri");
    assert_eq!(
        blob.index(),
        &[IndexRecord {
            name_begin: 0,
            name_end: 3,
            vertex_begin: 0,
            vertex_end: 3,
        }]
    );
    assert_eq!(export.blob.bytes.len(), 8 + 48 + 8 + 3 + 8 + 16);
}

#[test]
fn skip_underscore_filter() {
    let doc = SCENE.replace(r#""name": "Library""#, r#""name": "_Library""#)
        .replace(r#""instance_collection": "Library""#, r#""instance_collection": "_Library""#);
    let scene = Scene::from_json_str(&doc).unwrap();
    let format = FormatTable::builtin().unwrap().resolve("x.p").unwrap();
    let settings = ExportSettings {
        collect: CollectSettings {
            exclude_prefix: Some('_'),
        },
        ..Default::default()
    };
    let export = export_scene(&scene, scene.root().unwrap(), format, settings).unwrap();
    let blob = MeshBlob::from_bytes(&export.blob.bytes).unwrap();
    let names: Vec<_> = blob.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Ground", "Crate"]);
    assert!(export
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::SkippedCollection { collection } if collection == "_Library")));
}

#[test]
fn mesh_without_polygons_round_trips() {
    let scene = Scene::from_json_str(
        r#"{
        "collections": [ { "name": "Scene Collection", "objects": ["E", "T"] } ],
        "objects": [ { "name": "E", "mesh": "Empty" }, { "name": "T", "mesh": "Tri" } ],
        "meshes": [
            { "name": "Empty" },
            {
                "name": "Tri",
                "vertices": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                "loops": [ { "vertex": 0 }, { "vertex": 1 }, { "vertex": 2 } ],
                "polygons": [[0, 1, 2]]
            }
        ]
    }"#,
    )
    .unwrap();
    let export = export(&scene, ".p");
    let blob = MeshBlob::from_bytes(&export.blob.bytes).unwrap();
    let empty = blob.lookup("Empty").unwrap();
    assert_eq!(empty.vertices, 0..0);
    assert_eq!(blob.mesh_vertices(empty).unwrap().count(), 0);
    assert_eq!(blob.lookup("Tri").unwrap().vertices, 0..3);
}
