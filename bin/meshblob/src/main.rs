use mesh_blob::collect::{CollectSettings, RESERVED_NAME_MARKER};
use mesh_blob::format::FormatTable;
use mesh_blob::scene::Scene;
use mesh_blob::write::{ExportSettings, export_scene};

use crate::prelude::*;
use crate::util::{SceneRef, format_target};

#[allow(unused_imports)]
mod prelude {
    pub use std::path::{Path, PathBuf};

    pub use anyhow::{Context, Result as AnyResult, bail};
}

mod util;

#[derive(clap::Parser, Debug)]
#[command(
    version,
    about = "Export the meshes referenced by a scene to a chunked binary blob.",
    long_about = "Export the meshes referenced by all objects in a scene \
        (or in one collection of it) to a binary blob, indexed by mesh name. \
        The extension of the output file selects which vertex attributes \
        are written: p[n][c][t] for position, normal, color, texcoord."
)]
struct Cli {
    /// Scene file, optionally suffixed with `:Collection`
    scene: String,
    /// Output file; its extension (.p, .pn, .pc, .pt, .pnc, .pnt, .pct, .pnct) selects the format
    out_file: PathBuf,
    /// Skip collections and meshes whose names start with an underscore
    #[arg(long)]
    skip_underscore: bool,
}

impl From<&Cli> for ExportSettings {
    fn from(args: &Cli) -> Self {
        Self {
            collect: CollectSettings {
                exclude_prefix: args.skip_underscore.then_some(RESERVED_NAME_MARKER),
            },
            pack: Default::default(),
        }
    }
}

fn run_command(cli: &Cli) -> AnyResult<()> {
    let table = FormatTable::builtin().context("Built-in format table is invalid")?;
    let format = table.resolve(&format_target(&cli.out_file))?;
    let scene_ref = SceneRef::parse(&cli.scene);

    match &scene_ref.collection {
        Some(name) => tracing::info!(
            "Will export meshes referenced from collection {:?} of {:?} to {:?} as {}.",
            name,
            scene_ref.path,
            cli.out_file,
            format,
        ),
        None => tracing::info!(
            "Will export meshes referenced from the root collection of {:?} to {:?} as {}.",
            scene_ref.path,
            cli.out_file,
            format,
        ),
    }

    let scene = Scene::load(&scene_ref.path).context("Cannot load scene")?;
    let root = match &scene_ref.collection {
        Some(name) => scene.collection_by_name(name)?,
        None => scene.root()?,
    };

    let export = export_scene(&scene, root, format, ExportSettings::from(cli))
        .context("Cannot encode mesh blob")?;
    mesh_blob::io::write_file_atomic(&cli.out_file, &export.blob.bytes)
        .context("Could not write output file")?;

    tracing::info!(
        "Wrote {} meshes, {} vertices, {} to {:?}",
        export.blob.n_meshes,
        export.blob.n_vertices,
        export.blob.summary(),
        cli.out_file,
    );
    if !export.diagnostics.is_empty() {
        tracing::info!("{} warnings/notes", export.diagnostics.len());
    }
    Ok(())
}

fn main() {
    use clap::{CommandFactory, Parser};
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    if let Err(e) = run_command(&cli) {
        eprintln!("Error: {:#}", e);
        if e.is::<mesh_blob::format::FormatError>() {
            eprintln!();
            eprintln!("{}", Cli::command().render_usage());
        }
        std::process::exit(2);
    }
}
