use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use log::info;
use std::path::{Path, PathBuf};

use gltf_engine::config::{Config, EngineConfig};
use gltf_engine::document::{load_file_with_config, Document};
use gltf_engine::foundation::logging::{self, LevelFilter};
use gltf_engine::foundation::math::Mat4;
use gltf_engine::render::{HeadlessBackend, RenderItem, SceneRenderer};
use gltf_engine::scene::scene_bounds;

fn main() -> Result<()> {
    let matches = Command::new("gltf_inspect")
        .about("Loads a glTF scene, renders one headless frame and prints a summary")
        .arg(
            Arg::new("file")
                .value_name("FILE")
                .help("Scene file (.gltf or .glb)")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("scale")
                .short('s')
                .long("scale")
                .value_name("FACTOR")
                .help("Uniform scale applied to the scene")
                .value_parser(value_parser!(f32)),
        )
        .arg(
            Arg::new("scene")
                .long("scene")
                .value_name("INDEX")
                .help("Scene to render instead of the document default")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .help("Engine settings (.toml or .ron)")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .help("Increase log verbosity (-v info, -vv debug, -vvv trace)")
                .action(ArgAction::Count),
        )
        .get_matches();

    logging::init_with_level(match matches.get_count("verbose") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    });

    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(scale) = matches.get_one::<f32>("scale") {
        config.renderer.scale = *scale;
    }
    if let Some(scene) = matches.get_one::<usize>("scene") {
        config.renderer.scene = Some(*scene);
    }
    info!("Renderer settings: {:?}", config.renderer);

    let Some(path) = matches.get_one::<PathBuf>("file") else {
        anyhow::bail!("no scene file given");
    };
    let document = load_file_with_config(path, &config.loader)
        .with_context(|| format!("failed to load {}", path.display()))?;
    print_document(path, &document);

    let mut renderer = SceneRenderer::with_config(document, HeadlessBackend::new(), config.renderer)
        .context("failed to build renderer")?;
    let identity = Mat4::identity();
    let stats = renderer.render_default(&identity, &identity, &identity);

    println!();
    println!("Render lists:");
    print_items("opaque", renderer.lists().opaque());
    print_items("transparent", renderer.lists().transparent());

    println!();
    println!(
        "Frame: {} opaque, {} transparent, {} skipped ({} GPU buffers, {} textures)",
        stats.opaque_drawn,
        stats.transparent_drawn,
        stats.skipped,
        renderer.backend().buffer_count(),
        renderer.backend().texture_count()
    );

    let bounds = scene_bounds(renderer.document());
    if bounds.is_empty() {
        println!("Bounds: empty");
    } else {
        let (min, max) = (bounds.min(), bounds.max());
        println!(
            "Bounds: ({:.3}, {:.3}, {:.3}) .. ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
    }

    if !renderer.warnings().is_empty() {
        println!();
        println!("Warnings:");
        for warning in renderer.warnings() {
            println!("  {warning}");
        }
    }

    Ok(())
}

fn print_document(path: &Path, document: &Document) {
    println!("{}", path.display());
    println!(
        "  asset {} ({})",
        document.asset.version,
        document.asset.generator.as_deref().unwrap_or("unknown generator")
    );
    let sections = [
        ("scenes", document.scenes.len()),
        ("nodes", document.nodes.len()),
        ("meshes", document.meshes.len()),
        ("materials", document.materials.len()),
        ("accessors", document.accessors.len()),
        ("buffer views", document.buffer_views.len()),
        ("buffers", document.buffers.len()),
        ("textures", document.textures.len()),
        ("images", document.images.len()),
        ("samplers", document.samplers.len()),
        ("cameras", document.cameras.len()),
        ("skins", document.skins.len()),
        ("animations", document.animations.len()),
    ];
    for (name, count) in sections {
        println!("  {name:<13}{count}");
    }
    let unresolved = document.buffers.iter().filter(|b| b.data.is_none()).count();
    if unresolved > 0 {
        println!("  {unresolved} buffer(s) without payload");
    }
}

fn print_items(label: &str, items: &[RenderItem]) {
    println!("  {label}: {}", items.len());
    for item in items {
        println!(
            "    node {:>3}  mesh {:>3}  primitive {:>2}  material {:<8}{:?}{}",
            item.node,
            item.mesh,
            item.primitive,
            item.material.map_or_else(|| "default".to_string(), |m| m.to_string()),
            item.flags,
            if item.is_drawable() { "" } else { "  (not drawn)" }
        );
    }
}
