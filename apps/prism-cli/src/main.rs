use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::{Quat, Vec3, Vec4};
use prism_common::{ComponentKind, SceneConfig};
use prism_registry::Handle;
use prism_render::{DebugTextRenderer, RecordingBackend, RenderView, Renderer, SceneSync};
use prism_scene::{
    Camera, EntityParts, Light, LightStruct, Material, Scene, Texture, Transform,
};
use prism_tools::SceneInspector;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "prism-cli", about = "CLI for the prism scene layer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Scene capacities as JSON; defaults apply to missing fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions and registry capacities
    Info,
    /// Build a small scene and synchronize it for a few frames
    Demo {
        /// Number of frames to run
        #[arg(short, long, default_value = "3")]
        frames: u64,
    },
    /// Edit a light from one thread while another synchronizes frames
    Stress {
        /// Number of edits made by the editing thread
        #[arg(short, long, default_value = "10000")]
        edits: u32,
    },
    /// Print the JSON description of a record in the demo scene
    Inspect {
        /// Component kind (light, texture, volume, camera, material, entity, transform)
        kind: ComponentKind,
        /// Record name
        name: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = match &cli.config {
        Some(path) => SceneConfig::load(path)
            .with_context(|| format!("loading scene config from {}", path.display()))?,
        None => SceneConfig::default(),
    };

    match cli.command {
        Commands::Info => {
            println!("prism-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", prism_common::crate_info());
            println!("registry: {}", prism_registry::crate_info());
            println!("scene: {}", prism_scene::crate_info());
            println!("render: {}", prism_render::crate_info());
            println!("tools: {}", prism_tools::crate_info());
            for kind in ComponentKind::ALL {
                println!("  {:<10} capacity={}", kind.as_str(), config.capacity(kind));
            }
        }
        Commands::Demo { frames } => {
            let scene = Scene::with_config(&config)?;
            let demo = build_demo_scene(&scene)?;
            let mut backend = RecordingBackend::new();
            let mut sync = SceneSync::new();

            for _ in 0..frames {
                scene
                    .transforms
                    .edit(demo.cube, |t| t.add_rotation(Quat::from_rotation_y(0.1)))?;
                let stats = sync.frame(&scene, &mut backend)?;
                println!("{stats}");
            }

            print!("{}", SceneInspector::summary(&scene)?);
            let view = RenderView {
                camera: Some(demo.camera),
                ..RenderView::default()
            };
            print!("{}", DebugTextRenderer::new().render(&scene, &view)?);
        }
        Commands::Stress { edits } => {
            let scene = Scene::with_config(&config)?;
            let light = Light::create(&scene.lights, "stress")?;
            let mut backend = RecordingBackend::new();
            let mut sync = SceneSync::new();
            let done = AtomicBool::new(false);

            std::thread::scope(|s| -> anyhow::Result<()> {
                let editor = s.spawn(|| -> anyhow::Result<()> {
                    for i in 0..edits {
                        scene.lights.edit(light, |l| l.set_intensity(i as f32))?;
                    }
                    done.store(true, Ordering::Release);
                    Ok(())
                });
                while !done.load(Ordering::Acquire) && !editor.is_finished() {
                    sync.frame(&scene, &mut backend)?;
                }
                editor
                    .join()
                    .map_err(|_| anyhow::anyhow!("editing thread panicked"))??;
                Ok(())
            })?;

            sync.frame(&scene, &mut backend)?;
            let uploaded = backend
                .structs::<LightStruct>(ComponentKind::Light)
                .and_then(|lights| lights.get(light.index() as usize).copied())
                .context("light array was never uploaded")?;
            let expected = edits.saturating_sub(1) as f32;
            println!(
                "edits={edits} frames={} uploads={} final_intensity={} expected={expected}",
                sync.frames(),
                backend.upload_count(ComponentKind::Light),
                uploaded.intensity
            );
            anyhow::ensure!(
                edits == 0 || uploaded.intensity == expected,
                "render thread missed the last edit"
            );
        }
        Commands::Inspect { kind, name } => {
            let scene = Scene::with_config(&config)?;
            build_demo_scene(&scene)?;
            scene.update_components()?;
            match SceneInspector::inspect(&scene, kind, &name)? {
                Some(json) => println!("{json}"),
                None => {
                    println!("no {kind} named {name:?}; available:");
                    for (name, id) in SceneInspector::list(&scene, kind)? {
                        println!("  [{id}] {name}");
                    }
                }
            }
        }
    }

    Ok(())
}

struct DemoScene {
    camera: Handle<Camera>,
    cube: Handle<Transform>,
}

fn build_demo_scene(scene: &Scene) -> anyhow::Result<DemoScene> {
    let camera = Camera::create_perspective_from_fov(&scene.cameras, "main", 0.8, 16.0 / 9.0)?;
    let eye = Transform::create_with_transform(
        &scene.transforms,
        "eye",
        Vec3::new(0.0, 2.0, 6.0),
        Quat::IDENTITY,
        Vec3::ONE,
    )?;
    scene.create_entity(
        "camera",
        EntityParts {
            transform: Some(eye),
            camera: Some(camera),
            ..EntityParts::default()
        },
    )?;

    let checker = Texture::create_from_data(
        &scene.textures,
        "checker",
        2,
        2,
        vec![Vec4::ONE, Vec4::W, Vec4::W, Vec4::ONE],
    )?;
    let paint = Material::create(&scene.materials, "paint")?;
    scene.materials.edit(paint, |m| {
        m.set_base_color_texture(Some(checker));
        m.set_roughness(0.3);
    })?;
    let cube = Transform::create(&scene.transforms, "cube")?;
    scene.create_entity(
        "cube",
        EntityParts {
            transform: Some(cube),
            material: Some(paint),
            ..EntityParts::default()
        },
    )?;

    let sun = Light::create_from_temperature(&scene.lights, "sun", 5500.0, 5.0)?;
    let sky = Transform::create_with_transform(
        &scene.transforms,
        "sky",
        Vec3::new(0.0, 10.0, 0.0),
        Quat::IDENTITY,
        Vec3::splat(2.0),
    )?;
    scene.create_entity(
        "sun",
        EntityParts {
            transform: Some(sky),
            light: Some(sun),
            ..EntityParts::default()
        },
    )?;

    tracing::info!("demo scene built");
    Ok(DemoScene { camera, cube })
}
