#![warn(clippy::pedantic)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result as AnyResult;
use clap::{Parser, Subcommand};
use inkflip_core::{
    brush::{BrushConfig, Tool},
    color::Rgba,
    settings::EditorSettings,
    state::LayerRole,
    store::SqliteLayerStore,
    stroke::StrokeSample,
    Editor,
};

mod export;
mod preferences;

#[derive(Parser, Debug)]
#[command(name = "inkflip", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a project database.
    New {
        project: PathBuf,
        /// Number of empty frames.
        #[arg(long, default_value_t = 1)]
        frames: usize,
        /// Draw a short bouncing-line animation into the frames.
        #[arg(long, default_value_t = false)]
        demo: bool,
    },
    /// Describe the frames of a project.
    Info { project: PathBuf },
    /// Write every frame as `frame_NNNN.png` into a directory.
    Export {
        project: PathBuf,
        out: PathBuf,
        /// Include onion skin overlays.
        #[arg(long, default_value_t = false)]
        onion: bool,
    },
    /// Run playback for a while, logging each frame change.
    Play {
        project: PathBuf,
        #[arg(long, default_value_t = 5.0)]
        seconds: f32,
        /// Override the configured frame rate.
        #[arg(long)]
        fps: Option<f32>,
    },
    /// Print the effective settings.
    Settings {
        /// Write them to the preferences file.
        #[arg(long, default_value_t = false)]
        write: bool,
    },
}

async fn open(project: &std::path::Path, settings: EditorSettings) -> AnyResult<Editor> {
    let store = Arc::new(SqliteLayerStore::new(project));
    Ok(Editor::open(store, settings).await?)
}

async fn cmd_new(
    project: PathBuf,
    frames: usize,
    demo: bool,
    settings: EditorSettings,
) -> AnyResult<()> {
    if project.exists() {
        anyhow::bail!("{} already exists", project.display());
    }
    let mut editor = open(&project, settings).await?;
    for _ in 1..frames.max(1) {
        editor.add_frame().await?;
    }
    if demo {
        draw_demo(&mut editor).await?;
    }
    log::info!(
        "created {} with {} frames",
        project.display(),
        editor.frames().len()
    );
    Ok(())
}

/// A white background and a line that sweeps down the canvas over the frames.
async fn draw_demo(editor: &mut Editor) -> AnyResult<()> {
    let [width, height] = editor.settings().canvas.map(|v| v as f32);
    let count = editor.frames().len();
    let brush = BrushConfig::new(Tool::Brush, (height / 40.0).max(1.0), Rgba::BLACK);
    for index in 0..count {
        editor.select_frame(index).await?;
        editor.select_layer(LayerRole::Background).await?;
        editor.fill(0, 0, "#ffffff").await?;

        editor.select_layer(LayerRole::Lineart).await?;
        let progress = (index as f32 + 0.5) / count as f32;
        let y = height * progress;
        let mut samples = (0..=8).map(|i| {
            let t = i as f32 / 8.0;
            let wobble = (t * std::f32::consts::TAU).sin() * height * 0.05;
            StrokeSample::new(width * (0.1 + 0.8 * t), y + wobble, 0.5 + 0.5 * t)
        });
        if let Some(first) = samples.next() {
            editor.start_stroke(first, &brush).await?;
        }
        for sample in samples {
            editor.add_sample(sample, &brush);
        }
        editor.end_stroke().await?;
    }
    editor.select_frame(0).await?;
    Ok(())
}

async fn cmd_info(project: PathBuf, settings: EditorSettings) -> AnyResult<()> {
    if !project.exists() {
        anyhow::bail!("{} does not exist", project.display());
    }
    let editor = open(&project, settings).await?;
    log::info!("{}: {} frames", project.display(), editor.frames().len());
    for frame in editor.frames() {
        log::info!(
            "frame {} ({}): background {}, lineart {}, color {}",
            frame.index,
            frame.id,
            frame.layer(LayerRole::Background),
            frame.layer(LayerRole::Lineart),
            frame.layer(LayerRole::Color),
        );
    }
    Ok(())
}

async fn cmd_play(
    project: PathBuf,
    seconds: f32,
    fps: Option<f32>,
    settings: EditorSettings,
) -> AnyResult<()> {
    let mut editor = open(&project, settings).await?;
    if let Some(fps) = fps {
        editor.set_rate(fps)?;
    }
    let duration = std::time::Duration::try_from_secs_f32(seconds)?;
    // Roughly a display refresh.
    let poll = std::time::Duration::from_millis(16);

    let start = std::time::Instant::now();
    editor.play().await?;
    while start.elapsed() < duration {
        tokio::time::sleep(poll).await;
        if let Some(index) = editor.tick().await? {
            let composite = editor.render_frame(index).await?;
            let inked = composite.pixels().iter().filter(|p| !p.is_transparent()).count();
            log::info!(
                "{:>8.3}s frame {index} ({inked} pixels)",
                start.elapsed().as_secs_f32()
            );
        }
    }
    editor.stop();
    Ok(())
}

fn cmd_settings(write: bool) -> AnyResult<()> {
    let preferences = preferences::Preferences::load();
    if write {
        let path = preferences.save()?;
        log::info!("wrote {}", path.display());
    } else {
        println!("{}", preferences.to_toml()?);
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> AnyResult<()> {
    let has_term = std::io::IsTerminal::is_terminal(&std::io::stdin());
    // Log to a terminal, if available. Else, log to "log.out" in the working directory.
    if has_term {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        let _ = simple_logging::log_to_file("log.out", log::LevelFilter::Debug);
    }

    let cli = Cli::parse();
    let settings = || {
        let preferences = preferences::Preferences::load();
        if preferences.did_fail_to_load() {
            log::info!("using default settings");
        }
        preferences.settings
    };
    match cli.cmd {
        Command::New {
            project,
            frames,
            demo,
        } => cmd_new(project, frames, demo, settings()).await,
        Command::Info { project } => cmd_info(project, settings()).await,
        Command::Export {
            project,
            out,
            onion,
        } => {
            let mut editor = open(&project, settings()).await?;
            export::export(&mut editor, &out, onion).await
        }
        Command::Play {
            project,
            seconds,
            fps,
        } => cmd_play(project, seconds, fps, settings()).await,
        Command::Settings { write } => cmd_settings(write),
    }
}
