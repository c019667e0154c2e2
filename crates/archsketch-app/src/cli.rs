//! Headless command line: create, inspect and flatten projects.

use archsketch_core::canvas::CanvasError;
use archsketch_core::scene::ItemKind;
use archsketch_core::storage::{FileStorage, StorageError};
use archsketch_core::surface::{RasterSurface, SurfaceError};
use archsketch_core::{Canvas, CanvasConfig, ItemId};
use archsketch_render::{RenderContext, Renderer, RendererError, SoftwareRenderer};
use clap::{Parser, Subcommand};
use kurbo::Size;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// ArchSketch project tool.
#[derive(Parser, Debug)]
#[command(name = "archsketch", version, about = "Create, inspect and flatten ArchSketch projects")]
pub struct Cli {
    /// JSON config file; missing fields use defaults.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an empty project with one layer.
    New {
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        #[arg(long, default_value = "Untitled")]
        name: String,
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Flatten all visible items to a PNG.
    Flatten {
        project: PathBuf,
        #[arg(short, long, value_name = "FILE.png")]
        output: PathBuf,
        /// Draw the active guides on top.
        #[arg(long)]
        with_guides: bool,
    },
    /// Export one item, cropped to its content, as a PNG.
    ExportItem {
        project: PathBuf,
        #[arg(long, value_name = "ID")]
        item: String,
        #[arg(short, long, value_name = "FILE.png")]
        output: PathBuf,
    },
    /// Print the document structure.
    Info { project: PathBuf },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Config(#[from] serde_json::Error),
    #[error(transparent)]
    Canvas(#[from] CanvasError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Render(#[from] RendererError),
    #[error("Invalid item id '{0}'")]
    InvalidItem(String),
    #[error("Item {0} has no visible pixels")]
    EmptyItem(ItemId),
}

pub type AppResult<T> = Result<T, AppError>;

pub fn run(args: Cli) -> AppResult<()> {
    let config = load_config(args.config.as_deref())?;
    match args.command {
        Command::New { width, height, name, output } => {
            let config = CanvasConfig {
                canvas_width: width.unwrap_or(config.canvas_width),
                canvas_height: height.unwrap_or(config.canvas_height),
                ..config
            };
            let mut canvas = Canvas::new(config)?;
            canvas.document.name = name;
            FileStorage::write_path(&output, &canvas.to_project()?)?;
            log::info!("Created {}", output.display());
        }
        Command::Flatten { project, output, with_guides } => {
            let canvas = open(&project, config)?;
            let image = if with_guides { render_with_guides(canvas)? } else { canvas.composite()? };
            write_png(&output, &image)?;
        }
        Command::ExportItem { project, item, output } => {
            let canvas = open(&project, config)?;
            let id: ItemId = item.parse().map_err(|_| AppError::InvalidItem(item.clone()))?;
            let image = canvas.export_item(id)?.ok_or(AppError::EmptyItem(id))?;
            write_png(&output, &image)?;
        }
        Command::Info { project } => {
            let canvas = open(&project, config)?;
            print!("{}", describe(&canvas));
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> AppResult<CanvasConfig> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            log::debug!("Loaded config from {}", path.display());
            Ok(CanvasConfig::from_json(&json)?)
        }
        None => Ok(CanvasConfig::default()),
    }
}

fn open(path: &Path, config: CanvasConfig) -> AppResult<Canvas> {
    let project = FileStorage::read_path(path)?;
    Ok(Canvas::from_project(&project, config)?)
}

fn write_png(path: &Path, image: &RasterSurface) -> AppResult<()> {
    std::fs::write(path, image.to_png_bytes()?)?;
    log::info!("Wrote {}x{} image to {}", image.width(), image.height(), path.display());
    Ok(())
}

/// Artwork plus guides at 100% zoom, canvas-sized.
fn render_with_guides(mut canvas: Canvas) -> AppResult<RasterSurface> {
    let size = canvas.canvas_size();
    canvas.set_viewport_size(size);
    canvas.document.view.reset();
    let mut renderer = SoftwareRenderer::new();
    let frame = renderer.render(&RenderContext::new(&canvas).with_viewport(size))?;
    Ok(frame.flatten())
}

/// Human-readable summary of the document.
pub fn describe(canvas: &Canvas) -> String {
    let scene = canvas.scene();
    let Size { width, height } = canvas.canvas_size();
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", canvas.document.name, canvas.document.id);
    let _ = writeln!(out, "canvas: {}x{}", width, height);
    for (id, depth) in scene.layer_rows() {
        let Some(item) = scene.get(id) else { continue };
        let kind = match item.kind() {
            _ if item.is_background() => "background",
            ItemKind::Object => "object",
            ItemKind::Group => "group",
        };
        let marker = if canvas.active_item() == Some(id) { "*" } else { " " };
        let _ = writeln!(
            out,
            "{marker} {:indent$}{} [{}] {} opacity={:.2} blend={:?}{}",
            "",
            item.name,
            kind,
            id,
            item.opacity,
            item.blend_mode,
            if item.visible { "" } else { " hidden" },
            indent = depth * 2
        );
    }
    let guides: Vec<String> = canvas.guides().active_kinds().map(|k| format!("{k:?}")).collect();
    if !guides.is_empty() {
        let _ = writeln!(out, "guides: {}", guides.join(", "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(args: &[&str]) -> AppResult<()> {
        run(Cli::try_parse_from(args).unwrap())
    }

    #[test]
    fn test_new_then_info() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        let p = path.to_str().unwrap();
        run_args(&["archsketch", "new", "--width", "40", "--height", "30", "--name", "Plan", "-o", p]).unwrap();
        let canvas = open(&path, CanvasConfig::default()).unwrap();
        assert_eq!(canvas.scene().dimensions(), (40, 30));
        let text = describe(&canvas);
        assert!(text.starts_with("Plan"));
        assert!(text.contains("Layer 1 [object]"));
        assert!(text.contains("[background]"));
    }

    #[test]
    fn test_flatten_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("p.json");
        let png = dir.path().join("out.png");
        let (p, o) = (project.to_str().unwrap(), png.to_str().unwrap());
        run_args(&["archsketch", "new", "--width", "24", "--height", "16", "-o", p]).unwrap();
        run_args(&["archsketch", "flatten", p, "-o", o, "--with-guides"]).unwrap();
        let image = RasterSurface::from_encoded_bytes(&std::fs::read(&png).unwrap()).unwrap();
        assert_eq!(image.dimensions(), (24, 16));
        assert_eq!(image.pixel(5, 5), [255, 255, 255, 255]);
    }

    #[test]
    fn test_export_empty_or_unknown_item() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("p.json");
        let png = dir.path().join("item.png");
        let (p, o) = (project.to_str().unwrap(), png.to_str().unwrap());
        run_args(&["archsketch", "new", "--width", "8", "--height", "8", "-o", p]).unwrap();
        let layer = open(&project, CanvasConfig::default()).unwrap().active_item().unwrap().to_string();

        let err = run_args(&["archsketch", "export-item", p, "--item", &layer, "-o", o]).unwrap_err();
        assert!(matches!(err, AppError::EmptyItem(_)));
        let err = run_args(&["archsketch", "export-item", p, "--item", "nope", "-o", o]).unwrap_err();
        assert!(matches!(err, AppError::InvalidItem(_)));
    }

    #[test]
    fn test_config_file_sets_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.json");
        std::fs::write(&config, r#"{"canvas_width": 12, "canvas_height": 6}"#).unwrap();
        let project = dir.path().join("p.json");
        let (c, p) = (config.to_str().unwrap(), project.to_str().unwrap());
        run_args(&["archsketch", "--config", c, "new", "-o", p]).unwrap();
        let canvas = open(&project, CanvasConfig::default()).unwrap();
        assert_eq!(canvas.scene().dimensions(), (12, 6));
    }

    #[test]
    fn test_missing_project_fails() {
        let err = run_args(&["archsketch", "info", "/nonexistent/archsketch.json"]).unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }
}
