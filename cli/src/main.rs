//! pdfdocx CLI - rebuild editable Word documents from PDF files

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdfdocx::convert::Phase;
use pdfdocx::layout::Clusterer;
use pdfdocx::render::{to_json, JsonFormat};
use pdfdocx::{
    analyze_bytes, output_filename, progress_channel, ConvertOptions, LayoutMode, LopdfBackend,
    PageSelection, PdfBackend, PdfDocx,
};

#[derive(Parser)]
#[command(name = "pdfdocx")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Convert PDF files to editable Word documents", long_about = None)]
struct Cli {
    /// Input PDF file
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output .docx file
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a PDF to .docx
    Convert {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (input name with .docx if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// Dump the reconstructed layout as JSON
    Inspect {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// Show document information
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

/// Layout flags shared by `convert` and `inspect`.
#[derive(Args, Clone, Default)]
struct LayoutArgs {
    /// Layout strategy
    #[arg(long, value_enum, env = "PDFDOCX_MODE")]
    mode: Option<Mode>,

    /// Page range (e.g., "1-10", "1,3,5")
    #[arg(long, env = "PDFDOCX_PAGES")]
    pages: Option<String>,

    /// Vertical tolerance for grouping runs into lines, in points
    #[arg(long, env = "PDFDOCX_ROW_TOLERANCE")]
    row_tolerance: Option<f32>,

    /// Font family for all text
    #[arg(long, env = "PDFDOCX_FONT")]
    font: Option<String>,

    /// Maximum display width of page images, in pixels
    #[arg(long, env = "PDFDOCX_MAX_IMAGE_WIDTH")]
    max_image_width: Option<u32>,

    /// Rasterization scale for pages without text (minimum 2)
    #[arg(long, env = "PDFDOCX_RASTER_SCALE")]
    raster_scale: Option<f32>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// One paragraph per line, gaps become tabs (editable)
    Flow,
    /// One positioned frame per text segment (faithful)
    Absolute,
}

impl From<Mode> for LayoutMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Flow => LayoutMode::Flow,
            Mode::Absolute => LayoutMode::Absolute,
        }
    }
}

impl LayoutArgs {
    fn to_options(&self) -> Result<ConvertOptions, Box<dyn std::error::Error>> {
        let mut options = ConvertOptions::new();

        if let Some(mode) = self.mode {
            options = options.with_layout_mode(mode.into());
        }
        if let Some(ref pages) = self.pages {
            let selection =
                PageSelection::parse(pages).map_err(|e| format!("Invalid page range: {}", e))?;
            options = options.with_pages(selection);
        }
        if let Some(tolerance) = self.row_tolerance {
            options = options.with_row_tolerance(tolerance);
        }
        if let Some(ref font) = self.font {
            options = options.with_font_family(font.as_str());
        }
        if let Some(width) = self.max_image_width {
            options = options.with_max_image_width(width);
        }
        if let Some(scale) = self.raster_scale {
            options = options.with_raster_scale(scale);
        }

        Ok(options)
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Convert {
            input,
            output,
            layout,
        }) => cmd_convert(&input, output.as_deref(), &layout),
        Some(Commands::Inspect {
            input,
            output,
            compact,
            layout,
        }) => cmd_inspect(&input, output.as_deref(), compact, &layout),
        Some(Commands::Info { input }) => cmd_info(&input),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: convert if input is provided
            if let Some(input) = cli.input {
                cmd_convert(&input, cli.output.as_deref(), &LayoutArgs::default())
            } else {
                println!("{}", "Usage: pdfdocx <FILE> [OUTPUT]".yellow());
                println!("       pdfdocx --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn cmd_convert(
    input: &Path,
    output: Option<&Path>,
    layout: &LayoutArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = layout.to_options()?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| output_filename(input));
    let data = fs::read(input)?;

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message("Opening PDF...");

    // Layout runs on a worker; the channel closes when it finishes
    let (tx, rx) = progress_channel();
    let worker = thread::spawn(move || {
        PdfDocx::with_options(options)
            .with_progress(tx)
            .convert_bytes(&data)
    });

    for update in rx.iter() {
        pb.set_position(update.percent as u64);
        match (update.phase, update.page) {
            (Phase::Layout, Some(page)) => pb.set_message(format!(
                "Page {} ({} selected)",
                page, update.total_pages
            )),
            (Phase::Packaging, _) => pb.set_message("Writing document..."),
            _ => {}
        }
    }

    let conversion = match worker.join() {
        Ok(result) => result?,
        Err(_) => return Err("conversion worker panicked".into()),
    };

    fs::write(&output, &conversion.bytes)?;
    pb.finish_with_message("Done!");

    let pages = conversion.document.section_count();
    let images = conversion.fallback_pages();
    println!(
        "\n{} {} ({} pages, {} as images)",
        "Saved to".green().bold(),
        output.display(),
        pages,
        images
    );

    Ok(())
}

fn cmd_inspect(
    input: &Path,
    output: Option<&Path>,
    compact: bool,
    layout: &LayoutArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = layout.to_options()?;
    let data = fs::read(input)?;
    let doc = analyze_bytes(&data, &options)?;

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };

    let json = to_json(&doc, format)?;

    if let Some(path) = output {
        fs::write(path, &json)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let header = pdfdocx::detect::sniff_file(input)?;
    let backend = LopdfBackend::load_file(input)?;
    let metadata = backend.metadata();

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), header.version);
    println!("{}: {}", "Pages".bold(), metadata.page_count);

    if let Some(ref title) = metadata.title {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(ref author) = metadata.author {
        println!("{}: {}", "Author".bold(), author);
    }
    if let Some(ref creator) = metadata.creator {
        println!("{}: {}", "Creator".bold(), creator);
    }
    if let Some(ref producer) = metadata.producer {
        println!("{}: {}", "Producer".bold(), producer);
    }
    if let Some(ref created) = metadata.created {
        println!("{}: {}", "Created".bold(), created);
    }
    if let Some(ref modified) = metadata.modified {
        println!("{}: {}", "Modified".bold(), modified);
    }

    println!();
    println!("{}", "Pages".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let clusterer = Clusterer::default();
    let mut image_pages = 0;
    for page in 1..=backend.page_count() {
        let size = backend.page_size(page)?;
        let runs = backend.text_content(page);
        let run_count = runs.len();
        let rows = clusterer.rows(runs);

        let kind = if rows.is_empty() {
            image_pages += 1;
            "image".yellow()
        } else {
            "text".green()
        };
        println!(
            "  {:>4}  {:>6.1} x {:<6.1} {:<6} {} runs, {} lines",
            page,
            size.width,
            size.height,
            kind,
            run_count,
            rows.len()
        );
    }

    println!();
    println!(
        "{}: {}",
        "Pages without text".bold(),
        if image_pages == 0 {
            "none".to_string()
        } else {
            image_pages.to_string()
        }
    );

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "pdfdocx".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF to Word layout reconstruction tool");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/pdfdocx".dimmed());
    println!("License: MIT");
}
