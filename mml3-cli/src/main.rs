use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Import from mml3-core
use mml3_core::{xml, Node, TransformConfig, Transformer};

// Import CLI utilities
use mml3::{Stage, StepProfiler};

#[derive(Parser)]
#[command(name = "mml3")]
#[command(about = "Rewrites elementary-math and right-to-left MathML into base presentation MathML")]
struct Args {
    /// Path to the MathML file to transform
    #[arg(short, long, required_unless_present = "show_configs")]
    input: Option<String>,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Output format: xml or json
    #[arg(short = 'f', long = "format", default_value = "xml")]
    output_format: String,

    /// Show available config options and exit
    #[arg(long)]
    show_configs: bool,

    /// Output file path (if not specified, auto-generated based on input)
    #[arg(short, long)]
    output: Option<String>,

    /// Turn the transform off and copy the input tree through
    #[arg(long)]
    disable: bool,

    /// Print timings for parse, transform and write
    #[arg(long)]
    profile: bool,

    /// Write the input tree, output tree and a summary as JSON
    #[arg(long)]
    dump_stages: Option<String>,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .init();

    let args = Args::parse();

    println!("🧮 MML3 MathML Normalizer");

    if args.show_configs {
        show_help();
        return Ok(());
    }

    let Some(input) = args.input.as_deref() else {
        anyhow::bail!("--input is required");
    };
    if !Path::new(input).exists() {
        println!("⚠️  Input MathML not found at: {}", input);
        println!("   Please check the file path.");
        return Ok(());
    }

    let mut config = TransformConfig::load_with_fallback(args.config.as_deref());
    if let Some(config_path) = &args.config {
        println!("📋 Loaded config from: {}", config_path);
    } else {
        println!("📋 Using default config");
    }

    // Apply CLI overrides to config
    if args.disable {
        config.enabled = false;
        println!("⏸️  Transform disabled, input will be copied through");
    }

    let transformer = Transformer::with_config(config).context("invalid rule configuration")?;
    let mut profiler = StepProfiler::new(args.profile);

    println!("📄 Processing: {}", input);

    let source = profiler.time_step(Stage::Read, || std::fs::read_to_string(input))?;
    let tree = match profiler.time_step(Stage::Parse, || xml::parse(&source)) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("❌ Could not parse {}: {e}", input);
            std::process::exit(1);
        }
    };
    let output = profiler.time_step(Stage::Transform, || transformer.transform(&tree));

    if let Some(stages_dir) = &args.dump_stages {
        println!("\n🔬 Stage dump mode");
        save_stages(input, &tree, &output, &profiler, stages_dir)?;
        println!("✅ All stages dumped to: {}", stages_dir);
    }

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(input, &args.output_format));
    profiler.time_step(Stage::Write, || {
        save_output(&output, &output_path, &args.output_format)
    })?;

    println!("✅ Successfully transformed document");
    profiler.print_summary();
    Ok(())
}

/// `<stem>_normalized.<ext>` next to the input
fn default_output_path(input: &str, format: &str) -> String {
    let path = Path::new(input);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let extension = match format {
        "json" => "json",
        _ => path.extension().and_then(|s| s.to_str()).unwrap_or("xml"),
    };
    let file_name = format!("{stem}_normalized.{extension}");
    match path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        Some(parent) => parent.join(file_name).to_string_lossy().into_owned(),
        None => file_name,
    }
}

fn show_help() {
    println!("\n📋 Available Configuration Options:");
    println!("  --config <path>         Load custom config file");
    println!("  --input <path>          MathML file to transform");
    println!("  --output <path>         Output file path (auto-generated if not specified)");
    println!("  --format <fmt>          Output format: xml or json");
    println!("  --disable               Copy the input through untouched");
    println!("  --profile               Print step timings");
    println!("  --dump-stages <dir>     Write input/output trees and a summary as JSON");

    println!("\n📄 Config file (YAML):");
    println!("  enabled: true");
    println!("  max_depth: 256");
    println!("  pipeline:");
    println!("    rules:");
    println!("      - name: Mirror");
    println!("      - name: ElementaryMath");
    println!("  stack:");
    println!("    align: decimalpoint      # left, right, center, decimalpoint");
    println!("    decimal_point: \".\"");
    println!("    line_thickness: medium   # thin, medium, thick or a length");

    println!("\n📝 Usage Examples:");
    println!("  mml3 -i division.mml");
    println!("  mml3 -i division.mml -o /path/to/output.mml");
    println!("  mml3 -i division.mml -c config.yaml -f json");
    println!("\n🔈 Set RUST_LOG=mml3_core=debug to see rule registration and dispatch");
}

fn save_stages(
    input: &str,
    tree: &Node,
    output: &Node,
    profiler: &StepProfiler,
    output_dir: &str,
) -> Result<()> {
    use std::fs;
    fs::create_dir_all(output_dir)?;

    let input_path = format!("{}/stage1_input_tree.json", output_dir);
    fs::write(&input_path, serde_json::to_string_pretty(tree)?)?;
    println!("  💾 {}", input_path);

    let output_path = format!("{}/stage2_output_tree.json", output_dir);
    fs::write(&output_path, serde_json::to_string_pretty(output)?)?;
    println!("  💾 {}", output_path);

    // Summary file: quick reference for validation scripts
    let summary = serde_json::json!({
        "input": input,
        "captured_at": chrono::Utc::now().to_rfc3339(),
        "stage_counts": {
            "input_elements": count_elements(tree),
            "output_elements": count_elements(output),
        },
        "timings_ms": profiler.to_json(),
    });
    let summary_path = format!("{}/summary.json", output_dir);
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
    println!("  💾 {}", summary_path);

    Ok(())
}

fn count_elements(node: &Node) -> usize {
    match node {
        Node::Element { children, .. } => 1 + children.iter().map(count_elements).sum::<usize>(),
        Node::Text { .. } => 0,
    }
}

fn save_output(output: &Node, output_path: &str, format: &str) -> Result<()> {
    let rendered = match format {
        "json" => serde_json::to_string_pretty(output)?,
        "xml" => xml::to_string(output),
        _ => {
            println!("⚠️  Unknown output format '{}', using xml", format);
            xml::to_string(output)
        }
    };
    std::fs::write(output_path, rendered)
        .with_context(|| format!("failed to write {}", output_path))?;
    println!("💾 Results saved to: {}", output_path);
    Ok(())
}
