//! Duck CLI - export JSON scene descriptions and inspect `.dsc` files.

use std::env;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use duck::config::ExportSettings;
use duck::container::ContainerReader;
use duck::document::{Object, Value};
use duck::export::Exporter;
use duck::scene::MemoryScene;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = "info";
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "error",
            _ => filtered_args.push(arg),
        }
    }
    init_logging(level);

    if filtered_args.is_empty() {
        print_help();
        return ExitCode::SUCCESS;
    }

    let result = match filtered_args[0] {
        "export" | "e" => cmd_export(&filtered_args[1..]),
        "info" | "i" => match filtered_args.get(1) {
            Some(path) => cmd_info(path),
            None => Err(anyhow!("missing file argument\nUsage: duck-cli info <file.dsc>")),
        },
        "dump" | "d" => match filtered_args.get(1) {
            Some(path) => cmd_dump(path, filtered_args.get(2).copied()),
            None => Err(anyhow!("missing file argument\nUsage: duck-cli dump <file.dsc> [path]")),
        },
        "version" => {
            println!("duck-cli {} ({})", env!("CARGO_PKG_VERSION"), duck::BUILD_DATE);
            Ok(())
        }
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        // A bare .dsc path is shorthand for info
        path if path.ends_with(".dsc") => cmd_info(path),
        other => Err(anyhow!("unknown command '{}', see 'duck-cli help'", other)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` takes precedence over the verbosity flags.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_help() {
    println!("duck-cli - Duck scene exporter");
    println!();
    println!("USAGE:");
    println!("    duck-cli [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    e, export <scene.json> <out.dsc>  Export a JSON scene description");
    println!("    i, info   <file.dsc>              Show container header and contents summary");
    println!("    d, dump   <file.dsc> [path]       Print the document (or a sub-tree) as JSON");
    println!("    version                         Show version and build date");
    println!("    h, help                         Show this help");
    println!();
    println!("EXPORT OPTIONS:");
    println!("    -a, --animation          Sample animation over the frame range");
    println!("    --frames <begin:end>     Inclusive frame range (default 1:250)");
    println!("    --level <0-9>            Deflate level (default 6)");
    println!("    --settings <file.json>   Load export settings; later flags override");
    println!("    --all                    Ignore per-node export flags");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Only show errors");
    println!();
    println!("EXAMPLES:");
    println!("    duck-cli export level.json level.dsc -a --frames 0:120");
    println!("    duck-cli info level.dsc");
    println!("    duck-cli dump level.dsc Scene/Root");
}

fn cmd_export(args: &[&str]) -> Result<()> {
    let mut settings = ExportSettings::default();
    let mut positional = Vec::new();
    let mut overrides: Vec<(&str, &str)> = Vec::new();

    let mut iter = args.iter().copied();
    while let Some(arg) = iter.next() {
        match arg {
            "-a" | "--animation" | "--all" => overrides.push((arg, "")),
            "--frames" | "--level" | "--settings" => {
                let value = iter.next().with_context(|| format!("{} needs a value", arg))?;
                if arg == "--settings" {
                    settings = ExportSettings::load(value)
                        .with_context(|| format!("loading settings from {}", value))?;
                } else {
                    overrides.push((arg, value));
                }
            }
            flag if flag.starts_with('-') => bail!("unknown export option '{}'", flag),
            _ => positional.push(arg),
        }
    }

    for (flag, value) in overrides {
        match flag {
            "-a" | "--animation" => settings.export_animation = true,
            "--all" => settings.ignore_export_flags = true,
            "--frames" => {
                let (begin, end) = parse_frames(value)?;
                settings.frame_begin = begin;
                settings.frame_end = end;
            }
            "--level" => {
                let level: u32 = value.parse().with_context(|| format!("invalid level '{}'", value))?;
                if level > 9 {
                    bail!("compression level {} out of range 0-9", level);
                }
                settings.compression_level = level;
            }
            _ => {}
        }
    }

    let &[input, output] = &positional[..] else {
        bail!("expected <scene.json> <out.dsc>\nUsage: duck-cli export <scene.json> <out.dsc> [options]");
    };
    debug!(?settings, "export settings");

    let mut scene = MemoryScene::load(input).with_context(|| format!("loading scene {}", input))?;
    let written = Exporter::new(settings)
        .export_file(&mut scene, output)
        .with_context(|| format!("exporting {}", output))?;
    info!("Wrote {} ({} bytes)", output, written);
    Ok(())
}

/// Parse `begin:end`.
fn parse_frames(value: &str) -> Result<(i32, i32)> {
    let (begin, end) = value
        .split_once(':')
        .with_context(|| format!("frame range '{}' is not begin:end", value))?;
    let begin = begin.trim().parse().with_context(|| format!("invalid begin frame '{}'", begin))?;
    let end = end.trim().parse().with_context(|| format!("invalid end frame '{}'", end))?;
    Ok((begin, end))
}

fn open(path: &str) -> Result<(ContainerReader, Object)> {
    let reader = ContainerReader::open(Path::new(path)).with_context(|| format!("opening {}", path))?;
    let document = reader.document().with_context(|| format!("reading document from {}", path))?;
    Ok((reader, document))
}

fn cmd_info(path: &str) -> Result<()> {
    let (reader, doc) = open(path)?;
    let header = reader.header();

    println!("File: {}", path);
    println!("  Container version: {}", header.container_version);
    println!("  Content version:   {}", header.content_version);
    println!("  Compressed size:   {} bytes", reader.size());
    println!("  Document size:     {} bytes", header.uncompressed_size);

    let mut nodes = 0;
    if let Some(roots) = lookup(&doc, "Scene/Root/Children").and_then(Value::as_array) {
        count_nodes(roots, &mut nodes);
    }
    let count = |key: &str| doc.get(key).and_then(Value::as_object).map_or(0, Object::len);
    println!("  Nodes:             {}", nodes);
    println!("  Meshes:            {}", count("Meshes"));
    println!("  Materials:         {}", count("Materials"));

    if let Some(animation) = doc.get("Animation").and_then(Value::as_object) {
        let get = |key: &str| animation.get(key).and_then(Value::as_i64).unwrap_or_default();
        let channels = animation.get("Channels").and_then(Value::as_array).map_or(0, <[Value]>::len);
        println!(
            "  Animation:         frames {}-{} at {} fps, {} channels",
            get("FrameBegin"),
            get("FrameEnd"),
            get("FrameRate"),
            channels
        );
    }
    Ok(())
}

fn count_nodes(nodes: &[Value], total: &mut usize) {
    for node in nodes {
        *total += 1;
        if let Some(children) = node.as_object().and_then(|o| o.get("Children")).and_then(Value::as_array) {
            count_nodes(children, total);
        }
    }
}

/// Follow a `/`-separated path of object keys and array indices.
fn lookup<'a>(doc: &'a Object, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('/').filter(|p| !p.is_empty());
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(o) => o.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn cmd_dump(path: &str, subtree: Option<&str>) -> Result<()> {
    let (_, doc) = open(path)?;
    let json = match subtree {
        Some(p) => lookup(&doc, p)
            .with_context(|| format!("no value at '{}'", p))?
            .to_json(),
        None => doc.to_json(),
    };
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
