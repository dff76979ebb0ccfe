//! Kit Creator - compose and edit layered character kits from the command line.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use kit_model::{ColorVariant, KitStructure};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use creator::{CreatorConfig, Session};

/// Kit Creator - layered character composition
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Kit server root
    #[arg(long, default_value = "http://localhost:8000/")]
    server: String,

    /// Folder on the server holding the kits
    #[arg(long, default_value = "downloads/")]
    kit_base: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the kits on the server
    Kits,

    /// Compose a character and save it as PNG
    Render {
        /// Kit folder (defaults to the first kit)
        #[arg(long)]
        kit: Option<String>,

        /// Equip an item: PART=ITEM or PART=ITEM:COLOR
        #[arg(long = "select", value_parser = parse_selection)]
        selections: Vec<SelectionArg>,

        /// Unequip a part
        #[arg(long = "none")]
        cleared: Vec<String>,

        /// Start from a random look
        #[arg(long)]
        randomize: bool,

        /// Seed for --randomize
        #[arg(long)]
        seed: Option<u64>,

        /// Chance that --randomize leaves a part empty
        #[arg(long)]
        skip: Option<f64>,

        /// Draw at the kit's full canvas size instead of the display width
        #[arg(long)]
        full_size: bool,

        /// Output file
        #[arg(short, long, default_value = "my-character.png")]
        output: String,
    },

    /// Stack raw images of a part and flatten them into an item
    Merge {
        /// Kit folder
        #[arg(long)]
        kit: String,

        /// Part folder
        #[arg(long)]
        part: String,

        /// Color folder (defaults to the part's first color)
        #[arg(long)]
        color: Option<String>,

        /// Files to stack, bottom first
        #[arg(required = true)]
        files: Vec<String>,

        /// Tint a file: FILE=RRGGBB
        #[arg(long = "tint", value_parser = parse_tint)]
        tints: Vec<(String, String)>,

        /// Save the preview to this file
        #[arg(long)]
        preview: Option<String>,

        /// Commit the merge as this item number
        #[arg(long)]
        commit: Option<String>,

        /// Apply the merge to every color of the part
        #[arg(long)]
        bulk: bool,
    },

    /// Download a kit as a zip archive
    Zip {
        /// Kit folder
        #[arg(long)]
        kit: String,

        /// Output file (defaults to KIT.zip)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Generate missing thumbnails, or delete them all
    Thumbs {
        /// Kit folder
        #[arg(long)]
        kit: String,

        /// Delete every thumbnail instead
        #[arg(long)]
        delete: bool,
    },

    /// List the files of a part folder
    Files {
        /// Kit folder
        #[arg(long)]
        kit: String,

        /// Part folder
        #[arg(long)]
        part: String,

        /// Color folder (defaults to the part's first color)
        #[arg(long)]
        color: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct SelectionArg {
    part: String,
    item: u32,
    color: Option<String>,
}

fn parse_selection(s: &str) -> Result<SelectionArg, String> {
    let (part, rest) = s
        .split_once('=')
        .ok_or_else(|| format!("expected PART=ITEM[:COLOR], got {s:?}"))?;
    let (item, color) = match rest.split_once(':') {
        Some((item, color)) => (item, Some(color.to_string())),
        None => (rest, None),
    };
    let item = item
        .parse()
        .map_err(|_| format!("item must be a positive number, got {item:?}"))?;
    Ok(SelectionArg {
        part: part.to_string(),
        item,
        color,
    })
}

fn parse_tint(s: &str) -> Result<(String, String), String> {
    let (file, hex) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected FILE=RRGGBB, got {s:?}"))?;
    Ok((file.to_string(), hex.to_string()))
}

fn part_index(structure: &KitStructure, folder: &str) -> Result<usize> {
    structure
        .index_of(folder)
        .ok_or_else(|| anyhow!("kit {} has no part {}", structure.kit, folder))
}

fn variant_index(structure: &KitStructure, part: usize, color: Option<&str>) -> Result<usize> {
    let Some(color) = color else {
        return Ok(0);
    };
    let part = &structure.parts[part];
    part.variant_index(&ColorVariant::named(color))
        .ok_or_else(|| anyhow!("part {} has no color {}", part.folder, color))
}

fn report_advisories(structure: &KitStructure) {
    for line in structure.advisories.warnings() {
        eprintln!("warning: {line}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Kit Creator v{}", creator::VERSION);

    let config = CreatorConfig::default()
        .with_server(&args.server)
        .with_kit_base(&args.kit_base)
        .with_timeout(std::time::Duration::from_secs(args.timeout));

    match args.command {
        Command::Kits => {
            let mut session = Session::connect(config)?;
            session.refresh_kits().await?;
            for kit in session.kits() {
                println!("{}\t{}", kit.folder, kit.name);
            }
        }

        Command::Render {
            kit,
            selections,
            cleared,
            randomize,
            seed,
            skip,
            full_size,
            output,
        } => {
            let mut config = config;
            if full_size {
                config = config.with_display_width(None);
            }
            if let Some(skip) = skip {
                config = config.with_skip_probability(skip);
            }
            let mut session = Session::connect(config)?;
            if let Some(seed) = seed {
                session = session.with_seed(seed);
            }

            match kit {
                Some(kit) => {
                    session.switch_kit(&kit).await?;
                }
                None => {
                    session.refresh_kits().await?;
                }
            }
            let structure = session
                .structure()
                .cloned()
                .ok_or_else(|| anyhow!("the server has no kits"))?;
            report_advisories(&structure);

            if randomize {
                session.randomize()?;
            }
            for selection in &selections {
                let part = part_index(&structure, &selection.part)?;
                let color = variant_index(&structure, part, selection.color.as_deref())?;
                session
                    .select(part, selection.item, color)
                    .with_context(|| format!("selecting {}={}", selection.part, selection.item))?;
            }
            for folder in &cleared {
                session.deselect(part_index(&structure, folder)?)?;
            }

            let report = session.render_now().await?;
            info!("Render finished: {:?}", report.outcome);
            std::fs::write(&output, session.compositor().encode_png()?)
                .with_context(|| format!("writing {output}"))?;
            println!("Saved {output}");
        }

        Command::Merge {
            kit,
            part,
            color,
            files,
            tints,
            preview,
            commit,
            bulk,
        } => {
            let mut session = Session::connect(config)?;
            session.switch_kit(&kit).await?;
            let structure = session
                .structure()
                .cloned()
                .ok_or_else(|| anyhow!("kit {kit} did not load"))?;
            let part = part_index(&structure, &part)?;
            let color = variant_index(&structure, part, color.as_deref())?;

            let mut tool = session.open_merge(part, color).await?;
            for file in &files {
                tool.add_to_stack(file).await?;
            }
            for (file, hex) in &tints {
                tool.set_color_adjustment(file, hex).await?;
            }

            if let Some(path) = &preview {
                tool.preview().save_png(path)?;
                println!("Saved preview {path}");
            }

            if let Some(destination) = commit.as_deref() {
                if destination.trim().is_empty() {
                    bail!("--commit needs an item number");
                }
                let (reply, handle) = session.commit_merge(&mut tool, Some(destination), bulk).await?;
                handle.await?;
                println!("{}", reply.message);
            }
        }

        Command::Zip { kit, output } => {
            let mut session = Session::connect(config)?;
            session.switch_kit(&kit).await?;
            let output = output.unwrap_or_else(|| format!("{kit}.zip"));
            let archive = session.download_kit().await?;
            std::fs::write(&output, &archive).with_context(|| format!("writing {output}"))?;
            println!("Saved {output} ({} bytes)", archive.len());
        }

        Command::Thumbs { kit, delete } => {
            let mut session = Session::connect(config)?;
            session.switch_kit(&kit).await?;
            if delete {
                let (reply, _) = session.delete_all_thumbs().await?;
                println!("{}", reply.message);
            } else {
                let (stats, _) = session.create_missing_thumbs().await?;
                println!(
                    "Scanned {} folders, {} images: created {}, skipped {}",
                    stats.total_folders, stats.total_images, stats.created_thumbs, stats.skipped_thumbs
                );
                for detail in &stats.details {
                    println!("  {}: +{}", detail.folder, detail.created);
                }
            }
        }

        Command::Files { kit, part, color } => {
            let mut session = Session::connect(config)?;
            session.switch_kit(&kit).await?;
            let structure = session
                .structure()
                .cloned()
                .ok_or_else(|| anyhow!("kit {kit} did not load"))?;
            let part = part_index(&structure, &part)?;
            let color = variant_index(&structure, part, color.as_deref())?;
            for file in session.folder_files(part, color).await? {
                println!("{}\t{:?}\t{}", file.name, file.kind(), file.location);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selection() {
        assert_eq!(
            parse_selection("1-2=3").unwrap(),
            SelectionArg { part: "1-2".into(), item: 3, color: None }
        );
        assert_eq!(
            parse_selection("1-2=3:FF0000").unwrap().color.as_deref(),
            Some("FF0000")
        );
        assert!(parse_selection("1-2").is_err());
        assert!(parse_selection("1-2=x").is_err());
    }

    #[test]
    fn test_parse_tint() {
        assert_eq!(
            parse_tint("a=b.png=00FF00").unwrap(),
            ("a=b.png".to_string(), "00FF00".to_string())
        );
        assert!(parse_tint("a.png").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "kit-creator",
            "render",
            "--select",
            "1-1=2",
            "--randomize",
            "--seed",
            "9",
        ])
        .unwrap();
        match args.command {
            Command::Render { selections, randomize, seed, .. } => {
                assert_eq!(selections.len(), 1);
                assert!(randomize);
                assert_eq!(seed, Some(9));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_kit_file_commands_parse() {
        let args = Args::try_parse_from(["kit-creator", "zip", "--kit", "kit_1"]).unwrap();
        assert!(matches!(args.command, Command::Zip { output: None, .. }));

        let args = Args::try_parse_from(["kit-creator", "thumbs", "--kit", "kit_1", "--delete"]).unwrap();
        assert!(matches!(args.command, Command::Thumbs { delete: true, .. }));

        let args = Args::try_parse_from(["kit-creator", "files", "--kit", "k", "--part", "1-1"]).unwrap();
        match args.command {
            Command::Files { part, color, .. } => {
                assert_eq!(part, "1-1");
                assert_eq!(color, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
