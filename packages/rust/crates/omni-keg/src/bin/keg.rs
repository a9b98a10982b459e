#![allow(missing_docs)]

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use omni_keg::{
    CreateOptions, EditorConfig, IndexOptions, Keg, KegConfig, KegTarget, NodeId, NodeRef,
    RuntimeConfig, Stream, edit_node,
};
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "keg",
    about = "Keg CLI: numbered markdown nodes with tag and link indexes",
    arg_required_else_help = true
)]
struct Cli {
    /// Keg target: a directory, `file:<dir>`, or `memory:`.
    #[arg(long, short = 'k', value_name = "TARGET", global = true)]
    keg: Option<String>,

    /// Runtime config file (YAML).
    #[arg(long = "conf", short = 'c', value_name = "FILE", global = true)]
    config_file: Option<PathBuf>,

    /// Output format.
    #[arg(long, short = 'o', value_enum, default_value_t = OutputFormat::Text, global = true)]
    output: OutputFormat,

    /// Debug logging on stderr (overridden by `RUST_LOG`).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new keg with node 0.
    Init {
        #[arg(long, default_value = "")]
        title: String,
    },
    /// Create a node. Piped stdin becomes the body.
    Create {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        lead: Option<String>,
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },
    /// Print a node body (`--meta` prepends its metadata as frontmatter).
    Cat {
        id: NodeId,
        #[arg(long)]
        meta: bool,
    },
    /// Edit a node in an external editor.
    Edit {
        id: NodeId,
        /// Editor command overriding `KEG_EDITOR` / `EDITOR`.
        #[arg(long)]
        editor: Option<String>,
    },
    /// Update the dex.
    Index {
        /// Reprocess every node.
        #[arg(long)]
        rebuild: bool,
        /// Do not repair stats or metadata files.
        #[arg(long)]
        no_update: bool,
    },
    /// List indexed nodes.
    Nodes,
    /// List tags, or nodes matching a tag expression.
    Tags { expr: Option<String> },
    /// Outbound links of a node.
    Links { id: NodeId },
    /// Nodes linking to a node.
    Backlinks { id: NodeId },
    /// Renumber a node and rewrite references to it.
    Mv { src: NodeId, dst: NodeId },
    /// Remove a node.
    Rm { id: NodeId },
    /// Print the id the next `create` would use.
    Next,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Pretty,
}

fn emit<T: Serialize>(value: &T, output: OutputFormat, text: impl FnOnce() -> String) -> Result<()> {
    let rendered = match output {
        OutputFormat::Json => serde_json::to_string(value),
        OutputFormat::Pretty => serde_json::to_string_pretty(value),
        OutputFormat::Text => Ok(text()),
    }
    .context("failed to serialize CLI output as JSON")?;
    if !rendered.is_empty() {
        println!("{rendered}");
    }
    Ok(())
}

fn render_rows(rows: &[NodeRef]) -> String {
    rows.iter()
        .map(|row| {
            format!(
                "{}\t{}\t{}",
                row.id,
                row.updated.format("%Y-%m-%d %H:%M:%SZ"),
                row.title
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn rows_for<'a>(keg: &Keg, ids: impl IntoIterator<Item = &'a NodeId>) -> Vec<NodeRef> {
    ids.into_iter()
        .filter_map(|id| keg.dex().get_ref(id).cloned())
        .collect()
}

fn open(target: &KegTarget) -> Result<Keg> {
    Keg::open(target.open()).context("failed to open keg (run `keg init` first?)")
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    token
}

async fn execute(cli: &Cli, runtime: &RuntimeConfig, target: &KegTarget) -> Result<()> {
    let output = cli.output;
    match &cli.command {
        Command::Init { title } => {
            let keg = Keg::init(target.open(), KegConfig::titled(title.clone()))?;
            let name = keg.store().name().to_string();
            emit(&json!({ "keg": name, "nodes": keg.dex().len() }), output, || {
                format!("initialized {name}")
            })
        }
        Command::Create { title, lead, tags } => {
            let mut keg = open(target)?;
            let options = CreateOptions {
                title: title.clone(),
                lead: lead.clone(),
                tags: tags.clone(),
                ..CreateOptions::default()
            }
            .seed_from(&mut Stream::stdin())?;
            let id = keg.create(&options)?;
            keg.index(IndexOptions::default())?;
            emit(&json!({ "id": id }), output, || id.to_string())
        }
        Command::Cat { id, meta } => {
            let keg = open(target)?;
            let bytes = if *meta {
                keg.edit_buffer(id)?.into_bytes()
            } else {
                keg.read_content(id)?
            };
            std::io::stdout()
                .write_all(&bytes)
                .context("failed to write node to stdout")
        }
        Command::Edit { id, editor } => {
            let mut keg = open(target)?;
            let config = match editor {
                Some(command) => EditorConfig {
                    debounce: runtime.editor.debounce,
                    tick: runtime.editor.tick,
                    ..EditorConfig::from_command(command)?
                },
                None => runtime.editor.clone(),
            };
            let cancel = cancel_on_ctrl_c();
            let summary = edit_node(&keg, id, &config, &cancel).await?;
            keg.index(IndexOptions::default())?;
            emit(
                &json!({ "id": id, "saved": summary.saved, "unchanged": summary.unchanged }),
                output,
                || format!("{id}: {} save(s) applied", summary.saved),
            )
        }
        Command::Index { rebuild, no_update } => {
            let mut keg = open(target)?;
            let report = keg.index(IndexOptions {
                rebuild: *rebuild,
                no_update: *no_update,
            })?;
            emit(&report, output, || {
                format!(
                    "{} nodes, {} processed, {} unchanged, {} removed",
                    report.nodes, report.processed, report.unchanged, report.removed
                )
            })
        }
        Command::Nodes => {
            let keg = open(target)?;
            let rows: Vec<NodeRef> = keg.dex().nodes().cloned().collect();
            emit(&rows, output, || render_rows(&rows))
        }
        Command::Tags { expr: None } => {
            let keg = open(target)?;
            let tags = keg.dex().tag_list();
            emit(&tags, output, || tags.join("\n"))
        }
        Command::Tags { expr: Some(expr) } => {
            let keg = open(target)?;
            let ids = keg.query_tags(expr)?;
            let rows = rows_for(&keg, &ids);
            emit(&rows, output, || render_rows(&rows))
        }
        Command::Links { id } => {
            let keg = open(target)?;
            let rows = rows_for(&keg, keg.dex().links(id));
            emit(&rows, output, || render_rows(&rows))
        }
        Command::Backlinks { id } => {
            let keg = open(target)?;
            let rows = rows_for(&keg, keg.dex().backlinks(id));
            emit(&rows, output, || render_rows(&rows))
        }
        Command::Mv { src, dst } => {
            let mut keg = open(target)?;
            let rewritten = keg.move_node(src, dst)?;
            keg.index(IndexOptions::default())?;
            emit(
                &json!({ "from": src, "to": dst, "rewritten": rewritten }),
                output,
                || format!("{src} -> {dst} ({} node(s) rewritten)", rewritten.len()),
            )
        }
        Command::Rm { id } => {
            let mut keg = open(target)?;
            keg.remove(id)?;
            keg.index(IndexOptions::default())?;
            emit(&json!({ "removed": id }), output, || format!("removed {id}"))
        }
        Command::Next => {
            let keg = open(target)?;
            let id = keg.peek_next_id()?;
            emit(&json!({ "id": id }), output, || id.to_string())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose {
            "omni_keg=debug"
        } else {
            "omni_keg=warn"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let runtime = RuntimeConfig::load(cli.config_file.as_deref())?;
    let target = match &cli.keg {
        Some(raw) => KegTarget::parse(raw)?,
        None => runtime
            .target
            .clone()
            .unwrap_or_else(|| KegTarget::Local(PathBuf::from("."))),
    };
    execute(&cli, &runtime, &target).await
}
