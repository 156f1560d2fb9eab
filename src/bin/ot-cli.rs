//! Command-line debugging surface for the OT core.
//!
//! This binary has no bearing on the algebraic core's correctness — it's a
//! thin driver over `compose`/`xform`/`Doc`/`Server` for inspecting and
//! replaying JSON-encoded operations from a shell.

use std::ffi::OsString;
use std::fs;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use collab_ot::{compose, xform, Codec, Doc, JsonCodec, Op};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Enable debug-level logging from the client/server state machines.
    #[arg(long, global = true)]
    debug: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build an operation from a sequence of edits and append it to a
    /// document file (a JSON array of encoded ops), rewriting the file.
    Apply {
        /// Document file to read and rewrite. Created fresh if missing.
        filename: OsString,

        /// Client id to stamp the new operation with.
        #[arg(long, default_value_t = 0)]
        client_id: u32,

        /// Maximum document size in code points (0 = unlimited). Only
        /// takes effect when `filename` doesn't exist yet.
        #[arg(long, default_value_t = 0)]
        max_size: u32,

        /// One edit per flag, applied in the order given. Each is
        /// "skip:N", "insert:TEXT", or "delete:N".
        #[arg(long = "edit", value_name = "KIND:ARG")]
        edits: Vec<String>,
    },

    /// Compose two single-operation JSON files and print the result.
    Compose { a: OsString, b: OsString },

    /// Transform two single-operation JSON files and print the pair as
    /// `{"a": ..., "b": ...}`.
    Xform { a: OsString, b: OsString },

    /// Feed a document file's operations through a fresh server in order
    /// and print the converged snapshot.
    Replay { filename: OsString },
}

fn parse_edit(op: &mut Op, edit: &str) -> Result<()> {
    let (kind, arg) = edit.split_once(':').with_context(|| format!("edit `{edit}` is missing a `:`"))?;
    match kind {
        "skip" => {
            op.skip(arg.parse().with_context(|| format!("invalid skip count `{arg}`"))?);
        }
        "insert" => {
            op.insert(arg);
        }
        "delete" => {
            op.delete(arg.parse().with_context(|| format!("invalid delete count `{arg}`"))?);
        }
        other => bail!("unknown edit kind `{other}` (expected skip, insert, or delete)"),
    }
    Ok(())
}

fn read_op(path: &OsString) -> Result<Op> {
    let json = fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
    JsonCodec.decode_op(&json).map_err(|e| anyhow::anyhow!("decoding {path:?}: {e}"))
}

fn read_doc(path: &OsString, max_size: u32) -> Result<Doc> {
    let mut doc = Doc::with_max_size(max_size);
    let Ok(json) = fs::read_to_string(path) else {
        return Ok(doc);
    };
    let ops = JsonCodec.decode_ops(&json).map_err(|e| anyhow::anyhow!("decoding {path:?}: {e}"))?;
    for op in ops {
        doc.append(op).map_err(|e| anyhow::anyhow!("replaying {path:?}: {e}"))?;
    }
    Ok(doc)
}

fn write_doc(path: &OsString, doc: &Doc) -> Result<()> {
    let json = JsonCodec.encode_ops(doc.history());
    fs::write(path, json).with_context(|| format!("writing {path:?}"))
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("collab_ot={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Apply { filename, client_id, max_size, edits } => {
            let mut doc = read_doc(&filename, max_size)?;
            let mut op = Op::new(client_id);
            for edit in &edits {
                parse_edit(&mut op, edit)?;
            }
            doc.append(op).map_err(|e| anyhow::anyhow!("appending: {e}"))?;
            write_doc(&filename, &doc)?;
            println!("{}", doc.composed().map(|op| op.snapshot()).unwrap_or_default());
        }
        Commands::Compose { a, b } => {
            let a = read_op(&a)?;
            let b = read_op(&b)?;
            let composed = compose(&a, &b).map_err(|e| anyhow::anyhow!("compose failed: {e}"))?;
            println!("{}", JsonCodec.encode_op(&composed));
        }
        Commands::Xform { a, b } => {
            let a = read_op(&a)?;
            let b = read_op(&b)?;
            let (a_prime, b_prime) = xform(&a, &b).map_err(|e| anyhow::anyhow!("xform failed: {e}"))?;
            println!(
                r#"{{"a":{},"b":{}}}"#,
                JsonCodec.encode_op(&a_prime),
                JsonCodec.encode_op(&b_prime)
            );
        }
        Commands::Replay { filename } => {
            let doc = read_doc(&filename, 0)?;
            println!("{}", doc.composed().map(|op| op.snapshot()).unwrap_or_default());
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    run()
}
