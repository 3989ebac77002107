use crate::config::WindowConfig;
use crate::emit::ChannelEmitter;
use crate::event_model::{AttributeValue, GroupKey, SnapshotCause};
use crate::window::WindowRuntime;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};
use std::thread;

/// Input row accepted on stdin, one JSON object per line.
#[derive(Debug, Deserialize)]
struct InputRow {
    #[serde(default)]
    key: Option<AttributeValue>,
    #[serde(default)]
    priority: Option<i64>,
    #[serde(default)]
    attributes: Vec<AttributeValue>,
}

#[derive(Debug, Serialize)]
struct OutputRow<'a> {
    key: String,
    priority: i64,
    cause: SnapshotCause,
    emitted_at_ms: u64,
    attributes: &'a [AttributeValue],
}

/// Runs the stdin/stdout driver for the config file named on the command line.
pub fn run() -> Result<()> {
    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: priority-window <config.json>");
    };
    let config = WindowConfig::load_from_file(&path)
        .with_context(|| format!("loading window config from {path}"))?;
    let (emitter, receiver) = ChannelEmitter::<GroupKey>::channel();
    let runtime =
        WindowRuntime::start(&config, emitter).context("starting priority window runtime")?;

    let printer = thread::Builder::new()
        .name("snapshot_printer".into())
        .spawn(move || -> Result<()> {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            for snapshot in receiver {
                let row = OutputRow {
                    key: snapshot.key.to_string(),
                    priority: snapshot.score,
                    cause: snapshot.cause,
                    emitted_at_ms: snapshot.emitted_at_ms,
                    attributes: &snapshot.passthrough,
                };
                serde_json::to_writer(&mut out, &row)?;
                out.write_all(b"\n")?;
                out.flush()?;
            }
            Ok(())
        })
        .context("spawning snapshot printer")?;

    let stdin = io::stdin();
    for (line_no, line) in stdin.lock().lines().enumerate() {
        let line = line.context("reading stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let row: InputRow = serde_json::from_str(&line)
            .with_context(|| format!("parsing input line {}", line_no + 1))?;
        let key = row.key.as_ref().and_then(GroupKey::from_attribute);
        runtime.on_event(key, row.priority, row.attributes);
    }

    while !runtime.wait_idle(config.period()) {}
    runtime.shutdown();
    drop(runtime);
    match printer.join() {
        Ok(result) => result,
        Err(_) => bail!("snapshot printer panicked"),
    }
}
