//! Live build output
//!
//! Opens the build view of the sync context and prints output as it grows,
//! until the build reaches EOF, the session is redirected, or the user
//! interrupts.

use anyhow::{Context, Result, bail};
use carpentry_sync::{SessionEnd, SyncContext, SyncEvent, SyncSession, View};
use colored::*;
use std::io::Write;
use std::pin::pin;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use super::build::status_label;

/// Follow the output of a build until it ends
pub async fn watch_build(
    context: &SyncContext,
    events: &mut UnboundedReceiver<SyncEvent>,
    builder_id: Uuid,
    build_id: Uuid,
) -> Result<()> {
    let session = context
        .activate(View::BuildDetail {
            builder_id,
            build_id,
        })
        .into_session()
        .context("Build view did not start an output session")?;

    let mut printer = OutputPrinter::default();
    let mut finished = pin!(session.finished());
    let mut interrupt = pin!(tokio::signal::ctrl_c());
    let mut interrupted = false;

    let end = loop {
        tokio::select! {
            end = &mut finished => break end,
            _ = &mut interrupt, if !interrupted => {
                interrupted = true;
                context.deactivate();
            }
            Some(event) = events.recv() => match event {
                SyncEvent::BuildUpdated { build_id: updated, .. } if updated == build_id => {
                    printer.print(&session)?;
                }
                SyncEvent::Notify(message) => eprintln!("{}", message.yellow()),
                _ => {}
            },
        }
    };

    // the last update may still be queued behind the end of the session
    printer.print(&session)?;
    report_end(&session, end)
}

fn report_end(session: &SyncSession, end: SessionEnd) -> Result<()> {
    match end {
        SessionEnd::Eof => {
            let status = session.snapshot().map(|build| build.status);
            match status {
                Some(status) => println!("\n{} {}", "Build finished:".bold(), status_label(status)),
                None => println!("\n{}", "Build finished.".bold()),
            }
            Ok(())
        }
        SessionEnd::Exhausted => {
            println!(
                "\n{}",
                "Stopped following: polling limit reached, the build may still be running."
                    .yellow()
            );
            Ok(())
        }
        SessionEnd::Cancelled => {
            println!("\n{}", "Stopped following.".dimmed());
            Ok(())
        }
        SessionEnd::Redirected => bail!("Not authorized: log in again and pass a fresh --token"),
    }
}

/// Prints only the part of the output not shown yet
#[derive(Default)]
struct OutputPrinter {
    shown: String,
}

impl OutputPrinter {
    fn print(&mut self, session: &SyncSession) -> Result<()> {
        let Some(build) = session.snapshot() else {
            return Ok(());
        };

        let mut stdout = std::io::stdout().lock();
        match build.stdout.strip_prefix(self.shown.as_str()) {
            Some(delta) => stdout.write_all(delta.as_bytes())?,
            // the server rewrote earlier output; start over
            None => {
                writeln!(stdout, "{}", "─".repeat(80).dimmed())?;
                stdout.write_all(build.stdout.as_bytes())?;
            }
        }
        stdout.flush()?;

        self.shown = build.stdout;
        Ok(())
    }
}
