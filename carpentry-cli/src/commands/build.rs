//! Build command handlers
//!
//! Handles single builds: details, deletion and following live output.

use anyhow::{Context, Result};
use carpentry_core::domain::build::{Build, BuildStatus};
use carpentry_sync::SyncContext;
use clap::Subcommand;
use colored::*;
use uuid::Uuid;

use super::watch::watch_build;
use crate::config::Config;
use crate::id_resolver::{resolve_build_id_in_builder, resolve_builder_id};
use crate::types::IdOrPrefix;

/// Build subcommands
#[derive(Subcommand)]
pub enum BuildCommands {
    /// Show one build, including its output so far
    Get {
        /// Build ID, or a prefix when --builder is given
        id: IdOrPrefix,

        /// Builder to resolve a build id prefix in
        #[arg(short, long)]
        builder: Option<IdOrPrefix>,
    },
    /// Delete a build
    Delete {
        /// Build ID, or a prefix when --builder is given
        id: IdOrPrefix,

        /// Builder to resolve a build id prefix in
        #[arg(short, long)]
        builder: Option<IdOrPrefix>,
    },
    /// Follow a build's output until it finishes
    Watch {
        /// Builder ID or unambiguous prefix
        builder_id: IdOrPrefix,

        /// Build ID or unambiguous prefix
        build_id: IdOrPrefix,
    },
}

/// Handle build commands
pub async fn handle_build_command(command: BuildCommands, config: &Config) -> Result<()> {
    let (context, mut events) = config.connect()?;

    match command {
        BuildCommands::Get { id, builder } => {
            let build_id = resolve_build(&context, &id, builder.as_ref()).await?;
            let build = context.get_build(build_id).await?;
            print_build_details(&build);
            Ok(())
        }
        BuildCommands::Delete { id, builder } => {
            let build_id = resolve_build(&context, &id, builder.as_ref()).await?;
            delete_build(&context, build_id).await
        }
        BuildCommands::Watch {
            builder_id,
            build_id,
        } => {
            let builder_id = resolve_builder_id(&context, &builder_id).await?;
            let build_id = resolve_build_id_in_builder(&context, builder_id, &build_id).await?;
            watch_build(&context, &mut events, builder_id, build_id).await
        }
    }
}

/// Resolve a build id; prefixes need the builder to search in
async fn resolve_build(
    context: &SyncContext,
    id: &IdOrPrefix,
    builder: Option<&IdOrPrefix>,
) -> Result<Uuid> {
    match builder {
        Some(builder) => {
            let builder_id = resolve_builder_id(context, builder).await?;
            resolve_build_id_in_builder(context, builder_id, id).await
        }
        None => id
            .as_uuid()
            .with_context(|| format!("'{}' is not a full build id; pass --builder to use a prefix", id)),
    }
}

async fn delete_build(context: &SyncContext, build_id: Uuid) -> Result<()> {
    // the cache is keyed by builder, so look the build up first
    let build = context.get_build(build_id).await?;
    context.delete_build(build.builder_id, build_id).await?;

    println!(
        "{}",
        format!("✓ Build {} deleted successfully!", build_id)
            .green()
            .bold()
    );

    Ok(())
}

/// Colored status word
pub(crate) fn status_label(status: BuildStatus) -> ColoredString {
    match status {
        BuildStatus::Succeeded => status.as_str().green(),
        BuildStatus::Failed => status.as_str().red(),
        BuildStatus::Running => status.as_str().cyan(),
        _ => status.as_str().yellow(),
    }
}

pub(crate) fn print_build_summary(build: &Build) {
    println!("  {} {}", "▸".cyan(), build.id.to_string().bold());
    println!("    Status:  {}", status_label(build.status));
    if let Some(commit) = &build.commit {
        println!("    Commit:  {}", commit.dimmed());
    }
    if let Some(author) = &build.author_name {
        println!("    Author:  {}", author.dimmed());
    }
    if let Some(created) = build.date_created {
        println!(
            "    Created: {}",
            created.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
        );
    }
    println!();
}

fn print_build_details(build: &Build) {
    println!("{}", "Build Details:".bold());
    println!("  ID:       {}", build.id.to_string().cyan());
    println!("  Builder:  {}", build.builder_id.to_string().dimmed());
    println!("  Status:   {}", status_label(build.status));
    if let Some(code) = build.code {
        println!("  Exit:     {}", code);
    }
    if let Some(commit) = &build.commit {
        println!("  Commit:   {}", commit);
    }
    match (&build.author_name, &build.author_email) {
        (Some(name), Some(email)) => println!("  Author:   {} <{}>", name, email),
        (Some(name), None) => println!("  Author:   {}", name),
        _ => {}
    }
    if let Some(created) = build.date_created {
        println!("  Created:  {}", created.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(finished) = build.date_finished {
        println!("  Finished: {}", finished.format("%Y-%m-%d %H:%M:%S"));
    }

    if !build.stdout.is_empty() {
        println!("\n{}", "Output:".bold());
        println!("{}", "─".repeat(80).dimmed());
        println!("{}", build.stdout.trim_end());
        println!("{}", "─".repeat(80).dimmed());
    }
}
