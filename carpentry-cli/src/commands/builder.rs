//! Builder command handlers
//!
//! Handles builder management: listing, creation from presets or script
//! files, editing, deletion, triggering builds and clearing build history.

use anyhow::{Context, Result, bail};
use carpentry_core::domain::build::Build;
use carpentry_core::domain::builder::Builder;
use carpentry_core::domain::preset::{BuilderPreset, ScriptConfig};
use carpentry_core::dto::build::TriggerBuild;
use carpentry_core::dto::builder::{CreateBuilder, EditBuilder};
use carpentry_sync::{SyncContext, SyncEvent};
use clap::Subcommand;
use colored::*;
use tokio::sync::mpsc::UnboundedReceiver;

use super::build::{print_build_summary, status_label};
use super::watch::watch_build;
use crate::config::Config;
use crate::id_resolver::resolve_builder_id;
use crate::types::IdOrPrefix;

/// Builder subcommands
#[derive(Subcommand)]
pub enum BuilderCommands {
    /// List all builders
    List,
    /// Show one builder
    Get {
        /// Builder ID or unambiguous prefix
        id: IdOrPrefix,
    },
    /// Create a builder
    Create {
        #[arg(short, long)]
        name: String,

        /// Repository to clone for every build
        #[arg(short, long)]
        git_uri: String,

        /// Use a canned build script
        #[arg(short, long, conflicts_with = "script")]
        preset: Option<BuilderPreset>,

        /// Path to a shell script to run for every build
        #[arg(short, long)]
        script: Option<String>,

        /// Do not generate a deploy key pair for the repository
        #[arg(long)]
        no_ssh_keys: bool,
    },
    /// Change a builder's name, repository or script
    Edit {
        /// Builder ID or unambiguous prefix
        id: IdOrPrefix,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        git_uri: Option<String>,

        #[arg(short, long, conflicts_with = "script")]
        preset: Option<BuilderPreset>,

        /// Path to the new shell script
        #[arg(short, long)]
        script: Option<String>,
    },
    /// Delete a builder
    Delete {
        /// Builder ID or unambiguous prefix
        id: IdOrPrefix,
    },
    /// Start a build
    Trigger {
        /// Builder ID or unambiguous prefix
        id: IdOrPrefix,

        /// Follow the build's output until it finishes
        #[arg(short, long)]
        watch: bool,
    },
    /// List the builds of a builder
    Builds {
        /// Builder ID or unambiguous prefix
        id: IdOrPrefix,
    },
    /// Delete every build of a builder
    Clear {
        /// Builder ID or unambiguous prefix
        id: IdOrPrefix,
    },
}

/// Handle builder commands
pub async fn handle_builder_command(command: BuilderCommands, config: &Config) -> Result<()> {
    let (context, mut events) = config.connect()?;

    match command {
        BuilderCommands::List => list_builders(&context).await,
        BuilderCommands::Get { id } => get_builder(&context, &id).await,
        BuilderCommands::Create {
            name,
            git_uri,
            preset,
            script,
            no_ssh_keys,
        } => {
            let script = script_config(preset, script.as_deref())?.unwrap_or_default();
            create_builder(&context, name, git_uri, script, !no_ssh_keys).await
        }
        BuilderCommands::Edit {
            id,
            name,
            git_uri,
            preset,
            script,
        } => {
            let req = EditBuilder {
                name,
                git_uri,
                shell_script: script_config(preset, script.as_deref())?.map(|s| s.script),
            };
            edit_builder(&context, &id, req).await
        }
        BuilderCommands::Delete { id } => delete_builder(&context, &id).await,
        BuilderCommands::Trigger { id, watch } => {
            trigger_build(&context, &mut events, &id, watch).await
        }
        BuilderCommands::Builds { id } => list_builds(&context, &id).await,
        BuilderCommands::Clear { id } => clear_builds(&context, &id).await,
    }
}

/// Script from a preset or a script file, if either was given
fn script_config(preset: Option<BuilderPreset>, path: Option<&str>) -> Result<Option<ScriptConfig>> {
    match (preset, path) {
        (Some(preset), _) => Ok(Some(ScriptConfig::from_preset(preset))),
        (None, Some(path)) => {
            let script = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read script file: {}", path))?;
            Ok(Some(ScriptConfig::custom(script)))
        }
        (None, None) => Ok(None),
    }
}

async fn list_builders(context: &SyncContext) -> Result<()> {
    let builders = context.list_builders().await?;

    if builders.is_empty() {
        println!("{}", "No builders found.".yellow());
    } else {
        println!("{}", format!("Found {} builder(s):", builders.len()).bold());
        println!();
        for builder in &builders {
            print_builder_summary(builder);
        }
    }

    Ok(())
}

async fn get_builder(context: &SyncContext, id: &IdOrPrefix) -> Result<()> {
    let builder_id = resolve_builder_id(context, id).await?;
    let builder = context.get_builder(builder_id).await?;

    print_builder_details(&builder);

    Ok(())
}

async fn create_builder(
    context: &SyncContext,
    name: String,
    git_uri: String,
    script: ScriptConfig,
    generate_ssh_keys: bool,
) -> Result<()> {
    let preset = script.preset;
    let mut req = CreateBuilder::new(name, git_uri, script);
    req.generate_ssh_keys = generate_ssh_keys;

    let builder = context.create_builder(&req).await?;

    println!("{}", "✓ Builder created successfully!".green().bold());
    println!("  ID:     {}", builder.id.to_string().cyan());
    println!("  Name:   {}", builder.name.bold());
    println!("  Repo:   {}", builder.git_uri);
    if let Some(preset) = preset {
        println!("  Preset: {}", preset.to_string().dimmed());
    }
    if let Some(key) = &builder.id_rsa_public {
        println!("\n{}", "Add this deploy key to the repository:".bold());
        println!("{}", key.trim_end());
    }

    Ok(())
}

async fn edit_builder(context: &SyncContext, id: &IdOrPrefix, req: EditBuilder) -> Result<()> {
    if req.is_empty() {
        bail!("Nothing to change: pass --name, --git-uri, --preset or --script");
    }

    let builder_id = resolve_builder_id(context, id).await?;
    let builder = context.edit_builder(builder_id, &req).await?;

    println!("{}", "✓ Builder updated successfully!".green().bold());
    print_builder_summary(&builder);

    Ok(())
}

async fn delete_builder(context: &SyncContext, id: &IdOrPrefix) -> Result<()> {
    let builder_id = resolve_builder_id(context, id).await?;
    let builder = context.delete_builder(builder_id).await?;

    println!(
        "{}",
        format!("✓ Builder {} ({}) deleted successfully!", builder.name, builder_id)
            .green()
            .bold()
    );

    Ok(())
}

async fn trigger_build(
    context: &SyncContext,
    events: &mut UnboundedReceiver<SyncEvent>,
    id: &IdOrPrefix,
    watch: bool,
) -> Result<()> {
    let builder_id = resolve_builder_id(context, id).await?;
    let build = context
        .trigger_build(builder_id, &TriggerBuild::default())
        .await?;

    println!("{}", "✓ Build triggered successfully!".green().bold());
    println!("  Build ID:   {}", build.id.to_string().cyan());
    println!("  Builder ID: {}", builder_id.to_string().dimmed());
    println!("  Status:     {}", status_label(build.status));

    if watch {
        println!();
        watch_build(context, events, builder_id, build.id).await?;
    }

    Ok(())
}

async fn list_builds(context: &SyncContext, id: &IdOrPrefix) -> Result<()> {
    let builder_id = resolve_builder_id(context, id).await?;
    let mut builds: Vec<Build> = context.list_builds(builder_id).await?;
    builds.sort_by(|a, b| b.date_created.cmp(&a.date_created));

    if builds.is_empty() {
        println!("{}", "No builds found for this builder.".yellow());
    } else {
        println!("{}", format!("Found {} build(s):", builds.len()).bold());
        println!();
        for build in &builds {
            print_build_summary(build);
        }
    }

    Ok(())
}

async fn clear_builds(context: &SyncContext, id: &IdOrPrefix) -> Result<()> {
    let builder_id = resolve_builder_id(context, id).await?;
    let total = context.clear_builds(builder_id).await?;

    println!(
        "{}",
        format!("✓ Deleted {} build(s) of builder {}", total, builder_id)
            .green()
            .bold()
    );

    Ok(())
}

fn print_builder_summary(builder: &Builder) {
    println!("  {} {}", "▸".cyan(), builder.name.bold());
    println!("    ID:     {}", builder.id.to_string().dimmed());
    println!("    Repo:   {}", builder.git_uri.dimmed());
    if let Some(status) = &builder.status {
        println!("    Status: {}", status.yellow());
    }
    println!();
}

fn print_builder_details(builder: &Builder) {
    println!("{}", "Builder Details:".bold());
    println!("  ID:       {}", builder.id.to_string().cyan());
    println!("  Name:     {}", builder.name.bold());
    println!("  Repo:     {}", builder.git_uri);
    if let Some(branch) = &builder.branch {
        println!("  Branch:   {}", branch);
    }
    if let Some(status) = &builder.status {
        println!("  Status:   {}", status);
    }
    println!("  SSH keys: {}", if builder.generate_ssh_keys { "yes" } else { "no" });

    if let Some(key) = &builder.id_rsa_public {
        println!("\n{}", "Deploy key:".bold());
        println!("{}", key.trim_end().dimmed());
    }

    println!("\n{}", "Script:".bold());
    println!("{}", "─".repeat(80).dimmed());
    println!("{}", builder.shell_script.trim_end());
    println!("{}", "─".repeat(80).dimmed());
}
