//! Command-line verbs and their dispatch onto the migrator.

use crate::config::{read_config, MigrateConfig};
use crate::generate::generate_migration;
use crate::migration::{
    DirectoryLoader, DownOptions, DownTarget, EventNotifier, MigrationError, MigrationEvent,
    Migrator, UpOptions,
};
use crate::store::JsonFileStore;
use crate::utils::get_config_path;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Migrate Runner - apply and revert timestamped migration units
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Project root; relative paths in the config resolve against it
    #[arg(long, global = true, env = "MIGRATE_PROJECT", default_value = ".")]
    pub project: PathBuf,

    /// Directory holding migration units (overrides migrate.json)
    #[arg(long, global = true, env = "MIGRATE_MIGRATIONS_DIR")]
    pub migrations_dir: Option<PathBuf>,

    /// Execution state file (overrides migrate.json)
    #[arg(long = "state", global = true, env = "MIGRATE_STATE_PATH")]
    pub state_path: Option<PathBuf>,

    #[command(subcommand)]
    pub verb: Option<Verb>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    /// Exit with status 1 if any migration is pending
    #[command(name = "db:migrate:check")]
    Check,

    /// Apply pending migrations, optionally up to and including TO
    #[command(name = "db:migrate")]
    Migrate { to: Option<String> },

    /// List pending migrations
    #[command(name = "db:migrate:status")]
    Status,

    /// List executed migrations
    #[command(name = "db:migrate:history")]
    History,

    /// Revert the latest migration, or everything down to TO ("0" = all)
    #[command(name = "db:migrate:undo")]
    Undo { to: Option<String> },

    /// Revert every executed migration
    #[command(name = "db:migrate:undo:all")]
    UndoAll,

    /// Revert everything, then apply everything
    #[command(name = "db:reset")]
    Reset,

    /// Create a new migration file from the template
    #[command(name = "migration:generate")]
    Generate { name: Option<String> },
}

/// What to do after parsing argv
#[derive(Debug)]
pub enum Parsed {
    Run(Args),
    /// Output already decided (help, version, usage error)
    Exit { output: String, code: i32 },
}

fn usage() -> String {
    Args::command().render_help().to_string()
}

/// Parse argv, mapping clap outcomes onto process exit codes.
///
/// No verb prints usage and exits 0; an unknown verb prints usage and
/// exits 1.
pub fn parse_args<I, T>(argv: I) -> Parsed
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    match Args::try_parse_from(argv) {
        Ok(args) if args.verb.is_none() => Parsed::Exit {
            output: usage(),
            code: 0,
        },
        Ok(args) => Parsed::Run(args),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => Parsed::Exit {
                output: err.to_string(),
                code: 0,
            },
            ErrorKind::InvalidSubcommand => Parsed::Exit {
                output: format!("{}\n{}", err, usage()),
                code: 1,
            },
            _ => Parsed::Exit {
                output: err.to_string(),
                code: 1,
            },
        },
    }
}

/// Resolved configuration for one invocation
#[derive(Debug, Clone)]
pub struct Context {
    pub project_path: PathBuf,
    pub config: MigrateConfig,
}

impl Context {
    /// Read `migrate.json` and apply command-line overrides
    pub async fn load(args: &Args) -> anyhow::Result<Self> {
        let mut config = read_config(&args.project)
            .await
            .map_err(|e| {
                anyhow::anyhow!("{} ({})", e, get_config_path(&args.project).display())
            })?
            .unwrap_or_default();

        if let Some(dir) = &args.migrations_dir {
            config.migrations_dir = dir.clone();
        }
        if let Some(state) = &args.state_path {
            config.state_path = state.clone();
        }

        Ok(Self {
            project_path: args.project.clone(),
            config,
        })
    }

    pub fn migrator(&self) -> Migrator {
        let loader = DirectoryLoader::new(
            self.config.migrations_path(&self.project_path),
            self.project_path.clone(),
        )
        .with_shell(self.config.shell.clone());
        let store = JsonFileStore::new(self.config.state_file_path(&self.project_path));

        Migrator::new(Arc::new(loader), Arc::new(store)).with_notifier(logging_notifier())
    }
}

/// Notifier that reports each unit transition through tracing
pub fn logging_notifier() -> EventNotifier {
    let mut notifier = EventNotifier::new();
    notifier.on_any(|event: &MigrationEvent| {
        debug!(id = %event.id(), "== {}: {} ==", event.id(), event.kind().as_str());
        Ok(())
    });
    notifier
}

/// Execute one verb, writing user-facing output to `out`.
///
/// Returns the process exit code for verbs that decide one themselves;
/// errors are left to the caller.
pub async fn run_verb<W: Write>(verb: &Verb, ctx: &Context, out: &mut W) -> anyhow::Result<i32> {
    match verb {
        Verb::Check => {
            let pending = ctx.migrator().pending().await?;
            if pending.is_empty() {
                writeln!(out, "No pending migrations")?;
                Ok(0)
            } else {
                writeln!(out, "{} pending migration(s):", pending.len())?;
                for unit in &pending {
                    writeln!(out, "{}", unit.id())?;
                }
                Ok(1)
            }
        }
        Verb::Migrate { to } => {
            let options = UpOptions { to: to.clone() };
            let applied = report(out, "applied", ctx.migrator().up(options).await)?;
            writeln!(out, "{} migration(s) applied", applied.len())?;
            Ok(0)
        }
        Verb::Status => {
            let status = ctx.migrator().status().await?;
            if status.pending.is_empty() {
                writeln!(out, "No pending migrations")?;
            } else {
                writeln!(out, "Pending migrations:")?;
                for id in &status.pending {
                    writeln!(out, "{}", id)?;
                }
            }
            for id in &status.modified {
                writeln!(out, "Warning: {} (modified since it ran)", id)?;
            }
            for id in &status.missing {
                writeln!(out, "Warning: {} (executed but file missing)", id)?;
            }
            Ok(0)
        }
        Verb::History => {
            let executed = ctx.migrator().executed().await?;
            if executed.is_empty() {
                writeln!(out, "No executed migrations")?;
            } else {
                writeln!(out, "Executed migrations:")?;
                for record in &executed {
                    writeln!(out, "{} ({})", record.migration_id, record.executed_at)?;
                }
            }
            Ok(0)
        }
        Verb::Undo { to } => {
            let options = DownOptions {
                to: to
                    .as_deref()
                    .map(DownTarget::parse)
                    .unwrap_or_default(),
            };
            let reverted = report(out, "reverted", ctx.migrator().down(options).await)?;
            writeln!(out, "{} migration(s) reverted", reverted.len())?;
            Ok(0)
        }
        Verb::UndoAll => {
            let reverted = report(out, "reverted", ctx.migrator().down(DownOptions::all()).await)?;
            writeln!(out, "{} migration(s) reverted", reverted.len())?;
            Ok(0)
        }
        Verb::Reset => {
            let migrator = ctx.migrator();
            let reverted = report(out, "reverted", migrator.down(DownOptions::all()).await)?;
            writeln!(out, "{} migration(s) reverted", reverted.len())?;
            let applied = report(out, "applied", migrator.up(UpOptions::default()).await)?;
            writeln!(out, "{} migration(s) applied", applied.len())?;
            Ok(0)
        }
        Verb::Generate { name } => {
            let name = name.as_deref().unwrap_or_default();
            let result = generate_migration(&ctx.project_path, &ctx.config, name).await?;
            writeln!(out, "Created migration: {}", result.path.display())?;
            Ok(0)
        }
    }
}

/// On a partial run, print what completed before passing the error on.
fn report<W: Write>(
    out: &mut W,
    verb: &str,
    result: Result<Vec<String>, MigrationError>,
) -> anyhow::Result<Vec<String>> {
    match result {
        Ok(ids) => Ok(ids),
        Err(err) => {
            if !err.completed().is_empty() {
                writeln!(
                    out,
                    "{} migration(s) {} before the failure",
                    err.completed().len(),
                    verb
                )?;
            }
            Err(err.into())
        }
    }
}

/// Parse argv and run the verb. Returns the exit code.
///
/// Any error is printed as `Error: <message>` and exits 1.
pub async fn run<I, T, W>(argv: I, out: &mut W) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    W: Write,
{
    let args = match parse_args(argv) {
        Parsed::Run(args) => args,
        Parsed::Exit { output, code } => {
            let _ = write!(out, "{}", output);
            return code;
        }
    };

    let Some(verb) = args.verb.clone() else {
        return 0;
    };

    let result = match Context::load(&args).await {
        Ok(ctx) => run_verb(&verb, &ctx, out).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            let _ = writeln!(out, "Error: {}", err);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbs_parse_by_name() {
        let cases = [
            (vec!["db:migrate:check"], Verb::Check),
            (vec!["db:migrate"], Verb::Migrate { to: None }),
            (
                vec!["db:migrate", "20230101000000-a"],
                Verb::Migrate {
                    to: Some("20230101000000-a".to_string()),
                },
            ),
            (vec!["db:migrate:status"], Verb::Status),
            (vec!["db:migrate:history"], Verb::History),
            (vec!["db:migrate:undo"], Verb::Undo { to: None }),
            (vec!["db:migrate:undo:all"], Verb::UndoAll),
            (vec!["db:reset"], Verb::Reset),
            (
                vec!["migration:generate", "add-index"],
                Verb::Generate {
                    name: Some("add-index".to_string()),
                },
            ),
        ];

        for (argv, expected) in cases {
            let full = std::iter::once("migrate-runner").chain(argv.iter().copied());
            match parse_args(full) {
                Parsed::Run(args) => assert_eq!(args.verb, Some(expected)),
                other => panic!("{argv:?} did not parse: {other:?}"),
            }
        }
    }

    #[test]
    fn test_no_verb_prints_usage_and_exits_zero() {
        match parse_args(["migrate-runner"]) {
            Parsed::Exit { output, code } => {
                assert_eq!(code, 0);
                assert!(output.contains("db:migrate"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_verb_prints_usage_and_exits_one() {
        match parse_args(["migrate-runner", "db:explode"]) {
            Parsed::Exit { output, code } => {
                assert_eq!(code, 1);
                assert!(output.contains("Usage"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_global_overrides() {
        match parse_args([
            "migrate-runner",
            "db:migrate:status",
            "--project",
            "/srv/app",
            "--state",
            "state.json",
        ]) {
            Parsed::Run(args) => {
                assert_eq!(args.project, PathBuf::from("/srv/app"));
                assert_eq!(args.state_path, Some(PathBuf::from("state.json")));
                assert!(args.migrations_dir.is_none());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
