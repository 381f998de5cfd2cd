// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! vocabctl
//!
//! Command-line interface for tagging resources with vocabularies. Documents
//! are kept in a JSON snapshot file that is loaded into an in-memory store,
//! changed by exactly one engine operation, and written back.
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use vocab_app_core::config::{ConfigError, ConfigService, ConfigStore};
use vocab_app_core::settings::{ToolPrefs, TOOL_PREFS_KEY};
use vocab_config_fs::FsConfigStore;
use vocab_engine::{
    parse_id_list, parse_tag_list, FavouriteService, RelationshipEngine, TagQuery,
};
use vocab_store::{Actor, FavouriteId, MemoryStore, ResourceRef, ResourceType, Snapshot};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Snapshot file holding vocabularies, resources and favourites
    #[clap(long, global = true)]
    data: Option<PathBuf>,

    /// Directory holding the tool's config (defaults to the platform config dir)
    #[clap(long, global = true)]
    config_dir: Option<PathBuf>,

    /// User id to act as
    #[clap(long = "as", global = true, default_value = "cli")]
    user: String,

    /// Act with the admin role
    #[clap(long, global = true)]
    admin: bool,

    /// Log at debug level
    #[clap(short, long, global = true)]
    verbose: bool,

    /// Command to execute
    #[clap(subcommand)]
    cmd: Command,
}

/// Resource addressed the way routes address it: dataset, then optional layer or widget.
#[derive(clap::Args, Debug)]
struct Target {
    /// Dataset scope (and the resource itself when no layer or widget is given)
    dataset: String,
    /// Layer id; wins over --widget
    #[clap(long)]
    layer: Option<String>,
    /// Widget id
    #[clap(long)]
    widget: Option<String>,
}

impl Target {
    fn resolve(&self) -> ResourceRef {
        ResourceRef::resolve(
            &self.dataset,
            self.layer.as_deref(),
            self.widget.as_deref(),
        )
    }
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Tag a resource with a vocabulary (creates either document when missing)
    Tag {
        /// Vocabulary name
        vocabulary: String,
        #[clap(flatten)]
        target: Target,
        /// Comma-separated tags
        #[clap(long, default_value = "")]
        tags: String,
    },
    /// Remove a vocabulary from a resource
    Untag {
        /// Vocabulary name
        vocabulary: String,
        #[clap(flatten)]
        target: Target,
    },
    /// Replace the tags of an existing relationship
    Retag {
        /// Vocabulary name
        vocabulary: String,
        #[clap(flatten)]
        target: Target,
        /// Comma-separated tags
        #[clap(long, default_value = "")]
        tags: String,
    },
    /// Show a resource and the vocabularies tagging it
    Show {
        #[clap(flatten)]
        target: Target,
        /// Only show this vocabulary's attachment
        #[clap(long)]
        vocabulary: Option<String>,
    },
    /// Find resources by vocabulary tags
    Find {
        /// Resource type (dataset, layer, widget)
        #[clap(long = "type")]
        kind: ResourceType,
        /// `vocabulary=tag1,tag2`; a bare vocabulary name matches all its tags
        #[clap(long = "query", required = true)]
        queries: Vec<String>,
    },
    /// Fetch resources of one type by comma-separated ids
    Get {
        /// Resource type (dataset, layer, widget)
        #[clap(long = "type")]
        kind: ResourceType,
        /// Comma-separated ids
        ids: String,
    },
    /// Cross-check relationships from both sides and report disagreements
    Audit {
        #[clap(subcommand)]
        scope: AuditScope,
    },
    /// List vocabularies of the configured application
    Vocabularies {
        /// Maximum number of vocabularies to list
        #[clap(long)]
        limit: Option<usize>,
    },
    /// Create an empty vocabulary
    NewVocabulary {
        /// Vocabulary name
        name: String,
    },
    /// Manage favourites
    Favourite {
        #[clap(subcommand)]
        action: FavouriteCommand,
    },
}

#[derive(clap::Subcommand, Debug)]
enum AuditScope {
    /// Every relationship of one vocabulary
    Vocabulary {
        /// Vocabulary name
        name: String,
    },
    /// Every relationship of one resource
    Resource {
        #[clap(flatten)]
        target: Target,
    },
}

#[derive(clap::Subcommand, Debug)]
enum FavouriteCommand {
    /// Bookmark a resource
    Add {
        /// Resource type (dataset, layer, widget)
        #[clap(long = "type")]
        kind: ResourceType,
        /// Resource id
        resource_id: String,
    },
    /// List your favourites, optionally restricted to some types
    List {
        /// Resource type filter (repeatable)
        #[clap(long = "type")]
        kinds: Vec<ResourceType>,
    },
    /// List every favourite of a user in the configured application
    User {
        /// User id
        user_id: String,
    },
    /// Remove a favourite
    Remove {
        /// Favourite id
        id: FavouriteId,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let (prefs, prefs_error) = load_prefs(args.config_dir.as_deref());

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::from_str(&prefs.log_level).unwrap_or(Level::INFO)
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;
    if let Some(err) = prefs_error {
        warn!("config unavailable, using defaults: {err}");
    }

    let data_path = args
        .data
        .clone()
        .unwrap_or_else(|| PathBuf::from(&prefs.data_path));
    let store = MemoryStore::from_snapshot(read_snapshot(&data_path)?);
    let actor = if args.admin {
        Actor::admin(args.user.clone())
    } else {
        Actor::user(args.user.clone())
    };

    let run = Run {
        engine: RelationshipEngine::with_settings(
            store.clone(),
            store.clone(),
            prefs.engine.clone(),
        ),
        favourites: FavouriteService::new(store.clone(), prefs.engine.application.clone()),
        actor,
    };
    let output = run.execute(args.cmd)?;

    if output.mutated {
        write_snapshot(&data_path, &store.snapshot())?;
        info!("snapshot written to {}", data_path.display());
    }
    println!("{}", serde_json::to_string_pretty(&output.value)?);
    Ok(())
}

/// Load tool preferences, persisting defaults on first run.
///
/// Config problems never stop the tool; the error is handed back so it can be
/// logged once logging is up.
fn load_prefs(config_dir: Option<&Path>) -> (ToolPrefs, Option<ConfigError>) {
    let store = match config_dir {
        Some(dir) => FsConfigStore::at(dir),
        None => FsConfigStore::new(),
    };
    prefs_from(store)
}

fn prefs_from<S: ConfigStore>(store: Result<S, ConfigError>) -> (ToolPrefs, Option<ConfigError>) {
    match store.and_then(|store| ConfigService::new(store).load_or_init(TOOL_PREFS_KEY)) {
        Ok(prefs) => (prefs, None),
        Err(err) => (ToolPrefs::default(), Some(err)),
    }
}

fn read_snapshot(path: &Path) -> Result<Snapshot> {
    if !path.exists() {
        debug!("no snapshot at {}, starting empty", path.display());
        return Ok(Snapshot::default());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing snapshot {}", path.display()))
}

fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let encoded = serde_json::to_vec_pretty(snapshot)?;
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, encoded)
        .with_context(|| format!("writing snapshot {}", staging.display()))?;
    fs::rename(&staging, path).with_context(|| format!("replacing snapshot {}", path.display()))
}

struct Output {
    value: serde_json::Value,
    mutated: bool,
}

impl Output {
    fn read(value: impl Serialize) -> Result<Self> {
        Ok(Self {
            value: serde_json::to_value(value)?,
            mutated: false,
        })
    }

    fn wrote(value: impl Serialize) -> Result<Self> {
        Ok(Self {
            value: serde_json::to_value(value)?,
            mutated: true,
        })
    }
}

struct Run {
    engine: RelationshipEngine<MemoryStore, MemoryStore>,
    favourites: FavouriteService<MemoryStore>,
    actor: Actor,
}

impl Run {
    fn execute(&self, cmd: Command) -> Result<Output> {
        let engine = &self.engine;
        let actor = &self.actor;
        match cmd {
            Command::Tag {
                vocabulary,
                target,
                tags,
            } => Output::wrote(engine.create_relationship(
                actor,
                &vocabulary,
                &target.dataset,
                &target.resolve(),
                parse_tag_list(&tags),
            )?),
            Command::Untag { vocabulary, target } => Output::wrote(engine.delete_relationship(
                actor,
                &vocabulary,
                &target.dataset,
                &target.resolve(),
            )?),
            Command::Retag {
                vocabulary,
                target,
                tags,
            } => Output::wrote(engine.update_relationship_tags(
                actor,
                &vocabulary,
                &target.dataset,
                &target.resolve(),
                parse_tag_list(&tags),
            )?),
            Command::Show { target, vocabulary } => {
                let found = engine.resource_vocabularies(
                    &target.dataset,
                    &target.resolve(),
                    vocabulary.as_deref(),
                )?;
                match found {
                    Some(resource) => Output::read(resource),
                    None => bail!("resource {} not found", target.resolve().in_dataset(&target.dataset)),
                }
            }
            Command::Find { kind, queries } => {
                Output::read(engine.find_resources(kind, &parse_query(&queries))?)
            }
            Command::Get { kind, ids } => {
                Output::read(engine.resources_by_ids(kind, &parse_id_list(&ids))?)
            }
            Command::Audit { scope } => {
                let violations = match scope {
                    AuditScope::Vocabulary { name } => engine.audit_vocabulary(&name)?,
                    AuditScope::Resource { target } => {
                        engine.audit_resource(&target.dataset, &target.resolve())?
                    }
                };
                let report: Vec<String> = violations.iter().map(ToString::to_string).collect();
                Output::read(report)
            }
            Command::Vocabularies { limit } => Output::read(engine.list_vocabularies(limit)?),
            Command::NewVocabulary { name } => {
                Output::wrote(engine.create_vocabulary(actor, &name)?)
            }
            Command::Favourite { action } => self.favourite(action),
        }
    }

    fn favourite(&self, action: FavouriteCommand) -> Result<Output> {
        let favourites = &self.favourites;
        let actor = &self.actor;
        match action {
            FavouriteCommand::Add { kind, resource_id } => {
                Output::wrote(favourites.create(actor, kind, &resource_id)?)
            }
            FavouriteCommand::List { kinds } => {
                let filter = (!kinds.is_empty()).then(|| kinds.into_iter().collect::<BTreeSet<_>>());
                Output::read(favourites.list(actor, filter)?)
            }
            FavouriteCommand::User { user_id } => Output::read(favourites.find_by_user(&user_id)?),
            FavouriteCommand::Remove { id } => Output::wrote(favourites.delete(actor, id)?),
        }
    }
}

/// `species=a,b` entries into a tag query; a bare name requests every tag.
fn parse_query(entries: &[String]) -> TagQuery {
    entries
        .iter()
        .map(|entry| match entry.split_once('=') {
            Some((name, tags)) => (name.trim().to_owned(), parse_tag_list(tags)),
            None => (entry.trim().to_owned(), BTreeSet::new()),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use vocab_app_core::settings::EngineSettings;
    use vocab_dry_tests::{tags, InMemoryConfigStore};

    #[test]
    fn query_entries_split_on_the_first_equals_sign() {
        let query = parse_query(&[
            "species=mammal, bird".to_owned(),
            " habitat ".to_owned(),
            "biome=".to_owned(),
        ]);
        assert_eq!(query.len(), 3);
        assert_eq!(query["species"], tags(&["bird", "mammal"]));
        assert!(query["habitat"].is_empty());
        assert!(query["biome"].is_empty());
    }

    #[test]
    fn repeated_query_names_keep_the_last_entry() {
        let query = parse_query(&["species=a".to_owned(), "species=b".to_owned()]);
        assert_eq!(query["species"], tags(&["b"]));
    }

    #[test]
    fn first_run_persists_default_prefs() {
        let store = InMemoryConfigStore::new();
        let (prefs, err) = prefs_from(Ok(store.clone()));
        assert!(err.is_none());
        assert_eq!(prefs, ToolPrefs::default());
        assert!(store.contains_key(TOOL_PREFS_KEY));
    }

    #[test]
    fn stored_prefs_are_used() {
        let stored = ToolPrefs {
            log_level: "debug".into(),
            engine: EngineSettings {
                application: "gfw".into(),
                ..EngineSettings::default()
            },
            ..ToolPrefs::default()
        };
        let store = InMemoryConfigStore::with_json(TOOL_PREFS_KEY, &stored);
        let (prefs, err) = prefs_from(Ok(store.clone()));
        assert!(err.is_none());
        assert_eq!(prefs, stored);
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn malformed_prefs_fall_back_to_defaults_without_overwriting() {
        let store = InMemoryConfigStore::with_raw(TOOL_PREFS_KEY, b"{not json");
        let (prefs, err) = prefs_from(Ok(store.clone()));
        assert_eq!(prefs, ToolPrefs::default());
        assert!(matches!(err, Some(ConfigError::Malformed { .. })));
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn unreachable_config_falls_back_to_defaults() {
        let (prefs, err) = prefs_from::<InMemoryConfigStore>(Err(ConfigError::Other(
            "no config dir".into(),
        )));
        assert_eq!(prefs, ToolPrefs::default());
        assert!(matches!(err, Some(ConfigError::Other(_))));
    }
}
