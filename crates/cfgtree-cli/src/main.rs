use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context;
use cfgtree_cli::render::describe_event;
use cfgtree_cli::{execute, Action};
use cfgtree_node::{Defaults, TreeEvent};
use cfgtree_store::{
    load_defaults, load_schema, BackgroundWriter, LoadOutcome, SettingsStore, StoreConfig,
};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let address = || {
        Arg::new("address")
            .required(true)
            .help("Dotted key path, e.g. servers.main.port")
    };
    let dest = |help: &'static str| {
        Arg::new("dest")
            .required(true)
            .value_parser(value_parser!(PathBuf))
            .help(help)
    };

    Command::new("cfgtree")
        .version(cfgtree_cli::VERSION)
        .about("Edit a YAML settings file against its schema")
        .subcommand_required(true)
        .arg(
            Arg::new("schema")
                .long("schema")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Schema file in YAML notation"),
        )
        .arg(
            Arg::new("file")
                .long("file")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Settings file to edit"),
        )
        .arg(
            Arg::new("example")
                .long("example")
                .value_parser(value_parser!(PathBuf))
                .help("Example settings used when the file is missing or invalid"),
        )
        .arg(
            Arg::new("defaults")
                .long("defaults")
                .value_parser(value_parser!(PathBuf))
                .help("Defaults file mapping schema paths to values for `add`"),
        )
        .arg(
            Arg::new("name")
                .long("name")
                .default_value("settings")
                .help("Name of the root node"),
        )
        .subcommand(
            Command::new("show").about("Print the settings tree").arg(
                Arg::new("json")
                    .long("json")
                    .action(ArgAction::SetTrue)
                    .help("Output as JSON"),
            ),
        )
        .subcommand(
            Command::new("set")
                .about("Set the value of a setting")
                .arg(address())
                .arg(Arg::new("value").required(true).help("New value")),
        )
        .subcommand(
            Command::new("rename")
                .about("Rename an editable key")
                .arg(address())
                .arg(Arg::new("key").required(true).help("New key")),
        )
        .subcommand(
            Command::new("add")
                .about("Add the default entry for a container")
                .arg(address()),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove a setting")
                .arg(address()),
        )
        .subcommand(Command::new("reset").about("Replace the settings with the example"))
        .subcommand(
            Command::new("export")
                .about("Write the settings to another file")
                .arg(dest("Destination file")),
        )
        .subcommand(
            Command::new("recover-backup")
                .about("Move the backup of replaced settings to another file")
                .arg(dest("Destination file")),
        )
}

fn parse_action(matches: &ArgMatches) -> anyhow::Result<Action> {
    let text = |args: &ArgMatches, id: &str| -> anyhow::Result<String> {
        args.get_one::<String>(id)
            .cloned()
            .with_context(|| format!("missing argument <{id}>"))
    };
    let path = |args: &ArgMatches| -> anyhow::Result<PathBuf> {
        args.get_one::<PathBuf>("dest")
            .cloned()
            .context("missing argument <dest>")
    };

    let action = match matches.subcommand() {
        Some(("show", args)) => Action::Show {
            json: args.get_flag("json"),
        },
        Some(("set", args)) => Action::Set {
            address: text(args, "address")?,
            value: text(args, "value")?,
        },
        Some(("rename", args)) => Action::Rename {
            address: text(args, "address")?,
            key: text(args, "key")?,
        },
        Some(("add", args)) => Action::Add {
            address: text(args, "address")?,
        },
        Some(("remove", args)) => Action::Remove {
            address: text(args, "address")?,
        },
        Some(("reset", _)) => Action::Reset,
        Some(("export", args)) => Action::Export { dest: path(args)? },
        Some(("recover-backup", args)) => Action::RecoverBackup { dest: path(args)? },
        _ => anyhow::bail!("unknown subcommand"),
    };
    Ok(action)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    let action = parse_action(&matches)?;

    let schema_file = matches
        .get_one::<PathBuf>("schema")
        .context("missing --schema")?;
    let settings_file = matches.get_one::<PathBuf>("file").context("missing --file")?;
    let name = matches
        .get_one::<String>("name")
        .cloned()
        .unwrap_or_else(|| "settings".to_string());

    let schema = load_schema(schema_file)
        .with_context(|| format!("cannot load schema {}", schema_file.display()))?;
    let defaults = match matches.get_one::<PathBuf>("defaults") {
        Some(path) => load_defaults(path)
            .with_context(|| format!("cannot load defaults {}", path.display()))?,
        None => Defaults::new(),
    };

    let mut config = StoreConfig::new(name, settings_file);
    if let Some(example) = matches.get_one::<PathBuf>("example") {
        config = config.with_example(example);
    }
    let store = SettingsStore::new(config, schema);

    let (mut tree, outcome) = store.open(defaults)?;
    if let LoadOutcome::Recovered { backup } = &outcome {
        eprintln!(
            "settings file was invalid and has been replaced by the example; \
             the old file is kept at {}",
            backup.display()
        );
    } else if let Some(backup) = store.pending_backup() {
        if !matches!(action, Action::RecoverBackup { .. }) {
            eprintln!(
                "a backup of replaced settings is waiting at {}; \
                 use `recover-backup <dest>` to keep it",
                backup.display()
            );
        }
    }
    debug!(?outcome, nodes = tree.node_count(), "settings opened");

    let writer = action
        .is_edit()
        .then(|| BackgroundWriter::spawn(store.clone()));
    if let Some(writer) = &writer {
        tree.set_commit_hook(writer.hook());
    }

    let events: Rc<RefCell<Vec<TreeEvent>>> = Rc::default();
    let sink = Rc::clone(&events);
    tree.subscribe(tree.root(), move |event: &TreeEvent| {
        sink.borrow_mut().push(event.clone());
    })?;

    let result = execute(&action, &store, &mut tree);

    for event in events.borrow().iter() {
        println!("{}", describe_event(&tree, event));
    }
    drop(tree.take_commit_hook());

    if let Some(writer) = writer {
        let stats = writer.shutdown().await?;
        if stats.failed > 0 {
            warn!(failed = stats.failed, "some settings snapshots were not saved");
        }
    }

    println!("{}", result?);
    Ok(())
}
