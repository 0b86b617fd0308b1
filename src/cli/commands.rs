//! Command dispatch: load settings and snapshot, run, save when mutated

use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::MenuTree;
use crate::cli::args::{Cli, Commands, ConfigCommands, ItemCommands, MenuCommands, PositionArg, TargetArg};
use crate::cli::error::{CliError, CliResult};
use crate::cli::{output, render};
use crate::config::{global_config_path, Settings};
use crate::domain::{LinkTarget, MaterializedPath, MenuEntry, Position};
use crate::infrastructure::{MemoryStore, SnapshotFile};

/// A loaded snapshot and the tree operating on it.
struct Session {
    file: SnapshotFile,
    tree: MenuTree<MemoryStore<MenuEntry>>,
}

impl Session {
    fn open(settings: &Settings, store: Option<&Path>) -> CliResult<Self> {
        let path = store
            .map(Path::to_path_buf)
            .unwrap_or_else(|| settings.store_path.clone());
        let codec = settings.tree.codec()?;
        let file = SnapshotFile::new(path);
        let store = file.load(&codec)?;
        debug!("session: {}", file.path().display());
        Ok(Self {
            file,
            tree: MenuTree::new(store, codec, settings.tree.cross_partition_moves),
        })
    }

    fn save(&self) -> CliResult<()> {
        self.file.save(self.tree.store())?;
        Ok(())
    }
}

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Menu { command }) => menu_command(&mut open_session(cli)?, command),
        Some(Commands::Item { command }) => item_command(&mut open_session(cli)?, command),
        Some(Commands::Show { menu }) => show(&open_session(cli)?, menu),
        Some(Commands::Check { menu }) => check(&open_session(cli)?, menu),
        Some(Commands::Fix { menu }) => fix(&mut open_session(cli)?, menu),
        Some(Commands::Config { command }) => config_command(cli, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Ok(()),
    }
}

fn open_session(cli: &Cli) -> CliResult<Session> {
    let settings = Settings::load(cli.config.as_deref())?;
    Session::open(&settings, cli.store.as_deref())
}

// ============================================================
// Menus
// ============================================================

#[instrument(skip(session))]
fn menu_command(session: &mut Session, command: &MenuCommands) -> CliResult<()> {
    match command {
        MenuCommands::Create {
            identifier,
            name,
            group,
        } => {
            let partition = session.tree.create_partition(identifier, name, group.clone())?;
            session.save()?;
            output::action("Created", &render::partition_label(&partition));
        }
        MenuCommands::List => {
            let partitions = session.tree.partitions()?;
            if partitions.is_empty() {
                output::info("No menus");
            }
            for partition in partitions {
                let items = session.tree.root_nodes(partition.id)?.len();
                output::info(&format!(
                    "{} ({} top-level items)",
                    render::partition_label(&partition),
                    items
                ));
            }
        }
        MenuCommands::Delete { identifier } => {
            let partition = session.tree.partition_by_identifier(identifier)?;
            session.tree.delete_partition(partition.id)?;
            session.save()?;
            output::action("Deleted", &render::partition_label(&partition));
        }
    }
    Ok(())
}

// ============================================================
// Items
// ============================================================

#[instrument(skip(session))]
fn item_command(session: &mut Session, command: &ItemCommands) -> CliResult<()> {
    match command {
        ItemCommands::Add {
            menu,
            title,
            link,
            new_window,
            at,
            position,
        } => {
            let target = if *new_window {
                LinkTarget::NewWindow
            } else {
                LinkTarget::SameWindow
            };
            let entry = MenuEntry::new(title.as_str(), link.as_str(), target)?;
            let partition = session.tree.partition_by_identifier(menu)?;
            let node = match at {
                Some(at) => {
                    let reference = session.tree.find_by_path(partition.id, at)?;
                    session
                        .tree
                        .insert_relative(&reference, Position::from(*position), entry)?
                }
                None if *position == PositionArg::LastChild => {
                    session.tree.insert_child(None, partition.id, entry)?
                }
                None => {
                    return Err(CliError::InvalidArgs(
                        "--position other than last-child needs --at".into(),
                    ))
                }
            };
            session.save()?;
            output::action("Added", &render::item_label(&node));
        }
        ItemCommands::Move {
            menu,
            path,
            target,
            position,
        } => {
            let partition = session.tree.partition_by_identifier(menu)?;
            let node = session.tree.find_by_path(partition.id, path)?;
            let reference = session.tree.find_by_path(partition.id, target)?;
            session
                .tree
                .move_node(&node, &reference, Position::from(*position))?;
            session.save()?;
            let moved = session.tree.node(node.id)?;
            output::action("Moved", &render::item_label(&moved));
        }
        ItemCommands::Delete { menu, path } => {
            let partition = session.tree.partition_by_identifier(menu)?;
            let node = session.tree.find_by_path(partition.id, path)?;
            let removed = session.tree.delete_subtree(&node)?;
            session.save()?;
            output::action(
                "Deleted",
                &format!("{} ({} items)", render::item_label(&node), removed),
            );
        }
        ItemCommands::Edit {
            menu,
            path,
            title,
            link,
            target,
        } => {
            if title.is_none() && link.is_none() && target.is_none() {
                return Err(CliError::InvalidArgs(
                    "nothing to change: pass --title, --link or --target".into(),
                ));
            }
            let partition = session.tree.partition_by_identifier(menu)?;
            let node = session.tree.find_by_path(partition.id, path)?;
            let entry = edited_entry(&node.payload, title, link, target)?;
            let node = session.tree.update_payload(&node, entry)?;
            session.save()?;
            output::action("Updated", &render::item_label(&node));
        }
        ItemCommands::List { menu, parent } => {
            let partition = session.tree.partition_by_identifier(menu)?;
            let items = match parent {
                Some(parent) => {
                    let parent = session.tree.find_by_path(partition.id, parent)?;
                    session.tree.children_of(&parent)?
                }
                None => session.tree.root_nodes(partition.id)?,
            };
            for item in &items {
                output::info(&format!("{:>4}  {}", item.sort_weight, render::item_label(item)));
            }
        }
    }
    Ok(())
}

fn edited_entry(
    current: &MenuEntry,
    title: &Option<String>,
    link: &Option<String>,
    target: &Option<TargetArg>,
) -> CliResult<MenuEntry> {
    let entry = MenuEntry {
        title: title.clone().unwrap_or_else(|| current.title.clone()),
        link: link.clone().unwrap_or_else(|| current.link.clone()),
        target: target.map(LinkTarget::from).unwrap_or(current.target),
    };
    entry.validate()?;
    Ok(entry)
}

// ============================================================
// Whole-menu commands
// ============================================================

fn show(session: &Session, menu: &str) -> CliResult<()> {
    let partition = session.tree.partition_by_identifier(menu)?;
    let tree = render::menu_tree(&session.tree, &partition)?;
    output::info(&tree);
    Ok(())
}

fn check(session: &Session, menu: &str) -> CliResult<()> {
    let partition = session.tree.partition_by_identifier(menu)?;
    let report = session.tree.find_problems(partition.id)?;
    if report.is_clean() {
        output::success(&format!("{} is consistent", partition.identifier));
        return Ok(());
    }

    output::header(&format!("Problems in {}", partition.identifier));
    let sections: [(&str, &Vec<MaterializedPath>); 5] = [
        ("malformed path", &report.malformed_paths),
        ("wrong depth", &report.wrong_depth),
        ("orphan", &report.orphans),
        ("wrong child count", &report.wrong_child_count),
        ("duplicate sort weights below", &report.duplicate_weights),
    ];
    for (label, paths) in sections {
        for path in paths {
            output::failure(&format!("{}: {}", label, path));
        }
    }
    output::detail(&format!("run `menutree fix {}` to repair", partition.identifier));
    Err(CliError::Inconsistent(report.total()))
}

fn fix(session: &mut Session, menu: &str) -> CliResult<()> {
    let partition = session.tree.partition_by_identifier(menu)?;
    let report = session.tree.fix_tree(partition.id)?;
    if report.is_noop() {
        output::success(&format!("{} needed no repair", partition.identifier));
        return Ok(());
    }
    session.save()?;
    output::action("Fixed", &partition.identifier);
    output::detail(&format!("depths: {}", report.depths_fixed));
    output::detail(&format!("child counts: {}", report.child_counts_fixed));
    output::detail(&format!("renumbered weights: {}", report.weights_renumbered));
    Ok(())
}

// ============================================================
// Config
// ============================================================

fn config_command(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    match command {
        ConfigCommands::Show => output::info(&settings.to_toml()?),
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::info(&format!("global config: {}", path.display())),
                None => output::warning("no config directory on this platform"),
            }
            if let Some(local) = &cli.config {
                output::info(&format!("local config: {}", local.display()));
            }
            let store = cli.store.clone().unwrap_or(settings.store_path);
            output::info(&format!("store: {}", store.display()));
        }
    }
    Ok(())
}
