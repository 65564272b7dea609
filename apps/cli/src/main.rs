use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use focusspace_core::{
    CancelFlag, EntryId, EntryKind, FocusEntry, FocusSpace, SpaceStore,
};
use focusspace_settings::{ExcludeMatcher, PreferencesStore};

#[derive(Parser)]
#[command(
    name = "focusspace-cli",
    about = "Curate a persistent focus space of files, folders, and sections",
    author,
    version
)]
struct Cli {
    /// 指定工作區根目錄；預設為目前目錄。 / Workspace root (defaults to current directory).
    #[arg(long, global = true, value_name = "PATH")]
    workspace: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 將檔案或資料夾加入焦點空間。 / Add files or folders to the focus space.
    Add(AddArgs),
    /// 建立新的分組。 / Create a named section.
    Section(SectionArgs),
    /// 顯示焦點空間內容。 / Show the focus space contents.
    List(ListArgs),
    /// 移除條目（連同其子條目）。 / Remove an entry together with its subtree.
    Remove(RemoveArgs),
    /// 將條目移入分組或根層。 / Move an entry into a section or to root level.
    Move(MoveArgs),
    /// 調整條目在目前容器內的順序。 / Reorder an entry within its current container.
    Reorder(ReorderArgs),
    /// 覆寫或清除條目的顯示標籤。 / Override or clear an entry's display label.
    Label(LabelArgs),
    /// 將資料夾條目展開為其實際目錄內容。 / Mirror a folder entry's real directory into children.
    Materialize(MaterializeArgs),
    /// 清空整個焦點空間。 / Clear the whole focus space.
    Clear,
}

#[derive(Args)]
struct AddArgs {
    /// 要加入的檔案或資料夾路徑。 / Paths of files or folders to add.
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// 放入指定分組（識別碼、前綴或標籤）。 / Place under a section (id, prefix, or label).
    #[arg(long, value_name = "SECTION")]
    section: Option<String>,

    /// 允許重複加入相同路徑。 / Allow adding a path that is already present.
    #[arg(long)]
    allow_duplicate: bool,
}

#[derive(Args)]
struct SectionArgs {
    /// 分組名稱。 / Section label.
    #[arg(value_name = "LABEL")]
    label: String,
}

#[derive(Args)]
struct ListArgs {
    /// 僅列出指定類型。 / Restrict output to one entry kind.
    #[arg(long, value_enum)]
    kind: Option<KindChoice>,

    /// 一併顯示條目識別碼。 / Print entry ids alongside labels.
    #[arg(long)]
    ids: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindChoice {
    File,
    Folder,
    Section,
}

impl From<KindChoice> for EntryKind {
    fn from(choice: KindChoice) -> Self {
        match choice {
            KindChoice::File => EntryKind::File,
            KindChoice::Folder => EntryKind::Folder,
            KindChoice::Section => EntryKind::Section,
        }
    }
}

#[derive(Args)]
struct RemoveArgs {
    /// 條目參照：識別碼、前綴、標籤或路徑。 / Entry reference: id, prefix, label, or path.
    #[arg(value_name = "ENTRY")]
    entry: String,
}

#[derive(Args)]
struct MoveArgs {
    /// 要移動的條目。 / Entry to move.
    #[arg(value_name = "ENTRY")]
    entry: String,

    /// 目的分組。 / Destination section.
    #[arg(long, value_name = "SECTION", conflicts_with = "root")]
    to: Option<String>,

    /// 移到根層。 / Move to root level.
    #[arg(long)]
    root: bool,

    /// 插入位置；超出範圍時落在尾端。 / Insertion index; clamped to the end when out of range.
    #[arg(long, value_name = "INDEX")]
    position: Option<usize>,
}

#[derive(Args)]
struct ReorderArgs {
    /// 要調整順序的條目。 / Entry to reorder.
    #[arg(value_name = "ENTRY")]
    entry: String,

    /// 新的索引位置。 / Target index.
    #[arg(value_name = "INDEX")]
    index: usize,
}

#[derive(Args)]
struct LabelArgs {
    /// 條目參照。 / Entry reference.
    #[arg(value_name = "ENTRY")]
    entry: String,

    /// 新標籤；省略並搭配 --clear 可恢復預設名稱。 / New label; omit with --clear to restore the derived name.
    #[arg(value_name = "LABEL", required_unless_present = "clear")]
    label: Option<String>,

    /// 清除顯示標籤。 / Clear the display label.
    #[arg(long, conflicts_with = "label")]
    clear: bool,
}

#[derive(Args)]
struct MaterializeArgs {
    /// 資料夾條目參照。 / Folder entry reference.
    #[arg(value_name = "ENTRY")]
    entry: String,

    /// 展開層數；預設採用偏好設定。 / Depth override; preferences value when omitted.
    #[arg(long, value_name = "DEPTH")]
    depth: Option<u32>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli { workspace, command } = Cli::parse();
    let workspace_root = resolve_workspace(workspace)?;
    let mut space = open_space(&workspace_root);

    match command {
        Commands::Add(args) => execute_add(&mut space, &workspace_root, args)?,
        Commands::Section(args) => {
            let id = space.create_section(args.label.clone());
            println!("Created section '{}' ({id})", args.label);
        }
        Commands::List(args) => execute_list(&mut space, args),
        Commands::Remove(args) => {
            let id = resolve_entry(&mut space, &workspace_root, &args.entry)?;
            if space.remove_entry(&id) {
                println!("Removed {id}");
            } else {
                bail!("entry {id} vanished before removal");
            }
        }
        Commands::Move(args) => execute_move(&mut space, &workspace_root, args)?,
        Commands::Reorder(args) => {
            let id = resolve_entry(&mut space, &workspace_root, &args.entry)?;
            let parent = space.parent_of(&id).map(|parent| parent.id.clone());
            if !space.reorder_entry(&id, args.index, parent.as_ref()) {
                bail!("could not reorder {id}");
            }
            println!("Reordered {id} to index {}", args.index);
        }
        Commands::Label(args) => {
            let id = resolve_entry(&mut space, &workspace_root, &args.entry)?;
            let label = if args.clear { None } else { args.label.clone() };
            if !space.set_label(&id, label) {
                bail!("could not relabel {id}");
            }
            println!("Updated label of {id}");
        }
        Commands::Materialize(args) => execute_materialize(&mut space, &workspace_root, args)?,
        Commands::Clear => {
            space.clear_all();
            println!("Cleared the focus space");
        }
    }

    if space.is_dirty() {
        space.flush().context("failed to persist the focus space")?;
    }
    Ok(())
}

fn execute_add(space: &mut FocusSpace, workspace_root: &Path, args: AddArgs) -> Result<()> {
    let section = args
        .section
        .as_deref()
        .map(|reference| resolve_section(space, workspace_root, reference))
        .transpose()?;

    for path in &args.paths {
        let path = resolve_input_path(path)?;
        if !args.allow_duplicate && space.has_entry(&path) {
            println!("Skipped {} (already present)", path.display());
            continue;
        }
        let kind = match fs::metadata(&path) {
            Ok(metadata) if metadata.is_dir() => EntryKind::Folder,
            _ => EntryKind::File,
        };
        let id = space.add_entry(&path, kind, section.as_ref(), None);
        println!("Added {} ({id})", path.display());
    }
    Ok(())
}

fn execute_list(space: &mut FocusSpace, args: ListArgs) {
    if let Some(choice) = args.kind {
        let entries = space.entries_of_kind(choice.into());
        if entries.is_empty() {
            println!("No matching entries.");
            return;
        }
        for entry in entries {
            print_line(entry, 0, args.ids);
        }
        return;
    }

    let entries = space.top_level_entries();
    if entries.is_empty() {
        println!("The focus space is empty.");
        return;
    }
    print_tree(entries, 0, args.ids);
}

fn print_tree(entries: &[FocusEntry], depth: usize, with_ids: bool) {
    for entry in entries {
        print_line(entry, depth, with_ids);
        if let Some(children) = &entry.children {
            print_tree(children, depth + 1, with_ids);
        }
    }
}

fn print_line(entry: &FocusEntry, depth: usize, with_ids: bool) {
    let indent = "  ".repeat(depth);
    let marker = match entry.kind {
        EntryKind::Section => "# ",
        EntryKind::Folder => "",
        EntryKind::File => "",
    };
    let suffix = if entry.kind == EntryKind::Folder {
        "/"
    } else {
        ""
    };
    if with_ids {
        println!(
            "{indent}{marker}{}{suffix}  ({})",
            entry.display_label(),
            entry.id
        );
    } else {
        println!("{indent}{marker}{}{suffix}", entry.display_label());
    }
}

fn execute_move(space: &mut FocusSpace, workspace_root: &Path, args: MoveArgs) -> Result<()> {
    let id = resolve_entry(space, workspace_root, &args.entry)?;
    let destination = match (&args.to, args.root) {
        (Some(reference), false) => Some(resolve_section(space, workspace_root, reference)?),
        (None, true) => None,
        _ => bail!("specify --to <SECTION> or --root"),
    };

    let moved = match args.position {
        Some(position) => space.move_to_section_at(&id, destination.as_ref(), position),
        None => space.move_to_section(&id, destination.as_ref()),
    };
    if !moved {
        bail!("could not move {id} (missing destination or cyclic move)");
    }
    match destination {
        Some(section) => println!("Moved {id} into {section}"),
        None => println!("Moved {id} to root level"),
    }
    Ok(())
}

fn execute_materialize(
    space: &mut FocusSpace,
    workspace_root: &Path,
    args: MaterializeArgs,
) -> Result<()> {
    let id = resolve_entry(space, workspace_root, &args.entry)?;
    let store = PreferencesStore::load(preferences_path(workspace_root))
        .map_err(|err| anyhow!("failed to load preferences: {err}"))?;
    let preferences = store.preferences();
    let matcher = ExcludeMatcher::compile(&preferences.exclude)
        .map_err(|err| anyhow!("failed to compile exclude rules: {err}"))?;
    let depth = args.depth.unwrap_or(preferences.max_materialize_depth) as usize;

    let added = space
        .materialize_folder(&id, depth, &CancelFlag::new(), |path| {
            matcher.is_excluded(path)
        })
        .with_context(|| format!("failed to materialize {id}"))?;
    println!("Materialized {added} entries under {id}");
    Ok(())
}

fn resolve_entry(
    space: &mut FocusSpace,
    workspace_root: &Path,
    reference: &str,
) -> Result<EntryId> {
    let entries: Vec<(EntryId, String, Option<PathBuf>)> = space
        .flatten()
        .into_iter()
        .map(|entry| {
            (
                entry.id.clone(),
                entry.display_label(),
                entry.locator.as_path().map(|path| path.to_path_buf()),
            )
        })
        .collect();

    if let Some((id, _, _)) = entries.iter().find(|(id, _, _)| id.as_str() == reference) {
        return Ok(id.clone());
    }

    let prefix_matches: Vec<_> = entries
        .iter()
        .filter(|(id, _, _)| id.as_str().starts_with(reference))
        .collect();
    match prefix_matches.len() {
        1 => return Ok(prefix_matches[0].0.clone()),
        n if n > 1 => bail!("id prefix '{reference}' is ambiguous ({n} matches)"),
        _ => {}
    }

    let label_matches: Vec<_> = entries
        .iter()
        .filter(|(_, label, _)| label == reference)
        .collect();
    match label_matches.len() {
        1 => return Ok(label_matches[0].0.clone()),
        n if n > 1 => bail!("label '{reference}' is ambiguous ({n} matches)"),
        _ => {}
    }

    let absolute = resolve_input_path(Path::new(reference))?;
    let joined = workspace_root.join(reference);
    if let Some((id, _, _)) = entries.iter().find(|(_, _, path)| {
        path.as_deref() == Some(absolute.as_path()) || path.as_deref() == Some(joined.as_path())
    }) {
        return Ok(id.clone());
    }

    bail!("no entry matches '{reference}'");
}

fn resolve_section(
    space: &mut FocusSpace,
    workspace_root: &Path,
    reference: &str,
) -> Result<EntryId> {
    let id = resolve_entry(space, workspace_root, reference)?;
    match space.entry(&id) {
        Some(entry) if entry.kind == EntryKind::Section => Ok(id),
        Some(_) => bail!("'{reference}' is not a section"),
        None => bail!("no entry matches '{reference}'"),
    }
}

fn open_space(workspace_root: &Path) -> FocusSpace {
    FocusSpace::init(SpaceStore::new(space_path(workspace_root)))
        .with_workspace_root(workspace_root)
}

fn space_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".focusspace").join("space.json")
}

fn preferences_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".focusspace").join("preferences.json")
}

fn resolve_workspace(workspace: Option<PathBuf>) -> Result<PathBuf> {
    match workspace {
        Some(path) => {
            if path.is_absolute() {
                Ok(path)
            } else {
                Ok(std::env::current_dir()
                    .context("determine current directory")?
                    .join(path))
            }
        }
        None => std::env::current_dir().context("determine current directory"),
    }
}

fn resolve_input_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("determine current directory")?
            .join(path))
    }
}
