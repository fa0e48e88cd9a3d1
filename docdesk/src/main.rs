use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use docdesk::context::{AppContext, User};
use docdesk::controller::merged_followup;
use docdesk::entity::{
    DialogAction, EntityDraft, FileMetadataBuilder, ProjectDraft, delete_prompt, dialog_title,
    upload_from_path,
};
use docdesk::filter::{Page, StatusFilter, filter_files, filter_projects, format_file_size};
use docdesk::notify::{MemorySink, NotificationSink, TracingSink, Tee};
use docdesk::settings::Settings;
use docdesk::{
    CollectionController, Followup, Keyed, Messages, ProjectFiles, RemoteCollection,
    UserProjects, save_edit,
};
use docdesk_core::{DocdeskClient, FileStatus, ProjectAction};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Clone, PartialEq, Eq)]
enum CliMode {
    ShowSettings,
    Projects { search: Option<String> },
    NewProject { name: String, description: Option<String> },
    EditProject { id: String, name: String, description: Option<String> },
    ProjectAction { id: String, action: ProjectAction },
    DeleteProject { id: String, assume_yes: bool },
    Files { project: String, search: Option<String> },
    Upload { project: String, paths: Vec<PathBuf> },
    Delete { project: String, file_id: String, assume_yes: bool },
    SetMeta { file_id: String, name: String, entries: Vec<String> },
    FileStatus { file_id: String, status: FileStatus },
    Download { file_id: String, out: PathBuf },
    ToggleSidebar,
    Help,
}

fn parse_cli_mode<I>(args: I) -> anyhow::Result<CliMode>
where
    I: IntoIterator<Item = String>,
{
    let args: Vec<String> = args.into_iter().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        return Ok(CliMode::Help);
    };
    let mode = match (command.as_str(), rest) {
        ("--help" | "-h", _) => CliMode::Help,
        ("--show-settings", []) => CliMode::ShowSettings,
        ("projects", []) => CliMode::Projects { search: None },
        ("projects", [search]) => CliMode::Projects {
            search: Some(search.clone()),
        },
        ("new-project", [name]) => CliMode::NewProject {
            name: name.clone(),
            description: None,
        },
        ("new-project", [name, description]) => CliMode::NewProject {
            name: name.clone(),
            description: Some(description.clone()),
        },
        ("edit-project", [id, name]) => CliMode::EditProject {
            id: id.clone(),
            name: name.clone(),
            description: None,
        },
        ("edit-project", [id, name, description]) => CliMode::EditProject {
            id: id.clone(),
            name: name.clone(),
            description: Some(description.clone()),
        },
        ("project", [id, action]) => CliMode::ProjectAction {
            id: id.clone(),
            action: ProjectAction::parse(action)
                .with_context(|| format!("unknown project action: {action}"))?,
        },
        ("delete-project", [id]) => CliMode::DeleteProject {
            id: id.clone(),
            assume_yes: false,
        },
        ("delete-project", [id, flag]) if flag == "--yes" => CliMode::DeleteProject {
            id: id.clone(),
            assume_yes: true,
        },
        ("files", [project]) => CliMode::Files {
            project: project.clone(),
            search: None,
        },
        ("files", [project, search]) => CliMode::Files {
            project: project.clone(),
            search: Some(search.clone()),
        },
        ("upload", [project, paths @ ..]) if !paths.is_empty() => CliMode::Upload {
            project: project.clone(),
            paths: paths.iter().map(PathBuf::from).collect(),
        },
        ("delete", [project, file_id]) => CliMode::Delete {
            project: project.clone(),
            file_id: file_id.clone(),
            assume_yes: false,
        },
        ("delete", [project, file_id, flag]) if flag == "--yes" => CliMode::Delete {
            project: project.clone(),
            file_id: file_id.clone(),
            assume_yes: true,
        },
        ("set-meta", [file_id, name, entries @ ..]) => CliMode::SetMeta {
            file_id: file_id.clone(),
            name: name.clone(),
            entries: entries.to_vec(),
        },
        ("file-status", [file_id, status]) => CliMode::FileStatus {
            file_id: file_id.clone(),
            status: FileStatus::parse(status)
                .with_context(|| format!("unknown file status: {status}"))?,
        },
        ("download", [file_id, out]) => CliMode::Download {
            file_id: file_id.clone(),
            out: PathBuf::from(out),
        },
        ("toggle-sidebar", []) => CliMode::ToggleSidebar,
        (other, _) => anyhow::bail!("unknown or incomplete command: {other} (see --help)"),
    };
    Ok(mode)
}

fn print_help() {
    println!("Usage: docdesk <command>");
    println!("  --show-settings                          Print effective settings as JSON");
    println!("  projects [search]                        List projects of DOCDESK_USER_ID");
    println!("  new-project <name> [description]         Create a project");
    println!("  edit-project <id> <name> [description]   Rename or describe a project");
    println!("  project <id> <action>                    pin|favorite|share|archive|unarchive|publish|unpublish");
    println!("  delete-project <id> [--yes]              Delete a project after confirmation");
    println!("  files <project> [search]                 List files attached to a project");
    println!("  upload <project> <path>...               Upload files and attach them");
    println!("  delete <project> <file-id> [--yes]       Delete a file after confirmation");
    println!("  set-meta <file-id> <name> [k=v|#tag]...  Replace file name, metadata and tags");
    println!("  file-status <file-id> <status>           draft|pending|processed|uploaded");
    println!("  download <file-id> <out>                 Save file contents to a local path");
    println!("  toggle-sidebar                           Flip the persisted sidebar state");
}

/// Asks a yes/no question; anything but `y`/`yes` declines.
fn confirm(prompt: &str, mut input: impl BufRead, mut out: impl Write) -> std::io::Result<bool> {
    write!(out, "{prompt} [y/N] ")?;
    out.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let mode = parse_cli_mode(std::env::args())?;
    if mode == CliMode::Help {
        print_help();
        return Ok(());
    }
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docdesk=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from_env();
    let mut context = AppContext::load(&settings.state_dir);
    context
        .auth
        .set_user(settings.user_id.as_deref().map(User::new));

    match mode {
        CliMode::ShowSettings => {
            println!("{}", serde_json::to_string_pretty(&settings.snapshot())?);
            return Ok(());
        }
        CliMode::ToggleSidebar => {
            let sidebar = context.toggle_sidebar()?;
            println!(
                "sidebar {}",
                if sidebar.collapsed { "collapsed" } else { "expanded" }
            );
            return Ok(());
        }
        _ => {}
    }

    let client = DocdeskClient::with_base_url(&settings.api_url, settings.csrf_token.clone())
        .with_context(|| format!("invalid DOCDESK_API_URL {}", settings.api_url))?
        .with_timeout(settings.timeout)?;
    let notices = MemorySink::new();
    let sink = Tee(TracingSink, &notices);

    let result = run(mode, client, &context, &sink).await;
    for notice in notices.take() {
        println!("{}", notice.message());
    }
    result
}

async fn run(
    mode: CliMode,
    client: DocdeskClient,
    context: &AppContext,
    sink: &Tee<TracingSink, &MemorySink>,
) -> anyhow::Result<()> {
    match mode {
        CliMode::Projects { search } => {
            let owner = require_user(context)?;
            let projects =
                CollectionController::new(UserProjects::new(client), sink, Messages::PROJECTS);
            projects.open(owner);
            projects.refresh().await?;
            let visible = projects.visible();
            let hits = filter_projects(&visible, search.as_deref().unwrap_or(""), StatusFilter::All);
            print_page(&hits, |project| {
                format!("{}\t{}\t{}", project.id, project.status.as_str(), project.name)
            });
        }
        CliMode::NewProject { name, description } => {
            let owner = require_user(context)?;
            let draft = project_draft(name, description)?;
            let projects =
                CollectionController::new(UserProjects::new(client), sink, Messages::PROJECTS);
            projects.open(owner);
            let created = projects.create(draft).await?;
            println!("{}", created.value.id);
        }
        CliMode::EditProject {
            id,
            name,
            description,
        } => {
            let draft = EntityDraft::Project(project_draft(name, description)?);
            save_with_title(&client, &id, draft).await?;
        }
        CliMode::ProjectAction { id, action } => {
            let project = client
                .project_action(&id, action)
                .await
                .with_context(|| format!("failed to {} project {id}", action.segment()))?;
            println!(
                "{}\t{}\tpinned={} favorite={} shared={}",
                project.id,
                project.status.as_str(),
                project.is_pinned,
                project.is_favorite,
                project.is_shared
            );
        }
        CliMode::DeleteProject { id, assume_yes } => {
            let owner = require_user(context)?;
            let projects =
                CollectionController::new(UserProjects::new(client), sink, Messages::PROJECTS);
            projects.open(owner);
            confirmed_delete(&projects, &id, assume_yes, EntityDraft::from_project).await?;
        }
        CliMode::Files { project, search } => {
            let files = CollectionController::new(ProjectFiles::new(client), sink, Messages::FILES);
            files.open(project);
            files.refresh().await?;
            let visible = files.visible();
            let hits = filter_files(&visible, search.as_deref().unwrap_or(""));
            print_page(&hits, |file| {
                format!(
                    "{}\t{}\t{}",
                    file.id,
                    format_file_size(file.file_size),
                    file.file_name
                )
            });
        }
        CliMode::Upload { project, paths } => {
            let mut drafts = Vec::with_capacity(paths.len());
            for path in &paths {
                drafts.push(upload_from_path(path).await?);
            }
            let files = CollectionController::new(ProjectFiles::new(client), sink, Messages::FILES);
            files.open(project);
            files.refresh().await?;
            let results = files.create_many(drafts).await;
            if merged_followup(&results) == Some(Followup::Refetch) {
                files.refresh().await?;
            }
            let failed = results.iter().filter(|result| result.is_err()).count();
            if failed > 0 {
                anyhow::bail!("{failed} of {} uploads failed", results.len());
            }
        }
        CliMode::Delete {
            project,
            file_id,
            assume_yes,
        } => {
            let files = CollectionController::new(ProjectFiles::new(client), sink, Messages::FILES);
            files.open(project);
            confirmed_delete(&files, &file_id, assume_yes, EntityDraft::from_file).await?;
        }
        CliMode::SetMeta {
            file_id,
            name,
            entries,
        } => {
            let mut builder = FileMetadataBuilder::new(name);
            for entry in &entries {
                builder = match entry.strip_prefix('#') {
                    Some(tag) => builder.tag(tag),
                    None => builder.parse_entry(entry)?,
                };
            }
            save_with_title(&client, &file_id, EntityDraft::File(builder.build()?)).await?;
        }
        CliMode::FileStatus { file_id, status } => {
            client
                .update_file_status(&file_id, status)
                .await
                .with_context(|| format!("failed to update status of {file_id}"))?;
            println!("status updated");
        }
        CliMode::Download { file_id, out } => {
            let bytes = client
                .download_file(&file_id)
                .await
                .with_context(|| format!("failed to download {file_id}"))?;
            tokio::fs::write(&out, &bytes)
                .await
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!(
                "saved {} to {}",
                format_file_size(bytes.len() as u64),
                out.display()
            );
        }
        CliMode::ShowSettings | CliMode::ToggleSidebar | CliMode::Help => {}
    }
    Ok(())
}

fn project_draft(name: String, description: Option<String>) -> anyhow::Result<ProjectDraft> {
    let mut builder = ProjectDraft::builder(name);
    if let Some(description) = description {
        builder = builder.description(description);
    }
    Ok(builder.build()?)
}

async fn save_with_title(client: &DocdeskClient, id: &str, draft: EntityDraft) -> anyhow::Result<()> {
    let title = dialog_title(DialogAction::Edit, draft.kind());
    let name = draft.display_name().to_string();
    save_edit(client, id, draft)
        .await
        .with_context(|| format!("{title} {id} failed"))?;
    println!("{title}: saved \"{name}\"");
    Ok(())
}

/// Looks the row up in a fresh listing, asks unless `assume_yes`, then
/// deletes through the controller.
async fn confirmed_delete<C, N>(
    list: &CollectionController<C, N>,
    id: &str,
    assume_yes: bool,
    draft_of: fn(&C::Item) -> EntityDraft,
) -> anyhow::Result<()>
where
    C: RemoteCollection,
    N: NotificationSink,
{
    list.refresh().await?;
    let item = list
        .visible()
        .into_iter()
        .find(|item| item.key() == id)
        .with_context(|| format!("{id} is not in the current list"))?;
    let draft = draft_of(&item);
    if !assume_yes {
        let stdin = std::io::stdin();
        if !confirm(&delete_prompt(&draft), stdin.lock(), std::io::stdout())? {
            println!("cancelled");
            return Ok(());
        }
    }
    let outcome = list.delete(id).await?;
    if outcome.followup == Followup::Refetch {
        list.refresh().await?;
    }
    Ok(())
}

fn require_user(context: &AppContext) -> anyhow::Result<&str> {
    context
        .auth
        .user_id()
        .context("DOCDESK_USER_ID is not set")
}

fn print_page<T>(items: &[T], render: impl Fn(&T) -> String) {
    let page = Page::default();
    for item in page.slice(items) {
        println!("{}", render(item));
    }
    if page.has_next(items.len()) {
        println!("... {} more", items.len() - page.size);
    }
}
