use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    calendar::{CalendarPage, EventsFilter, Layout, Scope},
    issue::{parse_item_route, IssuePage, SubmitOutcome},
    load_settings, ClientError, SessionStore, Settings,
};
use shared::domain::{EventId, PostId, Side, UserId, Vote};
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser, Debug)]
#[command(name = "civix", about = "Political events calendar and issue debates")]
struct Cli {
    /// Backend base url; overrides civix.toml and the environment.
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Remember which user this client acts as.
    Login {
        user_id: i64,
    },
    Logout,
    Whoami,
    /// Show upcoming events.
    Calendar {
        /// City, state, or USA for everything.
        #[arg(long)]
        filter: Option<String>,
        /// List view instead of the month grid.
        #[arg(long)]
        list: bool,
        /// Community events instead of your own.
        #[arg(long)]
        community: bool,
    },
    /// Show the full details of one event.
    Event {
        event_id: i64,
    },
    Attend {
        event_id: i64,
    },
    Unattend {
        event_id: i64,
    },
    /// Show an issue and its debate, by route (`/issue/12`) or id.
    Issue {
        route: String,
    },
    Comment {
        route: String,
        #[arg(long, default_value = "for")]
        side: Side,
        text: String,
    },
    Vote {
        route: String,
        post_id: i64,
        vote: Vote,
    },
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "info" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn require_user(session: &SessionStore) -> Result<UserId> {
    session
        .load()?
        .ok_or(ClientError::NotLoggedIn)
        .context("run `civix login <user_id>` first")
}

fn item_from_route(route: &str) -> Result<shared::domain::ItemId> {
    parse_item_route(route).ok_or_else(|| anyhow!("no item id in route '{route}'"))
}

async fn calendar_page(settings: &Settings, user_id: UserId) -> Result<CalendarPage> {
    let backend = client_core::connect(settings)?;
    let mut page = CalendarPage::new(backend, user_id);
    page.fetch_all()
        .await
        .with_context(|| format!("failed to load calendar from {}", settings.api_base_url))?;
    Ok(page)
}

async fn issue_page(settings: &Settings, user_id: UserId, route: &str) -> Result<IssuePage> {
    let item_id = item_from_route(route)?;
    let backend = client_core::connect(settings)?;
    let mut page = IssuePage::new(backend, user_id, item_id);
    page.fetch_comments()
        .await
        .with_context(|| format!("failed to load item {item_id} from {}", settings.api_base_url))?;
    Ok(page)
}

async fn update_attendance(
    settings: &Settings,
    user_id: UserId,
    add: bool,
    event_id: EventId,
) -> Result<()> {
    let mut page = calendar_page(settings, user_id).await?;
    page.toggle_attendance(add, event_id)
        .await
        .with_context(|| format!("failed to update attendance for event {event_id}"))?;
    let status = if page.is_attending(event_id) {
        "Attending"
    } else {
        "Not Attending"
    };
    println!("#{event_id}: {status}");
    Ok(())
}

async fn run_page_command(command: Command, settings: &Settings, user_id: UserId) -> Result<()> {
    match command {
        Command::Calendar {
            filter,
            list,
            community,
        } => {
            let mut page = calendar_page(settings, user_id).await?;
            if let Some(filter) = filter {
                page.change_filter(EventsFilter::parse(&filter));
            }
            if list {
                page.change_layout(Layout::List);
            }
            if community {
                page.change_scope(Scope::Community);
            }
            print!("{}", render::calendar(&page));
        }
        Command::Event { event_id } => {
            let mut page = calendar_page(settings, user_id).await?;
            let event_id = EventId(event_id);
            page.toggle_event_details(event_id);
            let event = page
                .selected_event()
                .ok_or_else(|| anyhow!("no event with id {event_id}"))?;
            print!(
                "{}",
                render::event_details(event, page.is_attending(event_id))
            );
        }
        Command::Attend { event_id } => {
            update_attendance(settings, user_id, true, EventId(event_id)).await?;
        }
        Command::Unattend { event_id } => {
            update_attendance(settings, user_id, false, EventId(event_id)).await?;
        }
        Command::Issue { route } => {
            let page = issue_page(settings, user_id, &route).await?;
            print!("{}", render::issue(&page));
        }
        Command::Comment { route, side, text } => {
            let mut page = issue_page(settings, user_id, &route).await?;
            page.set_draft_side(side);
            page.set_draft_text(text);
            match page.submit_comment().await? {
                SubmitOutcome::Posted(post) => {
                    println!("Posted comment #{} ({side})\n", post.id);
                    print!("{}", render::issue(&page));
                }
                SubmitOutcome::Rejected(reason) => {
                    tracing::debug!(%reason, "cli: comment rejected");
                    if let Some(message) = page.error_message() {
                        eprintln!("{message}");
                    }
                }
            }
        }
        Command::Vote {
            route,
            post_id,
            vote,
        } => {
            let mut page = issue_page(settings, user_id, &route).await?;
            page.cast_vote(PostId(post_id), vote)
                .await
                .with_context(|| format!("failed to vote on post {post_id}"))?;
            print!("{}", render::issue(&page));
        }
        Command::Login { .. } | Command::Logout | Command::Whoami => {
            bail!("session commands do not open a page")
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut settings = load_settings();
    if let Some(api_url) = &cli.api_url {
        settings = settings.with_api_base_url(api_url);
    }
    let session = SessionStore::new(settings.session_path.clone());

    match cli.command {
        Command::Login { user_id } => {
            session.save(UserId(user_id))?;
            println!("Logged in as user {user_id}");
        }
        Command::Logout => {
            session.clear()?;
            println!("Logged out");
        }
        Command::Whoami => match session.load()? {
            Some(user_id) => println!("user {user_id}"),
            None => println!("not logged in"),
        },
        command => {
            let user_id = require_user(&session)?;
            run_page_command(command, &settings, user_id).await?;
        }
    }

    Ok(())
}
