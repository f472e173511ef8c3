use clap::Subcommand;
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::api::client::{ApiHandle, HttpTransport, Transport};
use crate::api::types::RegisterUser;
use crate::config::Config;
use crate::store::projects::ProjectCache;
use crate::store::session::Session;
use crate::store::storage::{self, StateStore};

/// Console commands.
#[derive(Debug, Subcommand)]
pub enum Command {
  /// Sign in and store the session locally
  Login {
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
  },
  /// Create an account, then sign in with it
  Register {
    #[arg(long)]
    username: String,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
  },
  /// Drop the stored session
  Logout,
  /// Show the signed-in user
  Whoami {
    /// Wait for a fresh profile fetch instead of printing the cached one
    #[arg(long)]
    refresh: bool,
  },
  /// Project operations
  #[command(subcommand)]
  Projects(ProjectsCommand),
  /// Collection operations in a project's database
  Collections {
    /// Project id
    project: String,
    #[command(subcommand)]
    command: CollectionsCommand,
  },
  /// Document operations in a project collection
  Docs {
    /// Project id
    project: String,
    /// Collection name
    collection: String,
    #[command(subcommand)]
    command: DocsCommand,
  },
}

#[derive(Debug, Subcommand)]
pub enum ProjectsCommand {
  /// Fetch every project from the server
  List {
    /// Print the locally cached list instead of fetching
    #[arg(long)]
    cached: bool,
  },
  /// Show one project, served from the local cache when possible
  Show { id: String },
  /// Create a project
  Create { name: String },
}

#[derive(Debug, Subcommand)]
pub enum CollectionsCommand {
  /// List collections
  List,
  /// Create a collection
  Create { name: String },
  /// Drop a collection and everything in it
  Drop { name: String },
}

#[derive(Debug, Subcommand)]
pub enum DocsCommand {
  /// Query documents with an optional MongoDB filter
  Query {
    /// Filter document as JSON, e.g. '{"done": false}'
    #[arg(long)]
    filter: Option<String>,
    /// Find options as JSON, e.g. '{"limit": 10}'
    #[arg(long)]
    options: Option<String>,
  },
  /// Insert a document given as JSON
  Create { document: String },
  /// Fetch a document by id
  Get { id: String },
  /// Apply a MongoDB update document, e.g. '{"$set": {"done": true}}'
  Update { id: String, update: String },
  /// Overwrite fields on a document ($set semantics)
  Set {
    id: String,
    fields: String,
    /// Update options as JSON
    #[arg(long)]
    options: Option<String>,
  },
  /// Delete a document by id
  Delete { id: String },
}

/// The wired-up console: API client factory plus the session and project
/// stores sharing one local state store.
pub struct App {
  api: Arc<ApiHandle>,
  session: Session,
  projects: ProjectCache,
}

impl App {
  /// Build the console from configuration, persisting state at the
  /// default location.
  pub fn new(config: &Config) -> Result<Self> {
    let transport = Arc::new(HttpTransport::new()?);
    Self::with_parts(config, storage::default_store(), transport)
  }

  /// Build with explicit storage and transport.
  pub fn with_parts(
    config: &Config,
    store: Arc<dyn StateStore>,
    transport: Arc<dyn Transport>,
  ) -> Result<Self> {
    let api = Arc::new(ApiHandle::new(&config.api.url, transport)?);
    let session = Session::new(Arc::clone(&api), Arc::clone(&store));
    let projects = ProjectCache::new(Arc::clone(&api), store, session.token_cell());

    Ok(Self {
      api,
      session,
      projects,
    })
  }

  /// Execute one command, printing its result as JSON on stdout.
  pub async fn run(&self, command: Command) -> Result<()> {
    match command {
      Command::Login { email, password } => {
        self.session.login(&email, &password).await?;
        self.session.profile_synced().await;
        print_json(&self.session.user())?;
      }
      Command::Register {
        username,
        first_name,
        last_name,
        email,
        password,
      } => {
        let info = RegisterUser {
          username,
          first_name,
          last_name,
          email,
          password,
        };
        self.session.register(&info).await?;
        self.session.profile_synced().await;
        print_json(&self.session.user())?;
      }
      Command::Logout => {
        self.session.logout();
        info!("signed out");
      }
      Command::Whoami { refresh } => {
        if refresh {
          self.session.profile_synced().await;
        }
        if self.session.token().is_none() {
          info!("not signed in");
        }
        print_json(&self.session.user())?;
      }
      Command::Projects(command) => match command {
        ProjectsCommand::List { cached } => {
          if cached {
            print_json(&self.projects.projects())?;
          } else {
            print_json(&self.projects.fetch_all().await?)?;
          }
        }
        ProjectsCommand::Show { id } => print_json(&self.projects.fetch_by_id(&id).await?)?,
        ProjectsCommand::Create { name } => print_json(&self.projects.create(&name).await?)?,
      },
      Command::Collections { project, command } => {
        let mongo = self.api.mongodb(&project);
        match command {
          CollectionsCommand::List => print_json(&mongo.collections().await?)?,
          CollectionsCommand::Create { name } => {
            print_json(&mongo.create_collection(&name).await?)?
          }
          CollectionsCommand::Drop { name } => print_json(&mongo.drop_collection(&name).await?)?,
        }
      }
      Command::Docs {
        project,
        collection,
        command,
      } => {
        let mongo = self.api.mongodb(&project);
        match command {
          DocsCommand::Query { filter, options } => {
            let filter = filter.as_deref().map(parse_json).transpose()?;
            let options = options.as_deref().map(parse_json).transpose()?;
            let documents: Vec<Value> = mongo.documents(&collection, filter, options).await?;
            print_json(&documents)?;
          }
          DocsCommand::Create { document } => {
            print_json(&mongo.create_document(&collection, parse_json(&document)?).await?)?
          }
          DocsCommand::Get { id } => {
            print_json(&mongo.get_document::<Value>(&collection, &id).await?)?
          }
          DocsCommand::Update { id, update } => print_json(
            &mongo
              .update_document(&collection, &id, parse_json(&update)?)
              .await?,
          )?,
          DocsCommand::Set { id, fields, options } => {
            let options = options.as_deref().map(parse_json).transpose()?;
            print_json(
              &mongo
                .set_document(&collection, &id, parse_json(&fields)?, options)
                .await?,
            )?
          }
          DocsCommand::Delete { id } => print_json(&mongo.delete_document(&collection, &id).await?)?,
        }
      }
    }

    Ok(())
  }
}

/// Parse a JSON literal passed on the command line.
fn parse_json(raw: &str) -> Result<Value> {
  serde_json::from_str(raw).map_err(|e| eyre!("Invalid JSON argument {}: {}", raw, e))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
