use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use simdesk_admin::{Directory, PermissionService, Records, TaskService, TemplateService};
use simdesk_config::{
  Access, Customer, CustomerPatch, FlowDef, Iccid, OrgType, Organization, Page, TaskStatus,
  TaskTemplate,
};
use simdesk_modules::{FsModuleRegistry, ModuleDef, ModuleRegistry};
use simdesk_records::{CustomerField, DateRange, Orphan};
use simdesk_store::{SqliteStore, Store};
use simdesk_workflow::{FlowValidator, ValidationReport};

/// simdesk - back office for SIM distribution task templates and records
#[derive(Parser)]
#[command(name = "simdesk")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.simdesk)
  #[arg(long, global = true, env = "SIMDESK_DATA_DIR")]
  data_dir: Option<PathBuf>,

  /// Database URL (default: sqlite://<data-dir>/simdesk.db)
  #[arg(long, global = true, env = "SIMDESK_DATABASE_URL")]
  database_url: Option<String>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Validate a flow definition or task template file
  Validate {
    /// Path to a JSON flow definition or task template
    file: PathBuf,

    /// Known role names; enables handler and cc role checks
    #[arg(long, value_delimiter = ',')]
    roles: Vec<String>,
  },

  /// Inspect and extend the module registry
  Modules {
    #[command(subcommand)]
    command: ModulesCommand,
  },

  /// Manage stored task templates
  Template {
    #[command(subcommand)]
    command: TemplateCommand,
  },

  /// Start and track task instances
  Task {
    #[command(subcommand)]
    command: TaskCommand,
  },

  /// Manage roles
  Role {
    #[command(subcommand)]
    command: RoleCommand,
  },

  /// Manage the organization tree
  Org {
    #[command(subcommand)]
    command: OrgCommand,
  },

  /// Manage regions
  Region {
    #[command(subcommand)]
    command: RegionCommand,
  },

  /// Third-party agents
  Tpa {
    #[command(subcommand)]
    command: TpaCommand,
  },

  /// Page permissions
  Permission {
    #[command(subcommand)]
    command: PermissionCommand,
  },

  /// Customers
  Customer {
    #[command(subcommand)]
    command: CustomerCommand,
  },

  /// SIM card ICCIDs
  Iccid {
    #[command(subcommand)]
    command: IccidCommand,
  },

  /// Export records as CSV
  Export {
    #[command(subcommand)]
    target: ExportTarget,

    /// Write to a file instead of stdout
    #[arg(long, short, global = true)]
    output: Option<PathBuf>,
  },
}

#[derive(Subcommand)]
enum ModulesCommand {
  /// List built-in and installed modules
  List {
    /// Directory of installed module definitions (default: <data-dir>/modules)
    #[arg(long)]
    catalog: Option<PathBuf>,
  },

  /// Install a module definition from a JSON file
  Install { file: PathBuf },

  /// Remove an installed module
  Remove { id: String },
}

#[derive(Subcommand)]
enum TemplateCommand {
  /// Validate and store a template from a JSON file
  Import { file: PathBuf },

  /// List templates in display order
  List,

  /// Print a stored template
  Show { id: String },

  /// Re-validate a stored template against the current modules and roles
  Validate { id: String },

  /// Move a template to a new display position
  Move {
    id: String,
    #[arg(long)]
    to: usize,
  },

  /// Delete a template
  Delete { id: String },
}

#[derive(Subcommand)]
enum TaskCommand {
  /// Start a draft task from a stored template
  Start {
    template_id: String,
    /// Assignee email
    #[arg(long)]
    assign: Option<String>,
    #[arg(long)]
    customer: Option<String>,
  },
  /// List tasks, newest first
  List {
    #[arg(long)]
    status: Option<TaskStatus>,
  },
  Show { id: String },
  /// Move a task to another status
  Status { id: String, status: TaskStatus },
  Delete { id: String },
}

#[derive(Subcommand)]
enum RoleCommand {
  Add {
    name: String,
    /// Seniority, 0 to 7
    #[arg(long)]
    level: u8,
    /// Display color; defaults to the level palette
    #[arg(long)]
    color: Option<String>,
  },
  List,
  /// Change a role's name, level or color
  Update {
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    level: Option<u8>,
    #[arg(long)]
    color: Option<String>,
  },
  Delete { id: String },
}

#[derive(Subcommand)]
enum OrgCommand {
  Add {
    name: String,
    #[arg(long = "type")]
    org_type: OrgType,
    /// Parent organization id
    #[arg(long)]
    parent: Option<String>,
  },
  List,
  /// Delete an organization
  Delete {
    id: String,
    /// Also delete every descendant
    #[arg(long)]
    cascade: bool,
  },
}

#[derive(Subcommand)]
enum RegionCommand {
  Add {
    name: String,
    #[arg(long)]
    color: Option<String>,
  },
  List,
  Update {
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    color: Option<String>,
  },
  Delete { id: String },
}

#[derive(Subcommand)]
enum TpaCommand {
  /// Report TPA links to regions or channels that no longer exist
  Check,
}

#[derive(Subcommand)]
enum PermissionCommand {
  /// Grant or revoke one operation on a page
  Set {
    role: String,
    page: Page,
    access: AccessArg,
    #[arg(long)]
    deny: bool,
  },
  /// Exit non-zero unless the role may perform the operation
  Check {
    role: String,
    page: Page,
    access: AccessArg,
  },
}

#[derive(Clone, Copy, ValueEnum)]
enum AccessArg {
  View,
  Create,
  Edit,
  Delete,
}

impl From<AccessArg> for Access {
  fn from(arg: AccessArg) -> Self {
    match arg {
      AccessArg::View => Access::View,
      AccessArg::Create => Access::Create,
      AccessArg::Edit => Access::Edit,
      AccessArg::Delete => Access::Delete,
    }
  }
}

#[derive(Subcommand)]
enum CustomerCommand {
  /// Print the code the next customer would get
  NextCode,
  /// Add a customer with the next free code
  Add {
    name: String,
    #[arg(long)]
    region: Option<String>,
    #[arg(long)]
    channel: Option<String>,
    #[arg(long)]
    program: Option<String>,
  },
  /// Set fields on many customers; omitted fields are left alone
  BulkUpdate {
    #[arg(required = true)]
    ids: Vec<String>,
    #[arg(long)]
    region: Option<String>,
    #[arg(long)]
    follow_up_sss: Option<String>,
    #[arg(long)]
    program: Option<String>,
    #[arg(long)]
    signal: Option<String>,
  },
}

#[derive(clap::Args)]
struct IccidFields {
  #[arg(long = "type")]
  iccid_type: Option<String>,
  #[arg(long)]
  program: Option<String>,
  #[arg(long)]
  program_name: Option<String>,
  #[arg(long)]
  customer: Option<String>,
  #[arg(long)]
  department: Option<String>,
  #[arg(long)]
  channel: Option<String>,
  #[arg(long)]
  region: Option<String>,
}

impl IccidFields {
  fn apply(self, iccid: &mut Iccid) {
    if let Some(t) = self.iccid_type {
      iccid.iccid_type = t;
    }
    let fields = [
      (self.program, &mut iccid.program),
      (self.program_name, &mut iccid.program_name),
      (self.customer, &mut iccid.customer_name),
      (self.department, &mut iccid.department),
      (self.channel, &mut iccid.channel),
      (self.region, &mut iccid.region),
    ];
    for (value, target) in fields {
      if value.is_some() {
        *target = value;
      }
    }
  }
}

#[derive(Subcommand)]
enum IccidCommand {
  /// Add a card; type MD drops customer and program
  Add {
    iccid: String,
    #[command(flatten)]
    fields: IccidFields,
  },
  List,
  Update {
    id: String,
    #[command(flatten)]
    fields: IccidFields,
  },
  Delete { id: String },
}

#[derive(Subcommand)]
enum ExportTarget {
  Customers {
    /// Columns to include (default: all)
    #[arg(long, value_delimiter = ',')]
    fields: Vec<CustomerField>,
  },
  Billing {
    /// First billing date to include (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Last billing date to include (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,
  },
  Iccids,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("simdesk=info")),
    )
    .with_writer(io::stderr)
    .with_target(false)
    .compact()
    .init();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".simdesk"),
  };

  let Some(command) = cli.command else {
    println!("simdesk - use --help to see available commands");
    return Ok(());
  };

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(run(command, data_dir, cli.database_url))
}

async fn run(command: Commands, data_dir: PathBuf, database_url: Option<String>) -> Result<()> {
  let modules_dir = data_dir.join("modules");

  match command {
    Commands::Validate { file, roles } => validate_file(&file, &roles, &modules_dir).await,
    Commands::Modules { command } => modules(command, modules_dir).await,
    Commands::Template { command } => {
      let (_, shared) = open_store(&data_dir, database_url).await?;
      let service = TemplateService::new(shared, FsModuleRegistry::new(modules_dir));
      template(command, &service).await
    }
    Commands::Task { command } => {
      let (_, shared) = open_store(&data_dir, database_url).await?;
      task(command, &TaskService::new(shared)).await
    }
    Commands::Role { command } => {
      let (_, shared) = open_store(&data_dir, database_url).await?;
      role(command, &Directory::new(shared)).await
    }
    Commands::Org { command } => {
      let (_, shared) = open_store(&data_dir, database_url).await?;
      org(command, &Directory::new(shared)).await
    }
    Commands::Region { command } => {
      let (_, shared) = open_store(&data_dir, database_url).await?;
      region(command, &Directory::new(shared)).await
    }
    Commands::Tpa {
      command: TpaCommand::Check,
    } => {
      let (_, shared) = open_store(&data_dir, database_url).await?;
      let orphans = Directory::new(shared).tpa_orphans().await?;
      print_json(&orphans)?;
      eprintln!("{} orphaned link(s)", orphans.len());
      Ok(())
    }
    Commands::Permission { command } => {
      let (_, shared) = open_store(&data_dir, database_url).await?;
      permission(command, &PermissionService::new(shared)).await
    }
    Commands::Customer { command } => {
      let (store, _) = open_store(&data_dir, database_url).await?;
      customer(command, &Records::new(store)).await
    }
    Commands::Iccid { command } => {
      let (store, _) = open_store(&data_dir, database_url).await?;
      iccid(command, &Records::new(store)).await
    }
    Commands::Export { target, output } => {
      let (store, _) = open_store(&data_dir, database_url).await?;
      export(target, output, &Records::new(store)).await
    }
  }
}

async fn open_store(
  data_dir: &Path,
  database_url: Option<String>,
) -> Result<(SqliteStore, Arc<dyn Store>)> {
  let url = match database_url {
    Some(url) => url,
    None => {
      tokio::fs::create_dir_all(data_dir)
        .await
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;
      format!("sqlite://{}", data_dir.join("simdesk.db").display())
    }
  };

  let store = SqliteStore::connect(&url)
    .await
    .with_context(|| format!("failed to open store: {}", url))?;
  tracing::debug!(%url, "store ready");
  let shared: Arc<dyn Store> = Arc::new(store.clone());
  Ok((store, shared))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

/// Print the report and fail if it has errors.
fn finish_report(report: ValidationReport) -> Result<()> {
  print_json(&report)?;
  for warning in &report.warnings {
    eprintln!("warning: {}", warning);
  }
  if let Err(invalid) = report.into_result() {
    bail!(invalid);
  }
  eprintln!("flow is valid");
  Ok(())
}

async fn validate_file(file: &Path, roles: &[String], modules_dir: &Path) -> Result<()> {
  let content = tokio::fs::read_to_string(file)
    .await
    .with_context(|| format!("failed to read file: {}", file.display()))?;
  let value: Value = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse file: {}", file.display()))?;

  let catalog = FsModuleRegistry::new(modules_dir)
    .catalog()
    .await
    .context("failed to load module registry")?;

  let mut validator = FlowValidator::new().with_modules(&catalog);
  if !roles.is_empty() {
    validator = validator.with_roles(roles.iter().map(String::as_str));
  }

  // A bare flow definition has `nodes` at the top level; a template nests
  // it under `flow_config`.
  let report = if value.get("nodes").is_some() {
    let flow: FlowDef = serde_json::from_value(value)
      .with_context(|| format!("invalid flow definition: {}", file.display()))?;
    validator.validate_flow(&flow)
  } else {
    let template: TaskTemplate = serde_json::from_value(value)
      .with_context(|| format!("invalid task template: {}", file.display()))?;
    validator.validate_template(&template)
  };

  finish_report(report)
}

async fn modules(command: ModulesCommand, modules_dir: PathBuf) -> Result<()> {
  match command {
    ModulesCommand::List { catalog } => {
      let registry = FsModuleRegistry::new(catalog.unwrap_or(modules_dir));
      let modules = registry.list().await.context("failed to list modules")?;
      for module in &modules {
        println!("{}\t{}\t{}", module.id, module.module_type, module.name);
      }
    }
    ModulesCommand::Install { file } => {
      let content = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("failed to read file: {}", file.display()))?;
      let module: ModuleDef = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse module: {}", file.display()))?;
      let installed = FsModuleRegistry::new(modules_dir).install(module).await?;
      eprintln!("Installed module: {}", installed.id);
    }
    ModulesCommand::Remove { id } => {
      FsModuleRegistry::new(modules_dir).remove(&id).await?;
      eprintln!("Removed module: {}", id);
    }
  }
  Ok(())
}

async fn template(command: TemplateCommand, service: &TemplateService<FsModuleRegistry>) -> Result<()> {
  match command {
    TemplateCommand::Import { file } => {
      let content = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("failed to read template file: {}", file.display()))?;
      let template: TaskTemplate = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse template file: {}", file.display()))?;
      let doc = service.create(&template).await?;
      println!("{}", doc.id);
    }
    TemplateCommand::List => {
      for doc in service.list().await? {
        println!(
          "{}\t{}\t{}\t{} node(s)",
          doc.id,
          doc.data.display_order,
          doc.data.name,
          doc.data.flow_config.nodes.len()
        );
      }
    }
    TemplateCommand::Show { id } => print_json(&service.get(&id).await?)?,
    TemplateCommand::Validate { id } => {
      let doc = service.get(&id).await?;
      finish_report(service.validate(&doc.data).await?)?;
    }
    TemplateCommand::Move { id, to } => {
      let docs = service.reorder(&id, to).await?;
      eprintln!("Reordered {} template(s)", docs.len());
    }
    TemplateCommand::Delete { id } => {
      service.delete(&id).await?;
      eprintln!("Deleted template: {}", id);
    }
  }
  Ok(())
}

async fn role(command: RoleCommand, directory: &Directory) -> Result<()> {
  match command {
    RoleCommand::Add { name, level, color } => {
      let doc = directory.add_role(&name, level, color).await?;
      println!("{}", doc.id);
    }
    RoleCommand::List => {
      for doc in directory.roles().await? {
        println!("{}\t{}\t{}\t{}", doc.id, doc.data.level, doc.data.color, doc.data.name);
      }
    }
    RoleCommand::Update {
      id,
      name,
      level,
      color,
    } => {
      let doc = directory.role(&id).await?;
      let mut role = doc.data;
      if let Some(name) = name {
        role.name = name;
      }
      if let Some(level) = level {
        role.level = level;
      }
      if let Some(color) = color {
        role.color = color;
      }
      let saved = directory.update_role(&id, &role, doc.revision).await?;
      eprintln!("Updated role {} (revision {})", id, saved.revision);
    }
    RoleCommand::Delete { id } => {
      directory.delete_role(&id).await?;
      eprintln!("Deleted role: {}", id);
    }
  }
  Ok(())
}

async fn task(command: TaskCommand, service: &TaskService) -> Result<()> {
  match command {
    TaskCommand::Start {
      template_id,
      assign,
      customer,
    } => {
      let doc = service.start(&template_id, assign, customer).await?;
      println!("{}", doc.id);
    }
    TaskCommand::List { status } => {
      for doc in service.list(status).await? {
        println!(
          "{}\t{}\t{}\t{}",
          doc.id,
          doc.data.status,
          doc.data.name,
          doc.data.assigned_to.as_deref().unwrap_or("-")
        );
      }
    }
    TaskCommand::Show { id } => print_json(&service.get(&id).await?)?,
    TaskCommand::Status { id, status } => {
      let doc = service.get(&id).await?;
      service.set_status(&id, status, doc.revision).await?;
      eprintln!("Task {} is now {}", id, status);
    }
    TaskCommand::Delete { id } => {
      service.delete(&id).await?;
      eprintln!("Deleted task: {}", id);
    }
  }
  Ok(())
}

async fn org(command: OrgCommand, directory: &Directory) -> Result<()> {
  match command {
    OrgCommand::Add {
      name,
      org_type,
      parent,
    } => {
      let org = Organization {
        name,
        org_type,
        parent_id: parent,
      };
      let doc = directory.add_org(&org).await?;
      println!("{}", doc.id);
    }
    OrgCommand::List => {
      for doc in directory.orgs().await? {
        println!(
          "{}\t{}\t{}\t{}",
          doc.id,
          doc.data.org_type,
          doc.data.name,
          doc.data.parent_id.as_deref().unwrap_or("-")
        );
      }
    }
    OrgCommand::Delete { id, cascade } => {
      let refs = directory.delete_org(&id, cascade).await?;
      for child in &refs.children {
        eprintln!("Deleted organization: {}", child);
      }
      for tpa in &refs.tpas {
        eprintln!("warning: TPA '{}' still links the deleted organization", tpa);
      }
      eprintln!("Deleted organization: {}", id);
    }
  }
  Ok(())
}

async fn region(command: RegionCommand, directory: &Directory) -> Result<()> {
  match command {
    RegionCommand::Add { name, color } => {
      let doc = directory.add_region(&name, color).await?;
      println!("{}", doc.id);
    }
    RegionCommand::List => {
      for doc in directory.regions().await? {
        println!(
          "{}\t{}\t{}",
          doc.id,
          doc.data.name,
          doc.data.color.as_deref().unwrap_or("-")
        );
      }
    }
    RegionCommand::Update { id, name, color } => {
      let doc = directory.region(&id).await?;
      let name = name.unwrap_or(doc.data.name);
      let color = color.or(doc.data.color);
      let (_, orphans) = directory
        .update_region(&id, &name, color, doc.revision)
        .await?;
      report_orphans(&orphans);
      eprintln!("Updated region: {}", id);
    }
    RegionCommand::Delete { id } => {
      let orphans = directory.delete_region(&id).await?;
      report_orphans(&orphans);
      eprintln!("Deleted region: {}", id);
    }
  }
  Ok(())
}

fn report_orphans(orphans: &[Orphan]) {
  for orphan in orphans {
    eprintln!("warning: {}", orphan);
  }
}

async fn permission(command: PermissionCommand, service: &PermissionService) -> Result<()> {
  match command {
    PermissionCommand::Set {
      role,
      page,
      access,
      deny,
    } => {
      let row = service.toggle(&role, page, access.into(), !deny).await?;
      print_json(&row)?;
    }
    PermissionCommand::Check { role, page, access } => {
      if !service.allows(&role, page, access.into()).await? {
        bail!("role '{}' may not do that on {}", role, page.as_str());
      }
      eprintln!("allowed");
    }
  }
  Ok(())
}

async fn customer(command: CustomerCommand, records: &Records) -> Result<()> {
  match command {
    CustomerCommand::NextCode => println!("{}", records.next_code().await?),
    CustomerCommand::Add {
      name,
      region,
      channel,
      program,
    } => {
      let customer = Customer {
        customer_name: name,
        region,
        channel,
        program,
        ..Default::default()
      };
      let doc = records.add_customer(customer).await?;
      println!("{}\t{}", doc.id, doc.data.code);
    }
    CustomerCommand::BulkUpdate {
      ids,
      region,
      follow_up_sss,
      program,
      signal,
    } => {
      let patch = CustomerPatch {
        region,
        follow_up_sss,
        program,
        signal,
      };
      if patch.is_empty() {
        bail!("nothing to update; pass at least one field");
      }
      let updated = records.bulk_update_customers(&ids, &patch).await?;
      eprintln!("Updated {} of {} customer(s)", updated.len(), ids.len());
    }
  }
  Ok(())
}

async fn iccid(command: IccidCommand, records: &Records) -> Result<()> {
  match command {
    IccidCommand::Add { iccid, fields } => {
      let mut card = Iccid {
        iccid,
        iccid_type: "A2P".to_string(),
        ..Default::default()
      };
      fields.apply(&mut card);
      let doc = records.add_iccid(&card).await?;
      println!("{}", doc.id);
    }
    IccidCommand::List => {
      for doc in records.iccids().await? {
        println!(
          "{}\t{}\t{}\t{}",
          doc.id,
          doc.data.iccid,
          doc.data.iccid_type,
          doc.data.customer_name.as_deref().unwrap_or("-")
        );
      }
    }
    IccidCommand::Update { id, fields } => {
      let doc = records.iccid(&id).await?;
      let mut card = doc.data;
      fields.apply(&mut card);
      let saved = records.update_iccid(&id, &card, doc.revision).await?;
      eprintln!("Updated ICCID {} (revision {})", id, saved.revision);
    }
    IccidCommand::Delete { id } => {
      records.delete_iccid(&id).await?;
      eprintln!("Deleted ICCID: {}", id);
    }
  }
  Ok(())
}

async fn export(target: ExportTarget, output: Option<PathBuf>, records: &Records) -> Result<()> {
  let writer: Box<dyn Write> = match &output {
    Some(path) => Box::new(
      File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
    ),
    None => Box::new(io::stdout()),
  };

  let rows = match target {
    ExportTarget::Customers { fields } => records.export_customers(writer, &fields).await?,
    ExportTarget::Billing { from, to } => {
      records
        .export_billing(writer, DateRange::new(from, to))
        .await?
    }
    ExportTarget::Iccids => records.export_iccids(writer).await?,
  };

  eprintln!("Exported {} row(s)", rows);
  Ok(())
}
