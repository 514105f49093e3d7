use anyhow::{anyhow, Error, Result};
use clap::{Parser, Subcommand};
use log::info;
use solid_client::access::{AccessModes, AccessModesPatch};
use solid_client::config::ClientConfig;
use solid_client::dataset::{get_content_type, is_container, is_raw_data};
use solid_client::fetch::{Fetcher, ReqwestFetcher};
use solid_client::file::get_file;
use solid_client::io::{quads_to_jsonld, quads_to_turtle};
use solid_client::markdown::solid_dataset_as_markdown;
use solid_client::options::ChainDetection;
use solid_client::resource::{
    create_container_at, delete_container, delete_solid_dataset, get_contained_resource_url_all, get_pod_owner,
    get_resource_info, get_solid_dataset_with,
};
use solid_client::universal::{self, AccessControlProtocol};
use solid_client::util::is_container_url;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "solid")]
#[command(about = "Read Solid resources and inspect or change who can access them")]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Verbose mode - sets the RUST_LOG level to info, defaults to warning level
    #[clap(long, short, action, default_value = "false", global = true)]
    verbose: bool,
    /// Debug mode - sets the RUST_LOG level to debug, defaults to warning level
    #[clap(long, action, default_value = "false", global = true)]
    debug: bool,
    /// Offline mode - every request fails instead of reaching the network
    #[clap(long, short, action, default_value = "false", global = true)]
    offline: bool,
    /// Timeout for each HTTP request, in seconds
    #[clap(long, global = true)]
    timeout: Option<u64>,
    /// Access token sent as `Authorization: Bearer <token>`
    #[clap(long, global = true)]
    token: Option<String>,
    /// Read the client configuration from a JSON file; flags override its values
    #[clap(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Prints the version of the solid binary
    Version,
    /// Fetch a Resource and print it
    Get {
        url: String,
        /// Print a readable Markdown summary instead of RDF
        #[clap(long, action, default_value = "false")]
        markdown: bool,
        /// Serialization format: one of [turtle, jsonld] (default: turtle)
        #[clap(long, short = 'f')]
        format: Option<String>,
        /// Do not nest Blank Nodes that are only referenced once
        #[clap(long, action)]
        no_chains: bool,
    },
    /// Print the metadata the server reports for a Resource
    Info {
        url: String,
        /// Output JSON instead of text
        #[clap(long, action, default_value = "false")]
        json: bool,
    },
    /// List the Resources in a Container
    Ls { url: String },
    /// Write the bytes of a Resource to STDOUT or a file
    Cat {
        url: String,
        /// Output file path; if omitted, writes to STDOUT
        #[clap(long)]
        output: Option<PathBuf>,
    },
    /// Create an empty Container
    Mkdir { url: String },
    /// Delete a Resource or an empty Container
    Rm { url: String },
    /// Show who can access a Resource, whether it uses WAC or ACP
    Access {
        url: String,
        /// Show the access of this agent (WebID)
        #[clap(long, conflicts_with_all = ["public", "all"])]
        agent: Option<String>,
        /// Show what everyone may do
        #[clap(long, action, conflicts_with = "all")]
        public: bool,
        /// Show the access of every agent listed in the access-control document
        #[clap(long, action)]
        all: bool,
        /// Output JSON instead of text
        #[clap(long, action, default_value = "false")]
        json: bool,
    },
    /// Change what an agent, or everyone, may do with a Resource
    SetAccess {
        url: String,
        /// The agent (WebID) whose access changes
        #[clap(long, required_unless_present = "public", conflicts_with = "public")]
        agent: Option<String>,
        /// Change what everyone may do
        #[clap(long, action)]
        public: bool,
        #[clap(long)]
        read: Option<bool>,
        #[clap(long)]
        append: Option<bool>,
        #[clap(long)]
        write: Option<bool>,
        #[clap(long)]
        control_read: Option<bool>,
        #[clap(long)]
        control_write: Option<bool>,
    },
}

pub fn run() -> Result<()> {
    solid_client::init_logging();
    let cmd = Cli::parse();
    let config = client_config(&cmd)?;
    let fetcher = ReqwestFetcher::new(&config)?;
    execute(cmd, &config, &fetcher, &mut std::io::stdout())
}

pub fn run_from_args<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    solid_client::init_logging();
    let cmd = Cli::try_parse_from(args).map_err(Error::from)?;
    let config = client_config(&cmd)?;
    let fetcher = ReqwestFetcher::new(&config)?;
    execute(cmd, &config, &fetcher, &mut std::io::stdout())
}

/// Runs a command line against `fetcher`, writing what would be printed to `out`.
pub fn run_with_fetcher<I, T>(args: I, fetcher: &dyn Fetcher, out: &mut dyn Write) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cmd = Cli::try_parse_from(args).map_err(Error::from)?;
    let config = client_config(&cmd)?;
    execute(cmd, &config, fetcher, out)
}

fn client_config(cmd: &Cli) -> Result<ClientConfig> {
    let mut config = match &cmd.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };
    if cmd.offline {
        config.offline = true;
    }
    if let Some(timeout) = cmd.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(token) = &cmd.token {
        config.bearer_token = Some(token.clone());
    }
    if cmd.verbose || cmd.debug {
        config.print();
    }
    Ok(config)
}

fn execute(cmd: Cli, config: &ClientConfig, fetcher: &dyn Fetcher, out: &mut dyn Write) -> Result<()> {
    // CLI flags for verbosity take precedence over SOLID_CLIENT_LOG / RUST_LOG.
    if cmd.debug {
        std::env::set_var("RUST_LOG", "debug");
    } else if cmd.verbose {
        std::env::set_var("RUST_LOG", "info");
    } else if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "warn");
    }
    let _ = env_logger::try_init();

    match cmd.command {
        Commands::Version => {
            writeln!(out, "solid {}", env!("CARGO_PKG_VERSION"))?;
        }
        Commands::Get {
            url,
            markdown,
            format,
            no_chains,
        } => {
            let detection = if no_chains {
                ChainDetection::Disabled
            } else {
                config.chain_detection()
            };
            let dataset = get_solid_dataset_with(&url, fetcher, detection)?;
            if markdown {
                write!(out, "{}", solid_dataset_as_markdown(&dataset))?;
            } else {
                let quads = dataset.to_quads();
                let body = match format.as_deref().unwrap_or("turtle") {
                    "turtle" | "ttl" => quads_to_turtle(&quads)?,
                    "jsonld" | "json-ld" => quads_to_jsonld(&quads)?,
                    other => return Err(anyhow!("Unsupported format '{other}', expected turtle or jsonld")),
                };
                write!(out, "{body}")?;
            }
        }
        Commands::Info { url, json } => {
            let resource = get_resource_info(&url, fetcher)?;
            let Some(resource_info) = resource.resource_info() else {
                return Err(anyhow!("No metadata was returned for {url}"));
            };
            let protocol = universal::get_access_protocol(&url, fetcher)?;
            if json {
                let value = serde_json::json!({
                    "url": resource_info.source_iri,
                    "contentType": get_content_type(&resource),
                    "isContainer": is_container(&resource),
                    "isRawData": is_raw_data(&resource),
                    "aclUrl": resource_info.acl_url,
                    "accessProtocol": protocol.map(protocol_name),
                    "podOwner": get_pod_owner(&resource),
                    "linkedResources": resource_info.linked_resources,
                    "permissions": resource_info.permissions,
                });
                writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
            } else {
                writeln!(out, "URL: {}", resource_info.source_iri)?;
                writeln!(out, "Content type: {}", get_content_type(&resource).unwrap_or("unknown"))?;
                writeln!(out, "Container: {}", is_container(&resource))?;
                if let Some(acl_url) = &resource_info.acl_url {
                    writeln!(out, "Access control document: {acl_url}")?;
                }
                if let Some(protocol) = protocol {
                    writeln!(out, "Access protocol: {}", protocol_name(protocol))?;
                }
                if let Some(owner) = get_pod_owner(&resource) {
                    writeln!(out, "Pod owner: {owner}")?;
                }
                if let Some(permissions) = &resource_info.permissions {
                    writeln!(out, "Your access: {}", describe(&AccessModes::from(permissions.user)))?;
                    writeln!(out, "Public access: {}", describe(&AccessModes::from(permissions.public)))?;
                }
            }
        }
        Commands::Ls { url } => {
            let container = get_solid_dataset_with(&url, fetcher, Default::default())?;
            if !is_container(&container) {
                return Err(anyhow!("{url} is not a Container"));
            }
            let mut contained = get_contained_resource_url_all(&container);
            contained.sort();
            for child in contained {
                writeln!(out, "{child}")?;
            }
        }
        Commands::Cat { url, output } => {
            let file = get_file(&url, fetcher)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &file.data)?;
                    info!("Wrote {} bytes to {}", file.data.len(), path.display());
                }
                None => out.write_all(&file.data)?,
            }
        }
        Commands::Mkdir { url } => {
            let container = create_container_at(&url, fetcher)?;
            info!("Created {}", container.source_url().unwrap_or(&url));
            writeln!(out, "{}", container.source_url().unwrap_or(&url))?;
        }
        Commands::Rm { url } => {
            if is_container_url(&url) {
                delete_container(&url, fetcher)?;
            } else {
                delete_solid_dataset(&url, fetcher)?;
            }
            writeln!(out, "Deleted {url}")?;
        }
        Commands::Access {
            url,
            agent,
            public,
            json,
            ..
        } => {
            let access: BTreeMap<String, AccessModes> = if let Some(agent) = agent {
                let modes = universal::get_agent_access(&url, &agent, fetcher)?;
                modes.map(|m| BTreeMap::from([(agent, m)])).ok_or_else(|| undetermined(&url))?
            } else if public {
                let modes = universal::get_public_access(&url, fetcher)?;
                modes
                    .map(|m| BTreeMap::from([("public".to_string(), m)]))
                    .ok_or_else(|| undetermined(&url))?
            } else {
                universal::get_agent_access_all(&url, fetcher)?.ok_or_else(|| undetermined(&url))?
            };
            print_access(out, &access, json)?;
        }
        Commands::SetAccess {
            url,
            agent,
            public,
            read,
            append,
            write,
            control_read,
            control_write,
        } => {
            let patch = AccessModesPatch {
                read,
                append,
                write,
                control_read,
                control_write,
            };
            let (who, result) = match agent {
                Some(agent) if !public => {
                    let result = universal::set_agent_access(&url, &agent, &patch, fetcher)?;
                    (agent, result)
                }
                _ => ("public".to_string(), universal::set_public_access(&url, &patch, fetcher)?),
            };
            let modes = result.ok_or_else(|| undetermined(&url))?;
            writeln!(out, "{who}: {}", describe(&modes))?;
        }
    }
    Ok(())
}

fn undetermined(url: &str) -> Error {
    anyhow!("Could not determine the access to {url}: no readable ACL or ACR is linked from it")
}

fn protocol_name(protocol: AccessControlProtocol) -> &'static str {
    match protocol {
        AccessControlProtocol::Acp => "ACP",
        AccessControlProtocol::Wac => "WAC",
    }
}

fn describe(modes: &AccessModes) -> String {
    let names: Vec<&str> = [
        (modes.read, "read"),
        (modes.append, "append"),
        (modes.write, "write"),
        (modes.control_read, "controlRead"),
        (modes.control_write, "controlWrite"),
    ]
    .into_iter()
    .filter_map(|(set, name)| set.then_some(name))
    .collect();
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

fn print_access(out: &mut dyn Write, access: &BTreeMap<String, AccessModes>, json: bool) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(access)?)?;
        return Ok(());
    }
    if access.is_empty() {
        writeln!(out, "No agent is listed.")?;
    }
    for (who, modes) in access {
        writeln!(out, "{who}: {}", describe(modes))?;
    }
    Ok(())
}
