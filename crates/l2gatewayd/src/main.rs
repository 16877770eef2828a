//! l2gatewayd entry point.
//!
//! Runs one operation per invocation against the JSON state file, or serves
//! JSON-lines requests on stdin with `serve`.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use l2gatewayd::audit::{init_logging, AuditCategory, AuditOutcome, AuditRecord};
use l2gatewayd::config::DEFAULT_CONFIG_PATH;
use l2gatewayd::{audit_log, dispatch, L2GatewayPlugin, Request, Response, ServiceConfig};
use l2gw_db::{
    DeviceSpec, GatewayConnectionSpec, GatewaySpec, InterfaceSpec, L2gwStore, MemoryStore, Network,
    RemoteGatewayConnectionSpec, RemoteGatewaySpec, RemoteGatewayUpdate, RemoteMacSpec,
};
use l2gw_driver::DriverFactory;
use l2gw_types::{
    GatewayConnectionId, GatewayId, MacAddress, RemoteGatewayConnectionId, RemoteGatewayId,
    RemoteMacId, RequestContext, SegmentationId,
};
use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

/// L2 gateway orchestration service
#[derive(Parser, Debug)]
#[command(name = "l2gatewayd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// State file, overrides `service.state_file`
    #[arg(short = 's', long)]
    state: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error), overrides `logging.level`
    #[arg(short = 'l', long)]
    log_level: Option<String>,

    /// Tenant the request runs as
    #[arg(short = 't', long, default_value = "admin")]
    tenant: String,

    /// Run with the admin role
    #[arg(long)]
    admin: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a network known to the core networking service
    NetworkRegister {
        id: String,
        #[arg(long)]
        name: Option<String>,
    },

    /// Create a gateway
    GatewayCreate {
        name: String,
        /// Device and its interfaces as `device:iface[,iface...]`; repeatable
        #[arg(short = 'd', long = "device", required = true, value_parser = parse_device)]
        devices: Vec<DeviceSpec>,
    },
    GatewayList,
    GatewayShow { id: GatewayId },
    GatewayDelete { id: GatewayId },

    /// Connect a gateway to a network
    ConnectionCreate {
        gateway: GatewayId,
        network: String,
        #[arg(long)]
        segmentation_id: Option<SegmentationId>,
    },
    ConnectionList,
    ConnectionShow { id: GatewayConnectionId },
    ConnectionDelete { id: GatewayConnectionId },

    RemoteGatewayCreate { name: String, ipaddr: IpAddr },
    RemoteGatewayList,
    RemoteGatewayShow { id: RemoteGatewayId },
    RemoteGatewayUpdate {
        id: RemoteGatewayId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        ipaddr: Option<IpAddr>,
    },
    RemoteGatewayDelete { id: RemoteGatewayId },

    /// Bind a local gateway and network to a remote gateway
    RemoteGatewayConnectionCreate(RemoteConnectionArgs),
    RemoteGatewayConnectionList,
    RemoteGatewayConnectionShow { id: RemoteGatewayConnectionId },
    RemoteGatewayConnectionDelete {
        id: RemoteGatewayConnectionId,
        /// Remove the row without notifying the driver
        #[arg(long)]
        no_driver: bool,
    },

    /// Add a remote MAC (admin only)
    RemoteMacCreate {
        mac: MacAddress,
        rgw_connection: RemoteGatewayConnectionId,
        #[arg(long)]
        ipaddr: Option<IpAddr>,
    },
    RemoteMacList,
    RemoteMacShow { id: RemoteMacId },
    RemoteMacDelete { id: RemoteMacId },

    /// Replace the gateways on switches managed by a failed OVSDB server
    Failover { ovsdb_identifier: String },

    Stats,

    /// Answer JSON-lines requests on stdin until EOF or Ctrl-C
    Serve,
}

#[derive(Args, Debug)]
struct RemoteConnectionArgs {
    gateway: GatewayId,
    network: String,
    remote_gateway: RemoteGatewayId,
    #[arg(long)]
    seg_id: String,
    /// Set up unknown-destination flooding (true/false); omitted means none
    #[arg(long)]
    flood: Option<bool>,
}

fn parse_device(s: &str) -> Result<DeviceSpec, String> {
    let (name, interfaces) = s
        .split_once(':')
        .ok_or_else(|| format!("expected device:iface[,iface...], got '{s}'"))?;
    let interfaces = interfaces
        .split(',')
        .map(str::trim)
        .filter(|i| !i.is_empty())
        .map(InterfaceSpec::new)
        .collect();
    Ok(DeviceSpec::new(name.trim(), interfaces))
}

impl Command {
    /// Maps a one-shot subcommand onto the request it issues.
    fn into_request(self) -> Option<Request> {
        let request = match self {
            Command::NetworkRegister { .. } | Command::Serve => return None,

            Command::GatewayCreate { name, devices } => Request::CreateGateway {
                gateway: GatewaySpec {
                    name,
                    tenant_id: None,
                    devices,
                },
            },
            Command::GatewayList => Request::ListGateways,
            Command::GatewayShow { id } => Request::GetGateway { id },
            Command::GatewayDelete { id } => Request::DeleteGateway { id },

            Command::ConnectionCreate {
                gateway,
                network,
                segmentation_id,
            } => Request::CreateGatewayConnection {
                connection: GatewayConnectionSpec {
                    gateway_id: gateway,
                    network_id: network,
                    segmentation_id,
                    tenant_id: None,
                },
            },
            Command::ConnectionList => Request::ListGatewayConnections,
            Command::ConnectionShow { id } => Request::GetGatewayConnection { id },
            Command::ConnectionDelete { id } => Request::DeleteGatewayConnection { id },

            Command::RemoteGatewayCreate { name, ipaddr } => Request::CreateRemoteGateway {
                remote_gateway: RemoteGatewaySpec {
                    name,
                    ipaddr,
                    tenant_id: None,
                },
            },
            Command::RemoteGatewayList => Request::ListRemoteGateways,
            Command::RemoteGatewayShow { id } => Request::GetRemoteGateway { id },
            Command::RemoteGatewayUpdate { id, name, ipaddr } => Request::UpdateRemoteGateway {
                id,
                update: RemoteGatewayUpdate { name, ipaddr },
            },
            Command::RemoteGatewayDelete { id } => Request::DeleteRemoteGateway { id },

            Command::RemoteGatewayConnectionCreate(args) => Request::CreateRemoteGatewayConnection {
                connection: RemoteGatewayConnectionSpec {
                    gateway: args.gateway,
                    network: args.network,
                    remote_gateway: args.remote_gateway,
                    seg_id: args.seg_id,
                    flood: args.flood,
                    tenant_id: None,
                },
            },
            Command::RemoteGatewayConnectionList => Request::ListRemoteGatewayConnections,
            Command::RemoteGatewayConnectionShow { id } => Request::GetRemoteGatewayConnection { id },
            Command::RemoteGatewayConnectionDelete { id, no_driver } => {
                Request::DeleteRemoteGatewayConnection {
                    id,
                    send_to_driver: !no_driver,
                }
            }

            Command::RemoteMacCreate {
                mac,
                rgw_connection,
                ipaddr,
            } => Request::CreateRemoteMac {
                remote_mac: RemoteMacSpec {
                    mac,
                    ipaddr,
                    rgw_connection,
                    tenant_id: None,
                },
            },
            Command::RemoteMacList => Request::ListRemoteMacs,
            Command::RemoteMacShow { id } => Request::GetRemoteMac { id },
            Command::RemoteMacDelete { id } => Request::DeleteRemoteMac { id },

            Command::Failover { ovsdb_identifier } => Request::Failover { ovsdb_identifier },
            Command::Stats => Request::Stats,
        };
        Some(request)
    }
}

struct Service {
    plugin: L2GatewayPlugin,
    store: Arc<MemoryStore>,
    state_file: PathBuf,
}

impl Service {
    fn open(config: &ServiceConfig, state_file: PathBuf) -> anyhow::Result<Self> {
        let store = Arc::new(
            MemoryStore::load(&state_file)
                .with_context(|| format!("failed to load state from {}", state_file.display()))?,
        );
        let plugin = L2GatewayPlugin::from_config(
            config,
            store.clone() as Arc<dyn L2gwStore>,
            &DriverFactory::builtin(),
        )?;
        Ok(Self {
            plugin,
            store,
            state_file,
        })
    }

    fn save(&self) -> anyhow::Result<()> {
        self.store
            .save(&self.state_file)
            .with_context(|| format!("failed to save state to {}", self.state_file.display()))
    }

    fn handle(&self, ctx: &RequestContext, request: Request) -> anyhow::Result<Response> {
        let mutating = request.is_mutating();
        let response = dispatch(&self.plugin, ctx, request);
        if mutating {
            self.save()?;
        }
        Ok(response)
    }
}

fn print_response(response: &Response) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}

async fn serve(service: &Service, cli: &Cli) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    info!(state = %service.state_file.display(), "Serving requests on stdin");
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                warn!("Received SIGINT, shutting down");
                break;
            }
        };
        let Some(line) = line else {
            debug!("End of input");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                let ctx = RequestContext::new(cli.tenant.clone(), cli.tenant.clone(), cli.admin);
                service.handle(&ctx, request)?
            }
            Err(e) => Response::bad_request(format!("invalid request: {e}")),
        };
        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
    }
    Ok(())
}

fn register_network(service: &Service, id: String, name: Option<String>, tenant: &str) -> anyhow::Result<()> {
    let network = Network {
        name: name.unwrap_or_else(|| id.clone()),
        id,
        tenant_id: tenant.to_string(),
    };
    info!(network = %network.id, "Registering network");
    service.store.register_network(network)?;
    service.save()
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = ServiceConfig::load_or_default(&cli.config)?;
    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    init_logging(level, config.logging.json)?;

    let state_file = cli
        .state
        .clone()
        .unwrap_or_else(|| config.service.state_file.clone());
    let service = Service::open(&config, state_file)?;
    audit_log!(AuditRecord::new(AuditCategory::SystemLifecycle, "l2gatewayd", "start")
        .with_outcome(AuditOutcome::Success)
        .with_details(serde_json::json!({
            "config": cli.config.display().to_string(),
            "providers": service.plugin.drivers().provider_names(),
        })));

    match cli.command {
        Command::Serve => {
            serve(&service, &cli).await?;
            Ok(true)
        }
        Command::NetworkRegister { ref id, ref name } => {
            register_network(&service, id.clone(), name.clone(), &cli.tenant)?;
            Ok(true)
        }
        _ => {
            let ctx = RequestContext::new(cli.tenant.clone(), cli.tenant.clone(), cli.admin);
            let Some(request) = cli.command.into_request() else {
                return Ok(false);
            };
            let response = service.handle(&ctx, request)?;
            print_response(&response)?;
            Ok(response.ok)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("l2gatewayd: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
