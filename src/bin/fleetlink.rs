// Copyright 2025 The NativeLink Authors. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args as ClapArgs, Parser, Subcommand};
use fleetlink_config::FleetConfig;
use fleetlink_config::services::{JenkinsSpec, ZabbixSpec};
use fleetlink_error::{Error, ResultExt, make_input_err};
use fleetlink_lifecycle::cleanup::cleanup_agent;
use fleetlink_lifecycle::connect::{connect_autoscaling, connect_jenkins, connect_zabbix};
use fleetlink_lifecycle::events::{ScaleDownEvent, instance_id_from, parse_event};
use fleetlink_lifecycle::monitoring_disabler::disable_monitoring_host;
use fleetlink_lifecycle::registrar::{
    deregister_agent, discover_identity, register_agent, status_marker_path,
};
use fleetlink_lifecycle::termination_guard::{TerminationDecision, guard_termination};
use fleetlink_util::http_client::HyperTransport;
use fleetlink_util::init_tracing;
use fleetlink_util::net::{local_host_name, strip_domain_labels};
use fleetlink_util::status_marker::FileStatusMarker;
use tokio::io::AsyncReadExt;
use tracing::{Level, event};

/// Keeps Jenkins build agents in step with an EC2 Auto Scaling fleet.
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Args {
    /// Optional JSON5 config file. Flags and environment override it.
    #[clap(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Registers this machine as a Jenkins agent, or removes it.
    RegisterAgent(RegisterAgentArgs),
    /// Handles a scale-down lifecycle event: takes the node offline and lets
    /// the termination proceed once it is idle.
    GuardTermination {
        #[clap(flatten)]
        jenkins: JenkinsArgs,
        #[clap(flatten)]
        event: EventArgs,
    },
    /// Handles a terminated-instance event by deleting its node.
    CleanupAgent {
        #[clap(flatten)]
        jenkins: JenkinsArgs,
        #[clap(flatten)]
        event: EventArgs,
    },
    /// Handles a terminated-instance event by unmonitoring its Zabbix host.
    DisableMonitoringHost {
        #[clap(flatten)]
        zabbix: ZabbixArgs,
        #[clap(flatten)]
        event: EventArgs,
    },
}

#[derive(ClapArgs, Debug)]
struct RegisterAgentArgs {
    /// Jenkins server name.
    #[clap(short = 'n', long)]
    jenkins_name: Option<String>,

    /// Number of executors of the new node.
    #[clap(short = 'e', long)]
    executors: Option<u32>,

    /// Jenkins API user.
    #[clap(short = 'u', long)]
    jenkins_api_user: Option<String>,

    /// Jenkins API token.
    #[clap(short = 'p', long)]
    jenkins_api_pass: Option<String>,

    /// Delete the node instead of creating it.
    #[clap(short = 'd', long)]
    delete_slave: bool,
}

#[derive(ClapArgs, Debug)]
struct JenkinsArgs {
    #[clap(long, env = "jenkins_name")]
    jenkins_name: Option<String>,

    #[clap(long, env = "jenkins_api_user")]
    jenkins_api_user: Option<String>,

    #[clap(long, env = "jenkins_api_pass", hide_env_values = true)]
    jenkins_api_pass: Option<String>,
}

#[derive(ClapArgs, Debug)]
struct ZabbixArgs {
    #[clap(long, env = "zbx_server_fqdn")]
    zbx_server_fqdn: Option<String>,

    #[clap(long, env = "zbx_api_user")]
    zbx_api_user: Option<String>,

    #[clap(long, env = "zbx_api_pass", hide_env_values = true)]
    zbx_api_pass: Option<String>,
}

#[derive(ClapArgs, Debug)]
struct EventArgs {
    /// File holding the event payload, `-` reads stdin.
    #[clap(long, value_name = "FILE", default_value = "-")]
    event: String,
}

fn override_with(target: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn apply_jenkins_overrides(
    spec: &mut JenkinsSpec,
    server: Option<String>,
    user: Option<String>,
    api_token: Option<String>,
) {
    override_with(&mut spec.server, server);
    override_with(&mut spec.user, user);
    override_with(&mut spec.api_token, api_token);
}

fn apply_zabbix_overrides(spec: &mut ZabbixSpec, args: ZabbixArgs) {
    override_with(&mut spec.server, args.zbx_server_fqdn);
    override_with(&mut spec.user, args.zbx_api_user);
    override_with(&mut spec.password, args.zbx_api_pass);
}

async fn get_config(path: Option<&Path>) -> Result<FleetConfig, Error> {
    let Some(path) = path else {
        return Ok(FleetConfig::default());
    };
    let json_contents = tokio::fs::read_to_string(path)
        .await
        .err_tip(|| format!("Could not open config file {}", path.display()))?;
    serde_json5::from_str(&json_contents).map_err(|e| {
        make_input_err!("Could not parse config file {}: {e}", path.display())
    })
}

async fn read_event(source: &str) -> Result<String, Error> {
    if source == "-" {
        let mut raw = String::new();
        tokio::io::stdin()
            .read_to_string(&mut raw)
            .await
            .err_tip(|| "Could not read event payload from stdin")?;
        return Ok(raw);
    }
    tokio::fs::read_to_string(source)
        .await
        .err_tip(|| format!("Could not read event payload from {source}"))
}

async fn run_register_agent(mut config: FleetConfig, args: RegisterAgentArgs) -> Result<(), Error> {
    apply_jenkins_overrides(
        &mut config.jenkins,
        args.jenkins_name,
        args.jenkins_api_user,
        args.jenkins_api_pass,
    );
    let connection = connect_jenkins(&config.jenkins).await?;

    if args.delete_slave {
        let node_name = strip_domain_labels(&local_host_name()?, config.agent.strip_domain_labels)?;
        let outcome = deregister_agent(&connection.client, &node_name).await?;
        event!(Level::INFO, %node_name, ?outcome, "Deregistration finished");
        return Ok(());
    }

    let transport = HyperTransport::new()?;
    let identity = discover_identity(
        &transport,
        &config.instance_metadata,
        &config.agent,
        connection.address,
    )
    .await?;
    let marker = FileStatusMarker::new(status_marker_path(&config.agent));
    let num_executors = args.executors.unwrap_or(config.agent.num_executors);
    let outcome = register_agent(
        &connection.client,
        &marker,
        &identity,
        &config.agent,
        num_executors,
    )
    .await?;
    event!(
        Level::INFO,
        node_name = %identity.node_name,
        ?outcome,
        "Registration finished"
    );
    Ok(())
}

async fn run_guard_termination(
    mut config: FleetConfig,
    jenkins: JenkinsArgs,
    event: EventArgs,
) -> Result<(), Error> {
    let payload = parse_event(&read_event(&event.event).await?)?;
    let scale_down = ScaleDownEvent::from_payload(&payload)?;
    apply_jenkins_overrides(
        &mut config.jenkins,
        jenkins.jenkins_name,
        jenkins.jenkins_api_user,
        jenkins.jenkins_api_pass,
    );
    let connection = connect_jenkins(&config.jenkins).await?;
    let autoscaling = connect_autoscaling(&config.autoscaling).await;

    match guard_termination(
        &connection.client,
        &autoscaling,
        &scale_down,
        &config.jenkins.master_node_name,
    )
    .await?
    {
        TerminationDecision::Released { node_name } => {
            event!(
                Level::INFO,
                %node_name,
                instance_id = %scale_down.instance_id,
                "Node is idle, termination may proceed"
            );
        }
        TerminationDecision::Deferred {
            node_name,
            running_builds,
        } => {
            event!(
                Level::INFO,
                %node_name,
                instance_id = %scale_down.instance_id,
                running_builds = running_builds.len(),
                "Node is busy, termination deferred"
            );
        }
    }
    Ok(())
}

async fn run_cleanup_agent(
    mut config: FleetConfig,
    jenkins: JenkinsArgs,
    event: EventArgs,
) -> Result<(), Error> {
    let payload = parse_event(&read_event(&event.event).await?)?;
    let instance_id = instance_id_from(&payload)?;
    apply_jenkins_overrides(
        &mut config.jenkins,
        jenkins.jenkins_name,
        jenkins.jenkins_api_user,
        jenkins.jenkins_api_pass,
    );
    let connection = connect_jenkins(&config.jenkins).await?;
    let node_name = cleanup_agent(
        &connection.client,
        &instance_id,
        &config.jenkins.master_node_name,
    )
    .await?;
    event!(Level::INFO, %node_name, %instance_id, "Cleanup finished");
    Ok(())
}

async fn run_disable_monitoring_host(
    mut config: FleetConfig,
    zabbix: ZabbixArgs,
    event: EventArgs,
) -> Result<(), Error> {
    let payload = parse_event(&read_event(&event.event).await?)?;
    let instance_id = instance_id_from(&payload)?;
    apply_zabbix_overrides(&mut config.zabbix, zabbix);
    let client = connect_zabbix(&config.zabbix).await?;
    let outcome = disable_monitoring_host(&client, &instance_id).await?;
    event!(Level::INFO, %instance_id, ?outcome, "Monitoring update finished");
    Ok(())
}

async fn inner_main(args: Args) -> Result<(), Error> {
    let config = get_config(args.config.as_deref()).await?;
    match args.command {
        Command::RegisterAgent(register) => run_register_agent(config, register).await,
        Command::GuardTermination { jenkins, event } => {
            run_guard_termination(config, jenkins, event).await
        }
        Command::CleanupAgent { jenkins, event } => {
            run_cleanup_agent(config, jenkins, event).await
        }
        Command::DisableMonitoringHost { zabbix, event } => {
            run_disable_monitoring_host(config, zabbix, event).await
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(err) = init_tracing() {
        eprintln!("{err:?}");
        return ExitCode::FAILURE;
    }

    #[allow(clippy::disallowed_methods)]
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            event!(Level::ERROR, ?err, "Could not start the tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime
        .block_on(inner_main(args))
        .err_tip(|| "main() function failed")
    {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            event!(Level::ERROR, ?err, "fleetlink failed");
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
