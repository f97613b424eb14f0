pub mod sample;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Arg, Command};
use tracing::info;

use pipeforge_common::error::Error;
use pipeforge_host::{PluginSpawnConfig, PluginTemplate, TemplateRegistry, apply_application_templates};
use sample::{SampleBuildTemplate, SampleDeployTemplate};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_level(true)
        .with_target(true)
        .init();

    let matches = Command::new("pipeforge")
        .about("Pipeforge Playground CLI")
        .version("0.1.0")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("serve")
                .about("Runs a sample template as a standalone plugin process")
                .arg(
                    Arg::new("template")
                        .short('t')
                        .long("template")
                        .help("Which sample template to serve (sample-build or sample-deploy)")
                        .default_value("sample-build")
                        .action(clap::ArgAction::Set),
                )
                .arg(
                    Arg::new("listen_addr")
                        .short('l')
                        .long("listen_addr")
                        .help("Address to listen on (an ephemeral loopback port when omitted)")
                        .action(clap::ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("demo")
                .about("Spawns the sample build template as a plugin and applies it")
                .arg(
                    Arg::new("project_key")
                        .short('p')
                        .long("project_key")
                        .help("Project key the application belongs to")
                        .default_value("PKEY")
                        .action(clap::ArgAction::Set),
                )
                .arg(
                    Arg::new("name")
                        .short('n')
                        .long("name")
                        .help("Application name")
                        .default_value("app1")
                        .action(clap::ArgAction::Set),
                )
                .arg(
                    Arg::new("repo")
                        .short('r')
                        .long("repo")
                        .help("Source repository of the application")
                        .default_value("git@example.com/app1")
                        .action(clap::ArgAction::Set),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("serve", sub_matches)) => {
            let listen_addr = sub_matches
                .get_one::<String>("listen_addr")
                .map(|raw| {
                    raw.parse::<SocketAddr>().map_err(|e| {
                        Error::Config(format!("failed to parse listen address '{}': {}", raw, e))
                    })
                })
                .transpose()?;

            let template: Arc<dyn pipeforge_common::template::Template> = match sub_matches
                .get_one::<String>("template")
                .map(String::as_str)
            {
                Some("sample-deploy") => Arc::new(SampleDeployTemplate),
                _ => Arc::new(SampleBuildTemplate),
            };

            pipeforge_plugin::serve(template, listen_addr).await?;
        }
        Some(("demo", sub_matches)) => {
            let project_key = sub_matches.get_one::<String>("project_key").cloned().unwrap_or_default();
            let name = sub_matches.get_one::<String>("name").cloned().unwrap_or_default();
            let repo = sub_matches.get_one::<String>("repo").cloned().unwrap_or_default();

            run_demo(&project_key, &name, &repo).await?;
        }
        _ => {
            println!("Invalid subcommand");
        }
    }

    Ok(())
}

/// Spawns this same binary in `serve` mode as an out-of-process build
/// template, registers it next to the in-process deploy template, and
/// applies both to build one application.
async fn run_demo(project_key: &str, name: &str, repo: &str) -> Result<(), Error> {
    let current_exe = std::env::current_exe()
        .map_err(|e| Error::Config(format!("failed to resolve current executable: {}", e)))?;

    let mut spawn_config = PluginSpawnConfig::new(current_exe);
    spawn_config.args = vec![
        "serve".to_string(),
        "--template".to_string(),
        "sample-build".to_string(),
    ];

    let registry = TemplateRegistry::new();
    registry
        .register(Arc::new(PluginTemplate::start(spawn_config).await?))
        .await?;
    registry.register(Arc::new(SampleDeployTemplate)).await?;

    let build = registry.get_build_template("sample-build").await?;
    let deploy = registry.get_deployment_template("sample-deploy").await?;

    let application = apply_application_templates(
        project_key,
        name,
        repo,
        &HashMap::new(),
        build,
        deploy,
    )
    .await?;

    println!("{}", serde_json::to_string_pretty(&application)?);
    info!(
        application = %application.name,
        pipelines = application.pipelines.len(),
        "demo apply complete"
    );

    registry.shutdown().await;
    Ok(())
}
