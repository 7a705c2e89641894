// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0
//! Keystone gatekeeper operator tool.
//!
//! Runs the gatekeeper lookups against the configured Keystone.

use axum::http::{Request, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Report, Result, WrapErr, eyre};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::io;
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{
    Layer,
    filter::{LevelFilter, Targets},
    prelude::*,
};
use url::form_urlencoded;

use keystone_gatekeeper::auth::credentials::AUTH_TOKEN_HEADER;
use keystone_gatekeeper::config::Config;
use keystone_gatekeeper::gatekeeper::Gatekeeper;
use keystone_gatekeeper::policy::TOKEN;

/// Keystone gatekeeper.
///
/// Authentication front door of a multi-tenant metrics gateway backed by
/// `OpenStack` Keystone.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the gatekeeper config file.
    #[arg(short, long, default_value = "/etc/keystone-gatekeeper/gatekeeper.conf")]
    config: PathBuf,

    /// Verbosity level. Repeat to increase level.
    #[arg(short, long, global=true, action = clap::ArgAction::Count, display_order = 920)]
    pub verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Authenticate the credentials and print the authorization context.
    Check {
        /// Keystone token.
        #[arg(long, env = "OS_TOKEN", conflicts_with = "user")]
        token: Option<String>,

        /// User in the `user[@domain][|scope]` form.
        #[arg(long, requires = "password")]
        user: Option<String>,

        /// Password of the `user`.
        #[arg(long, env = "OS_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Project scope override.
        #[arg(long, conflicts_with = "domain_id")]
        project_id: Option<String>,

        /// Domain scope override.
        #[arg(long)]
        domain_id: Option<String>,

        /// Pick a project with a monitoring role when no scope is given.
        #[arg(long)]
        guess_scope: bool,
    },

    /// Print the IDs of all projects below the project.
    Children { project_id: String },

    /// Print the projects on which the user holds a monitoring role.
    UserProjects { user_id: String },

    /// Print the gateway endpoint from the service catalog.
    ServiceUrl,
}

#[tokio::main]
async fn main() -> Result<(), Report> {
    color_eyre::install()?;
    let args = Args::parse();

    let filter = Targets::new().with_default(match args.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    });

    let log_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_filter(filter);

    // build the tracing registry
    tracing_subscriber::registry().with(log_layer).init();

    let cfg = Config::new(args.config.clone())?;
    let gatekeeper = Gatekeeper::from_config(cfg).wrap_err("Failed to set up the gatekeeper")?;
    info!("Starting the gatekeeper...");
    let sweeper = gatekeeper.start().await;

    let result = tokio::select! {
        result = run(&gatekeeper, args.command) => result,
        () = shutdown_signal() => Err(eyre!("interrupted")),
    };

    gatekeeper.terminate();
    sweeper.await.ok();
    result
}

async fn run(gatekeeper: &Gatekeeper, command: Command) -> Result<()> {
    let output = match command {
        Command::Check {
            token,
            user,
            password,
            project_id,
            domain_id,
            guess_scope,
        } => {
            let mut query = form_urlencoded::Serializer::new(String::new());
            if let Some(project_id) = &project_id {
                query.append_pair("project_id", project_id);
            }
            if let Some(domain_id) = &domain_id {
                query.append_pair("domain_id", domain_id);
            }
            let mut request = Request::builder().uri(format!("/?{}", query.finish()));
            if let Some(token) = &token {
                request = request.header(AUTH_TOKEN_HEADER, token.as_str());
            } else if let (Some(user), Some(password)) = (&user, &password) {
                let credentials = SecretString::from(format!("{user}:{password}"));
                request = request.header(
                    header::AUTHORIZATION,
                    format!("Basic {}", STANDARD.encode(credentials.expose_secret())),
                );
            }
            let (mut parts, _) = request.body(())?.into_parts();

            let auth = gatekeeper
                .authenticate_request(&mut parts, guess_scope)
                .await?;
            let mut context = auth.context.clone();
            context.auth.remove(TOKEN);
            json!({
                "context": context,
                "endpoint": auth.endpoint,
                "expires_at": auth.token.token.expires_at,
            })
        }
        Command::Children { project_id } => {
            json!(gatekeeper.child_projects(&project_id).await?)
        }
        Command::UserProjects { user_id } => {
            json!(gatekeeper.user_projects(&user_id).await?)
        }
        Command::ServiceUrl => json!(gatekeeper.service_url().await?),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Resolve on the interrupt or terminate signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .inspect_err(|e| error!("failed to install Ctrl+C handler: {e}"))
            .ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) = signal::unix::signal(signal::unix::SignalKind::terminate())
            .inspect_err(|e| error!("failed to install signal handler: {e}"))
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
