/*
   Entra ID group to role synchronization
   Copyright (C) David Mulder <dmulder@samba.org> 2024

   This program is free software; you can redistribute it and/or modify
   it under the terms of the GNU General Public License as published by
   the Free Software Foundation; either version 3 of the License, or
   (at your option) any later version.

   This program is distributed in the hope that it will be useful,
   but WITHOUT ANY WARRANTY; without even the implied warranty of
   MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
   GNU General Public License for more details.

   You should have received a copy of the GNU General Public License
   along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/
#![deny(warnings)]
#![warn(unused_extern_crates)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unreachable)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::trivially_copy_pass_by_ref)]

#[macro_use]
extern crate tracing;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use clap::Parser;
use graph::ReqwestTransport;
use rolesync_common::claims::Claims;
use rolesync_common::config::RoleSyncConfig;
use rolesync_common::gate::{authorize, unconfigured};
use rolesync_common::groups::GroupSource;
use rolesync_common::memstore::MemoryRoleStore;
use rolesync_common::sync::{LoginError, RoleSync};

include!("./opt/tool.rs");

fn read_claims(path: &str) -> anyhow::Result<Claims> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let opt = RoleSyncParser::parse();

    let (debug, config_path) = match &opt.commands {
        RoleSyncOpt::Token { debug, config } => (*debug, config.clone()),
        RoleSyncOpt::Groups {
            debug,
            config,
            link: _,
            id: _,
        } => (*debug, config.clone()),
        RoleSyncOpt::Authorize {
            debug,
            config,
            username: _,
        } => (*debug, config.clone()),
        RoleSyncOpt::Sync {
            debug,
            config,
            state: _,
            user_id: _,
            claims: _,
        } => (*debug, config.clone()),
        RoleSyncOpt::Version { debug } => (*debug, None),
    };

    let cfg = match RoleSyncConfig::new(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if debug || cfg.get_debug() {
        std::env::set_var("RUST_LOG", "debug");
    }
    tracing_subscriber::fmt::init();
    debug!("Using configuration {:?}", cfg);

    macro_rules! init {
        ($cfg:expr, $store:expr) => {{
            let transport =
                match ReqwestTransport::new(Duration::from_secs($cfg.get_connection_timeout())) {
                    Ok(transport) => transport,
                    Err(e) => {
                        error!("Failed creating http client: {}", e);
                        return ExitCode::FAILURE;
                    }
                };
            match RoleSync::new(&$cfg, Arc::new(transport), $store.clone(), $store.clone()) {
                Ok(sync) => sync,
                Err(e) => {
                    error!("{}", e);
                    return ExitCode::FAILURE;
                }
            }
        }};
    }

    match opt.commands {
        RoleSyncOpt::Token { .. } => {
            let store = Arc::new(MemoryRoleStore::new());
            let sync = init!(cfg, store);
            match sync.tokens().get_token().await {
                Ok(token) => {
                    let expires: DateTime<Local> = token.expires_at().into();
                    println!("Directory token expires at {}", expires.to_rfc2822());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("{}", e);
                    ExitCode::FAILURE
                }
            }
        }
        RoleSyncOpt::Groups { link, id, .. } => {
            let store = Arc::new(MemoryRoleStore::new());
            let sync = init!(cfg, store);
            let token = match sync.tokens().get_token().await {
                Ok(token) => token,
                Err(e) => {
                    error!("{}", e);
                    return ExitCode::FAILURE;
                }
            };

            let source = match link {
                Some(link) => GroupSource::Link(link),
                None if !id.is_empty() => GroupSource::Ids(id),
                None => {
                    return match sync.resolver().snapshot(&token).await {
                        Ok(snapshot) => {
                            for group in snapshot.iter() {
                                println!(
                                    "{}\t{}\t{}",
                                    group.id, group.local_account_name, group.display_name
                                );
                            }
                            ExitCode::SUCCESS
                        }
                        Err(e) => {
                            error!("{}", e);
                            ExitCode::FAILURE
                        }
                    };
                }
            };

            match sync.resolver().resolve(&source, &token).await {
                Ok(names) => {
                    if names.is_empty() {
                        println!("No synced groups found");
                    }
                    for name in names {
                        println!("{}", name.to_lowercase());
                    }
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("{}", e);
                    ExitCode::FAILURE
                }
            }
        }
        RoleSyncOpt::Authorize { username, .. } => {
            let res = match cfg.get_base_domain() {
                Some(domain) => authorize(&username, &domain),
                None => Err(unconfigured(&username)),
            };
            match res {
                Ok(()) => {
                    println!("{} is permitted", username);
                    ExitCode::SUCCESS
                }
                Err(rejection) => {
                    println!("{}", rejection);
                    ExitCode::FAILURE
                }
            }
        }
        RoleSyncOpt::Sync {
            state,
            user_id,
            claims,
            ..
        } => {
            let state_path = Path::new(&state);
            let store = match MemoryRoleStore::load(state_path) {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    error!("{}", e);
                    return ExitCode::FAILURE;
                }
            };
            let claims = match read_claims(&claims) {
                Ok(claims) => claims,
                Err(e) => {
                    error!("Failed reading claims from {}: {}", claims, e);
                    return ExitCode::FAILURE;
                }
            };
            let mut user = match store.user(user_id).await {
                Some(user) => user,
                None => {
                    error!("User {} does not exist in {}", user_id, state);
                    return ExitCode::FAILURE;
                }
            };
            let sync = init!(cfg, store);

            let hooks = [
                sync.hooks().pre_authentication_hook().to_string(),
                sync.hooks().login_hook().to_string(),
            ];
            for hook in hooks.iter() {
                match sync.dispatch(hook, &mut user, &claims).await {
                    Ok(()) => {}
                    Err(LoginError::Rejected(rejection)) => {
                        println!("{}", rejection);
                        return ExitCode::FAILURE;
                    }
                    Err(LoginError::Sync(e)) => {
                        error!("Login of {} aborted: {}", user.login_name, e);
                        return ExitCode::FAILURE;
                    }
                }
            }

            if let Err(e) = store.save(state_path).await {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
            println!(
                "{}: {}",
                user.login_name,
                user.roles.iter().cloned().collect::<Vec<String>>().join(", ")
            );
            ExitCode::SUCCESS
        }
        RoleSyncOpt::Version { .. } => {
            println!("rolesync-tool {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
    }
}
