//! Fuzz the rolesync config reader.
//!
//! This harness:
//!  - Generates randomized rolesync.conf content, both raw and structured.
//!  - Exercises every option exposed via getters in `config.rs`.
//!  - Builds the hook table from the result.
//!  - Ensures no panics on arbitrary input.

#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

use rolesync_common::config::{ProfileAttr, RoleSyncConfig};
use rolesync_common::hooks::HookTable;

#[derive(Debug, Arbitrary)]
struct FInput {
    // Raw config body (may contain invalid UTF-8; written lossily)
    raw_cfg: Vec<u8>,
    use_structured: bool,

    // [graph]
    tenant_id: Option<Stringish>,
    client_id: Option<Stringish>,
    client_secret: Option<Stringish>,
    base_domain: Option<Stringish>,
    authority_host: Option<Stringish>,
    graph_url: Option<Stringish>,

    // [global]
    connection_timeout: Stringish,
    group_cache_timeout: Stringish,
    debug: Stringish,

    // [integrations]
    hook_login: Option<Stringish>,
    hook_login_new: Option<Stringish>,
    hook_pre_authentication: Option<Stringish>,

    // [attributes]
    display_name: Option<Stringish>,
    first_name: Option<Stringish>,
    last_name: Option<Stringish>,

    hook_name: Stringish,
}

#[derive(Debug, Arbitrary, Clone)]
struct Stringish(Vec<u8>);

impl fmt::Display for Stringish {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = String::from_utf8_lossy(&self.0);
        write!(f, "{}", s)
    }
}

fn write_opt(f: &mut File, key: &str, val: &Option<Stringish>) -> std::io::Result<()> {
    if let Some(val) = val {
        writeln!(f, "{} = {}", key, val)?;
    }
    Ok(())
}

fn write_structured_ini(path: &Path, fi: &FInput) -> std::io::Result<()> {
    let mut f = File::create(path)?;

    writeln!(f, "[graph]")?;
    write_opt(&mut f, "tenant_id", &fi.tenant_id)?;
    write_opt(&mut f, "client_id", &fi.client_id)?;
    write_opt(&mut f, "client_secret", &fi.client_secret)?;
    write_opt(&mut f, "base_domain", &fi.base_domain)?;
    write_opt(&mut f, "authority_host", &fi.authority_host)?;
    write_opt(&mut f, "graph_url", &fi.graph_url)?;

    writeln!(f, "[global]")?;
    writeln!(f, "connection_timeout = {}", fi.connection_timeout)?;
    writeln!(f, "group_cache_timeout = {}", fi.group_cache_timeout)?;
    writeln!(f, "debug = {}", fi.debug)?;

    writeln!(f, "[integrations]")?;
    write_opt(&mut f, "hook_login", &fi.hook_login)?;
    write_opt(&mut f, "hook_login_new", &fi.hook_login_new)?;
    write_opt(&mut f, "hook_pre_authentication", &fi.hook_pre_authentication)?;

    writeln!(f, "[attributes]")?;
    write_opt(&mut f, "display_name", &fi.display_name)?;
    write_opt(&mut f, "first_name", &fi.first_name)?;
    write_opt(&mut f, "last_name", &fi.last_name)?;
    Ok(())
}

fn exercise_config(cfg: &RoleSyncConfig, hook_name: &str) {
    let _ = cfg.get_tenant_id();
    let _ = cfg.get_client_id();
    let _ = cfg.get_client_secret();
    let _ = cfg.get_base_domain();
    let _ = cfg.get_authority_host();
    let _ = cfg.get_graph_url();

    let _ = cfg.get_connection_timeout();
    let _ = cfg.get_group_cache_timeout();
    let _ = cfg.get_debug();

    for attr in ProfileAttr::ALL {
        let _ = cfg.get_attribute_claim(attr);
    }

    let hooks = HookTable::from_config(cfg);
    let _ = hooks.event_for(hook_name);
    let _ = hooks.event_for(hooks.login_hook());
    let _ = format!("{:?}", cfg);
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let fi = match FInput::arbitrary(&mut u) {
        Ok(x) => x,
        Err(_) => return,
    };

    let tmp = match TempDir::new() {
        Ok(t) => t,
        Err(_) => return,
    };
    let cfg_path = tmp.path().join("rolesync.conf");
    let hook_name = fi.hook_name.to_string();

    if !fi.raw_cfg.is_empty() {
        let _ = fs::write(&cfg_path, String::from_utf8_lossy(&fi.raw_cfg).as_bytes());
        if let Ok(cfg) = RoleSyncConfig::new(Some(cfg_path.to_string_lossy().as_ref())) {
            exercise_config(&cfg, &hook_name);
        }
    }

    if fi.use_structured {
        let _ = write_structured_ini(&cfg_path, &fi);
        if let Ok(cfg) = RoleSyncConfig::new(Some(cfg_path.to_string_lossy().as_ref())) {
            exercise_config(&cfg, &hook_name);
        }
    }
});
