//! Fuzz the claim helpers, the groups link rewrite and the role planner.
//!
//! Arbitrary JSON is fed to the claims deserializer, arbitrary links to the
//! legacy link rewrite, and arbitrary group names to the role planner.

#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeSet;

use graph::user::rewrite_groups_link;
use rolesync_common::claims::{ClaimKey, Claims};
use rolesync_common::constants::{BASELINE_ROLE, PROTECTED_ROLE};
use rolesync_common::gate::pre_authenticate;
use rolesync_common::reconcile::plan_role_changes;

#[derive(Debug, Arbitrary)]
struct FInput {
    claims_json: String,
    link: String,
    graph_url: String,
    domain: String,
    current: Vec<String>,
    desired: Option<Vec<String>>,
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let fi = match FInput::arbitrary(&mut u) {
        Ok(x) => x,
        Err(_) => return,
    };

    if let Ok(claims) = serde_json::from_str::<Claims>(&fi.claims_json) {
        for key in [ClaimKey::GroupsLink, ClaimKey::Groups, ClaimKey::Name] {
            let _ = claims.values(key);
            let _ = claims.first(key);
        }
        let _ = pre_authenticate(&claims, &fi.domain);
        if let Some(link) = claims.first(ClaimKey::GroupsLink) {
            let _ = rewrite_groups_link(link, &fi.graph_url);
        }
    }

    let _ = rewrite_groups_link(&fi.link, &fi.graph_url);

    let current: BTreeSet<String> = fi.current.into_iter().collect();
    let plan = plan_role_changes(&current, fi.desired.as_deref());
    if plan.remove.contains(PROTECTED_ROLE) {
        panic!("protected role scheduled for removal");
    }
    if !current.contains(BASELINE_ROLE) && !plan.add.contains(BASELINE_ROLE) {
        panic!("baseline role missing from plan");
    }
});
