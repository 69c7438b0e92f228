//! Property tests for the rate-limit restart and idempotence rules.

mod common;

use std::time::Duration;

use common::{FakeGateway, FakeStore, Reply, context, login, pipeline, settings, user};
use idmigrate_pipeline::{PipelineSettings, RunSummary};
use proptest::prelude::*;

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

fn run_once(store: &FakeStore, gateway: &FakeGateway) -> RunSummary {
    let dir = tempfile::tempdir().unwrap();
    let settings = PipelineSettings {
        inter_login_delay: Duration::from_millis(5),
        rate_limit_retry_delay: Duration::from_millis(50),
        ..settings()
    };

    paused_runtime().block_on(async {
        let mut ctx = context(&dir);
        pipeline(store, gateway, settings)
            .run(&mut ctx)
            .await
            .unwrap()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // A rate limit at login k re-attempts logins 1..k-1 exactly once more.
    #[test]
    fn rate_limit_at_k_reattempts_prefix(
        (n, k) in (1usize..8).prop_flat_map(|n| (Just(n), 1..=n)),
    ) {
        let logins: Vec<_> = (1..=n as i64).map(|id| login(id, 1)).collect();
        let store = FakeStore::new(vec![user(1, "Acme")], logins);
        let gateway = FakeGateway::default();
        gateway.script_identity(&format!("login{k}@example.test"), [Reply::RateLimited]);

        let summary = run_once(&store, &gateway);

        let calls = gateway.identity_calls();
        prop_assert_eq!(calls.len(), k + n);
        for id in 1..=n {
            let email = format!("login{id}@example.test");
            let expected = if id <= k { 2 } else { 1 };
            prop_assert_eq!(calls.iter().filter(|c| **c == email).count(), expected);
        }

        prop_assert_eq!(summary.counters.migrated, n as u64);
        prop_assert_eq!(summary.counters.already_exists, (k - 1) as u64);
        prop_assert_eq!(summary.counters.rate_limit_restarts, 1);
        prop_assert_eq!(gateway.organization_calls().len(), 1);
        prop_assert_eq!(gateway.membership_calls().len(), n);
    }

    // Running twice over the same data creates nothing new the second time.
    #[test]
    fn rerun_creates_nothing_new(
        logins_per_user in prop::collection::vec(0usize..4, 1..5),
        preassigned in prop::collection::vec(any::<bool>(), 5),
    ) {
        let mut users = Vec::new();
        let mut logins = Vec::new();
        let mut next_login = 100;
        for (index, count) in logins_per_user.iter().enumerate() {
            let id = index as i64 + 1;
            let mut u = user(id, &format!("Company {id}"));
            if preassigned[index] {
                u.organization_id = Some(idmigrate_gateway::OrganizationId::new(format!("org_pre_{id}")));
            }
            users.push(u);
            for _ in 0..*count {
                logins.push(login(next_login, id));
                next_login += 1;
            }
        }
        let expected_orgs = preassigned[..logins_per_user.len()].iter().filter(|p| !**p).count();

        let store = FakeStore::new(users, logins.clone());
        let gateway = FakeGateway::default();

        let first = run_once(&store, &gateway);
        prop_assert_eq!(first.counters.organizations_created, expected_orgs as u64);
        prop_assert_eq!(first.counters.migrated, logins.len() as u64);

        let second = run_once(&store, &gateway);
        prop_assert_eq!(second.counters.organizations_created, 0);
        prop_assert_eq!(second.counters.migrated, 0);
        prop_assert_eq!(second.counters.already_exists, logins.len() as u64);
        prop_assert_eq!(gateway.organization_calls().len(), expected_orgs);
        prop_assert_eq!(store.persist_calls().len(), expected_orgs);
    }
}
