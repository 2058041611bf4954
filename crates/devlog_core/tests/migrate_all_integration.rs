//! Whole-schema migration against two live PostgreSQL databases.
//!
//! Kept in its own test binary: migrate-all rewrites every online table that
//! also exists offline, which would race the per-table tests.
//! Requires `DEVLOG_TEST_OFFLINE_URL` and `DEVLOG_TEST_ONLINE_URL`.

use devlog_core::models::TransferStatus;
use devlog_core::{DevlogConfig, DevlogState, Environment, TransferService};
use uuid::Uuid;

async fn exec(state: &DevlogState, env: Environment, sql: &str) {
    let conn = state.require_pool(env).unwrap().get().await.unwrap();
    conn.execute(sql, &[]).await.unwrap();
}

#[tokio::test]
async fn test_migrate_all_reports_each_table() {
    let (Ok(offline), Ok(online)) = (
        std::env::var("DEVLOG_TEST_OFFLINE_URL"),
        std::env::var("DEVLOG_TEST_ONLINE_URL"),
    ) else {
        return;
    };

    let mut config = DevlogConfig::default();
    config.offline.url = Some(offline);
    config.online.url = Some(online);
    let state = DevlogState::initialize(config);

    let suffix = Uuid::new_v4().simple().to_string();
    let filled = format!("devlog_all_filled_{suffix}");
    let empty = format!("devlog_all_empty_{suffix}");
    let broken = format!("devlog_all_broken_{suffix}");

    for env in Environment::ALL {
        exec(&state, env, &format!("CREATE TABLE {filled} (id int PRIMARY KEY)")).await;
        exec(&state, env, &format!("CREATE TABLE {empty} (id int)")).await;
    }
    exec(&state, Environment::Offline, &format!("CREATE TABLE {broken} (id text)")).await;
    exec(&state, Environment::Online, &format!("CREATE TABLE {broken} (id int8)")).await;
    exec(&state, Environment::Offline, &format!("INSERT INTO {filled} VALUES (1), (2), (3)")).await;
    exec(&state, Environment::Offline, &format!("INSERT INTO {broken} VALUES ('not a number')")).await;

    let results = TransferService::migrate_all(&state).await.unwrap();
    let find = |table: &str| results.iter().find(|r| r.table == table).unwrap();

    assert_eq!(find(&filled).status, TransferStatus::Success);
    assert_eq!(find(&filled).row_count, Some(3));
    assert_eq!(find(&empty).status, TransferStatus::Skipped);
    assert_eq!(find(&empty).row_count, Some(0));
    assert_eq!(find(&broken).status, TransferStatus::Error);
    assert!(find(&broken).error.is_some());

    for env in Environment::ALL {
        for table in [&filled, &empty, &broken] {
            exec(&state, env, &format!("DROP TABLE IF EXISTS {table}")).await;
        }
    }
    state.shutdown();
}
