// Opt-in end-to-end run against a live conda-store.
//
// Needs a running server plus Node.js with `@playwright/test` and its
// browsers installed. Skipped unless explicitly requested:
//
//   CONDA_STORE_UX=1 cargo test -p conda-store-ux --test integration
//
// The usual `CONDA_STORE_UX_*` variables (base URL, screenshots, results
// directory) apply.

use conda_store_ux::{UxConfig, UxRunner};

#[tokio::test]
async fn test_integration() {
    if std::env::var("CONDA_STORE_UX").as_deref() != Ok("1") {
        eprintln!("skipping conda-store UI integration test (set CONDA_STORE_UX=1)");
        return;
    }

    let config = UxConfig::load(None).expect("configuration");
    let report = UxRunner::new(config)
        .run()
        .await
        .expect("scenario harness failed");

    if let Err(e) = report.into_result() {
        panic!("conda-store UI scenario failed: {}", e);
    }
}
