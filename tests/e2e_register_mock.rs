
use axum::http::StatusCode;
use e2e_harness::{CliHarness, MockServer, TestResult};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn verify_sends_sentinel_and_prints_extracted_text() -> TestResult<()> {
    let llm = MockServer::llm("pong").await?;
    let cli = CliHarness::new("http://127.0.0.1:9")?;
    let descriptor = cli.write_descriptor(&llm.url(), false)?;

    let out = cli
        .run(&["verify", "--config", descriptor.to_str().unwrap_or_default()])
        .await?;
    assert!(out.status.success(), "verify failed: {}", out.combined());
    assert!(out.stdout.contains("pong"), "stdout: {}", out.stdout);

    let requests = llm.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["messages"][0]["content"], "hi");
    assert_eq!(requests[0]["model"], "acme-7b");
    assert_eq!(requests[0]["max_tokens"], 512);

    llm.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn register_submits_once_and_status_lists_org() -> TestResult<()> {
    let llm = MockServer::llm("ready").await?;
    let backend = MockServer::backend("tok-e2e").await?;
    let cli = CliHarness::new(&backend.base_url())?;
    let descriptor = cli.write_descriptor(&llm.url(), true)?;

    let out = cli
        .run(&["register", "-c", descriptor.to_str().unwrap_or_default()])
        .await?;
    assert!(out.status.success(), "register failed: {}", out.combined());
    assert!(out.stdout.contains("Acme Corp is registered"));
    assert!(!out.combined().contains("tok-e2e"));

    // Test plus the fresh pre-commit check.
    assert_eq!(llm.requests().len(), 2);

    let submitted = backend.requests();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0]["email"], "dana@acme.io");
    assert_eq!(submitted[0]["llm_config"]["endpoint"], llm.url());
    assert_eq!(submitted[0]["llm_config"]["api_key"], "sk-e2e-secret");
    assert_eq!(
        submitted[0]["llm_config"]["response_mapping"]["text"],
        "choices[0].message.content"
    );

    let status = cli.run(&["status"]).await?;
    assert!(status.status.success(), "status failed: {}", status.combined());
    assert!(status.stdout.contains("Acme Corp"));
    assert!(status.stdout.contains("org-e2e"));
    assert!(status.stdout.contains("token stored"));

    llm.shutdown().await;
    backend.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failing_endpoint_never_reaches_backend() -> TestResult<()> {
    let llm = MockServer::failing_llm(StatusCode::UNAUTHORIZED, "Invalid API key").await?;
    let backend = MockServer::backend("tok-never").await?;
    let cli = CliHarness::new(&backend.base_url())?;
    let descriptor = cli.write_descriptor(&llm.url(), true)?;

    let out = cli
        .run(&["register", "-c", descriptor.to_str().unwrap_or_default()])
        .await?;
    assert!(!out.status.success());
    assert!(out.stderr.contains("Invalid API key"), "stderr: {}", out.stderr);
    assert!(out.stderr.contains("server error"));
    assert!(backend.requests().is_empty());

    let status = cli.run(&["status"]).await?;
    assert!(status.stdout.contains("No organizations registered"));

    llm.shutdown().await;
    backend.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn preview_masks_key_and_sends_nothing() -> TestResult<()> {
    let llm = MockServer::llm("unused").await?;
    let cli = CliHarness::new("http://127.0.0.1:9")?;
    let descriptor = cli.write_descriptor(&llm.url(), false)?;

    let out = cli
        .run(&["preview", "-c", descriptor.to_str().unwrap_or_default()])
        .await?;
    assert!(out.status.success(), "preview failed: {}", out.combined());
    assert!(out.stdout.contains("Bearer ***"));
    assert!(!out.stdout.contains("sk-e2e-secret"));
    assert!(llm.requests().is_empty());

    llm.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_sends_user_prompt() -> TestResult<()> {
    let llm = MockServer::llm("Paris").await?;
    let cli = CliHarness::new("http://127.0.0.1:9")?;
    let descriptor = cli.write_descriptor(&llm.url(), false)?;

    let out = cli
        .run(&[
            "run",
            "-c",
            descriptor.to_str().unwrap_or_default(),
            "-p",
            "Capital of France?",
        ])
        .await?;
    assert!(out.status.success(), "run failed: {}", out.combined());
    assert_eq!(out.stdout.trim(), "Paris");
    assert_eq!(llm.requests()[0]["messages"][0]["content"], "Capital of France?");

    llm.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failure_message_mentioning_cancel_still_exits_non_zero() -> TestResult<()> {
    let llm = MockServer::failing_llm(StatusCode::BAD_GATEWAY, "upstream request canceled").await?;
    let cli = CliHarness::new("http://127.0.0.1:9")?;
    let descriptor = cli.write_descriptor(&llm.url(), false)?;

    let out = cli
        .run(&["verify", "--config", descriptor.to_str().unwrap_or_default()])
        .await?;
    assert!(!out.status.success(), "verify should fail: {}", out.combined());
    assert!(out.stderr.contains("upstream request canceled"), "stderr: {}", out.stderr);
    assert!(!out.stdout.contains("Done."));

    llm.shutdown().await;
    Ok(())
}
