use std::env;

use sdr_api::config::Config;
use sdr_api::db::Database;
use sdr_api::evaluation_service::EvaluationService;
use sdr_api::grok_client::GrokClient;
use sdr_api::lead_service::LeadService;
use sdr_api::models::{
    EvaluationCase, EvaluationListParams, InteractionCreate, InteractionType, LeadCreate,
    LeadListParams, LeadUpdate, PipelineStage,
};
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(db_url: &str, grok_base_url: &str) -> Config {
    Config {
        database_url: db_url.to_string(),
        port: 8000,
        grok_api_key: "test_key".to_string(),
        grok_base_url: grok_base_url.to_string(),
        grok_model: "grok-beta".to_string(),
        grok_timeout_secs: 2,
    }
}

fn test_db_url() -> anyhow::Result<String> {
    env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))
}

/// Integration smoke test for lead storage, cascade delete and pipeline stats.
/// Marked ignored to avoid running against production by accident; set
/// TEST_DATABASE_URL to run.
#[tokio::test]
#[ignore]
async fn lead_crud_cascade_and_stats_smoke_test() -> anyhow::Result<()> {
    let db_url = test_db_url()?;
    let db = Database::new(&db_url).await?;

    // Grok client is never called on CRUD paths; a dummy base URL is fine.
    let config = test_config(&db_url, "http://127.0.0.1:1");
    let grok = GrokClient::new(&config).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let service = LeadService::new(db.pool.clone(), grok);

    // Unique email per run to avoid confusion on repeated runs.
    let email = format!("smoke+{}@example.com", uuid::Uuid::new_v4().simple());

    // Round-trip: create then fetch returns identical field values.
    let created = service
        .create_lead(LeadCreate {
            first_name: "Smoke".to_string(),
            last_name: "Test".to_string(),
            email: email.clone(),
            phone: Some("+15550100".to_string()),
            company_name: "Acme Corp".to_string(),
            job_title: Some("CTO".to_string()),
            company_size: Some("medium".to_string()),
            industry: Some("technology".to_string()),
            company_website: None,
            linkedin_url: None,
            notes: Some("initial note".to_string()),
        })
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let fetched = service
        .get_lead(created.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .expect("created lead must be fetchable");
    assert_eq!(fetched.email, email);
    assert_eq!(fetched.company_name, "Acme Corp");
    assert_eq!(fetched.pipeline_stage, PipelineStage::New);
    assert_eq!(fetched.lead_score, 0.0);
    assert_eq!(fetched.notes.as_deref(), Some("initial note"));

    // Explicit null clears a nullable field, omitted fields keep their value.
    let update: LeadUpdate =
        serde_json::from_value(serde_json::json!({"notes": null, "job_title": "VP Engineering"}))?;
    let updated = service
        .update_lead(created.id, update)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .expect("updated lead must exist");
    assert_eq!(updated.notes, None);
    assert_eq!(updated.job_title.as_deref(), Some("VP Engineering"));
    assert_eq!(updated.phone.as_deref(), Some("+15550100"));

    // Stage filter returns only matching leads.
    let new_leads = service
        .get_leads(&LeadListParams {
            stage: Some(PipelineStage::New),
            search: Some(email.clone()),
            ..Default::default()
        })
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(new_leads.len(), 1);

    let closed_won = service
        .get_leads(&LeadListParams {
            stage: Some(PipelineStage::ClosedWon),
            search: Some(email.clone()),
            ..Default::default()
        })
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert!(closed_won.is_empty());

    // Attach an interaction and a message, then verify the cascade.
    service
        .add_interaction(
            created.id,
            InteractionCreate {
                interaction_type: InteractionType::Call,
                subject: Some("Intro call".to_string()),
                content: "Discussed current tooling".to_string(),
            },
        )
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    sqlx::query("INSERT INTO messages (lead_id, message_type, content) VALUES ($1, $2, $3)")
        .bind(created.id)
        .bind("email")
        .bind("Hi Smoke, following up on our call.")
        .execute(&db.pool)
        .await?;

    // Pipeline stats counts sum to the total lead count.
    let stats = service
        .get_pipeline_stats()
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let stats_sum: i64 = stats
        .as_object()
        .expect("stats must be an object")
        .values()
        .map(|v| v.as_i64().unwrap_or(0))
        .sum();
    let (total_leads,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM leads")
        .fetch_one(&db.pool)
        .await?;
    assert_eq!(stats_sum, total_leads);

    // Deleting the lead removes its interactions and messages.
    assert!(service
        .delete_lead(created.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?);

    let (interaction_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM interactions WHERE lead_id = $1")
            .bind(created.id)
            .fetch_one(&db.pool)
            .await?;
    let (message_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM messages WHERE lead_id = $1")
            .bind(created.id)
            .fetch_one(&db.pool)
            .await?;
    assert_eq!(interaction_count, 0);
    assert_eq!(message_count, 0);

    Ok(())
}

/// Integration smoke test for the evaluation service: a failing upstream call
/// never aborts a run, and the summary invariants hold over the limit window.
/// Set TEST_DATABASE_URL to run.
#[tokio::test]
#[ignore]
async fn evaluation_run_and_summary_smoke_test() -> anyhow::Result<()> {
    let db_url = test_db_url()?;
    let db = Database::new(&db_url).await?;

    // The first upstream call succeeds with output matching the expected
    // text exactly; every later call fails with a 500.
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Hi Sarah"}}]
        })))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let config = test_config(&db_url, &mock_server.uri());
    let grok = GrokClient::new(&config).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let service = EvaluationService::new(db.pool.clone(), grok);

    // Unique tag per run so the name filter and cleanup only touch our rows.
    let run_tag = Uuid::new_v4().simple().to_string();
    let cases = vec![
        EvaluationCase {
            test_name: format!("Email Greeting {}", run_tag),
            prompt_template: "Generate greeting".to_string(),
            test_input: "Write a short greeting for Sarah".to_string(),
            expected_output: Some("Hi Sarah".to_string()),
        },
        EvaluationCase {
            test_name: format!("Upstream Outage {}", run_tag),
            prompt_template: "Qualify lead".to_string(),
            test_input: "Qualify this lead".to_string(),
            expected_output: Some("qualification_score".to_string()),
        },
    ];

    // Both cases are stored even though the second upstream call failed.
    let results = service
        .run(cases)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(results.len(), 2);
    assert!(results[0].passed);
    assert_eq!(results[0].score, Some(1.0));
    assert!(!results[1].passed);
    assert_eq!(results[1].score, Some(0.0));
    assert!(results[1].actual_output.starts_with("ERROR:"));
    assert!(results.iter().all(|e| e.execution_time_ms.is_some()));

    // One row with neither score nor timing, as stored before scoring ran.
    let (unscored_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO evaluations (test_name, prompt_template, test_input, actual_output, passed)
        VALUES ($1, $2, $3, $4, FALSE)
        RETURNING id
        "#,
    )
    .bind(format!("Unscored {}", run_tag))
    .bind("Qualify lead")
    .bind("Qualify this lead")
    .bind("pending")
    .fetch_one(&db.pool)
    .await?;

    // Summary over the three rows just written.
    let summary = service
        .get_summary(Some(3))
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(summary.total_tests, 3);
    assert_eq!(summary.passed_tests, 1);
    assert_eq!(
        summary.passed_tests + summary.failed_tests,
        summary.total_tests
    );
    // The average covers scored rows only: (1.0 + 0.0) / 2.
    assert_eq!(summary.average_score, Some(0.5));
    assert!(summary.average_execution_time_ms.is_some());

    // The limit narrows the window to the most recent rows.
    let recent = service
        .get_summary(Some(2))
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(recent.total_tests, 2);
    assert_eq!(recent.passed_tests + recent.failed_tests, recent.total_tests);

    // No limit aggregates everything.
    let all = service
        .get_summary(None)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert!(all.total_tests >= 3);

    // Name filter returns just this run's rows.
    let listed = service
        .get_evaluations(&EvaluationListParams {
            test_name: Some(run_tag.clone()),
            ..Default::default()
        })
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(listed.len(), 3);

    // Cleanup.
    for id in results.iter().map(|e| e.id).chain([unscored_id]) {
        assert!(service
            .delete_evaluation(id)
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?);
    }

    Ok(())
}
