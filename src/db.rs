use sqlx::{postgres::PgPoolOptions, PgPool};

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        init_schema(&pool).await?;

        Ok(Self { pool })
    }
}

/// Creates the enum types and tables if they do not exist yet.
/// Idempotent, runs on every startup.
pub async fn init_schema(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        DO $$ BEGIN
            CREATE TYPE pipeline_stage AS ENUM (
                'new', 'qualified', 'contacted', 'meeting_scheduled',
                'proposal_sent', 'negotiation', 'closed_won', 'closed_lost'
            );
        EXCEPTION WHEN duplicate_object THEN NULL;
        END $$
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        DO $$ BEGIN
            CREATE TYPE interaction_type AS ENUM (
                'email', 'call', 'meeting', 'linkedin', 'note'
            );
        EXCEPTION WHEN duplicate_object THEN NULL;
        END $$
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS leads (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            first_name VARCHAR(100) NOT NULL,
            last_name VARCHAR(100) NOT NULL,
            email VARCHAR(255) NOT NULL,
            phone VARCHAR(20),
            company_name VARCHAR(255) NOT NULL,
            job_title VARCHAR(255),
            company_size VARCHAR(50),
            industry VARCHAR(100),
            company_website VARCHAR(255),
            linkedin_url VARCHAR(255),
            notes TEXT,
            lead_score DOUBLE PRECISION NOT NULL DEFAULT 0,
            pipeline_stage pipeline_stage NOT NULL DEFAULT 'new',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS interactions (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            lead_id UUID NOT NULL REFERENCES leads(id) ON DELETE CASCADE,
            interaction_type interaction_type NOT NULL,
            subject VARCHAR(255),
            content TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            lead_id UUID NOT NULL REFERENCES leads(id) ON DELETE CASCADE,
            message_type VARCHAR(50) NOT NULL,
            subject VARCHAR(255),
            content TEXT NOT NULL,
            prompt_used TEXT,
            raw_response TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            sent_at TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scoring_criteria (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name VARCHAR(100) NOT NULL,
            description TEXT,
            weight DOUBLE PRECISION NOT NULL DEFAULT 1.0,
            criteria_rules TEXT NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS evaluations (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            test_name VARCHAR(255) NOT NULL,
            prompt_template TEXT NOT NULL,
            test_input TEXT NOT NULL,
            expected_output TEXT,
            actual_output TEXT NOT NULL,
            score DOUBLE PRECISION,
            passed BOOLEAN NOT NULL DEFAULT FALSE,
            execution_time_ms BIGINT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_interactions_lead_id ON interactions(lead_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_lead_id ON messages(lead_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_leads_pipeline_stage ON leads(pipeline_stage)")
        .execute(pool)
        .await?;

    tracing::info!("Database schema initialized");
    Ok(())
}
