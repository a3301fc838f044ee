use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tracing::info;

use super::ProfileStore;
use crate::models::profile::{
    IntroRequest, Profile, ProfileSummary, ProfileUpdate, Role, Startup, TechBackground,
    UserAccount,
};

/// PostgreSQL store for accounts, profiles, summaries and intro requests.
pub struct PostgresProfileStore {
    pool: PgPool,
}

impl PostgresProfileStore {
    pub async fn new(uri: &str, pool_size: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(10))
            .connect(uri)
            .await?;

        info!("Connected to PostgreSQL (pool_size={pool_size})");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn parse_role(value: Option<String>) -> anyhow::Result<Option<Role>> {
    value
        .map(|r| r.parse::<Role>().map_err(|e| anyhow::anyhow!(e)))
        .transpose()
}

fn row_to_intro(row: &PgRow) -> anyhow::Result<IntroRequest> {
    let status: String = row.try_get("status")?;
    let id: uuid::Uuid = row.try_get("id")?;
    Ok(IntroRequest {
        id: id.to_string(),
        requester_id: row.try_get("requester_id")?,
        target_id: row.try_get("target_id")?,
        status: status.parse().map_err(|e: String| anyhow::anyhow!(e))?,
        feedback: row.try_get("feedback")?,
        rating: row.try_get("rating")?,
        created_at: row.try_get("created_at")?,
    })
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id VARCHAR(255) PRIMARY KEY,
        email VARCHAR(320) NOT NULL UNIQUE,
        name VARCHAR(255),
        role VARCHAR(8),
        onboarded BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMP WITH TIME ZONE DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS interview_responses (
        id BIGSERIAL PRIMARY KEY,
        user_id VARCHAR(255) NOT NULL,
        role VARCHAR(8) NOT NULL,
        structured JSONB NOT NULL DEFAULT '{}',
        free_text TEXT,
        created_at TIMESTAMP WITH TIME ZONE DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS profiles (
        user_id VARCHAR(255) PRIMARY KEY,
        name VARCHAR(255) NOT NULL DEFAULT '',
        location VARCHAR(255),
        timezone VARCHAR(64),
        availability VARCHAR(255),
        commitment VARCHAR(255)
    )",
    "CREATE TABLE IF NOT EXISTS startups (
        user_id VARCHAR(255) PRIMARY KEY,
        stage TEXT,
        domain TEXT,
        description TEXT,
        equity_offer TEXT,
        salary_offer TEXT
    )",
    "CREATE TABLE IF NOT EXISTS tech_backgrounds (
        user_id VARCHAR(255) PRIMARY KEY,
        primary_stack TEXT,
        years_experience INTEGER,
        domains TEXT,
        track_record TEXT
    )",
    "CREATE TABLE IF NOT EXISTS profile_summaries (
        user_id VARCHAR(255) PRIMARY KEY,
        ai_summary_text TEXT NOT NULL DEFAULT '',
        updated_at TIMESTAMP WITH TIME ZONE DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS intro_requests (
        id UUID PRIMARY KEY,
        requester_id VARCHAR(255) NOT NULL,
        target_id VARCHAR(255) NOT NULL,
        status VARCHAR(16) NOT NULL DEFAULT 'PENDING',
        feedback TEXT,
        rating INTEGER,
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP,
        UNIQUE (requester_id, target_id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_intro_requests_target ON intro_requests(target_id)",
];

#[async_trait]
impl ProfileStore for PostgresProfileStore {
    async fn initialize(&self) -> anyhow::Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Database tables initialized");
        Ok(())
    }

    async fn create_user(&self, user: &UserAccount) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO users (id, email, name, role, onboarded) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.map(Role::as_str))
        .bind(user.onboarded)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> anyhow::Result<Option<UserAccount>> {
        let row = sqlx::query("SELECT id, email, name, role, onboarded FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| -> anyhow::Result<_> {
            Ok(UserAccount {
                id: r.try_get("id")?,
                email: r.try_get("email")?,
                name: r.try_get("name")?,
                role: parse_role(r.try_get("role")?)?,
                onboarded: r.try_get("onboarded")?,
            })
        })
        .transpose()
    }

    async fn set_role(&self, user_id: &str, role: Role) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
            .bind(user_id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_onboarded(&self, user_id: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET onboarded = TRUE WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_interview(
        &self,
        user_id: &str,
        role: Role,
        structured: &HashMap<String, String>,
        free_text: Option<&str>,
    ) -> anyhow::Result<()> {
        let structured_json = serde_json::to_value(structured)?;
        sqlx::query(
            "INSERT INTO interview_responses (user_id, role, structured, free_text)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(role.as_str())
        .bind(&structured_json)
        .bind(free_text)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_profile(&self, user_id: &str, update: &ProfileUpdate) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO profiles (user_id, name, location, timezone, availability, commitment)
             VALUES ($1, COALESCE($2, ''), $3, $4, $5, $6)
             ON CONFLICT (user_id)
             DO UPDATE SET
                name = COALESCE($2, profiles.name),
                location = COALESCE(EXCLUDED.location, profiles.location),
                timezone = COALESCE(EXCLUDED.timezone, profiles.timezone),
                availability = COALESCE(EXCLUDED.availability, profiles.availability),
                commitment = COALESCE(EXCLUDED.commitment, profiles.commitment)",
        )
        .bind(user_id)
        .bind(&update.name)
        .bind(&update.location)
        .bind(&update.timezone)
        .bind(&update.availability)
        .bind(&update.commitment)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_profile(&self, user_id: &str) -> anyhow::Result<Option<Profile>> {
        let row = sqlx::query(
            "SELECT user_id, name, location, timezone, availability, commitment
             FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| -> anyhow::Result<_> {
            Ok(Profile {
                user_id: r.try_get("user_id")?,
                name: r.try_get("name")?,
                location: r.try_get("location")?,
                timezone: r.try_get("timezone")?,
                availability: r.try_get("availability")?,
                commitment: r.try_get("commitment")?,
            })
        })
        .transpose()
    }

    async fn upsert_startup(&self, user_id: &str, startup: &Startup) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO startups (user_id, stage, domain, description, equity_offer, salary_offer)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (user_id)
             DO UPDATE SET
                stage = COALESCE(EXCLUDED.stage, startups.stage),
                domain = COALESCE(EXCLUDED.domain, startups.domain),
                description = COALESCE(EXCLUDED.description, startups.description),
                equity_offer = COALESCE(EXCLUDED.equity_offer, startups.equity_offer),
                salary_offer = COALESCE(EXCLUDED.salary_offer, startups.salary_offer)",
        )
        .bind(user_id)
        .bind(&startup.stage)
        .bind(&startup.domain)
        .bind(&startup.description)
        .bind(&startup.equity_offer)
        .bind(&startup.salary_offer)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_startup(&self, user_id: &str) -> anyhow::Result<Option<Startup>> {
        let row = sqlx::query(
            "SELECT stage, domain, description, equity_offer, salary_offer
             FROM startups WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| -> anyhow::Result<_> {
            Ok(Startup {
                stage: r.try_get("stage")?,
                domain: r.try_get("domain")?,
                description: r.try_get("description")?,
                equity_offer: r.try_get("equity_offer")?,
                salary_offer: r.try_get("salary_offer")?,
            })
        })
        .transpose()
    }

    async fn upsert_tech_background(
        &self,
        user_id: &str,
        tech: &TechBackground,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO tech_backgrounds (user_id, primary_stack, years_experience, domains, track_record)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (user_id)
             DO UPDATE SET
                primary_stack = COALESCE(EXCLUDED.primary_stack, tech_backgrounds.primary_stack),
                years_experience = COALESCE(EXCLUDED.years_experience, tech_backgrounds.years_experience),
                domains = COALESCE(EXCLUDED.domains, tech_backgrounds.domains),
                track_record = COALESCE(EXCLUDED.track_record, tech_backgrounds.track_record)",
        )
        .bind(user_id)
        .bind(&tech.primary_stack)
        .bind(tech.years_experience)
        .bind(&tech.domains)
        .bind(&tech.track_record)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_tech_background(&self, user_id: &str) -> anyhow::Result<Option<TechBackground>> {
        let row = sqlx::query(
            "SELECT primary_stack, years_experience, domains, track_record
             FROM tech_backgrounds WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| -> anyhow::Result<_> {
            Ok(TechBackground {
                primary_stack: r.try_get("primary_stack")?,
                years_experience: r.try_get("years_experience")?,
                domains: r.try_get("domains")?,
                track_record: r.try_get("track_record")?,
            })
        })
        .transpose()
    }

    async fn upsert_summary(&self, user_id: &str, text: &str) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO profile_summaries (user_id, ai_summary_text)
             VALUES ($1, $2)
             ON CONFLICT (user_id)
             DO UPDATE SET ai_summary_text = EXCLUDED.ai_summary_text, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(user_id)
        .bind(text)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_summary(&self, user_id: &str) -> anyhow::Result<Option<ProfileSummary>> {
        let text: Option<String> = sqlx::query_scalar(
            "SELECT ai_summary_text FROM profile_summaries WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(text.map(|text| ProfileSummary {
            user_id: user_id.to_string(),
            text,
        }))
    }

    async fn create_intro_request(
        &self,
        requester_id: &str,
        target_id: &str,
        feedback: Option<&str>,
        rating: Option<i32>,
    ) -> anyhow::Result<IntroRequest> {
        let row = sqlx::query(
            "INSERT INTO intro_requests (id, requester_id, target_id, status, feedback, rating)
             VALUES ($1, $2, $3, 'PENDING', $4, $5)
             RETURNING id, requester_id, target_id, status, feedback, rating, created_at",
        )
        .bind(uuid::Uuid::new_v4())
        .bind(requester_id)
        .bind(target_id)
        .bind(feedback)
        .bind(rating)
        .fetch_one(&self.pool)
        .await?;

        row_to_intro(&row)
    }

    async fn find_intro_request(
        &self,
        requester_id: &str,
        target_id: &str,
    ) -> anyhow::Result<Option<IntroRequest>> {
        let row = sqlx::query(
            "SELECT id, requester_id, target_id, status, feedback, rating, created_at
             FROM intro_requests
             WHERE requester_id = $1 AND target_id = $2",
        )
        .bind(requester_id)
        .bind(target_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_intro).transpose()
    }

    async fn list_intro_requests(&self, user_id: &str) -> anyhow::Result<Vec<IntroRequest>> {
        let rows = sqlx::query(
            "SELECT id, requester_id, target_id, status, feedback, rating, created_at
             FROM intro_requests
             WHERE requester_id = $1 OR target_id = $1
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_intro).collect()
    }
}
