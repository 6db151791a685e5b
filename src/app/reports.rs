use sqlx::postgres::PgRow;
use sqlx::Row;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::report::{
    Report, ReportReason, ReportStatus, ReportTarget, ReportView, ReporterView, TargetKind,
    TargetView,
};
use crate::infra::db::Db;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Report not found")]
    NotFound,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct ReportService {
    db: Db,
}

impl ReportService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// File a report. The target is not checked for existence: a report
    /// must survive its target being deleted, so there is no foreign key
    /// to be ahead of.
    pub async fn create(
        &self,
        reporter_id: Uuid,
        target: ReportTarget,
        reason: ReportReason,
        description: &str,
    ) -> Result<Report, ReportError> {
        let row = sqlx::query(
            "INSERT INTO reports (reporter_id, target_type, target_id, recipe_id, reason, description) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, reporter_id, target_type, target_id, recipe_id, reason, \
                       description, status, created_at, updated_at",
        )
        .bind(reporter_id)
        .bind(target.kind().as_db())
        .bind(target.target_id())
        .bind(target.recipe_id())
        .bind(reason.as_db())
        .bind(description)
        .fetch_one(self.db.pool())
        .await?;

        report_from_row(&row)
    }

    pub async fn list(
        &self,
        status: Option<ReportStatus>,
        target_type: Option<TargetKind>,
    ) -> Result<Vec<ReportView>, ReportError> {
        let rows = sqlx::query(
            "SELECT id, reporter_id, target_type, target_id, recipe_id, reason, \
                    description, status, created_at, updated_at \
             FROM reports \
             WHERE ($1::text IS NULL OR status = $1) \
               AND ($2::text IS NULL OR target_type = $2) \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(status.map(|s| s.as_db()))
        .bind(target_type.map(|t| t.as_db()))
        .fetch_all(self.db.pool())
        .await?;

        self.resolve_all(rows).await
    }

    pub async fn get(&self, report_id: Uuid) -> Result<ReportView, ReportError> {
        let row = sqlx::query(
            "SELECT id, reporter_id, target_type, target_id, recipe_id, reason, \
                    description, status, created_at, updated_at \
             FROM reports WHERE id = $1",
        )
        .bind(report_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or(ReportError::NotFound)?;

        let report = report_from_row(&row)?;
        self.resolve(report).await
    }

    pub async fn my_reports(&self, reporter_id: Uuid) -> Result<Vec<ReportView>, ReportError> {
        let rows = sqlx::query(
            "SELECT id, reporter_id, target_type, target_id, recipe_id, reason, \
                    description, status, created_at, updated_at \
             FROM reports WHERE reporter_id = $1 \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(reporter_id)
        .fetch_all(self.db.pool())
        .await?;

        self.resolve_all(rows).await
    }

    pub async fn update_status(
        &self,
        report_id: Uuid,
        status: ReportStatus,
    ) -> Result<Report, ReportError> {
        let row = sqlx::query(
            "UPDATE reports SET status = $2, updated_at = now() \
             WHERE id = $1 \
             RETURNING id, reporter_id, target_type, target_id, recipe_id, reason, \
                       description, status, created_at, updated_at",
        )
        .bind(report_id)
        .bind(status.as_db())
        .fetch_optional(self.db.pool())
        .await?
        .ok_or(ReportError::NotFound)?;

        report_from_row(&row)
    }

    pub async fn delete(&self, report_id: Uuid) -> Result<(), ReportError> {
        let deleted = sqlx::query("DELETE FROM reports WHERE id = $1")
            .bind(report_id)
            .execute(self.db.pool())
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(ReportError::NotFound);
        }
        Ok(())
    }

    /// Reports pointed at one specific target, for per-item admin views.
    pub async fn list_for_target(
        &self,
        kind: TargetKind,
        target_id: Uuid,
    ) -> Result<Vec<ReportView>, ReportError> {
        let rows = sqlx::query(
            "SELECT id, reporter_id, target_type, target_id, recipe_id, reason, \
                    description, status, created_at, updated_at \
             FROM reports WHERE target_type = $1 AND target_id = $2 \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(kind.as_db())
        .bind(target_id)
        .fetch_all(self.db.pool())
        .await?;

        self.resolve_all(rows).await
    }

    pub async fn list_for_recipe(&self, recipe_id: Uuid) -> Result<Vec<ReportView>, ReportError> {
        let rows = sqlx::query(
            "SELECT id, reporter_id, target_type, target_id, recipe_id, reason, \
                    description, status, created_at, updated_at \
             FROM reports \
             WHERE (target_type = 'recipe' AND target_id = $1) \
                OR (target_type = 'comment' AND recipe_id = $1) \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(recipe_id)
        .fetch_all(self.db.pool())
        .await?;

        self.resolve_all(rows).await
    }

    async fn resolve_all(&self, rows: Vec<PgRow>) -> Result<Vec<ReportView>, ReportError> {
        let mut views = Vec::with_capacity(rows.len());
        for row in &rows {
            let report = report_from_row(row)?;
            views.push(self.resolve(report).await?);
        }
        Ok(views)
    }

    /// Attach reporter and target views, substituting placeholders for
    /// anything deleted or deactivated since the report was filed.
    async fn resolve(&self, report: Report) -> Result<ReportView, ReportError> {
        let reporter = sqlx::query(
            "SELECT username, email FROM users WHERE id = $1 AND is_active",
        )
        .bind(report.reporter_id)
        .fetch_optional(self.db.pool())
        .await?
        .map(|row| ReporterView {
            username: row.get("username"),
            email: row.get("email"),
        })
        .unwrap_or_else(ReporterView::deleted);

        let name: Option<String> = match report.target_type {
            TargetKind::Recipe => {
                sqlx::query_scalar("SELECT name FROM recipes WHERE id = $1")
                    .bind(report.target_id)
                    .fetch_optional(self.db.pool())
                    .await?
            }
            TargetKind::Ingredient => {
                sqlx::query_scalar("SELECT name FROM ingredients WHERE id = $1")
                    .bind(report.target_id)
                    .fetch_optional(self.db.pool())
                    .await?
            }
            TargetKind::Category => {
                sqlx::query_scalar("SELECT name FROM categories WHERE id = $1")
                    .bind(report.target_id)
                    .fetch_optional(self.db.pool())
                    .await?
            }
            TargetKind::User => {
                sqlx::query_scalar("SELECT username FROM users WHERE id = $1 AND is_active")
                    .bind(report.target_id)
                    .fetch_optional(self.db.pool())
                    .await?
            }
            TargetKind::Comment => {
                sqlx::query_scalar("SELECT body FROM comments WHERE id = $1")
                    .bind(report.target_id)
                    .fetch_optional(self.db.pool())
                    .await?
            }
        };

        let target = name
            .map(|name| TargetView { name })
            .unwrap_or_else(TargetView::deleted);

        Ok(ReportView {
            report,
            reporter,
            target,
        })
    }
}

fn report_from_row(row: &PgRow) -> Result<Report, ReportError> {
    let target_type: String = row.get("target_type");
    let reason: String = row.get("reason");
    let status: String = row.get("status");

    Ok(Report {
        id: row.get("id"),
        reporter_id: row.get("reporter_id"),
        target_type: TargetKind::from_db(&target_type)
            .ok_or_else(|| sqlx::Error::Decode("unknown report target type".into()))?,
        target_id: row.get("target_id"),
        recipe_id: row.get("recipe_id"),
        reason: ReportReason::from_db(&reason)
            .ok_or_else(|| sqlx::Error::Decode("unknown report reason".into()))?,
        description: row.get("description"),
        status: ReportStatus::from_db(&status)
            .ok_or_else(|| sqlx::Error::Decode("unknown report status".into()))?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
