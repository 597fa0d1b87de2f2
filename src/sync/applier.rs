use log::{debug, info};

use crate::db::DbClient;
use crate::errors::DbError;
use crate::models::plan::TablePlan;

use super::ddl::{collapse_whitespace, DdlBuilder};

/// Runs a plan's statements one at a time, or only logs them in plan mode.
pub struct PlanApplier<'a> {
    client: &'a dyn DbClient,
    plan_mode: bool,
}

impl<'a> PlanApplier<'a> {
    pub fn new(client: &'a dyn DbClient, plan_mode: bool) -> Self {
        Self { client, plan_mode }
    }

    /// Returns the statements sent (or, in plan mode, logged) in order.
    pub async fn apply(&self, ddl: &DdlBuilder<'_>, plan: &TablePlan) -> Result<Vec<String>, DbError> {
        if !plan.changed {
            return Ok(Vec::new());
        }

        let statements = plan.statements(ddl);
        for sql in &statements {
            if self.plan_mode {
                info!("[plan] {}", collapse_whitespace(sql));
            } else {
                debug!("{}: {}", plan.table, collapse_whitespace(sql));
                self.client.execute(sql).await?;
            }
        }
        Ok(statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MockDbClient;
    use crate::models::connections::{DbType, SyncOptions};
    use crate::models::plan::{IndexAction, IndexOp};
    use mockall::predicate;

    fn sample_plan() -> TablePlan {
        let mut plan = TablePlan::new("user");
        plan.add_clauses
            .push("ADD COLUMN \"avatar\" VARCHAR(255)".to_string());
        plan.index_actions.push(IndexAction {
            action: IndexOp::Create,
            index_name: "idx_user_avatar".to_string(),
            field_name: "avatar".to_string(),
        });
        plan.comment_actions
            .push("COMMENT ON COLUMN \"user\".\"avatar\" IS '头像'".to_string());
        plan.changed = true;
        plan
    }

    #[tokio::test]
    async fn test_plan_mode_matches_apply_mode() {
        let options = SyncOptions::default();
        let ddl = DdlBuilder::new(DbType::Postgres, "user", &options);
        let plan = sample_plan();

        let mut dry = MockDbClient::new();
        dry.expect_execute().never();
        let logged = PlanApplier::new(&dry, true).apply(&ddl, &plan).await.unwrap();

        let mut live = MockDbClient::new();
        let mut seq = mockall::Sequence::new();
        for sql in logged.clone() {
            live.expect_execute()
                .with(predicate::eq(sql))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(()));
        }
        let executed = PlanApplier::new(&live, false).apply(&ddl, &plan).await.unwrap();

        assert_eq!(logged, executed);
        assert_eq!(
            executed,
            vec![
                "ALTER TABLE \"user\" ADD COLUMN \"avatar\" VARCHAR(255)".to_string(),
                "CREATE INDEX \"idx_user_avatar\" ON \"user\" (\"avatar\")".to_string(),
                "COMMENT ON COLUMN \"user\".\"avatar\" IS '头像'".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_unchanged_plan_is_skipped() {
        let options = SyncOptions::default();
        let ddl = DdlBuilder::new(DbType::MySql, "user", &options);
        let mut mock_db = MockDbClient::new();
        mock_db.expect_execute().never();

        let statements = PlanApplier::new(&mock_db, false)
            .apply(&ddl, &TablePlan::new("user"))
            .await
            .unwrap();
        assert!(statements.is_empty());
    }

    #[tokio::test]
    async fn test_execute_error_stops_apply() {
        let options = SyncOptions::default();
        let ddl = DdlBuilder::new(DbType::Postgres, "user", &options);
        let mut mock_db = MockDbClient::new();
        mock_db
            .expect_execute()
            .times(1)
            .returning(|_| Err(DbError::Connection("gone".to_string())));

        let result = PlanApplier::new(&mock_db, false)
            .apply(&ddl, &sample_plan())
            .await;
        assert!(matches!(result, Err(DbError::Connection(_))));
    }
}
