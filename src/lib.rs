use db::DbClient;
use log::{error, info};
use models::{
    connections::SyncOptions,
    definition::TableDefinition,
    plan::{SyncSummary, TableFailure},
};
use sync::TableSync;

pub mod db;
pub mod errors;
pub mod models;
pub mod sync;

/// Syncs a set of table definitions against one database, table by table.
pub struct SchemaSync {
    client: Box<dyn DbClient>,
    options: SyncOptions,
}

impl SchemaSync {
    pub fn new(client: Box<dyn DbClient>, options: SyncOptions) -> Self {
        SchemaSync { client, options }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Tables run sequentially; a failed table is recorded and the next one proceeds.
    pub async fn sync_all(&self, definitions: &[TableDefinition]) -> SyncSummary {
        let mut summary = SyncSummary {
            plan: self.options.plan,
            ..Default::default()
        };
        let table_sync = TableSync::new(self.client.as_ref(), &self.options);

        for def in definitions {
            match table_sync.sync(def).await {
                Ok(outcome) => {
                    info!("{}", outcome.plan.report());
                    summary.absorb(&outcome);
                }
                Err(e) => {
                    error!("{}: {}", def.table, e);
                    summary.failures.push(TableFailure {
                        table: def.table.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::db::MockDbClient;
    use crate::models::connections::DbType;
    use crate::models::schema::ColumnInfo;

    #[tokio::test]
    async fn test_sync_all_merges_and_continues() {
        let mut mock_db = MockDbClient::new();
        mock_db.expect_dialect().return_const(DbType::MySql);
        mock_db
            .expect_table_exists()
            .returning(|table| Ok(table != "fresh"));
        mock_db.expect_get_columns().returning(|table| {
            let mut columns = BTreeMap::new();
            if table == "user" {
                columns.insert("email".to_string(), ColumnInfo::new("varchar", Some(100)));
            } else {
                columns.insert("amount".to_string(), ColumnInfo::new("bigint", None));
            }
            Ok(columns)
        });
        mock_db
            .expect_get_indexes()
            .returning(|_| Ok(Default::default()));

        let definitions = vec![
            TableDefinition::new("user", &[("email", "邮箱|string|0|150|null|0|null")]),
            TableDefinition::new("order", &[("amount", "金额|string|0|20|null|0|null")]),
            TableDefinition::new("fresh", &[("title", "标题|string|0|80|null|0|null")]),
        ];
        let options = SyncOptions {
            plan: true,
            ..SyncOptions::default()
        };
        let summary = SchemaSync::new(Box::new(mock_db), options)
            .sync_all(&definitions)
            .await;

        assert!(summary.plan);
        assert!(!summary.is_success());
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].table, "order");
        assert_eq!(summary.changed_tables, vec!["user", "fresh"]);
        assert_eq!(summary.counters.max_changes, 1);
        assert_eq!(summary.counters.tables_created, 1);
        assert!(summary.to_string().starts_with("Plan: 2 changed, 0 unchanged, 1 failed"));
    }
}
