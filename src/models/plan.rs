use std::fmt;

use serde::Serialize;

use crate::sync::ddl::DdlBuilder;

/// Kind of difference between a live column and its rule.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Datatype,
    Length,
    Default,
    Comment,
}

impl ChangeKind {
    /// Label used in the change narration.
    pub fn label(&self) -> &'static str {
        match self {
            ChangeKind::Length => "长度",
            ChangeKind::Datatype => "类型",
            ChangeKind::Comment => "注释",
            ChangeKind::Default => "默认值",
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct FieldChange {
    pub kind: ChangeKind,
    pub current: String,
    pub new: String,
}

impl FieldChange {
    pub fn new(kind: ChangeKind, current: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            kind,
            current: current.into(),
            new: new.into(),
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IndexOp {
    Create,
    Drop,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct IndexAction {
    pub action: IndexOp,
    pub index_name: String,
    pub field_name: String,
}

/// Assembled, not-yet-applied DDL for one table.
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct TablePlan {
    pub table: String,
    pub changed: bool,
    /// Full CREATE TABLE statement when the table is absent.
    pub create_statement: Option<String>,
    pub add_clauses: Vec<String>,
    pub modify_clauses: Vec<String>,
    pub default_clauses: Vec<String>,
    pub index_actions: Vec<IndexAction>,
    pub comment_actions: Vec<String>,
}

impl TablePlan {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Default::default()
        }
    }

    pub fn has_actions(&self) -> bool {
        self.create_statement.is_some()
            || !self.add_clauses.is_empty()
            || !self.modify_clauses.is_empty()
            || !self.default_clauses.is_empty()
            || !self.index_actions.is_empty()
            || !self.comment_actions.is_empty()
    }

    /// The exact statements the applier sends, in execution order.
    ///
    /// A freshly created table gets its comments before its indexes; a reconciled
    /// table runs modify, add, default, index and comment statements in that order.
    pub fn statements(&self, ddl: &DdlBuilder) -> Vec<String> {
        let indexes = self
            .index_actions
            .iter()
            .map(|action| ddl.index_sql(&action.index_name, &action.field_name, action.action));

        if let Some(create) = &self.create_statement {
            return std::iter::once(create.clone())
                .chain(self.comment_actions.iter().cloned())
                .chain(indexes)
                .collect();
        }

        self.modify_clauses
            .iter()
            .chain(&self.add_clauses)
            .chain(&self.default_clauses)
            .map(|clause| ddl.alter_table(clause))
            .chain(indexes)
            .chain(self.comment_actions.iter().cloned())
            .collect()
    }

    /// Human-readable report grouped by action kind.
    pub fn report(&self) -> String {
        let mut out = format!("table `{}`", self.table);
        if !self.changed {
            out.push_str(": no changes");
            return out;
        }
        if self.create_statement.is_some() {
            out.push_str("\n  create: new table");
        }
        let groups = [
            ("add", &self.add_clauses),
            ("modify", &self.modify_clauses),
            ("default", &self.default_clauses),
            ("comment", &self.comment_actions),
        ];
        for (title, items) in groups {
            for item in items.iter() {
                out.push_str(&format!("\n  {}: {}", title, item));
            }
        }
        for action in &self.index_actions {
            let verb = match action.action {
                IndexOp::Create => "create",
                IndexOp::Drop => "drop",
            };
            out.push_str(&format!(
                "\n  index: {} {} ({})",
                verb, action.index_name, action.field_name
            ));
        }
        out
    }
}

/// Run-wide change counters. Each table sync returns its own; the caller merges.
#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncCounters {
    pub type_changes: u32,
    pub max_changes: u32,
    pub default_changes: u32,
    pub name_changes: u32,
    pub add_fields: u32,
    pub index_create: u32,
    pub index_drop: u32,
    pub tables_created: u32,
}

impl SyncCounters {
    pub fn record(&mut self, kind: ChangeKind) {
        match kind {
            ChangeKind::Datatype => self.type_changes += 1,
            ChangeKind::Length => self.max_changes += 1,
            ChangeKind::Default => self.default_changes += 1,
            ChangeKind::Comment => self.name_changes += 1,
        }
    }

    pub fn merge(&mut self, other: &SyncCounters) {
        self.type_changes += other.type_changes;
        self.max_changes += other.max_changes;
        self.default_changes += other.default_changes;
        self.name_changes += other.name_changes;
        self.add_fields += other.add_fields;
        self.index_create += other.index_create;
        self.index_drop += other.index_drop;
        self.tables_created += other.tables_created;
    }
}

/// Result of syncing one table.
#[derive(Debug, Serialize, Clone)]
pub struct TableOutcome {
    pub plan: TablePlan,
    pub counters: SyncCounters,
    /// Statements executed, or only logged in plan mode.
    pub statements: Vec<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct TableFailure {
    pub table: String,
    pub error: String,
}

/// Aggregate over a multi-table run.
#[derive(Debug, Serialize, Clone, Default)]
pub struct SyncSummary {
    pub plan: bool,
    pub counters: SyncCounters,
    pub changed_tables: Vec<String>,
    pub unchanged_tables: Vec<String>,
    pub failures: Vec<TableFailure>,
}

impl SyncSummary {
    pub fn absorb(&mut self, outcome: &TableOutcome) {
        self.counters.merge(&outcome.counters);
        if outcome.plan.changed {
            self.changed_tables.push(outcome.plan.table.clone());
        } else {
            self.unchanged_tables.push(outcome.plan.table.clone());
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.counters;
        writeln!(
            f,
            "{}: {} changed, {} unchanged, {} failed",
            if self.plan { "Plan" } else { "Sync" },
            self.changed_tables.len(),
            self.unchanged_tables.len(),
            self.failures.len()
        )?;
        writeln!(
            f,
            "  tables created: {}, fields added: {}",
            c.tables_created, c.add_fields
        )?;
        writeln!(
            f,
            "  type: {}, length: {}, default: {}, comment: {}",
            c.type_changes, c.max_changes, c.default_changes, c.name_changes
        )?;
        write!(
            f,
            "  indexes created: {}, indexes dropped: {}",
            c.index_create, c.index_drop
        )?;
        for failure in &self.failures {
            write!(f, "\n  failed `{}`: {}", failure.table, failure.error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::connections::{DbType, SyncOptions};

    #[test]
    fn test_counters_merge() {
        let mut total = SyncCounters::default();
        let mut one = SyncCounters::default();
        one.record(ChangeKind::Length);
        one.record(ChangeKind::Comment);
        one.add_fields = 2;
        total.merge(&one);
        total.merge(&one);

        assert_eq!(total.max_changes, 2);
        assert_eq!(total.name_changes, 2);
        assert_eq!(total.add_fields, 4);
        assert_eq!(total.type_changes, 0);
    }

    #[test]
    fn test_reconcile_statement_order() {
        let options = SyncOptions::default();
        let ddl = DdlBuilder::new(DbType::MySql, "user", &options);
        let mut plan = TablePlan::new("user");
        plan.comment_actions.push("COMMENT".to_string());
        plan.index_actions.push(IndexAction {
            action: IndexOp::Create,
            index_name: "idx_user_email".to_string(),
            field_name: "email".to_string(),
        });
        plan.default_clauses
            .push("ALTER COLUMN `age` SET DEFAULT 1".to_string());
        plan.add_clauses
            .push("ADD COLUMN `avatar` VARCHAR(255)".to_string());
        plan.modify_clauses
            .push("MODIFY COLUMN `email` VARCHAR(150)".to_string());

        assert_eq!(
            plan.statements(&ddl),
            vec![
                "ALTER TABLE `user` MODIFY COLUMN `email` VARCHAR(150)".to_string(),
                "ALTER TABLE `user` ADD COLUMN `avatar` VARCHAR(255)".to_string(),
                "ALTER TABLE `user` ALTER COLUMN `age` SET DEFAULT 1".to_string(),
                "CREATE INDEX `idx_user_email` ON `user` (`email`)".to_string(),
                "COMMENT".to_string(),
            ]
        );
    }

    #[test]
    fn test_report_unchanged() {
        let plan = TablePlan::new("user");
        assert_eq!(plan.report(), "table `user`: no changes");
    }
}
