//! Per-table reconciliation: decides create vs. alter, runs the diff, applies the
//! safety gates and hands the assembled plan to the applier.

use std::collections::HashSet;

use log::{debug, info, warn};

use crate::db::DbClient;
use crate::errors::{DbError, RuleError};
use crate::models::connections::{DbType, SyncOptions};
use crate::models::definition::TableDefinition;
use crate::models::plan::{
    ChangeKind, IndexAction, IndexOp, SyncCounters, TableOutcome, TablePlan,
};
use crate::models::rule::FieldRule;
use crate::models::schema::{ColumnInfo, TableSchema};

use super::applier::PlanApplier;
use super::ddl::{
    index_name, is_pg_compatible_type_change, DdlBuilder, SYSTEM_COMMENTS, SYSTEM_INDEX_FIELDS,
};
use super::diff::{compare, DiffContext};
use super::type_map::is_string_family;
use super::validator::validate_field;

pub struct TableSync<'a> {
    client: &'a dyn DbClient,
    options: &'a SyncOptions,
}

impl<'a> TableSync<'a> {
    pub fn new(client: &'a dyn DbClient, options: &'a SyncOptions) -> Self {
        Self { client, options }
    }

    /// Syncs one table. Nothing is executed if planning fails.
    pub async fn sync(&self, def: &TableDefinition) -> Result<TableOutcome, DbError> {
        let dialect = self.client.dialect();
        let fields = parse_fields(def, dialect)?;
        let ddl = DdlBuilder::new(dialect, &def.table, self.options);

        let (plan, counters) = if self.client.table_exists(&def.table).await? {
            let schema = TableSchema {
                table_name: def.table.clone(),
                columns: self.client.get_columns(&def.table).await?,
                indexes: self.client.get_indexes(&def.table).await?,
            };
            debug!(
                "{}: {} columns, {} indexes introspected",
                def.table,
                schema.columns.len(),
                schema.indexes.len()
            );
            plan_reconcile(&ddl, self.options, &fields, &schema)?
        } else {
            plan_create(&ddl, self.options, &fields, def.comment.as_deref())
        };

        let statements = PlanApplier::new(self.client, self.options.plan)
            .apply(&ddl, &plan)
            .await?;

        Ok(TableOutcome {
            plan,
            counters,
            statements,
        })
    }
}

/// Parses every rule of a definition; the first bad field aborts the table.
pub fn parse_fields(
    def: &TableDefinition,
    dialect: DbType,
) -> Result<Vec<(String, FieldRule)>, RuleError> {
    let mut seen = HashSet::new();
    def.fields
        .iter()
        .map(|(field, raw)| {
            if !seen.insert(field.as_str()) {
                return Err(RuleError::new(&def.table, field, "duplicate column key"));
            }
            validate_field(&def.table, field, raw, dialect).map(|rule| (field.clone(), rule))
        })
        .collect()
}

/// Plan for a table that does not exist yet.
pub fn plan_create(
    ddl: &DdlBuilder,
    options: &SyncOptions,
    fields: &[(String, FieldRule)],
    comment: Option<&str>,
) -> (TablePlan, SyncCounters) {
    let table = ddl.table();
    let mut plan = TablePlan::new(table);
    let mut counters = SyncCounters::default();

    plan.create_statement = Some(ddl.create_table_sql(fields, comment));
    counters.tables_created += 1;
    info!("{}: new table with {} fields", table, fields.len());

    if ddl.dialect() == DbType::Postgres && options.pg_comments {
        if let Some(comment) = comment {
            plan.comment_actions.push(ddl.table_comment_sql(comment));
        }
        for (column, text) in SYSTEM_COMMENTS {
            plan.comment_actions.push(ddl.column_comment_sql(column, text));
        }
        for (field, rule) in fields.iter().filter(|(_, rule)| !rule.name.is_empty()) {
            plan.comment_actions
                .push(ddl.column_comment_sql(field, &rule.name));
        }
    }

    let mut indexed: Vec<&str> = SYSTEM_INDEX_FIELDS.to_vec();
    indexed.extend(
        fields
            .iter()
            .filter(|(_, rule)| rule.index)
            .map(|(field, _)| field.as_str()),
    );
    for field in indexed {
        plan.index_actions
            .push(index_action(IndexOp::Create, table, field));
        counters.index_create += 1;
    }

    plan.changed = plan.has_actions();
    (plan, counters)
}

/// Plan for an existing table, given its live snapshot.
pub fn plan_reconcile(
    ddl: &DdlBuilder,
    options: &SyncOptions,
    fields: &[(String, FieldRule)],
    schema: &TableSchema,
) -> Result<(TablePlan, SyncCounters), DbError> {
    let table = ddl.table();
    let mut plan = TablePlan::new(table);
    let mut counters = SyncCounters::default();
    let pg_comments = ddl.dialect() == DbType::Postgres && options.pg_comments;

    for (field, rule) in fields {
        match schema.columns.get(field) {
            Some(existing) => reconcile_column(
                ddl,
                options,
                field,
                rule,
                existing,
                &mut plan,
                &mut counters,
            )?,
            None => {
                plan.add_clauses.extend(ddl.ddl_clause(field, rule, true));
                counters.add_fields += 1;
                info!("{}.{}: new field ({})", table, field, rule.field_type);
                if pg_comments && !rule.name.is_empty() {
                    plan.comment_actions
                        .push(ddl.column_comment_sql(field, &rule.name));
                }
            }
        }
    }

    reconcile_indexes(table, fields, schema, &mut plan, &mut counters);

    // A skipped shrink alone leaves the table unchanged.
    plan.changed = plan.has_actions();
    Ok((plan, counters))
}

fn reconcile_column(
    ddl: &DdlBuilder,
    options: &SyncOptions,
    field: &str,
    rule: &FieldRule,
    existing: &ColumnInfo,
    plan: &mut TablePlan,
    counters: &mut SyncCounters,
) -> Result<(), DbError> {
    let table = ddl.table();
    let dialect = ddl.dialect();
    let ctx = DiffContext {
        dialect,
        comments: options.pg_comments,
    };
    let changes = compare(&ctx, existing, rule);
    if changes.is_empty() {
        return Ok(());
    }

    for change in &changes {
        info!(
            "{}.{} {}: {} -> {}",
            table,
            field,
            change.kind.label(),
            change.current,
            change.new
        );
        counters.record(change.kind);
    }
    let has = |kind: ChangeKind| changes.iter().any(|c| c.kind == kind);

    if let Some(change) = changes.iter().find(|c| c.kind == ChangeKind::Datatype) {
        if is_string_family(&change.current) && is_string_family(&change.new) {
            info!(
                "{}.{}: string/array type change {} -> {} allowed",
                table, field, change.current, change.new
            );
        } else if dialect == DbType::Postgres
            && is_pg_compatible_type_change(&change.current, &change.new)
        {
            info!(
                "{}.{}: compatible type change {} -> {} allowed",
                table, field, change.current, change.new
            );
        } else {
            return Err(DbError::TypeChange {
                table: table.to_string(),
                column: field.to_string(),
                current: change.current.clone(),
                target: change.new.clone(),
            });
        }
    }

    let mut modified = false;
    if has(ChangeKind::Datatype) || has(ChangeKind::Length) {
        let shrink = match (existing.length, rule.length()) {
            (Some(current), Some(new)) => new < current,
            _ => false,
        };
        if shrink && !options.allow_shrink {
            warn!(
                "{}.{}: shrinking length from {} to {} skipped, set SYNC_ALLOW_SHRINK=1 to apply it",
                table,
                field,
                existing.length.unwrap_or_default(),
                rule.length().unwrap_or_default()
            );
        } else if let Some(clause) = ddl.ddl_clause(field, rule, false) {
            plan.modify_clauses.push(clause);
            modified = true;
        } else {
            warn!(
                "{}.{}: {} cannot alter an existing column in place, type/length change skipped",
                table,
                field,
                dialect.name()
            );
        }
    }

    if has(ChangeKind::Default) && !(modified && ddl.modify_restates_default()) {
        match ddl.default_clause(field, rule, &existing.data_type) {
            Some(clause) => plan.default_clauses.push(clause),
            None if dialect == DbType::Sqlite => warn!(
                "{}.{}: sqlite cannot alter a column default in place, default change skipped",
                table, field
            ),
            None => {}
        }
    }

    if let Some(change) = changes.iter().find(|c| c.kind == ChangeKind::Comment) {
        plan.comment_actions
            .push(ddl.column_comment_sql(field, &change.new));
    }

    Ok(())
}

fn reconcile_indexes(
    table: &str,
    fields: &[(String, FieldRule)],
    schema: &TableSchema,
    plan: &mut TablePlan,
    counters: &mut SyncCounters,
) {
    for field in SYSTEM_INDEX_FIELDS {
        if schema.columns.contains_key(field)
            && !schema.indexes.contains_key(&index_name(table, field))
        {
            info!("{}.{}: creating system index", table, field);
            plan.index_actions
                .push(index_action(IndexOp::Create, table, field));
            counters.index_create += 1;
        }
    }

    for (field, rule) in fields {
        let name = index_name(table, field);
        if rule.index && !schema.indexes.contains_key(&name) {
            info!("{}.{}: creating index {}", table, field, name);
            plan.index_actions
                .push(index_action(IndexOp::Create, table, field));
            counters.index_create += 1;
        } else if !rule.index && schema.has_single_column_index(&name, field) {
            info!("{}.{}: dropping index {}", table, field, name);
            plan.index_actions
                .push(index_action(IndexOp::Drop, table, field));
            counters.index_drop += 1;
        }
    }
}

fn index_action(action: IndexOp, table: &str, field: &str) -> IndexAction {
    IndexAction {
        action,
        index_name: index_name(table, field),
        field_name: field.to_string(),
    }
}
