use crate::{
    BATCH_INDEX_KEY, Clause, Clauses, EntityDescriptor, Error, FieldDescriptor, JsonOperator,
    LockMode, Method, Result, Value, separated_by,
};
use std::collections::BTreeMap;

macro_rules! write_integer {
    ($out:ident, $value:expr) => {{
        let mut buffer = itoa::Buffer::new();
        $out.push_str(buffer.format($value));
    }};
}

/// SQL text with its positional parameters, in placeholder order.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// How index fields take part in a `WHERE` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexCondition {
    Skip,
    /// `` `col`=? `` with the value of the first record.
    Equal,
    /// `` `alias`.`col` IN (?, ..) `` with the values of every record, the table
    /// name stands in when there is no alias.
    In,
    /// Like [`IndexCondition::In`] but always qualified by the table name, for
    /// statements that do not declare the alias.
    InTable,
}

/// Value of one column inside an `INSERT` row or an `UPDATE` assignment.
#[derive(Debug)]
enum ColumnValue {
    Plain {
        expr: String,
        values: Vec<Value>,
    },
    /// Paths written inside a JSON document column.
    Json {
        entries: Vec<(&'static str, String)>,
        values: Vec<Value>,
    },
}

#[derive(Debug, Default)]
struct ColumnSet {
    entries: Vec<(&'static str, ColumnValue)>,
}

impl ColumnSet {
    fn add(&mut self, field: &FieldDescriptor, expr: String, value: Option<Value>) -> Result<()> {
        let position = self.entries.iter().position(|(c, _)| *c == field.column);
        match (field.json_path, position) {
            (Some(path), None) => self.entries.push((
                field.column,
                ColumnValue::Json {
                    entries: vec![(path, expr)],
                    values: value.into_iter().collect(),
                },
            )),
            (Some(path), Some(i)) => match &mut self.entries[i].1 {
                ColumnValue::Json { entries, values } => {
                    entries.push((path, expr));
                    values.extend(value);
                }
                ColumnValue::Plain { .. } => return Err(Self::mixed(field)),
            },
            (None, None) => self.entries.push((
                field.column,
                ColumnValue::Plain {
                    expr,
                    values: value.into_iter().collect(),
                },
            )),
            (None, Some(..)) => return Err(Self::mixed(field)),
        }
        Ok(())
    }

    fn mixed(field: &FieldDescriptor) -> Error {
        Error::Composition(format!(
            "column `{}` is mapped more than once (field `{}`)",
            field.column, field.name
        ))
    }

    fn get(&self, column: &str) -> Option<&ColumnValue> {
        self.entries
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v)
    }

    fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(c, _)| *c)
    }
}

/// Dialect printer composing statements out of an [`EntityDescriptor`].
///
/// Every method appends to `out` and pushes the parameters it binds to `params`
/// in placeholder order. Composition never mutates the descriptor.
pub trait SqlWriter: Send + Sync {
    fn as_dyn(&self) -> &dyn SqlWriter;

    /// Escape occurrences of `search` char with `replace` while copying into buffer.
    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    fn write_identifier_quoted(&self, out: &mut String, value: &str) {
        out.push('`');
        self.write_escaped(out, value, '`', "``");
        out.push('`');
    }

    fn write_string_quoted(&self, out: &mut String, value: &str) {
        out.push('\'');
        self.write_escaped(out, value, '\'', "''");
        out.push('\'');
    }

    /// `` `table`.`column` ``, or just the column when `table` is empty.
    fn write_column_ref(&self, out: &mut String, table: &str, column: &str) {
        if !table.is_empty() {
            self.write_identifier_quoted(out, table);
            out.push('.');
        }
        self.write_identifier_quoted(out, column);
    }

    fn write_placeholders(&self, out: &mut String, count: usize) {
        separated_by(out, 0..count, |out, _| out.push('?'), ", ");
    }

    /// Projection of one field in a select list.
    fn write_select_field(
        &self,
        out: &mut String,
        descriptor: &EntityDescriptor,
        field: &FieldDescriptor,
    ) {
        if field.raw {
            out.push_str(field.column);
        } else {
            let table = if descriptor.table.is_empty() || field.table.is_empty() {
                ""
            } else if field.table == descriptor.table {
                descriptor.alias.as_deref().unwrap_or(field.table.as_ref())
            } else {
                field.table.as_ref()
            };
            self.write_column_ref(out, table, field.column);
            if let Some(path) = field.json_path {
                out.push_str("->>");
                self.write_string_quoted(out, &format!("$.{path}"));
            }
        }
        if let Some(alias) = field.column_alias {
            out.push_str(" AS ");
            self.write_identifier_quoted(out, alias);
        }
    }

    fn write_from(&self, out: &mut String, descriptor: &EntityDescriptor) {
        if descriptor.table.is_empty() {
            return;
        }
        out.push_str(" FROM ");
        self.write_identifier_quoted(out, &descriptor.table);
        if let Some(alias) = &descriptor.alias {
            out.push_str(" AS ");
            self.write_identifier_quoted(out, alias);
        }
        for join in &descriptor.joins {
            out.push(' ');
            out.push_str(join);
        }
    }

    /// Conjunction of the index condition, the static where fragments and the filters.
    /// Writes nothing when there is no condition at all.
    fn write_condition(
        &self,
        out: &mut String,
        params: &mut Vec<Value>,
        descriptor: &EntityDescriptor,
        filters: &[Clause],
        index: IndexCondition,
    ) {
        let start = out.len();
        let rows = descriptor.row_count();
        match index {
            IndexCondition::Equal if descriptor.has_index() && rows > 0 => {
                out.push('(');
                separated_by(
                    out,
                    descriptor.index_fields(),
                    |out, field| {
                        self.write_identifier_quoted(out, field.column);
                        out.push_str("=?");
                        params.push(descriptor.value(0, field));
                    },
                    " AND ",
                );
                out.push(')');
            }
            IndexCondition::In | IndexCondition::InTable
                if descriptor.has_index() && rows > 0 =>
            {
                out.push('(');
                separated_by(
                    out,
                    descriptor.index_fields(),
                    |out, field| {
                        let table = if index == IndexCondition::In
                            && field.table == descriptor.table
                        {
                            descriptor.alias.as_deref().unwrap_or(field.table.as_ref())
                        } else {
                            field.table.as_ref()
                        };
                        self.write_column_ref(out, table, field.column);
                        out.push_str(" IN (");
                        self.write_placeholders(out, rows);
                        out.push(')');
                        params.extend((0..rows).map(|row| descriptor.value(row, field)));
                    },
                    " AND ",
                );
                out.push(')');
            }
            _ => {}
        }
        if !descriptor.static_wheres.is_empty() {
            if out.len() > start {
                out.push_str(" AND ");
            }
            out.push('(');
            separated_by(
                out,
                &descriptor.static_wheres,
                |out, v| out.push_str(v),
                " AND ",
            );
            out.push(')');
        }
        if !filters.is_empty() {
            if out.len() > start {
                out.push_str(" AND ");
            }
            write_filters(out, params, filters);
        }
    }

    fn write_where(
        &self,
        out: &mut String,
        params: &mut Vec<Value>,
        descriptor: &EntityDescriptor,
        filters: &[Clause],
        index: IndexCondition,
    ) -> bool {
        let mut condition = String::new();
        self.write_condition(&mut condition, params, descriptor, filters, index);
        if condition.is_empty() {
            return false;
        }
        out.push_str(" WHERE ");
        out.push_str(&condition);
        true
    }

    fn write_select(
        &self,
        out: &mut String,
        params: &mut Vec<Value>,
        descriptor: &EntityDescriptor,
        clauses: &Clauses,
    ) -> Result<()> {
        out.push_str("SELECT ");
        separated_by(
            out,
            &descriptor.fields,
            |out, field| self.write_select_field(out, descriptor, field),
            ", ",
        );
        self.write_from(out, descriptor);
        let index = if descriptor.variable_length {
            IndexCondition::Skip
        } else {
            IndexCondition::In
        };
        self.write_where(out, params, descriptor, &clauses.filters, index);
        self.write_grouping(out, clauses);
        if let Some(order_by) = &clauses.order_by {
            out.push_str(" ORDER BY ");
            out.push_str(order_by);
        }
        if descriptor.variable_length {
            if let Some(limit) = clauses.limit {
                out.push_str(" LIMIT ?");
                params.push(Value::UInt(limit));
            }
        } else if descriptor.row_count() == 1 {
            out.push_str(" LIMIT 1");
        } else {
            out.push_str(" LIMIT ?");
            params.push(Value::UInt(
                clauses.limit.unwrap_or(descriptor.row_count() as u64),
            ));
        }
        if let Some(offset) = clauses.offset {
            out.push_str(" OFFSET ?");
            params.push(Value::UInt(offset));
        }
        match clauses.lock {
            LockMode::None => {}
            LockMode::ForUpdate => out.push_str(" FOR UPDATE"),
            LockMode::Shared => out.push_str(" LOCK IN SHARE MODE"),
        }
        Ok(())
    }

    fn write_grouping(&self, out: &mut String, clauses: &Clauses) {
        if let Some(group_by) = &clauses.group_by {
            out.push_str(" GROUP BY ");
            out.push_str(group_by);
        }
        if let Some(having) = &clauses.having {
            out.push_str(" HAVING ");
            out.push_str(having);
        }
    }

    /// Counts rows, or groups when a `GROUP BY` is present by wrapping the grouped
    /// statement as `SELECT COUNT(1) FROM (..) AS c`.
    fn write_count(
        &self,
        out: &mut String,
        params: &mut Vec<Value>,
        descriptor: &EntityDescriptor,
        clauses: &Clauses,
    ) -> Result<()> {
        if descriptor.table.is_empty() {
            return Err(Error::MissingTable);
        }
        let grouped = clauses.group_by.is_some();
        if grouped {
            out.push_str("SELECT COUNT(1) FROM (");
        }
        out.push_str("SELECT COUNT(");
        out.push_str(descriptor.count_expr.unwrap_or("1"));
        out.push(')');
        self.write_from(out, descriptor);
        let index = if descriptor.variable_length {
            IndexCondition::Skip
        } else {
            IndexCondition::In
        };
        self.write_where(out, params, descriptor, &clauses.filters, index);
        self.write_grouping(out, clauses);
        if grouped {
            out.push_str(") AS c");
        }
        Ok(())
    }

    fn write_delete(
        &self,
        out: &mut String,
        params: &mut Vec<Value>,
        descriptor: &EntityDescriptor,
        clauses: &Clauses,
    ) -> Result<()> {
        if descriptor.table.is_empty() {
            return Err(Error::MissingTable);
        }
        out.push_str("DELETE FROM ");
        self.write_identifier_quoted(out, &descriptor.table);
        let index = if descriptor.variable_length {
            IndexCondition::Skip
        } else {
            IndexCondition::InTable
        };
        let conditioned = self.write_where(out, params, descriptor, &clauses.filters, index);
        if let Some(order_by) = &clauses.order_by {
            out.push_str(" ORDER BY ");
            out.push_str(order_by);
        }
        match clauses.limit {
            Some(limit) => {
                out.push_str(" LIMIT ");
                write_integer!(out, limit);
            }
            None if !conditioned => {
                return Err(Error::Composition(
                    "refusing to DELETE without any condition or LIMIT".into(),
                ));
            }
            None => {}
        }
        Ok(())
    }

    fn write_insert(
        &self,
        out: &mut String,
        params: &mut Vec<Value>,
        descriptor: &EntityDescriptor,
    ) -> Result<()> {
        if descriptor.table.is_empty() {
            return Err(Error::MissingTable);
        }
        let rows = descriptor.row_count();
        if rows == 0 {
            return Err(Error::Composition("there is no record to insert".into()));
        }
        let mut sets = Vec::with_capacity(rows);
        for row in 0..rows {
            sets.push(insert_columns(descriptor, row)?);
        }
        let columns: Vec<&'static str> = sets[0].columns().collect();
        if columns.is_empty() {
            return Err(Error::Composition("there is no column to insert".into()));
        }
        for (row, set) in sets.iter().enumerate().skip(1) {
            if set.entries.len() != columns.len() || set.columns().any(|c| !columns.contains(&c))
            {
                return Err(Error::HeterogeneousRows { row });
            }
        }
        out.push_str("INSERT INTO ");
        self.write_identifier_quoted(out, &descriptor.table);
        out.push_str(" (");
        separated_by(
            out,
            &columns,
            |out, column| self.write_identifier_quoted(out, column),
            ", ",
        );
        out.push_str(") VALUES ");
        separated_by(
            out,
            &sets,
            |out, set| {
                out.push('(');
                separated_by(
                    out,
                    &columns,
                    |out, column| {
                        if let Some(value) = set.get(column) {
                            write_column_value(self, out, params, column, value, false);
                        }
                    },
                    ", ",
                );
                out.push(')');
            },
            ", ",
        );
        self.write_upsert(out, descriptor, &columns);
        Ok(())
    }

    /// `ON DUPLICATE KEY UPDATE`, from the explicit column map or, when it is empty,
    /// `` `col`=VALUES(`col`) `` for every inserted column that is not an index.
    fn write_upsert(&self, out: &mut String, descriptor: &EntityDescriptor, columns: &[&str]) {
        if !descriptor.upsert {
            return;
        }
        if !descriptor.upsert_columns.is_empty() {
            out.push_str(" ON DUPLICATE KEY UPDATE ");
            separated_by(
                out,
                &descriptor.upsert_columns,
                |out, (column, expr)| {
                    self.write_identifier_quoted(out, column);
                    out.push('=');
                    out.push_str(expr);
                },
                ", ",
            );
            return;
        }
        let columns: Vec<_> = columns
            .iter()
            .filter(|c| !descriptor.index_fields().any(|f| f.column == **c))
            .collect();
        if columns.is_empty() {
            return;
        }
        out.push_str(" ON DUPLICATE KEY UPDATE ");
        separated_by(
            out,
            columns,
            |out, column| {
                self.write_identifier_quoted(out, column);
                out.push_str("=VALUES(");
                self.write_identifier_quoted(out, column);
                out.push(')');
            },
            ", ",
        );
    }

    fn write_update(
        &self,
        out: &mut String,
        params: &mut Vec<Value>,
        descriptor: &EntityDescriptor,
        clauses: &Clauses,
    ) -> Result<()> {
        if descriptor.table.is_empty() {
            return Err(Error::MissingTable);
        }
        match descriptor.row_count() {
            0 => Err(Error::Composition("there is no record to update".into())),
            1 => self.write_update_single(out, params, descriptor, clauses),
            _ => self.write_update_rows(out, params, descriptor, clauses),
        }
    }

    fn write_update_single(
        &self,
        out: &mut String,
        params: &mut Vec<Value>,
        descriptor: &EntityDescriptor,
        clauses: &Clauses,
    ) -> Result<()> {
        let set = update_columns(self, descriptor, 0)?;
        if set.entries.is_empty() && descriptor.set_clauses.is_empty() {
            return Err(Error::Composition("there is no column to update".into()));
        }
        out.push_str("UPDATE ");
        self.write_identifier_quoted(out, &descriptor.table);
        out.push_str(" SET ");
        separated_by(
            out,
            &set.entries,
            |out, (column, value)| {
                self.write_identifier_quoted(out, column);
                out.push('=');
                write_column_value(self, out, params, column, value, true);
            },
            ", ",
        );
        for clause in &descriptor.set_clauses {
            if !out.ends_with(" SET ") {
                out.push_str(", ");
            }
            out.push_str(&clause.template);
            params.extend(clause.values.iter().cloned());
        }
        let conditioned = self.write_where(
            out,
            params,
            descriptor,
            &clauses.filters,
            IndexCondition::Equal,
        );
        match clauses.limit {
            Some(limit) => {
                out.push_str(" LIMIT ");
                write_integer!(out, limit);
            }
            None if !conditioned => {
                return Err(Error::Composition(
                    "refusing to UPDATE without any condition or LIMIT".into(),
                ));
            }
            None => {}
        }
        Ok(())
    }

    /// One `CASE pivot WHEN .. THEN .. ELSE col END` per touched column, restricted
    /// to the pivot values of the records.
    fn write_update_rows(
        &self,
        out: &mut String,
        params: &mut Vec<Value>,
        descriptor: &EntityDescriptor,
        clauses: &Clauses,
    ) -> Result<()> {
        let pivot = descriptor.index_fields().next().ok_or(Error::MissingIndex)?;
        let rows = descriptor.row_count();
        let mut order: Vec<&'static str> = Vec::new();
        let mut sets: Vec<ColumnSet> = (0..rows).map(|_| ColumnSet::default()).collect();
        for field in descriptor
            .fields
            .iter()
            .filter(|f| descriptor.owns(f) && !f.is_index && !f.skip_on_update)
        {
            if !order.contains(&field.column) {
                order.push(field.column);
            }
            for (row, set) in sets.iter_mut().enumerate() {
                let value = descriptor.value(row, field);
                if !field.is_null(&value) {
                    let value = if field.is_clear(&value) {
                        field.zero_value()
                    } else {
                        value
                    };
                    set.add(field, update_expr(field), Some(value))?;
                } else if let Some(expr) = field.self_expr {
                    set.add(field, self_expr(self, field, expr), None)?;
                }
            }
        }
        order.retain(|column| sets.iter().any(|set| set.get(column).is_some()));
        if order.is_empty() && descriptor.set_clauses.is_empty() {
            return Err(Error::Composition("there is no column to update".into()));
        }
        out.push_str("UPDATE ");
        self.write_identifier_quoted(out, &descriptor.table);
        out.push_str(" SET ");
        separated_by(
            out,
            &order,
            |out, column| {
                self.write_identifier_quoted(out, column);
                out.push_str("=CASE ");
                self.write_identifier_quoted(out, pivot.column);
                for (row, set) in sets.iter().enumerate() {
                    if let Some(value) = set.get(column) {
                        out.push_str(" WHEN ? THEN ");
                        params.push(descriptor.value(row, pivot));
                        write_column_value(self, out, params, column, value, true);
                    }
                }
                out.push_str(" ELSE ");
                self.write_identifier_quoted(out, column);
                out.push_str(" END");
            },
            ", ",
        );
        for clause in &descriptor.set_clauses {
            if !out.ends_with(" SET ") {
                out.push_str(", ");
            }
            out.push_str(&clause.template);
            params.extend(clause.values.iter().cloned());
        }
        out.push_str(" WHERE ");
        self.write_identifier_quoted(out, pivot.column);
        out.push_str(" IN (");
        self.write_placeholders(out, rows);
        out.push(')');
        params.extend((0..rows).map(|row| descriptor.value(row, pivot)));
        if !descriptor.static_wheres.is_empty() {
            out.push_str(" AND (");
            separated_by(
                out,
                &descriptor.static_wheres,
                |out, v| out.push_str(v),
                " AND ",
            );
            out.push(')');
        }
        if !clauses.filters.is_empty() {
            out.push_str(" AND ");
            write_filters(out, params, &clauses.filters);
        }
        Ok(())
    }

    fn write_batch_insert(
        &self,
        out: &mut String,
        params: &mut Vec<Value>,
        descriptor: &EntityDescriptor,
    ) -> Result<()> {
        if descriptor.table.is_empty() {
            return Err(Error::MissingTable);
        }
        let columns = batch_columns(&descriptor.batch_rows)?;
        out.push_str("INSERT INTO ");
        self.write_identifier_quoted(out, &descriptor.table);
        out.push_str(" (");
        separated_by(
            out,
            &columns,
            |out, column| self.write_identifier_quoted(out, column),
            ", ",
        );
        out.push_str(") VALUES ");
        separated_by(
            out,
            &descriptor.batch_rows,
            |out, row| {
                out.push('(');
                self.write_placeholders(out, columns.len());
                out.push(')');
                params.extend(columns.iter().filter_map(|c| row.get(*c)).cloned());
            },
            ", ",
        );
        self.write_upsert(out, descriptor, &columns);
        Ok(())
    }

    fn write_batch_update(
        &self,
        out: &mut String,
        params: &mut Vec<Value>,
        descriptor: &EntityDescriptor,
    ) -> Result<()> {
        if descriptor.table.is_empty() {
            return Err(Error::MissingTable);
        }
        let pivot = descriptor.index_fields().next().ok_or(Error::MissingIndex)?;
        let columns = batch_columns(&descriptor.batch_rows)?;
        let mut pivots = Vec::with_capacity(descriptor.batch_rows.len());
        for (row, values) in descriptor.batch_rows.iter().enumerate() {
            match values.get(BATCH_INDEX_KEY) {
                Some(v) => pivots.push(v),
                None => {
                    return Err(Error::Composition(format!(
                        "batch row {row} has no `{BATCH_INDEX_KEY}` value"
                    )));
                }
            }
        }
        out.push_str("UPDATE ");
        self.write_identifier_quoted(out, &descriptor.table);
        out.push_str(" SET ");
        separated_by(
            out,
            &columns,
            |out, column| {
                self.write_identifier_quoted(out, column);
                out.push_str("=CASE ");
                self.write_identifier_quoted(out, pivot.column);
                for (values, key) in descriptor.batch_rows.iter().zip(&pivots) {
                    out.push_str(" WHEN ? THEN ?");
                    params.push((*key).clone());
                    params.push(values.get(*column).cloned().unwrap_or_default());
                }
                out.push_str(" ELSE ");
                self.write_identifier_quoted(out, column);
                out.push_str(" END");
            },
            ", ",
        );
        out.push_str(" WHERE ");
        self.write_identifier_quoted(out, pivot.column);
        out.push_str(" IN (");
        self.write_placeholders(out, pivots.len());
        out.push(')');
        params.extend(pivots.into_iter().cloned());
        Ok(())
    }

    /// Column definitions from the field schema fragments, then the table fragments.
    fn write_create_table(&self, out: &mut String, descriptor: &EntityDescriptor) -> Result<()> {
        if descriptor.table.is_empty() {
            return Err(Error::MissingTable);
        }
        let mut columns: Vec<(&str, &str)> = Vec::new();
        for field in descriptor.fields.iter().filter(|f| descriptor.owns(f)) {
            let Some(fragment) = field.schema_fragment else {
                continue;
            };
            if !columns.iter().any(|(c, _)| *c == field.column) {
                columns.push((field.column, fragment));
            }
        }
        if columns.is_empty() {
            return Err(Error::Composition(format!(
                "table `{}` has no field with a schema fragment",
                descriptor.table
            )));
        }
        out.push_str("CREATE TABLE IF NOT EXISTS ");
        self.write_identifier_quoted(out, &descriptor.table);
        out.push_str(" (");
        separated_by(
            out,
            &columns,
            |out, (column, fragment)| {
                self.write_identifier_quoted(out, column);
                out.push(' ');
                out.push_str(fragment);
            },
            ", ",
        );
        for fragment in &descriptor.schema_fragments {
            out.push_str(", ");
            out.push_str(fragment);
        }
        out.push_str(") ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci");
        Ok(())
    }

    /// Composes the statement for `method`. Mutating methods on a query-only
    /// descriptor fail with [`Error::QueryOnly`].
    fn compose(
        &self,
        method: Method,
        descriptor: &EntityDescriptor,
        clauses: &Clauses,
    ) -> Result<Statement> {
        if method.is_mutating() && descriptor.query_only {
            return Err(Error::QueryOnly(method));
        }
        let mut out = String::with_capacity(256);
        let mut params = Vec::new();
        match method {
            Method::Insert => self.write_insert(&mut out, &mut params, descriptor)?,
            Method::Select => self.write_select(&mut out, &mut params, descriptor, clauses)?,
            Method::Update => self.write_update(&mut out, &mut params, descriptor, clauses)?,
            Method::Delete => self.write_delete(&mut out, &mut params, descriptor, clauses)?,
            Method::Count => self.write_count(&mut out, &mut params, descriptor, clauses)?,
            Method::BatchInsert => self.write_batch_insert(&mut out, &mut params, descriptor)?,
            Method::BatchUpdate => self.write_batch_update(&mut out, &mut params, descriptor)?,
            Method::CreateTable => self.write_create_table(&mut out, descriptor)?,
        }
        Ok(Statement { sql: out, params })
    }
}

fn write_filters(out: &mut String, params: &mut Vec<Value>, filters: &[Clause]) {
    out.push('(');
    for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
            out.push(' ');
            out.push_str(&filter.operator.to_string());
            out.push(' ');
        }
        out.push_str(&filter.template);
        params.extend(filter.values.iter().cloned());
    }
    out.push(')');
}

/// `JSON_OBJECT('path', expr, ..)`
fn write_json_object<W: SqlWriter + ?Sized>(
    writer: &W,
    out: &mut String,
    entries: &[(&'static str, String)],
) {
    out.push_str("JSON_OBJECT(");
    separated_by(
        out,
        entries,
        |out, (path, expr)| {
            writer.write_string_quoted(out, path);
            out.push_str(", ");
            out.push_str(expr);
        },
        ", ",
    );
    out.push(')');
}

/// Writes the value of `column`. On update JSON paths are set inside the existing
/// document when it is valid, the parameters are then bound twice.
fn write_column_value<W: SqlWriter + ?Sized>(
    writer: &W,
    out: &mut String,
    params: &mut Vec<Value>,
    column: &str,
    value: &ColumnValue,
    update: bool,
) {
    match value {
        ColumnValue::Plain { expr, values } => {
            out.push_str(expr);
            params.extend(values.iter().cloned());
        }
        ColumnValue::Json { entries, values } if update => {
            out.push_str("IF(JSON_VALID(");
            writer.write_identifier_quoted(out, column);
            out.push_str("), JSON_SET(");
            writer.write_identifier_quoted(out, column);
            for (path, expr) in entries {
                out.push_str(", ");
                writer.write_string_quoted(out, &format!("$.{path}"));
                out.push_str(", ");
                out.push_str(expr);
            }
            out.push_str("), ");
            write_json_object(writer, out, entries);
            out.push(')');
            params.extend(values.iter().cloned());
            params.extend(values.iter().cloned());
        }
        ColumnValue::Json { entries, values } => {
            write_json_object(writer, out, entries);
            params.extend(values.iter().cloned());
        }
    }
}

/// Columns included for one record on insert: fields differing from their null
/// sentinel, fields always included, and the alternate value of the others.
fn insert_columns(descriptor: &EntityDescriptor, row: usize) -> Result<ColumnSet> {
    let mut set = ColumnSet::default();
    for field in descriptor.fields.iter().filter(|f| descriptor.owns(f)) {
        let mut value = descriptor.value(row, field);
        if field.is_null(&value) && !field.always_include {
            match &field.alt_value {
                Some(alt) => value = alt.clone(),
                None => continue,
            }
        }
        let expr = if field.json_path.is_some() && field.json_cast {
            "CAST(? AS JSON)"
        } else {
            "?"
        };
        set.add(field, expr.into(), Some(value))?;
    }
    Ok(set)
}

/// Placeholder of an assigned field, wrapped by its JSON operator.
fn update_expr(field: &FieldDescriptor) -> String {
    match field.json_operator() {
        Some(JsonOperator::Cast) => "CAST(? AS JSON)".into(),
        Some(JsonOperator::Merge(source)) => format!("JSON_MERGE({source}, ?)"),
        Some(JsonOperator::MergePreserve(source)) => format!("JSON_MERGE_PRESERVE({source}, ?)"),
        Some(JsonOperator::MergePatch(source)) => format!("JSON_MERGE_PATCH({source}, ?)"),
        Some(JsonOperator::ArrayAppend(source)) => format!("JSON_ARRAY_APPEND({source}, ?)"),
        None => "?".into(),
    }
}

fn self_expr<W: SqlWriter + ?Sized>(writer: &W, field: &FieldDescriptor, expr: &str) -> String {
    let mut out = String::new();
    writer.write_identifier_quoted(&mut out, field.column);
    out.push_str(expr);
    out
}

/// Fields assigned by the update of a single record.
fn update_columns<W: SqlWriter + ?Sized>(
    writer: &W,
    descriptor: &EntityDescriptor,
    row: usize,
) -> Result<ColumnSet> {
    let mut set = ColumnSet::default();
    for field in descriptor
        .fields
        .iter()
        .filter(|f| descriptor.owns(f) && !f.is_index && !f.skip_on_update)
    {
        if let Some(expr) = field.self_expr {
            set.add(field, self_expr(writer, field, expr), None)?;
            continue;
        }
        let value = descriptor.value(row, field);
        let cleared = field.is_clear(&value);
        if field.is_null(&value) && !field.ignore_null && !cleared {
            continue;
        }
        let value = if cleared { field.zero_value() } else { value };
        set.add(field, update_expr(field), Some(value))?;
    }
    Ok(set)
}

/// Sorted column names of the batch rows, `INDEX` excluded. Every row must expose them all.
fn batch_columns(rows: &[BTreeMap<String, Value>]) -> Result<Vec<&str>> {
    let Some(first) = rows.first() else {
        return Err(Error::Composition("there is no batch row".into()));
    };
    let columns: Vec<&str> = first
        .keys()
        .map(String::as_str)
        .filter(|k| *k != BATCH_INDEX_KEY)
        .collect();
    if columns.is_empty() {
        return Err(Error::Composition("batch rows have no column".into()));
    }
    for (row, values) in rows.iter().enumerate().skip(1) {
        let count = values.keys().filter(|k| *k != BATCH_INDEX_KEY).count();
        if count != columns.len() || columns.iter().any(|c| !values.contains_key(*c)) {
            return Err(Error::HeterogeneousRows { row });
        }
    }
    Ok(columns)
}

/// MySQL dialect: backtick identifiers, `JSON_*` functions and `ON DUPLICATE KEY UPDATE`.
#[derive(Default, Debug, Clone, Copy)]
pub struct MySqlWriter;

impl MySqlWriter {
    pub const fn new() -> Self {
        Self
    }
}

impl SqlWriter for MySqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }
}
