use crate::{
    Clause, Error, FieldDef, FieldDescriptor, IntoRecords, Model, Records, Result, Value,
    ValueHandle,
};
use std::{borrow::Cow, collections::BTreeMap, fmt};

/// Key of a batch row holding the pivot value.
pub const BATCH_INDEX_KEY: &str = "INDEX";

/// Schema and value metadata of one record or of a homogeneous batch of records.
pub struct EntityDescriptor<'r> {
    /// Empty when the descriptor has no `FROM` table.
    pub table: Cow<'static, str>,
    pub alias: Option<Cow<'static, str>>,
    pub count_expr: Option<&'static str>,
    /// Fixed at extraction, never reordered.
    pub fields: Vec<FieldDescriptor>,
    /// Positions into `fields`.
    pub index_fields: Vec<usize>,
    pub joins: Vec<Cow<'static, str>>,
    pub static_wheres: Vec<&'static str>,
    pub set_clauses: Vec<Clause>,
    pub query_only: bool,
    pub batch_rows: Vec<BTreeMap<String, Value>>,
    pub schema_fragments: Vec<Cow<'static, str>>,
    pub upsert: bool,
    pub upsert_columns: BTreeMap<String, String>,
    pub variable_length: bool,
    pub storage: Box<dyn ValueHandle + 'r>,
}

impl<'r> EntityDescriptor<'r> {
    /// Number of records behind the descriptor.
    pub fn row_count(&self) -> usize {
        self.storage.len()
    }

    pub fn value(&self, row: usize, field: &FieldDescriptor) -> Value {
        self.storage.value(row, field.value_slot)
    }

    pub fn index_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.index_fields.iter().map(|&i| &self.fields[i])
    }

    pub fn has_index(&self) -> bool {
        !self.index_fields.is_empty()
    }

    /// Field belongs to the descriptor table, the only ones written by insert and update.
    pub fn owns(&self, field: &FieldDescriptor) -> bool {
        !field.raw && field.table == self.table
    }

    /// Promotes the field at `position` to index field.
    pub fn index_with(&mut self, position: usize) -> Result<()> {
        let field = self.fields.get_mut(position).ok_or_else(|| {
            Error::Extraction(format!("index_with: there is no field at position {position}"))
        })?;
        field.is_index = true;
        if !self.index_fields.contains(&position) {
            self.index_fields.push(position);
        }
        Ok(())
    }

    /// Assigns the field at `position` on update even when it holds its null sentinel.
    pub fn ignore_null(&mut self, position: usize) -> Result<()> {
        let field = self.fields.get_mut(position).ok_or_else(|| {
            Error::Extraction(format!("ignore_null: there is no field at position {position}"))
        })?;
        field.ignore_null = true;
        Ok(())
    }

    /// Renames the descriptor table together with every field owned by it.
    pub fn retarget(&mut self, table: impl Into<Cow<'static, str>>) {
        let table = table.into();
        for field in self.fields.iter_mut() {
            if !field.raw && field.table == self.table {
                field.table = table.clone();
            }
        }
        self.table = table;
    }
}

impl fmt::Debug for EntityDescriptor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("table", &self.table)
            .field("alias", &self.alias)
            .field("fields", &self.fields)
            .field("index_fields", &self.index_fields)
            .field("joins", &self.joins)
            .field("static_wheres", &self.static_wheres)
            .field("query_only", &self.query_only)
            .field("row_count", &self.row_count())
            .field("variable_length", &self.variable_length)
            .finish_non_exhaustive()
    }
}

/// Splits `table.column` into its two parts.
fn split_owner(text: &'static str) -> (Option<&'static str>, &'static str) {
    match text.split_once('.') {
        Some((table, column)) => (Some(table), column),
        None => (None, text),
    }
}

fn literal(def: &FieldDef, literal: Option<&'static str>) -> Result<Option<Value>> {
    literal
        .map(|v| {
            def.kind.parse_literal(v).map_err(|e| match e {
                Error::Extraction(message) => {
                    Error::Extraction(format!("field `{}`: {message}", def.name))
                }
                e => e,
            })
        })
        .transpose()
}

/// Builds the descriptor of `records` from the static registration of its model.
///
/// Table resolution for each field: a `table.column` column owns its field without
/// affecting the others, then the `table` attribute which also applies to the
/// following fields, then the table of the previous field (the model table for
/// the first one). The descriptor table is the one resolved for the first field.
pub fn extract<'r, R: IntoRecords<'r>>(records: R) -> Result<EntityDescriptor<'r>>
where
    R::Model: 'r,
{
    let Records { storage, growable } = records.into_records()?;
    if !growable && storage.is_empty() {
        return Err(Error::EmptyDataset);
    }
    let defs = R::Model::fields();
    if defs.is_empty() {
        return Err(Error::Extraction(format!(
            "`{}` does not register any field",
            R::Model::table_name()
        )));
    }
    let mut descriptor = EntityDescriptor {
        table: Cow::Borrowed(""),
        alias: None,
        count_expr: None,
        fields: Vec::with_capacity(defs.len()),
        index_fields: Vec::new(),
        joins: Vec::new(),
        static_wheres: Vec::new(),
        set_clauses: Vec::new(),
        query_only: false,
        batch_rows: Vec::new(),
        schema_fragments: Vec::new(),
        upsert: false,
        upsert_columns: BTreeMap::new(),
        variable_length: growable,
        storage: Box::new(storage),
    };
    let mut previous = R::Model::table_name();
    let mut no_from = false;
    for (slot, def) in defs.iter().enumerate() {
        let (owner, column) = split_owner(def.col.unwrap_or(def.name));
        if let Some(table) = def.table {
            previous = table;
        }
        let mut table = owner.unwrap_or(previous);
        if slot == 0 {
            descriptor.table = Cow::Borrowed(previous);
            descriptor.alias = def.table_alias.map(Cow::Borrowed);
        } else if descriptor.alias.is_none() && def.table_alias.is_some() {
            descriptor.alias = def.table_alias.map(Cow::Borrowed);
        }
        let mut column = column;
        let mut json_path = None;
        if let Some(json) = def.json {
            let (json_column, path) = split_owner(json);
            if let Some(json_column) = json_column {
                column = json_column;
            }
            json_path = Some(path);
        }
        if def.raw {
            descriptor.query_only = true;
            column = def.col.unwrap_or(def.name);
            table = "";
        }
        no_from |= def.no_from;
        if let Some(join) = def.join {
            descriptor.joins.push(Cow::Borrowed(join));
        }
        if let Some(filter) = def.filter {
            descriptor.static_wheres.push(filter);
        }
        if let Some(schema) = def.schema_table {
            descriptor.schema_fragments.push(Cow::Borrowed(schema));
        }
        if descriptor.count_expr.is_none() {
            descriptor.count_expr = def.count_on;
        }
        let null_sentinel = match literal(def, def.as_null)? {
            Some(v) => v,
            None if def.nullable => Value::Null,
            None => def.kind.zero(),
        };
        let field = FieldDescriptor {
            name: def.name,
            table: Cow::Borrowed(table),
            column,
            column_alias: def.col_as,
            json_path,
            json_cast: def.json_cast,
            json_merge_expr: def.json_merge,
            json_merge_preserve_expr: def.json_merge_preserve,
            json_merge_patch_expr: def.json_merge_patch,
            json_array_append_expr: def.json_array_append,
            null_sentinel,
            alt_value: literal(def, def.alt)?,
            clear_sentinel: literal(def, def.as_clear)?,
            self_expr: def.self_expr,
            schema_fragment: def.schema_field,
            value_slot: slot,
            kind: def.kind,
            nullable: def.nullable,
            is_index: def.index,
            ignore_null: false,
            skip_on_update: def.pass_update,
            always_include: def.init,
            raw: def.raw,
        };
        if field.is_index {
            descriptor.index_fields.push(descriptor.fields.len());
        }
        descriptor.fields.push(field);
    }
    if no_from {
        descriptor.query_only = true;
        descriptor.table = Cow::Borrowed("");
    }
    Ok(descriptor)
}
