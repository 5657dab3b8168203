use crate::{Value, ValueKind};
use std::borrow::Cow;

/// Static registration of one field, emitted by `#[derive(Model)]`.
///
/// It holds the attributes exactly as written on the field, [`crate::extract`]
/// resolves them into a [`FieldDescriptor`].
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Rust identifier of the field.
    pub name: &'static str,
    pub kind: ValueKind,
    pub nullable: bool,
    /// Column name, or `table.column`.
    pub col: Option<&'static str>,
    /// Owning table, propagated to the following fields.
    pub table: Option<&'static str>,
    pub table_alias: Option<&'static str>,
    pub col_as: Option<&'static str>,
    pub index: bool,
    pub alt: Option<&'static str>,
    pub as_null: Option<&'static str>,
    pub as_clear: Option<&'static str>,
    pub filter: Option<&'static str>,
    pub join: Option<&'static str>,
    /// Path inside a JSON column, `column.path` or just `path`.
    pub json: Option<&'static str>,
    pub json_cast: bool,
    pub json_merge: Option<&'static str>,
    pub json_merge_preserve: Option<&'static str>,
    pub json_merge_patch: Option<&'static str>,
    pub json_array_append: Option<&'static str>,
    pub self_expr: Option<&'static str>,
    pub schema_field: Option<&'static str>,
    pub schema_table: Option<&'static str>,
    pub raw: bool,
    pub no_from: bool,
    pub init: bool,
    pub count_on: Option<&'static str>,
    pub pass_update: bool,
}

impl FieldDef {
    pub const DEFAULT: FieldDef = FieldDef {
        name: "",
        kind: ValueKind::Varchar,
        nullable: false,
        col: None,
        table: None,
        table_alias: None,
        col_as: None,
        index: false,
        alt: None,
        as_null: None,
        as_clear: None,
        filter: None,
        join: None,
        json: None,
        json_cast: false,
        json_merge: None,
        json_merge_preserve: None,
        json_merge_patch: None,
        json_array_append: None,
        self_expr: None,
        schema_field: None,
        schema_table: None,
        raw: false,
        no_from: false,
        init: false,
        count_on: None,
        pass_update: false,
    };
}

/// JSON operator applied to the bound value of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonOperator {
    /// `CAST(? AS JSON)`
    Cast,
    Merge(&'static str),
    MergePreserve(&'static str),
    MergePatch(&'static str),
    ArrayAppend(&'static str),
}

/// Resolved metadata of one mapped field.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: &'static str,
    /// Owning table, empty for raw expressions.
    pub table: Cow<'static, str>,
    pub column: &'static str,
    pub column_alias: Option<&'static str>,
    pub json_path: Option<&'static str>,
    pub json_cast: bool,
    pub json_merge_expr: Option<&'static str>,
    pub json_merge_preserve_expr: Option<&'static str>,
    pub json_merge_patch_expr: Option<&'static str>,
    pub json_array_append_expr: Option<&'static str>,
    pub null_sentinel: Value,
    pub alt_value: Option<Value>,
    pub clear_sentinel: Option<Value>,
    pub self_expr: Option<&'static str>,
    pub schema_fragment: Option<&'static str>,
    /// Position in `Model::fields()`, the link to the live value.
    pub value_slot: usize,
    pub kind: ValueKind,
    pub nullable: bool,
    pub is_index: bool,
    pub ignore_null: bool,
    pub skip_on_update: bool,
    pub always_include: bool,
    pub raw: bool,
}

impl FieldDescriptor {
    pub fn is_null(&self, value: &Value) -> bool {
        *value == self.null_sentinel
    }

    pub fn is_clear(&self, value: &Value) -> bool {
        self.clear_sentinel.as_ref().is_some_and(|v| v == value)
    }

    /// Zero value of the field type, bound when a field is cleared.
    pub fn zero_value(&self) -> Value {
        if self.nullable {
            Value::Null
        } else {
            self.kind.zero()
        }
    }

    /// JSON operator in priority order: cast, merge, merge preserve, merge patch, array append.
    pub fn json_operator(&self) -> Option<JsonOperator> {
        if self.json_cast {
            Some(JsonOperator::Cast)
        } else if let Some(v) = self.json_merge_expr {
            Some(JsonOperator::Merge(v))
        } else if let Some(v) = self.json_merge_preserve_expr {
            Some(JsonOperator::MergePreserve(v))
        } else if let Some(v) = self.json_merge_patch_expr {
            Some(JsonOperator::MergePatch(v))
        } else {
            self.json_array_append_expr.map(JsonOperator::ArrayAppend)
        }
    }
}
