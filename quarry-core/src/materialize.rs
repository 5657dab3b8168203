use crate::{Config, EntityDescriptor, Error, Result, RowStream};
use futures::TryStreamExt;

/// Writes every row of `rows` into the records behind `descriptor`, returning how many
/// records were written.
///
/// Columns are matched to fields by position. A variable length destination grows by one
/// default record per row, a fixed one is filled in place and the rows exceeding its
/// length are discarded. The first decoding failure aborts the remaining rows.
pub async fn materialize(
    descriptor: &mut EntityDescriptor<'_>,
    mut rows: RowStream<'_>,
    config: &Config,
) -> Result<usize> {
    if !descriptor.storage.is_settable() {
        return Err(Error::NotSettable);
    }
    let capacity = descriptor.row_count();
    let mut written = 0;
    while let Some(row) = rows.try_next().await? {
        let target = if descriptor.variable_length {
            descriptor.storage.push_default()?
        } else if written < capacity {
            written
        } else {
            log::trace!("Discarding rows beyond the {capacity} destination records");
            break;
        };
        for (i, field) in descriptor.fields.iter().enumerate() {
            descriptor
                .storage
                .decode(target, field.value_slot, row.column(i), config)
                .map_err(|e| match e {
                    Error::Scan { reason, .. } => Error::Scan {
                        column: field.column.to_string(),
                        reason,
                    },
                    e => e,
                })?;
        }
        written += 1;
    }
    Ok(written)
}
