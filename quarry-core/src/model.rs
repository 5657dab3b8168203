use crate::{Config, Error, FieldDef, Result, Value};

/// A record type mapped to a table, implemented by `#[derive(Model)]`.
pub trait Model: Default + Send + Sync {
    /// Table name from `#[quarry(table = "..")]`, or the type identifier.
    fn table_name() -> &'static str;

    /// Registered fields, in declaration order, omitted fields excluded.
    fn fields() -> &'static [FieldDef];

    /// Current value of the field at `slot`.
    fn value(&self, slot: usize) -> Value;

    /// Decodes a scanned column into the field at `slot`.
    fn decode(&mut self, slot: usize, raw: Option<&[u8]>, config: &Config) -> Result<()>;
}

/// Non owning access to the records a builder operates on.
pub trait ValueHandle: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn value(&self, row: usize, slot: usize) -> Value;

    /// Whether scanned rows can be written into the records.
    fn is_settable(&self) -> bool;

    fn decode(&mut self, row: usize, slot: usize, raw: Option<&[u8]>, config: &Config)
    -> Result<()>;

    /// Appends a default record and returns its row.
    fn push_default(&mut self) -> Result<usize>;
}

/// Caller records, borrowed for the lifetime of one builder.
pub enum Storage<'r, M> {
    Shared(&'r [M]),
    Exclusive(&'r mut [M]),
    Growable(&'r mut Vec<M>),
}

impl<M: Model> ValueHandle for Storage<'_, M> {
    fn len(&self) -> usize {
        match self {
            Storage::Shared(v) => v.len(),
            Storage::Exclusive(v) => v.len(),
            Storage::Growable(v) => v.len(),
        }
    }

    fn value(&self, row: usize, slot: usize) -> Value {
        let record = match self {
            Storage::Shared(v) => v.get(row),
            Storage::Exclusive(v) => v.get(row),
            Storage::Growable(v) => v.get(row),
        };
        record.map(|v| v.value(slot)).unwrap_or_default()
    }

    fn is_settable(&self) -> bool {
        !matches!(self, Storage::Shared(..))
    }

    fn decode(
        &mut self,
        row: usize,
        slot: usize,
        raw: Option<&[u8]>,
        config: &Config,
    ) -> Result<()> {
        let record = match self {
            Storage::Shared(..) => return Err(Error::NotSettable),
            Storage::Exclusive(v) => v.get_mut(row),
            Storage::Growable(v) => v.get_mut(row),
        };
        match record {
            Some(record) => record.decode(slot, raw, config),
            None => Err(Error::Composition(format!(
                "row {row} is beyond the destination length"
            ))),
        }
    }

    fn push_default(&mut self) -> Result<usize> {
        match self {
            Storage::Growable(v) => {
                v.push(M::default());
                Ok(v.len() - 1)
            }
            _ => Err(Error::NotAddressable),
        }
    }
}

/// Records ready for extraction.
pub struct Records<'r, M> {
    pub storage: Storage<'r, M>,
    /// Rows returned by a query are appended instead of written in place.
    pub growable: bool,
}

/// Conversion of a caller destination into [`Records`].
///
/// Implemented for slices and vectors here, `#[derive(Model)]` implements it for
/// `&T` and `&mut T`.
pub trait IntoRecords<'r> {
    type Model: Model;

    fn into_records(self) -> Result<Records<'r, Self::Model>>;
}

/// Marks a vector as variable length: a query appends one record per row and
/// does not bound the statement with an implicit `LIMIT`.
pub struct Growable<T>(pub T);

impl<'r, M: Model> IntoRecords<'r> for &'r [M] {
    type Model = M;
    fn into_records(self) -> Result<Records<'r, M>> {
        Ok(Records {
            storage: Storage::Shared(self),
            growable: false,
        })
    }
}

impl<'r, M: Model> IntoRecords<'r> for &'r mut [M] {
    type Model = M;
    fn into_records(self) -> Result<Records<'r, M>> {
        Ok(Records {
            storage: Storage::Exclusive(self),
            growable: false,
        })
    }
}

impl<'r, M: Model, const N: usize> IntoRecords<'r> for &'r mut [M; N] {
    type Model = M;
    fn into_records(self) -> Result<Records<'r, M>> {
        self.as_mut_slice().into_records()
    }
}

impl<'r, M: Model> IntoRecords<'r> for &'r Vec<M> {
    type Model = M;
    fn into_records(self) -> Result<Records<'r, M>> {
        self.as_slice().into_records()
    }
}

impl<'r, M: Model> IntoRecords<'r> for &'r mut Vec<M> {
    type Model = M;
    fn into_records(self) -> Result<Records<'r, M>> {
        self.as_mut_slice().into_records()
    }
}

impl<'r, M: Model> IntoRecords<'r> for Growable<&'r mut Vec<M>> {
    type Model = M;
    fn into_records(self) -> Result<Records<'r, M>> {
        Ok(Records {
            storage: Storage::Growable(self.0),
            growable: true,
        })
    }
}

macro_rules! impl_not_addressable {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl<'r, M: Model> IntoRecords<'r> for Growable<$ty> {
                type Model = M;
                fn into_records(self) -> Result<Records<'r, M>> {
                    Err(Error::NotAddressable)
                }
            }
        )+
    };
}
impl_not_addressable!(&'r Vec<M>, &'r [M], &'r mut [M]);
