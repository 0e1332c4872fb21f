//! Forward-only row cursor over one page of column vectors

use super::cursor::ByteCursor;
use super::errors::{XrgError, XrgResult};
use super::types::{FLAG_INVALID, FLAG_NULL};
use super::value::{decode_item, skip_item, Value};
use super::vector::Vector;

/// One decoded row: a value and a flag byte per column.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<Value>,
    flags: Vec<u8>,
}

impl Row {
    pub fn new(values: Vec<Value>, flags: Vec<u8>) -> Self {
        Self { values, flags }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn flags(&self) -> &[u8] {
        &self.flags
    }

    pub fn get(&self, column: usize) -> Option<&Value> {
        self.values.get(column)
    }

    /// True when the column's NULL flag is set.
    pub fn is_null(&self, column: usize) -> bool {
        self.flags
            .get(column)
            .map(|f| f & FLAG_NULL != 0)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Comma-separated rendering, `NULL` for null-flagged columns.
impl std::fmt::Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            if self.is_null(i) {
                write!(f, "NULL")?;
            } else {
                write!(f, "{}", value)?;
            }
        }
        Ok(())
    }
}

/// Iterates the rows of a page.
///
/// Rows with the INVALID flag on any column are skipped. NULL and
/// EXCEPTION flags are reported through [`Row::flags`].
#[derive(Debug)]
pub struct RowIterator {
    vectors: Vec<Vector>,
    /// Read offset into each vector's data region
    positions: Vec<usize>,
    item_count: usize,
    /// Index of the next item to read
    next_index: usize,
    current: Option<Row>,
    started: bool,
    skipped: usize,
}

impl RowIterator {
    /// Builds an iterator over `vectors`, one per output column.
    ///
    /// # Errors
    ///
    /// `KITE_XRG_CORRUPTION` if there are no vectors or their item counts differ.
    pub fn new(vectors: Vec<Vector>) -> XrgResult<Self> {
        let first = vectors
            .first()
            .ok_or_else(|| XrgError::column_mismatch("page has no column vectors"))?;
        let item_count = first.item_count();
        if let Some((column, vector)) = vectors
            .iter()
            .enumerate()
            .find(|(_, v)| v.item_count() != item_count)
        {
            return Err(XrgError::column_mismatch(format!(
                "column {} has {} items, column 0 has {}",
                column,
                vector.item_count(),
                item_count
            )));
        }

        Ok(Self {
            positions: vec![0; vectors.len()],
            vectors,
            item_count,
            next_index: 0,
            current: None,
            started: false,
            skipped: 0,
        })
    }

    /// Moves to the next valid row. Returns false once the page is exhausted.
    pub fn advance(&mut self) -> XrgResult<bool> {
        self.started = true;
        while self.next_index < self.item_count {
            let index = self.next_index;
            self.next_index += 1;
            let row = self.read_row(index)?;
            if row.flags.iter().any(|f| f & FLAG_INVALID != 0) {
                self.skipped += 1;
                continue;
            }
            self.current = Some(row);
            return Ok(true);
        }
        self.current = None;
        Ok(false)
    }

    fn read_row(&mut self, index: usize) -> XrgResult<Row> {
        let mut values = Vec::with_capacity(self.vectors.len());
        let mut flags = Vec::with_capacity(self.vectors.len());
        for (vector, pos) in self.vectors.iter().zip(self.positions.iter_mut()) {
            let flag = vector.flags()[index];
            let mut cursor = ByteCursor::at(vector.data(), *pos)?;
            let value = if flag & (FLAG_NULL | FLAG_INVALID) != 0 {
                skip_item(&mut cursor, vector.header())?;
                Value::Null
            } else {
                decode_item(&mut cursor, vector.header())?
            };
            *pos = cursor.position();
            values.push(value);
            flags.push(flag);
        }
        Ok(Row { values, flags })
    }

    /// The row produced by the last successful [`advance`](Self::advance).
    pub fn current_row(&self) -> XrgResult<&Row> {
        match &self.current {
            Some(row) => Ok(row),
            None if !self.started => Err(XrgError::iterator_state(
                "current_row called before advance",
            )),
            None => Err(XrgError::iterator_state("iterator is exhausted")),
        }
    }

    /// Items per column, INVALID rows included.
    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn column_count(&self) -> usize {
        self.vectors.len()
    }

    /// INVALID rows passed over so far
    pub fn skipped_rows(&self) -> usize {
        self.skipped
    }

    pub fn is_exhausted(&self) -> bool {
        self.started && self.current.is_none()
    }
}
