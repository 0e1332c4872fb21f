//! Row output for the CLI
//!
//! - One comma-separated line per row on stdout
//! - `NULL` for null-flagged columns
//! - A trailing `(N rows)` line

use std::io::Write;

use crate::xrg::Row;

use super::errors::CliResult;

pub fn write_row<W: Write>(out: &mut W, row: &Row) -> CliResult<()> {
    writeln!(out, "{}", row)?;
    Ok(())
}

pub fn write_row_count<W: Write>(out: &mut W, count: u64) -> CliResult<()> {
    let noun = if count == 1 { "row" } else { "rows" };
    writeln!(out, "({} {})", count, noun)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xrg::{Value, FLAG_NULL};

    #[test]
    fn test_row_line() {
        let row = Row::new(
            vec![Value::Int32(1), Value::Null, Value::String("x".into())],
            vec![0, FLAG_NULL, 0],
        );
        let mut out = Vec::new();
        write_row(&mut out, &row).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1,NULL,x\n");
    }

    #[test]
    fn test_row_count_line() {
        let mut out = Vec::new();
        write_row_count(&mut out, 1).unwrap();
        write_row_count(&mut out, 4).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "(1 row)\n(4 rows)\n");
    }
}
