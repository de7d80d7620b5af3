use std::io::{self, Write};

const SEP: char = ',';

fn needs_quotes(field: &str) -> bool {
    field.contains(SEP) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Writes one CSV row, quoting fields that need it.
pub fn write_row<W: Write, S: AsRef<str>>(mut w: W, row: &[S]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, "{SEP}")?;
        }
        let cell = cell.as_ref();
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    writeln!(w)
}

pub fn to_csv_bytes<S: AsRef<str>>(headers: &[&str], rows: &[Vec<S>]) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    write_row(&mut out, headers)?;
    for row in rows {
        write_row(&mut out, row)?;
    }
    Ok(out)
}
