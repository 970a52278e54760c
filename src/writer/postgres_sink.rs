//! A `RowSink` backed by a real PostgreSQL connection, using the
//! `postgres` crate's binary `COPY` API. Gated behind the `postgres`
//! feature so the rest of the crate (and its tests) never require a
//! running database.

use postgres::{Client, CopyInWriter};
use std::io::Write;

use super::{OutputRow, RowSink, WriterError};

impl From<postgres::Error> for WriterError {
    fn from(err: postgres::Error) -> WriterError {
        WriterError::Db(err.to_string())
    }
}

pub struct PostgresSink<'a> {
    copy: Option<CopyInWriter<'a>>,
}

impl<'a> PostgresSink<'a> {
    /// Starts a `COPY <table> (id, tags, geom, srid) FROM STDIN` stream on
    /// the given client. The caller owns transaction scope.
    pub fn begin(client: &'a mut Client, table: &str) -> Result<PostgresSink<'a>, WriterError> {
        let sql = format!("COPY {} (id, tags, geom, srid) FROM STDIN", table);
        let copy = client.copy_in(&sql)?;
        Ok(PostgresSink { copy: Some(copy) })
    }
}

impl<'a> RowSink for PostgresSink<'a> {
    fn write_row(&mut self, row: &OutputRow) -> Result<(), WriterError> {
        let geometry = std::str::from_utf8(&row.geometry_hex)
            .map_err(|_| WriterError::Db("geometry column is not valid hex ASCII".to_string()))?;
        let line = format!(
            "{}\t{}\t{}\t{}\n",
            row.id,
            super::copy_text::format_hstore(&row.tags),
            geometry,
            row.srid,
        );
        let copy = self.copy.as_mut().ok_or_else(|| WriterError::Db("COPY stream already finished".to_string()))?;
        copy.write_all(line.as_bytes())?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), WriterError> {
        if let Some(copy) = self.copy.take() {
            copy.finish()?;
        }
        Ok(())
    }
}
