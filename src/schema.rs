//! Schema: the ordered list of typed columns a table's records are built
//! from, and its on-disk encoding.
//!
//! Order is semantic — records are positional, indexed by column order —
//! so `Schema` is a plain `Vec<Column>`, not a name-keyed map.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

use crate::error::Error;
use crate::value::ColumnType;

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub col_type: ColumnType,
    /// Declared maximum character length; meaningful only for VARCHAR,
    /// zero otherwise. Advisory only: not enforced against inserted values.
    pub length: u16,
}

impl Column {
    pub fn new(name: impl Into<String>, col_type: ColumnType) -> Self {
        Column {
            name: name.into(),
            col_type,
            length: 0,
        }
    }

    pub fn varchar(name: impl Into<String>, length: u16) -> Self {
        Column {
            name: name.into(),
            col_type: ColumnType::Varchar,
            length,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    pub columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Schema { columns }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Serialises the schema: u16 column count, then per column a u16
    /// name-length, name bytes, u16 type tag, u16 length.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u16::<LittleEndian>(self.columns.len() as u16)
            .expect("writes to a Vec never fail");
        for col in &self.columns {
            let name_bytes = col.name.as_bytes();
            buf.write_u16::<LittleEndian>(name_bytes.len() as u16)
                .unwrap();
            buf.extend_from_slice(name_bytes);
            buf.write_u16::<LittleEndian>(col.col_type.to_tag()).unwrap();
            buf.write_u16::<LittleEndian>(col.length).unwrap();
        }
        buf
    }

    /// Inverse of `encode`. A truncated buffer is a fatal `Error::Decode`.
    pub fn decode(bytes: &[u8]) -> Result<Schema, Error> {
        let mut c = Cursor::new(bytes);
        let count = read_u16(&mut c)?;
        let mut columns = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name_len = read_u16(&mut c)?;
            let mut name_bytes = vec![0_u8; name_len as usize];
            c.read_exact(&mut name_bytes)
                .map_err(|_| Error::Decode("truncated schema: column name".into()))?;
            let name = String::from_utf8(name_bytes)
                .map_err(|_| Error::Decode("column name is not valid utf-8".into()))?;
            let tag = read_u16(&mut c)?;
            let col_type = ColumnType::from_tag(tag)?;
            let length = read_u16(&mut c)?;
            columns.push(Column {
                name,
                col_type,
                length,
            });
        }
        Ok(Schema { columns })
    }
}

fn read_u16(c: &mut Cursor<&[u8]>) -> Result<u16, Error> {
    c.read_u16::<LittleEndian>()
        .map_err(|_| Error::Decode("truncated schema buffer".into()))
}

#[test]
fn test_schema_round_trip() {
    let s = Schema::new(vec![
        Column::new("id", ColumnType::Int),
        Column::varchar("name", 32),
    ]);
    let bytes = s.encode();
    let s2 = Schema::decode(&bytes).unwrap();
    assert_eq!(s, s2);
}

#[test]
fn test_schema_decode_truncated_is_fatal() {
    let s = Schema::new(vec![Column::new("id", ColumnType::Int)]);
    let mut bytes = s.encode();
    bytes.truncate(bytes.len() - 1);
    assert!(matches!(Schema::decode(&bytes), Err(Error::Decode(_))));
}

#[test]
fn test_schema_empty() {
    let s = Schema::new(vec![]);
    let bytes = s.encode();
    assert_eq!(bytes, vec![0, 0]);
    assert_eq!(Schema::decode(&bytes).unwrap(), s);
}
