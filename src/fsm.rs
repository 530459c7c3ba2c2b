//! The free-space map: an in-memory decoded view of a table's `.fsm` file,
//! one `u16` entry per heap page giving that page's insertable free space.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::Error;
use crate::page::PAGE_SIZE;

/// The entry value for a page holding zero records (`N=0`, `FSP=4`):
/// `8192 - 4 - 0 - 4`. No other value is ever treated as "empty" by scan.
pub const EMPTY_PAGE_SENTINEL: u16 = (PAGE_SIZE - 8) as u16;

#[derive(Debug, Clone, Default)]
pub struct Fsm {
    entries: Vec<u16>,
}

impl Fsm {
    pub fn decode(bytes: &[u8]) -> Result<Fsm, Error> {
        if bytes.len() % 2 != 0 {
            return Err(Error::Decode("fsm file length is not a multiple of 2".into()));
        }
        let mut entries = Vec::with_capacity(bytes.len() / 2);
        let mut c = std::io::Cursor::new(bytes);
        for _ in 0..(bytes.len() / 2) {
            entries.push(c.read_u16::<LittleEndian>().expect("length checked above"));
        }
        Ok(Fsm { entries })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.entries.len() * 2);
        for e in &self.entries {
            buf.write_u16::<LittleEndian>(*e).expect("writes to a Vec never fail");
        }
        buf
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, i: usize) -> Option<u16> {
        self.entries.get(i).copied()
    }

    /// Selects the first page whose entry can host a record of serialized
    /// size `s` (i.e. `fsm[i] >= s + 4`), scanning from index 0. Ties are
    /// broken by lowest index because the scan returns on first match.
    pub fn select_insertion_page(&self, s: usize) -> Option<usize> {
        let needed = s as i64 + 4;
        self.entries
            .iter()
            .position(|&entry| entry as i64 >= needed)
    }

    /// Updates the entry for page `i` after an insert of size `s`:
    /// `new = max(0, old - (s + 4))`.
    pub fn update_after_insert(&mut self, i: usize, s: usize) {
        let delta = s as i64 + 4;
        let old = self.entries[i] as i64;
        self.entries[i] = (old - delta).max(0) as u16;
    }

    /// Appends the entry for a newly-created page holding one record of
    /// size `s`: `8192 - 12 - s`.
    pub fn append_after_new_page(&mut self, s: usize) {
        let entry = PAGE_SIZE as i64 - 12 - s as i64;
        self.entries.push(entry.max(0) as u16);
    }
}

#[test]
fn test_fsm_round_trip() {
    let mut f = Fsm::default();
    f.append_after_new_page(100);
    f.append_after_new_page(200);
    let bytes = f.encode();
    let f2 = Fsm::decode(&bytes).unwrap();
    assert_eq!(f2.entry_count(), 2);
    assert_eq!(f2.get(0), Some((PAGE_SIZE - 12 - 100) as u16));
}

#[test]
fn test_select_insertion_page_lowest_index_wins() {
    let mut f = Fsm::default();
    f.append_after_new_page(0); // huge free space
    f.append_after_new_page(0); // also huge free space
    assert_eq!(f.select_insertion_page(10), Some(0));
}

#[test]
fn test_select_insertion_page_none_fits() {
    let mut f = Fsm::default();
    f.append_after_new_page(PAGE_SIZE - 20); // tiny free space left
    assert_eq!(f.select_insertion_page(PAGE_SIZE), None);
}

#[test]
fn test_update_after_insert_floors_at_zero() {
    let mut f = Fsm::default();
    f.append_after_new_page(0);
    let before = f.get(0).unwrap();
    f.update_after_insert(0, before as usize + 1000);
    assert_eq!(f.get(0), Some(0));
}

#[test]
fn test_empty_page_sentinel_value() {
    assert_eq!(EMPTY_PAGE_SENTINEL, 8184);
}
