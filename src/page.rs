//! Pure operations on a single slotted page buffer.
//!
//! Nothing in this module touches a file; the table manager owns reading a
//! page's bytes in from the heap file and writing them back out, and hands
//! this module an already-loaded `&[u8]`/`&mut Vec<u8>` to operate on.

use crate::error::Error;

pub const PAGE_SIZE: usize = 8192;
const HEADER_SIZE: usize = 4;
const SLOT_SIZE: usize = 4;

/// `(record count, free-space pointer)` read from a page's 4-byte header.
pub fn read_header(page: &[u8]) -> (u16, u16) {
    debug_assert_eq!(page.len(), PAGE_SIZE);
    let n = u16::from_le_bytes([page[0], page[1]]);
    let fsp = u16::from_le_bytes([page[2], page[3]]);
    (n, fsp)
}

fn write_header(page: &mut [u8], n: u16, fsp: u16) {
    page[0..2].copy_from_slice(&n.to_le_bytes());
    page[2..4].copy_from_slice(&fsp.to_le_bytes());
}

/// Bytes available on the page right now, without accounting for the slot
/// entry a future insert would also consume.
pub fn free_space(page: &[u8]) -> i32 {
    let (n, fsp) = read_header(page);
    PAGE_SIZE as i32 - fsp as i32 - n as i32 * SLOT_SIZE as i32
}

/// Insertable free space: `free_space` minus the 4 bytes a new slot entry
/// would need. This is the value kept in the FSM.
pub fn insertable_free_space(page: &[u8]) -> i32 {
    free_space(page) - SLOT_SIZE as i32
}

fn slot_at(page: &[u8], k: u16) -> (u16, u16) {
    let start = PAGE_SIZE - (k as usize + 1) * SLOT_SIZE;
    let length = u16::from_le_bytes([page[start], page[start + 1]]);
    let offset = u16::from_le_bytes([page[start + 2], page[start + 3]]);
    (length, offset)
}

/// Iterates the page's slot directory from the top of the page downward,
/// yielding each record's payload slice in insertion order (slot `k` is the
/// `(k+1)`-th record inserted).
pub fn iter_records(page: &[u8]) -> impl Iterator<Item = &[u8]> {
    let (n, _) = read_header(page);
    (0..n).map(move |k| {
        let (length, offset) = slot_at(page, k);
        &page[offset as usize..offset as usize + length as usize]
    })
}

/// Appends `payload` to a page that already has at least one record,
/// copying it at the current `FSP`, writing a new slot, and advancing the
/// header. Caller must have already checked `insertable_free_space`.
pub fn append_record(page: &mut [u8], payload: &[u8]) -> Result<(), Error> {
    let (n, fsp) = read_header(page);
    let s = payload.len();
    if insertable_free_space(page) < s as i32 {
        return Err(Error::Inconsistent(
            "page has insufficient free space for append".into(),
        ));
    }
    page[fsp as usize..fsp as usize + s].copy_from_slice(payload);
    let slot_start = PAGE_SIZE - (n as usize + 1) * SLOT_SIZE;
    page[slot_start..slot_start + 2].copy_from_slice(&(s as u16).to_le_bytes());
    page[slot_start + 2..slot_start + 4].copy_from_slice(&fsp.to_le_bytes());
    write_header(page, n + 1, fsp + s as u16);
    Ok(())
}

/// Builds a fresh page containing exactly one record: record count 1,
/// `FSP = 4 + S`, payload at offset 4, first slot at the page tail.
pub fn new_page(payload: &[u8]) -> Result<Vec<u8>, Error> {
    let s = payload.len();
    if s + HEADER_SIZE + SLOT_SIZE > PAGE_SIZE {
        return Err(Error::PlanInvalid(format!(
            "record of {s} bytes does not fit in an empty page"
        )));
    }
    let mut page = vec![0_u8; PAGE_SIZE];
    write_header(&mut page, 1, (HEADER_SIZE + s) as u16);
    page[HEADER_SIZE..HEADER_SIZE + s].copy_from_slice(payload);
    let slot_start = PAGE_SIZE - SLOT_SIZE;
    page[slot_start..slot_start + 2].copy_from_slice(&(s as u16).to_le_bytes());
    page[slot_start + 2..slot_start + 4].copy_from_slice(&(HEADER_SIZE as u16).to_le_bytes());
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_page_then_append() {
        let p1 = b"hello".to_vec();
        let mut page = new_page(&p1).unwrap();
        assert_eq!(read_header(&page), (1, 9));
        assert_eq!(free_space(&page), PAGE_SIZE as i32 - 9 - 4);
        assert_eq!(insertable_free_space(&page), PAGE_SIZE as i32 - 9 - 8);

        let p2 = b"world!".to_vec();
        append_record(&mut page, &p2).unwrap();
        assert_eq!(read_header(&page), (2, 15));

        let recs: Vec<&[u8]> = iter_records(&page).collect();
        assert_eq!(recs, vec![&p1[..], &p2[..]]);
    }

    #[test]
    fn test_append_rejects_when_out_of_space() {
        let payload = vec![0_u8; 100];
        let mut page = new_page(&payload).unwrap();
        let big = vec![0_u8; PAGE_SIZE];
        assert!(append_record(&mut page, &big).is_err());
    }

    #[test]
    fn test_slot_directory_and_payload_do_not_overlap() {
        let mut page = new_page(b"a").unwrap();
        for i in 0..50u8 {
            let rec = vec![i; 10];
            if insertable_free_space(&page) < rec.len() as i32 {
                break;
            }
            append_record(&mut page, &rec).unwrap();
        }
        let (n, fsp) = read_header(&page);
        assert!(fsp as usize <= PAGE_SIZE - 4 * n as usize);
    }

    #[test]
    fn test_oversize_record_rejected_by_new_page() {
        let big = vec![0_u8; PAGE_SIZE];
        assert!(new_page(&big).is_err());
    }
}
