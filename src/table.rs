//! Orchestrates table creation, inserts, and scans across a table's three
//! files, enforcing the FSM-to-page free-space invariant.
//!
//! One `FileStore` serves many tables, each spread across a
//! `<name>.schema` / `<name>.table` / `<name>.fsm` triple.

use std::path::Path;

use crate::error::Error;
use crate::file_store::FileStore;
use crate::fsm::{Fsm, EMPTY_PAGE_SENTINEL};
use crate::page::{self, PAGE_SIZE};
use crate::plan::{self, FilterSpec};
use crate::record::{self, Record};
use crate::schema::Schema;

fn schema_file(name: &str) -> String {
    format!("{name}.schema")
}
fn table_file(name: &str) -> String {
    format!("{name}.table")
}
fn fsm_file(name: &str) -> String {
    format!("{name}.fsm")
}

/// The engine's public facade: the only type an HTTP or CLI
/// collaborator needs to drive.
pub struct Engine {
    store: FileStore,
}

impl Engine {
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Engine, Error> {
        Ok(Engine {
            store: FileStore::open(data_dir)?,
        })
    }

    /// Creates `name`'s three files. Fails with `AlreadyExists` if any of
    /// them already exists; in that case no file is modified.
    pub fn create_table(&mut self, name: &str, schema: Schema) -> Result<(), Error> {
        let (sf, tf, ff) = (schema_file(name), table_file(name), fsm_file(name));
        for f in [&sf, &tf, &ff] {
            if self.store.exists(f) {
                return Err(Error::AlreadyExists(name.to_string()));
            }
        }
        self.store.create(&sf)?;
        self.store.create(&tf)?;
        self.store.create(&ff)?;
        self.store.write_at(&sf, 0, &schema.encode())?;
        log::debug!("created table {name}");
        Ok(())
    }

    /// Reads and decodes `name`'s schema file. `NotFound` if it is absent.
    pub fn get_table_schema(&mut self, name: &str) -> Result<Schema, Error> {
        let bytes = self.store.read_all(&schema_file(name)).map_err(|e| match e {
            Error::NotFound(_) => Error::NotFound(format!("table {name} does not exist")),
            other => other,
        })?;
        Schema::decode(&bytes)
    }

    fn load_fsm(&mut self, name: &str) -> Result<Fsm, Error> {
        Fsm::decode(&self.store.read_all(&fsm_file(name))?)
    }

    fn check_heap_fsm_consistency(&mut self, name: &str, fsm: &Fsm) -> Result<(), Error> {
        let heap_size = self.store.size(&table_file(name))?;
        if heap_size % PAGE_SIZE as u64 != 0 {
            log::warn!(
                "table {name}: heap file size {heap_size} is not a multiple of the page size"
            );
            return Err(Error::Inconsistent(format!(
                "heap file size {heap_size} is not a multiple of the page size"
            )));
        }
        let page_count = (heap_size / PAGE_SIZE as u64) as usize;
        if page_count != fsm.entry_count() {
            log::warn!(
                "table {name}: fsm has {} entries but heap has {page_count} pages",
                fsm.entry_count()
            );
            return Err(Error::Inconsistent(format!(
                "fsm has {} entries but heap has {page_count} pages",
                fsm.entry_count()
            )));
        }
        Ok(())
    }

    /// Inserts `record` into `name`: select (or create) a page with enough
    /// room, write the record, and keep the FSM entry for that page in
    /// lockstep.
    pub fn insert(&mut self, name: &str, record: Record) -> Result<(), Error> {
        let schema = self.get_table_schema(name)?;
        let payload = record::encode(&schema, &record)?;
        if payload.len() + 12 > PAGE_SIZE {
            log::warn!(
                "table {name}: rejected insert of {} bytes, cannot fit in an {PAGE_SIZE}-byte page",
                payload.len()
            );
            return Err(Error::PlanInvalid(format!(
                "record of {} bytes cannot fit in an {PAGE_SIZE}-byte page",
                payload.len()
            )));
        }

        let mut fsm = self.load_fsm(name)?;
        self.check_heap_fsm_consistency(name, &fsm)?;

        let tf = table_file(name);
        let ff = fsm_file(name);

        match fsm.select_insertion_page(payload.len()) {
            Some(i) => {
                let offset = i as u64 * PAGE_SIZE as u64;
                let mut buf = self.store.read_at(&tf, offset, PAGE_SIZE)?;
                let computed_free = page::insertable_free_space(&buf);
                let fsm_entry = fsm.get(i).expect("index came from this fsm");
                if computed_free != fsm_entry as i32 {
                    log::warn!(
                        "table {name}: page {i} free space {computed_free} disagrees with fsm entry {fsm_entry}"
                    );
                    return Err(Error::Inconsistent(
                        "fsm and page free space mismatch".into(),
                    ));
                }
                page::append_record(&mut buf, &payload)?;
                self.store.write_at(&tf, offset, &buf)?;
                fsm.update_after_insert(i, payload.len());
                let updated = fsm.get(i).expect("index came from this fsm");
                self.store
                    .write_at(&ff, i as u64 * 2, &updated.to_le_bytes())?;
                log::trace!("inserted into {name} page {i}");
            }
            None => {
                let heap_size = self.store.size(&tf)?;
                let new_page = page::new_page(&payload)?;
                self.store.write_at(&tf, heap_size, &new_page)?;
                let fsm_size = fsm.entry_count() as u64 * 2;
                fsm.append_after_new_page(payload.len());
                let new_entry = fsm.get(fsm.entry_count() - 1).expect("just appended");
                self.store.write_at(&ff, fsm_size, &new_entry.to_le_bytes())?;
                log::trace!("inserted into {name} on a freshly appended page");
            }
        }
        Ok(())
    }

    /// Scans `name`, applying `filters` and projecting `select` (empty
    /// means "all columns"), returning surviving rows in heap order:
    /// page-ascending, slot-directory order within a page.
    pub fn scan(
        &mut self,
        name: &str,
        filters: &[FilterSpec],
        select: &[String],
    ) -> Result<Vec<Record>, Error> {
        let schema = self.get_table_schema(name)?;
        let plan = plan::build_plan(&schema, filters, select)?;
        let fsm = self.load_fsm(name)?;

        let tf = table_file(name);
        let mut results = Vec::new();
        for i in 0..fsm.entry_count() {
            if fsm.get(i) == Some(EMPTY_PAGE_SENTINEL) {
                continue;
            }
            let offset = i as u64 * PAGE_SIZE as u64;
            let buf = self.store.read_at(&tf, offset, PAGE_SIZE)?;
            for payload in page::iter_records(&buf) {
                if let Some(row) = record::decode_with_plan(&schema, &plan, payload)? {
                    results.push(row);
                }
            }
        }
        Ok(results)
    }
}
