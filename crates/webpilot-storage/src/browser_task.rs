//! Browser task storage - byte-level API for task persistence.
//!
//! Tasks, their executed actions and their event log live in separate
//! tables. Index tables use composite string keys so that per-task scans are
//! prefix range queries and orderings fall out of lexical key order.

use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::sync::Arc;

use crate::range_utils::{order_key, prefix_end_bound, task_prefix, timestamp_key};

const BROWSER_TASK_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("browser_tasks");
/// Index table: "{created_at}:{task_id}" -> task_id
const TASK_CREATED_INDEX: TableDefinition<&str, &str> =
    TableDefinition::new("browser_task_created_index");
/// Reverse lookup: task_id -> created index key
const TASK_INDEX_KEY_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("browser_task_index_keys");
const ACTION_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("task_actions");
/// Index table: "{task_id}:{order}:{position}:{action_id}" -> action_id
const ACTION_INDEX_TABLE: TableDefinition<&str, &str> = TableDefinition::new("task_action_index");
const EVENT_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("task_events");
/// Index table: "{task_id}:{timestamp}:{sequence}:{event_id}" -> event_id
const EVENT_INDEX_TABLE: TableDefinition<&str, &str> = TableDefinition::new("task_event_index");

/// Serialized action plus the fields its index key is built from
#[derive(Debug, Clone)]
pub struct RawAction {
    pub id: String,
    pub order: i32,
    pub data: Vec<u8>,
}

/// Low-level browser task storage with byte-level API
#[derive(Clone)]
pub struct BrowserTaskStorage {
    db: Arc<Database>,
}

impl BrowserTaskStorage {
    /// Create a new BrowserTaskStorage instance
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(BROWSER_TASK_TABLE)?;
        write_txn.open_table(TASK_CREATED_INDEX)?;
        write_txn.open_table(TASK_INDEX_KEY_TABLE)?;
        write_txn.open_table(ACTION_TABLE)?;
        write_txn.open_table(ACTION_INDEX_TABLE)?;
        write_txn.open_table(EVENT_TABLE)?;
        write_txn.open_table(EVENT_INDEX_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    // ============== Task Operations ==============

    /// Store raw task data, indexed by creation time
    pub fn put_task_raw(&self, id: &str, created_at: i64, data: &[u8]) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(BROWSER_TASK_TABLE)?;
            table.insert(id, data)?;

            let mut created_index = write_txn.open_table(TASK_CREATED_INDEX)?;
            let mut index_keys = write_txn.open_table(TASK_INDEX_KEY_TABLE)?;
            let previous = index_keys.get(id)?.map(|key| key.value().to_string());
            if let Some(previous) = previous {
                created_index.remove(previous.as_str())?;
            }

            let index_key = format!("{}:{}", timestamp_key(created_at), id);
            created_index.insert(index_key.as_str(), id)?;
            index_keys.insert(id, index_key.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get raw task data by ID
    pub fn get_task_raw(&self, id: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BROWSER_TASK_TABLE)?;

        if let Some(value) = table.get(id)? {
            Ok(Some(value.value().to_vec()))
        } else {
            Ok(None)
        }
    }

    /// List raw task data newest first, skipping `offset` and returning at
    /// most `limit` entries
    pub fn list_tasks_page_raw(&self, offset: usize, limit: usize) -> Result<Vec<(String, Vec<u8>)>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(TASK_CREATED_INDEX)?;
        let table = read_txn.open_table(BROWSER_TASK_TABLE)?;

        let mut tasks = Vec::new();
        for item in index.iter()?.rev().skip(offset).take(limit) {
            let (_, value) = item?;
            let id = value.value();
            if let Some(data) = table.get(id)? {
                tasks.push((id.to_string(), data.value().to_vec()));
            }
        }

        Ok(tasks)
    }

    /// Number of stored tasks
    pub fn count_tasks(&self) -> Result<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BROWSER_TASK_TABLE)?;
        Ok(table.len()?)
    }

    /// Read-modify-write a task inside a single write transaction.
    ///
    /// `update` receives the current bytes and returns the replacement. If it
    /// returns an error nothing is written and the error is passed through.
    /// When `actions` is given, the task's action records are replaced in the
    /// same transaction. Returns `None` if the task does not exist.
    pub fn update_task_raw<F>(
        &self,
        id: &str,
        actions: Option<&[RawAction]>,
        update: F,
    ) -> Result<Option<Vec<u8>>>
    where
        F: FnOnce(&[u8]) -> Result<Vec<u8>>,
    {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut table = write_txn.open_table(BROWSER_TASK_TABLE)?;
            let current = match table.get(id)? {
                Some(value) => value.value().to_vec(),
                None => return Ok(None),
            };

            // Dropping the transaction on error aborts it
            let updated = update(&current)?;
            table.insert(id, updated.as_slice())?;

            if let Some(actions) = actions {
                let mut action_table = write_txn.open_table(ACTION_TABLE)?;
                let mut action_index = write_txn.open_table(ACTION_INDEX_TABLE)?;
                remove_prefixed(&mut action_index, &mut action_table, id)?;

                for (position, action) in actions.iter().enumerate() {
                    action_table.insert(action.id.as_str(), action.data.as_slice())?;
                    let index_key = format!(
                        "{}:{}:{:06}:{}",
                        id,
                        order_key(action.order),
                        position,
                        action.id
                    );
                    action_index.insert(index_key.as_str(), action.id.as_str())?;
                }
            }

            updated
        };
        write_txn.commit()?;
        Ok(Some(updated))
    }

    /// Delete a task together with its actions and events
    pub fn delete_task(&self, id: &str) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(BROWSER_TASK_TABLE)?;
            let existed = table.remove(id)?.is_some();

            let mut created_index = write_txn.open_table(TASK_CREATED_INDEX)?;
            let mut index_keys = write_txn.open_table(TASK_INDEX_KEY_TABLE)?;
            let index_key = index_keys.remove(id)?.map(|key| key.value().to_string());
            if let Some(index_key) = index_key {
                created_index.remove(index_key.as_str())?;
            }

            let mut action_table = write_txn.open_table(ACTION_TABLE)?;
            let mut action_index = write_txn.open_table(ACTION_INDEX_TABLE)?;
            remove_prefixed(&mut action_index, &mut action_table, id)?;

            let mut event_table = write_txn.open_table(EVENT_TABLE)?;
            let mut event_index = write_txn.open_table(EVENT_INDEX_TABLE)?;
            remove_prefixed(&mut event_index, &mut event_table, id)?;

            existed
        };
        write_txn.commit()?;
        Ok(existed)
    }

    // ============== Action Operations ==============

    /// List raw action data for a task in execution order
    pub fn list_actions_raw(&self, task_id: &str) -> Result<Vec<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ACTION_INDEX_TABLE)?;
        let table = read_txn.open_table(ACTION_TABLE)?;
        collect_prefixed(&index, &table, task_id)
    }

    // ============== Task Event Operations ==============

    /// Store raw task event data with index.
    ///
    /// Returns `false` without writing when the task no longer exists, so a
    /// late event cannot outlive its task's cascading delete.
    pub fn put_event_raw(
        &self,
        event_id: &str,
        task_id: &str,
        timestamp: i64,
        data: &[u8],
    ) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        {
            let task_table = write_txn.open_table(BROWSER_TASK_TABLE)?;
            if task_table.get(task_id)?.is_none() {
                return Ok(false);
            }

            let mut event_table = write_txn.open_table(EVENT_TABLE)?;
            event_table.insert(event_id, data)?;

            let mut index_table = write_txn.open_table(EVENT_INDEX_TABLE)?;
            // Sequence number breaks ties between events in the same millisecond
            let prefix = task_prefix(task_id);
            let end = prefix_end_bound(&prefix);
            let sequence = index_table.range(prefix.as_str()..end.as_str())?.count();
            let index_key = format!(
                "{}:{}:{:08}:{}",
                task_id,
                timestamp_key(timestamp),
                sequence,
                event_id
            );
            index_table.insert(index_key.as_str(), event_id)?;
        }
        write_txn.commit()?;
        Ok(true)
    }

    /// List raw events for a task, oldest first
    pub fn list_events_raw(&self, task_id: &str) -> Result<Vec<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(EVENT_INDEX_TABLE)?;
        let table = read_txn.open_table(EVENT_TABLE)?;
        collect_prefixed(&index, &table, task_id)
    }
}

fn collect_prefixed(
    index: &impl ReadableTable<&'static str, &'static str>,
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    task_id: &str,
) -> Result<Vec<Vec<u8>>> {
    let prefix = task_prefix(task_id);
    let end = prefix_end_bound(&prefix);

    let mut items = Vec::new();
    for item in index.range(prefix.as_str()..end.as_str())? {
        let (_, value) = item?;
        if let Some(data) = table.get(value.value())? {
            items.push(data.value().to_vec());
        }
    }
    Ok(items)
}

fn remove_prefixed(
    index: &mut redb::Table<'_, &'static str, &'static str>,
    table: &mut redb::Table<'_, &'static str, &'static [u8]>,
    task_id: &str,
) -> Result<usize> {
    let prefix = task_prefix(task_id);
    let end = prefix_end_bound(&prefix);

    let mut entries = Vec::new();
    for item in index.range(prefix.as_str()..end.as_str())? {
        let (key, value) = item?;
        entries.push((key.value().to_string(), value.value().to_string()));
    }

    for (key, id) in &entries {
        index.remove(key.as_str())?;
        table.remove(id.as_str())?;
    }
    Ok(entries.len())
}
