use chrono::Utc;

use crate::attributes::AttributeMap;
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::sql;
use crate::value::Value;

/// Per-call save behavior.
#[derive(Debug, Clone, Copy)]
pub struct SaveOptions {
    /// Refresh `updated_at` when updating a timestamped record.
    pub touch: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self { touch: true }
    }
}

/// One mapped row with current and last-synced attribute snapshots.
///
/// A record starts out not yet persisted; a successful save inserts it and
/// flips it to persisted. From then on saves compare the current attributes
/// against the snapshot taken at the last sync and only write the columns
/// that changed.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    table: String,
    key_name: String,
    incrementing: bool,
    timestamps: bool,
    exists: bool,
    attributes: AttributeMap,
    original: AttributeMap,
}

impl Record {
    /// Column receiving the creation timestamp.
    pub const CREATED_AT: &'static str = "created_at";
    /// Column receiving the update timestamp.
    pub const UPDATED_AT: &'static str = "updated_at";

    /// Create a record mapped to `table`.
    ///
    /// Incrementing key and timestamp capabilities are on by default; opt
    /// out with [`with_incrementing`](Self::with_incrementing) and
    /// [`with_timestamps`](Self::with_timestamps).
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key_name: "id".to_string(),
            incrementing: true,
            timestamps: true,
            exists: false,
            attributes: AttributeMap::new(),
            original: AttributeMap::new(),
        }
    }

    /// Use a primary key column other than `id`.
    pub fn with_key_name(mut self, key: impl Into<String>) -> Self {
        self.key_name = key.into();
        self
    }

    /// Declare whether the store generates the key value on insert.
    pub fn with_incrementing(mut self, incrementing: bool) -> Self {
        self.incrementing = incrementing;
        self
    }

    /// Declare whether `created_at`/`updated_at` are maintained automatically.
    pub fn with_timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Seed initial attributes. The record stays clean: the snapshot is
    /// taken after the fill.
    pub fn with_attributes(mut self, attributes: AttributeMap) -> Self {
        for (key, value) in attributes {
            self.attributes.insert(key, value);
        }
        self.sync_original();
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    /// Whether the record has been persisted.
    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn is_incrementing(&self) -> bool {
        self.incrementing
    }

    pub fn uses_timestamps(&self) -> bool {
        self.timestamps
    }

    /// Current value of an attribute.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Current value of the primary key attribute.
    pub fn key(&self) -> Option<&Value> {
        self.attributes.get(&self.key_name)
    }

    /// Set an attribute.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Apply each pair via [`set`](Self::set).
    pub fn fill(&mut self, attributes: AttributeMap) -> &mut Self {
        for (key, value) in attributes {
            self.set(key, value);
        }
        self
    }

    /// All current attributes in insertion order.
    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    /// Snapshot the current attributes as the new baseline.
    pub fn sync_original(&mut self) {
        self.original = self.attributes.clone();
    }

    /// Attributes that changed or were added since the last sync.
    ///
    /// Keys that only exist in the baseline are not reported; removal is
    /// not a tracked mutation.
    pub fn dirty(&self) -> AttributeMap {
        let mut dirty = AttributeMap::new();
        for (key, value) in self.attributes.iter() {
            if self.original.get(key) != Some(value) {
                dirty.insert(key.to_string(), value.clone());
            }
        }
        dirty
    }

    /// Whether any attribute differs from the last-synced snapshot.
    pub fn is_dirty(&self) -> bool {
        !self.dirty().is_empty()
    }

    /// Whether any of the given attributes differ from the snapshot.
    pub fn is_dirty_any(&self, keys: &[&str]) -> bool {
        let dirty = self.dirty();
        keys.iter().any(|key| dirty.contains_key(key))
    }

    /// Persist the record: insert when new, update changed columns when
    /// already persisted. A persisted record with no changes is a no-op
    /// success.
    pub fn save(&mut self, db: &dyn Executor) -> Result<bool> {
        self.save_with(db, SaveOptions::default())
    }

    /// [`save`](Self::save) with explicit options.
    pub fn save_with(&mut self, db: &dyn Executor, options: SaveOptions) -> Result<bool> {
        let saved = if self.exists {
            if self.is_dirty() {
                self.perform_update(db, options)?
            } else {
                tracing::debug!(table = %self.table, "record clean, nothing to save");
                true
            }
        } else {
            self.perform_insert(db)?
        };

        if saved {
            self.sync_original();
        }

        Ok(saved)
    }

    /// Fill the given attributes and save. Returns `Ok(false)` without
    /// touching the database when the record was never persisted.
    pub fn update(&mut self, db: &dyn Executor, attributes: AttributeMap) -> Result<bool> {
        self.update_with(db, attributes, SaveOptions::default())
    }

    /// [`update`](Self::update) with explicit options.
    pub fn update_with(
        &mut self,
        db: &dyn Executor,
        attributes: AttributeMap,
        options: SaveOptions,
    ) -> Result<bool> {
        if !self.exists {
            return Ok(false);
        }

        self.fill(attributes);
        self.save_with(db, options)
    }

    fn perform_insert(&mut self, db: &dyn Executor) -> Result<bool> {
        if self.timestamps {
            self.update_timestamps();
        }

        // An attribute-less record has nothing to write; it still counts
        // as persisted.
        if self.attributes.is_empty() {
            self.exists = true;
            return Ok(true);
        }

        tracing::debug!(
            table = %self.table,
            columns = self.attributes.len(),
            "inserting record"
        );

        let statement = sql::compile_insert(&self.table, &self.attributes);
        let bindings: Vec<Value> = self.attributes.values().cloned().collect();

        if !db.execute(&statement, &bindings)? {
            return Ok(false);
        }

        if self.incrementing {
            let id = db.last_insert_id()?;
            let key = self.key_name.clone();
            self.attributes.insert(key, Value::Integer(id));
        }

        self.exists = true;
        Ok(true)
    }

    fn perform_update(&mut self, db: &dyn Executor, options: SaveOptions) -> Result<bool> {
        if self.timestamps && options.touch {
            self.update_timestamps();
        }

        let dirty = self.dirty();
        let key = match self.attributes.get(&self.key_name) {
            Some(value) => value.clone(),
            None => return Err(Error::missing_key(&self.table, &self.key_name)),
        };

        tracing::debug!(table = %self.table, columns = dirty.len(), "updating record");

        let statement = sql::compile_update(&self.table, &dirty, &self.key_name);
        let mut bindings: Vec<Value> = dirty.into_iter().map(|(_, value)| value).collect();
        bindings.push(key);

        db.execute(&statement, &bindings)
    }

    /// Stamp timestamp columns, never overwriting a caller-supplied value.
    ///
    /// Before the first insert both columns are set unless already present;
    /// on update only `updated_at` is refreshed, and only when the caller
    /// has not modified it themselves.
    fn update_timestamps(&mut self) {
        let now = Value::Timestamp(Utc::now());

        if self.exists {
            if !self.is_dirty_any(&[Self::UPDATED_AT]) {
                self.attributes.insert(Self::UPDATED_AT.to_string(), now);
            }
        } else {
            if !self.attributes.contains_key(Self::UPDATED_AT) {
                self.attributes
                    .insert(Self::UPDATED_AT.to_string(), now.clone());
            }
            if !self.attributes.contains_key(Self::CREATED_AT) {
                self.attributes.insert(Self::CREATED_AT.to_string(), now);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Executor fake recording every statement it is asked to run.
    struct FakeDb {
        statements: RefCell<Vec<(String, Vec<Value>)>>,
        next_id: i64,
    }

    impl FakeDb {
        fn new() -> Self {
            Self {
                statements: RefCell::new(Vec::new()),
                next_id: 1,
            }
        }

        fn statement_count(&self) -> usize {
            self.statements.borrow().len()
        }

        fn last_statement(&self) -> (String, Vec<Value>) {
            self.statements.borrow().last().cloned().unwrap()
        }
    }

    impl Executor for FakeDb {
        fn execute(&self, sql: &str, bindings: &[Value]) -> Result<bool> {
            self.statements
                .borrow_mut()
                .push((sql.to_string(), bindings.to_vec()));
            Ok(true)
        }

        fn last_insert_id(&self) -> Result<i64> {
            Ok(self.next_id)
        }
    }

    fn plain_record(table: &str) -> Record {
        Record::new(table)
            .with_incrementing(false)
            .with_timestamps(false)
    }

    #[test]
    fn freshly_constructed_record_is_clean() {
        let record = plain_record("users").with_attributes(
            AttributeMap::new()
                .with("name", "John Doe")
                .with("email", "jd@example.com"),
        );
        assert!(!record.is_dirty());
        assert!(record.dirty().is_empty());
        assert!(!record.exists());
    }

    #[test]
    fn dirty_reports_changed_and_added_pairs() {
        let mut record =
            plain_record("users").with_attributes(AttributeMap::new().with("name", "a"));
        record.set("name", "b").set("age", 30);

        let dirty = record.dirty();
        assert_eq!(dirty.len(), 2);
        assert_eq!(dirty.get("name"), Some(&Value::Text("b".into())));
        assert_eq!(dirty.get("age"), Some(&Value::Integer(30)));
    }

    #[test]
    fn reverting_a_change_clears_dirty() {
        let mut record =
            plain_record("users").with_attributes(AttributeMap::new().with("name", "a"));
        record.set("name", "b");
        assert!(record.is_dirty());
        record.set("name", "a");
        assert!(!record.is_dirty());
    }

    #[test]
    fn dirty_subset_check() {
        let mut record = plain_record("users")
            .with_attributes(AttributeMap::new().with("name", "a").with("email", "b"));
        record.set("name", "changed");

        assert!(record.is_dirty_any(&["name"]));
        assert!(record.is_dirty_any(&["name", "email"]));
        assert!(!record.is_dirty_any(&["email"]));
        assert!(!record.is_dirty_any(&["absent"]));
    }

    #[test]
    fn insert_assigns_generated_key_and_syncs() {
        let db = FakeDb::new();
        let mut record = Record::new("users")
            .with_timestamps(false)
            .with_attributes(AttributeMap::new().with("name", "John Doe"));

        assert!(record.save(&db).unwrap());
        assert_eq!(db.statement_count(), 1);

        let (sql, bindings) = db.last_statement();
        assert_eq!(sql, r#"insert into users ("name") values (?)"#);
        assert_eq!(bindings, vec![Value::Text("John Doe".into())]);

        assert!(record.exists());
        assert_eq!(record.key(), Some(&Value::Integer(1)));
        assert!(!record.is_dirty());
    }

    #[test]
    fn non_incrementing_insert_keeps_explicit_key() {
        let db = FakeDb::new();
        let mut record = plain_record("users")
            .with_attributes(AttributeMap::new().with("id", 42).with("name", "a"));

        assert!(record.save(&db).unwrap());
        assert_eq!(record.key(), Some(&Value::Integer(42)));
    }

    #[test]
    fn clean_persisted_save_issues_no_statement() {
        let db = FakeDb::new();
        let mut record = plain_record("users")
            .with_attributes(AttributeMap::new().with("id", 1).with("name", "a"));
        record.save(&db).unwrap();
        assert_eq!(db.statement_count(), 1);

        assert!(record.save(&db).unwrap());
        assert_eq!(db.statement_count(), 1);
    }

    #[test]
    fn update_on_new_record_fails_without_statement() {
        let db = FakeDb::new();
        let mut record = plain_record("users");

        let saved = record
            .update(&db, AttributeMap::new().with("name", "a"))
            .unwrap();
        assert!(!saved);
        assert_eq!(db.statement_count(), 0);
        // The fill never ran either.
        assert!(record.get("name").is_none());
    }

    #[test]
    fn update_writes_only_dirty_columns() {
        let db = FakeDb::new();
        let mut record = plain_record("users").with_attributes(
            AttributeMap::new()
                .with("id", 7)
                .with("name", "a")
                .with("email", "b"),
        );
        record.save(&db).unwrap();

        let saved = record
            .update(&db, AttributeMap::new().with("name", "c"))
            .unwrap();
        assert!(saved);

        let (sql, bindings) = db.last_statement();
        assert_eq!(sql, r#"update users set "name" = ? where "id" = ?"#);
        assert_eq!(bindings, vec![Value::Text("c".into()), Value::Integer(7)]);
        assert!(!record.is_dirty());
    }

    #[test]
    fn update_without_key_attribute_errors() {
        let db = FakeDb::new();
        let mut record =
            plain_record("users").with_attributes(AttributeMap::new().with("name", "a"));
        record.save(&db).unwrap();
        record.set("name", "b");

        let result = record.save(&db);
        assert!(matches!(result, Err(Error::MissingKey { .. })));
    }

    #[test]
    fn empty_insert_issues_no_statement() {
        let db = FakeDb::new();
        let mut record = plain_record("users");

        assert!(record.save(&db).unwrap());
        assert!(record.exists());
        assert_eq!(db.statement_count(), 0);
    }

    #[test]
    fn insert_injects_both_timestamps() {
        let db = FakeDb::new();
        let mut record = Record::new("users")
            .with_incrementing(false)
            .with_attributes(AttributeMap::new().with("id", 1).with("name", "a"));

        record.save(&db).unwrap();
        assert!(matches!(record.get(Record::UPDATED_AT), Some(Value::Timestamp(_))));
        assert!(matches!(record.get(Record::CREATED_AT), Some(Value::Timestamp(_))));
    }

    #[test]
    fn insert_keeps_caller_supplied_timestamps() {
        let db = FakeDb::new();
        let supplied = Value::Text("2001-01-01T00:00:00Z".into());
        let mut record = Record::new("users").with_incrementing(false).with_attributes(
            AttributeMap::new()
                .with("id", 1)
                .with(Record::CREATED_AT, supplied.clone()),
        );

        record.save(&db).unwrap();
        assert_eq!(record.get(Record::CREATED_AT), Some(&supplied));
        assert!(matches!(record.get(Record::UPDATED_AT), Some(Value::Timestamp(_))));
    }

    #[test]
    fn update_touch_refreshes_updated_at() {
        let db = FakeDb::new();
        let mut record = Record::new("users")
            .with_incrementing(false)
            .with_attributes(AttributeMap::new().with("id", 1).with("name", "a"));
        record.save(&db).unwrap();
        let stamped = record.get(Record::UPDATED_AT).cloned();

        record.set("name", "b");
        record.save(&db).unwrap();

        // Same-second saves produce an equal stamp, so assert presence and
        // type rather than inequality.
        assert!(matches!(record.get(Record::UPDATED_AT), Some(Value::Timestamp(_))));
        assert!(stamped.is_some());
    }

    #[test]
    fn update_with_touch_disabled_skips_updated_at() {
        let db = FakeDb::new();
        let mut record = Record::new("users")
            .with_incrementing(false)
            .with_timestamps(true)
            .with_attributes(AttributeMap::new().with("id", 1).with("name", "a"));
        record.save(&db).unwrap();
        let stamped = record.get(Record::UPDATED_AT).cloned().unwrap();

        record.set("name", "b");
        record
            .save_with(&db, SaveOptions { touch: false })
            .unwrap();

        let (sql, _) = db.last_statement();
        assert_eq!(sql, r#"update users set "name" = ? where "id" = ?"#);
        assert_eq!(record.get(Record::UPDATED_AT), Some(&stamped));
    }

    #[test]
    fn caller_supplied_updated_at_wins_on_update() {
        let db = FakeDb::new();
        let mut record = Record::new("users")
            .with_incrementing(false)
            .with_attributes(AttributeMap::new().with("id", 1).with("name", "a"));
        record.save(&db).unwrap();

        let explicit = Value::Text("1999-12-31T23:59:59Z".into());
        record.set("name", "b");
        record.set(Record::UPDATED_AT, explicit.clone());
        record.save(&db).unwrap();

        assert_eq!(record.get(Record::UPDATED_AT), Some(&explicit));
    }
}
