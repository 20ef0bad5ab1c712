//! Integration tests for `SqliteClient` CRUD, decoding, and transactions

use chrono::NaiveDateTime;
use tempfile::TempDir;
use tidepool::{
    ClientConfig, FromRow, SqliteClient, SqliteRow, TideError, TideExecutor,
    TransactionBehavior, DATETIME_FORMAT,
};

fn test_client() -> (TempDir, SqliteClient) {
    let dir = TempDir::new().expect("create temp dir");
    let db = dir.path().join("app.db").to_string_lossy().into_owned();
    let client = SqliteClient::initialize(&db, ClientConfig::default()).expect("initialize");
    client
        .execute_ddl(
            "CREATE TABLE pets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                price REAL,
                adopted_at TEXT
            );",
        )
        .expect("create table");
    (dir, client)
}

#[derive(Debug, PartialEq)]
struct Pet {
    id: i64,
    name: String,
    price: Option<f64>,
}

impl FromRow for Pet {
    fn from_row(row: &SqliteRow) -> Result<Self, TideError> {
        Ok(Self {
            id: row.get_i64("id")?,
            name: row.get_text("name")?.to_string(),
            price: match row.get("price") {
                Some(v) if !v.is_null() => v.as_f64(),
                _ => None,
            },
        })
    }
}

#[test]
fn test_insert_and_find() {
    let (_dir, client) = test_client();

    let id = client
        .insert(
            "INSERT INTO pets (name, price) VALUES (?1, ?2)",
            &[&"otter", &1.5f64],
        )
        .expect("insert");
    assert_eq!(id, 1);

    let rows = client
        .find("SELECT id, name, price FROM pets", &[])
        .expect("find");
    assert_eq!(rows.len(), 1);
    let row = rows.first().unwrap();
    assert_eq!(row.get_i64("id").unwrap(), 1);
    assert_eq!(row.get_text("name").unwrap(), "otter");
    assert_eq!(row.get_f64("price").unwrap(), 1.5);
}

#[test]
fn test_find_first() {
    let (_dir, client) = test_client();
    client
        .insert("INSERT INTO pets (name) VALUES (?1)", &[&"otter"])
        .unwrap();
    client
        .insert("INSERT INTO pets (name) VALUES (?1)", &[&"badger"])
        .unwrap();

    let row = client
        .find_first("SELECT name FROM pets ORDER BY id DESC", &[])
        .expect("find_first")
        .expect("row present");
    assert_eq!(row.get_text("name").unwrap(), "badger");

    let none = client
        .find_first("SELECT name FROM pets WHERE name = ?1", &[&"heron"])
        .expect("find_first");
    assert!(none.is_none());
}

#[test]
fn test_find_as_decodes_rows() {
    let (_dir, client) = test_client();
    client
        .insert(
            "INSERT INTO pets (name, price) VALUES (?1, ?2)",
            &[&"otter", &1.5f64],
        )
        .unwrap();
    client
        .insert("INSERT INTO pets (name) VALUES (?1)", &[&"badger"])
        .unwrap();

    let pets: Vec<Pet> = client
        .find_as("SELECT id, name, price FROM pets ORDER BY id", &[])
        .expect("find_as");
    assert_eq!(
        pets,
        vec![
            Pet { id: 1, name: "otter".to_string(), price: Some(1.5) },
            Pet { id: 2, name: "badger".to_string(), price: None },
        ]
    );

    let first: Option<Pet> = client
        .find_first_as("SELECT id, name, price FROM pets ORDER BY id", &[])
        .expect("find_first_as");
    assert_eq!(first.map(|p| p.name), Some("otter".to_string()));
}

#[test]
fn test_find_as_decode_error() {
    let (_dir, client) = test_client();
    client
        .insert("INSERT INTO pets (name) VALUES (?1)", &[&"otter"])
        .unwrap();

    // Pet requires an `id` column the projection does not provide
    let result: Result<Vec<Pet>, _> = client.find_as("SELECT name FROM pets", &[]);
    assert!(matches!(result, Err(TideError::Decode(_))));
}

#[test]
fn test_update_and_delete() {
    let (_dir, client) = test_client();
    client
        .insert("INSERT INTO pets (name) VALUES (?1)", &[&"otter"])
        .unwrap();
    client
        .insert("INSERT INTO pets (name) VALUES (?1)", &[&"badger"])
        .unwrap();

    let updated = client
        .update(
            "UPDATE pets SET price = ?1 WHERE name = ?2",
            &[&2.0f64, &"otter"],
        )
        .expect("update");
    assert_eq!(updated, 1);

    let deleted = client
        .delete("DELETE FROM pets WHERE name = ?1", &[&"badger"])
        .expect("delete");
    assert_eq!(deleted, 1);
    assert_eq!(client.count("SELECT count(1) FROM pets", &[]).unwrap(), 1);
}

#[test]
fn test_has_table() {
    let (_dir, client) = test_client();
    assert!(client.has_table("pets").unwrap());
    assert!(!client.has_table("plants").unwrap());
}

#[test]
fn test_datetime_round_trip() {
    let (_dir, client) = test_client();
    let adopted =
        NaiveDateTime::parse_from_str("2024-03-01 12:30:45", DATETIME_FORMAT).unwrap();
    client
        .insert(
            "INSERT INTO pets (name, adopted_at) VALUES (?1, ?2)",
            &[&"otter", &adopted.format(DATETIME_FORMAT).to_string()],
        )
        .unwrap();

    let row = client
        .find_first("SELECT adopted_at FROM pets", &[])
        .unwrap()
        .expect("row present");
    assert_eq!(row.get_datetime("adopted_at", DATETIME_FORMAT).unwrap(), adopted);
}

#[test]
fn test_transaction_commits_on_ok() {
    let (_dir, client) = test_client();

    let id = client
        .transaction(|txn| {
            txn.execute("INSERT INTO pets (name) VALUES (?1)", &[&"otter"])?;
            txn.insert("INSERT INTO pets (name) VALUES (?1)", &[&"badger"])
        })
        .expect("transaction");
    assert_eq!(id, 2);
    assert_eq!(client.count("SELECT count(1) FROM pets", &[]).unwrap(), 2);
}

#[test]
fn test_transaction_rolls_back_on_err() {
    let (_dir, client) = test_client();

    let result: Result<(), TideError> = client.transaction(|txn| {
        txn.execute("INSERT INTO pets (name) VALUES (?1)", &[&"otter"])?;
        Err(TideError::Other("abort".to_string()))
    });
    assert!(matches!(result, Err(TideError::Other(_))));
    assert_eq!(client.count("SELECT count(1) FROM pets", &[]).unwrap(), 0);
}

#[test]
fn test_transaction_with_immediate_behavior() {
    let (_dir, client) = test_client();

    client
        .transaction_with_behavior(TransactionBehavior::Immediate, |txn| {
            txn.execute("INSERT INTO pets (name) VALUES (?1)", &[&"otter"])?;
            Ok(())
        })
        .expect("immediate transaction");
    assert_eq!(client.count("SELECT count(1) FROM pets", &[]).unwrap(), 1);
}

#[test]
fn test_in_memory_database() {
    let client =
        SqliteClient::initialize(":memory:", ClientConfig::default().max_open_conns(1))
            .expect("open in-memory database");
    client
        .execute_ddl("CREATE TABLE t (id INTEGER);")
        .expect("create table");
    client
        .insert("INSERT INTO t (id) VALUES (1)", &[])
        .expect("insert");
    assert_eq!(client.count("SELECT count(1) FROM t", &[]).unwrap(), 1);
}

#[test]
fn test_invalid_data_source_rejected() {
    assert!(SqliteClient::initialize("", ClientConfig::default()).is_err());
}
