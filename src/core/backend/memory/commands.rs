// src/core/backend/memory/commands.rs

//! Database commands understood by the memory backend.
//!
//! The command name is the first key of the command document. A command that
//! cannot be carried out yields a reply with `ok: 0` and an `errmsg`, never an error.

use super::query::count_matching;
use super::{Database, ServerNode};
use crate::core::protocol::{Document, Value};
use crate::doc;
use chrono::Utc;

/// The version string the backend reports about itself.
pub const BACKEND_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "-memory");

fn failure(errmsg: impl Into<String>) -> Document {
    doc! { "ok" => 0, "errmsg" => errmsg.into() }
}

fn ok() -> Document {
    doc! { "ok" => 1 }
}

/// Executes `command` against `db` on `node`.
pub fn run(node: &ServerNode, db: &str, command: &Document) -> Document {
    let Some((name, arg)) = command.first() else {
        return failure("no such cmd: ");
    };
    match name.as_str() {
        "ping" => ok(),
        "buildinfo" | "buildInfo" => doc! {
            "version" => BACKEND_VERSION,
            "gitVersion" => "none",
            "sysInfo" => "in-process memory backend",
            "bits" => 64,
            "debug" => false,
            "maxBsonObjectSize" => 16 * 1024 * 1024,
            "ok" => 1,
        },
        "serverStatus" => doc! {
            "host" => node.address().to_string(),
            "version" => BACKEND_VERSION,
            "process" => "memory",
            "uptime" => node.uptime_secs(),
            "localTime" => Value::DateTime(Utc::now().timestamp_millis()),
            "connections" => doc! { "totalCreated" => node.connections_created() },
            "ok" => 1,
        },
        "listDatabases" => list_databases(node, db),
        "listCollections" => list_collections(node, db),
        "create" => match arg.as_str() {
            Some(collection) => create(node, db, collection),
            None => failure("create needs a collection name"),
        },
        "drop" => match arg.as_str() {
            Some(collection) => drop_collection(node, db, collection),
            None => failure("drop needs a collection name"),
        },
        "dropDatabase" => {
            node.with_databases_mut(|dbs| dbs.remove(db));
            doc! { "dropped" => db, "ok" => 1 }
        }
        "count" => match arg.as_str() {
            Some(collection) => count(node, db, collection, command),
            None => failure("count needs a collection name"),
        },
        "createUser" => match (arg.as_str(), command.get("pwd").and_then(Value::as_str)) {
            (Some(user), Some(pwd)) => create_user(node, db, user, pwd),
            _ => failure("createUser needs a user name and a pwd"),
        },
        other => {
            let mut reply = failure(format!("no such cmd: {other}"));
            reply.insert("bad cmd".to_string(), Value::Document(command.clone()));
            reply
        }
    }
}

fn list_databases(node: &ServerNode, db: &str) -> Document {
    if db != "admin" {
        return failure("listDatabases may only be run against the admin database.");
    }
    let databases: Vec<Value> = node.with_databases(|dbs| {
        dbs.iter()
            .map(|(name, database)| {
                Value::from(doc! {
                    "name" => name.as_str(),
                    "sizeOnDisk" => document_count(database),
                    "empty" => database.collections.values().all(Vec::is_empty),
                })
            })
            .collect()
    });
    doc! { "databases" => databases, "ok" => 1 }
}

fn document_count(database: &Database) -> usize {
    database.collections.values().map(Vec::len).sum()
}

fn list_collections(node: &ServerNode, db: &str) -> Document {
    let collections: Vec<Value> = node.with_databases(|dbs| {
        dbs.get(db)
            .map(|database| {
                database
                    .collections
                    .keys()
                    .map(|name| Value::from(doc! { "name" => name.as_str(), "type" => "collection" }))
                    .collect()
            })
            .unwrap_or_default()
    });
    doc! {
        "cursor" => doc! {
            "id" => 0,
            "ns" => format!("{db}.$cmd.listCollections"),
            "firstBatch" => collections,
        },
        "ok" => 1,
    }
}

fn create(node: &ServerNode, db: &str, collection: &str) -> Document {
    node.with_databases_mut(|dbs| {
        let database = dbs.entry(db.to_string()).or_default();
        if database.collections.contains_key(collection) {
            failure("collection already exists")
        } else {
            database.collections.insert(collection.to_string(), Vec::new());
            ok()
        }
    })
}

fn drop_collection(node: &ServerNode, db: &str, collection: &str) -> Document {
    let dropped = node.with_databases_mut(|dbs| {
        dbs.get_mut(db)
            .and_then(|database| database.collections.shift_remove(collection))
            .is_some()
    });
    if dropped {
        doc! { "ns" => format!("{db}.{collection}"), "nIndexesWas" => 1, "ok" => 1 }
    } else {
        failure("ns not found")
    }
}

fn count(node: &ServerNode, db: &str, collection: &str, command: &Document) -> Document {
    let empty = Document::new();
    let criteria = match command.get("query") {
        Some(Value::Document(query)) => query,
        Some(Value::Null) | None => &empty,
        Some(_) => return failure("query must be an object"),
    };
    match node.read_collection(db, collection, |docs| count_matching(docs, criteria)) {
        Ok(n) => doc! { "n" => n, "ok" => 1 },
        Err(e) => failure(e.to_string()),
    }
}

fn create_user(node: &ServerNode, db: &str, user: &str, pwd: &str) -> Document {
    node.with_databases_mut(|dbs| {
        let database = dbs.entry(db.to_string()).or_default();
        if database.users.contains_key(user) {
            failure(format!("User \"{user}@{db}\" already exists"))
        } else {
            database.users.insert(user.to_string(), pwd.to_string());
            ok()
        }
    })
}
