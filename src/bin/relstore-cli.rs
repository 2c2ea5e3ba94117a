use std::env;
use std::process;

use log::info;

use relstore::database::Database;
use relstore::logging::init_log;
use relstore::ops::SeqScan;
use relstore::transaction::TransactionId;

/// A tiny entry point: load a catalog from a schema file, scan every
/// table it names, and print the results. Stands in for the parser,
/// planner, and REPL, all out of scope here.
fn main() {
    init_log();

    let mut args = env::args().skip(1);
    let schema_path = match args.next() {
        Some(p) => p,
        None => {
            eprintln!("usage: relstore-cli <schema-file>");
            process::exit(2);
        }
    };

    let db = match Database::open_with_schema(&schema_path) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("failed to open catalog at {}: {}", schema_path, e);
            process::exit(1);
        }
    };

    let tid = TransactionId::new();
    info!("starting scan transaction {}", tid);

    for table_name in table_names_from_schema(&schema_path) {
        let table_id = match db.catalog().get_table_id(&table_name) {
            Ok(id) => id,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        println!("== {} ==", table_name);
        let scan = match SeqScan::new(db.buffer_pool(), db.catalog(), tid, table_id) {
            Ok(scan) => scan,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };
        for row in scan {
            match row {
                Ok(t) => println!("{}", t),
                Err(e) => eprintln!("{}", e),
            }
        }
    }

    if let Err(e) = db.buffer_pool().transaction_complete(tid, true, db.catalog()) {
        eprintln!("commit failed: {}", e);
        process::exit(1);
    }
}

/// Re-reads the schema file just to recover table names in declaration
/// order; the catalog itself only maps name <-> id, not ordering.
fn table_names_from_schema(path: &str) -> Vec<String> {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(_) => return Vec::new(),
    };
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            line.split('(').next().map(|n| n.trim().to_string())
        })
        .collect()
}
