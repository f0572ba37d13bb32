//! Schema fixtures for integration tests.
//!
//! `HR_SCHEMA` is a small SQLite schema touching every kind SQLite has:
//! tables with primary, foreign and unique keys, an explicit index, a view,
//! a trigger and an AUTOINCREMENT sequence. `oracle_snapshot` replays the
//! built-in Oracle catalog with hand-recorded results, covering the kinds
//! SQLite lacks (procedures, functions, packages).

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use schemadoc_core::catalog::{Catalog, Dialect};
use schemadoc_core::introspect::{RecordedResult, StaticIntrospector};

pub const HR_SCHEMA: &str = "
CREATE TABLE departments (
    department_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    budget REAL CHECK (budget IS NULL OR budget >= 0) -- departments without a budget are funded centrally by headquarters
);

CREATE TABLE employees (
    employee_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT,
    department_id INTEGER REFERENCES departments(department_id) ON DELETE SET NULL,
    salary REAL DEFAULT 0
);

CREATE INDEX emp_name_idx ON employees(name);

CREATE VIEW staff AS
SELECT e.name, d.name AS department
  FROM employees e JOIN departments d ON d.department_id = e.department_id;

CREATE TRIGGER emp_audit AFTER UPDATE ON employees
BEGIN
    SELECT NEW.employee_id;
END;

INSERT INTO departments (name) VALUES ('Research');
INSERT INTO employees (name, department_id) VALUES ('Ada', 1);
";

/// Same shape without AUTOINCREMENT, so sqlite_sequence never exists.
pub const HR_SCHEMA_WITHOUT_SEQUENCES: &str = "
CREATE TABLE departments (
    department_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE employees (
    employee_id INTEGER PRIMARY KEY,
    department_id INTEGER REFERENCES departments(department_id)
);
";

/// In-memory database loaded with `schema`
pub fn hr_connection(schema: &str) -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory database");
    conn.execute_batch(schema).expect("load schema");
    conn
}

/// Database file under `dir` loaded with `schema`
pub fn write_hr_database(dir: &Path, schema: &str) -> PathBuf {
    let path = dir.join("hr.db");
    let conn = Connection::open(&path).expect("create database file");
    conn.execute_batch(schema).expect("load schema");
    path
}

fn spec_query(catalog: &Catalog, name: &str) -> String {
    catalog
        .specs
        .iter()
        .find(|s| s.name == name)
        .map(|s| s.query.clone())
        .unwrap_or_else(|| panic!("oracle catalog has no spec {name}"))
}

fn shell_query(catalog: &Catalog, name: &str) -> String {
    catalog
        .shells
        .iter()
        .find(|s| s.name == name)
        .map(|s| s.query.clone())
        .unwrap_or_else(|| panic!("oracle catalog has no shell {name}"))
}

/// Recorded Oracle dictionary results for a small HR schema.
///
/// Every catalog query has a result; the ones not filled in here are empty.
/// `view-comments` replays a failure.
pub fn oracle_snapshot() -> (Catalog, StaticIntrospector) {
    let catalog = Catalog::builtin(Dialect::Oracle).expect("oracle catalog");
    let mut source = StaticIntrospector::new();
    for query in catalog.queries() {
        source.insert(query, RecordedResult::default());
    }

    source.insert(
        &shell_query(&catalog, "objects"),
        RecordedResult::new(["OBJECT_TYPE", "OBJECT_NAME"])
            .with_text_row(&["CONSTRAINT", "DEPT_PK"])
            .with_text_row(&["CONSTRAINT", "EMP_DEPT_FK"])
            .with_text_row(&["CONSTRAINT", "EMP_PK"])
            .with_text_row(&["FUNCTION", "GET_NAME"])
            .with_text_row(&["INDEX", "EMP_PK"])
            .with_text_row(&["PACKAGE", "HR_API"])
            .with_text_row(&["PACKAGE BODY", "HR_API"])
            .with_text_row(&["PROCEDURE", "RAISE_SALARY"])
            .with_text_row(&["SEQUENCE", "EMP_SEQ"])
            .with_text_row(&["TABLE", "DEPT"])
            .with_text_row(&["TABLE", "EMP"])
            .with_text_row(&["TRIGGER", "EMP_BIU"]),
    );
    source.insert(
        &shell_query(&catalog, "columns"),
        RecordedResult::new(["OBJECT_TYPE", "OBJECT_NAME", "PARENT_TYPE", "PARENT_NAME"])
            .with_text_row(&["COLUMN", "DEPTNO", "TABLE", "DEPT"])
            .with_text_row(&["COLUMN", "EMPNO", "TABLE", "EMP"])
            .with_text_row(&["COLUMN", "ENAME", "TABLE", "EMP"])
            .with_text_row(&["COLUMN", "DEPTNO", "TABLE", "EMP"]),
    );

    source.insert(
        &spec_query(&catalog, "table-comments"),
        RecordedResult::new(["Table", "Description"])
            .with_text_row(&["DEPT", "Departments"])
            .with_row(&[Some("EMP"), None]),
    );
    source.insert(
        &spec_query(&catalog, "table-referenced-by"),
        RecordedResult::new(["Table", "Referenced by", "Constraint"])
            .with_text_row(&["DEPT", "EMP", "EMP_DEPT_FK"]),
    );
    source.insert(
        &spec_query(&catalog, "view-comments"),
        RecordedResult::new(["View", "Description"]).with_error("ORA-00942: table or view does not exist"),
    );
    source.insert(
        &spec_query(&catalog, "constraint-primary-key"),
        RecordedResult::new(["Primary key", "parent_name"])
            .with_text_row(&["DEPT_PK", "DEPT"])
            .with_text_row(&["EMP_PK", "EMP"]),
    );
    source.insert(
        &spec_query(&catalog, "constraint-foreign-key"),
        RecordedResult::new([
            "Foreign key",
            "parent_name",
            "Referenced table",
            "Referenced constraint",
            "Delete rule",
        ])
        .with_text_row(&["EMP_DEPT_FK", "EMP", "DEPT", "DEPT_PK", "NO ACTION"]),
    );
    source.insert(
        &spec_query(&catalog, "index-options"),
        RecordedResult::new(["Index", "parent_name", "Type", "Uniqueness"])
            .with_text_row(&["EMP_PK", "EMP", "NORMAL", "UNIQUE"]),
    );
    source.insert(
        &spec_query(&catalog, "trigger-header"),
        RecordedResult::new(["Trigger", "parent_name", "Type", "Event", "Status"])
            .with_text_row(&["EMP_BIU", "EMP", "BEFORE EACH ROW", "INSERT OR UPDATE", "ENABLED"]),
    );
    source.insert(
        &spec_query(&catalog, "trigger-code"),
        RecordedResult::new(["Trigger", "parent_name", "Code"])
            .with_text_row(&["EMP_BIU", "EMP", "1   :TRIGGER emp_biu"])
            .with_text_row(&["EMP_BIU", "EMP", "2   :BEFORE INSERT OR UPDATE ON emp"])
            .with_text_row(&["EMP_BIU", "EMP", "3   :BEGIN NULL; END;"]),
    );
    source.insert(
        &spec_query(&catalog, "procedure-arguments"),
        RecordedResult::new(["Procedure", "Argument name", "Datatype", "Default value", "In/Out"])
            .with_row(&[Some("RAISE_SALARY"), Some("P_EMPNO"), Some("NUMBER"), None, Some("IN")])
            .with_row(&[Some("RAISE_SALARY"), Some("P_PCT"), Some("NUMBER"), Some("10"), Some("IN")]),
    );
    source.insert(
        &spec_query(&catalog, "procedure-code"),
        RecordedResult::new(["Procedure", "Code"])
            .with_text_row(&["RAISE_SALARY", "1   :PROCEDURE raise_salary(p_empno NUMBER, p_pct NUMBER := 10) IS"])
            .with_text_row(&["RAISE_SALARY", "2   :BEGIN"])
            .with_text_row(&["RAISE_SALARY", "3   :  NULL;"])
            .with_text_row(&["RAISE_SALARY", "4   :END;"]),
    );
    source.insert(
        &spec_query(&catalog, "function-returns"),
        RecordedResult::new(["Function", "Returns"]).with_text_row(&["GET_NAME", "VARCHAR2"]),
    );
    source.insert(
        &spec_query(&catalog, "package-code"),
        RecordedResult::new(["Package", "Package Code"])
            .with_text_row(&["HR_API", "1   :PACKAGE hr_api AS"])
            .with_text_row(&["HR_API", "2   :  PROCEDURE hire;"])
            .with_text_row(&["HR_API", "3   :END hr_api;"]),
    );
    source.insert(
        &spec_query(&catalog, "package-body-code"),
        RecordedResult::new(["Package", "Package Body Code"])
            .with_text_row(&["HR_API", "1   :PACKAGE BODY hr_api AS"])
            .with_text_row(&["HR_API", "2   :END hr_api;"]),
    );
    source.insert(
        &spec_query(&catalog, "sequence-values"),
        RecordedResult::new(["Sequence", "Min value", "Max value", "Increment", "Last number"])
            .with_text_row(&["EMP_SEQ", "1", "9999999999", "1", "42"]),
    );
    source.insert(
        &spec_query(&catalog, "table-columns"),
        RecordedResult::new([
            "Column",
            "parent_name",
            "Datatype",
            "Nullable",
            "Default value",
            "Comment",
        ])
        .with_row(&[Some("EMPNO"), Some("EMP"), Some("NUMBER(4,0)"), Some("N"), None, None])
        .with_row(&[Some("ENAME"), Some("EMP"), Some("VARCHAR2(10)"), Some("Y"), None, Some("Name")])
        .with_row(&[Some("DEPTNO"), Some("EMP"), Some("NUMBER(2,0)"), Some("Y"), None, None])
        .with_row(&[Some("DEPTNO"), Some("DEPT"), Some("NUMBER(2,0)"), Some("N"), None, None]),
    );
    source.insert(
        &spec_query(&catalog, "column-constraint-membership"),
        RecordedResult::new(["Column", "parent_name", "_owner_type", "_owner_name", "_position"])
            .with_text_row(&["DEPTNO", "EMP", "CONSTRAINT", "EMP_DEPT_FK", "1"])
            .with_text_row(&["EMPNO", "EMP", "CONSTRAINT", "EMP_PK", "1"]),
    );

    (catalog, source)
}
