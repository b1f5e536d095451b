//! Testing utilities for cfgtree workspace
//!
//! Shared fixtures, event recorders and commit hooks.

#![allow(missing_docs)]

use std::cell::RefCell;
use std::rc::Rc;

use cfgtree_node::{CommitError, CommitHook, Defaults, SchemaTree, TreeEvent, TreeListener};
use cfgtree_schema::{PlainData, PrimitiveType, SchemaFragment, SchemaPath};

pub fn yaml(text: &str) -> PlainData {
    serde_yaml::from_str(text).unwrap()
}

pub fn schema_path(text: &str) -> SchemaPath {
    text.parse().unwrap()
}

/// `{name: str, age: int, weight: float}`
pub fn person_schema() -> SchemaFragment {
    SchemaFragment::mapping()
        .key("name", SchemaFragment::string())
        .key("age", SchemaFragment::integer())
        .key("weight", SchemaFragment::float())
        .build()
}

pub fn person_document() -> PlainData {
    yaml("{name: Ann, age: 30, weight: 60.5}")
}

pub fn person_tree() -> SchemaTree {
    SchemaTree::load("person", person_schema(), person_document(), Defaults::new()).unwrap()
}

/// Service settings with every kind of key matcher
pub const SERVICE_SCHEMA: &str = r#"
name: str
debug?: bool
servers:
  <string>:
    host: str
    port: int
tags: [str]
limits:
  /^max_[a-z]+$/: int
"#;

pub const SERVICE_DOCUMENT: &str = r#"
name: api
servers:
  main:
    host: localhost
    port: 8080
tags: [alpha, beta]
limits:
  max_conn: 100
"#;

pub const SERVICE_DEFAULTS: &str = r#"
servers:
  new_server:
    host: localhost
    port: 80
tags: untagged
limits:
  max_items: 10
"#;

pub fn service_schema() -> SchemaFragment {
    cfgtree_schema::parse_schema(SERVICE_SCHEMA).unwrap()
}

pub fn service_defaults() -> Defaults {
    Defaults::from_document(&yaml(SERVICE_DEFAULTS)).unwrap()
}

pub fn service_tree() -> SchemaTree {
    SchemaTree::load(
        "service",
        service_schema(),
        yaml(SERVICE_DOCUMENT),
        service_defaults(),
    )
    .unwrap()
}

/// Schema of a single string-keyed mapping of integers
pub fn counters_schema() -> SchemaFragment {
    SchemaFragment::mapping()
        .typed_key(PrimitiveType::String, SchemaFragment::integer())
        .build()
}

/// Entry in a [`Journal`]
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Event(TreeEvent),
    Commit(PlainData),
}

/// Shared log of events and commits, in the order they happened
#[derive(Debug, Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<Entry>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listener that logs every event it receives
    pub fn listener(&self) -> impl TreeListener + 'static {
        let log = Rc::clone(&self.0);
        move |event: &TreeEvent| log.borrow_mut().push(Entry::Event(event.clone()))
    }

    /// Commit hook that logs every document it receives
    pub fn hook(&self) -> impl CommitHook + 'static {
        let log = Rc::clone(&self.0);
        move |document: &PlainData| -> Result<(), CommitError> {
            log.borrow_mut().push(Entry::Commit(document.clone()));
            Ok(())
        }
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.0.borrow().clone()
    }

    pub fn events(&self) -> Vec<TreeEvent> {
        self.0
            .borrow()
            .iter()
            .filter_map(|entry| match entry {
                Entry::Event(event) => Some(event.clone()),
                Entry::Commit(_) => None,
            })
            .collect()
    }

    pub fn commits(&self) -> Vec<PlainData> {
        self.0
            .borrow()
            .iter()
            .filter_map(|entry| match entry {
                Entry::Commit(document) => Some(document.clone()),
                Entry::Event(_) => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// Commit hook that always fails, counting its calls
#[derive(Debug, Clone, Default)]
pub struct FailingHook(Rc<RefCell<usize>>);

impl FailingHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        *self.0.borrow()
    }
}

impl CommitHook for FailingHook {
    fn on_commit(&mut self, _document: &PlainData) -> Result<(), CommitError> {
        *self.0.borrow_mut() += 1;
        Err("disk full".into())
    }
}
