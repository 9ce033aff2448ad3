//! redb table definitions for the kubesim resource store.

use redb::TableDefinition;

/// Resource collections keyed by plural resource name. Values are JSON arrays
/// of objects in creation order.
pub const COLLECTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("collections");
