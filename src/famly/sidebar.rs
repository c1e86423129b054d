use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sidebar item type tag for child records
pub const CHILD_ITEM_TYPE: &str = "Famly.Daycare:Child";

/// A child visible to the logged-in account
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Child {
    pub id: String,
    pub name: String,
}

/// Pull child entries out of a sidebar payload
///
/// Child-typed items missing an id or title are skipped.
pub fn parse_children(payload: &Value) -> Vec<Child> {
    let Some(items) = payload.get("items").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter(|item| item.get("type").and_then(Value::as_str) == Some(CHILD_ITEM_TYPE))
        .filter_map(|item| {
            let id = item.get("id").and_then(Value::as_str);
            let title = item.get("title").and_then(Value::as_str);
            match (id, title) {
                (Some(id), Some(title)) => Some(Child {
                    id: id.to_string(),
                    name: title.to_string(),
                }),
                _ => {
                    tracing::warn!("Skipping sidebar child entry without id or title: {}", item);
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_children_keeps_only_child_items() {
        let payload = json!({
            "items": [
                { "type": "Famly.Daycare:Child", "id": "c1", "title": "Alice" },
                { "type": "Famly.Daycare:Institution", "id": "i1", "title": "Little Acorns" },
                { "type": "Famly.Daycare:Child", "id": "c2", "title": "Bob" },
                { "id": "x", "title": "No type" },
            ]
        });

        let children = parse_children(&payload);
        assert_eq!(
            children,
            vec![
                Child { id: "c1".to_string(), name: "Alice".to_string() },
                Child { id: "c2".to_string(), name: "Bob".to_string() },
            ]
        );
    }

    #[test]
    fn parse_children_skips_incomplete_entries() {
        let payload = json!({
            "items": [
                { "type": "Famly.Daycare:Child", "id": "c1" },
                { "type": "Famly.Daycare:Child", "title": "Nameless" },
                { "type": "Famly.Daycare:Child", "id": "c3", "title": "Cleo" },
            ]
        });

        let children = parse_children(&payload);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, "c3");
    }

    #[test]
    fn parse_children_without_items_is_empty() {
        assert!(parse_children(&json!({})).is_empty());
        assert!(parse_children(&json!({ "items": "nope" })).is_empty());
        assert!(parse_children(&Value::Null).is_empty());
    }
}
