//! Response shapes shared by the entity routers.

use serde::Serialize;

/// List responses: filtered rows for the current page plus the total count
/// of rows matching the filters regardless of skip/limit.
#[derive(Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Confirmation body for deletes.
#[derive(Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn deleted(what: &str) -> Self {
        Message {
            message: format!("{} deleted successfully", what),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_serializes_items_and_total() {
        let page = Page {
            items: vec![1, 2, 3],
            total: 7,
        };
        let v = serde_json::to_value(&page).unwrap();
        assert_eq!(v["total"], 7);
        assert_eq!(v["items"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn deleted_message_names_the_entity() {
        let v = serde_json::to_value(Message::deleted("Customer")).unwrap();
        assert_eq!(v["message"], "Customer deleted successfully");
    }
}
