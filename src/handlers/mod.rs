//! One handler module per entity. Each holds its request/query types, its
//! sqlx queries, and a `router()` to mount under the API prefix.

use serde::Deserialize;

pub mod appointments;
pub mod customers;
pub mod feedback;
pub mod knowledge_base;
pub mod promotions;
pub mod service_categories;
pub mod services;
pub mod staff;

pub(crate) fn default_limit() -> i64 {
    100
}

/// skip/limit pagination for sub-routes whose filters are fixed by the path.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_params_default_to_first_hundred() {
        let p: PageParams = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(p.skip, 0);
        assert_eq!(p.limit, 100);
    }
}
