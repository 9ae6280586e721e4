use once_cell::sync::Lazy;
use std::env;

pub static GRAPH_URL: Lazy<String> = Lazy::new(|| {
    env::var("OCULUS_GRAPH_URL").unwrap_or_else(|_| "https://graph.oculus.com/graphql".to_string())
});

pub const DEFAULT_LOCALE: &str = "en_US";
pub const DEFAULT_SORT_ORDER: &str = "alpha";

/// GraphQL document id of the application detail query.
pub const DETAIL_DOC_ID: &str = "4282918028433524";
