pub mod alias;
pub mod code_signing_config;
pub mod condition;
pub mod event_source_mapping;
pub mod function;
pub mod function_url_config;
pub mod invoke;
pub mod layer_version;
pub mod meta;
pub mod reference;
pub mod version;
