//! Inbound transport: the authorizer HTTP endpoint.

pub mod http;
