// Library for tests to access modules

pub mod config;
pub mod gate;
pub mod metrics_repo;
pub mod models;
pub mod normalizer;
pub mod recorder;
pub mod routes;
pub mod source;
pub mod worker;
