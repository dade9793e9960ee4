pub mod aggregator;
pub mod error;
pub mod flatten;
pub mod jobs_api;
pub mod poller;
pub mod request_builder;
#[cfg(test)]
pub(crate) mod test_support;
