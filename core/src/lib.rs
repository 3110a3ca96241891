pub mod behavior;
pub mod oracle;
pub mod policy;
pub mod request;
pub mod rules;
pub mod scoring;
pub mod signature;
