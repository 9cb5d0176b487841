pub mod chat;
pub mod config;
pub mod errors;
pub mod flow;
pub mod remote;
pub mod runner;
pub mod survey;
pub mod topic;
pub mod ui;
