// Wire envelope and codec
pub mod message;

// Entity stores and room state
pub mod state;

// Periodic tick source
pub mod timer;

// Inbound dispatch and the session loop
pub mod session;

// Outbound command builder
pub mod command;

// Broker transport
pub mod transport;

// Configuration
pub mod config;
