pub mod migrate;

pub use migrate::MigrateCommands;
